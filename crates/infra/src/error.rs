use thiserror::Error;

use flockerp_core::{DomainError, ErrorClass};

use crate::event_store::EventStoreError;

/// Failure of one workflow operation.
///
/// Optimistic-concurrency conflicts are retried inside the engine and only
/// surface as `Contention` once the retry budget is spent.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("event store error: {0}")]
    Store(#[from] EventStoreError),

    #[error("failed to rehydrate aggregate: {0}")]
    Rehydrate(String),

    #[error("{operation} gave up after {attempts} conflicting attempts")]
    Contention {
        operation: &'static str,
        attempts: u32,
    },
}

impl WorkflowError {
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            WorkflowError::Domain(err) => Some(err),
            _ => None,
        }
    }

    /// Client-facing class. Infrastructure failures have none.
    pub fn class(&self) -> Option<ErrorClass> {
        match self {
            WorkflowError::Domain(err) => Some(err.class()),
            WorkflowError::Contention { .. } => Some(ErrorClass::Conflict),
            WorkflowError::Store(_) | WorkflowError::Rehydrate(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_keep_their_class() {
        let err = WorkflowError::from(DomainError::InsufficientStock {
            item_kind: "SASSO_CHICKS".to_string(),
            available: 600,
            requested: 700,
        });
        assert_eq!(err.class(), Some(ErrorClass::PreconditionFailed));
        assert!(err.domain().is_some());
    }

    #[test]
    fn contention_is_a_conflict() {
        let err = WorkflowError::Contention {
            operation: "debit_stock",
            attempts: 17,
        };
        assert_eq!(err.class(), Some(ErrorClass::Conflict));
        assert_eq!(err.class().map(ErrorClass::http_status), Some(409));
    }
}
