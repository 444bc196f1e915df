//! Domain error model.
//!
//! Every workflow failure is one of the variants below. Each variant maps to a
//! client-facing [`ErrorClass`] so callers can tell "fix the input and retry"
//! apart from "this action is not currently permitted".

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed or missing input (e.g. a non-positive quantity).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced order, invoice, request, stock item or ledger entry is absent.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A state machine edge that is not in the transition table.
    #[error("invalid {entity} transition from {from} to {to} for role {role}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
        role: String,
    },

    /// A debit larger than the quantity on hand.
    #[error("Insufficient stock for {item_kind}. Available: {available}, Requested: {requested}")]
    InsufficientStock {
        item_kind: String,
        available: i64,
        requested: i64,
    },

    /// A receipt that would take the received total past the expected quantity.
    #[error("received quantity would be {would_be}, exceeding the expected {expected}")]
    OverReceipt { would_be: i64, expected: i64 },

    /// Approval attempted before any receipt was recorded.
    #[error("stock item {0} has not been received yet")]
    NotReceived(String),

    /// A uniqueness rule was violated (second invoice for a source, reused order number).
    #[error("duplicate: {0}")]
    Duplicate(String),

    /// A stock or feed description could not be classified.
    #[error("unrecognised description: {0}")]
    Classification(String),

    /// The actor's role may not perform the action.
    #[error("role {role} may not {action}")]
    Unauthorized { role: String, action: &'static str },

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A conflict occurred (e.g. stale version / optimistic concurrency).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn duplicate(msg: impl Into<String>) -> Self {
        Self::Duplicate(msg.into())
    }

    pub fn classification(msg: impl Into<String>) -> Self {
        Self::Classification(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid_transition(
        entity: &'static str,
        from: impl ToString,
        to: impl ToString,
        role: impl ToString,
    ) -> Self {
        Self::InvalidTransition {
            entity,
            from: from.to_string(),
            to: to.to_string(),
            role: role.to_string(),
        }
    }

    pub fn unauthorized(role: impl ToString, action: &'static str) -> Self {
        Self::Unauthorized {
            role: role.to_string(),
            action,
        }
    }

    /// Client-facing class of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            DomainError::Validation(_)
            | DomainError::InvalidId(_)
            | DomainError::OverReceipt { .. }
            | DomainError::Classification(_) => ErrorClass::BadRequest,
            DomainError::NotFound { .. } => ErrorClass::NotFound,
            DomainError::InvalidTransition { .. }
            | DomainError::Duplicate(_)
            | DomainError::Conflict(_)
            | DomainError::InvariantViolation(_) => ErrorClass::Conflict,
            DomainError::InsufficientStock { .. } | DomainError::NotReceived(_) => {
                ErrorClass::PreconditionFailed
            }
            DomainError::Unauthorized { .. } => ErrorClass::Forbidden,
        }
    }
}

/// Client-facing error class.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    BadRequest,
    NotFound,
    Conflict,
    PreconditionFailed,
    Forbidden,
}

impl ErrorClass {
    pub fn http_status(self) -> u16 {
        match self {
            ErrorClass::BadRequest => 400,
            ErrorClass::Forbidden => 403,
            ErrorClass::NotFound => 404,
            ErrorClass::Conflict => 409,
            ErrorClass::PreconditionFailed => 412,
        }
    }

    /// Stable machine-readable code.
    pub fn code(self) -> &'static str {
        match self {
            ErrorClass::BadRequest => "bad_request",
            ErrorClass::Forbidden => "forbidden",
            ErrorClass::NotFound => "not_found",
            ErrorClass::Conflict => "conflict",
            ErrorClass::PreconditionFailed => "precondition_failed",
        }
    }
}
