//! `flockerp-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! the aggregate contract, strongly-typed identifiers and the error taxonomy
//! shared by every workflow.

pub mod aggregate;
pub mod error;
pub mod id;
pub mod money;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult, ErrorClass};
pub use id::{AggregateId, UserId};
