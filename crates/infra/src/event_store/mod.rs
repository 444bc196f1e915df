//! Append-only event store boundary.
//!
//! An infrastructure-facing abstraction for storing and loading event streams
//! without making storage assumptions. The workflow engine relies on
//! [`EventStore::commit`] being atomic across streams.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, StreamAppend, UncommittedEvent};
