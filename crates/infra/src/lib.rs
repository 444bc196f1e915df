//! Workflow engine: event store, unit of work, and the transactional
//! operations that compose the domain aggregates.

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod event_store;
pub mod notify;
pub mod streams;
pub mod unit_of_work;
pub mod workflows;

#[cfg(test)]
mod integration_tests;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::WorkflowError;
pub use event_store::{
    EventStore, EventStoreError, InMemoryEventStore, StoredEvent, StreamAppend, UncommittedEvent,
};
pub use notify::{Notification, Notifier, NotifyError, RecordingNotifier, TracingNotifier};
pub use streams::Stream;
pub use unit_of_work::{Committed, UnitOfWork, load_aggregate};
pub use workflows::invoices::ManualInvoice;
pub use workflows::orders::NewOrder;
pub use workflows::requests::NewRequest;
pub use workflows::sales::NewChickenOrder;
