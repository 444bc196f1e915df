use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use flockerp_core::{AggregateId, ExpectedVersion};
use std::sync::Arc;

/// An event ready to be appended to a stream (not yet assigned a sequence number).
///
/// ## Event Lifecycle
///
/// 1. **Domain event**: produced by an aggregate's `handle()`
/// 2. **UncommittedEvent**: serialized and wrapped with stream metadata
/// 3. **StoredEvent**: persisted with an assigned `sequence_number`
/// 4. **EventEnvelope**: published to the bus after commit
///
/// Build one with [`UncommittedEvent::from_typed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncommittedEvent {
    pub event_id: Uuid,
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

/// A stored event in an append-only stream (assigned a sequence number).
///
/// Sequence numbers are per stream, start at 1, have no gaps and never change.
/// The last sequence number of a stream is its version, which is what
/// optimistic concurrency compares against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event_id: Uuid,
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,

    /// Monotonically increasing position in the aggregate stream.
    pub sequence_number: u64,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

impl StoredEvent {
    pub fn stream_version(&self) -> u64 {
        self.sequence_number
    }

    /// Convert a stored event into an envelope for publication.
    pub fn to_envelope(&self) -> flockerp_events::EventEnvelope<JsonValue> {
        flockerp_events::EventEnvelope::new(
            self.event_id,
            self.aggregate_id,
            self.aggregate_type.clone(),
            self.event_type.clone(),
            self.sequence_number,
            self.payload.clone(),
        )
    }
}

/// Events for one stream inside a multi-stream commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamAppend {
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,
    pub expected_version: ExpectedVersion,
    pub events: Vec<UncommittedEvent>,
}

/// Event store operation error.
///
/// These are infrastructure errors, as opposed to domain errors.
///
/// - **Concurrency**: a stream moved past the version the writer loaded
/// - **AggregateTypeMismatch**: a stream was written as a different aggregate type
/// - **InvalidAppend**: malformed batch or corrupt stream
/// - **Unavailable**: the backend cannot serve the request (e.g. poisoned lock)
#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error("optimistic concurrency check failed on stream {aggregate_id}: expected {expected:?}, found {actual}")]
    Concurrency {
        aggregate_id: AggregateId,
        expected: ExpectedVersion,
        actual: u64,
    },

    #[error("aggregate type mismatch: {0}")]
    AggregateTypeMismatch(String),

    #[error("invalid append: {0}")]
    InvalidAppend(String),

    #[error("event store unavailable: {0}")]
    Unavailable(String),
}

impl EventStoreError {
    pub fn is_concurrency(&self) -> bool {
        matches!(self, EventStoreError::Concurrency { .. })
    }
}

/// Append-only event store with atomic multi-stream commits.
///
/// Events live in streams, one per aggregate instance, keyed by
/// `aggregate_id`. Within a stream, events have sequence numbers 1, 2, 3, ...
///
/// ## Commit Semantics
///
/// `commit()` receives one [`StreamAppend`] per touched stream and must:
/// - check every stream's `expected_version` against its current version
/// - reject the whole batch if any single check fails (nothing is written)
/// - assign sequence numbers starting at `current_version + 1` per stream
/// - make all appends visible together
///
/// This is the transaction boundary of the workflow engine. Checks and writes
/// happen under one exclusive section, so two writers that loaded the same
/// stream version cannot both commit.
///
/// ## Load Semantics
///
/// `load_stream()` returns the stream in sequence order, or an empty vector if
/// the stream does not exist yet.
pub trait EventStore: Send + Sync {
    /// Atomically append to several streams.
    fn commit(&self, appends: Vec<StreamAppend>) -> Result<Vec<StoredEvent>, EventStoreError>;

    /// Load the full stream of an aggregate.
    fn load_stream(&self, aggregate_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError>;

    /// Append a batch to a single stream.
    ///
    /// All events must target the same aggregate stream.
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let Some(first) = events.first() else {
            return Ok(vec![]);
        };
        let append = StreamAppend {
            aggregate_id: first.aggregate_id,
            aggregate_type: first.aggregate_type.clone(),
            expected_version,
            events,
        };
        self.commit(vec![append])
    }
}

impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    fn commit(&self, appends: Vec<StreamAppend>) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).commit(appends)
    }

    fn load_stream(&self, aggregate_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).load_stream(aggregate_id)
    }
}

impl UncommittedEvent {
    /// Convenience constructor from a typed domain event.
    ///
    /// Captures the event metadata needed to deserialize the payload later.
    pub fn from_typed<E>(
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        event_id: Uuid,
        event: &E,
    ) -> Result<Self, EventStoreError>
    where
        E: flockerp_events::Event + Serialize,
    {
        let payload = serde_json::to_value(event).map_err(|e| {
            EventStoreError::InvalidAppend(format!("payload serialization failed: {e}"))
        })?;

        Ok(Self {
            event_id,
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            event_type: event.event_type().to_string(),
            event_version: event.version(),
            occurred_at: event.occurred_at(),
            payload,
        })
    }
}
