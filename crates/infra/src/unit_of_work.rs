//! One atomic workflow step across several aggregates.
//!
//! ```text
//! load (history → aggregate, version remembered)
//!   ↓
//! execute (handle + apply, events staged)      ← repeated per aggregate
//!   ↓
//! commit (every touched stream checked against its loaded version, one write)
//! ```
//!
//! Nothing reaches the store before `commit`. Dropping a unit of work discards
//! everything it staged, which is how a failed step rolls back earlier steps
//! of the same operation.

use uuid::Uuid;

use flockerp_core::{AggregateId, ExpectedVersion};

use crate::error::WorkflowError;
use crate::event_store::{EventStore, EventStoreError, StoredEvent, StreamAppend, UncommittedEvent};
use crate::notify::Notification;
use crate::streams::Stream;

#[derive(Debug)]
struct TrackedStream {
    aggregate_id: AggregateId,
    aggregate_type: &'static str,
    expected: ExpectedVersion,
    staged: Vec<UncommittedEvent>,
}

/// Result of a successful commit.
#[derive(Debug, Default)]
pub struct Committed {
    pub events: Vec<StoredEvent>,
    pub notifications: Vec<Notification>,
}

#[derive(Debug)]
pub struct UnitOfWork<'a, S> {
    store: &'a S,
    streams: Vec<TrackedStream>,
    notifications: Vec<Notification>,
}

impl<'a, S> UnitOfWork<'a, S>
where
    S: EventStore,
{
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            streams: Vec::new(),
            notifications: Vec::new(),
        }
    }

    fn tracked(&self, aggregate_id: AggregateId) -> Option<&TrackedStream> {
        self.streams.iter().find(|t| t.aggregate_id == aggregate_id)
    }

    /// Load an aggregate, including anything this unit already staged for it.
    ///
    /// The first load of a stream fixes the version the commit will expect.
    pub fn load<A: Stream>(&mut self, aggregate_id: AggregateId) -> Result<A, WorkflowError> {
        let history = self.store.load_stream(aggregate_id)?;
        let mut aggregate = replay::<A>(aggregate_id, &history)?;

        if let Some(tracked) = self.tracked(aggregate_id) {
            for staged in &tracked.staged {
                apply_payload(&mut aggregate, &staged.payload)?;
            }
        } else {
            let loaded = history.last().map(|e| e.sequence_number).unwrap_or(0);
            self.streams.push(TrackedStream {
                aggregate_id,
                aggregate_type: A::AGGREGATE_TYPE,
                expected: ExpectedVersion::from_loaded(loaded),
                staged: Vec::new(),
            });
        }

        Ok(aggregate)
    }

    /// Decide and apply a command, staging the resulting events.
    pub fn execute<A: Stream>(
        &mut self,
        aggregate: &mut A,
        command: A::Command,
    ) -> Result<Vec<A::Event>, WorkflowError> {
        let aggregate_id = aggregate.stream_id();
        let before = flockerp_core::AggregateRoot::version(aggregate);
        let events = flockerp_events::execute(aggregate, &command)?;
        if events.is_empty() {
            return Ok(events);
        }

        let mut staged = Vec::with_capacity(events.len());
        for event in &events {
            staged.push(UncommittedEvent::from_typed(
                aggregate_id,
                A::AGGREGATE_TYPE,
                Uuid::now_v7(),
                event,
            )?);
        }

        match self.streams.iter_mut().find(|t| t.aggregate_id == aggregate_id) {
            Some(tracked) => tracked.staged.extend(staged),
            None => self.streams.push(TrackedStream {
                aggregate_id,
                aggregate_type: A::AGGREGATE_TYPE,
                expected: ExpectedVersion::from_loaded(before),
                staged,
            }),
        }

        Ok(events)
    }

    /// Queue a notification; it is sent only if the commit succeeds.
    pub fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    /// Number of events staged so far.
    pub fn staged_len(&self) -> usize {
        self.streams.iter().map(|t| t.staged.len()).sum()
    }

    /// Write every staged event in one atomic commit.
    ///
    /// Streams that were only read are not written; their versions are not
    /// re-checked.
    pub fn commit(self) -> Result<Committed, EventStoreError> {
        let appends: Vec<StreamAppend> = self
            .streams
            .into_iter()
            .filter(|t| !t.staged.is_empty())
            .map(|t| StreamAppend {
                aggregate_id: t.aggregate_id,
                aggregate_type: t.aggregate_type.to_string(),
                expected_version: t.expected,
                events: t.staged,
            })
            .collect();

        let events = if appends.is_empty() {
            Vec::new()
        } else {
            self.store.commit(appends)?
        };

        Ok(Committed {
            events,
            notifications: self.notifications,
        })
    }
}

/// Read-only load of an aggregate's current state.
pub fn load_aggregate<A, S>(store: &S, aggregate_id: AggregateId) -> Result<A, WorkflowError>
where
    A: Stream,
    S: EventStore,
{
    let history = store.load_stream(aggregate_id)?;
    replay(aggregate_id, &history)
}

fn replay<A: Stream>(aggregate_id: AggregateId, history: &[StoredEvent]) -> Result<A, WorkflowError> {
    let mut aggregate = A::blank(aggregate_id);
    let mut last = 0u64;
    for (idx, stored) in history.iter().enumerate() {
        if stored.aggregate_id != aggregate_id {
            return Err(WorkflowError::Rehydrate(format!(
                "stream {aggregate_id} returned an event of {} at index {idx}",
                stored.aggregate_id
            )));
        }
        if stored.aggregate_type != A::AGGREGATE_TYPE {
            return Err(WorkflowError::Rehydrate(format!(
                "stream {aggregate_id} holds '{}', expected '{}'",
                stored.aggregate_type,
                A::AGGREGATE_TYPE
            )));
        }
        if stored.sequence_number <= last {
            return Err(WorkflowError::Rehydrate(format!(
                "non-monotonic sequence_number in stream {aggregate_id} (last={last}, found={})",
                stored.sequence_number
            )));
        }
        last = stored.sequence_number;
        apply_payload(&mut aggregate, &stored.payload)?;
    }
    Ok(aggregate)
}

fn apply_payload<A: Stream>(
    aggregate: &mut A,
    payload: &serde_json::Value,
) -> Result<(), WorkflowError> {
    let event: A::Event = serde_json::from_value(payload.clone())
        .map_err(|e| WorkflowError::Rehydrate(e.to_string()))?;
    aggregate.apply(&event);
    Ok(())
}
