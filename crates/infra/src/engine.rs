//! Workflow engine: every public operation is one retried transaction.
//!
//! ```text
//! attempt:
//!   UnitOfWork::new
//!     ↓
//!   body (load aggregates, execute commands, queue notifications)
//!     ↓
//!   commit ── conflict ──→ next attempt (fresh load, fresh decision)
//!     ↓ ok
//!   publish committed events, deliver notifications (both best-effort)
//! ```
//!
//! A conflict means another writer moved one of the touched streams after
//! this attempt loaded it. Re-running the body decides again against the new
//! state, so a debit that raced another debit re-checks on-hand quantity and
//! a second invoice for the same source sees the first one and fails with
//! `Duplicate`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use flockerp_core::AggregateId;
use flockerp_events::{EventBus, EventEnvelope};

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::WorkflowError;
use crate::event_store::{EventStore, StoredEvent};
use crate::notify::{Notification, Notifier, TracingNotifier};
use crate::streams::Stream;
use crate::unit_of_work::{UnitOfWork, load_aggregate};

pub struct Engine<S, B> {
    store: S,
    bus: B,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl<S, B> Engine<S, B> {
    pub fn new(store: S, bus: B, config: EngineConfig) -> Self {
        Self {
            store,
            bus,
            notifier: Arc::new(TracingNotifier),
            clock: Arc::new(SystemClock),
            config,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn into_parts(self) -> (S, B) {
        (self.store, self.bus)
    }
}

impl<S, B> Engine<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Run `body` until its unit of work commits without conflict.
    ///
    /// Domain errors from `body` abort immediately; nothing it staged is
    /// written.
    pub(crate) fn transaction<T>(
        &self,
        operation: &'static str,
        mut body: impl FnMut(&mut UnitOfWork<'_, S>, DateTime<Utc>) -> Result<T, WorkflowError>,
    ) -> Result<T, WorkflowError> {
        let attempts = self.config.max_conflict_retries.saturating_add(1);
        for attempt in 1..=attempts {
            let mut uow = UnitOfWork::new(&self.store);
            let value = body(&mut uow, self.clock.now())?;

            match uow.commit() {
                Ok(committed) => {
                    self.publish(&committed.events);
                    self.deliver(&committed.notifications);
                    return Ok(value);
                }
                Err(err) if err.is_concurrency() => {
                    debug!(operation, attempt, error = %err, "commit lost an optimistic race, retrying");
                }
                Err(err) => return Err(WorkflowError::Store(err)),
            }
        }

        warn!(operation, attempts, "giving up after repeated conflicts");
        Err(WorkflowError::Contention {
            operation,
            attempts,
        })
    }

    /// Current state of one aggregate, outside any transaction.
    pub(crate) fn read<A: Stream>(&self, aggregate_id: AggregateId) -> Result<A, WorkflowError> {
        load_aggregate(&self.store, aggregate_id)
    }

    fn publish(&self, events: &[StoredEvent]) {
        for stored in events {
            if let Err(err) = self.bus.publish(stored.to_envelope()) {
                warn!(
                    event_type = %stored.event_type,
                    aggregate_id = %stored.aggregate_id,
                    error = %err,
                    "failed to publish committed event"
                );
            }
        }
    }

    fn deliver(&self, notifications: &[Notification]) {
        for notification in notifications {
            if let Err(err) = self.notifier.deliver(notification) {
                warn!(error = %err, ?notification, "dropping undeliverable notification");
            }
        }
    }
}
