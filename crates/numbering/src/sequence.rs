use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use flockerp_core::{Aggregate, AggregateId, AggregateRoot, DomainError};
use flockerp_events::Event;

/// What a sequence numbers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceScope {
    Invoice,
    Request,
}

impl SequenceScope {
    pub fn as_str(self) -> &'static str {
        match self {
            SequenceScope::Invoice => "invoice",
            SequenceScope::Request => "request",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DailySequenceId(pub AggregateId);

impl DailySequenceId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }

    pub fn for_day(scope: SequenceScope, day: NaiveDate) -> Self {
        let key = format!("{}/{}", scope.as_str(), day.format("%Y-%m-%d"));
        Self(AggregateId::derived("numbering.sequence", &key))
    }
}

impl core::fmt::Display for DailySequenceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: DailySequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailySequence {
    id: DailySequenceId,
    last: u32,
    version: u64,
}

impl DailySequence {
    pub fn empty(id: DailySequenceId) -> Self {
        Self {
            id,
            last: 0,
            version: 0,
        }
    }

    /// Highest value handed out so far (0 when none).
    pub fn last(&self) -> u32 {
        self.last
    }
}

impl AggregateRoot for DailySequence {
    type Id = DailySequenceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: AllocateNext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocateNext {
    pub scope: SequenceScope,
    pub day: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequenceCommand {
    AllocateNext(AllocateNext),
}

/// Event: SequenceAllocated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceAllocated {
    pub sequence_id: DailySequenceId,
    pub scope: SequenceScope,
    pub day: NaiveDate,
    pub value: u32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequenceEvent {
    SequenceAllocated(SequenceAllocated),
}

impl Event for SequenceEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SequenceEvent::SequenceAllocated(_) => "numbering.sequence.allocated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SequenceEvent::SequenceAllocated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for DailySequence {
    type Command = SequenceCommand;
    type Event = SequenceEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SequenceEvent::SequenceAllocated(e) => {
                self.id = e.sequence_id;
                self.last = e.value;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            SequenceCommand::AllocateNext(cmd) => {
                if self.id != DailySequenceId::for_day(cmd.scope, cmd.day) {
                    return Err(DomainError::invariant("sequence id does not match scope and day"));
                }
                let value = self
                    .last
                    .checked_add(1)
                    .ok_or_else(|| DomainError::invariant("daily sequence exhausted"))?;
                Ok(vec![SequenceEvent::SequenceAllocated(SequenceAllocated {
                    sequence_id: self.id,
                    scope: cmd.scope,
                    day: cmd.day,
                    value,
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }
}
