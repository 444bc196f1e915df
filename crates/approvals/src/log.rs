//! Append-only audit trail of invoice decisions.
//!
//! The log records decisions; it never changes an invoice. The workflow engine
//! appends here in the same commit as the invoice's status change, after it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use flockerp_auth::{Actor, Role};
use flockerp_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId};
use flockerp_events::Event;

/// One log per invoice.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApprovalLogId(pub AggregateId);

impl ApprovalLogId {
    pub fn for_invoice(invoice_id: AggregateId) -> Self {
        Self(AggregateId::derived("approvals.log", &invoice_id.to_string()))
    }
}

impl core::fmt::Display for ApprovalLogId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalDecision {
    Approved,
    Rejected,
}

/// Immutable record of one decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub invoice_id: AggregateId,
    pub approver_id: UserId,
    pub approver_role: Role,
    pub decision: ApprovalDecision,
    pub comments: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Aggregate root: ApprovalLog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalLog {
    id: ApprovalLogId,
    records: Vec<ApprovalRecord>,
    version: u64,
}

impl ApprovalLog {
    pub fn empty(id: ApprovalLogId) -> Self {
        Self {
            id,
            records: Vec::new(),
            version: 0,
        }
    }

    pub fn records(&self) -> &[ApprovalRecord] {
        &self.records
    }
}

impl AggregateRoot for ApprovalLog {
    type Id = ApprovalLogId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RecordApproval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordApproval {
    pub invoice_id: AggregateId,
    pub approver: Actor,
    pub decision: ApprovalDecision,
    pub comments: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalLogCommand {
    RecordApproval(RecordApproval),
}

/// Event: ApprovalRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRecorded {
    pub log_id: ApprovalLogId,
    pub record: ApprovalRecord,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalLogEvent {
    ApprovalRecorded(ApprovalRecorded),
}

impl Event for ApprovalLogEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ApprovalLogEvent::ApprovalRecorded(_) => "approvals.log.recorded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ApprovalLogEvent::ApprovalRecorded(e) => e.record.recorded_at,
        }
    }
}

impl Aggregate for ApprovalLog {
    type Command = ApprovalLogCommand;
    type Event = ApprovalLogEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ApprovalLogEvent::ApprovalRecorded(e) => {
                self.id = e.log_id;
                self.records.push(e.record.clone());
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ApprovalLogCommand::RecordApproval(cmd) => {
                if self.id != ApprovalLogId::for_invoice(cmd.invoice_id) {
                    return Err(DomainError::invariant("approval log does not belong to invoice"));
                }
                if !matches!(cmd.approver.role, Role::Manager | Role::Executive) {
                    return Err(DomainError::unauthorized(
                        cmd.approver.role,
                        "record invoice decisions",
                    ));
                }
                Ok(vec![ApprovalLogEvent::ApprovalRecorded(ApprovalRecorded {
                    log_id: self.id,
                    record: ApprovalRecord {
                        invoice_id: cmd.invoice_id,
                        approver_id: cmd.approver.id,
                        approver_role: cmd.approver.role,
                        decision: cmd.decision,
                        comments: cmd.comments.clone(),
                        recorded_at: cmd.occurred_at,
                    },
                })])
            }
        }
    }
}
