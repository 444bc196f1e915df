use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use flockerp_approvals::RequestId;
use flockerp_auth::{Actor, Edge, Permission, Role, TransitionTable, authorize};
use flockerp_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId, money};
use flockerp_events::Event;
use flockerp_purchasing::PurchaseOrderId;

/// Invoice identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(pub AggregateId);

impl InvoiceId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Invoice status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Pending,
    ManagerApproved,
    Approved,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "PENDING",
            InvoiceStatus::ManagerApproved => "MANAGER_APPROVED",
            InvoiceStatus::Approved => "APPROVED",
            InvoiceStatus::Cancelled => "CANCELLED",
        }
    }
}

impl core::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub static INVOICE_TRANSITIONS: TransitionTable<InvoiceStatus> = TransitionTable::new(
    "invoice",
    &[
        Edge {
            from: &[InvoiceStatus::Pending],
            to: InvoiceStatus::ManagerApproved,
            roles: &[Role::Manager],
        },
        Edge {
            from: &[InvoiceStatus::ManagerApproved],
            to: InvoiceStatus::Approved,
            roles: &[Role::Executive],
        },
        Edge {
            from: &[InvoiceStatus::Pending, InvoiceStatus::ManagerApproved],
            to: InvoiceStatus::Cancelled,
            roles: &[Role::Manager, Role::Executive],
        },
    ],
);

/// Where an invoice came from. Provenance is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum InvoiceSource {
    Manual,
    Order(PurchaseOrderId),
    Request(RequestId),
}

impl InvoiceSource {
    pub fn order_id(&self) -> Option<PurchaseOrderId> {
        match self {
            InvoiceSource::Order(id) => Some(*id),
            _ => None,
        }
    }

    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            InvoiceSource::Request(id) => Some(*id),
            _ => None,
        }
    }
}

/// Invoice line, normalized from the source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub line_no: u32,
    pub description: String,
    pub quantity: i64,
    /// Price in smallest currency unit.
    pub unit_price: u64,
    pub total_price: u64,
}

impl InvoiceLine {
    pub fn new(description: impl Into<String>, quantity: i64, unit_price: u64) -> Self {
        Self {
            line_no: 0,
            description: description.into(),
            quantity,
            unit_price,
            total_price: 0,
        }
    }
}

/// Aggregate root: Invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    id: InvoiceId,
    invoice_number: String,
    invoice_date: Option<NaiveDate>,
    due_date: Option<NaiveDate>,
    source: InvoiceSource,
    status: InvoiceStatus,
    lines: Vec<InvoiceLine>,
    subtotal: u64,
    tax: u64,
    total: u64,
    notes: Option<String>,
    created_by: Option<UserId>,
    approved_by: Option<UserId>,
    version: u64,
    created: bool,
}

impl Invoice {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: InvoiceId) -> Self {
        Self {
            id,
            invoice_number: String::new(),
            invoice_date: None,
            due_date: None,
            source: InvoiceSource::Manual,
            status: InvoiceStatus::Pending,
            lines: Vec::new(),
            subtotal: 0,
            tax: 0,
            total: 0,
            notes: None,
            created_by: None,
            approved_by: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> InvoiceId {
        self.id
    }

    pub fn exists(&self) -> bool {
        self.created
    }

    pub fn invoice_number(&self) -> &str {
        &self.invoice_number
    }

    pub fn invoice_date(&self) -> Option<NaiveDate> {
        self.invoice_date
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    pub fn source(&self) -> InvoiceSource {
        self.source
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn lines(&self) -> &[InvoiceLine] {
        &self.lines
    }

    pub fn subtotal(&self) -> u64 {
        self.subtotal
    }

    pub fn tax(&self) -> u64 {
        self.tax
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn created_by(&self) -> Option<UserId> {
        self.created_by
    }

    pub fn approved_by(&self) -> Option<UserId> {
        self.approved_by
    }
}

impl AggregateRoot for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: IssueInvoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueInvoice {
    pub invoice_id: InvoiceId,
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    pub due_days: u32,
    pub source: InvoiceSource,
    pub lines: Vec<InvoiceLine>,
    pub tax: u64,
    pub notes: Option<String>,
    pub issued_by: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeInvoiceStatus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeInvoiceStatus {
    pub invoice_id: InvoiceId,
    pub to: InvoiceStatus,
    pub actor: Actor,
    pub comments: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceCommand {
    IssueInvoice(IssueInvoice),
    ChangeInvoiceStatus(ChangeInvoiceStatus),
}

/// Event: InvoiceIssued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceIssued {
    pub invoice_id: InvoiceId,
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub source: InvoiceSource,
    pub lines: Vec<InvoiceLine>,
    pub subtotal: u64,
    pub tax: u64,
    pub total: u64,
    pub notes: Option<String>,
    pub issued_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceStatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceStatusChanged {
    pub invoice_id: InvoiceId,
    pub from: InvoiceStatus,
    pub to: InvoiceStatus,
    pub changed_by: UserId,
    pub role: Role,
    pub comments: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceEvent {
    InvoiceIssued(InvoiceIssued),
    InvoiceStatusChanged(InvoiceStatusChanged),
}

impl Event for InvoiceEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InvoiceEvent::InvoiceIssued(_) => "invoicing.invoice.issued",
            InvoiceEvent::InvoiceStatusChanged(_) => "invoicing.invoice.status_changed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InvoiceEvent::InvoiceIssued(e) => e.occurred_at,
            InvoiceEvent::InvoiceStatusChanged(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Invoice {
    type Command = InvoiceCommand;
    type Event = InvoiceEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InvoiceEvent::InvoiceIssued(e) => {
                self.id = e.invoice_id;
                self.invoice_number = e.invoice_number.clone();
                self.invoice_date = Some(e.invoice_date);
                self.due_date = Some(e.due_date);
                self.source = e.source;
                self.lines = e.lines.clone();
                self.subtotal = e.subtotal;
                self.tax = e.tax;
                self.total = e.total;
                self.notes = e.notes.clone();
                self.created_by = Some(e.issued_by);
                self.status = InvoiceStatus::Pending;
                self.created = true;
            }
            InvoiceEvent::InvoiceStatusChanged(e) => {
                self.status = e.to;
                if matches!(e.to, InvoiceStatus::ManagerApproved | InvoiceStatus::Approved) {
                    self.approved_by = Some(e.changed_by);
                }
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            InvoiceCommand::IssueInvoice(cmd) => self.handle_issue(cmd),
            InvoiceCommand::ChangeInvoiceStatus(cmd) => self.handle_change_status(cmd),
        }
    }
}

impl Invoice {
    fn ensure_invoice_id(&self, invoice_id: InvoiceId) -> Result<(), DomainError> {
        if self.id != invoice_id {
            return Err(DomainError::invariant("invoice_id mismatch"));
        }
        Ok(())
    }

    fn handle_issue(&self, cmd: &IssueInvoice) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_invoice_id(cmd.invoice_id)?;
        authorize(&cmd.issued_by, Permission::GenerateInvoice)?;
        if self.created {
            return Err(DomainError::conflict("invoice already exists"));
        }
        if cmd.invoice_number.trim().is_empty() {
            return Err(DomainError::validation("invoice_number is required"));
        }
        if cmd.lines.is_empty() {
            return Err(DomainError::validation("cannot issue invoice without lines"));
        }

        // Line totals are never trusted from the caller.
        let mut lines = Vec::with_capacity(cmd.lines.len());
        for (idx, line) in cmd.lines.iter().enumerate() {
            if line.description.trim().is_empty() {
                return Err(DomainError::validation("invoice line description is required"));
            }
            lines.push(InvoiceLine {
                line_no: idx as u32 + 1,
                description: line.description.trim().to_string(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                total_price: money::line_total(line.quantity, line.unit_price)?,
            });
        }
        let subtotal = money::sum(lines.iter().map(|l| l.total_price))?;
        let total = money::sum([subtotal, cmd.tax])?;

        let due_date = cmd
            .invoice_date
            .checked_add_signed(Duration::days(i64::from(cmd.due_days)))
            .ok_or_else(|| DomainError::validation("due date out of range"))?;

        Ok(vec![InvoiceEvent::InvoiceIssued(InvoiceIssued {
            invoice_id: cmd.invoice_id,
            invoice_number: cmd.invoice_number.clone(),
            invoice_date: cmd.invoice_date,
            due_date,
            source: cmd.source,
            lines,
            subtotal,
            tax: cmd.tax,
            total,
            notes: cmd.notes.clone(),
            issued_by: cmd.issued_by.id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_status(
        &self,
        cmd: &ChangeInvoiceStatus,
    ) -> Result<Vec<InvoiceEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found("invoice", cmd.invoice_id));
        }
        self.ensure_invoice_id(cmd.invoice_id)?;
        INVOICE_TRANSITIONS.check(self.status, cmd.to, cmd.actor.role)?;

        Ok(vec![InvoiceEvent::InvoiceStatusChanged(InvoiceStatusChanged {
            invoice_id: cmd.invoice_id,
            from: self.status,
            to: cmd.to,
            changed_by: cmd.actor.id,
            role: cmd.actor.role,
            comments: cmd.comments.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}
