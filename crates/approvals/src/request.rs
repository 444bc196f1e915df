use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use flockerp_auth::{Actor, Edge, Role, TransitionTable};
use flockerp_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId, money};
use flockerp_events::Event;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub AggregateId);

impl RequestId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for RequestId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Invoiced,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::Approved => "APPROVED",
            RequestStatus::Rejected => "REJECTED",
            RequestStatus::Invoiced => "INVOICED",
        }
    }
}

impl core::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub static REQUEST_TRANSITIONS: TransitionTable<RequestStatus> = TransitionTable::new(
    "request",
    &[
        Edge {
            from: &[RequestStatus::Pending],
            to: RequestStatus::Approved,
            roles: &[Role::Manager, Role::Executive],
        },
        Edge {
            from: &[RequestStatus::Pending],
            to: RequestStatus::Rejected,
            roles: &[Role::Manager, Role::Executive],
        },
        Edge {
            from: &[RequestStatus::Approved],
            to: RequestStatus::Invoiced,
            roles: &[Role::Accountant, Role::Admin],
        },
    ],
);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeDetails {
    pub name: String,
    pub title: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestLine {
    pub item_number: u32,
    pub description: String,
    pub quantity: i64,
    pub unit_price: u64,
    pub total_price: u64,
}

impl RequestLine {
    pub fn new(description: impl Into<String>, quantity: i64, unit_price: u64) -> Self {
        Self {
            item_number: 0,
            description: description.into(),
            quantity,
            unit_price,
            total_price: 0,
        }
    }
}

/// Aggregate root: Request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    id: RequestId,
    request_number: String,
    request_date: Option<NaiveDate>,
    task_type: Option<String>,
    employee: EmployeeDetails,
    lines: Vec<RequestLine>,
    subtotal: u64,
    transaction_charges: u64,
    total: u64,
    status: RequestStatus,
    created_by: Option<UserId>,
    decided_by: Option<UserId>,
    invoice_id: Option<AggregateId>,
    version: u64,
    created: bool,
}

impl Request {
    pub fn empty(id: RequestId) -> Self {
        Self {
            id,
            request_number: String::new(),
            request_date: None,
            task_type: None,
            employee: EmployeeDetails::default(),
            lines: Vec::new(),
            subtotal: 0,
            transaction_charges: 0,
            total: 0,
            status: RequestStatus::Pending,
            created_by: None,
            decided_by: None,
            invoice_id: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> RequestId {
        self.id
    }

    pub fn exists(&self) -> bool {
        self.created
    }

    pub fn request_number(&self) -> &str {
        &self.request_number
    }

    pub fn request_date(&self) -> Option<NaiveDate> {
        self.request_date
    }

    pub fn task_type(&self) -> Option<&str> {
        self.task_type.as_deref()
    }

    pub fn employee(&self) -> &EmployeeDetails {
        &self.employee
    }

    pub fn lines(&self) -> &[RequestLine] {
        &self.lines
    }

    pub fn subtotal(&self) -> u64 {
        self.subtotal
    }

    pub fn transaction_charges(&self) -> u64 {
        self.transaction_charges
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn status(&self) -> RequestStatus {
        self.status
    }

    pub fn created_by(&self) -> Option<UserId> {
        self.created_by
    }

    pub fn decided_by(&self) -> Option<UserId> {
        self.decided_by
    }

    pub fn invoice_id(&self) -> Option<AggregateId> {
        self.invoice_id
    }
}

impl AggregateRoot for Request {
    type Id = RequestId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateRequest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRequest {
    pub request_id: RequestId,
    pub request_number: String,
    pub request_date: NaiveDate,
    pub task_type: Option<String>,
    pub employee: EmployeeDetails,
    pub lines: Vec<RequestLine>,
    pub transaction_charges: u64,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeRequestStatus (approve or reject).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequestStatus {
    pub request_id: RequestId,
    pub to: RequestStatus,
    pub actor: Actor,
    pub comments: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkRequestInvoiced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkRequestInvoiced {
    pub request_id: RequestId,
    pub invoice_id: AggregateId,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestCommand {
    CreateRequest(CreateRequest),
    ChangeRequestStatus(ChangeRequestStatus),
    MarkRequestInvoiced(MarkRequestInvoiced),
}

/// Event: RequestCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCreated {
    pub request_id: RequestId,
    pub request_number: String,
    pub request_date: NaiveDate,
    pub task_type: Option<String>,
    pub employee: EmployeeDetails,
    pub lines: Vec<RequestLine>,
    pub subtotal: u64,
    pub transaction_charges: u64,
    pub total: u64,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RequestStatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestStatusChanged {
    pub request_id: RequestId,
    pub from: RequestStatus,
    pub to: RequestStatus,
    pub changed_by: UserId,
    pub role: Role,
    pub comments: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RequestInvoiced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestInvoiced {
    pub request_id: RequestId,
    pub invoice_id: AggregateId,
    pub invoiced_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestEvent {
    RequestCreated(RequestCreated),
    RequestStatusChanged(RequestStatusChanged),
    RequestInvoiced(RequestInvoiced),
}

impl Event for RequestEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RequestEvent::RequestCreated(_) => "approvals.request.created",
            RequestEvent::RequestStatusChanged(_) => "approvals.request.status_changed",
            RequestEvent::RequestInvoiced(_) => "approvals.request.invoiced",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            RequestEvent::RequestCreated(e) => e.occurred_at,
            RequestEvent::RequestStatusChanged(e) => e.occurred_at,
            RequestEvent::RequestInvoiced(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Request {
    type Command = RequestCommand;
    type Event = RequestEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            RequestEvent::RequestCreated(e) => {
                self.id = e.request_id;
                self.request_number = e.request_number.clone();
                self.request_date = Some(e.request_date);
                self.task_type = e.task_type.clone();
                self.employee = e.employee.clone();
                self.lines = e.lines.clone();
                self.subtotal = e.subtotal;
                self.transaction_charges = e.transaction_charges;
                self.total = e.total;
                self.status = RequestStatus::Pending;
                self.created_by = Some(e.created_by);
                self.created = true;
            }
            RequestEvent::RequestStatusChanged(e) => {
                self.status = e.to;
                self.decided_by = Some(e.changed_by);
            }
            RequestEvent::RequestInvoiced(e) => {
                self.status = RequestStatus::Invoiced;
                self.invoice_id = Some(e.invoice_id);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            RequestCommand::CreateRequest(cmd) => self.handle_create(cmd),
            RequestCommand::ChangeRequestStatus(cmd) => self.handle_change_status(cmd),
            RequestCommand::MarkRequestInvoiced(cmd) => self.handle_mark_invoiced(cmd),
        }
    }
}

impl Request {
    fn ensure_request_id(&self, request_id: RequestId) -> Result<(), DomainError> {
        if self.id != request_id {
            return Err(DomainError::invariant("request_id mismatch"));
        }
        Ok(())
    }

    fn ensure_created(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found("request", self.id));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateRequest) -> Result<Vec<RequestEvent>, DomainError> {
        self.ensure_request_id(cmd.request_id)?;
        if self.created {
            return Err(DomainError::duplicate(format!(
                "request {} already exists",
                cmd.request_id
            )));
        }
        if cmd.employee.name.trim().is_empty() {
            return Err(DomainError::validation("employee name is required"));
        }
        if cmd.lines.is_empty() {
            return Err(DomainError::validation("a request needs at least one item"));
        }

        let mut lines = Vec::with_capacity(cmd.lines.len());
        for (idx, line) in cmd.lines.iter().enumerate() {
            if line.description.trim().is_empty() {
                return Err(DomainError::validation("item description is required"));
            }
            lines.push(RequestLine {
                item_number: idx as u32 + 1,
                description: line.description.trim().to_string(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                total_price: money::line_total(line.quantity, line.unit_price)?,
            });
        }
        let subtotal = money::sum(lines.iter().map(|l| l.total_price))?;
        let total = money::sum([subtotal, cmd.transaction_charges])?;

        Ok(vec![RequestEvent::RequestCreated(RequestCreated {
            request_id: cmd.request_id,
            request_number: cmd.request_number.clone(),
            request_date: cmd.request_date,
            task_type: cmd.task_type.clone(),
            employee: cmd.employee.clone(),
            lines,
            subtotal,
            transaction_charges: cmd.transaction_charges,
            total,
            created_by: cmd.created_by,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_status(
        &self,
        cmd: &ChangeRequestStatus,
    ) -> Result<Vec<RequestEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_request_id(cmd.request_id)?;
        if cmd.to == RequestStatus::Invoiced {
            return Err(DomainError::validation(
                "requests become INVOICED only through invoice generation",
            ));
        }
        REQUEST_TRANSITIONS.check(self.status, cmd.to, cmd.actor.role)?;

        Ok(vec![RequestEvent::RequestStatusChanged(RequestStatusChanged {
            request_id: cmd.request_id,
            from: self.status,
            to: cmd.to,
            changed_by: cmd.actor.id,
            role: cmd.actor.role,
            comments: cmd.comments.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_invoiced(
        &self,
        cmd: &MarkRequestInvoiced,
    ) -> Result<Vec<RequestEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_request_id(cmd.request_id)?;

        // A request feeds exactly one invoice.
        if self.status == RequestStatus::Invoiced {
            return Err(DomainError::duplicate(format!(
                "request {} is already invoiced",
                self.request_number
            )));
        }
        REQUEST_TRANSITIONS.check(self.status, RequestStatus::Invoiced, cmd.actor.role)?;

        Ok(vec![RequestEvent::RequestInvoiced(RequestInvoiced {
            request_id: cmd.request_id,
            invoice_id: cmd.invoice_id,
            invoiced_by: cmd.actor.id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flockerp_events::execute;

    fn test_request_id() -> RequestId {
        RequestId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn actor(role: Role) -> Actor {
        Actor::new(UserId::new(), role)
    }

    fn created_request(id: RequestId) -> Request {
        let mut request = Request::empty(id);
        execute(
            &mut request,
            &RequestCommand::CreateRequest(CreateRequest {
                request_id: id,
                request_number: "20261016-001".to_string(),
                request_date: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
                task_type: Some("Services".to_string()),
                employee: EmployeeDetails {
                    name: "Field Officer".to_string(),
                    ..EmployeeDetails::default()
                },
                lines: vec![
                    RequestLine::new("Fuel", 2, 30_000),
                    RequestLine::new("Vaccines", 1, 45_000),
                ],
                transaction_charges: 1_500,
                created_by: UserId::new(),
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        request
    }

    fn decide(id: RequestId, to: RequestStatus, role: Role) -> RequestCommand {
        RequestCommand::ChangeRequestStatus(ChangeRequestStatus {
            request_id: id,
            to,
            actor: actor(role),
            comments: None,
            occurred_at: test_time(),
        })
    }

    fn invoice(id: RequestId) -> RequestCommand {
        RequestCommand::MarkRequestInvoiced(MarkRequestInvoiced {
            request_id: id,
            invoice_id: AggregateId::new(),
            actor: actor(Role::Accountant),
            occurred_at: test_time(),
        })
    }

    #[test]
    fn create_numbers_items_and_computes_totals() {
        let request = created_request(test_request_id());
        assert_eq!(request.subtotal(), 105_000);
        assert_eq!(request.total(), 106_500);
        assert_eq!(request.lines()[1].item_number, 2);
        assert_eq!(request.status(), RequestStatus::Pending);
    }

    #[test]
    fn manager_or_executive_decides() {
        let id = test_request_id();
        let mut request = created_request(id);
        assert!(matches!(
            request.handle(&decide(id, RequestStatus::Approved, Role::Accountant)),
            Err(DomainError::InvalidTransition { .. })
        ));
        execute(&mut request, &decide(id, RequestStatus::Rejected, Role::Executive)).unwrap();
        assert_eq!(request.status(), RequestStatus::Rejected);
        assert!(REQUEST_TRANSITIONS.is_terminal(RequestStatus::Rejected));
    }

    #[test]
    fn pending_request_cannot_be_invoiced() {
        let id = test_request_id();
        let request = created_request(id);
        assert!(matches!(
            request.handle(&invoice(id)),
            Err(DomainError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn second_invoice_is_duplicate() {
        let id = test_request_id();
        let mut request = created_request(id);
        execute(&mut request, &decide(id, RequestStatus::Approved, Role::Manager)).unwrap();
        execute(&mut request, &invoice(id)).unwrap();
        assert_eq!(request.status(), RequestStatus::Invoiced);

        let err = request.handle(&invoice(id)).unwrap_err();
        assert!(matches!(err, DomainError::Duplicate(_)));
    }

    #[test]
    fn invoiced_cannot_be_set_directly() {
        let id = test_request_id();
        let mut request = created_request(id);
        execute(&mut request, &decide(id, RequestStatus::Approved, Role::Manager)).unwrap();
        assert!(matches!(
            request.handle(&decide(id, RequestStatus::Invoiced, Role::Accountant)),
            Err(DomainError::Validation(_))
        ));
    }
}
