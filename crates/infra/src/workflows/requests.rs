//! RequestWorkflow operations.

use chrono::NaiveDate;
use serde_json::Value as JsonValue;
use tracing::{info, instrument};

use flockerp_approvals::{
    ChangeRequestStatus, CreateRequest, EmployeeDetails, Request, RequestCommand, RequestId,
    RequestLine, RequestStatus,
};
use flockerp_auth::{Actor, Permission, Role, authorize};
use flockerp_core::{AggregateId, DomainError};
use flockerp_events::{EventBus, EventEnvelope};
use flockerp_numbering::{SequenceScope, format_request_number};

use crate::engine::Engine;
use crate::error::WorkflowError;
use crate::event_store::EventStore;
use crate::notify::Notification;
use crate::workflows::allocate_number_in;

/// Input of [`Engine::create_request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRequest {
    /// Defaults to the engine clock's day.
    pub request_date: Option<NaiveDate>,
    pub task_type: Option<String>,
    pub employee: EmployeeDetails,
    pub lines: Vec<RequestLine>,
    pub transaction_charges: u64,
}

impl<S, B> Engine<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// File an employee request numbered `YYYYMMDD-NNN` for its day.
    #[instrument(skip(self, actor, new), fields(role = %actor.role))]
    pub fn create_request(
        &self,
        actor: &Actor,
        new: NewRequest,
    ) -> Result<Request, WorkflowError> {
        authorize(actor, Permission::CreateRequest)?;
        let request_id = RequestId::new(AggregateId::new());

        let request = self.transaction("create_request", |uow, now| {
            let day = new.request_date.unwrap_or_else(|| now.date_naive());
            let sequence = allocate_number_in(uow, SequenceScope::Request, day, now)?;

            let mut request: Request = uow.load(request_id.0)?;
            uow.execute(
                &mut request,
                RequestCommand::CreateRequest(CreateRequest {
                    request_id,
                    request_number: format_request_number(day, sequence),
                    request_date: day,
                    task_type: new.task_type.clone(),
                    employee: new.employee.clone(),
                    lines: new.lines.clone(),
                    transaction_charges: new.transaction_charges,
                    created_by: actor.id,
                    occurred_at: now,
                }),
            )?;
            uow.notify(Notification::role(
                Role::Manager,
                format!(
                    "Request {} from {} awaiting approval ({})",
                    request.request_number(),
                    request.employee().name,
                    request.total()
                ),
            ));
            Ok(request)
        })?;

        info!(request_number = request.request_number(), total = request.total(), "request created");
        Ok(request)
    }

    /// Approve or reject a pending request.
    #[instrument(skip(self, actor, comments), fields(role = %actor.role, to = %to))]
    pub fn decide_request(
        &self,
        actor: &Actor,
        request_id: RequestId,
        to: RequestStatus,
        comments: Option<String>,
    ) -> Result<Request, WorkflowError> {
        let request = self.transaction("decide_request", |uow, now| {
            let mut request: Request = uow.load(request_id.0)?;
            if !request.exists() {
                return Err(DomainError::not_found("request", request_id).into());
            }
            uow.execute(
                &mut request,
                RequestCommand::ChangeRequestStatus(ChangeRequestStatus {
                    request_id,
                    to,
                    actor: *actor,
                    comments: comments.clone(),
                    occurred_at: now,
                }),
            )?;
            if to == RequestStatus::Approved {
                uow.notify(Notification::role(
                    Role::Accountant,
                    format!("Request {} approved, ready to invoice", request.request_number()),
                ));
            }
            Ok(request)
        })?;

        info!(request_number = request.request_number(), status = %request.status(), "request decided");
        Ok(request)
    }

    pub fn request(&self, request_id: RequestId) -> Result<Request, WorkflowError> {
        let request: Request = self.read(request_id.0)?;
        if !request.exists() {
            return Err(DomainError::not_found("request", request_id).into());
        }
        Ok(request)
    }
}
