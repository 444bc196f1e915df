//! InvoiceWorkflow operations.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value as JsonValue;
use tracing::{info, instrument};

use flockerp_approvals::{
    ApprovalDecision, ApprovalLog, ApprovalLogCommand, ApprovalLogId, ApprovalRecord,
    MarkRequestInvoiced, RecordApproval, Request, RequestCommand, RequestId,
};
use flockerp_auth::{Actor, Permission, Role, authorize};
use flockerp_core::{AggregateId, DomainError};
use flockerp_events::{EventBus, EventEnvelope};
use flockerp_invoicing::{
    ChangeInvoiceStatus, Invoice, InvoiceCommand, InvoiceId, InvoiceLine, InvoiceSource,
    InvoiceStatus, IssueInvoice,
};
use flockerp_numbering::{SequenceScope, format_invoice_number};
use flockerp_purchasing::{MarkInvoiced, PurchaseOrder, PurchaseOrderCommand, PurchaseOrderId};

use crate::engine::Engine;
use crate::error::WorkflowError;
use crate::event_store::EventStore;
use crate::notify::Notification;
use crate::unit_of_work::UnitOfWork;
use crate::workflows::allocate_number_in;
use crate::workflows::receiving::spawn_in;

/// Input of [`Engine::create_manual_invoice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualInvoice {
    pub lines: Vec<InvoiceLine>,
    pub tax: u64,
    pub notes: Option<String>,
    /// Defaults to the engine clock's day.
    pub invoice_date: Option<NaiveDate>,
}

struct Issue {
    invoice_id: InvoiceId,
    invoice_date: NaiveDate,
    source: InvoiceSource,
    lines: Vec<InvoiceLine>,
    tax: u64,
    notes: Option<String>,
}

impl<S, B> Engine<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Allocate the day's next invoice number and issue the invoice.
    fn issue_in(
        &self,
        uow: &mut UnitOfWork<'_, S>,
        issue: Issue,
        issued_by: Actor,
        now: DateTime<Utc>,
    ) -> Result<Invoice, WorkflowError> {
        let sequence = allocate_number_in(uow, SequenceScope::Invoice, issue.invoice_date, now)?;
        let invoice_number =
            format_invoice_number(&self.config().invoice_prefix, issue.invoice_date, sequence);

        let mut invoice: Invoice = uow.load(issue.invoice_id.0)?;
        uow.execute(
            &mut invoice,
            InvoiceCommand::IssueInvoice(IssueInvoice {
                invoice_id: issue.invoice_id,
                invoice_number,
                invoice_date: issue.invoice_date,
                due_days: self.config().invoice_due_days,
                source: issue.source,
                lines: issue.lines,
                tax: issue.tax,
                notes: issue.notes,
                issued_by,
                occurred_at: now,
            }),
        )?;
        uow.notify(Notification::role(
            Role::Manager,
            format!(
                "Invoice {} ({}) awaiting manager approval",
                invoice.invoice_number(),
                invoice.total()
            ),
        ));
        Ok(invoice)
    }

    /// Invoice an approved order. At most one invoice exists per order.
    #[instrument(skip(self, actor), fields(role = %actor.role))]
    pub fn generate_invoice_from_order(
        &self,
        actor: &Actor,
        order_number: &str,
        tax: u64,
    ) -> Result<Invoice, WorkflowError> {
        authorize(actor, Permission::GenerateInvoice)?;
        let order_id = PurchaseOrderId::for_number(order_number);
        let invoice_id = InvoiceId::new(AggregateId::new());

        let invoice = self.transaction("generate_invoice_from_order", |uow, now| {
            let mut order: PurchaseOrder = uow.load(order_id.0)?;
            if !order.exists() {
                return Err(DomainError::not_found("order", order_number).into());
            }
            // Recorded on the order stream: a concurrent second attempt conflicts here.
            uow.execute(
                &mut order,
                PurchaseOrderCommand::MarkInvoiced(MarkInvoiced {
                    order_id,
                    invoice_id: invoice_id.0,
                    actor: *actor,
                    occurred_at: now,
                }),
            )?;

            let lines = order
                .lines()
                .iter()
                .map(|l| InvoiceLine::new(l.description.clone(), l.quantity, l.unit_price))
                .collect();
            let issue = Issue {
                invoice_id,
                invoice_date: now.date_naive(),
                source: InvoiceSource::Order(order_id),
                lines,
                tax,
                notes: Some(format!("Generated from order {}", order.order_number())),
            };
            self.issue_in(uow, issue, *actor, now)
        })?;

        info!(invoice_number = invoice.invoice_number(), total = invoice.total(), "invoice generated from order");
        Ok(invoice)
    }

    /// Invoice an approved request, flipping it to INVOICED.
    #[instrument(skip(self, actor), fields(role = %actor.role))]
    pub fn generate_invoice_from_request(
        &self,
        actor: &Actor,
        request_id: RequestId,
    ) -> Result<Invoice, WorkflowError> {
        authorize(actor, Permission::GenerateInvoice)?;
        let invoice_id = InvoiceId::new(AggregateId::new());

        let invoice = self.transaction("generate_invoice_from_request", |uow, now| {
            let mut request: Request = uow.load(request_id.0)?;
            if !request.exists() {
                return Err(DomainError::not_found("request", request_id).into());
            }
            uow.execute(
                &mut request,
                RequestCommand::MarkRequestInvoiced(MarkRequestInvoiced {
                    request_id,
                    invoice_id: invoice_id.0,
                    actor: *actor,
                    occurred_at: now,
                }),
            )?;

            let lines = request
                .lines()
                .iter()
                .map(|l| InvoiceLine::new(l.description.clone(), l.quantity, l.unit_price))
                .collect();
            let issue = Issue {
                invoice_id,
                invoice_date: now.date_naive(),
                source: InvoiceSource::Request(request_id),
                lines,
                tax: 0,
                notes: Some(format!("Generated from request {}", request.request_number())),
            };
            self.issue_in(uow, issue, *actor, now)
        })?;

        info!(invoice_number = invoice.invoice_number(), total = invoice.total(), "invoice generated from request");
        Ok(invoice)
    }

    /// Invoice with caller-supplied lines and no source document.
    #[instrument(skip(self, actor, manual), fields(role = %actor.role))]
    pub fn create_manual_invoice(
        &self,
        actor: &Actor,
        manual: ManualInvoice,
    ) -> Result<Invoice, WorkflowError> {
        authorize(actor, Permission::GenerateInvoice)?;
        let invoice_id = InvoiceId::new(AggregateId::new());

        let invoice = self.transaction("create_manual_invoice", |uow, now| {
            let issue = Issue {
                invoice_id,
                invoice_date: manual.invoice_date.unwrap_or_else(|| now.date_naive()),
                source: InvoiceSource::Manual,
                lines: manual.lines.clone(),
                tax: manual.tax,
                notes: manual.notes.clone(),
            };
            self.issue_in(uow, issue, *actor, now)
        })?;

        info!(invoice_number = invoice.invoice_number(), total = invoice.total(), "manual invoice created");
        Ok(invoice)
    }

    /// Move an invoice along its transition table and log the decision.
    ///
    /// Reaching APPROVED spawns the stock items of the backing order in the
    /// same commit; if that fails, the approval fails too.
    #[instrument(skip(self, actor, comments), fields(role = %actor.role, to = %to))]
    pub fn transition_invoice(
        &self,
        actor: &Actor,
        invoice_id: InvoiceId,
        to: InvoiceStatus,
        comments: Option<String>,
    ) -> Result<Invoice, WorkflowError> {
        let invoice = self.transaction("transition_invoice", |uow, now| {
            let mut invoice: Invoice = uow.load(invoice_id.0)?;
            if !invoice.exists() {
                return Err(DomainError::not_found("invoice", invoice_id).into());
            }
            uow.execute(
                &mut invoice,
                InvoiceCommand::ChangeInvoiceStatus(ChangeInvoiceStatus {
                    invoice_id,
                    to,
                    actor: *actor,
                    comments: comments.clone(),
                    occurred_at: now,
                }),
            )?;

            // Audit record, after the status change it describes.
            let decision = match to {
                InvoiceStatus::Cancelled => ApprovalDecision::Rejected,
                _ => ApprovalDecision::Approved,
            };
            let log_id = ApprovalLogId::for_invoice(invoice_id.0);
            let mut log: ApprovalLog = uow.load(log_id.0)?;
            uow.execute(
                &mut log,
                ApprovalLogCommand::RecordApproval(RecordApproval {
                    invoice_id: invoice_id.0,
                    approver: *actor,
                    decision,
                    comments: comments.clone(),
                    occurred_at: now,
                }),
            )?;

            let number = invoice.invoice_number().to_string();
            match to {
                InvoiceStatus::ManagerApproved => uow.notify(Notification::role(
                    Role::Executive,
                    format!("Invoice {number} awaiting final approval"),
                )),
                InvoiceStatus::Approved => {
                    if let Some(order_id) = invoice.source().order_id() {
                        let mut order: PurchaseOrder = uow.load(order_id.0)?;
                        let items = spawn_in(uow, &mut order, now)?;
                        uow.notify(Notification::role(
                            Role::OrderManager,
                            format!(
                                "Invoice {number} approved: {} stock item(s) to receive for order {}",
                                items.len(),
                                order.order_number()
                            ),
                        ));
                    }
                    uow.notify(Notification::role(
                        Role::Accountant,
                        format!("Invoice {number} was approved"),
                    ));
                }
                InvoiceStatus::Cancelled => uow.notify(Notification::role(
                    Role::Accountant,
                    format!("Invoice {number} was cancelled"),
                )),
                InvoiceStatus::Pending => {}
            }
            Ok(invoice)
        })?;

        info!(invoice_number = invoice.invoice_number(), status = %invoice.status(), "invoice transitioned");
        Ok(invoice)
    }

    pub fn invoice(&self, invoice_id: InvoiceId) -> Result<Invoice, WorkflowError> {
        let invoice: Invoice = self.read(invoice_id.0)?;
        if !invoice.exists() {
            return Err(DomainError::not_found("invoice", invoice_id).into());
        }
        Ok(invoice)
    }

    /// Decisions recorded for an invoice, oldest first.
    pub fn approval_log(&self, invoice_id: InvoiceId) -> Result<Vec<ApprovalRecord>, WorkflowError> {
        let log: ApprovalLog = self.read(ApprovalLogId::for_invoice(invoice_id.0).0)?;
        Ok(log.records().to_vec())
    }
}
