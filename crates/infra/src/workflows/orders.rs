//! OrderWorkflow operations.

use chrono::NaiveDate;
use serde_json::Value as JsonValue;
use tracing::{info, instrument};

use flockerp_auth::{Actor, Permission, Role, authorize};
use flockerp_core::DomainError;
use flockerp_events::{EventBus, EventEnvelope};
use flockerp_purchasing::{
    ChangeOrderStatus, CreatePurchaseOrder, OrderLine, OrderStatus, PurchaseOrder,
    PurchaseOrderCommand, PurchaseOrderId, SupplierDetails,
};

use crate::engine::Engine;
use crate::error::WorkflowError;
use crate::event_store::EventStore;
use crate::notify::Notification;

/// Input of [`Engine::create_order`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub order_number: String,
    /// Defaults to the engine clock's day.
    pub order_date: Option<NaiveDate>,
    pub supplier: SupplierDetails,
    pub lines: Vec<OrderLine>,
    /// What the client believes the total is; recomputed and overridden.
    pub claimed_total: Option<u64>,
}

fn transition_notices(order: &PurchaseOrder, reason: Option<&str>) -> Vec<Notification> {
    let number = order.order_number();
    match order.status() {
        OrderStatus::InProgress => vec![
            Notification::role(
                Role::Executive,
                format!("Order {number} is ready for final approval"),
            ),
            Notification::role(
                Role::Manager,
                format!("Order {number} is ready for final approval"),
            ),
            Notification::role(
                Role::OrderManager,
                format!("Order {number} was reviewed by accounting"),
            ),
        ],
        OrderStatus::Approved => vec![Notification::role(
            Role::OrderManager,
            format!("Order {number} was approved"),
        )],
        OrderStatus::Cancelled => vec![Notification::role(
            Role::OrderManager,
            match reason {
                Some(reason) => format!("Order {number} was cancelled: {reason}"),
                None => format!("Order {number} was cancelled"),
            },
        )],
        _ => Vec::new(),
    }
}

impl<S, B> Engine<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Create an order; line totals and the order total are recomputed.
    #[instrument(skip(self, actor, order), fields(order_number = %order.order_number, role = %actor.role))]
    pub fn create_order(
        &self,
        actor: &Actor,
        order: NewOrder,
    ) -> Result<PurchaseOrder, WorkflowError> {
        authorize(actor, Permission::CreateOrder)?;
        let order_id = PurchaseOrderId::for_number(&order.order_number);

        let created = self.transaction("create_order", |uow, now| {
            let mut aggregate: PurchaseOrder = uow.load(order_id.0)?;
            uow.execute(
                &mut aggregate,
                PurchaseOrderCommand::CreatePurchaseOrder(CreatePurchaseOrder {
                    order_id,
                    order_number: order.order_number.trim().to_string(),
                    order_date: order.order_date.unwrap_or_else(|| now.date_naive()),
                    supplier: order.supplier.clone(),
                    lines: order.lines.clone(),
                    claimed_total: order.claimed_total,
                    submitted_by: actor.id,
                    occurred_at: now,
                }),
            )?;
            uow.notify(Notification::role(
                Role::Accountant,
                format!(
                    "New order {} from {} awaiting review",
                    aggregate.order_number(),
                    aggregate.supplier().company_name
                ),
            ));
            Ok(aggregate)
        })?;

        info!(total = created.total_amount(), "order created");
        Ok(created)
    }

    /// Move an order along its transition table.
    #[instrument(skip(self, actor, reason), fields(role = %actor.role, to = %to))]
    pub fn transition_order(
        &self,
        actor: &Actor,
        order_number: &str,
        to: OrderStatus,
        reason: Option<String>,
    ) -> Result<PurchaseOrder, WorkflowError> {
        let order_id = PurchaseOrderId::for_number(order_number);

        let order = self.transaction("transition_order", |uow, now| {
            let mut order: PurchaseOrder = uow.load(order_id.0)?;
            if !order.exists() {
                return Err(DomainError::not_found("order", order_number).into());
            }
            uow.execute(
                &mut order,
                PurchaseOrderCommand::ChangeOrderStatus(ChangeOrderStatus {
                    order_id,
                    to,
                    actor: *actor,
                    reason: reason.clone(),
                    occurred_at: now,
                }),
            )?;
            for notice in transition_notices(&order, reason.as_deref()) {
                uow.notify(notice);
            }
            Ok(order)
        })?;

        info!(status = %order.status(), "order transitioned");
        Ok(order)
    }

    pub fn order(&self, order_number: &str) -> Result<PurchaseOrder, WorkflowError> {
        let order: PurchaseOrder = self.read(PurchaseOrderId::for_number(order_number).0)?;
        if !order.exists() {
            return Err(DomainError::not_found("order", order_number).into());
        }
        Ok(order)
    }
}
