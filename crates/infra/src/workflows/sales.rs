//! Customer chicken orders, each one debiting the ledger in the same commit.

use serde_json::Value as JsonValue;
use tracing::{info, instrument};

use flockerp_auth::{Actor, Permission, authorize};
use flockerp_core::{AggregateId, DomainError};
use flockerp_events::{EventBus, EventEnvelope};
use flockerp_sales::{
    ChangeChickenOrderQuantity, ChickenOrder, ChickenOrderCommand, ChickenOrderEvent,
    ChickenOrderId, CustomerDetails, PlaceChickenOrder,
};
use flockerp_stock::ItemKind;

use crate::engine::Engine;
use crate::error::WorkflowError;
use crate::event_store::EventStore;
use crate::notify::Notification;
use crate::workflows::ledger::{debit_in, load_entry_in, return_in};

/// Input of [`Engine::place_chicken_order`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChickenOrder {
    pub customer: CustomerDetails,
    pub item_kind: ItemKind,
    pub quantity: i64,
    /// Overrides the ledger's selling unit price.
    pub unit_price: Option<u64>,
}

impl<S, B> Engine<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    #[instrument(skip(self, actor, new), fields(role = %actor.role, item_kind = %new.item_kind))]
    pub fn place_chicken_order(
        &self,
        actor: &Actor,
        new: NewChickenOrder,
    ) -> Result<ChickenOrder, WorkflowError> {
        authorize(actor, Permission::SellStock)?;
        let order_id = ChickenOrderId::new(AggregateId::new());

        let order = self.transaction("place_chicken_order", |uow, now| {
            let entry = load_entry_in(uow, new.item_kind)?;
            if !entry.exists() {
                return Err(DomainError::not_found("stock ledger entry", new.item_kind).into());
            }
            let unit_price = new
                .unit_price
                .or(entry.selling_unit_price())
                .ok_or_else(|| {
                    DomainError::validation(format!(
                        "no selling price set for {}",
                        new.item_kind
                    ))
                })?;

            let mut order: ChickenOrder = uow.load(order_id.0)?;
            uow.execute(
                &mut order,
                ChickenOrderCommand::PlaceChickenOrder(PlaceChickenOrder {
                    order_id,
                    customer: new.customer.clone(),
                    item_kind: new.item_kind,
                    quantity: new.quantity,
                    unit_price,
                    placed_by: *actor,
                    occurred_at: now,
                }),
            )?;
            debit_in(uow, new.item_kind, new.quantity, now)?;

            if let Some(email) = &order.customer().email {
                uow.notify(Notification::Customer {
                    email: email.clone(),
                    order_ref: order_id.to_string(),
                    amount: order.total(),
                    name: Some(order.customer().name.clone()),
                });
            }
            Ok(order)
        })?;

        info!(order_id = %order_id, total = order.total(), "chicken order placed");
        Ok(order)
    }

    /// Change the quantity, moving only the difference through the ledger.
    #[instrument(skip(self, actor), fields(role = %actor.role))]
    pub fn change_chicken_order_quantity(
        &self,
        actor: &Actor,
        order_id: ChickenOrderId,
        quantity: i64,
    ) -> Result<ChickenOrder, WorkflowError> {
        authorize(actor, Permission::SellStock)?;

        let order = self.transaction("change_chicken_order_quantity", |uow, now| {
            let mut order: ChickenOrder = uow.load(order_id.0)?;
            if !order.exists() {
                return Err(DomainError::not_found("chicken order", order_id).into());
            }
            let events = uow.execute(
                &mut order,
                ChickenOrderCommand::ChangeChickenOrderQuantity(ChangeChickenOrderQuantity {
                    order_id,
                    quantity,
                    actor: *actor,
                    occurred_at: now,
                }),
            )?;

            let Some(item_kind) = order.item_kind() else {
                return Ok(order);
            };
            for event in &events {
                if let ChickenOrderEvent::ChickenOrderQuantityChanged(changed) = event {
                    let delta = changed.delta();
                    if delta > 0 {
                        debit_in(uow, item_kind, delta, now)?;
                    } else if delta < 0 {
                        return_in(uow, item_kind, -delta, now)?;
                    }
                }
            }
            Ok(order)
        })?;

        info!(quantity = order.quantity(), total = order.total(), "chicken order quantity changed");
        Ok(order)
    }

    pub fn chicken_order(&self, order_id: ChickenOrderId) -> Result<ChickenOrder, WorkflowError> {
        let order: ChickenOrder = self.read(order_id.0)?;
        if !order.exists() {
            return Err(DomainError::not_found("chicken order", order_id).into());
        }
        Ok(order)
    }
}
