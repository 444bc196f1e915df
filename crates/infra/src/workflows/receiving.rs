//! StockReceivingPipeline operations.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tracing::{info, instrument};

use flockerp_auth::{Actor, Permission, Role, authorize};
use flockerp_core::DomainError;
use flockerp_events::{EventBus, EventEnvelope};
use flockerp_invoicing::{Invoice, InvoiceStatus};
use flockerp_purchasing::{
    PurchaseOrder, PurchaseOrderCommand, PurchaseOrderId, RecordStockSpawned,
};
use flockerp_receiving::{
    ApproveStockItem, ReceiveStockItem, StockItem, StockItemCommand, StockItemId, plan_spawn,
};
use flockerp_stock::{
    FeedStockCommand, FeedStockRecord, FeedStockRecordId, LedgerDefaults, PriceHints,
    RecordFeedReceipt,
};

use crate::engine::Engine;
use crate::error::WorkflowError;
use crate::event_store::EventStore;
use crate::notify::Notification;
use crate::unit_of_work::UnitOfWork;
use crate::workflows::ledger::{credit_in, load_entry_in};

/// Create one PENDING stock item per receivable line of an invoiced order.
///
/// The order's invoice must already be APPROVED (staged in this unit of
/// work counts). Fails with `Duplicate` if the order already spawned its items.
pub(crate) fn spawn_in<S: EventStore>(
    uow: &mut UnitOfWork<'_, S>,
    order: &mut PurchaseOrder,
    now: DateTime<Utc>,
) -> Result<Vec<StockItem>, WorkflowError> {
    let order_id = order.id_typed();
    let invoice_id = order.invoice_id().ok_or_else(|| {
        DomainError::invariant(format!(
            "order {} has no invoice to receive stock against",
            order.order_number()
        ))
    })?;
    let invoice: Invoice = uow.load(invoice_id)?;
    if invoice.status() != InvoiceStatus::Approved {
        return Err(DomainError::invariant(format!(
            "invoice {} for order {} is {}, stock is received only against an approved invoice",
            invoice.invoice_number(),
            order.order_number(),
            invoice.status()
        ))
        .into());
    }
    let plan = plan_spawn(order, invoice_id, now)?;

    uow.execute(
        order,
        PurchaseOrderCommand::RecordStockSpawned(RecordStockSpawned {
            order_id,
            stock_item_ids: plan.iter().map(|c| c.stock_item_id.0).collect(),
            occurred_at: now,
        }),
    )?;

    let mut items = Vec::with_capacity(plan.len());
    for create in plan {
        let mut item: StockItem = uow.load(create.stock_item_id.0)?;
        uow.execute(&mut item, StockItemCommand::CreateStockItem(create))?;
        items.push(item);
    }
    Ok(items)
}

/// Approve a received item and book it: chicks into the ledger, feed into a
/// feed stock record.
pub(crate) fn approve_in<S: EventStore>(
    uow: &mut UnitOfWork<'_, S>,
    stock_item_id: StockItemId,
    approver: Actor,
    defaults: LedgerDefaults,
    now: DateTime<Utc>,
) -> Result<StockItem, WorkflowError> {
    let mut item: StockItem = uow.load(stock_item_id.0)?;
    if !item.exists() {
        return Err(DomainError::not_found("stock item", stock_item_id).into());
    }
    uow.execute(
        &mut item,
        StockItemCommand::ApproveStockItem(ApproveStockItem {
            stock_item_id,
            approver,
            occurred_at: now,
        }),
    )?;

    let quantity = item.received_quantity();
    let unit_price = item.unit_price();
    if let Some(item_kind) = item.kind().ledger_kind() {
        let entry = load_entry_in(uow, item_kind)?;
        let mut hints = PriceHints {
            buying_unit_price: Some(unit_price),
            ..PriceHints::default()
        };
        if !entry.exists() {
            let container_price = unit_price
                .checked_mul(defaults.units_per_container as u64)
                .ok_or_else(|| DomainError::validation("container price overflows"))?;
            hints.container_price = Some(container_price);
        }
        credit_in(uow, item_kind, quantity, hints, defaults, now)?;
    } else {
        let feed_type = item.feed_type().ok_or_else(|| {
            DomainError::classification(format!("feed type of '{}'", item.description()))
        })?;
        let record_id = FeedStockRecordId::for_stock_item(stock_item_id.0);
        let mut record: FeedStockRecord = uow.load(record_id.0)?;
        uow.execute(
            &mut record,
            FeedStockCommand::RecordFeedReceipt(RecordFeedReceipt {
                record_id,
                feed_type,
                quantity,
                price_per_unit: unit_price,
                source_stock_item: stock_item_id.0,
                occurred_at: now,
            }),
        )?;
    }

    uow.notify(Notification::role(
        Role::OrderManager,
        format!(
            "Stock '{}' approved: {quantity} units booked",
            item.description()
        ),
    ));
    Ok(item)
}

impl<S, B> Engine<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Spawn stock items for an approved, invoiced order.
    ///
    /// Invoice approval does this inside its own transaction; calling it
    /// directly afterwards fails with `Duplicate`. Before the invoice is
    /// APPROVED it fails with `InvariantViolation` and changes nothing.
    #[instrument(skip(self))]
    pub fn spawn_from_approved_order(
        &self,
        order_number: &str,
    ) -> Result<Vec<StockItem>, WorkflowError> {
        let order_id = PurchaseOrderId::for_number(order_number);
        self.transaction("spawn_from_approved_order", |uow, now| {
            let mut order: PurchaseOrder = uow.load(order_id.0)?;
            spawn_in(uow, &mut order, now)
        })
    }

    #[instrument(skip(self, receiver, notes), fields(role = %receiver.role))]
    pub fn receive_stock(
        &self,
        receiver: &Actor,
        stock_item_id: StockItemId,
        quantity: i64,
        notes: Option<String>,
    ) -> Result<StockItem, WorkflowError> {
        authorize(receiver, Permission::ReceiveStock)?;
        let item = self.transaction("receive_stock", |uow, now| {
            let mut item: StockItem = uow.load(stock_item_id.0)?;
            uow.execute(
                &mut item,
                StockItemCommand::ReceiveStockItem(ReceiveStockItem {
                    stock_item_id,
                    quantity,
                    receiver: *receiver,
                    notes: notes.clone(),
                    occurred_at: now,
                }),
            )?;
            uow.notify(Notification::role(
                Role::Accountant,
                format!(
                    "Stock '{}' received ({} of {}), awaiting approval",
                    item.description(),
                    item.received_quantity(),
                    item.expected_quantity()
                ),
            ));
            Ok(item)
        })?;
        info!(status = %item.status().as_str(), received = item.received_quantity(), "stock received");
        Ok(item)
    }

    #[instrument(skip(self, approver), fields(role = %approver.role))]
    pub fn approve_stock(
        &self,
        approver: &Actor,
        stock_item_id: StockItemId,
    ) -> Result<StockItem, WorkflowError> {
        authorize(approver, Permission::ApproveStock)?;
        let defaults = self.config().ledger_defaults();
        let item = self.transaction("approve_stock", |uow, now| {
            approve_in(uow, stock_item_id, *approver, defaults, now)
        })?;
        info!(kind = item.kind().as_str(), quantity = item.received_quantity(), "stock approved");
        Ok(item)
    }

    pub fn stock_item(&self, stock_item_id: StockItemId) -> Result<StockItem, WorkflowError> {
        let item: StockItem = self.read(stock_item_id.0)?;
        if !item.exists() {
            return Err(DomainError::not_found("stock item", stock_item_id).into());
        }
        Ok(item)
    }

    /// Stock items spawned for an order, in line order.
    pub fn stock_items_for_order(
        &self,
        order_number: &str,
    ) -> Result<Vec<StockItem>, WorkflowError> {
        let order = self.order(order_number)?;
        order
            .stock_item_ids()
            .iter()
            .map(|id| self.stock_item(StockItemId(*id)))
            .collect()
    }

    /// Feed stock booked by approving `stock_item_id`.
    pub fn feed_record(&self, stock_item_id: StockItemId) -> Result<FeedStockRecord, WorkflowError> {
        let record_id = FeedStockRecordId::for_stock_item(stock_item_id.0);
        let record: FeedStockRecord = self.read(record_id.0)?;
        if !record.exists() {
            return Err(DomainError::not_found("feed stock record", record_id.0).into());
        }
        Ok(record)
    }
}

