//! StockLedger operations.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tracing::{info, instrument};

use flockerp_auth::{Actor, Permission, Role, authorize};
use flockerp_core::DomainError;
use flockerp_events::{EventBus, EventEnvelope};
use flockerp_stock::{
    CreditStock, DebitStock, ItemKind, LedgerDefaults, LedgerEntryId, PriceHints, ReturnStock,
    SetMinimumThreshold, SetPricing, StockLedgerCommand, StockLedgerEntry,
};

use crate::engine::Engine;
use crate::error::WorkflowError;
use crate::event_store::EventStore;
use crate::notify::Notification;
use crate::unit_of_work::UnitOfWork;

pub(crate) fn load_entry_in<S: EventStore>(
    uow: &mut UnitOfWork<'_, S>,
    item_kind: ItemKind,
) -> Result<StockLedgerEntry, WorkflowError> {
    uow.load(LedgerEntryId::for_kind(item_kind).0)
}

/// Credit, opening the entry with `defaults` if this is its first receipt.
pub(crate) fn credit_in<S: EventStore>(
    uow: &mut UnitOfWork<'_, S>,
    item_kind: ItemKind,
    quantity: i64,
    price_hints: PriceHints,
    defaults: LedgerDefaults,
    now: DateTime<Utc>,
) -> Result<StockLedgerEntry, WorkflowError> {
    let mut entry = load_entry_in(uow, item_kind)?;
    uow.execute(
        &mut entry,
        StockLedgerCommand::CreditStock(CreditStock {
            item_kind,
            quantity,
            price_hints,
            defaults,
            occurred_at: now,
        }),
    )?;
    Ok(entry)
}

/// Debit, alerting managers when the entry ends at or below its threshold.
pub(crate) fn debit_in<S: EventStore>(
    uow: &mut UnitOfWork<'_, S>,
    item_kind: ItemKind,
    quantity: i64,
    now: DateTime<Utc>,
) -> Result<StockLedgerEntry, WorkflowError> {
    let mut entry = load_entry_in(uow, item_kind)?;
    uow.execute(
        &mut entry,
        StockLedgerCommand::DebitStock(DebitStock {
            item_kind,
            quantity,
            occurred_at: now,
        }),
    )?;
    if entry.is_below_threshold() {
        uow.notify(Notification::role(
            Role::Manager,
            format!(
                "Low stock alert: {item_kind} is at {} (minimum {})",
                entry.on_hand(),
                entry.minimum_threshold()
            ),
        ));
    }
    Ok(entry)
}

pub(crate) fn return_in<S: EventStore>(
    uow: &mut UnitOfWork<'_, S>,
    item_kind: ItemKind,
    quantity: i64,
    now: DateTime<Utc>,
) -> Result<StockLedgerEntry, WorkflowError> {
    let mut entry = load_entry_in(uow, item_kind)?;
    uow.execute(
        &mut entry,
        StockLedgerCommand::ReturnStock(ReturnStock {
            item_kind,
            quantity,
            occurred_at: now,
        }),
    )?;
    Ok(entry)
}

impl<S, B> Engine<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Manual stock intake outside the receiving pipeline.
    #[instrument(skip(self, actor, price_hints), fields(role = %actor.role))]
    pub fn credit_stock(
        &self,
        actor: &Actor,
        item_kind: ItemKind,
        quantity: i64,
        price_hints: PriceHints,
    ) -> Result<StockLedgerEntry, WorkflowError> {
        authorize(actor, Permission::ManageLedger)?;
        let defaults = self.config().ledger_defaults();
        let entry = self.transaction("credit_stock", |uow, now| {
            credit_in(uow, item_kind, quantity, price_hints, defaults, now)
        })?;
        info!(on_hand = entry.on_hand(), "stock credited");
        Ok(entry)
    }

    #[instrument(skip(self, actor), fields(role = %actor.role))]
    pub fn debit_stock(
        &self,
        actor: &Actor,
        item_kind: ItemKind,
        quantity: i64,
    ) -> Result<StockLedgerEntry, WorkflowError> {
        authorize(actor, Permission::SellStock)?;
        let entry = self.transaction("debit_stock", |uow, now| {
            debit_in(uow, item_kind, quantity, now)
        })?;
        info!(on_hand = entry.on_hand(), "stock debited");
        Ok(entry)
    }

    /// Put returned stock back: on-hand goes up, total sold goes down.
    #[instrument(skip(self, actor), fields(role = %actor.role))]
    pub fn restock(
        &self,
        actor: &Actor,
        item_kind: ItemKind,
        quantity: i64,
    ) -> Result<StockLedgerEntry, WorkflowError> {
        authorize(actor, Permission::SellStock)?;
        let entry = self.transaction("restock", |uow, now| {
            return_in(uow, item_kind, quantity, now)
        })?;
        info!(on_hand = entry.on_hand(), "stock returned");
        Ok(entry)
    }

    #[instrument(skip(self, actor), fields(role = %actor.role))]
    pub fn set_minimum_threshold(
        &self,
        actor: &Actor,
        item_kind: ItemKind,
        value: i64,
    ) -> Result<StockLedgerEntry, WorkflowError> {
        authorize(actor, Permission::ManageLedger)?;
        self.transaction("set_minimum_threshold", |uow, now| {
            let mut entry = load_entry_in(uow, item_kind)?;
            uow.execute(
                &mut entry,
                StockLedgerCommand::SetMinimumThreshold(SetMinimumThreshold {
                    item_kind,
                    value,
                    occurred_at: now,
                }),
            )?;
            Ok(entry)
        })
    }

    #[instrument(skip(self, actor, price_hints), fields(role = %actor.role))]
    pub fn set_pricing(
        &self,
        actor: &Actor,
        item_kind: ItemKind,
        price_hints: PriceHints,
    ) -> Result<StockLedgerEntry, WorkflowError> {
        authorize(actor, Permission::ManageLedger)?;
        self.transaction("set_pricing", |uow, now| {
            let mut entry = load_entry_in(uow, item_kind)?;
            uow.execute(
                &mut entry,
                StockLedgerCommand::SetPricing(SetPricing {
                    item_kind,
                    price_hints,
                    occurred_at: now,
                }),
            )?;
            Ok(entry)
        })
    }

    /// The entry of `item_kind`; `NotFound` before its first receipt.
    pub fn ledger_entry(&self, item_kind: ItemKind) -> Result<StockLedgerEntry, WorkflowError> {
        let entry: StockLedgerEntry = self.read(LedgerEntryId::for_kind(item_kind).0)?;
        if !entry.exists() {
            return Err(DomainError::not_found("stock ledger entry", item_kind).into());
        }
        Ok(entry)
    }

    /// Entries with `on_hand <= minimum_threshold`, for low-stock alerts.
    pub fn list_below_threshold(&self) -> Result<Vec<StockLedgerEntry>, WorkflowError> {
        let mut below = Vec::new();
        for kind in ItemKind::ALL {
            let entry: StockLedgerEntry = self.read(LedgerEntryId::for_kind(kind).0)?;
            if entry.is_below_threshold() {
                below.push(entry);
            }
        }
        Ok(below)
    }
}
