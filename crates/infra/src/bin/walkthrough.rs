//! End-to-end run of the purchase → invoice → receive → sell chain against
//! the in-memory store. Configuration comes from `FLOCKERP_*` variables.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value as JsonValue;
use tracing::info;

use flockerp_auth::{Actor, Role};
use flockerp_core::UserId;
use flockerp_events::{EventBus, EventEnvelope, InMemoryEventBus};
use flockerp_infra::{Engine, EngineConfig, InMemoryEventStore, NewChickenOrder, NewOrder};
use flockerp_invoicing::InvoiceStatus;
use flockerp_purchasing::{OrderLine, OrderStatus, SupplierDetails};
use flockerp_sales::CustomerDetails;
use flockerp_stock::{ItemKind, PriceHints};

fn main() -> Result<()> {
    flockerp_observability::init();

    let bus = Arc::new(InMemoryEventBus::<EventEnvelope<JsonValue>>::new());
    let events = bus.subscribe();
    let engine = Engine::new(InMemoryEventStore::new(), bus, EngineConfig::from_env());

    let submitter = Actor::new(UserId::new(), Role::OrderManager);
    let accountant = Actor::new(UserId::new(), Role::Accountant);
    let manager = Actor::new(UserId::new(), Role::Manager);
    let executive = Actor::new(UserId::new(), Role::Executive);

    let order = engine
        .create_order(
            &submitter,
            NewOrder {
                order_number: "PO-1001".to_string(),
                order_date: None,
                supplier: SupplierDetails {
                    company_name: "Hillside Hatchery".to_string(),
                    ..SupplierDetails::default()
                },
                lines: vec![
                    OrderLine::new("Sasso chicks day-old", 500, 1_200),
                    OrderLine::new("Broiler starter feed", 20, 45_000),
                    OrderLine::new("Transport", 1, 30_000),
                ],
                claimed_total: None,
            },
        )
        .context("creating the purchase order")?;
    info!(order_number = order.order_number(), total = order.total_amount(), "order created");

    engine.transition_order(&accountant, "PO-1001", OrderStatus::InProgress, None)?;
    engine.transition_order(&executive, "PO-1001", OrderStatus::Approved, None)?;

    let invoice = engine
        .generate_invoice_from_order(&accountant, "PO-1001", 0)
        .context("invoicing the approved order")?;
    engine.transition_invoice(&manager, invoice.id_typed(), InvoiceStatus::ManagerApproved, None)?;
    engine.transition_invoice(&executive, invoice.id_typed(), InvoiceStatus::Approved, None)?;

    for item in engine.stock_items_for_order("PO-1001")? {
        engine.receive_stock(&submitter, item.id_typed(), item.expected_quantity(), None)?;
        let approved = engine.approve_stock(&accountant, item.id_typed())?;
        info!(
            description = approved.description(),
            kind = approved.kind().as_str(),
            quantity = approved.received_quantity(),
            "stock booked"
        );
    }

    engine.set_pricing(
        &manager,
        ItemKind::SassoChicks,
        PriceHints {
            selling_unit_price: Some(1_800),
            ..PriceHints::default()
        },
    )?;
    let sale = engine.place_chicken_order(
        &manager,
        NewChickenOrder {
            customer: CustomerDetails {
                name: "Amina".to_string(),
                email: Some("amina@example.com".to_string()),
                phone: None,
            },
            item_kind: ItemKind::SassoChicks,
            quantity: 120,
            unit_price: None,
        },
    )?;
    info!(total = sale.total(), "customer order placed");

    let entry = engine.ledger_entry(ItemKind::SassoChicks)?;
    info!(
        on_hand = entry.on_hand(),
        total_received = entry.total_received(),
        total_sold = entry.total_sold(),
        "final ledger"
    );
    info!(published = events.drain().len(), "events published");
    Ok(())
}
