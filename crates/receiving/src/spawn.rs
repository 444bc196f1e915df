//! Turning an invoiced order into receivable stock items.

use chrono::{DateTime, Utc};

use flockerp_core::{AggregateId, DomainError, DomainResult};
use flockerp_purchasing::{OrderLine, OrderStatus, PurchaseOrder};
use flockerp_stock::{FeedType, StockKind};

use crate::item::{CreateStockItem, StockItemId};

/// Decide the stock kind (and feed sub-type) of an order line.
///
/// An explicit kind on the line wins over the description heuristic. Lines that
/// match no kind are non-stock and yield `Ok(None)`. A feed line whose sub-type
/// cannot be resolved is a `Classification` error.
pub fn classify_line(line: &OrderLine) -> DomainResult<Option<(StockKind, Option<FeedType>)>> {
    let Some(kind) = line.kind.or_else(|| StockKind::classify(&line.description)) else {
        return Ok(None);
    };
    if kind != StockKind::Feed {
        return Ok(Some((kind, None)));
    }
    match line.feed_type.or_else(|| FeedType::classify(&line.description)) {
        Some(feed_type) => Ok(Some((kind, Some(feed_type)))),
        None => Err(DomainError::classification(format!(
            "feed type of order line '{}'",
            line.description
        ))),
    }
}

/// One `CreateStockItem` per receivable line of an approved, invoiced order.
///
/// Each item starts PENDING with the line's quantity and unit price. Ids are
/// derived from the order and line index.
pub fn plan_spawn(
    order: &PurchaseOrder,
    invoice_id: AggregateId,
    occurred_at: DateTime<Utc>,
) -> DomainResult<Vec<CreateStockItem>> {
    if !order.exists() {
        return Err(DomainError::not_found("order", order.id_typed()));
    }
    if order.status() != OrderStatus::Approved {
        return Err(DomainError::invariant(format!(
            "order {} is {}, stock can only be spawned from an approved order",
            order.order_number(),
            order.status()
        )));
    }
    if order.invoice_id() != Some(invoice_id) {
        return Err(DomainError::invariant(format!(
            "invoice {invoice_id} does not belong to order {}",
            order.order_number()
        )));
    }

    let mut planned = Vec::new();
    for (index, line) in order.lines().iter().enumerate() {
        let Some((kind, feed_type)) = classify_line(line)? else {
            continue;
        };
        let line_index = index as u32;
        planned.push(CreateStockItem {
            stock_item_id: StockItemId::for_line(order.id_typed(), line_index),
            order_id: order.id_typed(),
            invoice_id,
            line_index,
            description: line.description.clone(),
            kind,
            feed_type,
            expected_quantity: line.quantity,
            unit_price: line.unit_price,
            occurred_at,
        });
    }
    Ok(planned)
}
