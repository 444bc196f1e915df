//! Binding between domain aggregates and their event streams.

use serde::Serialize;
use serde::de::DeserializeOwned;

use flockerp_approvals::{ApprovalLog, ApprovalLogId, Request, RequestId};
use flockerp_core::{Aggregate, AggregateId, AggregateRoot, DomainError};
use flockerp_events::Event;
use flockerp_invoicing::{Invoice, InvoiceId};
use flockerp_numbering::{DailySequence, DailySequenceId};
use flockerp_purchasing::{PurchaseOrder, PurchaseOrderId};
use flockerp_receiving::{StockItem, StockItemId};
use flockerp_sales::{ChickenOrder, ChickenOrderId};
use flockerp_stock::{FeedStockRecord, FeedStockRecordId, LedgerEntryId, StockLedgerEntry};

/// An aggregate that lives in exactly one stream of the event store.
pub trait Stream:
    Aggregate<Error = DomainError, Event: Event + Serialize + DeserializeOwned> + Sized
{
    /// Stored with every event; a stream never changes type.
    const AGGREGATE_TYPE: &'static str;

    /// Not-yet-created instance to replay history into.
    fn blank(id: AggregateId) -> Self;

    fn stream_id(&self) -> AggregateId;
}

macro_rules! stream {
    ($aggregate:ty, $id:ident, $aggregate_type:literal) => {
        impl Stream for $aggregate {
            const AGGREGATE_TYPE: &'static str = $aggregate_type;

            fn blank(id: AggregateId) -> Self {
                <$aggregate>::empty($id(id))
            }

            fn stream_id(&self) -> AggregateId {
                self.id().0
            }
        }
    };
}

stream!(StockLedgerEntry, LedgerEntryId, "stock.ledger");
stream!(FeedStockRecord, FeedStockRecordId, "stock.feed_record");
stream!(DailySequence, DailySequenceId, "numbering.sequence");
stream!(PurchaseOrder, PurchaseOrderId, "purchasing.order");
stream!(StockItem, StockItemId, "receiving.stock_item");
stream!(Request, RequestId, "approvals.request");
stream!(ApprovalLog, ApprovalLogId, "approvals.log");
stream!(Invoice, InvoiceId, "invoicing.invoice");
stream!(ChickenOrder, ChickenOrderId, "sales.chicken_order");
