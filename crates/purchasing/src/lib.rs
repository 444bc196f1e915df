//! Purchasing domain module (purchase orders placed with suppliers).
//!
//! Pure, deterministic domain logic: no IO, no HTTP, no storage. Line totals
//! and the order total are recomputed on creation, and status moves only along
//! the edges of [`ORDER_TRANSITIONS`].

pub mod order;

pub use order::{
    ChangeOrderStatus, CreatePurchaseOrder, MarkInvoiced, ORDER_TRANSITIONS, OrderCreated,
    OrderInvoiced, OrderLine, OrderStatus, OrderStatusChanged, PurchaseOrder,
    PurchaseOrderCommand, PurchaseOrderEvent, PurchaseOrderId, RecordStockSpawned,
    StockItemsSpawned, SupplierDetails,
};
