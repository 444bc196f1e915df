//! Stock receiving: receivable units derived from approved orders.
//!
//! `spawn` turns an invoiced order's lines into `CreateStockItem` commands;
//! `item` tracks receipts and the accountant's sign-off. Crediting the ledger
//! or recording feed on approval is composed by the workflow engine.

pub mod item;
pub mod spawn;

pub use item::{
    ApproveStockItem, CreateStockItem, ReceiveStockItem, StockApproved, StockItem,
    StockItemCommand, StockItemCreated, StockItemEvent, StockItemId, StockReceived,
    StockStatus,
};
pub use spawn::{classify_line, plan_spawn};
