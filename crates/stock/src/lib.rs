//! Stock domain module: live chicken ledgers and feed stock records.
//!
//! The ledger is the only widely shared mutable state in the system. Every
//! quantity change goes through `StockLedgerEntry` commands; nothing else
//! writes its fields.

pub mod feed;
pub mod kind;
pub mod ledger;

pub use feed::{
    FeedCompany, FeedReceiptRecorded, FeedStockCommand, FeedStockEvent, FeedStockRecord,
    FeedStockRecordId, FeedType, RecordFeedReceipt,
};
pub use kind::{ItemKind, StockKind};
pub use ledger::{
    CreditStock, DebitStock, LedgerDefaults, LedgerEntryId, LedgerEntryOpened,
    MinimumThresholdSet, PriceHints, PricingUpdated, ReturnStock, SetMinimumThreshold,
    SetPricing, StockCredited, StockDebited, StockLedgerCommand, StockLedgerEntry,
    StockLedgerEvent, StockReturned,
};
