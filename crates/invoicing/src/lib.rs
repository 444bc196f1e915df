//! Invoicing domain module (event-sourced).
//!
//! Invoice issuance and the two-step managerial approval chain, implemented
//! purely as deterministic domain logic (no IO, no storage).

pub mod invoice;

pub use invoice::{
    ChangeInvoiceStatus, INVOICE_TRANSITIONS, Invoice, InvoiceCommand, InvoiceEvent, InvoiceId,
    InvoiceIssued, InvoiceLine, InvoiceSource, InvoiceStatus, InvoiceStatusChanged, IssueInvoice,
};
