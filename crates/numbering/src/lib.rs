//! Per-day business numbering (invoice and request numbers).
//!
//! A number is allocated by appending to the `DailySequence` stream of its
//! `(scope, day)`. Two writers that loaded the same counter value race on the
//! same stream version; only one commit succeeds and the other reloads.

pub mod format;
pub mod sequence;

pub use format::{format_invoice_number, format_request_number};
pub use sequence::{
    AllocateNext, DailySequence, DailySequenceId, SequenceAllocated, SequenceCommand,
    SequenceEvent, SequenceScope,
};
