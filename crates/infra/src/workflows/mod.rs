//! Public workflow operations, one transaction each.
//!
//! Every module adds an `impl Engine` block. Cross-aggregate steps (invoice
//! approval spawning stock items, stock approval crediting the ledger, a sale
//! debiting it) are composed from the `*_in` helpers on the same unit of
//! work so they commit or roll back together.

pub mod invoices;
pub mod ledger;
pub mod orders;
pub mod receiving;
pub mod requests;
pub mod sales;

use chrono::{DateTime, NaiveDate, Utc};

use flockerp_numbering::{AllocateNext, DailySequence, DailySequenceId, SequenceCommand, SequenceScope};

use crate::error::WorkflowError;
use crate::event_store::EventStore;
use crate::unit_of_work::UnitOfWork;

/// Next value of the `(scope, day)` counter.
///
/// Two transactions allocating on the same day write the same sequence
/// stream, so at most one of them commits per version.
pub(crate) fn allocate_number_in<S: EventStore>(
    uow: &mut UnitOfWork<'_, S>,
    scope: SequenceScope,
    day: NaiveDate,
    now: DateTime<Utc>,
) -> Result<u32, WorkflowError> {
    let id = DailySequenceId::for_day(scope, day);
    let mut sequence: DailySequence = uow.load(id.0)?;
    uow.execute(
        &mut sequence,
        SequenceCommand::AllocateNext(AllocateNext {
            scope,
            day,
            occurred_at: now,
        }),
    )?;
    Ok(sequence.last())
}
