//! Checked line-total arithmetic shared by orders, requests and invoices.
//!
//! Amounts are `u64` in the smallest currency unit. Totals are always
//! recomputed from quantities and unit prices; caller-supplied totals are
//! never trusted.

use crate::error::{DomainError, DomainResult};

/// `quantity * unit_price`, rejecting non-positive quantities and overflow.
pub fn line_total(quantity: i64, unit_price: u64) -> DomainResult<u64> {
    if quantity <= 0 {
        return Err(DomainError::validation("line quantity must be positive"));
    }
    (quantity as u64)
        .checked_mul(unit_price)
        .ok_or_else(|| DomainError::validation("line total overflows"))
}

/// Sum of already computed line totals.
pub fn sum(totals: impl IntoIterator<Item = u64>) -> DomainResult<u64> {
    totals.into_iter().try_fold(0u64, |acc, t| {
        acc.checked_add(t)
            .ok_or_else(|| DomainError::validation("document total overflows"))
    })
}
