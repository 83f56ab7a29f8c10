//! Monetary amount validation.
//!
//! Amounts are fixed-point [`Decimal`] values. The ledger only ever accepts
//! strictly positive amounts; signs are expressed by the transaction kind.

use rust_decimal::Decimal;

use crate::error::{LedgerError, LedgerResult};

/// Validate a requested transaction amount.
///
/// Rejects zero and negative values before any storage access, and
/// normalizes trailing zeros so equal amounts compare and render equally.
pub fn validate_amount(amount: Decimal) -> LedgerResult<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::validation(format!(
            "amount must be positive, got {amount}"
        )));
    }
    Ok(amount.normalize())
}
