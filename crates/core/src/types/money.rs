//! Monetary amounts using decimal arithmetic.
//!
//! The backend prices everything in a single currency (US dollars) and sends
//! amounts as JSON numbers. Amounts are held as [`Decimal`] so cart totals
//! never pick up floating-point drift.

use rust_decimal::{Decimal, RoundingStrategy};

/// A monetary amount in the store currency's standard unit (dollars, not cents).
pub type Money = Decimal;

/// Round an amount to whole cents, midpoint away from zero.
#[must_use]
pub fn round_cents(amount: Money) -> Money {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Format an amount for display, e.g. `$19.99`.
#[must_use]
pub fn format_money(amount: Money) -> String {
    let rounded = round_cents(amount);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-${:.2}", rounded.abs())
    } else {
        format!("${:.2}", rounded.abs())
    }
}
