use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Monetary amount in integer minor units (cents) of some currency.
pub type MinorUnits = i64;

/// Convert an account-currency amount into base-currency minor units using
/// the supplied exchange rate. Rounds half to even so repeated conversions
/// do not drift in one direction. Returns `None` when the product overflows
/// the minor-unit range.
pub fn to_base_minor(amount: MinorUnits, rate: Decimal) -> Option<MinorUnits> {
    (Decimal::from(amount) * rate)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
        .to_i64()
}
