use rust_decimal::{Decimal, RoundingStrategy};

/// Display/persistence scale for every externally visible amount.
pub const MONEY_SCALE: u32 = 2;
/// Scale for percentage values (discount values, tax rates).
pub const RATE_SCALE: u32 = 4;
/// Scale for intermediate amount computations (percentage discounts,
/// inclusive-tax net division) before re-rounding to money scale.
pub const AMOUNT_SCALE: u32 = 6;
/// Scale for per-line allocation ratios.
pub const RATIO_SCALE: u32 = 8;

/// Rounds half-up to the given scale and pads trailing zeros so the result
/// always carries exactly `scale` fractional digits.
pub fn round_dp(value: Decimal, scale: u32) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(scale);
    rounded
}

/// Normalizes a monetary amount to money scale, half-up.
pub fn round_money(value: Decimal) -> Decimal {
    round_dp(value, MONEY_SCALE)
}

/// Normalizes a percentage to rate scale, half-up.
pub fn round_rate(value: Decimal) -> Decimal {
    round_dp(value, RATE_SCALE)
}

/// Zero at money scale (`0.00`), so serialized totals stay two-digit.
pub fn zero_money() -> Decimal {
    Decimal::new(0, MONEY_SCALE)
}
