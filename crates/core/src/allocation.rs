//! Proportional, remainder-safe allocation of a discount across cart lines.
//!
//! A lump discount is split across its target lines in proportion to their
//! current subtotals. Every line except the last rounds its share to money
//! scale; the last line absorbs whatever remains, so the per-line amounts
//! always sum to the total discount exactly. Allocations are clamped so no
//! line ever goes negative.

use rust_decimal::Decimal;

use crate::domain::catalog::ProductId;
use crate::domain::discount::DiscountKind;
use crate::money::{round_dp, round_money, zero_money, AMOUNT_SCALE, RATIO_SCALE};

/// Per-line accumulator for one preview call. Created fresh per request,
/// mutated as discounts land, discarded once the response is built.
#[derive(Clone, Debug, PartialEq)]
pub struct PreviewLine {
    pub line_number: u32,
    pub product_id: ProductId,
    pub quantity: Decimal,
    pub original_unit_price: Decimal,
    pub subtotal_before_discount: Decimal,
    pub discount_amount: Decimal,
    pub subtotal_after_discount: Decimal,
}

impl PreviewLine {
    pub fn new(
        line_number: u32,
        product_id: ProductId,
        quantity: Decimal,
        unit_price: Decimal,
    ) -> Self {
        let subtotal = round_money(unit_price * quantity);
        Self {
            line_number,
            product_id,
            quantity,
            original_unit_price: unit_price,
            subtotal_before_discount: subtotal,
            discount_amount: zero_money(),
            subtotal_after_discount: subtotal,
        }
    }

    /// Discounted subtotal divided back into a unit price at money scale.
    pub fn discounted_unit_price(&self) -> Decimal {
        if self.quantity.is_zero() {
            return zero_money();
        }
        round_money(self.subtotal_after_discount / self.quantity)
    }

    /// Applies a discount amount to this line, clamped so the running
    /// subtotal never goes negative. Non-positive amounts are ignored.
    pub fn take_discount(&mut self, amount: Decimal) {
        let mut normalized = round_money(amount);
        if normalized <= Decimal::ZERO {
            return;
        }
        if normalized > self.subtotal_after_discount {
            normalized = self.subtotal_after_discount;
        }
        self.discount_amount = round_money(self.discount_amount + normalized);
        self.subtotal_after_discount = round_money(self.subtotal_after_discount - normalized);
    }
}

/// Computes the realized amount for one discount entry against a base,
/// clamped to the base. A non-positive base yields 0.00; callers skip such
/// entries instead of reporting them as applied.
pub fn discount_amount_for(kind: DiscountKind, value: Decimal, base: Decimal) -> Decimal {
    if base <= Decimal::ZERO {
        return zero_money();
    }
    let requested = match kind {
        DiscountKind::Percentage => {
            round_dp(base * value / Decimal::ONE_HUNDRED, AMOUNT_SCALE)
        }
        DiscountKind::Fixed => value,
    };
    let normalized = round_money(requested);
    if normalized > base {
        base
    } else {
        normalized
    }
}

/// Splits `total_discount` across `targets` (indices into `lines`) in
/// proportion to each target's current subtotal. The last target takes the
/// remainder, so as long as the total does not exceed the combined subtotal
/// of the targets, the allocations sum to it exactly.
pub fn allocate_proportionally(lines: &mut [PreviewLine], targets: &[usize], total_discount: Decimal) {
    if targets.is_empty() || total_discount <= Decimal::ZERO {
        return;
    }
    if let [only] = targets {
        lines[*only].take_discount(total_discount);
        return;
    }

    let total_base = round_money(
        targets.iter().map(|&index| lines[index].subtotal_after_discount).sum::<Decimal>(),
    );
    if total_base <= Decimal::ZERO {
        return;
    }

    let mut remaining = total_discount;
    let mut allocated = zero_money();
    let last = targets.len() - 1;
    for (position, &index) in targets.iter().enumerate() {
        let mut allocation = if position == last {
            round_money(remaining.max(Decimal::ZERO))
        } else {
            let ratio =
                round_dp(lines[index].subtotal_after_discount / total_base, RATIO_SCALE);
            let share = round_money(total_discount * ratio);
            share.min(lines[index].subtotal_after_discount)
        };
        if allocation > remaining {
            allocation = round_money(remaining);
        }
        lines[index].take_discount(allocation);
        allocated = round_money(allocated + allocation);
        remaining = round_money(total_discount - allocated);
    }
}
