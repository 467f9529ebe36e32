use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::catalog::{MerchantId, ProductId, StoreLocationId};
use crate::errors::Error;
use crate::money::round_rate;

/// Percentage discounts above this value require the override permission.
pub const HIGH_DISCOUNT_PERCENT_THRESHOLD: Decimal = Decimal::from_parts(150_000, 0, 0, false, 4);
/// Fixed-amount discounts above this value require the override permission.
pub const HIGH_DISCOUNT_FIXED_THRESHOLD: Decimal = Decimal::from_parts(200_000, 0, 0, false, 4);

const ONE_HUNDRED: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiscountId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReasonCodeId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountScope {
    Line,
    Cart,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountKind {
    Percentage,
    Fixed,
}

/// Merchant-scoped reason code; `merchant_id = None` marks a global code
/// usable by every merchant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReasonCode {
    pub id: ReasonCodeId,
    pub merchant_id: Option<MerchantId>,
    pub code: String,
    pub description: Option<String>,
    pub active: bool,
}

/// One applied discount. Never physically deleted: `remove` flips `active`
/// and stamps the remover, so the audit history stays intact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiscountEntry {
    pub id: DiscountId,
    pub store_location_id: StoreLocationId,
    pub context_key: String,
    pub scope: DiscountScope,
    pub product_id: Option<ProductId>,
    pub kind: DiscountKind,
    pub value: Decimal,
    pub reason_code_id: ReasonCodeId,
    pub reason_code: String,
    pub note: Option<String>,
    pub active: bool,
    pub applied_by: String,
    pub applied_at: DateTime<Utc>,
    pub removed_by: Option<String>,
    pub removed_at: Option<DateTime<Utc>>,
}

/// Uppercases and trims a context key; matching is case-insensitive.
pub fn normalize_context_key(context_key: &str) -> Result<String, Error> {
    let trimmed = context_key.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("contextKey is required"));
    }
    Ok(trimmed.to_uppercase())
}

pub fn normalize_reason_code(code: &str) -> Result<String, Error> {
    let trimmed = code.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("reasonCode is required"));
    }
    Ok(trimmed.to_uppercase())
}

pub fn normalize_note(note: Option<&str>) -> Option<String> {
    note.map(str::trim).filter(|trimmed| !trimmed.is_empty()).map(str::to_owned)
}

/// Normalizes a discount value to rate scale and enforces the value
/// invariants: strictly positive, and at most 100 for percentages.
pub fn normalize_discount_value(value: Decimal, kind: DiscountKind) -> Result<Decimal, Error> {
    let normalized = round_rate(value);
    if normalized <= Decimal::ZERO {
        return Err(Error::validation("value must be greater than zero"));
    }
    if kind == DiscountKind::Percentage && normalized > ONE_HUNDRED {
        return Err(Error::validation("percentage discount cannot exceed 100"));
    }
    Ok(normalized)
}

/// Whether the discount crosses the manager-approval threshold.
pub fn requires_manager_approval(kind: DiscountKind, value: Decimal) -> bool {
    match kind {
        DiscountKind::Percentage => value > HIGH_DISCOUNT_PERCENT_THRESHOLD,
        DiscountKind::Fixed => value > HIGH_DISCOUNT_FIXED_THRESHOLD,
    }
}
