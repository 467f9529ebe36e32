use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::catalog::{window_contains, StoreLocationId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaxGroupId(pub i64);

/// Named rate bucket. Immutable reference data for a merchant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaxGroup {
    pub id: TaxGroupId,
    pub code: String,
    pub name: String,
    pub rate_percent: Decimal,
    pub zero_rated: bool,
}

/// Whether a configured price already carries tax.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaxMode {
    Inclusive,
    Exclusive,
}

/// Binds a store location to a tax group. Rules are versioned by effective
/// date; only the most recent applicable rule is honored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoreTaxRule {
    pub id: i64,
    pub store_location_id: StoreLocationId,
    pub tax_group_id: TaxGroupId,
    pub mode: TaxMode,
    pub exempt: bool,
    pub active: bool,
    pub effective_from: Option<DateTime<Utc>>,
    pub effective_to: Option<DateTime<Utc>>,
}

impl StoreTaxRule {
    pub fn applies_at(&self, at: DateTime<Utc>) -> bool {
        self.active && window_contains(self.effective_from, self.effective_to, at)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TenderType {
    Cash,
    Card,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundingMethod {
    Nearest,
    Up,
    Down,
}

/// Per store and tender type; at most one active policy. Absence means the
/// payable total equals the gross total.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundingPolicy {
    pub id: i64,
    pub store_location_id: StoreLocationId,
    pub tender_type: TenderType,
    pub method: RoundingMethod,
    pub increment: Decimal,
    pub active: bool,
}
