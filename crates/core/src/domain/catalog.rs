use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::tax::TaxGroupId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MerchantId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreLocationId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(pub i64);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Merchant {
    pub id: MerchantId,
    pub name: String,
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoreLocation {
    pub id: StoreLocationId,
    pub merchant_id: MerchantId,
    pub code: String,
    pub name: String,
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub merchant_id: MerchantId,
    pub sku: String,
    pub name: String,
    pub base_price: Decimal,
    pub tax_group_id: Option<TaxGroupId>,
    pub active: bool,
}

/// Store-specific price override. Highest precedence in price resolution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StorePriceOverride {
    pub id: i64,
    pub store_location_id: StoreLocationId,
    pub product_id: ProductId,
    pub price: Decimal,
    pub active: bool,
    pub effective_from: Option<DateTime<Utc>>,
    pub effective_to: Option<DateTime<Utc>>,
}

/// Merchant-level price book row for one product.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceBookEntry {
    pub id: i64,
    pub merchant_id: MerchantId,
    pub product_id: ProductId,
    pub price: Decimal,
    pub active: bool,
    pub effective_from: Option<DateTime<Utc>>,
    pub effective_to: Option<DateTime<Utc>>,
}

pub(crate) fn window_contains(
    effective_from: Option<DateTime<Utc>>,
    effective_to: Option<DateTime<Utc>>,
    at: DateTime<Utc>,
) -> bool {
    effective_from.map_or(true, |from| from <= at) && effective_to.map_or(true, |to| to >= at)
}

impl StorePriceOverride {
    pub fn applies_at(&self, at: DateTime<Utc>) -> bool {
        self.active && window_contains(self.effective_from, self.effective_to, at)
    }
}

impl PriceBookEntry {
    pub fn applies_at(&self, at: DateTime<Utc>) -> bool {
        self.active && window_contains(self.effective_from, self.effective_to, at)
    }
}
