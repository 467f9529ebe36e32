//! Price resolution: store override > price book > base price.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::catalog::{PriceBookEntry, Product, StorePriceOverride};
use crate::money::round_money;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceSource {
    StoreOverride,
    PriceBook,
    BasePrice,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPrice {
    pub unit_price: Decimal,
    pub source: PriceSource,
    pub source_id: i64,
    pub effective_from: Option<DateTime<Utc>>,
    pub effective_to: Option<DateTime<Utc>>,
}

/// Picks the row with the latest effective_from (open-ended counts as the
/// epoch), breaking ties by highest id — the same ordering the row store
/// uses, so both sides agree on "first applicable".
fn most_recent_key(effective_from: Option<DateTime<Utc>>, id: i64) -> (DateTime<Utc>, i64) {
    (effective_from.unwrap_or(DateTime::<Utc>::MIN_UTC), id)
}

/// Resolves the unit price for one product at one instant. Candidate rows
/// are whatever the store returned for (store, product); filtering by
/// effective window happens here so the precedence rules live in one place.
pub fn resolve_price(
    product: &Product,
    overrides: &[StorePriceOverride],
    price_book: &[PriceBookEntry],
    at: DateTime<Utc>,
) -> ResolvedPrice {
    if let Some(row) = overrides
        .iter()
        .filter(|row| row.applies_at(at))
        .max_by_key(|row| most_recent_key(row.effective_from, row.id))
    {
        return ResolvedPrice {
            unit_price: round_money(row.price),
            source: PriceSource::StoreOverride,
            source_id: row.id,
            effective_from: row.effective_from,
            effective_to: row.effective_to,
        };
    }

    if let Some(row) = price_book
        .iter()
        .filter(|row| row.applies_at(at))
        .max_by_key(|row| most_recent_key(row.effective_from, row.id))
    {
        return ResolvedPrice {
            unit_price: round_money(row.price),
            source: PriceSource::PriceBook,
            source_id: row.id,
            effective_from: row.effective_from,
            effective_to: row.effective_to,
        };
    }

    ResolvedPrice {
        unit_price: round_money(product.base_price),
        source: PriceSource::BasePrice,
        source_id: product.id.0,
        effective_from: None,
        effective_to: None,
    }
}
