//! Unit price resolution service. Wraps the pure precedence rules in
//! `tillpoint_core::pricing` with catalog lookups and validation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use tillpoint_core::domain::catalog::{Product, ProductId, StoreLocation, StoreLocationId};
use tillpoint_core::pricing::{resolve_price, PriceSource};
use tillpoint_db::repositories::{CatalogRepository, PriceRepository};

use crate::error::EngineError;

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct PriceLookupRequest {
    pub store_location_id: StoreLocationId,
    pub product_id: ProductId,
    /// Defaults to now.
    pub at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceResolution {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub unit_price: Decimal,
    pub source: PriceSource,
    pub source_id: i64,
    pub effective_from: Option<DateTime<Utc>>,
    pub effective_to: Option<DateTime<Utc>>,
    pub resolved_at: DateTime<Utc>,
}

pub struct PriceResolver {
    catalog: Arc<dyn CatalogRepository>,
    price: Arc<dyn PriceRepository>,
}

impl PriceResolver {
    pub fn new(catalog: Arc<dyn CatalogRepository>, price: Arc<dyn PriceRepository>) -> Self {
        Self { catalog, price }
    }

    pub async fn resolve(
        &self,
        request: PriceLookupRequest,
    ) -> Result<PriceResolution, EngineError> {
        let store = self.load_store(request.store_location_id).await?;
        let product = self.load_product(&store, request.product_id).await?;
        let at = request.at.unwrap_or_else(Utc::now);

        let overrides = self.price.store_overrides(store.id, product.id).await?;
        let price_book = self.price.price_book_entries(store.merchant_id, product.id).await?;
        let resolved = resolve_price(&product, &overrides, &price_book, at);

        debug!(
            store_location_id = store.id.0,
            product_id = product.id.0,
            unit_price = %resolved.unit_price,
            source = ?resolved.source,
            source_id = resolved.source_id,
            "price resolved"
        );

        Ok(PriceResolution {
            product_id: product.id,
            sku: product.sku,
            name: product.name,
            unit_price: resolved.unit_price,
            source: resolved.source,
            source_id: resolved.source_id,
            effective_from: resolved.effective_from,
            effective_to: resolved.effective_to,
            resolved_at: at,
        })
    }

    pub(crate) async fn load_store(
        &self,
        id: StoreLocationId,
    ) -> Result<StoreLocation, EngineError> {
        let store = self
            .catalog
            .store_location(id)
            .await?
            .ok_or_else(|| EngineError::not_found(format!("store location {} not found", id.0)))?;
        if !store.active {
            return Err(EngineError::validation(format!(
                "store location {} is inactive",
                id.0
            )));
        }
        Ok(store)
    }

    pub(crate) async fn load_product(
        &self,
        store: &StoreLocation,
        id: ProductId,
    ) -> Result<Product, EngineError> {
        let product = self
            .catalog
            .product(id)
            .await?
            .ok_or_else(|| EngineError::not_found(format!("product {} not found", id.0)))?;
        if product.merchant_id != store.merchant_id {
            return Err(EngineError::validation(format!(
                "product {} does not belong to merchant {}",
                id.0, store.merchant_id.0
            )));
        }
        if !product.active {
            return Err(EngineError::validation(format!("product {} is inactive", id.0)));
        }
        Ok(product)
    }
}
