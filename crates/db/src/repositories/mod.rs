use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use tillpoint_core::domain::catalog::{
    Merchant, MerchantId, PriceBookEntry, Product, ProductId, StoreLocation, StoreLocationId,
    StorePriceOverride,
};
use tillpoint_core::domain::discount::{
    DiscountEntry, DiscountId, DiscountKind, DiscountScope, ReasonCode, ReasonCodeId,
};
use tillpoint_core::domain::tax::{RoundingPolicy, StoreTaxRule, TaxGroup, TaxGroupId, TenderType};

pub mod catalog;
pub mod discount;
pub mod memory;
pub mod price;
pub mod tax;

pub use catalog::SqlCatalogRepository;
pub use discount::SqlDiscountRepository;
pub use memory::{
    InMemoryCatalogRepository, InMemoryDiscountRepository, InMemoryPriceRepository,
    InMemoryTaxRepository,
};
pub use price::SqlPriceRepository;
pub use tax::SqlTaxRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Insert payload for a discount entry. The row store assigns the id and
/// marks the entry active.
#[derive(Clone, Debug)]
pub struct NewDiscountEntry {
    pub store_location_id: StoreLocationId,
    pub context_key: String,
    pub scope: DiscountScope,
    pub product_id: Option<ProductId>,
    pub kind: DiscountKind,
    pub value: Decimal,
    pub reason_code_id: ReasonCodeId,
    pub reason_code: String,
    pub note: Option<String>,
    pub applied_by: String,
    pub applied_at: DateTime<Utc>,
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn merchant(&self, id: MerchantId) -> Result<Option<Merchant>, RepositoryError>;
    async fn store_location(
        &self,
        id: StoreLocationId,
    ) -> Result<Option<StoreLocation>, RepositoryError>;
    async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;
    async fn tax_group(&self, id: TaxGroupId) -> Result<Option<TaxGroup>, RepositoryError>;
}

#[async_trait]
pub trait PriceRepository: Send + Sync {
    async fn store_overrides(
        &self,
        store_location_id: StoreLocationId,
        product_id: ProductId,
    ) -> Result<Vec<StorePriceOverride>, RepositoryError>;

    async fn price_book_entries(
        &self,
        merchant_id: MerchantId,
        product_id: ProductId,
    ) -> Result<Vec<PriceBookEntry>, RepositoryError>;
}

#[async_trait]
pub trait DiscountRepository: Send + Sync {
    /// Looks up an active reason code by normalized code, preferring a
    /// merchant-scoped row over a global one.
    async fn find_reason_code(
        &self,
        merchant_id: MerchantId,
        code: &str,
    ) -> Result<Option<ReasonCode>, RepositoryError>;

    async fn insert(&self, entry: NewDiscountEntry) -> Result<DiscountEntry, RepositoryError>;

    async fn find_active(
        &self,
        store_location_id: StoreLocationId,
        id: DiscountId,
    ) -> Result<Option<DiscountEntry>, RepositoryError>;

    async fn mark_removed(
        &self,
        id: DiscountId,
        removed_by: &str,
        removed_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// Active entries for one context, ordered by applied_at then id so
    /// replay during preview is deterministic.
    async fn active_for_context(
        &self,
        store_location_id: StoreLocationId,
        context_key: &str,
    ) -> Result<Vec<DiscountEntry>, RepositoryError>;
}

#[async_trait]
pub trait TaxRepository: Send + Sync {
    async fn tax_rules(
        &self,
        store_location_id: StoreLocationId,
        tax_group_id: TaxGroupId,
    ) -> Result<Vec<StoreTaxRule>, RepositoryError>;

    async fn rounding_policy(
        &self,
        store_location_id: StoreLocationId,
        tender_type: TenderType,
    ) -> Result<Option<RoundingPolicy>, RepositoryError>;
}

pub(crate) fn decode_decimal(field: &str, value: &str) -> Result<Decimal, RepositoryError> {
    use std::str::FromStr;
    Decimal::from_str(value)
        .map_err(|error| RepositoryError::Decode(format!("invalid decimal for {field}: {error}")))
}

pub(crate) fn decode_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("invalid timestamp for {field}: {error}")))
}

pub(crate) fn decode_timestamp_opt(
    field: &str,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    value.as_deref().map(|raw| decode_timestamp(field, raw)).transpose()
}
