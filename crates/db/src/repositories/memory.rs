use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use tillpoint_core::domain::catalog::{
    Merchant, MerchantId, PriceBookEntry, Product, ProductId, StoreLocation, StoreLocationId,
    StorePriceOverride,
};
use tillpoint_core::domain::discount::{DiscountEntry, DiscountId, ReasonCode};
use tillpoint_core::domain::tax::{RoundingPolicy, StoreTaxRule, TaxGroup, TaxGroupId, TenderType};

use super::{
    CatalogRepository, DiscountRepository, NewDiscountEntry, PriceRepository, RepositoryError,
    TaxRepository,
};

#[derive(Default)]
pub struct InMemoryCatalogRepository {
    merchants: RwLock<HashMap<i64, Merchant>>,
    stores: RwLock<HashMap<i64, StoreLocation>>,
    products: RwLock<HashMap<i64, Product>>,
    tax_groups: RwLock<HashMap<i64, TaxGroup>>,
}

impl InMemoryCatalogRepository {
    pub async fn put_merchant(&self, merchant: Merchant) {
        self.merchants.write().await.insert(merchant.id.0, merchant);
    }

    pub async fn put_store_location(&self, store: StoreLocation) {
        self.stores.write().await.insert(store.id.0, store);
    }

    pub async fn put_product(&self, product: Product) {
        self.products.write().await.insert(product.id.0, product);
    }

    pub async fn put_tax_group(&self, group: TaxGroup) {
        self.tax_groups.write().await.insert(group.id.0, group);
    }
}

#[async_trait::async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn merchant(&self, id: MerchantId) -> Result<Option<Merchant>, RepositoryError> {
        Ok(self.merchants.read().await.get(&id.0).cloned())
    }

    async fn store_location(
        &self,
        id: StoreLocationId,
    ) -> Result<Option<StoreLocation>, RepositoryError> {
        Ok(self.stores.read().await.get(&id.0).cloned())
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.products.read().await.get(&id.0).cloned())
    }

    async fn tax_group(&self, id: TaxGroupId) -> Result<Option<TaxGroup>, RepositoryError> {
        Ok(self.tax_groups.read().await.get(&id.0).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryPriceRepository {
    overrides: RwLock<Vec<StorePriceOverride>>,
    price_book: RwLock<Vec<PriceBookEntry>>,
}

impl InMemoryPriceRepository {
    pub async fn put_override(&self, row: StorePriceOverride) {
        self.overrides.write().await.push(row);
    }

    pub async fn put_price_book_entry(&self, row: PriceBookEntry) {
        self.price_book.write().await.push(row);
    }
}

#[async_trait::async_trait]
impl PriceRepository for InMemoryPriceRepository {
    async fn store_overrides(
        &self,
        store_location_id: StoreLocationId,
        product_id: ProductId,
    ) -> Result<Vec<StorePriceOverride>, RepositoryError> {
        Ok(self
            .overrides
            .read()
            .await
            .iter()
            .filter(|row| row.store_location_id == store_location_id && row.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn price_book_entries(
        &self,
        merchant_id: MerchantId,
        product_id: ProductId,
    ) -> Result<Vec<PriceBookEntry>, RepositoryError> {
        Ok(self
            .price_book
            .read()
            .await
            .iter()
            .filter(|row| row.merchant_id == merchant_id && row.product_id == product_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryDiscountRepository {
    entries: RwLock<Vec<DiscountEntry>>,
    reason_codes: RwLock<Vec<ReasonCode>>,
    next_id: AtomicI64,
}

impl InMemoryDiscountRepository {
    pub async fn put_reason_code(&self, code: ReasonCode) {
        self.reason_codes.write().await.push(code);
    }
}

#[async_trait::async_trait]
impl DiscountRepository for InMemoryDiscountRepository {
    async fn find_reason_code(
        &self,
        merchant_id: MerchantId,
        code: &str,
    ) -> Result<Option<ReasonCode>, RepositoryError> {
        let codes = self.reason_codes.read().await;
        let mut candidates: Vec<&ReasonCode> = codes
            .iter()
            .filter(|rc| {
                rc.active
                    && rc.code == code
                    && (rc.merchant_id.is_none() || rc.merchant_id == Some(merchant_id))
            })
            .collect();
        // Merchant-scoped codes shadow global ones with the same code.
        candidates.sort_by_key(|rc| (rc.merchant_id.is_none(), rc.id.0));
        Ok(candidates.first().map(|rc| (*rc).clone()))
    }

    async fn insert(&self, entry: NewDiscountEntry) -> Result<DiscountEntry, RepositoryError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let stored = DiscountEntry {
            id: DiscountId(id),
            store_location_id: entry.store_location_id,
            context_key: entry.context_key,
            scope: entry.scope,
            product_id: entry.product_id,
            kind: entry.kind,
            value: entry.value,
            reason_code_id: entry.reason_code_id,
            reason_code: entry.reason_code,
            note: entry.note,
            active: true,
            applied_by: entry.applied_by,
            applied_at: entry.applied_at,
            removed_by: None,
            removed_at: None,
        };
        self.entries.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn find_active(
        &self,
        store_location_id: StoreLocationId,
        id: DiscountId,
    ) -> Result<Option<DiscountEntry>, RepositoryError> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .find(|entry| {
                entry.id == id && entry.store_location_id == store_location_id && entry.active
            })
            .cloned())
    }

    async fn mark_removed(
        &self,
        id: DiscountId,
        removed_by: &str,
        removed_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.iter_mut().find(|entry| entry.id == id && entry.active) {
            entry.active = false;
            entry.removed_by = Some(removed_by.to_string());
            entry.removed_at = Some(removed_at);
        }
        Ok(())
    }

    async fn active_for_context(
        &self,
        store_location_id: StoreLocationId,
        context_key: &str,
    ) -> Result<Vec<DiscountEntry>, RepositoryError> {
        let mut matching: Vec<DiscountEntry> = self
            .entries
            .read()
            .await
            .iter()
            .filter(|entry| {
                entry.store_location_id == store_location_id
                    && entry.context_key == context_key
                    && entry.active
            })
            .cloned()
            .collect();
        matching.sort_by_key(|entry| (entry.applied_at, entry.id.0));
        Ok(matching)
    }
}

#[derive(Default)]
pub struct InMemoryTaxRepository {
    rules: RwLock<Vec<StoreTaxRule>>,
    policies: RwLock<Vec<RoundingPolicy>>,
}

impl InMemoryTaxRepository {
    pub async fn put_rule(&self, rule: StoreTaxRule) {
        self.rules.write().await.push(rule);
    }

    pub async fn put_policy(&self, policy: RoundingPolicy) {
        self.policies.write().await.push(policy);
    }
}

#[async_trait::async_trait]
impl TaxRepository for InMemoryTaxRepository {
    async fn tax_rules(
        &self,
        store_location_id: StoreLocationId,
        tax_group_id: TaxGroupId,
    ) -> Result<Vec<StoreTaxRule>, RepositoryError> {
        Ok(self
            .rules
            .read()
            .await
            .iter()
            .filter(|rule| {
                rule.store_location_id == store_location_id && rule.tax_group_id == tax_group_id
            })
            .cloned()
            .collect())
    }

    async fn rounding_policy(
        &self,
        store_location_id: StoreLocationId,
        tender_type: TenderType,
    ) -> Result<Option<RoundingPolicy>, RepositoryError> {
        Ok(self
            .policies
            .read()
            .await
            .iter()
            .find(|policy| {
                policy.store_location_id == store_location_id
                    && policy.tender_type == tender_type
                    && policy.active
            })
            .cloned())
    }
}
