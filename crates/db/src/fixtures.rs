//! Deterministic seed data for local development and tests: one merchant,
//! one store, a small catalog, and enough pricing/tax configuration to
//! exercise every checkout path.

use rust_decimal::Decimal;

use tillpoint_core::domain::catalog::{
    Merchant, MerchantId, PriceBookEntry, Product, ProductId, StoreLocation, StoreLocationId,
    StorePriceOverride,
};
use tillpoint_core::domain::discount::{ReasonCode, ReasonCodeId};
use tillpoint_core::domain::tax::{
    RoundingMethod, RoundingPolicy, StoreTaxRule, TaxGroup, TaxGroupId, TaxMode, TenderType,
};

use crate::repositories::tax::{method_as_str, mode_as_str, tender_as_str};
use crate::repositories::{
    InMemoryCatalogRepository, InMemoryDiscountRepository, InMemoryPriceRepository,
    InMemoryTaxRepository, RepositoryError,
};
use crate::DbPool;

#[derive(Clone, Debug)]
pub struct SeedDataset {
    pub merchant: Merchant,
    pub store: StoreLocation,
    pub tax_groups: Vec<TaxGroup>,
    pub products: Vec<Product>,
    pub price_book: Vec<PriceBookEntry>,
    pub overrides: Vec<StorePriceOverride>,
    pub tax_rules: Vec<StoreTaxRule>,
    pub rounding_policies: Vec<RoundingPolicy>,
    pub reason_codes: Vec<ReasonCode>,
}

impl SeedDataset {
    pub fn standard() -> Self {
        let merchant = Merchant { id: MerchantId(1), name: "Demo Grocer".to_string(), active: true };
        let store = StoreLocation {
            id: StoreLocationId(10),
            merchant_id: merchant.id,
            code: "MAIN".to_string(),
            name: "Main Street".to_string(),
            active: true,
        };

        let vat18 = TaxGroup {
            id: TaxGroupId(100),
            code: "VAT18".to_string(),
            name: "Standard VAT".to_string(),
            rate_percent: Decimal::new(180_000, 4),
            zero_rated: false,
        };
        let zero = TaxGroup {
            id: TaxGroupId(101),
            code: "ZERO".to_string(),
            name: "Zero-rated goods".to_string(),
            rate_percent: Decimal::new(0, 4),
            zero_rated: true,
        };

        let cola = Product {
            id: ProductId(1000),
            merchant_id: merchant.id,
            sku: "SKU-COLA".to_string(),
            name: "Cola 330ml".to_string(),
            base_price: Decimal::new(1050, 2),
            tax_group_id: Some(vat18.id),
            active: true,
        };
        let bread = Product {
            id: ProductId(1001),
            merchant_id: merchant.id,
            sku: "SKU-BREAD".to_string(),
            name: "Bread Loaf".to_string(),
            base_price: Decimal::new(2000, 2),
            tax_group_id: Some(vat18.id),
            active: true,
        };
        let milk = Product {
            id: ProductId(1002),
            merchant_id: merchant.id,
            sku: "SKU-MILK".to_string(),
            name: "Milk 1l".to_string(),
            base_price: Decimal::new(350, 2),
            tax_group_id: Some(zero.id),
            active: true,
        };

        Self {
            price_book: vec![PriceBookEntry {
                id: 500,
                merchant_id: merchant.id,
                product_id: cola.id,
                price: Decimal::new(950, 2),
                active: true,
                effective_from: None,
                effective_to: None,
            }],
            overrides: vec![StorePriceOverride {
                id: 700,
                store_location_id: store.id,
                product_id: cola.id,
                price: Decimal::new(1000, 2),
                active: true,
                effective_from: None,
                effective_to: None,
            }],
            tax_rules: vec![
                StoreTaxRule {
                    id: 900,
                    store_location_id: store.id,
                    tax_group_id: vat18.id,
                    mode: TaxMode::Exclusive,
                    exempt: false,
                    active: true,
                    effective_from: None,
                    effective_to: None,
                },
                StoreTaxRule {
                    id: 901,
                    store_location_id: store.id,
                    tax_group_id: zero.id,
                    mode: TaxMode::Exclusive,
                    exempt: false,
                    active: true,
                    effective_from: None,
                    effective_to: None,
                },
            ],
            rounding_policies: vec![RoundingPolicy {
                id: 950,
                store_location_id: store.id,
                tender_type: TenderType::Cash,
                method: RoundingMethod::Nearest,
                increment: Decimal::new(5, 2),
                active: true,
            }],
            reason_codes: vec![
                ReasonCode {
                    id: ReasonCodeId(1),
                    merchant_id: None,
                    code: "PROMO".to_string(),
                    description: Some("Promotional discount".to_string()),
                    active: true,
                },
                ReasonCode {
                    id: ReasonCodeId(2),
                    merchant_id: Some(merchant.id),
                    code: "MGR".to_string(),
                    description: Some("Manager override".to_string()),
                    active: true,
                },
            ],
            tax_groups: vec![vat18, zero],
            products: vec![cola, bread, milk],
            merchant,
            store,
        }
    }

    /// Populates the in-memory repositories used by service-level tests.
    pub async fn load_into(
        &self,
        catalog: &InMemoryCatalogRepository,
        price: &InMemoryPriceRepository,
        discount: &InMemoryDiscountRepository,
        tax: &InMemoryTaxRepository,
    ) {
        catalog.put_merchant(self.merchant.clone()).await;
        catalog.put_store_location(self.store.clone()).await;
        for group in &self.tax_groups {
            catalog.put_tax_group(group.clone()).await;
        }
        for product in &self.products {
            catalog.put_product(product.clone()).await;
        }
        for entry in &self.price_book {
            price.put_price_book_entry(entry.clone()).await;
        }
        for row in &self.overrides {
            price.put_override(row.clone()).await;
        }
        for code in &self.reason_codes {
            discount.put_reason_code(code.clone()).await;
        }
        for rule in &self.tax_rules {
            tax.put_rule(rule.clone()).await;
        }
        for policy in &self.rounding_policies {
            tax.put_policy(policy.clone()).await;
        }
    }
}

/// Whether the database already carries seed (or real) catalog data.
pub async fn is_seeded(pool: &DbPool) -> Result<bool, RepositoryError> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM merchant").fetch_one(pool).await?;
    Ok(count > 0)
}

/// Inserts the dataset with its fixed ids. Expects empty tables.
pub async fn apply(pool: &DbPool, dataset: &SeedDataset) -> Result<(), RepositoryError> {
    sqlx::query("INSERT INTO merchant (id, name, active) VALUES (?, ?, ?)")
        .bind(dataset.merchant.id.0)
        .bind(&dataset.merchant.name)
        .bind(dataset.merchant.active)
        .execute(pool)
        .await?;

    sqlx::query("INSERT INTO store_location (id, merchant_id, code, name, active) VALUES (?, ?, ?, ?, ?)")
        .bind(dataset.store.id.0)
        .bind(dataset.store.merchant_id.0)
        .bind(&dataset.store.code)
        .bind(&dataset.store.name)
        .bind(dataset.store.active)
        .execute(pool)
        .await?;

    for group in &dataset.tax_groups {
        sqlx::query(
            "INSERT INTO tax_group (id, code, name, rate_percent, zero_rated) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(group.id.0)
        .bind(&group.code)
        .bind(&group.name)
        .bind(group.rate_percent.to_string())
        .bind(group.zero_rated)
        .execute(pool)
        .await?;
    }

    for product in &dataset.products {
        sqlx::query(
            "INSERT INTO product (id, merchant_id, sku, name, base_price, tax_group_id, active)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(product.id.0)
        .bind(product.merchant_id.0)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.base_price.to_string())
        .bind(product.tax_group_id.map(|id| id.0))
        .bind(product.active)
        .execute(pool)
        .await?;
    }

    for entry in &dataset.price_book {
        sqlx::query(
            "INSERT INTO price_book_entry (id, merchant_id, product_id, price, active, effective_from, effective_to)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.id)
        .bind(entry.merchant_id.0)
        .bind(entry.product_id.0)
        .bind(entry.price.to_string())
        .bind(entry.active)
        .bind(entry.effective_from.map(|dt| dt.to_rfc3339()))
        .bind(entry.effective_to.map(|dt| dt.to_rfc3339()))
        .execute(pool)
        .await?;
    }

    for row in &dataset.overrides {
        sqlx::query(
            "INSERT INTO store_price_override (id, store_location_id, product_id, price, active, effective_from, effective_to)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(row.id)
        .bind(row.store_location_id.0)
        .bind(row.product_id.0)
        .bind(row.price.to_string())
        .bind(row.active)
        .bind(row.effective_from.map(|dt| dt.to_rfc3339()))
        .bind(row.effective_to.map(|dt| dt.to_rfc3339()))
        .execute(pool)
        .await?;
    }

    for rule in &dataset.tax_rules {
        sqlx::query(
            "INSERT INTO store_tax_rule (id, store_location_id, tax_group_id, mode, exempt, active, effective_from, effective_to)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(rule.id)
        .bind(rule.store_location_id.0)
        .bind(rule.tax_group_id.0)
        .bind(mode_as_str(rule.mode))
        .bind(rule.exempt)
        .bind(rule.active)
        .bind(rule.effective_from.map(|dt| dt.to_rfc3339()))
        .bind(rule.effective_to.map(|dt| dt.to_rfc3339()))
        .execute(pool)
        .await?;
    }

    for policy in &dataset.rounding_policies {
        sqlx::query(
            "INSERT INTO rounding_policy (id, store_location_id, tender_type, method, increment, active)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(policy.id)
        .bind(policy.store_location_id.0)
        .bind(tender_as_str(policy.tender_type))
        .bind(method_as_str(policy.method))
        .bind(policy.increment.to_string())
        .bind(policy.active)
        .execute(pool)
        .await?;
    }

    for code in &dataset.reason_codes {
        sqlx::query(
            "INSERT INTO reason_code (id, merchant_id, code, description, active) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(code.id.0)
        .bind(code.merchant_id.map(|id| id.0))
        .bind(&code.code)
        .bind(code.description.as_deref())
        .bind(code.active)
        .execute(pool)
        .await?;
    }

    Ok(())
}
