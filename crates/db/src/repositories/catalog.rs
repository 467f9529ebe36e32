use sqlx::Row;

use tillpoint_core::domain::catalog::{
    Merchant, MerchantId, Product, ProductId, StoreLocation, StoreLocationId,
};
use tillpoint_core::domain::tax::{TaxGroup, TaxGroupId};

use super::{decode_decimal, CatalogRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCatalogRepository {
    pool: DbPool,
}

impl SqlCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Result<Product, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let merchant_id: i64 =
        row.try_get("merchant_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let sku: String = row.try_get("sku").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let base_price_text: String =
        row.try_get("base_price").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let tax_group_id: Option<i64> =
        row.try_get("tax_group_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let active: bool = row.try_get("active").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Product {
        id: ProductId(id),
        merchant_id: MerchantId(merchant_id),
        sku,
        name,
        base_price: decode_decimal("base_price", &base_price_text)?,
        tax_group_id: tax_group_id.map(TaxGroupId),
        active,
    })
}

#[async_trait::async_trait]
impl CatalogRepository for SqlCatalogRepository {
    async fn merchant(&self, id: MerchantId) -> Result<Option<Merchant>, RepositoryError> {
        let row = sqlx::query("SELECT id, name, active FROM merchant WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| {
            Ok(Merchant {
                id: MerchantId(
                    r.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?,
                ),
                name: r.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?,
                active: r.try_get("active").map_err(|e| RepositoryError::Decode(e.to_string()))?,
            })
        })
        .transpose()
    }

    async fn store_location(
        &self,
        id: StoreLocationId,
    ) -> Result<Option<StoreLocation>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, merchant_id, code, name, active FROM store_location WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            Ok(StoreLocation {
                id: StoreLocationId(
                    r.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?,
                ),
                merchant_id: MerchantId(
                    r.try_get("merchant_id").map_err(|e| RepositoryError::Decode(e.to_string()))?,
                ),
                code: r.try_get("code").map_err(|e| RepositoryError::Decode(e.to_string()))?,
                name: r.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?,
                active: r.try_get("active").map_err(|e| RepositoryError::Decode(e.to_string()))?,
            })
        })
        .transpose()
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, merchant_id, sku, name, base_price, tax_group_id, active
             FROM product WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn tax_group(&self, id: TaxGroupId) -> Result<Option<TaxGroup>, RepositoryError> {
        let row =
            sqlx::query("SELECT id, code, name, rate_percent, zero_rated FROM tax_group WHERE id = ?")
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|r| {
            let rate_text: String =
                r.try_get("rate_percent").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            Ok(TaxGroup {
                id: TaxGroupId(
                    r.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?,
                ),
                code: r.try_get("code").map_err(|e| RepositoryError::Decode(e.to_string()))?,
                name: r.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?,
                rate_percent: decode_decimal("rate_percent", &rate_text)?,
                zero_rated: r
                    .try_get("zero_rated")
                    .map_err(|e| RepositoryError::Decode(e.to_string()))?,
            })
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use tillpoint_core::domain::catalog::{MerchantId, ProductId, StoreLocationId};
    use tillpoint_core::domain::tax::TaxGroupId;

    use super::SqlCatalogRepository;
    use crate::fixtures::{self, SeedDataset};
    use crate::repositories::CatalogRepository;
    use crate::{connect_with_settings, migrations, DbPool};

    async fn seeded_pool() -> (DbPool, SeedDataset) {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("run migrations");
        let dataset = SeedDataset::standard();
        fixtures::apply(&pool, &dataset).await.expect("apply seed");
        (pool, dataset)
    }

    #[tokio::test]
    async fn loads_seeded_catalog_rows() {
        let (pool, dataset) = seeded_pool().await;
        let repo = SqlCatalogRepository::new(pool);

        let merchant =
            repo.merchant(dataset.merchant.id).await.expect("query").expect("merchant row");
        assert_eq!(merchant, dataset.merchant);

        let store =
            repo.store_location(dataset.store.id).await.expect("query").expect("store row");
        assert_eq!(store, dataset.store);

        let product =
            repo.product(dataset.products[0].id).await.expect("query").expect("product row");
        assert_eq!(product, dataset.products[0]);
        assert_eq!(product.base_price.to_string(), "10.50");

        let group =
            repo.tax_group(dataset.tax_groups[0].id).await.expect("query").expect("group row");
        assert_eq!(group, dataset.tax_groups[0]);
        assert_eq!(group.rate_percent.to_string(), "18.0000");
    }

    #[tokio::test]
    async fn missing_rows_return_none() {
        let (pool, _) = seeded_pool().await;
        let repo = SqlCatalogRepository::new(pool);

        assert!(repo.merchant(MerchantId(999)).await.expect("query").is_none());
        assert!(repo.store_location(StoreLocationId(999)).await.expect("query").is_none());
        assert!(repo.product(ProductId(999)).await.expect("query").is_none());
        assert!(repo.tax_group(TaxGroupId(999)).await.expect("query").is_none());
    }
}
