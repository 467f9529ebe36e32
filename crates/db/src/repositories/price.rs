use sqlx::Row;

use tillpoint_core::domain::catalog::{
    MerchantId, PriceBookEntry, ProductId, StoreLocationId, StorePriceOverride,
};

use super::{decode_decimal, decode_timestamp_opt, PriceRepository, RepositoryError};
use crate::DbPool;

pub struct SqlPriceRepository {
    pool: DbPool,
}

impl SqlPriceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_override(row: &sqlx::sqlite::SqliteRow) -> Result<StorePriceOverride, RepositoryError> {
    let price_text: String =
        row.try_get("price").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let effective_from: Option<String> =
        row.try_get("effective_from").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let effective_to: Option<String> =
        row.try_get("effective_to").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(StorePriceOverride {
        id: row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        store_location_id: StoreLocationId(
            row.try_get("store_location_id").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        ),
        product_id: ProductId(
            row.try_get("product_id").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        ),
        price: decode_decimal("price", &price_text)?,
        active: row.try_get("active").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        effective_from: decode_timestamp_opt("effective_from", effective_from)?,
        effective_to: decode_timestamp_opt("effective_to", effective_to)?,
    })
}

fn row_to_book_entry(row: &sqlx::sqlite::SqliteRow) -> Result<PriceBookEntry, RepositoryError> {
    let price_text: String =
        row.try_get("price").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let effective_from: Option<String> =
        row.try_get("effective_from").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let effective_to: Option<String> =
        row.try_get("effective_to").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(PriceBookEntry {
        id: row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        merchant_id: MerchantId(
            row.try_get("merchant_id").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        ),
        product_id: ProductId(
            row.try_get("product_id").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        ),
        price: decode_decimal("price", &price_text)?,
        active: row.try_get("active").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        effective_from: decode_timestamp_opt("effective_from", effective_from)?,
        effective_to: decode_timestamp_opt("effective_to", effective_to)?,
    })
}

#[async_trait::async_trait]
impl PriceRepository for SqlPriceRepository {
    async fn store_overrides(
        &self,
        store_location_id: StoreLocationId,
        product_id: ProductId,
    ) -> Result<Vec<StorePriceOverride>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, store_location_id, product_id, price, active, effective_from, effective_to
             FROM store_price_override
             WHERE store_location_id = ? AND product_id = ?
             ORDER BY COALESCE(effective_from, '') DESC, id DESC",
        )
        .bind(store_location_id.0)
        .bind(product_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_override).collect()
    }

    async fn price_book_entries(
        &self,
        merchant_id: MerchantId,
        product_id: ProductId,
    ) -> Result<Vec<PriceBookEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, merchant_id, product_id, price, active, effective_from, effective_to
             FROM price_book_entry
             WHERE merchant_id = ? AND product_id = ?
             ORDER BY COALESCE(effective_from, '') DESC, id DESC",
        )
        .bind(merchant_id.0)
        .bind(product_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_book_entry).collect()
    }
}
