use chrono::{DateTime, Utc};
use sqlx::Row;

use tillpoint_core::domain::catalog::{MerchantId, ProductId, StoreLocationId};
use tillpoint_core::domain::discount::{
    DiscountEntry, DiscountId, DiscountKind, DiscountScope, ReasonCode, ReasonCodeId,
};

use super::{
    decode_decimal, decode_timestamp, decode_timestamp_opt, DiscountRepository, NewDiscountEntry,
    RepositoryError,
};
use crate::DbPool;

pub struct SqlDiscountRepository {
    pool: DbPool,
}

impl SqlDiscountRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub fn scope_as_str(scope: DiscountScope) -> &'static str {
    match scope {
        DiscountScope::Line => "LINE",
        DiscountScope::Cart => "CART",
    }
}

fn parse_scope(raw: &str) -> Result<DiscountScope, RepositoryError> {
    match raw {
        "LINE" => Ok(DiscountScope::Line),
        "CART" => Ok(DiscountScope::Cart),
        other => Err(RepositoryError::Decode(format!("unknown discount scope `{other}`"))),
    }
}

pub fn kind_as_str(kind: DiscountKind) -> &'static str {
    match kind {
        DiscountKind::Percentage => "PERCENTAGE",
        DiscountKind::Fixed => "FIXED",
    }
}

fn parse_kind(raw: &str) -> Result<DiscountKind, RepositoryError> {
    match raw {
        "PERCENTAGE" => Ok(DiscountKind::Percentage),
        "FIXED" => Ok(DiscountKind::Fixed),
        other => Err(RepositoryError::Decode(format!("unknown discount kind `{other}`"))),
    }
}

fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<DiscountEntry, RepositoryError> {
    let scope_raw: String =
        row.try_get("scope").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let kind_raw: String =
        row.try_get("kind").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let value_text: String =
        row.try_get("value").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let product_id: Option<i64> =
        row.try_get("product_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let applied_at_raw: String =
        row.try_get("applied_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let removed_at_raw: Option<String> =
        row.try_get("removed_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(DiscountEntry {
        id: DiscountId(row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?),
        store_location_id: StoreLocationId(
            row.try_get("store_location_id").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        ),
        context_key: row
            .try_get("context_key")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        scope: parse_scope(&scope_raw)?,
        product_id: product_id.map(ProductId),
        kind: parse_kind(&kind_raw)?,
        value: decode_decimal("value", &value_text)?,
        reason_code_id: ReasonCodeId(
            row.try_get("reason_code_id").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        ),
        reason_code: row
            .try_get("reason_code")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        note: row.try_get("note").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        active: row.try_get("active").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        applied_by: row
            .try_get("applied_by")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        applied_at: decode_timestamp("applied_at", &applied_at_raw)?,
        removed_by: row.try_get("removed_by").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        removed_at: decode_timestamp_opt("removed_at", removed_at_raw)?,
    })
}

const ENTRY_COLUMNS: &str = "id, store_location_id, context_key, scope, product_id, kind, value,
        reason_code_id, reason_code, note, active, applied_by, applied_at, removed_by, removed_at";

#[async_trait::async_trait]
impl DiscountRepository for SqlDiscountRepository {
    async fn find_reason_code(
        &self,
        merchant_id: MerchantId,
        code: &str,
    ) -> Result<Option<ReasonCode>, RepositoryError> {
        // Merchant-scoped codes shadow global ones with the same code.
        let row = sqlx::query(
            "SELECT id, merchant_id, code, description, active
             FROM reason_code
             WHERE code = ? AND active = 1 AND (merchant_id = ? OR merchant_id IS NULL)
             ORDER BY merchant_id IS NULL, id
             LIMIT 1",
        )
        .bind(code)
        .bind(merchant_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            let merchant: Option<i64> =
                r.try_get("merchant_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            Ok(ReasonCode {
                id: ReasonCodeId(
                    r.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?,
                ),
                merchant_id: merchant.map(MerchantId),
                code: r.try_get("code").map_err(|e| RepositoryError::Decode(e.to_string()))?,
                description: r
                    .try_get("description")
                    .map_err(|e| RepositoryError::Decode(e.to_string()))?,
                active: r.try_get("active").map_err(|e| RepositoryError::Decode(e.to_string()))?,
            })
        })
        .transpose()
    }

    async fn insert(&self, entry: NewDiscountEntry) -> Result<DiscountEntry, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO discount_entry (store_location_id, context_key, scope, product_id, kind,
                                         value, reason_code_id, reason_code, note, active,
                                         applied_by, applied_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)",
        )
        .bind(entry.store_location_id.0)
        .bind(&entry.context_key)
        .bind(scope_as_str(entry.scope))
        .bind(entry.product_id.map(|id| id.0))
        .bind(kind_as_str(entry.kind))
        .bind(entry.value.to_string())
        .bind(entry.reason_code_id.0)
        .bind(&entry.reason_code)
        .bind(&entry.note)
        .bind(&entry.applied_by)
        .bind(entry.applied_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        let row = sqlx::query(&format!("SELECT {ENTRY_COLUMNS} FROM discount_entry WHERE id = ?"))
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        row_to_entry(&row)
    }

    async fn find_active(
        &self,
        store_location_id: StoreLocationId,
        id: DiscountId,
    ) -> Result<Option<DiscountEntry>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM discount_entry
             WHERE id = ? AND store_location_id = ? AND active = 1"
        ))
        .bind(id.0)
        .bind(store_location_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_entry).transpose()
    }

    async fn mark_removed(
        &self,
        id: DiscountId,
        removed_by: &str,
        removed_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE discount_entry
             SET active = 0, removed_by = ?, removed_at = ?
             WHERE id = ? AND active = 1",
        )
        .bind(removed_by)
        .bind(removed_at.to_rfc3339())
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn active_for_context(
        &self,
        store_location_id: StoreLocationId,
        context_key: &str,
    ) -> Result<Vec<DiscountEntry>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM discount_entry
             WHERE store_location_id = ? AND context_key = ? AND active = 1
             ORDER BY applied_at ASC, id ASC"
        ))
        .bind(store_location_id.0)
        .bind(context_key)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_entry).collect()
    }
}
