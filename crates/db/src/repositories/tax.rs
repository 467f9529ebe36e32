use sqlx::Row;

use tillpoint_core::domain::catalog::StoreLocationId;
use tillpoint_core::domain::tax::{
    RoundingMethod, RoundingPolicy, StoreTaxRule, TaxGroupId, TaxMode, TenderType,
};

use super::{decode_decimal, decode_timestamp_opt, RepositoryError, TaxRepository};
use crate::DbPool;

pub struct SqlTaxRepository {
    pool: DbPool,
}

impl SqlTaxRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub fn mode_as_str(mode: TaxMode) -> &'static str {
    match mode {
        TaxMode::Inclusive => "INCLUSIVE",
        TaxMode::Exclusive => "EXCLUSIVE",
    }
}

fn parse_mode(raw: &str) -> Result<TaxMode, RepositoryError> {
    match raw {
        "INCLUSIVE" => Ok(TaxMode::Inclusive),
        "EXCLUSIVE" => Ok(TaxMode::Exclusive),
        other => Err(RepositoryError::Decode(format!("unknown tax mode `{other}`"))),
    }
}

pub fn tender_as_str(tender: TenderType) -> &'static str {
    match tender {
        TenderType::Cash => "CASH",
        TenderType::Card => "CARD",
    }
}

pub fn method_as_str(method: RoundingMethod) -> &'static str {
    match method {
        RoundingMethod::Nearest => "NEAREST",
        RoundingMethod::Up => "UP",
        RoundingMethod::Down => "DOWN",
    }
}

fn parse_tender(raw: &str) -> Result<TenderType, RepositoryError> {
    match raw {
        "CASH" => Ok(TenderType::Cash),
        "CARD" => Ok(TenderType::Card),
        other => Err(RepositoryError::Decode(format!("unknown tender type `{other}`"))),
    }
}

fn parse_method(raw: &str) -> Result<RoundingMethod, RepositoryError> {
    match raw {
        "NEAREST" => Ok(RoundingMethod::Nearest),
        "UP" => Ok(RoundingMethod::Up),
        "DOWN" => Ok(RoundingMethod::Down),
        other => Err(RepositoryError::Decode(format!("unknown rounding method `{other}`"))),
    }
}

fn row_to_rule(row: &sqlx::sqlite::SqliteRow) -> Result<StoreTaxRule, RepositoryError> {
    let mode_raw: String =
        row.try_get("mode").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let effective_from: Option<String> =
        row.try_get("effective_from").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let effective_to: Option<String> =
        row.try_get("effective_to").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(StoreTaxRule {
        id: row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        store_location_id: StoreLocationId(
            row.try_get("store_location_id").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        ),
        tax_group_id: TaxGroupId(
            row.try_get("tax_group_id").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        ),
        mode: parse_mode(&mode_raw)?,
        exempt: row.try_get("exempt").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        active: row.try_get("active").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        effective_from: decode_timestamp_opt("effective_from", effective_from)?,
        effective_to: decode_timestamp_opt("effective_to", effective_to)?,
    })
}

#[async_trait::async_trait]
impl TaxRepository for SqlTaxRepository {
    async fn tax_rules(
        &self,
        store_location_id: StoreLocationId,
        tax_group_id: TaxGroupId,
    ) -> Result<Vec<StoreTaxRule>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, store_location_id, tax_group_id, mode, exempt, active,
                    effective_from, effective_to
             FROM store_tax_rule
             WHERE store_location_id = ? AND tax_group_id = ?
             ORDER BY COALESCE(effective_from, '') DESC, id DESC",
        )
        .bind(store_location_id.0)
        .bind(tax_group_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_rule).collect()
    }

    async fn rounding_policy(
        &self,
        store_location_id: StoreLocationId,
        tender_type: TenderType,
    ) -> Result<Option<RoundingPolicy>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, store_location_id, tender_type, method, increment, active
             FROM rounding_policy
             WHERE store_location_id = ? AND tender_type = ? AND active = 1
             LIMIT 1",
        )
        .bind(store_location_id.0)
        .bind(tender_as_str(tender_type))
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            let tender_raw: String =
                r.try_get("tender_type").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let method_raw: String =
                r.try_get("method").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let increment_text: String =
                r.try_get("increment").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            Ok(RoundingPolicy {
                id: r.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?,
                store_location_id: StoreLocationId(
                    r.try_get("store_location_id")
                        .map_err(|e| RepositoryError::Decode(e.to_string()))?,
                ),
                tender_type: parse_tender(&tender_raw)?,
                method: parse_method(&method_raw)?,
                increment: decode_decimal("increment", &increment_text)?,
                active: r.try_get("active").map_err(|e| RepositoryError::Decode(e.to_string()))?,
            })
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use tillpoint_core::domain::tax::{RoundingMethod, TenderType};

    use super::SqlTaxRepository;
    use crate::fixtures::{self, SeedDataset};
    use crate::repositories::TaxRepository;
    use crate::{connect_with_settings, migrations, DbPool};

    async fn seeded_pool() -> (DbPool, SeedDataset) {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("run migrations");
        let dataset = SeedDataset::standard();
        fixtures::apply(&pool, &dataset).await.expect("apply seed");
        (pool, dataset)
    }

    #[tokio::test]
    async fn loads_tax_rules_for_store_and_group() {
        let (pool, dataset) = seeded_pool().await;
        let repo = SqlTaxRepository::new(pool);

        let rules =
            repo.tax_rules(dataset.store.id, dataset.tax_groups[0].id).await.expect("rules");
        assert_eq!(rules, vec![dataset.tax_rules[0].clone()]);
    }

    #[tokio::test]
    async fn rounding_policy_matches_tender_type() {
        let (pool, dataset) = seeded_pool().await;
        let repo = SqlTaxRepository::new(pool);

        let cash = repo
            .rounding_policy(dataset.store.id, TenderType::Cash)
            .await
            .expect("query")
            .expect("cash policy");
        assert_eq!(cash.method, RoundingMethod::Nearest);
        assert_eq!(cash.increment.to_string(), "0.05");

        assert!(repo
            .rounding_policy(dataset.store.id, TenderType::Card)
            .await
            .expect("query")
            .is_none());
    }
}
