//! Rounding engine: looks up the store's policy for a tender type and
//! applies it to a payable amount.

use std::sync::Arc;

use rust_decimal::Decimal;

use tillpoint_core::domain::catalog::StoreLocationId;
use tillpoint_core::domain::tax::TenderType;
use tillpoint_core::rounding::{apply_policy, no_rounding, RoundingOutcome};
use tillpoint_db::repositories::TaxRepository;

use crate::error::EngineError;

pub struct RoundingEngine {
    tax: Arc<dyn TaxRepository>,
}

impl RoundingEngine {
    pub fn new(tax: Arc<dyn TaxRepository>) -> Self {
        Self { tax }
    }

    /// Rounds `amount` per the store's active policy for `tender_type`.
    /// With no tender type or no configured policy the amount passes
    /// through unchanged and the outcome says so.
    pub async fn apply(
        &self,
        store_location_id: StoreLocationId,
        tender_type: Option<TenderType>,
        amount: Decimal,
    ) -> Result<RoundingOutcome, EngineError> {
        if amount < Decimal::ZERO {
            return Err(EngineError::validation("amount to round must not be negative"));
        }

        let tender = match tender_type {
            Some(tender) => tender,
            None => return Ok(no_rounding(None, amount)),
        };

        match self.tax.rounding_policy(store_location_id, tender).await? {
            Some(policy) => Ok(apply_policy(&policy, amount)?),
            None => Ok(no_rounding(Some(tender), amount)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::Arc;

    use rust_decimal::Decimal;

    use tillpoint_core::domain::catalog::StoreLocationId;
    use tillpoint_core::domain::tax::{RoundingMethod, TenderType};
    use tillpoint_core::Error;
    use tillpoint_db::fixtures::SeedDataset;
    use tillpoint_db::repositories::{
        InMemoryCatalogRepository, InMemoryDiscountRepository, InMemoryPriceRepository,
        InMemoryTaxRepository,
    };

    use super::RoundingEngine;
    use crate::error::EngineError;

    fn dec(text: &str) -> Decimal {
        Decimal::from_str(text).expect("decimal literal")
    }

    async fn seeded_engine() -> RoundingEngine {
        let catalog = InMemoryCatalogRepository::default();
        let price = InMemoryPriceRepository::default();
        let discount = InMemoryDiscountRepository::default();
        let tax = Arc::new(InMemoryTaxRepository::default());
        SeedDataset::standard().load_into(&catalog, &price, &discount, &tax).await;
        RoundingEngine::new(tax)
    }

    #[tokio::test]
    async fn cash_tender_rounds_to_the_nickel() {
        let engine = seeded_engine().await;
        let outcome = engine
            .apply(StoreLocationId(10), Some(TenderType::Cash), dec("10.03"))
            .await
            .expect("round");
        assert!(outcome.applied);
        assert_eq!(outcome.method, Some(RoundingMethod::Nearest));
        assert_eq!(outcome.rounded_amount.to_string(), "10.05");
        assert_eq!(outcome.adjustment.to_string(), "0.02");
    }

    #[tokio::test]
    async fn card_tender_has_no_policy_and_passes_through() {
        let engine = seeded_engine().await;
        let outcome = engine
            .apply(StoreLocationId(10), Some(TenderType::Card), dec("10.03"))
            .await
            .expect("round");
        assert!(!outcome.applied);
        assert_eq!(outcome.rounded_amount.to_string(), "10.03");
        assert_eq!(outcome.adjustment.to_string(), "0.00");
    }

    #[tokio::test]
    async fn missing_tender_type_passes_through() {
        let engine = seeded_engine().await;
        let outcome = engine.apply(StoreLocationId(10), None, dec("17.89")).await.expect("round");
        assert!(!outcome.applied);
        assert_eq!(outcome.rounded_amount.to_string(), "17.89");
    }

    #[tokio::test]
    async fn negative_amount_is_rejected() {
        let engine = seeded_engine().await;
        let error = engine
            .apply(StoreLocationId(10), Some(TenderType::Cash), dec("-0.01"))
            .await
            .expect_err("negative amount");
        assert!(matches!(error, EngineError::Domain(Error::Validation(_))));
    }
}
