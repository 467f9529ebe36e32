//! Tax engine: per-line net/tax/gross with store rules, plus tender
//! rounding of the payable total when a tender type is given.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tillpoint_core::domain::catalog::{ProductId, StoreLocation, StoreLocationId};
use tillpoint_core::domain::tax::{TaxMode, TenderType};
use tillpoint_core::money::{round_money, zero_money};
use tillpoint_core::rounding::RoundingOutcome;
use tillpoint_core::tax::{applicable_rule, line_amounts};
use tillpoint_db::repositories::{CatalogRepository, TaxRepository};

use crate::error::EngineError;
use crate::pricing::{PriceLookupRequest, PriceResolver};
use crate::rounding::RoundingEngine;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaxPreviewLine {
    pub product_id: ProductId,
    pub quantity: Decimal,
    /// Explicit unit price; resolved through the price resolver when absent.
    pub unit_price: Option<Decimal>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaxPreviewRequest {
    pub store_location_id: StoreLocationId,
    /// Defaults to now.
    pub at: Option<DateTime<Utc>>,
    /// Enables tender rounding of the payable total when present.
    pub tender_type: Option<TenderType>,
    pub lines: Vec<TaxPreviewLine>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaxLineBreakdown {
    pub line_number: u32,
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub rate_percent: Decimal,
    pub mode: TaxMode,
    pub exempt: bool,
    pub zero_rated: bool,
    pub net: Decimal,
    pub tax: Decimal,
    pub gross: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaxPreviewResponse {
    pub store_location_id: StoreLocationId,
    pub lines: Vec<TaxLineBreakdown>,
    pub subtotal_net: Decimal,
    pub total_tax: Decimal,
    pub total_gross: Decimal,
    pub rounding: RoundingOutcome,
    pub rounding_adjustment: Decimal,
    pub total_payable: Decimal,
}

pub struct TaxEngine {
    catalog: Arc<dyn CatalogRepository>,
    tax: Arc<dyn TaxRepository>,
    resolver: Arc<PriceResolver>,
    rounding: Arc<RoundingEngine>,
}

impl TaxEngine {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        tax: Arc<dyn TaxRepository>,
        resolver: Arc<PriceResolver>,
        rounding: Arc<RoundingEngine>,
    ) -> Self {
        Self { catalog, tax, resolver, rounding }
    }

    pub async fn preview(
        &self,
        request: TaxPreviewRequest,
    ) -> Result<TaxPreviewResponse, EngineError> {
        if request.lines.is_empty() {
            return Err(EngineError::validation("at least one line is required"));
        }
        let store = self.resolver.load_store(request.store_location_id).await?;
        let at = request.at.unwrap_or_else(Utc::now);

        let mut lines = Vec::with_capacity(request.lines.len());
        let mut subtotal_net = zero_money();
        let mut total_tax = zero_money();
        let mut total_gross = zero_money();

        for (index, line) in request.lines.iter().enumerate() {
            let line_number = index as u32 + 1;
            let breakdown = self.line_breakdown(&store, line, line_number, at).await?;
            subtotal_net = round_money(subtotal_net + breakdown.net);
            total_tax = round_money(total_tax + breakdown.tax);
            total_gross = round_money(total_gross + breakdown.gross);
            lines.push(breakdown);
        }

        let rounding =
            self.rounding.apply(store.id, request.tender_type, total_gross).await?;
        let rounding_adjustment = rounding.adjustment;
        let total_payable = rounding.rounded_amount;

        Ok(TaxPreviewResponse {
            store_location_id: store.id,
            lines,
            subtotal_net,
            total_tax,
            total_gross,
            rounding,
            rounding_adjustment,
            total_payable,
        })
    }

    async fn line_breakdown(
        &self,
        store: &StoreLocation,
        line: &TaxPreviewLine,
        line_number: u32,
        at: DateTime<Utc>,
    ) -> Result<TaxLineBreakdown, EngineError> {
        if line.quantity <= Decimal::ZERO {
            return Err(EngineError::validation(format!(
                "line {line_number}: quantity must be greater than zero"
            )));
        }

        let product = self.resolver.load_product(store, line.product_id).await?;
        let unit_price = match line.unit_price {
            Some(price) => {
                if price < Decimal::ZERO {
                    return Err(EngineError::validation(format!(
                        "line {line_number}: unitPrice must not be negative"
                    )));
                }
                round_money(price)
            }
            None => {
                let resolution = self
                    .resolver
                    .resolve(PriceLookupRequest {
                        store_location_id: store.id,
                        product_id: product.id,
                        at: Some(at),
                    })
                    .await?;
                resolution.unit_price
            }
        };

        let group_id = product.tax_group_id.ok_or_else(|| {
            EngineError::validation(format!(
                "product {} has no tax group assigned",
                product.id.0
            ))
        })?;
        let group = self.catalog.tax_group(group_id).await?.ok_or_else(|| {
            EngineError::not_found(format!("tax group {} not found", group_id.0))
        })?;

        let rules = self.tax.tax_rules(store.id, group_id).await?;
        let rule = applicable_rule(&rules, at).ok_or_else(|| {
            EngineError::validation(format!(
                "no applicable tax rule for tax group {} at store {}",
                group.code, store.id.0
            ))
        })?;

        let amounts = line_amounts(line.quantity, unit_price, &group, rule)?;
        Ok(TaxLineBreakdown {
            line_number,
            product_id: product.id,
            sku: product.sku,
            name: product.name,
            quantity: line.quantity,
            unit_price,
            rate_percent: amounts.rate_percent,
            mode: rule.mode,
            exempt: amounts.exempt,
            zero_rated: amounts.zero_rated,
            net: amounts.net,
            tax: amounts.tax,
            gross: amounts.gross,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::Arc;

    use rust_decimal::Decimal;

    use tillpoint_core::domain::catalog::{ProductId, StoreLocationId};
    use tillpoint_core::domain::tax::TenderType;
    use tillpoint_core::Error;
    use tillpoint_db::fixtures::SeedDataset;
    use tillpoint_db::repositories::{
        InMemoryCatalogRepository, InMemoryDiscountRepository, InMemoryPriceRepository,
        InMemoryTaxRepository,
    };

    use super::{TaxEngine, TaxPreviewLine, TaxPreviewRequest};
    use crate::error::EngineError;
    use crate::pricing::PriceResolver;
    use crate::rounding::RoundingEngine;

    fn dec(text: &str) -> Decimal {
        Decimal::from_str(text).expect("decimal literal")
    }

    async fn seeded_engine() -> TaxEngine {
        let catalog = Arc::new(InMemoryCatalogRepository::default());
        let price = Arc::new(InMemoryPriceRepository::default());
        let discount = InMemoryDiscountRepository::default();
        let tax = Arc::new(InMemoryTaxRepository::default());
        SeedDataset::standard().load_into(&catalog, &price, &discount, &tax).await;

        let resolver = Arc::new(PriceResolver::new(catalog.clone(), price));
        let rounding = Arc::new(RoundingEngine::new(tax.clone()));
        TaxEngine::new(catalog, tax, resolver, rounding)
    }

    fn line(product_id: i64, quantity: &str, unit_price: Option<&str>) -> TaxPreviewLine {
        TaxPreviewLine {
            product_id: ProductId(product_id),
            quantity: dec(quantity),
            unit_price: unit_price.map(dec),
        }
    }

    fn request(lines: Vec<TaxPreviewLine>, tender: Option<TenderType>) -> TaxPreviewRequest {
        TaxPreviewRequest {
            store_location_id: StoreLocationId(10),
            at: None,
            tender_type: tender,
            lines,
        }
    }

    #[tokio::test]
    async fn exclusive_tax_adds_on_top_per_line() {
        let engine = seeded_engine().await;
        let response = engine
            .preview(request(
                vec![line(1000, "1", Some("7.45")), line(1001, "1", Some("16.55"))],
                None,
            ))
            .await
            .expect("preview");

        assert_eq!(response.lines[0].tax.to_string(), "1.34");
        assert_eq!(response.lines[1].tax.to_string(), "2.98");
        assert_eq!(response.subtotal_net.to_string(), "24.00");
        assert_eq!(response.total_tax.to_string(), "4.32");
        assert_eq!(response.total_gross.to_string(), "28.32");
        assert!(!response.rounding.applied);
        assert_eq!(response.total_payable.to_string(), "28.32");
    }

    #[tokio::test]
    async fn missing_unit_price_is_resolved() {
        let engine = seeded_engine().await;
        let response =
            engine.preview(request(vec![line(1000, "2", None)], None)).await.expect("preview");

        // Cola resolves to the 10.00 store override.
        assert_eq!(response.lines[0].unit_price.to_string(), "10.00");
        assert_eq!(response.lines[0].net.to_string(), "20.00");
        assert_eq!(response.lines[0].tax.to_string(), "3.60");
    }

    #[tokio::test]
    async fn zero_rated_product_pays_no_tax() {
        let engine = seeded_engine().await;
        let response =
            engine.preview(request(vec![line(1002, "3", None)], None)).await.expect("preview");

        assert_eq!(response.lines[0].tax.to_string(), "0.00");
        assert!(response.lines[0].zero_rated);
        assert!(response.lines[0].exempt);
        assert_eq!(response.total_gross.to_string(), "10.50");
    }

    #[tokio::test]
    async fn cash_tender_rounds_the_payable_total() {
        let engine = seeded_engine().await;
        let response = engine
            .preview(request(vec![line(1000, "1", Some("8.50"))], Some(TenderType::Cash)))
            .await
            .expect("preview");

        // 8.50 + 1.53 tax = 10.03 gross, rounded to the nickel.
        assert_eq!(response.total_gross.to_string(), "10.03");
        assert!(response.rounding.applied);
        assert_eq!(response.rounding_adjustment.to_string(), "0.02");
        assert_eq!(response.total_payable.to_string(), "10.05");
    }

    #[tokio::test]
    async fn zero_quantity_is_rejected() {
        let engine = seeded_engine().await;
        let error = engine
            .preview(request(vec![line(1000, "0", Some("5.00"))], None))
            .await
            .expect_err("zero quantity");
        assert!(matches!(error, EngineError::Domain(Error::Validation(_))));
    }

    #[tokio::test]
    async fn empty_line_list_is_rejected() {
        let engine = seeded_engine().await;
        let error = engine.preview(request(vec![], None)).await.expect_err("no lines");
        assert!(matches!(error, EngineError::Domain(Error::Validation(_))));
    }
}
