//! Discount engine: apply/remove audited discount entries and replay them
//! against a cart to preview totals, line allocations, and tax.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use tillpoint_core::allocation::{allocate_proportionally, discount_amount_for, PreviewLine};
use tillpoint_core::domain::catalog::{ProductId, StoreLocation, StoreLocationId};
use tillpoint_core::domain::discount::{
    normalize_context_key, normalize_discount_value, normalize_note, normalize_reason_code,
    requires_manager_approval, DiscountEntry, DiscountId, DiscountKind, DiscountScope,
};
use tillpoint_core::domain::tax::TenderType;
use tillpoint_core::money::{round_money, zero_money};
use tillpoint_db::repositories::{DiscountRepository, NewDiscountEntry};

use crate::actor::{Actor, PERMISSION_DISCOUNT_OVERRIDE};
use crate::error::EngineError;
use crate::pricing::{PriceLookupRequest, PriceResolver};
use crate::tax::{TaxEngine, TaxPreviewLine, TaxPreviewRequest, TaxPreviewResponse};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApplyDiscountRequest {
    pub store_location_id: StoreLocationId,
    pub context_key: String,
    pub scope: DiscountScope,
    /// Required for LINE scope, rejected for CART scope.
    pub product_id: Option<ProductId>,
    pub kind: DiscountKind,
    pub value: Decimal,
    pub reason_code: String,
    pub note: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppliedDiscount {
    pub entry: DiscountEntry,
    /// True when the value crossed the high-discount threshold and the
    /// override permission was consumed.
    pub manager_approval_required: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemoveDiscountRequest {
    pub discount_id: DiscountId,
    pub store_location_id: StoreLocationId,
    pub context_key: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: Decimal,
    /// Explicit unit price; resolved through the price resolver when absent.
    pub unit_price: Option<Decimal>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiscountPreviewRequest {
    pub store_location_id: StoreLocationId,
    pub context_key: String,
    /// Defaults to now.
    pub at: Option<DateTime<Utc>>,
    /// Forwarded to the tax preview for tender rounding.
    pub tender_type: Option<TenderType>,
    pub lines: Vec<CartLine>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreviewLineBreakdown {
    pub line_number: u32,
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub quantity: Decimal,
    pub original_unit_price: Decimal,
    pub subtotal_before_discount: Decimal,
    pub discount_amount: Decimal,
    pub subtotal_after_discount: Decimal,
    pub discounted_unit_price: Decimal,
}

/// One stored discount as it landed during replay, with its realized
/// amount. Entries whose realized amount was zero are omitted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppliedDiscountAmount {
    pub discount_id: DiscountId,
    pub scope: DiscountScope,
    pub kind: DiscountKind,
    pub value: Decimal,
    pub reason_code: String,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiscountPreviewResponse {
    pub store_location_id: StoreLocationId,
    pub context_key: String,
    pub lines: Vec<PreviewLineBreakdown>,
    pub applied_discounts: Vec<AppliedDiscountAmount>,
    pub subtotal_before_discount: Decimal,
    pub total_discount: Decimal,
    pub subtotal_after_discount: Decimal,
    pub tax: TaxPreviewResponse,
}

pub struct DiscountEngine {
    resolver: Arc<PriceResolver>,
    discounts: Arc<dyn DiscountRepository>,
    tax: Arc<TaxEngine>,
}

impl DiscountEngine {
    pub fn new(
        resolver: Arc<PriceResolver>,
        discounts: Arc<dyn DiscountRepository>,
        tax: Arc<TaxEngine>,
    ) -> Self {
        Self { resolver, discounts, tax }
    }

    /// Records a discount entry. High-value discounts require the override
    /// permission on the actor.
    pub async fn apply(
        &self,
        request: ApplyDiscountRequest,
        actor: &Actor,
    ) -> Result<AppliedDiscount, EngineError> {
        let applied_by = required_actor_name(actor)?;
        let store = self.resolver.load_store(request.store_location_id).await?;
        let context_key = normalize_context_key(&request.context_key)?;
        let value = normalize_discount_value(request.value, request.kind)?;
        let reason_code = normalize_reason_code(&request.reason_code)?;
        let note = normalize_note(request.note.as_deref());

        let product_id = match request.scope {
            DiscountScope::Cart => {
                if request.product_id.is_some() {
                    return Err(EngineError::validation(
                        "productId must not be set for a CART discount",
                    ));
                }
                None
            }
            DiscountScope::Line => {
                let id = request.product_id.ok_or_else(|| {
                    EngineError::validation("productId is required for a LINE discount")
                })?;
                let product = self.resolver.load_product(&store, id).await?;
                Some(product.id)
            }
        };

        let manager_approval_required = requires_manager_approval(request.kind, value);
        if manager_approval_required && !actor.has_permission(PERMISSION_DISCOUNT_OVERRIDE) {
            return Err(EngineError::forbidden(
                "discount exceeds the approval threshold and requires the \
                 discount.override permission",
            ));
        }

        let resolved_code = self
            .discounts
            .find_reason_code(store.merchant_id, &reason_code)
            .await?
            .ok_or_else(|| {
                EngineError::not_found(format!("reason code {reason_code} not found"))
            })?;

        let entry = self
            .discounts
            .insert(NewDiscountEntry {
                store_location_id: store.id,
                context_key,
                scope: request.scope,
                product_id,
                kind: request.kind,
                value,
                reason_code_id: resolved_code.id,
                reason_code: resolved_code.code,
                note,
                applied_by,
                applied_at: Utc::now(),
            })
            .await?;

        info!(
            discount_id = entry.id.0,
            store_location_id = store.id.0,
            context_key = %entry.context_key,
            applied_by = %entry.applied_by,
            manager_approval_required,
            "discount applied"
        );

        Ok(AppliedDiscount { entry, manager_approval_required })
    }

    /// Deactivates an entry identified by id, store, and context key.
    /// Removing an already-removed or mismatched entry is NotFound.
    pub async fn remove(
        &self,
        request: RemoveDiscountRequest,
        actor: &Actor,
    ) -> Result<DiscountEntry, EngineError> {
        let removed_by = required_actor_name(actor)?;
        let store = self.resolver.load_store(request.store_location_id).await?;
        let context_key = normalize_context_key(&request.context_key)?;

        let mut entry = self
            .discounts
            .find_active(store.id, request.discount_id)
            .await?
            .filter(|entry| entry.context_key == context_key)
            .ok_or_else(|| {
                EngineError::not_found(format!(
                    "active discount {} not found for context {context_key}",
                    request.discount_id.0
                ))
            })?;

        let removed_at = Utc::now();
        self.discounts.mark_removed(entry.id, &removed_by, removed_at).await?;
        entry.active = false;
        entry.removed_by = Some(removed_by);
        entry.removed_at = Some(removed_at);

        info!(
            discount_id = entry.id.0,
            store_location_id = store.id.0,
            context_key = %entry.context_key,
            removed_by = %entry.removed_by.as_deref().unwrap_or_default(),
            "discount removed"
        );

        Ok(entry)
    }

    /// Replays the context's active discounts against the cart: LINE
    /// entries first, then CART entries, each in application order.
    /// Discounted unit prices feed the nested tax preview.
    pub async fn preview(
        &self,
        request: DiscountPreviewRequest,
    ) -> Result<DiscountPreviewResponse, EngineError> {
        if request.lines.is_empty() {
            return Err(EngineError::validation("at least one line is required"));
        }
        let store = self.resolver.load_store(request.store_location_id).await?;
        let context_key = normalize_context_key(&request.context_key)?;
        let at = request.at.unwrap_or_else(Utc::now);

        let mut lines = Vec::with_capacity(request.lines.len());
        let mut metas = Vec::with_capacity(request.lines.len());
        for (index, cart_line) in request.lines.iter().enumerate() {
            let line_number = index as u32 + 1;
            let (preview_line, sku, name) =
                self.build_line(&store, cart_line, line_number, at).await?;
            lines.push(preview_line);
            metas.push((sku, name));
        }

        let entries = self.discounts.active_for_context(store.id, &context_key).await?;
        let mut applied_discounts = Vec::new();

        for entry in entries.iter().filter(|entry| entry.scope == DiscountScope::Line) {
            let targets: Vec<usize> = lines
                .iter()
                .enumerate()
                .filter(|(_, line)| Some(line.product_id) == entry.product_id)
                .map(|(index, _)| index)
                .collect();
            self.land_entry(&mut lines, &targets, entry, &mut applied_discounts);
        }

        let all_targets: Vec<usize> = (0..lines.len()).collect();
        for entry in entries.iter().filter(|entry| entry.scope == DiscountScope::Cart) {
            self.land_entry(&mut lines, &all_targets, entry, &mut applied_discounts);
        }

        let subtotal_before_discount = round_money(
            lines.iter().map(|line| line.subtotal_before_discount).sum::<Decimal>(),
        );
        let total_discount =
            round_money(lines.iter().map(|line| line.discount_amount).sum::<Decimal>());
        let subtotal_after_discount = round_money(
            lines.iter().map(|line| line.subtotal_after_discount).sum::<Decimal>(),
        );

        let tax = self
            .tax
            .preview(TaxPreviewRequest {
                store_location_id: store.id,
                at: Some(at),
                tender_type: request.tender_type,
                lines: lines
                    .iter()
                    .map(|line| TaxPreviewLine {
                        product_id: line.product_id,
                        quantity: line.quantity,
                        unit_price: Some(line.discounted_unit_price()),
                    })
                    .collect(),
            })
            .await?;

        let lines = lines
            .into_iter()
            .zip(metas)
            .map(|(line, (sku, name))| PreviewLineBreakdown {
                line_number: line.line_number,
                product_id: line.product_id,
                sku,
                name,
                quantity: line.quantity,
                original_unit_price: line.original_unit_price,
                subtotal_before_discount: line.subtotal_before_discount,
                discount_amount: line.discount_amount,
                subtotal_after_discount: line.subtotal_after_discount,
                discounted_unit_price: line.discounted_unit_price(),
            })
            .collect();

        Ok(DiscountPreviewResponse {
            store_location_id: store.id,
            context_key,
            lines,
            applied_discounts,
            subtotal_before_discount,
            total_discount,
            subtotal_after_discount,
            tax,
        })
    }

    async fn build_line(
        &self,
        store: &StoreLocation,
        cart_line: &CartLine,
        line_number: u32,
        at: DateTime<Utc>,
    ) -> Result<(PreviewLine, String, String), EngineError> {
        if cart_line.quantity <= Decimal::ZERO {
            return Err(EngineError::validation(format!(
                "line {line_number}: quantity must be greater than zero"
            )));
        }
        let product = self.resolver.load_product(store, cart_line.product_id).await?;
        let unit_price = match cart_line.unit_price {
            Some(price) => {
                if price < Decimal::ZERO {
                    return Err(EngineError::validation(format!(
                        "line {line_number}: unitPrice must not be negative"
                    )));
                }
                round_money(price)
            }
            None => {
                self.resolver
                    .resolve(PriceLookupRequest {
                        store_location_id: store.id,
                        product_id: product.id,
                        at: Some(at),
                    })
                    .await?
                    .unit_price
            }
        };

        let line = PreviewLine::new(line_number, product.id, cart_line.quantity, unit_price);
        Ok((line, product.sku, product.name))
    }

    /// Lands one stored entry on its target lines. Entries that realize
    /// nothing (no targets, or an exhausted base) are skipped rather than
    /// reported.
    fn land_entry(
        &self,
        lines: &mut [PreviewLine],
        targets: &[usize],
        entry: &DiscountEntry,
        applied: &mut Vec<AppliedDiscountAmount>,
    ) {
        if targets.is_empty() {
            return;
        }
        let base = round_money(
            targets.iter().map(|&index| lines[index].subtotal_after_discount).sum::<Decimal>(),
        );
        let amount = discount_amount_for(entry.kind, entry.value, base);
        if amount <= zero_money() {
            return;
        }
        allocate_proportionally(lines, targets, amount);
        applied.push(AppliedDiscountAmount {
            discount_id: entry.id,
            scope: entry.scope,
            kind: entry.kind,
            value: entry.value,
            reason_code: entry.reason_code.clone(),
            amount,
        });
    }
}

fn required_actor_name(actor: &Actor) -> Result<String, EngineError> {
    let name = actor.name().trim();
    if name.is_empty() {
        return Err(EngineError::validation("actor name is required"));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::Arc;

    use rust_decimal::Decimal;

    use tillpoint_core::domain::catalog::{ProductId, StoreLocationId};
    use tillpoint_core::domain::discount::{DiscountId, DiscountKind, DiscountScope};
    use tillpoint_core::Error;
    use tillpoint_db::fixtures::SeedDataset;
    use tillpoint_db::repositories::{
        InMemoryCatalogRepository, InMemoryDiscountRepository, InMemoryPriceRepository,
        InMemoryTaxRepository,
    };

    use super::{
        ApplyDiscountRequest, CartLine, DiscountEngine, DiscountPreviewRequest,
        RemoveDiscountRequest,
    };
    use crate::actor::{Actor, PERMISSION_DISCOUNT_OVERRIDE};
    use crate::error::EngineError;
    use crate::pricing::PriceResolver;
    use crate::rounding::RoundingEngine;
    use crate::tax::TaxEngine;

    fn dec(text: &str) -> Decimal {
        Decimal::from_str(text).expect("decimal literal")
    }

    async fn seeded_engine() -> DiscountEngine {
        let catalog = Arc::new(InMemoryCatalogRepository::default());
        let price = Arc::new(InMemoryPriceRepository::default());
        let discount = Arc::new(InMemoryDiscountRepository::default());
        let tax = Arc::new(InMemoryTaxRepository::default());
        SeedDataset::standard().load_into(&catalog, &price, &discount, &tax).await;

        let resolver = Arc::new(PriceResolver::new(catalog.clone(), price));
        let rounding = Arc::new(RoundingEngine::new(tax.clone()));
        let tax_engine = Arc::new(TaxEngine::new(catalog, tax, resolver.clone(), rounding));
        DiscountEngine::new(resolver, discount, tax_engine)
    }

    fn cashier() -> Actor {
        Actor::new("cashier-1")
    }

    fn manager() -> Actor {
        Actor::with_permissions("manager-1", [PERMISSION_DISCOUNT_OVERRIDE])
    }

    fn line_request(product_id: i64, value: &str) -> ApplyDiscountRequest {
        ApplyDiscountRequest {
            store_location_id: StoreLocationId(10),
            context_key: "ctx-1".to_string(),
            scope: DiscountScope::Line,
            product_id: Some(ProductId(product_id)),
            kind: DiscountKind::Percentage,
            value: dec(value),
            reason_code: "promo".to_string(),
            note: None,
        }
    }

    fn cart_request(kind: DiscountKind, value: &str) -> ApplyDiscountRequest {
        ApplyDiscountRequest {
            store_location_id: StoreLocationId(10),
            context_key: "ctx-1".to_string(),
            scope: DiscountScope::Cart,
            product_id: None,
            kind,
            value: dec(value),
            reason_code: "PROMO".to_string(),
            note: None,
        }
    }

    fn preview_request(lines: Vec<CartLine>) -> DiscountPreviewRequest {
        DiscountPreviewRequest {
            store_location_id: StoreLocationId(10),
            context_key: "CTX-1".to_string(),
            at: None,
            tender_type: None,
            lines,
        }
    }

    fn cart_line(product_id: i64, quantity: &str, unit_price: &str) -> CartLine {
        CartLine {
            product_id: ProductId(product_id),
            quantity: dec(quantity),
            unit_price: Some(dec(unit_price)),
        }
    }

    #[tokio::test]
    async fn apply_normalizes_and_stores_the_entry() {
        let engine = seeded_engine().await;
        let applied =
            engine.apply(line_request(1000, "10"), &cashier()).await.expect("apply");

        assert_eq!(applied.entry.context_key, "CTX-1");
        assert_eq!(applied.entry.value.to_string(), "10.0000");
        assert_eq!(applied.entry.reason_code, "PROMO");
        assert_eq!(applied.entry.applied_by, "cashier-1");
        assert!(applied.entry.active);
        assert!(!applied.manager_approval_required);
    }

    #[tokio::test]
    async fn cart_scope_rejects_a_product_id() {
        let engine = seeded_engine().await;
        let mut request = cart_request(DiscountKind::Fixed, "5.00");
        request.product_id = Some(ProductId(1000));
        let error = engine.apply(request, &cashier()).await.expect_err("cart with product");
        assert!(matches!(error, EngineError::Domain(Error::Validation(_))));
    }

    #[tokio::test]
    async fn line_scope_requires_a_product_id() {
        let engine = seeded_engine().await;
        let mut request = line_request(1000, "10");
        request.product_id = None;
        let error = engine.apply(request, &cashier()).await.expect_err("line without product");
        assert!(matches!(error, EngineError::Domain(Error::Validation(_))));
    }

    #[tokio::test]
    async fn high_discount_needs_the_override_permission() {
        let engine = seeded_engine().await;

        let error = engine
            .apply(line_request(1000, "20"), &cashier())
            .await
            .expect_err("cashier above threshold");
        assert!(matches!(error, EngineError::Domain(Error::Forbidden(_))));

        let applied =
            engine.apply(line_request(1000, "20"), &manager()).await.expect("manager apply");
        assert!(applied.manager_approval_required);
    }

    #[tokio::test]
    async fn unknown_reason_code_is_not_found() {
        let engine = seeded_engine().await;
        let mut request = line_request(1000, "10");
        request.reason_code = "NOPE".to_string();
        let error = engine.apply(request, &cashier()).await.expect_err("unknown code");
        assert!(matches!(error, EngineError::Domain(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn anonymous_actor_is_rejected() {
        let engine = seeded_engine().await;
        let error = engine
            .apply(line_request(1000, "10"), &Actor::new("  "))
            .await
            .expect_err("blank actor");
        assert!(matches!(error, EngineError::Domain(Error::Validation(_))));
    }

    #[tokio::test]
    async fn remove_requires_a_matching_context_key() {
        let engine = seeded_engine().await;
        let applied =
            engine.apply(line_request(1000, "10"), &cashier()).await.expect("apply");

        let wrong_context = RemoveDiscountRequest {
            discount_id: applied.entry.id,
            store_location_id: StoreLocationId(10),
            context_key: "OTHER".to_string(),
        };
        let error = engine.remove(wrong_context, &manager()).await.expect_err("wrong context");
        assert!(matches!(error, EngineError::Domain(Error::NotFound(_))));

        let request = RemoveDiscountRequest {
            discount_id: applied.entry.id,
            store_location_id: StoreLocationId(10),
            context_key: "ctx-1".to_string(),
        };
        let removed = engine.remove(request.clone(), &manager()).await.expect("remove");
        assert!(!removed.active);
        assert_eq!(removed.removed_by.as_deref(), Some("manager-1"));

        // Second removal of the same entry.
        let error = engine.remove(request, &manager()).await.expect_err("already removed");
        assert!(matches!(error, EngineError::Domain(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn removing_an_unknown_id_is_not_found() {
        let engine = seeded_engine().await;
        let request = RemoveDiscountRequest {
            discount_id: DiscountId(404),
            store_location_id: StoreLocationId(10),
            context_key: "CTX-1".to_string(),
        };
        let error = engine.remove(request, &manager()).await.expect_err("unknown id");
        assert!(matches!(error, EngineError::Domain(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn preview_replays_line_then_cart_discounts() {
        let engine = seeded_engine().await;
        engine.apply(line_request(1000, "10"), &cashier()).await.expect("line discount");
        engine
            .apply(cart_request(DiscountKind::Fixed, "5.00"), &cashier())
            .await
            .expect("cart discount");

        let response = engine
            .preview(preview_request(vec![
                cart_line(1000, "1", "10.00"),
                cart_line(1001, "1", "20.00"),
            ]))
            .await
            .expect("preview");

        assert_eq!(response.subtotal_before_discount.to_string(), "30.00");
        assert_eq!(response.total_discount.to_string(), "6.00");
        assert_eq!(response.subtotal_after_discount.to_string(), "24.00");

        // 10% off line A leaves 9.00; 5.00 splits 1.55 / 3.45 by subtotal.
        assert_eq!(response.lines[0].subtotal_after_discount.to_string(), "7.45");
        assert_eq!(response.lines[1].subtotal_after_discount.to_string(), "16.55");
        assert_eq!(response.lines[0].discounted_unit_price.to_string(), "7.45");

        assert_eq!(response.applied_discounts.len(), 2);
        assert_eq!(response.applied_discounts[0].amount.to_string(), "1.00");
        assert_eq!(response.applied_discounts[1].amount.to_string(), "5.00");

        // 18% exclusive tax on the discounted subtotal.
        assert_eq!(response.tax.subtotal_net.to_string(), "24.00");
        assert_eq!(response.tax.total_tax.to_string(), "4.32");
        assert_eq!(response.tax.total_gross.to_string(), "28.32");
    }

    #[tokio::test]
    async fn preview_skips_entries_without_matching_lines() {
        let engine = seeded_engine().await;
        engine.apply(line_request(1000, "10"), &cashier()).await.expect("line discount");

        // Cart contains only bread, so the cola discount has no target.
        let response = engine
            .preview(preview_request(vec![cart_line(1001, "1", "20.00")]))
            .await
            .expect("preview");

        assert!(response.applied_discounts.is_empty());
        assert_eq!(response.total_discount.to_string(), "0.00");
        assert_eq!(response.subtotal_after_discount.to_string(), "20.00");
    }

    #[tokio::test]
    async fn preview_resolves_missing_unit_prices() {
        let engine = seeded_engine().await;
        let response = engine
            .preview(preview_request(vec![CartLine {
                product_id: ProductId(1000),
                quantity: dec("2"),
                unit_price: None,
            }]))
            .await
            .expect("preview");

        // Cola resolves to the 10.00 store override.
        assert_eq!(response.lines[0].original_unit_price.to_string(), "10.00");
        assert_eq!(response.subtotal_before_discount.to_string(), "20.00");
    }
}
