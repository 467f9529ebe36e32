pub mod allocation;
pub mod config;
pub mod domain;
pub mod errors;
pub mod money;
pub mod pricing;
pub mod rounding;
pub mod tax;

pub use allocation::{allocate_proportionally, discount_amount_for, PreviewLine};
pub use domain::catalog::{
    Merchant, MerchantId, PriceBookEntry, Product, ProductId, StoreLocation, StoreLocationId,
    StorePriceOverride,
};
pub use domain::discount::{
    DiscountEntry, DiscountId, DiscountKind, DiscountScope, ReasonCode, ReasonCodeId,
};
pub use domain::tax::{
    RoundingMethod, RoundingPolicy, StoreTaxRule, TaxGroup, TaxGroupId, TaxMode, TenderType,
};
pub use errors::Error;
pub use pricing::{resolve_price, PriceSource, ResolvedPrice};
pub use rounding::{apply_policy, no_rounding, RoundingOutcome};
pub use tax::{applicable_rule, line_amounts, TaxLineAmounts};
