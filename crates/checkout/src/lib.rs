//! Checkout pricing services: price resolution, discount application and
//! preview, tax computation, and tender rounding, composed over the
//! repository traits in `tillpoint-db`.

pub mod actor;
pub mod discount;
pub mod error;
pub mod pricing;
pub mod rounding;
pub mod tax;

pub use actor::{Actor, PERMISSION_DISCOUNT_OVERRIDE};
pub use discount::{
    AppliedDiscount, AppliedDiscountAmount, ApplyDiscountRequest, CartLine, DiscountEngine,
    DiscountPreviewRequest, DiscountPreviewResponse, PreviewLineBreakdown, RemoveDiscountRequest,
};
pub use error::EngineError;
pub use pricing::{PriceLookupRequest, PriceResolution, PriceResolver};
pub use rounding::RoundingEngine;
pub use tax::{TaxEngine, TaxLineBreakdown, TaxPreviewLine, TaxPreviewRequest, TaxPreviewResponse};
