use std::sync::Arc;

use tillpoint_checkout::{PriceLookupRequest, PriceResolver};
use tillpoint_core::config::{AppConfig, LoadOptions};
use tillpoint_core::domain::catalog::{ProductId, StoreLocationId};
use tillpoint_db::repositories::{SqlCatalogRepository, SqlPriceRepository};
use tillpoint_db::connect;

use crate::commands::{command_runtime, CommandResult};

pub fn run(store: i64, product: i64) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "price",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match command_runtime("price") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        let resolver = PriceResolver::new(
            Arc::new(SqlCatalogRepository::new(pool.clone())),
            Arc::new(SqlPriceRepository::new(pool.clone())),
        );
        let resolution = resolver
            .resolve(PriceLookupRequest {
                store_location_id: StoreLocationId(store),
                product_id: ProductId(product),
                at: None,
            })
            .await
            .map_err(|error| ("price_resolution", error.to_string(), 1u8))?;

        pool.close().await;
        serde_json::to_string(&resolution)
            .map_err(|error| ("serialization", error.to_string(), 1u8))
    });

    match result {
        Ok(payload) => CommandResult::success("price", payload),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("price", error_class, message, exit_code)
        }
    }
}
