use crate::commands::{command_runtime, CommandResult};
use tillpoint_core::config::{AppConfig, LoadOptions};
use tillpoint_db::fixtures::{self, SeedDataset};
use tillpoint_db::{connect, migrations};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match command_runtime("seed") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let outcome = if fixtures::is_seeded(&pool)
            .await
            .map_err(|error| ("seed_check", error.to_string(), 6u8))?
        {
            SeedOutcome::AlreadySeeded
        } else {
            let dataset = SeedDataset::standard();
            fixtures::apply(&pool, &dataset)
                .await
                .map_err(|error| ("seed_execution", error.to_string(), 6u8))?;
            SeedOutcome::Applied {
                products: dataset.products.len(),
                tax_groups: dataset.tax_groups.len(),
                reason_codes: dataset.reason_codes.len(),
            }
        };

        pool.close().await;
        Ok::<SeedOutcome, (&'static str, String, u8)>(outcome)
    });

    match result {
        Ok(SeedOutcome::AlreadySeeded) => {
            CommandResult::success("seed", "catalog data already present; nothing to do")
        }
        Ok(SeedOutcome::Applied { products, tax_groups, reason_codes }) => {
            CommandResult::success(
                "seed",
                format!(
                    "demo catalog loaded: {products} products, {tax_groups} tax groups, \
                     {reason_codes} reason codes"
                ),
            )
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

enum SeedOutcome {
    AlreadySeeded,
    Applied { products: usize, tax_groups: usize, reason_codes: usize },
}
