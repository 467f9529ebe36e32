pub mod commands;
pub mod logging;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "tillpoint",
    about = "Tillpoint operator CLI",
    long_about = "Operate Tillpoint migrations, seed data, config inspection, and readiness checks.",
    after_help = "Examples:\n  tillpoint doctor --json\n  tillpoint migrate\n  tillpoint price --store 10 --product 1000"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo catalog; a no-op when data is already present")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, database connectivity, and schema readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Resolve the effective unit price for one product at one store")]
    Price {
        #[arg(long, help = "Store location id")]
        store: i64,
        #[arg(long, help = "Product id")]
        product: i64,
    },
}

pub fn run() -> ExitCode {
    logging::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Price { store, product } => commands::price::run(store, product),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
