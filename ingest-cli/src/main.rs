mod cli;
mod commands;

use clap::Parser;
use cli::Cli;
use ingest_core::{logging, Config};
use ingest_store::Store;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    logging::init_logging();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(%err, "fatal: could not load configuration");
            return ExitCode::FAILURE;
        }
    };

    let store = match Store::connect(&config.database_url).await {
        Ok(store) => store,
        Err(err) => {
            tracing::error!(%err, "fatal: could not connect to the database");
            return ExitCode::FAILURE;
        }
    };

    let cli = Cli::parse();

    match commands::run(cli.command, &config, &store).await {
        Ok(Some(summary)) => {
            // Per-security errors never fail the process (`spec.md` §6) —
            // they are already reflected in the summary's ERROR tally.
            tracing::info!(%summary, "run complete");
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "fatal: command failed");
            ExitCode::FAILURE
        }
    }
}
