//! Command-line surface (`spec.md` §6).

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "ingest", author, version, about = "Equities market-data ingestion pipeline", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Runs details, actions, EastMoney price increment, then Polygon
    /// grouped-daily reprice for yesterday and the day before.
    DailyRun {
        #[arg(long)]
        market: Option<String>,
        #[arg(long)]
        skip_details: bool,
        #[arg(long)]
        skip_actions: bool,
        #[arg(long)]
        skip_em_prices: bool,
        #[arg(long)]
        skip_polygon_prices: bool,
    },
    /// Refreshes security details (name, exchange, sector, ...) via Polygon.
    UpdateDetails {
        symbols: Vec<String>,
        #[arg(long)]
        all: bool,
        #[arg(long)]
        market: Option<String>,
        #[arg(long)]
        force: bool,
        #[arg(long)]
        limit: Option<i64>,
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Refreshes dividends and splits via Polygon.
    UpdateActions {
        symbols: Vec<String>,
        #[arg(long)]
        all: bool,
        #[arg(long)]
        market: Option<String>,
        #[arg(long)]
        force: bool,
        #[arg(long)]
        limit: Option<i64>,
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Incrementally fetches CN A-share daily prices via EastMoney.
    UpdateEmPrices {
        em_codes: Vec<String>,
        #[arg(long)]
        full_refresh: bool,
        #[arg(long)]
        market: Option<String>,
        #[arg(long)]
        limit: Option<i64>,
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Reconciles a date range of grouped-daily bars via Polygon.
    UpdatePolygonPrices {
        #[arg(long)]
        start_date: chrono::NaiveDate,
        #[arg(long)]
        end_date: chrono::NaiveDate,
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Applies pending schema migrations.
    Migrate,
}
