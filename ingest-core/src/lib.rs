#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::too_many_arguments)]

//! # Core — shared domain model for the market-data ingestion pipeline
//!
//! Holds the canonical record types persisted by the `Store` (`Security`,
//! `DailyPrice`, `StockDividend`, `StockSplit`, `TradingCalendar`), the
//! market/asset-type normalization vocabulary, the pipeline-wide error
//! taxonomy, environment-driven configuration, and the `tracing` logging
//! initializers shared by every binary in the workspace.

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod market;

pub use config::Config;
pub use domain::{DailyPrice, Security, StockDividend, StockSplit, TradingCalendar};
pub use error::IngestError;
