//! # Logging Configuration
//!
//! Standardized `tracing` setup shared by every binary in the workspace.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ingest_core::logging::init_logging;
//!
//! fn main() {
//!     init_logging();
//!     tracing::info!("ingestion pipeline started");
//! }
//! ```
//!
//! ### Environment Configuration
//! ```bash
//! export RUST_LOG=debug
//! export RUST_LOG=ingest_pipeline=debug,ingest_vendors=warn
//! ```

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initializes human-readable logging, reading levels from `RUST_LOG`
/// (default `INFO`).
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer())
        .init()
}

/// Initializes JSON logging, for shipping to a log aggregator.
pub fn init_json_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
        .init()
}
