//! Environment-driven configuration, loaded the way the teacher loads
//! exchange credentials: `dotenvy` first (best-effort), then
//! `std::env::var` for each setting. Missing required settings are a fatal
//! init failure (`spec.md` §7), never a panic.

use crate::error::IngestError;
use std::env;
use std::time::Duration;

/// Default HTTP timeout per outbound vendor request (`spec.md` §4.6).
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bounded worker-pool size for the orchestrator.
pub const DEFAULT_WORKERS: usize = 15;

/// Polygon's free-tier rate budget: 5 requests per key per 60 seconds,
/// matching `utils/key_rate_limiter.py`'s configured constants.
pub const DEFAULT_POLYGON_RATE_LIMIT: u32 = 5;
pub const DEFAULT_POLYGON_RATE_WINDOW: Duration = Duration::from_secs(60);

/// Process-wide configuration, assembled once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub polygon_api_keys: Vec<String>,
    pub eastmoney_base_url: Option<String>,
    pub workers: usize,
    pub http_timeout: Duration,
    pub polygon_rate_limit: u32,
    pub polygon_rate_window: Duration,
}

impl Config {
    /// Loads configuration from the process environment (optionally via a
    /// `.env` file). `DATABASE_URL` and a non-empty `POLYGON_API_KEYS` are
    /// required; their absence is reported, never panicked on.
    pub fn from_env() -> Result<Self, IngestError> {
        let _ = dotenvy::dotenv();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| IngestError::Config("DATABASE_URL is not set".into()))?;

        let polygon_api_keys = parse_key_list(
            env::var("POLYGON_API_KEYS")
                .map_err(|_| IngestError::Config("POLYGON_API_KEYS is not set".into()))?,
        );
        if polygon_api_keys.is_empty() {
            return Err(IngestError::Config(
                "POLYGON_API_KEYS contained no usable keys".into(),
            ));
        }

        let eastmoney_base_url = env::var("EASTMONEY_BASE_URL").ok();

        let workers = env::var("INGEST_WORKERS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_WORKERS);

        Ok(Self {
            database_url,
            polygon_api_keys,
            eastmoney_base_url,
            workers,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            polygon_rate_limit: DEFAULT_POLYGON_RATE_LIMIT,
            polygon_rate_window: DEFAULT_POLYGON_RATE_WINDOW,
        })
    }
}

fn parse_key_list(raw: String) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_key_list_trims_and_drops_empty_entries() {
        let keys = parse_key_list(" key1, key2 ,, key3 ".to_string());
        assert_eq!(keys, vec!["key1", "key2", "key3"]);
    }

    #[test]
    fn parse_key_list_empty_string_yields_no_keys() {
        assert!(parse_key_list(String::new()).is_empty());
    }
}
