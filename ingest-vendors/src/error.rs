//! Vendor-boundary error taxonomy (`spec.md` §7).

use thiserror::Error;

/// Errors a vendor client can surface to a task worker. The worker matches
/// on the variant to decide how to log and what status code to return —
/// none of these are retried internally (`spec.md` §9: "no retry logic
/// beyond the natural next scheduled run").
#[derive(Debug, Error)]
pub enum VendorError {
    /// The vendor does not know this symbol (HTTP 404 or equivalent). Not
    /// an error condition by itself — callers decide what a "not found"
    /// means for their task (e.g. marking a security inactive).
    #[error("not found")]
    NotFound,

    /// HTTP 429. Per `spec.md` §4.2 this means the rate limiter's
    /// configuration disagrees with the vendor, not mere overload, and
    /// must be logged critical by the caller.
    #[error("rate limited by vendor")]
    RateLimited,

    /// A 5xx or network-level failure. Logged as an error; the next
    /// scheduled run retries naturally.
    #[error("transient vendor error: {0}")]
    Transient(String),

    /// The vendor returned a record missing a field required to persist it
    /// (e.g. a dividend with no `ex_dividend_date`). Filtered silently at
    /// the boundary and logged at debug (`spec.md` §7).
    #[error("validation failed: {0}")]
    Validation(String),
}

impl From<reqwest::Error> for VendorError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) if status.as_u16() == 404 => Self::NotFound,
            Some(status) if status.as_u16() == 429 => Self::RateLimited,
            _ => Self::Transient(err.to_string()),
        }
    }
}
