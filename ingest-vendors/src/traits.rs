//! Narrow capability traits vendors opt into individually. Commands select
//! vendors by the capability they require (`spec.md` §4.2, §9).

use crate::error::VendorError;
use crate::model::{DividendRecord, GroupedBar, PriceBar, SecurityInfo, SplitRecord};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Fetches normalized security-detail records.
#[async_trait]
pub trait SecurityInfoSource: Send + Sync {
    /// Returns `Ok(None)` when the vendor reports "not found" (HTTP 404):
    /// that is a valid outcome, not an error (`spec.md` §4.2).
    async fn fetch_security_info(&self, symbol: &str) -> Result<Option<SecurityInfo>, VendorError>;
}

/// Fetches dividend history. Records lacking `ex_dividend_date` or
/// `cash_amount` are filtered before this trait returns them.
#[async_trait]
pub trait DividendsSource: Send + Sync {
    async fn fetch_dividends(&self, symbol: &str) -> Result<Vec<DividendRecord>, VendorError>;
}

/// Fetches split history. Records lacking `execution_date` or `split_to`
/// are filtered before this trait returns them.
#[async_trait]
pub trait SplitsSource: Send + Sync {
    async fn fetch_splits(&self, symbol: &str) -> Result<Vec<SplitRecord>, VendorError>;
}

/// Fetches unadjusted daily OHLCV history over `[start, end]`, inclusive.
#[async_trait]
pub trait HistoricalPricesSource: Send + Sync {
    async fn fetch_historical_prices(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, VendorError>;
}

/// Fetches every instrument's OHLCV for a single date in one response.
/// An empty result for a given date means a non-trading day, not an error
/// (`spec.md` §4.2).
#[async_trait]
pub trait GroupedDailySource: Send + Sync {
    async fn fetch_grouped_daily(&self, date: NaiveDate) -> Result<Vec<GroupedBar>, VendorError>;
}

/// Market-calendar style queries a vendor may additionally expose.
#[async_trait]
pub trait MarketStatusSource: Send + Sync {
    async fn is_market_open(&self, market: &str) -> Result<bool, VendorError>;
    async fn market_status(&self, market: &str) -> Result<String, VendorError>;
}
