//! Polygon.io vendor client.
//!
//! Implements every capability trait: security details, dividends, splits,
//! historical daily bars, and grouped-daily (the authoritative vendor used
//! by the reconciliation task, `spec.md` §4.5). Every outbound call first
//! acquires a key from the shared [`KeyRateLimiter`], mirroring
//! `PolygonSource._get_client` fused with `utils/key_rate_limiter.py` in
//! the original implementation.

use crate::error::VendorError;
use crate::model::{
    DividendRecord, GroupedBar, PriceBar, RawDividend, RawSplit, SecurityInfo, SplitRecord,
};
use crate::traits::{
    DividendsSource, GroupedDailySource, HistoricalPricesSource, MarketStatusSource,
    SecurityInfoSource, SplitsSource,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use ingest_ratelimit::KeyRateLimiter;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.polygon.io";

#[derive(Debug)]
pub struct PolygonClient {
    http: reqwest::Client,
    limiter: Arc<KeyRateLimiter>,
    base_url: String,
}

impl PolygonClient {
    pub fn new(keys: Vec<String>, rate_limit: u32, window: Duration, http_timeout: Duration) -> Self {
        Self::with_base_url(keys, rate_limit, window, http_timeout, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(
        keys: Vec<String>,
        rate_limit: u32,
        window: Duration,
        http_timeout: Duration,
        base_url: String,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(http_timeout)
            .build()
            .expect("reqwest client configuration is valid");

        Self {
            http,
            limiter: Arc::new(KeyRateLimiter::new(keys, rate_limit as usize, window)),
            base_url,
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, VendorError> {
        let api_key = self.limiter.acquire().await;
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http
            .get(&url)
            .query(query)
            .query(&[("apiKey", api_key.as_str())])
            .send()
            .await
            .map_err(VendorError::from)?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(VendorError::NotFound);
        }
        if status.as_u16() == 429 {
            tracing::error!(%path, "polygon returned 429 — rate limiter is misconfigured relative to the vendor");
            return Err(VendorError::RateLimited);
        }
        if !status.is_success() {
            return Err(VendorError::Transient(format!("HTTP {status}")));
        }

        response
            .json::<T>()
            .await
            .map_err(|err| VendorError::Transient(err.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct TickerDetailsEnvelope {
    results: Option<TickerDetails>,
}

#[derive(Debug, Deserialize, Default)]
struct TickerDetails {
    name: Option<String>,
    active: Option<bool>,
    #[serde(default)]
    primary_exchange: Option<String>,
    #[serde(default)]
    currency_name: Option<String>,
    #[serde(default)]
    locale: Option<String>,
    #[serde(rename = "type")]
    #[serde(default)]
    type_: Option<String>,
    #[serde(default)]
    list_date: Option<String>,
    #[serde(default)]
    delisted_utc: Option<String>,
    #[serde(default)]
    cik: Option<String>,
    #[serde(default)]
    composite_figi: Option<String>,
    #[serde(default)]
    share_class_figi: Option<String>,
    #[serde(default)]
    market_cap: Option<f64>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    homepage_url: Option<String>,
    #[serde(default)]
    total_employees: Option<i32>,
    #[serde(default)]
    sic_code: Option<String>,
    #[serde(default)]
    sic_description: Option<String>,
    #[serde(default)]
    address: Option<TickerAddress>,
    #[serde(default)]
    branding: Option<TickerBranding>,
}

#[derive(Debug, Deserialize, Default)]
struct TickerAddress {
    #[serde(default)]
    address1: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    postal_code: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TickerBranding {
    #[serde(default)]
    logo_url: Option<String>,
    #[serde(default)]
    icon_url: Option<String>,
}

/// Normalizes a Polygon `locale` via the shared controlled vocabulary,
/// logging unrecognized values rather than dropping them — they still pass
/// through unchanged (`SPEC_FULL.md` §3, `ingest_core::market`).
fn normalized_market(raw: &str) -> String {
    let normalized = ingest_core::market::normalize_market(raw);
    if !ingest_core::market::KNOWN_MARKETS.contains(&normalized.as_str()) {
        tracing::warn!(raw, "unrecognized Polygon locale, passing through");
    }
    normalized
}

/// Normalizes a Polygon ticker `type` via the shared controlled vocabulary,
/// logging unrecognized values rather than coercing them to a default —
/// they still pass through unchanged (`SPEC_FULL.md` §3, `ingest_core::market`).
fn normalized_asset_type(raw: &str) -> String {
    let normalized = ingest_core::market::normalize_asset_type(raw);
    if !ingest_core::market::KNOWN_ASSET_TYPES.contains(&normalized.as_str()) {
        tracing::warn!(raw, "unrecognized Polygon ticker type, passing through");
    }
    normalized
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    if let Some((date_part, _)) = raw.split_once('T') {
        return NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok();
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

#[async_trait]
impl SecurityInfoSource for PolygonClient {
    async fn fetch_security_info(&self, symbol: &str) -> Result<Option<SecurityInfo>, VendorError> {
        let path = format!("/v3/reference/tickers/{}", symbol.to_uppercase());
        let envelope: TickerDetailsEnvelope = match self.get_json(&path, &[]).await {
            Ok(envelope) => envelope,
            Err(VendorError::NotFound) => return Ok(None),
            Err(other) => return Err(other),
        };

        let Some(details) = envelope.results else {
            return Ok(None);
        };

        Ok(Some(SecurityInfo {
            name: details.name,
            exchange: details.primary_exchange,
            currency: details.currency_name,
            market: details.locale.as_deref().map(normalized_market),
            r#type: details.type_.as_deref().map(normalized_asset_type),
            list_date: details.list_date.as_deref().and_then(parse_date),
            delist_date: details.delisted_utc.as_deref().and_then(parse_date),
            cik: details.cik,
            composite_figi: details.composite_figi,
            share_class_figi: details.share_class_figi,
            market_cap: details.market_cap.and_then(Decimal::from_f64_retain),
            description: details.description,
            homepage_url: details.homepage_url,
            employees: details.total_employees,
            sic_code: details.sic_code,
            industry: details.sic_description,
            address_line1: details.address.as_ref().and_then(|a| a.address1.clone()),
            city: details.address.as_ref().and_then(|a| a.city.clone()),
            state: details.address.as_ref().and_then(|a| a.state.clone()),
            postal_code: details.address.as_ref().and_then(|a| a.postal_code.clone()),
            logo_url: details.branding.as_ref().and_then(|b| b.logo_url.clone()),
            icon_url: details.branding.as_ref().and_then(|b| b.icon_url.clone()),
            is_active: details.active.unwrap_or(false),
        }))
    }
}

#[derive(Debug, Deserialize)]
struct DividendsEnvelope {
    #[serde(default)]
    results: Vec<RawDividendDto>,
}

#[derive(Debug, Deserialize)]
struct RawDividendDto {
    ex_dividend_date: Option<String>,
    declaration_date: Option<String>,
    record_date: Option<String>,
    pay_date: Option<String>,
    cash_amount: Option<f64>,
    currency: Option<String>,
    frequency: Option<i32>,
}

#[async_trait]
impl DividendsSource for PolygonClient {
    async fn fetch_dividends(&self, symbol: &str) -> Result<Vec<DividendRecord>, VendorError> {
        let envelope: DividendsEnvelope = self
            .get_json("/v3/reference/dividends", &[("ticker", &symbol.to_uppercase())])
            .await?;

        Ok(envelope
            .results
            .into_iter()
            .filter_map(|dto| {
                let raw = RawDividend {
                    ex_dividend_date: dto.ex_dividend_date.as_deref().and_then(parse_date),
                    declaration_date: dto.declaration_date.as_deref().and_then(parse_date),
                    record_date: dto.record_date.as_deref().and_then(parse_date),
                    pay_date: dto.pay_date.as_deref().and_then(parse_date),
                    cash_amount: dto.cash_amount.and_then(Decimal::from_f64_retain),
                    currency: dto.currency,
                    frequency: dto.frequency,
                };
                match DividendRecord::try_from(raw) {
                    Ok(record) => Some(record),
                    Err(err) => {
                        tracing::debug!(%symbol, %err, "dropping dividend missing required fields");
                        None
                    }
                }
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct SplitsEnvelope {
    #[serde(default)]
    results: Vec<RawSplitDto>,
}

#[derive(Debug, Deserialize)]
struct RawSplitDto {
    execution_date: Option<String>,
    split_from: Option<f64>,
    split_to: Option<f64>,
}

#[async_trait]
impl SplitsSource for PolygonClient {
    async fn fetch_splits(&self, symbol: &str) -> Result<Vec<SplitRecord>, VendorError> {
        let envelope: SplitsEnvelope = self
            .get_json("/v3/reference/splits", &[("ticker", &symbol.to_uppercase())])
            .await?;

        Ok(envelope
            .results
            .into_iter()
            .filter_map(|dto| {
                let raw = RawSplit {
                    execution_date: dto.execution_date.as_deref().and_then(parse_date),
                    declaration_date: None,
                    split_to: dto.split_to.and_then(Decimal::from_f64_retain),
                    split_from: dto.split_from.and_then(Decimal::from_f64_retain),
                };
                match SplitRecord::try_from(raw) {
                    Ok(record) => Some(record),
                    Err(err) => {
                        tracing::debug!(%symbol, %err, "dropping split missing required fields");
                        None
                    }
                }
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct AggsEnvelope {
    #[serde(default)]
    results: Vec<AggBar>,
}

#[derive(Debug, Deserialize)]
struct AggBar {
    #[serde(rename = "T")]
    ticker: Option<String>,
    #[serde(rename = "o")]
    open: Option<f64>,
    #[serde(rename = "h")]
    high: Option<f64>,
    #[serde(rename = "l")]
    low: Option<f64>,
    #[serde(rename = "c")]
    close: Option<f64>,
    #[serde(rename = "v")]
    volume: Option<f64>,
    #[serde(rename = "vw")]
    vwap: Option<f64>,
    #[serde(rename = "t")]
    timestamp_ms: i64,
}

impl AggBar {
    fn date(&self) -> NaiveDate {
        chrono::DateTime::from_timestamp_millis(self.timestamp_ms)
            .map(|dt| dt.date_naive())
            .unwrap_or_default()
    }
}

#[async_trait]
impl HistoricalPricesSource for PolygonClient {
    async fn fetch_historical_prices(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, VendorError> {
        let path = format!(
            "/v2/aggs/ticker/{}/range/1/day/{}/{}",
            symbol.to_uppercase(),
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d"),
        );

        let envelope: AggsEnvelope = match self.get_json(&path, &[("adjusted", "false"), ("limit", "50000")]).await {
            Ok(envelope) => envelope,
            Err(VendorError::NotFound) => return Ok(Vec::new()),
            Err(other) => return Err(other),
        };

        Ok(envelope
            .results
            .into_iter()
            .map(|bar| PriceBar {
                date: bar.date(),
                open: bar.open.and_then(Decimal::from_f64_retain),
                high: bar.high.and_then(Decimal::from_f64_retain),
                low: bar.low.and_then(Decimal::from_f64_retain),
                close: bar.close.and_then(Decimal::from_f64_retain),
                volume: bar.volume.map(|v| v as i64),
                vwap: bar.vwap.and_then(Decimal::from_f64_retain),
                turnover: match (bar.volume, bar.vwap) {
                    (Some(v), Some(vw)) => Decimal::from_f64_retain(v * vw),
                    _ => None,
                },
            })
            .collect())
    }
}

#[async_trait]
impl GroupedDailySource for PolygonClient {
    async fn fetch_grouped_daily(&self, date: NaiveDate) -> Result<Vec<GroupedBar>, VendorError> {
        let path = format!(
            "/v2/aggs/grouped/locale/us/market/stocks/{}",
            date.format("%Y-%m-%d")
        );

        let envelope: AggsEnvelope = match self.get_json(&path, &[("adjusted", "true")]).await {
            Ok(envelope) => envelope,
            Err(VendorError::NotFound) => return Ok(Vec::new()),
            Err(other) => return Err(other),
        };

        Ok(envelope
            .results
            .into_iter()
            .filter_map(|bar| {
                let symbol = bar.ticker.clone()?;
                Some(GroupedBar {
                    symbol: symbol.to_lowercase(),
                    open: bar.open.and_then(Decimal::from_f64_retain),
                    high: bar.high.and_then(Decimal::from_f64_retain),
                    low: bar.low.and_then(Decimal::from_f64_retain),
                    close: bar.close.and_then(Decimal::from_f64_retain),
                    volume: bar.volume.map(|v| v as i64),
                    vwap: bar.vwap.and_then(Decimal::from_f64_retain),
                })
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct MarketStatusResponse {
    market: Option<String>,
}

#[async_trait]
impl MarketStatusSource for PolygonClient {
    async fn is_market_open(&self, market: &str) -> Result<bool, VendorError> {
        Ok(self.market_status(market).await? == "open")
    }

    async fn market_status(&self, _market: &str) -> Result<String, VendorError> {
        let response: MarketStatusResponse = self.get_json("/v1/marketstatus/now", &[]).await?;
        Ok(response.market.unwrap_or_else(|| "unknown".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_polygon_ticker_types() {
        assert_eq!(normalized_asset_type("cs"), "STOCK");
        assert_eq!(normalized_asset_type("ADRC"), "ADR");
        assert_eq!(normalized_asset_type("ETN"), "ETF");
    }

    #[test]
    fn unrecognized_ticker_type_passes_through_unchanged() {
        assert_eq!(normalized_asset_type("SOMETHING_NEW"), "SOMETHING_NEW");
    }

    #[test]
    fn maps_global_locale_to_us() {
        assert_eq!(normalized_market("global"), "US");
    }

    #[test]
    fn unrecognized_locale_passes_through_unchanged() {
        assert_eq!(normalized_market("ca"), "CA");
    }

    #[test]
    fn parses_plain_and_timestamped_dates() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(parse_date("2024-03-01"), Some(expected));
        assert_eq!(parse_date("2024-03-01T00:00:00Z"), Some(expected));
    }
}
