//! EastMoney vendor client, covering CN A-shares the way
//! `scripts/update_em_daily_prices.py` does: unauthenticated public
//! endpoints, no API key, no rate limiter (EastMoney has no documented
//! per-key quota and the original script never throttled it).
//!
//! Only security details and historical daily prices are implemented —
//! EastMoney has no dividend/split/grouped-daily endpoint the original
//! script relied on.

use crate::error::VendorError;
use crate::model::{PriceBar, SecurityInfo};
use crate::traits::{HistoricalPricesSource, SecurityInfoSource};
use async_trait::async_trait;
use chrono::NaiveDate;
use ingest_core::market::{canonical_symbol, normalize_market};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://push2.eastmoney.com";
const DEFAULT_HISTORY_BASE_URL: &str = "https://push2his.eastmoney.com";

#[derive(Debug)]
pub struct EastMoneyClient {
    http: reqwest::Client,
    base_url: String,
    history_base_url: String,
}

impl EastMoneyClient {
    pub fn new(http_timeout: Duration) -> Self {
        Self::with_base_url(http_timeout, None)
    }

    /// `base_url` overrides both the quote and history hosts, which is
    /// convenient for a test double that stands up a single mock server.
    pub fn with_base_url(http_timeout: Duration, base_url: Option<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(http_timeout)
            .build()
            .expect("reqwest client configuration is valid");

        let (base_url, history_base_url) = match base_url {
            Some(url) => (url.clone(), url),
            None => (DEFAULT_BASE_URL.to_string(), DEFAULT_HISTORY_BASE_URL.to_string()),
        };

        Self {
            http,
            base_url,
            history_base_url,
        }
    }
}

/// EastMoney's `secid` encodes the exchange as a market-code prefix:
/// `1.` for Shanghai, `0.` for Shenzhen/Beijing. Mirrors the
/// `_get_secid`-equivalent logic in `update_em_daily_prices.py`.
fn secid_for(symbol: &str) -> String {
    let symbol = canonical_symbol(symbol);
    let market_code = if symbol.starts_with('6') { "1" } else { "0" };
    format!("{market_code}.{symbol}")
}

fn exchange_for(symbol: &str) -> &'static str {
    if canonical_symbol(symbol).starts_with('6') {
        "SH"
    } else {
        "SZ"
    }
}

#[derive(Debug, Deserialize)]
struct QuoteEnvelope {
    data: Option<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(rename = "f58")]
    name: Option<String>,
    #[serde(rename = "f107")]
    market_code: Option<i32>,
    #[serde(rename = "f127")]
    industry: Option<String>,
    #[serde(rename = "f189")]
    list_date: Option<i64>,
}

fn parse_yyyymmdd(raw: i64) -> Option<NaiveDate> {
    if raw <= 0 {
        return None;
    }
    NaiveDate::parse_from_str(&raw.to_string(), "%Y%m%d").ok()
}

#[async_trait]
impl SecurityInfoSource for EastMoneyClient {
    async fn fetch_security_info(&self, symbol: &str) -> Result<Option<SecurityInfo>, VendorError> {
        let secid = secid_for(symbol);
        let url = format!("{}/api/qt/stock/get", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("secid", secid.as_str()),
                ("fields", "f58,f107,f127,f189"),
                ("invt", "2"),
            ])
            .send()
            .await
            .map_err(VendorError::from)?;

        if !response.status().is_success() {
            return Err(VendorError::Transient(format!("HTTP {}", response.status())));
        }

        let envelope: QuoteEnvelope = response
            .json()
            .await
            .map_err(|err| VendorError::Transient(err.to_string()))?;

        let Some(data) = envelope.data else {
            return Ok(None);
        };

        Ok(Some(SecurityInfo {
            name: data.name,
            exchange: Some(exchange_for(symbol).to_string()),
            currency: Some("CNY".to_string()),
            market: Some(normalize_market("CNA")),
            r#type: Some("STOCK".to_string()),
            list_date: data.list_date.and_then(parse_yyyymmdd),
            industry: data.industry,
            is_active: true,
            ..SecurityInfo::default()
        }))
    }
}

#[derive(Debug, Deserialize)]
struct HistoryEnvelope {
    data: Option<HistoryData>,
}

#[derive(Debug, Deserialize)]
struct HistoryData {
    #[serde(default)]
    klines: Vec<String>,
}

/// Each entry is a comma-separated row:
/// `date,open,close,high,low,volume,turnover,amplitude,pct_change,change,turnover_rate`.
fn parse_kline_row(row: &str) -> Option<PriceBar> {
    let mut fields = row.split(',');
    let date = NaiveDate::parse_from_str(fields.next()?, "%Y-%m-%d").ok()?;
    let open = fields.next().and_then(|v| v.parse::<Decimal>().ok());
    let close = fields.next().and_then(|v| v.parse::<Decimal>().ok());
    let high = fields.next().and_then(|v| v.parse::<Decimal>().ok());
    let low = fields.next().and_then(|v| v.parse::<Decimal>().ok());
    let volume = fields.next().and_then(|v| v.parse::<i64>().ok());
    let turnover = fields.next().and_then(|v| v.parse::<Decimal>().ok());

    Some(PriceBar {
        date,
        open,
        high,
        low,
        close,
        volume,
        vwap: None,
        turnover,
    })
}

#[async_trait]
impl HistoricalPricesSource for EastMoneyClient {
    async fn fetch_historical_prices(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, VendorError> {
        let secid = secid_for(symbol);
        let url = format!("{}/api/qt/stock/kline/get", self.history_base_url);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("secid", secid.as_str()),
                ("fields1", "f1,f2,f3,f4,f5"),
                ("fields2", "f51,f52,f53,f54,f55,f56,f57"),
                ("klt", "101"),
                ("fqt", "0"),
                ("beg", &start.format("%Y%m%d").to_string()),
                ("end", &end.format("%Y%m%d").to_string()),
            ])
            .send()
            .await
            .map_err(VendorError::from)?;

        if !response.status().is_success() {
            return Err(VendorError::Transient(format!("HTTP {}", response.status())));
        }

        let envelope: HistoryEnvelope = response
            .json()
            .await
            .map_err(|err| VendorError::Transient(err.to_string()))?;

        let Some(data) = envelope.data else {
            return Ok(Vec::new());
        };

        Ok(data.klines.iter().filter_map(|row| parse_kline_row(row)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secid_routes_six_prefix_to_shanghai() {
        assert_eq!(secid_for("600000"), "1.600000");
        assert_eq!(exchange_for("600000"), "SH");
    }

    #[test]
    fn secid_routes_other_prefixes_to_shenzhen() {
        assert_eq!(secid_for("000001"), "0.000001");
        assert_eq!(exchange_for("300750"), "SZ");
    }

    #[test]
    fn parses_a_wellformed_kline_row() {
        let row = "2024-03-01,10.50,10.80,10.90,10.40,123456,1300000.00,4.8,2.86,0.30,1.5";
        let bar = parse_kline_row(row).expect("row parses");
        assert_eq!(bar.date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(bar.volume, Some(123456));
    }

    #[test]
    fn rejects_a_malformed_date() {
        assert!(parse_kline_row("not-a-date,1,2,3,4,5,6").is_none());
    }
}
