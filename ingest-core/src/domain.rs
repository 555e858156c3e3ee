//! Canonical record shapes persisted by the `Store`.
//!
//! Field shapes follow `securities`/`daily_prices`/`stock_dividends`/
//! `stock_splits`/`trading_calendars` in the target schema. Monetary and
//! factor fields are `Decimal`, never `f64`, to avoid rounding drift across
//! vendor boundaries.

use chrono::{DateTime, NaiveDate, Utc};
use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One row per tradable instrument, identified by the natural key
/// `(symbol, market, type)` and owning a surrogate `id` once persisted.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Security {
    pub id: Option<i64>,
    pub symbol: String,
    pub em_code: Option<String>,
    pub name: Option<String>,
    pub market: String,
    pub r#type: String,
    pub exchange: Option<String>,
    pub currency: Option<String>,
    pub cik: Option<String>,
    pub composite_figi: Option<String>,
    pub share_class_figi: Option<String>,
    pub market_cap: Option<Decimal>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub description: Option<String>,
    pub homepage_url: Option<String>,
    pub total_employees: Option<i32>,
    pub sic_code: Option<String>,
    pub address_line1: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub logo_url: Option<String>,
    pub icon_url: Option<String>,
    pub is_active: bool,
    pub list_date: Option<NaiveDate>,
    pub delist_date: Option<NaiveDate>,
    pub info_last_updated_at: Option<DateTime<Utc>>,
    pub price_data_latest_date: Option<NaiveDate>,
    pub full_data_last_updated_at: Option<DateTime<Utc>>,
    pub actions_last_updated_at: Option<DateTime<Utc>>,
    pub full_refresh_interval: i32,
}

impl Security {
    /// A minimal row suitable for `Store::upsert_security` on first sighting.
    /// `full_refresh_interval` is left at `0`; the store assigns the
    /// jittered `[25, 40]` interval itself on insert.
    pub fn new_candidate(symbol: impl Into<String>, market: impl Into<String>, r#type: impl Into<String>) -> Self {
        Self {
            id: None,
            symbol: symbol.into(),
            em_code: None,
            name: None,
            market: market.into(),
            r#type: r#type.into(),
            exchange: None,
            currency: None,
            cik: None,
            composite_figi: None,
            share_class_figi: None,
            market_cap: None,
            sector: None,
            industry: None,
            description: None,
            homepage_url: None,
            total_employees: None,
            sic_code: None,
            address_line1: None,
            city: None,
            state: None,
            postal_code: None,
            logo_url: None,
            icon_url: None,
            is_active: true,
            list_date: None,
            delist_date: None,
            info_last_updated_at: None,
            price_data_latest_date: None,
            full_data_last_updated_at: None,
            actions_last_updated_at: None,
            full_refresh_interval: 0,
        }
    }
}

/// One row per `(security_id, date)`. `adj_factor` defaults to `1.0`; the
/// adjustment-factor reverse-engineering computation is out of scope
/// (`spec.md` §9).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct DailyPrice {
    pub security_id: i64,
    pub date: NaiveDate,
    pub open: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub close: Option<Decimal>,
    pub volume: Option<i64>,
    pub turnover: Option<Decimal>,
    pub vwap: Option<Decimal>,
    pub turnover_rate: Option<Decimal>,
    pub adj_factor: Decimal,
}

impl DailyPrice {
    pub fn new(security_id: i64, date: NaiveDate) -> Self {
        Self {
            security_id,
            date,
            open: None,
            high: None,
            low: None,
            close: None,
            volume: None,
            turnover: None,
            vwap: None,
            turnover_rate: None,
            adj_factor: Decimal::ONE,
        }
    }

    /// Checks the ordering invariant `low <= open,close <= high` when all
    /// four are present. Null fields trivially satisfy the invariant.
    pub fn ohlc_is_consistent(&self) -> bool {
        match (self.low, self.high, self.open, self.close) {
            (Some(low), Some(high), open, close) => {
                low <= high
                    && open.map_or(true, |o| low <= o && o <= high)
                    && close.map_or(true, |c| low <= c && c <= high)
            }
            _ => true,
        }
    }
}

/// One row per `(security_id, ex_dividend_date, cash_amount)`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StockDividend {
    pub security_id: i64,
    pub ex_dividend_date: NaiveDate,
    pub declaration_date: Option<NaiveDate>,
    pub record_date: Option<NaiveDate>,
    pub pay_date: Option<NaiveDate>,
    pub cash_amount: Decimal,
    pub currency: Option<String>,
    pub frequency: Option<i32>,
}

/// One row per `(security_id, execution_date)`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct StockSplit {
    pub security_id: i64,
    pub execution_date: NaiveDate,
    pub declaration_date: Option<NaiveDate>,
    pub split_to: Decimal,
    pub split_from: Decimal,
}

/// One row per `(market, trade_date)`. Populated by an external
/// collaborator; the core only ever reads this table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Constructor)]
pub struct TradingCalendar {
    pub market: String,
    pub trade_date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn ohlc_consistency_accepts_within_range() {
        let mut p = DailyPrice::new(1, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        p.low = Some(dec!(0.5));
        p.high = Some(dec!(2.0));
        p.open = Some(dec!(1.0));
        p.close = Some(dec!(1.5));
        assert!(p.ohlc_is_consistent());
    }

    #[test]
    fn ohlc_consistency_rejects_close_above_high() {
        let mut p = DailyPrice::new(1, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        p.low = Some(dec!(0.5));
        p.high = Some(dec!(2.0));
        p.close = Some(dec!(2.5));
        assert!(!p.ohlc_is_consistent());
    }

    #[test]
    fn ohlc_consistency_trivially_true_when_null() {
        let p = DailyPrice::new(1, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert!(p.ohlc_is_consistent());
    }
}
