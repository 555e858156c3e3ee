//! Partial-record types for the selective-field merge rule (`spec.md` §4.3).
//!
//! Every updatable field is `Option<Option<T>>`: the outer `None` means the
//! field is *absent* from the incoming payload and must not be written; the
//! outer `Some` carries the value to write, which may itself be `None` to
//! clear the column. This is the only representation that can distinguish
//! "vendor didn't report this" from "vendor reported this is empty" at the
//! store boundary.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

/// A patch applied via [`crate::Store::upsert_security`]. `id: None` means
/// insert a new row (`symbol` is then required); `id: Some(_)` means update
/// the row with that primary key. `symbol` and `em_code` are accepted on
/// insert but silently ignored by the update path (`spec.md` §4.3).
#[derive(Debug, Clone, Default)]
pub struct SecurityPatch {
    pub id: Option<i64>,
    pub symbol: Option<String>,
    pub em_code: Option<Option<String>>,
    pub name: Option<Option<String>>,
    pub market: Option<Option<String>>,
    pub r#type: Option<Option<String>>,
    pub exchange: Option<Option<String>>,
    pub currency: Option<Option<String>>,
    pub cik: Option<Option<String>>,
    pub composite_figi: Option<Option<String>>,
    pub share_class_figi: Option<Option<String>>,
    pub market_cap: Option<Option<Decimal>>,
    pub sector: Option<Option<String>>,
    pub industry: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub homepage_url: Option<Option<String>>,
    pub total_employees: Option<Option<i32>>,
    pub sic_code: Option<Option<String>>,
    pub address_line1: Option<Option<String>>,
    pub city: Option<Option<String>>,
    pub state: Option<Option<String>>,
    pub postal_code: Option<Option<String>>,
    pub logo_url: Option<Option<String>>,
    pub icon_url: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub list_date: Option<Option<NaiveDate>>,
    pub delist_date: Option<Option<NaiveDate>>,
}

impl SecurityPatch {
    /// A patch that only flips `is_active`, used by the details task when a
    /// vendor reports "not found" (`spec.md` §4.5).
    pub fn deactivate(id: i64) -> Self {
        Self {
            id: Some(id),
            is_active: Some(false),
            ..Default::default()
        }
    }
}

/// One row to write via [`crate::Store::upsert_daily_prices`]. Fields left
/// `None` are not written on conflict; `security_id` and `date` are always
/// the conflict key and always required.
#[derive(Debug, Clone)]
pub struct DailyPricePatch {
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
}

/// A fully materialized `daily_prices` row, as loaded by
/// [`crate::Store::load_daily_prices_for_date`], mutated in memory by the
/// grouped-daily reprice task, and rewritten whole via
/// [`crate::Store::bulk_update_prices`]. Every column is in scope for that
/// task, unlike the narrower [`DailyPricePatch`] (`spec.md` §4.5).
#[derive(Debug, Clone, Copy)]
pub struct DailyPriceRow {
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

/// A dividend record ready to write via [`crate::Store::upsert_dividends`].
/// Dividends are always inserted with every required column present, so
/// this is a plain row rather than a selective-merge patch (`spec.md`
/// §4.3, §4.5).
#[derive(Debug, Clone)]
pub struct DividendRow {
    pub ex_dividend_date: NaiveDate,
    pub declaration_date: Option<NaiveDate>,
    pub record_date: Option<NaiveDate>,
    pub pay_date: Option<NaiveDate>,
    pub cash_amount: Decimal,
    pub currency: Option<String>,
    pub frequency: Option<i32>,
}

/// A split record ready to write via [`crate::Store::upsert_splits`]. Same
/// always-fully-populated shape as [`DividendRow`].
#[derive(Debug, Clone)]
pub struct SplitRow {
    pub execution_date: NaiveDate,
    pub declaration_date: Option<NaiveDate>,
    pub split_to: Decimal,
    pub split_from: Decimal,
}

/// The whitelisted freshness-stamp columns `set_stamp` is allowed to touch
/// (`spec.md` §4.3 — "guards SQL injection of the column name").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StampField {
    InfoLastUpdatedAt,
    ActionsLastUpdatedAt,
    PriceDataLatestDate,
    FullDataLastUpdatedAt,
}

impl StampField {
    pub(crate) fn column(self) -> &'static str {
        match self {
            Self::InfoLastUpdatedAt => "info_last_updated_at",
            Self::ActionsLastUpdatedAt => "actions_last_updated_at",
            Self::PriceDataLatestDate => "price_data_latest_date",
            Self::FullDataLastUpdatedAt => "full_data_last_updated_at",
        }
    }
}

/// The value to write via `set_stamp`: either `now()` computed server-side,
/// or an explicit date (used by the price-increment task to advance
/// `price_data_latest_date`).
#[derive(Debug, Clone, Copy)]
pub enum StampValue {
    Now,
    Date(NaiveDate),
}

/// A row in `securities`, as read back by the candidate selector and task
/// workers. Intentionally narrower than the full schema — only the columns
/// the orchestration layer actually needs to branch on.
#[derive(Debug, Clone)]
pub struct SecurityRow {
    pub id: i64,
    pub symbol: String,
    pub em_code: Option<String>,
    pub market: Option<String>,
    pub r#type: Option<String>,
    pub currency: Option<String>,
    pub is_active: bool,
    pub price_data_latest_date: Option<NaiveDate>,
    pub full_refresh_interval: i32,
}

/// Picks a `full_refresh_interval` uniformly from `[25, 40]` days, matching
/// the jitter the auto full-refresh candidate predicate relies on to spread
/// load (`spec.md` §4.4, §8 invariant 5).
pub fn random_full_refresh_interval() -> i32 {
    use rand::Rng;
    rand::rng().random_range(25..=40)
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}
