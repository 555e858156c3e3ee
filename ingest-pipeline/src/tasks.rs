//! Per-security (or per-date) task bodies (`spec.md` §4.5). Every task
//! catches vendor and store errors at its own top level and converts them
//! to a [`TaskStatus`] — nothing here propagates to the orchestrator.

use crate::status::TaskStatus;
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use ingest_core::market::canonical_symbol;
use ingest_store::models::{
    DailyPricePatch, DailyPriceRow, DividendRow, SecurityPatch, SecurityRow, SplitRow, StampField,
    StampValue,
};
use ingest_store::Store;
use ingest_vendors::{DividendsSource, GroupedDailySource, HistoricalPricesSource, SecurityInfoSource, SplitsSource, VendorError};
use std::collections::HashMap;

fn log_vendor_error(symbol: &str, err: &VendorError) {
    match err {
        VendorError::RateLimited => {
            tracing::error!(%symbol, "vendor rate limited us — rate limiter configuration disagrees with the vendor");
        }
        VendorError::Transient(message) => {
            tracing::error!(%symbol, %message, "transient vendor error");
        }
        VendorError::Validation(message) => {
            tracing::debug!(%symbol, %message, "vendor record failed validation, filtered");
        }
        VendorError::NotFound => {
            tracing::warn!(%symbol, "vendor reports not found");
        }
    }
}

/// Writes one freshness stamp, logging and reporting failure the same way
/// every other fallible store call in this module does — a failed stamp
/// write must not be reported as a silent `Success` (`spec.md` §8
/// invariant 4: `price_data_latest_date` monotonicity).
async fn stamp(store: &Store, security_id: i64, field: StampField, value: StampValue) -> Result<(), ()> {
    store.set_stamp(security_id, field, value).await.map_err(|err| {
        tracing::error!(security_id, ?field, %err, "failed to update freshness stamp");
    })
}

fn security_info_to_patch(id: i64, info: ingest_vendors::model::SecurityInfo) -> SecurityPatch {
    SecurityPatch {
        id: Some(id),
        name: Some(info.name),
        market: Some(info.market),
        r#type: Some(info.r#type),
        exchange: Some(info.exchange),
        currency: Some(info.currency),
        cik: Some(info.cik),
        composite_figi: Some(info.composite_figi),
        share_class_figi: Some(info.share_class_figi),
        market_cap: Some(info.market_cap),
        industry: Some(info.industry),
        description: Some(info.description),
        homepage_url: Some(info.homepage_url),
        total_employees: Some(info.employees),
        sic_code: Some(info.sic_code),
        address_line1: Some(info.address_line1),
        city: Some(info.city),
        state: Some(info.state),
        postal_code: Some(info.postal_code),
        logo_url: Some(info.logo_url),
        icon_url: Some(info.icon_url),
        is_active: Some(info.is_active),
        list_date: Some(info.list_date),
        delist_date: Some(info.delist_date),
        ..Default::default()
    }
}

/// Fetch → normalize → persist → stamp for security details.
pub async fn run_details_task<V: SecurityInfoSource>(
    store: &Store,
    vendor: &V,
    security: &SecurityRow,
) -> TaskStatus {
    match vendor.fetch_security_info(&security.symbol).await {
        Ok(None) => {
            if let Err(err) = store.upsert_security(SecurityPatch::deactivate(security.id)).await {
                tracing::error!(symbol = %security.symbol, %err, "failed to deactivate security");
                return TaskStatus::Error;
            }
            if stamp(store, security.id, StampField::InfoLastUpdatedAt, StampValue::Now)
                .await
                .is_err()
            {
                return TaskStatus::Error;
            }
            TaskStatus::SuccessNoData
        }
        Ok(Some(info)) => {
            let patch = security_info_to_patch(security.id, info);
            match store.upsert_security(patch).await {
                Ok(_) => TaskStatus::Success,
                Err(err) => {
                    tracing::error!(symbol = %security.symbol, %err, "failed to persist security details");
                    TaskStatus::Error
                }
            }
        }
        Err(err) => {
            log_vendor_error(&security.symbol, &err);
            TaskStatus::Error
        }
    }
}

/// Fetch dividends and splits, fill in a missing dividend currency from the
/// security's own currency (bug-compatibility rule, `spec.md` §4.5), and
/// always stamp `actions_last_updated_at` on a successful fetch.
pub async fn run_actions_task<V: DividendsSource + SplitsSource>(
    store: &Store,
    vendor: &V,
    security: &SecurityRow,
) -> TaskStatus {
    let dividends = match vendor.fetch_dividends(&security.symbol).await {
        Ok(records) => records,
        Err(err) => {
            log_vendor_error(&security.symbol, &err);
            return TaskStatus::Error;
        }
    };
    let splits = match vendor.fetch_splits(&security.symbol).await {
        Ok(records) => records,
        Err(err) => {
            log_vendor_error(&security.symbol, &err);
            return TaskStatus::Error;
        }
    };

    let dividend_rows: Vec<DividendRow> = dividends
        .into_iter()
        .map(|record| DividendRow {
            ex_dividend_date: record.ex_dividend_date,
            declaration_date: record.declaration_date,
            record_date: record.record_date,
            pay_date: record.pay_date,
            cash_amount: record.cash_amount,
            currency: record.currency.or_else(|| security.currency.clone()),
            frequency: record.frequency,
        })
        .collect();

    let split_rows: Vec<SplitRow> = splits
        .into_iter()
        .map(|record| SplitRow {
            execution_date: record.execution_date,
            declaration_date: record.declaration_date,
            split_to: record.split_to,
            split_from: record.split_from,
        })
        .collect();

    let is_empty = dividend_rows.is_empty() && split_rows.is_empty();

    if let Err(err) = store.upsert_dividends(security.id, &dividend_rows).await {
        tracing::error!(symbol = %security.symbol, %err, "failed to persist dividends");
        return TaskStatus::Error;
    }
    if let Err(err) = store.upsert_splits(security.id, &split_rows).await {
        tracing::error!(symbol = %security.symbol, %err, "failed to persist splits");
        return TaskStatus::Error;
    }

    if stamp(store, security.id, StampField::ActionsLastUpdatedAt, StampValue::Now)
        .await
        .is_err()
    {
        return TaskStatus::Error;
    }

    if is_empty {
        TaskStatus::SuccessNoData
    } else {
        TaskStatus::Success
    }
}

const EARLIEST_SUPPORTED_DATE: (i32, u32, u32) = (1970, 1, 1);

/// Determines the `[start, today]` fetch range per `spec.md` §4.5 step 1.
/// `None` means "already up to date, nothing to fetch" — a pure function
/// so the freshness-monotonicity invariant (`spec.md` §8) is testable
/// without a database.
fn determine_increment_start(
    today: NaiveDate,
    price_data_latest_date: Option<NaiveDate>,
    full_refresh: bool,
) -> Option<(NaiveDate, bool)> {
    let is_full_run = full_refresh || price_data_latest_date.is_none();
    let start = if is_full_run {
        let (y, m, d) = EARLIEST_SUPPORTED_DATE;
        NaiveDate::from_ymd_opt(y, m, d).expect("valid epoch date")
    } else {
        price_data_latest_date.expect("checked above") + ChronoDuration::days(1)
    };

    if start > today {
        None
    } else {
        Some((start, is_full_run))
    }
}

/// Incremental or full-range price fetch, persisted via selective merge.
pub async fn run_price_increment_task<V: HistoricalPricesSource>(
    store: &Store,
    vendor: &V,
    security: &SecurityRow,
    full_refresh: bool,
) -> TaskStatus {
    let today = Utc::now().date_naive();

    let Some((start, is_full_run)) =
        determine_increment_start(today, security.price_data_latest_date, full_refresh)
    else {
        return TaskStatus::SuccessUpToDate;
    };

    let bars = match vendor.fetch_historical_prices(&security.symbol, start, today).await {
        Ok(bars) => bars,
        Err(err) => {
            log_vendor_error(&security.symbol, &err);
            return TaskStatus::Error;
        }
    };

    if bars.is_empty() {
        if !is_full_run {
            let yesterday = today - ChronoDuration::days(1);
            if stamp(store, security.id, StampField::PriceDataLatestDate, StampValue::Date(yesterday))
                .await
                .is_err()
            {
                return TaskStatus::Error;
            }
            return TaskStatus::SuccessNoNewData;
        }
        if stamp(store, security.id, StampField::FullDataLastUpdatedAt, StampValue::Now)
            .await
            .is_err()
        {
            return TaskStatus::Error;
        }
        return TaskStatus::SuccessNoData;
    }

    let newest_date = bars.iter().map(|bar| bar.date).max().expect("non-empty checked above");

    let patches: Vec<DailyPricePatch> = bars
        .into_iter()
        .map(|bar| DailyPricePatch {
            security_id: security.id,
            date: bar.date,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            turnover: bar.turnover,
            vwap: bar.vwap,
            turnover_rate: None,
        })
        .collect();

    if let Err(err) = store.upsert_daily_prices(&patches).await {
        tracing::error!(symbol = %security.symbol, %err, "failed to persist daily prices");
        return TaskStatus::Error;
    }

    if stamp(
        store,
        security.id,
        StampField::PriceDataLatestDate,
        StampValue::Date(newest_date),
    )
    .await
    .is_err()
    {
        return TaskStatus::Error;
    }
    if is_full_run
        && stamp(store, security.id, StampField::FullDataLastUpdatedAt, StampValue::Now)
            .await
            .is_err()
    {
        return TaskStatus::Error;
    }

    TaskStatus::Success
}

/// Reconciles a more authoritative vendor's OHLCV into rows a cheaper
/// vendor already wrote for `date`, without disturbing `turnover_rate` or
/// `adj_factor` (`spec.md` §4.5).
pub async fn run_grouped_daily_task<V: GroupedDailySource>(
    store: &Store,
    vendor: &V,
    date: NaiveDate,
    symbol_to_security_id: &HashMap<String, i64>,
) -> TaskStatus {
    let existing_rows = match store.load_daily_prices_for_date(date).await {
        Ok(rows) => rows,
        Err(err) => {
            tracing::error!(%date, %err, "failed to load existing daily prices");
            return TaskStatus::Error;
        }
    };

    if existing_rows.is_empty() {
        return TaskStatus::SuccessNoData;
    }

    let mut rows_by_security_id: HashMap<i64, DailyPriceRow> =
        existing_rows.into_iter().map(|row| (row.security_id, row)).collect();

    let grouped_bars = match vendor.fetch_grouped_daily(date).await {
        Ok(bars) => bars,
        Err(err) => {
            tracing::error!(%date, %err, "failed to fetch grouped daily payload");
            return TaskStatus::Error;
        }
    };

    if grouped_bars.is_empty() {
        return TaskStatus::SuccessNoData;
    }

    let mut mutated = 0usize;
    for bar in grouped_bars {
        let Some(security_id) = symbol_to_security_id.get(&canonical_symbol(&bar.symbol)) else {
            continue;
        };
        let Some(row) = rows_by_security_id.get_mut(security_id) else {
            continue;
        };
        row.open = bar.open.or(row.open);
        row.high = bar.high.or(row.high);
        row.low = bar.low.or(row.low);
        row.close = bar.close.or(row.close);
        row.volume = bar.volume.or(row.volume);
        row.vwap = bar.vwap.or(row.vwap);
        mutated += 1;
    }

    if mutated == 0 {
        return TaskStatus::SuccessNoNewData;
    }

    let rows: Vec<DailyPriceRow> = rows_by_security_id.into_values().collect();
    if let Err(err) = store.bulk_update_prices(&rows).await {
        tracing::error!(%date, %err, "failed to persist reconciled daily prices");
        return TaskStatus::Error;
    }

    TaskStatus::Success
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn full_run_when_no_prior_price_data() {
        let today = date(2026, 7, 30);
        let (start, is_full_run) = determine_increment_start(today, None, false).unwrap();
        assert_eq!(start, date(1970, 1, 1));
        assert!(is_full_run);
    }

    #[test]
    fn full_run_when_explicitly_requested_despite_existing_data() {
        let today = date(2026, 7, 30);
        let (start, is_full_run) = determine_increment_start(today, Some(date(2026, 7, 1)), true).unwrap();
        assert_eq!(start, date(1970, 1, 1));
        assert!(is_full_run);
    }

    #[test]
    fn incremental_run_starts_the_day_after_the_latest_row() {
        let today = date(2026, 7, 30);
        let (start, is_full_run) = determine_increment_start(today, Some(date(2026, 7, 28)), false).unwrap();
        assert_eq!(start, date(2026, 7, 29));
        assert!(!is_full_run);
    }

    #[test]
    fn already_up_to_date_when_next_start_is_in_the_future() {
        let today = date(2026, 7, 30);
        assert!(determine_increment_start(today, Some(date(2026, 7, 30)), false).is_none());
    }

    #[test]
    fn security_info_patch_carries_id_and_leaves_symbol_and_em_code_absent() {
        let info = ingest_vendors::model::SecurityInfo {
            name: Some("Apple Inc.".into()),
            ..Default::default()
        };
        let patch = security_info_to_patch(42, info);
        assert_eq!(patch.id, Some(42));
        assert!(patch.symbol.is_none());
        assert!(patch.em_code.is_none());
        assert_eq!(patch.name, Some(Some("Apple Inc.".to_string())));
    }
}
