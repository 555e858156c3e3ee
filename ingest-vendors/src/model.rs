//! Vendor-neutral record shapes returned by every client, matching the
//! normalization contract in `spec.md` §4.2.

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Normalized security-detail payload, a superset of the columns callers
/// may selectively merge into `securities` (`spec.md` §4.2).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecurityInfo {
    pub name: Option<String>,
    pub exchange: Option<String>,
    pub currency: Option<String>,
    pub market: Option<String>,
    pub r#type: Option<String>,
    pub list_date: Option<NaiveDate>,
    pub delist_date: Option<NaiveDate>,
    pub cik: Option<String>,
    pub composite_figi: Option<String>,
    pub share_class_figi: Option<String>,
    pub market_cap: Option<Decimal>,
    pub description: Option<String>,
    pub homepage_url: Option<String>,
    pub employees: Option<i32>,
    pub sic_code: Option<String>,
    pub industry: Option<String>,
    pub address_line1: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub logo_url: Option<String>,
    pub icon_url: Option<String>,
    pub is_active: bool,
}

/// A raw dividend record as reported by a vendor, before the
/// required-field filter in `spec.md` §4.2 is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDividend {
    pub ex_dividend_date: Option<NaiveDate>,
    pub declaration_date: Option<NaiveDate>,
    pub record_date: Option<NaiveDate>,
    pub pay_date: Option<NaiveDate>,
    pub cash_amount: Option<Decimal>,
    pub currency: Option<String>,
    pub frequency: Option<i32>,
}

/// A dividend record that has passed the required-field filter: it has
/// both `ex_dividend_date` and `cash_amount`.
#[derive(Debug, Clone, PartialEq)]
pub struct DividendRecord {
    pub ex_dividend_date: NaiveDate,
    pub declaration_date: Option<NaiveDate>,
    pub record_date: Option<NaiveDate>,
    pub pay_date: Option<NaiveDate>,
    pub cash_amount: Decimal,
    pub currency: Option<String>,
    pub frequency: Option<i32>,
}

impl TryFrom<RawDividend> for DividendRecord {
    type Error = crate::error::VendorError;

    fn try_from(raw: RawDividend) -> Result<Self, Self::Error> {
        let ex_dividend_date = raw
            .ex_dividend_date
            .ok_or_else(|| crate::error::VendorError::Validation("missing ex_dividend_date".into()))?;
        let cash_amount = raw
            .cash_amount
            .ok_or_else(|| crate::error::VendorError::Validation("missing cash_amount".into()))?;

        Ok(Self {
            ex_dividend_date,
            declaration_date: raw.declaration_date,
            record_date: raw.record_date,
            pay_date: raw.pay_date,
            cash_amount,
            currency: raw.currency,
            frequency: raw.frequency,
        })
    }
}

/// A raw split record as reported by a vendor.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSplit {
    pub execution_date: Option<NaiveDate>,
    pub declaration_date: Option<NaiveDate>,
    pub split_to: Option<Decimal>,
    pub split_from: Option<Decimal>,
}

/// A split record that has passed the required-field filter: it has both
/// `execution_date` and `split_to`.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitRecord {
    pub execution_date: NaiveDate,
    pub declaration_date: Option<NaiveDate>,
    pub split_to: Decimal,
    pub split_from: Decimal,
}

impl TryFrom<RawSplit> for SplitRecord {
    type Error = crate::error::VendorError;

    fn try_from(raw: RawSplit) -> Result<Self, Self::Error> {
        let execution_date = raw
            .execution_date
            .ok_or_else(|| crate::error::VendorError::Validation("missing execution_date".into()))?;
        let split_to = raw
            .split_to
            .ok_or_else(|| crate::error::VendorError::Validation("missing split_to".into()))?;

        Ok(Self {
            execution_date,
            declaration_date: raw.declaration_date,
            split_to,
            split_from: raw.split_from.unwrap_or(Decimal::ONE),
        })
    }
}

/// One day of unadjusted OHLCV(+vwap/turnover) for a single symbol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub close: Option<Decimal>,
    pub volume: Option<i64>,
    pub vwap: Option<Decimal>,
    pub turnover: Option<Decimal>,
}

/// One instrument's OHLCV for a single grouped-daily date
/// (`spec.md` §4.2, `fetch_grouped_daily`).
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedBar {
    pub symbol: String,
    pub open: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub close: Option<Decimal>,
    pub volume: Option<i64>,
    pub vwap: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn dividend_missing_ex_date_is_rejected() {
        let raw = RawDividend {
            ex_dividend_date: None,
            declaration_date: None,
            record_date: None,
            pay_date: None,
            cash_amount: Some(dec!(0.5)),
            currency: Some("USD".into()),
            frequency: None,
        };
        assert!(DividendRecord::try_from(raw).is_err());
    }

    #[test]
    fn split_defaults_split_from_to_one() {
        let raw = RawSplit {
            execution_date: Some(NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()),
            declaration_date: None,
            split_to: Some(dec!(4)),
            split_from: None,
        };
        let split = SplitRecord::try_from(raw).unwrap();
        assert_eq!(split.split_from, Decimal::ONE);
    }
}
