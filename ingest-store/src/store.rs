//! The transactional persistence layer (`spec.md` §4.3).

use crate::models::{
    random_full_refresh_interval, DailyPricePatch, DailyPriceRow, DividendRow, SecurityPatch,
    SplitRow, StampField, StampValue,
};
use ingest_core::IngestError;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    pub async fn connect(database_url: &str) -> Result<Self, IngestError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies the migrations bundled with this crate. Idempotent: safe to
    /// call on every process start (the `migrate` CLI command does exactly
    /// this — `spec.md` §6).
    pub async fn migrate(&self) -> Result<(), IngestError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|err| IngestError::Database(sqlx::Error::Migrate(Box::new(err))))
    }

    /// Implements the selective-field merge rule: `id: None` inserts a new
    /// row (`symbol` is required); `id: Some(_)` updates only the columns
    /// present in `patch`, ignoring `symbol`/`em_code` even if set
    /// (`spec.md` §4.3). Returns the row's id.
    pub async fn upsert_security(&self, patch: SecurityPatch) -> Result<i64, IngestError> {
        match patch.id {
            Some(id) => self.update_security(id, patch).await,
            None => self.insert_security(patch).await,
        }
    }

    async fn insert_security(&self, patch: SecurityPatch) -> Result<i64, IngestError> {
        let symbol = patch
            .symbol
            .clone()
            .ok_or_else(|| IngestError::Vendor("insert requires a symbol".into()))?;
        let full_refresh_interval = random_full_refresh_interval();

        let row = sqlx::query(
            r#"
INSERT INTO securities (
    symbol, em_code, name, market, type, exchange, currency,
    cik, composite_figi, share_class_figi, market_cap, sector, industry,
    description, homepage_url, total_employees, sic_code,
    address_line1, city, state, postal_code, logo_url, icon_url,
    is_active, list_date, delist_date, full_refresh_interval
) VALUES (
    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
    $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27
)
ON CONFLICT (symbol, market, type) DO UPDATE SET info_last_updated_at = now()
RETURNING id
"#,
        )
        .bind(symbol)
        .bind(patch.em_code.flatten())
        .bind(patch.name.flatten())
        .bind(patch.market.flatten())
        .bind(patch.r#type.flatten())
        .bind(patch.exchange.flatten())
        .bind(patch.currency.flatten())
        .bind(patch.cik.flatten())
        .bind(patch.composite_figi.flatten())
        .bind(patch.share_class_figi.flatten())
        .bind(patch.market_cap.flatten())
        .bind(patch.sector.flatten())
        .bind(patch.industry.flatten())
        .bind(patch.description.flatten())
        .bind(patch.homepage_url.flatten())
        .bind(patch.total_employees.flatten())
        .bind(patch.sic_code.flatten())
        .bind(patch.address_line1.flatten())
        .bind(patch.city.flatten())
        .bind(patch.state.flatten())
        .bind(patch.postal_code.flatten())
        .bind(patch.logo_url.flatten())
        .bind(patch.icon_url.flatten())
        .bind(patch.is_active.unwrap_or(true))
        .bind(patch.list_date.flatten())
        .bind(patch.delist_date.flatten())
        .bind(full_refresh_interval)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get(0))
    }

    async fn update_security(&self, id: i64, patch: SecurityPatch) -> Result<i64, IngestError> {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new("UPDATE securities SET ");
        let mut sep = qb.separated(", ");

        // symbol and em_code are deliberately never touched by this path.
        macro_rules! push_field {
            ($column:literal, $value:expr) => {
                if let Some(value) = $value {
                    sep.push(concat!($column, " = "));
                    sep.push_bind_unseparated(value);
                }
            };
        }

        push_field!("name", patch.name);
        push_field!("market", patch.market);
        push_field!("type", patch.r#type);
        push_field!("exchange", patch.exchange);
        push_field!("currency", patch.currency);
        push_field!("cik", patch.cik);
        push_field!("composite_figi", patch.composite_figi);
        push_field!("share_class_figi", patch.share_class_figi);
        push_field!("market_cap", patch.market_cap);
        push_field!("sector", patch.sector);
        push_field!("industry", patch.industry);
        push_field!("description", patch.description);
        push_field!("homepage_url", patch.homepage_url);
        push_field!("total_employees", patch.total_employees);
        push_field!("sic_code", patch.sic_code);
        push_field!("address_line1", patch.address_line1);
        push_field!("city", patch.city);
        push_field!("state", patch.state);
        push_field!("postal_code", patch.postal_code);
        push_field!("logo_url", patch.logo_url);
        push_field!("icon_url", patch.icon_url);
        push_field!("list_date", patch.list_date);
        push_field!("delist_date", patch.delist_date);
        if let Some(is_active) = patch.is_active {
            sep.push("is_active = ");
            sep.push_bind_unseparated(is_active);
        }

        sep.push("info_last_updated_at = now()");

        qb.push(" WHERE id = ");
        qb.push_bind(id);

        qb.build().execute(&self.pool).await?;
        Ok(id)
    }

    /// Batch insert with `ON CONFLICT DO NOTHING` on
    /// `(security_id, ex_dividend_date, cash_amount)` (`spec.md` §4.3).
    pub async fn upsert_dividends(
        &self,
        security_id: i64,
        records: &[DividendRow],
    ) -> Result<u64, IngestError> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut written = 0u64;
        for record in records {
            let result = sqlx::query(
                r#"
INSERT INTO stock_dividends (
    security_id, ex_dividend_date, declaration_date, record_date, pay_date,
    cash_amount, currency, frequency
) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
ON CONFLICT (security_id, ex_dividend_date, cash_amount) DO NOTHING
"#,
            )
            .bind(security_id)
            .bind(record.ex_dividend_date)
            .bind(record.declaration_date)
            .bind(record.record_date)
            .bind(record.pay_date)
            .bind(record.cash_amount)
            .bind(&record.currency)
            .bind(record.frequency)
            .execute(&mut *tx)
            .await?;
            written += result.rows_affected();
        }
        tx.commit().await?;
        Ok(written)
    }

    /// Batch insert keyed on `(security_id, execution_date)`.
    pub async fn upsert_splits(&self, security_id: i64, records: &[SplitRow]) -> Result<u64, IngestError> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut written = 0u64;
        for record in records {
            let result = sqlx::query(
                r#"
INSERT INTO stock_splits (security_id, execution_date, declaration_date, split_to, split_from)
VALUES ($1, $2, $3, $4, $5)
ON CONFLICT (security_id, execution_date) DO NOTHING
"#,
            )
            .bind(security_id)
            .bind(record.execution_date)
            .bind(record.declaration_date)
            .bind(record.split_to)
            .bind(record.split_from)
            .execute(&mut *tx)
            .await?;
            written += result.rows_affected();
        }
        tx.commit().await?;
        Ok(written)
    }

    /// `ON CONFLICT (security_id, date)` updates only the OHLCV/vwap/
    /// turnover/turnover_rate fields present in each patch (`spec.md` §4.3).
    pub async fn upsert_daily_prices(&self, records: &[DailyPricePatch]) -> Result<u64, IngestError> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut written = 0u64;
        for record in records {
            let result = sqlx::query(
                r#"
INSERT INTO daily_prices (security_id, date, open, high, low, close, volume, turnover, vwap, turnover_rate)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
ON CONFLICT (security_id, date) DO UPDATE SET
    open = COALESCE(EXCLUDED.open, daily_prices.open),
    high = COALESCE(EXCLUDED.high, daily_prices.high),
    low = COALESCE(EXCLUDED.low, daily_prices.low),
    close = COALESCE(EXCLUDED.close, daily_prices.close),
    volume = COALESCE(EXCLUDED.volume, daily_prices.volume),
    turnover = COALESCE(EXCLUDED.turnover, daily_prices.turnover),
    vwap = COALESCE(EXCLUDED.vwap, daily_prices.vwap),
    turnover_rate = COALESCE(EXCLUDED.turnover_rate, daily_prices.turnover_rate)
"#,
            )
            .bind(record.security_id)
            .bind(record.date)
            .bind(record.open)
            .bind(record.high)
            .bind(record.low)
            .bind(record.close)
            .bind(record.volume)
            .bind(record.turnover)
            .bind(record.vwap)
            .bind(record.turnover_rate)
            .execute(&mut *tx)
            .await?;
            written += result.rows_affected();
        }
        tx.commit().await?;
        Ok(written)
    }

    /// Loads every `daily_prices` row for `date`, keyed by `security_id`,
    /// for the grouped-daily reprice task's in-memory mutate step
    /// (`spec.md` §4.5).
    pub async fn load_daily_prices_for_date(
        &self,
        date: chrono::NaiveDate,
    ) -> Result<Vec<DailyPriceRow>, IngestError> {
        let rows = sqlx::query(
            r#"
SELECT security_id, date, open, high, low, close, volume, turnover, vwap, turnover_rate, adj_factor
FROM daily_prices
WHERE date = $1
"#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| DailyPriceRow {
                security_id: row.get("security_id"),
                date: row.get("date"),
                open: row.get("open"),
                high: row.get("high"),
                low: row.get("low"),
                close: row.get("close"),
                volume: row.get("volume"),
                turnover: row.get("turnover"),
                vwap: row.get("vwap"),
                turnover_rate: row.get("turnover_rate"),
                adj_factor: row.get("adj_factor"),
            })
            .collect())
    }

    /// Rewrites a set of fully materialized rows in a single commit. Used
    /// by the grouped-daily reprice task: rows are loaded, mutated in
    /// memory, then persisted together, leaving `turnover_rate` and
    /// `adj_factor` untouched by the mutation step (`spec.md` §4.5).
    pub async fn bulk_update_prices(&self, rows: &[DailyPriceRow]) -> Result<u64, IngestError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut written = 0u64;
        for row in rows {
            let result = sqlx::query(
                r#"
UPDATE daily_prices
SET open = $3, high = $4, low = $5, close = $6, volume = $7,
    turnover = $8, vwap = $9, turnover_rate = $10, adj_factor = $11
WHERE security_id = $1 AND date = $2
"#,
            )
            .bind(row.security_id)
            .bind(row.date)
            .bind(row.open)
            .bind(row.high)
            .bind(row.low)
            .bind(row.close)
            .bind(row.volume)
            .bind(row.turnover)
            .bind(row.vwap)
            .bind(row.turnover_rate)
            .bind(row.adj_factor)
            .execute(&mut *tx)
            .await?;
            written += result.rows_affected();
        }
        tx.commit().await?;
        Ok(written)
    }

    /// Builds the `symbol -> security_id` map the grouped-daily reprice
    /// task needs, built once up front and read-only thereafter
    /// (`spec.md` §5).
    pub async fn symbol_to_id_map(&self) -> Result<std::collections::HashMap<String, i64>, IngestError> {
        let rows = sqlx::query("SELECT symbol, id FROM securities WHERE is_active")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|row| (row.get("symbol"), row.get("id"))).collect())
    }

    /// Updates one of the whitelisted freshness-stamp columns. The column
    /// name comes from the [`StampField`] enum, never from caller-supplied
    /// text, which is what rules out SQL injection of the column name
    /// (`spec.md` §4.3).
    pub async fn set_stamp(
        &self,
        security_id: i64,
        field: StampField,
        value: StampValue,
    ) -> Result<(), IngestError> {
        let column = field.column();
        match value {
            StampValue::Now => {
                let sql = format!("UPDATE securities SET {column} = now() WHERE id = $1");
                sqlx::query(&sql).bind(security_id).execute(&self.pool).await?;
            }
            StampValue::Date(date) => {
                let sql = format!("UPDATE securities SET {column} = $2 WHERE id = $1");
                sqlx::query(&sql)
                    .bind(security_id)
                    .bind(date)
                    .execute(&self.pool)
                    .await?;
            }
        }
        Ok(())
    }
}
