//! Candidate selection: computes the working set for each command by a
//! single SQL query against `securities` (`spec.md` §4.4).

use crate::models::SecurityRow;
use crate::Store;
use ingest_core::IngestError;
use sqlx::Row;

/// Narrows a candidate query to explicit symbols, a market, or the full
/// (freshness-filtered) population. Explicit symbols bypass every
/// freshness predicate but still respect `is_active` (`spec.md` §4.4).
#[derive(Debug, Clone, Default)]
pub struct CandidateFilter {
    pub symbols: Vec<String>,
    pub market: Option<String>,
    pub force: bool,
    pub limit: Option<i64>,
}

fn row_to_security(row: sqlx::postgres::PgRow) -> SecurityRow {
    SecurityRow {
        id: row.get("id"),
        symbol: row.get("symbol"),
        em_code: row.get("em_code"),
        market: row.get("market"),
        r#type: row.get("type"),
        currency: row.get("currency"),
        is_active: row.get("is_active"),
        price_data_latest_date: row.get("price_data_latest_date"),
        full_refresh_interval: row.get("full_refresh_interval"),
    }
}

impl Store {
    async fn run_candidate_query(
        &self,
        staleness_predicate: &str,
        filter: &CandidateFilter,
        order_by: &str,
    ) -> Result<Vec<SecurityRow>, IngestError> {
        let mut sql = String::from(
            "SELECT id, symbol, em_code, market, type, currency, is_active, \
             price_data_latest_date, full_refresh_interval FROM securities WHERE is_active",
        );

        if !filter.symbols.is_empty() {
            sql.push_str(" AND symbol = ANY($1)");
        } else if !filter.force {
            sql.push_str(" AND (");
            sql.push_str(staleness_predicate);
            sql.push(')');
        }

        if filter.market.is_some() {
            sql.push_str(" AND market = $2");
        }

        sql.push_str(" ORDER BY ");
        sql.push_str(order_by);
        sql.push_str(" ASC NULLS FIRST");

        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let mut query = sqlx::query(&sql);
        if !filter.symbols.is_empty() {
            query = query.bind(&filter.symbols);
        }
        if let Some(market) = &filter.market {
            query = query.bind(market);
        }

        let rows = query.fetch_all(self.pool()).await?;
        Ok(rows.into_iter().map(row_to_security).collect())
    }

    /// `is_active AND (info_last_updated_at IS NULL OR info_last_updated_at
    /// < now - 30d)`, unless `--force` (`spec.md` §4.4).
    pub async fn candidates_for_details(
        &self,
        filter: &CandidateFilter,
    ) -> Result<Vec<SecurityRow>, IngestError> {
        self.run_candidate_query(
            "info_last_updated_at IS NULL OR info_last_updated_at < now() - interval '30 days'",
            filter,
            "info_last_updated_at",
        )
        .await
    }

    /// Same shape as details, threshold 90 days on `actions_last_updated_at`.
    pub async fn candidates_for_actions(
        &self,
        filter: &CandidateFilter,
    ) -> Result<Vec<SecurityRow>, IngestError> {
        self.run_candidate_query(
            "actions_last_updated_at IS NULL OR actions_last_updated_at < now() - interval '90 days'",
            filter,
            "actions_last_updated_at",
        )
        .await
    }

    /// `is_active AND (price_data_latest_date IS NULL OR
    /// price_data_latest_date < today - 2d) AND market filter` (`spec.md` §4.4).
    pub async fn candidates_for_price_increment(
        &self,
        filter: &CandidateFilter,
    ) -> Result<Vec<SecurityRow>, IngestError> {
        self.run_candidate_query(
            "price_data_latest_date IS NULL OR price_data_latest_date < current_date - 2",
            filter,
            "price_data_latest_date",
        )
        .await
    }

    /// `is_active AND (full_data_last_updated_at IS NULL OR now >
    /// full_data_last_updated_at + full_refresh_interval days)`. The
    /// jittered per-row interval spreads full refreshes evenly across time
    /// (`spec.md` §4.4).
    pub async fn candidates_for_full_refresh(
        &self,
        filter: &CandidateFilter,
    ) -> Result<Vec<SecurityRow>, IngestError> {
        self.run_candidate_query(
            "full_data_last_updated_at IS NULL OR now() > full_data_last_updated_at \
             + (full_refresh_interval || ' days')::interval",
            filter,
            "full_data_last_updated_at",
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_has_no_symbols_and_is_not_forced() {
        let filter = CandidateFilter::default();
        assert!(filter.symbols.is_empty());
        assert!(!filter.force);
    }
}
