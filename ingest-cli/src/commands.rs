//! Command implementations. Each one builds a candidate list via
//! [`ingest_store::selector`], constructs the vendor(s) it needs, and hands
//! both to the [`Orchestrator`].

use crate::cli::Command;
use chrono::{Duration as ChronoDuration, Utc};
use ingest_core::Config;
use ingest_pipeline::{tasks, Orchestrator, RunSummary};
use ingest_store::{CandidateFilter, Store};
use ingest_vendors::eastmoney::EastMoneyClient;
use ingest_vendors::polygon::PolygonClient;
use std::sync::Arc;

fn polygon_client(config: &Config) -> Arc<PolygonClient> {
    Arc::new(PolygonClient::new(
        config.polygon_api_keys.clone(),
        config.polygon_rate_limit,
        config.polygon_rate_window,
        config.http_timeout,
    ))
}

fn eastmoney_client(config: &Config) -> Arc<EastMoneyClient> {
    Arc::new(EastMoneyClient::with_base_url(
        config.http_timeout,
        config.eastmoney_base_url.clone(),
    ))
}

fn candidate_filter(symbols: Vec<String>, all: bool, market: Option<String>, force: bool, limit: Option<i64>) -> CandidateFilter {
    CandidateFilter {
        symbols: if all { Vec::new() } else { symbols },
        market,
        force,
        limit,
    }
}

async fn run_details(store: &Store, config: &Config, filter: CandidateFilter, workers: usize) -> anyhow::Result<RunSummary> {
    let candidates = store.candidates_for_details(&filter).await?;
    let vendor = polygon_client(config);
    let orchestrator = Orchestrator::new(workers);
    let store = store.clone();
    Ok(orchestrator
        .run(candidates, move |security| {
            let vendor = vendor.clone();
            let store = store.clone();
            async move { tasks::run_details_task(&store, vendor.as_ref(), &security).await }
        })
        .await)
}

async fn run_actions(store: &Store, config: &Config, filter: CandidateFilter, workers: usize) -> anyhow::Result<RunSummary> {
    let candidates = store.candidates_for_actions(&filter).await?;
    let vendor = polygon_client(config);
    let orchestrator = Orchestrator::new(workers);
    let store = store.clone();
    Ok(orchestrator
        .run(candidates, move |security| {
            let vendor = vendor.clone();
            let store = store.clone();
            async move { tasks::run_actions_task(&store, vendor.as_ref(), &security).await }
        })
        .await)
}

async fn run_em_prices(
    store: &Store,
    config: &Config,
    filter: CandidateFilter,
    full_refresh: bool,
    workers: usize,
) -> anyhow::Result<RunSummary> {
    // Securities whose full_refresh_interval has elapsed always get a full
    // run, jittered per-row so the whole fleet's expensive full-history
    // pulls never land on the same day (`spec.md` §4.4). `--full-refresh`
    // additionally forces every other selected candidate into a full run.
    let full_refresh_candidates = store.candidates_for_full_refresh(&filter).await?;
    let full_refresh_ids: std::collections::HashSet<i64> =
        full_refresh_candidates.iter().map(|security| security.id).collect();

    let mut incremental_candidates = store.candidates_for_price_increment(&filter).await?;
    incremental_candidates.retain(|security| !full_refresh_ids.contains(&security.id));

    let mut candidates: Vec<(ingest_store::models::SecurityRow, bool)> = full_refresh_candidates
        .into_iter()
        .map(|security| (security, true))
        .collect();
    candidates.extend(incremental_candidates.into_iter().map(|security| (security, full_refresh)));

    let vendor = eastmoney_client(config);
    let orchestrator = Orchestrator::new(workers);
    let store = store.clone();
    Ok(orchestrator
        .run(candidates, move |(security, is_full_run)| {
            let vendor = vendor.clone();
            let store = store.clone();
            async move { tasks::run_price_increment_task(&store, vendor.as_ref(), &security, is_full_run).await }
        })
        .await)
}

async fn run_polygon_grouped_daily(
    store: &Store,
    config: &Config,
    start_date: chrono::NaiveDate,
    end_date: chrono::NaiveDate,
    workers: usize,
) -> anyhow::Result<RunSummary> {
    let symbol_to_id = Arc::new(store.symbol_to_id_map().await?);
    let vendor = polygon_client(config);
    let orchestrator = Orchestrator::new(workers);
    let store = store.clone();

    let mut dates = Vec::new();
    let mut cursor = start_date;
    while cursor <= end_date {
        dates.push(cursor);
        cursor += ChronoDuration::days(1);
    }

    Ok(orchestrator
        .run(dates, move |date| {
            let vendor = vendor.clone();
            let store = store.clone();
            let symbol_to_id = symbol_to_id.clone();
            async move { tasks::run_grouped_daily_task(&store, vendor.as_ref(), date, &symbol_to_id).await }
        })
        .await)
}

/// Executes the requested command, returning a run summary for every
/// command except `migrate` (which has no per-security tally).
pub async fn run(command: Command, config: &Config, store: &Store) -> anyhow::Result<Option<RunSummary>> {
    match command {
        Command::Migrate => {
            store.migrate().await?;
            Ok(None)
        }

        Command::UpdateDetails {
            symbols,
            all,
            market,
            force,
            limit,
            workers,
        } => {
            let filter = candidate_filter(symbols, all, market, force, limit);
            let summary = run_details(store, config, filter, workers.unwrap_or(config.workers)).await?;
            Ok(Some(summary))
        }

        Command::UpdateActions {
            symbols,
            all,
            market,
            force,
            limit,
            workers,
        } => {
            let filter = candidate_filter(symbols, all, market, force, limit);
            let summary = run_actions(store, config, filter, workers.unwrap_or(config.workers)).await?;
            Ok(Some(summary))
        }

        Command::UpdateEmPrices {
            em_codes,
            full_refresh,
            market,
            limit,
            workers,
        } => {
            let filter = candidate_filter(em_codes, false, market, full_refresh, limit);
            let summary = run_em_prices(store, config, filter, full_refresh, workers.unwrap_or(config.workers)).await?;
            Ok(Some(summary))
        }

        Command::UpdatePolygonPrices {
            start_date,
            end_date,
            workers,
        } => {
            let summary =
                run_polygon_grouped_daily(store, config, start_date, end_date, workers.unwrap_or(config.workers)).await?;
            Ok(Some(summary))
        }

        Command::DailyRun {
            market,
            skip_details,
            skip_actions,
            skip_em_prices,
            skip_polygon_prices,
        } => {
            let mut total = RunSummary::new();
            let workers = config.workers;
            let today = Utc::now().date_naive();

            if !skip_details {
                let filter = candidate_filter(Vec::new(), true, market.clone(), false, None);
                let summary = run_details(store, config, filter, workers).await?;
                tracing::info!(phase = "details", %summary, "phase complete");
                total.merge(&summary);
            }
            if !skip_actions {
                let filter = candidate_filter(Vec::new(), true, market.clone(), false, None);
                let summary = run_actions(store, config, filter, workers).await?;
                tracing::info!(phase = "actions", %summary, "phase complete");
                total.merge(&summary);
            }
            if !skip_em_prices {
                let filter = candidate_filter(Vec::new(), true, market.clone(), false, None);
                let summary = run_em_prices(store, config, filter, false, workers).await?;
                tracing::info!(phase = "em_prices", %summary, "phase complete");
                total.merge(&summary);
            }
            if !skip_polygon_prices {
                let yesterday = today - ChronoDuration::days(1);
                let day_before = today - ChronoDuration::days(2);
                let summary = run_polygon_grouped_daily(store, config, day_before, yesterday, workers).await?;
                tracing::info!(phase = "polygon_grouped_daily", %summary, "phase complete");
                total.merge(&summary);
            }

            Ok(Some(total))
        }
    }
}
