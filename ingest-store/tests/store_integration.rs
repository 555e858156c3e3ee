//! Integration tests against a real Postgres instance. Gated behind
//! `#[ignore]` the way the rest of the pack gates database tests — run with
//! `cargo test -- --ignored` against a `DATABASE_URL` pointed at a
//! disposable database.

use chrono::NaiveDate;
use ingest_store::models::SecurityPatch;
use ingest_store::Store;

async fn test_store() -> Store {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for this test");
    let store = Store::connect(&database_url).await.expect("connect");
    store.migrate().await.expect("migrate");
    store
}

#[tokio::test]
#[ignore]
async fn selective_merge_does_not_clobber_absent_fields() {
    let store = test_store().await;

    let id = store
        .upsert_security(SecurityPatch {
            symbol: Some("aapl".into()),
            em_code: Some(Some("600519".into())),
            name: Some(Some("Apple Inc.".into())),
            market: Some(Some("US".into())),
            r#type: Some(Some("STOCK".into())),
            ..Default::default()
        })
        .await
        .expect("insert");

    store
        .upsert_security(SecurityPatch {
            id: Some(id),
            name: Some(Some("Apple Incorporated".into())),
            ..Default::default()
        })
        .await
        .expect("update");

    let row = sqlx::query("SELECT name, em_code FROM securities WHERE id = $1")
        .bind(id)
        .fetch_one(store.pool())
        .await
        .expect("fetch");

    let name: String = sqlx::Row::get(&row, "name");
    let em_code: Option<String> = sqlx::Row::get(&row, "em_code");
    assert_eq!(name, "Apple Incorporated");
    assert_eq!(em_code.as_deref(), Some("600519"));
}

#[tokio::test]
#[ignore]
async fn candidate_query_excludes_fresh_rows() {
    use ingest_store::CandidateFilter;

    let store = test_store().await;

    let id = store
        .upsert_security(SecurityPatch {
            symbol: Some("msft".into()),
            market: Some(Some("US".into())),
            r#type: Some(Some("STOCK".into())),
            ..Default::default()
        })
        .await
        .expect("insert");

    let candidates = store
        .candidates_for_details(&CandidateFilter::default())
        .await
        .expect("query");
    assert!(candidates.iter().any(|row| row.id == id));

    sqlx::query("UPDATE securities SET info_last_updated_at = now() WHERE id = $1")
        .bind(id)
        .execute(store.pool())
        .await
        .expect("stamp");

    let candidates = store
        .candidates_for_details(&CandidateFilter::default())
        .await
        .expect("query");
    assert!(!candidates.iter().any(|row| row.id == id));
}

#[tokio::test]
#[ignore]
async fn price_increment_candidate_respects_two_day_threshold() {
    use ingest_store::CandidateFilter;

    let store = test_store().await;

    let id = store
        .upsert_security(SecurityPatch {
            symbol: Some("nvda".into()),
            market: Some(Some("US".into())),
            r#type: Some(Some("STOCK".into())),
            ..Default::default()
        })
        .await
        .expect("insert");

    sqlx::query("UPDATE securities SET price_data_latest_date = current_date WHERE id = $1")
        .bind(id)
        .execute(store.pool())
        .await
        .expect("stamp");

    let candidates = store
        .candidates_for_price_increment(&CandidateFilter::default())
        .await
        .expect("query");
    assert!(!candidates.iter().any(|row| row.id == id));

    sqlx::query("UPDATE securities SET price_data_latest_date = $2 WHERE id = $1")
        .bind(id)
        .bind(NaiveDate::from_ymd_opt(2000, 1, 1).unwrap())
        .execute(store.pool())
        .await
        .expect("stamp");

    let candidates = store
        .candidates_for_price_increment(&CandidateFilter::default())
        .await
        .expect("query");
    assert!(candidates.iter().any(|row| row.id == id));
}
