use rust_decimal::Decimal;
use uuid::Uuid;

use tickflow::db::Db;
use tickflow::timeseries::{SqlxTimeSeriesStore, TimeSeriesStore};
use tickflow_core::TimeSeriesEntry;

/// Unique shared-cache in-memory database so parallel tests never collide.
async fn setup_db() -> Db {
    let conn_str = format!("sqlite:file:{}?mode=memory&cache=shared", Uuid::new_v4());
    let db = Db::connect(&conn_str).await.unwrap();
    db.migrate().await.unwrap();
    db
}

fn entry(ts: i64, price: Decimal) -> TimeSeriesEntry {
    TimeSeriesEntry {
        symbol: "ORCL".into(),
        timestamp: ts,
        price,
        open: price,
        high: price + Decimal::ONE,
        low: price - Decimal::ONE,
        close: price,
        volume: 1_000,
    }
}

#[tokio::test]
async fn upsert_is_idempotent() {
    let db = setup_db().await;
    let store = SqlxTimeSeriesStore::new(db.pool.clone());

    let e = entry(1_700_000_000, Decimal::new(12345, 2));
    store.upsert(&e).await.unwrap();
    store.upsert(&e).await.unwrap();

    let rows = store.query_range("ORCL", 0, i64::MAX).await.unwrap();
    assert_eq!(rows, vec![e]);
}

#[tokio::test]
async fn upsert_overwrites_existing_key() {
    let db = setup_db().await;
    let store = SqlxTimeSeriesStore::new(db.pool.clone());

    store
        .upsert(&entry(1_700_000_000, Decimal::new(100, 0)))
        .await
        .unwrap();
    let newer = entry(1_700_000_000, Decimal::new(101, 0));
    store.upsert(&newer).await.unwrap();

    let rows = store.query_range("ORCL", 0, i64::MAX).await.unwrap();
    assert_eq!(rows, vec![newer]);
}

#[tokio::test]
async fn range_is_inclusive_ascending_and_per_symbol() {
    let db = setup_db().await;
    let store = SqlxTimeSeriesStore::new(db.pool.clone());

    // inserted out of order
    for ts in [300, 100, 400, 200, 500] {
        store.upsert(&entry(ts, Decimal::from(ts))).await.unwrap();
    }
    let mut other = entry(300, Decimal::ONE);
    other.symbol = "MSFT".into();
    store.upsert(&other).await.unwrap();

    let rows = store.query_range("ORCL", 200, 400).await.unwrap();
    let ts: Vec<i64> = rows.iter().map(|r| r.timestamp).collect();
    assert_eq!(ts, vec![200, 300, 400]);
    assert!(rows.iter().all(|r| r.symbol == "ORCL"));
}

#[tokio::test]
async fn decimals_survive_storage_exactly() {
    let db = setup_db().await;
    let store = SqlxTimeSeriesStore::new(db.pool.clone());

    let e = entry(1, Decimal::new(1234567, 4));
    store.upsert(&e).await.unwrap();

    let rows = store.query_range("ORCL", 1, 1).await.unwrap();
    assert_eq!(rows[0].price, Decimal::new(1234567, 4));
    assert_eq!(rows[0].high, Decimal::new(1244567, 4));
}
