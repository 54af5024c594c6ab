use std::str::FromStr;

use anyhow::Context;
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{AnyPool, Row};
use tickflow_core::TimeSeriesEntry;

use crate::timeseries::repository::TimeSeriesStore;

/// SQLx-backed time series.
/// Responsible only for persistence and row mapping.
#[derive(Clone)]
pub struct SqlxTimeSeriesStore {
    pool: AnyPool,
}

impl SqlxTimeSeriesStore {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TimeSeriesStore for SqlxTimeSeriesStore {
    async fn upsert(&self, entry: &TimeSeriesEntry) -> anyhow::Result<()> {
        sqlx::query(
            r#"
INSERT INTO quotes (symbol, ts, price, open, high, low, close, volume)
VALUES (?, ?, ?, ?, ?, ?, ?, ?)
ON CONFLICT (symbol, ts) DO UPDATE SET
  price = excluded.price,
  open = excluded.open,
  high = excluded.high,
  low = excluded.low,
  close = excluded.close,
  volume = excluded.volume;
"#,
        )
        .bind(entry.symbol.clone())
        .bind(entry.timestamp)
        .bind(entry.price.to_string())
        .bind(entry.open.to_string())
        .bind(entry.high.to_string())
        .bind(entry.low.to_string())
        .bind(entry.close.to_string())
        .bind(entry.volume)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn query_range(
        &self,
        symbol: &str,
        ts_start: i64,
        ts_end: i64,
    ) -> anyhow::Result<Vec<TimeSeriesEntry>> {
        let rows = sqlx::query(
            r#"
SELECT symbol, ts, price, open, high, low, close, volume
FROM quotes
WHERE symbol = ? AND ts BETWEEN ? AND ?
ORDER BY ts ASC;
"#,
        )
        .bind(symbol.to_string())
        .bind(ts_start)
        .bind(ts_end)
        .fetch_all(&self.pool)
        .await?;

        // Unmappable rows fail the whole query instead of shortening the window.
        rows.iter().map(row_to_entry).collect()
    }
}

/* =========================
Row mapping
========================= */

fn row_to_entry(r: &sqlx::any::AnyRow) -> anyhow::Result<TimeSeriesEntry> {
    let symbol: String = r.try_get("symbol")?;
    let timestamp: i64 = r.try_get("ts")?;

    Ok(TimeSeriesEntry {
        price: decimal_col(r, "price")?,
        open: decimal_col(r, "open")?,
        high: decimal_col(r, "high")?,
        low: decimal_col(r, "low")?,
        close: decimal_col(r, "close")?,
        volume: r.try_get("volume")?,
        symbol,
        timestamp,
    })
}

fn decimal_col(r: &sqlx::any::AnyRow, col: &str) -> anyhow::Result<Decimal> {
    let raw: String = r.try_get(col)?;
    Decimal::from_str(&raw).with_context(|| format!("invalid decimal in column {col}: {raw:?}"))
}
