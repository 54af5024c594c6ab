use anyhow::Result;
use async_trait::async_trait;
use tickflow_core::TimeSeriesEntry;

/// Queryable time series keyed by `(symbol, timestamp)`.
#[async_trait]
pub trait TimeSeriesStore: Send + Sync {
    /// Insert or overwrite the entry at its key. Repeating an identical write is a no-op.
    async fn upsert(&self, entry: &TimeSeriesEntry) -> Result<()>;

    /// Entries with `ts_start <= timestamp <= ts_end`, ascending by timestamp.
    async fn query_range(
        &self,
        symbol: &str,
        ts_start: i64,
        ts_end: i64,
    ) -> Result<Vec<TimeSeriesEntry>>;
}
