use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Audit envelope written to blob storage for every consumed stream record.
///
/// Write-once; the payload is kept byte-for-byte as it arrived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub sequence_id: u64,
    pub partition_key: String,
    /// Epoch seconds the stream accepted the record.
    pub arrival_time: i64,
    /// Epoch seconds the archiver handled the record.
    pub ingested_at: i64,
    pub payload: String,
}

/// Stored form of a quote, unique per `(symbol, timestamp)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSeriesEntry {
    pub symbol: String,
    pub timestamp: i64,
    pub price: Decimal,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,
}
