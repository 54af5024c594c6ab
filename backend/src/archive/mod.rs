//! Stream consumer side: raw archive plus time-series upsert.
//!
//! Every record gets two independent writes. A failure in one never skips the
//! other, and a failing record never stops the rest of its batch.

pub mod blob;

use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;
use thiserror::Error;
use tickflow_core::{QuotePayload, RawRecord, TimeSeriesEntry};
use tracing::{debug, error, instrument, warn};

pub use blob::{BlobStore, FsBlobStore, MemoryBlobStore};

use crate::error::{DecodeError, StorageWriteError};
use crate::metrics::counters::Counters;
use crate::stream::{SequenceId, StreamRecord};
use crate::time::now_secs;
use crate::timeseries::TimeSeriesStore;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Storage(#[from] StorageWriteError),
}

/// Everything that went wrong with one record.
#[derive(Debug)]
pub struct RecordFailure {
    pub sequence_id: SequenceId,
    pub errors: Vec<RecordError>,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub processed: usize,
    pub succeeded: usize,
    /// At most one entry per record.
    pub failures: Vec<RecordFailure>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_sequence_ids(&self) -> Vec<SequenceId> {
        self.failures.iter().map(|f| f.sequence_id).collect()
    }
}

/// Blob key for an archived record: arrival hour partition plus sequence id.
pub fn archive_key(symbol: &str, arrival_time: i64, sequence_id: SequenceId) -> String {
    let hour = DateTime::from_timestamp(arrival_time, 0)
        .map(|t| t.format("%Y/%m/%d/%H").to_string())
        .unwrap_or_else(|| "unknown-hour".to_string());

    format!("stock-data/{hour}/{symbol}_{sequence_id}.json")
}

/// Decodes a stream payload into its stored form, applying the default-fill rule.
pub fn decode_record(record: &StreamRecord) -> Result<TimeSeriesEntry, DecodeError> {
    let payload = QuotePayload::from_json(&record.payload)?;

    if payload.ticker.trim().is_empty() {
        return Err(DecodeError::InvalidField {
            field: "ticker",
            reason: "empty".into(),
        });
    }
    if payload.timestamp <= 0 {
        return Err(DecodeError::InvalidField {
            field: "timestamp",
            reason: format!("not a valid epoch second: {}", payload.timestamp),
        });
    }
    if payload.price <= rust_decimal::Decimal::ZERO {
        return Err(DecodeError::InvalidField {
            field: "price",
            reason: format!("must be positive, got {}", payload.price),
        });
    }

    Ok(payload.into_entry())
}

pub struct Archiver {
    blobs: Arc<dyn BlobStore>,
    store: Arc<dyn TimeSeriesStore>,
    io_timeout: Duration,
    counters: Counters,
}

impl Archiver {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        store: Arc<dyn TimeSeriesStore>,
        io_timeout: Duration,
        counters: Counters,
    ) -> Self {
        Self {
            blobs,
            store,
            io_timeout,
            counters,
        }
    }

    /// Processes records in order. Never fails as a whole; per-record problems
    /// come back in the report.
    #[instrument(skip(self, records), fields(records = records.len()), target = "archiver")]
    pub async fn process_batch(&self, records: &[StreamRecord]) -> BatchReport {
        let mut report = BatchReport::default();

        for record in records {
            report.processed += 1;

            let errors = self.process_record(record).await;
            if errors.is_empty() {
                report.succeeded += 1;
                Counters::incr(&self.counters.records_persisted);
                continue;
            }

            for e in &errors {
                error!(sequence_id = record.sequence_id, error = %e, "record failed");
            }
            Counters::incr(&self.counters.records_failed);
            report.failures.push(RecordFailure {
                sequence_id: record.sequence_id,
                errors,
            });
        }

        if !report.is_clean() {
            warn!(
                failed = report.failures.len(),
                processed = report.processed,
                "batch completed with partial failures"
            );
        }

        report
    }

    async fn process_record(&self, record: &StreamRecord) -> Vec<RecordError> {
        let entry = match decode_record(record) {
            Ok(e) => e,
            Err(e) => return vec![e.into()],
        };

        let key = archive_key(&entry.symbol, record.arrival_time, record.sequence_id);
        let raw = RawRecord {
            sequence_id: record.sequence_id,
            partition_key: record.partition_key.clone(),
            arrival_time: record.arrival_time,
            ingested_at: now_secs(),
            payload: record.payload.clone(),
        };

        let (archived, upserted) = tokio::join!(self.archive(&key, &raw), self.upsert(&entry));

        let errors: Vec<RecordError> = [archived.err(), upserted.err()]
            .into_iter()
            .flatten()
            .map(RecordError::from)
            .collect();

        if errors.is_empty() {
            debug!(sequence_id = record.sequence_id, key = %key, "record persisted");
        }
        errors
    }

    async fn archive(&self, key: &str, raw: &RawRecord) -> Result<(), StorageWriteError> {
        let bytes = serde_json::to_vec(raw).map_err(|e| StorageWriteError::Archive {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        match tokio::time::timeout(self.io_timeout, self.blobs.put(key, bytes)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(StorageWriteError::Archive {
                key: key.to_string(),
                reason: format!("{e:#}"),
            }),
            Err(_) => Err(StorageWriteError::Timeout {
                target: "archive",
                timeout_ms: self.io_timeout.as_millis() as u64,
            }),
        }
    }

    async fn upsert(&self, entry: &TimeSeriesEntry) -> Result<(), StorageWriteError> {
        match tokio::time::timeout(self.io_timeout, self.store.upsert(entry)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(StorageWriteError::TimeSeries {
                symbol: entry.symbol.clone(),
                timestamp: entry.timestamp,
                reason: format!("{e:#}"),
            }),
            Err(_) => Err(StorageWriteError::Timeout {
                target: "time-series",
                timeout_ms: self.io_timeout.as_millis() as u64,
            }),
        }
    }
}
