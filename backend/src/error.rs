use thiserror::Error;

/// Quote acquisition failed; the poll tick is skipped.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("provider returned no intraday data for {symbol}")]
    NoData { symbol: String },

    #[error("latest sample for {symbol} is stale ({age_secs}s old)")]
    Stale { symbol: String, age_secs: i64 },

    #[error("provider error: {0}")]
    Provider(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("fetch timed out after {0} ms")]
    Timeout(u64),
}

/// The stream did not accept a record. Retry policy belongs to the caller.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("stream unavailable: {0}")]
    Unavailable(String),

    #[error("payload encode failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("publish timed out after {0} ms")]
    Timeout(u64),
}

/// A stream record could not be turned into a quote.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// One of the two per-record writes failed.
#[derive(Error, Debug)]
pub enum StorageWriteError {
    #[error("archive write to `{key}` failed: {reason}")]
    Archive { key: String, reason: String },

    #[error("time-series upsert for {symbol}@{timestamp} failed: {reason}")]
    TimeSeries {
        symbol: String,
        timestamp: i64,
        reason: String,
    },

    #[error("{target} write timed out after {timeout_ms} ms")]
    Timeout {
        target: &'static str,
        timeout_ms: u64,
    },
}

/// Failure of a single analysis cycle. Never fatal to the scheduler.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("time-series query failed: {0}")]
    Query(String),

    #[error("signal computation failed: {0}")]
    Compute(String),

    #[error("notification dispatch failed: {0}")]
    Notify(String),

    #[error("{stage} timed out after {timeout_ms} ms")]
    Timeout {
        stage: &'static str,
        timeout_ms: u64,
    },
}

/// A poll tick produced nothing on the stream.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("quote dropped after {attempts} attempt(s): {source}")]
    Publish {
        attempts: u32,
        #[source]
        source: PublishError,
    },
}
