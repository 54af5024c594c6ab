//! Ordered, partitioned event stream between ingestion and archiving.
//!
//! Delivery is at-least-once: a consumer sees every record after its committed
//! cursor, and sees records again if it fails before committing.

pub mod consumer;
pub mod memory;
pub mod publisher;
pub mod sqlx_log;

use anyhow::Result;
use async_trait::async_trait;

pub use consumer::StreamConsumer;
pub use memory::InMemoryStream;
pub use publisher::{Ack, StreamPublisher};
pub use sqlx_log::SqlxStreamLog;

pub type SequenceId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRecord {
    pub sequence_id: SequenceId,
    pub partition_key: String,
    pub payload: String,
    /// Epoch seconds the backend accepted the record.
    pub arrival_time: i64,
}

#[async_trait]
pub trait StreamBackend: Send + Sync {
    /// Appends a record to the partition named by `partition_key`.
    async fn put(&self, partition_key: &str, payload: &str) -> Result<SequenceId>;

    /// Up to `max` records after the committed cursor, ascending by sequence id.
    async fn consume(&self, max: usize) -> Result<Vec<StreamRecord>>;

    /// Moves the cursor forward to `sequence_id`. Never moves it backwards.
    async fn commit(&self, sequence_id: SequenceId) -> Result<()>;
}
