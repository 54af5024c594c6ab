use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow};
use tracing::{Instrument, error, info, instrument};

use super::StreamBackend;
use crate::archive::{Archiver, BatchReport};
use crate::logger::{TraceId, root_span};
use crate::metrics::counters::Counters;
use crate::scheduler::{StopSignal, run_periodic};

/// Pulls batches off the stream and hands them to the archiver.
///
/// The cursor is committed after every batch, failed records included: failures
/// are reported, not replayed, so one poison record cannot stall the partition.
/// If the commit itself fails the whole batch comes back on the next poll, which
/// the idempotent writes absorb.
pub struct StreamConsumer {
    stream: Arc<dyn StreamBackend>,
    archiver: Archiver,
    batch_size: usize,
    io_timeout: Duration,
    counters: Counters,
}

impl StreamConsumer {
    pub fn new(
        stream: Arc<dyn StreamBackend>,
        archiver: Archiver,
        batch_size: usize,
        io_timeout: Duration,
        counters: Counters,
    ) -> Self {
        Self {
            stream,
            archiver,
            batch_size: batch_size.max(1),
            io_timeout,
            counters,
        }
    }

    /// Consumes and processes at most one batch. `None` when the stream is drained.
    #[instrument(skip(self), target = "consumer")]
    pub async fn poll_once(&self) -> anyhow::Result<Option<BatchReport>> {
        let batch = tokio::time::timeout(self.io_timeout, self.stream.consume(self.batch_size))
            .await
            .map_err(|_| anyhow!("stream consume timed out"))?
            .context("stream consume failed")?;

        let Some(last) = batch.last().map(|r| r.sequence_id) else {
            return Ok(None);
        };

        let report = self.archiver.process_batch(&batch).await;
        Counters::incr(&self.counters.batches_consumed);

        tokio::time::timeout(self.io_timeout, self.stream.commit(last))
            .await
            .map_err(|_| anyhow!("cursor commit timed out"))?
            .with_context(|| format!("cursor commit at {last} failed"))?;

        info!(
            records = report.processed,
            succeeded = report.succeeded,
            failed = report.failures.len(),
            committed = last,
            "batch consumed"
        );

        Ok(Some(report))
    }

    /// Drains everything currently on the stream, batch by batch.
    pub async fn drain(&self) -> anyhow::Result<Vec<BatchReport>> {
        let mut reports = Vec::new();
        while let Some(report) = self.poll_once().await? {
            reports.push(report);
        }
        Ok(reports)
    }

    pub async fn run(self, every: Duration, stop: StopSignal) {
        let this = Arc::new(self);
        run_periodic("stream_consumer", every, stop, || {
            let this = Arc::clone(&this);
            async move {
                let span = root_span("consume_cycle", &TraceId::generate());
                if let Err(e) = this.drain().instrument(span).await {
                    error!(error = ?e, "consume cycle failed");
                }
            }
        })
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemoryBlobStore;
    use crate::stream::InMemoryStream;
    use crate::timeseries::TimeSeriesStore;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::BTreeMap;
    use tickflow_core::TimeSeriesEntry;

    #[derive(Default)]
    struct MapStore {
        rows: Mutex<BTreeMap<(String, i64), TimeSeriesEntry>>,
    }

    #[async_trait]
    impl TimeSeriesStore for MapStore {
        async fn upsert(&self, entry: &TimeSeriesEntry) -> anyhow::Result<()> {
            self.rows
                .lock()
                .insert((entry.symbol.clone(), entry.timestamp), entry.clone());
            Ok(())
        }

        async fn query_range(
            &self,
            _: &str,
            _: i64,
            _: i64,
        ) -> anyhow::Result<Vec<TimeSeriesEntry>> {
            Ok(self.rows.lock().values().cloned().collect())
        }
    }

    fn consumer(
        stream: Arc<InMemoryStream>,
        store: Arc<MapStore>,
        blobs: Arc<MemoryBlobStore>,
        batch_size: usize,
    ) -> StreamConsumer {
        let archiver = Archiver::new(blobs, store, Duration::from_secs(1), Counters::default());
        StreamConsumer::new(
            stream,
            archiver,
            batch_size,
            Duration::from_secs(1),
            Counters::default(),
        )
    }

    #[tokio::test]
    async fn poison_record_does_not_stall_the_cursor() {
        let stream = Arc::new(InMemoryStream::new());
        stream
            .put("ORCL", r#"{"ticker":"ORCL","timestamp":100,"price":10}"#)
            .await
            .unwrap();
        stream.put("ORCL", "{{garbage").await.unwrap();
        stream
            .put("ORCL", r#"{"ticker":"ORCL","timestamp":160,"price":11}"#)
            .await
            .unwrap();

        let store = Arc::new(MapStore::default());
        let c = consumer(stream.clone(), store.clone(), Arc::new(MemoryBlobStore::new()), 10);

        let report = c.poll_once().await.unwrap().unwrap();
        assert_eq!(report.processed, 3);
        assert_eq!(report.failed_sequence_ids(), vec![2]);
        assert_eq!(stream.cursor(), 3);
        assert_eq!(store.rows.lock().len(), 2);

        assert!(c.poll_once().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn drain_respects_batch_size() {
        let stream = Arc::new(InMemoryStream::new());
        for ts in 1..=5 {
            stream
                .put(
                    "ORCL",
                    &format!(r#"{{"ticker":"ORCL","timestamp":{ts},"price":10}}"#),
                )
                .await
                .unwrap();
        }

        let blobs = Arc::new(MemoryBlobStore::new());
        let c = consumer(stream, Arc::new(MapStore::default()), blobs.clone(), 2);

        let reports = c.drain().await.unwrap();
        let sizes: Vec<usize> = reports.iter().map(|r| r.processed).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(blobs.keys().len(), 5);
    }
}
