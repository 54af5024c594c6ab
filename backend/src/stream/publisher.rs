use std::sync::Arc;
use std::time::Duration;

use tickflow_core::Quote;
use tracing::{debug, instrument};

use super::{SequenceId, StreamBackend};
use crate::error::PublishError;

/// Acknowledgement of a record the stream has accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub sequence_id: SequenceId,
    pub partition_key: String,
}

/// Pushes quotes onto the stream, partitioned by symbol.
///
/// Exactly one attempt per call: retry or drop is the caller's decision.
#[derive(Clone)]
pub struct StreamPublisher {
    backend: Arc<dyn StreamBackend>,
    timeout: Duration,
}

impl StreamPublisher {
    pub fn new(backend: Arc<dyn StreamBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    #[instrument(skip(self, quote), fields(symbol = %quote.symbol, ts = quote.timestamp), level = "debug")]
    pub async fn publish(&self, quote: &Quote) -> Result<Ack, PublishError> {
        let payload = quote.to_payload().to_json()?;

        // Symbol as partition key keeps one symbol's quotes strictly ordered.
        let key = quote.symbol.as_str();

        let sequence_id = match tokio::time::timeout(self.timeout, self.backend.put(key, &payload))
            .await
        {
            Ok(Ok(seq)) => seq,
            Ok(Err(e)) => return Err(PublishError::Unavailable(format!("{e:#}"))),
            Err(_) => return Err(PublishError::Timeout(self.timeout.as_millis() as u64)),
        };

        debug!(sequence_id, "quote published");

        Ok(Ack {
            sequence_id,
            partition_key: key.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::InMemoryStream;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tickflow_core::QuotePayload;

    use crate::stream::StreamRecord;

    fn quote() -> Quote {
        Quote {
            symbol: "ORCL".into(),
            timestamp: 1_700_000_000,
            open: Decimal::new(100, 0),
            high: Decimal::new(101, 0),
            low: Decimal::new(99, 0),
            close: Decimal::new(10050, 2),
            volume: 10,
        }
    }

    struct DownStream {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl StreamBackend for DownStream {
        async fn put(&self, _: &str, _: &str) -> anyhow::Result<SequenceId> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(anyhow!("throttled"))
        }
        async fn consume(&self, _: usize) -> anyhow::Result<Vec<StreamRecord>> {
            Ok(vec![])
        }
        async fn commit(&self, _: SequenceId) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn publishes_keyed_by_symbol() {
        let stream = Arc::new(InMemoryStream::new());
        let publisher = StreamPublisher::new(stream.clone(), Duration::from_secs(1));

        let ack = publisher.publish(&quote()).await.unwrap();
        assert_eq!(ack.partition_key, "ORCL");

        let records = stream.snapshot();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sequence_id, ack.sequence_id);
        assert_eq!(records[0].partition_key, "ORCL");

        let payload = QuotePayload::from_json(&records[0].payload).unwrap();
        assert_eq!(payload.price, Decimal::new(10050, 2));
    }

    #[tokio::test]
    async fn backend_failure_is_reported_without_retry() {
        let backend = Arc::new(DownStream {
            calls: AtomicUsize::new(0),
        });
        let publisher = StreamPublisher::new(backend.clone(), Duration::from_secs(1));

        let err = publisher.publish(&quote()).await.unwrap_err();

        assert!(matches!(err, PublishError::Unavailable(_)));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }
}
