use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;

use super::{SequenceId, StreamBackend, StreamRecord};
use crate::time::now_secs;

/// Process-local stream with a single consumer cursor. Nothing survives a restart.
#[derive(Default)]
pub struct InMemoryStream {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    records: Vec<StreamRecord>,
    next_sequence: SequenceId,
    cursor: SequenceId,
}

impl InMemoryStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record ever appended, committed or not.
    pub fn snapshot(&self) -> Vec<StreamRecord> {
        self.inner.lock().records.clone()
    }

    pub fn cursor(&self) -> SequenceId {
        self.inner.lock().cursor
    }
}

#[async_trait]
impl StreamBackend for InMemoryStream {
    async fn put(&self, partition_key: &str, payload: &str) -> Result<SequenceId> {
        let mut g = self.inner.lock();
        g.next_sequence += 1;
        let sequence_id = g.next_sequence;
        g.records.push(StreamRecord {
            sequence_id,
            partition_key: partition_key.to_string(),
            payload: payload.to_string(),
            arrival_time: now_secs(),
        });
        Ok(sequence_id)
    }

    async fn consume(&self, max: usize) -> Result<Vec<StreamRecord>> {
        let g = self.inner.lock();
        Ok(g.records
            .iter()
            .filter(|r| r.sequence_id > g.cursor)
            .take(max)
            .cloned()
            .collect())
    }

    async fn commit(&self, sequence_id: SequenceId) -> Result<()> {
        let mut g = self.inner.lock();
        g.cursor = g.cursor.max(sequence_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn redelivers_until_committed() {
        let stream = InMemoryStream::new();
        stream.put("ORCL", "a").await.unwrap();
        stream.put("ORCL", "b").await.unwrap();

        let first = stream.consume(10).await.unwrap();
        let again = stream.consume(10).await.unwrap();
        assert_eq!(first, again);

        stream.commit(first[0].sequence_id).await.unwrap();
        let rest = stream.consume(10).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].payload, "b");
    }

    #[tokio::test]
    async fn commit_never_rewinds() {
        let stream = InMemoryStream::new();
        stream.put("ORCL", "a").await.unwrap();
        stream.put("ORCL", "b").await.unwrap();

        stream.commit(2).await.unwrap();
        stream.commit(1).await.unwrap();

        assert_eq!(stream.cursor(), 2);
        assert!(stream.consume(10).await.unwrap().is_empty());
    }
}
