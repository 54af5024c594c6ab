use anyhow::{Context, anyhow};
use async_trait::async_trait;
use sqlx::{AnyPool, Row};

use super::{SequenceId, StreamBackend, StreamRecord};
use crate::time::now_secs;

/// Durable append-only stream stored in the `stream_records` table.
///
/// Each consumer group keeps its own cursor in `stream_cursors`, so a restarted
/// consumer resumes right after its last committed batch.
#[derive(Clone)]
pub struct SqlxStreamLog {
    pool: AnyPool,
    stream: String,
    consumer_group: String,
}

impl SqlxStreamLog {
    pub fn new(pool: AnyPool, stream: impl Into<String>, consumer_group: impl Into<String>) -> Self {
        Self {
            pool,
            stream: stream.into(),
            consumer_group: consumer_group.into(),
        }
    }
}

#[async_trait]
impl StreamBackend for SqlxStreamLog {
    async fn put(&self, partition_key: &str, payload: &str) -> anyhow::Result<SequenceId> {
        let row = sqlx::query(
            r#"
INSERT INTO stream_records (stream, partition_key, payload, arrival_ts)
VALUES (?, ?, ?, ?)
RETURNING sequence_id;
"#,
        )
        .bind(self.stream.clone())
        .bind(partition_key.to_string())
        .bind(payload.to_string())
        .bind(now_secs())
        .fetch_one(&self.pool)
        .await
        .context("append to stream log")?;

        i64_to_seq(row.try_get("sequence_id")?)
    }

    async fn consume(&self, max: usize) -> anyhow::Result<Vec<StreamRecord>> {
        let rows = sqlx::query(
            r#"
SELECT sequence_id, partition_key, payload, arrival_ts
FROM stream_records
WHERE stream = ?
  AND sequence_id > COALESCE(
    (SELECT last_sequence_id FROM stream_cursors WHERE stream = ? AND consumer_group = ?),
    0
  )
ORDER BY sequence_id ASC
LIMIT ?;
"#,
        )
        .bind(self.stream.clone())
        .bind(self.stream.clone())
        .bind(self.consumer_group.clone())
        .bind(i64::try_from(max).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .context("read stream log")?;

        rows.iter()
            .map(|r| -> anyhow::Result<StreamRecord> {
                Ok(StreamRecord {
                    sequence_id: i64_to_seq(r.try_get("sequence_id")?)?,
                    partition_key: r.try_get("partition_key")?,
                    payload: r.try_get("payload")?,
                    arrival_time: r.try_get("arrival_ts")?,
                })
            })
            .collect()
    }

    async fn commit(&self, sequence_id: SequenceId) -> anyhow::Result<()> {
        let seq = i64::try_from(sequence_id)
            .map_err(|_| anyhow!("sequence id too large for i64: {sequence_id}"))?;

        sqlx::query(
            r#"
INSERT INTO stream_cursors (stream, consumer_group, last_sequence_id)
VALUES (?, ?, ?)
ON CONFLICT (stream, consumer_group) DO UPDATE SET
  last_sequence_id = MAX(last_sequence_id, excluded.last_sequence_id);
"#,
        )
        .bind(self.stream.clone())
        .bind(self.consumer_group.clone())
        .bind(seq)
        .execute(&self.pool)
        .await
        .context("commit stream cursor")?;

        Ok(())
    }
}

fn i64_to_seq(v: i64) -> anyhow::Result<SequenceId> {
    if v < 0 {
        return Err(anyhow!("negative sequence id: {v}"));
    }
    Ok(v as SequenceId)
}
