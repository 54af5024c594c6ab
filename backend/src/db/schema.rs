use sqlx::AnyPool;

pub async fn migrate(pool: &AnyPool) -> anyhow::Result<()> {
    // Time series. Decimals are kept as exact text.
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS quotes (
  symbol TEXT NOT NULL,
  ts BIGINT NOT NULL,
  price TEXT NOT NULL,
  open TEXT NOT NULL,
  high TEXT NOT NULL,
  low TEXT NOT NULL,
  close TEXT NOT NULL,
  volume BIGINT NOT NULL,
  PRIMARY KEY (symbol, ts)
);
"#,
    )
    .execute(pool)
    .await?;

    // Durable stream log. The rowid is the sequence id.
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS stream_records (
  sequence_id INTEGER PRIMARY KEY AUTOINCREMENT,
  stream TEXT NOT NULL,
  partition_key TEXT NOT NULL,
  payload TEXT NOT NULL,
  arrival_ts BIGINT NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    // Consumer-group cursors
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS stream_cursors (
  stream TEXT NOT NULL,
  consumer_group TEXT NOT NULL,
  last_sequence_id BIGINT NOT NULL,
  PRIMARY KEY (stream, consumer_group)
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE INDEX IF NOT EXISTS idx_stream_records_stream ON stream_records(stream, sequence_id);"#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
