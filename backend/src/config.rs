use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};
use rust_decimal::Decimal;

use crate::analysis::trend::TrendParams;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Instrument tracked by every stage. Also the stream partition key.
    pub symbol: String,

    /// Database connection string (time series + durable stream log).
    pub database_url: String,

    // =========================
    // Ingestion
    // =========================
    /// Market-data provider base URL.
    pub provider_url: String,

    /// Fetcher cadence.
    pub poll_interval: Duration,

    /// Optional bound on the age of the provider's latest bar.
    /// `None` accepts whatever the provider reports as latest.
    pub max_sample_age_secs: Option<i64>,

    /// Name of the stream inside the durable log.
    pub stream_name: String,

    /// Caller-side publish retry policy. The publisher itself never retries.
    pub publish_max_retries: u32,
    pub publish_backoff: Duration,

    // =========================
    // Consumer / archiver
    // =========================
    pub consumer_group: String,
    pub consumer_batch_size: usize,
    pub consumer_poll_interval: Duration,

    /// Raw-bucket identifier. Used as the root directory of the blob store.
    pub raw_data_bucket: String,

    // =========================
    // Analyzer
    // =========================
    pub analysis_interval: Duration,
    pub trend: TrendParams,

    /// Notification topic identifier.
    pub notification_topic: String,

    /// When set, notifications are POSTed here. Otherwise they are only logged.
    pub notify_webhook_url: Option<String>,

    /// Upper bound on every external call (fetch, publish, write, query, notify).
    pub io_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Missing keys take defaults;
    /// present but unparsable values are errors.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let trend = TrendParams {
            window_hours: parse_or(&get, "ANALYSIS_WINDOW_HOURS", 2)?,
            sma_short: parse_or(&get, "SMA_SHORT", 5)?,
            sma_long: parse_or(&get, "SMA_LONG", 20)?,
            sma_long_min_points: parse_or(&get, "SMA_LONG_MIN_POINTS", 10)?,
            min_data_points: parse_or(&get, "MIN_DATA_POINTS", 5)?,
            significant_move: parse_or(&get, "SIGNIFICANT_MOVE", Decimal::ONE)?,
            sma_tolerance: parse_or(&get, "SMA_EQUALITY_TOLERANCE", Decimal::new(1, 2))?,
        };
        trend.validate()?;

        let cfg = Self {
            symbol: get("TRACKED_SYMBOL").unwrap_or_else(|| "ORCL".to_string()),
            database_url: get("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://tickflow.db?mode=rwc".to_string()),

            provider_url: get("PROVIDER_URL")
                .unwrap_or_else(|| "https://query1.finance.yahoo.com".to_string()),
            poll_interval: Duration::from_secs(parse_or(&get, "POLL_INTERVAL_SECS", 60)?),
            max_sample_age_secs: parse_opt(&get, "MAX_SAMPLE_AGE_SECS")?,
            stream_name: get("STREAM_NAME").unwrap_or_else(|| "stock-data-stream".to_string()),
            publish_max_retries: parse_or(&get, "PUBLISH_MAX_RETRIES", 3)?,
            publish_backoff: Duration::from_millis(parse_or(&get, "PUBLISH_BACKOFF_MS", 200)?),

            consumer_group: get("CONSUMER_GROUP").unwrap_or_else(|| "archiver".to_string()),
            consumer_batch_size: parse_or(&get, "CONSUMER_BATCH_SIZE", 100)?,
            consumer_poll_interval: Duration::from_millis(parse_or(
                &get,
                "CONSUMER_POLL_INTERVAL_MS",
                1_000,
            )?),
            raw_data_bucket: get("RAW_DATA_BUCKET")
                .unwrap_or_else(|| "stock-analytics-raw-data".to_string()),

            analysis_interval: Duration::from_secs(parse_or(
                &get,
                "ANALYSIS_INTERVAL_SECS",
                3_600,
            )?),
            trend,
            notification_topic: get("NOTIFICATION_TOPIC")
                .unwrap_or_else(|| "stock-alerts".to_string()),
            notify_webhook_url: get("NOTIFY_WEBHOOK_URL"),

            io_timeout: Duration::from_millis(parse_or(&get, "IO_TIMEOUT_MS", 5_000)?),
        };

        if cfg.poll_interval.is_zero()
            || cfg.analysis_interval.is_zero()
            || cfg.consumer_poll_interval.is_zero()
        {
            bail!(
                "POLL_INTERVAL_SECS, ANALYSIS_INTERVAL_SECS and CONSUMER_POLL_INTERVAL_MS must be greater than zero"
            );
        }
        if cfg.consumer_batch_size == 0 {
            bail!("CONSUMER_BATCH_SIZE must be greater than zero");
        }

        Ok(cfg)
    }
}

fn parse_or<G, T>(get: &G, key: &str, default: T) -> anyhow::Result<T>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    Ok(parse_opt(get, key)?.unwrap_or(default))
}

fn parse_opt<G, T>(get: &G, key: &str) -> anyhow::Result<Option<T>>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    get(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("invalid value for {key}: {raw:?}"))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_reference_behaviour() {
        let cfg = AppConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(cfg.symbol, "ORCL");
        assert_eq!(cfg.poll_interval, Duration::from_secs(60));
        assert_eq!(cfg.trend.window_hours, 2);
        assert_eq!(cfg.trend.sma_short, 5);
        assert_eq!(cfg.trend.sma_long, 20);
        assert_eq!(cfg.trend.sma_long_min_points, 10);
        assert_eq!(cfg.trend.min_data_points, 5);
        assert_eq!(cfg.trend.significant_move, Decimal::ONE);
        assert_eq!(cfg.trend.sma_tolerance, Decimal::new(1, 2));
        assert_eq!(cfg.raw_data_bucket, "stock-analytics-raw-data");
        assert!(cfg.max_sample_age_secs.is_none());
        assert!(cfg.notify_webhook_url.is_none());
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("TRACKED_SYMBOL", "MSFT"),
            ("SMA_SHORT", "3"),
            ("SIGNIFICANT_MOVE", "2.5"),
            ("MAX_SAMPLE_AGE_SECS", "900"),
            ("NOTIFY_WEBHOOK_URL", "http://localhost:9000/hook"),
        ]))
        .unwrap();

        assert_eq!(cfg.symbol, "MSFT");
        assert_eq!(cfg.trend.sma_short, 3);
        assert_eq!(cfg.trend.significant_move, Decimal::new(25, 1));
        assert_eq!(cfg.max_sample_age_secs, Some(900));
        assert_eq!(
            cfg.notify_webhook_url.as_deref(),
            Some("http://localhost:9000/hook")
        );
    }

    #[test]
    fn unparsable_value_is_an_error() {
        let err = AppConfig::from_lookup(lookup(&[("POLL_INTERVAL_SECS", "soon")])).unwrap_err();
        assert!(err.to_string().contains("POLL_INTERVAL_SECS"));
    }

    #[test]
    fn zero_consumer_poll_interval_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("CONSUMER_POLL_INTERVAL_MS", "0")])).unwrap_err();
        assert!(err.to_string().contains("CONSUMER_POLL_INTERVAL_MS"));
    }

    #[test]
    fn oversized_analysis_window_is_rejected() {
        let huge = (i64::MAX / 1_000).to_string();
        assert!(AppConfig::from_lookup(lookup(&[("ANALYSIS_WINDOW_HOURS", &huge)])).is_err());
    }

    #[test]
    fn exact_sma_comparison_is_configurable() {
        let cfg = AppConfig::from_lookup(lookup(&[("SMA_EQUALITY_TOLERANCE", "0")])).unwrap();
        assert_eq!(cfg.trend.sma_tolerance, Decimal::ZERO);
    }

    #[test]
    fn zero_sma_period_is_rejected() {
        assert!(AppConfig::from_lookup(lookup(&[("SMA_LONG", "0")])).is_err());
    }
}
