//! Wiring: turns an [`AppConfig`] into the three pipeline stages.

use std::sync::Arc;

use anyhow::Context;
use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::info;

use crate::analysis::TrendAnalyzer;
use crate::archive::{Archiver, FsBlobStore};
use crate::config::AppConfig;
use crate::db::Db;
use crate::market::yahoo::YahooChartClient;
use crate::market::{MarketDataProvider, PublishRetry, QuoteFetcher, QuotePoller};
use crate::metrics::counters::Counters;
use crate::notify::{LogNotifier, Notifier, WebhookNotifier};
use crate::scheduler::StopHandle;
use crate::stream::{SqlxStreamLog, StreamBackend, StreamConsumer, StreamPublisher};
use crate::timeseries::{SqlxTimeSeriesStore, TimeSeriesStore};

pub struct App {
    pub config: AppConfig,
    pub poller: QuotePoller,
    pub consumer: StreamConsumer,
    pub analyzer: TrendAnalyzer,
    pub counters: Counters,
}

impl App {
    /// Connects and migrates the database, then builds every stage with its
    /// collaborators.
    pub async fn build(config: AppConfig) -> anyhow::Result<Self> {
        let db = Db::connect(&config.database_url)
            .await
            .with_context(|| format!("connecting to {}", config.database_url))?;
        db.migrate().await.context("running migrations")?;

        let stream: Arc<dyn StreamBackend> = Arc::new(SqlxStreamLog::new(
            db.pool.clone(),
            config.stream_name.clone(),
            config.consumer_group.clone(),
        ));
        let store: Arc<dyn TimeSeriesStore> = Arc::new(SqlxTimeSeriesStore::new(db.pool.clone()));

        let notifier: Arc<dyn Notifier> = match &config.notify_webhook_url {
            Some(url) => Arc::new(WebhookNotifier::new(url.clone(), config.io_timeout)?),
            None => Arc::new(LogNotifier),
        };

        let provider = YahooChartClient::new(config.provider_url.clone(), config.io_timeout)
            .context("building market-data client")?;

        Ok(Self::assemble(config, stream, store, notifier, Arc::new(provider)))
    }

    /// Builds the stages from ready collaborators.
    pub fn assemble(
        config: AppConfig,
        stream: Arc<dyn StreamBackend>,
        store: Arc<dyn TimeSeriesStore>,
        notifier: Arc<dyn Notifier>,
        provider: Arc<dyn MarketDataProvider>,
    ) -> Self {
        let counters = Counters::default();

        let fetcher = QuoteFetcher::new(provider, config.io_timeout, config.max_sample_age_secs);
        let publisher = StreamPublisher::new(Arc::clone(&stream), config.io_timeout);
        let poller = QuotePoller::new(
            fetcher,
            publisher,
            config.symbol.clone(),
            PublishRetry {
                max_retries: config.publish_max_retries,
                base_backoff: config.publish_backoff,
            },
            counters.clone(),
        );

        let blobs = Arc::new(FsBlobStore::new(&config.raw_data_bucket));
        let archiver = Archiver::new(
            blobs,
            Arc::clone(&store),
            config.io_timeout,
            counters.clone(),
        );
        let consumer = StreamConsumer::new(
            stream,
            archiver,
            config.consumer_batch_size,
            config.io_timeout,
            counters.clone(),
        );

        let analyzer = TrendAnalyzer::new(
            store,
            notifier,
            config.symbol.clone(),
            config.notification_topic.clone(),
            config.trend.clone(),
            config.io_timeout,
            counters.clone(),
        );

        Self {
            config,
            poller,
            consumer,
            analyzer,
            counters,
        }
    }

    /// Starts the poller, consumer and analyzer loops. They run until `stop` fires.
    pub fn spawn(self, stop: &StopHandle) -> Vec<JoinHandle<()>> {
        let cfg = &self.config;
        info!(
            symbol = %cfg.symbol,
            poll_every_s = cfg.poll_interval.as_secs(),
            analyze_every_s = cfg.analysis_interval.as_secs(),
            "starting pipeline loops"
        );

        vec![
            tokio::spawn(self.poller.run(cfg.poll_interval, stop.subscribe())),
            tokio::spawn(
                self.consumer
                    .run(cfg.consumer_poll_interval, stop.subscribe()),
            ),
            tokio::spawn(self.analyzer.run(cfg.analysis_interval, stop.subscribe())),
        ]
    }
}

/// Waits for every loop to return, logging tasks that panicked.
pub async fn join_loops(handles: Vec<JoinHandle<()>>) {
    for res in join_all(handles).await {
        if let Err(e) = res {
            tracing::error!(error = ?e, "pipeline loop aborted");
        }
    }
}

/// Final counter values, logged once on shutdown.
pub fn log_counters(c: &Counters) {
    info!(
        quotes_fetched = Counters::get(&c.quotes_fetched),
        fetch_failures = Counters::get(&c.fetch_failures),
        quotes_published = Counters::get(&c.quotes_published),
        publish_retries = Counters::get(&c.publish_retries),
        quotes_dropped = Counters::get(&c.quotes_dropped),
        batches_consumed = Counters::get(&c.batches_consumed),
        records_persisted = Counters::get(&c.records_persisted),
        records_failed = Counters::get(&c.records_failed),
        analysis_cycles = Counters::get(&c.analysis_cycles),
        analysis_failures = Counters::get(&c.analysis_failures),
        signals_emitted = Counters::get(&c.signals_emitted),
        "pipeline counters"
    );
}
