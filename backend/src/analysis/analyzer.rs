use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tickflow_core::Signal;
use tracing::{Instrument, error, info, instrument, warn};

use super::trend::{Analysis, TrendParams, evaluate};
use crate::error::AnalysisError;
use crate::logger::{TraceId, annotate_span, root_span, warn_if_slow};
use crate::metrics::counters::Counters;
use crate::notify::{Notification, Notifier, messages};
use crate::scheduler::{StopSignal, run_periodic};
use crate::time::now_secs;
use crate::timeseries::TimeSeriesStore;

/// What a successful cycle told the subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Heartbeat { data_points: usize },
    /// Evaluated window; `kind` may be NONE (routine status).
    Signal(Signal),
}

/// Periodic trend evaluation over the trailing window of the time series.
///
/// Every cycle notifies exactly once: heartbeat, signal alert, status update, or
/// error alert when anything in the cycle fails.
pub struct TrendAnalyzer {
    store: Arc<dyn TimeSeriesStore>,
    notifier: Arc<dyn Notifier>,
    symbol: String,
    topic: String,
    params: TrendParams,
    io_timeout: Duration,
    counters: Counters,
}

impl TrendAnalyzer {
    pub fn new(
        store: Arc<dyn TimeSeriesStore>,
        notifier: Arc<dyn Notifier>,
        symbol: String,
        topic: String,
        params: TrendParams,
        io_timeout: Duration,
        counters: Counters,
    ) -> Self {
        Self {
            store,
            notifier,
            symbol,
            topic,
            params,
            io_timeout,
            counters,
        }
    }

    #[instrument(skip(self), fields(symbol = %self.symbol), target = "analyzer")]
    pub async fn run_cycle(&self, now: i64) -> Result<CycleOutcome, AnalysisError> {
        Counters::incr(&self.counters.analysis_cycles);

        match self.evaluate_and_notify(now).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                Counters::incr(&self.counters.analysis_failures);
                error!(error = %e, "analysis cycle failed");

                let alert = messages::pipeline_error(&self.symbol, &e.to_string(), now);
                if let Err(notify_err) = self.notify(&alert).await {
                    // Nothing left to tell; the log is the last resort.
                    error!(error = %notify_err, "error alert could not be delivered");
                }
                Err(e)
            }
        }
    }

    async fn evaluate_and_notify(&self, now: i64) -> Result<CycleOutcome, AnalysisError> {
        let prices = self.window_prices(now).await?;
        annotate_span(&self.symbol, None);

        match evaluate(&prices, &self.params, now)? {
            Analysis::Insufficient { data_points } => {
                info!(data_points, "window too thin for a decision, sending heartbeat");
                self.notify(&messages::heartbeat(&self.symbol, data_points, now))
                    .await?;
                Ok(CycleOutcome::Heartbeat { data_points })
            }
            Analysis::Evaluated(signal) => {
                info!(
                    signal = %signal.kind,
                    price = %signal.price,
                    sma_short = %signal.sma_short,
                    sma_long = %signal.sma_long,
                    data_points = signal.window_size,
                    "window evaluated"
                );

                let notification = if signal.kind.is_actionable() {
                    Counters::incr(&self.counters.signals_emitted);
                    messages::signal_alert(&self.symbol, &signal)
                } else {
                    messages::status_update(&self.symbol, &signal)
                };
                self.notify(&notification).await?;

                Ok(CycleOutcome::Signal(signal))
            }
        }
    }

    async fn window_prices(&self, now: i64) -> Result<Vec<Decimal>, AnalysisError> {
        let start = now.saturating_sub(self.params.window_secs());

        let query = tokio::time::timeout(
            self.io_timeout,
            self.store.query_range(&self.symbol, start, now),
        );
        let entries = warn_if_slow("timeseries_query", self.io_timeout / 2, query)
            .await
            .map_err(|_| AnalysisError::Timeout {
                stage: "time-series query",
                timeout_ms: self.io_timeout.as_millis() as u64,
            })?
            .map_err(|e| AnalysisError::Query(format!("{e:#}")))?;

        Ok(entries.into_iter().map(|e| e.price).collect())
    }

    async fn notify(&self, notification: &Notification) -> Result<(), AnalysisError> {
        tokio::time::timeout(
            self.io_timeout,
            self.notifier.publish(&self.topic, notification),
        )
        .await
        .map_err(|_| AnalysisError::Timeout {
            stage: "notification",
            timeout_ms: self.io_timeout.as_millis() as u64,
        })?
        .map_err(|e| AnalysisError::Notify(format!("{e:#}")))
    }

    pub async fn run(self, every: Duration, stop: StopSignal) {
        let this = Arc::new(self);
        run_periodic("trend_analyzer", every, stop, || {
            let this = Arc::clone(&this);
            async move {
                let span = root_span("analysis_cycle", &TraceId::generate());
                if let Err(e) = this.run_cycle(now_secs()).instrument(span).await {
                    warn!(error = %e, "analysis cycle ended with failure");
                }
            }
        })
        .await;
    }
}
