//! Single-shot entry points for externally triggered runs.
//!
//! Each handler performs one unit of work and folds the outcome into an
//! [`InvocationResult`]. Nothing escapes as an error: a failed run is a 500.

use tracing::{Instrument, error};

use crate::analysis::{CycleOutcome, TrendAnalyzer};
use crate::logger::{TraceId, root_span};
use crate::market::QuotePoller;
use crate::stream::StreamConsumer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    pub status_code: u16,
    pub body: String,
}

impl InvocationResult {
    pub fn success(body: impl Into<String>) -> Self {
        Self {
            status_code: 200,
            body: body.into(),
        }
    }

    pub fn failure(body: impl Into<String>) -> Self {
        Self {
            status_code: 500,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}

/// Fetches and publishes one quote.
pub async fn ingest(poller: &QuotePoller) -> InvocationResult {
    let span = root_span("ingest", &TraceId::generate());
    match poller.poll_once().instrument(span).await {
        Ok(ack) => InvocationResult::success(format!(
            "Data sent successfully (sequence {})",
            ack.sequence_id
        )),
        Err(e) => {
            error!(error = %e, "ingest invocation failed");
            InvocationResult::failure(format!("Error: {e}"))
        }
    }
}

/// Drains the stream. Per-record failures are reported in the body; only a
/// failure of the stream itself makes the run fail.
pub async fn process(consumer: &StreamConsumer) -> InvocationResult {
    let span = root_span("process", &TraceId::generate());
    match consumer.drain().instrument(span).await {
        Ok(reports) => {
            let processed: usize = reports.iter().map(|r| r.processed).sum();
            let failed: Vec<u64> = reports
                .iter()
                .flat_map(|r| r.failed_sequence_ids())
                .collect();

            if failed.is_empty() {
                InvocationResult::success(format!(
                    "Data processed successfully ({processed} records)"
                ))
            } else {
                InvocationResult::success(format!(
                    "Data processed with {} failed record(s) of {processed}: {failed:?}",
                    failed.len()
                ))
            }
        }
        Err(e) => {
            error!(error = ?e, "process invocation failed");
            InvocationResult::failure(format!("Error: {e:#}"))
        }
    }
}

/// Runs one analysis cycle at `now`.
pub async fn analyze(analyzer: &TrendAnalyzer, now: i64) -> InvocationResult {
    let span = root_span("analyze", &TraceId::generate());
    match analyzer.run_cycle(now).instrument(span).await {
        Ok(CycleOutcome::Heartbeat { .. }) => InvocationResult::success("Test alert sent"),
        Ok(CycleOutcome::Signal(signal)) if signal.kind.is_actionable() => {
            InvocationResult::success(format!("{} signal sent", signal.kind))
        }
        Ok(CycleOutcome::Signal(_)) => InvocationResult::success("Update sent"),
        Err(e) => InvocationResult::failure(format!("Error: {e}")),
    }
}
