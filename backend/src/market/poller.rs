//! Quote poller
//!
//! One tick = fetch the latest quote for the tracked symbol and push it onto the
//! stream. Publishing is retried with exponential backoff; once the budget is
//! spent the quote is dropped and the next tick starts fresh.

use std::sync::Arc;
use std::time::Duration;

use tracing::{Instrument, error, info, instrument, warn};

use crate::error::{IngestError, PublishError};
use crate::logger::{TraceId, annotate_span, root_span};
use crate::market::fetcher::QuoteFetcher;
use crate::metrics::counters::Counters;
use crate::scheduler::{StopSignal, run_periodic};
use crate::stream::{Ack, StreamPublisher};

#[derive(Debug, Clone, Copy)]
pub struct PublishRetry {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl PublishRetry {
    /// Delay before retry number `n` (1-based): base, 2x base, 4x base, ...
    fn backoff(&self, n: u32) -> Duration {
        self.base_backoff
            .saturating_mul(1u32 << n.saturating_sub(1).min(16))
    }
}

pub struct QuotePoller {
    fetcher: QuoteFetcher,
    publisher: StreamPublisher,
    symbol: String,
    retry: PublishRetry,
    counters: Counters,
}

impl QuotePoller {
    pub fn new(
        fetcher: QuoteFetcher,
        publisher: StreamPublisher,
        symbol: String,
        retry: PublishRetry,
        counters: Counters,
    ) -> Self {
        Self {
            fetcher,
            publisher,
            symbol,
            retry,
            counters,
        }
    }

    #[instrument(skip(self), fields(symbol = %self.symbol), target = "poller")]
    pub async fn poll_once(&self) -> Result<Ack, IngestError> {
        let quote = match self.fetcher.fetch(&self.symbol).await {
            Ok(q) => q,
            Err(e) => {
                Counters::incr(&self.counters.fetch_failures);
                return Err(e.into());
            }
        };
        Counters::incr(&self.counters.quotes_fetched);

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.publisher.publish(&quote).await {
                Ok(ack) => {
                    Counters::incr(&self.counters.quotes_published);
                    annotate_span(&quote.symbol, Some(ack.sequence_id));
                    info!(
                        sequence_id = ack.sequence_id,
                        price = %quote.close,
                        ts = quote.timestamp,
                        "quote published"
                    );
                    return Ok(ack);
                }
                // Re-encoding the same quote will not succeed.
                Err(source @ PublishError::Encode(_)) => {
                    return Err(self.dropped(attempts, source));
                }
                Err(source) if attempts > self.retry.max_retries => {
                    return Err(self.dropped(attempts, source));
                }
                Err(e) => {
                    let delay = self.retry.backoff(attempts);
                    Counters::incr(&self.counters.publish_retries);
                    warn!(
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "publish failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn dropped(&self, attempts: u32, source: PublishError) -> IngestError {
        Counters::incr(&self.counters.quotes_dropped);
        IngestError::Publish { attempts, source }
    }

    pub async fn run(self, every: Duration, stop: StopSignal) {
        let this = Arc::new(self);
        run_periodic("quote_poller", every, stop, || {
            let this = Arc::clone(&this);
            async move {
                let span = root_span("poll_cycle", &TraceId::generate());
                if let Err(e) = this.poll_once().instrument(span).await {
                    error!(error = %e, "poll cycle produced no quote");
                }
            }
        })
        .await;
    }
}
