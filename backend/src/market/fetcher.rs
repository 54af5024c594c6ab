use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use tickflow_core::Quote;
use tracing::{debug, instrument};

use crate::error::FetchError;
use crate::market::provider::{MarketDataProvider, OhlcvSample};
use crate::time::now_secs;

/// Places kept when converting provider floats into decimals.
const PRICE_DP: u32 = 4;

/// Turns the provider's latest bar into a canonical [`Quote`].
#[derive(Clone)]
pub struct QuoteFetcher {
    provider: Arc<dyn MarketDataProvider>,
    timeout: Duration,
    max_sample_age_secs: Option<i64>,
}

impl QuoteFetcher {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        timeout: Duration,
        max_sample_age_secs: Option<i64>,
    ) -> Self {
        Self {
            provider,
            timeout,
            max_sample_age_secs,
        }
    }

    pub async fn fetch(&self, symbol: &str) -> Result<Quote, FetchError> {
        self.fetch_at(symbol, now_secs()).await
    }

    /// The quote is stamped with `now` (the poll tick), not the bar time.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_at(&self, symbol: &str, now: i64) -> Result<Quote, FetchError> {
        let sample = tokio::time::timeout(self.timeout, self.provider.get_latest_intraday(symbol))
            .await
            .map_err(|_| FetchError::Timeout(self.timeout.as_millis() as u64))??
            .ok_or_else(|| FetchError::NoData {
                symbol: symbol.to_string(),
            })?;

        if let Some(max_age) = self.max_sample_age_secs {
            let age_secs = now - sample.timestamp;
            if age_secs > max_age {
                return Err(FetchError::Stale {
                    symbol: symbol.to_string(),
                    age_secs,
                });
            }
        }

        let quote = normalize(symbol, now, &sample)?;
        debug!(close = %quote.close, bar_ts = sample.timestamp, "quote normalized");
        Ok(quote)
    }
}

fn normalize(symbol: &str, now: i64, sample: &OhlcvSample) -> Result<Quote, FetchError> {
    let close = to_decimal(sample.close)
        .filter(|c| *c > Decimal::ZERO)
        .ok_or_else(|| FetchError::Provider(format!("unusable close price {}", sample.close)))?;

    let or_close = |v: Option<f64>| v.and_then(to_decimal).unwrap_or(close);

    Ok(Quote {
        symbol: symbol.to_string(),
        timestamp: now,
        open: or_close(sample.open),
        high: or_close(sample.high),
        low: or_close(sample.low),
        close,
        volume: sample
            .volume
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v as i64)
            .unwrap_or(0),
    })
}

fn to_decimal(v: f64) -> Option<Decimal> {
    if !v.is_finite() {
        return None;
    }
    Decimal::from_f64(v).map(|d| d.round_dp(PRICE_DP))
}
