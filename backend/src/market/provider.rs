use async_trait::async_trait;

use crate::error::FetchError;

/// One intraday bar exactly as the provider reported it.
#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvSample {
    /// Bar start, epoch seconds.
    pub timestamp: i64,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub volume: Option<f64>,
}

/// Source of intraday bars.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Latest bar with a close price, or `None` when the provider has nothing.
    async fn get_latest_intraday(&self, symbol: &str) -> Result<Option<OhlcvSample>, FetchError>;
}
