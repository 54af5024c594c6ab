use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use crate::error::FetchError;
use crate::market::provider::{MarketDataProvider, OhlcvSample};
use crate::market::yahoo::types::ChartEnvelope;

/// Intraday chart client (1 day of 1 minute bars).
#[derive(Clone)]
pub struct YahooChartClient {
    http: Client,
    url: String,
}

impl YahooChartClient {
    pub fn new(url: String, timeout: Duration) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(30))
            .user_agent("tickflow/0.1")
            .build()?;

        Ok(Self { http, url })
    }
}

#[async_trait]
impl MarketDataProvider for YahooChartClient {
    #[instrument(skip(self), fields(symbol = %symbol), level = "debug")]
    async fn get_latest_intraday(&self, symbol: &str) -> Result<Option<OhlcvSample>, FetchError> {
        let url = format!(
            "{}/v8/finance/chart/{}",
            self.url.trim_end_matches('/'),
            symbol
        );

        let resp = self
            .http
            .get(&url)
            .query(&[("range", "1d"), ("interval", "1m")])
            .send()
            .await?
            .error_for_status()?;

        let envelope: ChartEnvelope = resp.json().await?;

        if let Some(err) = envelope.chart.error {
            return Err(FetchError::Provider(format!(
                "{}: {}",
                err.code, err.description
            )));
        }

        let sample = envelope
            .chart
            .result
            .unwrap_or_default()
            .first()
            .and_then(|r| r.latest_sample());

        debug!(found = sample.is_some(), "intraday chart fetched");

        Ok(sample)
    }
}
