use serde::Deserialize;

use crate::market::provider::OhlcvSample;

#[derive(Debug, Deserialize)]
pub struct ChartEnvelope {
    pub chart: Chart,
}

#[derive(Debug, Deserialize)]
pub struct Chart {
    #[serde(default)]
    pub result: Option<Vec<ChartResult>>,
    #[serde(default)]
    pub error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
pub struct ChartError {
    pub code: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ChartResult {
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: Indicators,
}

#[derive(Debug, Deserialize)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<QuoteSeries>,
}

/// Column-oriented OHLCV arrays. Any cell may be null.
#[derive(Debug, Default, Deserialize)]
pub struct QuoteSeries {
    #[serde(default)]
    pub open: Vec<Option<f64>>,
    #[serde(default)]
    pub high: Vec<Option<f64>>,
    #[serde(default)]
    pub low: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<f64>>,
}

impl ChartResult {
    /// Last bar whose close is present.
    pub fn latest_sample(&self) -> Option<OhlcvSample> {
        fn cell(col: &[Option<f64>], i: usize) -> Option<f64> {
            col.get(i).copied().flatten()
        }

        let series = self.indicators.quote.first()?;

        (0..self.timestamp.len()).rev().find_map(|i| {
            let close = cell(&series.close, i)?;
            Some(OhlcvSample {
                timestamp: self.timestamp[i],
                open: cell(&series.open, i),
                high: cell(&series.high, i),
                low: cell(&series.low, i),
                close,
                volume: cell(&series.volume, i),
            })
        })
    }
}
