use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::record::TimeSeriesEntry;

/// Canonical OHLCV sample for one poll tick.
///
/// Created by the fetcher and never mutated afterwards. `close` is the quote's
/// price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    /// Epoch seconds.
    pub timestamp: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,
}

impl Quote {
    pub fn price(&self) -> Decimal {
        self.close
    }

    pub fn to_payload(&self) -> QuotePayload {
        QuotePayload {
            ticker: self.symbol.clone(),
            timestamp: self.timestamp,
            price: self.close,
            close: Some(self.close),
            open: Some(self.open),
            high: Some(self.high),
            low: Some(self.low),
            volume: Some(self.volume),
        }
    }
}

/// Stream wire form of a [`Quote`].
///
/// `ticker`, `timestamp` and `price` are mandatory. Everything else is optional
/// so that older or thinner producers still decode; see [`QuotePayload::into_entry`]
/// for how gaps are filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotePayload {
    pub ticker: String,
    pub timestamp: i64,
    pub price: Decimal,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<i64>,
}

impl QuotePayload {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Lenient default-fill rule: a missing close/open/high/low takes `price`,
    /// a missing volume is 0. Absence is never an error.
    pub fn into_entry(self) -> TimeSeriesEntry {
        let price = self.price;
        TimeSeriesEntry {
            symbol: self.ticker,
            timestamp: self.timestamp,
            price,
            close: self.close.unwrap_or(price),
            open: self.open.unwrap_or(price),
            high: self.high.unwrap_or(price),
            low: self.low.unwrap_or(price),
            volume: self.volume.unwrap_or(0),
        }
    }
}
