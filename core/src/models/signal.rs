use std::fmt;

use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Buy,
    Sell,
    None,
}

impl SignalKind {
    pub fn is_actionable(self) -> bool {
        !matches!(self, SignalKind::None)
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalKind::Buy => "BUY",
            SignalKind::Sell => "SELL",
            SignalKind::None => "NONE",
        };
        f.write_str(s)
    }
}

/// Outcome of one analysis cycle. Lives only until the notifier has consumed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    pub kind: SignalKind,
    pub price: Decimal,
    pub sma_short: Decimal,
    pub sma_long: Decimal,
    /// `price[n-1] - price[n-3]`; absent when fewer than three points exist.
    pub price_trend: Option<Decimal>,
    /// Number of entries the signal was computed from.
    pub window_size: usize,
    /// Epoch seconds.
    pub evaluated_at: i64,
}
