//! Moving-average trend rule.
//!
//! Pure functions over a snapshot of prices in ascending timestamp order. Nothing
//! here keeps state between calls, so a signal depends only on the window it was
//! given.

use anyhow::bail;
use rust_decimal::Decimal;
use tickflow_core::{Signal, SignalKind};

use crate::error::AnalysisError;

/// Tunables of the trend rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrendParams {
    /// Trailing query window.
    pub window_hours: i64,
    /// Short SMA period.
    pub sma_short: usize,
    /// Long SMA period.
    pub sma_long: usize,
    /// Below this many points the long SMA is the mean of the whole window.
    pub sma_long_min_points: usize,
    /// Below this many points the cycle is a heartbeat, not a decision.
    pub min_data_points: usize,
    /// `|price_trend|` above this forces a BUY/SELL on its own.
    pub significant_move: Decimal,
    /// SMAs at most this far apart (currency units) count as equal, so
    /// neither crossover rule fires. Zero means exact comparison.
    pub sma_tolerance: Decimal,
}

impl Default for TrendParams {
    fn default() -> Self {
        Self {
            window_hours: 2,
            sma_short: 5,
            sma_long: 20,
            sma_long_min_points: 10,
            min_data_points: 5,
            significant_move: Decimal::ONE,
            sma_tolerance: Decimal::new(1, 2),
        }
    }
}

impl TrendParams {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.window_hours <= 0 {
            bail!("analysis window must be at least one hour");
        }
        if self.window_hours.checked_mul(3_600).is_none() {
            bail!("analysis window of {} hours is out of range", self.window_hours);
        }
        if self.sma_short == 0 || self.sma_long == 0 {
            bail!("SMA periods must be greater than zero");
        }
        if self.significant_move.is_sign_negative() {
            bail!("significant move threshold must not be negative");
        }
        if self.sma_tolerance.is_sign_negative() {
            bail!("SMA equality tolerance must not be negative");
        }
        Ok(())
    }

    pub fn window_secs(&self) -> i64 {
        self.window_hours.saturating_mul(3_600)
    }
}

/// Result of evaluating one window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Analysis {
    /// Too little history for a decision; the cycle degrades to a heartbeat.
    Insufficient { data_points: usize },
    Evaluated(Signal),
}

/// Mean of the last `min(period, n)` prices. `None` for an empty window or
/// when the sum overflows.
pub fn sma(prices: &[Decimal], period: usize) -> Option<Decimal> {
    if prices.is_empty() || period == 0 {
        return None;
    }
    let take = period.min(prices.len());
    let tail = &prices[prices.len() - take..];
    let sum = tail
        .iter()
        .try_fold(Decimal::ZERO, |acc, p| acc.checked_add(*p))?;
    sum.checked_div(Decimal::from(take))
}

/// Long SMA with the thin-history fallback: the full window until
/// `min_points` prices exist.
pub fn sma_long(prices: &[Decimal], period: usize, min_points: usize) -> Option<Decimal> {
    if prices.len() >= min_points {
        sma(prices, period)
    } else {
        sma(prices, prices.len())
    }
}

/// `price[n-1] - price[n-3]`, or `None` with fewer than three prices.
pub fn price_trend(prices: &[Decimal]) -> Option<Decimal> {
    let n = prices.len();
    if n < 3 {
        return None;
    }
    Some(prices[n - 1] - prices[n - 3])
}

/// First matching rule wins; no trend means no signal. Averages within
/// `tolerance` of each other are neither above nor below one another.
pub fn decide(
    sma_short: Decimal,
    sma_long: Decimal,
    trend: Option<Decimal>,
    significant_move: Decimal,
    tolerance: Decimal,
) -> SignalKind {
    let Some(trend) = trend else {
        return SignalKind::None;
    };

    let gap = sma_short.checked_sub(sma_long);
    let above = gap.is_some_and(|g| g > tolerance);
    let below = gap.is_some_and(|g| g < -tolerance);

    if above && trend > Decimal::ZERO {
        SignalKind::Buy
    } else if below && trend < Decimal::ZERO {
        SignalKind::Sell
    } else if trend.abs() > significant_move {
        if trend > Decimal::ZERO {
            SignalKind::Buy
        } else {
            SignalKind::Sell
        }
    } else {
        SignalKind::None
    }
}

pub fn evaluate(
    prices: &[Decimal],
    params: &TrendParams,
    evaluated_at: i64,
) -> Result<Analysis, AnalysisError> {
    let n = prices.len();
    if n < params.min_data_points {
        return Ok(Analysis::Insufficient { data_points: n });
    }

    let price = *prices
        .last()
        .ok_or_else(|| AnalysisError::Compute("empty price window".into()))?;

    let short = sma(prices, params.sma_short)
        .ok_or_else(|| AnalysisError::Compute("short SMA undefined (empty window or overflow)".into()))?;
    let long = sma_long(prices, params.sma_long, params.sma_long_min_points)
        .ok_or_else(|| AnalysisError::Compute("long SMA undefined (empty window or overflow)".into()))?;

    let trend = price_trend(prices);
    let kind = decide(
        short,
        long,
        trend,
        params.significant_move,
        params.sma_tolerance,
    );

    Ok(Analysis::Evaluated(Signal {
        kind,
        price,
        sma_short: short,
        sma_long: long,
        price_trend: trend,
        window_size: n,
        evaluated_at,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(v: i64) -> Decimal {
        Decimal::from(v)
    }

    fn prices(vals: &[i64]) -> Vec<Decimal> {
        vals.iter().copied().map(d).collect()
    }

    #[test]
    fn short_sma_over_full_window() {
        assert_eq!(sma(&prices(&[10, 11, 12, 13, 14]), 5), Some(d(12)));
    }

    #[test]
    fn short_sma_with_fewer_points_than_period() {
        assert_eq!(sma(&prices(&[10, 11, 12]), 5), Some(d(11)));
    }

    #[test]
    fn short_sma_uses_only_trailing_points() {
        assert_eq!(sma(&prices(&[100, 1, 2, 3, 4, 5]), 5), Some(d(3)));
    }

    #[test]
    fn long_sma_falls_back_to_all_points_when_history_is_thin() {
        // n = 8 < 10: mean of all eight, not a 20-window slice.
        let p = prices(&[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(sma_long(&p, 20, 10), Some(Decimal::new(45, 1)));
    }

    #[test]
    fn long_sma_uses_its_window_once_history_is_long_enough() {
        let p: Vec<Decimal> = (1..=30).map(d).collect();
        // last 20 of 1..=30 are 11..=30, mean 20.5
        assert_eq!(sma_long(&p, 20, 10), Some(Decimal::new(205, 1)));
    }

    #[test]
    fn trend_needs_three_points() {
        assert_eq!(price_trend(&prices(&[1, 2])), None);
        assert_eq!(price_trend(&prices(&[5, 1, 7])), Some(d(2)));
    }

    #[test]
    fn rising_averages_with_positive_trend_buy() {
        let kind = decide(d(12), d(10), Some(d(2)), Decimal::ONE, Decimal::ZERO);
        assert_eq!(kind, SignalKind::Buy);
    }

    #[test]
    fn falling_averages_with_negative_trend_sell() {
        let kind = decide(d(9), d(10), Some(d(-2)), Decimal::ONE, Decimal::ZERO);
        assert_eq!(kind, SignalKind::Sell);
    }

    #[test]
    fn nearly_equal_averages_with_small_trend_is_none() {
        let tolerance = TrendParams::default().sma_tolerance;
        let kind = decide(
            Decimal::new(1001, 2),
            d(10),
            Some(Decimal::new(1, 1)),
            Decimal::ONE,
            tolerance,
        );
        assert_eq!(kind, SignalKind::None);

        let kind = decide(
            Decimal::new(999, 2),
            d(10),
            Some(Decimal::new(-1, 1)),
            Decimal::ONE,
            tolerance,
        );
        assert_eq!(kind, SignalKind::None);
    }

    #[test]
    fn zero_tolerance_compares_averages_exactly() {
        let kind = decide(
            Decimal::new(1001, 2),
            d(10),
            Some(Decimal::new(1, 1)),
            Decimal::ONE,
            Decimal::ZERO,
        );
        assert_eq!(kind, SignalKind::Buy);
    }

    #[test]
    fn gap_just_past_tolerance_crosses() {
        let kind = decide(
            Decimal::new(1002, 2),
            d(10),
            Some(Decimal::new(1, 1)),
            Decimal::ONE,
            Decimal::new(1, 2),
        );
        assert_eq!(kind, SignalKind::Buy);
    }

    #[test]
    fn significant_move_overrides_disagreeing_averages() {
        // Averages say down, trend jumped up by more than the threshold.
        let kind = decide(d(9), d(10), Some(Decimal::new(15, 1)), Decimal::ONE, Decimal::ZERO);
        assert_eq!(kind, SignalKind::Buy);

        let kind = decide(d(11), d(10), Some(Decimal::new(-15, 1)), Decimal::ONE, Decimal::ZERO);
        assert_eq!(kind, SignalKind::Sell);
    }

    #[test]
    fn move_exactly_at_threshold_is_not_significant() {
        let kind = decide(d(10), d(10), Some(Decimal::ONE), Decimal::ONE, Decimal::ZERO);
        assert_eq!(kind, SignalKind::None);
    }

    #[test]
    fn missing_trend_suppresses_signal() {
        assert_eq!(decide(d(12), d(10), None, Decimal::ONE, Decimal::ZERO), SignalKind::None);
    }

    #[test]
    fn thin_window_is_a_heartbeat_regardless_of_prices() {
        let p = prices(&[10, 50, 200]);
        let out = evaluate(&p, &TrendParams::default(), 0).unwrap();
        assert_eq!(out, Analysis::Insufficient { data_points: 3 });
    }

    #[test]
    fn uptrend_window_yields_buy_signal() {
        let p = prices(&[10, 10, 10, 10, 10, 11, 12, 13]);
        let Analysis::Evaluated(signal) = evaluate(&p, &TrendParams::default(), 42).unwrap()
        else {
            panic!("expected a signal");
        };

        assert_eq!(signal.kind, SignalKind::Buy);
        assert_eq!(signal.price, d(13));
        assert_eq!(signal.sma_short, Decimal::new(112, 1));
        // n = 8 < 10: mean of all
        assert_eq!(signal.sma_long, Decimal::new(1075, 2));
        assert_eq!(signal.price_trend, Some(d(2)));
        assert_eq!(signal.window_size, 8);
        assert_eq!(signal.evaluated_at, 42);
    }

    #[test]
    fn min_points_below_three_evaluates_without_trend() {
        let params = TrendParams {
            min_data_points: 1,
            ..TrendParams::default()
        };
        let Analysis::Evaluated(signal) = evaluate(&prices(&[10, 20]), &params, 0).unwrap() else {
            panic!("expected a signal");
        };
        assert_eq!(signal.kind, SignalKind::None);
        assert_eq!(signal.price_trend, None);
    }

    #[test]
    fn overflowing_sum_is_a_compute_error() {
        // five of these exceed Decimal::MAX when added
        let huge = Decimal::from_i128_with_scale(5 * 10i128.pow(28), 0);
        assert_eq!(sma(&[huge; 5], 5), None);
        assert!(matches!(
            evaluate(&[huge; 5], &TrendParams::default(), 0),
            Err(AnalysisError::Compute(_))
        ));
    }

    #[test]
    fn window_hours_that_overflow_seconds_are_rejected() {
        let params = TrendParams {
            window_hours: i64::MAX / 1_000,
            ..TrendParams::default()
        };
        assert!(params.validate().is_err());
        assert!(TrendParams::default().validate().is_ok());
    }

    #[test]
    fn negative_tolerance_is_rejected() {
        let params = TrendParams {
            sma_tolerance: Decimal::new(-1, 2),
            ..TrendParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn empty_window_with_zero_minimum_is_a_compute_error() {
        let params = TrendParams {
            min_data_points: 0,
            ..TrendParams::default()
        };
        assert!(matches!(
            evaluate(&[], &params, 0),
            Err(AnalysisError::Compute(_))
        ));
    }
}
