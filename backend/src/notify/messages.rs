use rust_decimal::Decimal;
use tickflow_core::Signal;

use super::Notification;
use crate::time::format_utc;

/// Liveness message sent when the window holds too little data for a decision.
pub fn heartbeat(symbol: &str, data_points: usize, at: i64) -> Notification {
    Notification {
        subject: format!("{symbol} Pipeline Test - Alerts Working"),
        body: format!(
            "{symbol} Pipeline Test Alert\n\n\
             Status: Pipeline is running\n\
             Data points found: {data_points}\n\
             Time: {}\n\n\
             This confirms notifications are being delivered.",
            format_utc(at)
        ),
    }
}

/// BUY/SELL alert.
pub fn signal_alert(symbol: &str, signal: &Signal) -> Notification {
    let action = signal.kind.to_string().to_lowercase();
    Notification {
        subject: format!(
            "{symbol} {} SIGNAL - ${}",
            signal.kind,
            money(signal.price)
        ),
        body: format!(
            "{symbol} STOCK ALERT: {} SIGNAL\n\n\
             Current Price: ${}\n\
             SMA-short: ${}\n\
             SMA-long: ${}\n\
             Data Points: {}\n\n\
             Signal Time: {}\n\n\
             Action: Consider {action}ing {symbol} stock",
            signal.kind,
            money(signal.price),
            money(signal.sma_short),
            money(signal.sma_long),
            signal.window_size,
            format_utc(signal.evaluated_at),
        ),
    }
}

/// Routine update for a cycle that produced no signal.
pub fn status_update(symbol: &str, signal: &Signal) -> Notification {
    Notification {
        subject: format!("{symbol} Update - ${}", money(signal.price)),
        body: format!(
            "{symbol} Stock Update\n\n\
             Current Price: ${}\n\
             SMA-short: ${}\n\
             SMA-long: ${}\n\
             Data Points: {}\n\n\
             Status: Monitoring for signals...\n\
             Time: {}",
            money(signal.price),
            money(signal.sma_short),
            money(signal.sma_long),
            signal.window_size,
            format_utc(signal.evaluated_at),
        ),
    }
}

pub fn pipeline_error(symbol: &str, detail: &str, at: i64) -> Notification {
    Notification {
        subject: format!("{symbol} Pipeline Error Alert"),
        body: format!(
            "{symbol} Pipeline Error: {detail}\nTime: {}",
            format_utc(at)
        ),
    }
}

fn money(v: Decimal) -> String {
    format!("{:.2}", v.round_dp(2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickflow_core::SignalKind;

    fn signal(kind: SignalKind) -> Signal {
        Signal {
            kind,
            price: Decimal::new(123456, 3),
            sma_short: Decimal::new(12, 0),
            sma_long: Decimal::new(10, 0),
            price_trend: Some(Decimal::new(2, 0)),
            window_size: 8,
            evaluated_at: 1_700_000_000,
        }
    }

    #[test]
    fn subjects_are_distinct_per_outcome() {
        let hb = heartbeat("ORCL", 3, 0);
        let alert = signal_alert("ORCL", &signal(SignalKind::Buy));
        let status = status_update("ORCL", &signal(SignalKind::None));
        let err = pipeline_error("ORCL", "boom", 0);

        let subjects = [&hb.subject, &alert.subject, &status.subject, &err.subject];
        for (i, a) in subjects.iter().enumerate() {
            for b in subjects.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn alert_subject_names_signal_and_price() {
        let n = signal_alert("ORCL", &signal(SignalKind::Sell));
        assert_eq!(n.subject, "ORCL SELL SIGNAL - $123.46");
        assert!(n.body.contains("Consider selling ORCL"));
        assert!(n.body.contains("2023-11-14 22:13:20 UTC"));
    }

    #[test]
    fn error_body_carries_detail() {
        let n = pipeline_error("ORCL", "query timed out", 1_700_000_000);
        assert!(n.body.starts_with("ORCL Pipeline Error: query timed out"));
    }
}
