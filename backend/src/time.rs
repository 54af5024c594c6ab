use chrono::Utc;

/// Current wall-clock time in epoch seconds.
pub fn now_secs() -> i64 {
    Utc::now().timestamp()
}

/// Formats epoch seconds the way notification bodies print them.
pub fn format_utc(epoch_secs: i64) -> String {
    match chrono::DateTime::from_timestamp(epoch_secs, 0) {
        Some(ts) => ts.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => format!("{epoch_secs} (epoch)"),
    }
}
