use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Minimal counters for operational visibility.
#[derive(Clone, Default)]
pub struct Counters {
    // ingestion
    pub quotes_fetched: Arc<AtomicU64>,
    pub fetch_failures: Arc<AtomicU64>,
    pub quotes_published: Arc<AtomicU64>,
    pub publish_retries: Arc<AtomicU64>,
    pub quotes_dropped: Arc<AtomicU64>,

    // consumer / archiver
    pub batches_consumed: Arc<AtomicU64>,
    pub records_persisted: Arc<AtomicU64>,
    pub records_failed: Arc<AtomicU64>,

    // analyzer
    pub analysis_cycles: Arc<AtomicU64>,
    pub analysis_failures: Arc<AtomicU64>,
    pub signals_emitted: Arc<AtomicU64>,
}

impl Counters {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}
