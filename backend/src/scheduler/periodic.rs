//! Fixed-cadence runner for pipeline cycles.
//!
//! Each stage (poller, consumer, analyzer) is a short, self-contained cycle. The
//! runner fires it on an interval and checks the stop flag between cycles; a
//! cycle that has started always runs to completion.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

/// Owner side of the cooperative stop flag.
#[derive(Clone)]
pub struct StopHandle {
    tx: watch::Sender<bool>,
}

/// Listener side, handed to every loop.
pub type StopSignal = watch::Receiver<bool>;

impl StopHandle {
    pub fn new() -> (Self, StopSignal) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, rx)
    }

    pub fn subscribe(&self) -> StopSignal {
        self.tx.subscribe()
    }

    pub fn stop(&self) {
        self.tx.send_replace(true);
    }
}

fn stop_requested(stop: &StopSignal) -> bool {
    *stop.borrow()
}

/// Runs `cycle` every `every` until `stop` fires. Returns the number of cycles run.
///
/// The first cycle fires immediately. Ticks missed while a cycle overruns are
/// skipped, never queued.
pub async fn run_periodic<F, Fut>(
    name: &'static str,
    every: Duration,
    mut stop: StopSignal,
    mut cycle: F,
) -> u64
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(task = name, every_ms = every.as_millis() as u64, "periodic task started");

    let mut runs = 0u64;
    loop {
        if stop_requested(&stop) {
            break;
        }

        tokio::select! {
            biased;

            changed = stop.changed() => {
                // A dropped handle also means stop.
                if changed.is_err() || stop_requested(&stop) {
                    break;
                }
            }
            _ = ticker.tick() => {
                cycle().await;
                runs += 1;
                debug!(task = name, runs, "cycle finished");
            }
        }
    }

    info!(task = name, runs, "periodic task stopped");
    runs
}
