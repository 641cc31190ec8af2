use core::fmt;
use core::time::Duration;
use primeid::{Allocator, StatsSnapshot};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

/// One line of supply statistics, with rates over the preceding interval.
#[derive(Debug, Clone, PartialEq)]
pub struct SupplyReport {
    pub available: usize,
    pub capacity: usize,
    pub frontier: u64,
    pub stats: StatsSnapshot,
    pub allocated_per_sec: f64,
    pub generated_per_sec: f64,
}

impl SupplyReport {
    pub fn new(
        allocator: &Allocator,
        previous: &StatsSnapshot,
        stats: StatsSnapshot,
        elapsed: Duration,
    ) -> Self {
        let secs = elapsed.as_secs_f64();
        let rate = |now: u64, before: u64| {
            if secs > 0.0 {
                now.saturating_sub(before) as f64 / secs
            } else {
                0.0
            }
        };

        Self {
            available: allocator.available(),
            capacity: allocator.capacity(),
            frontier: allocator.frontier(),
            allocated_per_sec: rate(stats.allocated, previous.allocated),
            generated_per_sec: rate(stats.primes_generated, previous.primes_generated),
            stats,
        }
    }
}

impl fmt::Display for SupplyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pool {}/{}, frontier {}, allocated {} ({:.1}/s), generated {} ({:.1}/s), \
             released {}, dropped {}, segments {} ({} failed)",
            self.available,
            self.capacity,
            self.frontier,
            self.stats.allocated,
            self.allocated_per_sec,
            self.stats.primes_generated,
            self.generated_per_sec,
            self.stats.released,
            self.stats.dropped,
            self.stats.segments_sieved,
            self.stats.segments_failed,
        )
    }
}

/// Logs a [`SupplyReport`] every `every` until `shutdown` fires.
pub async fn run_reporter(allocator: Allocator, every: Duration, shutdown: CancellationToken) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    let mut previous = allocator.stats();
    loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let stats = allocator.stats();
        let _report = SupplyReport::new(&allocator, &previous, stats, every);
        #[cfg(feature = "tracing")]
        tracing::info!("{_report}");
        previous = stats;
    }
}

/// Cancels the reporter and waits for it to exit.
///
/// Returns `false` if the task panicked or was aborted; the failure is logged.
pub async fn stop_reporter(handle: JoinHandle<()>, shutdown: &CancellationToken) -> bool {
    shutdown.cancel();
    match handle.await {
        Ok(()) => true,
        Err(_e) => {
            #[cfg(feature = "tracing")]
            tracing::error!("Statistics reporter failed: {_e}");
            false
        }
    }
}
