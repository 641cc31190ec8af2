//! Allocation and generation counters.
//!
//! Counters are relaxed atomics updated on the hot paths and read together as
//! a [`StatsSnapshot`]. A snapshot is not a consistent cut across counters;
//! each value is individually accurate at the moment it was loaded.

use portable_atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub(crate) struct Stats {
    allocated: AtomicU64,
    released: AtomicU64,
    dropped: AtomicU64,
    segments_sieved: AtomicU64,
    segments_failed: AtomicU64,
    primes_generated: AtomicU64,
}

impl Stats {
    pub(crate) fn record_allocated(&self) {
        self.allocated.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_released(&self) {
        self.released.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_segment(&self, primes: usize) {
        self.segments_sieved.fetch_add(1, Ordering::Relaxed);
        self.primes_generated
            .fetch_add(primes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_segment_failed(&self) {
        self.segments_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            allocated: self.allocated.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            segments_sieved: self.segments_sieved.load(Ordering::Relaxed),
            segments_failed: self.segments_failed.load(Ordering::Relaxed),
            primes_generated: self.primes_generated.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of an allocator's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Identifiers handed out by `allocate`.
    pub allocated: u64,
    /// Identifiers returned to the pool by `release`.
    pub released: u64,
    /// Identifiers lost because the pool was full on `release`.
    pub dropped: u64,
    /// Segments sieved successfully.
    pub segments_sieved: u64,
    /// Segments abandoned after a sieve failure.
    pub segments_failed: u64,
    /// Primes produced by successful segments.
    pub primes_generated: u64,
}
