//! Background coordinator that keeps the identifier pool supplied.
//!
//! The orchestrator is a single task and the only writer of batch decisions:
//! it reads the pool depth, claims one segment per worker from the frontier,
//! fans the segments out to the [`WorkerPool`], and feeds the resulting primes
//! into the [`IdPool`] in segment order. Sieving runs in parallel; the
//! bookkeeping stays serialized here.
//!
//! ## Behavior
//!
//! - Depth below the low-water mark triggers a batch.
//! - Otherwise the task sleeps until the pool signals it crossed the
//!   low-water mark or the poll interval elapses, whichever comes first.
//! - `put` blocks while the pool is full, throttling generation to the rate of
//!   consumption.
//! - A failed segment is logged and abandoned. The frontier has already moved
//!   past it and it is never retried.
//! - Once the frontier is exhausted no further batches are attempted.
//! - The loop exits when the shutdown token is cancelled or the pool closes.

use crate::{
    Error, Result,
    frontier::GenerationFrontier,
    id_pool::IdPool,
    pool::WorkerPool,
    sieve::Segment,
    stats::Stats,
};
use core::time::Duration;
use std::sync::Arc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Outcome of a replenishment batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Batch {
    /// More search space remains.
    Continue,
    /// The frontier ran out while claiming this batch.
    Exhausted,
}

pub(crate) struct Orchestrator {
    pub(crate) pool: Arc<IdPool>,
    pub(crate) frontier: Arc<GenerationFrontier>,
    pub(crate) workers: Arc<WorkerPool>,
    pub(crate) stats: Arc<Stats>,
    pub(crate) segment_size: u32,
    pub(crate) poll_interval: Duration,
    pub(crate) shutdown: CancellationToken,
}

impl Orchestrator {
    /// Runs the supply loop until shutdown.
    pub(crate) async fn run(self) {
        #[cfg(feature = "tracing")]
        tracing::info!(
            "Orchestrator started: {} workers, segment size {}, frontier at {}",
            self.workers.len(),
            self.segment_size,
            self.frontier.position()
        );

        let mut exhausted = false;

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            let depth = self.pool.len();
            if !exhausted && depth < self.pool.low_water_mark() {
                match self.replenish(depth).await {
                    Ok(Batch::Continue) => {}
                    Ok(Batch::Exhausted) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(
                            "Frontier exhausted at {}; serving remaining and recycled ids only",
                            self.frontier.position()
                        );
                        exhausted = true;
                    }
                    Err(_e) => {
                        #[cfg(feature = "tracing")]
                        tracing::debug!("Orchestrator stopping: {_e}");
                        break;
                    }
                }
            } else {
                #[cfg(feature = "tracing")]
                tracing::trace!("Pool depth {depth} is sufficient, orchestrator sleeping");

                tokio::select! {
                    biased;
                    () = self.shutdown.cancelled() => break,
                    () = self.pool.below_low_water() => {}
                    () = sleep(self.poll_interval) => {}
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::info!("Orchestrator stopped");
    }

    /// Sieves one segment per worker and feeds every prime into the pool.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] if shutdown begins while the batch is being
    /// sieved or while waiting for pool capacity. Segment failures are not
    /// errors here; they are logged and counted.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip(self)))]
    async fn replenish(&self, depth: usize) -> Result<Batch> {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Pool depth {depth} below low-water mark {}, dispatching {} segments",
            self.pool.low_water_mark(),
            self.workers.len()
        );

        let (segments, batch) = self.claim_batch()?;

        let results = futures::future::join_all(
            segments.iter().map(|&segment| self.workers.sieve(segment)),
        )
        .await;

        let mut added = 0_usize;
        for (_segment, result) in segments.iter().zip(results) {
            match result {
                Ok(primes) => {
                    self.stats.record_segment(primes.len());
                    for prime in primes {
                        self.feed(prime).await?;
                        added += 1;
                    }
                }
                Err(Error::Closed) => return Err(Error::Closed),
                Err(_e) => {
                    self.stats.record_segment_failed();
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Abandoning segment {:?}: {_e}", _segment);
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Batch complete: added {added} ids, pool depth {}",
            self.pool.len()
        );
        #[cfg(not(feature = "tracing"))]
        let _ = added;

        Ok(batch)
    }

    /// Claims up to one segment per worker.
    fn claim_batch(&self) -> Result<(Vec<Segment>, Batch)> {
        let mut segments = Vec::with_capacity(self.workers.len());
        for _ in 0..self.workers.len() {
            match self.frontier.claim(self.segment_size) {
                Ok(segment) => segments.push(segment),
                Err(Error::FrontierExhausted { .. }) => return Ok((segments, Batch::Exhausted)),
                Err(e) => return Err(e),
            }
        }
        Ok((segments, Batch::Continue))
    }

    /// Puts one prime into the pool, waiting for capacity unless shutdown
    /// begins first.
    async fn feed(&self, prime: u64) -> Result<()> {
        tokio::select! {
            biased;
            () = self.shutdown.cancelled() => Err(Error::Closed),
            put = self.pool.put(prime) => put,
        }
    }
}
