//! Public allocator handle.
//!
//! [`Allocator`] owns the whole supply pipeline: the base prime table, the
//! frontier, the worker pool, the orchestrator task and the identifier pool.
//! It is constructed once with [`Allocator::start`] and passed by clone to
//! whoever needs identifiers; all clones share the same state.
//!
//! ## Responsibilities
//!
//! - Hand out unique prime identifiers (`allocate*`).
//! - Accept identifiers back for reuse (`release`).
//! - Shut the background tasks down within a bounded grace period (`close`).

use crate::{
    AllocatorConfig, Error, ReleaseStatus, Result, StatsSnapshot,
    frontier::GenerationFrontier,
    id_pool::IdPool,
    is_prime,
    orchestrator::Orchestrator,
    pool::WorkerPool,
    sieve::{BasePrimeTable, SegmentSieve},
    stats::Stats,
};
use core::time::Duration;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::{runtime::Handle, task::JoinHandle, time::timeout};
use tokio_util::sync::CancellationToken;

/// Concurrent allocator of prime identifiers.
///
/// Every identifier returned by an `allocate` method is prime, lies in
/// `[lower_bound, max_identifier]`, and is not held by any other caller.
/// Identifiers are not tracked once handed out: pairing each `release` with an
/// earlier `allocate` is the caller's responsibility.
///
/// # Example
///
/// ```no_run
/// use primeid::{Allocator, AllocatorConfig};
///
/// # async fn run() -> primeid::Result<()> {
/// let allocator = Allocator::start(AllocatorConfig::default())?;
///
/// let id = allocator.allocate().await?;
/// assert!(primeid::is_prime(id));
/// allocator.release(id)?;
///
/// allocator.close().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Allocator {
    inner: Arc<Inner>,
}

struct Inner {
    config: AllocatorConfig,
    pool: Arc<IdPool>,
    frontier: Arc<GenerationFrontier>,
    workers: Arc<WorkerPool>,
    stats: Arc<Stats>,
    shutdown: CancellationToken,
    orchestrator: Mutex<Option<JoinHandle<()>>>,
}

impl Allocator {
    /// Validates `config`, builds the base prime table and spawns the worker
    /// pool and orchestrator on the current Tokio runtime.
    ///
    /// Generation starts immediately; the first identifiers become available
    /// once the first batch of segments has been sieved.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid or if called
    /// outside of a Tokio runtime.
    pub fn start(config: AllocatorConfig) -> Result<Self> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| Error::Config {
            reason: "the allocator must be started within a Tokio runtime".to_string(),
        })?;

        let base = BasePrimeTable::build(config.base_prime_limit().max(2))?;
        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Built base prime table: {} primes up to {}",
            base.len(),
            base.limit()
        );
        let sieve = SegmentSieve::new(Arc::new(base), config.lower_bound);

        let shutdown = CancellationToken::new();
        let pool = Arc::new(IdPool::new(config.queue_capacity, config.low_water_mark));
        let frontier = Arc::new(GenerationFrontier::new(
            config.lower_bound,
            config.max_identifier,
        ));
        let workers = Arc::new(WorkerPool::spawn(
            config.worker_count,
            &sieve,
            shutdown.child_token(),
        )?);
        let stats = Arc::new(Stats::default());

        let orchestrator = Orchestrator {
            pool: Arc::clone(&pool),
            frontier: Arc::clone(&frontier),
            workers: Arc::clone(&workers),
            stats: Arc::clone(&stats),
            segment_size: config.segment_size,
            poll_interval: config.poll_interval,
            shutdown: shutdown.child_token(),
        };
        let handle = runtime.spawn(orchestrator.run());

        #[cfg(feature = "tracing")]
        tracing::info!(
            "Allocator started: ids in [{}, {}], pool capacity {} (low-water {})",
            config.lower_bound,
            config.max_identifier,
            config.queue_capacity,
            config.low_water_mark
        );

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                pool,
                frontier,
                workers,
                stats,
                shutdown,
                orchestrator: Mutex::new(Some(handle)),
            }),
        })
    }

    /// Takes an identifier, waiting as long as necessary for one to become
    /// available.
    ///
    /// Dropping the future before it resolves has no effect on the pool.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] if the allocator is closed before or while
    /// waiting.
    pub async fn allocate(&self) -> Result<u64> {
        let id = self.inner.pool.take().await?;
        self.inner.stats.record_allocated();
        Ok(id)
    }

    /// Like [`allocate`](Self::allocate), but gives up when `cancel` fires.
    ///
    /// # Errors
    ///
    /// - [`Error::Cancelled`] if `cancel` is cancelled first.
    /// - [`Error::Closed`] if the allocator is closed first.
    pub async fn allocate_with(&self, cancel: &CancellationToken) -> Result<u64> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(Error::Cancelled),
            id = self.allocate() => id,
        }
    }

    /// Like [`allocate`](Self::allocate), but gives up after `wait`.
    ///
    /// # Errors
    ///
    /// - [`Error::Cancelled`] if no identifier arrives within `wait`.
    /// - [`Error::Closed`] if the allocator is closed first.
    pub async fn allocate_timeout(&self, wait: Duration) -> Result<u64> {
        timeout(wait, self.allocate())
            .await
            .unwrap_or(Err(Error::Cancelled))
    }

    /// Returns an identifier to the pool without blocking.
    ///
    /// If the pool is at capacity the identifier is discarded and
    /// [`ReleaseStatus::Dropped`] is returned. A dropped identifier is never
    /// rediscovered: the frontier has already moved past it.
    ///
    /// # Errors
    ///
    /// - [`Error::Closed`] if the allocator is closed.
    /// - [`Error::InvalidIdentifier`] if `id` is outside
    ///   `[lower_bound, max_identifier]`, is not prime, or lies beyond
    ///   everything generated so far. Accepting a not-yet-generated prime
    ///   would let the sieve issue it a second time later.
    pub fn release(&self, id: u64) -> Result<ReleaseStatus> {
        let inner = &*self.inner;
        if inner.pool.is_closed() {
            return Err(Error::Closed);
        }
        if !self.is_issuable(id) {
            return Err(Error::InvalidIdentifier { id });
        }

        if inner.pool.offer(id)? {
            inner.stats.record_released();
            #[cfg(feature = "tracing")]
            tracing::trace!("Id {id} returned to pool");
            Ok(ReleaseStatus::Recycled)
        } else {
            inner.stats.record_dropped();
            #[cfg(feature = "tracing")]
            tracing::warn!("Pool full, dropping released id {id}");
            Ok(ReleaseStatus::Dropped)
        }
    }

    /// Stops generation and fails all pending and future allocations.
    ///
    /// Identifiers still in the pool are discarded. The orchestrator and the
    /// workers get `shutdown_grace` each to exit before they are aborted.
    /// Calling `close` again is a no-op.
    pub async fn close(&self) {
        let inner = &*self.inner;
        let _discarded = inner.pool.close();
        inner.shutdown.cancel();

        let Some(handle) = inner.orchestrator.lock().take() else {
            return;
        };

        #[cfg(feature = "tracing")]
        tracing::info!("Closing allocator, discarded {_discarded} pooled ids");

        let grace = inner.config.shutdown_grace;
        let abort = handle.abort_handle();
        match timeout(grace, handle).await {
            Ok(Ok(())) => {}
            Ok(Err(_e)) => {
                #[cfg(feature = "tracing")]
                tracing::error!("Orchestrator task failed: {_e}");
            }
            Err(_) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Orchestrator did not stop within {grace:?}, aborting");
                abort.abort();
            }
        }

        inner.workers.shutdown(grace).await;

        #[cfg(feature = "tracing")]
        tracing::info!("Allocator closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.pool.is_closed()
    }

    /// Number of identifiers ready to be allocated right now.
    pub fn available(&self) -> usize {
        self.inner.pool.len()
    }

    pub fn capacity(&self) -> usize {
        self.inner.pool.capacity()
    }

    /// The next value the frontier will hand out. Values below it have been
    /// claimed for sieving, though the latest batch may still be in flight.
    pub fn frontier(&self) -> u64 {
        self.inner.frontier.position()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    pub fn config(&self) -> &AllocatorConfig {
        &self.inner.config
    }

    fn is_issuable(&self, id: u64) -> bool {
        let config = &self.inner.config;
        (config.lower_bound..=config.max_identifier).contains(&id)
            && id < self.inner.pool.supplied_below()
            && is_prime(id)
    }
}

impl core::fmt::Debug for Allocator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Allocator")
            .field("config", &self.inner.config)
            .field("available", &self.available())
            .field("frontier", &self.frontier())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Drop for Inner {
    // The last handle went away without `close`; stop the background tasks.
    fn drop(&mut self) {
        self.pool.close();
        self.shutdown.cancel();
    }
}
