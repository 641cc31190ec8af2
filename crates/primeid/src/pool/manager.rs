//! Asynchronous worker pool for segment sieving.
//!
//! This module defines the [`WorkerPool`] struct, which manages a set of
//! asynchronous workers responsible for processing [`SieveRequest`]s. It
//! distributes work using round-robin scheduling and supports coordinated
//! shutdown via a shared [`CancellationToken`].
//!
//! Each worker listens on its own bounded [`mpsc::Receiver`] and executes tasks
//! independently, so sieving scales with the number of workers while the
//! dispatcher stays a single task.

use super::worker::{SieveRequest, worker_loop};
use crate::{Error, Result, sieve::Segment, sieve::SegmentSieve};
use core::time::Duration;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::timeout,
};
use tokio_util::sync::CancellationToken;

/// A cooperative pool of asynchronous workers that sieve [`Segment`]s.
///
/// Workers receive requests over bounded MPSC channels. Work is distributed in
/// round-robin fashion and the pool supports graceful, cancellable shutdown.
#[derive(Debug)]
pub struct WorkerPool {
    workers: Vec<mpsc::Sender<SieveRequest>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    next_worker: AtomicUsize,
    shutdown_token: CancellationToken,
}

impl WorkerPool {
    /// Spawns `worker_count` workers on the current Tokio runtime.
    ///
    /// Each worker gets a channel with room for a single request. The
    /// orchestrator dispatches one segment per worker per batch, so a deeper
    /// buffer would only hold requests that cannot start yet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `worker_count` is zero.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn spawn(
        worker_count: usize,
        sieve: &SegmentSieve,
        shutdown_token: CancellationToken,
    ) -> Result<Self> {
        if worker_count == 0 {
            return Err(Error::Config {
                reason: "worker pool needs at least one worker".to_string(),
            });
        }

        let mut workers = Vec::with_capacity(worker_count);
        let mut handles = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let (tx, rx) = mpsc::channel(1);
            workers.push(tx);
            handles.push(tokio::spawn(worker_loop(
                worker_id,
                rx,
                sieve.clone(),
                shutdown_token.child_token(),
            )));
        }

        Ok(Self {
            workers,
            handles: Mutex::new(handles),
            next_worker: AtomicUsize::new(0),
            shutdown_token,
        })
    }

    /// Number of workers in the pool.
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Returns the index of the next worker to receive work (round-robin).
    ///
    /// Uses a relaxed atomic increment to minimize contention.
    pub fn next_worker_index(&self) -> usize {
        self.next_worker.fetch_add(1, Ordering::Relaxed) % self.workers.len()
    }

    /// Sieves `segment` on the next worker and waits for the result.
    ///
    /// # Errors
    ///
    /// - [`Error::Closed`] if the pool is shutting down before or while the
    ///   request is in flight.
    /// - [`Error::SegmentGeneration`] if the worker is gone or its sieve
    ///   failed.
    /// - Any error returned by [`SegmentSieve::generate`].
    pub async fn sieve(&self, segment: Segment) -> Result<Vec<u64>> {
        if self.shutdown_token.is_cancelled() {
            return Err(Error::Closed);
        }

        let worker_idx = self.next_worker_index();
        let worker = &self.workers[worker_idx];
        let (tx, rx) = oneshot::channel();
        let request = SieveRequest {
            segment,
            response: tx,
        };

        tokio::select! {
            biased;
            () = self.shutdown_token.cancelled() => return Err(Error::Closed),
            sent = worker.send(request) => {
                if sent.is_err() {
                    return Err(Error::SegmentGeneration {
                        start: segment.start,
                        reason: format!("worker {worker_idx} channel closed"),
                    });
                }
            }
        }

        tokio::select! {
            biased;
            () = self.shutdown_token.cancelled() => Err(Error::Closed),
            reply = rx => reply.unwrap_or_else(|_| {
                Err(Error::SegmentGeneration {
                    start: segment.start,
                    reason: format!("worker {worker_idx} dropped the request"),
                })
            }),
        }
    }

    /// Shuts down all workers in the pool.
    ///
    /// - Cancels the shared [`CancellationToken`] to refuse new work and stop
    ///   idle workers.
    /// - Waits up to `grace` for every worker task to exit.
    /// - Aborts any worker still running after the grace period.
    ///
    /// Calling this more than once is harmless.
    pub async fn shutdown(&self, grace: Duration) {
        #[cfg(feature = "tracing")]
        tracing::debug!("Cancelling worker pool");
        self.shutdown_token.cancel();

        let handles = core::mem::take(&mut *self.handles.lock());
        if handles.is_empty() {
            return;
        }
        let aborts: Vec<_> = handles.iter().map(JoinHandle::abort_handle).collect();

        match timeout(grace, futures::future::join_all(handles)).await {
            Ok(_) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("All workers stopped");
            }
            Err(_) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Worker shutdown timed out after {grace:?}, aborting");
                for abort in aborts {
                    abort.abort();
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::info!("Worker pool shutdown complete");
    }
}
