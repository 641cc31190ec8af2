use crate::{Error, Result, sieve::Segment, sieve::SegmentSieve};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// A single unit of work: sieve `segment` and reply on `response`.
#[derive(Debug)]
pub struct SieveRequest {
    pub segment: Segment,
    pub response: oneshot::Sender<Result<Vec<u64>>>,
}

/// Worker task responsible for processing [`SieveRequest`]s.
///
/// Sieving is CPU-bound, so each request runs on the blocking thread pool
/// while this task waits for it. A worker therefore has at most one segment
/// in flight, and the number of workers bounds sieve parallelism.
///
/// The loop exits when `shutdown` is cancelled or every sender is dropped. A
/// sieve already running on the blocking pool is allowed to finish, but its
/// result is discarded if the requester has gone away.
///
/// # Arguments
///
/// - `worker_id`: Index of this worker (used for logs/tracing).
/// - `rx`: Receiver through which requests arrive.
/// - `sieve`: The segment sieve, sharing its base prime table with the other
///   workers.
/// - `shutdown`: Cancelled when the pool shuts down.
pub async fn worker_loop(
    worker_id: usize,
    mut rx: mpsc::Receiver<SieveRequest>,
    sieve: SegmentSieve,
    shutdown: CancellationToken,
) {
    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {worker_id} started");

    loop {
        let request = tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Worker {worker_id} received shutdown signal");
                break;
            }
            request = rx.recv() => match request {
                Some(request) => request,
                None => break,
            },
        };

        let SieveRequest { segment, response } = request;
        let result = run_sieve(worker_id, &sieve, segment).await;

        if response.send(result).is_err() {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                "Worker {worker_id} finished segment {} after its requester left",
                segment.start
            );
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {worker_id} stopped");
}

async fn run_sieve(worker_id: usize, sieve: &SegmentSieve, segment: Segment) -> Result<Vec<u64>> {
    let sieve = sieve.clone();
    match tokio::task::spawn_blocking(move || sieve.generate(segment)).await {
        Ok(result) => result,
        Err(e) => Err(Error::SegmentGeneration {
            start: segment.start,
            reason: format!("worker {worker_id} sieve task failed: {e}"),
        }),
    }
}
