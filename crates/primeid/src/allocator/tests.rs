use crate::{Allocator, AllocatorConfig, Error, ReleaseStatus, is_prime};
use core::time::Duration;
use std::collections::HashSet;
use tokio::time::{Instant, sleep, timeout};
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(10);

/// Primes in `[100, 199]`.
const PRIMES_100_TO_199: [u64; 21] = [
    101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157, 163, 167, 173, 179, 181, 191,
    193, 197, 199,
];

fn small_config() -> AllocatorConfig {
    AllocatorConfig {
        queue_capacity: 100,
        low_water_mark: 50,
        segment_size: 4_096,
        worker_count: 2,
        poll_interval: Duration::from_millis(20),
        ..AllocatorConfig::default()
    }
}

/// An allocator whose entire supply is the 21 primes in `[100, 199]`.
fn finite_config() -> AllocatorConfig {
    AllocatorConfig {
        lower_bound: 100,
        max_identifier: 199,
        segment_size: 64,
        ..small_config()
    }
}

async fn wait_for_available(allocator: &Allocator, count: usize) {
    let deadline = Instant::now() + WAIT;
    while allocator.available() < count {
        assert!(
            Instant::now() < deadline,
            "pool only reached {} of {count}",
            allocator.available()
        );
        sleep(Duration::from_millis(5)).await;
    }
}

async fn drain(allocator: &Allocator, count: usize) -> Vec<u64> {
    let mut ids = Vec::with_capacity(count);
    for _ in 0..count {
        ids.push(allocator.allocate_timeout(WAIT).await.unwrap());
    }
    ids
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn first_ten_ids_are_deterministic() {
    let allocator = Allocator::start(small_config()).unwrap();

    let ids = drain(&allocator, 10).await;
    assert_eq!(
        ids,
        [
            1_000_000_007,
            1_000_000_009,
            1_000_000_021,
            1_000_000_033,
            1_000_000_087,
            1_000_000_093,
            1_000_000_097,
            1_000_000_103,
            1_000_000_123,
            1_000_000_181,
        ]
    );

    allocator.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn allocated_ids_are_prime_and_above_lower_bound() {
    let config = small_config();
    let lower_bound = config.lower_bound;
    let allocator = Allocator::start(config).unwrap();

    // Several times the pool capacity, so replenishment runs repeatedly.
    let ids = drain(&allocator, 1_000).await;
    let unique: HashSet<_> = ids.iter().copied().collect();
    assert_eq!(unique.len(), ids.len());
    for id in ids {
        assert!(id >= lower_bound, "{id} is below the lower bound");
        assert!(is_prime(id), "{id} is not prime");
    }

    let stats = allocator.stats();
    assert_eq!(stats.allocated, 1_000);
    assert!(stats.segments_sieved >= 2);
    assert!(stats.primes_generated >= 1_000);
    assert!(allocator.frontier() > lower_bound);

    allocator.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_allocations_are_distinct() {
    const TASKS: usize = 16;
    const PER_TASK: usize = 200;

    let allocator = Allocator::start(AllocatorConfig {
        queue_capacity: 512,
        low_water_mark: 256,
        ..small_config()
    })
    .unwrap();
    wait_for_available(&allocator, 256).await;

    let tasks: Vec<_> = (0..TASKS)
        .map(|_| {
            let allocator = allocator.clone();
            tokio::spawn(async move {
                let mut ids = Vec::with_capacity(PER_TASK);
                for _ in 0..PER_TASK {
                    ids.push(allocator.allocate_timeout(WAIT).await.unwrap());
                }
                ids
            })
        })
        .collect();

    let mut seen = HashSet::with_capacity(TASKS * PER_TASK);
    for task in tasks {
        for id in task.await.unwrap() {
            assert!(seen.insert(id), "id {id} was issued twice");
        }
    }
    assert_eq!(seen.len(), TASKS * PER_TASK);

    allocator.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn release_into_full_pool_is_dropped() {
    let allocator = Allocator::start(small_config()).unwrap();
    let id = allocator.allocate_timeout(WAIT).await.unwrap();
    // The orchestrator refills the slot the allocation freed.
    wait_for_available(&allocator, 100).await;
    assert_eq!(allocator.capacity(), 100);

    let status = allocator.release(id).unwrap();
    assert_eq!(status, ReleaseStatus::Dropped);
    assert!(status.is_dropped());
    assert_eq!(allocator.available(), 100);

    let stats = allocator.stats();
    assert_eq!(stats.dropped, 1);
    assert_eq!(stats.released, 0);

    // The orchestrator is blocked on a full pool; the depth never overshoots.
    sleep(Duration::from_millis(50)).await;
    assert_eq!(allocator.available(), 100);

    allocator.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn finite_supply_is_issued_once_then_waits() {
    let allocator = Allocator::start(finite_config()).unwrap();

    let ids: HashSet<u64> = drain(&allocator, PRIMES_100_TO_199.len())
        .await
        .into_iter()
        .collect();
    assert_eq!(ids, PRIMES_100_TO_199.into_iter().collect());

    assert_eq!(
        allocator.allocate_timeout(Duration::from_millis(100)).await,
        Err(Error::Cancelled)
    );
    assert!(allocator.frontier() > 199);

    allocator.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn released_id_is_reissued_only_after_release() {
    let allocator = Allocator::start(finite_config()).unwrap();
    let mut held = drain(&allocator, PRIMES_100_TO_199.len()).await;

    // Everything is active: nothing can be issued until something is released.
    assert_eq!(
        allocator.allocate_timeout(Duration::from_millis(50)).await,
        Err(Error::Cancelled)
    );

    let id = held.pop().unwrap();
    assert_eq!(allocator.release(id).unwrap(), ReleaseStatus::Recycled);
    assert_eq!(allocator.available(), 1);
    assert_eq!(allocator.allocate_timeout(WAIT).await, Ok(id));
    assert_eq!(allocator.stats().released, 1);

    allocator.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn release_rejects_values_that_were_never_issuable() {
    let allocator = Allocator::start(small_config()).unwrap();

    for id in [0, 7, 999_999_937, 1_000_000_001, 9_999_999_967, 10_000_000_019] {
        assert_eq!(
            allocator.release(id),
            Err(Error::InvalidIdentifier { id }),
            "{id} should be rejected"
        );
    }

    allocator.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn release_of_ungenerated_prime_cannot_duplicate() {
    let allocator = Allocator::start(AllocatorConfig {
        lower_bound: 100,
        max_identifier: 10_000,
        segment_size: 64,
        worker_count: 1,
        queue_capacity: 1_000,
        low_water_mark: 10,
        poll_interval: Duration::from_millis(20),
        ..AllocatorConfig::default()
    })
    .unwrap();

    // The first segment, [100, 164), holds 13 primes and lifts the pool
    // above the low-water mark, so 199 has not been generated yet.
    wait_for_available(&allocator, 13).await;
    assert_eq!(
        allocator.release(199),
        Err(Error::InvalidIdentifier { id: 199 })
    );
    assert_eq!(allocator.available(), 13);

    let ids = drain(&allocator, 40).await;
    let unique: HashSet<_> = ids.iter().copied().collect();
    assert_eq!(unique.len(), ids.len(), "duplicate id in {ids:?}");
    assert_eq!(ids.iter().filter(|&&id| id == 199).count(), 1);

    // Once generated and issued, the same value is accepted back.
    assert_eq!(allocator.release(199), Ok(ReleaseStatus::Recycled));

    allocator.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancelled_allocate_leaves_pool_intact() {
    let allocator = Allocator::start(finite_config()).unwrap();
    let mut held = drain(&allocator, PRIMES_100_TO_199.len()).await;

    let cancel = CancellationToken::new();
    let waiter = tokio::spawn({
        let allocator = allocator.clone();
        let cancel = cancel.clone();
        async move { allocator.allocate_with(&cancel).await }
    });
    sleep(Duration::from_millis(50)).await;
    cancel.cancel();
    assert_eq!(
        timeout(WAIT, waiter).await.unwrap().unwrap(),
        Err(Error::Cancelled)
    );

    let id = held.pop().unwrap();
    allocator.release(id).unwrap();
    assert_eq!(allocator.available(), 1);
    assert_eq!(
        allocator.allocate_with(&CancellationToken::new()).await,
        Ok(id)
    );

    allocator.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn close_fails_pending_and_future_calls() {
    let allocator = Allocator::start(finite_config()).unwrap();
    let held = drain(&allocator, PRIMES_100_TO_199.len()).await;

    let pending: Vec<_> = (0..4)
        .map(|_| {
            let allocator = allocator.clone();
            tokio::spawn(async move { allocator.allocate().await })
        })
        .collect();
    sleep(Duration::from_millis(50)).await;

    timeout(WAIT, allocator.close()).await.unwrap();
    assert!(allocator.is_closed());

    for task in pending {
        assert_eq!(timeout(WAIT, task).await.unwrap().unwrap(), Err(Error::Closed));
    }
    assert_eq!(allocator.allocate().await, Err(Error::Closed));
    assert_eq!(
        allocator.allocate_timeout(Duration::from_millis(10)).await,
        Err(Error::Closed)
    );
    assert_eq!(allocator.release(held[0]), Err(Error::Closed));

    // Idempotent.
    timeout(WAIT, allocator.close()).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn close_interrupts_orchestrator_blocked_on_full_pool() {
    let allocator = Allocator::start(small_config()).unwrap();
    wait_for_available(&allocator, 100).await;

    let started = Instant::now();
    timeout(WAIT, allocator.close()).await.unwrap();
    assert!(started.elapsed() < allocator.config().shutdown_grace);
    assert_eq!(allocator.available(), 0);
    assert_eq!(allocator.allocate().await, Err(Error::Closed));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn independent_allocators_do_not_share_state() {
    let a = Allocator::start(finite_config()).unwrap();
    let b = Allocator::start(finite_config()).unwrap();

    let from_a = drain(&a, 5).await;
    let from_b = drain(&b, 5).await;
    // Each has its own frontier, so both start from the bottom of the range.
    assert_eq!(from_a, from_b);

    a.close().await;
    assert!(!b.is_closed());
    assert!(b.allocate_timeout(WAIT).await.is_ok());
    b.close().await;
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let result = Allocator::start(AllocatorConfig {
        queue_capacity: 0,
        low_water_mark: 0,
        ..AllocatorConfig::default()
    });
    assert!(matches!(result, Err(Error::Config { .. })));
}

#[test]
fn start_requires_a_runtime() {
    assert!(matches!(
        Allocator::start(small_config()),
        Err(Error::Config { .. })
    ));
}
