//! Bounded pool of ready-to-issue identifiers.
//!
//! [`IdPool`] is a FIFO queue guarded by a [`parking_lot::Mutex`] with two
//! [`Notify`] handles for the blocking edges:
//!
//! - `take` waits on `not_empty` while the pool is empty.
//! - `put` waits on `not_full` while the pool is at capacity. This is the only
//!   backpressure point in the allocator: a stalled `put` stalls generation.
//!
//! A third handle, `low_water`, fires whenever a `take` leaves the pool below
//! its low-water mark so the orchestrator can react without polling.
//!
//! The pool also records `supplied_below`, one past the largest value `put`
//! has ever enqueued. It is advanced under the same lock as the push, so any
//! value a caller could have taken is already below it.
//!
//! The lock is never held across an `.await`. Waiters register with
//! [`Notified::enable`] before inspecting the queue, so a notification sent
//! between the check and the await is never lost.
//!
//! [`Notified::enable`]: tokio::sync::futures::Notified::enable

use crate::{Error, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::pin::pin;
use tokio::sync::Notify;

#[derive(Debug)]
struct State {
    queue: VecDeque<u64>,
    closed: bool,
    supplied_below: u64,
}

#[derive(Debug)]
pub struct IdPool {
    state: Mutex<State>,
    capacity: usize,
    low_water_mark: usize,
    not_empty: Notify,
    not_full: Notify,
    low_water: Notify,
}

impl IdPool {
    pub fn new(capacity: usize, low_water_mark: usize) -> Self {
        Self {
            state: Mutex::new(State {
                queue: VecDeque::with_capacity(capacity),
                closed: false,
                supplied_below: 0,
            }),
            capacity,
            low_water_mark,
            not_empty: Notify::new(),
            not_full: Notify::new(),
            low_water: Notify::new(),
        }
    }

    /// Removes an identifier, waiting until one is available.
    ///
    /// Dropping the returned future before it completes leaves the pool
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] once the pool has been closed, including for
    /// callers already waiting.
    pub async fn take(&self) -> Result<u64> {
        loop {
            let mut notified = pin!(self.not_empty.notified());
            notified.as_mut().enable();

            if let Some(id) = self.try_take()? {
                return Ok(id);
            }

            notified.await;
        }
    }

    /// Removes an identifier if one is immediately available.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] if the pool has been closed.
    pub fn try_take(&self) -> Result<Option<u64>> {
        let (id, remaining) = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(Error::Closed);
            }
            match state.queue.pop_front() {
                Some(id) => (id, state.queue.len()),
                None => return Ok(None),
            }
        };

        self.not_full.notify_one();
        if remaining < self.low_water_mark {
            self.low_water.notify_one();
        }
        Ok(Some(id))
    }

    /// Adds a newly generated identifier, waiting while the pool is at
    /// capacity. Advances [`supplied_below`](Self::supplied_below).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] if the pool is closed before space frees up.
    /// The identifier is discarded in that case.
    pub async fn put(&self, id: u64) -> Result<()> {
        loop {
            let mut notified = pin!(self.not_full.notified());
            notified.as_mut().enable();

            if self.push(id, true)? {
                return Ok(());
            }

            notified.await;
        }
    }

    /// Adds an identifier without waiting.
    ///
    /// Returns `Ok(false)` if the pool is at capacity; the caller decides what
    /// to do with the rejected identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] if the pool has been closed.
    pub fn offer(&self, id: u64) -> Result<bool> {
        self.push(id, false)
    }

    fn push(&self, id: u64, generated: bool) -> Result<bool> {
        {
            let mut state = self.state.lock();
            if state.closed {
                return Err(Error::Closed);
            }
            if state.queue.len() >= self.capacity {
                return Ok(false);
            }
            state.queue.push_back(id);
            if generated {
                state.supplied_below = state.supplied_below.max(id.saturating_add(1));
            }
        }

        self.not_empty.notify_one();
        Ok(true)
    }

    /// Resolves the next time a `take` leaves the pool below its low-water
    /// mark, or immediately if that happened since the last call.
    pub async fn below_low_water(&self) {
        self.low_water.notified().await;
    }

    /// Closes the pool, discarding its contents.
    ///
    /// Every waiting and future `take`, `put` and `offer` fails with
    /// [`Error::Closed`]. Returns the number of identifiers discarded.
    pub fn close(&self) -> usize {
        let discarded = {
            let mut state = self.state.lock();
            if state.closed {
                return 0;
            }
            state.closed = true;
            let discarded = state.queue.len();
            state.queue.clear();
            discarded
        };

        self.not_empty.notify_waiters();
        self.not_full.notify_waiters();
        self.low_water.notify_waiters();
        discarded
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// One past the largest identifier ever enqueued by [`put`](Self::put).
    ///
    /// Values offered back through [`offer`](Self::offer) do not move it. It
    /// never decreases.
    pub fn supplied_below(&self) -> u64 {
        self.state.lock().supplied_below
    }

    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub const fn low_water_mark(&self) -> usize {
        self.low_water_mark
    }
}
