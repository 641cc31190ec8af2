//! Worker pool for concurrent segment sieving.
//!
//! This module manages a fixed set of asynchronous worker tasks that sieve
//! claimed segments in parallel. It provides:
//!
//! - Round-robin dispatch across workers
//! - Per-request replies over one-shot channels
//! - Graceful shutdown via a shared cancellation token and a bounded grace
//!   period
//!
//! ## Submodules
//!
//! - [`worker`] - The worker task loop.
//! - [`manager`] - Owns the workers, routes requests and shuts them down.
//!
//! The orchestrator is the only component that dispatches work to the pool;
//! the allocator handle only shuts it down.

pub mod manager;
pub mod worker;

pub use manager::WorkerPool;
