#![doc = include_str!("../README.md")]

mod allocator;
mod config;
mod error;
mod frontier;
mod id_pool;
mod orchestrator;
pub mod pool;
mod primality;
pub mod sieve;
mod stats;
mod status;

pub use crate::allocator::*;
pub use crate::config::*;
pub use crate::error::*;
pub use crate::frontier::*;
pub use crate::id_pool::*;
pub use crate::primality::*;
pub use crate::stats::StatsSnapshot;
pub use crate::status::*;
