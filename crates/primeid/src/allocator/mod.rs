//! The allocator service consumed by entity services.
//!
//! ## Structure
//!
//! - [`service`] - [`Allocator`], the public handle.

mod service;
#[cfg(test)]
mod tests;

pub use service::*;
