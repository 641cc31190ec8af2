//! Prime discovery by segmented sieving.
//!
//! ## Structure
//!
//! - [`base`] - The immutable table of small primes, sieved once at startup.
//! - [`segment`] - Sieves one bounded range of the number line using the base
//!   table.

mod base;
mod segment;

pub use base::*;
pub use segment::*;
