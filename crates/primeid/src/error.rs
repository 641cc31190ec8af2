//! Error types for the prime identifier allocator.
//!
//! This module defines the central `Error` enum, which captures every failure
//! the allocator can report. Only [`Error::Cancelled`] and [`Error::Closed`]
//! ever reach a caller of `allocate`; generation-side failures are absorbed by
//! the orchestrator and surface only in logs and statistics.
//!
//! ## Error Cases
//! - `Config`: Invalid startup parameters. Fatal at construction.
//! - `InvalidSegment`: A sieve was asked for an empty segment.
//! - `SegmentGeneration`: A worker failed to sieve a claimed segment. The
//!   segment is abandoned.
//! - `FrontierExhausted`: The frontier moved past the largest identifier the
//!   allocator is configured to issue.
//! - `InvalidIdentifier`: A released value is not an identifier this allocator
//!   could have issued.
//! - `Cancelled`: The caller gave up waiting for an identifier.
//! - `Closed`: The allocator has been shut down.

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the allocator.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// Startup parameters were rejected.
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    /// A segment with no width was handed to the sieve.
    #[error("Invalid segment [{start}, +{size})")]
    InvalidSegment { start: u64, size: u32 },

    /// Sieving a claimed segment failed or was interrupted.
    #[error("Failed to sieve segment starting at {start}: {reason}")]
    SegmentGeneration { start: u64, reason: String },

    /// No unclaimed search space remains below the configured maximum.
    #[error("Frontier exhausted at {next}")]
    FrontierExhausted { next: u64 },

    /// The value is outside the issued range or is not prime.
    #[error("{id} is not a valid identifier")]
    InvalidIdentifier { id: u64 },

    /// The caller's wait was cancelled or timed out.
    #[error("Request cancelled")]
    Cancelled,

    /// The allocator is shut down.
    #[error("Allocator is closed")]
    Closed,
}
