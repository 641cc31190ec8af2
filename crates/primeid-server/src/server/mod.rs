//! Host-side components of `primeid-server`.
//!
//! - [`config`] - CLI and environment configuration.
//! - [`report`] - Periodic supply statistics.
//! - [`telemetry`] - Console logging setup.

pub mod config;
pub mod report;
pub mod telemetry;
