//! Console logging for the server.
//!
//! Log output always goes through `tracing_subscriber::fmt` and is filtered by
//! `RUST_LOG` (default `info`). The allocator's own events are only emitted
//! when the `tracing` feature is enabled, which it is by default.
//!
//! ```bash
//! RUST_LOG=primeid=debug cargo run -p primeid-server
//! ```

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_line_number(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .with_file(true),
        )
        .try_init()?;

    Ok(())
}
