#![doc = include_str!("../README.md")]

mod server;

use clap::Parser;
use primeid::Allocator;
use server::config::{CliArgs, ServerConfig};
use server::report::{run_reporter, stop_reporter};
use server::telemetry::init_telemetry;
use tokio::signal;
use tokio_util::sync::CancellationToken;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    init_telemetry()?;
    log_startup_info(&config);

    let allocator = Allocator::start(config.allocator.clone())?;

    let reporter_shutdown = CancellationToken::new();
    let reporter = config.report_interval.map(|every| {
        tokio::spawn(run_reporter(
            allocator.clone(),
            every,
            reporter_shutdown.clone(),
        ))
    });

    shutdown_signal().await?;

    if let Some(reporter) = reporter {
        stop_reporter(reporter, &reporter_shutdown).await;
    }
    allocator.close().await;

    #[cfg(feature = "tracing")]
    tracing::info!("Allocator shut down successfully: {:?}", allocator.stats());
    Ok(())
}

fn log_startup_info(_config: &ServerConfig) {
    if cfg!(debug_assertions) {
        #[cfg(feature = "tracing")]
        tracing::info!("Starting allocator with full config: {:#?}", _config);
    } else {
        #[cfg(feature = "tracing")]
        tracing::info!(
            "Starting allocator with {} workers, ids from {}",
            _config.allocator.worker_count,
            _config.allocator.lower_bound
        );
    }
}

async fn shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;

    tokio::select! {
        ctrl_c = signal::ctrl_c() => {
            ctrl_c?;
            #[cfg(feature = "tracing")]
            tracing::info!("Received Ctrl+C signal");
        },
        () = async {
            #[cfg(unix)]
            terminate.recv().await;
            #[cfg(not(unix))]
            std::future::pending::<()>().await;
        } => {
            #[cfg(feature = "tracing")]
            tracing::info!("Received SIGTERM signal");
        },
    }

    #[cfg(feature = "tracing")]
    tracing::info!("Shutdown signal received, terminating gracefully...");
    Ok(())
}
