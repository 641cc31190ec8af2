use anyhow::bail;
use clap::Parser;
use core::time::Duration;
use primeid::{
    AllocatorConfig, DEFAULT_LOW_WATER_MARK, DEFAULT_LOWER_BOUND, DEFAULT_MAX_IDENTIFIER,
    DEFAULT_QUEUE_CAPACITY, DEFAULT_SEGMENT_SIZE,
};

/// Runtime configuration for the `primeid-server` binary.
///
/// Every value can be given as a CLI flag or an environment variable (a `.env`
/// file in the working directory is loaded first). Defaults match
/// [`AllocatorConfig::default`].
#[derive(Parser, Debug, Clone)]
#[command(
    name = "primeid-server",
    version,
    about = "Runs a prime identifier allocator and reports its supply statistics"
)]
pub struct CliArgs {
    /// Smallest identifier that will ever be issued.
    ///
    /// Environment variable: `LOWER_BOUND`
    #[arg(long, env = "LOWER_BOUND", default_value_t = DEFAULT_LOWER_BOUND)]
    pub lower_bound: u64,

    /// Largest identifier that will ever be issued. Base primes are sieved up
    /// to its square root at startup.
    ///
    /// Environment variable: `MAX_IDENTIFIER`
    #[arg(long, env = "MAX_IDENTIFIER", default_value_t = DEFAULT_MAX_IDENTIFIER)]
    pub max_identifier: u64,

    /// Number of ready identifiers held in the pool.
    ///
    /// Environment variable: `QUEUE_CAPACITY`
    #[arg(long, env = "QUEUE_CAPACITY", default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// Pool depth below which another batch of segments is sieved. Must be
    /// less than `QUEUE_CAPACITY`.
    ///
    /// Environment variable: `LOW_WATER_MARK`
    #[arg(long, env = "LOW_WATER_MARK", default_value_t = DEFAULT_LOW_WATER_MARK)]
    pub low_water_mark: usize,

    /// Width of the numeric range each worker sieves per task.
    ///
    /// Environment variable: `SEGMENT_SIZE`
    #[arg(long, env = "SEGMENT_SIZE", default_value_t = DEFAULT_SEGMENT_SIZE)]
    pub segment_size: u32,

    /// Number of sieve workers. Defaults to the number of logical CPUs.
    ///
    /// Environment variable: `NUM_WORKERS`
    #[arg(long, env = "NUM_WORKERS")]
    pub num_workers: Option<usize>,

    /// Longest the orchestrator sleeps between pool depth checks, in
    /// milliseconds.
    ///
    /// Environment variable: `POLL_INTERVAL_MS`
    #[arg(long, env = "POLL_INTERVAL_MS", default_value_t = 500)]
    pub poll_interval_ms: u64,

    /// Grace period for background tasks on shutdown, in milliseconds.
    ///
    /// Environment variable: `SHUTDOWN_GRACE_MS`
    #[arg(long, env = "SHUTDOWN_GRACE_MS", default_value_t = 3_000)]
    pub shutdown_grace_ms: u64,

    /// How often supply statistics are logged, in seconds. `0` disables the
    /// report.
    ///
    /// Environment variable: `REPORT_INTERVAL_SECS`
    #[arg(long, env = "REPORT_INTERVAL_SECS", default_value_t = 10)]
    pub report_interval_secs: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub allocator: AllocatorConfig,
    pub report_interval: Option<Duration>,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.num_workers == Some(0) {
            bail!("NUM_WORKERS must be greater than 0");
        }
        if args.low_water_mark >= args.queue_capacity {
            bail!(
                "LOW_WATER_MARK ({}) must be less than QUEUE_CAPACITY ({})",
                args.low_water_mark,
                args.queue_capacity
            );
        }

        let defaults = AllocatorConfig::default();
        let allocator = AllocatorConfig {
            lower_bound: args.lower_bound,
            max_identifier: args.max_identifier,
            queue_capacity: args.queue_capacity,
            low_water_mark: args.low_water_mark,
            segment_size: args.segment_size,
            worker_count: args.num_workers.unwrap_or(defaults.worker_count),
            poll_interval: Duration::from_millis(args.poll_interval_ms),
            shutdown_grace: Duration::from_millis(args.shutdown_grace_ms),
        };
        allocator.validate()?;

        let report_interval =
            (args.report_interval_secs > 0).then(|| Duration::from_secs(args.report_interval_secs));

        Ok(Self {
            allocator,
            report_interval,
        })
    }
}
