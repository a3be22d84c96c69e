use std::time::Duration;

use clap::Parser;
use dispenser_core::DurabilityStrategy;

/// Runtime configuration for the `dispenser-server` binary.
///
/// Every setting is parsed from a CLI argument or its matching environment
/// variable, with defaults suitable for a single-node deployment.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "dispenser-server",
    version,
    about = "A RESP-speaking identifier dispenser service"
)]
pub struct CliArgs {
    /// Address to listen on.
    ///
    /// Environment variable: `DISPENSER_LISTEN`
    ///
    /// Default: `127.0.0.1:6380`
    #[arg(long, env = "DISPENSER_LISTEN", default_value_t = String::from("127.0.0.1:6380"))]
    pub listen: String,

    /// Directory holding the on-disk snapshot file (`dispensers.json`).
    ///
    /// Created on startup if it does not already exist.
    ///
    /// Environment variable: `DISPENSER_DATA_DIR`
    ///
    /// Default: `./data`
    #[arg(long, env = "DISPENSER_DATA_DIR", default_value_t = String::from("./data"))]
    pub data_dir: String,

    /// How often the `pre-checkpoint` and `pre_close` durability strategies
    /// persist a segment-backed dispenser's current value.
    ///
    /// Environment variable: `DISPENSER_CHECKPOINT_INTERVAL_MS`
    ///
    /// Default: `2000`
    #[arg(long, env = "DISPENSER_CHECKPOINT_INTERVAL_MS", default_value_t = 2000)]
    pub checkpoint_interval_ms: u64,

    /// Number of identifiers pre-allocated per saved segment for
    /// segment-backed durability strategies (`pre-base`, `pre-checkpoint`,
    /// `pre_close`).
    ///
    /// Environment variable: `DISPENSER_SEGMENT_SIZE`
    ///
    /// Default: `1000`
    #[arg(long, env = "DISPENSER_SEGMENT_SIZE", default_value_t = 1000)]
    pub segment_size: u64,

    /// Fraction of the current segment remaining at which the next segment
    /// is pre-fetched in the background.
    ///
    /// Environment variable: `DISPENSER_REFILL_THRESHOLD`
    ///
    /// Default: `0.1`
    #[arg(long, env = "DISPENSER_REFILL_THRESHOLD", default_value_t = 0.1)]
    pub refill_threshold: f64,

    /// Interval at which the snapshot store is force-flushed, independent
    /// of any per-dispenser checkpointing.
    ///
    /// Environment variable: `DISPENSER_AUTOSAVE_INTERVAL_MS`
    ///
    /// Default: `5000`
    #[arg(long, env = "DISPENSER_AUTOSAVE_INTERVAL_MS", default_value_t = 5000)]
    pub autosave_interval_ms: u64,

    /// Maximum time to wait for in-flight connections to finish during
    /// graceful shutdown before the process exits anyway.
    ///
    /// Environment variable: `DISPENSER_SHUTDOWN_TIMEOUT_SECS`
    ///
    /// Default: `5`
    #[arg(long, env = "DISPENSER_SHUTDOWN_TIMEOUT_SECS", default_value_t = 5)]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: String,
    pub data_dir: String,
    pub durability: DurabilityStrategy,
    pub autosave_interval: Duration,
    pub shutdown_timeout: Duration,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.segment_size == 0 {
            anyhow::bail!("DISPENSER_SEGMENT_SIZE must be greater than 0");
        }
        if !(0.0..1.0).contains(&args.refill_threshold) {
            anyhow::bail!("DISPENSER_REFILL_THRESHOLD must be in [0.0, 1.0)");
        }

        Ok(Self {
            listen: args.listen,
            data_dir: args.data_dir,
            durability: DurabilityStrategy {
                segment_size: args.segment_size,
                refill_threshold: args.refill_threshold,
                checkpoint_interval: Duration::from_millis(args.checkpoint_interval_ms),
            },
            autosave_interval: Duration::from_millis(args.autosave_interval_ms),
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout_secs),
        })
    }
}
