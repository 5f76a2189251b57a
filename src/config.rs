use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use crate::limits::{DEFAULT_DURATION_MINUTES, MAX_DURATION_MINUTES};

/// Snapshot file name inside the data directory.
pub const SNAPSHOT_FILE: &str = "floor.snapshot";

/// Runtime settings. Every flag falls back to a `COVERS_*` environment variable.
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Directory holding the floor snapshot.
    #[arg(long, env = "COVERS_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Minutes a new reservation holds its table.
    #[arg(
        long,
        env = "COVERS_DEFAULT_DURATION",
        default_value_t = DEFAULT_DURATION_MINUTES,
        value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_DURATION_MINUTES))
    )]
    pub default_duration: u32,

    /// Seconds between status refreshes in `watch` mode.
    #[arg(
        long,
        env = "COVERS_REFRESH_SECS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub refresh_secs: u64,

    /// Serve Prometheus metrics on this port.
    #[arg(long, env = "COVERS_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

impl Config {
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(SNAPSHOT_FILE)
    }

    pub fn refresh_period(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }
}
