//! Batch driving-distance calculator
//!
//! Reads commute pairs, resolves both ends to coordinates from per-region
//! files, asks a local OSRM instance for the driving distance of each pair
//! and writes per-worker hits/misses CSVs.
//!
//! The routing engine must be running before the batch starts, e.g.
//! `docker run -p 5000:5000 osrm/osrm-backend osrm-routed /data/map.osrm`.
//!
//! Usage:
//!   cargo run --release -- --input data/ca_od.csv --regions-dir data/regions

use anyhow::Result;
use clap::Parser;
use commute_distance::config::{
    default_worker_count, log_filter, BackendConfig, BatchConfig, DEFAULT_BACKEND_URL,
    DEFAULT_PROFILE,
};
use commute_distance::loader::{InputColumns, TableColumns};
use commute_distance::pipeline;
use commute_distance::resolver::{RegionKeyRule, DEFAULT_REGION_KEY_LEN};
use commute_distance::routing::DEFAULT_TIMEOUT_SECS;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "commute_distance")]
#[command(about = "Compute driving distances for commute pairs via a local OSRM server")]
struct Args {
    /// Commute pairs CSV
    #[arg(long)]
    input: PathBuf,

    /// Column holding the origin (home) code
    #[arg(long, default_value = "h_geocode")]
    origin_col: String,

    /// Column holding the destination (work) code
    #[arg(long, default_value = "w_geocode")]
    dest_col: String,

    /// Directory of per-region coordinate files named <region>.csv
    #[arg(long, default_value = "data/regions")]
    regions_dir: PathBuf,

    #[arg(long, default_value = "GEOID10")]
    code_col: String,

    #[arg(long, default_value = "INTPTLAT10")]
    lat_col: String,

    #[arg(long, default_value = "INTPTLON10")]
    lon_col: String,

    /// Offset of the region key inside a location code
    #[arg(long, default_value = "0")]
    region_key_offset: usize,

    /// Length of the region key
    #[arg(long, default_value_t = DEFAULT_REGION_KEY_LEN)]
    region_key_len: usize,

    /// Output directory for hits/misses files
    #[arg(long, default_value = "results")]
    output_dir: PathBuf,

    /// Routing engine base URL
    #[arg(long, default_value = DEFAULT_BACKEND_URL)]
    osrm_url: String,

    #[arg(long, default_value = DEFAULT_PROFILE)]
    profile: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Worker count (defaults to available parallelism)
    #[arg(long)]
    workers: Option<usize>,
}

impl From<Args> for BatchConfig {
    fn from(args: Args) -> Self {
        BatchConfig {
            input: args.input,
            input_columns: InputColumns {
                origin: args.origin_col,
                destination: args.dest_col,
            },
            regions_dir: args.regions_dir,
            table_columns: TableColumns {
                code: args.code_col,
                lat: args.lat_col,
                lon: args.lon_col,
            },
            region_key: RegionKeyRule {
                offset: args.region_key_offset,
                len: args.region_key_len,
            },
            output_dir: args.output_dir,
            backend: BackendConfig {
                base_url: args.osrm_url,
                profile: args.profile,
                timeout_secs: args.timeout,
            },
            workers: args.workers.unwrap_or_else(default_worker_count),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .init();

    let config = BatchConfig::from(Args::parse());
    info!("Run configuration: {}", serde_json::to_string(&config)?);

    let summary = pipeline::run_batch(&config).await?;

    if !summary.failed_workers.is_empty() {
        anyhow::bail!(
            "{} of {} workers failed to write their results",
            summary.failed_workers.len(),
            summary.workers
        );
    }

    Ok(())
}
