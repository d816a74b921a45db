//! Batch run configuration
//!
//! Built by the binaries from their command-line arguments.

use crate::loader::{InputColumns, TableColumns};
use crate::resolver::RegionKeyRule;
use crate::routing::DEFAULT_TIMEOUT_SECS;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_PROFILE: &str = "driving";
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Where the routing engine lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            profile: DEFAULT_PROFILE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Commute CSV
    pub input: PathBuf,
    pub input_columns: InputColumns,
    /// Directory of `<region>.csv` coordinate files
    pub regions_dir: PathBuf,
    pub table_columns: TableColumns,
    pub region_key: RegionKeyRule,
    pub output_dir: PathBuf,
    pub backend: BackendConfig,
    pub workers: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("data/commutes.csv"),
            input_columns: InputColumns::default(),
            regions_dir: PathBuf::from("data/regions"),
            table_columns: TableColumns::default(),
            region_key: RegionKeyRule::default(),
            output_dir: PathBuf::from("results"),
            backend: BackendConfig::default(),
            workers: default_worker_count(),
        }
    }
}

/// One worker per available hardware thread
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Log filter for the binaries: `RUST_LOG` when set and valid, `info` otherwise
pub fn log_filter() -> EnvFilter {
    log_filter_from(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref())
}

fn log_filter_from(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BatchConfig::default();
        assert!(config.workers >= 1);
        assert_eq!(config.backend.base_url, "http://127.0.0.1:5000");
        assert_eq!(config.backend.timeout(), Duration::from_secs(30));
        assert_eq!(config.region_key, RegionKeyRule { offset: 0, len: 2 });
    }

    #[test]
    fn test_config_logs_as_json() {
        let json = serde_json::to_value(BatchConfig::default()).unwrap();
        assert_eq!(json["input_columns"]["origin"], "h_geocode");
        assert_eq!(json["table_columns"]["lat"], "INTPTLAT10");
        assert_eq!(json["backend"]["profile"], "driving");
    }

    #[test]
    fn test_log_filter_defaults_to_info() {
        assert_eq!(log_filter_from(None).to_string(), "info");
    }

    #[test]
    fn test_log_filter_honours_directives() {
        assert_eq!(
            log_filter_from(Some("commute_distance=debug")).to_string(),
            "commute_distance=debug"
        );
    }
}
