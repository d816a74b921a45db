//! End-to-end batch run: load inputs, dispatch, persist

use crate::config::BatchConfig;
use crate::dispatch::{self, RunSummary};
use crate::loader;
use crate::output::{run_stamp, CsvSink};
use crate::routing::OsrmClient;
use anyhow::Result;
use chrono::Local;
use std::sync::Arc;
use tracing::{info, warn};

pub async fn run_batch(config: &BatchConfig) -> Result<RunSummary> {
    let pairs = loader::load_pairs(&config.input, &config.input_columns)?;

    let regions = loader::region_keys(&pairs, config.region_key);
    info!("Batch references {} regions", regions.len());
    let table = loader::load_coordinate_table(
        &config.regions_dir,
        regions,
        config.region_key,
        &config.table_columns,
    )
    .await?;

    let backend = OsrmClient::new(
        &config.backend.base_url,
        &config.backend.profile,
        config.backend.timeout(),
    )?;

    let stamp = run_stamp(Local::now());
    let sink = CsvSink::new(config.output_dir.clone(), stamp);

    info!("Starting processing at {}", Local::now().format("%H:%M"));
    let reports = dispatch::run(
        pairs.into(),
        Arc::new(table),
        Arc::new(backend),
        Arc::new(sink),
        config.workers,
    )
    .await;
    info!("Finished processing at {}", Local::now().format("%H:%M"));

    let summary = RunSummary::from_reports(&reports);
    info!(
        "{} pairs: {} hits, {} misses across {} workers",
        summary.pairs, summary.hits, summary.misses, summary.workers
    );
    if !summary.failed_workers.is_empty() {
        warn!(
            "Results of workers {:?} were not written",
            summary.failed_workers
        );
    }

    Ok(summary)
}
