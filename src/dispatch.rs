//! Batch dispatch across workers
//!
//! The batch is split into contiguous partitions, one per worker. Workers
//! share nothing mutable: each gets its range plus read-only handles to the
//! batch, the coordinate table and the routing backend, accumulates its own
//! hits and misses, and persists them itself.

use crate::error::CommuteError;
use crate::models::{CommutePair, CommuteResult, Hit, Miss, MissReason};
use crate::output::ResultSink;
use crate::resolver::CoordinateTable;
use crate::routing::{meters_to_miles, DistanceBackend};
use anyhow::anyhow;
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub type WorkerId = usize;

/// Split `len` items into `worker_count` contiguous ranges.
///
/// Every range but the last holds `len / worker_count` items; the last one
/// takes the remainder. A worker count of zero is treated as one.
pub fn partition(len: usize, worker_count: usize) -> Vec<Range<usize>> {
    let workers = worker_count.max(1);
    let size = len / workers;

    (0..workers)
        .map(|i| {
            let start = i * size;
            let end = if i + 1 == workers { len } else { start + size };
            start..end
        })
        .collect()
}

/// Everything one worker produced, in processing order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkerBatch {
    pub worker_id: WorkerId,
    pub range: Range<usize>,
    pub hits: Vec<Hit>,
    pub misses: Vec<Miss>,
}

impl WorkerBatch {
    pub fn total(&self) -> usize {
        self.hits.len() + self.misses.len()
    }

    /// True when the worker had pairs and every one failed at the backend,
    /// which usually means the routing engine was down.
    pub fn backend_looks_down(&self) -> bool {
        self.hits.is_empty()
            && !self.misses.is_empty()
            && self
                .misses
                .iter()
                .all(|m| m.reason == MissReason::RoutingUnavailable)
    }
}

async fn route_pair<B: DistanceBackend>(
    pair: &CommutePair,
    table: &CoordinateTable,
    backend: &B,
) -> Result<Hit, CommuteError> {
    let origin = table.resolve(&pair.origin)?;
    let destination = table.resolve(&pair.destination)?;
    let meters = backend.query_distance(origin, destination).await?;

    Ok(Hit {
        origin: pair.origin.clone(),
        origin_lat: origin.lat,
        origin_lon: origin.lon,
        destination: pair.destination.clone(),
        destination_lat: destination.lat,
        destination_lon: destination.lon,
        distance_miles: meters_to_miles(meters),
    })
}

/// Resolve and route one pair. Any failure becomes a miss.
pub async fn process_pair<B: DistanceBackend>(
    pair: &CommutePair,
    table: &CoordinateTable,
    backend: &B,
) -> CommuteResult {
    match route_pair(pair, table, backend).await {
        Ok(hit) => CommuteResult::Hit(hit),
        Err(e) => {
            debug!("Missed {} -> {}: {}", pair.origin, pair.destination, e);
            CommuteResult::Miss(Miss {
                origin: pair.origin.clone(),
                destination: pair.destination.clone(),
                reason: e.reason(),
            })
        }
    }
}

/// Process `pairs[range]` in ascending index order
pub async fn process_partition<B: DistanceBackend>(
    worker_id: WorkerId,
    range: Range<usize>,
    pairs: &[CommutePair],
    table: &CoordinateTable,
    backend: &B,
) -> WorkerBatch {
    info!("Worker {} starting on pairs {:?}", worker_id, range);

    let mut batch = WorkerBatch {
        worker_id,
        range: range.clone(),
        ..Default::default()
    };

    for pair in &pairs[range] {
        match process_pair(pair, table, backend).await {
            CommuteResult::Hit(hit) => batch.hits.push(hit),
            CommuteResult::Miss(miss) => batch.misses.push(miss),
        }
    }

    info!(
        "Worker {} done processing: {} hits, {} misses",
        worker_id,
        batch.hits.len(),
        batch.misses.len()
    );
    if batch.backend_looks_down() {
        warn!(
            "Worker {}: every pair failed at the routing backend, is it running?",
            worker_id
        );
    }

    batch
}

/// Outcome of one worker
#[derive(Debug)]
pub struct WorkerReport<R> {
    pub worker_id: WorkerId,
    pub range: Range<usize>,
    /// `None` if the worker or its writer task panicked
    pub batch: Option<WorkerBatch>,
    pub persisted: anyhow::Result<R>,
}

/// Run the whole batch with one worker per partition.
///
/// Each worker persists its own results through `sink`. A worker whose
/// persistence fails is reported as such; the others are unaffected.
/// Reports come back in worker-id order.
pub async fn run<B, S>(
    pairs: Arc<[CommutePair]>,
    table: Arc<CoordinateTable>,
    backend: Arc<B>,
    sink: Arc<S>,
    worker_count: usize,
) -> Vec<WorkerReport<S::Receipt>>
where
    B: DistanceBackend + 'static,
    S: ResultSink,
{
    let partitions = partition(pairs.len(), worker_count);
    info!(
        "Dispatching {} pairs across {} workers",
        pairs.len(),
        partitions.len()
    );

    let handles: Vec<_> = partitions
        .iter()
        .cloned()
        .enumerate()
        .map(|(worker_id, range)| {
            let pairs = Arc::clone(&pairs);
            let table = Arc::clone(&table);
            let backend = Arc::clone(&backend);
            let sink = Arc::clone(&sink);

            tokio::spawn(async move {
                let batch =
                    process_partition(worker_id, range, &pairs, &table, backend.as_ref()).await;

                let written = tokio::task::spawn_blocking(move || {
                    let persisted = sink.persist(&batch);
                    (batch, persisted)
                })
                .await;

                match written {
                    Ok((batch, persisted)) => (Some(batch), persisted),
                    Err(e) => (None, Err(anyhow!("output task failed: {}", e))),
                }
            })
        })
        .collect();

    let mut reports = Vec::with_capacity(handles.len());
    for ((worker_id, range), handle) in partitions.into_iter().enumerate().zip(handles) {
        let (batch, persisted) = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => (None, Err(anyhow!("worker task failed: {}", e))),
        };

        if let Err(e) = &persisted {
            warn!("Worker {} results not persisted: {:#}", worker_id, e);
        }

        reports.push(WorkerReport {
            worker_id,
            range,
            batch,
            persisted,
        });
    }

    reports
}

/// Totals across all workers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub workers: usize,
    pub pairs: usize,
    pub hits: usize,
    pub misses: usize,
    pub failed_workers: Vec<WorkerId>,
}

impl RunSummary {
    pub fn from_reports<R>(reports: &[WorkerReport<R>]) -> Self {
        let mut summary = RunSummary {
            workers: reports.len(),
            ..Default::default()
        };

        for report in reports {
            summary.pairs += report.range.len();
            if let Some(batch) = &report.batch {
                summary.hits += batch.hits.len();
                summary.misses += batch.misses.len();
            }
            if report.persisted.is_err() {
                summary.failed_workers.push(report.worker_id);
            }
        }

        summary
    }
}
