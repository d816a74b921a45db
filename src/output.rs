//! Per-worker result files
//!
//! Every worker writes its own hits and misses files once, after its whole
//! partition is processed. There is no merge step.

use crate::dispatch::{WorkerBatch, WorkerId};
use crate::models::{Hit, Miss};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use csv::WriterBuilder;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

pub const HIT_HEADERS: [&str; 7] = [
    "Home Block",
    "Home Lat",
    "Home Lon",
    "Work Block",
    "Work Lat",
    "Work Lon",
    "Distance [mi]",
];

pub const MISS_HEADERS: [&str; 3] = ["Home Block", "Work Block", "Reason"];

/// Destination for a worker's finished batch.
///
/// Called once per worker from the blocking pool.
pub trait ResultSink: Send + Sync + 'static {
    type Receipt: Send + 'static;

    fn persist(&self, batch: &WorkerBatch) -> Result<Self::Receipt>;
}

/// Run timestamp shared by all workers' file names
pub fn run_stamp(now: DateTime<Local>) -> String {
    now.format("%Y%m%d-%H%M").to_string()
}

/// Write hits as CSV, header row included even when empty
pub fn write_hits<W: Write>(writer: W, hits: &[Hit]) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(writer);
    writer.write_record(HIT_HEADERS)?;
    for hit in hits {
        writer.serialize(hit)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write misses as CSV, header row included even when empty
pub fn write_misses<W: Write>(writer: W, misses: &[Miss]) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(writer);
    writer.write_record(MISS_HEADERS)?;
    for miss in misses {
        writer.serialize(miss)?;
    }
    writer.flush()?;
    Ok(())
}

/// Paths written for one worker
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedFiles {
    pub hits: PathBuf,
    pub misses: PathBuf,
}

/// Writes `commutes{stamp}-worker-{id}.csv` and `missedBlocks{stamp}-worker-{id}.csv`
#[derive(Debug, Clone)]
pub struct CsvSink {
    dir: PathBuf,
    stamp: String,
}

impl CsvSink {
    pub fn new(dir: impl Into<PathBuf>, stamp: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            stamp: stamp.into(),
        }
    }

    pub fn hits_path(&self, worker_id: WorkerId) -> PathBuf {
        self.dir
            .join(format!("commutes{}-worker-{}.csv", self.stamp, worker_id))
    }

    pub fn misses_path(&self, worker_id: WorkerId) -> PathBuf {
        self.dir
            .join(format!("missedBlocks{}-worker-{}.csv", self.stamp, worker_id))
    }
}

impl ResultSink for CsvSink {
    type Receipt = PersistedFiles;

    fn persist(&self, batch: &WorkerBatch) -> Result<PersistedFiles> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create output directory {:?}", self.dir))?;

        let hits = self.hits_path(batch.worker_id);
        let file = File::create(&hits).with_context(|| format!("Failed to create {:?}", hits))?;
        write_hits(file, &batch.hits).with_context(|| format!("Failed to write {:?}", hits))?;

        let misses = self.misses_path(batch.worker_id);
        let file =
            File::create(&misses).with_context(|| format!("Failed to create {:?}", misses))?;
        write_misses(file, &batch.misses)
            .with_context(|| format!("Failed to write {:?}", misses))?;

        info!(
            "Worker {} wrote {} hits to {:?} and {} misses to {:?}",
            batch.worker_id,
            batch.hits.len(),
            hits,
            batch.misses.len(),
            misses
        );

        Ok(PersistedFiles { hits, misses })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MissReason;
    use chrono::TimeZone;

    #[test]
    fn test_run_stamp_format() {
        let now = Local.with_ymd_and_hms(2020, 1, 16, 9, 5, 59).unwrap();
        assert_eq!(run_stamp(now), "20200116-0905");
    }

    #[test]
    fn test_empty_sets_still_have_headers() {
        let mut hits = Vec::new();
        write_hits(&mut hits, &[]).unwrap();
        assert_eq!(
            String::from_utf8(hits).unwrap(),
            "Home Block,Home Lat,Home Lon,Work Block,Work Lat,Work Lon,Distance [mi]\n"
        );

        let mut misses = Vec::new();
        write_misses(&mut misses, &[]).unwrap();
        assert_eq!(String::from_utf8(misses).unwrap(), "Home Block,Work Block,Reason\n");
    }

    #[test]
    fn test_miss_rows() {
        let mut out = Vec::new();
        write_misses(
            &mut out,
            &[Miss {
                origin: "060010001".into(),
                destination: "060010002".into(),
                reason: MissReason::UnknownCode,
            }],
        )
        .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().nth(1), Some("060010001,060010002,unknown_code"));
    }

    #[test]
    fn test_hit_rows_keep_column_order() {
        let mut out = Vec::new();
        write_hits(
            &mut out,
            &[Hit {
                origin: "060010001".into(),
                origin_lat: 34.0,
                origin_lon: -118.0,
                destination: "060370002".into(),
                destination_lat: 34.5,
                destination_lon: -118.25,
                distance_miles: 1.0,
            }],
        )
        .unwrap();

        let mut reader = csv::Reader::from_reader(out.as_slice());
        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(&row[0], "060010001");
        assert_eq!(row[1].parse::<f64>().unwrap(), 34.0);
        assert_eq!(row[2].parse::<f64>().unwrap(), -118.0);
        assert_eq!(&row[3], "060370002");
        assert_eq!(row[5].parse::<f64>().unwrap(), -118.25);
        assert_eq!(row[6].parse::<f64>().unwrap(), 1.0);
    }

    #[test]
    fn test_csv_sink_file_names() {
        let sink = CsvSink::new("results", "20200116-0905");
        assert_eq!(
            sink.hits_path(3),
            PathBuf::from("results/commutes20200116-0905-worker-3.csv")
        );
        assert_eq!(
            sink.misses_path(3),
            PathBuf::from("results/missedBlocks20200116-0905-worker-3.csv")
        );
    }

    #[test]
    fn test_csv_sink_persists_both_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let sink = CsvSink::new(dir.path().join("results"), "20200116-0905");
        let batch = WorkerBatch {
            worker_id: 0,
            range: 0..1,
            hits: Vec::new(),
            misses: vec![Miss {
                origin: "a".into(),
                destination: "b".into(),
                reason: MissReason::NoRouteFound,
            }],
        };

        let files = sink.persist(&batch).unwrap();
        assert!(files.hits.exists());
        let misses = fs::read_to_string(&files.misses).unwrap();
        assert_eq!(misses, "Home Block,Work Block,Reason\na,b,no_route_found\n");
    }
}
