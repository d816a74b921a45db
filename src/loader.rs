//! Reading the commute batch and the per-region coordinate files

use crate::models::{CommutePair, CoordinateRecord};
use crate::resolver::{CoordinateTable, RegionKeyRule};
use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Column names of the commute batch CSV
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputColumns {
    pub origin: String,
    pub destination: String,
}

impl Default for InputColumns {
    fn default() -> Self {
        Self {
            origin: "h_geocode".to_string(),
            destination: "w_geocode".to_string(),
        }
    }
}

/// Column names of a region coordinate file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableColumns {
    pub code: String,
    pub lat: String,
    pub lon: String,
}

impl Default for TableColumns {
    fn default() -> Self {
        Self {
            code: "GEOID10".to_string(),
            lat: "INTPTLAT10".to_string(),
            lon: "INTPTLON10".to_string(),
        }
    }
}

fn column_index(headers: &StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .with_context(|| format!("Column {:?} not found in header {:?}", name, headers))
}

/// Read commute pairs, keeping file order. Empty codes are kept and will
/// end up as misses.
pub fn read_pairs<R: Read>(reader: R, columns: &InputColumns) -> Result<Vec<CommutePair>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let headers = reader.headers()?.clone();
    let origin = column_index(&headers, &columns.origin)?;
    let destination = column_index(&headers, &columns.destination)?;

    let mut pairs = Vec::new();
    for (i, row) in reader.records().enumerate() {
        let row = row.with_context(|| format!("Malformed commute row {}", i + 1))?;
        pairs.push(CommutePair::new(
            row.get(origin).unwrap_or_default().trim(),
            row.get(destination).unwrap_or_default().trim(),
        ));
    }

    Ok(pairs)
}

pub fn load_pairs(path: &Path, columns: &InputColumns) -> Result<Vec<CommutePair>> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let pairs = read_pairs(file, columns).with_context(|| format!("Failed to read {:?}", path))?;
    info!("Parsed {} commute pairs from {:?}", pairs.len(), path);
    Ok(pairs)
}

/// Read one region's coordinate records
pub fn read_region<R: Read>(reader: R, columns: &TableColumns) -> Result<Vec<CoordinateRecord>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let headers = reader.headers()?.clone();
    let code = column_index(&headers, &columns.code)?;
    let lat = column_index(&headers, &columns.lat)?;
    let lon = column_index(&headers, &columns.lon)?;

    let mut records = Vec::new();
    for (i, row) in reader.records().enumerate() {
        let row = row.with_context(|| format!("Malformed coordinate row {}", i + 1))?;
        let parse = |idx: usize, name: &str| -> Result<f64> {
            let raw = row.get(idx).unwrap_or_default().trim();
            raw.parse::<f64>()
                .with_context(|| format!("Row {}: {} {:?} is not a number", i + 1, name, raw))
        };
        records.push(CoordinateRecord::new(
            row.get(code).unwrap_or_default().trim(),
            parse(lat, columns.lat.as_str())?,
            parse(lon, columns.lon.as_str())?,
        ));
    }

    Ok(records)
}

/// Coordinate file for a region: `<dir>/<region>.csv`.
///
/// Only ASCII alphanumeric keys map to a file; any other key (path
/// separators, `..`) has none.
pub fn region_path(dir: &Path, region: &str) -> Option<PathBuf> {
    if region.is_empty() || !region.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(dir.join(format!("{}.csv", region)))
}

/// Region keys referenced by either end of any pair
pub fn region_keys(pairs: &[CommutePair], rule: RegionKeyRule) -> BTreeSet<String> {
    pairs
        .iter()
        .flat_map(|p| [p.origin.as_str(), p.destination.as_str()])
        .filter_map(|code| rule.extract(code))
        .map(str::to_string)
        .collect()
}

fn load_region_file(path: &Path, columns: &TableColumns) -> Result<Option<Vec<CoordinateRecord>>> {
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let records = read_region(file, columns).with_context(|| format!("Failed to read {:?}", path))?;
    Ok(Some(records))
}

/// Load the coordinate files of `regions` concurrently on the blocking pool.
///
/// A region without a file is skipped with a warning; its codes will resolve
/// as unknown regions. An unreadable or malformed file fails the load.
pub async fn load_coordinate_table(
    dir: &Path,
    regions: impl IntoIterator<Item = String>,
    rule: RegionKeyRule,
    columns: &TableColumns,
) -> Result<CoordinateTable> {
    let tasks: Vec<_> = regions
        .into_iter()
        .filter_map(|region| {
            let Some(path) = region_path(dir, &region) else {
                warn!("Region key {:?} is not a valid file name, skipping", region);
                return None;
            };
            let columns = columns.clone();
            let task = tokio::task::spawn_blocking({
                let path = path.clone();
                move || load_region_file(&path, &columns)
            });
            Some((region, path, task))
        })
        .collect();

    let mut table = CoordinateTable::new(rule);
    for (region, path, task) in tasks {
        match task.await.context("Region loader task failed")?? {
            Some(records) => {
                debug!("Region {}: {} records", region, records.len());
                table.insert_region(region, records);
            }
            None => warn!("No coordinate file for region {} at {:?}", region, path),
        }
    }

    info!(
        "Loaded {} coordinate records across {} regions",
        table.len(),
        table.region_count()
    );
    Ok(table)
}
