//! Coordinate lookup for location codes
//!
//! Codes are sharded by region key so a lookup only scans the records of
//! one region, never the whole table.

use crate::error::CommuteError;
use crate::models::{CoordinateRecord, LatLon};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Length of the region key when it is a plain prefix (state FIPS, e.g. "06")
pub const DEFAULT_REGION_KEY_LEN: usize = 2;

/// Where the region key sits inside a location code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionKeyRule {
    pub offset: usize,
    pub len: usize,
}

impl RegionKeyRule {
    pub fn prefix(len: usize) -> Self {
        Self { offset: 0, len }
    }

    /// Region key of `code`, or `None` if the code is too short
    pub fn extract<'a>(&self, code: &'a str) -> Option<&'a str> {
        let end = self.offset.checked_add(self.len)?;
        code.get(self.offset..end)
    }
}

impl Default for RegionKeyRule {
    fn default() -> Self {
        Self::prefix(DEFAULT_REGION_KEY_LEN)
    }
}

/// Records of one region, indexed by code
#[derive(Debug, Clone, Default)]
struct Region {
    records: Vec<CoordinateRecord>,
    /// code -> index of its first record
    index: HashMap<String, usize>,
}

impl Region {
    fn push(&mut self, record: CoordinateRecord) {
        self.index
            .entry(record.code.clone())
            .or_insert(self.records.len());
        self.records.push(record);
    }

    fn get(&self, code: &str) -> Option<&CoordinateRecord> {
        self.index.get(code).map(|&i| &self.records[i])
    }
}

/// Read-only region -> records table shared by every worker
#[derive(Debug, Clone, Default)]
pub struct CoordinateTable {
    rule: RegionKeyRule,
    regions: HashMap<String, Region>,
}

impl CoordinateTable {
    pub fn new(rule: RegionKeyRule) -> Self {
        Self {
            rule,
            regions: HashMap::new(),
        }
    }

    /// Build a table by sharding `records` on their region key
    pub fn from_records(
        rule: RegionKeyRule,
        records: impl IntoIterator<Item = CoordinateRecord>,
    ) -> Self {
        let mut table = Self::new(rule);
        for record in records {
            table.insert(record);
        }
        table
    }

    /// Append a record to its region. Returns false if the code carries no
    /// region key, in which case the record is dropped.
    pub fn insert(&mut self, record: CoordinateRecord) -> bool {
        let Some(key) = self.rule.extract(&record.code) else {
            debug!("Dropping coordinate record with short code {:?}", record.code);
            return false;
        };
        self.regions
            .entry(key.to_string())
            .or_default()
            .push(record);
        true
    }

    /// Append a whole region's records under `region`
    pub fn insert_region(&mut self, region: impl Into<String>, records: Vec<CoordinateRecord>) {
        let region = self.regions.entry(region.into()).or_default();
        for record in records {
            region.push(record);
        }
    }

    /// Look up the coordinates of `code`.
    ///
    /// When a region lists the same code twice, the record inserted first
    /// wins.
    pub fn resolve(&self, code: &str) -> Result<LatLon, CommuteError> {
        let region = self.rule.extract(code).ok_or_else(|| CommuteError::UnknownRegion {
            code: code.to_string(),
            region: String::new(),
        })?;

        let records = self
            .regions
            .get(region)
            .ok_or_else(|| CommuteError::UnknownRegion {
                code: code.to_string(),
                region: region.to_string(),
            })?;

        records
            .get(code)
            .map(CoordinateRecord::lat_lon)
            .ok_or_else(|| CommuteError::UnknownCode {
                code: code.to_string(),
                region: region.to_string(),
            })
    }

    pub fn contains_region(&self, region: &str) -> bool {
        self.regions.contains_key(region)
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Total number of records across all regions
    pub fn len(&self) -> usize {
        self.regions.values().map(|r| r.records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.values().all(|r| r.records.is_empty())
    }
}
