use serde::{Deserialize, Serialize};

/// Geographic coordinate in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Origin/destination pair from the commute batch
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommutePair {
    pub origin: String,
    pub destination: String,
}

impl CommutePair {
    pub fn new(origin: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
        }
    }
}

/// One row of a region's coordinate table
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateRecord {
    pub code: String,
    pub lat: f64,
    pub lon: f64,
}

impl CoordinateRecord {
    pub fn new(code: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            code: code.into(),
            lat,
            lon,
        }
    }

    pub fn lat_lon(&self) -> LatLon {
        LatLon::new(self.lat, self.lon)
    }
}

/// Resolved and routed commute. Field order matches the hits file columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hit {
    pub origin: String,
    pub origin_lat: f64,
    pub origin_lon: f64,
    pub destination: String,
    pub destination_lat: f64,
    pub destination_lon: f64,
    pub distance_miles: f64,
}

/// Why a pair ended up in the misses file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissReason {
    UnknownRegion,
    UnknownCode,
    RoutingUnavailable,
    NoRouteFound,
}

impl MissReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissReason::UnknownRegion => "unknown_region",
            MissReason::UnknownCode => "unknown_code",
            MissReason::RoutingUnavailable => "routing_unavailable",
            MissReason::NoRouteFound => "no_route_found",
        }
    }
}

/// Pair that could not be resolved or routed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Miss {
    pub origin: String,
    pub destination: String,
    pub reason: MissReason,
}

/// Outcome of processing a single pair
#[derive(Debug, Clone, PartialEq)]
pub enum CommuteResult {
    Hit(Hit),
    Miss(Miss),
}
