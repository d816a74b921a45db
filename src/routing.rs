//! Driving-distance queries against an OSRM-compatible routing engine

use crate::error::CommuteError;
use crate::models::LatLon;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tracing::trace;

pub const METERS_PER_MILE: f64 = 1609.344;

/// Default per-request timeout for routing queries
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub fn meters_to_miles(meters: f64) -> f64 {
    meters / METERS_PER_MILE
}

/// Anything that can answer "how far is it to drive from A to B".
///
/// Implementations are shared by every worker, so they must be `Send + Sync`
/// and their futures `Send`.
pub trait DistanceBackend: Send + Sync {
    /// Driving distance in meters
    fn query_distance(
        &self,
        origin: LatLon,
        destination: LatLon,
    ) -> impl Future<Output = Result<f64, CommuteError>> + Send;
}

#[derive(Debug, Deserialize)]
struct RouteResponse {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    routes: Vec<Route>,
}

#[derive(Debug, Deserialize)]
struct Route {
    distance: f64,
}

// ============================================================================
// OSRM HTTP client
// ============================================================================

#[derive(Debug, Clone)]
pub struct OsrmClient {
    base_url: String,
    profile: String,
    client: reqwest::Client,
}

impl OsrmClient {
    pub fn new(base_url: &str, profile: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client for routing backend")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            profile: profile.to_string(),
            client,
        })
    }

    /// Route URL for a pair. OSRM takes coordinates as `lon,lat`.
    pub fn route_url(&self, origin: LatLon, destination: LatLon) -> String {
        format!(
            "{}/route/v1/{}/{},{};{},{}?steps=true",
            self.base_url, self.profile, origin.lon, origin.lat, destination.lon, destination.lat
        )
    }
}

impl DistanceBackend for OsrmClient {
    async fn query_distance(
        &self,
        origin: LatLon,
        destination: LatLon,
    ) -> Result<f64, CommuteError> {
        let url = self.route_url(origin, destination);
        trace!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CommuteError::RoutingUnavailable(e.to_string()))?;

        let status = response.status();
        let body = response.json::<RouteResponse>().await;

        if !status.is_success() {
            // OSRM answers unroutable pairs with 400 + code "NoRoute"
            if let Ok(RouteResponse { code: Some(code), .. }) = &body {
                if code == "NoRoute" {
                    return Err(CommuteError::NoRouteFound);
                }
            }
            return Err(CommuteError::RoutingUnavailable(format!("HTTP {}", status)));
        }

        let body = body.map_err(|e| {
            CommuteError::RoutingUnavailable(format!("invalid route response: {}", e))
        })?;

        body.routes
            .first()
            .map(|route| route.distance)
            .ok_or(CommuteError::NoRouteFound)
    }
}
