//! Check that the routing engine answers before starting a long batch
//!
//! Usage:
//!   cargo run --bin probe_backend -- --from 34.0522,-118.2437 --to 34.1478,-118.1445

use anyhow::{Context, Result};
use clap::Parser;
use commute_distance::config::{log_filter, DEFAULT_BACKEND_URL, DEFAULT_PROFILE};
use commute_distance::models::LatLon;
use commute_distance::routing::{meters_to_miles, DistanceBackend, OsrmClient};
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "probe_backend")]
#[command(about = "Query one driving distance from the routing engine")]
struct Args {
    /// Routing engine base URL
    #[arg(long, default_value = DEFAULT_BACKEND_URL)]
    osrm_url: String,

    #[arg(long, default_value = DEFAULT_PROFILE)]
    profile: String,

    /// Origin as lat,lon
    #[arg(long, allow_hyphen_values = true, value_parser = parse_lat_lon)]
    from: LatLon,

    /// Destination as lat,lon
    #[arg(long, allow_hyphen_values = true, value_parser = parse_lat_lon)]
    to: LatLon,

    /// Timeout in seconds
    #[arg(long, default_value = "10")]
    timeout: u64,
}

fn parse_lat_lon(s: &str) -> Result<LatLon, String> {
    let (lat, lon) = s
        .split_once(',')
        .ok_or_else(|| format!("expected lat,lon but got {:?}", s))?;
    let lat = lat.trim().parse::<f64>().map_err(|e| format!("latitude: {}", e))?;
    let lon = lon.trim().parse::<f64>().map_err(|e| format!("longitude: {}", e))?;
    Ok(LatLon::new(lat, lon))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .init();

    let args = Args::parse();
    let client = OsrmClient::new(&args.osrm_url, &args.profile, Duration::from_secs(args.timeout))?;

    info!("Querying {}", client.route_url(args.from, args.to));
    let meters = client
        .query_distance(args.from, args.to)
        .await
        .context("Routing backend did not return a distance")?;

    info!("Distance: {:.1} m ({:.3} mi)", meters, meters_to_miles(meters));
    Ok(())
}
