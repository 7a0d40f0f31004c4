use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use log::{info, warn};
use reqwest::blocking::Client;
use serde::Serialize;
use skyrelay_engine::config::{EngineConfig, FeedHour};
use skyrelay_engine::data::parse_feed;
use skyrelay_engine::GeoPoint;

#[derive(Debug, Serialize)]
struct SnapshotMetadata {
    source_url: String,
    hour: FeedHour,
    entries: usize,
    malformed_entries: usize,
    fetched_at_epoch: u64,
}

fn main() -> Result<()> {
    env_logger::init();

    let mut config = EngineConfig::from_env().context("invalid SKYRELAY_* configuration")?;
    if let Some(arg) = std::env::args().nth(1) {
        let hour: u8 = arg
            .parse()
            .with_context(|| format!("hour argument {arg:?} is not a number"))?;
        config.hour = FeedHour::new(hour)?;
    }

    let client = Client::builder()
        .user_agent("skyrelay-feed-fetcher/0.1")
        .build()?;

    let url = config.feed_url();
    info!("Fetching position snapshot from {url}");
    let body = client
        .get(&url)
        .send()
        .with_context(|| format!("failed to query {url}"))?
        .error_for_status()
        .context("feed returned an error status")?
        .text()
        .context("failed to read feed body")?;

    let points = parse_feed(&body).context("failed to decode feed payload")?;
    let malformed_entries = points.iter().filter(|p| !p.is_finite()).count();
    if points.is_empty() {
        warn!("Snapshot for hour {} is empty", config.hour);
    }

    let output_dir = PathBuf::from("data");
    fs::create_dir_all(&output_dir).context("failed to create data output directory")?;

    let feed_path = output_dir.join(format!("feed_{}.json", config.hour));
    let triples: Vec<[Option<f64>; 3]> = points.iter().map(to_triple).collect();
    fs::write(&feed_path, serde_json::to_vec(&triples)?)
        .with_context(|| format!("failed to write snapshot to {}", feed_path.display()))?;

    let metadata = SnapshotMetadata {
        source_url: url,
        hour: config.hour,
        entries: points.len(),
        malformed_entries,
        fetched_at_epoch: current_epoch_seconds(),
    };
    let metadata_path = output_dir.join(format!("feed_{}.meta.json", config.hour));
    fs::write(&metadata_path, serde_json::to_vec_pretty(&metadata)?)
        .with_context(|| format!("failed to write metadata to {}", metadata_path.display()))?;

    info!(
        "Wrote {} ({} entries, {} malformed)",
        feed_path.display(),
        metadata.entries,
        metadata.malformed_entries
    );

    Ok(())
}

/// Strict JSON has no NaN, so non-finite components are stored as `null`.
fn to_triple(p: &GeoPoint) -> [Option<f64>; 3] {
    [p.lat, p.lon, p.altitude_km].map(|c| c.is_finite().then_some(c))
}

fn current_epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
