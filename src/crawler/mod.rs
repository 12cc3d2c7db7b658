//! Crawler module for recursive page harvesting
//!
//! This module contains the core harvesting logic, including:
//! - HTTP fetching and form login
//! - Site profiles describing where content and navigation live
//! - Content hashing for duplicate suppression
//! - Embedding linked pages and saving images
//! - The recursive traversal engine

mod engine;
mod fetcher;
mod hasher;
mod images;
mod profile;

pub mod embed;

pub use embed::{END_MARKER, START_MARKER};
pub use engine::Harvester;
pub use fetcher::{build_http_client, fetch_url, FetchResult, Fetcher, HttpFetcher};
pub use hasher::{fragment_hash, fragment_key, ContentHash};
pub use images::{image_filename, ImageHarvester, ImageLedger, ImageReport, IMAGE_TOKEN};
pub use profile::{SelectorProfile, SiteProfile};

use crate::config::Config;
use crate::output::HarvestStats;
use crate::Result;

/// Runs a complete harvest
///
/// This is the main entry point for a harvest. It will:
/// 1. Build the HTTP client and log in if configured
/// 2. Walk every crawl root, embedding linked pages up to the maximum depth
/// 3. Append one document per root to that root's artifact
///
/// # Returns
///
/// * `Ok(HarvestStats)` - Harvest completed
/// * `Err(HarvestError)` - Login failed or the artifact could not be written
pub async fn harvest(config: Config) -> Result<HarvestStats> {
    Harvester::connect(config).await?.run().await
}
