//! Run statistics
//!
//! Counters are updated from page outcomes and image reports as the harvest
//! proceeds, and printed once the run finishes.

use crate::crawler::ImageReport;
use crate::state::PageOutcome;
use chrono::{DateTime, Utc};

/// Harvest statistics summary
#[derive(Debug, Clone)]
pub struct HarvestStats {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    /// Crawl roots processed
    pub roots: u64,

    /// Artifact entries written, root documents and navigation entries alike
    pub entries_written: u64,

    pub pages_fetched: u64,
    pub pages_embedded: u64,
    pub fetch_failures: u64,
    pub no_content: u64,
    pub depth_exceeded: u64,
    pub already_visited: u64,
    pub navigation_emitted: u64,
    pub navigation_expanded: u64,
    pub fragments_suppressed: u64,

    pub images_saved: u64,
    pub image_failures: u64,
}

impl HarvestStats {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            roots: 0,
            entries_written: 0,
            pages_fetched: 0,
            pages_embedded: 0,
            fetch_failures: 0,
            no_content: 0,
            depth_exceeded: 0,
            already_visited: 0,
            navigation_emitted: 0,
            navigation_expanded: 0,
            fragments_suppressed: 0,
            images_saved: 0,
            image_failures: 0,
        }
    }

    pub fn record(&mut self, outcome: PageOutcome) {
        let counter = match outcome {
            PageOutcome::Fetched => &mut self.pages_fetched,
            PageOutcome::Embedded => &mut self.pages_embedded,
            PageOutcome::NavigationEmitted => &mut self.navigation_emitted,
            PageOutcome::NavigationExpanded => &mut self.navigation_expanded,
            PageOutcome::DepthExceeded => &mut self.depth_exceeded,
            PageOutcome::AlreadyVisited => &mut self.already_visited,
            PageOutcome::FragmentSuppressed => &mut self.fragments_suppressed,
            PageOutcome::FetchFailed => &mut self.fetch_failures,
            PageOutcome::NoContent => &mut self.no_content,
        };
        *counter += 1;
    }

    pub fn record_images(&mut self, report: &ImageReport) {
        self.images_saved += report.saved;
        self.image_failures += report.failed;
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }
}

impl Default for HarvestStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &HarvestStats) {
    println!("=== Harvest Statistics ===\n");

    println!("Run:");
    println!("  Started: {}", stats.started_at.to_rfc3339());
    if let Some(finished) = stats.finished_at {
        println!("  Finished: {}", finished.to_rfc3339());
    }
    if let Some(duration) = stats.duration_seconds() {
        println!("  Duration: {} seconds", duration);
    }
    println!("  Crawl roots: {}", stats.roots);
    println!("  Artifact entries written: {}", stats.entries_written);
    println!();

    println!("Pages:");
    println!("  Fetched: {}", stats.pages_fetched);
    println!("  Embedded: {}", stats.pages_embedded);
    println!("  Fetch failures: {}", stats.fetch_failures);
    println!("  Without content: {}", stats.no_content);
    println!("  Skipped (depth): {}", stats.depth_exceeded);
    println!("  Skipped (visited): {}", stats.already_visited);
    println!();

    println!("Navigation:");
    println!("  Widgets emitted: {}", stats.navigation_emitted);
    println!("  Pages expanded: {}", stats.navigation_expanded);
    println!("  Fragments suppressed: {}", stats.fragments_suppressed);
    println!();

    println!("Images:");
    println!("  Saved: {}", stats.images_saved);
    println!("  Failed: {}", stats.image_failures);
}
