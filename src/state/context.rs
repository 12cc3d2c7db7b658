//! Per-root crawl context
//!
//! Owns every set the traversal mutates: visited URLs, seen fragment and
//! navigation hashes, and the image ledger. It also buffers the navigation
//! entries produced under a root until the root entry has been written. The
//! engine passes it down the recursion as `&mut`, so check-and-mark is never
//! interleaved.

use crate::crawler::{ContentHash, ImageLedger};
use crate::output::{ArtifactEntry, HarvestStats};
use crate::state::PageOutcome;
use std::collections::{HashMap, HashSet};

/// When a visited URL may be dispatched again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecheckPolicy {
    /// Re-fetch is allowed only below this depth, and only at a depth shallower
    /// than every earlier dispatch of the same URL
    pub below_depth: Option<u32>,
}

impl RecheckPolicy {
    pub fn never() -> Self {
        Self { below_depth: None }
    }

    pub fn below(depth: u32) -> Self {
        Self {
            below_depth: Some(depth),
        }
    }

    fn allows(&self, depth: u32, previous: u32) -> bool {
        matches!(self.below_depth, Some(limit) if depth < limit && depth < previous)
    }
}

/// Mutable state shared by all recursive calls under one crawl root
#[derive(Debug)]
pub struct CrawlContext {
    /// Normalized URL -> shallowest depth at which it was dispatched
    visited: HashMap<String, u32>,
    fragment_hashes: HashSet<ContentHash>,
    navigation_hashes: HashSet<ContentHash>,
    images: ImageLedger,
    side_entries: Vec<ArtifactEntry>,
    policy: RecheckPolicy,
    stats: HarvestStats,
}

impl CrawlContext {
    pub fn new(policy: RecheckPolicy) -> Self {
        Self {
            visited: HashMap::new(),
            fragment_hashes: HashSet::new(),
            navigation_hashes: HashSet::new(),
            images: ImageLedger::default(),
            side_entries: Vec::new(),
            policy,
            stats: HarvestStats::new(),
        }
    }

    /// Marks `url` as dispatched at `depth`
    ///
    /// Returns false if the URL was already dispatched and the recheck policy
    /// does not allow fetching it again. Entries are never removed.
    pub fn try_mark_visited(&mut self, url: &str, depth: u32) -> bool {
        match self.visited.get_mut(url) {
            None => {
                self.visited.insert(url.to_string(), depth);
                true
            }
            Some(previous) => {
                if self.policy.allows(depth, *previous) {
                    *previous = depth;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains_key(url)
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Records a fragment hash; returns true the first time it is seen
    pub fn record_fragment(&mut self, hash: ContentHash) -> bool {
        self.fragment_hashes.insert(hash)
    }

    /// Records a navigation widget hash; returns true the first time it is seen
    pub fn record_navigation(&mut self, hash: ContentHash) -> bool {
        self.navigation_hashes.insert(hash)
    }

    pub fn images_mut(&mut self) -> &mut ImageLedger {
        &mut self.images
    }

    /// Buffers a navigation entry for the current root's artifact
    pub fn queue_entry(&mut self, entry: ArtifactEntry) {
        self.side_entries.push(entry);
    }

    /// Drains the buffered entries in the order they were queued
    pub fn take_entries(&mut self) -> Vec<ArtifactEntry> {
        std::mem::take(&mut self.side_entries)
    }

    pub fn record(&mut self, outcome: PageOutcome) {
        self.stats.record(outcome);
    }

    pub fn stats(&self) -> &HarvestStats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut HarvestStats {
        &mut self.stats
    }

    /// Starts a new crawl root: clears every set but keeps the run statistics
    pub fn reset(&mut self) {
        self.visited.clear();
        self.fragment_hashes.clear();
        self.navigation_hashes.clear();
        self.images = ImageLedger::default();
        self.side_entries.clear();
    }

    pub fn into_stats(self) -> HarvestStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_visit_marks() {
        let mut ctx = CrawlContext::new(RecheckPolicy::never());
        assert!(ctx.try_mark_visited("https://kb.example.com/a", 1));
        assert!(ctx.is_visited("https://kb.example.com/a"));
        assert!(!ctx.try_mark_visited("https://kb.example.com/a", 1));
        assert!(!ctx.try_mark_visited("https://kb.example.com/a", 0));
        assert_eq!(ctx.visited_count(), 1);
    }

    #[test]
    fn test_recheck_only_shallower_and_below_threshold() {
        let mut ctx = CrawlContext::new(RecheckPolicy::below(2));
        assert!(ctx.try_mark_visited("https://kb.example.com/a", 3));

        // Deeper or equal never re-fetches
        assert!(!ctx.try_mark_visited("https://kb.example.com/a", 3));

        // Shallower but not below the threshold
        assert!(!ctx.try_mark_visited("https://kb.example.com/a", 2));

        // Shallower and below the threshold
        assert!(ctx.try_mark_visited("https://kb.example.com/a", 1));

        // Now recorded at depth 1, so depth 1 again is refused
        assert!(!ctx.try_mark_visited("https://kb.example.com/a", 1));
        assert!(ctx.try_mark_visited("https://kb.example.com/a", 0));
        assert!(!ctx.try_mark_visited("https://kb.example.com/a", 0));
    }

    #[test]
    fn test_hash_sets_report_first_sighting() {
        let mut ctx = CrawlContext::new(RecheckPolicy::never());
        let hash = ContentHash::of("https://kb.example.com/a");
        assert!(ctx.record_navigation(hash));
        assert!(!ctx.record_navigation(hash));

        // Fragment and navigation sets are independent
        assert!(ctx.record_fragment(hash));
        assert!(!ctx.record_fragment(hash));
    }

    #[test]
    fn test_reset_clears_sets_but_keeps_stats() {
        let mut ctx = CrawlContext::new(RecheckPolicy::never());
        ctx.try_mark_visited("https://kb.example.com/a", 0);
        ctx.record_navigation(ContentHash::of("x"));
        ctx.record(PageOutcome::Fetched);
        ctx.queue_entry(ArtifactEntry::new("Next", "https://kb.example.com/next", "body"));

        ctx.reset();

        assert!(!ctx.is_visited("https://kb.example.com/a"));
        assert!(ctx.record_navigation(ContentHash::of("x")));
        assert!(ctx.take_entries().is_empty());
        assert_eq!(ctx.stats().pages_fetched, 1);
    }

    #[test]
    fn test_queued_entries_drain_in_order() {
        let mut ctx = CrawlContext::new(RecheckPolicy::never());
        ctx.queue_entry(ArtifactEntry::new("Navigation: A", "https://kb.example.com/a", "nav"));
        ctx.queue_entry(ArtifactEntry::new("Next", "https://kb.example.com/next", "body"));

        let titles: Vec<String> = ctx.take_entries().into_iter().map(|e| e.title).collect();
        assert_eq!(titles, vec!["Navigation: A", "Next"]);
        assert!(ctx.take_entries().is_empty());
    }
}
