//! State module for tracking harvest progress
//!
//! # Components
//!
//! - `PageOutcome`: what happened to each page the engine considered
//! - `CrawlContext`: the visited set, dedup hash sets and image ledger of one crawl root
//! - `RecheckPolicy`: when a visited page may be fetched again at a shallower depth

mod context;
mod outcome;

// Re-export main types
pub use context::{CrawlContext, RecheckPolicy};
pub use outcome::PageOutcome;
