//! Output module for serializing harvested pages
//!
//! This module handles:
//! - Flattening resolved page trees into plain text
//! - Appending entries to the per-root text artifacts
//! - Recording run statistics

mod artifact;
mod flatten;
pub mod stats;

pub use artifact::{
    artifact_filename, format_entry, root_content, ArtifactEntry, ArtifactWriter, ENTRY_DELIMITER,
    ROOT_MARKER,
};
pub use flatten::{flatten, normalize_whitespace};
pub use stats::{print_statistics, HarvestStats};
