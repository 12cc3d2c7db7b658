//! Content hashing for duplicate suppression
//!
//! Navigation widgets and structural fragments are identified by the links
//! they contain rather than their markup, so the same menu rendered with
//! different classes or whitespace still hashes equal.

use crate::document::Node;
use crate::url::resolve_link;
use sha2::{Digest, Sha256};
use std::fmt;
use url::Url;

/// Truncated SHA-256 digest of a fragment key or image body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    pub fn of(text: &str) -> Self {
        Self::of_bytes(text.as_bytes())
    }

    pub fn of_bytes(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        let mut truncated = [0u8; 16];
        truncated.copy_from_slice(&digest[..16]);
        Self(truncated)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Resolved anchor targets of a subtree, one per line in document order
pub fn fragment_key(node: &Node, base_url: &Url) -> String {
    node.find_all("a")
        .into_iter()
        .filter_map(|anchor| anchor.attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .map(|url| url.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Hash of a subtree's link set; None if the subtree has no followable links
pub fn fragment_hash(node: &Node, base_url: &Url) -> Option<ContentHash> {
    let key = fragment_key(node, base_url);
    if key.is_empty() {
        None
    } else {
        Some(ContentHash::of(&key))
    }
}
