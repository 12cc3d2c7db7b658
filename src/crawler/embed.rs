//! Splicing a linked page's content in place of the anchor that pointed to it

use crate::document::{ElementNode, Node};
use url::Url;

/// Opens an embedded region; followed by the source URL
pub const START_MARKER: &str = "##START_LINKED_CONTENT_FROM:";

/// Closes an embedded region; followed by the source URL
pub const END_MARKER: &str = "##END_LINKED_CONTENT_FROM:";

/// Tag of the wrapper element produced by [`wrap`]
pub const EMBED_TAG: &str = "embedded";

/// Tag of marker lines; flattening emits their text on a line of its own
pub const MARKER_TAG: &str = "kb-marker";

/// A marker line node
pub fn marker(text: impl Into<String>) -> Node {
    ElementNode::new(MARKER_TAG).with_child(Node::text(text)).into()
}

/// Wraps a linked page's content between start and end markers naming `source`
pub fn wrap(content: Node, source: &Url) -> Node {
    ElementNode::new(EMBED_TAG)
        .with_attr("data-source", source.as_str())
        .with_child(marker(format!("{} {}", START_MARKER, source)))
        .with_child(content)
        .with_child(marker(format!("{} {}", END_MARKER, source)))
        .into()
}

/// Replaces the child at `index` with the wrapped content, returning the displaced anchor
pub fn embed(parent: &mut ElementNode, index: usize, content: Node, source: &Url) -> Node {
    parent.replace_child(index, wrap(content, source))
}
