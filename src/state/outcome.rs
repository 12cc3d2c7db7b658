/// Outcome definitions for page visits
///
/// Every decision the traversal engine makes about a link ends in one of these
/// outcomes; they drive logging and the run statistics.
use std::fmt;

/// What happened when the engine considered a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageOutcome {
    // ===== Success =====
    /// Page markup was fetched
    Fetched,

    /// Page content replaced the link that pointed to it
    Embedded,

    /// Navigation widget written to the artifact
    NavigationEmitted,

    /// Navigation target fetched through the side channel and written to the artifact
    NavigationExpanded,

    // ===== Skips =====
    /// Page is deeper than the configured maximum depth
    DepthExceeded,

    /// Page was already dispatched in this context
    AlreadyVisited,

    /// Structural fragment dropped because its links were already seen
    FragmentSuppressed,

    // ===== Failures =====
    /// Fetcher reported a failure (status, content type, timeout, network)
    FetchFailed,

    /// Markup had no element matching a content selector
    NoContent,
}

impl PageOutcome {
    /// Returns true if the page contributed content to the artifact
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Self::Fetched | Self::Embedded | Self::NavigationEmitted | Self::NavigationExpanded
        )
    }

    /// Returns true if the page was skipped without a fetch attempt
    pub fn is_skipped(&self) -> bool {
        matches!(
            self,
            Self::DepthExceeded | Self::AlreadyVisited | Self::FragmentSuppressed
        )
    }

    /// Returns true if the page was attempted but yielded nothing
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::FetchFailed | Self::NoContent)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetched => "fetched",
            Self::Embedded => "embedded",
            Self::NavigationEmitted => "navigation_emitted",
            Self::NavigationExpanded => "navigation_expanded",
            Self::DepthExceeded => "depth_exceeded",
            Self::AlreadyVisited => "already_visited",
            Self::FragmentSuppressed => "fragment_suppressed",
            Self::FetchFailed => "fetch_failed",
            Self::NoContent => "no_content",
        }
    }
}

impl fmt::Display for PageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
