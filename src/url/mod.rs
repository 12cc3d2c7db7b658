//! URL handling for the harvester
//!
//! This module provides link resolution against the containing page, URL
//! normalization for the visited-set key, and the domain allow-list that decides
//! which links may be followed.

mod normalize;
mod resolve;

use url::Url;

pub use normalize::{normalize_parsed, normalize_url, visit_key};
pub use resolve::{is_same_page, resolve_link};

/// Extracts the lowercase host of a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use kb_harvester::url::extract_domain;
///
/// let url = Url::parse("https://KB.Example.com:8443/display/DOCS").unwrap();
/// assert_eq!(extract_domain(&url), Some("kb.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Checks if a domain matches a wildcard pattern
///
/// `"kb.example.com"` matches only itself; `"*.example.com"` matches the bare
/// domain and any subdomain at any depth.
///
/// # Examples
///
/// ```
/// use kb_harvester::url::matches_wildcard;
///
/// assert!(matches_wildcard("*.example.com", "example.com"));
/// assert!(matches_wildcard("*.example.com", "wiki.eng.example.com"));
/// assert!(!matches_wildcard("*.example.com", "notexample.com"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base || candidate.ends_with(&format!(".{}", base))
    } else {
        candidate == pattern
    }
}

/// The set of hosts links may be followed into
#[derive(Debug, Clone)]
pub struct DomainScope {
    patterns: Vec<String>,
}

impl DomainScope {
    /// Builds a scope from exact or `*.` wildcard patterns
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| p.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Returns true if the URL is HTTP(S) and its host is on the allow-list
    pub fn permits(&self, url: &Url) -> bool {
        if url.scheme() != "http" && url.scheme() != "https" {
            return false;
        }

        match extract_domain(url) {
            Some(domain) => self.permits_domain(&domain),
            None => false,
        }
    }

    /// Returns true if the (lowercase) domain matches any pattern
    pub fn permits_domain(&self, domain: &str) -> bool {
        self.patterns.iter().any(|p| matches_wildcard(p, domain))
    }
}
