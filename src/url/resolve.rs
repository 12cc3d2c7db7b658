use crate::url::normalize_parsed;
use url::Url;

/// Resolves an href against the page that contains it
///
/// Returns None if the link cannot lead to another page:
/// - empty or fragment-only hrefs (same page anchors)
/// - `javascript:`, `mailto:`, `tel:` and `data:` references
/// - anything that is not HTTP(S) after resolution
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            Some(absolute)
        }
        _ => None,
    }
}

/// Returns true if both URLs name the same page once normalized
pub fn is_same_page(a: &Url, b: &Url) -> bool {
    match (normalize_parsed(a.clone()), normalize_parsed(b.clone())) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
