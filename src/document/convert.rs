//! Conversion from a parsed `scraper` document into the owned tree
//!
//! Cleaning happens during conversion: ignored elements are never copied,
//! navigation widgets are copied into their own list instead of the content
//! tree, crawl marks are set from the configured selectors, and every `href`
//! and `src` is made absolute against the page URL.

use crate::document::{ElementNode, Node};
use scraper::{ElementRef, Selector};
use url::Url;

/// Elements that never carry readable content
const ALWAYS_DROPPED: &[&str] = &["script", "style", "noscript", "template"];

/// Compiled selectors applied while converting a page
#[derive(Debug, Clone, Default)]
pub struct ConvertRules {
    pub ignored: Vec<Selector>,
    pub navigation: Vec<Selector>,
    pub non_recursive: Vec<Selector>,
    pub fragments: Vec<Selector>,
}

/// Result of converting a content root
#[derive(Debug, Clone)]
pub struct Converted {
    /// The cleaned content tree
    pub content: Node,

    /// Navigation widgets found inside the content root, in document order
    pub navigation: Vec<Node>,
}

impl ConvertRules {
    pub(crate) fn is_ignored(&self, element: &ElementRef) -> bool {
        ALWAYS_DROPPED.contains(&element.value().name())
            || self.ignored.iter().any(|s| s.matches(element))
    }

    pub(crate) fn is_navigation(&self, element: &ElementRef) -> bool {
        self.navigation.iter().any(|s| s.matches(element))
    }

    fn is_non_recursive(&self, element: &ElementRef) -> bool {
        self.non_recursive.iter().any(|s| s.matches(element))
    }

    fn is_fragment(&self, element: &ElementRef) -> bool {
        self.fragments.iter().any(|s| s.matches(element))
    }
}

/// Converts `root` and its descendants, detaching navigation widgets
///
/// The root element itself is always converted, even if it matches a
/// navigation or ignored selector.
pub fn convert_element(root: ElementRef, base_url: &Url, rules: &ConvertRules) -> Converted {
    let mut navigation = Vec::new();
    let content = convert_node(root, base_url, rules, false, Some(&mut navigation));
    Converted {
        content,
        navigation,
    }
}

/// Converts a navigation widget found outside the content root
pub(crate) fn convert_widget(widget: ElementRef, base_url: &Url, rules: &ConvertRules) -> Node {
    convert_node(widget, base_url, rules, false, None)
}

fn convert_node(
    element: ElementRef,
    base_url: &Url,
    rules: &ConvertRules,
    inherited_no_follow: bool,
    mut navigation: Option<&mut Vec<Node>>,
) -> Node {
    let value = element.value();
    let mut node = ElementNode::new(value.name());
    node.no_follow = inherited_no_follow || rules.is_non_recursive(&element);
    node.fragment = rules.is_fragment(&element);

    for (name, raw) in value.attrs() {
        let resolved = match name {
            "href" | "src" => absolutize(raw, base_url),
            _ => raw.to_string(),
        };
        node.attributes.push((name.to_string(), resolved));
    }

    for child in element.children() {
        match child.value() {
            scraper::Node::Text(text) => node.children.push(Node::text(&**text)),
            scraper::Node::Element(_) => {
                let Some(child_element) = ElementRef::wrap(child) else {
                    continue;
                };

                if rules.is_ignored(&child_element) {
                    continue;
                }

                // Navigation widgets are detached; nested widgets stay inside their parent widget
                if let Some(widgets) = navigation.as_deref_mut() {
                    if rules.is_navigation(&child_element) {
                        widgets.push(convert_node(
                            child_element,
                            base_url,
                            rules,
                            false,
                            None,
                        ));
                        continue;
                    }
                }

                node.children.push(convert_node(
                    child_element,
                    base_url,
                    rules,
                    node.no_follow,
                    navigation.as_deref_mut(),
                ));
            }
            _ => {}
        }
    }

    Node::Element(node)
}

/// Makes an href/src absolute; references that do not resolve to HTTP(S) are kept verbatim
fn absolutize(raw: &str, base_url: &Url) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return raw.to_string();
    }

    match base_url.join(trimmed) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => url.to_string(),
        _ => raw.to_string(),
    }
}
