//! Site profiles: how to read a particular knowledge base's page layout
//!
//! A profile knows where the title and the main content live, which widgets
//! are navigation, and how non-anchor index items name their targets.

use crate::config::{compile_selector, SelectorConfig};
use crate::document::{
    convert_element, convert_widget, ConvertRules, Converted, ElementNode, Node,
};
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Site-specific extraction rules used by the traversal engine
pub trait SiteProfile {
    /// Human-readable page title
    fn title(&self, document: &Html) -> Option<String>;

    /// Cleaned content tree plus every navigation widget on the page
    ///
    /// Returns None when no content root matches.
    fn clean_content(&self, document: &Html, page_url: &Url) -> Option<Converted>;

    /// Target of an element that links without an `href` (e.g. nested index items)
    fn extra_link(&self, element: &ElementNode) -> Option<Url>;
}

/// Profile driven by the `[selectors]` section of the configuration
#[derive(Debug, Clone)]
pub struct SelectorProfile {
    content: Vec<Selector>,
    title: Vec<Selector>,
    rules: ConvertRules,
    nested_index: Option<NestedIndex>,
}

#[derive(Debug, Clone)]
struct NestedIndex {
    attribute: String,
    url_template: String,
}

impl SelectorProfile {
    pub fn from_config(config: &SelectorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            content: compile_all(&config.content)?,
            title: compile_all(&config.title)?,
            rules: ConvertRules {
                ignored: compile_all(&config.ignored)?,
                navigation: compile_all(&config.navigation)?,
                non_recursive: compile_all(&config.non_recursive)?,
                fragments: compile_all(&config.fragments)?,
            },
            nested_index: config.nested_index.as_ref().map(|index| NestedIndex {
                attribute: index.attribute.clone(),
                url_template: index.url_template.clone(),
            }),
        })
    }

    fn content_root<'a>(&self, document: &'a Html) -> Option<ElementRef<'a>> {
        self.content
            .iter()
            .find_map(|selector| document.select(selector).next())
    }

    /// Navigation widgets outside the content root, in document order
    fn outer_widgets(&self, document: &Html, root: ElementRef, page_url: &Url) -> Vec<Node> {
        let root_id = root.id();
        document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|element| self.rules.is_navigation(element))
            .filter(|element| {
                element.id() != root_id
                    && !self.rules.is_ignored(element)
                    && element.ancestors().filter_map(ElementRef::wrap).all(|ancestor| {
                        ancestor.id() != root_id
                            && !self.rules.is_ignored(&ancestor)
                            && !self.rules.is_navigation(&ancestor)
                    })
            })
            .map(|element| convert_widget(element, page_url, &self.rules))
            .collect()
    }
}

impl SiteProfile for SelectorProfile {
    fn title(&self, document: &Html) -> Option<String> {
        self.title.iter().find_map(|selector| {
            document.select(selector).find_map(|element| {
                let text = element.text().collect::<Vec<_>>().join(" ");
                let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
                (!text.is_empty()).then_some(text)
            })
        })
    }

    fn clean_content(&self, document: &Html, page_url: &Url) -> Option<Converted> {
        let root = self.content_root(document)?;
        let mut converted = convert_element(root, page_url, &self.rules);

        let mut outer = self.outer_widgets(document, root, page_url);
        outer.append(&mut converted.navigation);
        converted.navigation = outer;

        Some(converted)
    }

    fn extra_link(&self, element: &ElementNode) -> Option<Url> {
        let index = self.nested_index.as_ref()?;
        let id = element.attr(&index.attribute)?.trim();
        if id.is_empty() {
            return None;
        }
        Url::parse(&index.url_template.replace("{id}", id)).ok()
    }
}

fn compile_all(selectors: &[String]) -> Result<Vec<Selector>, ConfigError> {
    selectors.iter().map(|s| compile_selector(s)).collect()
}
