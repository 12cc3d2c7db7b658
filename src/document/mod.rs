//! Owned document tree
//!
//! Pages are parsed with `scraper` and immediately converted into this owned
//! tree. Every crawl call owns the tree it built; subtrees returned by deeper
//! calls are moved into the parent by index replacement, so no node is ever
//! shared between two trees.

mod convert;

pub(crate) use convert::convert_widget;
pub use convert::{convert_element, ConvertRules, Converted};

/// A node of a harvested page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(ElementNode),
    Text(String),
}

/// An element with its attributes in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementNode {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,

    /// Set on elements (and descendants of elements) whose links must not be embedded
    pub no_follow: bool,

    /// Set on elements considered for duplicate fragment suppression
    pub fragment: bool,
}

impl ElementNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            no_follow: false,
            fragment: false,
        }
    }

    /// Builder-style attribute setter
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Builder-style child append
    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn is(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }

    /// Replaces the child at `index`, returning the displaced node
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn replace_child(&mut self, index: usize, node: Node) -> Node {
        std::mem::replace(&mut self.children[index], node)
    }

    /// Concatenated text of all descendants
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.collect_text(&mut out);
        }
        out
    }
}

impl Node {
    pub fn text(content: impl Into<String>) -> Self {
        Node::Text(content.into())
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut ElementNode> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }

    /// Concatenated text of this node and its descendants
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Text(text) => out.push_str(text),
            Node::Element(element) => {
                for child in &element.children {
                    child.collect_text(out);
                }
            }
        }
    }

    /// Visits this node and all descendants in document order
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node)) {
        visit(self);
        if let Node::Element(element) = self {
            for child in &element.children {
                child.walk(visit);
            }
        }
    }

    /// All descendant elements (this node included) with the given tag, in document order
    pub fn find_all<'a>(&'a self, tag: &str) -> Vec<&'a ElementNode> {
        let mut found = Vec::new();
        self.walk(&mut |node: &'a Node| {
            if let Node::Element(element) = node {
                if element.is(tag) {
                    found.push(element);
                }
            }
        });
        found
    }

    /// Removes every descendant for which `remove` returns true
    ///
    /// The node itself is never removed. Removed subtrees are not descended into.
    pub fn retain(&mut self, remove: &mut impl FnMut(&Node) -> bool) {
        if let Node::Element(element) = self {
            let children = std::mem::take(&mut element.children);
            for mut child in children {
                if remove(&child) {
                    continue;
                }
                child.retain(remove);
                element.children.push(child);
            }
        }
    }
}

impl From<ElementNode> for Node {
    fn from(element: ElementNode) -> Self {
        Node::Element(element)
    }
}
