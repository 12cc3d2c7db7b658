//! Plain-text rendering of a resolved page tree
//!
//! The rendering is deterministic: the same tree always produces the same
//! text. Block elements break lines, inline elements flow, and embed markers
//! and image tokens always sit on a line of their own.

use crate::crawler::embed::MARKER_TAG;
use crate::document::{ElementNode, Node};

/// Elements separated from their neighbours by a blank line
const PARAGRAPH_TAGS: &[&str] = &["p", "pre", "table", "blockquote", "figure"];

/// Elements that start and end on their own line
const BLOCK_TAGS: &[&str] = &[
    "html", "body", "main", "article", "section", "div", "header", "footer", "nav", "aside",
    "ul", "ol", "dl", "dt", "dd", "form", "fieldset", "figcaption", "thead", "tbody", "tfoot",
    "caption", "hr", "details", "summary", "address", "embedded",
];

/// Renders `node` as plain text
pub fn flatten(node: &Node) -> String {
    let mut out = String::new();
    render(node, &mut out);
    normalize_whitespace(&out)
}

/// Strips tabs, collapses spaces, trims lines and collapses blank-line runs
pub fn normalize_whitespace(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut previous_blank = true;

    for line in text.lines() {
        let line = line
            .replace('\t', "")
            .split(' ')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if line.is_empty() {
            if !previous_blank {
                lines.push(String::new());
            }
            previous_blank = true;
        } else {
            lines.push(line);
            previous_blank = false;
        }
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

fn render(node: &Node, out: &mut String) {
    match node {
        Node::Text(text) => push_inline_text(text, out),
        Node::Element(element) => render_element(element, out),
    }
}

fn render_element(element: &ElementNode, out: &mut String) {
    let tag = element.tag.to_ascii_lowercase();

    match tag.as_str() {
        MARKER_TAG => {
            break_line(out);
            out.push_str(element.text_content().trim());
            break_line(out);
        }
        "br" => out.push('\n'),
        "img" => render_image(element, out),
        "a" => render_anchor(element, out),
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = tag[1..].parse::<usize>().unwrap_or(1);
            blank_line(out);
            out.push_str(&"#".repeat(level));
            out.push(' ');
            out.push_str(&inline(element));
            blank_line(out);
        }
        "li" => {
            break_line(out);
            out.push_str("- ");
            render_children(element, out);
            break_line(out);
        }
        "tr" => {
            break_line(out);
            let cells: Vec<String> = element
                .children
                .iter()
                .filter_map(Node::as_element)
                .filter(|cell| cell.is("td") || cell.is("th"))
                .map(inline)
                .collect();
            out.push_str(&cells.join(" | "));
            break_line(out);
        }
        "pre" => {
            blank_line(out);
            out.push_str(&element.text_content().replace('\t', ""));
            blank_line(out);
        }
        _ if PARAGRAPH_TAGS.contains(&tag.as_str()) => {
            blank_line(out);
            render_children(element, out);
            blank_line(out);
        }
        _ if BLOCK_TAGS.contains(&tag.as_str()) => {
            break_line(out);
            render_children(element, out);
            break_line(out);
        }
        _ => render_children(element, out),
    }
}

fn render_children(element: &ElementNode, out: &mut String) {
    for child in &element.children {
        render(child, out);
    }
}

/// Renders an element's children on a single line
fn inline(element: &ElementNode) -> String {
    let mut buffer = String::new();
    render_children(element, &mut buffer);
    buffer.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn render_anchor(element: &ElementNode, out: &mut String) {
    let text = inline(element);
    match element.attr("href").map(str::trim).filter(|h| !h.is_empty()) {
        Some(href) if text.is_empty() => out.push_str(href),
        Some(href) => {
            out.push('[');
            out.push_str(&text);
            out.push_str("](");
            out.push_str(href);
            out.push(')');
        }
        None => out.push_str(&text),
    }
}

fn render_image(element: &ElementNode, out: &mut String) {
    let alt = element.attr("alt").unwrap_or("").trim();
    out.push_str("![");
    out.push_str(alt);
    out.push(']');
    if let Some(src) = element.attr("src").map(str::trim) {
        if !src.is_empty() && !src.to_ascii_lowercase().starts_with("data:") {
            out.push('(');
            out.push_str(src);
            out.push(')');
        }
    }
}

fn push_inline_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '\t' => {}
            c if c.is_whitespace() => {
                if !out.ends_with(' ') && !out.ends_with('\n') && !out.is_empty() {
                    out.push(' ');
                }
            }
            c => out.push(c),
        }
    }
}

fn break_line(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

fn blank_line(out: &mut String) {
    break_line(out);
    if !out.is_empty() && !out.ends_with("\n\n") {
        out.push('\n');
    }
}
