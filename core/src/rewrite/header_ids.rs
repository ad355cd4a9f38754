//! Manual header IDs and header collection.
//!
//! Headings can carry an explicit ID:
//!
//! ```text
//! ## Setup [setup-guide]        (MultiMarkdown)
//! ## Setup {#setup-guide}       (Kramdown)
//! ```
//!
//! The syntax is stripped from the heading text and the ID captured.
//! After IAL attachment, every heading is collected in document order
//! with its final ID: manual wins, then an IAL `id=`, then the
//! auto-generated slug. Duplicates are disambiguated with `-N` suffixes
//! in encounter order.

use std::collections::HashMap;

use comrak::nodes::{AstNode, NodeValue};

use crate::options::IdFormat;
use crate::parser::inline_text;
use crate::rewrite::slug::{slugify, SlugCounter};
use crate::rewrite::{collect_nodes, node_key, HeaderInfo, NodeAttrs};

/// Extract `[id]` / `{#id}` suffixes from headings. Returns a map of node
/// identity to the captured ID.
pub fn extract_manual<'a>(root: &'a AstNode<'a>) -> HashMap<usize, String> {
    let mut manual = HashMap::new();

    for node in collect_nodes(root) {
        if !matches!(node.data.borrow().value, NodeValue::Heading(_)) {
            continue;
        }
        let Some(last) = node.last_child() else {
            continue;
        };
        let literal = match &last.data.borrow().value {
            NodeValue::Text(text) => text.clone(),
            _ => continue,
        };

        if let Some((stripped, id)) = strip_manual_id(&literal) {
            manual.insert(node_key(node), id);
            if stripped.is_empty() {
                last.detach();
            } else {
                last.data.borrow_mut().value = NodeValue::Text(stripped.into());
            }
        }
    }

    manual
}

/// `Heading [id]` or `Heading {#id}` at the very end of the text.
/// Returns the text with the syntax removed plus the ID.
fn strip_manual_id(text: &str) -> Option<(String, String)> {
    let trimmed = text.trim_end();

    // Kramdown: {#id}
    if let Some(open) = trimmed.rfind("{#") {
        if let Some(close_rel) = trimmed[open..].find('}') {
            if open + close_rel + 1 == trimmed.len() {
                let id = trimmed[open + 2..open + close_rel].trim();
                if !id.is_empty() {
                    return Some((trimmed[..open].trim_end().to_string(), id.to_string()));
                }
            }
        }
    }

    // MultiMarkdown: [id]
    if trimmed.ends_with(']') {
        if let Some(open) = trimmed.rfind('[') {
            let id = trimmed[open + 1..trimmed.len() - 1].trim();
            // A [text] that is the whole heading is content, not an ID.
            if !id.is_empty() && open > 0 && !id.contains('[') {
                return Some((trimmed[..open].trim_end().to_string(), id.to_string()));
            }
        }
    }

    None
}

/// Collect headings with their final IDs. Precedence: manual, then IAL
/// `id=`, then the generated slug.
pub fn collect<'a>(
    root: &'a AstNode<'a>,
    manual: &HashMap<usize, String>,
    attrs: &NodeAttrs,
    format: IdFormat,
) -> Vec<HeaderInfo> {
    let mut headers = Vec::new();
    let mut counter = SlugCounter::new();

    for node in collect_nodes(root) {
        let level = match &node.data.borrow().value {
            NodeValue::Heading(heading) => heading.level,
            _ => continue,
        };
        let text = inline_text(node);

        let preferred = manual
            .get(&node_key(node))
            .cloned()
            .or_else(|| attrs.get(node).and_then(extract_id_attr))
            .unwrap_or_else(|| slugify(&text, format));

        let id = counter.disambiguate(&preferred);
        headers.push(HeaderInfo { level, text, id });
    }

    headers
}

/// Pull `id="…"` out of an attribute string.
fn extract_id_attr(attrs: &str) -> Option<String> {
    let pos = attrs.find("id=\"")?;
    let rest = &attrs[pos + 4..];
    let close = rest.find('"')?;
    let id = &rest[..close];
    (!id.is_empty()).then(|| id.to_string())
}
