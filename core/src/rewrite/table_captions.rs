//! Table caption capture.
//!
//! ```text
//! [Quarterly results]          | a | b |
//! | a | b |            or      |---|---|
//! |---|---|                    : Quarterly results
//! ```
//!
//! A `[caption]` paragraph directly before a table, or a `: caption`
//! paragraph directly after it, is captured into the table's
//! `data-caption` attribute and removed from the tree. The attribute
//! injector later turns it into a `<figure class="table-figure">`
//! wrapper with a `<figcaption>`.

use comrak::nodes::{AstNode, NodeValue};

use crate::rewrite::{collect_nodes, NodeAttrs};

pub fn rewrite<'a>(root: &'a AstNode<'a>, attrs: &mut NodeAttrs) {
    for node in collect_nodes(root) {
        if !matches!(node.data.borrow().value, NodeValue::Table(_)) {
            continue;
        }

        // [Caption] paragraph before the table.
        if let Some(previous) = node.previous_sibling() {
            if let Some(caption) = bracket_caption(previous) {
                attrs.attach(node, &format!("data-caption=\"{}\"", escape_attr(&caption)));
                previous.detach();
                continue;
            }
        }

        // `: Caption` paragraph after the table.
        if let Some(next) = node.next_sibling() {
            if let Some(caption) = colon_caption(next) {
                attrs.attach(node, &format!("data-caption=\"{}\"", escape_attr(&caption)));
                next.detach();
            }
        }
    }
}

/// A paragraph whose only content is `[text]`.
fn bracket_caption(node: &AstNode<'_>) -> Option<String> {
    let text = single_text(node)?;
    let trimmed = text.trim();
    let inner = trimmed.strip_prefix('[')?.strip_suffix(']')?;
    if inner.is_empty() || inner.contains('[') || inner.contains(']') {
        return None;
    }
    Some(inner.to_string())
}

/// A paragraph starting with `: `.
fn colon_caption(node: &AstNode<'_>) -> Option<String> {
    let text = single_text(node)?;
    let caption = text.trim().strip_prefix(": ")?.trim();
    if caption.is_empty() {
        return None;
    }
    Some(caption.to_string())
}

fn single_text(node: &AstNode<'_>) -> Option<String> {
    if !matches!(node.data.borrow().value, NodeValue::Paragraph) {
        return None;
    }
    let only = match (node.first_child(), node.last_child()) {
        (Some(first), Some(last)) if std::ptr::eq(first, last) => first,
        _ => return None,
    };
    match &only.data.borrow().value {
        NodeValue::Text(text) => Some(text.to_string()),
        _ => None,
    }
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}
