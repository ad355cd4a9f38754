//! Post-parse tree rewriting.
//!
//! These passes mutate the parsed tree in place, in a fixed order: wiki
//! links split text nodes, callouts replace blockquotes, manual header
//! IDs are captured, IALs attach attribute strings, and finally headers
//! are collected with their slugs for ID injection and TOC expansion.
//!
//! Attribute strings live in a [`NodeAttrs`] side table keyed by node
//! identity rather than on the nodes themselves; the table is owned by
//! the conversion and dropped with it.

pub mod callouts;
pub mod citations;
pub mod hashtags;
pub mod header_ids;
pub mod ial;
pub mod indices;
pub mod slug;
pub mod spans;
pub mod table_captions;
pub mod wiki_links;

use std::collections::HashMap;

use comrak::nodes::{AstNode, NodeValue};
use comrak::Arena;

use crate::metadata::Metadata;
use crate::options::Options;
use crate::preprocess::PreprocessContext;

/// Side table of per-node attribute strings (`id="…" class="…" …`).
/// Attribute strings are additive: attaching twice appends with a single
/// space separator.
#[derive(Debug, Default)]
pub struct NodeAttrs {
    map: HashMap<usize, String>,
}

pub(crate) fn node_key(node: &AstNode<'_>) -> usize {
    node as *const AstNode<'_> as usize
}

impl NodeAttrs {
    pub fn new() -> Self {
        NodeAttrs::default()
    }

    pub fn attach(&mut self, node: &AstNode<'_>, attrs: &str) {
        let attrs = attrs.trim();
        if attrs.is_empty() {
            return;
        }
        let entry = self.map.entry(node_key(node)).or_default();
        if !entry.is_empty() {
            entry.push(' ');
        }
        entry.push_str(attrs);
    }

    pub fn get(&self, node: &AstNode<'_>) -> Option<&str> {
        self.map.get(&node_key(node)).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// A heading surviving into the rendered document, in document order.
#[derive(Debug, Clone)]
pub struct HeaderInfo {
    pub level: u8,
    pub text: String,
    pub id: String,
}

/// Everything later stages need from the rewriting phase.
#[derive(Debug, Default)]
pub struct RewriteOutcome {
    pub attrs: NodeAttrs,
    pub headers: Vec<HeaderInfo>,
}

/// Run all tree passes in order.
pub fn run<'a>(
    arena: &'a Arena<'a>,
    root: &'a AstNode<'a>,
    options: &Options,
    ctx: &PreprocessContext,
    metadata: &Metadata,
) -> RewriteOutcome {
    let mut outcome = RewriteOutcome::default();

    if options.nobreaks {
        render_soft_breaks_as_spaces(root);
    }
    if options.wiki_links {
        wiki_links::rewrite(arena, root, options);
    }
    if options.callouts {
        callouts::rewrite(arena, root);
    }

    let manual_ids = if options.generate_header_ids {
        header_ids::extract_manual(root)
    } else {
        HashMap::new()
    };

    if options.attributes {
        ial::attach(arena, root, &ctx.alds, &mut outcome.attrs);
    }
    if options.spans && options.attributes {
        spans::rewrite(arena, root, &ctx.alds);
    }
    if options.citations {
        citations::rewrite(arena, root, options, metadata);
    }
    if options.hashtags {
        hashtags::rewrite(arena, root);
    }
    if options.indices {
        indices::rewrite(arena, root);
    }
    if options.tables {
        table_captions::rewrite(root, &mut outcome.attrs);
    }

    if options.generate_header_ids {
        outcome.headers =
            header_ids::collect(root, &manual_ids, &outcome.attrs, options.id_format);
    }

    outcome
}

/// `nobreaks`: soft breaks render as spaces. Done on the tree so the
/// HTML passes never have to guess which newline was a soft break.
fn render_soft_breaks_as_spaces<'a>(root: &'a AstNode<'a>) {
    for node in root.descendants() {
        let mut data = node.data.borrow_mut();
        if matches!(data.value, NodeValue::SoftBreak) {
            data.value = NodeValue::Text(" ".to_string().into());
        }
    }
}

/// Collect every node of the tree in document order. Passes use this to
/// snapshot candidates before splicing siblings.
pub(crate) fn collect_nodes<'a>(root: &'a AstNode<'a>) -> Vec<&'a AstNode<'a>> {
    root.descendants().collect()
}

/// True when any ancestor of `node` is a link or image; text inside those
/// is never rewritten into further links.
pub(crate) fn inside_link(node: &AstNode<'_>) -> bool {
    let mut current = node.parent();
    while let Some(ancestor) = current {
        if matches!(
            ancestor.data.borrow().value,
            NodeValue::Link(_) | NodeValue::Image(_)
        ) {
            return true;
        }
        current = ancestor.parent();
    }
    false
}

/// Replace `node` with `replacements` in sibling order.
pub(crate) fn replace_node<'a>(node: &'a AstNode<'a>, replacements: Vec<&'a AstNode<'a>>) {
    for replacement in replacements {
        node.insert_before(replacement);
    }
    node.detach();
}
