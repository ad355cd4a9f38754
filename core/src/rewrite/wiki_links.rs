//! Wiki-link rewriting.
//!
//! ```text
//! [[Target]]  [[Target|Display]]  [[Target#Section]]
//! ```
//!
//! Text nodes containing double-bracket links are split into text/link
//! sequences. The target becomes a URL per the configured space policy
//! (dash, none, underscore, `%20`) with an optional extension appended;
//! a `#Section` suffix is slugged with the conversion's ID format.

use comrak::nodes::{AstNode, NodeLink, NodeValue};
use comrak::Arena;

use crate::options::{Options, WikiLinkSpace};
use crate::parser::make_node;
use crate::rewrite::slug::slugify;
use crate::rewrite::{collect_nodes, inside_link, replace_node};

pub fn rewrite<'a>(arena: &'a Arena<'a>, root: &'a AstNode<'a>, options: &Options) {
    for node in collect_nodes(root) {
        let literal = {
            let data = node.data.borrow();
            match &data.value {
                NodeValue::Text(text) if text.contains("[[") => text.clone(),
                _ => continue,
            }
        };
        if inside_link(node) {
            continue;
        }
        if let Some(pieces) = split_text(arena, &literal, options) {
            replace_node(node, pieces);
        }
    }
}

/// Split a text literal around its wiki links. `None` when no complete
/// link is present.
fn split_text<'a>(
    arena: &'a Arena<'a>,
    text: &str,
    options: &Options,
) -> Option<Vec<&'a AstNode<'a>>> {
    let mut pieces = Vec::new();
    let mut emit_start = 0;
    let mut scan = 0;
    let mut found = false;

    while let Some(open_rel) = text[scan..].find("[[") {
        let open = scan + open_rel;
        let Some(close_rel) = text[open + 2..].find("]]") else {
            break;
        };
        let inner = &text[open + 2..open + 2 + close_rel];
        if inner.is_empty() || inner.contains('\n') {
            scan = open + 2;
            continue;
        }

        if open > emit_start {
            pieces.push(make_node(
                arena,
                NodeValue::Text(text[emit_start..open].to_string().into()),
            ));
        }
        pieces.push(build_link(arena, inner, options));
        found = true;
        emit_start = open + 2 + close_rel + 2;
        scan = emit_start;
    }

    if !found {
        return None;
    }
    if emit_start < text.len() {
        pieces.push(make_node(
            arena,
            NodeValue::Text(text[emit_start..].to_string().into()),
        ));
    }
    Some(pieces)
}

fn build_link<'a>(
    arena: &'a Arena<'a>,
    inner: &str,
    options: &Options,
) -> &'a AstNode<'a> {
    let (target_part, display) = match inner.split_once('|') {
        Some((target, display)) => (target.trim(), display.trim()),
        None => (inner.trim(), inner.trim()),
    };
    let (target, section) = match target_part.split_once('#') {
        Some((target, section)) => (target.trim(), Some(section.trim())),
        None => (target_part, None),
    };

    let mut url = transform_target(target, options.wikilink_space);
    if !url.is_empty() {
        if let Some(ext) = &options.wikilink_extension {
            url.push('.');
            url.push_str(ext.trim_start_matches('.'));
        }
    }
    if let Some(section) = section {
        url.push('#');
        url.push_str(&slugify(section, options.id_format));
    }

    let link = make_node(
        arena,
        NodeValue::Link(Box::new(NodeLink {
            url,
            title: String::new(),
        })),
    );
    link.append(make_node(arena, NodeValue::Text(display.to_string().into())));
    link
}

fn transform_target(target: &str, policy: WikiLinkSpace) -> String {
    match policy {
        WikiLinkSpace::Dash => target.replace(' ', "-"),
        WikiLinkSpace::None => target.replace(' ', ""),
        WikiLinkSpace::Underscore => target.replace(' ', "_"),
        WikiLinkSpace::Percent20 => target.replace(' ', "%20"),
    }
}
