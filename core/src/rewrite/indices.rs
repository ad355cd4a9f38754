//! Index-term anchors.
//!
//! mmark syntax: `(!Term)` indexes Term, `(!Term, Sub)` indexes a
//! subentry, `(!!Term)` marks a primary entry. TextIndex `{^}` indexes
//! the word right before the marker. The term text stays in the output;
//! each occurrence gains an invisible anchor span with a stable id
//! (`idx-N`) that an external index builder can point at.

use comrak::nodes::{AstNode, NodeValue};
use comrak::Arena;

use crate::parser::make_node;
use crate::rewrite::{collect_nodes, inside_link, replace_node};

pub fn rewrite<'a>(arena: &'a Arena<'a>, root: &'a AstNode<'a>) {
    let mut counter = 0usize;

    for node in collect_nodes(root) {
        if inside_link(node) {
            continue;
        }
        let literal = {
            let data = node.data.borrow();
            match &data.value {
                NodeValue::Text(text) if text.contains("(!") || text.contains("{^}") => {
                    text.clone()
                }
                _ => continue,
            }
        };

        if let Some(pieces) = split_terms(arena, &literal, &mut counter) {
            replace_node(node, pieces);
        }
    }
}

fn split_terms<'a>(
    arena: &'a Arena<'a>,
    text: &str,
    counter: &mut usize,
) -> Option<Vec<&'a AstNode<'a>>> {
    let mut pieces = Vec::new();
    let mut emit_start = 0;
    let mut scan = 0;
    let mut found = false;

    while scan < text.len() {
        // TextIndex: `word{^}` indexes the preceding word.
        if let Some(rel) = text[scan..].find("{^}") {
            let marker = scan + rel;
            let mmark = text[scan..marker].find("(!").map(|r| scan + r);
            if mmark.is_none_or(|m| marker < m) {
                let word_start = text[..marker]
                    .rfind(|c: char| c.is_whitespace())
                    .map_or(0, |i| i + 1);
                if marker > emit_start {
                    pieces.push(make_node(
                        arena,
                        NodeValue::Text(text[emit_start..marker].to_string().into()),
                    ));
                }
                let term = &text[word_start..marker];
                pieces.push(anchor(arena, counter, term, false));
                found = true;
                emit_start = marker + 3;
                scan = emit_start;
                continue;
            }
        }

        let Some(rel) = text[scan..].find("(!") else {
            break;
        };
        let open = scan + rel;
        let primary = text[open + 2..].starts_with('!');
        let body_start = open + 2 + usize::from(primary);
        let Some(close_rel) = text[body_start..].find(')') else {
            scan = open + 2;
            continue;
        };
        let inner = &text[body_start..body_start + close_rel];
        let term = inner.split(',').next().unwrap_or(inner).trim();
        if term.is_empty() || inner.contains('\n') {
            scan = open + 2;
            continue;
        }

        if open > emit_start {
            pieces.push(make_node(
                arena,
                NodeValue::Text(text[emit_start..open].to_string().into()),
            ));
        }
        pieces.push(make_node(arena, NodeValue::Text(term.to_string().into())));
        pieces.push(anchor(arena, counter, inner.trim(), primary));
        found = true;
        emit_start = body_start + close_rel + 1;
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

fn anchor<'a>(
    arena: &'a Arena<'a>,
    counter: &mut usize,
    term: &str,
    primary: bool,
) -> &'a AstNode<'a> {
    *counter += 1;
    let class = if primary {
        "index-term index-primary"
    } else {
        "index-term"
    };
    make_node(
        arena,
        NodeValue::HtmlInline(format!(
            "<span class=\"{class}\" id=\"idx-{counter}\" data-index-term=\"{}\"></span>",
            escape_attr(term)
        )),
    )
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}
