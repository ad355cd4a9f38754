//! Pandoc bracketed spans: `[text]{.class #id}` becomes an attributed
//! `<span>`. Only runs when attribute processing is on; the bracket pair
//! must sit in a single text node (anything the parser already consumed
//! as a link stays a link).

use std::collections::HashMap;

use comrak::nodes::{AstNode, NodeValue};
use comrak::Arena;

use crate::parser::make_node;
use crate::rewrite::ial::parse_braced;
use crate::rewrite::{collect_nodes, inside_link, replace_node};

pub fn rewrite<'a>(
    arena: &'a Arena<'a>,
    root: &'a AstNode<'a>,
    alds: &HashMap<String, String>,
) {
    for node in collect_nodes(root) {
        let literal = {
            let data = node.data.borrow();
            match &data.value {
                NodeValue::Text(text) if text.contains("]{") => text.clone(),
                _ => continue,
            }
        };
        if inside_link(node) {
            continue;
        }
        if let Some(pieces) = split_spans(arena, &literal, alds) {
            replace_node(node, pieces);
        }
    }
}

fn split_spans<'a>(
    arena: &'a Arena<'a>,
    text: &str,
    alds: &HashMap<String, String>,
) -> Option<Vec<&'a AstNode<'a>>> {
    let mut pieces = Vec::new();
    let mut emit_start = 0;
    let mut scan = 0;
    let mut found = false;

    while let Some(rel) = text[scan..].find("]{") {
        let close_bracket = scan + rel;
        // Matching open bracket, not nested.
        let Some(open_bracket) = text[..close_bracket].rfind('[') else {
            scan = close_bracket + 2;
            continue;
        };
        let inner = &text[open_bracket + 1..close_bracket];
        if inner.contains('\n') || inner.is_empty() {
            scan = close_bracket + 2;
            continue;
        }

        let braced = &text[close_bracket + 1..];
        let Some((ial, consumed)) = parse_braced(braced, false) else {
            scan = close_bracket + 2;
            continue;
        };
        let attr_string = ial.to_attr_string(alds);
        if attr_string.is_empty() {
            scan = close_bracket + 2;
            continue;
        }

        if open_bracket > emit_start {
            pieces.push(make_node(
                arena,
                NodeValue::Text(text[emit_start..open_bracket].to_string().into()),
            ));
        }
        pieces.push(make_node(
            arena,
            NodeValue::HtmlInline(format!(
                "<span {attr_string}>{}</span>",
                escape_text(inner)
            )),
        ));
        found = true;
        emit_start = close_bracket + 1 + consumed;
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

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
