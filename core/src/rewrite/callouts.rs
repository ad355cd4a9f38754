//! Callout blockquotes.
//!
//! A blockquote whose first line is a callout marker becomes a themed
//! block:
//!
//! ```text
//! > [!WARNING] Heads up          <div class="callout callout-warning">
//! > Body                     ->  <p class="callout-title">Heads up</p>
//!                                <p>Body</p></div>
//! ```
//!
//! A `+`/`-` after the marker makes the callout a collapsible
//! `<details>` element, open or closed. Type names are case-insensitive
//! and common synonyms collapse onto the canonical set.

use comrak::nodes::{AstNode, NodeHtmlBlock, NodeValue};
use comrak::Arena;
use nom::branch::alt;
use nom::bytes::complete::{tag, take_while1};
use nom::combinator::opt;
use nom::{IResult, Parser};

use crate::parser::make_node;
use crate::rewrite::collect_nodes;

#[derive(Debug, PartialEq, Eq)]
struct CalloutMarker {
    kind: String,
    /// None: not collapsible. Some(true): open, Some(false): closed.
    collapsed: Option<bool>,
    title: String,
}

/// Canonicalize a callout type, mapping synonyms.
fn canonical_kind(raw: &str) -> String {
    let lower = raw.to_ascii_lowercase();
    match lower.as_str() {
        "info" => "note".to_string(),
        "tldr" | "summary" => "abstract".to_string(),
        "caution" | "attention" => "warning".to_string(),
        "error" => "danger".to_string(),
        "hint" | "important" => "tip".to_string(),
        "check" | "done" => "success".to_string(),
        "help" | "faq" => "question".to_string(),
        "fail" | "missing" => "failure".to_string(),
        "cite" => "quote".to_string(),
        _ => lower,
    }
}

/// `[!TYPE]` plus optional `+`/`-` and title text.
fn marker(input: &str) -> IResult<&str, CalloutMarker> {
    let (rest, _) = tag("[!").parse(input)?;
    let (rest, kind) = take_while1(|c: char| c.is_ascii_alphabetic()).parse(rest)?;
    let (rest, _) = tag("]").parse(rest)?;
    let (rest, fold) = opt(alt((tag("+"), tag("-")))).parse(rest)?;

    Ok((
        "",
        CalloutMarker {
            kind: canonical_kind(kind),
            collapsed: fold.map(|f| f == "+"),
            title: rest.trim().to_string(),
        },
    ))
}

pub fn rewrite<'a>(arena: &'a Arena<'a>, root: &'a AstNode<'a>) {
    for node in collect_nodes(root) {
        let is_quote = matches!(node.data.borrow().value, NodeValue::BlockQuote);
        if !is_quote {
            continue;
        }
        if let Some(found) = parse_first_paragraph(node) {
            transform(arena, node, found);
        }
    }
}

/// Inspect the first paragraph of a blockquote for a callout marker.
/// Returns the marker and whether the whole first paragraph was consumed
/// by it.
fn parse_first_paragraph(quote: &AstNode<'_>) -> Option<CalloutMarker> {
    let first = quote.first_child()?;
    if !matches!(first.data.borrow().value, NodeValue::Paragraph) {
        return None;
    }
    let first_text = first.first_child()?;
    let literal = match &first_text.data.borrow().value {
        NodeValue::Text(text) => text.clone(),
        _ => return None,
    };

    let (_, parsed) = marker(&literal).ok()?;

    // Strip the marker: the title lives in the marker, the rest of the
    // paragraph (after a soft break) is body.
    let next = first_text.next_sibling();
    first_text.detach();
    if let Some(next) = next {
        if matches!(
            next.data.borrow().value,
            NodeValue::SoftBreak | NodeValue::LineBreak
        ) {
            next.detach();
        }
    }
    if first.first_child().is_none() {
        first.detach();
    }

    Some(parsed)
}

fn transform<'a>(arena: &'a Arena<'a>, quote: &'a AstNode<'a>, marker: CalloutMarker) {
    let kind = &marker.kind;
    let title = if marker.title.is_empty() {
        capitalize(kind)
    } else {
        marker.title.clone()
    };
    let title = escape_text(&title);

    let (open, close) = match marker.collapsed {
        Some(open_attr) => (
            format!(
                "<details class=\"callout callout-{kind}\"{}>\n<summary>{title}</summary>",
                if open_attr { " open" } else { "" }
            ),
            "</details>".to_string(),
        ),
        None => (
            format!(
                "<div class=\"callout callout-{kind}\">\n<p class=\"callout-title\">{title}</p>"
            ),
            "</div>".to_string(),
        ),
    };

    let open_node = make_node(arena, html_block(open));
    let close_node = make_node(arena, html_block(close));

    quote.insert_before(open_node);
    while let Some(child) = quote.first_child() {
        child.detach();
        quote.insert_before(child);
    }
    quote.insert_before(close_node);
    quote.detach();
}

fn html_block(literal: String) -> NodeValue {
    NodeValue::HtmlBlock(NodeHtmlBlock {
        block_type: 6,
        literal,
    })
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
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
