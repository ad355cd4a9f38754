//! Citation linking.
//!
//! Recognized reference shapes, checked against the absorbed
//! bibliography:
//!
//! ```text
//! [@key]     Pandoc bracketed
//! @key       Pandoc bare
//! [#key]     MultiMarkdown ([#Key:Year] keeps only the key part)
//! ```
//!
//! Known keys become citation spans linking to `#ref-key`; unknown keys
//! stay plain text and produce no bibliography entry. Cited keys (plus
//! any `nocite` keys, or all keys for `nocite: *`) are gathered into a
//! bibliography section appended to the document unless suppressed.

use std::sync::OnceLock;

use comrak::nodes::{AstNode, NodeHtmlBlock, NodeValue};
use comrak::Arena;
use regex::Regex;

use crate::metadata::Metadata;
use crate::options::Options;
use crate::parser::make_node;
use crate::rewrite::{collect_nodes, inside_link, replace_node};

fn citation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[@([A-Za-z0-9_][A-Za-z0-9_:.-]*)\]|\[#([A-Za-z0-9_][A-Za-z0-9_:.-]*?)(?::[^\]]*)?\]|(?:^|[\s(])@([A-Za-z0-9_][A-Za-z0-9_:.-]*)")
            .expect("citation regex")
    })
}

pub fn rewrite<'a>(
    arena: &'a Arena<'a>,
    root: &'a AstNode<'a>,
    options: &Options,
    metadata: &Metadata,
) {
    let mut cited: Vec<String> = Vec::new();

    for node in collect_nodes(root) {
        if inside_link(node) {
            continue;
        }
        let literal = {
            let data = node.data.borrow();
            match &data.value {
                NodeValue::Text(text) if text.contains('@') || text.contains("[#") => text.clone(),
                _ => continue,
            }
        };

        let re = citation_regex();
        let mut pieces = Vec::new();
        let mut emit_start = 0;
        let mut found = false;

        for captures in re.captures_iter(&literal) {
            let whole = captures.get(0).expect("match");
            let key = captures
                .get(1)
                .or_else(|| captures.get(2))
                .or_else(|| captures.get(3))
                .expect("key")
                .as_str();

            if !metadata.has_bibliography_key(key) {
                continue;
            }

            // Keep any leading char the bare-@ branch swallowed.
            let match_text = whole.as_str();
            let key_offset = match_text.find('@').or_else(|| match_text.find('#'));
            let lead_len = key_offset.unwrap_or(0).saturating_sub(
                usize::from(match_text.starts_with('[')),
            );

            let text_end = whole.start() + lead_len;
            if text_end > emit_start {
                pieces.push(make_node(
                    arena,
                    NodeValue::Text(literal[emit_start..text_end].to_string().into()),
                ));
            }

            let rendered = if options.link_citations {
                format!(
                    "<span class=\"citation\">[<a href=\"#ref-{key}\">{key}</a>]</span>"
                )
            } else {
                format!("<span class=\"citation\">[{key}]</span>")
            };
            pieces.push(make_node(arena, NodeValue::HtmlInline(rendered)));

            if !cited.iter().any(|k| k == key) {
                cited.push(key.to_string());
            }
            emit_start = whole.end();
            found = true;
        }

        if found {
            if emit_start < literal.len() {
                pieces.push(make_node(
                    arena,
                    NodeValue::Text(literal[emit_start..].to_string().into()),
                ));
            }
            replace_node(node, pieces);
        }
    }

    append_bibliography(arena, root, options, metadata, cited);
}

fn append_bibliography<'a>(
    arena: &'a Arena<'a>,
    root: &'a AstNode<'a>,
    options: &Options,
    metadata: &Metadata,
    mut keys: Vec<String>,
) {
    if options.suppress_bibliography {
        return;
    }

    match options.nocite.as_deref().map(str::trim) {
        Some("*") => {
            for (key, _) in metadata.bibliography_entries() {
                if !keys.iter().any(|k| k == key) {
                    keys.push(key.clone());
                }
            }
        }
        Some(list) => {
            for key in list.split(',') {
                let key = key.trim().trim_start_matches('@');
                if !key.is_empty()
                    && metadata.has_bibliography_key(key)
                    && !keys.iter().any(|k| k == key)
                {
                    keys.push(key.to_string());
                }
            }
        }
        None => {}
    }

    if keys.is_empty() {
        return;
    }

    let mut html = String::from("<div class=\"bibliography\">\n<ul>\n");
    for key in &keys {
        let display = metadata.bibliography_display(key).unwrap_or(key);
        html.push_str(&format!(
            "<li id=\"ref-{key}\">{}</li>\n",
            escape_text(display)
        ));
    }
    html.push_str("</ul>\n</div>");

    root.append(make_node(
        arena,
        NodeValue::HtmlBlock(NodeHtmlBlock {
            block_type: 6,
            literal: html,
        }),
    ));
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
