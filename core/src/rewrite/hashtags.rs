//! Hashtag recognition: `#tag` and `#tag/sub` in running text become
//! marked spans. Headings are untouched (their `#` was consumed by the
//! parser anyway), as is anything inside links or code.

use std::sync::OnceLock;

use comrak::nodes::{AstNode, NodeValue};
use comrak::Arena;
use regex::Regex;

use crate::parser::make_node;
use crate::rewrite::{collect_nodes, inside_link, replace_node};

fn hashtag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // A tag starts a word, begins with a letter, and may contain
        // letters, digits, dashes, underscores and `/` sub-tags.
        Regex::new(r"(^|\s)#([A-Za-z][A-Za-z0-9_-]*(?:/[A-Za-z0-9_-]+)*)").expect("hashtag regex")
    })
}

pub fn rewrite<'a>(arena: &'a Arena<'a>, root: &'a AstNode<'a>) {
    for node in collect_nodes(root) {
        let in_heading = node
            .parent()
            .is_some_and(|p| matches!(p.data.borrow().value, NodeValue::Heading(_)));
        if in_heading || inside_link(node) {
            continue;
        }
        let literal = {
            let data = node.data.borrow();
            match &data.value {
                NodeValue::Text(text) if text.contains('#') => text.clone(),
                _ => continue,
            }
        };

        let re = hashtag_regex();
        if !re.is_match(&literal) {
            continue;
        }

        let mut pieces = Vec::new();
        let mut emit_start = 0;
        for captures in re.captures_iter(&literal) {
            let whole = captures.get(0).expect("match");
            let lead = captures.get(1).expect("lead");
            let tag = captures.get(2).expect("tag");

            let text_end = lead.end();
            if text_end > emit_start {
                pieces.push(make_node(
                    arena,
                    NodeValue::Text(literal[emit_start..text_end].to_string().into()),
                ));
            }
            pieces.push(make_node(
                arena,
                NodeValue::HtmlInline(format!(
                    "<span class=\"hashtag\">#{}</span>",
                    tag.as_str()
                )),
            ));
            emit_start = whole.end();
        }
        if emit_start < literal.len() {
            pieces.push(make_node(
                arena,
                NodeValue::Text(literal[emit_start..].to_string().into()),
            ));
        }
        replace_node(node, pieces);
    }
}
