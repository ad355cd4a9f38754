//! Critic Markup resolution.
//!
//! ```text
//! {++added++}  {--deleted--}  {~~old~>new~~}  {==highlight==}  {>>comment<<}
//! ```
//!
//! In `Markup` mode the annotations stay visible as HTML spans; `Accept`
//! keeps additions and the new half of substitutions; `Reject` keeps the
//! original text. Unterminated annotations are left literal.

use crate::options::CriticMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CriticKind {
    Add,
    Del,
    Sub,
    Highlight,
    Comment,
}

struct CriticSpan<'a> {
    kind: CriticKind,
    /// Content; for substitutions, the replacement half.
    content: &'a str,
    /// Original half of a substitution.
    old: &'a str,
    /// Total bytes consumed from the input, including both markers.
    consumed: usize,
}

/// Scan a Critic annotation starting at a `{`. Returns `None` when the
/// braces do not form a complete annotation.
fn scan(input: &str) -> Option<CriticSpan<'_>> {
    let rest = input.strip_prefix('{')?;
    let (kind, close_marker) = match rest.as_bytes() {
        [b'+', b'+', ..] => (CriticKind::Add, "++}"),
        [b'-', b'-', ..] => (CriticKind::Del, "--}"),
        [b'~', b'~', ..] => (CriticKind::Sub, "~~}"),
        [b'=', b'=', ..] => (CriticKind::Highlight, "==}"),
        [b'>', b'>', ..] => (CriticKind::Comment, "<<}"),
        _ => return None,
    };

    let body_start = 3;
    let body = &input[body_start..];
    let close = body.find(close_marker)?;
    let content = &body[..close];
    let consumed = body_start + close + close_marker.len();

    if kind == CriticKind::Sub {
        if let Some(sep) = content.find("~>") {
            return Some(CriticSpan {
                kind,
                content: &content[sep + 2..],
                old: &content[..sep],
                consumed,
            });
        }
    }

    Some(CriticSpan {
        kind,
        content,
        old: "",
        consumed,
    })
}

fn emit(span: &CriticSpan<'_>, mode: CriticMode, output: &mut String) {
    match mode {
        CriticMode::Markup => match span.kind {
            CriticKind::Add => {
                output.push_str("<ins class=\"critic\">");
                output.push_str(span.content);
                output.push_str("</ins>");
            }
            CriticKind::Del => {
                output.push_str("<del class=\"critic\">");
                output.push_str(span.content);
                output.push_str("</del>");
            }
            CriticKind::Sub => {
                output.push_str("<del class=\"critic\">");
                output.push_str(span.old);
                output.push_str("</del><ins class=\"critic\">");
                output.push_str(span.content);
                output.push_str("</ins>");
            }
            CriticKind::Highlight => {
                output.push_str("<mark class=\"critic\">");
                output.push_str(span.content);
                output.push_str("</mark>");
            }
            CriticKind::Comment => {
                output.push_str("<span class=\"critic comment\">");
                output.push_str(span.content);
                output.push_str("</span>");
            }
        },
        CriticMode::Accept => match span.kind {
            CriticKind::Add | CriticKind::Sub | CriticKind::Highlight => {
                output.push_str(span.content);
            }
            CriticKind::Del | CriticKind::Comment => {}
        },
        CriticMode::Reject => match span.kind {
            CriticKind::Del => output.push_str(span.content),
            CriticKind::Sub => output.push_str(span.old),
            CriticKind::Highlight => output.push_str(span.content),
            CriticKind::Add | CriticKind::Comment => {}
        },
    }
}

pub fn process(text: &str, mode: CriticMode) -> String {
    if !text.contains('{') {
        return text.to_string();
    }

    let mut output = String::with_capacity(text.len() + 64);
    let mut pos = 0;
    let bytes = text.as_bytes();
    let mut in_fence = false;

    while pos < bytes.len() {
        if (pos == 0 || bytes[pos - 1] == b'\n') && text[pos..].starts_with("```") {
            in_fence = !in_fence;
        }

        if !in_fence && bytes[pos] == b'{' {
            if let Some(span) = scan(&text[pos..]) {
                emit(&span, mode, &mut output);
                pos += span.consumed;
                continue;
            }
        }

        let ch_len = text[pos..].chars().next().map_or(1, char::len_utf8);
        output.push_str(&text[pos..pos + ch_len]);
        pos += ch_len;
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markup_mode_keeps_annotations_visible() {
        let out = process("a {++new++} b", CriticMode::Markup);
        assert_eq!(out, "a <ins class=\"critic\">new</ins> b");
    }

    #[test]
    fn substitution_in_markup_mode_pairs_del_and_ins() {
        let out = process("{~~old~>new~~}", CriticMode::Markup);
        assert_eq!(
            out,
            "<del class=\"critic\">old</del><ins class=\"critic\">new</ins>"
        );
    }

    #[test]
    fn accept_keeps_additions_drops_deletions() {
        let out = process("Was {--bad--}{++good++}", CriticMode::Accept);
        assert_eq!(out, "Was good");
    }

    #[test]
    fn accept_resolves_substitutions_to_new_text() {
        assert_eq!(process("{~~a~>b~~}", CriticMode::Accept), "b");
    }

    #[test]
    fn reject_keeps_original_text() {
        let out = process("Was {--bad--}{++good++}", CriticMode::Reject);
        assert_eq!(out, "Was bad");
        assert_eq!(process("{~~a~>b~~}", CriticMode::Reject), "a");
    }

    #[test]
    fn comments_render_only_in_markup_mode() {
        assert_eq!(
            process("{>>note<<}", CriticMode::Markup),
            "<span class=\"critic comment\">note</span>"
        );
        assert_eq!(process("x {>>note<<}", CriticMode::Accept), "x ");
        assert_eq!(process("x {>>note<<}", CriticMode::Reject), "x ");
    }

    #[test]
    fn unterminated_annotation_is_literal() {
        let src = "a {++never closed";
        assert_eq!(process(src, CriticMode::Markup), src);
    }

    #[test]
    fn highlight_text_stays_plain_in_accept_and_reject() {
        assert_eq!(process("{==hl==}", CriticMode::Accept), "hl");
        assert_eq!(process("{==hl==}", CriticMode::Reject), "hl");
    }
}
