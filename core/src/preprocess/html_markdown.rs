//! Markdown inside HTML blocks.
//!
//! HTML tags carrying `markdown="1"` (or `block`/`span`) ask for their
//! content to be processed as Markdown and re-injected:
//!
//! ```text
//! <div markdown="1">
//! *emphasis* works here
//! </div>
//! ```
//!
//! `span` strips the outer `<p>` wrapper from the converted fragment;
//! `markdown="0"` keeps the content verbatim. Nested annotated blocks are
//! processed inside-out. The `markdown` attribute itself never reaches
//! the output.

use log::debug;

use crate::options::Options;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkdownAttr {
    Block,
    Span,
    Off,
}

struct AnnotatedTag<'a> {
    /// Byte offset of `<`.
    start: usize,
    tag: &'a str,
    /// Attribute text with the `markdown` attribute removed.
    clean_attrs: String,
    mode: MarkdownAttr,
    /// Byte offset just past the opening tag's `>`.
    content_start: usize,
}

pub fn process(text: &str, options: &Options) -> String {
    if !text.contains("markdown=") {
        return text.to_string();
    }

    let mut output = String::with_capacity(text.len());
    let mut pos = 0;

    while let Some(tag) = find_annotated_tag(text, pos) {
        let Some((content_end, after_close)) = find_matching_close(text, tag.content_start, tag.tag)
        else {
            // No closing tag: leave everything from here untouched.
            break;
        };

        output.push_str(&text[pos..tag.start]);

        let content = &text[tag.content_start..content_end];
        // Inside-out: nested annotated blocks resolve first.
        let content = process(content, options);

        let rendered = match tag.mode {
            MarkdownAttr::Off => content,
            MarkdownAttr::Block => convert_fragment(&content, options),
            MarkdownAttr::Span => strip_paragraph(&convert_fragment(&content, options)),
        };

        output.push('<');
        output.push_str(tag.tag);
        if !tag.clean_attrs.trim().is_empty() {
            output.push(' ');
            output.push_str(tag.clean_attrs.trim());
        }
        output.push_str(">\n");
        output.push_str(rendered.trim_end_matches('\n'));
        output.push_str("\n</");
        output.push_str(tag.tag);
        output.push('>');

        pos = after_close;
    }

    output.push_str(&text[pos..]);
    output
}

/// Run a sub-conversion with document-level machinery disabled.
fn convert_fragment(content: &str, options: &Options) -> String {
    let mut sub = options.clone();
    sub.standalone = false;
    sub.pretty = false;
    sub.markdown_in_html = false;
    match crate::convert(content, &sub) {
        Ok(html) => html,
        Err(err) => {
            debug!("markdown-in-html sub-conversion failed: {err}");
            content.to_string()
        }
    }
}

/// Strip a single outer `<p>…</p>` wrapper.
fn strip_paragraph(html: &str) -> String {
    let trimmed = html.trim();
    if let Some(inner) = trimmed
        .strip_prefix("<p>")
        .and_then(|s| s.strip_suffix("</p>"))
    {
        if !inner.contains("<p>") {
            return inner.to_string();
        }
    }
    trimmed.to_string()
}

/// Find the next opening tag bearing a `markdown` attribute at or after
/// `from`.
fn find_annotated_tag(text: &str, from: usize) -> Option<AnnotatedTag<'_>> {
    let mut pos = from;
    while let Some(rel) = text[pos..].find('<') {
        let start = pos + rel;
        pos = start + 1;

        let rest = &text[start + 1..];
        let tag_len = rest
            .bytes()
            .take_while(|b| b.is_ascii_alphanumeric())
            .count();
        if tag_len == 0 {
            continue;
        }
        let tag = &rest[..tag_len];

        let Some(close_rel) = rest.find('>') else {
            return None;
        };
        if close_rel < tag_len {
            continue;
        }
        let attrs = &rest[tag_len..close_rel];
        if attrs.ends_with('/') {
            continue;
        }

        if let Some((mode, clean_attrs)) = extract_markdown_attr(attrs) {
            return Some(AnnotatedTag {
                start,
                tag,
                clean_attrs,
                mode,
                content_start: start + 1 + close_rel + 1,
            });
        }
    }
    None
}

/// Pull the `markdown="…"` attribute out of an attribute string. Returns
/// the parsed mode and the remaining attributes.
fn extract_markdown_attr(attrs: &str) -> Option<(MarkdownAttr, String)> {
    let lower = attrs.to_ascii_lowercase();
    let key_pos = lower.find("markdown")?;

    let tail = &attrs[key_pos + 8..];
    let ws_before_eq = tail.len() - tail.trim_start().len();
    let after_ws = tail.trim_start();
    let after_eq_raw = after_ws.strip_prefix('=')?;
    let ws_after_eq = after_eq_raw.len() - after_eq_raw.trim_start().len();
    let after_eq = after_eq_raw.trim_start();

    let (value, value_len) = if let Some(rest) = after_eq.strip_prefix('"') {
        let end = rest.find('"')?;
        (&rest[..end], end + 2)
    } else if let Some(rest) = after_eq.strip_prefix('\'') {
        let end = rest.find('\'')?;
        (&rest[..end], end + 2)
    } else {
        let end = after_eq
            .find(|c: char| c.is_whitespace())
            .unwrap_or(after_eq.len());
        (&after_eq[..end], end)
    };

    let mode = match value.to_ascii_lowercase().as_str() {
        "1" | "block" => MarkdownAttr::Block,
        "span" => MarkdownAttr::Span,
        "0" => MarkdownAttr::Off,
        _ => return None,
    };

    let value_end = key_pos + 8 + ws_before_eq + 1 + ws_after_eq + value_len;
    let mut clean = String::new();
    clean.push_str(&attrs[..key_pos]);
    clean.push_str(&attrs[value_end.min(attrs.len())..]);
    Some((mode, clean))
}

/// Find the matching close tag for `tag`, honoring nesting of the same
/// tag name. Returns `(content_end, after_close)`.
fn find_matching_close(text: &str, from: usize, tag: &str) -> Option<(usize, usize)> {
    let open_pat = format!("<{tag}");
    let close_pat = format!("</{tag}");
    let lower = text.to_ascii_lowercase();
    let open_pat = open_pat.to_ascii_lowercase();
    let close_pat = close_pat.to_ascii_lowercase();

    let mut depth = 0usize;
    let mut pos = from;

    while pos < text.len() {
        let next_open = lower[pos..].find(&open_pat).map(|i| pos + i);
        let next_close = lower[pos..].find(&close_pat).map(|i| pos + i);

        match (next_open, next_close) {
            (Some(open), Some(close)) if open < close && tag_boundary(&lower, open, &open_pat) => {
                depth += 1;
                pos = open + open_pat.len();
            }
            (_, Some(close)) => {
                if depth == 0 {
                    let after = lower[close..].find('>').map(|i| close + i + 1)?;
                    return Some((close, after));
                }
                depth -= 1;
                pos = close + close_pat.len();
            }
            _ => return None,
        }
    }
    None
}

/// The byte after `<tag` must not extend the tag name.
fn tag_boundary(lower: &str, open: usize, open_pat: &str) -> bool {
    !lower[open + open_pat.len()..]
        .bytes()
        .next()
        .is_some_and(|b| b.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;

    fn opts() -> Options {
        Options::default()
    }

    #[test]
    fn block_content_is_converted() {
        let out = process("<div markdown=\"1\">\n*hi*\n</div>\n", &opts());
        assert!(out.contains("<em>hi</em>"));
        assert!(!out.contains("markdown="));
    }

    #[test]
    fn span_strips_paragraph_wrapper() {
        let out = process("<span markdown=\"span\">*hi*</span>", &opts());
        assert!(out.contains("<em>hi</em>"));
        assert!(!out.contains("<p>"));
    }

    #[test]
    fn markdown_zero_keeps_content_verbatim() {
        let out = process("<div markdown=\"0\">\n*raw*\n</div>", &opts());
        assert!(out.contains("*raw*"));
        assert!(!out.contains("<em>"));
    }

    #[test]
    fn unclosed_tag_is_left_alone() {
        let src = "<div markdown=\"1\">\n*hi*\n";
        assert_eq!(process(src, &opts()), src);
    }

    #[test]
    fn other_attributes_survive() {
        let out = process("<div class=\"x\" markdown=\"1\">\nhi\n</div>", &opts());
        assert!(out.contains("<div class=\"x\">"));
    }
}
