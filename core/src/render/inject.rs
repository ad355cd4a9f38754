//! Attribute injection by structural matching.
//!
//! The engine's renderer knows nothing about the attribute strings the
//! tree passes collected, so the rendered HTML is walked in parallel
//! with the tree: every tracked node kind keeps an occurrence counter
//! and a short content fingerprint, and each opening tag consumes the
//! first unused entry of its kind whose fingerprint (or, failing that,
//! occurrence index) lines up. Tables match strictly sequentially —
//! their fingerprints are unreliable.
//!
//! Internal markers are consumed here and never reach the output:
//! `data-remove` elides the whole element, `data-caption` wraps a table
//! in a `<figure class="table-figure">`, and the `data-apex-replace-*`
//! markers turn an `<img>` into `<video>`/`<picture>` elements.

use comrak::nodes::{AstNode, ListType, NodeValue};

use crate::options::{CaptionPosition, Options};
use crate::parser::inline_text;
use crate::rewrite::NodeAttrs;

const BLOCK_FINGERPRINT_LEN: usize = 50;
const ALT_FINGERPRINT_LEN: usize = 20;

#[derive(Debug)]
struct Entry {
    kind: &'static str,
    index: usize,
    fingerprint: Option<String>,
    attrs: String,
    used: bool,
}

/// Map a node to the HTML tag the renderer will emit for it.
fn kind_of<'a>(node: &'a AstNode<'a>) -> Option<&'static str> {
    Some(match &node.data.borrow().value {
        NodeValue::Paragraph => "p",
        NodeValue::Heading(heading) => match heading.level {
            1 => "h1",
            2 => "h2",
            3 => "h3",
            4 => "h4",
            5 => "h5",
            _ => "h6",
        },
        NodeValue::Table(_) => "table",
        NodeValue::BlockQuote => "blockquote",
        NodeValue::List(list) => match list.list_type {
            ListType::Bullet => "ul",
            ListType::Ordered => "ol",
        },
        NodeValue::Item(_) | NodeValue::TaskItem(_) => "li",
        NodeValue::CodeBlock(_) => "pre",
        NodeValue::Link(_) => "a",
        NodeValue::Image(_) => "img",
        NodeValue::Strong => "strong",
        NodeValue::Emph => "em",
        NodeValue::Code(_) => "code",
        NodeValue::ThematicBreak => "hr",
        _ => return None,
    })
}

fn first_text_leaf<'a>(node: &'a AstNode<'a>) -> Option<String> {
    for descendant in node.descendants() {
        match &descendant.data.borrow().value {
            NodeValue::Text(text) if !text.trim().is_empty() => {
                return Some(prefix_chars(text, BLOCK_FINGERPRINT_LEN).to_string());
            }
            NodeValue::Code(code) if !code.literal.trim().is_empty() => {
                return Some(prefix_chars(&code.literal, BLOCK_FINGERPRINT_LEN).to_string());
            }
            _ => {}
        }
    }
    None
}

fn fingerprint_of<'a>(node: &'a AstNode<'a>, kind: &str) -> Option<String> {
    match kind {
        "a" => match &node.data.borrow().value {
            NodeValue::Link(link) => Some(link.url.clone()),
            _ => None,
        },
        "img" => match &node.data.borrow().value {
            NodeValue::Image(image) => {
                let alt = inline_text(node);
                Some(format!(
                    "{}|{}",
                    image.url,
                    prefix_chars(&alt, ALT_FINGERPRINT_LEN)
                ))
            }
            _ => None,
        },
        "strong" | "em" => {
            let text = inline_text(node);
            (!text.is_empty()).then(|| prefix_chars(&text, BLOCK_FINGERPRINT_LEN).to_string())
        }
        "code" => match &node.data.borrow().value {
            NodeValue::Code(code) => {
                Some(prefix_chars(&code.literal, BLOCK_FINGERPRINT_LEN).to_string())
            }
            _ => None,
        },
        "table" => None,
        _ => first_text_leaf(node),
    }
}

/// Truncate to `n` characters without splitting a code point.
fn prefix_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Collect entries for every attributed node, with per-kind occurrence
/// indices counted over all nodes of that kind.
fn collect_entries<'a>(root: &'a AstNode<'a>, attrs: &NodeAttrs) -> Vec<Entry> {
    let mut counters: std::collections::HashMap<&'static str, usize> =
        std::collections::HashMap::new();
    let mut entries = Vec::new();

    for node in root.descendants() {
        let Some(kind) = kind_of(node) else {
            continue;
        };
        let index = {
            let counter = counters.entry(kind).or_insert(0);
            let current = *counter;
            *counter += 1;
            current
        };
        if let Some(attr_string) = attrs.get(node) {
            entries.push(Entry {
                kind,
                index,
                fingerprint: fingerprint_of(node, kind),
                attrs: attr_string.to_string(),
                used: false,
            });
        }
    }

    entries
}

/// Inject the collected attribute strings into the rendered HTML.
pub fn inject<'a>(
    html: &str,
    root: &'a AstNode<'a>,
    attrs: &NodeAttrs,
    options: &Options,
) -> String {
    if attrs.is_empty() {
        return html.to_string();
    }

    let mut entries = collect_entries(root, attrs);
    if entries.is_empty() {
        return html.to_string();
    }

    let mut scanner = Scanner::new(html, options);
    scanner.run(&mut entries);
    scanner.output
}

/// Pending `</table>` work for a caption figure.
struct FigureState {
    table_depth: usize,
    caption: String,
    below: bool,
}

/// Pending element elision for `data-remove`.
struct RemoveState {
    tag: String,
    depth: usize,
}

struct Scanner<'h, 'o> {
    html: &'h str,
    output: String,
    options: &'o Options,
    counters: std::collections::HashMap<String, usize>,
    figures: Vec<FigureState>,
    removing: Option<RemoveState>,
    table_depth: usize,
    last_open_was_pre: bool,
}

impl<'h, 'o> Scanner<'h, 'o> {
    fn new(html: &'h str, options: &'o Options) -> Self {
        Scanner {
            html,
            output: String::with_capacity(html.len() + 256),
            options,
            counters: std::collections::HashMap::new(),
            figures: Vec::new(),
            removing: None,
            table_depth: 0,
            last_open_was_pre: false,
        }
    }

    fn emit(&mut self, text: &str) {
        if self.removing.is_none() {
            self.output.push_str(text);
        }
    }

    fn run(&mut self, entries: &mut [Entry]) {
        let html = self.html;
        let mut pos = 0;

        while pos < html.len() {
            let Some(rel) = html[pos..].find('<') else {
                self.emit(&html[pos..]);
                break;
            };
            let tag_start = pos + rel;
            self.emit(&html[pos..tag_start]);

            let Some(tag_end_rel) = html[tag_start..].find('>') else {
                // Truncated tag: copy byte-for-byte, do not rewrite.
                self.emit(&html[tag_start..]);
                break;
            };
            let tag_end = tag_start + tag_end_rel;
            let tag_text = &html[tag_start..=tag_end];

            pos = tag_end + 1;

            if let Some(rest) = tag_text.strip_prefix("</") {
                let name = tag_name(rest);
                self.handle_close(&name, tag_text);
                continue;
            }

            let name = tag_name(&tag_text[1..]);
            if name.is_empty() {
                // Comment or doctype-ish content.
                self.emit(tag_text);
                continue;
            }

            self.handle_open(&name, tag_text, tag_start, tag_end, entries);
        }

        // Unclosed removal or figure states: fail open by doing nothing
        // more (the skipped prefix is already gone, which matches the
        // copy-through policy for malformed HTML).
    }

    fn handle_close(&mut self, name: &str, tag_text: &str) {
        if let Some(state) = &mut self.removing {
            if state.tag == name {
                state.depth -= 1;
                if state.depth == 0 {
                    self.removing = None;
                }
            }
            return;
        }

        if name == "table" {
            self.table_depth = self.table_depth.saturating_sub(1);
            if let Some(figure) = self
                .figures
                .last()
                .filter(|f| f.table_depth == self.table_depth)
            {
                let caption = figure.caption.clone();
                let below = figure.below;
                self.figures.pop();
                self.output.push_str("</table>");
                if below {
                    self.output
                        .push_str(&format!("<figcaption>{caption}</figcaption>"));
                }
                self.output.push_str("</figure>");
                return;
            }
        }

        self.emit(tag_text);
    }

    fn handle_open(
        &mut self,
        name: &str,
        tag_text: &str,
        _tag_start: usize,
        tag_end: usize,
        entries: &mut [Entry],
    ) {
        if let Some(state) = &mut self.removing {
            if state.tag == name && !tag_text.ends_with("/>") {
                state.depth += 1;
            }
            return;
        }

        let tracked = matches!(
            name,
            "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "table" | "blockquote" | "ul"
                | "ol" | "li" | "pre" | "a" | "img" | "strong" | "em" | "code" | "hr"
        );

        // <code> directly inside <pre> belongs to the code block, not the
        // inline-code counter.
        let skip_code_in_pre = name == "code" && self.last_open_was_pre;
        self.last_open_was_pre = name == "pre";

        if name == "table" {
            self.table_depth += 1;
        }

        if !tracked || skip_code_in_pre {
            self.emit(tag_text);
            return;
        }

        let occurrence = {
            let counter = self.counters.entry(name.to_string()).or_insert(0);
            let current = *counter;
            *counter += 1;
            current
        };

        let html_fp = self.html_fingerprint(name, tag_text, tag_end);
        let Some(entry_idx) = find_entry(entries, name, occurrence, html_fp.as_deref()) else {
            self.emit(tag_text);
            return;
        };
        let entry = &mut entries[entry_idx];
        entry.used = true;
        let attr_pairs = parse_attr_string(&entry.attrs);

        // data-remove: elide the element entirely.
        if attr_pairs.iter().any(|(k, _)| k == "data-remove") {
            if is_void_tag(name) || tag_text.ends_with("/>") {
                return;
            }
            self.removing = Some(RemoveState {
                tag: name.to_string(),
                depth: 1,
            });
            if name == "table" {
                self.table_depth = self.table_depth.saturating_sub(1);
            }
            return;
        }

        // Media replacement markers on images.
        if name == "img" {
            if attr_pairs.iter().any(|(k, _)| k == "data-apex-replace-video") {
                self.output.push_str(&video_replacement(tag_text, &attr_pairs));
                return;
            }
            if attr_pairs
                .iter()
                .any(|(k, _)| k == "data-apex-replace-picture")
            {
                self.output
                    .push_str(&picture_replacement(tag_text, &attr_pairs));
                return;
            }
        }

        // Table caption: open a figure, move the table's own visible
        // attributes onto the <table> tag.
        if name == "table" {
            if let Some((_, caption)) = attr_pairs.iter().find(|(k, _)| k == "data-caption") {
                let below = self.options.caption_position == CaptionPosition::Below;
                self.output.push_str("<figure class=\"table-figure\">");
                if !below {
                    self.output
                        .push_str(&format!("<figcaption>{caption}</figcaption>"));
                }
                self.figures.push(FigureState {
                    table_depth: self.table_depth - 1,
                    caption: caption.clone(),
                    below,
                });
                let visible = visible_attrs(&attr_pairs);
                self.output.push_str(&splice_attrs(tag_text, &visible));
                return;
            }
        }

        let visible = visible_attrs(&attr_pairs);
        if visible.is_empty() {
            self.emit(tag_text);
        } else {
            let spliced = splice_attrs(tag_text, &visible);
            self.emit(&spliced);
        }
    }

    /// Extract the HTML-side fingerprint for a just-opened tag.
    fn html_fingerprint(&self, name: &str, tag_text: &str, tag_end: usize) -> Option<String> {
        match name {
            "a" => attr_from_tag(tag_text, "href"),
            "img" => {
                let src = attr_from_tag(tag_text, "src").unwrap_or_default();
                let alt = attr_from_tag(tag_text, "alt").unwrap_or_default();
                Some(format!("{src}|{}", prefix_chars(&alt, ALT_FINGERPRINT_LEN)))
            }
            "table" | "hr" => None,
            _ => {
                let text = visible_text_after(&self.html[tag_end + 1..]);
                (!text.is_empty()).then_some(text)
            }
        }
    }
}

/// First `BLOCK_FINGERPRINT_LEN` characters of element text, skipping
/// nested tags and decoding the few entities the renderer emits.
fn visible_text_after(html: &str) -> String {
    let mut text = String::new();
    let mut in_tag = false;
    let mut chars = html.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        match c {
            '<' => {
                // Stop at the first close tag once we have any text.
                if html[idx..].starts_with("</") && !text.is_empty() {
                    break;
                }
                in_tag = true;
            }
            '>' => in_tag = false,
            _ if !in_tag => {
                if c == '&' {
                    let rest = &html[idx..];
                    let (decoded, len) = decode_entity(rest);
                    text.push(decoded);
                    for _ in 0..len.saturating_sub(1) {
                        chars.next();
                    }
                } else {
                    text.push(c);
                }
                if text.chars().count() >= BLOCK_FINGERPRINT_LEN {
                    break;
                }
            }
            _ => {}
        }
    }

    text.trim_start().to_string()
}

fn decode_entity(rest: &str) -> (char, usize) {
    for (entity, decoded) in [
        ("&amp;", '&'),
        ("&lt;", '<'),
        ("&gt;", '>'),
        ("&quot;", '"'),
        ("&#39;", '\''),
    ] {
        if rest.starts_with(entity) {
            return (decoded, entity.len());
        }
    }
    ('&', 1)
}

fn find_entry(
    entries: &[Entry],
    kind: &str,
    occurrence: usize,
    html_fp: Option<&str>,
) -> Option<usize> {
    for (idx, entry) in entries.iter().enumerate() {
        if entry.used || entry.kind != kind {
            continue;
        }
        // Tables: strict sequential matching.
        if kind == "table" {
            if entry.index == occurrence {
                return Some(idx);
            }
            continue;
        }
        let fp_match = match (&entry.fingerprint, html_fp) {
            (Some(tree_fp), Some(html_fp)) if !tree_fp.is_empty() && !html_fp.is_empty() => {
                fingerprints_agree(tree_fp, html_fp)
            }
            _ => false,
        };
        if fp_match || (entry.fingerprint.is_none() && entry.index == occurrence) {
            return Some(idx);
        }
        // A fingerprinted entry may still fall back to its index when the
        // HTML offered nothing to compare against.
        if html_fp.is_none() && entry.index == occurrence {
            return Some(idx);
        }
    }
    None
}

fn fingerprints_agree(a: &str, b: &str) -> bool {
    let a = a.trim();
    let b = b.trim();
    !a.is_empty() && !b.is_empty() && (a.starts_with(b) || b.starts_with(a))
}

/// `key="value"` pairs plus bare flags from an attribute string.
fn parse_attr_string(attrs: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut rest = attrs.trim();

    while !rest.is_empty() {
        let key_end = rest
            .find(|c: char| c == '=' || c.is_whitespace())
            .unwrap_or(rest.len());
        let key = &rest[..key_end];
        rest = &rest[key_end..];

        if let Some(after_eq) = rest.strip_prefix('=') {
            let (value, consumed) = if let Some(quoted) = after_eq.strip_prefix('"') {
                match quoted.find('"') {
                    Some(end) => (&quoted[..end], end + 2),
                    None => (quoted, after_eq.len()),
                }
            } else {
                let end = after_eq
                    .find(char::is_whitespace)
                    .unwrap_or(after_eq.len());
                (&after_eq[..end], end)
            };
            pairs.push((key.to_string(), value.to_string()));
            rest = after_eq[consumed.min(after_eq.len())..].trim_start();
        } else {
            if !key.is_empty() {
                pairs.push((key.to_string(), String::new()));
            }
            rest = rest.trim_start();
        }
    }

    pairs
}

/// Drop internal markers; everything else is written to the output.
fn visible_attrs(pairs: &[(String, String)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .filter(|(key, _)| {
            key != "data-remove"
                && key != "data-caption"
                && !key.starts_with("data-apex-replace-")
                && !key.starts_with("data-apex-video-")
                && !key.starts_with("data-apex-picture-")
        })
        .cloned()
        .collect()
}

/// Insert attributes into an opening tag, before `>` or `/>`.
fn splice_attrs(tag_text: &str, pairs: &[(String, String)]) -> String {
    if pairs.is_empty() {
        return tag_text.to_string();
    }
    let mut rendered = String::new();
    for (key, value) in pairs {
        rendered.push(' ');
        rendered.push_str(key);
        if !value.is_empty() || key.contains('-') {
            rendered.push_str("=\"");
            rendered.push_str(value);
            rendered.push('"');
        }
    }

    let insert_at = if tag_text.ends_with("/>") {
        tag_text.len() - 2
    } else {
        tag_text.len() - 1
    };
    let mut out = String::with_capacity(tag_text.len() + rendered.len());
    out.push_str(tag_text[..insert_at].trim_end());
    out.push_str(&rendered);
    out.push_str(&tag_text[insert_at..]);
    out
}

fn attr_from_tag(tag_text: &str, name: &str) -> Option<String> {
    let pattern = format!("{name}=\"");
    let start = tag_text.find(&pattern)? + pattern.len();
    let end = tag_text[start..].find('"')? + start;
    Some(tag_text[start..end].to_string())
}

fn tag_name(after_bracket: &str) -> String {
    after_bracket
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

fn is_void_tag(name: &str) -> bool {
    matches!(name, "img" | "hr" | "br" | "source" | "input" | "meta" | "link")
}

/// `<img …>` to `<video controls><source …></video>` using the
/// `data-apex-video-<ext>` sources (falling back to the image src).
fn video_replacement(tag_text: &str, pairs: &[(String, String)]) -> String {
    let mut video = String::from("<video controls");
    if let Some(alt) = attr_from_tag(tag_text, "alt") {
        if !alt.is_empty() {
            video.push_str(&format!(" aria-label=\"{alt}\""));
        }
    }
    video.push('>');

    let mut any_source = false;
    for (key, value) in pairs {
        if let Some(ext) = key.strip_prefix("data-apex-video-") {
            video.push_str(&format!(
                "<source src=\"{value}\" type=\"video/{}\">",
                video_mime_subtype(ext)
            ));
            any_source = true;
        }
    }
    if !any_source {
        if let Some(src) = attr_from_tag(tag_text, "src") {
            let ext = src.rsplit('.').next().unwrap_or("mp4");
            video.push_str(&format!(
                "<source src=\"{src}\" type=\"video/{}\">",
                video_mime_subtype(ext)
            ));
        }
    }
    video.push_str("</video>");
    video
}

fn video_mime_subtype(ext: &str) -> &str {
    match ext {
        "mov" => "quicktime",
        "m4v" => "mp4",
        other => {
            if other.is_empty() {
                "mp4"
            } else {
                other
            }
        }
    }
}

/// `<img …>` to `<picture>` with webp/avif sources ahead of the original.
fn picture_replacement(tag_text: &str, pairs: &[(String, String)]) -> String {
    let mut picture = String::from("<picture>");
    for format in ["avif", "webp"] {
        let key = format!("data-apex-picture-{format}");
        if let Some((_, srcset)) = pairs.iter().find(|(k, _)| *k == key) {
            picture.push_str(&format!(
                "<source srcset=\"{srcset}\" type=\"image/{format}\">"
            ));
        }
    }
    // Re-emit the original img with visible extra attributes only.
    let visible = visible_attrs(pairs);
    picture.push_str(&splice_attrs(tag_text, &visible));
    picture.push_str("</picture>");
    picture
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attr_string_parsing() {
        let pairs = parse_attr_string("id=\"go\" class=\"btn wide\" data-remove");
        assert_eq!(pairs[0], ("id".into(), "go".into()));
        assert_eq!(pairs[1], ("class".into(), "btn wide".into()));
        assert_eq!(pairs[2], ("data-remove".into(), String::new()));
    }

    #[test]
    fn splice_before_closing_bracket() {
        let out = splice_attrs("<a href=\"u\">", &[("id".into(), "go".into())]);
        assert_eq!(out, "<a href=\"u\" id=\"go\">");
        let out = splice_attrs("<img src=\"x\" />", &[("class".into(), "wide".into())]);
        assert_eq!(out, "<img src=\"x\" class=\"wide\"/>");
    }

    #[test]
    fn fingerprint_agreement_is_prefix_based() {
        assert!(fingerprints_agree("hello world", "hello"));
        assert!(fingerprints_agree("hello", "hello world"));
        assert!(!fingerprints_agree("hello", "goodbye"));
    }

    #[test]
    fn visible_text_skips_nested_tags_and_entities() {
        let text = visible_text_after("<strong>bold</strong> a &lt; b</p>rest");
        assert!(text.starts_with("bold a < b"));
    }
}
