//! Document metadata: extraction, storage, and `[%key]` substitution.
//!
//! Three head-of-document formats are auto-detected:
//!
//! ```text
//! ---                          Title: My Document        % My Document
//! title: My Document           Author: Someone           % Someone
//! ---                                                    % 2026-01-01
//! (YAML front matter)          (MMD key/value block)     (Pandoc title block)
//! ```
//!
//! Values may continue on following lines indented with whitespace. Keys
//! are stored as written; every lookup normalizes both sides (lowercase,
//! whitespace and `-`/`_` separators stripped) so `Base Header Level`,
//! `base-header-level` and `baseheaderlevel` all name the same entry.

mod transforms;

pub(crate) use transforms::apply_transform_chain;

use std::fs;
use std::path::Path;

use log::{debug, warn};

/// Ordered key/value store extracted from the document head.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    items: Vec<(String, String)>,
    /// Citable keys absorbed from bibliography files: `(key, display)`.
    bibliography: Vec<(String, String)>,
}

/// Lookup normalization: lowercase with whitespace and word separators
/// removed.
pub(crate) fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

impl Metadata {
    pub fn new() -> Self {
        Metadata::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.items.push((key.to_string(), value.to_string()));
    }

    /// Normalized lookup. Later entries win, matching how repeated keys
    /// override earlier ones in document heads.
    pub fn get(&self, key: &str) -> Option<String> {
        let wanted = normalize_key(key);
        self.items
            .iter()
            .rev()
            .find(|(k, _)| normalize_key(k) == wanted)
            .map(|(_, v)| v.clone())
    }

    /// Iterate entries in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Keys citable from the absorbed bibliography, in file order.
    pub fn bibliography_entries(&self) -> &[(String, String)] {
        &self.bibliography
    }

    pub fn has_bibliography_key(&self, key: &str) -> bool {
        self.bibliography.iter().any(|(k, _)| k == key)
    }

    pub fn bibliography_display(&self, key: &str) -> Option<&str> {
        self.bibliography
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Absorb a bibliography file as an opaque side map. Only the set of
    /// citable keys and a display string per key are learned; no citation
    /// style processing happens here.
    pub fn absorb_bibliography(&mut self, path: &Path) {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                warn!("bibliography {} unreadable: {err}", path.display());
                return;
            }
        };

        let mut current_key: Option<String> = None;
        for line in content.lines() {
            let trimmed = line.trim();
            // BibTeX-ish entry header: @article{key,
            if let Some(rest) = trimmed.strip_prefix('@') {
                if let Some(brace) = rest.find('{') {
                    let key = rest[brace + 1..].trim_end_matches(',').trim();
                    if !key.is_empty() {
                        self.bibliography.push((key.to_string(), key.to_string()));
                        current_key = Some(key.to_string());
                    }
                }
                continue;
            }
            // title = {...} inside the current entry becomes its display string.
            if let Some(key) = &current_key {
                let lower = trimmed.to_ascii_lowercase();
                if lower.starts_with("title") {
                    if let Some(eq) = trimmed.find('=') {
                        let display = trimmed[eq + 1..]
                            .trim()
                            .trim_end_matches(',')
                            .trim_matches(|c| c == '{' || c == '}' || c == '"')
                            .trim();
                        if !display.is_empty() {
                            if let Some(entry) =
                                self.bibliography.iter_mut().find(|(k, _)| k == key)
                            {
                                entry.1 = display.to_string();
                            }
                        }
                    }
                }
            }
        }
        debug!(
            "absorbed {} bibliography keys from {}",
            self.bibliography.len(),
            path.display()
        );
    }
}

/// Extract metadata from the head of `source`, returning the store and the
/// body with the metadata block removed. Malformed blocks are skipped and
/// the source is returned unchanged.
pub fn extract(source: &str) -> (Metadata, String) {
    let mut metadata = Metadata::new();

    if let Some(body) = extract_yaml(source, &mut metadata) {
        return (metadata, body);
    }
    if let Some(body) = extract_pandoc(source, &mut metadata) {
        return (metadata, body);
    }
    if let Some(body) = extract_mmd(source, &mut metadata) {
        return (metadata, body);
    }

    (metadata, source.to_string())
}

/// YAML front matter: `---` fences at the very top. An unterminated fence
/// leaves the source untouched.
fn extract_yaml(source: &str, metadata: &mut Metadata) -> Option<String> {
    let mut lines = source.lines();
    if lines.next()?.trim_end() != "---" {
        return None;
    }

    let mut consumed = source.lines().next()?.len() + 1;
    let mut pending: Option<(String, String)> = None;
    let mut closed = false;

    for line in lines {
        let line_len = line.len() + 1;
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            consumed += line_len;
            closed = true;
            break;
        }
        if let Some((key, value)) = split_key_line(line) {
            if let Some((k, v)) = pending.take() {
                metadata.insert(&k, &v);
            }
            pending = Some((key, value));
        } else if line.starts_with(' ') || line.starts_with('\t') {
            // Continuation of the previous value.
            if let Some((_, value)) = pending.as_mut() {
                if !value.is_empty() {
                    value.push(' ');
                }
                value.push_str(line.trim());
            }
        }
        // Garbage keys are skipped silently.
        consumed += line_len;
    }

    if !closed {
        return None;
    }
    if let Some((k, v)) = pending.take() {
        metadata.insert(&k, &v);
    }

    Some(source.get(consumed.min(source.len())..).unwrap_or("").to_string())
}

/// Pandoc title block: up to three `% ` lines mapping to title, author,
/// date.
fn extract_pandoc(source: &str, metadata: &mut Metadata) -> Option<String> {
    if !source.starts_with("% ") {
        return None;
    }

    const KEYS: [&str; 3] = ["title", "author", "date"];
    let mut consumed = 0;
    let mut count = 0;

    for line in source.lines() {
        if count >= 3 {
            break;
        }
        if let Some(value) = line.strip_prefix("% ") {
            metadata.insert(KEYS[count], value.trim());
            consumed += line.len() + 1;
            count += 1;
        } else {
            break;
        }
    }

    if count == 0 {
        return None;
    }
    Some(source.get(consumed.min(source.len())..).unwrap_or("").to_string())
}

/// MMD metadata: consecutive `Key: value` lines at the top, ending at the
/// first blank line. The colon must not be preceded by whitespace and the
/// key is letters/digits/spaces only.
fn extract_mmd(source: &str, metadata: &mut Metadata) -> Option<String> {
    let first = source.lines().next()?;
    split_mmd_key_line(first)?;

    let mut consumed = 0;
    let mut pending: Option<(String, String)> = None;

    for line in source.lines() {
        if line.trim().is_empty() {
            consumed += line.len() + 1;
            break;
        }
        if let Some((key, value)) = split_mmd_key_line(line) {
            if let Some((k, v)) = pending.take() {
                metadata.insert(&k, &v);
            }
            pending = Some((key, value));
        } else if (line.starts_with(' ') || line.starts_with('\t')) && pending.is_some() {
            if let Some((_, value)) = pending.as_mut() {
                if !value.is_empty() {
                    value.push(' ');
                }
                value.push_str(line.trim());
            }
        } else {
            // A non-metadata line before any blank line: not a metadata
            // block after all. Leave the source untouched.
            return None;
        }
        consumed += line.len() + 1;
    }

    if let Some((k, v)) = pending.take() {
        metadata.insert(&k, &v);
    }
    if metadata.is_empty() {
        return None;
    }

    Some(source.get(consumed.min(source.len())..).unwrap_or("").to_string())
}

/// `key: value` with a YAML-ish key (no leading whitespace).
fn split_key_line(line: &str) -> Option<(String, String)> {
    if line.starts_with(' ') || line.starts_with('\t') {
        return None;
    }
    let colon = line.find(':')?;
    let key = line[..colon].trim_end();
    if key.is_empty() || key.ends_with(char::is_whitespace) {
        return None;
    }
    Some((key.to_string(), line[colon + 1..].trim().to_string()))
}

/// MMD key line: stricter than YAML — letters, digits and spaces only.
fn split_mmd_key_line(line: &str) -> Option<(String, String)> {
    let (key, value) = split_key_line(line)?;
    if key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == ' ')
    {
        Some((key, value))
    } else {
        None
    }
}

/// Replace `[%key]` / `[%key:transform:...]` occurrences in `html` against
/// the metadata store. Unresolved keys and malformed transform chains are
/// left literal.
pub fn substitute_variables(html: &str, metadata: &Metadata) -> String {
    let mut output = String::with_capacity(html.len());
    let mut pos = 0;

    while let Some(start) = html[pos..].find("[%") {
        let start = pos + start;
        output.push_str(&html[pos..start]);

        let Some(end_rel) = html[start..].find(']') else {
            // No closer anywhere: emit the rest verbatim.
            output.push_str(&html[start..]);
            return output;
        };
        let end = start + end_rel;
        let expr = &html[start + 2..end];

        match expand_expression(expr, metadata) {
            Some(replacement) => output.push_str(&replacement),
            None => output.push_str(&html[start..=end]),
        }
        pos = end + 1;
    }

    output.push_str(&html[pos..]);
    output
}

/// Expand one `key[:transform...]` expression. `None` keeps the literal.
fn expand_expression(expr: &str, metadata: &Metadata) -> Option<String> {
    if expr.is_empty() || expr.contains('\n') {
        return None;
    }

    let segments = split_transform_chain(expr);
    let (key, chain) = segments.split_first()?;
    if key.trim().is_empty() {
        return None;
    }

    let value = metadata.get(key)?;
    let (result, escaped) = apply_transform_chain(&value, chain)?;
    if escaped {
        Some(result)
    } else {
        Some(escape_minimal(&result))
    }
}

/// Split a transform chain on `:` at parenthesis depth zero, so that
/// `replace(regex:a,b)` stays one segment.
fn split_transform_chain(expr: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for c in expr.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ':' if depth == 0 => {
                segments.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    segments.push(current);
    segments
}

fn escape_minimal(text: &str) -> String {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_front_matter_is_extracted() {
        let (metadata, body) = extract("---\ntitle: hello world\nauthor: me\n---\n# Body\n");
        assert_eq!(metadata.get("title").as_deref(), Some("hello world"));
        assert_eq!(metadata.get("author").as_deref(), Some("me"));
        assert_eq!(body, "# Body\n");
    }

    #[test]
    fn unterminated_yaml_is_skipped() {
        let source = "---\ntitle: broken\n# Body\n";
        let (metadata, body) = extract(source);
        assert!(metadata.is_empty());
        assert_eq!(body, source);
    }

    #[test]
    fn mmd_block_ends_at_blank_line() {
        let (metadata, body) = extract("Title: Doc\nAuthor: Someone\n\nBody text\n");
        assert_eq!(metadata.get("title").as_deref(), Some("Doc"));
        assert_eq!(metadata.get("author").as_deref(), Some("Someone"));
        assert_eq!(body, "Body text\n");
    }

    #[test]
    fn mmd_requires_colon_on_first_line() {
        let source = "Just a paragraph\nwith two lines\n";
        let (metadata, body) = extract(source);
        assert!(metadata.is_empty());
        assert_eq!(body, source);
    }

    #[test]
    fn pandoc_title_block() {
        let (metadata, body) = extract("% The Title\n% An Author\n% 2026-01-01\nBody\n");
        assert_eq!(metadata.get("title").as_deref(), Some("The Title"));
        assert_eq!(metadata.get("author").as_deref(), Some("An Author"));
        assert_eq!(metadata.get("date").as_deref(), Some("2026-01-01"));
        assert_eq!(body, "Body\n");
    }

    #[test]
    fn continuation_lines_join_values() {
        let (metadata, _) = extract("Title: first part\n    second part\n\nBody\n");
        assert_eq!(
            metadata.get("title").as_deref(),
            Some("first part second part")
        );
    }

    #[test]
    fn lookup_normalizes_keys() {
        let mut metadata = Metadata::new();
        metadata.insert("Base Header Level", "3");
        assert_eq!(metadata.get("base-header-level").as_deref(), Some("3"));
        assert_eq!(metadata.get("baseheaderlevel").as_deref(), Some("3"));
    }

    #[test]
    fn variables_replace_and_escape() {
        let mut metadata = Metadata::new();
        metadata.insert("title", "a < b");
        let html = substitute_variables("<p>[%title]</p>", &metadata);
        assert_eq!(html, "<p>a &lt; b</p>");
    }

    #[test]
    fn unresolved_variables_stay_literal() {
        let metadata = Metadata::new();
        let html = substitute_variables("<p>[%missing]</p>", &metadata);
        assert_eq!(html, "<p>[%missing]</p>");
    }

    #[test]
    fn transform_chain_applies() {
        let mut metadata = Metadata::new();
        metadata.insert("title", "hello world");
        let html = substitute_variables("<h1>[%title:title]</h1>", &metadata);
        assert_eq!(html, "<h1>Hello World</h1>");
    }

    #[test]
    fn malformed_transform_keeps_literal() {
        let mut metadata = Metadata::new();
        metadata.insert("title", "x");
        let html = substitute_variables("<p>[%title:nosuch]</p>", &metadata);
        assert_eq!(html, "<p>[%title:nosuch]</p>");
    }
}
