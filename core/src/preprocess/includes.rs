//! File inclusion.
//!
//! Recognized inclusion syntaxes:
//!
//! ```text
//! /chapter-one.md          iA Writer transclusion, own line
//! {{snippet.md}}           MultiMarkdown transclusion ({{file.*}} wildcard)
//! <<[chapter.md]           Marked: markdown include
//! <<(main.rs)              Marked: fenced code include
//! <<{widget.html}          Marked: raw HTML include
//! ```
//!
//! Includes nest up to `max_include_depth`; beyond that the text is
//! returned unchanged, which also breaks inclusion cycles without any
//! shared visited-set. A marker whose file is missing or unreadable stays
//! literal in the output.

use std::fs;
use std::path::{Path, PathBuf};

use log::warn;

use crate::options::Options;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileType {
    Markdown,
    Image,
    Code,
    Html,
    Csv,
    Tsv,
    Text,
}

fn detect_file_type(path: &Path) -> FileType {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" | "png" | "gif" | "webp" | "svg" => FileType::Image,
        "csv" => FileType::Csv,
        "tsv" => FileType::Tsv,
        "html" | "htm" => FileType::Html,
        "md" | "markdown" | "mmd" => FileType::Markdown,
        "c" | "h" | "cpp" | "py" | "js" | "ts" | "java" | "swift" | "go" | "rs" | "sh"
        | "rb" | "toml" | "json" | "yaml" | "yml" => FileType::Code,
        _ => FileType::Text,
    }
}

/// Resolve `filepath` against the base directory, falling back to the
/// includer's own directory. Returns `None` when no candidate exists.
fn resolve(filepath: &str, base_dir: Option<&Path>) -> Option<PathBuf> {
    let path = Path::new(filepath);
    if path.is_absolute() {
        return path.exists().then(|| path.to_path_buf());
    }
    match base_dir {
        Some(base) => {
            let candidate = base.join(path);
            candidate.exists().then_some(candidate)
        }
        None => path.exists().then(|| path.to_path_buf()),
    }
}

/// `file.*` wildcard: try `.html`, `.md`, `.txt`, `.tex` in order.
fn resolve_wildcard(filepath: &str, base_dir: Option<&Path>) -> Option<PathBuf> {
    let stem = match filepath.strip_suffix(".*") {
        Some(stem) => stem,
        None => return resolve(filepath, base_dir),
    };
    for ext in [".html", ".md", ".txt", ".tex"] {
        if let Some(path) = resolve(&format!("{stem}{ext}"), base_dir) {
            return Some(path);
        }
    }
    None
}

/// Convert CSV/TSV content to a GFM pipe table (header row + separator).
fn csv_to_table(content: &str, is_tsv: bool) -> String {
    let delim = if is_tsv { '\t' } else { ',' };
    let mut output = String::with_capacity(content.len() * 2);
    let mut first_row = true;

    for line in content.lines() {
        if line.is_empty() {
            continue;
        }
        let cells: Vec<&str> = line.split(delim).collect();
        output.push('|');
        for cell in &cells {
            output.push(' ');
            output.push_str(cell.trim());
            output.push_str(" |");
        }
        output.push('\n');

        if first_row {
            output.push('|');
            for _ in &cells {
                output.push_str(" --- |");
            }
            output.push('\n');
            first_row = false;
        }
    }
    output
}

fn read_file(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(err) => {
            warn!("include {} unreadable: {err}", path.display());
            None
        }
    }
}

/// Expand one resolved file per its type. Markdown and text recurse with
/// the file's own directory as the new base.
fn expand_file(
    path: &Path,
    display_path: &str,
    depth: u32,
    options: &Options,
) -> Option<String> {
    let file_type = detect_file_type(path);
    match file_type {
        FileType::Image => Some(format!("![]({display_path})\n")),
        FileType::Csv | FileType::Tsv => {
            let content = read_file(path)?;
            Some(csv_to_table(&content, file_type == FileType::Tsv))
        }
        FileType::Code => {
            let content = read_file(path)?;
            let lang = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or_default();
            Some(format!("\n```{lang}\n{}\n```\n", content.trim_end()))
        }
        _ => {
            let content = read_file(path)?;
            let parent = path.parent().map(Path::to_path_buf);
            Some(process(&content, parent.as_deref(), depth + 1, options))
        }
    }
}

/// Process all include markers in `text`.
pub fn process(text: &str, base_dir: Option<&Path>, depth: u32, options: &Options) -> String {
    if depth > options.max_include_depth {
        return text.to_string();
    }

    let mut output = String::with_capacity(text.len());
    let bytes = text.as_bytes();
    let mut pos = 0;

    while pos < bytes.len() {
        let at_line_start = pos == 0 || bytes[pos - 1] == b'\n';

        // iA Writer transclusion: /path at line start, path must exist.
        if at_line_start && bytes[pos] == b'/' {
            let line_end = text[pos..]
                .find(|c| c == ' ' || c == '\t' || c == '\n' || c == '\r')
                .map_or(text.len(), |i| pos + i);
            let filepath = &text[pos + 1..line_end];
            if !filepath.is_empty() {
                // The leading slash is part of the marker, not the path.
                if let Some(resolved) = resolve(filepath, base_dir) {
                    if let Some(expanded) = expand_file(&resolved, filepath, depth, options) {
                        output.push_str(&expanded);
                        pos = line_end;
                        continue;
                    }
                }
            }
        }

        // MultiMarkdown transclusion: {{file}} with optional .* wildcard.
        if text[pos..].starts_with("{{") {
            if let Some(close) = text[pos + 2..].find("}}") {
                let filepath = &text[pos + 2..pos + 2 + close];
                if !filepath.is_empty() && !filepath.contains('\n') {
                    if let Some(resolved) = resolve_wildcard(filepath, base_dir) {
                        let expanded = match detect_file_type(&resolved) {
                            FileType::Csv | FileType::Tsv => {
                                expand_file(&resolved, filepath, depth, options)
                            }
                            _ => read_file(&resolved).map(|content| {
                                let parent = resolved.parent().map(Path::to_path_buf);
                                process(&content, parent.as_deref(), depth + 1, options)
                            }),
                        };
                        if let Some(expanded) = expanded {
                            output.push_str(&expanded);
                            pos += 2 + close + 2;
                            continue;
                        }
                    }
                }
            }
        }

        // Marked includes: <<[md], <<(code), <<{html}.
        if text[pos..].starts_with("<<") {
            let marker = text[pos..].chars().nth(2);
            let (open, close_char) = match marker {
                Some('[') => ('[', ']'),
                Some('(') => ('(', ')'),
                Some('{') => ('{', '}'),
                _ => (' ', ' '),
            };
            if open != ' ' {
                if let Some(close) = text[pos + 3..].find(close_char) {
                    let filepath = &text[pos + 3..pos + 3 + close];
                    if !filepath.is_empty() && !filepath.contains('\n') {
                        if let Some(resolved) = resolve(filepath, base_dir) {
                            let expanded = match open {
                                '[' => expand_markdown_include(&resolved, depth, options),
                                '(' => read_file(&resolved).map(|content| {
                                    let lang = resolved
                                        .extension()
                                        .and_then(|e| e.to_str())
                                        .unwrap_or_default()
                                        .to_string();
                                    format!("\n```{lang}\n{}\n```\n", content.trim_end())
                                }),
                                _ => read_file(&resolved),
                            };
                            if let Some(expanded) = expanded {
                                output.push_str(&expanded);
                                pos += 3 + close + 1;
                                continue;
                            }
                        }
                    }
                }
            }
        }

        // No include here: copy one character through.
        let ch_len = text[pos..].chars().next().map_or(1, char::len_utf8);
        output.push_str(&text[pos..pos + ch_len]);
        pos += ch_len;
    }

    output
}

fn expand_markdown_include(path: &Path, depth: u32, options: &Options) -> Option<String> {
    let file_type = detect_file_type(path);
    if matches!(file_type, FileType::Csv | FileType::Tsv) {
        let content = read_file(path)?;
        return Some(csv_to_table(&content, file_type == FileType::Tsv));
    }
    let content = read_file(path)?;
    let parent = path.parent().map(Path::to_path_buf);
    Some(process(&content, parent.as_deref(), depth + 1, options))
}
