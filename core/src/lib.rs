//! Apex core - unified Markdown processor
//!
//! One pipeline, five dialect modes (CommonMark, GFM, MultiMarkdown,
//! Kramdown, Unified): source text is normalized and preprocessed,
//! parsed through the embedded CommonMark/GFM engine, rewritten on the
//! tree, rendered, and post-processed to an HTML fragment or a complete
//! HTML5 document.

pub mod error;
pub mod metadata;
pub mod options;
pub mod parser;
pub mod plugins;
pub mod preprocess;
pub mod render;
pub mod rewrite;

// Re-export main API
pub use error::ApexError;
pub use metadata::Metadata;
pub use options::{
    CaptionPosition, CriticMode, IdFormat, Mode, Options, ParserEventFn, ProgressFn,
    WikiLinkSpace,
};
pub use plugins::{PluginPhase, PluginSpec};
pub use render::pretty::pretty_print;
pub use render::wrap::{wrap_document, DocumentParams};

use comrak::Arena;
use log::debug;

pub const VERSION_MAJOR: u32 = 0;
pub const VERSION_MINOR: u32 = 1;
pub const VERSION_PATCH: u32 = 0;

/// Crate version as a string.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Convert Markdown to an HTML fragment (or a full document when
/// `standalone` is set).
///
/// Empty input yields an empty string. The only error that can escape is
/// a strict-mode external-filter failure; every other fault degrades in
/// place per the never-panic-on-user-input policy.
pub fn convert(source: &str, options: &Options) -> Result<String, ApexError> {
    if source.is_empty() {
        return Ok(String::new());
    }

    let mut options = options.clone();
    options.progress("Reading source", 0);

    // CR and CRLF parse equivalently to LF everywhere downstream.
    let source = normalize_line_endings(source);

    // Metadata first: declared options layer onto the record before it
    // freezes for the rest of the conversion.
    let dialect = matches!(
        options.mode,
        Mode::MultiMarkdown | Mode::Kramdown | Mode::Unified
    );
    let (metadata, body) = if dialect && options.strip_metadata {
        metadata::extract(&source)
    } else {
        (Metadata::new(), source)
    };

    let mut metadata = metadata;
    if !metadata.is_empty() {
        debug!("document metadata: {} entries", metadata.iter().count());
        options.apply_metadata(&metadata);
    }
    for path in options.bibliography_files.clone() {
        metadata.absorb_bibliography(&path);
    }

    options.progress("Preprocessing", 10);
    let mut ctx = preprocess::PreprocessContext::default();
    let text = preprocess::run(body, &options, &mut ctx);

    options.progress("Parsing", 30);
    let engine = parser::engine_options(&options);
    let arena = Arena::new();
    if let Some(callback) = &options.parser_init_callback {
        callback();
    }
    let root = parser::parse(&arena, &text, &engine);
    if let Some(callback) = &options.parser_done_callback {
        callback();
    }

    options.progress("Rewriting tree", 45);
    let outcome = rewrite::run(&arena, root, &options, &ctx, &metadata);

    let html = render::run(root, &engine, &options, &outcome, &ctx, &metadata)?;
    options.progress("Done", 100);
    Ok(html)
}

/// [`convert`] with default (Unified) options. Strict filters are never
/// configured by default, so this cannot fail.
pub fn convert_with_defaults(source: &str) -> String {
    convert(source, &Options::default()).unwrap_or_default()
}

fn normalize_line_endings(source: &str) -> String {
    if !source.contains('\r') {
        return source.to_string();
    }
    source.replace("\r\n", "\n").replace('\r', "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_empty_output() {
        assert_eq!(convert_with_defaults(""), "");
    }

    #[test]
    fn cr_line_endings_normalize() {
        assert_eq!(normalize_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn plain_paragraph_converts() {
        let html = convert_with_defaults("Hello *world*.\n");
        assert!(html.contains("<p>Hello <em>world</em>.</p>"));
    }
}
