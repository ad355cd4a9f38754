//! HTML rendering and the post-processor chain.
//!
//! The tree is rendered through the engine, attribute strings are
//! injected by structural matching, and then a fixed sequence of
//! HTML-to-HTML passes runs. Each pass is a pure function gated on its
//! owning feature flag; each returns a fresh buffer that replaces the
//! previous one.

pub mod aria;
pub mod headers;
pub mod inject;
pub mod media;
pub mod pretty;
pub mod tables;
pub mod text;
pub mod toc;
pub mod wrap;

use comrak::nodes::AstNode;
use comrak::Options as ComrakOptions;
use log::debug;

use crate::error::ApexError;
use crate::metadata::{self, Metadata};
use crate::options::Options;
use crate::parser;
use crate::plugins::{self, PluginPhase};
use crate::preprocess::table_spans::{COLSPAN_MARKER, ROWSPAN_MARKER};
use crate::preprocess::PreprocessContext;
use crate::rewrite::RewriteOutcome;

const PAGE_BREAK_DIV: &str =
    "<div class=\"page-break\" style=\"page-break-after: always;\"></div>";

/// Render the rewritten tree and run the whole post-processing chain.
pub fn run<'a>(
    root: &'a AstNode<'a>,
    engine: &ComrakOptions,
    options: &Options,
    outcome: &RewriteOutcome,
    ctx: &PreprocessContext,
    metadata: &Metadata,
) -> Result<String, ApexError> {
    options.progress("Rendering HTML", 60);
    let rendered = parser::render(root, engine);
    let mut html = inject::inject(&rendered, root, &outcome.attrs, options);

    options.progress("Post-processing", 75);

    if options.tables {
        html = tables::process_spans(&html, options.per_cell_alignment);
        html = restore_stray_span_markers(&html);
    }

    if options.generate_header_ids {
        html = headers::inject_ids(&html, &outcome.headers, options);
    }

    if options.marked_extensions {
        html = toc::expand(&html, &outcome.headers);
    }

    // Variables resolve after the TOC so TOC-inserted text can itself be
    // substituted; the marker can never be computed from a variable.
    if options.metadata_variables && !metadata.is_empty() {
        html = metadata::substitute_variables(&html, metadata);
    }

    if !ctx.abbreviations.is_empty() {
        html = text::wrap_abbreviations(&html, &ctx.abbreviations);
    }

    if options.emoji {
        html = text::replace_emoji(&html);
    }

    html = text::clean_tag_spacing(&html);

    if options.relaxed_tables && options.tables {
        html = tables::convert_relaxed_heads(&html);
    }
    html = tables::remove_blank_lines(&html);
    if options.tables {
        html = tables::remove_separator_rows(&html);
    }

    if options.marked_extensions {
        if let Some(base) = &options.base_directory {
            html = media::expand_auto_media(&html, base);
        }
    }
    if options.image_captions {
        html = media::convert_image_captions(&html, options.title_captions_only);
    }
    if let Some(language) = &options.quotes_language {
        html = text::adjust_quote_language(&html, language);
    }
    if options.base_header_level > 1 {
        html = headers::shift_levels(&html, options.base_header_level);
    }
    if options.widont {
        html = headers::widont(&html);
    }
    if options.obfuscate_emails {
        html = text::obfuscate_emails(&html);
    }
    if options.aria {
        html = aria::apply(&html);
    }
    if options.hr_page_break {
        html = html
            .replace("<hr />", PAGE_BREAK_DIV)
            .replace("<hr>", PAGE_BREAK_DIV);
    }

    html = plugins::run_phase(html, PluginPhase::PostRender, options);
    html = plugins::run_filters(html, options)?;

    if options.standalone {
        options.progress("Wrapping document", 90);
        let params = wrap::DocumentParams::from_options(options);
        html = wrap::wrap_document(&html, &params);
    }

    if options.pretty {
        html = pretty::pretty_print(&html);
    }

    debug!("post-processing done: {} bytes", html.len());
    Ok(html)
}

/// Span markers that never met a table (a lone pipe line that stayed a
/// paragraph) are restored to the syntax the author wrote.
fn restore_stray_span_markers(html: &str) -> String {
    if !html.contains("@apex:") {
        return html.to_string();
    }
    html.replace(&format!("| {COLSPAN_MARKER} |"), "||")
        .replace(&format!("| {ROWSPAN_MARKER} |"), "| ^^ |")
        .replace(COLSPAN_MARKER, "")
        .replace(ROWSPAN_MARKER, "^^")
}
