//! Text-to-text passes that run before the CommonMark parser.
//!
//! Order is load-bearing: ALDs and abbreviations must leave the text
//! before includes splice more of it in, relaxed-table synthesis must
//! happen before the parser sees pipe runs, and Critic Markup has to be
//! resolved last so the other passes never look inside its braces.

pub mod abbreviations;
pub mod ald;
pub mod critic;
pub mod definition_lists;
pub mod footnotes;
pub mod highlight;
pub mod html_markdown;
pub mod includes;
pub mod markers;
pub mod relaxed_tables;
pub mod table_spans;

use std::collections::HashMap;

use log::debug;

use crate::options::{Mode, Options};
use crate::plugins::{self, PluginPhase};

/// Side-channel stores produced by the preprocessor chain and consumed by
/// later stages of the same conversion.
#[derive(Debug, Default)]
pub struct PreprocessContext {
    /// Attribute List Definitions: reference name -> attribute string.
    pub alds: HashMap<String, String>,
    /// `(abbreviation, expansion)` in definition order.
    pub abbreviations: Vec<(String, String)>,
}

/// Run the chain. Each pass is skipped when its owning feature flag is
/// off; each pass owns its output buffer.
pub fn run(text: String, options: &Options, ctx: &mut PreprocessContext) -> String {
    let dialect = matches!(
        options.mode,
        Mode::MultiMarkdown | Mode::Kramdown | Mode::Unified
    );
    let mut text = text;

    if options.attributes {
        text = ald::extract(text, &mut ctx.alds);
    }
    if dialect {
        text = abbreviations::extract(text, &mut ctx.abbreviations);
    }

    if options.file_includes {
        text = includes::process(&text, options.base_directory.as_deref(), 0, options);
    }
    // External pre-parse filters anchor to the include stage.
    text = plugins::run_phase(text, PluginPhase::PreParse, options);

    if options.marked_extensions {
        text = markers::process(&text);
    }
    if options.footnotes {
        text = footnotes::process_inline(&text);
    }
    if options.marked_extensions {
        text = highlight::process(&text);
    }
    if options.tables && dialect {
        text = table_spans::process(&text);
    }
    if options.relaxed_tables && options.tables {
        text = relaxed_tables::process(&text);
    }
    if options.definition_lists {
        text = definition_lists::process(&text);
    }
    if options.markdown_in_html && options.unsafe_html {
        text = html_markdown::process(&text, options);
    }
    if options.critic_markup {
        text = critic::process(&text, options.critic_mode);
    }

    text = plugins::run_phase(text, PluginPhase::Block, options);
    text = plugins::run_phase(text, PluginPhase::Inline, options);

    debug!(
        "preprocess done: {} bytes, {} alds, {} abbreviations",
        text.len(),
        ctx.alds.len(),
        ctx.abbreviations.len()
    );
    text
}
