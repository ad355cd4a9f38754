//! Conversion options: mode presets plus individual feature toggles.
//!
//! An [`Options`] value is built once per conversion, optionally adjusted
//! from document metadata, and then consumed read-only by every stage of
//! the pipeline.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::metadata::Metadata;
use crate::plugins::PluginSpec;

/// Processor compatibility modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Pure CommonMark spec, extensions off.
    CommonMark,
    /// GitHub Flavored Markdown.
    Gfm,
    /// MultiMarkdown compatibility.
    MultiMarkdown,
    /// Kramdown compatibility.
    Kramdown,
    /// Every feature enabled.
    Unified,
}

impl Mode {
    /// Parse a metadata `mode:` value. Unknown names return `None`.
    pub fn parse(name: &str) -> Option<Mode> {
        match name.trim().to_ascii_lowercase().as_str() {
            "commonmark" => Some(Mode::CommonMark),
            "gfm" | "github" => Some(Mode::Gfm),
            "mmd" | "multimarkdown" => Some(Mode::MultiMarkdown),
            "kramdown" => Some(Mode::Kramdown),
            "unified" | "apex" => Some(Mode::Unified),
            _ => None,
        }
    }
}

/// How Critic Markup annotations are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CriticMode {
    /// Keep the annotations visible as `<ins>`/`<del>`/`<mark>` spans.
    Markup,
    /// Apply additions and substitutions, drop deletions and comments.
    Accept,
    /// Keep the original text, drop additions and comments.
    Reject,
}

/// Header slug dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdFormat {
    Gfm,
    Mmd,
    Kramdown,
}

impl IdFormat {
    pub fn parse(name: &str) -> Option<IdFormat> {
        match name.trim().to_ascii_lowercase().as_str() {
            "gfm" | "github" => Some(IdFormat::Gfm),
            "mmd" | "multimarkdown" => Some(IdFormat::Mmd),
            "kramdown" => Some(IdFormat::Kramdown),
            _ => None,
        }
    }
}

/// Space handling when a wiki-link target becomes a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WikiLinkSpace {
    /// `My Page` -> `My-Page`
    Dash,
    /// `My Page` -> `MyPage`
    None,
    /// `My Page` -> `My_Page`
    Underscore,
    /// `My Page` -> `My%20Page`
    Percent20,
}

/// Where a table caption is rendered inside its `<figure>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionPosition {
    Above,
    Below,
}

/// Progress reporting callback: stage description plus a 0-100 percentage
/// (or -1 when unknown). Advisory only; it cannot cancel a conversion.
pub type ProgressFn = Arc<dyn Fn(&str, i32) + Send + Sync>;

/// Parser lifecycle callback, fired right before and right after the
/// engine parse.
pub type ParserEventFn = Arc<dyn Fn() + Send + Sync>;

/// Frozen configuration for one conversion.
#[derive(Clone)]
pub struct Options {
    pub mode: Mode,

    // Feature flags
    pub tables: bool,
    pub footnotes: bool,
    pub definition_lists: bool,
    pub smart_typography: bool,
    pub math: bool,
    pub critic_markup: bool,
    pub wiki_links: bool,
    pub task_lists: bool,
    pub attributes: bool,
    pub callouts: bool,
    pub marked_extensions: bool,
    pub file_includes: bool,
    pub metadata_variables: bool,
    pub relaxed_tables: bool,
    pub strikethrough: bool,
    pub autolink: bool,
    pub tagfilter: bool,
    pub sup_sub: bool,
    pub emoji: bool,
    pub hashtags: bool,
    pub spans: bool,
    pub citations: bool,
    pub indices: bool,
    pub aria: bool,
    pub image_captions: bool,
    pub title_captions_only: bool,
    pub markdown_in_html: bool,

    // Enumerated options
    pub critic_mode: CriticMode,
    pub id_format: IdFormat,
    pub wikilink_space: WikiLinkSpace,
    pub caption_position: CaptionPosition,

    // Table extras
    pub per_cell_alignment: bool,

    // Line breaks
    pub hardbreaks: bool,
    pub nobreaks: bool,

    // Output options
    pub unsafe_html: bool,
    pub validate_utf8: bool,
    pub github_pre_lang: bool,
    pub standalone: bool,
    pub pretty: bool,

    // Header IDs
    pub generate_header_ids: bool,
    pub header_anchors: bool,
    pub base_header_level: u8,

    // Metadata handling
    pub strip_metadata: bool,

    // File inclusion
    pub max_include_depth: u32,
    pub base_directory: Option<PathBuf>,
    pub input_file_path: Option<PathBuf>,

    // Document shell
    pub document_title: Option<String>,
    pub title_from_h1: bool,
    pub language: Option<String>,
    pub stylesheets: Vec<PathBuf>,
    pub embed_stylesheet: bool,
    pub html_header: Option<String>,
    pub html_footer: Option<String>,
    pub script_tags: Vec<String>,

    // Citations
    pub bibliography_files: Vec<PathBuf>,
    pub csl_file: Option<PathBuf>,
    pub nocite: Option<String>,
    pub link_citations: bool,
    pub suppress_bibliography: bool,

    // Indices
    pub suppress_index: bool,

    // Wiki links
    pub wikilink_extension: Option<String>,

    // Typography / integration extras
    pub quotes_language: Option<String>,
    pub obfuscate_emails: bool,
    pub widont: bool,
    pub hr_page_break: bool,

    // External processing
    pub plugins: Vec<PluginSpec>,
    pub ast_filter_commands: Vec<String>,
    pub ast_filter_strict: bool,

    // Callbacks
    pub progress_callback: Option<ProgressFn>,
    pub parser_init_callback: Option<ParserEventFn>,
    pub parser_done_callback: Option<ParserEventFn>,
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("mode", &self.mode)
            .field("id_format", &self.id_format)
            .field("critic_mode", &self.critic_mode)
            .field("standalone", &self.standalone)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "fn"),
            )
            .finish_non_exhaustive()
    }
}

impl Default for Options {
    /// Unified mode: every feature on.
    fn default() -> Self {
        Options {
            mode: Mode::Unified,
            tables: true,
            footnotes: true,
            definition_lists: true,
            smart_typography: true,
            math: true,
            critic_markup: true,
            wiki_links: true,
            task_lists: true,
            attributes: true,
            callouts: true,
            marked_extensions: true,
            file_includes: true,
            metadata_variables: true,
            relaxed_tables: true,
            strikethrough: true,
            autolink: true,
            tagfilter: true,
            sup_sub: true,
            emoji: true,
            hashtags: false,
            spans: true,
            citations: false,
            indices: false,
            aria: false,
            image_captions: false,
            title_captions_only: false,
            markdown_in_html: true,

            critic_mode: CriticMode::Markup,
            id_format: IdFormat::Gfm,
            wikilink_space: WikiLinkSpace::Dash,
            caption_position: CaptionPosition::Above,

            per_cell_alignment: false,

            hardbreaks: false,
            nobreaks: false,

            unsafe_html: true,
            validate_utf8: true,
            github_pre_lang: true,
            standalone: false,
            pretty: false,

            generate_header_ids: true,
            header_anchors: false,
            base_header_level: 1,

            strip_metadata: true,

            max_include_depth: 10,
            base_directory: None,
            input_file_path: None,

            document_title: None,
            title_from_h1: true,
            language: None,
            stylesheets: Vec::new(),
            embed_stylesheet: false,
            html_header: None,
            html_footer: None,
            script_tags: Vec::new(),

            bibliography_files: Vec::new(),
            csl_file: None,
            nocite: None,
            link_citations: true,
            suppress_bibliography: false,

            suppress_index: false,

            wikilink_extension: None,

            quotes_language: None,
            obfuscate_emails: false,
            widont: false,
            hr_page_break: false,

            plugins: Vec::new(),
            ast_filter_commands: Vec::new(),
            ast_filter_strict: false,

            progress_callback: None,
            parser_init_callback: None,
            parser_done_callback: None,
        }
    }
}

impl Options {
    /// Options seeded for a compatibility mode. Starts from the Unified
    /// defaults and disables what the mode does not speak.
    pub fn for_mode(mode: Mode) -> Self {
        let mut opts = Options::default();
        opts.mode = mode;

        match mode {
            Mode::CommonMark => {
                opts.tables = false;
                opts.footnotes = false;
                opts.definition_lists = false;
                opts.smart_typography = false;
                opts.math = false;
                opts.critic_markup = false;
                opts.wiki_links = false;
                opts.task_lists = false;
                opts.attributes = false;
                opts.callouts = false;
                opts.marked_extensions = false;
                opts.file_includes = false;
                opts.metadata_variables = false;
                opts.relaxed_tables = false;
                opts.strikethrough = false;
                opts.autolink = false;
                opts.tagfilter = false;
                opts.sup_sub = false;
                opts.emoji = false;
                opts.spans = false;
                opts.hardbreaks = false;
                opts.id_format = IdFormat::Gfm;
            }
            Mode::Gfm => {
                opts.footnotes = false;
                opts.definition_lists = false;
                opts.smart_typography = false;
                opts.math = false;
                opts.critic_markup = false;
                opts.wiki_links = false;
                opts.attributes = false;
                opts.callouts = false;
                opts.marked_extensions = false;
                opts.file_includes = false;
                opts.metadata_variables = false;
                opts.relaxed_tables = false;
                opts.sup_sub = false;
                opts.spans = false;
                // GFM treats newlines inside paragraphs as hard breaks.
                opts.hardbreaks = true;
                opts.id_format = IdFormat::Gfm;
            }
            Mode::MultiMarkdown => {
                opts.critic_markup = false;
                opts.wiki_links = false;
                opts.task_lists = false;
                opts.attributes = false;
                opts.callouts = false;
                opts.marked_extensions = false;
                opts.relaxed_tables = false;
                opts.strikethrough = false;
                opts.autolink = false;
                opts.tagfilter = false;
                opts.emoji = false;
                opts.spans = false;
                opts.id_format = IdFormat::Mmd;
            }
            Mode::Kramdown => {
                opts.critic_markup = false;
                opts.wiki_links = false;
                opts.task_lists = false;
                opts.callouts = false;
                opts.marked_extensions = false;
                opts.file_includes = false;
                opts.metadata_variables = false;
                opts.strikethrough = false;
                opts.autolink = false;
                opts.tagfilter = false;
                opts.emoji = false;
                opts.spans = false;
                opts.sup_sub = false;
                opts.id_format = IdFormat::Kramdown;
                opts.relaxed_tables = true;
            }
            Mode::Unified => {}
        }

        opts
    }

    /// Merge options declared in document metadata on top of the current
    /// record. A `mode` key re-applies its preset first so that other
    /// declared keys layer over it.
    pub fn apply_metadata(&mut self, metadata: &Metadata) {
        if let Some(value) = metadata.get("mode") {
            if let Some(mode) = Mode::parse(&value) {
                let declared = Options::for_mode(mode);
                // Preserve everything the caller set outside the preset table.
                let carry = self.clone();
                *self = declared;
                self.standalone = carry.standalone;
                self.pretty = carry.pretty;
                self.base_directory = carry.base_directory;
                self.input_file_path = carry.input_file_path;
                self.stylesheets = carry.stylesheets;
                self.plugins = carry.plugins;
                self.ast_filter_commands = carry.ast_filter_commands;
                self.ast_filter_strict = carry.ast_filter_strict;
                self.progress_callback = carry.progress_callback;
                self.parser_init_callback = carry.parser_init_callback;
                self.parser_done_callback = carry.parser_done_callback;
            }
        }

        if let Some(value) = metadata.get("title") {
            self.document_title = Some(value);
        }
        if let Some(value) = metadata.get("language") {
            self.language = Some(value);
        }
        if let Some(value) = metadata.get("quotes-language") {
            self.quotes_language = Some(value);
        }
        if let Some(value) = metadata.get("csl") {
            self.csl_file = Some(PathBuf::from(value));
        }
        if let Some(value) = metadata.get("bibliography") {
            self.bibliography_files = value
                .split(',')
                .map(|part| PathBuf::from(part.trim()))
                .filter(|path| !path.as_os_str().is_empty())
                .collect();
            if !self.bibliography_files.is_empty() {
                self.citations = true;
            }
        }
        if let Some(value) = metadata.get("nocite") {
            self.nocite = Some(value);
        }
        if let Some(value) = metadata.get("html header") {
            self.html_header = Some(value);
        }
        if let Some(value) = metadata.get("html footer") {
            self.html_footer = Some(value);
        }
        if let Some(value) = metadata.get("css") {
            self.stylesheets = value
                .split(',')
                .map(|part| PathBuf::from(part.trim()))
                .filter(|path| !path.as_os_str().is_empty())
                .collect();
        }
        if let Some(value) = metadata.get("id-format") {
            if let Some(format) = IdFormat::parse(&value) {
                self.id_format = format;
            }
        }
        if let Some(value) = metadata.get("base-header-level") {
            if let Ok(level) = value.trim().parse::<u8>() {
                self.base_header_level = level.clamp(1, 6);
            }
        }

        if let Some(flag) = metadata.get("indices").and_then(|v| parse_bool(&v)) {
            self.indices = flag;
        }
        if let Some(flag) = metadata.get("wikilinks").and_then(|v| parse_bool(&v)) {
            self.wiki_links = flag;
        }
        if let Some(flag) = metadata.get("pretty").and_then(|v| parse_bool(&v)) {
            self.pretty = flag;
        }
        if let Some(flag) = metadata.get("standalone").and_then(|v| parse_bool(&v)) {
            self.standalone = flag;
        }
        if let Some(flag) = metadata.get("link-citations").and_then(|v| parse_bool(&v)) {
            self.link_citations = flag;
        }
        if let Some(flag) = metadata
            .get("suppress-bibliography")
            .and_then(|v| parse_bool(&v))
        {
            self.suppress_bibliography = flag;
        }
        if let Some(flag) = metadata.get("relaxed-tables").and_then(|v| parse_bool(&v)) {
            self.relaxed_tables = flag;
        }
    }

    pub(crate) fn progress(&self, stage: &str, percent: i32) {
        if let Some(callback) = &self.progress_callback {
            callback(stage, percent);
        }
    }
}

/// Boolean metadata values: `{true, yes, 1}` / `{false, no, 0}`,
/// case-insensitively. Anything else is ignored.
pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_unified() {
        let opts = Options::default();
        assert_eq!(opts.mode, Mode::Unified);
        assert!(opts.tables && opts.critic_markup && opts.wiki_links);
        assert!(!opts.hardbreaks);
    }

    #[test]
    fn commonmark_disables_extensions() {
        let opts = Options::for_mode(Mode::CommonMark);
        assert!(!opts.tables);
        assert!(!opts.footnotes);
        assert!(!opts.smart_typography);
        assert!(!opts.strikethrough);
        assert_eq!(opts.id_format, IdFormat::Gfm);
    }

    #[test]
    fn gfm_enables_hardbreaks() {
        let opts = Options::for_mode(Mode::Gfm);
        assert!(opts.hardbreaks);
        assert!(opts.tables && opts.task_lists && opts.strikethrough);
        assert!(!opts.footnotes && !opts.attributes);
    }

    #[test]
    fn kramdown_uses_kramdown_ids_and_relaxed_tables() {
        let opts = Options::for_mode(Mode::Kramdown);
        assert_eq!(opts.id_format, IdFormat::Kramdown);
        assert!(opts.attributes);
        assert!(opts.relaxed_tables);
        assert!(!opts.task_lists);
    }

    #[test]
    fn bool_values_accept_spec_table() {
        assert_eq!(parse_bool("Yes"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn metadata_merge_layers_over_mode() {
        let mut metadata = Metadata::new();
        metadata.insert("mode", "gfm");
        metadata.insert("standalone", "yes");
        metadata.insert("Base Header Level", "2");

        let mut opts = Options::default();
        opts.apply_metadata(&metadata);
        assert_eq!(opts.mode, Mode::Gfm);
        assert!(opts.standalone);
        assert_eq!(opts.base_header_level, 2);
    }
}
