//! Adapter around the embedded CommonMark/GFM engine.
//!
//! Maps the conversion options onto `comrak::Options`, parses into the
//! arena AST, and renders the (possibly rewritten) tree back to HTML.
//! Everything dialect-specific happens before or after this adapter; the
//! engine itself only ever sees CommonMark plus the extensions enabled
//! here.

use comrak::nodes::{Ast, AstNode, LineColumn, NodeValue};
use comrak::{format_html, parse_document, Arena, Options as ComrakOptions};
use log::debug;

use crate::options::Options;

/// Build the engine options for one conversion.
pub fn engine_options(options: &Options) -> ComrakOptions {
    let mut engine = ComrakOptions::default();

    engine.extension.table = options.tables;
    engine.extension.tasklist = options.task_lists;
    engine.extension.strikethrough = options.strikethrough;
    engine.extension.autolink = options.autolink;
    engine.extension.tagfilter = options.tagfilter;
    engine.extension.footnotes = options.footnotes;
    engine.extension.description_lists = options.definition_lists;
    engine.extension.math_dollars = options.math;
    engine.extension.superscript = options.sup_sub;
    engine.extension.subscript = options.sup_sub;

    engine.parse.smart = options.smart_typography;

    engine.render.r#unsafe = options.unsafe_html;
    engine.render.hardbreaks = options.hardbreaks;
    engine.render.github_pre_lang = options.github_pre_lang;

    engine
}

/// Parse preprocessed text into the arena.
pub fn parse<'a>(
    arena: &'a Arena<'a>,
    text: &str,
    engine: &ComrakOptions,
) -> &'a AstNode<'a> {
    parse_document(arena, text, engine)
}

/// Render the tree to an HTML fragment.
pub fn render<'a>(root: &'a AstNode<'a>, engine: &ComrakOptions) -> String {
    let mut buffer = String::new();
    if format_html(root, engine, &mut buffer).is_err() {
        debug!("engine render failed; emitting empty fragment");
        return String::new();
    }
    buffer
}

/// Allocate a detached node in the arena.
pub fn make_node<'a>(arena: &'a Arena<'a>, value: NodeValue) -> &'a AstNode<'a> {
    arena.alloc(AstNode::new(std::cell::RefCell::new(Ast::new(
        value,
        LineColumn { line: 0, column: 0 },
    ))))
}

/// Collect the plain text content of a node's inline children (text and
/// code spans; other inlines contribute their text recursively).
pub fn inline_text<'a>(node: &'a AstNode<'a>) -> String {
    let mut text = String::new();
    collect_text(node, &mut text);
    text
}

fn collect_text<'a>(node: &'a AstNode<'a>, out: &mut String) {
    for child in node.children() {
        match &child.data.borrow().value {
            NodeValue::Text(literal) => out.push_str(literal),
            NodeValue::Code(code) => out.push_str(&code.literal),
            NodeValue::SoftBreak | NodeValue::LineBreak => out.push(' '),
            _ => {}
        }
        collect_text(child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Mode;

    #[test]
    fn gfm_mode_maps_to_engine_extensions() {
        let options = Options::for_mode(Mode::Gfm);
        let engine = engine_options(&options);
        assert!(engine.extension.table);
        assert!(engine.extension.tasklist);
        assert!(engine.extension.strikethrough);
        assert!(engine.render.hardbreaks);
        assert!(!engine.extension.footnotes);
    }

    #[test]
    fn commonmark_mode_disables_everything() {
        let options = Options::for_mode(Mode::CommonMark);
        let engine = engine_options(&options);
        assert!(!engine.extension.table);
        assert!(!engine.parse.smart);
        assert!(!engine.extension.math_dollars);
    }

    #[test]
    fn parse_and_render_roundtrip() {
        let options = Options::default();
        let engine = engine_options(&options);
        let arena = Arena::new();
        let root = parse(&arena, "# Hi\n\nBody **strong**.\n", &engine);
        let html = render(root, &engine);
        assert!(html.contains("<h1>Hi</h1>"));
        assert!(html.contains("<strong>strong</strong>"));
    }
}
