//! Output shaping: standalone documents, pretty printing, typography,
//! accessibility and integration extras.

use apex_core::{convert, pretty_print, wrap_document, DocumentParams, Options};

#[test]
fn test_standalone_document_shell() {
    let mut options = Options::default();
    options.standalone = true;
    options.document_title = Some("My Title".into());
    let html = convert("# Heading\n\nBody.\n", &options).unwrap();

    assert!(html.starts_with("<!DOCTYPE html>"));
    assert_eq!(html.matches("<!DOCTYPE html>").count(), 1);
    assert_eq!(html.matches("<title>").count(), 1);
    assert!(html.contains("<title>My Title</title>"));
    assert!(html.contains("<html lang=\"en\">"));
    assert!(html.contains("<meta charset=\"utf-8\">"));
    assert!(html.contains("name=\"generator\" content=\"Apex "));
    assert!(html.contains("</body>"));
}

#[test]
fn test_standalone_title_from_first_h1() {
    let mut options = Options::default();
    options.standalone = true;
    let html = convert("# Derived Title\n\nBody.\n", &options).unwrap();
    assert!(html.contains("<title>Derived Title</title>"));
}

#[test]
fn test_language_from_metadata() {
    let mut options = Options::default();
    options.standalone = true;
    let html = convert("---\nlanguage: de\n---\nHallo.\n", &options).unwrap();
    assert!(html.contains("<html lang=\"de\">"));
}

#[test]
fn test_script_injection_before_body_close() {
    let mut options = Options::default();
    options.standalone = true;
    options.script_tags = vec!["<script>init()</script>".into()];
    let html = convert("x\n", &options).unwrap();
    let script = html.find("<script>init()").unwrap();
    let body_close = html.find("</body>").unwrap();
    assert!(script < body_close);
}

#[test]
fn test_wrap_document_entry_point() {
    let html = wrap_document("<p>frag</p>", &DocumentParams::default());
    assert!(html.contains("<p>frag</p>"));
    assert!(html.contains("<!DOCTYPE html>"));
}

#[test]
fn test_pretty_print_entry_point() {
    let pretty = pretty_print("<ul><li>a</li><li>b</li></ul>");
    assert!(pretty.contains("<ul>\n  <li>a</li>\n  <li>b</li>\n</ul>"));
}

#[test]
fn test_pretty_conversion_preserves_pre() {
    let mut options = Options::default();
    options.pretty = true;
    let html = convert("```\nline one\n    indented\n```\n", &options).unwrap();
    assert!(html.contains("line one\n    indented\n"), "html: {html}");
}

#[test]
fn test_base_header_level_shift() {
    let mut options = Options::default();
    options.base_header_level = 2;
    let html = convert("# A\n\n## B\n", &options).unwrap();
    assert!(html.contains("<h2 id=\"a\">A</h2>"), "html: {html}");
    assert!(html.contains("<h3 id=\"b\">B</h3>"));
    assert!(!html.contains("<h1"));
}

#[test]
fn test_widont_on_headings() {
    let mut options = Options::default();
    options.widont = true;
    let html = convert("# A Fairly Long Title\n", &options).unwrap();
    assert!(html.contains("Long&nbsp;Title"), "html: {html}");
}

#[test]
fn test_quote_language_german() {
    let mut options = Options::default();
    options.quotes_language = Some("de".into());
    let html = convert("\"Hallo Welt\"\n", &options).unwrap();
    assert!(html.contains("\u{201E}Hallo Welt\u{201C}"), "html: {html}");
}

#[test]
fn test_email_obfuscation() {
    let mut options = Options::default();
    options.obfuscate_emails = true;
    let html = convert("[mail me](mailto:me@example.com)\n", &options).unwrap();
    assert!(!html.contains("mailto:me@example.com"), "html: {html}");
    assert!(html.contains("&#109;"));
}

#[test]
fn test_aria_pass() {
    let mut options = Options::default();
    options.aria = true;
    let input = "[Cap]\n\n| a |\n|---|\n| 1 |\n\n<!--TOC-->\n\n# H\n";
    let html = convert(input, &options).unwrap();
    assert!(html.contains("aria-label=\"Table of contents\""), "html: {html}");
    assert!(html.contains("aria-describedby=\"table-caption-1\""));
    assert!(html.contains("<figcaption id=\"table-caption-1\">"));
}

#[test]
fn test_hr_page_break() {
    let mut options = Options::default();
    options.hr_page_break = true;
    let html = convert("one\n\n---\n\ntwo\n", &options).unwrap();
    assert!(!html.contains("<hr"), "html: {html}");
    assert!(html.contains("page-break-after: always"));
}

#[test]
fn test_image_captions() {
    let mut options = Options::default();
    options.image_captions = true;
    let html = convert("![Alt text](pic.png \"The Title\")\n", &options).unwrap();
    assert!(html.contains("<figure>"), "html: {html}");
    assert!(html.contains("<figcaption>The Title</figcaption>"));
    assert!(!html.contains("<p><figure>"));
}

#[test]
fn test_title_only_captions() {
    let mut options = Options::default();
    options.image_captions = true;
    options.title_captions_only = true;
    let html = convert("![Only Alt](pic.png)\n", &options).unwrap();
    assert!(!html.contains("figcaption"), "html: {html}");
}

#[test]
fn test_smart_typography() {
    let html = apex_core::convert_with_defaults("It's \"smart\" -- yes\n");
    assert!(html.contains("\u{2019}"), "html: {html}");
    assert!(html.contains("\u{201C}"));
    assert!(html.contains("\u{2013}"));
}

#[test]
fn test_hardbreaks_in_gfm_mode() {
    let options = Options::for_mode(apex_core::Mode::Gfm);
    let html = convert("line one\nline two\n", &options).unwrap();
    assert!(html.contains("<br"), "html: {html}");
}

#[test]
fn test_nobreaks_renders_spaces() {
    let mut options = Options::default();
    options.nobreaks = true;
    let html = convert("line one\nline two\n", &options).unwrap();
    assert!(html.contains("line one line two"), "html: {html}");
}
