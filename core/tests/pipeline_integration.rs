//! End-to-end scenarios exercising the whole conversion pipeline.

use apex_core::{convert, convert_with_defaults, CriticMode, Options};

#[test]
fn test_basic_heading_gets_id() {
    let html = convert_with_defaults("# Hello\n");
    assert!(html.contains("<h1 id=\"hello\""));
    assert!(html.contains(">Hello</h1>"));
}

#[test]
fn test_empty_input_yields_empty_output() {
    assert_eq!(convert_with_defaults(""), "");
}

#[test]
fn test_plain_markdown_core() {
    let html = convert_with_defaults("Some *em* and **strong** and `code`.\n");
    assert!(html.contains("<em>em</em>"));
    assert!(html.contains("<strong>strong</strong>"));
    assert!(html.contains("<code>code</code>"));
}

#[test]
fn test_table_with_caption_and_rowspan() {
    let input = "[Perf]\n\n| Dept | Name |\n|------|------|\n| Eng  | A    |\n| ^^   | B    |\n";
    let html = convert_with_defaults(input);
    assert!(html.contains("<figure class=\"table-figure\">"), "html: {html}");
    assert!(html.contains("<figcaption>Perf</figcaption>"));
    assert!(html.contains("<td rowspan=\"2\">Eng</td>"));
    assert!(html.contains("<td>A</td>"));
    assert!(html.contains("<td>B</td>"));
    assert!(html.contains("</table></figure>"));
}

#[test]
fn test_bear_style_callout() {
    let html = convert_with_defaults("> [!WARNING] Heads up\n> Body\n");
    assert!(html.contains("class=\"callout callout-warning\""), "html: {html}");
    assert!(html.contains("Heads up"));
    assert!(html.contains("Body"));
}

#[test]
fn test_ial_on_inline_link() {
    let html = convert_with_defaults("See [docs](u){:.btn #go}\n");
    assert!(
        html.contains("<a href=\"u\" id=\"go\" class=\"btn\">docs</a>"),
        "html: {html}"
    );
}

#[test]
fn test_relaxed_table_is_all_body() {
    let html = convert_with_defaults("A | B\n1 | 2\n");
    assert!(html.contains("<table"), "html: {html}");
    assert!(html.contains("<tbody>"));
    assert!(html.contains("<td>A</td>"));
    assert!(html.contains("<td>1</td>"));
    assert!(!html.contains("<thead"));
    assert!(!html.contains("<th>"));
}

#[test]
fn test_variable_with_transform_in_heading() {
    let input = "---\ntitle: hello world\n---\n# [%title:title]\n";
    let html = convert_with_defaults(input);
    assert!(html.contains("Hello World</h1>"), "html: {html}");
}

#[test]
fn test_critic_accept_mode() {
    let mut options = Options::default();
    options.critic_mode = CriticMode::Accept;
    let html = convert("Was {--bad--}{++good++}\n", &options).unwrap();
    assert!(html.contains("good"));
    assert!(!html.contains("bad"));
    assert!(!html.contains("<ins"));
    assert!(!html.contains("<del"));
}

#[test]
fn test_punctuation_only_heading_slug() {
    let html = convert_with_defaults("# !!!\n");
    assert!(html.contains("id=\"header\""), "html: {html}");
}

#[test]
fn test_missing_trailing_newline_table() {
    let with_newline = convert_with_defaults("| a | b |\n|---|---|\n| 1 | 2 |\n");
    let without_newline = convert_with_defaults("| a | b |\n|---|---|\n| 1 | 2 |");
    assert_eq!(with_newline, without_newline);
}

#[test]
fn test_cr_line_endings_parse_like_lf() {
    let lf = convert_with_defaults("| a | b |\n|---|---|\n| 1 | 2 |\n");
    let cr = convert_with_defaults("| a | b |\r|---|---|\r| 1 | 2 |\r");
    let crlf = convert_with_defaults("| a | b |\r\n|---|---|\r\n| 1 | 2 |\r\n");
    assert_eq!(lf, cr);
    assert_eq!(lf, crlf);
}

#[test]
fn test_unclosed_highlight_stays_literal() {
    let html = convert_with_defaults("a ==b c\n");
    assert!(html.contains("==b c"));
    assert!(!html.contains("<mark>"));
}

#[test]
fn test_highlight_becomes_mark() {
    let html = convert_with_defaults("a ==b== c\n");
    assert!(html.contains("<mark>b</mark>"));
}

#[test]
fn test_special_markers() {
    let html = convert_with_defaults("one\n\n<!--BREAK-->\n\ntwo\n");
    assert!(html.contains("class=\"page-break\""));
}
