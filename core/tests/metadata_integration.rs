//! Metadata extraction, variable substitution, and options-from-metadata.

use apex_core::{convert, convert_with_defaults, Mode, Options};

#[test]
fn test_yaml_front_matter_variables() {
    let input = "---\ntitle: My Doc\nauthor: Someone\n---\nBy [%author].\n";
    let html = convert_with_defaults(input);
    assert!(html.contains("By Someone."));
    // The metadata block itself never reaches the output.
    assert!(!html.contains("---"));
    assert!(!html.contains("author:"));
}

#[test]
fn test_mmd_metadata_block() {
    let input = "Title: The Doc\nDate: 2026-01-02\n\n# [%title]\n";
    let html = convert_with_defaults(input);
    assert!(html.contains("The Doc</h1>"));
}

#[test]
fn test_pandoc_title_block() {
    let input = "% The Title\n% An Author\n% 2026-01-01\n\nBy [%author] on [%date].\n";
    let html = convert_with_defaults(input);
    assert!(html.contains("By An Author on 2026-01-01."));
}

#[test]
fn test_key_lookup_is_normalized() {
    let input = "Base Header Level: 2\n\n# Top\n";
    let html = convert_with_defaults(input);
    assert!(html.contains("<h2"), "html: {html}");
    assert!(!html.contains("<h1"));
}

#[test]
fn test_unresolved_variable_stays_literal() {
    let html = convert_with_defaults("Value: [%missing]\n");
    assert!(html.contains("[%missing]"));
}

#[test]
fn test_transform_chains() {
    let input = "---\nname: apex processor\n---\n[%name:upper] [%name:slug] [%name:truncate(4)]\n";
    let html = convert_with_defaults(input);
    assert!(html.contains("APEX PROCESSOR"));
    assert!(html.contains("apex-processor"));
    assert!(html.contains("apex</p>"));
}

#[test]
fn test_split_and_join_transforms() {
    let input = "---\ntags: a, b, c\n---\n[%tags:split(, ):join(/)]\n";
    let html = convert_with_defaults(input);
    assert!(html.contains("a/b/c"));
}

#[test]
fn test_default_transform_for_empty_value() {
    let input = "---\nsubtitle:\n---\n[%subtitle:default(none set)]\n";
    let html = convert_with_defaults(input);
    assert!(html.contains("none set"));
}

#[test]
fn test_malformed_transform_keeps_literal() {
    let input = "---\ntitle: x\n---\n[%title:bogus(]\n";
    let html = convert_with_defaults(input);
    assert!(html.contains("[%title:bogus(]"));
}

#[test]
fn test_metadata_value_is_escaped() {
    let input = "---\ntitle: a <b> c\n---\n[%title]\n";
    let html = convert_with_defaults(input);
    assert!(html.contains("a &lt;b&gt; c"));
}

#[test]
fn test_mode_from_metadata_reapplies_preset() {
    // GFM mode disables metadata variables, so the marker stays literal.
    let input = "mode: gfm\n\n[%title]\n";
    let html = convert_with_defaults(input);
    assert!(html.contains("[%title]"));
}

#[test]
fn test_standalone_from_metadata() {
    let input = "---\ntitle: Wrapped\nstandalone: yes\n---\nBody.\n";
    let html = convert_with_defaults(input);
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<title>Wrapped</title>"));
    assert!(html.contains("<meta name=\"generator\" content=\"Apex "));
}

#[test]
fn test_html_header_splice_from_metadata() {
    let input =
        "---\nstandalone: yes\nhtml header: <meta name=\"robots\" content=\"noindex\">\n---\nx\n";
    let html = convert_with_defaults(input);
    let head_end = html.find("</head>").unwrap();
    let meta_pos = html.find("name=\"robots\"").unwrap();
    assert!(meta_pos < head_end);
}

#[test]
fn test_unterminated_yaml_is_not_metadata() {
    let input = "---\ntitle: broken\nBody line\n";
    let html = convert_with_defaults(input);
    // The block is left in the document rather than half-parsed.
    assert!(html.contains("title: broken") || html.contains("<hr"));
}

#[test]
fn test_metadata_disabled_outside_dialect_modes() {
    let options = Options::for_mode(Mode::Gfm);
    let html = convert("Title: Not Metadata\n\nBody\n", &options).unwrap();
    assert!(html.contains("Title: Not Metadata"));
}
