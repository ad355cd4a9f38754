//! Advanced tables: captions, spans, footers, relaxed tables, cleanup.

use apex_core::{convert, convert_with_defaults, CaptionPosition, Options};

#[test]
fn test_regular_gfm_table() {
    let html = convert_with_defaults("| H1 | H2 |\n|----|----|\n| a  | b  |\n");
    assert!(html.contains("<table"), "html: {html}");
    assert!(html.contains("<th>H1</th>"));
    assert!(html.contains("<td>a</td>"));
    // The relaxed-table artifact row never survives into the output.
    assert!(!html.contains("\u{2014}\u{2014}"));
    assert!(!html.contains("<td>---</td>"));
}

#[test]
fn test_caption_before_table() {
    let html = convert_with_defaults("[Results]\n\n| a |\n|---|\n| 1 |\n");
    assert!(html.contains("<figure class=\"table-figure\">"), "html: {html}");
    assert!(html.contains("<figcaption>Results</figcaption>"));
    assert!(html.contains("</table></figure>"));
    assert!(!html.contains("[Results]"));
}

#[test]
fn test_caption_after_table() {
    let html = convert_with_defaults("| a |\n|---|\n| 1 |\n\n: Below caption\n");
    assert!(html.contains("<figcaption>Below caption</figcaption>"), "html: {html}");
    assert!(html.contains("<figure class=\"table-figure\">"));
}

#[test]
fn test_caption_position_below() {
    let mut options = Options::default();
    options.caption_position = CaptionPosition::Below;
    let html = convert("[Cap]\n\n| a |\n|---|\n| 1 |\n", &options).unwrap();
    assert!(html.contains("</table><figcaption>Cap</figcaption></figure>"), "html: {html}");
}

#[test]
fn test_colspan_via_consecutive_pipes() {
    let html = convert_with_defaults("| wide || x |\n|---|---|---|\n| a | b | c |\n");
    assert!(html.contains("colspan=\"2\">wide"), "html: {html}");
    assert!(!html.contains("@apex:"));
}

#[test]
fn test_rowspan_via_caret_cells() {
    let html = convert_with_defaults("| A | B |\n|---|---|\n| x | 1 |\n| ^^ | 2 |\n");
    assert!(html.contains("<td rowspan=\"2\">x</td>"), "html: {html}");
    assert!(!html.contains("^^"));
}

#[test]
fn test_footer_separator_row() {
    let html = convert_with_defaults(
        "| a | b |\n|---|---|\n| 1 | 2 |\n| === | === |\n| t1 | t2 |\n",
    );
    assert!(html.contains("<tfoot>"), "html: {html}");
    assert!(html.contains("<td>t1</td>"));
    assert!(!html.contains("==="));
}

#[test]
fn test_relaxed_table_two_lines() {
    let html = convert_with_defaults("A | B\n1 | 2\n");
    assert!(html.contains("<tbody>"), "html: {html}");
    assert!(!html.contains("<thead"));
    assert!(!html.contains("<th>"));
}

#[test]
fn test_single_pipe_line_is_not_a_table() {
    let html = convert_with_defaults("just a | pipe\n");
    assert!(!html.contains("<table"), "html: {html}");
    assert!(html.contains("just a | pipe"));
}

#[test]
fn test_unequal_cell_counts_abort_relaxed_recognition() {
    let html = convert_with_defaults("a | b\n1 | 2 | 3\n");
    assert!(!html.contains("<table"), "html: {html}");
}

#[test]
fn test_relaxed_tables_off_leaves_pipe_runs() {
    let mut options = Options::default();
    options.relaxed_tables = false;
    let html = convert("A | B\n1 | 2\n", &options).unwrap();
    assert!(!html.contains("<table"), "html: {html}");
}

#[test]
fn test_table_ial_attaches_to_table() {
    let html = convert_with_defaults("| a |\n|---|\n| 1 |\n{: .fancy}\n");
    assert!(html.contains("<table class=\"fancy\""), "html: {html}");
}

#[test]
fn test_no_blank_lines_inside_tables() {
    let html = convert_with_defaults("| a |\n|---|\n| 1 |\n");
    let table_start = html.find("<table").unwrap();
    let table_end = html.find("</table>").unwrap();
    assert!(!html[table_start..table_end].contains("\n\n"));
}

#[test]
fn test_per_cell_alignment_markers() {
    let mut options = Options::default();
    options.per_cell_alignment = true;
    let html = convert("| a | b |\n|---|---|\n| :x | y: |\n", &options).unwrap();
    assert!(html.contains("text-align: left;\">x</td>"), "html: {html}");
    assert!(html.contains("text-align: right;\">y</td>"));
}
