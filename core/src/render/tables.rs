//! Table post-processing.
//!
//! Four passes over rendered tables:
//!
//! 1. Span folding: marker cells from the preprocessor become
//!    `colspan`/`rowspan` attributes; an `===` row splits off a
//!    `<tfoot>`; optional per-cell alignment colons.
//! 2. Relaxed-head demotion: a table whose `<tbody>` carries no
//!    dashes-only artifact row was headerless in the source, so its
//!    generated `<thead>` moves back into the body as plain `<td>` rows.
//! 3. Blank-line removal between `<table>` and `</table>`.
//! 4. Separator-row removal: artifact rows whose cells are only dashes
//!    (em/en dashes after smart typography), colons and whitespace.

use crate::preprocess::table_spans::{COLSPAN_MARKER, ROWSPAN_MARKER};

#[derive(Debug, Clone)]
struct Cell {
    th: bool,
    attrs: String,
    content: String,
    colspan: usize,
    rowspan: usize,
    removed: bool,
}

#[derive(Debug, Clone)]
struct Row {
    cells: Vec<Cell>,
}

#[derive(Debug, Clone)]
struct Section {
    name: &'static str,
    rows: Vec<Row>,
}

#[derive(Debug)]
struct Table {
    open_tag: String,
    sections: Vec<Section>,
}

/// Apply `f` to every `<table>…</table>` region.
fn map_tables(html: &str, f: impl Fn(&str) -> String) -> String {
    let mut output = String::with_capacity(html.len());
    let mut pos = 0;

    while let Some(rel) = html[pos..].find("<table") {
        let start = pos + rel;
        let Some(end_rel) = html[start..].find("</table>") else {
            break;
        };
        let end = start + end_rel + "</table>".len();
        output.push_str(&html[pos..start]);
        output.push_str(&f(&html[start..end]));
        pos = end;
    }

    output.push_str(&html[pos..]);
    output
}

fn parse_table(region: &str) -> Option<Table> {
    let open_end = region.find('>')?;
    let open_tag = region[..=open_end].to_string();

    let mut sections: Vec<Section> = Vec::new();
    let mut current: Option<Section> = None;
    let mut current_row: Option<Row> = None;
    let mut pos = open_end + 1;

    while pos < region.len() {
        let Some(rel) = region[pos..].find('<') else {
            break;
        };
        let tag_start = pos + rel;
        let Some(tag_end_rel) = region[tag_start..].find('>') else {
            break;
        };
        let tag_end = tag_start + tag_end_rel;
        let tag = &region[tag_start..=tag_end];
        pos = tag_end + 1;

        if tag.starts_with("<thead") {
            current = Some(Section { name: "thead", rows: Vec::new() });
        } else if tag.starts_with("<tbody") {
            current = Some(Section { name: "tbody", rows: Vec::new() });
        } else if tag.starts_with("<tfoot") {
            current = Some(Section { name: "tfoot", rows: Vec::new() });
        } else if tag.starts_with("</thead") || tag.starts_with("</tbody")
            || tag.starts_with("</tfoot")
        {
            if let Some(section) = current.take() {
                sections.push(section);
            }
        } else if tag.starts_with("<tr") {
            current_row = Some(Row { cells: Vec::new() });
        } else if tag.starts_with("</tr") {
            if let Some(row) = current_row.take() {
                match &mut current {
                    Some(section) => section.rows.push(row),
                    None => {
                        sections.push(Section { name: "tbody", rows: vec![row] });
                    }
                }
            }
        } else if tag.starts_with("<td") || tag.starts_with("<th") {
            let th = tag.starts_with("<th");
            let close = if th { "</th>" } else { "</td>" };
            let Some(close_rel) = region[pos..].find(close) else {
                return None;
            };
            let content = region[pos..pos + close_rel].to_string();
            let name_len = 3; // "<td" / "<th"
            let attrs = region[tag_start + name_len..tag_end].trim().to_string();
            if let Some(row) = &mut current_row {
                row.cells.push(Cell {
                    th,
                    attrs,
                    content,
                    colspan: 1,
                    rowspan: 1,
                    removed: false,
                });
            }
            pos += close_rel + close.len();
        } else if tag.starts_with("</table") {
            break;
        }
    }

    if let Some(section) = current.take() {
        sections.push(section);
    }
    Some(Table { open_tag, sections })
}

fn serialize_table(table: &Table) -> String {
    let mut out = String::new();
    out.push_str(&table.open_tag);
    out.push('\n');

    for section in &table.sections {
        if section.rows.is_empty() {
            continue;
        }
        out.push_str(&format!("<{}>\n", section.name));
        for row in &section.rows {
            out.push_str("<tr>\n");
            for cell in &row.cells {
                if cell.removed {
                    continue;
                }
                let tag = if cell.th { "th" } else { "td" };
                out.push('<');
                out.push_str(tag);
                if !cell.attrs.is_empty() {
                    out.push(' ');
                    out.push_str(&cell.attrs);
                }
                if cell.colspan > 1 {
                    out.push_str(&format!(" colspan=\"{}\"", cell.colspan));
                }
                if cell.rowspan > 1 {
                    out.push_str(&format!(" rowspan=\"{}\"", cell.rowspan));
                }
                out.push('>');
                out.push_str(&cell.content);
                out.push_str(&format!("</{tag}>\n"));
            }
            out.push_str("</tr>\n");
        }
        out.push_str(&format!("</{}>\n", section.name));
    }

    out.push_str("</table>");
    out
}

fn text_content(html: &str) -> String {
    let mut text = String::new();
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    text
}

fn is_dashes_only(content: &str) -> bool {
    let text = text_content(content);
    let trimmed = text.trim();
    !trimmed.is_empty()
        && trimmed
            .chars()
            .all(|c| matches!(c, '-' | '\u{2014}' | '\u{2013}' | ':') || c.is_whitespace())
}

fn is_footer_separator(content: &str) -> bool {
    let text = text_content(content);
    let trimmed = text.trim();
    !trimmed.is_empty() && trimmed.chars().all(|c| c == '=')
}

/// Pass 1: spans, tfoot boundary, optional per-cell alignment.
pub fn process_spans(html: &str, per_cell_alignment: bool) -> String {
    if !html.contains("<table") {
        return html.to_string();
    }

    map_tables(html, |region| {
        let Some(mut table) = parse_table(region) else {
            return region.to_string();
        };

        split_footer(&mut table);

        for section in &mut table.sections {
            fold_colspans(section);
            fold_rowspans(section);
            if per_cell_alignment {
                apply_cell_alignment(section);
            }
        }

        serialize_table(&table)
    })
}

/// An `===` row inside the body moves everything after it into a tfoot.
fn split_footer(table: &mut Table) {
    let Some(body_idx) = table.sections.iter().position(|s| s.name == "tbody") else {
        return;
    };
    let separator = table.sections[body_idx]
        .rows
        .iter()
        .position(|row| {
            !row.cells.is_empty() && row.cells.iter().all(|c| is_footer_separator(&c.content))
        });
    let Some(separator) = separator else {
        return;
    };

    let mut footer_rows = table.sections[body_idx].rows.split_off(separator);
    footer_rows.remove(0);
    if footer_rows.is_empty() {
        return;
    }
    table.sections.push(Section {
        name: "tfoot",
        rows: footer_rows,
    });
}

fn fold_colspans(section: &mut Section) {
    for row in &mut section.rows {
        for idx in 0..row.cells.len() {
            if row.cells[idx].content.trim() != COLSPAN_MARKER {
                continue;
            }
            row.cells[idx].removed = true;
            // Widen the nearest surviving cell to the left.
            if let Some(target) = row.cells[..idx]
                .iter_mut()
                .rev()
                .find(|c| !c.removed)
            {
                target.colspan += 1;
            }
        }
    }
}

fn fold_rowspans(section: &mut Section) {
    for row_idx in 0..section.rows.len() {
        for cell_idx in 0..section.rows[row_idx].cells.len() {
            if section.rows[row_idx].cells[cell_idx].content.trim() != ROWSPAN_MARKER {
                continue;
            }
            section.rows[row_idx].cells[cell_idx].removed = true;
            // Deepen the nearest non-marker cell above in the same column.
            for above in (0..row_idx).rev() {
                if let Some(target) = section.rows[above].cells.get_mut(cell_idx) {
                    if target.removed || target.content.trim() == ROWSPAN_MARKER {
                        continue;
                    }
                    target.rowspan += 1;
                    break;
                }
            }
        }
    }
}

/// `:text` left, `text:` right, `:text:` center. The colons are markers,
/// not content.
fn apply_cell_alignment(section: &mut Section) {
    for row in &mut section.rows {
        for cell in &mut row.cells {
            let trimmed = cell.content.trim();
            if trimmed.len() < 2 {
                continue;
            }
            let starts = trimmed.starts_with(':');
            let ends = trimmed.ends_with(':');
            if !starts && !ends {
                continue;
            }
            let inner = trimmed
                .trim_start_matches(':')
                .trim_end_matches(':')
                .trim();
            if inner.is_empty() {
                continue;
            }
            let align = match (starts, ends) {
                (true, true) => "center",
                (true, false) => "left",
                _ => "right",
            };
            cell.content = inner.to_string();
            if !cell.attrs.contains("text-align") {
                if !cell.attrs.is_empty() {
                    cell.attrs.push(' ');
                }
                cell.attrs
                    .push_str(&format!("style=\"text-align: {align};\""));
            }
        }
    }
}

/// Pass 2: demote the generated `<thead>` of relaxed (headerless)
/// tables. A dashes-only artifact row in the body marks a table that had
/// a real separator in the source; those keep their head.
pub fn convert_relaxed_heads(html: &str) -> String {
    if !html.contains("<thead") {
        return html.to_string();
    }

    map_tables(html, |region| {
        let Some(mut table) = parse_table(region) else {
            return region.to_string();
        };

        let body_has_artifact = table
            .sections
            .iter()
            .filter(|s| s.name != "thead")
            .flat_map(|s| &s.rows)
            .any(|row| {
                !row.cells.is_empty() && row.cells.iter().all(|c| is_dashes_only(&c.content))
            });
        if body_has_artifact {
            return region.to_string();
        }

        let Some(head_idx) = table.sections.iter().position(|s| s.name == "thead") else {
            return region.to_string();
        };

        let head_rows: Vec<Row> = table.sections.remove(head_idx).rows;
        let all_empty = head_rows
            .iter()
            .flat_map(|r| &r.cells)
            .all(|c| text_content(&c.content).trim().is_empty());

        if !all_empty {
            let mut demoted: Vec<Row> = head_rows
                .into_iter()
                .map(|mut row| {
                    for cell in &mut row.cells {
                        cell.th = false;
                    }
                    row
                })
                .collect();

            match table.sections.iter_mut().find(|s| s.name == "tbody") {
                Some(body) => {
                    demoted.append(&mut body.rows);
                    body.rows = demoted;
                }
                None => table.sections.insert(0, Section { name: "tbody", rows: demoted }),
            }
        }

        serialize_table(&table)
    })
}

/// Pass 3: strip lines that are pure whitespace between `<table>` and
/// `</table>`.
pub fn remove_blank_lines(html: &str) -> String {
    if !html.contains("<table") {
        return html.to_string();
    }
    map_tables(html, |region| {
        region
            .split_inclusive('\n')
            .filter(|line| !line.trim().is_empty())
            .collect()
    })
}

/// Pass 4: remove dashes-only artifact rows left over from relaxed-table
/// preprocessing (smart typography turns `---` cells into em dashes).
pub fn remove_separator_rows(html: &str) -> String {
    if !html.contains("<table") {
        return html.to_string();
    }

    map_tables(html, |region| {
        let Some(mut table) = parse_table(region) else {
            return region.to_string();
        };
        for section in &mut table.sections {
            section.rows.retain(|row| {
                row.cells.is_empty()
                    || !row.cells.iter().all(|c| is_dashes_only(&c.content))
            });
        }
        serialize_table(&table)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = "<table>\n<thead>\n<tr>\n<th>A</th>\n<th>B</th>\n</tr>\n</thead>\n<tbody>\n<tr>\n<td>1</td>\n<td>2</td>\n</tr>\n</tbody>\n</table>";

    #[test]
    fn parse_and_serialize_roundtrip() {
        let table = parse_table(SIMPLE).unwrap();
        let out = serialize_table(&table);
        assert!(out.contains("<th>A</th>"));
        assert!(out.contains("<td>2</td>"));
        assert!(out.starts_with("<table>"));
        assert!(out.ends_with("</table>"));
    }

    #[test]
    fn rowspan_markers_fold_upward() {
        let html = "<table>\n<tbody>\n<tr>\n<td>Eng</td>\n<td>A</td>\n</tr>\n<tr>\n<td>@apex:rowspan@</td>\n<td>B</td>\n</tr>\n</tbody>\n</table>";
        let out = process_spans(html, false);
        assert!(out.contains("<td rowspan=\"2\">Eng</td>"));
        assert!(!out.contains("@apex:rowspan@"));
        assert!(out.contains("<td>B</td>"));
    }

    #[test]
    fn colspan_markers_widen_leftward() {
        let html = "<table>\n<tbody>\n<tr>\n<td>wide</td>\n<td>@apex:colspan@</td>\n<td>x</td>\n</tr>\n</tbody>\n</table>";
        let out = process_spans(html, false);
        assert!(out.contains("<td colspan=\"2\">wide</td>"));
        assert!(out.contains("<td>x</td>"));
    }

    #[test]
    fn footer_separator_creates_tfoot() {
        let html = "<table>\n<tbody>\n<tr>\n<td>a</td>\n</tr>\n<tr>\n<td>===</td>\n</tr>\n<tr>\n<td>total</td>\n</tr>\n</tbody>\n</table>";
        let out = process_spans(html, false);
        assert!(out.contains("<tfoot>"));
        assert!(out.contains("<td>total</td>"));
        assert!(!out.contains("==="));
    }

    #[test]
    fn per_cell_alignment_colons() {
        let html = "<table>\n<tbody>\n<tr>\n<td>:left</td>\n<td>:center:</td>\n<td>right:</td>\n</tr>\n</tbody>\n</table>";
        let out = process_spans(html, true);
        assert!(out.contains("style=\"text-align: left;\">left</td>"));
        assert!(out.contains("style=\"text-align: center;\">center</td>"));
        assert!(out.contains("style=\"text-align: right;\">right</td>"));
    }

    #[test]
    fn relaxed_head_demotes_to_body() {
        let out = convert_relaxed_heads(SIMPLE);
        assert!(!out.contains("<thead>"));
        assert!(!out.contains("<th>"));
        assert!(out.contains("<td>A</td>"));
        assert!(out.contains("<td>1</td>"));
    }

    #[test]
    fn artifact_row_preserves_head_and_is_removed_later() {
        let html = "<table>\n<thead>\n<tr>\n<th>H</th>\n</tr>\n</thead>\n<tbody>\n<tr>\n<td>\u{2014}\u{2014}</td>\n</tr>\n<tr>\n<td>x</td>\n</tr>\n</tbody>\n</table>";
        let kept = convert_relaxed_heads(html);
        assert!(kept.contains("<thead>"));
        let cleaned = remove_separator_rows(&kept);
        assert!(!cleaned.contains('\u{2014}'));
        assert!(cleaned.contains("<td>x</td>"));
    }

    #[test]
    fn blank_lines_inside_tables_are_stripped() {
        let html = "<table>\n\n<tbody>\n\n<tr>\n<td>x</td>\n</tr>\n</tbody>\n\n</table>";
        let out = remove_blank_lines(html);
        assert!(!out.contains("\n\n"));
    }
}
