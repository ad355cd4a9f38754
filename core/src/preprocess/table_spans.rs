//! Span markers for advanced tables.
//!
//! The engine's table parser has no notion of spans, so the two span
//! syntaxes are swapped for marker cells before parsing:
//!
//! ```text
//! | wide cell || next |     ->   | wide cell | @apex:colspan@ | next |
//! | ^^        | b     |     ->   | @apex:rowspan@ | b |
//! ```
//!
//! The table post-processor later folds marker cells into `colspan`/
//! `rowspan` attributes on their neighbors.

pub const COLSPAN_MARKER: &str = "@apex:colspan@";
pub const ROWSPAN_MARKER: &str = "@apex:rowspan@";

pub fn process(text: &str) -> String {
    let mut output = String::with_capacity(text.len() + 64);
    let mut in_fence = false;

    for line in text.split_inclusive('\n') {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            output.push_str(line);
            continue;
        }
        let body = line.trim_end_matches(['\n', '\r']);
        // Only rows with a leading pipe are considered: prose containing
        // `||` must never grow marker cells.
        if in_fence
            || !body.trim_start().starts_with('|')
            || !(body.contains("||") || body.contains("^^"))
        {
            output.push_str(line);
            continue;
        }

        output.push_str(&mark_line(body));
        output.push_str(&line[body.len()..]);
    }

    output
}

fn mark_line(line: &str) -> String {
    let segments: Vec<&str> = line.split('|').collect();
    let last = segments.len().saturating_sub(1);

    let marked: Vec<String> = segments
        .iter()
        .enumerate()
        .map(|(idx, segment)| {
            // Interior empty segment = consecutive pipes = colspan cell.
            if idx > 0 && idx < last && segment.is_empty() {
                format!(" {COLSPAN_MARKER} ")
            } else if segment.trim() == "^^" {
                format!(" {ROWSPAN_MARKER} ")
            } else {
                (*segment).to_string()
            }
        })
        .collect();

    marked.join("|")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consecutive_pipes_become_colspan_markers() {
        let out = process("| a || b |\n");
        assert_eq!(out, "| a | @apex:colspan@ | b |\n");
    }

    #[test]
    fn caret_cells_become_rowspan_markers() {
        let out = process("| ^^ | b |\n");
        assert_eq!(out, "| @apex:rowspan@ | b |\n");
    }

    #[test]
    fn genuinely_empty_cells_are_left_alone() {
        let src = "| a |  | b |\n";
        assert_eq!(process(src), src);
    }

    #[test]
    fn prose_with_double_pipes_is_untouched() {
        let src = "a || b in running text\n";
        assert_eq!(process(src), src);
    }
}
