//! Relaxed (headerless) pipe tables.
//!
//! A contiguous run of two or more pipe-delimited lines with equal cell
//! counts is promoted to a GFM table by inserting a synthetic separator
//! row after the first line. Runs that already carry a separator keep its
//! alignment; the old separator line then surfaces as a dashes-only body
//! row, which the table post-processors recognize and drop. Headerless
//! runs end up with a `<thead>` that the post-processors demote back into
//! the `<tbody>`.
//!
//! A single pipe line is not a table, and unequal cell counts abort
//! recognition of the whole run.

/// Count of cells in a pipe row, ignoring a leading/trailing `|`.
fn cell_count(line: &str) -> usize {
    let trimmed = line.trim();
    let trimmed = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix('|').unwrap_or(trimmed);
    let mut count = 1;
    let mut escaped = false;
    for c in trimmed.chars() {
        match c {
            '\\' => escaped = !escaped,
            '|' if !escaped => count += 1,
            _ => escaped = false,
        }
    }
    count
}

fn is_pipe_line(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && trimmed.contains('|') && !trimmed.starts_with("```")
}

/// A GFM delimiter row: every cell matches `:?-+:?`.
fn is_separator_line(line: &str) -> bool {
    let trimmed = line.trim();
    let trimmed = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix('|').unwrap_or(trimmed);
    let mut any = false;
    for cell in trimmed.split('|') {
        let cell = cell.trim();
        if cell.is_empty() {
            return false;
        }
        let body = cell.strip_prefix(':').unwrap_or(cell);
        let body = body.strip_suffix(':').unwrap_or(body);
        if body.is_empty() || !body.chars().all(|c| c == '-') {
            return false;
        }
        any = true;
    }
    any
}

fn synthetic_separator(cells: usize) -> String {
    let mut row = String::from("|");
    for _ in 0..cells {
        row.push_str(" --- |");
    }
    row
}

pub fn process(text: &str) -> String {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    let mut output = String::with_capacity(text.len() + 64);
    let mut idx = 0;
    let mut in_fence = false;

    while idx < lines.len() {
        let line = lines[idx];
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            output.push_str(line);
            idx += 1;
            continue;
        }
        if in_fence || !is_pipe_line(line) {
            output.push_str(line);
            idx += 1;
            continue;
        }

        // Collect the whole pipe run.
        let mut run_end = idx;
        while run_end < lines.len() && !in_fence && is_pipe_line(lines[run_end]) {
            run_end += 1;
        }
        let run = &lines[idx..run_end];

        if run.len() < 2 {
            output.push_str(line);
            idx += 1;
            continue;
        }

        // Equal cell counts across the run (separator rows always agree by
        // construction, but count them too for the unequal-abort rule).
        let expected = cell_count(run[0]);
        let uniform = run
            .iter()
            .all(|l| is_separator_line(l) || cell_count(l) == expected);
        if !uniform {
            for l in run {
                output.push_str(l);
            }
            idx = run_end;
            continue;
        }

        // Emit: first row, separator (original alignment when present),
        // then the remaining rows including any old separator artifact.
        output.push_str(run[0]);
        if !run[0].ends_with('\n') {
            output.push('\n');
        }
        if is_separator_line(run[1]) {
            output.push_str(run[1].trim_end_matches(['\n', '\r']));
        } else {
            output.push_str(&synthetic_separator(expected));
        }
        output.push('\n');
        for l in &run[1..] {
            output.push_str(l);
        }
        idx = run_end;
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headerless_run_gets_synthetic_separator() {
        let out = process("A | B\n1 | 2\n");
        assert_eq!(out, "A | B\n| --- | --- |\n1 | 2\n");
    }

    #[test]
    fn single_pipe_line_is_not_a_table() {
        let src = "just a | pipe\n\ntext\n";
        assert_eq!(process(src), src);
    }

    #[test]
    fn unequal_cell_counts_abort() {
        let src = "a | b\n1 | 2 | 3\n";
        assert_eq!(process(src), src);
    }

    #[test]
    fn real_table_keeps_its_alignment_row() {
        let out = process("| h1 | h2 |\n|:---|---:|\n| a | b |\n");
        // Alignment row is duplicated ahead of the old one; the old one
        // becomes an artifact body row removed at HTML time.
        assert!(out.starts_with("| h1 | h2 |\n|:---|---:|\n|:---|---:|\n"));
    }

    #[test]
    fn fenced_code_is_untouched() {
        let src = "```\na | b\nc | d\n```\n";
        assert_eq!(process(src), src);
    }
}
