//! Definition-list normalization.
//!
//! Kramdown and PHP Extra write definitions directly under the term:
//!
//! ```text
//! Term
//! : definition one
//! : definition two
//! ```
//!
//! The engine's description-list extension wants a blank line between
//! term and first definition. This pass inserts it, leaving everything
//! else (including `: caption` lines after tables) alone.

pub fn process(text: &str) -> String {
    if !text.contains("\n: ") {
        return text.to_string();
    }

    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    let mut output = String::with_capacity(text.len() + 16);
    let mut in_fence = false;

    for (idx, line) in lines.iter().enumerate() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            output.push_str(line);
            continue;
        }

        if !in_fence && line.starts_with(": ") && idx > 0 {
            let previous = lines[idx - 1].trim_end();
            let previous_is_term = !previous.is_empty()
                && !previous.starts_with(": ")
                && !previous.contains('|')
                && !previous.starts_with('#')
                && !previous.starts_with('>');
            if previous_is_term {
                output.push('\n');
            }
        }

        output.push_str(line);
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_line_is_inserted_between_term_and_definition() {
        let out = process("Term\n: definition\n");
        assert_eq!(out, "Term\n\n: definition\n");
    }

    #[test]
    fn consecutive_definitions_stay_together() {
        let out = process("Term\n: one\n: two\n");
        assert_eq!(out, "Term\n\n: one\n: two\n");
    }

    #[test]
    fn table_captions_are_not_definitions() {
        let src = "| a |\n| - |\n: caption\n";
        assert_eq!(process(src), src);
    }

    #[test]
    fn already_blank_separated_is_unchanged() {
        let src = "Term\n\n: definition\n";
        assert_eq!(process(src), src);
    }
}
