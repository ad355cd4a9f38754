//! Abbreviation definition extraction.
//!
//! Three definition syntaxes are recognized:
//!
//! ```text
//! *[HTML]: HyperText Markup Language     (PHP Extra / Kramdown)
//! [>HTML]: HyperText Markup Language     (MultiMarkdown 6)
//! [>(HTML) HyperText Markup Language]    (MultiMarkdown 6, inline)
//! ```
//!
//! Line definitions are removed from the text; the inline form is replaced
//! by the bare abbreviation. Expansion into `<abbr>` tags happens at HTML
//! time so the wrapper can skip tags and code blocks.

/// Extract definitions from `text`, appending them to `abbreviations`.
pub fn extract(text: String, abbreviations: &mut Vec<(String, String)>) -> String {
    let mut output = String::with_capacity(text.len());

    for line in text.split_inclusive('\n') {
        let stripped = line.trim_end();
        if let Some((abbr, expansion)) = parse_definition_line(stripped) {
            push_unique(abbreviations, abbr, expansion);
            continue;
        }
        output.push_str(line);
    }

    if output.contains("[>(") {
        output = extract_inline(&output, abbreviations);
    }
    output
}

/// `*[ABBR]: expansion` or `[>ABBR]: expansion` filling the whole line.
fn parse_definition_line(line: &str) -> Option<(String, String)> {
    let rest = if let Some(rest) = line.strip_prefix("*[") {
        rest
    } else if let Some(rest) = line.strip_prefix("[>") {
        rest
    } else {
        return None;
    };

    let close = rest.find(']')?;
    let abbr = rest[..close].trim();
    let after = rest[close + 1..].strip_prefix(':')?;
    let expansion = after.trim();
    if abbr.is_empty() || expansion.is_empty() {
        return None;
    }
    Some((abbr.to_string(), expansion.to_string()))
}

/// Inline `[>(ABBR) expansion]`: record the definition, keep only `ABBR`
/// in the text.
fn extract_inline(text: &str, abbreviations: &mut Vec<(String, String)>) -> String {
    let mut output = String::with_capacity(text.len());
    let mut pos = 0;

    while let Some(found) = text[pos..].find("[>(") {
        let start = pos + found;
        output.push_str(&text[pos..start]);

        let inner = &text[start + 3..];
        let parsed = inner.find(')').and_then(|close_paren| {
            let abbr = inner[..close_paren].trim();
            let rest = &inner[close_paren + 1..];
            let close = rest.find(']')?;
            let expansion = rest[..close].trim();
            if abbr.is_empty() || expansion.is_empty() || abbr.contains('\n') {
                return None;
            }
            Some((abbr.to_string(), expansion.to_string(), close_paren + 1 + close + 1))
        });

        match parsed {
            Some((abbr, expansion, inner_len)) => {
                output.push_str(&abbr);
                push_unique(abbreviations, abbr, expansion);
                pos = start + 3 + inner_len;
            }
            None => {
                output.push_str("[>(");
                pos = start + 3;
            }
        }
    }

    output.push_str(&text[pos..]);
    output
}

fn push_unique(abbreviations: &mut Vec<(String, String)>, abbr: String, expansion: String) {
    if !abbreviations.iter().any(|(a, _)| *a == abbr) {
        abbreviations.push((abbr, expansion));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn php_extra_definition_line() {
        let mut abbrs = Vec::new();
        let out = extract("*[HTML]: HyperText Markup Language\nUse HTML.\n".into(), &mut abbrs);
        assert_eq!(out, "Use HTML.\n");
        assert_eq!(abbrs, vec![("HTML".into(), "HyperText Markup Language".into())]);
    }

    #[test]
    fn mmd_definition_line() {
        let mut abbrs = Vec::new();
        let out = extract("[>W3C]: World Wide Web Consortium\nbody\n".into(), &mut abbrs);
        assert_eq!(out, "body\n");
        assert_eq!(abbrs[0].0, "W3C");
    }

    #[test]
    fn inline_definition_keeps_abbreviation_text() {
        let mut abbrs = Vec::new();
        let out = extract("The [>(ABBR) Abbreviated Form] here.\n".into(), &mut abbrs);
        assert_eq!(out, "The ABBR here.\n");
        assert_eq!(abbrs, vec![("ABBR".into(), "Abbreviated Form".into())]);
    }

    #[test]
    fn duplicate_definitions_keep_first() {
        let mut abbrs = Vec::new();
        extract("*[X]: first\n*[X]: second\n".into(), &mut abbrs);
        assert_eq!(abbrs, vec![("X".into(), "first".into())]);
    }
}
