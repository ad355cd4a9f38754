//! `==highlight==` to `<mark>` rewriting.
//!
//! Active outside fenced code, inline code, indented code blocks, and
//! Critic Markup braces. An opener is exactly two `=` not flanked by `=`
//! or `+` and not followed by whitespace; the closer mirrors this.
//! Unclosed highlights on a line stay literal.

/// True if content at `rest` looks like a list marker (`- `, `* `, `+ `,
/// or `1. `).
fn looks_like_list_marker(rest: &str) -> bool {
    let bytes = rest.as_bytes();
    match bytes.first() {
        Some(&b'-') | Some(&b'*') | Some(&b'+') => {
            matches!(bytes.get(1), Some(&b' ') | Some(&b'\t'))
        }
        Some(&(b'0'..=b'9')) => {
            let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
            bytes.get(digits) == Some(&b'.')
                && matches!(bytes.get(digits + 1), Some(&b' ') | Some(&b'\t'))
        }
        _ => false,
    }
}

/// A line is an indented code block when it starts with a tab or four
/// spaces and is not a (nested) list line.
fn line_is_indented_code(line: &str) -> bool {
    if let Some(rest) = line.strip_prefix('\t') {
        return !looks_like_list_marker(rest);
    }
    if let Some(rest) = line.strip_prefix("    ") {
        return !looks_like_list_marker(rest.trim_start_matches(' '));
    }
    false
}

pub fn process(text: &str) -> String {
    if !text.contains("==") {
        return text.to_string();
    }

    let mut output = String::with_capacity(text.len() + 64);
    let bytes = text.as_bytes();
    let mut pos = 0;
    let mut in_fence = false;
    let mut in_inline_code = false;
    let mut in_indented_code = false;

    while pos < bytes.len() {
        if pos == 0 || bytes[pos - 1] == b'\n' {
            in_indented_code = line_is_indented_code(&text[pos..]);
            in_inline_code = false;
        }

        if bytes[pos] == b'`' {
            if text[pos..].starts_with("```") {
                in_fence = !in_fence;
                output.push_str("```");
                pos += 3;
                continue;
            } else if !in_fence {
                in_inline_code = !in_inline_code;
            }
        }

        let preceded_by = if pos > 0 { bytes[pos - 1] } else { 0 };
        let is_critic = preceded_by == b'{';
        let valid_opener = bytes[pos] == b'='
            && bytes.get(pos + 1) == Some(&b'=')
            && !matches!(
                bytes.get(pos + 2),
                None | Some(&b'=') | Some(&b'}') | Some(&b' ') | Some(&b'\t') | Some(&b'\n')
                    | Some(&b'\r') | Some(&b'+')
            )
            && preceded_by != b'='
            && preceded_by != b'+';

        if !in_fence && !in_inline_code && !in_indented_code && !is_critic && valid_opener {
            if let Some(close) = find_closer(text, pos + 2) {
                output.push_str("<mark>");
                output.push_str(&text[pos + 2..close]);
                output.push_str("</mark>");
                pos = close + 2;
                continue;
            }
        }

        let ch_len = text[pos..].chars().next().map_or(1, char::len_utf8);
        output.push_str(&text[pos..pos + ch_len]);
        pos += ch_len;
    }

    output
}

/// Find the closing `==` on the same line. The character before the
/// closer must not be whitespace or `=`; the character after must not be
/// `=`.
fn find_closer(text: &str, from: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut idx = from;
    while idx + 1 < bytes.len() {
        match bytes[idx] {
            b'\n' | b'\r' => return None,
            b'=' if bytes[idx + 1] == b'=' => {
                let before = bytes[idx - 1];
                let after = bytes.get(idx + 2);
                if before != b' ' && before != b'\t' && before != b'='
                    && after != Some(&b'=')
                    && idx > from
                {
                    return Some(idx);
                }
                idx += 2;
            }
            _ => idx += 1,
        }
    }
    None
}
