//! HTML pretty printer.
//!
//! Reflows block-level tags onto their own lines with two-space indent.
//! Inline elements (links, emphasis, code spans, images, …) stay on
//! their parent's line, and nothing between `<pre` and `</pre>` is ever
//! touched.

const INLINE_TAGS: [&str; 20] = [
    "a", "abbr", "b", "br", "cite", "code", "del", "em", "i", "img", "ins", "kbd", "mark", "q",
    "samp", "small", "span", "strong", "sub", "sup",
];

fn is_inline(name: &str) -> bool {
    INLINE_TAGS.contains(&name)
}

fn is_void(name: &str) -> bool {
    matches!(
        name,
        "area" | "base" | "br" | "col" | "embed" | "hr" | "img" | "input" | "link" | "meta"
            | "source" | "track" | "wbr"
    )
}

pub fn pretty_print(html: &str) -> String {
    let mut output = String::with_capacity(html.len() + html.len() / 4);
    let mut depth = 0usize;
    let mut pos = 0;
    let mut in_pre = false;
    // Whether anything inline was written since the last block tag.
    let mut line_open = false;

    while pos < html.len() {
        let Some(rel) = html[pos..].find('<') else {
            push_text(&mut output, &html[pos..], in_pre, &mut line_open);
            break;
        };
        let tag_start = pos + rel;
        push_text(&mut output, &html[pos..tag_start], in_pre, &mut line_open);

        let Some(tag_end_rel) = html[tag_start..].find('>') else {
            output.push_str(&html[tag_start..]);
            break;
        };
        let tag_end = tag_start + tag_end_rel;
        let tag_text = &html[tag_start..=tag_end];
        pos = tag_end + 1;

        let closing = tag_text.starts_with("</");
        let name: String = tag_text
            .trim_start_matches("</")
            .trim_start_matches('<')
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        if in_pre {
            output.push_str(tag_text);
            if closing && name == "pre" {
                in_pre = false;
                line_open = true;
            }
            continue;
        }

        if name.is_empty() || is_inline(&name) {
            output.push_str(tag_text);
            line_open = true;
            continue;
        }

        if name == "pre" && !closing {
            newline_indent(&mut output, depth);
            output.push_str(tag_text);
            in_pre = true;
            line_open = false;
            continue;
        }

        if closing {
            depth = depth.saturating_sub(1);
            if !line_open {
                newline_indent(&mut output, depth);
            }
            output.push_str(tag_text);
            line_open = false;
        } else {
            newline_indent(&mut output, depth);
            output.push_str(tag_text);
            if !is_void(&name) && !tag_text.ends_with("/>") {
                depth += 1;
            }
            line_open = false;
        }
    }

    let trimmed = output.trim_start_matches('\n');
    let mut result = trimmed.to_string();
    if !result.ends_with('\n') {
        result.push('\n');
    }
    result
}

fn push_text(output: &mut String, text: &str, in_pre: bool, line_open: &mut bool) {
    if in_pre {
        output.push_str(text);
        return;
    }
    let trimmed = text.trim_matches(|c| c == '\n' || c == '\r');
    if trimmed.trim().is_empty() {
        return;
    }
    output.push_str(trimmed);
    *line_open = true;
}

fn newline_indent(output: &mut String, depth: usize) {
    if !output.is_empty() {
        output.push('\n');
    }
    for _ in 0..depth {
        output.push_str("  ");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_get_their_own_lines() {
        let out = pretty_print("<div><p>one</p><p>two</p></div>");
        assert_eq!(out, "<div>\n  <p>one</p>\n  <p>two</p>\n</div>\n");
    }

    #[test]
    fn inline_elements_stay_with_text() {
        let out = pretty_print("<p>see <a href=\"u\">docs</a> now</p>");
        assert_eq!(out, "<p>see <a href=\"u\">docs</a> now</p>\n");
    }

    #[test]
    fn pre_content_is_untouched() {
        let html = "<pre><code>line one\n  indented\n</code></pre>";
        let out = pretty_print(html);
        assert!(out.contains("line one\n  indented\n"));
    }

    #[test]
    fn nested_lists_indent() {
        let out = pretty_print("<ul><li>a</li><li>b</li></ul>");
        assert_eq!(out, "<ul>\n  <li>a</li>\n  <li>b</li>\n</ul>\n");
    }
}
