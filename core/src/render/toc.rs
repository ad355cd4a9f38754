//! Table-of-contents marker expansion.
//!
//! Recognized markers in the rendered HTML:
//!
//! ```text
//! <!--TOC-->   <!--TOC max=3-->   <!--TOC max=4 min=2-->
//! {{TOC}}      {{TOC:2-3}}        {:toc}
//! ```
//!
//! Each marker is replaced by a `<nav class="toc">` of nested `<ul>`
//! lists linking to the collected heading slugs within the level range.

use crate::rewrite::HeaderInfo;

pub fn expand(html: &str, headers: &[HeaderInfo]) -> String {
    let mut output = html.to_string();

    // Comment markers.
    while let Some(start) = output.find("<!--TOC") {
        let Some(end_rel) = output[start..].find("-->") else {
            break;
        };
        let end = start + end_rel + 3;
        let marker = &output[start..end];
        let (min, max) = parse_range(marker);
        let toc = render_toc(headers, min, max);
        output.replace_range(start..end, &toc);
    }

    // {{TOC}} / {{TOC:lo-hi}}, possibly wrapped in a paragraph.
    while let Some(start) = output.find("{{TOC") {
        let Some(end_rel) = output[start..].find("}}") else {
            break;
        };
        let end = start + end_rel + 2;
        let marker = output[start..end].to_string();
        let (min, max) = parse_range(&marker);
        let toc = render_toc(headers, min, max);

        let (start, end) = widen_to_paragraph(&output, start, end);
        output.replace_range(start..end, &toc);
    }

    // Kramdown `{:toc}` paragraph.
    while let Some(start) = output.find("{:toc}") {
        let end = start + "{:toc}".len();
        let toc = render_toc(headers, 1, 6);
        let (start, end) = widen_to_paragraph(&output, start, end);
        output.replace_range(start..end, &toc);
    }

    output
}

/// When a marker is the sole content of a `<p>…</p>`, replace the whole
/// paragraph.
fn widen_to_paragraph(html: &str, start: usize, end: usize) -> (usize, usize) {
    let before = &html[..start];
    let after = &html[end..];
    if before.trim_end().ends_with("<p>") && after.trim_start().starts_with("</p>") {
        let new_start = before.trim_end().len() - 3;
        let skip_ws = after.len() - after.trim_start().len();
        let new_end = end + skip_ws + 4;
        (new_start, new_end)
    } else {
        (start, end)
    }
}

/// `max=N`/`min=M` parameters or a `:lo-hi` range.
fn parse_range(marker: &str) -> (u8, u8) {
    let mut min = 1u8;
    let mut max = 6u8;

    if let Some(pos) = marker.find("max") {
        if let Some(n) = first_digit(&marker[pos + 3..]) {
            max = n;
        }
    }
    if let Some(pos) = marker.find("min") {
        if let Some(n) = first_digit(&marker[pos + 3..]) {
            min = n;
        }
    }
    if let Some(colon) = marker.find(':') {
        let rest = marker[colon + 1..].trim_start();
        if let Some(lo) = first_digit(rest) {
            min = lo;
            if let Some(dash) = rest.find('-') {
                if let Some(hi) = first_digit(&rest[dash + 1..]) {
                    max = hi;
                }
            }
        }
    }

    (min, max)
}

fn first_digit(text: &str) -> Option<u8> {
    text.chars()
        .find(|c| c.is_ascii_digit())
        .and_then(|c| c.to_digit(10))
        .map(|d| d as u8)
}

fn render_toc(headers: &[HeaderInfo], min: u8, max: u8) -> String {
    let mut html = String::from("<nav class=\"toc\">\n");
    let mut current_level = 0u8;

    for header in headers {
        if header.level < min || header.level > max {
            continue;
        }
        while current_level > header.level {
            html.push_str("</ul>\n");
            current_level -= 1;
        }
        while current_level < header.level {
            html.push_str("<ul>\n");
            current_level += 1;
        }
        html.push_str(&format!(
            "<li><a href=\"#{}\">{}</a></li>\n",
            header.id,
            escape_text(&header.text)
        ));
    }

    while current_level > 0 {
        html.push_str("</ul>\n");
        current_level -= 1;
    }
    html.push_str("</nav>");
    html
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::HeaderInfo;

    fn headers() -> Vec<HeaderInfo> {
        vec![
            HeaderInfo { level: 1, text: "One".into(), id: "one".into() },
            HeaderInfo { level: 2, text: "Two".into(), id: "two".into() },
            HeaderInfo { level: 3, text: "Three".into(), id: "three".into() },
        ]
    }

    #[test]
    fn comment_marker_expands() {
        let out = expand("<!--TOC-->", &headers());
        assert!(out.contains("<nav class=\"toc\">"));
        assert!(out.contains("<a href=\"#one\">One</a>"));
        assert!(out.contains("<a href=\"#three\">Three</a>"));
    }

    #[test]
    fn range_marker_limits_depth() {
        let out = expand("<p>{{TOC:2-2}}</p>", &headers());
        assert!(!out.contains("#one"));
        assert!(out.contains("#two"));
        assert!(!out.contains("#three"));
        assert!(!out.contains("<p>"));
    }

    #[test]
    fn max_parameter_is_honored() {
        let out = expand("<!--TOC max=2-->", &headers());
        assert!(out.contains("#one"));
        assert!(out.contains("#two"));
        assert!(!out.contains("#three"));
    }
}
