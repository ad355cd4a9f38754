//! Text-level HTML passes: abbreviation wrapping, emoji replacement,
//! tag-spacing cleanup, quote-language adjustment, email obfuscation.

use log::debug;

/// Apply `f` to every text segment of `html` that is outside tags and
/// outside `<pre>`, `<code>`, `<abbr>`, `<script>` and `<style>`
/// elements.
fn map_text_segments(html: &str, f: &dyn Fn(&str) -> String) -> String {
    const PROTECTED: [&str; 5] = ["pre", "code", "abbr", "script", "style"];

    let mut output = String::with_capacity(html.len());
    let mut pos = 0;
    let mut protected_depth = 0usize;

    while pos < html.len() {
        let Some(rel) = html[pos..].find('<') else {
            let segment = &html[pos..];
            if protected_depth == 0 {
                output.push_str(&f(segment));
            } else {
                output.push_str(segment);
            }
            break;
        };
        let tag_start = pos + rel;

        let segment = &html[pos..tag_start];
        if !segment.is_empty() {
            if protected_depth == 0 {
                output.push_str(&f(segment));
            } else {
                output.push_str(segment);
            }
        }

        let Some(tag_end_rel) = html[tag_start..].find('>') else {
            output.push_str(&html[tag_start..]);
            break;
        };
        let tag_end = tag_start + tag_end_rel;
        let tag_text = &html[tag_start..=tag_end];

        let closing = tag_text.starts_with("</");
        let name: String = tag_text
            .trim_start_matches("</")
            .trim_start_matches('<')
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        if PROTECTED.contains(&name.as_str()) && !tag_text.ends_with("/>") {
            if closing {
                protected_depth = protected_depth.saturating_sub(1);
            } else {
                protected_depth += 1;
            }
        }

        output.push_str(tag_text);
        pos = tag_end + 1;
    }

    output
}

/// Wrap whole-word occurrences of each defined abbreviation in
/// `<abbr title="…">`.
pub fn wrap_abbreviations(html: &str, abbreviations: &[(String, String)]) -> String {
    if abbreviations.is_empty() {
        return html.to_string();
    }

    let mut output = html.to_string();
    for (abbr, expansion) in abbreviations {
        let pattern = match regex::Regex::new(&format!(r"\b{}\b", regex::escape(abbr))) {
            Ok(re) => re,
            Err(err) => {
                debug!("abbreviation pattern for {abbr:?} failed: {err}");
                continue;
            }
        };
        let replacement = format!(
            "<abbr title=\"{}\">{abbr}</abbr>",
            expansion.replace('&', "&amp;").replace('"', "&quot;")
        );
        output = map_text_segments(&output, &|segment: &str| {
            pattern
                .replace_all(segment, regex::NoExpand(replacement.as_str()))
                .into_owned()
        });
    }
    output
}

/// `:name:` to Unicode emoji via the shortcode table.
pub fn replace_emoji(html: &str) -> String {
    if !html.contains(':') {
        return html.to_string();
    }

    map_text_segments(html, &|segment: &str| {
        let mut out = String::with_capacity(segment.len());
        let mut pos = 0;

        while let Some(rel) = segment[pos..].find(':') {
            let start = pos + rel;
            out.push_str(&segment[pos..start]);

            let rest = &segment[start + 1..];
            let name_len = rest
                .bytes()
                .take_while(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'_'
                    || *b == b'+' || *b == b'-')
                .count();
            if name_len > 0 && rest[name_len..].starts_with(':') {
                let name = &rest[..name_len];
                if let Some(emoji) = emojis::get_by_shortcode(name) {
                    out.push_str(emoji.as_str());
                    pos = start + 1 + name_len + 1;
                    continue;
                }
            }
            out.push(':');
            pos = start + 1;
        }

        out.push_str(&segment[pos..]);
        out
    })
}

/// Collapse runs of spaces inside tags and remove spaces before `>`.
pub fn clean_tag_spacing(html: &str) -> String {
    let mut output = String::with_capacity(html.len());
    let mut in_tag = false;
    let mut last_space_in_tag = false;

    for c in html.chars() {
        match c {
            '<' => {
                in_tag = true;
                last_space_in_tag = false;
                output.push(c);
            }
            '>' => {
                if in_tag {
                    while output.ends_with(' ') {
                        output.pop();
                    }
                }
                in_tag = false;
                output.push(c);
            }
            ' ' if in_tag => {
                if !last_space_in_tag {
                    output.push(' ');
                }
                last_space_in_tag = true;
            }
            _ => {
                last_space_in_tag = false;
                output.push(c);
            }
        }
    }

    output
}

/// Remap curly quotes to per-language conventions. Handles both the
/// Unicode characters smart typography emits and their entity forms.
pub fn adjust_quote_language(html: &str, language: &str) -> String {
    let lang = language
        .split(['-', '_'])
        .next()
        .unwrap_or(language)
        .to_ascii_lowercase();

    // (left double, right double, left single, right single)
    let (ld, rd, ls, rs) = match lang.as_str() {
        "de" => ("\u{201E}", "\u{201C}", "\u{201A}", "\u{2018}"),
        "fr" => ("\u{AB}\u{A0}", "\u{A0}\u{BB}", "\u{2039}\u{A0}", "\u{A0}\u{203A}"),
        "da" | "cs" | "sk" => ("\u{201E}", "\u{201C}", "\u{201A}", "\u{2018}"),
        "sv" | "fi" => ("\u{201D}", "\u{201D}", "\u{2019}", "\u{2019}"),
        _ => return html.to_string(),
    };

    map_text_segments(html, &move |segment: &str| {
        segment
            .replace("&ldquo;", "\u{201C}")
            .replace("&rdquo;", "\u{201D}")
            .replace("&lsquo;", "\u{2018}")
            .replace("&rsquo;", "\u{2019}")
            .replace('\u{201C}', ld)
            .replace('\u{201D}', rd)
            .replace('\u{2018}', ls)
            .replace('\u{2019}', rs)
    })
}

/// Rewrite `mailto:` links so neither the address in the href nor the
/// visible text appears verbatim: every character becomes a decimal
/// entity.
pub fn obfuscate_emails(html: &str) -> String {
    if !html.contains("mailto:") {
        return html.to_string();
    }

    let mut output = String::with_capacity(html.len() + 128);
    let mut pos = 0;

    while let Some(rel) = html[pos..].find("href=\"mailto:") {
        let href_start = pos + rel;
        let value_start = href_start + "href=\"".len();
        let Some(quote_rel) = html[value_start..].find('"') else {
            break;
        };
        let value_end = value_start + quote_rel;

        output.push_str(&html[pos..href_start]);
        output.push_str("href=\"");
        output.push_str(&entity_encode(&html[value_start..value_end]));
        output.push('"');
        pos = value_end + 1;

        // Obfuscate the immediately following link text as well.
        if let Some(gt_rel) = html[pos..].find('>') {
            let text_start = pos + gt_rel + 1;
            if let Some(close_rel) = html[text_start..].find("</a>") {
                let text = &html[text_start..text_start + close_rel];
                if !text.contains('<') {
                    output.push_str(&html[pos..text_start]);
                    output.push_str(&entity_encode(text));
                    pos = text_start + close_rel;
                }
            }
        }
    }

    output.push_str(&html[pos..]);
    output
}

fn entity_encode(text: &str) -> String {
    text.chars()
        .map(|c| format!("&#{};", c as u32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abbreviations_wrap_whole_words() {
        let out = wrap_abbreviations(
            "<p>The HTML spec and HTMLX</p>",
            &[("HTML".into(), "HyperText Markup Language".into())],
        );
        assert!(out.contains("<abbr title=\"HyperText Markup Language\">HTML</abbr> spec"));
        assert!(out.contains("HTMLX"));
    }

    #[test]
    fn abbreviations_skip_code() {
        let out = wrap_abbreviations(
            "<p><code>HTML</code> HTML</p>",
            &[("HTML".into(), "x".into())],
        );
        assert!(out.contains("<code>HTML</code>"));
        assert_eq!(out.matches("<abbr").count(), 1);
    }

    #[test]
    fn emoji_shortcodes_resolve() {
        let out = replace_emoji("<p>deal :tada: done</p>");
        assert!(out.contains("🎉"));
        assert!(!out.contains(":tada:"));
    }

    #[test]
    fn unknown_shortcodes_stay() {
        let out = replace_emoji("<p>a :nosuchemoji: b</p>");
        assert!(out.contains(":nosuchemoji:"));
    }

    #[test]
    fn tag_spacing_collapses() {
        assert_eq!(
            clean_tag_spacing("<a  href=\"x\"   >text  here</a >"),
            "<a href=\"x\">text  here</a>"
        );
    }

    #[test]
    fn german_quotes() {
        let out = adjust_quote_language("<p>\u{201C}Hallo\u{201D}</p>", "de");
        assert!(out.contains("\u{201E}Hallo\u{201C}"));
    }

    #[test]
    fn email_addresses_are_entity_encoded() {
        let out = obfuscate_emails("<a href=\"mailto:me@example.com\">me@example.com</a>");
        assert!(!out.contains("mailto:me@example.com"));
        assert!(!out.contains(">me@example.com<"));
        assert!(out.contains("&#109;"));
    }
}
