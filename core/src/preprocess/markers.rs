//! Marked special markers: page breaks and presentation pauses.
//!
//! `<!--BREAK-->` and `{::pagebreak /}` become a page-break div;
//! `<!--PAUSE:N-->` becomes a pause marker carrying its duration.

const PAGE_BREAK_HTML: &str =
    "<div class=\"page-break\" style=\"page-break-after: always;\"></div>";

pub fn process(text: &str) -> String {
    let mut output = text.replace("<!--BREAK-->", PAGE_BREAK_HTML);
    output = output.replace("{::pagebreak /}", PAGE_BREAK_HTML);

    if output.contains("<!--PAUSE") {
        output = replace_pause_markers(&output);
    }
    output
}

fn replace_pause_markers(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut pos = 0;

    while let Some(found) = text[pos..].find("<!--PAUSE:") {
        let start = pos + found;
        output.push_str(&text[pos..start]);

        let rest = &text[start + 10..];
        let parsed = rest.find("-->").and_then(|close| {
            let digits = rest[..close].trim();
            digits.parse::<u32>().ok().map(|secs| (secs, close + 3))
        });

        match parsed {
            Some((secs, consumed)) => {
                output.push_str(&format!(
                    "<div class=\"pause-marker\" data-pause=\"{secs}\"></div>"
                ));
                pos = start + 10 + consumed;
            }
            None => {
                output.push_str("<!--PAUSE:");
                pos = start + 10;
            }
        }
    }

    output.push_str(&text[pos..]);
    output
}
