//! Attribute List Definition extraction.
//!
//! Kramdown lets a document define a named attribute list once and
//! reference it from IALs later:
//!
//! ```text
//! {:callout: .callout .wide role="note"}
//!
//! A paragraph.
//! {: callout}
//! ```
//!
//! Definition lines live at block scope; they are removed from the text
//! and stored in the ALD map. Malformed lines stay literal.

use std::collections::HashMap;

use nom::bytes::complete::{tag, take_while1};
use nom::character::complete::char;
use nom::sequence::preceded;
use nom::{IResult, Parser};

/// Parse one `{:name: attrs}` definition line, returning `(name, attrs)`.
fn ald_line(input: &str) -> IResult<&str, (&str, &str)> {
    let (rest, _) = tag("{:").parse(input)?;
    let (rest, name) =
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_').parse(rest)?;
    let (rest, _) = char(':').parse(rest)?;
    let (rest, attrs) = preceded(
        take_while1(|c: char| c == ' ' || c == '\t'),
        take_while1(|c| c != '}'),
    )
    .parse(rest)?;
    let (rest, _) = char('}').parse(rest)?;
    Ok((rest, (name, attrs.trim())))
}

/// Remove ALD lines from `text`, recording them in `alds`.
pub fn extract(text: String, alds: &mut HashMap<String, String>) -> String {
    if !text.contains("{:") {
        return text;
    }

    let mut output = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let stripped = line.trim_end();
        if let Ok((rest, (name, attrs))) = ald_line(stripped) {
            if rest.is_empty() {
                alds.insert(name.to_string(), attrs.to_string());
                continue;
            }
        }
        output.push_str(line);
    }
    output
}
