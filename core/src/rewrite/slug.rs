//! Header slug generation in three dialect formats.
//!
//! ```text
//! "Héllo — World!"   GFM      -> "hello-world"
//! "Héllo — World!"   MMD      -> "héllo—world"
//! "Héllo — World!"   Kramdown -> "hllo-world"
//! ```
//!
//! GFM folds Latin diacritics to ASCII, turns spaces into collapsed
//! dashes, and drops other punctuation. MMD keeps diacritics and dashes
//! but drops spaces and ASCII punctuation. Kramdown turns spaces and
//! interior punctuation into dashes (uncollapsed), drops diacritics, and
//! removes trailing punctuation. An empty result is the literal
//! `"header"`.

use std::collections::HashMap;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::options::IdFormat;

pub fn slugify(text: &str, format: IdFormat) -> String {
    let slug = match format {
        IdFormat::Gfm => slug_gfm(text),
        IdFormat::Mmd => slug_mmd(text),
        IdFormat::Kramdown => slug_kramdown(text),
    };
    if slug.is_empty() {
        "header".to_string()
    } else {
        slug
    }
}

/// Fold one character to its ASCII base letter, if it has one.
fn fold_diacritic(c: char) -> Option<char> {
    if c == 'ß' {
        return Some('s');
    }
    let mut base = None;
    for d in std::iter::once(c).nfd() {
        if is_combining_mark(d) {
            continue;
        }
        if d.is_ascii_alphanumeric() {
            base = Some(d.to_ascii_lowercase());
        }
        break;
    }
    base
}

fn slug_gfm(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut last_was_dash = false;
    let mut first_char = true;

    for c in text.chars() {
        if c == '\u{2014}' || c == '\u{2013}' {
            // Em and en dashes are removed outright.
            continue;
        }
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_dash = false;
            first_char = false;
        } else if c == ' ' || c == '-' {
            if !last_was_dash && !first_char {
                slug.push('-');
                last_was_dash = true;
            }
        } else if let Some(folded) = fold_diacritic(c) {
            slug.push(folded);
            last_was_dash = false;
            first_char = false;
        }
        // Everything else (punctuation, other whitespace) is dropped.
    }

    slug.trim_matches('-').to_string()
}

fn slug_mmd(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '-' || c == '\u{2014}' || c == '\u{2013}' {
            slug.push(c);
        } else if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !c.is_ascii() {
            // Diacritics and other non-ASCII are preserved as written.
            slug.push(c);
        }
        // Spaces and ASCII punctuation are dropped.
    }
    slug
}

fn slug_kramdown(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut slug = String::with_capacity(text.len());
    let mut last_was_punct_dash = false;

    for (idx, &c) in chars.iter().enumerate() {
        // Trailing = only whitespace between here and the end.
        let is_trailing = chars[idx + 1..]
            .iter()
            .all(|&n| n == ' ' || n == '\t' || n == '\n' || n == '\r');

        if c == '\u{2014}' || c == '\u{2013}' || !c.is_ascii() {
            // Em/en dashes and diacritics are removed.
            last_was_punct_dash = false;
        } else if c == '-' {
            slug.push('-');
            last_was_punct_dash = false;
        } else if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_punct_dash = false;
        } else if c == ' ' {
            if last_was_punct_dash {
                // Space right after punctuation-made dash is swallowed.
                last_was_punct_dash = false;
            } else {
                slug.push('-');
            }
        } else {
            // ASCII punctuation: dash in the middle, dropped when trailing.
            if !is_trailing {
                slug.push('-');
                last_was_punct_dash = true;
            }
        }
    }

    slug.trim_start_matches('-').to_string()
}

/// Per-conversion duplicate disambiguation: second `intro` becomes
/// `intro-1`, third `intro-2`, in encounter order.
#[derive(Debug, Default)]
pub struct SlugCounter {
    seen: HashMap<String, usize>,
}

impl SlugCounter {
    pub fn new() -> Self {
        SlugCounter::default()
    }

    pub fn disambiguate(&mut self, slug: &str) -> String {
        let count = self.seen.entry(slug.to_string()).or_insert(0);
        *count += 1;
        if *count == 1 {
            slug.to_string()
        } else {
            format!("{slug}-{}", *count - 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gfm_basics() {
        assert_eq!(slugify("Hello World", IdFormat::Gfm), "hello-world");
        assert_eq!(slugify("Héllo!", IdFormat::Gfm), "hello");
        assert_eq!(slugify("A — B", IdFormat::Gfm), "a-b");
        assert_eq!(slugify("  spaced  ", IdFormat::Gfm), "spaced");
    }

    #[test]
    fn mmd_preserves_dashes_and_diacritics() {
        assert_eq!(slugify("Hello World", IdFormat::Mmd), "helloworld");
        assert_eq!(slugify("Héllo-World", IdFormat::Mmd), "héllo-world");
        assert_eq!(slugify("A — B", IdFormat::Mmd), "a—b");
    }

    #[test]
    fn kramdown_spaces_become_uncollapsed_dashes() {
        assert_eq!(slugify("Hello  World", IdFormat::Kramdown), "hello--world");
        assert_eq!(slugify("Héllo", IdFormat::Kramdown), "hllo");
        // Trailing punctuation is removed, not dashed.
        assert_eq!(slugify("Done!", IdFormat::Kramdown), "done");
        // Interior punctuation dashes; the following space is swallowed.
        assert_eq!(slugify("a: b", IdFormat::Kramdown), "a-b");
    }

    #[test]
    fn punctuation_only_headings_fall_back() {
        assert_eq!(slugify("!!!", IdFormat::Gfm), "header");
        assert_eq!(slugify("", IdFormat::Mmd), "header");
    }

    #[test]
    fn slugging_is_idempotent() {
        for format in [IdFormat::Gfm, IdFormat::Kramdown] {
            let once = slugify("Héllo — World!", format);
            assert_eq!(slugify(&once, format), once);
        }
    }

    #[test]
    fn duplicates_gain_numeric_suffixes() {
        let mut counter = SlugCounter::new();
        assert_eq!(counter.disambiguate("intro"), "intro");
        assert_eq!(counter.disambiguate("intro"), "intro-1");
        assert_eq!(counter.disambiguate("intro"), "intro-2");
        assert_eq!(counter.disambiguate("other"), "other");
    }
}
