//! `[%key:transform]` value transforms.
//!
//! Transforms pipe left to right: `[%title:trim:upper:truncate(10)]`.
//! A chain that fails to parse keeps the whole `[%…]` literal in place,
//! so the caller can leave it for a later pass (or the reader's eyes).

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;

/// Working value: scalar text, or a sequence produced by `split`.
enum Value {
    Text(String),
    Seq(Vec<String>),
}

impl Value {
    fn into_text(self) -> String {
        match self {
            Value::Text(text) => text,
            Value::Seq(items) => items.join(", "),
        }
    }

    /// Apply a scalar transform element-wise on sequences.
    fn map(self, f: impl Fn(&str) -> String) -> Value {
        match self {
            Value::Text(text) => Value::Text(f(&text)),
            Value::Seq(items) => Value::Seq(items.iter().map(|s| f(s)).collect()),
        }
    }
}

/// Apply a parsed transform chain. Returns the final text plus a flag
/// saying whether the chain already produced output safe to splice
/// without minimal HTML escaping. `None` means the chain failed to parse.
pub(crate) fn apply_transform_chain(value: &str, chain: &[String]) -> Option<(String, bool)> {
    let mut current = Value::Text(value.to_string());
    let mut pre_escaped = false;

    for segment in chain {
        let (name, arg) = split_call(segment)?;
        current = apply_one(current, name, arg)?;
        if name == "html_escape" || name == "urlencode" {
            pre_escaped = true;
        }
    }

    Some((current.into_text(), pre_escaped))
}

/// `name` or `name(args)`; anything else is a parse error.
fn split_call(segment: &str) -> Option<(&str, Option<&str>)> {
    let segment = segment.trim();
    if segment.is_empty() {
        return None;
    }
    match segment.find('(') {
        None => Some((segment, None)),
        Some(open) => {
            if !segment.ends_with(')') {
                return None;
            }
            let name = segment[..open].trim();
            let arg = &segment[open + 1..segment.len() - 1];
            if name.is_empty() {
                return None;
            }
            Some((name, Some(arg)))
        }
    }
}

/// Split an argument list on top-level commas.
fn split_args(arg: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for c in arg.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    parts.push(current);
    parts
}

fn apply_one(value: Value, name: &str, arg: Option<&str>) -> Option<Value> {
    // Sequence-aware transforms first; they consume the sequence shape.
    match name {
        "split" => {
            let sep = arg?;
            let text = value.into_text();
            let items = if sep.is_empty() {
                text.chars().map(|c| c.to_string()).collect()
            } else {
                text.split(sep).map(str::to_string).collect()
            };
            return Some(Value::Seq(items));
        }
        "join" => {
            let sep = arg.unwrap_or(", ");
            return match value {
                Value::Seq(items) => Some(Value::Text(items.join(sep))),
                text => Some(text),
            };
        }
        "first" => {
            return match value {
                Value::Seq(items) => Some(Value::Text(items.into_iter().next().unwrap_or_default())),
                text => Some(text),
            };
        }
        "last" => {
            return match value {
                Value::Seq(items) => Some(Value::Text(items.into_iter().last().unwrap_or_default())),
                text => Some(text),
            };
        }
        "slice" => {
            if let Value::Seq(items) = value {
                let (start, end) = parse_range(arg?, items.len())?;
                return Some(Value::Seq(items[start..end].to_vec()));
            }
            // Scalar slice falls through to the substr behavior below.
            let text = value.into_text();
            let chars: Vec<char> = text.chars().collect();
            let (start, end) = parse_range(arg?, chars.len())?;
            return Some(Value::Text(chars[start..end].iter().collect()));
        }
        _ => {}
    }

    let result = match name {
        "upper" => value.map(|s| s.to_uppercase()),
        "lower" => value.map(|s| s.to_lowercase()),
        "title" => value.map(title_case),
        "capitalize" => value.map(capitalize),
        "trim" => value.map(|s| s.trim().to_string()),
        "slug" => value.map(slugify),
        "reverse" => value.map(|s| s.chars().rev().collect()),
        "length" => value.map(|s| s.chars().count().to_string()),
        "basename" => value.map(|s| {
            s.trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or(s)
                .to_string()
        }),
        "html_escape" => value.map(|s| htmlescape::encode_attribute(s)),
        "urlencode" => value.map(|s| urlencoding::encode(s).into_owned()),
        "urldecode" => value.map(|s| {
            urlencoding::decode(s)
                .map(|c| c.into_owned())
                .unwrap_or_else(|_| s.to_string())
        }),
        "replace" => {
            let args = split_args(arg?);
            if args.len() != 2 {
                return None;
            }
            if let Some(pattern) = args[0].strip_prefix("regex:") {
                let re = Regex::new(pattern).ok()?;
                let replacement = args[1].clone();
                value.map(|s| re.replace_all(s, replacement.as_str()).into_owned())
            } else {
                let (from, to) = (args[0].clone(), args[1].clone());
                value.map(|s| s.replace(&from, &to))
            }
        }
        "substr" => {
            let arg = arg?;
            let text = value.into_text();
            let chars: Vec<char> = text.chars().collect();
            let (start, end) = parse_range(arg, chars.len())?;
            Value::Text(chars[start..end].iter().collect())
        }
        "truncate" => {
            let args = split_args(arg?);
            let limit: usize = args.first()?.trim().parse().ok()?;
            let ellipsis = args.get(1).cloned();
            value.map(|s| {
                if s.chars().count() <= limit {
                    s.to_string()
                } else {
                    let mut clipped: String = s.chars().take(limit).collect();
                    if let Some(e) = &ellipsis {
                        clipped.push_str(e);
                    }
                    clipped
                }
            })
        }
        "default" => {
            let fallback = arg?.to_string();
            match value {
                Value::Text(text) if text.trim().is_empty() => Value::Text(fallback),
                other => other,
            }
        }
        "prefix" => {
            let prefix = arg?.to_string();
            value.map(|s| format!("{prefix}{s}"))
        }
        "suffix" => {
            let suffix = arg?.to_string();
            value.map(|s| format!("{s}{suffix}"))
        }
        "remove" => {
            let needle = arg?.to_string();
            value.map(|s| s.replace(&needle, ""))
        }
        "repeat" => {
            let count: usize = arg?.trim().parse().ok()?;
            value.map(|s| s.repeat(count))
        }
        "format" => {
            let template = arg?.to_string();
            value.map(|s| {
                if template.contains("{}") {
                    template.replacen("{}", s, 1)
                } else {
                    template.clone()
                }
            })
        }
        "pad" => {
            let args = split_args(arg?);
            let width: usize = args.first()?.trim().parse().ok()?;
            let fill = args
                .get(1)
                .and_then(|s| s.chars().next())
                .unwrap_or(' ');
            value.map(|s| {
                let len = s.chars().count();
                if len >= width {
                    s.to_string()
                } else {
                    let mut padded: String = std::iter::repeat(fill).take(width - len).collect();
                    padded.push_str(s);
                    padded
                }
            })
        }
        "contains" => {
            let needle = arg?.to_string();
            value.map(|s| s.contains(&needle).to_string())
        }
        "strftime" => {
            let format = arg?.to_string();
            value.map(|s| reformat_date(s, &format))
        }
        _ => return None,
    };

    Some(result)
}

/// `start[,end]` with negative indices counting from the end.
fn parse_range(arg: &str, len: usize) -> Option<(usize, usize)> {
    let args = split_args(arg);
    let start: i64 = args.first()?.trim().parse().ok()?;
    let end: Option<i64> = match args.get(1) {
        Some(s) if !s.trim().is_empty() => Some(s.trim().parse().ok()?),
        _ => None,
    };

    let resolve = |idx: i64| -> usize {
        if idx < 0 {
            len.saturating_sub(idx.unsigned_abs() as usize)
        } else {
            (idx as usize).min(len)
        }
    };

    let start = resolve(start);
    let end = end.map_or(len, resolve).max(start);
    Some((start, end.min(len)))
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut last_dash = true;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Parse a date-ish value and reformat it. Unparseable input is returned
/// unchanged rather than erased.
fn reformat_date(value: &str, format: &str) -> String {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return dt.format(format).to_string();
    }
    for pattern in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, pattern) {
            return dt.format(format).to_string();
        }
    }
    for pattern in ["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%B %d, %Y", "%d %B %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, pattern) {
            return date.format(format).to_string();
        }
    }
    if let Ok(secs) = value.parse::<i64>() {
        if let Some(dt) = Utc.timestamp_opt(secs, 0).single() {
            return dt.format(format).to_string();
        }
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(value: &str, chain: &[&str]) -> Option<String> {
        let chain: Vec<String> = chain.iter().map(|s| s.to_string()).collect();
        apply_transform_chain(value, &chain).map(|(text, _)| text)
    }

    #[test]
    fn case_transforms() {
        assert_eq!(run("hello world", &["upper"]).unwrap(), "HELLO WORLD");
        assert_eq!(run("hello world", &["title"]).unwrap(), "Hello World");
        assert_eq!(run("hello world", &["capitalize"]).unwrap(), "Hello world");
    }

    #[test]
    fn slug_collapses_and_trims() {
        assert_eq!(run("Big News: 2026!", &["slug"]).unwrap(), "big-news-2026");
    }

    #[test]
    fn replace_literal_and_regex() {
        assert_eq!(run("a-b-c", &["replace(-,+)"]).unwrap(), "a+b+c");
        assert_eq!(
            run("version 12", &["replace(regex:[0-9]+,N)"]).unwrap(),
            "version N"
        );
    }

    #[test]
    fn truncate_appends_ellipsis_when_given() {
        assert_eq!(run("abcdef", &["truncate(3)"]).unwrap(), "abc");
        assert_eq!(run("abcdef", &["truncate(3,…)"]).unwrap(), "abc…");
        assert_eq!(run("ab", &["truncate(3,…)"]).unwrap(), "ab");
    }

    #[test]
    fn split_join_pipeline() {
        assert_eq!(
            run("a, b, c", &["split(, )", "join(|)"]).unwrap(),
            "a|b|c"
        );
        assert_eq!(run("a,b,c", &["split(,)", "first"]).unwrap(), "a");
        assert_eq!(run("a,b,c", &["split(,)", "last"]).unwrap(), "c");
        assert_eq!(
            run("a,b,c,d", &["split(,)", "slice(1,3)", "join(-)"]).unwrap(),
            "b-c"
        );
    }

    #[test]
    fn default_fills_empty() {
        assert_eq!(run("", &["default(n/a)"]).unwrap(), "n/a");
        assert_eq!(run("x", &["default(n/a)"]).unwrap(), "x");
    }

    #[test]
    fn substr_supports_negative_indices() {
        assert_eq!(run("abcdef", &["substr(1,3)"]).unwrap(), "bc");
        assert_eq!(run("abcdef", &["substr(-2)"]).unwrap(), "ef");
    }

    #[test]
    fn strftime_parses_common_shapes() {
        assert_eq!(
            run("2026-03-01", &["strftime(%d.%m.%Y)"]).unwrap(),
            "01.03.2026"
        );
        // Unparseable values pass through.
        assert_eq!(run("not a date", &["strftime(%Y)"]).unwrap(), "not a date");
    }

    #[test]
    fn unknown_transform_is_an_error() {
        assert!(run("x", &["nosuch"]).is_none());
    }
}
