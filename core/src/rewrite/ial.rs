//! Inline Attribute Lists.
//!
//! Kramdown `{: …}` (and Pandoc `{…}`) annotations attach HTML attributes
//! to the element they follow:
//!
//! ```text
//! A paragraph.
//! {: .lead #intro}
//!
//! See [docs](u){:.btn #go}
//! ```
//!
//! A standalone annotation line attaches to the preceding block; an
//! annotation glued to a link/image/code/strong/emph attaches to that
//! inline node. Bare names resolve through the ALD map. Bad syntax stays
//! literal and attaches nothing.

use std::collections::HashMap;

use comrak::nodes::{AstNode, NodeValue};
use comrak::Arena;
use nom::branch::alt;
use nom::bytes::complete::{is_not, take_while1};
use nom::character::complete::{char, multispace0, multispace1};
use nom::combinator::eof;
use nom::multi::separated_list1;
use nom::sequence::{delimited, preceded};
use nom::{IResult, Parser};

use crate::rewrite::{collect_nodes, NodeAttrs};

/// Parsed attribute list, before rendering to an attribute string.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Ial {
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<(String, String)>,
    /// ALD references to resolve.
    pub refs: Vec<String>,
}

impl Ial {
    /// Render to an `id="…" class="…" key="v"` attribute string, resolving
    /// ALD references first. References that resolve recursively merge.
    pub fn to_attr_string(&self, alds: &HashMap<String, String>) -> String {
        let mut merged = Ial::default();
        for reference in &self.refs {
            if let Some(definition) = alds.get(reference) {
                if let Some(resolved) = parse_ial_content(definition) {
                    merged.absorb(resolved);
                }
            }
        }
        merged.absorb(Ial {
            id: self.id.clone(),
            classes: self.classes.clone(),
            attrs: self.attrs.clone(),
            refs: Vec::new(),
        });

        let mut parts = Vec::new();
        if let Some(id) = &merged.id {
            parts.push(format!("id=\"{}\"", escape_attr(id)));
        }
        if !merged.classes.is_empty() {
            parts.push(format!(
                "class=\"{}\"",
                escape_attr(&merged.classes.join(" "))
            ));
        }
        for (key, value) in &merged.attrs {
            parts.push(format!("{key}=\"{}\"", escape_attr(value)));
        }
        parts.join(" ")
    }

    fn absorb(&mut self, other: Ial) {
        if other.id.is_some() {
            self.id = other.id;
        }
        for class in other.classes {
            if !self.classes.contains(&class) {
                self.classes.push(class);
            }
        }
        for (key, value) in other.attrs {
            if let Some(existing) = self.attrs.iter_mut().find(|(k, _)| *k == key) {
                existing.1 = value;
            } else {
                self.attrs.push((key, value));
            }
        }
    }

    fn is_meaningful(&self) -> bool {
        self.id.is_some() || !self.classes.is_empty() || !self.attrs.is_empty()
            || !self.refs.is_empty()
    }
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

#[derive(Debug)]
enum Token {
    Id(String),
    Class(String),
    Attr(String, String),
    Ref(String),
}

fn token(input: &str) -> IResult<&str, Token> {
    alt((id_token, class_token, attr_token, ref_token)).parse(input)
}

fn name_chars(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '-' || c == '_' || c == ':').parse(input)
}

fn id_token(input: &str) -> IResult<&str, Token> {
    let (rest, name) = preceded(char('#'), name_chars).parse(input)?;
    Ok((rest, Token::Id(name.to_string())))
}

fn class_token(input: &str) -> IResult<&str, Token> {
    let (rest, name) = preceded(char('.'), name_chars).parse(input)?;
    Ok((rest, Token::Class(name.to_string())))
}

fn attr_token(input: &str) -> IResult<&str, Token> {
    let (rest, key) = name_chars(input)?;
    let (rest, _) = char('=').parse(rest)?;
    let (rest, value) = alt((
        delimited(char('"'), is_not("\""), char('"')),
        delimited(char('\''), is_not("'"), char('\'')),
        take_while1(|c: char| !c.is_whitespace() && c != '}'),
    ))
    .parse(rest)?;
    Ok((rest, Token::Attr(key.to_string(), value.to_string())))
}

fn ref_token(input: &str) -> IResult<&str, Token> {
    let (rest, name) = name_chars(input)?;
    Ok((rest, Token::Ref(name.to_string())))
}

fn ial_tokens(input: &str) -> IResult<&str, Vec<Token>> {
    let (rest, _) = multispace0.parse(input)?;
    let (rest, tokens) = separated_list1(multispace1, token).parse(rest)?;
    let (rest, _) = multispace0.parse(rest)?;
    let (rest, _) = eof.parse(rest)?;
    Ok((rest, tokens))
}

/// Parse the content between the braces (after any leading `:`).
pub fn parse_ial_content(content: &str) -> Option<Ial> {
    let content = content.trim();
    if content.is_empty() {
        return None;
    }
    let (_, tokens) = ial_tokens(content).ok()?;

    let mut ial = Ial::default();
    for token in tokens {
        match token {
            Token::Id(id) => ial.id = Some(id),
            Token::Class(class) => ial.classes.push(class),
            Token::Attr(key, value) => ial.attrs.push((key, value)),
            Token::Ref(name) => ial.refs.push(name),
        }
    }
    ial.is_meaningful().then_some(ial)
}

/// Parse a full `{: …}` / `{…}` annotation, returning the inner IAL.
/// `require_colon` restricts to the Kramdown form.
pub fn parse_braced(text: &str, require_colon: bool) -> Option<(Ial, usize)> {
    let rest = text.strip_prefix('{')?;
    let (rest, colon) = match rest.strip_prefix(':') {
        Some(rest) => (rest, true),
        None => (rest, false),
    };
    if require_colon && !colon {
        return None;
    }
    let close = rest.find('}')?;
    let ial = parse_ial_content(&rest[..close])?;
    let consumed = 1 + usize::from(colon) + close + 1;
    Some((ial, consumed))
}

/// Walk the tree and attach IALs.
pub fn attach<'a>(
    _arena: &'a Arena<'a>,
    root: &'a AstNode<'a>,
    alds: &HashMap<String, String>,
    attrs: &mut NodeAttrs,
) {
    attach_standalone_blocks(root, alds, attrs);
    attach_trailing_in_blocks(root, alds, attrs);
    attach_inline(root, alds, attrs);
}

/// A paragraph whose entire content is one annotation attaches to the
/// preceding block sibling.
fn attach_standalone_blocks<'a>(
    root: &'a AstNode<'a>,
    alds: &HashMap<String, String>,
    attrs: &mut NodeAttrs,
) {
    for node in collect_nodes(root) {
        if !matches!(node.data.borrow().value, NodeValue::Paragraph) {
            continue;
        }
        let only_child = match (node.first_child(), node.last_child()) {
            (Some(first), Some(last)) if std::ptr::eq(first, last) => first,
            _ => continue,
        };
        let literal = match &only_child.data.borrow().value {
            NodeValue::Text(text) => text.clone(),
            _ => continue,
        };
        let trimmed = literal.trim();
        let Some((ial, consumed)) = parse_braced(trimmed, false) else {
            continue;
        };
        if consumed != trimmed.len() {
            continue;
        }
        // The Pandoc form (no colon) must look like an attribute list, or
        // plain `{word}` paragraphs would vanish.
        if !trimmed.starts_with("{:") && ial.id.is_none() && ial.classes.is_empty()
            && ial.attrs.is_empty()
        {
            continue;
        }
        let Some(previous) = node.previous_sibling() else {
            continue;
        };

        attrs.attach(previous, &ial.to_attr_string(alds));
        node.detach();
    }
}

/// `text\n{: .x}` inside a paragraph or heading: the annotation sits in
/// the last text node. Attaches to the containing block.
fn attach_trailing_in_blocks<'a>(
    root: &'a AstNode<'a>,
    alds: &HashMap<String, String>,
    attrs: &mut NodeAttrs,
) {
    for node in collect_nodes(root) {
        let is_block = matches!(
            node.data.borrow().value,
            NodeValue::Paragraph | NodeValue::Heading(_)
        );
        if !is_block {
            continue;
        }
        let Some(last) = node.last_child() else {
            continue;
        };
        let literal = match &last.data.borrow().value {
            NodeValue::Text(text) => text.clone(),
            _ => continue,
        };
        let trimmed = literal.trim_end();
        let Some(open) = trimmed.rfind("{:") else {
            continue;
        };
        let candidate = &trimmed[open..];
        let Some((ial, consumed)) = parse_braced(candidate, true) else {
            continue;
        };
        if consumed != candidate.len() {
            continue;
        }

        // Standalone on its own line -> block IAL for this block. Glued to
        // text -> only valid if the text node is otherwise empty (inline
        // IALs on runs of plain text attach nowhere).
        let before = &trimmed[..open];
        let is_own_line = before.is_empty() || before.ends_with('\n');
        let previous_is_inline = last
            .previous_sibling()
            .map(|p| {
                matches!(
                    p.data.borrow().value,
                    NodeValue::SoftBreak | NodeValue::LineBreak
                )
            })
            .unwrap_or(false);

        // Headings accept a same-line annotation: `# Title {: .big}`.
        let is_heading = matches!(node.data.borrow().value, NodeValue::Heading(_));
        if !is_own_line && !before.trim().is_empty() && !is_heading {
            continue;
        }

        attrs.attach(node, &ial.to_attr_string(alds));

        // Remove the annotation (and a soft break that preceded it).
        if before.trim().is_empty() {
            let break_node = last.previous_sibling();
            last.detach();
            if previous_is_inline {
                if let Some(break_node) = break_node {
                    break_node.detach();
                }
            }
        } else {
            last.data.borrow_mut().value = NodeValue::Text(before.trim_end().to_string().into());
        }
    }
}

/// `[docs](u){:.btn}`: annotation text node directly after an inline
/// element attaches to that element.
fn attach_inline<'a>(root: &'a AstNode<'a>, alds: &HashMap<String, String>, attrs: &mut NodeAttrs) {
    for node in collect_nodes(root) {
        let literal = match &node.data.borrow().value {
            NodeValue::Text(text) if text.starts_with("{:") || text.starts_with('{') => {
                text.clone()
            }
            _ => continue,
        };
        let Some(previous) = node.previous_sibling() else {
            continue;
        };
        let attachable = matches!(
            previous.data.borrow().value,
            NodeValue::Link(_)
                | NodeValue::Image(_)
                | NodeValue::Code(_)
                | NodeValue::Strong
                | NodeValue::Emph
                | NodeValue::Strikethrough
        );
        if !attachable {
            continue;
        }
        let Some((ial, consumed)) = parse_braced(&literal, false) else {
            continue;
        };
        if !literal.starts_with("{:") && ial.id.is_none() && ial.classes.is_empty()
            && ial.attrs.is_empty()
        {
            continue;
        }

        attrs.attach(previous, &ial.to_attr_string(alds));
        let rest = literal[consumed..].to_string();
        if rest.is_empty() {
            node.detach();
        } else {
            node.data.borrow_mut().value = NodeValue::Text(rest.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs_of(content: &str) -> String {
        parse_ial_content(content)
            .expect("parse")
            .to_attr_string(&HashMap::new())
    }

    #[test]
    fn id_class_and_pairs() {
        assert_eq!(attrs_of("#go .btn"), "id=\"go\" class=\"btn\"");
        assert_eq!(
            attrs_of(".a .b key=\"v\""),
            "class=\"a b\" key=\"v\""
        );
        assert_eq!(attrs_of("key=value"), "key=\"value\"");
    }

    #[test]
    fn single_quoted_and_unquoted_values() {
        assert_eq!(attrs_of("k='a b'"), "k=\"a b\"");
        assert_eq!(attrs_of("width=50%"), "width=\"50%\"");
    }

    #[test]
    fn bad_syntax_is_rejected() {
        assert!(parse_ial_content("").is_none());
        assert!(parse_ial_content("{nested}").is_none());
    }

    #[test]
    fn ald_references_resolve() {
        let mut alds = HashMap::new();
        alds.insert("note".to_string(), ".callout #n1".to_string());
        let ial = parse_ial_content("note .extra").unwrap();
        assert_eq!(
            ial.to_attr_string(&alds),
            "id=\"n1\" class=\"callout extra\""
        );
    }

    #[test]
    fn unknown_reference_resolves_to_nothing() {
        let ial = parse_ial_content("nosuch").unwrap();
        assert_eq!(ial.to_attr_string(&HashMap::new()), "");
    }

    #[test]
    fn braced_forms() {
        let (ial, consumed) = parse_braced("{: #a .b}", true).unwrap();
        assert_eq!(consumed, 9);
        assert_eq!(ial.id.as_deref(), Some("a"));

        let (ial, _) = parse_braced("{#p .q}", false).unwrap();
        assert_eq!(ial.id.as_deref(), Some("p"));

        assert!(parse_braced("{#p}", true).is_none());
        assert!(parse_braced("not braced", false).is_none());
    }
}
