//! Heading post-processing: ID injection, anchor tags, base-level
//! shifting, and widont.

use crate::options::Options;
use crate::rewrite::HeaderInfo;

/// Inject the collected heading IDs into `<hN>` tags in document order.
/// An existing `id=` on the tag is replaced: the AST-derived ID already
/// honored manual/IAL precedence.
pub fn inject_ids(html: &str, headers: &[HeaderInfo], options: &Options) -> String {
    let mut output = String::with_capacity(html.len() + headers.len() * 16);
    let mut heading_index = 0usize;
    let mut pos = 0;

    while let Some(rel) = find_heading_tag(&html[pos..]) {
        let tag_start = pos + rel;
        let Some(tag_end_rel) = html[tag_start..].find('>') else {
            break;
        };
        let tag_end = tag_start + tag_end_rel;

        output.push_str(&html[pos..tag_start]);
        let tag_text = &html[tag_start..=tag_end];

        match headers.get(heading_index) {
            Some(info) if options.header_anchors => {
                output.push_str(&strip_id_attr(tag_text));
                output.push_str(&format!("<a class=\"anchor\" id=\"{}\"></a>", info.id));
            }
            Some(info) => {
                output.push_str(&set_id_attr(tag_text, &info.id));
            }
            None => output.push_str(tag_text),
        }

        heading_index += 1;
        pos = tag_end + 1;
    }

    output.push_str(&html[pos..]);
    output
}

/// Find the next `<hN` opening tag (N in 1..=6).
fn find_heading_tag(html: &str) -> Option<usize> {
    let bytes = html.as_bytes();
    let mut pos = 0;
    while let Some(rel) = html[pos..].find("<h") {
        let at = pos + rel;
        if let (Some(&level), after) = (bytes.get(at + 2), bytes.get(at + 3)) {
            if (b'1'..=b'6').contains(&level)
                && matches!(after, Some(&b' ') | Some(&b'>') | Some(&b'\t'))
            {
                return Some(at);
            }
        }
        pos = at + 2;
    }
    None
}

fn set_id_attr(tag_text: &str, id: &str) -> String {
    let stripped = strip_id_attr(tag_text);
    let insert_at = stripped.len() - 1;
    format!("{} id=\"{id}\">", stripped[..insert_at].trim_end())
}

fn strip_id_attr(tag_text: &str) -> String {
    let Some(id_pos) = tag_text.find(" id=\"") else {
        return tag_text.to_string();
    };
    let value_start = id_pos + 5;
    let Some(close_rel) = tag_text[value_start..].find('"') else {
        return tag_text.to_string();
    };
    let mut out = String::with_capacity(tag_text.len());
    out.push_str(&tag_text[..id_pos]);
    out.push_str(&tag_text[value_start + close_rel + 1..]);
    out
}

/// Shift every `<hM>`/`</hM>` by `base_header_level - 1`, clamping to 6.
pub fn shift_levels(html: &str, base_header_level: u8) -> String {
    if base_header_level <= 1 {
        return html.to_string();
    }
    let offset = u32::from(base_header_level) - 1;
    let mut output = String::with_capacity(html.len());
    let bytes = html.as_bytes();
    let mut pos = 0;

    while pos < bytes.len() {
        let Some(rel) = html[pos..].find("<") else {
            output.push_str(&html[pos..]);
            break;
        };
        let at = pos + rel;
        output.push_str(&html[pos..at]);

        let (closing, level_at) = if html[at..].starts_with("</h") {
            (true, at + 3)
        } else if html[at..].starts_with("<h") {
            (false, at + 2)
        } else {
            output.push('<');
            pos = at + 1;
            continue;
        };

        match bytes.get(level_at) {
            Some(&level @ b'1'..=b'6')
                if matches!(
                    bytes.get(level_at + 1),
                    Some(&b' ') | Some(&b'>') | Some(&b'\t')
                ) =>
            {
                let shifted = (u32::from(level - b'0') + offset).min(6);
                output.push_str(if closing { "</h" } else { "<h" });
                output.push_str(&shifted.to_string());
                pos = level_at + 1;
            }
            _ => {
                output.push('<');
                pos = at + 1;
            }
        }
    }

    output
}

/// Join the last two words of each heading with `&nbsp;` so a heading
/// never wraps a single word.
pub fn widont(html: &str) -> String {
    let mut output = String::with_capacity(html.len() + 32);
    let mut pos = 0;

    while let Some(rel) = find_heading_tag(&html[pos..]) {
        let tag_start = pos + rel;
        let Some(open_end_rel) = html[tag_start..].find('>') else {
            break;
        };
        let content_start = tag_start + open_end_rel + 1;
        let level = &html[tag_start + 1..tag_start + 3];
        let close_tag = format!("</{level}>");
        let Some(close_rel) = html[content_start..].find(&close_tag) else {
            output.push_str(&html[pos..content_start]);
            pos = content_start;
            continue;
        };
        let content_end = content_start + close_rel;

        output.push_str(&html[pos..content_start]);
        output.push_str(&apply_widont(&html[content_start..content_end]));
        pos = content_end;
    }

    output.push_str(&html[pos..]);
    output
}

fn apply_widont(content: &str) -> String {
    // Last text-level space outside of tags.
    let mut last_space = None;
    let mut in_tag = false;
    for (idx, c) in content.char_indices() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            ' ' if !in_tag => last_space = Some(idx),
            _ => {}
        }
    }
    let Some(space) = last_space else {
        return content.to_string();
    };
    // Both sides need a word for the join to prevent a widow.
    if content[..space].trim().is_empty() || content[space + 1..].trim().is_empty() {
        return content.to_string();
    }
    format!("{}&nbsp;{}", &content[..space], &content[space + 1..])
}
