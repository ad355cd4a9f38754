//! ARIA accessibility pass.
//!
//! Adds `role` attributes to tables and figures, labels the generated
//! TOC nav, and links each table to its caption with `aria-describedby`
//! when both share the same `<figure class="table-figure">`.

pub fn apply(html: &str) -> String {
    let mut output = html.to_string();

    if output.contains("<nav class=\"toc\">") {
        output = output.replace(
            "<nav class=\"toc\">",
            "<nav class=\"toc\" aria-label=\"Table of contents\">",
        );
    }

    if output.contains("<figure class=\"table-figure\">") {
        output = link_table_captions(&output);
    }

    output = add_role(&output, "<table", " role=\"table\"");
    output = add_role(&output, "<figure", " role=\"figure\"");

    output
}

/// Add a role to every matching opening tag that does not already carry
/// one.
fn add_role(html: &str, tag_prefix: &str, role_attr: &str) -> String {
    let mut output = String::with_capacity(html.len() + 64);
    let mut pos = 0;

    while let Some(rel) = html[pos..].find(tag_prefix) {
        let start = pos + rel;
        let Some(end_rel) = html[start..].find('>') else {
            break;
        };
        let end = start + end_rel;
        let tag = &html[start..=end];

        // Tag-name boundary: `<table` must not match `<tablex`.
        let boundary_ok = html[start + tag_prefix.len()..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_ascii_alphanumeric());

        output.push_str(&html[pos..start]);
        if boundary_ok && !tag.contains("role=") {
            output.push_str(&tag[..tag.len() - 1]);
            output.push_str(role_attr);
            output.push('>');
        } else {
            output.push_str(tag);
        }
        pos = end + 1;
    }

    output.push_str(&html[pos..]);
    output
}

/// Within each table figure, give the figcaption an id and point the
/// table at it.
fn link_table_captions(html: &str) -> String {
    let mut output = String::with_capacity(html.len() + 128);
    let mut pos = 0;
    let mut counter = 0usize;

    while let Some(rel) = html[pos..].find("<figure class=\"table-figure\">") {
        let fig_start = pos + rel;
        let Some(fig_end_rel) = html[fig_start..].find("</figure>") else {
            break;
        };
        let fig_end = fig_start + fig_end_rel + "</figure>".len();
        let figure = &html[fig_start..fig_end];

        output.push_str(&html[pos..fig_start]);

        // Both parts must live in this same figure.
        if figure.contains("<figcaption") && figure.contains("<table") {
            counter += 1;
            let caption_id = format!("table-caption-{counter}");
            let rewritten = figure
                .replacen(
                    "<figcaption>",
                    &format!("<figcaption id=\"{caption_id}\">"),
                    1,
                )
                .replacen("<table", &format!("<table aria-describedby=\"{caption_id}\""), 1);
            output.push_str(&rewritten);
        } else {
            output.push_str(figure);
        }
        pos = fig_end;
    }

    output.push_str(&html[pos..]);
    output
}
