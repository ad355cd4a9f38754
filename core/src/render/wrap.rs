//! Standalone document shell.
//!
//! Wraps an HTML fragment in a complete HTML5 document: doctype, `lang`,
//! charset/viewport/generator metas, title resolution, stylesheet links
//! (or embedded content), optional raw head/footer splices, and script
//! injection before `</body>`.

use std::fs;
use std::path::PathBuf;

use log::warn;

use crate::options::Options;

/// Everything the shell needs, decoupled from the full options record so
/// `wrap_document` can be offered as a standalone entry point.
#[derive(Debug, Clone, Default)]
pub struct DocumentParams {
    pub title: Option<String>,
    pub language: Option<String>,
    pub stylesheets: Vec<PathBuf>,
    pub embed_stylesheet: bool,
    pub html_header: Option<String>,
    pub html_footer: Option<String>,
    pub script_tags: Vec<String>,
    /// Fall back to the first `<h1>` of the content for the title.
    pub title_from_h1: bool,
}

impl DocumentParams {
    pub fn from_options(options: &Options) -> Self {
        DocumentParams {
            title: options.document_title.clone(),
            language: options.language.clone(),
            stylesheets: options.stylesheets.clone(),
            embed_stylesheet: options.embed_stylesheet,
            html_header: options.html_header.clone(),
            html_footer: options.html_footer.clone(),
            script_tags: options.script_tags.clone(),
            title_from_h1: options.title_from_h1,
        }
    }
}

const DEFAULT_STYLE: &str = "body { max-width: 42em; margin: 0 auto; padding: 0 1em; \
font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; line-height: 1.6; } \
pre { overflow-x: auto; padding: 0.8em; background: #f5f5f5; } \
table { border-collapse: collapse; } td, th { border: 1px solid #ccc; padding: 0.3em 0.6em; } \
img { max-width: 100%; }";

pub fn wrap_document(content: &str, params: &DocumentParams) -> String {
    let language = params
        .language
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or("en");

    let title = params
        .title
        .clone()
        .or_else(|| {
            if params.title_from_h1 {
                first_h1_text(content)
            } else {
                None
            }
        })
        .unwrap_or_else(|| "Document".to_string());

    let mut html = String::with_capacity(content.len() + 1024);
    html.push_str("<!DOCTYPE html>\n");
    html.push_str(&format!("<html lang=\"{language}\">\n<head>\n"));
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!(
        "<meta name=\"generator\" content=\"Apex {}\">\n",
        crate::version()
    ));
    html.push_str(&format!(
        "<title>{}</title>\n",
        htmlescape::encode_minimal(&title)
    ));

    if params.stylesheets.is_empty() {
        html.push_str(&format!("<style>\n{DEFAULT_STYLE}\n</style>\n"));
    } else {
        for stylesheet in &params.stylesheets {
            if params.embed_stylesheet {
                match fs::read_to_string(stylesheet) {
                    Ok(css) => {
                        html.push_str("<style>\n");
                        html.push_str(&css);
                        html.push_str("\n</style>\n");
                        continue;
                    }
                    Err(err) => {
                        warn!(
                            "stylesheet {} unreadable, linking instead: {err}",
                            stylesheet.display()
                        );
                    }
                }
            }
            html.push_str(&format!(
                "<link rel=\"stylesheet\" href=\"{}\">\n",
                stylesheet.display()
            ));
        }
    }

    if let Some(header) = &params.html_header {
        html.push_str(header);
        html.push('\n');
    }

    html.push_str("</head>\n<body>\n");
    html.push_str(content);
    if !content.ends_with('\n') {
        html.push('\n');
    }

    if let Some(footer) = &params.html_footer {
        html.push_str(footer);
        html.push('\n');
    }
    for script in &params.script_tags {
        html.push_str(script);
        html.push('\n');
    }

    html.push_str("</body>\n</html>\n");
    html
}

/// Plain text of the first `<h1>` in the fragment.
fn first_h1_text(content: &str) -> Option<String> {
    let start = content.find("<h1")?;
    let open_end = content[start..].find('>')? + start + 1;
    let close = content[open_end..].find("</h1>")? + open_end;

    let mut text = String::new();
    let mut in_tag = false;
    for c in content[open_end..close].chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    let text = text.trim().to_string();
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_contains_doctype_and_generator() {
        let out = wrap_document("<p>x</p>", &DocumentParams::default());
        assert!(out.starts_with("<!DOCTYPE html>"));
        assert_eq!(out.matches("<!DOCTYPE html>").count(), 1);
        assert!(out.contains("name=\"generator\" content=\"Apex "));
        assert!(out.contains("<html lang=\"en\">"));
        assert!(out.contains("<title>Document</title>"));
        assert!(out.contains("<style>"));
    }

    #[test]
    fn title_falls_back_to_first_h1() {
        let params = DocumentParams {
            title_from_h1: true,
            ..DocumentParams::default()
        };
        let out = wrap_document("<h1 id=\"x\">My <em>Doc</em></h1>", &params);
        assert!(out.contains("<title>My Doc</title>"));
    }

    #[test]
    fn stylesheets_are_linked() {
        let params = DocumentParams {
            stylesheets: vec![PathBuf::from("style.css")],
            ..DocumentParams::default()
        };
        let out = wrap_document("<p>x</p>", &params);
        assert!(out.contains("<link rel=\"stylesheet\" href=\"style.css\">"));
        assert!(!out.contains("<style>"));
    }

    #[test]
    fn scripts_inject_before_body_close() {
        let params = DocumentParams {
            script_tags: vec!["<script>go()</script>".into()],
            ..DocumentParams::default()
        };
        let out = wrap_document("<p>x</p>", &params);
        let script_pos = out.find("<script>go()").unwrap();
        let body_close = out.find("</body>").unwrap();
        assert!(script_pos < body_close);
    }
}
