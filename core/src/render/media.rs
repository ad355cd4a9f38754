//! Media expansion and image captions.
//!
//! Auto-media discovers richer assets for local images on disk: a
//! `photo.*` wildcard resolves to the first existing video or image
//! variant, `photo@2x.png`/`photo@3x.png` siblings become a `srcset`,
//! and `photo.webp`/`photo.avif` siblings produce `<picture>` sources.
//! Video files render as `<video>` elements.
//!
//! Image captions wrap an `<img>` carrying a `caption`, `title` or `alt`
//! attribute in `<figure><figcaption>…</figcaption></figure>`.

use std::path::{Path, PathBuf};

const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "webm", "mov"];
const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "webp", "svg"];

fn attr_from_tag(tag_text: &str, name: &str) -> Option<String> {
    let pattern = format!("{name}=\"");
    let start = tag_text.find(&pattern)? + pattern.len();
    let end = tag_text[start..].find('"')? + start;
    Some(tag_text[start..end].to_string())
}

fn is_remote(url: &str) -> bool {
    url.starts_with("http:") || url.starts_with("https:") || url.starts_with("data:")
        || url.starts_with("//")
}

fn resolve(base: &Path, url: &str) -> PathBuf {
    let path = Path::new(url);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn with_extension(url: &str, ext: &str) -> String {
    match url.rfind('.') {
        Some(dot) => format!("{}.{ext}", &url[..dot]),
        None => format!("{url}.{ext}"),
    }
}

fn with_suffix(url: &str, suffix: &str) -> String {
    match url.rfind('.') {
        Some(dot) => format!("{}{suffix}{}", &url[..dot], &url[dot..]),
        None => format!("{url}{suffix}"),
    }
}

/// Map every `<img …>` tag through `f`.
fn map_img_tags(html: &str, f: impl Fn(&str) -> String) -> String {
    let mut output = String::with_capacity(html.len());
    let mut pos = 0;

    while let Some(rel) = html[pos..].find("<img") {
        let start = pos + rel;
        let Some(end_rel) = html[start..].find('>') else {
            break;
        };
        let end = start + end_rel;
        output.push_str(&html[pos..start]);
        output.push_str(&f(&html[start..=end]));
        pos = end + 1;
    }

    output.push_str(&html[pos..]);
    output
}

/// Expand local images into richer media, checking the disk under
/// `base_directory`.
pub fn expand_auto_media(html: &str, base_directory: &Path) -> String {
    if !html.contains("<img") {
        return html.to_string();
    }

    map_img_tags(html, |tag| {
        let Some(src) = attr_from_tag(tag, "src") else {
            return tag.to_string();
        };
        if is_remote(&src) {
            return tag.to_string();
        }

        // Wildcard: try videos first, then images.
        let effective_src = if src.ends_with(".*") {
            let mut resolved = None;
            for ext in VIDEO_EXTENSIONS.iter().chain(IMAGE_EXTENSIONS.iter()) {
                let candidate = with_extension(&src, ext);
                if resolve(base_directory, &candidate).exists() {
                    resolved = Some(candidate);
                    break;
                }
            }
            match resolved {
                Some(candidate) => candidate,
                None => return tag.to_string(),
            }
        } else {
            src.clone()
        };

        let ext = effective_src
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();

        if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            let alt = attr_from_tag(tag, "alt").unwrap_or_default();
            let label = if alt.is_empty() {
                String::new()
            } else {
                format!(" aria-label=\"{alt}\"")
            };
            let subtype = if ext == "mov" { "quicktime" } else { &ext };
            return format!(
                "<video controls{label}><source src=\"{effective_src}\" type=\"video/{subtype}\"></video>"
            );
        }

        // Density variants.
        let mut srcset = Vec::new();
        for (suffix, density) in [("@2x", "2x"), ("@3x", "3x")] {
            let candidate = with_suffix(&effective_src, suffix);
            if resolve(base_directory, &candidate).exists() {
                srcset.push(format!("{candidate} {density}"));
            }
        }

        let mut img = rewrite_src(tag, &effective_src);
        if !srcset.is_empty() && !img.contains("srcset=") {
            let insert_at = img.len() - usize::from(img.ends_with("/>")) - 1;
            img = format!(
                "{} srcset=\"{}\"{}",
                img[..insert_at].trim_end(),
                srcset.join(", "),
                &img[insert_at..]
            );
        }

        // Modern-format siblings become picture sources.
        let mut sources = String::new();
        for format in ["avif", "webp"] {
            if ext == *format {
                continue;
            }
            let candidate = with_extension(&effective_src, format);
            if resolve(base_directory, &candidate).exists() {
                sources.push_str(&format!(
                    "<source srcset=\"{candidate}\" type=\"image/{format}\">"
                ));
            }
        }
        if sources.is_empty() {
            img
        } else {
            format!("<picture>{sources}{img}</picture>")
        }
    })
}

fn rewrite_src(tag: &str, new_src: &str) -> String {
    let Some(start) = tag.find("src=\"") else {
        return tag.to_string();
    };
    let value_start = start + 5;
    let Some(end_rel) = tag[value_start..].find('"') else {
        return tag.to_string();
    };
    format!("{}{new_src}{}", &tag[..value_start], &tag[value_start + end_rel..])
}

/// Wrap captioned images in a `<figure>`.
pub fn convert_image_captions(html: &str, title_captions_only: bool) -> String {
    if !html.contains("<img") {
        return html.to_string();
    }

    let wrapped = map_img_tags(html, |tag| {
        let caption = attr_from_tag(tag, "caption")
            .or_else(|| attr_from_tag(tag, "title"))
            .or_else(|| {
                if title_captions_only {
                    None
                } else {
                    attr_from_tag(tag, "alt")
                }
            });
        let Some(caption) = caption.filter(|c| !c.trim().is_empty()) else {
            return tag.to_string();
        };

        format!("<figure>{tag}<figcaption>{caption}</figcaption></figure>")
    });

    // An image alone in a paragraph leaves an invalid <p><figure> pair.
    wrapped
        .replace("<p><figure>", "<figure>")
        .replace("</figure></p>", "</figure>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn captions_prefer_title_over_alt() {
        let out = convert_image_captions(
            "<p><img src=\"a.png\" alt=\"Alt\" title=\"Title\" /></p>",
            false,
        );
        assert!(out.contains("<figcaption>Title</figcaption>"));
        assert!(out.starts_with("<figure>"));
    }

    #[test]
    fn alt_captions_can_be_disabled() {
        let out = convert_image_captions("<p><img src=\"a.png\" alt=\"Alt\" /></p>", true);
        assert!(!out.contains("figcaption"));
    }

    #[test]
    fn wildcard_resolves_against_disk() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("clip.webm"), b"x").unwrap();

        let out = expand_auto_media("<img src=\"clip.*\" />", dir.path());
        assert!(out.contains("<video controls"));
        assert!(out.contains("src=\"clip.webm\""));
        assert!(out.contains("type=\"video/webm\""));
    }

    #[test]
    fn density_variants_build_srcset() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("pic.png"), b"x").unwrap();
        fs::write(dir.path().join("pic@2x.png"), b"x").unwrap();

        let out = expand_auto_media("<img src=\"pic.png\" />", dir.path());
        assert!(out.contains("srcset=\"pic@2x.png 2x\""));
    }

    #[test]
    fn webp_siblings_become_picture_sources() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("pic.png"), b"x").unwrap();
        fs::write(dir.path().join("pic.webp"), b"x").unwrap();

        let out = expand_auto_media("<img src=\"pic.png\" />", dir.path());
        assert!(out.contains("<picture><source srcset=\"pic.webp\" type=\"image/webp\">"));
        assert!(out.contains("</picture>"));
    }

    #[test]
    fn remote_images_are_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let src = "<img src=\"https://x/y.png\" />";
        assert_eq!(expand_auto_media(src, dir.path()), src);
    }
}
