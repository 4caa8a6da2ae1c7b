//! The four document repairs, applied in order.

use regex::Regex;
use std::collections::HashMap;

use super::normalize::{heading_text, titles_match};
use crate::errors::RepairError;
use crate::image::placeholder_data_uri;
use crate::model::{DraftSection, GeneratedImage, ImagePrompt, Outline};

/// Title used when a document has none.
pub const DEFAULT_TITLE: &str = "Final Draft";
/// Heading of the prose kept ahead of the outline sections.
pub const OVERVIEW_HEADING: &str = "## Overview";
/// Heading of the image prompt appendix.
pub const APPENDIX_HEADING: &str = "## Appendix: Image Prompts";
/// Heading of the gallery for images with no matching section.
pub const GALLERY_HEADING: &str = "## Image Preview";

/// Everything the repairs may consult besides the document itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct RepairContext<'a> {
    /// Outline of the run.
    pub outline: Option<&'a Outline>,
    /// Section drafts.
    pub drafts: &'a [DraftSection],
    /// Image prompts.
    pub prompts: &'a [ImagePrompt],
    /// Generated images.
    pub images: &'a [GeneratedImage],
}

/// One repair step.
pub type Repair = fn(&str, &RepairContext<'_>) -> Result<String, RepairError>;

/// Repairs in application order.
pub const REPAIRS: [(&str, Repair); 4] = [
    ("sectioning", sectioning),
    ("prompt-appendix", prompt_appendix),
    ("image-placement", image_placement),
    ("title", title),
];

fn compile(repair: &str, pattern: &str) -> Result<Regex, RepairError> {
    Regex::new(pattern).map_err(|e| RepairError::new(repair, e.to_string()))
}

/// Rebuilds `## ` sections from the outline when the document has none.
///
/// # Errors
///
/// Fails only if a pattern does not compile.
pub fn sectioning(doc: &str, ctx: &RepairContext<'_>) -> Result<String, RepairError> {
    let h2 = compile("sectioning", r"(?m)^##\s+")?;
    if h2.is_match(doc) {
        return Ok(doc.to_string());
    }
    let title_line = compile("sectioning", r"(?m)^[ \t]*#\s+[^\n]+\n?")?;
    let leading_title = compile("sectioning", r"^\s*#\s+[^\n]+\n?")?;

    let (title, body) = match title_line.find(doc) {
        Some(m) => (
            m.as_str().trim().to_string(),
            format!("{}{}", &doc[..m.start()], &doc[m.end()..]),
        ),
        None => (format!("# {DEFAULT_TITLE}"), doc.to_string()),
    };

    let mut out = title;
    let body = body.trim();
    if !body.is_empty() {
        out.push_str(&format!("\n\n{OVERVIEW_HEADING}\n\n{body}"));
    }

    let mut drafts: HashMap<&str, &str> = HashMap::new();
    for d in ctx.drafts {
        drafts.entry(d.section_id.as_str()).or_insert(d.markdown.as_str());
    }
    for (i, section) in ctx.outline.map_or(&[][..], |o| &o.sections[..]).iter().enumerate() {
        let draft = drafts.get(section.id.as_str()).copied().unwrap_or_default();
        let draft_body = leading_title.replace(draft, "");
        out.push_str(&format!(
            "\n\n## {}. {}\n\n{}",
            i + 1,
            section.title,
            draft_body.trim()
        ));
    }
    Ok(out)
}

/// Appends the image prompts as a numbered appendix.
///
/// # Errors
///
/// Never fails.
pub fn prompt_appendix(doc: &str, ctx: &RepairContext<'_>) -> Result<String, RepairError> {
    if ctx.prompts.is_empty() {
        return Ok(doc.to_string());
    }
    let mut out = format!("{doc}\n\n{APPENDIX_HEADING}");
    for (i, p) in ctx.prompts.iter().enumerate() {
        out.push_str(&format!("\n- {}. {}: {}", i + 1, p.title, p.prompt));
    }
    Ok(out)
}

/// Places each image under its section heading, or in a trailing gallery.
///
/// # Errors
///
/// Never fails.
pub fn image_placement(doc: &str, ctx: &RepairContext<'_>) -> Result<String, RepairError> {
    if ctx.images.is_empty() {
        return Ok(doc.to_string());
    }
    let mut lines: Vec<String> = doc.split('\n').map(str::to_string).collect();
    let mut leftovers = Vec::new();

    for (i, image) in ctx.images.iter().enumerate() {
        let title = if image.title.is_empty() {
            ctx.outline
                .and_then(|o| o.section_title(&image.section_id))
                .unwrap_or_default()
                .to_string()
        } else {
            image.title.clone()
        };
        let alt = if title.is_empty() {
            format!("Image {}", i + 1)
        } else {
            title.clone()
        };
        let url = if image.url.trim().is_empty() {
            placeholder_data_uri(&alt)
        } else {
            image.url.clone()
        };
        let image_line = format!("![{alt}]({url})");

        let heading = lines
            .iter()
            .position(|l| is_h2(l) && titles_match(heading_text(l), &title));
        match heading {
            Some(h) => {
                // Blank and image lines directly under the heading.
                let already = lines[h + 1..]
                    .iter()
                    .take_while(|l| l.is_empty() || l.starts_with("!["))
                    .any(|l| *l == image_line);
                if !already {
                    lines.splice(h + 1..h + 1, [String::new(), image_line, String::new()]);
                }
            }
            None => leftovers.push(image_line),
        }
    }

    let mut out = lines.join("\n");
    if !leftovers.is_empty() {
        let gallery = leftovers.join("\n");
        if !out.contains(&format!("{GALLERY_HEADING}\n{gallery}")) {
            out.push_str(&format!("\n\n{GALLERY_HEADING}\n{gallery}"));
        }
    }
    Ok(out)
}

fn is_h2(line: &str) -> bool {
    line.strip_prefix("##")
        .and_then(|rest| rest.chars().next())
        .is_some_and(char::is_whitespace)
}

/// Prepends a title when no line starts with `# `.
///
/// # Errors
///
/// Fails only if the pattern does not compile.
pub fn title(doc: &str, _ctx: &RepairContext<'_>) -> Result<String, RepairError> {
    let h1 = compile("title", r"(?m)^\s*#\s+")?;
    if h1.is_match(doc) {
        Ok(doc.to_string())
    } else {
        Ok(format!("# {DEFAULT_TITLE}\n\n{doc}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OutlineSection;
    use pretty_assertions::assert_eq;

    fn outline() -> Outline {
        Outline::new(
            "Guide",
            vec![
                OutlineSection::new("Intro").with_id("s1"),
                OutlineSection::new("Details").with_id("s2"),
            ],
        )
    }

    #[test]
    fn test_sectioning_rebuilds_sections() {
        let outline = outline();
        let drafts = vec![
            DraftSection::new("s1", "# Intro\n\nHello."),
            DraftSection::new("s2", "More."),
        ];
        let ctx = RepairContext {
            outline: Some(&outline),
            drafts: &drafts,
            ..Default::default()
        };
        let out = sectioning("# Guide\n\nSome prose.", &ctx).unwrap();
        assert_eq!(
            out,
            "# Guide\n\n## Overview\n\nSome prose.\n\n## 1. Intro\n\nHello.\n\n## 2. Details\n\nMore."
        );
    }

    #[test]
    fn test_sectioning_uses_first_draft_for_repeated_id() {
        let outline = Outline::new("Guide", vec![OutlineSection::new("Intro").with_id("1")]);
        let drafts = vec![
            DraftSection::new("1", "first body"),
            DraftSection::new("1", "second body"),
        ];
        let ctx = RepairContext {
            outline: Some(&outline),
            drafts: &drafts,
            ..Default::default()
        };
        let out = sectioning("# Guide", &ctx).unwrap();
        assert_eq!(out, "# Guide\n\n## 1. Intro\n\nfirst body");
    }

    #[test]
    fn test_sectioning_keeps_sectioned_doc() {
        let doc = "# T\n\n## A\n\ntext";
        assert_eq!(sectioning(doc, &RepairContext::default()).unwrap(), doc);
    }

    #[test]
    fn test_sectioning_without_title_or_outline() {
        let out = sectioning("plain text", &RepairContext::default()).unwrap();
        assert_eq!(out, "# Final Draft\n\n## Overview\n\nplain text");
    }

    #[test]
    fn test_prompt_appendix() {
        let prompts = vec![
            ImagePrompt::new("s1", "Intro", "a lighthouse"),
            ImagePrompt::new("s2", "Details", "gears"),
        ];
        let ctx = RepairContext {
            prompts: &prompts,
            ..Default::default()
        };
        assert_eq!(
            prompt_appendix("doc", &ctx).unwrap(),
            "doc\n\n## Appendix: Image Prompts\n- 1. Intro: a lighthouse\n- 2. Details: gears"
        );
    }

    #[test]
    fn test_image_placed_under_heading() {
        let images = vec![ImagePrompt::new("s1", "Intro", "p").into_image("https://x/i.png")];
        let ctx = RepairContext {
            images: &images,
            ..Default::default()
        };
        let doc = "# T\n\n## 1. Intro\n\nHello.";
        let out = image_placement(doc, &ctx).unwrap();
        assert_eq!(out, "# T\n\n## 1. Intro\n\n![Intro](https://x/i.png)\n\n\nHello.");

        let again = image_placement(&out, &ctx).unwrap();
        assert_eq!(again, out);
    }

    #[test]
    fn test_two_images_under_one_heading_are_placed_once() {
        let images = vec![
            ImagePrompt::new("s1", "Intro", "p").into_image("https://x/1.png"),
            ImagePrompt::new("s1", "Intro", "q").into_image("https://x/2.png"),
        ];
        let ctx = RepairContext {
            images: &images,
            ..Default::default()
        };
        let out = image_placement("# T\n\n## 1. Intro\n\nHello.", &ctx).unwrap();
        let again = image_placement(&out, &ctx).unwrap();
        assert_eq!(again, out);
        assert_eq!(again.matches("https://x/1.png").count(), 1);
        assert_eq!(again.matches("https://x/2.png").count(), 1);
    }

    #[test]
    fn test_unmatched_image_goes_to_gallery() {
        let outline = outline();
        let images = vec![ImagePrompt::new("s9", "", "p").into_image("")];
        let ctx = RepairContext {
            outline: Some(&outline),
            images: &images,
            ..Default::default()
        };
        let out = image_placement("# T\n\n## Intro", &ctx).unwrap();
        assert!(out.starts_with("# T\n\n## Intro\n\n## Image Preview\n![Image 1](data:image/svg+xml"));
    }

    #[test]
    fn test_image_title_falls_back_to_outline() {
        let outline = outline();
        let images = vec![ImagePrompt::new("s2", "", "p").into_image("u")];
        let ctx = RepairContext {
            outline: Some(&outline),
            images: &images,
            ..Default::default()
        };
        let out = image_placement("## 2. Details\ntext", &ctx).unwrap();
        assert_eq!(out, "## 2. Details\n\n![Details](u)\n\ntext");
    }

    #[test]
    fn test_title_prepended_once() {
        let ctx = RepairContext::default();
        assert_eq!(title("## A", &ctx).unwrap(), "# Final Draft\n\n## A");
        assert_eq!(title("# Mine\n## A", &ctx).unwrap(), "# Mine\n## A");
    }
}
