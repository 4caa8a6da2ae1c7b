//! Inline SVG placeholder images.

use std::fmt::Write;

/// Longest title rendered into a placeholder.
pub const MAX_TITLE_CHARS: usize = 40;

/// Title used when none is given.
pub const DEFAULT_TITLE: &str = "Image";

/// Escapes the five XML special characters.
#[must_use]
pub fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Percent-encodes everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
#[must_use]
pub fn percent_encode_component(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 3);
    for byte in text.bytes() {
        if byte.is_ascii_alphanumeric() || b"-_.!~*'()".contains(&byte) {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "%{byte:02X}");
        }
    }
    out
}

/// Renders the 800x500 placeholder SVG for a title.
#[must_use]
pub fn placeholder_svg(title: &str) -> String {
    let title = title.trim();
    let title = if title.is_empty() { DEFAULT_TITLE } else { title };
    let truncated: String = title.chars().take(MAX_TITLE_CHARS).collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <svg xmlns=\"http://www.w3.org/2000/svg\" width=\"800\" height=\"500\">\
         <rect width=\"100%\" height=\"100%\" fill=\"#e5e7eb\"/>\
         <text x=\"50%\" y=\"50%\" dominant-baseline=\"middle\" text-anchor=\"middle\" \
         font-size=\"28\" fill=\"#111827\">{}</text></svg>",
        xml_escape(&truncated)
    )
}

/// A `data:` URI embedding the placeholder SVG.
#[must_use]
pub fn placeholder_data_uri(title: &str) -> String {
    format!(
        "data:image/svg+xml;utf8,{}",
        percent_encode_component(&placeholder_svg(title))
    )
}
