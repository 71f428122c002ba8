//! Document writers.

use piclink_ocr::Alignment;

use crate::{DocError, Document};

/// Renders an assembled document into a downloadable byte stream.
pub trait DocumentWriter {
    /// File extension without the dot.
    fn extension(&self) -> &'static str;

    /// Content type of the rendered file.
    fn mime_type(&self) -> &'static str;

    fn write(&self, doc: &Document) -> Result<Vec<u8>, DocError>;
}

/// Plain-text rendering. Alignment cannot be expressed and is dropped.
pub struct PlainTextWriter;

impl DocumentWriter for PlainTextWriter {
    fn extension(&self) -> &'static str {
        "txt"
    }

    fn mime_type(&self) -> &'static str {
        "text/plain"
    }

    fn write(&self, doc: &Document) -> Result<Vec<u8>, DocError> {
        let mut out = String::new();
        for paragraph in &doc.paragraphs {
            out.push_str(&paragraph.text);
            out.push('\n');
        }
        Ok(out.into_bytes())
    }
}

/// HTML rendering with per-paragraph text alignment.
pub struct HtmlWriter;

impl DocumentWriter for HtmlWriter {
    fn extension(&self) -> &'static str {
        "html"
    }

    fn mime_type(&self) -> &'static str {
        "text/html"
    }

    fn write(&self, doc: &Document) -> Result<Vec<u8>, DocError> {
        let mut out = String::from(
            "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"></head>\n<body>\n",
        );
        for paragraph in &doc.paragraphs {
            if paragraph.is_separator() {
                out.push_str("<p>&nbsp;</p>\n");
                continue;
            }
            let align = match paragraph.alignment {
                Alignment::Left => "left",
                Alignment::Center => "center",
                Alignment::Right => "right",
            };
            out.push_str(&format!(
                "<p style=\"text-align: {align}\">{}</p>\n",
                escape_html(&paragraph.text)
            ));
        }
        out.push_str("</body>\n</html>\n");
        Ok(out.into_bytes())
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
