//! Document assembly.
//!
//! The collaborator capability "given ordered text blocks, return a
//! downloadable file": each image's blocks become alignment-tagged
//! paragraphs with a blank separator paragraph between images.

pub mod writer;

pub use writer::{DocumentWriter, HtmlWriter, PlainTextWriter};

use piclink_ocr::{Alignment, TextBlock};
use tracing::debug;

/// Errors from document rendering.
#[derive(Debug, thiserror::Error)]
pub enum DocError {
    #[error("document render failed: {0}")]
    Render(String),
}

/// One paragraph of the assembled document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    pub text: String,
    pub alignment: Alignment,
}

impl Paragraph {
    fn separator() -> Self {
        Self {
            text: String::new(),
            alignment: Alignment::Left,
        }
    }

    pub fn is_separator(&self) -> bool {
        self.text.is_empty()
    }
}

/// The assembled, render-ready document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    pub paragraphs: Vec<Paragraph>,
}

/// Assembles per-image block sequences into one document.
///
/// Blocks keep their order and alignment; consecutive images are divided
/// by a single blank paragraph, with none trailing. Images whose OCR fell
/// back to a raw block contribute that block like any other; assembly
/// never aborts on a degraded page.
pub fn assemble(pages: &[Vec<TextBlock>]) -> Document {
    let mut paragraphs = Vec::new();

    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            paragraphs.push(Paragraph::separator());
        }
        for block in page {
            paragraphs.push(Paragraph {
                text: block.text.clone(),
                alignment: block.alignment,
            });
        }
    }

    debug!(
        pages = pages.len(),
        paragraphs = paragraphs.len(),
        "document assembled"
    );
    Document { paragraphs }
}
