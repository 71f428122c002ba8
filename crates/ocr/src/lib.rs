//! OCR collaborator seam.
//!
//! The capability is "given an image, return text blocks with alignment".
//! [`parse_blocks`] turns a model reply into blocks, falling back to a
//! single raw-text block whenever the reply is not well-formed structured
//! data. That fallback is a local recovery, never surfaced as a failure.

pub mod engine;
pub mod hosted;
pub mod parse;
pub mod types;

pub use engine::OcrEngine;
pub use hosted::HostedVisionEngine;
pub use parse::parse_blocks;
pub use types::{Alignment, TextBlock};

/// Errors from an OCR engine.
///
/// Only transport-level failures surface here; malformed model output is
/// recovered locally by the raw-text fallback.
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OCR backend returned status {0}")]
    BadStatus(u16),
}
