//! The OCR engine trait.

use crate::types::TextBlock;
use crate::OcrError;

/// An OCR capability: one image in, ordered aligned text blocks out.
pub trait OcrEngine: Send + Sync {
    /// Engine identifier for logs.
    fn name(&self) -> &'static str;

    /// Recognizes the text in one image.
    ///
    /// Implementations apply the raw-text fallback themselves; a returned
    /// error means the backend could not be reached at all.
    fn recognize(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> impl Future<Output = Result<Vec<TextBlock>, OcrError>> + Send;
}
