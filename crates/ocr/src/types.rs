use serde::{Deserialize, Serialize};

/// Horizontal alignment of a recognized text block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

/// One recognized block of text with its alignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
    #[serde(default)]
    pub alignment: Alignment,
}

impl TextBlock {
    /// A left-aligned block, the shape the raw-text fallback produces.
    pub fn raw(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            alignment: Alignment::Left,
        }
    }
}
