//! Model reply parsing with raw-text fallback.

use tracing::debug;

use crate::types::TextBlock;

/// Parses a model reply into text blocks.
///
/// The expected shape is a JSON array of `{ "text": ..., "alignment": ... }`
/// objects, optionally wrapped in a fenced code block the way chat models
/// like to answer. Anything that fails to parse becomes a single
/// left-aligned block carrying the raw reply; an empty reply yields no
/// blocks.
pub fn parse_blocks(raw: &str) -> Vec<TextBlock> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let candidate = strip_code_fence(trimmed);
    match serde_json::from_str::<Vec<TextBlock>>(candidate) {
        Ok(blocks) => blocks,
        Err(e) => {
            debug!(error = %e, "reply is not structured block data, using raw fallback");
            vec![TextBlock::raw(trimmed)]
        }
    }
}

/// Strips a surrounding ```...``` fence (with an optional language tag).
fn strip_code_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return s;
    };
    // Drop the language tag on the opening fence line, if any.
    match body.split_once('\n') {
        Some((first, tail)) if !first.trim_start().starts_with(['[', '{']) => tail.trim(),
        _ => body.trim(),
    }
}
