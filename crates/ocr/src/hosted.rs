//! Hosted vision-model OCR engine.
//!
//! Sends the image to a chat-completions style endpoint as a data URL and
//! parses the reply text into blocks.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Deserialize;
use tracing::debug;

use crate::engine::OcrEngine;
use crate::parse::parse_blocks;
use crate::types::TextBlock;
use crate::OcrError;

/// Instruction sent alongside the image.
const PROMPT: &str = "Extract all text from this document image. Reply with a JSON array of \
objects, each {\"text\": string, \"alignment\": \"left\"|\"center\"|\"right\"}, in reading order.";

/// OCR engine backed by a hosted vision model.
pub struct HostedVisionEngine {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl HostedVisionEngine {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            model: model.into(),
            api_key,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

impl OcrEngine for HostedVisionEngine {
    fn name(&self) -> &'static str {
        "hosted-vision"
    }

    async fn recognize(&self, image: &[u8], mime_type: &str) -> Result<Vec<TextBlock>, OcrError> {
        let data_url = format!("data:{mime_type};base64,{}", STANDARD.encode(image));
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": PROMPT },
                    { "type": "image_url", "image_url": { "url": data_url } },
                ],
            }],
        });

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(OcrError::BadStatus(status.as_u16()));
        }

        // Any shape surprise past this point is a malformed collaborator
        // response: recover with the raw body as fallback text.
        let raw = response.text().await?;
        let reply_text = match serde_json::from_str::<ChatReply>(&raw) {
            Ok(reply) => reply
                .choices
                .into_iter()
                .next()
                .map(|c| c.message.content)
                .unwrap_or(raw),
            Err(e) => {
                debug!(error = %e, "reply envelope not recognized, treating body as raw text");
                raw
            }
        };

        Ok(parse_blocks(&reply_text))
    }
}
