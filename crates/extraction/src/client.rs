use std::time::Duration;

use async_trait::async_trait;
use base64::prelude::*;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::ExtractionError;
use crate::parse::{parse_model_output, ExtractionOutcome};
use crate::prompt::INVOICE_PROMPT;

/// Hard deadline for one generate call. Vision models chew on large images
/// for a while; anything slower is treated as a timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// How much of the raw model reply is logged before truncation.
const RAW_PREVIEW_LIMIT: usize = 4000;

/// Boundary to the external vision model.
#[async_trait]
pub trait VisionClient: Send + Sync {
    /// Send one invoice image and return the parsed reply.
    async fn extract_invoice(&self, image: &[u8]) -> Result<ExtractionOutcome, ExtractionError>;
}

/// Request body for an Ollama-style `/api/generate` endpoint.
///
/// `stream` is pinned to `false`: the reply must arrive as one JSON document,
/// not a chunk stream.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    images: Vec<String>,
    stream: bool,
}

/// [`VisionClient`] backed by an Ollama-compatible HTTP endpoint.
pub struct OllamaVisionClient {
    http: reqwest::Client,
    url: String,
    model: String,
}

impl OllamaVisionClient {
    pub fn new(url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl VisionClient for OllamaVisionClient {
    async fn extract_invoice(&self, image: &[u8]) -> Result<ExtractionOutcome, ExtractionError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt: INVOICE_PROMPT,
            images: vec![BASE64_STANDARD.encode(image)],
            stream: false,
        };

        let response = self
            .http
            .post(&self.url)
            .timeout(REQUEST_TIMEOUT)
            .json(&request)
            .send()
            .await
            .map_err(classify_send_error)?;

        let raw: JsonValue = response
            .json()
            .await
            .map_err(|e| ExtractionError::Http(e.to_string()))?;

        debug!(reply = %raw_preview(&raw), "model replied");

        let text = raw.get("response").and_then(|v| v.as_str()).unwrap_or("");
        parse_model_output(text)
    }
}

fn classify_send_error(e: reqwest::Error) -> ExtractionError {
    if e.is_timeout() {
        ExtractionError::Timeout
    } else {
        ExtractionError::Http(e.to_string())
    }
}

/// Pretty render of the raw reply, truncated so a giant base64 echo cannot
/// flood the logs.
fn raw_preview(raw: &JsonValue) -> String {
    let rendered = serde_json::to_string_pretty(raw).unwrap_or_default();
    if rendered.len() <= RAW_PREVIEW_LIMIT {
        return rendered;
    }
    // Back the cut up to a char boundary so it never splits a multibyte char.
    let mut cut = RAW_PREVIEW_LIMIT;
    while !rendered.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}\n...TRUNCATED...", &rendered[..cut])
}
