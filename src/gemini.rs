use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::prompt::{build_style_transfer_request, GenerateRequest};
use crate::settings::GeminiConfig;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("gemini request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("gemini error: HTTP {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("gemini parse error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("The model did not return an image part.")]
    NoImage,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: Option<String>,
    data: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    text: Option<String>,
    inline_data: Option<GeminiInlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContentResponse {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContentResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiResponseBody {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    error: Option<GeminiErrorDetail>,
}

/// One content part of a response, tagged by what it carries.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePart {
    Text(String),
    InlineImage { mime_type: Option<String>, data: String },
    Other,
}

impl From<GeminiPart> for ResponsePart {
    fn from(p: GeminiPart) -> Self {
        if let Some(inline) = p.inline_data {
            if let Some(data) = inline.data.filter(|d| !d.is_empty()) {
                return ResponsePart::InlineImage {
                    mime_type: inline.mime_type,
                    data,
                };
            }
        }
        match p.text {
            Some(t) => ResponsePart::Text(t),
            None => ResponsePart::Other,
        }
    }
}

/// Parts of the first candidate, in response order.
pub fn parse_parts(body: &[u8]) -> Result<Vec<ResponsePart>, GenerationError> {
    let value: GeminiResponseBody = serde_json::from_slice(body)?;
    let parts = value
        .candidates
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.content)
        .and_then(|c| c.parts)
        .unwrap_or_default();
    Ok(parts.into_iter().map(ResponsePart::from).collect())
}

/// First inline image as a PNG data URL.
pub fn first_image_data_url(parts: &[ResponsePart]) -> Option<String> {
    parts.iter().find_map(|p| match p {
        ResponsePart::InlineImage { data, .. } => Some(format!("data:image/png;base64,{data}")),
        _ => None,
    })
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Returns a `data:image/png;base64,...` URL.
    async fn generate(&self, base64: &str, mime_type: &str) -> Result<String, GenerationError>;
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        if config.api_key.is_empty() {
            warn!("Gemini API key is empty; requests will be rejected by the service");
        }
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    async fn send(&self, body: &GenerateRequest) -> Result<Vec<u8>, GenerationError> {
        let resp = self
            .http
            .post(self.config.endpoint())
            .header("X-goog-api-key", &self.config.api_key)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        let bytes = resp.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<GeminiErrorBody>(&bytes)
                .ok()
                .and_then(|b| b.error)
                .and_then(|e| e.message)
                .unwrap_or_else(|| String::from_utf8_lossy(&bytes).trim().to_string());
            return Err(GenerationError::Status { status, message });
        }

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ImageGenerator for GeminiClient {
    #[instrument(skip(self, base64), fields(model = %self.config.model, payload_len = base64.len()))]
    async fn generate(&self, base64: &str, mime_type: &str) -> Result<String, GenerationError> {
        let body = build_style_transfer_request(base64, mime_type);
        let bytes = self.send(&body).await?;
        let parts = parse_parts(&bytes)?;
        debug!(parts = parts.len(), "gemini response received");
        first_image_data_url(&parts).ok_or(GenerationError::NoImage)
    }
}
