//! Gemini API client.
//!
//! Implements [`TierClient`] over the `generateContent` endpoint of the
//! Generative Language API.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};
use tubegate_core::CallError;
use tubegate_fetch::{GenerationRequest, TierClient};
use url::Url;

use crate::error::{ProviderError, status_error};

// ============================================================================
// Constants
// ============================================================================

/// Gemini API base URL (Generative Language API).
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/";

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// User agent for API requests.
const USER_AGENT_VALUE: &str = "TubeGate/0.1";

/// Request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// API Request Types
// ============================================================================

/// `generateContent` request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    /// Conversation turns; one user turn here.
    pub contents: Vec<Content>,
}

/// One turn.
#[derive(Debug, Serialize, Deserialize)]
pub struct Content {
    /// Turn role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Turn parts.
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// A text or inline-data part.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    /// Text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Inline binary data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
}

/// Base64 payload with its MIME type.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    /// MIME type, e.g. `image/png`.
    pub mime_type: String,
    /// Base64-encoded bytes.
    pub data: String,
}

impl From<&GenerationRequest> for GenerateContentRequest {
    fn from(request: &GenerationRequest) -> Self {
        let mut parts = vec![Part {
            text: Some(request.prompt.clone()),
            inline_data: None,
        }];
        parts.extend(request.images.iter().map(|image| Part {
            text: None,
            inline_data: Some(Blob {
                mime_type: image.mime_type.clone(),
                data: STANDARD.encode(&image.data),
            }),
        }));
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
        }
    }
}

// ============================================================================
// API Response Types
// ============================================================================

/// `generateContent` response body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    /// Candidates.
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Feedback on the prompt, set when it was blocked.
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

/// One candidate answer.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Candidate content.
    #[serde(default)]
    pub content: Option<Content>,
    /// Why generation stopped.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Prompt feedback.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    /// Block reason, if blocked.
    #[serde(default)]
    pub block_reason: Option<String>,
}

/// Extracts the concatenated text of the first candidate.
pub fn parse_generate_response(body: &str) -> Result<String, ProviderError> {
    let response: GenerateContentResponse = serde_json::from_str(body).map_err(|e| {
        warn!(error = %e, "Failed to parse generateContent response");
        ProviderError::InvalidResponse(format!("JSON error: {e}"))
    })?;

    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates".to_string());
        return Err(ProviderError::InvalidResponse(format!("Empty response: {reason}")));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "no text".to_string());
        return Err(ProviderError::InvalidResponse(format!("Empty response: {reason}")));
    }
    Ok(text)
}

// ============================================================================
// API Client
// ============================================================================

/// Gemini API client bound to one API key.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base: Url,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient").field("base", &self.base.as_str()).finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Creates a client against the public API.
    pub fn new(api_key: &str) -> Result<Self, ProviderError> {
        let base = Url::parse(GEMINI_API_BASE)
            .map_err(|e| ProviderError::ClientBuild(format!("Invalid base URL: {e}")))?;
        Self::with_base_url(api_key, base)
    }

    /// Creates a client against another base URL.
    pub fn with_base_url(api_key: &str, base: Url) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut key = HeaderValue::from_str(api_key.trim())
            .map_err(|e| ProviderError::ClientBuild(format!("Invalid API key: {e}")))?;
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()
            .map_err(|e| ProviderError::ClientBuild(e.to_string()))?;

        Ok(Self { http, base })
    }

    /// URL of `generateContent` for a model.
    pub fn generate_url(&self, model: &str) -> Result<Url, ProviderError> {
        let model = model.strip_prefix("models/").unwrap_or(model);
        self.base
            .join(&format!("models/{model}:generateContent"))
            .map_err(|e| ProviderError::InvalidResponse(format!("Invalid URL: {e}")))
    }

    #[instrument(skip(self, request), fields(images = request.images.len()))]
    async fn generate_content(&self, model: &str, request: &GenerationRequest) -> Result<String, ProviderError> {
        let url = self.generate_url(model)?;
        let body = GenerateContentRequest::from(request);
        debug!("Calling Gemini generateContent");

        let response = self.http.post(url).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), model, "Gemini call failed");
            return Err(status_error(status.as_u16(), &text));
        }

        parse_generate_response(&text)
    }
}

#[async_trait]
impl TierClient for GeminiClient {
    async fn generate(&self, model: &str, request: &GenerationRequest) -> Result<String, CallError> {
        self.generate_content(model, request).await.map_err(CallError::from)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_inlines_image() {
        let request = GenerationRequest::text("describe").with_image("image/png", vec![1, 2, 3]);
        let body = serde_json::to_value(GenerateContentRequest::from(&request)).unwrap();

        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "describe");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[1]["inlineData"]["data"], "AQID");
        assert!(parts[0].get("inlineData").is_none());
    }

    #[test]
    fn test_request_body_keeps_every_image_in_order() {
        let request = GenerationRequest::text("compare these thumbnails")
            .with_image("image/png", vec![1, 2, 3])
            .with_image("image/jpeg", vec![0xff, 0xd8]);
        let body = serde_json::to_value(GenerateContentRequest::from(&request)).unwrap();

        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[2]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[2]["inlineData"]["data"], "/9g=");
    }

    #[test]
    fn test_parse_generate_response() {
        let json = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hello, "}, {"text": "world"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 3}
        }"#;
        assert_eq!(parse_generate_response(json).unwrap(), "Hello, world");
    }

    #[test]
    fn test_blocked_prompt_is_invalid_response() {
        let json = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let err = parse_generate_response(json).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_generate_url() {
        let client = GeminiClient::new("test-key").unwrap();
        let url = client.generate_url("models/gemini-2.5-flash").unwrap();
        assert_eq!(
            url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_debug_hides_key() {
        let client = GeminiClient::new("secret-key").unwrap();
        assert!(!format!("{client:?}").contains("secret-key"));
    }
}
