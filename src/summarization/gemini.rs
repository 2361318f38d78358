//! Google Gemini `generateContent` client.

use super::{GenerationClient, GenerationError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// [`GenerationClient`] backed by the Gemini REST API.
pub struct GeminiClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Create a client for `model`, authenticating with `api_key`.
    pub fn new(base_url: String, api_key: String, model: String, timeout: Duration) -> Self {
        let http = Client::builder()
            .user_agent("docsum/summary")
            .timeout(timeout)
            .build()
            .unwrap_or_else(|error| {
                tracing::warn!(%error, "Falling back to default HTTP client for Gemini");
                Client::new()
            });
        Self {
            http,
            base_url,
            api_key,
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn generate(&self, directive: &str) -> Result<String, GenerationError> {
        let payload = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": directive }]
            }]
        });

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.as_str())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                GenerationError::ProviderUnavailable(format!(
                    "failed to reach Gemini at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(GenerationError::ProviderUnavailable(format!(
                "Gemini model {} not found",
                self.model
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::GenerationFailed(format!(
                "Gemini returned {status}: {body}"
            )));
        }

        let body: GenerateContentResponse = response.json().await.map_err(|error| {
            GenerationError::InvalidResponse(format!("failed to decode Gemini response: {error}"))
        })?;

        if let Some(reason) = body
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
        {
            return Err(GenerationError::GenerationFailed(format!(
                "prompt blocked by Gemini: {reason}"
            )));
        }

        let candidate = body
            .candidates
            .into_iter()
            .next()
            .ok_or(GenerationError::EmptyResponse)?;
        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            tracing::warn!(finish_reason = ?candidate.finish_reason, "Gemini candidate had no text");
            return Err(GenerationError::EmptyResponse);
        }
        Ok(text)
    }

    fn provider(&self) -> &'static str {
        "gemini"
    }
}
