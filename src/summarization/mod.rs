//! Abstractive summarization through an external text-generation provider.
//!
//! A coarse [`SummaryLength`] is turned into a word budget, the budget and source text are
//! assembled into a directive by [`build_prompt`], and the directive is sent to a
//! [`GenerationClient`]. Clients are constructed explicitly (see [`build_generation_client`]) and
//! handed to the [`Summarizer`]; nothing here reads process-wide state.

mod gemini;
mod ollama;
pub mod prompt;

use crate::config::{Config, ConfigError, GenerationProvider};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use gemini::GeminiClient;
pub use ollama::OllamaClient;
pub use prompt::{SummaryLength, build_prompt, resolve_word_budget};

/// Errors surfaced by generation providers.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Provider was unreachable or the call timed out.
    #[error("Generation provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Generation request failed: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
    /// Provider answered with no text.
    #[error("Provider returned an empty response")]
    EmptyResponse,
}

/// Errors produced while summarizing text.
#[derive(Debug, Error)]
pub enum SummarizeError {
    /// Source text was empty or whitespace-only.
    #[error("No text provided for summarization")]
    EmptyInput,
    /// The generation provider failed.
    #[error("Failed to generate summary: {0}")]
    SummarizationFailed(#[from] GenerationError),
}

/// Interface implemented by text-generation providers.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Send `directive` to the provider and return the generated text.
    async fn generate(&self, directive: &str) -> Result<String, GenerationError>;

    /// Provider label used in logs.
    fn provider(&self) -> &'static str;
}

/// A generated summary together with its size metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryResult {
    /// Trimmed summary text.
    #[serde(rename = "summary")]
    pub summary_text: String,
    /// Length selector the summary was generated for.
    pub length: SummaryLength,
    /// Character count of the source text.
    #[serde(rename = "originalLength")]
    pub original_char_count: usize,
    /// Character count of the trimmed summary.
    #[serde(rename = "summaryLength")]
    pub summary_char_count: usize,
}

/// Runs the length → directive → generation pipeline.
#[derive(Clone)]
pub struct Summarizer {
    client: Arc<dyn GenerationClient>,
}

impl Summarizer {
    /// Wrap an explicitly constructed generation client.
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self { client }
    }

    /// Summarize `text` to roughly the word budget of `length`.
    ///
    /// Empty input is rejected before the provider is contacted. Provider failures are returned
    /// as [`SummarizeError::SummarizationFailed`] without retrying.
    pub async fn summarize(
        &self,
        text: &str,
        length: SummaryLength,
    ) -> Result<SummaryResult, SummarizeError> {
        if text.trim().is_empty() {
            return Err(SummarizeError::EmptyInput);
        }
        let word_budget = length.word_budget();
        let directive = build_prompt(text, word_budget)?;
        let original_char_count = text.chars().count();
        tracing::info!(
            provider = self.client.provider(),
            length = %length,
            word_budget,
            original_chars = original_char_count,
            "Requesting summary"
        );

        let generated = self.client.generate(&directive).await.inspect_err(|error| {
            tracing::error!(provider = self.client.provider(), %error, "Summary generation failed");
        })?;

        let summary_text = generated.trim().to_string();
        if summary_text.is_empty() {
            tracing::error!(provider = self.client.provider(), "Provider returned a blank summary");
            return Err(GenerationError::EmptyResponse.into());
        }
        let summary_char_count = summary_text.chars().count();
        tracing::info!(
            provider = self.client.provider(),
            length = %length,
            summary_chars = summary_char_count,
            "Summary generated"
        );

        Ok(SummaryResult {
            summary_text,
            length,
            original_char_count,
            summary_char_count,
        })
    }
}

/// Build the generation client selected by `config`.
pub fn build_generation_client(
    config: &Config,
) -> Result<Arc<dyn GenerationClient>, ConfigError> {
    let timeout = Duration::from_secs(config.generation_timeout_secs);
    let client: Arc<dyn GenerationClient> = match config.generation_provider {
        GenerationProvider::Gemini => Arc::new(GeminiClient::new(
            config.gemini_base_url.clone(),
            config.require_gemini_api_key()?.to_string(),
            config.generation_model.clone(),
            timeout,
        )),
        GenerationProvider::Ollama => Arc::new(OllamaClient::new(
            config.ollama_url.clone(),
            config.generation_model.clone(),
            timeout,
        )),
    };
    Ok(client)
}
