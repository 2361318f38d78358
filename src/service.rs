//! Request-level orchestration shared by the HTTP surface and the CLI.
//!
//! Uploads and summaries follow different failure policies. A failed extraction does not fail
//! the upload: the document is still accepted and reported with `extraction: None`. A failed
//! summary is returned to the caller as an error.

use crate::{
    config::Config,
    config::ConfigError,
    extraction::{ExtractionResult, Extractor, LopdfParser, TesseractEngine},
    metrics::{MetricsSnapshot, ServiceMetrics},
    summarization::{SummarizeError, Summarizer, SummaryLength, SummaryResult, build_generation_client},
};
use async_trait::async_trait;
use axum::body::Bytes;
use std::sync::Arc;
use std::time::Duration;

/// A document received in a single request. Never persisted.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    /// Raw file contents.
    pub bytes: Bytes,
    /// Declared content type of the file.
    pub media_type: String,
    /// Size of the file in bytes.
    pub size_bytes: usize,
    /// File name supplied by the client, if any.
    pub original_name: Option<String>,
}

impl UploadedDocument {
    /// Wrap `bytes` declared as `media_type`.
    pub fn new(bytes: Bytes, media_type: impl Into<String>, original_name: Option<String>) -> Self {
        Self {
            size_bytes: bytes.len(),
            bytes,
            media_type: media_type.into(),
            original_name,
        }
    }
}

/// Result of accepting an upload.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    /// File name supplied by the client, if any.
    pub original_name: Option<String>,
    /// Declared content type of the file.
    pub media_type: String,
    /// Size of the file in bytes.
    pub size_bytes: usize,
    /// Extracted text, or `None` when extraction failed.
    pub extraction: Option<ExtractionResult>,
}

/// Abstraction over the document pipeline used by external surfaces.
#[async_trait]
pub trait DocumentApi: Send + Sync {
    /// Accept an upload and attempt to extract its text.
    async fn process_upload(&self, document: UploadedDocument) -> UploadOutcome;

    /// Summarize raw text.
    async fn summarize(
        &self,
        text: &str,
        length: SummaryLength,
    ) -> Result<SummaryResult, SummarizeError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Owns the extraction dispatcher, the summarizer, and the request counters.
///
/// Construct the service once near process start and share it through an `Arc`.
pub struct DocumentService {
    extractor: Extractor,
    summarizer: Summarizer,
    metrics: ServiceMetrics,
}

impl DocumentService {
    /// Assemble a service from explicit components.
    pub fn new(extractor: Extractor, summarizer: Summarizer) -> Self {
        Self {
            extractor,
            summarizer,
            metrics: ServiceMetrics::new(),
        }
    }

    /// Build the production service (lopdf, Tesseract, configured generation provider).
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        tracing::info!(
            provider = ?config.generation_provider,
            model = %config.generation_model,
            "Initializing generation client"
        );
        let client = build_generation_client(config)?;
        Ok(Self::new(
            build_extractor(config),
            Summarizer::new(client),
        ))
    }
}

/// Build the production extractor (lopdf for PDFs, Tesseract for images).
pub fn build_extractor(config: &Config) -> Extractor {
    let ocr = TesseractEngine::new(config.tesseract_cmd.clone())
        .with_timeout(Duration::from_secs(config.ocr_timeout_secs));
    Extractor::new(Arc::new(LopdfParser::new()), Arc::new(ocr))
}

#[async_trait]
impl DocumentApi for DocumentService {
    async fn process_upload(&self, document: UploadedDocument) -> UploadOutcome {
        let UploadedDocument {
            bytes,
            media_type,
            size_bytes,
            original_name,
        } = document;
        tracing::info!(
            file = original_name.as_deref().unwrap_or("<unnamed>"),
            media_type = %media_type,
            size_bytes,
            "Processing upload"
        );

        let extraction = match self.extractor.extract(bytes, &media_type).await {
            Ok(result) => Some(result),
            Err(error) => {
                tracing::error!(
                    file = original_name.as_deref().unwrap_or("<unnamed>"),
                    media_type = %media_type,
                    %error,
                    "Text extraction failed; accepting upload without extraction"
                );
                None
            }
        };
        self.metrics.record_upload(extraction.is_some());

        UploadOutcome {
            original_name,
            media_type,
            size_bytes,
            extraction,
        }
    }

    async fn summarize(
        &self,
        text: &str,
        length: SummaryLength,
    ) -> Result<SummaryResult, SummarizeError> {
        let outcome = self.summarizer.summarize(text, length).await;
        if !matches!(outcome, Err(SummarizeError::EmptyInput)) {
            self.metrics.record_summary(outcome.is_ok());
        }
        outcome
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::pdf::fixtures::pdf_with_pages;
    use crate::extraction::{MediaType, OcrEngine, OcrError, OcrSession};
    use crate::summarization::testing::RecordingClient;

    struct FixedOcr(&'static str);

    struct FixedSession(&'static str);

    #[async_trait]
    impl OcrEngine for FixedOcr {
        async fn open_session(&self) -> Result<Box<dyn OcrSession>, OcrError> {
            Ok(Box::new(FixedSession(self.0)))
        }
    }

    #[async_trait]
    impl OcrSession for FixedSession {
        async fn recognize(&mut self, _image: &[u8]) -> Result<String, OcrError> {
            Ok(self.0.to_string())
        }

        async fn terminate(self: Box<Self>) -> Result<(), OcrError> {
            Ok(())
        }
    }

    fn service(ocr_text: &'static str, client: Arc<RecordingClient>) -> DocumentService {
        DocumentService::new(
            Extractor::new(Arc::new(LopdfParser::new()), Arc::new(FixedOcr(ocr_text))),
            Summarizer::new(client),
        )
    }

    #[tokio::test]
    async fn text_layer_pdf_is_extracted() {
        let service = service("unused", Arc::new(RecordingClient::replying("unused")));
        let pdf = pdf_with_pages(&[Some("Board meeting minutes")], Some("Minutes"));

        let outcome = service
            .process_upload(UploadedDocument::new(
                Bytes::from(pdf),
                "application/pdf",
                Some("minutes.pdf".into()),
            ))
            .await;

        let extraction = outcome.extraction.expect("extraction result");
        assert!(!extraction.text.is_empty());
        assert!(extraction.text.contains("Board meeting minutes"));
        assert!(extraction.page_count.unwrap_or_default() >= 1);
        assert_eq!(outcome.original_name.as_deref(), Some("minutes.pdf"));
    }

    #[tokio::test]
    async fn scanned_pdf_is_accepted_with_empty_text() {
        let service = service("unused", Arc::new(RecordingClient::replying("unused")));
        let pdf = pdf_with_pages(&[None, None], None);

        let outcome = service
            .process_upload(UploadedDocument::new(Bytes::from(pdf), "application/pdf", None))
            .await;

        let extraction = outcome.extraction.expect("extraction result");
        assert_eq!(extraction.text, "");
        assert_eq!(extraction.page_count, Some(2));
    }

    #[tokio::test]
    async fn jpeg_is_recognized_by_ocr() {
        let service = service("Invoice #123", Arc::new(RecordingClient::replying("unused")));

        let outcome = service
            .process_upload(UploadedDocument::new(
                Bytes::from_static(&[0xFF, 0xD8, 0xFF, 0xE0]),
                "image/jpeg",
                Some("invoice.jpg".into()),
            ))
            .await;

        let extraction = outcome.extraction.expect("extraction result");
        assert_eq!(extraction.text, "Invoice #123");
        assert_eq!(extraction.source_media_type, MediaType::Jpeg);
        assert_eq!(extraction.page_count, None);
    }

    #[tokio::test]
    async fn corrupt_pdf_is_accepted_without_extraction() {
        let service = service("unused", Arc::new(RecordingClient::replying("unused")));

        let outcome = service
            .process_upload(UploadedDocument::new(
                Bytes::from_static(b"%PDF-1.4 truncated garbage"),
                "application/pdf",
                Some("broken.pdf".into()),
            ))
            .await;

        assert!(outcome.extraction.is_none());
        assert_eq!(outcome.size_bytes, 26);
        let snapshot = service.metrics_snapshot();
        assert_eq!(snapshot.uploads_accepted, 1);
        assert_eq!(snapshot.extractions_failed, 1);
    }

    #[tokio::test]
    async fn summary_failures_propagate_and_are_counted() {
        let service = service("unused", Arc::new(RecordingClient::failing("upstream 503")));

        let error = service
            .summarize("Some text", SummaryLength::Short)
            .await
            .expect_err("summary failure");

        assert!(matches!(error, SummarizeError::SummarizationFailed(_)));
        assert_eq!(service.metrics_snapshot().summaries_failed, 1);
    }

    #[tokio::test]
    async fn empty_summary_input_is_rejected_without_counting() {
        let client = Arc::new(RecordingClient::replying("unused"));
        let service = service("unused", client.clone());

        let error = service
            .summarize("   ", SummaryLength::Short)
            .await
            .expect_err("empty input");

        assert!(matches!(error, SummarizeError::EmptyInput));
        assert!(client.directives().is_empty());
        assert_eq!(service.metrics_snapshot(), MetricsSnapshot::default());
    }
}
