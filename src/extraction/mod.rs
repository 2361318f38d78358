//! Document-to-text extraction.
//!
//! The [`Extractor`] routes an uploaded byte buffer to the PDF parser or the OCR engine based on
//! the declared media type and normalizes both outputs into a single [`ExtractionResult`].
//! Errors are never swallowed here; deciding whether a failed extraction is fatal belongs to the
//! caller (see [`crate::service::DocumentService::process_upload`]).

pub mod ocr;
pub mod pdf;

use axum::body::Bytes;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub use ocr::{OcrEngine, OcrError, OcrSession, TesseractEngine, recognize_image};
pub use pdf::{LopdfParser, ParsedPdf, PdfParseError, PdfParser};

/// Media types accepted for extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    /// `application/pdf`
    Pdf,
    /// `image/jpeg`
    Jpeg,
    /// `image/png`
    Png,
}

impl MediaType {
    /// Every supported media type, in catalog order.
    pub const ALL: [MediaType; 3] = [MediaType::Pdf, MediaType::Jpeg, MediaType::Png];

    /// Parse a declared content type, ignoring case and parameters such as `; charset=...`.
    pub fn from_mime(value: &str) -> Result<Self, ExtractionError> {
        let essence = value.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "application/pdf" => Ok(Self::Pdf),
            "image/jpeg" => Ok(Self::Jpeg),
            "image/png" => Ok(Self::Png),
            _ => Err(ExtractionError::UnsupportedMediaType(value.to_string())),
        }
    }

    /// Canonical MIME string.
    pub fn as_mime(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    /// Whether the media type is handled by the PDF parser.
    pub fn is_pdf(&self) -> bool {
        matches!(self, Self::Pdf)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_mime())
    }
}

impl Serialize for MediaType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_mime())
    }
}

/// Text and metadata derived from one uploaded document.
///
/// Serializes as `{text, numPages, info}` for PDFs and `{text, mimetype}` for images.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionResult {
    /// Extracted plain text; empty for PDFs without a text layer.
    pub text: String,
    /// Number of pages (PDF only).
    #[serde(rename = "numPages", skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    /// Document information dictionary (PDF only).
    #[serde(rename = "info", skip_serializing_if = "Option::is_none")]
    pub document_info: Option<BTreeMap<String, String>>,
    /// Media type the text was extracted from.
    #[serde(rename = "mimetype", skip_serializing_if = "MediaType::is_pdf")]
    pub source_media_type: MediaType,
}

/// Underlying adapter failure carried by [`ExtractionError::ExtractionFailed`].
#[derive(Debug, Error)]
pub enum ExtractionFailure {
    /// The PDF parser rejected the buffer.
    #[error(transparent)]
    Pdf(#[from] PdfParseError),
    /// The OCR engine could not recognize the image.
    #[error(transparent)]
    Ocr(#[from] OcrError),
}

/// Errors produced by [`Extractor::extract`].
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Declared content type is not one of the supported media types.
    #[error("Unsupported file type: {0}")]
    UnsupportedMediaType(String),
    /// The selected adapter failed.
    #[error("Text extraction failed: {0}")]
    ExtractionFailed(#[source] ExtractionFailure),
}

impl From<PdfParseError> for ExtractionError {
    fn from(error: PdfParseError) -> Self {
        Self::ExtractionFailed(error.into())
    }
}

impl From<OcrError> for ExtractionError {
    fn from(error: OcrError) -> Self {
        Self::ExtractionFailed(error.into())
    }
}

/// Routes documents to the adapter matching their media type.
#[derive(Clone)]
pub struct Extractor {
    pdf: Arc<dyn PdfParser>,
    ocr: Arc<dyn OcrEngine>,
}

impl Extractor {
    /// Build a dispatcher over explicit adapters.
    pub fn new(pdf: Arc<dyn PdfParser>, ocr: Arc<dyn OcrEngine>) -> Self {
        Self { pdf, ocr }
    }

    /// Extract text from `buffer`, interpreting it according to `media_type`.
    pub async fn extract(
        &self,
        buffer: Bytes,
        media_type: &str,
    ) -> Result<ExtractionResult, ExtractionError> {
        let media_type = MediaType::from_mime(media_type)?;
        self.extract_as(buffer, media_type).await
    }

    /// Extract text from `buffer` for an already validated media type.
    pub async fn extract_as(
        &self,
        buffer: Bytes,
        media_type: MediaType,
    ) -> Result<ExtractionResult, ExtractionError> {
        tracing::debug!(media_type = %media_type, bytes = buffer.len(), "Extracting text");
        let result = match media_type {
            MediaType::Pdf => {
                let ParsedPdf {
                    text,
                    page_count,
                    info,
                } = self.pdf.parse(buffer).await?;
                ExtractionResult {
                    text,
                    page_count: Some(page_count),
                    document_info: Some(info),
                    source_media_type: media_type,
                }
            }
            MediaType::Jpeg | MediaType::Png => {
                let text = recognize_image(self.ocr.as_ref(), &buffer, media_type).await?;
                ExtractionResult {
                    text,
                    page_count: None,
                    document_info: None,
                    source_media_type: media_type,
                }
            }
        };
        tracing::debug!(
            media_type = %media_type,
            chars = result.text.chars().count(),
            pages = ?result.page_count,
            "Extraction completed"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct StubPdf {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl PdfParser for StubPdf {
        async fn parse(&self, _buffer: Bytes) -> Result<ParsedPdf, PdfParseError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(PdfParseError::Malformed("bad xref".into()));
            }
            Ok(ParsedPdf {
                text: "Quarterly report".into(),
                page_count: 3,
                info: BTreeMap::from([("Title".to_string(), "Q3".to_string())]),
            })
        }
    }

    struct StubOcr {
        sessions: AtomicUsize,
        reply: Result<&'static str, &'static str>,
    }

    impl StubOcr {
        fn replying(text: &'static str) -> Self {
            Self {
                sessions: AtomicUsize::new(0),
                reply: Ok(text),
            }
        }
    }

    struct StubSession(Result<&'static str, &'static str>);

    #[async_trait]
    impl OcrEngine for StubOcr {
        async fn open_session(&self) -> Result<Box<dyn OcrSession>, OcrError> {
            self.sessions.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(StubSession(self.reply)))
        }
    }

    #[async_trait]
    impl OcrSession for StubSession {
        async fn recognize(&mut self, _image: &[u8]) -> Result<String, OcrError> {
            self.0
                .map(str::to_string)
                .map_err(|message| OcrError::Engine(message.to_string()))
        }

        async fn terminate(self: Box<Self>) -> Result<(), OcrError> {
            Ok(())
        }
    }

    fn extractor(pdf: &Arc<StubPdf>, ocr: &Arc<StubOcr>) -> Extractor {
        Extractor::new(pdf.clone(), ocr.clone())
    }

    #[test]
    fn media_type_parsing_ignores_case_and_parameters() {
        assert_eq!(MediaType::from_mime("application/pdf").unwrap(), MediaType::Pdf);
        assert_eq!(MediaType::from_mime("IMAGE/JPEG").unwrap(), MediaType::Jpeg);
        assert_eq!(
            MediaType::from_mime("image/png; charset=binary").unwrap(),
            MediaType::Png
        );
        assert!(matches!(
            MediaType::from_mime("image/gif"),
            Err(ExtractionError::UnsupportedMediaType(value)) if value == "image/gif"
        ));
    }

    #[tokio::test]
    async fn pdf_routes_to_parser_with_page_metadata() {
        let pdf = Arc::new(StubPdf::default());
        let ocr = Arc::new(StubOcr::replying("unused"));

        let result = extractor(&pdf, &ocr)
            .extract(Bytes::from_static(b"%PDF-1.5"), "application/pdf")
            .await
            .expect("pdf extraction");

        assert_eq!(result.text, "Quarterly report");
        assert_eq!(result.page_count, Some(3));
        assert_eq!(result.source_media_type, MediaType::Pdf);
        assert_eq!(pdf.calls.load(Ordering::SeqCst), 1);
        assert_eq!(ocr.sessions.load(Ordering::SeqCst), 0);

        let json = serde_json::to_value(&result).expect("serialize");
        assert_eq!(
            json,
            json!({"text": "Quarterly report", "numPages": 3, "info": {"Title": "Q3"}})
        );
    }

    #[tokio::test]
    async fn images_route_to_ocr_without_page_metadata() {
        for media_type in [MediaType::Jpeg, MediaType::Png] {
            let pdf = Arc::new(StubPdf::default());
            let ocr = Arc::new(StubOcr::replying("Invoice #123"));

            let result = extractor(&pdf, &ocr)
                .extract(Bytes::from_static(&[0xFF, 0xD8, 0xFF]), media_type.as_mime())
                .await
                .expect("ocr extraction");

            assert_eq!(
                result,
                ExtractionResult {
                    text: "Invoice #123".into(),
                    page_count: None,
                    document_info: None,
                    source_media_type: media_type,
                }
            );
            assert_eq!(pdf.calls.load(Ordering::SeqCst), 0);
            assert_eq!(ocr.sessions.load(Ordering::SeqCst), 1);

            let json = serde_json::to_value(&result).expect("serialize");
            assert_eq!(
                json,
                json!({"text": "Invoice #123", "mimetype": media_type.as_mime()})
            );
        }
    }

    #[tokio::test]
    async fn unsupported_media_type_invokes_no_adapter() {
        let pdf = Arc::new(StubPdf::default());
        let ocr = Arc::new(StubOcr::replying("unused"));

        let error = extractor(&pdf, &ocr)
            .extract(Bytes::from_static(b"GIF89a"), "image/gif")
            .await
            .expect_err("gif rejected");

        assert!(matches!(error, ExtractionError::UnsupportedMediaType(_)));
        assert_eq!(pdf.calls.load(Ordering::SeqCst), 0);
        assert_eq!(ocr.sessions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn adapter_failures_propagate_with_their_cause() {
        let pdf = Arc::new(StubPdf {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let ocr = Arc::new(StubOcr {
            sessions: AtomicUsize::new(0),
            reply: Err("image too blurry"),
        });
        let extractor = extractor(&pdf, &ocr);

        let pdf_error = extractor
            .extract(Bytes::from_static(b"garbage"), "application/pdf")
            .await
            .expect_err("pdf failure");
        assert!(matches!(
            pdf_error,
            ExtractionError::ExtractionFailed(ExtractionFailure::Pdf(_))
        ));

        let ocr_error = extractor
            .extract(Bytes::from_static(b"\x89PNG"), "image/png")
            .await
            .expect_err("ocr failure");
        assert!(ocr_error.to_string().contains("image too blurry"));
    }
}
