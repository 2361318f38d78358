//! PDF text extraction backed by `pdf-extract`, with `lopdf` for page counts and metadata.

use async_trait::async_trait;
use axum::body::Bytes;
use lopdf::{Dictionary, Document, Object};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised while parsing a PDF buffer.
#[derive(Debug, Error)]
pub enum PdfParseError {
    /// No bytes were supplied.
    #[error("Failed to extract text from PDF: empty buffer")]
    EmptyBuffer,
    /// The buffer is not a well-formed PDF stream.
    #[error("Failed to extract text from PDF: {0}")]
    Malformed(String),
    /// The blocking parse task did not complete.
    #[error("PDF parsing task aborted: {0}")]
    TaskFailed(String),
}

/// Output of a successful PDF parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPdf {
    /// Text layer of every page, in page order.
    pub text: String,
    /// Number of pages in the document.
    pub page_count: u32,
    /// Entries of the trailer `/Info` dictionary plus the format version.
    pub info: BTreeMap<String, String>,
}

/// Interface implemented by PDF parsing backends.
#[async_trait]
pub trait PdfParser: Send + Sync {
    /// Parse `buffer` and return its text layer and document metadata.
    async fn parse(&self, buffer: Bytes) -> Result<ParsedPdf, PdfParseError>;
}

/// [`PdfParser`] running `lopdf` on the blocking thread pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfParser;

impl LopdfParser {
    /// Construct the parser.
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PdfParser for LopdfParser {
    async fn parse(&self, buffer: Bytes) -> Result<ParsedPdf, PdfParseError> {
        if buffer.is_empty() {
            return Err(PdfParseError::EmptyBuffer);
        }
        tokio::task::spawn_blocking(move || parse_pdf(&buffer))
            .await
            .map_err(|error| PdfParseError::TaskFailed(error.to_string()))?
    }
}

/// Parse a PDF held in memory.
///
/// A document without a text layer (for example a scan) yields empty text rather than an error.
pub fn parse_pdf(buffer: &[u8]) -> Result<ParsedPdf, PdfParseError> {
    if buffer.is_empty() {
        return Err(PdfParseError::EmptyBuffer);
    }
    let document =
        Document::load_mem(buffer).map_err(|error| PdfParseError::Malformed(error.to_string()))?;

    let pages = document.get_pages();
    let page_count = u32::try_from(pages.len()).unwrap_or(u32::MAX);
    let page_numbers: Vec<u32> = pages.keys().copied().collect();

    let text = if page_numbers.is_empty() {
        String::new()
    } else {
        extract_text(buffer, &document, &page_numbers)
    };

    Ok(ParsedPdf {
        text: text.trim().to_string(),
        page_count,
        info: document_info(&document),
    })
}

/// Extract the text layer with `pdf-extract`, which resolves fonts through inherited and inline
/// resource dictionaries. Falls back to lopdf page by page when `pdf-extract` rejects the
/// document, so one broken content stream does not discard the rest.
fn extract_text(buffer: &[u8], document: &Document, page_numbers: &[u32]) -> String {
    let extracted = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(buffer));
    match extracted {
        Ok(Ok(text)) => text,
        Ok(Err(error)) => {
            tracing::debug!(%error, "pdf-extract failed; retrying per page with lopdf");
            extract_pages(document, page_numbers)
        }
        Err(_) => {
            tracing::warn!("pdf-extract panicked; retrying per page with lopdf");
            extract_pages(document, page_numbers)
        }
    }
}

fn extract_pages(document: &Document, page_numbers: &[u32]) -> String {
    let mut out = String::new();
    for number in page_numbers {
        match document.extract_text(&[*number]) {
            Ok(text) => {
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str(&text);
            }
            Err(error) => {
                tracing::debug!(page = number, %error, "Skipping page without readable text");
            }
        }
    }
    out
}

fn document_info(document: &Document) -> BTreeMap<String, String> {
    let mut info = BTreeMap::new();
    info.insert("PDFFormatVersion".to_string(), document.version.clone());

    let dictionary: Option<&Dictionary> = match document.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => document.get_dictionary(*id).ok(),
        Ok(Object::Dictionary(dictionary)) => Some(dictionary),
        _ => None,
    };

    if let Some(dictionary) = dictionary {
        for (key, value) in dictionary.iter() {
            if let Some(value) = object_to_string(document, value) {
                info.insert(String::from_utf8_lossy(key).into_owned(), value);
            }
        }
    }
    info
}

fn object_to_string(document: &Document, object: &Object) -> Option<String> {
    match object {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        Object::Integer(value) => Some(value.to_string()),
        Object::Real(value) => Some(value.to_string()),
        Object::Boolean(value) => Some(value.to_string()),
        Object::Reference(id) => document
            .get_object(*id)
            .ok()
            .filter(|target| !matches!(target, Object::Reference(_)))
            .and_then(|target| object_to_string(document, target)),
        _ => None,
    }
}

/// Decode a PDF text string: UTF-16BE or UTF-8 when prefixed with a byte order mark, otherwise
/// PDFDocEncoding.
fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    bytes.iter().map(|&byte| pdf_doc_char(byte)).collect()
}

/// PDFDocEncoding differs from Latin-1 in the 0x18..=0x1F and 0x80..=0xA0 ranges.
fn pdf_doc_char(byte: u8) -> char {
    const DIACRITICS: [char; 8] = [
        '\u{02D8}', '\u{02C7}', '\u{02C6}', '\u{02D9}', '\u{02DD}', '\u{02DB}', '\u{02DA}', '\u{02DC}',
    ];
    const PUNCTUATION: [char; 32] = [
        '\u{2022}', '\u{2020}', '\u{2021}', '\u{2026}', '\u{2014}', '\u{2013}', '\u{0192}', '\u{2044}',
        '\u{2039}', '\u{203A}', '\u{2212}', '\u{2030}', '\u{201E}', '\u{201C}', '\u{201D}', '\u{2018}',
        '\u{2019}', '\u{201A}', '\u{2122}', '\u{FB01}', '\u{FB02}', '\u{0141}', '\u{0152}', '\u{0160}',
        '\u{0178}', '\u{017D}', '\u{0131}', '\u{0142}', '\u{0153}', '\u{0161}', '\u{017E}', '\u{FFFD}',
    ];
    match byte {
        0x18..=0x1F => DIACRITICS[usize::from(byte - 0x18)],
        0x80..=0x9F => PUNCTUATION[usize::from(byte - 0x80)],
        0xA0 => '\u{20AC}',
        0xAD => '\u{FFFD}',
        _ => char::from(byte),
    }
}
