//! Optical character recognition for raster images.
//!
//! Engines hand out single-use [`OcrSession`]s. [`recognize_image`] owns the session lifecycle:
//! open, recognize once, terminate, with termination running on every exit path. The Tesseract
//! implementation backs each session with its own `tesseract` child process, which is also killed
//! when the session is dropped so a cancelled request cannot leave it running.

use super::MediaType;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};

/// Recognition language model used by every session.
pub const OCR_LANGUAGE: &str = "eng";

/// Errors raised by OCR engines and sessions.
#[derive(Debug, Error)]
pub enum OcrError {
    /// No image bytes were supplied.
    #[error("No image provided for OCR processing")]
    EmptyImage,
    /// The engine could not be started.
    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),
    /// The engine reported a processing failure.
    #[error("OCR processing failed: {0}")]
    Engine(String),
    /// Recognition did not finish within the configured bound.
    #[error("OCR processing timed out after {0:?}")]
    Timeout(Duration),
}

/// A single-use recognition session.
#[async_trait]
pub trait OcrSession: Send {
    /// Recognize the text contained in `image`.
    async fn recognize(&mut self, image: &[u8]) -> Result<String, OcrError>;

    /// Release the engine resources held by the session.
    async fn terminate(self: Box<Self>) -> Result<(), OcrError>;
}

/// Factory for [`OcrSession`]s.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Acquire a fresh session. Sessions are never shared between recognitions.
    async fn open_session(&self) -> Result<Box<dyn OcrSession>, OcrError>;

    /// Upper bound applied to one recognition, if any.
    fn recognition_timeout(&self) -> Option<Duration> {
        None
    }
}

/// Recognize the text in an image using a session scoped to this call.
pub async fn recognize_image(
    engine: &dyn OcrEngine,
    image: &[u8],
    media_type: MediaType,
) -> Result<String, OcrError> {
    if image.is_empty() {
        return Err(OcrError::EmptyImage);
    }

    let mut session = engine.open_session().await?;
    let outcome = match engine.recognition_timeout() {
        Some(limit) => match tokio::time::timeout(limit, session.recognize(image)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(OcrError::Timeout(limit)),
        },
        None => session.recognize(image).await,
    };

    if let Err(error) = session.terminate().await {
        tracing::warn!(%error, media_type = %media_type, "Failed to terminate OCR session");
    }

    match &outcome {
        Ok(text) => tracing::debug!(
            media_type = %media_type,
            chars = text.chars().count(),
            "OCR recognition completed"
        ),
        Err(error) => tracing::error!(%error, media_type = %media_type, "OCR recognition failed"),
    }
    outcome
}

/// [`OcrEngine`] driving the Tesseract command-line tool.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    command: String,
    timeout: Option<Duration>,
}

impl TesseractEngine {
    /// Create an engine invoking `command` (usually `tesseract`).
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            timeout: None,
        }
    }

    /// Bound each recognition by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    async fn open_session(&self) -> Result<Box<dyn OcrSession>, OcrError> {
        let child = Command::new(&self.command)
            .args(["stdin", "stdout", "-l", OCR_LANGUAGE])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|error| {
                OcrError::EngineUnavailable(format!("failed to start {}: {error}", self.command))
            })?;
        tracing::debug!(command = %self.command, pid = ?child.id(), "OCR session opened");
        Ok(Box::new(TesseractSession { child: Some(child) }))
    }

    fn recognition_timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

struct TesseractSession {
    child: Option<Child>,
}

#[async_trait]
impl OcrSession for TesseractSession {
    async fn recognize(&mut self, image: &[u8]) -> Result<String, OcrError> {
        let mut child = self
            .child
            .take()
            .ok_or_else(|| OcrError::Engine("session already used".into()))?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| OcrError::Engine("engine stdin unavailable".into()))?;

        let feed = async move {
            stdin.write_all(image).await?;
            stdin.shutdown().await
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());

        let output = output.map_err(|error| OcrError::Engine(error.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Engine(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        if let Err(error) = fed {
            return Err(OcrError::Engine(format!("failed to send image: {error}")));
        }

        Ok(clean_ocr_text(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn terminate(mut self: Box<Self>) -> Result<(), OcrError> {
        if let Some(mut child) = self.child.take() {
            child
                .kill()
                .await
                .map_err(|error| OcrError::Engine(format!("failed to stop engine: {error}")))?;
        }
        Ok(())
    }
}

/// Strip form-feed page separators and trailing whitespace emitted by the engine.
fn clean_ocr_text(raw: &str) -> String {
    raw.replace('\x0c', "").trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Ledger {
        opened: AtomicUsize,
        terminated: AtomicUsize,
    }

    enum Behavior {
        Reply(&'static str),
        Fail(&'static str),
        Hang,
    }

    struct ScriptedEngine {
        ledger: Arc<Ledger>,
        behavior: fn() -> Behavior,
        timeout: Option<Duration>,
    }

    struct ScriptedSession {
        ledger: Arc<Ledger>,
        behavior: Behavior,
    }

    #[async_trait]
    impl OcrEngine for ScriptedEngine {
        async fn open_session(&self) -> Result<Box<dyn OcrSession>, OcrError> {
            self.ledger.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ScriptedSession {
                ledger: self.ledger.clone(),
                behavior: (self.behavior)(),
            }))
        }

        fn recognition_timeout(&self) -> Option<Duration> {
            self.timeout
        }
    }

    #[async_trait]
    impl OcrSession for ScriptedSession {
        async fn recognize(&mut self, _image: &[u8]) -> Result<String, OcrError> {
            match self.behavior {
                Behavior::Reply(text) => Ok(text.to_string()),
                Behavior::Fail(message) => Err(OcrError::Engine(message.to_string())),
                Behavior::Hang => {
                    std::future::pending::<()>().await;
                    unreachable!()
                }
            }
        }

        async fn terminate(self: Box<Self>) -> Result<(), OcrError> {
            self.ledger.terminated.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn engine(behavior: fn() -> Behavior, timeout: Option<Duration>) -> (ScriptedEngine, Arc<Ledger>) {
        let ledger = Arc::new(Ledger::default());
        (
            ScriptedEngine {
                ledger: ledger.clone(),
                behavior,
                timeout,
            },
            ledger,
        )
    }

    #[tokio::test]
    async fn session_is_released_after_success() {
        let (engine, ledger) = engine(|| Behavior::Reply("Invoice #123"), None);

        let text = recognize_image(&engine, b"image", MediaType::Jpeg)
            .await
            .expect("recognized");

        assert_eq!(text, "Invoice #123");
        assert_eq!(ledger.opened.load(Ordering::SeqCst), 1);
        assert_eq!(ledger.terminated.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn session_is_released_after_engine_failure() {
        let (engine, ledger) = engine(|| Behavior::Fail("unreadable image"), None);

        let error = recognize_image(&engine, b"image", MediaType::Png)
            .await
            .expect_err("engine failure");

        assert!(matches!(&error, OcrError::Engine(message) if message == "unreadable image"));
        assert!(error.to_string().contains("unreadable image"));
        assert_eq!(ledger.terminated.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn session_is_released_after_timeout() {
        let (engine, ledger) = engine(|| Behavior::Hang, Some(Duration::from_millis(20)));

        let error = recognize_image(&engine, b"image", MediaType::Png)
            .await
            .expect_err("timeout");

        assert!(matches!(error, OcrError::Timeout(_)));
        assert_eq!(ledger.opened.load(Ordering::SeqCst), 1);
        assert_eq!(ledger.terminated.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_image_opens_no_session() {
        let (engine, ledger) = engine(|| Behavior::Reply("unused"), None);

        let error = recognize_image(&engine, b"", MediaType::Jpeg)
            .await
            .expect_err("empty image");

        assert!(matches!(error, OcrError::EmptyImage));
        assert_eq!(ledger.opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_engine_binary_is_reported_as_unavailable() {
        let engine = TesseractEngine::new("docsum-no-such-ocr-binary");

        let error = recognize_image(&engine, b"image", MediaType::Png)
            .await
            .expect_err("spawn failure");

        assert!(matches!(error, OcrError::EngineUnavailable(_)));
    }

    #[test]
    fn strips_page_separators() {
        assert_eq!(clean_ocr_text("Invoice #123\n\x0c"), "Invoice #123");
    }
}
