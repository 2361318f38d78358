use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing request activity.
#[derive(Default)]
pub struct ServiceMetrics {
    uploads_accepted: AtomicU64,
    extractions_succeeded: AtomicU64,
    extractions_failed: AtomicU64,
    summaries_generated: AtomicU64,
    summaries_failed: AtomicU64,
}

impl ServiceMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted upload and whether text extraction succeeded for it.
    pub fn record_upload(&self, extracted: bool) {
        self.uploads_accepted.fetch_add(1, Ordering::Relaxed);
        if extracted {
            self.extractions_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.extractions_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record the outcome of a summarization request.
    pub fn record_summary(&self, succeeded: bool) {
        let counter = if succeeded {
            &self.summaries_generated
        } else {
            &self.summaries_failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uploads_accepted: self.uploads_accepted.load(Ordering::Relaxed),
            extractions_succeeded: self.extractions_succeeded.load(Ordering::Relaxed),
            extractions_failed: self.extractions_failed.load(Ordering::Relaxed),
            summaries_generated: self.summaries_generated.load(Ordering::Relaxed),
            summaries_failed: self.summaries_failed.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of request counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// Uploads accepted since startup, regardless of extraction outcome.
    pub uploads_accepted: u64,
    /// Uploads whose text extraction produced a result.
    pub extractions_succeeded: u64,
    /// Uploads accepted without an extraction result.
    pub extractions_failed: u64,
    /// Summaries returned to callers.
    pub summaries_generated: u64,
    /// Summarization requests that ended in an error.
    pub summaries_failed: u64,
}
