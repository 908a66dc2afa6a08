use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One item a batch job could not process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub id: Uuid,
    pub reason: String,
}

/// Summary record returned by every batch job.
///
/// A job that returns a summary completed; `failed > 0` means some items
/// were skipped, not that the job failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    pub job: String,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ItemFailure>,
}

impl JobSummary {
    #[must_use]
    pub fn new(job: impl Into<String>) -> Self {
        Self {
            job: job.into(),
            ..Self::default()
        }
    }

    pub fn record_success(&mut self) {
        self.processed += 1;
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self, id: Uuid, reason: impl Into<String>) {
        self.processed += 1;
        self.failed += 1;
        self.failures.push(ItemFailure {
            id,
            reason: reason.into(),
        });
    }

    /// Fold another summary's counts into this one.
    pub fn absorb(&mut self, other: JobSummary) {
        self.processed += other.processed;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.failures.extend(other.failures);
    }
}
