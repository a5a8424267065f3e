use serde::{Deserialize, Serialize};

use jobpulse_core::{Job, JobId, JobStatus};

/// Row-level operation that produced a change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
}

/// One change-feed delta for the job table.
///
/// Notes:
/// - `old` is the before-image; the store may omit it (always `None` for inserts).
/// - Delivery is at-least-once: the same logical change can arrive twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobChange {
    #[serde(rename = "eventType")]
    pub kind: ChangeKind,
    #[serde(default)]
    pub old: Option<Job>,
    pub new: Job,
}

impl JobChange {
    pub fn insert(job: Job) -> Self {
        Self {
            kind: ChangeKind::Insert,
            old: None,
            new: job,
        }
    }

    pub fn update(old: Option<Job>, new: Job) -> Self {
        Self {
            kind: ChangeKind::Update,
            old,
            new,
        }
    }

    pub fn job_id(&self) -> &JobId {
        &self.new.id
    }

    pub fn is_insert(&self) -> bool {
        self.kind == ChangeKind::Insert
    }

    /// Status from the before-image, if the store sent one.
    pub fn old_status(&self) -> Option<JobStatus> {
        self.old.as_ref().map(|job| job.status)
    }
}
