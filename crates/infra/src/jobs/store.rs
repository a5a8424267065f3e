//! Job store abstraction.

use std::collections::BTreeSet;

use async_trait::async_trait;

use jobpulse_core::{CommandRecord, Job, JobId, JobTask, WorkflowStep};

/// Filter for the "active jobs" query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveJobQuery {
    /// Job types that never show up in the active list.
    pub excluded_job_types: BTreeSet<String>,
    /// Optional cap on the number of rows returned.
    pub limit: Option<usize>,
}

impl ActiveJobQuery {
    pub fn excluding<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            excluded_job_types: types.into_iter().map(Into::into).collect(),
            limit: None,
        }
    }

    /// Pending/running and not excluded.
    pub fn matches(&self, job: &Job) -> bool {
        job.status.is_active() && !self.excluded_job_types.contains(&job.job_type)
    }
}

/// Query surface of the job store.
///
/// Implementations must not filter beyond what is asked: the monitor relies on
/// `active_jobs` being a complete snapshot of the active set.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Active jobs matching `query`, newest first.
    async fn active_jobs(&self, query: &ActiveJobQuery) -> Result<Vec<Job>, JobStoreError>;

    /// All tasks of a job.
    async fn tasks_for(&self, job_id: &JobId) -> Result<Vec<JobTask>, JobStoreError>;

    /// Workflow steps of a job, ordered by step number.
    async fn workflow_steps_for(&self, job_id: &JobId)
    -> Result<Vec<WorkflowStep>, JobStoreError>;

    /// Most recent executor commands, newest first.
    async fn recent_commands(&self, limit: usize) -> Result<Vec<CommandRecord>, JobStoreError>;
}

/// Job store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum JobStoreError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("job already exists: {0}")]
    AlreadyExists(JobId),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("storage error: {0}")]
    Storage(String),
}
