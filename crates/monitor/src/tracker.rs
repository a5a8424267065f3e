//! The set of in-flight, operator-visible jobs.

use chrono::{DateTime, Utc};

use jobpulse_core::{Job, JobId};
use jobpulse_infra::{ActiveJobQuery, JobStore, JobStoreError};

/// Latest active-job list, replaced wholesale on every successful refresh.
#[derive(Debug, Default, Clone)]
pub struct ActiveJobTracker {
    jobs: Vec<Job>,
    last_updated: Option<DateTime<Utc>>,
}

impl ActiveJobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Query the store. Kept separate from [`apply`](Self::apply) so the
    /// query can run without holding the monitor lock.
    pub async fn fetch(
        store: &dyn JobStore,
        query: &ActiveJobQuery,
    ) -> Result<Vec<Job>, JobStoreError> {
        store.active_jobs(query).await
    }

    /// Replace the list with a fresh query result.
    ///
    /// On error the previous list is kept and `false` is returned.
    pub fn apply(&mut self, result: Result<Vec<Job>, JobStoreError>, now: DateTime<Utc>) -> bool {
        match result {
            Ok(jobs) => {
                tracing::debug!(count = jobs.len(), "active jobs refreshed");
                self.jobs = jobs;
                self.last_updated = Some(now);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "active job query failed; keeping previous list");
                false
            }
        }
    }

    /// Newest first, as returned by the store.
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn contains(&self, job_id: &JobId) -> bool {
        self.jobs.iter().any(|j| &j.id == job_id)
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// When the list was last replaced successfully.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }
}
