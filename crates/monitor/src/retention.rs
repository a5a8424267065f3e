//! Short-lived list of jobs that just finished.

use chrono::{DateTime, Duration, Utc};

use jobpulse_core::Job;

#[derive(Debug, Clone)]
struct Entry {
    job: Job,
    completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct RecentlyCompleted {
    /// Newest first.
    entries: Vec<Entry>,
    window: Duration,
}

impl RecentlyCompleted {
    pub fn new(window: Duration) -> Self {
        Self {
            entries: Vec::new(),
            window,
        }
    }

    /// Add a finished job. Re-adding a job already in the list is a no-op.
    pub fn add(&mut self, job: Job, now: DateTime<Utc>) {
        if self.entries.iter().any(|e| e.job.id == job.id) {
            return;
        }
        self.entries.insert(0, Entry { job, completed_at: now });
    }

    /// Evict entries older than the window; returns how many went.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        let window = self.window;
        self.entries.retain(|e| now - e.completed_at <= window);
        before - self.entries.len()
    }

    /// Newest first.
    pub fn jobs(&self) -> Vec<Job> {
        self.entries.iter().map(|e| e.job.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobpulse_core::JobStatus;

    fn done(id: &str) -> Job {
        Job::new("firmware_update").with_id(id).with_status(JobStatus::Completed)
    }

    #[test]
    fn entries_expire_after_the_window() {
        let mut recent = RecentlyCompleted::new(Duration::seconds(15));
        let t0 = Utc::now();
        recent.add(done("j"), t0);

        recent.sweep(t0 + Duration::seconds(14));
        assert_eq!(recent.len(), 1);

        assert_eq!(recent.sweep(t0 + Duration::seconds(16)), 1);
        assert!(recent.is_empty());
    }

    #[test]
    fn add_is_idempotent_and_newest_first() {
        let mut recent = RecentlyCompleted::new(Duration::seconds(15));
        let t0 = Utc::now();
        recent.add(done("a"), t0);
        recent.add(done("b"), t0 + Duration::seconds(1));
        recent.add(done("a"), t0 + Duration::seconds(2));

        let ids: Vec<_> = recent.jobs().into_iter().map(|j| j.id.to_string()).collect();
        assert_eq!(ids, ["b", "a"]);

        // the original timestamp is kept
        recent.sweep(t0 + Duration::seconds(15) + Duration::milliseconds(500));
        assert_eq!(recent.len(), 1);
    }
}
