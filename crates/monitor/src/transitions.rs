//! Status-edge detection over the change feed.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use jobpulse_core::{Job, JobId, JobStatus};
use jobpulse_events::JobChange;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LedgerEntry {
    status: JobStatus,
    last_seen: DateTime<Utc>,
    /// When the job was first seen in a terminal status (cleared if it leaves it).
    terminal_since: Option<DateTime<Utc>>,
}

/// Last observed status per job.
///
/// Bounded two ways: [`prune`](Self::prune) drops jobs that have been terminal
/// for longer than a window, and a hard capacity evicts the least recently
/// observed entry.
#[derive(Debug, Clone)]
pub struct StatusLedger {
    entries: HashMap<JobId, LedgerEntry>,
    capacity: usize,
}

impl StatusLedger {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn get(&self, job_id: &JobId) -> Option<JobStatus> {
        self.entries.get(job_id).map(|e| e.status)
    }

    pub fn record(&mut self, job_id: &JobId, status: JobStatus, now: DateTime<Utc>) {
        if let Some(entry) = self.entries.get_mut(job_id) {
            entry.terminal_since = match (status.is_terminal(), entry.terminal_since) {
                (false, _) => None,
                (true, Some(since)) => Some(since),
                (true, None) => Some(now),
            };
            entry.status = status;
            entry.last_seen = now;
            return;
        }

        if self.entries.len() >= self.capacity {
            self.evict_oldest();
        }
        self.entries.insert(
            job_id.clone(),
            LedgerEntry {
                status,
                last_seen: now,
                terminal_since: status.is_terminal().then_some(now),
            },
        );
    }

    /// Forget jobs that have been terminal for longer than `window`.
    pub fn prune(&mut self, now: DateTime<Utc>, window: Duration) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, e| e.terminal_since.is_none_or(|since| now - since <= window));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.last_seen)
            .map(|(id, _)| id.clone());
        if let Some(id) = oldest {
            tracing::debug!(job_id = %id, "status ledger full; evicting least recently seen");
            self.entries.remove(&id);
        }
    }
}

/// Shape of a detected edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    /// The job did not exist before this change.
    Inserted,
    /// An existing job moved between two statuses.
    Changed,
}

/// A status edge handed to the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub kind: TransitionKind,
    /// `None` for inserts.
    pub old: Option<JobStatus>,
    pub new: JobStatus,
    pub job: Job,
}

impl Transition {
    pub fn job_id(&self) -> &JobId {
        &self.job.id
    }

    pub fn is_insert(&self) -> bool {
        self.kind == TransitionKind::Inserted
    }

    /// Landed on completed or failed (the statuses kept in the recently-completed list).
    pub fn is_finish(&self) -> bool {
        matches!(self.new, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Compares each change against the last observed status.
#[derive(Debug, Clone)]
pub struct TransitionDetector {
    ledger: StatusLedger,
}

impl TransitionDetector {
    pub fn new(capacity: usize) -> Self {
        Self {
            ledger: StatusLedger::new(capacity),
        }
    }

    pub fn prune(&mut self, now: DateTime<Utc>, window: Duration) -> usize {
        self.ledger.prune(now, window)
    }

    /// Record the change and return the edge it represents, if any.
    ///
    /// For updates the previous status comes from the ledger, else from the
    /// change's before-image; with neither there is no edge. The ledger never
    /// assumes terminal statuses are final.
    pub fn observe(&mut self, change: &JobChange, now: DateTime<Utc>) -> Option<Transition> {
        let job = &change.new;
        let previous = self.ledger.get(&job.id);
        self.ledger.record(&job.id, job.status, now);

        if change.is_insert() {
            return Some(Transition {
                kind: TransitionKind::Inserted,
                old: None,
                new: job.status,
                job: job.clone(),
            });
        }

        let old = previous.or_else(|| change.old_status())?;
        if old == job.status {
            return None;
        }

        tracing::debug!(job_id = %job.id, from = %old, to = %job.status, "status transition");
        Some(Transition {
            kind: TransitionKind::Changed,
            old: Some(old),
            new: job.status,
            job: job.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: &str, status: JobStatus) -> Job {
        Job::new("firmware_update").with_id(id).with_status(status)
    }

    fn update(old: Option<JobStatus>, new: JobStatus) -> JobChange {
        JobChange::update(old.map(|s| job("j", s)), job("j", new))
    }

    #[test]
    fn insert_is_always_an_edge_from_nothing() {
        let mut detector = TransitionDetector::new(16);
        let t = detector
            .observe(&JobChange::insert(job("j", JobStatus::Pending)), Utc::now())
            .unwrap();
        assert_eq!(t.kind, TransitionKind::Inserted);
        assert_eq!(t.old, None);
        assert_eq!(t.new, JobStatus::Pending);
    }

    #[test]
    fn first_sight_uses_before_image() {
        let mut detector = TransitionDetector::new(16);
        let t = detector
            .observe(&update(Some(JobStatus::Pending), JobStatus::Running), Utc::now())
            .unwrap();
        assert_eq!(t.old, Some(JobStatus::Pending));
        assert_eq!(t.new, JobStatus::Running);
    }

    #[test]
    fn first_sight_without_before_image_is_not_an_edge() {
        let mut detector = TransitionDetector::new(16);
        let now = Utc::now();
        assert!(detector.observe(&update(None, JobStatus::Running), now).is_none());

        // but it is remembered for the next change
        let t = detector.observe(&update(None, JobStatus::Completed), now).unwrap();
        assert_eq!(t.old, Some(JobStatus::Running));
    }

    #[test]
    fn ledger_beats_stale_before_image() {
        let mut detector = TransitionDetector::new(16);
        let now = Utc::now();
        detector.observe(&update(Some(JobStatus::Pending), JobStatus::Running), now);
        // redelivered with a stale before-image
        assert!(
            detector
                .observe(&update(Some(JobStatus::Pending), JobStatus::Running), now)
                .is_none()
        );
    }

    #[test]
    fn completed_back_to_running_is_an_edge() {
        let mut detector = TransitionDetector::new(16);
        let now = Utc::now();
        detector.observe(&update(Some(JobStatus::Running), JobStatus::Completed), now);
        let t = detector.observe(&update(None, JobStatus::Running), now).unwrap();
        assert_eq!(t.old, Some(JobStatus::Completed));
        assert_eq!(t.new, JobStatus::Running);
    }

    #[test]
    fn prune_drops_long_terminal_entries_only() {
        let mut ledger = StatusLedger::new(16);
        let t0 = Utc::now();
        ledger.record(&JobId::from("done"), JobStatus::Completed, t0);
        ledger.record(&JobId::from("busy"), JobStatus::Running, t0);

        assert_eq!(ledger.prune(t0 + Duration::seconds(10), Duration::seconds(15)), 0);
        assert_eq!(ledger.prune(t0 + Duration::seconds(16), Duration::seconds(15)), 1);
        assert_eq!(ledger.get(&JobId::from("done")), None);
        assert_eq!(ledger.get(&JobId::from("busy")), Some(JobStatus::Running));
    }

    #[test]
    fn leaving_terminal_clears_the_prune_clock() {
        let mut ledger = StatusLedger::new(16);
        let t0 = Utc::now();
        let id = JobId::from("j");
        ledger.record(&id, JobStatus::Failed, t0);
        ledger.record(&id, JobStatus::Running, t0 + Duration::seconds(1));
        assert_eq!(ledger.prune(t0 + Duration::seconds(60), Duration::seconds(15)), 0);
    }

    #[test]
    fn capacity_evicts_least_recently_seen() {
        let mut ledger = StatusLedger::new(2);
        let t0 = Utc::now();
        ledger.record(&JobId::from("a"), JobStatus::Running, t0);
        ledger.record(&JobId::from("b"), JobStatus::Running, t0 + Duration::seconds(1));
        ledger.record(&JobId::from("a"), JobStatus::Running, t0 + Duration::seconds(2));
        ledger.record(&JobId::from("c"), JobStatus::Running, t0 + Duration::seconds(3));

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.get(&JobId::from("b")), None);
        assert!(ledger.get(&JobId::from("a")).is_some());
        assert!(ledger.get(&JobId::from("c")).is_some());
    }
}
