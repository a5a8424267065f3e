//! In-memory job store for tests/dev.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use jobpulse_core::{CommandRecord, Job, JobId, JobTask, WorkflowStep};
use jobpulse_events::{ChangeFeed, InMemoryChangeFeed, JobChange};

use super::store::{ActiveJobQuery, JobStore, JobStoreError};

/// In-memory job store.
///
/// Writes go through the inherent methods (`insert`, `update`, ...) and are
/// published on the attached change feed, the same way the real store's
/// replication stream would.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
    tasks: RwLock<HashMap<JobId, Vec<JobTask>>>,
    steps: RwLock<HashMap<JobId, Vec<WorkflowStep>>>,
    commands: RwLock<Vec<CommandRecord>>,
    feed: Option<Arc<InMemoryChangeFeed<JobChange>>>,
    unavailable: AtomicBool,
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, JobStoreError> {
    lock.read()
        .map_err(|_| JobStoreError::Storage("lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, JobStoreError> {
    lock.write()
        .map_err(|_| JobStoreError::Storage("lock poisoned".to_string()))
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that publishes every write on `feed`.
    pub fn with_feed(feed: Arc<InMemoryChangeFeed<JobChange>>) -> Self {
        Self {
            feed: Some(feed),
            ..Self::default()
        }
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Simulate an outage: every query fails until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), JobStoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(JobStoreError::Unavailable("simulated outage".to_string()));
        }
        Ok(())
    }

    fn emit(&self, change: JobChange) {
        if let Some(feed) = &self.feed
            && let Err(e) = feed.publish(change)
        {
            tracing::warn!(error = ?e, "failed to publish job change");
        }
    }

    /// Insert a new job and publish an insert event.
    pub fn insert(&self, job: Job) -> Result<JobId, JobStoreError> {
        let id = job.id.clone();
        {
            let mut jobs = write(&self.jobs)?;
            if jobs.contains_key(&id) {
                return Err(JobStoreError::AlreadyExists(id));
            }
            jobs.insert(id.clone(), job.clone());
        }
        self.emit(JobChange::insert(job));
        Ok(id)
    }

    /// Replace a job row and publish an update event with the before-image.
    pub fn update(&self, job: Job) -> Result<(), JobStoreError> {
        let old = {
            let mut jobs = write(&self.jobs)?;
            if !jobs.contains_key(&job.id) {
                return Err(JobStoreError::NotFound(job.id));
            }
            jobs.insert(job.id.clone(), job.clone())
        };
        self.emit(JobChange::update(old, job));
        Ok(())
    }

    /// Apply `f` to a stored job and publish the result.
    pub fn modify<F>(&self, job_id: &JobId, f: F) -> Result<Job, JobStoreError>
    where
        F: FnOnce(&mut Job),
    {
        let mut job = self
            .get(job_id)?
            .ok_or_else(|| JobStoreError::NotFound(job_id.clone()))?;
        f(&mut job);
        self.update(job.clone())?;
        Ok(job)
    }

    pub fn get(&self, job_id: &JobId) -> Result<Option<Job>, JobStoreError> {
        Ok(read(&self.jobs)?.get(job_id).cloned())
    }

    pub fn set_tasks(&self, job_id: &JobId, tasks: Vec<JobTask>) -> Result<(), JobStoreError> {
        write(&self.tasks)?.insert(job_id.clone(), tasks);
        Ok(())
    }

    pub fn set_workflow_steps(
        &self,
        job_id: &JobId,
        mut steps: Vec<WorkflowStep>,
    ) -> Result<(), JobStoreError> {
        steps.sort_by_key(|s| s.step_number);
        write(&self.steps)?.insert(job_id.clone(), steps);
        Ok(())
    }

    pub fn record_command(&self, command: CommandRecord) -> Result<(), JobStoreError> {
        write(&self.commands)?.push(command);
        Ok(())
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn active_jobs(&self, query: &ActiveJobQuery) -> Result<Vec<Job>, JobStoreError> {
        self.check_available()?;
        let jobs = read(&self.jobs)?;
        let mut result: Vec<_> = jobs.values().filter(|j| query.matches(j)).cloned().collect();

        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = query.limit {
            result.truncate(limit);
        }
        Ok(result)
    }

    async fn tasks_for(&self, job_id: &JobId) -> Result<Vec<JobTask>, JobStoreError> {
        self.check_available()?;
        Ok(read(&self.tasks)?.get(job_id).cloned().unwrap_or_default())
    }

    async fn workflow_steps_for(
        &self,
        job_id: &JobId,
    ) -> Result<Vec<WorkflowStep>, JobStoreError> {
        self.check_available()?;
        Ok(read(&self.steps)?.get(job_id).cloned().unwrap_or_default())
    }

    async fn recent_commands(&self, limit: usize) -> Result<Vec<CommandRecord>, JobStoreError> {
        self.check_available()?;
        let commands = read(&self.commands)?;
        let mut result = commands.clone();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        result.truncate(limit);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jobpulse_core::{JobStatus, StepStatus};
    use jobpulse_events::ChangeKind;

    #[tokio::test]
    async fn active_jobs_are_newest_first_and_filtered() {
        let store = InMemoryJobStore::new();
        let now = Utc::now();
        store
            .insert(Job::new("firmware_update").with_id("old").created_at(now - Duration::minutes(5)))
            .unwrap();
        store.insert(Job::new("firmware_update").with_id("new").created_at(now)).unwrap();
        store.insert(Job::new("executor_heartbeat").with_id("hidden")).unwrap();
        store
            .insert(Job::new("firmware_update").with_id("done").with_status(JobStatus::Completed))
            .unwrap();

        let jobs = store
            .active_jobs(&ActiveJobQuery::excluding(["executor_heartbeat"]))
            .await
            .unwrap();
        let ids: Vec<_> = jobs.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[tokio::test]
    async fn writes_are_published_with_before_image() {
        let feed = Arc::new(InMemoryChangeFeed::new());
        let store = InMemoryJobStore::with_feed(feed.clone());
        let mut sub = feed.subscribe();

        let id = store.insert(Job::new("vcenter_sync")).unwrap();
        store.modify(&id, |j| j.mark_running(Utc::now())).unwrap();

        let insert = sub.recv().await.unwrap();
        assert_eq!(insert.kind, ChangeKind::Insert);

        let update = sub.recv().await.unwrap();
        assert_eq!(update.kind, ChangeKind::Update);
        assert_eq!(update.old_status(), Some(JobStatus::Pending));
        assert_eq!(update.new.status, JobStatus::Running);
    }

    #[tokio::test]
    async fn outage_fails_queries() {
        let store = InMemoryJobStore::new();
        store.set_unavailable(true);
        let err = store.active_jobs(&ActiveJobQuery::default()).await.unwrap_err();
        assert!(matches!(err, JobStoreError::Unavailable(_)));
        store.set_unavailable(false);
        assert!(store.active_jobs(&ActiveJobQuery::default()).await.is_ok());
    }

    #[tokio::test]
    async fn workflow_steps_are_ordered() {
        let store = InMemoryJobStore::new();
        let id = JobId::from("wf");
        store
            .set_workflow_steps(
                &id,
                vec![
                    WorkflowStep::new(id.clone(), 2, "apply_update", StepStatus::Pending),
                    WorkflowStep::new(id.clone(), 1, "enter_maintenance", StepStatus::Completed),
                ],
            )
            .unwrap();

        let steps = store.workflow_steps_for(&id).await.unwrap();
        assert_eq!(steps[0].step_number, 1);
        assert_eq!(steps[1].step_number, 2);
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let store = InMemoryJobStore::new();
        store.insert(Job::new("x").with_id("dup")).unwrap();
        assert!(matches!(
            store.insert(Job::new("x").with_id("dup")),
            Err(JobStoreError::AlreadyExists(_))
        ));
    }
}
