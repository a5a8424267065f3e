//! The notification center: one supervisor owning the feed loop and both timers.
//!
//! All mutable state lives in a single [`MonitorState`] behind one async mutex.
//! Store and network I/O happen outside the lock; the lock is only held to
//! read or swap state.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use jobpulse_core::{CommandRecord, Job, JobId, NotificationSettings, SettingsPatch};
use jobpulse_events::{FeedSubscription, JobChange};
use jobpulse_infra::{
    ActiveJobQuery, AlertSink, ExecutorHealth, ExecutorProbe, JobStore, KeyValueStore,
    SettingsBackend,
};

use crate::config::{ConfigError, MonitorConfig};
use crate::dispatcher::NotificationDispatcher;
use crate::progress::{JobProgress, ProgressEngine};
use crate::retention::RecentlyCompleted;
use crate::settings::SettingsStore;
use crate::tracker::ActiveJobTracker;
use crate::transitions::TransitionDetector;

/// External collaborators the center is wired to.
pub struct Collaborators {
    pub store: Arc<dyn JobStore>,
    /// Live subscription to the job table's change feed.
    pub feed: FeedSubscription<JobChange>,
    pub kv: Arc<dyn KeyValueStore>,
    pub settings_backend: Option<Arc<dyn SettingsBackend>>,
    pub alerts: Arc<dyn AlertSink>,
}

struct MonitorState {
    tracker: ActiveJobTracker,
    progress: HashMap<JobId, JobProgress>,
    detector: TransitionDetector,
    dispatcher: NotificationDispatcher,
    recent: RecentlyCompleted,
    commands: Vec<CommandRecord>,
    executor_health: Option<ExecutorHealth>,
}

/// Wall clock that advances with the runtime's timer.
#[derive(Debug, Clone, Copy)]
struct Clock {
    origin: DateTime<Utc>,
    started: Instant,
}

impl Clock {
    fn start() -> Self {
        Self {
            origin: Utc::now(),
            started: Instant::now(),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.started.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.origin + elapsed
    }
}

struct Inner {
    config: MonitorConfig,
    query: ActiveJobQuery,
    clock: Clock,
    store: Arc<dyn JobStore>,
    alerts: Arc<dyn AlertSink>,
    settings: SettingsStore,
    engine: ProgressEngine,
    probe: Option<ExecutorProbe>,
    state: Mutex<MonitorState>,
}

/// A spawned loop that is aborted if the guard is dropped without a join.
struct TaskGuard {
    name: &'static str,
    shutdown: Arc<Notify>,
    handle: Option<JoinHandle<()>>,
}

impl TaskGuard {
    fn spawn<F, Fut>(name: &'static str, body: F) -> Self
    where
        F: FnOnce(Arc<Notify>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let shutdown = Arc::new(Notify::new());
        let handle = tokio::spawn(body(shutdown.clone()));
        tracing::debug!(task = name, "monitor task started");
        Self {
            name,
            shutdown,
            handle: Some(handle),
        }
    }

    /// Ask the loop to stop and wait for it.
    async fn stop(mut self) {
        // notify_one stores a permit, so a loop that is mid-iteration still sees it
        self.shutdown.notify_one();
        if let Some(handle) = self.handle.take()
            && let Err(e) = handle.await
            && !e.is_cancelled()
        {
            tracing::error!(task = self.name, error = %e, "monitor task panicked");
        }
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }
}

/// Operator-facing job monitor.
///
/// Dropping the center aborts its tasks; [`shutdown`](Self::shutdown) stops
/// them gracefully.
pub struct NotificationCenter {
    inner: Arc<Inner>,
    tasks: Vec<TaskGuard>,
}

impl NotificationCenter {
    /// Validate `config`, load settings, take an initial snapshot of the active
    /// set and start the feed loop, progress poll and retention sweep.
    pub async fn start(config: MonitorConfig, collaborators: Collaborators) -> Result<Self, ConfigError> {
        config.validate()?;

        let Collaborators {
            store,
            feed,
            kv,
            settings_backend,
            alerts,
        } = collaborators;

        let settings = SettingsStore::load(kv, settings_backend).await;
        let state = MonitorState {
            tracker: ActiveJobTracker::new(),
            progress: HashMap::new(),
            detector: TransitionDetector::new(config.status_map_capacity),
            dispatcher: NotificationDispatcher::new(
                config.excluded_job_types(),
                config.dedup_window_chrono(),
            ),
            recent: RecentlyCompleted::new(config.retention_window_chrono()),
            commands: Vec::new(),
            executor_health: None,
        };

        let inner = Arc::new(Inner {
            query: config.active_job_query(),
            clock: Clock::start(),
            engine: ProgressEngine::new(store.clone(), config.running_floor_percent),
            probe: config
                .executor_url
                .as_ref()
                .map(|url| ExecutorProbe::new(url.clone(), config.probe_timeout)),
            store,
            alerts,
            settings,
            state: Mutex::new(state),
            config,
        });

        inner.refresh_jobs().await;

        let tasks = vec![
            TaskGuard::spawn("change_feed", {
                let inner = inner.clone();
                move |shutdown| feed_loop(inner, feed, shutdown)
            }),
            TaskGuard::spawn("progress_poll", {
                let inner = inner.clone();
                move |shutdown| progress_loop(inner, shutdown)
            }),
            TaskGuard::spawn("retention_sweep", {
                let inner = inner.clone();
                move |shutdown| sweep_loop(inner, shutdown)
            }),
        ];

        tracing::info!(
            progress_interval_ms = inner.config.progress_interval.as_millis() as u64,
            probe = inner.probe.is_some(),
            "notification center started"
        );
        Ok(Self { inner, tasks })
    }

    /// Stop all loops and wait for them to finish.
    pub async fn shutdown(self) {
        for task in self.tasks {
            task.stop().await;
        }
        tracing::info!("notification center stopped");
    }

    /// Active jobs, newest first.
    pub async fn active_jobs(&self) -> Vec<Job> {
        self.inner.state.lock().await.tracker.jobs().to_vec()
    }

    pub async fn progress(&self) -> HashMap<JobId, JobProgress> {
        self.inner.state.lock().await.progress.clone()
    }

    pub async fn progress_for(&self, job_id: &JobId) -> Option<JobProgress> {
        self.inner.state.lock().await.progress.get(job_id).cloned()
    }

    /// Jobs that finished within the retention window, newest first.
    pub async fn recently_completed(&self) -> Vec<Job> {
        self.inner.state.lock().await.recent.jobs()
    }

    pub async fn settings(&self) -> NotificationSettings {
        self.inner.settings.current().await
    }

    pub async fn update_settings(&self, patch: &SettingsPatch) -> NotificationSettings {
        let updated = self.inner.settings.update(patch).await;
        if !updated.show_progress {
            self.inner.state.lock().await.progress.clear();
        }
        updated
    }

    /// Re-query the active set now.
    pub async fn refresh_jobs(&self) {
        self.inner.refresh_jobs().await;
    }

    /// Fetch the latest executor commands and probe executor health.
    pub async fn refresh_commands(&self) {
        let limit = self.inner.settings.current().await.max_recent_items;
        let commands = self.inner.store.recent_commands(limit).await;
        let health = match &self.inner.probe {
            Some(probe) => Some(probe.check().await),
            None => None,
        };

        let mut state = self.inner.state.lock().await;
        match commands {
            Ok(commands) => state.commands = commands,
            Err(e) => tracing::warn!(error = %e, "failed to load recent commands"),
        }
        if let Some(health) = health {
            if !health.is_healthy() {
                tracing::warn!(state = ?health.state, "job executor is not healthy");
            }
            state.executor_health = Some(health);
        }
    }

    pub async fn recent_commands(&self) -> Vec<CommandRecord> {
        self.inner.state.lock().await.commands.clone()
    }

    /// Result of the last executor probe, if one has run.
    pub async fn executor_health(&self) -> Option<ExecutorHealth> {
        self.inner.state.lock().await.executor_health.clone()
    }

    pub async fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.inner.state.lock().await.tracker.last_updated()
    }
}

impl Inner {
    async fn refresh_jobs(&self) {
        let result = ActiveJobTracker::fetch(self.store.as_ref(), &self.query).await;
        let now = self.clock.now();

        let mut state = self.state.lock().await;
        let MonitorState {
            tracker, progress, ..
        } = &mut *state;
        if tracker.apply(result, now) {
            progress.retain(|id, _| tracker.contains(id));
        }
    }

    async fn handle_change(&self, change: JobChange) {
        let now = self.clock.now();
        let settings = self.settings.current().await;

        let notification = {
            let mut state = self.state.lock().await;
            match state.detector.observe(&change, now) {
                Some(transition) => {
                    let notification = state.dispatcher.dispatch(&transition, &settings, now);
                    if transition.is_finish()
                        && !self.query.excluded_job_types.contains(&transition.job.job_type)
                    {
                        state.recent.add(transition.job, now);
                    }
                    notification
                }
                None => None,
            }
        };

        if let Some(notification) = notification {
            tracing::debug!(
                job_id = %notification.job_id,
                severity = ?notification.severity,
                "notifying"
            );
            self.alerts.notify(&notification);
        }

        self.refresh_jobs().await;
    }

    async fn poll_progress(&self) {
        {
            let mut state = self.state.lock().await;
            if state.tracker.is_empty() {
                state.progress.clear();
                return;
            }
        }

        self.refresh_jobs().await;
        if !self.settings.current().await.show_progress {
            return;
        }

        let jobs = self.state.lock().await.tracker.jobs().to_vec();
        let now = self.clock.now();
        let mut computed = HashMap::with_capacity(jobs.len());
        for job in &jobs {
            computed.insert(job.id.clone(), self.engine.compute(job, now).await);
        }

        // Settings and the active set may have moved while the store was read.
        let show_progress = self.settings.current().await.show_progress;
        let mut state = self.state.lock().await;
        let MonitorState {
            tracker, progress, ..
        } = &mut *state;
        if !show_progress {
            progress.clear();
            return;
        }
        computed.retain(|id, _| tracker.contains(id));
        *progress = computed;
    }

    async fn sweep(&self) {
        let now = self.clock.now();
        let window = self.config.retention_window_chrono();

        let mut state = self.state.lock().await;
        let evicted = state.recent.sweep(now);
        let pruned = state.detector.prune(now, window);
        state.dispatcher.prune(now);
        if evicted > 0 || pruned > 0 {
            tracing::debug!(evicted, pruned, "retention sweep");
        }
    }
}

async fn feed_loop(inner: Arc<Inner>, mut feed: FeedSubscription<JobChange>, shutdown: Arc<Notify>) {
    loop {
        tokio::select! {
            _ = shutdown.notified() => break,
            change = feed.recv() => match change {
                Some(change) => inner.handle_change(change).await,
                None => {
                    tracing::warn!("change feed closed; feed loop ending");
                    break;
                }
            },
        }
    }
    feed.close();
}

async fn progress_loop(inner: Arc<Inner>, shutdown: Arc<Notify>) {
    let mut interval = tokio::time::interval(inner.config.progress_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.notified() => break,
            _ = interval.tick() => inner.poll_progress().await,
        }
    }
}

async fn sweep_loop(inner: Arc<Inner>, shutdown: Arc<Notify>) {
    let mut interval = tokio::time::interval(inner.config.sweep_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.notified() => break,
            _ = interval.tick() => inner.sweep().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use jobpulse_core::{JobStatus, ToastLevel};
    use jobpulse_events::{ChangeFeed, InMemoryChangeFeed};
    use jobpulse_infra::{InMemoryJobStore, InMemoryKeyValueStore, TracingAlertSink};

    struct Fixture {
        store: Arc<InMemoryJobStore>,
        center: NotificationCenter,
    }

    fn collaborators(
        store: Arc<InMemoryJobStore>,
        feed: &InMemoryChangeFeed<JobChange>,
    ) -> Collaborators {
        Collaborators {
            store,
            feed: feed.subscribe(),
            kv: Arc::new(InMemoryKeyValueStore::new()),
            settings_backend: None,
            alerts: Arc::new(TracingAlertSink),
        }
    }

    async fn fixture(config: MonitorConfig) -> Fixture {
        let feed = Arc::new(InMemoryChangeFeed::new());
        let store = Arc::new(InMemoryJobStore::with_feed(feed.clone()));
        let center = NotificationCenter::start(config, collaborators(store.clone(), &feed))
            .await
            .unwrap();
        Fixture { store, center }
    }

    #[tokio::test(start_paused = true)]
    async fn start_rejects_invalid_config() {
        let feed = InMemoryChangeFeed::new();
        let result = NotificationCenter::start(
            MonitorConfig::default().with_status_map_capacity(0),
            collaborators(InMemoryJobStore::arc(), &feed),
        )
        .await;
        assert!(matches!(result, Err(ConfigError::Zero("status_map_capacity"))));
    }

    #[tokio::test(start_paused = true)]
    async fn initial_snapshot_and_progress_poll() {
        let feed = Arc::new(InMemoryChangeFeed::new());
        let store = Arc::new(InMemoryJobStore::with_feed(feed.clone()));
        let mut job = Job::new("vcenter_sync")
            .with_id("pre")
            .with_details(serde_json::json!({ "vms_total": 4, "vms_processed": 1 }));
        job.mark_running(Utc::now());
        store.insert(job).unwrap();

        let center = NotificationCenter::start(MonitorConfig::default(), collaborators(store, &feed))
            .await
            .unwrap();

        assert_eq!(center.active_jobs().await.len(), 1);
        assert!(center.last_updated().await.is_some());

        tokio::time::sleep(Duration::from_millis(2100)).await;
        let progress = center.progress_for(&JobId::from("pre")).await.unwrap();
        assert_eq!(progress.progress_percent, 25);
        center.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn hidden_progress_clears_the_map() {
        let Fixture { store, center } = fixture(MonitorConfig::default()).await;
        let mut job = Job::new("x").with_id("j");
        job.mark_running(Utc::now());
        store.insert(job).unwrap();

        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert!(!center.progress().await.is_empty());

        let patch = SettingsPatch {
            show_progress: Some(false),
            toast_level: Some(ToastLevel::All),
            ..SettingsPatch::default()
        };
        center.update_settings(&patch).await;
        assert!(center.progress().await.is_empty());

        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert!(center.progress().await.is_empty());
        center.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn progress_is_dropped_when_job_leaves_active_set() {
        let Fixture { store, center } = fixture(MonitorConfig::default()).await;
        let mut job = Job::new("x").with_id("j");
        job.mark_running(Utc::now());
        store.insert(job).unwrap();

        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert!(center.progress_for(&JobId::from("j")).await.is_some());

        store
            .modify(&JobId::from("j"), |j| j.mark_completed(Utc::now()))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(center.active_jobs().await.is_empty());
        assert!(center.progress_for(&JobId::from("j")).await.is_none());
        assert_eq!(
            center.recently_completed().await.first().map(|j| j.status),
            Some(JobStatus::Completed)
        );
        center.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_commands_honors_max_recent_items() {
        let Fixture { store, center } = fixture(MonitorConfig::default()).await;
        let t0 = Utc::now();
        for i in 0..5 {
            store
                .record_command(CommandRecord {
                    id: format!("cmd-{i}"),
                    job_id: None,
                    command_type: "power_on".to_string(),
                    endpoint: "/redfish/v1/Systems/1/Actions/ComputerSystem.Reset".to_string(),
                    success: true,
                    status_code: Some(204),
                    created_at: t0 + chrono::Duration::seconds(i),
                })
                .unwrap();
        }

        center
            .update_settings(&SettingsPatch {
                max_recent_items: Some(3),
                ..SettingsPatch::default()
            })
            .await;
        center.refresh_commands().await;

        let ids: Vec<_> = center.recent_commands().await.into_iter().map(|c| c.id).collect();
        assert_eq!(ids, ["cmd-4", "cmd-3", "cmd-2"]);
        // no executor configured, so nothing was probed
        assert!(center.executor_health().await.is_none());
        center.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_center_aborts_tasks() {
        let feed = Arc::new(InMemoryChangeFeed::new());
        let store = Arc::new(InMemoryJobStore::with_feed(feed.clone()));
        let center = NotificationCenter::start(MonitorConfig::default(), collaborators(store, &feed))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(feed.subscriber_count(), 1);

        drop(center);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(feed.subscriber_count(), 0);
    }
}
