//! Decides whether (and what) to announce for a status edge.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Duration, Utc};

use jobpulse_core::{JobId, JobStatus, NotificationSettings};
use jobpulse_infra::{Notification, Severity};

use crate::display::job_type_name;
use crate::transitions::Transition;

/// Notification class of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Queued,
    Started,
    Completed,
    Failed,
    Cancelled,
}

impl EventKind {
    fn severity(self) -> Severity {
        match self {
            EventKind::Queued | EventKind::Started => Severity::Info,
            EventKind::Completed => Severity::Success,
            EventKind::Failed => Severity::Error,
            EventKind::Cancelled => Severity::Warning,
        }
    }
}

/// Classify an edge, before settings are applied.
fn classify(transition: &Transition) -> Option<EventKind> {
    if transition.is_insert() {
        return Some(EventKind::Queued);
    }
    match (transition.old, transition.new) {
        (_, JobStatus::Failed) => Some(EventKind::Failed),
        (_, JobStatus::Cancelled) => Some(EventKind::Cancelled),
        (Some(JobStatus::Pending), JobStatus::Running) => Some(EventKind::Started),
        (_, JobStatus::Completed) => Some(EventKind::Completed),
        _ => None,
    }
}

fn allowed(kind: EventKind, settings: &NotificationSettings) -> bool {
    let level = settings.toast_level;
    match kind {
        EventKind::Failed => true,
        EventKind::Cancelled => level.allows_warnings(),
        EventKind::Queued | EventKind::Started | EventKind::Completed => level.allows_info(),
    }
}

pub struct NotificationDispatcher {
    excluded_job_types: BTreeSet<String>,
    dedup_window: Duration,
    /// Last emitted insert-class notification per job.
    last_emitted: HashMap<(JobId, EventKind), DateTime<Utc>>,
}

impl NotificationDispatcher {
    pub fn new(excluded_job_types: BTreeSet<String>, dedup_window: Duration) -> Self {
        Self {
            excluded_job_types,
            dedup_window,
            last_emitted: HashMap::new(),
        }
    }

    /// Build the notification for `transition`, or `None` if it is suppressed.
    ///
    /// Suppression order: silent job, excluded type, notifications disabled,
    /// toast level, then the insert dedup window.
    pub fn dispatch(
        &mut self,
        transition: &Transition,
        settings: &NotificationSettings,
        now: DateTime<Utc>,
    ) -> Option<Notification> {
        let job = &transition.job;
        if job.is_silent() {
            tracing::debug!(job_id = %job.id, "silent job; notification suppressed");
            return None;
        }
        if self.excluded_job_types.contains(&job.job_type) || !settings.enabled {
            return None;
        }

        let kind = classify(transition)?;
        if !allowed(kind, settings) {
            return None;
        }

        if transition.is_insert() {
            let key = (job.id.clone(), kind);
            if let Some(last) = self.last_emitted.get(&key)
                && now - *last < self.dedup_window
            {
                tracing::debug!(job_id = %job.id, "duplicate insert notification suppressed");
                return None;
            }
            self.last_emitted.insert(key, now);
        }

        Some(render(kind, transition, settings))
    }

    /// Drop dedup entries older than the window.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        let window = self.dedup_window;
        self.last_emitted.retain(|_, at| now - *at < window);
    }
}

fn render(kind: EventKind, transition: &Transition, settings: &NotificationSettings) -> Notification {
    let job = &transition.job;
    let name = job_type_name(&job.job_type);
    let (title, description) = match kind {
        EventKind::Queued => (format!("{name} queued"), "Job has been queued for execution".to_string()),
        EventKind::Started => (format!("{name} started"), "Job is now running".to_string()),
        EventKind::Completed => (format!("{name} completed"), "Job completed successfully".to_string()),
        EventKind::Cancelled => (format!("{name} cancelled"), "Job was cancelled".to_string()),
        EventKind::Failed => (
            format!("{name} failed"),
            match job.error_message() {
                Some(error) => format!("Job failed: {error}"),
                None => "Job failed".to_string(),
            },
        ),
    };

    let severity = kind.severity();
    Notification {
        job_id: job.id.clone(),
        severity,
        title,
        description,
        duration_ms: severity.duration_ms(),
        play_sound: settings.sound_enabled,
        browser: settings.browser_notifications,
    }
}
