//! User-facing alert surface (toasts, desktop notifications).

use serde::Serialize;

use jobpulse_core::JobId;

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    /// How long a toast of this severity stays on screen.
    pub fn duration_ms(&self) -> u64 {
        match self {
            Severity::Error => 10_000,
            Severity::Warning => 6_000,
            Severity::Info | Severity::Success => 4_000,
        }
    }
}

/// A notification ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub job_id: JobId,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub duration_ms: u64,
    /// Play the notification sound, if the surface supports one.
    pub play_sound: bool,
    /// Mirror to the OS/browser notification center.
    pub browser: bool,
}

/// Alert collaborator.
///
/// Implementors only need the four severity methods; `notify` routes a
/// [`Notification`] to the right one.
pub trait AlertSink: Send + Sync {
    fn info(&self, title: &str, description: &str, duration_ms: u64);
    fn success(&self, title: &str, description: &str, duration_ms: u64);
    fn warning(&self, title: &str, description: &str, duration_ms: u64);
    fn error(&self, title: &str, description: &str, duration_ms: u64);

    fn notify(&self, notification: &Notification) {
        let Notification {
            title,
            description,
            duration_ms,
            ..
        } = notification;
        match notification.severity {
            Severity::Info => self.info(title, description, *duration_ms),
            Severity::Success => self.success(title, description, *duration_ms),
            Severity::Warning => self.warning(title, description, *duration_ms),
            Severity::Error => self.error(title, description, *duration_ms),
        }
    }
}

/// Alert sink that writes notifications to the log (headless deployments).
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn info(&self, title: &str, description: &str, duration_ms: u64) {
        tracing::info!(target: "jobpulse::alerts", duration_ms, "{title}: {description}");
    }

    fn success(&self, title: &str, description: &str, duration_ms: u64) {
        tracing::info!(target: "jobpulse::alerts", duration_ms, success = true, "{title}: {description}");
    }

    fn warning(&self, title: &str, description: &str, duration_ms: u64) {
        tracing::warn!(target: "jobpulse::alerts", duration_ms, "{title}: {description}");
    }

    fn error(&self, title: &str, description: &str, duration_ms: u64) {
        tracing::error!(target: "jobpulse::alerts", duration_ms, "{title}: {description}");
    }
}
