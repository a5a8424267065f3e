//! Job rows as reported by the external job store.
//!
//! None of these types are owned by the monitor: they are snapshots of rows the
//! worker pool writes. `details` stays untyped: its shape
//! depends on the job type and on the phase the job is in.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DomainError;
use crate::id::JobId;

macro_rules! status_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    other => Err(DomainError::unknown_status($kind, other)),
                }
            }
        }
    };
}

status_enum! {
    /// Lifecycle status of a job.
    JobStatus, "job" {
        Pending => "pending",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl JobStatus {
    /// Completed, failed and cancelled jobs are not expected to move again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Pending and running jobs are the ones the tracker shows.
    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Running)
    }

    /// Capitalized label for status lines ("Completed", "Failed", ...).
    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Pending => "Pending",
            JobStatus::Running => "Running",
            JobStatus::Completed => "Completed",
            JobStatus::Failed => "Failed",
            JobStatus::Cancelled => "Cancelled",
        }
    }
}

status_enum! {
    /// Status of a single task belonging to a job.
    TaskStatus, "task" {
        Pending => "pending",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

status_enum! {
    /// Status of a workflow step.
    StepStatus, "step" {
        Pending => "pending",
        Running => "running",
        Completed => "completed",
        Skipped => "skipped",
        Failed => "failed",
    }
}

impl StepStatus {
    /// Completed and skipped steps both count as done for progress purposes.
    pub fn is_done(&self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Skipped)
    }
}

/// A background job row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub job_type: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Untyped per-job-type payload.
    #[serde(default = "empty_details")]
    pub details: Value,
}

fn empty_details() -> Value {
    Value::Object(Map::new())
}

impl Job {
    /// Create a new pending job with empty details.
    pub fn new(job_type: impl Into<String>) -> Self {
        Self {
            id: JobId::new(),
            job_type: job_type.into(),
            status: JobStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            details: empty_details(),
        }
    }

    pub fn with_id(mut self, id: impl Into<JobId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = status;
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self
    }

    /// Mark job as running.
    pub fn mark_running(&mut self, at: DateTime<Utc>) {
        self.status = JobStatus::Running;
        self.started_at.get_or_insert(at);
    }

    /// Mark job as completed.
    pub fn mark_completed(&mut self, at: DateTime<Utc>) {
        self.status = JobStatus::Completed;
        self.completed_at = Some(at);
    }

    /// Mark job as failed, recording the error in `details.error`.
    pub fn mark_failed(&mut self, error: impl Into<String>, at: DateTime<Utc>) {
        self.status = JobStatus::Failed;
        self.completed_at = Some(at);
        if let Value::Object(map) = &mut self.details {
            map.insert("error".to_string(), Value::String(error.into()));
        }
    }

    /// Mark job as cancelled.
    pub fn mark_cancelled(&mut self, at: DateTime<Utc>) {
        self.status = JobStatus::Cancelled;
        self.completed_at = Some(at);
    }

    /// The details payload as a map, if it is one.
    pub fn details_map(&self) -> Option<&Map<String, Value>> {
        self.details.as_object()
    }

    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details_map().and_then(|m| m.get(key))
    }

    /// Jobs flagged with `details.silent = true` never produce notifications.
    pub fn is_silent(&self) -> bool {
        matches!(self.detail("silent"), Some(Value::Bool(true)))
    }

    /// Non-empty `details.error`, when present.
    pub fn error_message(&self) -> Option<&str> {
        self.detail("error")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// A unit of work inside a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobTask {
    pub job_id: JobId,
    pub status: TaskStatus,
    /// Task-local progress, 0-100.
    #[serde(default)]
    pub progress: Option<f64>,
    /// Newline-delimited log text.
    #[serde(default)]
    pub log: Option<String>,
}

impl JobTask {
    pub fn new(job_id: JobId, status: TaskStatus) -> Self {
        Self {
            job_id,
            status,
            progress: None,
            log: None,
        }
    }

    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_log(mut self, log: impl Into<String>) -> Self {
        self.log = Some(log.into());
        self
    }

    /// Last non-empty line of the log.
    pub fn last_log_line(&self) -> Option<&str> {
        self.log
            .as_deref()?
            .lines()
            .map(str::trim)
            .rev()
            .find(|line| !line.is_empty())
    }
}

/// One step of a multi-step workflow job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub job_id: JobId,
    pub step_number: u32,
    pub step_name: String,
    pub step_status: StepStatus,
}

impl WorkflowStep {
    pub fn new(
        job_id: JobId,
        step_number: u32,
        step_name: impl Into<String>,
        step_status: StepStatus,
    ) -> Self {
        Self {
            job_id,
            step_number,
            step_name: step_name.into(),
            step_status,
        }
    }
}

/// A command the executor sent to a managed endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub id: String,
    #[serde(default)]
    pub job_id: Option<JobId>,
    pub command_type: String,
    pub endpoint: String,
    pub success: bool,
    #[serde(default)]
    pub status_code: Option<u16>,
    pub created_at: DateTime<Utc>,
}
