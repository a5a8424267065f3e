//! `jobpulse-core`: domain model shared by every jobpulse crate.
//!
//! This crate contains **pure data** (no IO, no async): the externally-owned job
//! rows the monitor observes, the notification settings record, and the
//! identifier/error primitives used across the workspace.

pub mod error;
pub mod id;
pub mod job;
pub mod settings;

pub use error::DomainError;
pub use id::JobId;
pub use job::{CommandRecord, Job, JobStatus, JobTask, StepStatus, TaskStatus, WorkflowStep};
pub use settings::{NotificationSettings, SettingsPatch, ToastLevel};
