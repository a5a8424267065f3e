//! Infrastructure layer: the collaborators the monitor talks to.
//!
//! Every external system is reached through a trait defined here, with an
//! in-memory implementation for tests/dev and, where it makes sense, a real one.

pub mod alerts;
pub mod jobs;
pub mod kv;
pub mod probe;
pub mod settings_backend;

pub use alerts::{AlertSink, Notification, Severity, TracingAlertSink};
pub use jobs::{ActiveJobQuery, InMemoryJobStore, JobStore, JobStoreError};
pub use kv::{FileKeyValueStore, InMemoryKeyValueStore, KeyValueStore};
pub use probe::{ExecutorHealth, ExecutorProbe, HealthState};
pub use settings_backend::{InMemorySettingsBackend, SettingsBackend, SettingsBackendError};
