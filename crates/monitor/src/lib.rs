//! `jobpulse-monitor`
//!
//! **Responsibility:** turn the job store's change feed into operator-facing
//! state: the active job list, per-job progress estimates, notifications and a
//! short-lived "just finished" list.
//!
//! The entry point is [`NotificationCenter`], which owns the feed subscription
//! and the two timers and exposes the read/update surface for UI consumers.

pub mod center;
pub mod config;
pub mod dispatcher;
pub mod display;
pub mod progress;
pub mod retention;
pub mod settings;
pub mod tracker;
pub mod transitions;

pub use center::{Collaborators, NotificationCenter};
pub use config::{ConfigError, MonitorConfig};
pub use dispatcher::{EventKind, NotificationDispatcher};
pub use progress::{JobProgress, ProgressEngine};
pub use retention::RecentlyCompleted;
pub use settings::SettingsStore;
pub use tracker::ActiveJobTracker;
pub use transitions::{StatusLedger, Transition, TransitionDetector, TransitionKind};
