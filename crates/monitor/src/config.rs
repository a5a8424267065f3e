//! Monitor configuration.
//!
//! Values not set explicitly use the defaults below. A handful of deployment
//! knobs can be overridden from the environment via [`MonitorConfig::from_env`].

use std::collections::BTreeSet;
use std::time::Duration;

use thiserror::Error;

use jobpulse_infra::ActiveJobQuery;

/// Internal job types that never surface to operators.
const INTERNAL_JOB_TYPES: &[&str] = &[
    "executor_heartbeat",
    "session_cleanup",
    "credential_rotation",
    "internal_maintenance",
];

/// SLA/monitoring job types, hidden while `hide_monitoring_jobs` is on.
const MONITORING_JOB_TYPES: &[&str] = &[
    "sla_monitoring",
    "scheduled_health_check",
    "scheduled_power_audit",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Progress recomputation cadence.
    pub progress_interval: Duration,
    /// Recently-completed sweep cadence.
    pub sweep_interval: Duration,
    /// How long finished jobs stay in the recently-completed list.
    pub retention_window: Duration,
    /// Window in which a repeated insert notification is suppressed.
    pub dedup_window: Duration,
    /// Percent shown for running jobs that report no progress signal at all.
    pub running_floor_percent: u8,
    /// Upper bound on previous-status entries kept by the transition detector.
    pub status_map_capacity: usize,
    /// Bounded wait for the executor health probe.
    pub probe_timeout: Duration,
    /// Base URL of the job executor, if health probing is wanted.
    pub executor_url: Option<String>,
    /// Hide SLA/monitoring job types from the active list and notifications.
    pub hide_monitoring_jobs: bool,
    pub internal_job_types: BTreeSet<String>,
    pub monitoring_job_types: BTreeSet<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            progress_interval: Duration::from_secs(2),
            sweep_interval: Duration::from_secs(1),
            retention_window: Duration::from_secs(15),
            dedup_window: Duration::from_secs(2),
            running_floor_percent: 5,
            status_map_capacity: 1024,
            probe_timeout: Duration::from_secs(5),
            executor_url: None,
            hide_monitoring_jobs: true,
            internal_job_types: INTERNAL_JOB_TYPES.iter().map(|s| s.to_string()).collect(),
            monitoring_job_types: MONITORING_JOB_TYPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl MonitorConfig {
    /// Defaults overridden by `JOBPULSE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("JOBPULSE_EXECUTOR_URL").filter(|v| !v.trim().is_empty()) {
            config.executor_url = Some(url.trim().to_string());
        }

        if let Some(raw) = lookup("JOBPULSE_PROBE_TIMEOUT_MS") {
            let ms: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                key: "JOBPULSE_PROBE_TIMEOUT_MS",
                value: raw.clone(),
            })?;
            config.probe_timeout = Duration::from_millis(ms);
        }

        if let Some(raw) = lookup("JOBPULSE_HIDE_MONITORING_JOBS") {
            config.hide_monitoring_jobs = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        key: "JOBPULSE_HIDE_MONITORING_JOBS",
                        value: raw,
                    });
                }
            };
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn with_retention_window(mut self, window: Duration) -> Self {
        self.retention_window = window;
        self
    }

    pub fn with_executor_url(mut self, url: impl Into<String>) -> Self {
        self.executor_url = Some(url.into());
        self
    }

    pub fn with_hide_monitoring_jobs(mut self, hide: bool) -> Self {
        self.hide_monitoring_jobs = hide;
        self
    }

    pub fn with_status_map_capacity(mut self, capacity: usize) -> Self {
        self.status_map_capacity = capacity;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.progress_interval.is_zero() {
            return Err(ConfigError::Zero("progress_interval"));
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::Zero("sweep_interval"));
        }
        if self.probe_timeout.is_zero() {
            return Err(ConfigError::Zero("probe_timeout"));
        }
        if self.status_map_capacity == 0 {
            return Err(ConfigError::Zero("status_map_capacity"));
        }
        Ok(())
    }

    /// Job types excluded from the active list and from notifications.
    pub fn excluded_job_types(&self) -> BTreeSet<String> {
        let mut excluded = self.internal_job_types.clone();
        if self.hide_monitoring_jobs {
            excluded.extend(self.monitoring_job_types.iter().cloned());
        }
        excluded
    }

    pub fn active_job_query(&self) -> ActiveJobQuery {
        ActiveJobQuery {
            excluded_job_types: self.excluded_job_types(),
            limit: None,
        }
    }

    pub(crate) fn retention_window_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.retention_window).unwrap_or(chrono::Duration::MAX)
    }

    pub(crate) fn dedup_window_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.dedup_window).unwrap_or(chrono::Duration::MAX)
    }
}
