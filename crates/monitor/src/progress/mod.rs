//! Progress inference: untyped job details (+ tasks/steps) → [`JobProgress`].
//!
//! Percent sources, first match wins:
//! 1. explicit `details.progress_percent`
//! 2. known numerator/denominator field pairs
//! 3. workflow steps (only for jobs without tasks; they also name the status line)
//! 4. task completion (running task's own progress counts fractionally)
//! 5. a small floor for running jobs with no signal at all
//! 6. zero
//!
//! Percent is not forced to be monotonic across polls: if the executor reports a
//! lower value later, the lower value is shown.

pub mod elapsed;
pub mod heuristics;
pub mod status_text;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use jobpulse_core::{Job, JobId, JobStatus, JobTask, TaskStatus, WorkflowStep};
use jobpulse_infra::JobStore;

use self::heuristics::{Estimate, Heuristic, ratio_percent};

/// Computed progress for one active job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgress {
    pub job_id: JobId,
    pub total_units: u64,
    pub completed_units: u64,
    pub current_status_text: String,
    pub progress_percent: u8,
    pub elapsed_time: String,
    pub is_workflow_derived: bool,
}

/// Stateless progress estimator.
///
/// Reads tasks and workflow steps from the store on every call; nothing is
/// cached between calls because those rows change between polls.
pub struct ProgressEngine {
    store: Arc<dyn JobStore>,
    chain: Vec<Box<dyn Heuristic>>,
    running_floor: u8,
}

impl ProgressEngine {
    pub fn new(store: Arc<dyn JobStore>, running_floor: u8) -> Self {
        Self {
            store,
            chain: heuristics::default_chain(),
            running_floor: running_floor.min(100),
        }
    }

    /// Append a heuristic after the built-in ones.
    pub fn with_heuristic(mut self, heuristic: Box<dyn Heuristic>) -> Self {
        self.chain.push(heuristic);
        self
    }

    /// Estimate progress for `job` as of `now`. Never fails.
    pub async fn compute(&self, job: &Job, now: DateTime<Utc>) -> JobProgress {
        let mut estimate = job.details_map().and_then(|details| {
            heuristics::evaluate_chain(&self.chain, details).map(|(rule, estimate)| {
                tracing::trace!(job_id = %job.id, rule, percent = estimate.percent, "heuristic hit");
                estimate
            })
        });

        let tasks = self.load_tasks(&job.id).await;

        // Steps also feed the status line, so they are read whenever there are no tasks.
        let steps = if tasks.is_empty() {
            self.load_steps(&job.id).await
        } else {
            Vec::new()
        };

        let mut is_workflow_derived = false;
        if estimate.is_none()
            && let Some(from_steps) = step_estimate(&steps)
        {
            estimate = Some(from_steps);
            is_workflow_derived = true;
        }

        let estimate = estimate
            .or_else(|| task_estimate(&tasks))
            .unwrap_or_else(|| self.fallback(job.status));

        JobProgress {
            job_id: job.id.clone(),
            total_units: estimate.total,
            completed_units: estimate.completed,
            current_status_text: status_text::resolve(job, &steps, &tasks),
            progress_percent: estimate.percent,
            elapsed_time: elapsed::format_elapsed(elapsed::elapsed_since(job, now)),
            is_workflow_derived,
        }
    }

    fn fallback(&self, status: JobStatus) -> Estimate {
        if status == JobStatus::Running {
            Estimate::from_percent(self.running_floor)
        } else {
            Estimate::ZERO
        }
    }

    async fn load_tasks(&self, job_id: &JobId) -> Vec<JobTask> {
        self.store.tasks_for(job_id).await.unwrap_or_else(|e| {
            tracing::warn!(job_id = %job_id, error = %e, "failed to load job tasks");
            Vec::new()
        })
    }

    async fn load_steps(&self, job_id: &JobId) -> Vec<WorkflowStep> {
        self.store.workflow_steps_for(job_id).await.unwrap_or_else(|e| {
            tracing::warn!(job_id = %job_id, error = %e, "failed to load workflow steps");
            Vec::new()
        })
    }
}

/// Completed and skipped steps over all steps.
fn step_estimate(steps: &[WorkflowStep]) -> Option<Estimate> {
    let done = steps.iter().filter(|s| s.step_status.is_done()).count();
    Estimate::from_ratio(done as f64, steps.len() as f64)
}

/// Completed tasks plus the running task's own fraction, over all tasks.
fn task_estimate(tasks: &[JobTask]) -> Option<Estimate> {
    if tasks.is_empty() {
        return None;
    }
    let completed = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .count();
    let running_fraction = tasks
        .iter()
        .find(|t| t.status == TaskStatus::Running)
        .and_then(|t| t.progress)
        .filter(|p| p.is_finite())
        .map(|p| (p / 100.0).clamp(0.0, 1.0))
        .unwrap_or(0.0);

    Some(Estimate {
        percent: ratio_percent(completed as f64 + running_fraction, tasks.len() as f64),
        completed: completed as u64,
        total: tasks.len() as u64,
    })
}
