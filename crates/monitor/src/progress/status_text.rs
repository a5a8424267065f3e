//! The one-line "what is it doing right now" text for a job.

use serde_json::{Map, Value};

use jobpulse_core::{Job, JobStatus, JobTask, StepStatus, TaskStatus, WorkflowStep};

use crate::display::title_case;

/// Keys under which executors embed a queue of sub-operations.
const SUB_OPERATION_KEYS: &[&str] = &["job_queue", "sub_jobs"];

/// Resolve the status line, in priority order:
/// running sub-operation, running workflow step, last line of the running
/// task's log, status placeholder.
pub fn resolve(job: &Job, steps: &[WorkflowStep], tasks: &[JobTask]) -> String {
    job.details_map()
        .and_then(running_sub_operation)
        .or_else(|| running_step_name(steps))
        .or_else(|| running_task_log_line(tasks))
        .unwrap_or_else(|| placeholder(job.status))
}

fn running_sub_operation(details: &Map<String, Value>) -> Option<String> {
    SUB_OPERATION_KEYS
        .iter()
        .filter_map(|key| details.get(*key).and_then(Value::as_array))
        .flatten()
        .filter_map(Value::as_object)
        .find(|item| is_running(item))
        .map(describe_sub_operation)
}

fn is_running(item: &Map<String, Value>) -> bool {
    ["state", "status", "job_state"]
        .iter()
        .filter_map(|key| item.get(*key).and_then(Value::as_str))
        .any(|state| state.eq_ignore_ascii_case("running"))
}

fn describe_sub_operation(item: &Map<String, Value>) -> String {
    let name = ["name", "message", "id"]
        .iter()
        .filter_map(|key| item.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or("Sub-operation");

    let percent = ["percent", "percent_complete"]
        .iter()
        .find_map(|key| item.get(*key).and_then(Value::as_f64));

    match percent {
        Some(p) => format!("{name} ({}%)", super::heuristics::clamp_percent(p)),
        None => name.to_string(),
    }
}

fn running_step_name(steps: &[WorkflowStep]) -> Option<String> {
    steps
        .iter()
        .find(|s| s.step_status == StepStatus::Running)
        .map(|s| title_case(&s.step_name))
        .filter(|name| !name.is_empty())
}

fn running_task_log_line(tasks: &[JobTask]) -> Option<String> {
    tasks
        .iter()
        .find(|t| t.status == TaskStatus::Running)
        .and_then(JobTask::last_log_line)
        .map(str::to_string)
}

fn placeholder(status: JobStatus) -> String {
    match status {
        JobStatus::Pending => "Queued".to_string(),
        JobStatus::Running => "Starting...".to_string(),
        terminal => terminal.label().to_string(),
    }
}
