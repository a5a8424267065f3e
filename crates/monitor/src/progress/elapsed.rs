use chrono::{DateTime, Utc};

use jobpulse_core::Job;

/// Time since the job started (or was created, if it never started).
pub fn elapsed_since(job: &Job, now: DateTime<Utc>) -> chrono::Duration {
    let start = job.started_at.unwrap_or(job.created_at);
    (now - start).max(chrono::Duration::zero())
}

/// `Xm Ys`, or `Ys` under a minute.
pub fn format_elapsed(elapsed: chrono::Duration) -> String {
    let total = elapsed.num_seconds().max(0);
    let (minutes, seconds) = (total / 60, total % 60);
    if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}
