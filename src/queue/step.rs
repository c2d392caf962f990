//! Step executor — rate-limited progression engine.
//!
//! Advances a Running task by exactly one element per call. Pacing is
//! anchored to the wall-clock moment the previous step was actually taken,
//! so a delayed process neither drifts nor bursts to catch up.

use std::time::Duration;

use chrono::Utc;
use tracing::debug;

use super::model::{Task, TaskStatus};

/// Execute one progression step for `task`, sleeping first if the pacing
/// interval `i` has not yet elapsed since the previous step. The sleep
/// occupies the calling worker's slot.
///
/// No-op unless the task is Running.
///
/// A task whose results already hold all `n` elements completes without
/// stepping. This resolves the `n = 1` case: the seed alone is the full
/// progression, so such a task goes Running → Completed with zero steps,
/// `results == [n1]`, and no pacing wait.
pub async fn execute_step(task: &mut Task) {
    if task.status != TaskStatus::Running {
        return;
    }

    if task.has_all_elements() {
        task.complete();
        return;
    }

    // Admission caps `i`, so this only falls back for tasks built outside
    // the validated path; an unrepresentable interval means no wait.
    let required = Duration::try_from_secs_f64(task.params.i).unwrap_or(Duration::ZERO);
    let elapsed = (Utc::now() - task.last_step_at)
        .to_std()
        .unwrap_or(Duration::ZERO);

    if elapsed < required {
        let wait = required - elapsed;
        debug!(task_id = task.id, wait_ms = wait.as_millis() as u64, "Pacing wait");
        tokio::time::sleep(wait).await;
    }

    // Anchor the next interval to the moment this step is taken, not the
    // moment it was due.
    task.last_step_at = Utc::now();

    // Constant-delta progression: each element derives only from the
    // previous value, never from elapsed time or the iteration count.
    let new_value = task.current_value + task.params.d;
    task.current_value = new_value;
    task.current_iteration += 1;
    task.results.push(new_value);

    debug!(
        task_id = task.id,
        iteration = task.current_iteration,
        total = task.params.n,
        value = new_value,
        "Step executed"
    );

    if task.has_all_elements() {
        task.complete();
    }
}
