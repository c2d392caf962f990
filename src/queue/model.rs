//! Task data model — parameters, status state machine, and API view types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TaskError;

/// Caller-supplied progression parameters. Immutable once the task exists.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TaskParameters {
    /// Total progression length (number of elements, including the seed).
    pub n: i64,
    /// Per-step delta.
    pub d: f64,
    /// Seed (first) value.
    pub n1: f64,
    /// Minimum seconds between consecutive steps.
    pub i: f64,
    /// Seconds a completed result stays visible before expiry.
    pub ttl: f64,
}

/// Upper bound for the `i` and `ttl` parameters, in seconds (one year).
/// Keeps every admitted duration representable as a `std::time::Duration`.
pub const MAX_SECONDS: f64 = 31_536_000.0;

impl TaskParameters {
    /// Validate parameters at the admission boundary. No task is ever
    /// created for a rejected submission.
    pub fn validate(&self) -> Result<(), TaskError> {
        if self.n < 1 {
            return Err(TaskError::InvalidParameter {
                name: "n",
                reason: "must be >= 1".to_string(),
            });
        }
        if !self.i.is_finite() || self.i < 0.0 || self.i > MAX_SECONDS {
            return Err(TaskError::InvalidParameter {
                name: "i",
                reason: format!("must be a finite number in 0..={MAX_SECONDS}"),
            });
        }
        if !self.ttl.is_finite() || self.ttl < 0.0 || self.ttl > MAX_SECONDS {
            return Err(TaskError::InvalidParameter {
                name: "ttl",
                reason: format!("must be a finite number in 0..={MAX_SECONDS}"),
            });
        }
        if !self.d.is_finite() {
            return Err(TaskError::InvalidParameter {
                name: "d",
                reason: "must be a finite number".to_string(),
            });
        }
        if !self.n1.is_finite() {
            return Err(TaskError::InvalidParameter {
                name: "n1",
                reason: "must be a finite number".to_string(),
            });
        }
        Ok(())
    }
}

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Admitted, waiting for a worker.
    Queued,
    /// Owned by exactly one worker and stepping.
    Running,
    /// All `n` elements computed.
    Completed,
    /// Completed more than `ttl` seconds ago (promoted lazily on listing).
    Expired,
}

impl TaskStatus {
    /// Transitions are monotonic and one-directional; none ever reverses.
    pub fn can_transition_to(&self, target: TaskStatus) -> bool {
        use TaskStatus::*;

        matches!(
            (self, target),
            (Queued, Running) | (Running, Completed) | (Completed, Expired)
        )
    }

    /// The progression itself is finished (result computed, visible or not).
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Expired)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Expired => "expired",
        };
        write!(f, "{s}")
    }
}

/// One progression job plus its full execution state.
///
/// The [`TaskStore`](super::store::TaskStore) holds the authoritative copy.
/// While Running, exactly one worker owns a private snapshot and publishes
/// every mutation back through `TaskStore::apply_update`.
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    /// Queue position — unique, monotonically increasing, never reused.
    pub id: u64,
    /// Original submission parameters.
    pub params: TaskParameters,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// 0-based count of steps executed so far.
    pub current_iteration: i64,
    /// Last computed value, seeded to `n1`.
    pub current_value: f64,
    /// When the task was admitted.
    pub time_placed: DateTime<Utc>,
    /// When a worker picked the task up. Set exactly once.
    pub time_start: Option<DateTime<Utc>>,
    /// When the last element was computed. Set exactly once.
    pub time_end: Option<DateTime<Utc>>,
    /// Moment the previous step was taken; anchors interval pacing.
    pub last_step_at: DateTime<Utc>,
    /// Every computed element in order, seeded with `[n1]`.
    ///
    /// Invariant: `results.len() == current_iteration + 1` at all times.
    pub results: Vec<f64>,
}

impl Task {
    /// Create a Queued task seeded with the first element.
    pub fn new(id: u64, params: TaskParameters) -> Self {
        let now = Utc::now();
        Self {
            id,
            params,
            status: TaskStatus::Queued,
            current_iteration: 0,
            current_value: params.n1,
            time_placed: now,
            time_start: None,
            time_end: None,
            last_step_at: now,
            results: vec![params.n1],
        }
    }

    /// Queued → Running. Records `time_start`. No-op if already past Queued.
    pub(crate) fn begin(&mut self) {
        if self.status.can_transition_to(TaskStatus::Running) {
            self.status = TaskStatus::Running;
            self.time_start = Some(Utc::now());
        }
    }

    /// Running → Completed. Records `time_end`.
    pub(crate) fn complete(&mut self) {
        if self.status.can_transition_to(TaskStatus::Completed) {
            self.status = TaskStatus::Completed;
            self.time_end = Some(Utc::now());
        }
    }

    /// Completed → Expired. Only the store's listing path calls this.
    pub(crate) fn expire(&mut self) {
        if self.status.can_transition_to(TaskStatus::Expired) {
            self.status = TaskStatus::Expired;
        }
    }

    /// Whether a Completed result has outlived its ttl at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match (self.status, self.time_end) {
            (TaskStatus::Completed, Some(end)) => {
                (now - end).as_seconds_f64() > self.params.ttl
            }
            _ => false,
        }
    }

    /// All `n` elements are present; nothing left to step.
    pub fn has_all_elements(&self) -> bool {
        self.current_iteration >= self.params.n - 1
    }
}

/// External task representation returned by the query boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskView {
    pub id: u64,
    pub status: TaskStatus,
    pub n: i64,
    pub d: f64,
    pub n1: f64,
    pub i: f64,
    pub ttl: f64,
    /// Reported as `n` once the task is finished, regardless of the
    /// internal 0-based counter. Display normalization only.
    pub current_iteration: i64,
    pub time_placed: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_end: Option<DateTime<Utc>>,
    pub current_value: f64,
}

impl From<&Task> for TaskView {
    fn from(task: &Task) -> Self {
        let current_iteration = if task.status.is_finished() {
            task.params.n
        } else {
            task.current_iteration
        };

        Self {
            id: task.id,
            status: task.status,
            n: task.params.n,
            d: task.params.d,
            n1: task.params.n1,
            i: task.params.i,
            ttl: task.params.ttl,
            current_iteration,
            time_placed: task.time_placed,
            time_start: task.time_start,
            time_end: task.time_end,
            current_value: task.current_value,
        }
    }
}
