// crates/coordinator/src/phase.rs
//! Phases, snapshots, and host-facing events of the coordinator.

use serde::{Deserialize, Serialize};

/// Which phase the coordinator is currently in.
///
/// Exactly one phase is active at any instant, and the phase is the sole
/// authority on which timers may legally be running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No job in flight; progress is 0.
    Idle,
    /// Simulated climb toward the cap while the backend works.
    Running,
    /// Backend reported ready; fast climb closing the gap to 100.
    Converging,
    /// Job fully complete; transient, the coordinator returns to Idle
    /// immediately after signaling the host.
    Complete,
}

/// Opaque polling key returned by the upload collaborator.
///
/// For the annual-report backend this is the detected company ticker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobKey(String);

impl JobKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Read-only view of the coordinator published on every change, suitable for
/// driving a progress bar and a textual percentage.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub phase: Phase,
    /// Current progress in [0, 100]. Non-decreasing for the lifetime of a
    /// single job.
    pub percent: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<JobKey>,
}

impl ProgressSnapshot {
    pub(crate) fn idle() -> Self {
        Self {
            phase: Phase::Idle,
            percent: 0.0,
            job: None,
        }
    }
}

/// Events broadcast to the host.
///
/// `Completed` fires exactly once per job. `PollAttemptFailed` is the
/// diagnostic channel for transient probe failures; it never implies the job
/// stopped.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum CoordinatorEvent {
    Completed {
        job: JobKey,
        timestamp: String,
    },
    PollAttemptFailed {
        job: JobKey,
        attempt: u64,
        error: String,
        timestamp: String,
    },
}

pub(crate) fn rfc3339_now() -> String {
    chrono::Utc::now().to_rfc3339()
}
