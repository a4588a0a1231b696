// crates/coordinator/src/error.rs
//! Error types for the coordinator and its collaborator seams.

use thiserror::Error;

use crate::phase::Phase;

/// Boxed source for transport-level failures reported by collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure to initiate the underlying job.
///
/// Surfaced synchronously from `start_job`; the coordinator never leaves Idle
/// and no timer is ever started.
#[derive(Debug, Error)]
pub enum InitiateError {
    /// The backend refused the submission (bad request, unidentifiable
    /// document, unsupported format).
    #[error("submission rejected: {reason}")]
    Rejected { reason: String },

    /// The upload never reached the backend, or its response was unreadable.
    #[error("upload transport failure: {source}")]
    Transport {
        #[source]
        source: BoxError,
    },
}

/// Failure of a single status probe attempt.
///
/// Never fatal: the poller reports it for observability and the next
/// scheduled attempt proceeds normally.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("status endpoint returned HTTP {status}")]
    BadStatus { status: u16 },

    #[error("status probe transport failure: {source}")]
    Transport {
        #[source]
        source: BoxError,
    },

    #[error("status body could not be decoded: {source}")]
    Decode {
        #[source]
        source: BoxError,
    },
}

/// Errors reported to callers of the coordinator's public operations.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// `start_job` called while a job is already in flight. Rejected without
    /// side effects; the in-flight job is untouched.
    #[error("cannot start a job while the coordinator is {phase:?}")]
    InvalidTransition { phase: Phase },

    /// The upload collaborator reported failure; the coordinator stayed Idle.
    #[error("job initiation failed: {0}")]
    Initiation(#[from] InitiateError),

    /// The coordinator task has shut down (all handles were dropped).
    #[error("coordinator is no longer running")]
    Closed,
}
