// crates/coordinator/src/lib.rs
//! Progress–polling coordinator for long-running document ingestion.
//!
//! The backend exposes no incremental progress signal — only a binary
//! "not ready / ready" status behind a poll. This crate fabricates a
//! monotonically increasing, asymptotically slowing progress value while the
//! job runs, polls for true completion, closes the gap to 100 with a fast
//! deterministic finish once ready, and signals the host exactly once after a
//! short settle delay.
//!
//! One coordinator manages exactly one in-flight job at a time; spawn one per
//! job stream.

pub mod backend;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod phase;

mod clock;
mod poller;
mod sequencer;

pub use backend::{IngestStatus, JobInitiator, StatusProbe, Submission};
pub use config::CoordinatorConfig;
pub use coordinator::{Coordinator, CoordinatorHandle};
pub use error::{BoxError, CoordinatorError, InitiateError, ProbeError};
pub use phase::{CoordinatorEvent, JobKey, Phase, ProgressSnapshot};
