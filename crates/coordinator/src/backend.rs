// crates/coordinator/src/backend.rs
//! Contracts for the ingestion backend collaborators.
//!
//! The coordinator never talks HTTP itself; it drives these two seams. The
//! `reportlens-client` crate provides the real implementations.

use async_trait::async_trait;

use crate::error::{InitiateError, ProbeError};
use crate::phase::JobKey;

/// A document handed to the upload collaborator.
#[derive(Debug, Clone)]
pub struct Submission {
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// Fallback identifier if the backend cannot detect the company from the
    /// document itself.
    pub company_hint: String,
    /// Reporting period, e.g. "FY25".
    pub period: String,
}

/// Status reported by the backend for an in-flight ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestStatus {
    /// The ready sentinel: ingestion finished, the dashboard can load.
    Ready,
    Processing,
    /// Any status string the client does not recognize. Treated as
    /// "not yet ready".
    Unknown(String),
}

/// Starts the long-running backend job and returns the polling key.
#[async_trait]
pub trait JobInitiator: Send + Sync + 'static {
    async fn initiate(&self, submission: Submission) -> Result<JobKey, InitiateError>;
}

/// One status check against the backend for a given job key.
#[async_trait]
pub trait StatusProbe: Send + Sync + 'static {
    async fn check(&self, key: &JobKey) -> Result<IngestStatus, ProbeError>;
}

#[async_trait]
impl<T: StatusProbe> StatusProbe for std::sync::Arc<T> {
    async fn check(&self, key: &JobKey) -> Result<IngestStatus, ProbeError> {
        (**self).check(key).await
    }
}
