// crates/client/src/lib.rs
//! HTTP collaborators for the progress coordinator.
//!
//! Implements the coordinator's [`JobInitiator`] and [`StatusProbe`] seams
//! against the annual-report ingestion backend.
//!
//! [`JobInitiator`]: reportlens_coordinator::JobInitiator
//! [`StatusProbe`]: reportlens_coordinator::StatusProbe

pub mod api;
pub mod error;

pub use api::ApiClient;
pub use error::ClientError;
