// crates/client/src/error.rs
//! Error types for the ingestion backend HTTP client.

use reportlens_coordinator::{InitiateError, ProbeError};
use thiserror::Error;

/// Errors from one request against the ingestion backend.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a response (connect, TLS, timeout).
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The backend answered with a non-success status.
    #[error("{url} returned HTTP {status}: {body}")]
    Http {
        url: String,
        status: u16,
        body: String,
    },

    /// The response body was not the expected JSON.
    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The upload was accepted but the backend returned no polling key.
    #[error("upload accepted but no company id was returned")]
    MissingKey,
}

impl ClientError {
    /// Map into the coordinator's initiation-failure taxonomy.
    pub(crate) fn into_initiate(self) -> InitiateError {
        match self {
            Self::Http { status, body, .. } => InitiateError::Rejected {
                reason: format!("HTTP {status}: {body}"),
            },
            Self::MissingKey => InitiateError::Rejected {
                reason: "upload accepted but no company id was returned".to_string(),
            },
            other => InitiateError::Transport {
                source: Box::new(other),
            },
        }
    }

    /// Map into the coordinator's probe-failure taxonomy.
    pub(crate) fn into_probe(self) -> ProbeError {
        match self {
            Self::Http { status, .. } => ProbeError::BadStatus { status },
            decode @ Self::Decode { .. } => ProbeError::Decode {
                source: Box::new(decode),
            },
            other => ProbeError::Transport {
                source: Box::new(other),
            },
        }
    }
}
