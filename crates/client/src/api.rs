// crates/client/src/api.rs
//! HTTP client for the ingestion backend's upload and status endpoints.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use reportlens_coordinator::{
    IngestStatus, InitiateError, JobInitiator, JobKey, ProbeError, StatusProbe, Submission,
};

use crate::error::ClientError;

/// The status string the backend reports once ingestion has finished.
const READY_SENTINEL: &str = "ready";

/// Client for the two collaborator endpoints the coordinator consumes.
///
/// One instance serves both seams: [`JobInitiator`] via the multipart upload
/// and [`StatusProbe`] via the per-company status endpoint.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    /// The backend re-detects the company from the document; this is the
    /// polling key, which may differ from the hint we sent.
    company_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
}

impl ApiClient {
    /// `base_url` without a trailing slash, e.g. `http://localhost:8000`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let base_url = base_url.into();
        let http = reqwest::Client::builder().build().map_err(|source| {
            ClientError::Transport {
                url: base_url.clone(),
                source,
            }
        })?;
        Ok(Self { http, base_url })
    }

    /// Upload a report and return the detected company key.
    pub async fn upload(&self, submission: &Submission) -> Result<JobKey, ClientError> {
        let url = format!("{}/api/v1/upload", self.base_url);
        let form = Form::new()
            .part(
                "file",
                Part::bytes(submission.bytes.clone()).file_name(submission.file_name.clone()),
            )
            .text("company_id", submission.company_hint.clone())
            .text("period", submission.period.clone());

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Http {
                url,
                status: status.as_u16(),
                body,
            });
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|source| ClientError::Decode {
                url: url.clone(),
                source,
            })?;

        let key = body.company_id.ok_or(ClientError::MissingKey)?;
        tracing::debug!(company = %key, "upload accepted; backend processing in background");
        Ok(JobKey::new(key))
    }

    /// One status check for a company's in-flight ingestion.
    pub async fn status(&self, key: &JobKey) -> Result<IngestStatus, ClientError> {
        let url = format!("{}/api/v1/company/{}/status", self.base_url, key);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Http {
                url,
                status: status.as_u16(),
                body,
            });
        }

        let body: StatusResponse = response
            .json()
            .await
            .map_err(|source| ClientError::Decode {
                url: url.clone(),
                source,
            })?;

        Ok(match body.status.as_str() {
            READY_SENTINEL => IngestStatus::Ready,
            "processing" => IngestStatus::Processing,
            other => IngestStatus::Unknown(other.to_string()),
        })
    }
}

#[async_trait]
impl JobInitiator for ApiClient {
    async fn initiate(&self, submission: Submission) -> Result<JobKey, InitiateError> {
        self.upload(&submission)
            .await
            .map_err(ClientError::into_initiate)
    }
}

#[async_trait]
impl StatusProbe for ApiClient {
    async fn check(&self, key: &JobKey) -> Result<IngestStatus, ProbeError> {
        self.status(key).await.map_err(ClientError::into_probe)
    }
}
