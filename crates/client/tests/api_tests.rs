// crates/client/tests/api_tests.rs
//! Wiremock tests for the upload and status endpoints, plus one end-to-end
//! run of the coordinator against a mock backend.

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use reportlens_client::{ApiClient, ClientError};
use reportlens_coordinator::{
    Coordinator, CoordinatorConfig, CoordinatorEvent, IngestStatus, JobInitiator, JobKey, Phase,
    ProbeError, StatusProbe, Submission,
};

fn submission() -> Submission {
    Submission {
        file_name: "acme-fy25.pdf".to_string(),
        bytes: b"%PDF-1.7 acme annual report".to_vec(),
        company_hint: "ACME".to_string(),
        period: "FY25".to_string(),
    }
}

#[tokio::test]
async fn upload_sends_multipart_fields_and_returns_detected_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/upload"))
        .and(body_string_contains("acme-fy25.pdf"))
        .and(body_string_contains("company_id"))
        .and(body_string_contains("ACME"))
        .and(body_string_contains("FY25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "File uploaded. Processing in background.",
            "company_id": "TATAMOTORS",
            "path": "uploads/TATAMOTORS/acme-fy25.pdf"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri()).unwrap();
    let key = client.upload(&submission()).await.unwrap();
    // The backend's detected company wins over the hint.
    assert_eq!(key, JobKey::new("TATAMOTORS"));
}

#[tokio::test]
async fn upload_rejection_carries_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/upload"))
        .respond_with(
            ResponseTemplate::new(400).set_body_string("could not identify the company"),
        )
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri()).unwrap();
    let err = client.upload(&submission()).await.unwrap_err();
    match err {
        ClientError::Http { status, body, .. } => {
            assert_eq!(status, 400);
            assert!(body.contains("identify"));
        }
        other => panic!("expected Http error, got {other:?}"),
    }
}

#[tokio::test]
async fn upload_without_company_id_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "File uploaded."
        })))
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri()).unwrap();
    let err = client.upload(&submission()).await.unwrap_err();
    assert!(matches!(err, ClientError::MissingKey));
}

#[tokio::test]
async fn status_maps_the_ready_sentinel_and_everything_else() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/company/READY/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ready", "company_id": "READY"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/company/BUSY/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "processing", "company_id": "BUSY"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/company/ODD/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "queued", "company_id": "ODD"
        })))
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri()).unwrap();
    assert_eq!(
        client.status(&JobKey::new("READY")).await.unwrap(),
        IngestStatus::Ready
    );
    assert_eq!(
        client.status(&JobKey::new("BUSY")).await.unwrap(),
        IngestStatus::Processing
    );
    assert_eq!(
        client.status(&JobKey::new("ODD")).await.unwrap(),
        IngestStatus::Unknown("queued".to_string())
    );
}

#[tokio::test]
async fn status_decode_failure_is_reported_as_decode() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/company/ACME/status"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri()).unwrap();
    let err = client.status(&JobKey::new("ACME")).await.unwrap_err();
    assert!(matches!(err, ClientError::Decode { .. }));
    // And through the coordinator seam it stays a decode failure.
    let probe_err = client.check(&JobKey::new("ACME")).await.unwrap_err();
    assert!(matches!(probe_err, ProbeError::Decode { .. }));
}

#[tokio::test]
async fn connection_refused_is_a_transport_error() {
    // Nothing listens on port 1.
    let client = ApiClient::new("http://127.0.0.1:1").unwrap();
    let err = client.status(&JobKey::new("ACME")).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport { .. }));
    let err = client.initiate(submission()).await.unwrap_err();
    assert!(matches!(
        err,
        reportlens_coordinator::InitiateError::Transport { .. }
    ));
}

/// Full run against a mock backend: upload, two "processing" polls, "ready",
/// converge, settle, complete. Real time, compressed cadences.
#[tokio::test]
async fn coordinator_completes_against_mock_backend() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "ok", "company_id": "ACME", "path": "uploads/ACME/r.pdf"
        })))
        .mount(&server)
        .await;
    // First two polls report processing, then the backend is ready.
    Mock::given(method("GET"))
        .and(path("/api/v1/company/ACME/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "processing", "company_id": "ACME"
        })))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/company/ACME/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ready", "company_id": "ACME"
        })))
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri()).unwrap();
    let cfg = CoordinatorConfig {
        tick_interval: Duration::from_millis(5),
        poll_interval: Duration::from_millis(20),
        finish_interval: Duration::from_millis(2),
        settle_delay: Duration::from_millis(10),
        ..CoordinatorConfig::default()
    };
    let handle = Coordinator::spawn(client.clone(), client, cfg);
    let mut events = handle.events();

    let key = handle.start_job(submission()).await.unwrap();
    assert_eq!(key, JobKey::new("ACME"));

    let completed = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match events.recv().await.expect("event channel closed") {
                CoordinatorEvent::Completed { job, .. } => break job,
                CoordinatorEvent::PollAttemptFailed { error, .. } => {
                    panic!("unexpected poll failure: {error}")
                }
            }
        }
    })
    .await
    .expect("coordinator did not complete in time");

    assert_eq!(completed, JobKey::new("ACME"));
    let snap = handle.snapshot();
    assert_eq!(snap.phase, Phase::Idle);
    assert_eq!(snap.percent, 0.0);
}
