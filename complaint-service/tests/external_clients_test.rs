mod common;

use axum::{
    body::{to_bytes, Bytes},
    extract::Request,
    http::{header, HeaderMap, Method, StatusCode},
    Router,
};
use common::{complete_submission, router_with, send, temp_storage_path};
use complaint_service::config::ComplaintConfig;
use complaint_service::services::{
    CaptionProvider, GcsStorage, GcsUrlSigner, HuggingFaceCaptioner, HuggingFaceConfig,
    InMemoryStore, Storage,
};
use secrecy::Secret;
use service_core::error::{AppError, ExternalServiceError};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

const TEST_KEY: &str = include_str!("fixtures/gcs_test_key.pem");

#[derive(Debug, Clone)]
struct RecordedRequest {
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Bytes,
}

/// HTTP server on an ephemeral port that records every request and answers
/// each with the same canned response.
struct StubServer {
    base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubServer {
    async fn spawn(status: StatusCode, content_type: &'static str, body: &'static [u8]) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = requests.clone();

        let app = Router::new().fallback(move |request: Request| {
            let recorded = recorded.clone();
            async move {
                let (parts, incoming) = request.into_parts();
                let bytes = to_bytes(incoming, usize::MAX).await.unwrap_or_default();
                recorded.lock().unwrap().push(RecordedRequest {
                    method: parts.method,
                    path: parts.uri.path().to_string(),
                    query: parts.uri.query().map(str::to_string),
                    headers: parts.headers,
                    body: bytes,
                });
                (status, [(header::CONTENT_TYPE, content_type)], body)
            }
        });

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind stub listener");
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            requests,
        }
    }

    fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn captioner_for(stub: &StubServer) -> HuggingFaceCaptioner {
    HuggingFaceCaptioner::new(HuggingFaceConfig {
        api_url: format!("{}/models/blip", stub.base_url),
        api_key: Secret::new("hf_test_key".to_string()),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

fn gcs_for(stub: &StubServer) -> GcsStorage {
    let signer =
        GcsUrlSigner::from_pem("uploader@project.iam.gserviceaccount.com", TEST_KEY).unwrap();
    GcsStorage::new(
        "complaints-bucket".to_string(),
        Secret::new("gcs-token".to_string()),
        signer,
    )
    .with_base_url(&stub.base_url)
}

#[tokio::test]
async fn captioner_posts_raw_image_with_bearer_key() {
    let stub = StubServer::spawn(
        StatusCode::OK,
        "application/json",
        br#"[{"generated_text":"a torn seat cover"}]"#,
    )
    .await;

    let caption = captioner_for(&stub).caption(&[7, 8, 9]).await.unwrap();

    assert_eq!(caption, "a torn seat cover");
    let requests = stub.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.path, "/models/blip");
    assert_eq!(
        request.headers.get(header::AUTHORIZATION).unwrap(),
        "Bearer hf_test_key"
    );
    assert_eq!(
        request.headers.get(header::CONTENT_TYPE).unwrap(),
        "application/octet-stream"
    );
    assert_eq!(request.body.to_vec(), vec![7, 8, 9]);
}

#[tokio::test]
async fn captioner_error_status_is_an_inference_error() {
    let stub = StubServer::spawn(
        StatusCode::SERVICE_UNAVAILABLE,
        "application/json",
        br#"{"error":"Model is currently loading"}"#,
    )
    .await;

    let err = captioner_for(&stub).caption(&[1]).await.unwrap_err();

    match err {
        ExternalServiceError::Inference(message) => {
            assert!(message.contains("503"));
            assert!(message.contains("Model is currently loading"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn captioner_rejects_unexpected_success_body() {
    let stub = StubServer::spawn(StatusCode::OK, "application/json", br#"{"label":"train"}"#).await;

    let err = captioner_for(&stub).caption(&[1]).await.unwrap_err();

    assert!(matches!(err, ExternalServiceError::InferenceFormat(_)));
}

#[tokio::test]
async fn failed_inference_makes_submit_return_500() {
    let stub = StubServer::spawn(StatusCode::BAD_GATEWAY, "text/plain", b"upstream down").await;
    let storage_path = temp_storage_path();
    let store = Arc::new(InMemoryStore::new());
    let router = router_with(
        &storage_path,
        ComplaintConfig::local(storage_path.to_string_lossy().to_string()),
        store.clone(),
        Arc::new(captioner_for(&stub)),
    )
    .await;

    let response = send(&router, common::submit_request(&complete_submission("PNR1", "x"))).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json()["error"], "Internal server error");
    assert_eq!(store.pnr_count().await, 0);
    assert_eq!(stub.requests().len(), 1);
    let _ = tokio::fs::remove_dir_all(&storage_path).await;
}

#[tokio::test]
async fn gcs_upload_uses_media_upload_with_bearer_token() {
    let stub = StubServer::spawn(StatusCode::OK, "application/json", b"{}").await;

    gcs_for(&stub)
        .upload("images/1-a.png", vec![1, 2, 3], "image/png")
        .await
        .unwrap();

    let requests = stub.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.path, "/upload/storage/v1/b/complaints-bucket/o");
    assert_eq!(
        request.query.as_deref(),
        Some("uploadType=media&name=images%2F1-a.png")
    );
    assert_eq!(
        request.headers.get(header::AUTHORIZATION).unwrap(),
        "Bearer gcs-token"
    );
    assert_eq!(
        request.headers.get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );
    assert_eq!(request.body.to_vec(), vec![1, 2, 3]);
}

#[tokio::test]
async fn gcs_upload_error_status_is_a_storage_error() {
    let stub = StubServer::spawn(StatusCode::FORBIDDEN, "application/json", b"{}").await;

    let err = gcs_for(&stub)
        .upload("images/1-a.png", vec![1], "image/png")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::ExternalService(ExternalServiceError::Storage(_))
    ));
}

#[tokio::test]
async fn gcs_download_returns_bytes_and_served_content_type() {
    let stub = StubServer::spawn(StatusCode::OK, "image/webp", b"webp-bytes").await;

    let object = gcs_for(&stub).download("images/1-a").await.unwrap();

    assert_eq!(object.data, b"webp-bytes".to_vec());
    assert_eq!(object.content_type, "image/webp");
    let request = &stub.requests()[0];
    assert_eq!(request.method, Method::GET);
    assert_eq!(request.path, "/storage/v1/b/complaints-bucket/o/images%2F1-a");
    assert_eq!(request.query.as_deref(), Some("alt=media"));
    assert_eq!(
        request.headers.get(header::AUTHORIZATION).unwrap(),
        "Bearer gcs-token"
    );
}

#[tokio::test]
async fn gcs_download_of_missing_object_is_not_found() {
    let stub = StubServer::spawn(StatusCode::NOT_FOUND, "application/json", b"{}").await;

    let err = gcs_for(&stub).download("images/1-a.png").await.unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn gcs_retrieval_url_is_signed_against_configured_endpoint() {
    let stub = StubServer::spawn(StatusCode::OK, "application/json", b"{}").await;

    let url = gcs_for(&stub).retrieval_url("images/1-a.png").unwrap();

    assert!(url.starts_with(&format!(
        "{}/complaints-bucket/images/1-a.png?GoogleAccessId=",
        stub.base_url
    )));
    assert!(url.contains("&Expires=16730323200&Signature="));
    assert!(stub.requests().is_empty());
}
