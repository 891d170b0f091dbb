#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body, Bytes},
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use complaint_service::config::ComplaintConfig;
use complaint_service::services::{
    CaptionProvider, InMemoryStore, LocalStorage, MockCaptioner, RecordStore,
};
use complaint_service::{build_router, AppState};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower::util::ServiceExt;
use uuid::Uuid;

pub const TEST_CAPTION: &str = "a cracked window on a train coach";
pub const ALLOWED_ORIGIN: &str = "http://localhost:3000";
const BOUNDARY: &str = "complaint-test-boundary";

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("Response body is not JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub captioner: Arc<MockCaptioner>,
    pub storage_path: PathBuf,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}, MockCaptioner::new(TEST_CAPTION)).await
    }

    pub async fn spawn_with(
        configure: impl FnOnce(&mut ComplaintConfig),
        captioner: MockCaptioner,
    ) -> Self {
        let storage_path = temp_storage_path();
        let mut config = ComplaintConfig::local(storage_path.to_string_lossy().to_string());
        configure(&mut config);

        let store = Arc::new(InMemoryStore::new());
        let captioner = Arc::new(captioner);
        let router = router_with(&storage_path, config, store.clone(), captioner.clone()).await;

        TestApp {
            router,
            store,
            captioner,
            storage_path,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        send(&self.router, request).await
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn submit(&self, parts: &[FormPart]) -> TestResponse {
        self.send(submit_request(parts)).await
    }

    pub async fn patch_status(&self, body: serde_json::Value) -> TestResponse {
        self.send(
            Request::builder()
                .method("PATCH")
                .uri("/admin/status")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Number of objects written under the storage root.
    pub fn stored_object_count(&self) -> usize {
        std::fs::read_dir(self.storage_path.join("images"))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    pub async fn cleanup(&self) {
        let _ = tokio::fs::remove_dir_all(&self.storage_path).await;
    }
}

pub fn temp_storage_path() -> PathBuf {
    std::env::temp_dir().join(format!("complaint-test-{}", Uuid::new_v4()))
}

/// Router over local storage at `storage_path` and the given collaborators.
pub async fn router_with(
    storage_path: &Path,
    config: ComplaintConfig,
    store: Arc<dyn RecordStore>,
    captioner: Arc<dyn CaptionProvider>,
) -> Router {
    let storage = LocalStorage::new(
        storage_path,
        config.storage.public_base_url.clone(),
        config.storage.signing_secret.clone(),
    )
    .await
    .expect("Failed to create local storage");

    let state = AppState {
        config,
        store,
        storage: Arc::new(storage),
        captioner,
    };

    build_router(state).expect("Failed to build router")
}

pub async fn send(router: &Router, request: Request<Body>) -> TestResponse {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("Failed to execute request");

    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");

    TestResponse {
        status,
        headers,
        body,
    }
}

pub struct FormPart {
    pub name: &'static str,
    pub file_name: Option<&'static str>,
    pub content_type: Option<&'static str>,
    pub data: Vec<u8>,
}

impl FormPart {
    pub fn text(name: &'static str, value: &str) -> Self {
        Self {
            name,
            file_name: None,
            content_type: None,
            data: value.as_bytes().to_vec(),
        }
    }

    pub fn image(file_name: &'static str, data: Vec<u8>) -> Self {
        Self {
            name: "image",
            file_name: Some(file_name),
            content_type: Some("image/png"),
            data,
        }
    }

    pub fn image_with_type(
        file_name: &'static str,
        content_type: &'static str,
        data: Vec<u8>,
    ) -> Self {
        Self {
            name: "image",
            file_name: Some(file_name),
            content_type: Some(content_type),
            data,
        }
    }
}

pub fn submit_request(parts: &[FormPart]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
        if let Some(file_name) = part.file_name {
            disposition.push_str(&format!("; filename=\"{}\"", file_name));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(content_type) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(&part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/submit")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn png_bytes() -> Vec<u8> {
    vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3, 4]
}

pub fn complete_submission(pnr: &str, subject: &str) -> Vec<FormPart> {
    vec![
        FormPart::text("pnr", pnr),
        FormPart::text("subject", subject),
        FormPart::image("coach.png", png_bytes()),
    ]
}
