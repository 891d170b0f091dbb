//! Object storage for complaint images.
//!
//! Two backends: the local filesystem (retrieval URLs are HMAC-signed links
//! served by this service) and Google Cloud Storage (V2 signed URLs).

pub mod gcs;
pub mod local;

pub use gcs::{GcsStorage, GcsUrlSigner};
pub use local::LocalStorage;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use service_core::error::AppError;
use std::path::Path;

/// Expiry stamped on retrieval URLs: 2500-03-01T00:00:00Z, effectively never.
pub fn permanent_url_expiry() -> i64 {
    Utc.with_ymd_and_hms(2500, 3, 1, 0, 0, 0)
        .single()
        .map(|t| t.timestamp())
        .unwrap_or(i64::MAX)
}

/// Object key for an uploaded image: `images/{unix_millis}-{file_name}`.
///
/// Only the final component of the client-supplied name is kept, and any
/// character outside `[A-Za-z0-9._-]` becomes `_` so the key is URL safe.
pub fn image_object_key(original_name: &str, uploaded_at_millis: i64) -> String {
    let file_name: String = Path::new(original_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let file_name = if file_name.is_empty() {
        "unnamed".to_string()
    } else {
        file_name
    };
    format!("images/{}-{}", uploaded_at_millis, file_name)
}

/// Bytes of a stored object together with the content type it was uploaded with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
}

#[async_trait]
pub trait Storage: Send + Sync {
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<(), AppError>;
    async fn download(&self, key: &str) -> Result<StoredObject, AppError>;
    /// Long-lived URL from which the stored object can be fetched.
    fn retrieval_url(&self, key: &str) -> Result<String, AppError>;
}

/// Guess a content type from the object key's extension.
pub fn detect_content_type(key: &str) -> &'static str {
    let extension = Path::new(key)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("heic") => "image/heic",
        _ => "application/octet-stream",
    }
}
