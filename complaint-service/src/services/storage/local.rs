use super::{detect_content_type, permanent_url_expiry, Storage, StoredObject};
use async_trait::async_trait;
use axum::http::HeaderValue;
use secrecy::{ExposeSecret, Secret};
use service_core::error::{AppError, ExternalServiceError};
use service_core::utils::signature::generate_url_signature;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// Directory under the base path holding one content-type file per object.
const METADATA_DIR: &str = ".meta";

/// Filesystem storage. Objects live at `{base_path}/{key}`, their declared
/// content type at `{base_path}/.meta/{key}`.
pub struct LocalStorage {
    base_path: PathBuf,
    public_base_url: String,
    signing_secret: Secret<String>,
}

impl LocalStorage {
    pub async fn new(
        base_path: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
        signing_secret: Secret<String>,
    ) -> Result<Self, AppError> {
        let base_path = base_path.into();
        if !base_path.exists() {
            fs::create_dir_all(&base_path).await?;
        }
        Ok(Self {
            base_path,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            signing_secret,
        })
    }

    /// Resolve `key` under `root`, refusing anything that escapes it.
    fn resolve(root: &Path, key: &str) -> Result<PathBuf, AppError> {
        let relative = Path::new(key);
        let is_contained = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if key.is_empty() || !is_contained {
            return Err(AppError::BadRequest(anyhow::anyhow!("Invalid object key")));
        }
        Ok(root.join(relative))
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, AppError> {
        Self::resolve(&self.base_path, key)
    }

    fn metadata_path(&self, key: &str) -> Result<PathBuf, AppError> {
        Self::resolve(&self.base_path.join(METADATA_DIR), key)
    }

    async fn write_file(path: &Path, data: &[u8]) -> Result<(), AppError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, data).await.map_err(|e| {
            AppError::from(ExternalServiceError::Storage(format!(
                "Failed to write {}: {}",
                path.display(),
                e
            )))
        })
    }

    /// Declared content type of `key`, or a guess from its extension when
    /// none was recorded.
    async fn stored_content_type(&self, key: &str) -> Result<String, AppError> {
        let declared = match fs::read_to_string(self.metadata_path(key)?).await {
            Ok(value) => Some(value.trim().to_string()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(AppError::from(e)),
        };

        Ok(declared
            .filter(|value| !value.is_empty() && HeaderValue::from_str(value).is_ok())
            .unwrap_or_else(|| detect_content_type(key).to_string()))
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<(), AppError> {
        Self::write_file(&self.object_path(key)?, &data).await?;
        Self::write_file(&self.metadata_path(key)?, content_type.as_bytes()).await
    }

    async fn download(&self, key: &str) -> Result<StoredObject, AppError> {
        let path = self.object_path(key)?;
        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::NotFound(anyhow::anyhow!("Object not found")));
            }
            Err(e) => return Err(AppError::from(e)),
        };

        Ok(StoredObject {
            content_type: self.stored_content_type(key).await?,
            data,
        })
    }

    fn retrieval_url(&self, key: &str) -> Result<String, AppError> {
        let expires = permanent_url_expiry();
        let signature = generate_url_signature(self.signing_secret.expose_secret(), key, expires)
            .map_err(AppError::InternalError)?;
        Ok(format!(
            "{}/{}?expires={}&signature={}",
            self.public_base_url, key, expires, signature
        ))
    }
}
