use secrecy::Secret;
use service_core::config::{self as core_config, get_env, get_optional_env};
use service_core::error::AppError;

const DEFAULT_INFERENCE_URL: &str =
    "https://api-inference.huggingface.co/models/Salesforce/blip-image-captioning-large";
const DEFAULT_INFERENCE_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ComplaintConfig {
    pub common: core_config::Config,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub inference: InferenceConfig,
    pub http: HttpConfig,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub local_path: String,
    /// Base URL under which the local backend's signed image URLs are served.
    pub public_base_url: String,
    pub signing_secret: Secret<String>,
    pub gcs_bucket: Option<String>,
    pub gcs_access_token: Option<Secret<String>>,
    /// Service account JSON key used to sign GCS retrieval URLs.
    pub gcs_service_account_key_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Local,
    Gcs,
}

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub provider: CaptionProviderKind,
    pub api_url: String,
    pub api_key: Option<Secret<String>>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionProviderKind {
    HuggingFace,
    Mock,
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub allowed_origin: String,
    pub admin_api_key: Option<Secret<String>>,
    pub max_upload_bytes: usize,
}

impl ComplaintConfig {
    pub fn load() -> Result<Self, AppError> {
        // Loads .env and APP__ prefixed settings
        let common_config = core_config::Config::load()?;
        let is_prod = core_config::is_production();

        let database_backend: DatabaseBackend =
            get_env("RECORD_STORE", Some("mongo"), is_prod)?.parse().map_err(config_err)?;
        let storage_backend: StorageBackend =
            get_env("STORAGE_BACKEND", Some("local"), is_prod)?.parse().map_err(config_err)?;
        let caption_provider: CaptionProviderKind =
            get_env("CAPTION_PROVIDER", Some("huggingface"), is_prod)?
                .parse()
                .map_err(config_err)?;

        let mongo_uri = match database_backend {
            DatabaseBackend::Mongo => get_env("MONGODB_URI", None, is_prod)?,
            DatabaseBackend::Memory => get_optional_env("MONGODB_URI").unwrap_or_default(),
        };

        let config = ComplaintConfig {
            database: DatabaseConfig {
                backend: database_backend,
                uri: mongo_uri,
                database: get_env("MONGODB_DATABASE", Some("complaint_db"), is_prod)?,
            },
            storage: StorageConfig {
                backend: storage_backend,
                local_path: get_env("STORAGE_LOCAL_PATH", Some("storage"), is_prod)?,
                public_base_url: get_env(
                    "PUBLIC_BASE_URL",
                    Some(&format!("http://localhost:{}", common_config.port)),
                    is_prod,
                )?,
                signing_secret: Secret::new(get_env(
                    "URL_SIGNING_SECRET",
                    Some("dev-url-signing-secret"),
                    is_prod,
                )?),
                gcs_bucket: get_optional_env("GCS_BUCKET_NAME"),
                gcs_access_token: get_optional_env("GCS_ACCESS_TOKEN").map(Secret::new),
                gcs_service_account_key_path: get_optional_env("GCS_SERVICE_ACCOUNT_KEY_PATH")
                    .or_else(|| get_optional_env("GOOGLE_APPLICATION_CREDENTIALS")),
            },
            inference: InferenceConfig {
                provider: caption_provider,
                api_url: get_env("HUGGING_FACE_API_URL", Some(DEFAULT_INFERENCE_URL), is_prod)?,
                api_key: get_optional_env("HUGGING_FACE_API_KEY")
                    .map(|key| Secret::new(strip_bearer_prefix(&key))),
                timeout_secs: parse_or(
                    get_optional_env("INFERENCE_TIMEOUT_SECS"),
                    DEFAULT_INFERENCE_TIMEOUT_SECS,
                ),
            },
            http: HttpConfig {
                allowed_origin: get_env(
                    "ALLOWED_ORIGIN",
                    Some("http://localhost:3000"),
                    is_prod,
                )?,
                admin_api_key: get_optional_env("ADMIN_API_KEY").map(Secret::new),
                max_upload_bytes: parse_or(
                    get_optional_env("MAX_UPLOAD_BYTES"),
                    DEFAULT_MAX_UPLOAD_BYTES,
                ),
            },
            otlp_endpoint: get_optional_env("OTLP_ENDPOINT"),
            common: common_config,
        };

        config.validate()?;
        Ok(config)
    }

    /// Settings for running without any external service: in-memory records,
    /// mock captions and local storage under `local_path`.
    pub fn local(local_path: impl Into<String>) -> Self {
        ComplaintConfig {
            common: core_config::Config {
                port: 0,
                log_level: "info".to_string(),
            },
            database: DatabaseConfig {
                backend: DatabaseBackend::Memory,
                uri: String::new(),
                database: "complaint_db".to_string(),
            },
            storage: StorageConfig {
                backend: StorageBackend::Local,
                local_path: local_path.into(),
                public_base_url: "http://localhost:8080".to_string(),
                signing_secret: Secret::new("dev-url-signing-secret".to_string()),
                gcs_bucket: None,
                gcs_access_token: None,
                gcs_service_account_key_path: None,
            },
            inference: InferenceConfig {
                provider: CaptionProviderKind::Mock,
                api_url: DEFAULT_INFERENCE_URL.to_string(),
                api_key: None,
                timeout_secs: DEFAULT_INFERENCE_TIMEOUT_SECS,
            },
            http: HttpConfig {
                allowed_origin: "http://localhost:3000".to_string(),
                admin_api_key: None,
                max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            },
            otlp_endpoint: None,
        }
    }

    /// Cross-field checks the per-key lookups cannot express.
    fn validate(&self) -> Result<(), AppError> {
        if self.storage.backend == StorageBackend::Gcs {
            if self.storage.gcs_bucket.is_none() {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "GCS_BUCKET_NAME is required when STORAGE_BACKEND=gcs"
                )));
            }
            if self.storage.gcs_access_token.is_none() {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "GCS_ACCESS_TOKEN is required when STORAGE_BACKEND=gcs"
                )));
            }
            if self.storage.gcs_service_account_key_path.is_none() {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "GCS_SERVICE_ACCOUNT_KEY_PATH is required when STORAGE_BACKEND=gcs"
                )));
            }
        }

        if self.inference.provider == CaptionProviderKind::HuggingFace
            && self.inference.api_key.is_none()
        {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "HUGGING_FACE_API_KEY is required when CAPTION_PROVIDER=huggingface"
            )));
        }

        Ok(())
    }
}

impl std::str::FromStr for DatabaseBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(DatabaseBackend::Mongo),
            "memory" => Ok(DatabaseBackend::Memory),
            _ => Err(format!("Invalid record store backend: {}", s)),
        }
    }
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(StorageBackend::Local),
            "gcs" => Ok(StorageBackend::Gcs),
            _ => Err(format!("Invalid storage backend: {}", s)),
        }
    }
}

impl std::str::FromStr for CaptionProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "huggingface" | "hugging_face" => Ok(CaptionProviderKind::HuggingFace),
            "mock" => Ok(CaptionProviderKind::Mock),
            _ => Err(format!("Invalid caption provider: {}", s)),
        }
    }
}

fn config_err(e: String) -> AppError {
    AppError::ConfigError(anyhow::anyhow!(e))
}

/// Accept the key with or without the `Bearer ` scheme the header needs.
fn strip_bearer_prefix(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.get(..7) {
        Some(scheme) if scheme.eq_ignore_ascii_case("bearer ") => trimmed[7..].trim().to_string(),
        _ => trimmed.to_string(),
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}
