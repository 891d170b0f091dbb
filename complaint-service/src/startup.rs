use crate::config::{CaptionProviderKind, ComplaintConfig, DatabaseBackend, StorageBackend};
use crate::handlers;
use crate::middleware::{admin_auth_middleware, origin_guard_middleware, ADMIN_API_KEY_HEADER};
use crate::services::{
    CaptionProvider, GcsStorage, GcsUrlSigner, HuggingFaceCaptioner, HuggingFaceConfig,
    InMemoryStore, LocalStorage, MockCaptioner, MongoDb, RecordStore, Storage,
};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics_middleware, request_id_middleware, security_headers_middleware, REQUEST_ID_HEADER,
};
use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub config: ComplaintConfig,
    pub store: Arc<dyn RecordStore>,
    pub storage: Arc<dyn Storage>,
    pub captioner: Arc<dyn CaptionProvider>,
}

impl AppState {
    /// Construct every collaborator the configuration selects.
    pub async fn from_config(config: ComplaintConfig) -> Result<Self, AppError> {
        let store: Arc<dyn RecordStore> = match config.database.backend {
            DatabaseBackend::Mongo => Arc::new(
                MongoDb::connect(&config.database.uri, &config.database.database).await?,
            ),
            DatabaseBackend::Memory => {
                tracing::warn!("Using in-memory record store; data is lost on restart");
                Arc::new(InMemoryStore::new())
            }
        };

        let storage: Arc<dyn Storage> = match config.storage.backend {
            StorageBackend::Local => Arc::new(
                LocalStorage::new(
                    &config.storage.local_path,
                    &config.storage.public_base_url,
                    config.storage.signing_secret.clone(),
                )
                .await
                .map_err(|e| {
                    tracing::error!(
                        "Failed to initialize local storage at {}: {}",
                        config.storage.local_path,
                        e
                    );
                    e
                })?,
            ),
            StorageBackend::Gcs => {
                let (Some(bucket), Some(token), Some(key_path)) = (
                    config.storage.gcs_bucket.clone(),
                    config.storage.gcs_access_token.clone(),
                    config.storage.gcs_service_account_key_path.as_deref(),
                ) else {
                    return Err(AppError::ConfigError(anyhow::anyhow!(
                        "GCS storage requires a bucket name, access token and service account key"
                    )));
                };
                let signer = GcsUrlSigner::from_service_account_file(key_path)?;
                tracing::info!(
                    bucket = %bucket,
                    signer = %signer.client_email(),
                    "Using GCS storage"
                );
                Arc::new(GcsStorage::new(bucket, token, signer))
            }
        };

        let captioner: Arc<dyn CaptionProvider> = match config.inference.provider {
            CaptionProviderKind::HuggingFace => {
                let api_key = config.inference.api_key.clone().ok_or_else(|| {
                    AppError::ConfigError(anyhow::anyhow!("Hugging Face API key is not configured"))
                })?;
                Arc::new(HuggingFaceCaptioner::new(HuggingFaceConfig {
                    api_url: config.inference.api_url.clone(),
                    api_key,
                    timeout: Duration::from_secs(config.inference.timeout_secs),
                })?)
            }
            CaptionProviderKind::Mock => {
                tracing::warn!("Using mock caption provider");
                Arc::new(MockCaptioner::default())
            }
        };

        if config.http.admin_api_key.is_none() {
            tracing::warn!("ADMIN_API_KEY is not set; admin endpoints are unauthenticated");
        }

        Ok(Self {
            config,
            store,
            storage,
            captioner,
        })
    }
}

fn cors_layer(allowed_origin: &str) -> Result<CorsLayer, AppError> {
    let origin = allowed_origin.parse::<HeaderValue>().map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!(
            "Invalid CORS origin '{}': {}",
            allowed_origin,
            e
        ))
    })?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(ADMIN_API_KEY_HEADER),
            HeaderName::from_static(REQUEST_ID_HEADER),
        ]))
}

pub fn build_router(state: AppState) -> Result<Router, AppError> {
    let admin = Router::new()
        .route("/pending", get(handlers::list_pending))
        .route("/status", patch(handlers::change_status))
        .route_layer(from_fn_with_state(state.clone(), admin_auth_middleware));

    let app = Router::new()
        .route("/", get(handlers::greeting))
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route("/submit", post(handlers::submit_complaint))
        .route("/submit-complaint", post(handlers::submit_complaint))
        .route("/complaints/:pnr", get(handlers::get_complaint))
        .route("/get-complaints/:pnr", get(handlers::get_complaint))
        .route("/images/*key", get(handlers::fetch_image))
        .nest("/admin", admin)
        .layer(DefaultBodyLimit::max(state.config.http.max_upload_bytes))
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors_layer(&state.config.http.allowed_origin)?)
        .layer(from_fn_with_state(state.clone(), origin_guard_middleware))
        .with_state(state);

    Ok(app)
}

pub struct Application {
    port: u16,
    server: Box<dyn Future<Output = std::io::Result<()>> + Send + Unpin>,
}

impl Application {
    pub async fn build(config: ComplaintConfig) -> Result<Self, AppError> {
        let state = AppState::from_config(config).await?;
        Self::with_state(state).await
    }

    /// Bind and serve an already assembled state.
    pub async fn with_state(state: AppState) -> Result<Self, AppError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], state.config.common.port));
        let app = build_router(state)?;

        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

        Ok(Self {
            port,
            server: Box::new(Box::pin(server.into_future())),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
