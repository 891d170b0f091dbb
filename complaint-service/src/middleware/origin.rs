use crate::startup::AppState;
use axum::{
    extract::{Request, State},
    http::header::ORIGIN,
    middleware::Next,
    response::{IntoResponse, Response},
};
use service_core::error::AppError;

/// Reject cross-origin requests from anywhere but the configured frontend.
/// Requests without an `Origin` header (same-origin, curl, servers) pass.
pub async fn origin_guard_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let origin = request
        .headers()
        .get(ORIGIN)
        .map(|value| value.to_str().unwrap_or_default().to_string());

    match origin {
        Some(origin) if origin != state.config.http.allowed_origin => {
            tracing::warn!(origin = %origin, "Rejected request from disallowed origin");
            AppError::Forbidden(anyhow::anyhow!("Not allowed by CORS")).into_response()
        }
        _ => next.run(request).await,
    }
}
