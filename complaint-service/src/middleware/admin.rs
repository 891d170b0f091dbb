use crate::startup::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use subtle::ConstantTimeEq;

pub const ADMIN_API_KEY_HEADER: &str = "x-admin-api-key";

/// Guard for `/admin/*`. Only enforced when an admin key is configured.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = &state.config.http.admin_api_key else {
        return next.run(request).await;
    };

    let authorized = request
        .headers()
        .get(ADMIN_API_KEY_HEADER)
        .map(|value| bool::from(value.as_bytes().ct_eq(expected.expose_secret().as_bytes())))
        .unwrap_or(false);

    if !authorized {
        tracing::warn!("Failed admin authentication attempt");
        return AppError::Unauthorized(anyhow::anyhow!("Invalid or missing admin API key"))
            .into_response();
    }

    next.run(request).await
}
