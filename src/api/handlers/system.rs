//! Health check and CSRF token endpoints.

use axum::Json;
use serde::Serialize;

use crate::api::auth::AuthSession;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /api/health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsrfTokenResponse {
    pub csrf_token: String,
}

/// GET /api/csrf-token
///
/// The token to echo in `X-CSRF-Token` on state-changing requests.
pub async fn csrf_token(auth: AuthSession) -> Json<CsrfTokenResponse> {
    Json(CsrfTokenResponse {
        csrf_token: auth.session.csrf_token,
    })
}
