use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose, Engine as _};
use serde_json::json;
use std::sync::Arc;

use crate::metrics;
use crate::services::AppState;

fn credential_status(configured: bool) -> serde_json::Value {
    if configured {
        json!({ "status": "configured" })
    } else {
        json!({ "status": "fallback", "message": "credentials missing, synthetic content in use" })
    }
}

/// Always 200: missing providers degrade content, never availability.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let config = &state.config;
    let article_search = (config.google_search_api_key.is_some()
        && config.google_search_engine_id.is_some())
        || config.bing_search_api_key.is_some()
        || config.serper_api_key.is_some();

    let mut dependencies = serde_json::Map::new();
    dependencies.insert(
        "gemini".to_string(),
        credential_status(config.gemini_api_key.is_some()),
    );
    dependencies.insert(
        "youtube".to_string(),
        credential_status(config.youtube_api_key.is_some()),
    );
    dependencies.insert("article_search".to_string(), credential_status(article_search));
    dependencies.insert(
        "deadline_store".to_string(),
        json!({ "status": if config.redis_uri.is_some() { "redis" } else { "memory" } }),
    );

    let status = if config.gemini_api_key.is_some() {
        "healthy"
    } else {
        "degraded"
    };

    (
        StatusCode::OK,
        Json(json!({
            "status": status,
            "service": "studyplan-api",
            "version": env!("CARGO_PKG_VERSION"),
            "dependencies": dependencies
        })),
    )
}

pub async fn metrics_handler() -> impl IntoResponse {
    match metrics::render_metrics() {
        Ok(metrics_text) => (StatusCode::OK, metrics_text),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to render metrics: {}", e),
        ),
    }
}

/// Protects /metrics with HTTP Basic auth against `metrics_auth`
/// (`username:password`).
pub async fn metrics_auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let encoded = auth_header
        .strip_prefix("Basic ")
        .ok_or(StatusCode::UNAUTHORIZED)?;
    let decoded = general_purpose::STANDARD
        .decode(encoded)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;
    let credentials = String::from_utf8(decoded).map_err(|_| StatusCode::UNAUTHORIZED)?;

    if credentials != state.config.metrics_auth {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}

pub mod countdown;
pub mod documents;
pub mod plans;
pub mod resources;
pub mod session;
pub mod study_aids;
pub mod tutor;
