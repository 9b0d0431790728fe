//! HTTP dashboard API.
//!
//! Exposes the connection flag, the recent-message ring buffer, and the
//! pending pairing QR. Spawned as a background task next to the gateway.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};
use wabot_core::config::DashboardConfig;
use wabot_core::state::BotState;

type ApiError = (StatusCode, Json<Value>);

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    state: Arc<BotState>,
    api_key: Option<String>,
}

/// Constant-time string comparison to prevent timing attacks on API token validation.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Check bearer token auth. Returns `Err(response)` when rejected.
fn check_auth(headers: &HeaderMap, api_key: &Option<String>) -> Result<(), ApiError> {
    let Some(key) = api_key else {
        return Ok(());
    };

    let unauthorized = |msg: &str| (StatusCode::UNAUTHORIZED, Json(json!({ "error": msg })));

    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| unauthorized("missing Authorization header"))?
        .to_str()
        .map_err(|_| unauthorized("invalid Authorization header"))?;

    match value.strip_prefix("Bearer ") {
        Some(token) if constant_time_eq(token, key) => Ok(()),
        _ => Err(unauthorized("invalid token")),
    }
}

/// Render the pending QR as PNG, or 404 when there is none.
async fn pending_qr_png(state: &BotState) -> Result<Vec<u8>, ApiError> {
    let code = state.qr().await.ok_or((
        StatusCode::NOT_FOUND,
        Json(json!({"error": "no QR code pending"})),
    ))?;

    wabot_whatsapp::generate_qr_image(&code).map_err(|e| {
        error!("QR image generation failed: {e}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": format!("QR generation failed: {e}")})),
        )
    })
}

/// `GET /api/status`: connection flag and the last message previews.
async fn status(headers: HeaderMap, State(api): State<ApiState>) -> Result<Json<Value>, ApiError> {
    check_auth(&headers, &api.api_key)?;

    Ok(Json(json!({
        "connected": api.state.is_connected(),
        "lastMessages": api.state.recent().await,
    })))
}

/// `GET /api/health`
async fn health(headers: HeaderMap, State(api): State<ApiState>) -> Result<Json<Value>, ApiError> {
    check_auth(&headers, &api.api_key)?;

    let whatsapp = if api.state.is_connected() {
        "connected"
    } else {
        "disconnected"
    };

    Ok(Json(json!({
        "status": "ok",
        "uptime_secs": api.state.uptime().as_secs(),
        "whatsapp": whatsapp,
    })))
}

/// `GET /api/qr`: pending pairing QR as base64 PNG.
async fn qr(headers: HeaderMap, State(api): State<ApiState>) -> Result<Json<Value>, ApiError> {
    check_auth(&headers, &api.api_key)?;

    if api.state.is_connected() {
        return Ok(Json(json!({"status": "paired"})));
    }

    let png = pending_qr_png(&api.state).await?;
    Ok(Json(json!({
        "status": "qr_ready",
        "qr_png_base64": BASE64.encode(&png),
    })))
}

/// `GET /qr.png`
async fn qr_png(headers: HeaderMap, State(api): State<ApiState>) -> Result<Response, ApiError> {
    check_auth(&headers, &api.api_key)?;

    let png = pending_qr_png(&api.state).await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

/// Build the axum router with shared state.
fn build_router(api: ApiState) -> Router {
    Router::new()
        .route("/api/status", get(status))
        .route("/api/health", get(health))
        .route("/api/qr", get(qr))
        .route("/qr.png", get(qr_png))
        .with_state(api)
}

/// Start the dashboard server. Runs until the process exits.
pub async fn serve(config: DashboardConfig, state: Arc<BotState>) {
    let api_key = if config.api_key.is_empty() {
        None
    } else {
        Some(config.api_key.clone())
    };

    let app = build_router(ApiState { state, api_key });
    let addr = format!("{}:{}", config.host, config.port);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Dashboard failed to bind to {addr}: {e}");
            return;
        }
    };

    info!("🌐 Dashboard running at http://{addr}");

    if let Err(e) = axum::serve(listener, app).await {
        error!("Dashboard server error: {e}");
    }
}
