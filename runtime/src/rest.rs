// Copyright 2026 WebSource Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP REST API for WebSource.
//!
//! `/api/protected` (and its `/api/recover`, `/api/extract` aliases) runs
//! the strategy ladder and returns the page as a download. `/api/debug`
//! issues a single request and describes the response. Health and index
//! routes are plain JSON.

use crate::acquisition::diagnose;
use crate::acquisition::orchestrator::{normalize_url, ResolveError};
use crate::export;
use crate::server::AppState;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info_span, warn, Instrument};

/// Response header naming the strategy that produced the content.
static STRATEGY_HEADER: HeaderName = HeaderName::from_static("x-websource-strategy");

/// Errors surfaced by the REST handlers.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Input(#[from] ResolveError),

    #[error("invalid query parameters: {0}")]
    Query(String),

    #[error(
        "Could not extract source code from {url}. The website might be protected or inaccessible."
    )]
    NotFound { url: String, attempts: usize },

    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::Input(_) | ServiceError::Query(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Input(_) | ServiceError::Query(_) => "E_INVALID_PARAMS",
            ServiceError::NotFound { .. } => "E_NOT_FOUND",
            ServiceError::Internal(_) => "E_INTERNAL",
        }
    }
}

impl From<QueryRejection> for ServiceError {
    fn from(rejection: QueryRejection) -> Self {
        ServiceError::Query(rejection.body_text())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let mut error = json!({ "code": self.code(), "message": self.to_string() });
        if let ServiceError::NotFound { attempts, .. } = &self {
            error["attempts"] = json!(attempts);
        }
        (self.status(), Json(json!({ "error": error }))).into_response()
    }
}

/// Build the axum Router with all REST endpoints.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/health", get(health))
        .route("/api/info", get(info))
        .route("/api/protected", get(handle_extract))
        .route("/api/recover", get(handle_extract))
        .route("/api/extract", get(handle_extract))
        .route("/api/debug", get(handle_debug))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ── Handlers ────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
struct ExtractParams {
    url: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    raw: bool,
}

/// Accepts `true/false`, `1/0`, `yes/no`, `on/off` in any case.
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "invalid boolean value {other:?}"
        ))),
    }
}

#[derive(Debug, Deserialize, Default)]
struct DebugParams {
    url: Option<String>,
}

async fn handle_extract(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ExtractParams>, QueryRejection>,
) -> Result<Response, ServiceError> {
    let Query(params) = params?;
    let request_id = uuid::Uuid::new_v4().to_string();
    let span = info_span!("extract", %request_id);
    extract(state, params, request_id).instrument(span).await
}

async fn extract(
    state: Arc<AppState>,
    params: ExtractParams,
    request_id: String,
) -> Result<Response, ServiceError> {
    let target = normalize_url(params.url.as_deref().unwrap_or_default())?;
    let result = state.orchestrator.resolve(target.as_str()).await?;
    state.record_browser_failure(&request_id, Some(target.as_str()));

    let (Some(content), Some(source_url), Some(strategy)) =
        (result.content, result.source_url, result.strategy_used)
    else {
        let err = ServiceError::NotFound {
            url: target.to_string(),
            attempts: result.attempts.len(),
        };
        state
            .errors
            .record(&request_id, "resolve", Some(target.as_str()), err.to_string());
        return Err(err);
    };

    let now = Utc::now();
    let body = export::with_metadata(target.as_str(), &source_url, &strategy, &content, now);

    let strategy_header = HeaderValue::from_str(&strategy)
        .map_err(|e| ServiceError::Internal(format!("invalid strategy header: {e}")))?;

    if params.raw {
        return Ok((
            [
                (CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8")),
                (STRATEGY_HEADER.clone(), strategy_header),
            ],
            body,
        )
            .into_response());
    }

    let filename = export::download_filename(target.as_str(), now);
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .map_err(|e| ServiceError::Internal(format!("invalid filename header: {e}")))?;

    Ok((
        [
            (CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8")),
            (CONTENT_DISPOSITION, disposition),
            (STRATEGY_HEADER.clone(), strategy_header),
        ],
        body,
    )
        .into_response())
}

async fn handle_debug(
    State(state): State<Arc<AppState>>,
    params: Result<Query<DebugParams>, QueryRejection>,
) -> Result<Json<diagnose::DebugReport>, ServiceError> {
    let Query(params) = params?;
    let request_id = uuid::Uuid::new_v4().to_string();
    let span = info_span!("debug", %request_id);
    async move {
        let target = normalize_url(params.url.as_deref().unwrap_or_default())?;
        let orchestrator = &state.orchestrator;
        match diagnose::probe(orchestrator.client(), orchestrator.validator(), target.as_str())
            .await
        {
            Ok(report) => Ok(Json(report)),
            Err(e) => {
                let message = format!("{e:#}");
                warn!(url = %target, "debug probe failed: {message}");
                state
                    .errors
                    .record(&request_id, "debug", Some(target.as_str()), message.clone());
                Err(ServiceError::Internal(message))
            }
        }
    }
    .instrument(span)
    .await
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let browser = match &state.browser {
        Some(slot) => json!({
            "enabled": true,
            "initialized": slot.is_initialized(),
            "available": slot.is_ready(),
            "launch_error": slot.launch_error(),
        }),
        None => json!({ "enabled": false }),
    };

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": state.started_at.elapsed().as_secs_f64(),
        "timestamp": Utc::now().to_rfc3339(),
        "strategies": state.orchestrator.catalog().len(),
        "browser": browser,
        "recent_errors": state.errors.recent(),
    }))
}

async fn index() -> Json<Value> {
    Json(json!({
        "message": "WebSource API",
        "endpoints": {
            "extract_source": "/api/protected?url=URL",
            "debug": "/api/debug?url=URL",
            "health": "/health",
            "info": "/api/info",
        },
        "usage": "GET /api/protected?url=https://example.com",
    }))
}

async fn info(State(state): State<Arc<AppState>>) -> Json<Value> {
    let catalog = state.orchestrator.catalog();
    Json(json!({
        "name": "WebSource",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Recover a page's HTML source through an ordered ladder of fetch strategies",
        "endpoints": [
            {
                "path": "/api/protected",
                "aliases": ["/api/recover", "/api/extract"],
                "method": "GET",
                "parameters": { "url": "target URL (required)", "raw": "return text/plain instead of a download" },
            },
            {
                "path": "/api/debug",
                "method": "GET",
                "parameters": { "url": "target URL (required)" },
            },
            { "path": "/health", "aliases": ["/api/health"], "method": "GET" },
        ],
        "strategies": catalog.labels(),
        "min_content_length": state.orchestrator.validator().min_length(),
    }))
}
