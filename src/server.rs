//! HTTP server.
//!
//! Exposes the search service as a JSON HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/search/query` | Search with a `SearchParams` body |
//! | `PUT` | `/search/upsert` | Index (or fully replace) a document |
//! | `DELETE` | `/search/delete/{id}` | Delete one document |
//! | `DELETE` | `/search/delete-all` | Delete every document |
//! | `GET` | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "pageSize must not be greater than 50" } }
//! ```
//!
//! Error codes: `bad_request` (400) for input that fails validation, and
//! `internal` (500) for every other failure. Internal errors carry a fixed
//! per-operation message; details go to the log only.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::error::ServiceError;
use crate::models::{Document, SearchParams, SearchResponse};
use crate::service::SearchService;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    service: SearchService,
}

/// Starts the HTTP server on `[server].bind` and runs until Ctrl-C.
///
/// The engine client is created once here and dropped after the server has
/// drained in-flight requests.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let service = SearchService::from_config(config)?;
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(
        bind = %config.server.bind,
        engine = service.engine().name(),
        index = %config.engine.index,
        "search server listening"
    );

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("search server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}

/// Build the router for `service`.
pub fn router(service: SearchService) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/search/query", post(handle_query))
        .route("/search/upsert", put(handle_upsert))
        .route("/search/delete/{id}", delete(handle_delete))
        .route("/search/delete-all", delete(handle_delete_all))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { service })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Invalid(message) => bad_request(message),
            ServiceError::Internal(op) => AppError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "internal".to_string(),
                message: op.failure_message().to_string(),
            },
        }
    }
}

/// Decode a JSON request body, reporting syntax, type and shape errors as 400s.
///
/// The `Content-Type` header is not checked. An empty body decodes as `{}`
/// when `empty_as_object` is set.
fn decode<T: DeserializeOwned>(body: &Bytes, empty_as_object: bool) -> Result<T, AppError> {
    let body: &[u8] = if empty_as_object && body.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        &body[..]
    };
    serde_json::from_slice(body).map_err(|e| bad_request(format!("Invalid request body: {}", e)))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /search/query ============

async fn handle_query(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SearchResponse>, AppError> {
    let params: SearchParams = decode(&body, true)?;
    let response = state.service.search(&params).await?;
    Ok(Json(response))
}

// ============ PUT /search/upsert ============

async fn handle_upsert(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let doc: Document = decode(&body, false)?;
    state.service.upsert(&doc).await?;
    Ok(StatusCode::OK)
}

// ============ DELETE /search/delete/{id} ============

async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.service.remove(&id).await?;
    Ok(StatusCode::OK)
}

// ============ DELETE /search/delete-all ============

async fn handle_delete_all(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.service.remove_all().await?;
    Ok(StatusCode::OK)
}
