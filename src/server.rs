//! Webhook HTTP server.
//!
//! Receives change notifications from the CMS and runs them through the
//! [`Reconciler`] one at a time.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/webhook` (configurable) | Process one change notification |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! Every body that parses as JSON gets `200` with the run [`Outcome`],
//! including payloads that were ignored as invalid or unsupported. The CMS
//! treats non-2xx responses as delivery failures and retries them, which
//! is only useful when a collaborator actually failed.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "reconcile_failed", "message": "failed to fetch item …" } }
//! ```
//!
//! Error codes: `bad_request` (400), `reconcile_failed` (500).

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use content_sync_core::reconcile::{Outcome, Reconciler};

use crate::config::Config;
use crate::pipeline;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    reconciler: Arc<Reconciler>,
    /// Held for the duration of a run so events never overlap.
    run_lock: Arc<Mutex<()>>,
}

/// Starts the webhook server with the SQLite store and Delivery API client
/// from `config`. Runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let reconciler = pipeline::build_reconciler(config).await?;
    serve(config, Arc::new(reconciler)).await
}

/// Starts the webhook server around an already-built reconciler.
pub async fn serve(config: &Config, reconciler: Arc<Reconciler>) -> anyhow::Result<()> {
    let app = router(&config.server.webhook_path, reconciler);

    info!(
        "webhook server listening on http://{}{}",
        config.server.bind, config.server.webhook_path
    );

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router with the webhook handler mounted at `webhook_path`.
pub fn router(webhook_path: &str, reconciler: Arc<Reconciler>) -> Router {
    let state = AppState {
        reconciler,
        run_lock: Arc::new(Mutex::new(())),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(webhook_path, post(handle_webhook))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
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

fn reconcile_failed(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "reconcile_failed".to_string(),
        message: message.into(),
    }
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

// ============ POST /webhook ============

/// Handler for the webhook route.
///
/// The body is read as raw bytes so that notifications sent without a
/// JSON content type are still accepted.
async fn handle_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Outcome>, AppError> {
    let payload: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| bad_request(format!("body is not valid JSON: {}", e)))?;

    let _guard = state.run_lock.lock().await;
    let outcome = state.reconciler.process(&payload).await.map_err(|e| {
        error!(error = %format!("{:#}", e), "webhook reconciliation failed");
        reconcile_failed(format!("{:#}", e))
    })?;

    Ok(Json(outcome))
}
