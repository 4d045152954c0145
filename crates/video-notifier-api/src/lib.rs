//! # Video Notifier HTTP Service
//!
//! HTTP server receiving video-change notifications and relaying them through
//! the notification pipeline in `video-notifier-core`.
//!
//! This service provides:
//! - `POST /notify` for notifications pushed by the video platform
//! - `POST /force-notify/{id}` for operator-triggered re-notification
//! - `GET /__health` and `GET /__gtg` for health and readiness
//! - `GET /__metrics` for Prometheus scraping
//!
//! Every request carries a transaction ID, taken from `X-Request-Id` or
//! generated, which is sent downstream and echoed on the response.

pub mod config;
pub mod errors;
pub mod health;
pub mod metrics;

pub use config::{
    DownstreamConfig, HttpConfig, LoggingConfig, ServerConfig, ServiceConfig, UpstreamConfig,
};
pub use errors::{ConfigError, NotifyHandlerError, ServiceError};
pub use health::{DefaultHealthChecker, HealthCheckResult, HealthChecker, HealthStatus};
pub use metrics::{MeteredRenewer, NotifierMetrics};

use axum::{
    extract::{Path, Request, State},
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Extension, Router,
};
use bytes::Bytes;
use serde::Serialize;
use std::future::IntoFuture;
use std::{collections::HashMap, sync::Arc, time::Duration, time::Instant};
use tokio::sync::Notify;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument, warn};
use video_notifier_core::notification::{NotificationHandler, NotificationOutcome};
use video_notifier_core::{TransactionId, VideoId};

use crate::metrics::{FORCE_PATH, PUSH_PATH};

/// Service name reported by `/__health`
pub const SERVICE_NAME: &str = "video-notifier";

/// Transaction ID header, lowercase as required for a static header name
static TRANSACTION_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Notification pipeline shared by both entry points
    pub notification_handler: Arc<NotificationHandler>,

    /// Health checker for system monitoring
    pub health_checker: Arc<dyn HealthChecker>,

    /// Metrics collector for observability
    pub metrics: Arc<NotifierMetrics>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        notification_handler: Arc<NotificationHandler>,
        health_checker: Arc<dyn HealthChecker>,
        metrics: Arc<NotifierMetrics>,
    ) -> Self {
        Self {
            notification_handler,
            health_checker,
            metrics,
        }
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

/// Create HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let notification_routes = Router::new()
        .route("/notify", post(handle_notify))
        .route("/force-notify/{id}", post(handle_force_notify));

    let health_routes = Router::new()
        .route("/__health", get(handle_health_check))
        .route("/__gtg", get(handle_good_to_go));

    let observability_routes = Router::new().route("/__metrics", get(metrics_endpoint));

    Router::new()
        .merge(notification_routes)
        .merge(health_routes)
        .merge(observability_routes)
        .layer(middleware::from_fn(transaction_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start HTTP server
///
/// Runs until SIGINT or SIGTERM. In-flight requests then get up to
/// `server.shutdown_timeout_seconds` to finish.
pub async fn start_server(config: &ServiceConfig, state: AppState) -> Result<(), ServiceError> {
    let app = create_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(|e| ServiceError::BindFailed {
            address: address.clone(),
            message: e.to_string(),
        })?;

    info!(address = %address, "Starting HTTP server");

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);
    let shutdown_started = Arc::new(Notify::new());
    let signal_seen = shutdown_started.clone();

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!(
                timeout_seconds = shutdown_timeout.as_secs(),
                "Initiating graceful shutdown"
            );
            signal_seen.notify_one();
        })
        .into_future();

    let drain_deadline = async {
        shutdown_started.notified().await;
        tokio::time::sleep(shutdown_timeout).await;
    };

    tokio::select! {
        result = server => {
            result.map_err(|e| ServiceError::ServerFailed {
                message: e.to_string(),
            })?;
        }
        _ = drain_deadline => {
            warn!("Graceful shutdown timed out, abandoning in-flight requests");
        }
    }

    info!("HTTP server shutdown complete");
    Ok(())
}

/// Resolve on SIGINT, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C)"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

// ============================================================================
// Notification Handlers
// ============================================================================

/// Handle a video-change notification pushed by the video platform
///
/// Malformed events and events for other accounts are acknowledged with 200
/// so the platform does not redeliver them.
#[instrument(skip_all, fields(transaction_id = %transaction_id))]
pub async fn handle_notify(
    State(state): State<AppState>,
    Extension(transaction_id): Extension<TransactionId>,
    body: Bytes,
) -> Result<StatusCode, NotifyHandlerError> {
    let start = Instant::now();

    match state
        .notification_handler
        .handle_push(&body, &transaction_id)
        .await
    {
        Ok(outcome) => {
            state
                .metrics
                .record_outcome(PUSH_PATH, outcome.as_str(), start.elapsed());
            Ok(StatusCode::OK)
        }
        Err(source) => {
            let error = NotifyHandlerError::Push {
                transaction_id,
                source,
            };
            state
                .metrics
                .record_failure(PUSH_PATH, error.stage(), start.elapsed());
            Err(error)
        }
    }
}

/// Handle an operator request to re-notify one video
///
/// Answers 204 when the video does not exist; its not-found marker has still
/// been forwarded.
#[instrument(skip_all, fields(transaction_id = %transaction_id, video_id = %id))]
pub async fn handle_force_notify(
    State(state): State<AppState>,
    Extension(transaction_id): Extension<TransactionId>,
    Path(id): Path<String>,
) -> Result<StatusCode, NotifyHandlerError> {
    let start = Instant::now();

    let video_id = match VideoId::new(id) {
        Ok(video_id) => video_id,
        Err(source) => {
            let error = NotifyHandlerError::InvalidVideoId {
                transaction_id,
                source,
            };
            state
                .metrics
                .record_failure(FORCE_PATH, error.stage(), start.elapsed());
            return Err(error);
        }
    };

    match state
        .notification_handler
        .handle_force(&video_id, &transaction_id)
        .await
    {
        Ok(outcome) => {
            state
                .metrics
                .record_outcome(FORCE_PATH, outcome.as_str(), start.elapsed());
            Ok(force_status(&outcome))
        }
        Err(source) => {
            let error = NotifyHandlerError::Force {
                transaction_id,
                video_id: video_id.to_string(),
                source,
            };
            state
                .metrics
                .record_failure(FORCE_PATH, error.stage(), start.elapsed());
            Err(error)
        }
    }
}

fn force_status(outcome: &NotificationOutcome) -> StatusCode {
    match outcome {
        NotificationOutcome::ForwardedNotFound { .. } => StatusCode::NO_CONTENT,
        NotificationOutcome::Forwarded { .. } | NotificationOutcome::Ignored(_) => StatusCode::OK,
    }
}

// ============================================================================
// Health Check Handlers
// ============================================================================

/// Health report; 503 with the same body when unhealthy
#[instrument(skip(state))]
async fn handle_health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let status = state.health_checker.check_health().await;

    let response = HealthResponse {
        name: SERVICE_NAME.to_string(),
        description: "Relays video-change notifications to the CMS notifier".to_string(),
        status: if status.is_healthy {
            "healthy".to_string()
        } else {
            "unhealthy".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        checks: status.checks,
    };

    let code = if status.is_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (code, Json(response))
}

/// Good-to-go check for load balancers
#[instrument(skip(state))]
async fn handle_good_to_go(State(state): State<AppState>) -> Response {
    if state.health_checker.check_readiness().await {
        (StatusCode::OK, "OK").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Service unavailable").into_response()
    }
}

// ============================================================================
// Observability Handlers
// ============================================================================

/// Prometheus metrics endpoint
#[instrument(skip_all)]
async fn metrics_endpoint(State(state): State<AppState>) -> Result<String, StatusCode> {
    state.metrics.encode().map_err(|e| {
        error!(error = %e, "Failed to encode metrics");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

// ============================================================================
// Middleware
// ============================================================================

/// Transaction ID tracking middleware
///
/// Reads `X-Request-Id` or generates a `tid_` ID, makes it available to
/// handlers as an [`Extension`], and echoes it on the response.
#[instrument(skip(request, next), fields(
    method = %request.method(),
    uri = %request.uri(),
    transaction_id
))]
async fn transaction_id_middleware(mut request: Request, next: Next) -> Response {
    let start = Instant::now();

    let transaction_id = TransactionId::from_header_value(
        request
            .headers()
            .get(&TRANSACTION_ID_HEADER)
            .and_then(|v| v.to_str().ok()),
    );

    tracing::Span::current().record("transaction_id", transaction_id.as_str());
    request.extensions_mut().insert(transaction_id.clone());

    let mut response = next.run(request).await;

    if let Ok(header_value) = HeaderValue::from_str(transaction_id.as_str()) {
        response
            .headers_mut()
            .insert(TRANSACTION_ID_HEADER.clone(), header_value);
    }

    let status = response.status();
    let duration_ms = start.elapsed().as_millis() as u64;

    if status.is_server_error() {
        error!(status = status.as_u16(), duration_ms, "Request completed with server error");
    } else if status.is_client_error() {
        warn!(status = status.as_u16(), duration_ms, "Request completed with client error");
    } else {
        info!(status = status.as_u16(), duration_ms, "Request completed");
    }

    response
}

// ============================================================================
// Response Types
// ============================================================================

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub name: String,
    pub description: String,
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub checks: HashMap<String, HealthCheckResult>,
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
