//! HTTP REST API server.
//!
//! The transport boundary of the matching engine: ingestion and catalog
//! administration (token-gated), the match endpoint, and the monitoring
//! surface (health, metrics, status).

use crate::auth::{AdminAuth, AuthError};
use crate::config::MatchingConfig;
use crate::health::HealthChecker;
use crate::metrics::PrometheusMeter;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use muse_match::{MatchError, Matcher};
use muse_observe::{MatchEvt, Meter, ObsEvent};
use muse_store::{DescriptorStore, StoreError};
use muse_vector::{ensure_finite, l2_normalize};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// HTTP server state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<DescriptorStore>,
    pub matcher: Arc<dyn Matcher>,
    pub auth: AdminAuth,
    pub matching: MatchingConfig,
    pub meter: Arc<PrometheusMeter>,
    pub health_checker: Arc<HealthChecker>,
    pub serve_metrics: bool,
}

/// Build the API router.
///
/// Separate from [`HttpServer`] so tests can drive the router directly.
pub fn router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/v1/artworks", get(list_artworks_handler))
        .route(
            "/v1/artworks/{artwork_id}",
            post(upsert_artwork_handler)
                .get(get_artwork_handler)
                .delete(delete_artwork_handler),
        )
        .route(
            "/v1/artworks/{artwork_id}/descriptors/{descriptor_id}",
            axum::routing::delete(delete_descriptor_handler),
        )
        .route("/v1/match", post(match_handler))
        .route("/v1/status", get(status_handler))
        .route("/health", get(health_handler))
        .route("/health/quick", get(health_quick_handler));

    if state.serve_metrics {
        router = router.route("/metrics", get(metrics_handler));
    }

    router.with_state(state)
}

/// HTTP server with graceful shutdown.
pub struct HttpServer {
    addr: SocketAddr,
    state: AppState,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    server_handle: Option<JoinHandle<Result<(), std::io::Error>>>,
}

impl HttpServer {
    pub fn new(addr: SocketAddr, state: AppState) -> Self {
        Self {
            addr,
            state,
            shutdown_tx: None,
            server_handle: None,
        }
    }

    /// Start the HTTP server.
    pub async fn start(&mut self) -> Result<(), HttpServerError> {
        tracing::info!("Starting HTTP server on {}", self.addr);

        let app = router(self.state.clone());

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        self.shutdown_tx = Some(shutdown_tx);

        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|e| HttpServerError::Startup(format!("Failed to bind: {}", e)))?;

        let server_handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
        });

        self.server_handle = Some(server_handle);

        tracing::info!("HTTP server started successfully");
        Ok(())
    }

    /// Shutdown the HTTP server gracefully.
    pub async fn shutdown(mut self) -> Result<(), HttpServerError> {
        tracing::info!("Shutting down HTTP server");

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(handle) = self.server_handle.take() {
            handle
                .await
                .map_err(|e| HttpServerError::Shutdown(format!("Join error: {}", e)))?
                .map_err(|e| HttpServerError::Shutdown(format!("Server error: {}", e)))?;
        }

        tracing::info!("HTTP server shutdown complete");
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    #[error("Startup error: {0}")]
    Startup(String),

    #[error("Shutdown error: {0}")]
    Shutdown(String),
}

// ---- request/response bodies ----

#[derive(Debug, Deserialize)]
pub struct DescriptorBody {
    pub descriptor_id: String,
    pub vector: Vec<f32>,
}

#[derive(Debug, Deserialize)]
pub struct UpsertRequest {
    /// Opaque catalog metadata, stored as-is.
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub descriptors: Vec<DescriptorBody>,
}

#[derive(Debug, Serialize)]
pub struct UpsertResponse {
    pub artwork_id: String,
    pub descriptor_count: usize,
    pub dimension: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    /// Raw query vector; normalized server-side before matching.
    pub vector: Vec<f32>,
    pub threshold: Option<f32>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct MatchEntry {
    pub artwork_id: String,
    pub score: f32,
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub matches: Vec<MatchEntry>,
}

#[derive(Debug, Serialize)]
pub struct ArtworkResponse {
    pub artwork_id: String,
    pub metadata: serde_json::Value,
    pub descriptor_ids: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub dimension: Option<usize>,
    pub artworks: usize,
    pub descriptors: usize,
    pub snapshot_version: u64,
}

// ---- handlers ----

async fn upsert_artwork_handler(
    State(state): State<AppState>,
    Path(artwork_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<UpsertRequest>,
) -> Result<Json<UpsertResponse>, ApiError> {
    state.auth.authorize(&headers)?;

    let descriptors = body
        .descriptors
        .into_iter()
        .map(|d| (d.descriptor_id, d.vector))
        .collect();

    let outcome = state
        .store
        .upsert_artwork(&artwork_id, body.metadata, descriptors)?;

    Ok(Json(UpsertResponse {
        artwork_id: outcome.artwork_id,
        descriptor_count: outcome.descriptor_count,
        dimension: outcome.dimension,
    }))
}

async fn delete_artwork_handler(
    State(state): State<AppState>,
    Path(artwork_id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    state.auth.authorize(&headers)?;
    state.store.delete_artwork(&artwork_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_descriptor_handler(
    State(state): State<AppState>,
    Path((artwork_id, descriptor_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    state.auth.authorize(&headers)?;
    state.store.delete_descriptor(&artwork_id, &descriptor_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_artwork_handler(
    State(state): State<AppState>,
    Path(artwork_id): Path<String>,
) -> Result<Json<ArtworkResponse>, ApiError> {
    let record = state.store.get_artwork(&artwork_id)?;

    Ok(Json(ArtworkResponse {
        artwork_id: record.artwork_id,
        metadata: record.metadata,
        descriptor_ids: record
            .descriptors
            .iter()
            .map(|d| d.descriptor_id.clone())
            .collect(),
        updated_at: record.updated_at,
    }))
}

async fn list_artworks_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<muse_store::ArtworkSummary>>, ApiError> {
    Ok(Json(state.store.list_artworks()?))
}

/// Match a captured feature vector against the catalog.
///
/// POST /v1/match
async fn match_handler(
    State(state): State<AppState>,
    Json(body): Json<MatchRequest>,
) -> Result<Json<MatchResponse>, ApiError> {
    let threshold = body
        .threshold
        .unwrap_or(state.matching.default_threshold);
    if !(-1.0..=1.0).contains(&threshold) {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "threshold must be in [-1, 1]",
        ));
    }

    let limit = body
        .limit
        .unwrap_or(state.matching.default_limit)
        .min(state.matching.max_limit);
    if limit == 0 {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "limit must be >= 1"));
    }

    if body.vector.is_empty() {
        return Err(ApiError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "query vector cannot be empty",
        ));
    }
    ensure_finite(&body.vector)
        .map_err(|e| ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;

    // Same normalization as the ingestion path, by construction
    let query = l2_normalize(&body.vector);

    let snapshot = state.store.snapshot()?;
    let matches = state.matcher.rank(&snapshot, &query, threshold, limit)?;

    state.meter.emit(ObsEvent::Match(MatchEvt {
        candidates: snapshot.descriptor_count(),
        returned: matches.len(),
    }));
    tracing::debug!(
        candidates = snapshot.descriptor_count(),
        returned = matches.len(),
        threshold,
        "match request served"
    );

    Ok(Json(MatchResponse {
        matches: matches
            .into_iter()
            .map(|m| MatchEntry {
                artwork_id: m.artwork_id,
                score: m.score,
            })
            .collect(),
    }))
}

async fn status_handler(
    State(state): State<AppState>,
) -> Result<Json<StatusResponse>, ApiError> {
    let snapshot = state.store.snapshot()?;
    Ok(Json(StatusResponse {
        dimension: snapshot.dimension(),
        artworks: snapshot.artwork_count(),
        descriptors: snapshot.descriptor_count(),
        snapshot_version: snapshot.version(),
    }))
}

/// Health check endpoint handler.
///
/// GET /health
async fn health_handler(
    State(state): State<AppState>,
) -> Json<crate::health::ServerHealthStatus> {
    Json(state.health_checker.check())
}

/// Quick health check endpoint handler.
///
/// GET /health/quick
///
/// Returns 200 OK once the catalog cache is loaded, 503 before that.
/// Useful for load balancer health checks.
async fn health_quick_handler(State(state): State<AppState>) -> Response {
    if state.health_checker.check_quick() {
        (StatusCode::OK, "OK").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE").into_response()
    }
}

/// Metrics endpoint handler.
///
/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    let metrics = state.meter.export();

    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        metrics,
    )
        .into_response()
}

// ---- error mapping ----

/// Typed error wrapper for handlers.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, "handler error: {}", self.message);
        }
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let status = match &err {
            StoreError::DimensionMismatch { .. } | StoreError::InvalidVector(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            // Retryable: cache not loaded yet, or the durable backend is
            // temporarily unreachable
            StoreError::NotReady | StoreError::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self::new(status, err.to_string())
    }
}

impl From<MatchError> for ApiError {
    fn from(err: MatchError) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, err.to_string())
    }
}
