//! HTTP endpoints over a shared [`UsageStore`].
//!
//! - `GET  /health`: status and version
//! - `POST /track`: price and record one call
//! - `GET  /summary`: aggregate cost and token totals
//! - `GET  /recent`: most recent records (`?limit=N`, default 10)
//! - `GET  /models`: models with known pricing
//!
//! Client errors (unknown model, malformed body or query, out-of-range counts
//! or limit) map to 422. Storage failures map to 500. Every error body is
//! `{"detail": "..."}`.

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::db::{DEFAULT_RECENT_LIMIT, UsageStore};
use crate::error::Error;
use crate::models::{
    HealthResponse, ModelsResponse, RecentRecordResponse, SummaryResponse, TrackResponse,
};

/// Store handle shared by every handler
pub type SharedStore = Arc<UsageStore>;

#[derive(Debug, Deserialize)]
pub struct TrackRequest {
    pub model: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
    #[serde(default)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

/// Handler error carrying the crate error to its status code
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(Error::InvalidInput(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError(Error::InvalidInput(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            debug!(error = %self.0, "rejected request");
            StatusCode::UNPROCESSABLE_ENTITY
        } else {
            error!(error = %self.0, "request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let body = ErrorResponse {
            detail: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Build the application router
pub fn router(store: SharedStore) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/track", post(track_usage))
        .route("/summary", get(get_summary))
        .route("/recent", get(get_recent))
        .route("/models", get(list_models))
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

/// Bind `addr` and serve until Ctrl-C
pub async fn serve(store: SharedStore, addr: SocketAddr) -> anyhow::Result<()> {
    let app = router(store);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            warn!("failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

/// Run a store call on the blocking pool so SQLite I/O never stalls the runtime
async fn with_store<T, F>(store: SharedStore, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&UsageStore) -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&store))
        .await
        .map_err(|e| Error::UnavailableStorage(format!("storage task failed: {e}")))?
        .map_err(ApiError::from)
}

fn non_negative(field: &str, value: i64) -> Result<u64, ApiError> {
    u64::try_from(value)
        .map_err(|_| ApiError(Error::InvalidInput(format!("{field} must be >= 0, got {value}"))))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

async fn track_usage(
    State(store): State<SharedStore>,
    payload: Result<Json<TrackRequest>, JsonRejection>,
) -> Result<Json<TrackResponse>, ApiError> {
    let Json(request) = payload?;
    let input_tokens = non_negative("input_tokens", request.input_tokens)?;
    let output_tokens = non_negative("output_tokens", request.output_tokens)?;
    let TrackRequest {
        model, endpoint, ..
    } = request;

    let cost = with_store(store, move |s| {
        s.record(&model, input_tokens, output_tokens, endpoint.as_deref())
    })
    .await?;

    Ok(Json(TrackResponse::from(&cost)))
}

async fn get_summary(
    State(store): State<SharedStore>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let summary = with_store(store, |s| s.get_summary()).await?;
    Ok(Json(SummaryResponse::from(&summary)))
}

async fn get_recent(
    State(store): State<SharedStore>,
    query: Result<Query<RecentQuery>, QueryRejection>,
) -> Result<Json<Vec<RecentRecordResponse>>, ApiError> {
    let Query(query) = query?;
    let limit = match query.limit {
        Some(n) => usize::try_from(n).map_err(|_| {
            ApiError(Error::InvalidInput(format!("limit must be >= 0, got {n}")))
        })?,
        None => DEFAULT_RECENT_LIMIT,
    };

    let records = with_store(store, move |s| s.get_recent(limit)).await?;
    Ok(Json(records.iter().map(RecentRecordResponse::from).collect()))
}

async fn list_models(State(store): State<SharedStore>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: store.prices().models(),
    })
}
