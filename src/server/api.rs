//! REST API handlers
//!
//! Public reads go under `/api`, operator actions under `/admin`.

use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{MatchedPath, Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorCategory, Result, WorddayErrorTrait};
use crate::metrics;
use crate::models::ContentItem;
use crate::scheduler::GenerationReport;

use super::AppState;

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 100;

// ============================================================================
// API Response Types
// ============================================================================

/// Generic API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Simple error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub retryable: bool,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: message.into(),
            retryable: false,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match self.category() {
            ErrorCategory::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorCategory::NotFound => StatusCode::NOT_FOUND,
            ErrorCategory::Config | ErrorCategory::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.describe(), "Request failed");
        }

        let body = ErrorResponse {
            retryable: self.is_recoverable(),
            ..ErrorResponse::new(self.to_string())
        };
        (status, Json(body)).into_response()
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub issues: Vec<String>,
    pub version: String,
    pub uptime_secs: u64,
}

/// Counter bump response
#[derive(Debug, Serialize)]
pub struct CounterResponse {
    pub id: String,
    pub view_count: u64,
    pub like_count: u64,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

impl LimitQuery {
    fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

/// Body of `POST /admin/generate`; may be omitted entirely
#[derive(Debug, Default, Deserialize)]
pub struct GenerateRequest {
    pub word: Option<String>,
}

// ============================================================================
// API Routes
// ============================================================================

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health / ops
        .route("/health", get(health_check))
        .route("/status", get(status))
        .route("/metrics", get(metrics_text))
        // Answer
        .route("/api/today", get(today))
        // Articles
        .route("/api/articles/recent", get(recent_articles))
        .route("/api/articles/popular", get(popular_articles))
        .route("/api/articles/top", get(top_articles))
        .route("/api/articles/search", get(search_articles))
        .route("/api/articles/key/{key}", get(articles_by_key))
        .route("/api/articles/category/{category}", get(articles_by_category))
        .route("/api/articles/tag/{tag}", get(articles_by_tag))
        .route("/api/articles/{id}", get(get_article))
        .route("/api/articles/{id}/view", post(view_article))
        .route("/api/articles/{id}/like", post(like_article))
        .route("/api/stats", get(stats))
        // Admin
        .route("/admin/generate", post(generate))
        .route("/admin/refresh", post(refresh))
        .route("/admin/cleanup", post(cleanup))
        .layer(middleware::from_fn(track_requests))
        .with_state(state)
}

/// Record count and latency per matched route
async fn track_requests(matched: Option<MatchedPath>, req: Request, next: Next) -> Response {
    let endpoint = matched
        .as_ref()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let started = Instant::now();

    let response = next.run(req).await;

    metrics::record_api_request(
        &endpoint,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}

// ============================================================================
// Health Handlers
// ============================================================================

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.scheduler.health_check().await;
    let code = if report.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(HealthResponse {
            healthy: report.healthy,
            issues: report.issues,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: state.start_time.elapsed().as_secs(),
        }),
    )
}

async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(state.scheduler.get_status()))
}

async fn metrics_text() -> Result<impl IntoResponse> {
    let body = metrics::encode_metrics()
        .map_err(|e| Error::Other(format!("Failed to encode metrics: {e}")))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}

// ============================================================================
// Answer / Article Handlers
// ============================================================================

async fn today(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(state.resolver.resolve_today().await))
}

async fn recent_articles(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> impl IntoResponse {
    Json(ApiResponse::success(state.store.get_recent(query.limit()).await))
}

async fn popular_articles(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> impl IntoResponse {
    Json(ApiResponse::success(state.store.get_popular(query.limit()).await))
}

async fn top_articles(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> impl IntoResponse {
    Json(ApiResponse::success(state.store.get_top_rated(query.limit()).await))
}

async fn search_articles(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> impl IntoResponse {
    Json(ApiResponse::success(state.store.search(&query.q).await))
}

async fn articles_by_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> impl IntoResponse {
    Json(ApiResponse::success(state.store.get_by_key(&key).await))
}

async fn articles_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> impl IntoResponse {
    Json(ApiResponse::success(state.store.get_by_category(&category).await))
}

async fn articles_by_tag(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> impl IntoResponse {
    Json(ApiResponse::success(state.store.get_by_tag(&tag).await))
}

async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ContentItem>>> {
    let item = state
        .store
        .get_by_id(&id)
        .await
        .ok_or_else(|| Error::not_found("Article", id))?;
    Ok(Json(ApiResponse::success(item)))
}

async fn view_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<CounterResponse>>> {
    if !state.store.increment_view(&id).await {
        return Err(Error::not_found("Article", id));
    }
    counters(&state, id).await
}

async fn like_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<CounterResponse>>> {
    if !state.store.increment_like(&id).await {
        return Err(Error::not_found("Article", id));
    }
    counters(&state, id).await
}

async fn counters(state: &AppState, id: String) -> Result<Json<ApiResponse<CounterResponse>>> {
    let item = state
        .store
        .get_by_id(&id)
        .await
        .ok_or_else(|| Error::not_found("Article", id))?;
    Ok(Json(ApiResponse::success(CounterResponse {
        id: item.id,
        view_count: item.view_count,
        like_count: item.like_count,
    })))
}

async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(state.store.get_stats().await))
}

// ============================================================================
// Admin Handlers
// ============================================================================

async fn generate(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ApiResponse<GenerationReport>>> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        GenerateRequest::default()
    } else {
        serde_json::from_slice::<GenerateRequest>(&body)?
    };

    let report = state
        .scheduler
        .trigger_manual_generation(request.word.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(report)))
}

async fn refresh(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(state.scheduler.force_refresh().await))
}

async fn cleanup(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(state.scheduler.run_cleanup().await))
}
