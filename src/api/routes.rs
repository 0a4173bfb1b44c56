//! JSON RPC surface: product filtering, batch ingestion, cache
//! administration, and time-bucketed stats readers.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::health::health;
use crate::config::Config;
use crate::db::ProductStore;
use crate::error::AppError;
use crate::filter::{self, FilterRequest, FilterResponse};
use crate::state::CacheStore;
use crate::stats::{BucketSummary, PriceStatsAggregator};
use crate::types::{BatchIngestResult, ProcessedProduct, RawProduct};

#[derive(Clone)]
pub struct ApiState {
    pub pool: sqlx::SqlitePool,
    pub cache: Arc<CacheStore>,
    pub stats: Arc<PriceStatsAggregator>,
    pub config: Config,
    pub started_at: Instant,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/v1/products/filter", post(filter_products))
        .route("/v1/products/batch", post(batch_create_products))
        .route("/v1/cache", post(cache_products))
        .route("/v1/cache/:key", get(get_cached_products))
        .route("/v1/cache", delete(clear_cache))
        .route("/v1/stats/daily/:date", get(daily_stats))
        .route("/v1/stats/weekly/:week", get(weekly_stats))
        .route("/health", get(health))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request/response DTOs (cache + batch)
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct BatchCreateRequest {
    pub products: Vec<RawProduct>,
}

#[derive(Deserialize)]
pub struct CacheProductsRequest {
    pub cache_key: String,
    pub products: Vec<ProcessedProduct>,
    pub ttl_seconds: i64,
}

#[derive(Serialize)]
pub struct CacheProductsResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize)]
pub struct GetCachedProductsResponse {
    pub products: Vec<ProcessedProduct>,
    pub found: bool,
    pub ttl_remaining: i64,
}

#[derive(Deserialize)]
pub struct ClearCacheQuery {
    pub pattern: String,
}

#[derive(Serialize)]
pub struct ClearCacheResponse {
    pub deleted_keys: usize,
    pub success: bool,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// FilterProducts: annotate a raw batch with verdicts. Identical requests
/// within the memoization TTL are served from the cache store.
async fn filter_products(
    State(state): State<ApiState>,
    Json(req): Json<FilterRequest>,
) -> Result<Json<FilterResponse>, AppError> {
    let key = filter::fingerprint(&req);
    if let Some((cached, _)) = state.cache.get(&key) {
        debug!(key = %key, "filter response served from cache");
        let resp: FilterResponse = serde_json::from_value(cached)?;
        return Ok(Json(resp));
    }

    let resp = filter::run(&req)?;
    info!(
        category = %req.category,
        source = %req.source,
        total_input = resp.total_input,
        total_filtered = resp.total_filtered,
        processing_time_ms = resp.processing_time_ms,
        "filter batch complete"
    );

    if let Err(e) = state
        .cache
        .set(&key, serde_json::to_value(&resp)?, state.config.filter_cache_ttl_secs)
    {
        debug!(key = %key, error = %e, "filter memoization skipped");
    }
    Ok(Json(resp))
}

/// BatchCreateProducts: persist accepted listings plus their price-history
/// trail. Always returns explicit counts; partial success is normal.
async fn batch_create_products(
    State(state): State<ApiState>,
    Json(req): Json<BatchCreateRequest>,
) -> Result<Json<BatchIngestResult>, AppError> {
    let store = ProductStore::new(state.pool.clone());
    let result = store.batch_create(&req.products, &state.stats).await;
    Ok(Json(result))
}

/// CacheProducts: store a pre-filtered batch under an explicit key.
/// An invalid TTL is reported in-band, not as a transport error.
async fn cache_products(
    State(state): State<ApiState>,
    Json(req): Json<CacheProductsRequest>,
) -> Result<Json<CacheProductsResponse>, AppError> {
    let value = serde_json::to_value(&req.products)?;
    match state.cache.set(&req.cache_key, value, req.ttl_seconds) {
        Ok(()) => Ok(Json(CacheProductsResponse {
            success: true,
            message: format!("cached {} products", req.products.len()),
        })),
        Err(e) => Ok(Json(CacheProductsResponse {
            success: false,
            message: e.to_string(),
        })),
    }
}

async fn get_cached_products(
    State(state): State<ApiState>,
    Path(key): Path<String>,
) -> Result<Json<GetCachedProductsResponse>, AppError> {
    match state.cache.get(&key) {
        Some((value, ttl_remaining)) => {
            let products: Vec<ProcessedProduct> = serde_json::from_value(value)?;
            Ok(Json(GetCachedProductsResponse { products, found: true, ttl_remaining }))
        }
        None => Ok(Json(GetCachedProductsResponse {
            products: Vec::new(),
            found: false,
            ttl_remaining: 0,
        })),
    }
}

/// ClearCache: glob-delete. Zero matches is still a success.
async fn clear_cache(
    State(state): State<ApiState>,
    Query(params): Query<ClearCacheQuery>,
) -> Json<ClearCacheResponse> {
    let deleted = state.cache.clear(&params.pattern);
    info!(pattern = %params.pattern, deleted, "cache cleared");
    Json(ClearCacheResponse { deleted_keys: deleted, success: true })
}

async fn daily_stats(
    State(state): State<ApiState>,
    Path(date): Path<String>,
) -> Json<BucketSummary> {
    Json(state.stats.daily_summary(&date))
}

async fn weekly_stats(
    State(state): State<ApiState>,
    Path(week): Path<String>,
) -> Json<BucketSummary> {
    Json(state.stats.weekly_summary(&week))
}
