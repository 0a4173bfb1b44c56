//! /health endpoint: DB ping plus cache occupancy.

use axum::{extract::State, Json};
use serde::Serialize;

use super::routes::ApiState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub db: &'static str,
    pub cache_entries: usize,
    pub uptime_secs: u64,
}

pub async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let db = match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(&state.pool).await {
        Ok(_) => "ok",
        Err(_) => "unreachable",
    };

    Json(HealthResponse {
        status: if db == "ok" { "ok" } else { "degraded" },
        db,
        cache_entries: state.cache.len(),
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}
