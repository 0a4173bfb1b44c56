mod api;
mod config;
mod db;
mod error;
mod filter;
mod state;
mod stats;
mod types;
mod validator;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use crate::api::routes::{router, ApiState};
use crate::config::{Config, CACHE_SWEEP_INTERVAL_SECS};
use crate::error::Result;
use crate::state::CacheStore;
use crate::stats::PriceStatsAggregator;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let pool = sqlx::SqlitePool::connect(&format!("sqlite:{}?mode=rwc", cfg.db_path)).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database ready at {}", cfg.db_path);

    // --- In-memory cache + price trend aggregator ---
    let cache = CacheStore::new();
    let stats = PriceStatsAggregator::new(Arc::clone(&cache));

    // Background sweep of expired cache entries
    let sweep_cache = Arc::clone(&cache);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(CACHE_SWEEP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            let removed = sweep_cache.purge_expired();
            if removed > 0 {
                debug!(removed, "expired cache entries swept");
            }
        }
    });

    // --- HTTP API server ---
    let api_state = ApiState {
        pool: pool.clone(),
        cache,
        stats,
        config: cfg.clone(),
        started_at: Instant::now(),
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
