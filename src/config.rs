use crate::error::{AppError, Result};

/// |change_percent| below this is classified as `stable` rather than a real
/// price movement (percent, not fraction).
pub const STABLE_CHANGE_THRESHOLD_PCT: f64 = 0.5;

/// Business minimum for a persistable listing price. Marketplace scrapers
/// occasionally emit 0 or negative placeholder prices; those rows are skipped.
pub const MIN_VALID_PRICE: f64 = 1.0;

/// Upper bound on a plausible listing price. Anything above is scraper noise.
pub const MAX_VALID_PRICE: f64 = 1_000_000.0;

/// Bound on any single database interaction. A timed-out write is surfaced as
/// a failure, never an indefinite hang.
pub const DB_OP_TIMEOUT_MS: u64 = 5_000;

/// How long a memoized filter response stays valid when FILTER_CACHE_TTL_SECS
/// is not set.
pub const DEFAULT_FILTER_CACHE_TTL_SECS: i64 = 300;

/// Cache sweeper interval (seconds).
pub const CACHE_SWEEP_INTERVAL_SECS: u64 = 30;

/// Baseline price entries survive this long without a new observation.
pub const BASELINE_TTL_SECS: i64 = 30 * 24 * 3_600;

/// Daily price-stats bucket entries expire after two days.
pub const DAILY_STATS_TTL_SECS: i64 = 2 * 24 * 3_600;

/// Weekly price-stats bucket entries expire after two weeks.
pub const WEEKLY_STATS_TTL_SECS: i64 = 14 * 24 * 3_600;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// TTL for memoized filter responses (FILTER_CACHE_TTL_SECS).
    pub filter_cache_ttl_secs: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "listings.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            filter_cache_ttl_secs: std::env::var("FILTER_CACHE_TTL_SECS")
                .unwrap_or_default()
                .parse::<i64>()
                .unwrap_or(DEFAULT_FILTER_CACHE_TTL_SECS),
        })
    }
}
