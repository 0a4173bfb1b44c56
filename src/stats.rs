//! Price-change classification over the accepted listing stream.
//!
//! The aggregator keeps one baseline price per (category, query) in the
//! injected cache store and emits a `PriceChangeRecord` for every observed
//! transition, snapshotted under a daily and an ISO-week bucket key.
//!
//! Concurrent batches for the same (category, query) race on the baseline
//! read-then-write; the last writer wins. That is an accepted
//! eventual-consistency tradeoff — this is trend approximation, not a ledger.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{
    BASELINE_TTL_SECS, DAILY_STATS_TTL_SECS, STABLE_CHANGE_THRESHOLD_PCT, WEEKLY_STATS_TTL_SECS,
};
use crate::error::Result;
use crate::state::CacheStore;
use crate::types::{ChangeType, PriceChangeRecord};

pub struct PriceStatsAggregator {
    store: Arc<CacheStore>,
}

/// Classify a transition from `old_price` to `new_price`.
/// Returns `(change_percent, change_type)`.
pub fn classify_change(old_price: f64, new_price: f64) -> (f64, ChangeType) {
    let change_percent = 100.0 * (new_price - old_price) / old_price;
    let change_type = if change_percent.abs() < STABLE_CHANGE_THRESHOLD_PCT {
        ChangeType::Stable
    } else if change_percent > 0.0 {
        ChangeType::Increase
    } else {
        ChangeType::Decrease
    };
    (change_percent, change_type)
}

fn baseline_key(category: &str, query: &str) -> String {
    format!("baseline:{category}:{query}")
}

fn daily_key(date: &str, category: &str, query: &str) -> String {
    format!("price_stats:daily:{date}:{category}:{query}")
}

fn weekly_key(week: &str, category: &str, query: &str) -> String {
    format!("price_stats:weekly:{week}:{category}:{query}")
}

/// ISO-week bucket label, e.g. "2025-W35".
fn week_label(now: DateTime<Utc>) -> String {
    let iso = now.iso_week();
    format!("{}-W{:02}", iso.year(), iso.week())
}

impl PriceStatsAggregator {
    pub fn new(store: Arc<CacheStore>) -> Arc<Self> {
        Arc::new(Self { store })
    }

    /// Observe a newly accepted price for (category, query).
    ///
    /// Cold start (no prior baseline) stores the price and emits nothing.
    /// Otherwise the transition is classified, snapshotted under the current
    /// daily and weekly bucket keys, and the baseline is advanced.
    pub fn record(
        &self,
        category: &str,
        query: &str,
        new_price: f64,
        product_name: &str,
        source: &str,
    ) -> Result<Option<PriceChangeRecord>> {
        let now = Utc::now();
        let base_key = baseline_key(category, query);

        let old_price = self.store.get(&base_key).and_then(|(v, _)| v.as_f64());

        let Some(old_price) = old_price else {
            debug!(category, query, price = new_price, "baseline established");
            self.store.set(&base_key, new_price.into(), BASELINE_TTL_SECS)?;
            return Ok(None);
        };

        let (change_percent, change_type) = classify_change(old_price, new_price);
        let record = PriceChangeRecord {
            query: query.to_string(),
            category: category.to_string(),
            old_price,
            new_price,
            change_percent,
            change_type,
            product_name: product_name.to_string(),
            source: source.to_string(),
            timestamp: now.to_rfc3339(),
        };

        let value = serde_json::to_value(&record)?;
        let date = now.format("%Y-%m-%d").to_string();
        let week = week_label(now);
        self.store
            .set(&daily_key(&date, category, query), value.clone(), DAILY_STATS_TTL_SECS)?;
        self.store
            .set(&weekly_key(&week, category, query), value, WEEKLY_STATS_TTL_SECS)?;
        self.store.set(&base_key, new_price.into(), BASELINE_TTL_SECS)?;

        debug!(
            category,
            query,
            old_price,
            new_price,
            change_percent = format!("{change_percent:.2}").as_str(),
            change_type = %change_type,
            "price transition recorded"
        );
        Ok(Some(record))
    }

    /// Aggregate every record in one daily bucket.
    pub fn daily_summary(&self, date: &str) -> BucketSummary {
        self.summarize(&format!("price_stats:daily:{date}:*"), date)
    }

    /// Aggregate every record in one ISO-week bucket (e.g. "2025-W35").
    pub fn weekly_summary(&self, week: &str) -> BucketSummary {
        self.summarize(&format!("price_stats:weekly:{week}:*"), week)
    }

    fn summarize(&self, pattern: &str, period: &str) -> BucketSummary {
        let mut summary = BucketSummary {
            period: period.to_string(),
            ..BucketSummary::default()
        };

        for key in self.store.keys(pattern) {
            let Some((value, _)) = self.store.get(&key) else { continue };
            let record: PriceChangeRecord = match serde_json::from_value(value) {
                Ok(r) => r,
                Err(e) => {
                    warn!(key, error = %e, "unreadable price record in bucket");
                    continue;
                }
            };

            summary.total_changes += 1;
            let per_category = summary
                .by_category
                .entry(record.category.clone())
                .or_default();
            per_category.total += 1;

            match record.change_type {
                ChangeType::Decrease => {
                    summary.decreases += 1;
                    summary.total_decrease_amount += record.old_price - record.new_price;
                    per_category.decreases += 1;
                }
                ChangeType::Increase => {
                    summary.increases += 1;
                    summary.total_increase_amount += record.new_price - record.old_price;
                    per_category.increases += 1;
                }
                ChangeType::Stable => {}
            }
        }
        summary
    }
}

/// Roll-up over one time bucket, consumed by the stats read endpoints.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BucketSummary {
    pub period: String,
    pub total_changes: u64,
    pub decreases: u64,
    pub increases: u64,
    pub total_decrease_amount: f64,
    pub total_increase_amount: f64,
    pub by_category: HashMap<String, CategoryBreakdown>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CategoryBreakdown {
    pub total: u64,
    pub decreases: u64,
    pub increases: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decrease_classification() {
        let (pct, ty) = classify_change(85_000.0, 82_000.0);
        assert!((pct - (-3.5294)).abs() < 0.01, "pct={pct}");
        assert_eq!(ty, ChangeType::Decrease);
    }

    #[test]
    fn increase_classification() {
        let (pct, ty) = classify_change(65_000.0, 68_000.0);
        assert!((pct - 4.6154).abs() < 0.01, "pct={pct}");
        assert_eq!(ty, ChangeType::Increase);
    }

    #[test]
    fn sub_threshold_change_is_stable() {
        let (pct, ty) = classify_change(100_000.0, 100_300.0);
        assert!(pct.abs() < 0.5);
        assert_eq!(ty, ChangeType::Stable);
    }

    #[test]
    fn cold_start_stores_baseline_and_emits_nothing() {
        let store = CacheStore::new();
        let stats = PriceStatsAggregator::new(Arc::clone(&store));

        let first = stats.record("videocards", "rtx 4090", 85_000.0, "RTX 4090", "wb").unwrap();
        assert!(first.is_none());
        assert!(store.get("baseline:videocards:rtx 4090").is_some());
    }

    #[test]
    fn transition_emits_record_and_advances_baseline() {
        let store = CacheStore::new();
        let stats = PriceStatsAggregator::new(Arc::clone(&store));

        stats.record("videocards", "rtx 4090", 85_000.0, "RTX 4090", "wb").unwrap();
        let record = stats
            .record("videocards", "rtx 4090", 82_000.0, "RTX 4090", "wb")
            .unwrap()
            .expect("second observation emits a record");

        assert_eq!(record.change_type, ChangeType::Decrease);
        assert!((record.old_price - 85_000.0).abs() < f64::EPSILON);

        // Baseline advanced: the same price again is now stable.
        let next = stats
            .record("videocards", "rtx 4090", 82_000.0, "RTX 4090", "wb")
            .unwrap()
            .unwrap();
        assert_eq!(next.change_type, ChangeType::Stable);

        // Daily and weekly snapshots both exist.
        assert_eq!(store.keys("price_stats:daily:*:videocards:rtx 4090").len(), 1);
        assert_eq!(store.keys("price_stats:weekly:*:videocards:rtx 4090").len(), 1);
    }

    #[test]
    fn daily_summary_aggregates_bucket() {
        let store = CacheStore::new();
        let stats = PriceStatsAggregator::new(Arc::clone(&store));

        stats.record("videocards", "rtx 4090", 85_000.0, "RTX 4090", "wb").unwrap();
        stats.record("videocards", "rtx 4090", 82_000.0, "RTX 4090", "wb").unwrap();
        stats.record("processors", "14900k", 50_000.0, "i9-14900K", "ozon").unwrap();
        stats.record("processors", "14900k", 53_000.0, "i9-14900K", "ozon").unwrap();

        let date = Utc::now().format("%Y-%m-%d").to_string();
        let summary = stats.daily_summary(&date);
        assert_eq!(summary.total_changes, 2);
        assert_eq!(summary.decreases, 1);
        assert_eq!(summary.increases, 1);
        assert!((summary.total_decrease_amount - 3_000.0).abs() < 1e-9);
        assert!((summary.total_increase_amount - 3_000.0).abs() < 1e-9);
        assert_eq!(summary.by_category.len(), 2);
    }

    #[test]
    fn week_label_format() {
        let ts = DateTime::parse_from_rfc3339("2025-08-27T12:00:00Z").unwrap().with_timezone(&Utc);
        assert_eq!(week_label(ts), "2025-W35");
    }
}
