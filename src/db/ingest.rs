//! Batch ingestion of accepted listings.
//!
//! One batch call is best-effort: products failing the business-minimum field
//! check are skipped, per-product store failures are logged and the rest of
//! the batch continues. The call always returns explicit counts, never an
//! opaque pass/fail. Rows committed before a request is cancelled stay
//! committed.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info};

use super::models::{PriceHistoryRow, ProductRow};
use crate::config::{DB_OP_TIMEOUT_MS, MAX_VALID_PRICE, MIN_VALID_PRICE};
use crate::error::{AppError, Result};
use crate::stats::PriceStatsAggregator;
use crate::types::{BatchIngestResult, RawProduct};

pub struct ProductStore {
    pool: sqlx::SqlitePool,
}

/// Why a product was skipped before any store interaction.
fn reject_reason(p: &RawProduct) -> Option<&'static str> {
    if p.id.is_empty() {
        return Some("missing id");
    }
    if p.name.is_empty() {
        return Some("missing name");
    }
    if p.image_url.is_empty() {
        return Some("missing image_url");
    }
    if p.product_url.is_empty() {
        return Some("missing product_url");
    }
    if p.category.is_empty() {
        return Some("missing category");
    }
    if p.source.is_empty() {
        return Some("missing source");
    }
    if p.query.is_empty() {
        return Some("missing query");
    }
    if !p.price.is_finite() || p.price < MIN_VALID_PRICE {
        return Some("price below minimum");
    }
    if p.price > MAX_VALID_PRICE {
        return Some("price above maximum");
    }
    None
}

/// What one upsert did to the product row.
enum Persisted {
    Inserted,
    PriceChanged { old_price: f64 },
    Unchanged,
}

impl ProductStore {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist a batch of accepted listings and append the price-history
    /// trail. Partial success is the normal outcome.
    ///
    /// Counting policy: a brand-new row or a price change increments
    /// `inserted` and (on success) `history`; an upsert that leaves the price
    /// unchanged increments neither and writes no history row. History is
    /// never written for a product whose row write failed.
    pub async fn batch_create(
        &self,
        products: &[RawProduct],
        stats: &PriceStatsAggregator,
    ) -> BatchIngestResult {
        let mut result = BatchIngestResult::default();
        let mut skipped = 0u64;
        let mut failed = 0u64;

        for product in products {
            if let Some(reason) = reject_reason(product) {
                debug!(id = %product.id, source = %product.source, reason, "product skipped");
                skipped += 1;
                continue;
            }

            match self.upsert_product(product).await {
                Ok(Persisted::Unchanged) => {
                    debug!(id = %product.id, source = %product.source, "price unchanged, no history");
                }
                Ok(outcome) => {
                    result.inserted += 1;
                    match self.append_history(product).await {
                        Ok(()) => result.history += 1,
                        Err(e) => {
                            error!(id = %product.id, source = %product.source, error = %e, "history write failed");
                        }
                    }
                    if let Persisted::PriceChanged { old_price } = outcome {
                        debug!(id = %product.id, old_price, new_price = product.price, "price transition");
                    }
                    self.observe_price(product, stats);
                }
                Err(e) => {
                    error!(id = %product.id, source = %product.source, error = %e, "product write failed");
                    failed += 1;
                }
            }
        }

        info!(
            total = products.len(),
            inserted = result.inserted,
            history = result.history,
            skipped,
            failed,
            "batch ingest complete"
        );
        result
    }

    /// Insert or update the product row keyed by (id, source).
    async fn upsert_product(&self, p: &RawProduct) -> Result<Persisted> {
        let existing: Option<f64> = with_timeout(
            sqlx::query_scalar("SELECT price FROM products WHERE id = ? AND source = ?")
                .bind(&p.id)
                .bind(&p.source)
                .fetch_optional(&self.pool),
        )
        .await?;

        match existing {
            None => {
                let created_at = Utc::now().timestamp_millis();
                with_timeout(
                    sqlx::query(
                        r#"
                        INSERT INTO products (id, name, price, image_url, product_url, category, source, query, created_at)
                        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                        "#,
                    )
                    .bind(&p.id)
                    .bind(&p.name)
                    .bind(p.price)
                    .bind(&p.image_url)
                    .bind(&p.product_url)
                    .bind(&p.category)
                    .bind(&p.source)
                    .bind(&p.query)
                    .bind(created_at)
                    .execute(&self.pool),
                )
                .await?;
                Ok(Persisted::Inserted)
            }
            Some(old_price) if (old_price - p.price).abs() > f64::EPSILON => {
                with_timeout(
                    sqlx::query("UPDATE products SET price = ?, name = ? WHERE id = ? AND source = ?")
                        .bind(p.price)
                        .bind(&p.name)
                        .bind(&p.id)
                        .bind(&p.source)
                        .execute(&self.pool),
                )
                .await?;
                Ok(Persisted::PriceChanged { old_price })
            }
            Some(_) => Ok(Persisted::Unchanged),
        }
    }

    async fn append_history(&self, p: &RawProduct) -> Result<()> {
        let created_at = Utc::now().timestamp_millis();
        with_timeout(
            sqlx::query(
                r#"
                INSERT INTO price_history (product_id, source, query, category, price, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&p.id)
            .bind(&p.source)
            .bind(&p.query)
            .bind(&p.category)
            .bind(p.price)
            .bind(created_at)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    /// Feed the accepted price into the trend aggregator. A stats failure
    /// never affects the batch outcome.
    fn observe_price(&self, p: &RawProduct, stats: &PriceStatsAggregator) {
        match stats.record(&p.category, &p.query, p.price, &p.name, &p.source) {
            Ok(Some(record)) => {
                info!(
                    category = %record.category,
                    query = %record.query,
                    change_percent = format!("{:.2}", record.change_percent).as_str(),
                    change_type = %record.change_type,
                    "price change classified"
                );
            }
            Ok(None) => {}
            Err(e) => error!(id = %p.id, error = %e, "price stats update failed"),
        }
    }

    pub async fn get_product(&self, id: &str, source: &str) -> Result<Option<ProductRow>> {
        let row = with_timeout(
            sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = ? AND source = ?")
                .bind(id)
                .bind(source)
                .fetch_optional(&self.pool),
        )
        .await?;
        Ok(row)
    }

    /// Full price trail for one product, oldest first.
    pub async fn price_trail(&self, id: &str, source: &str) -> Result<Vec<PriceHistoryRow>> {
        let rows = with_timeout(
            sqlx::query_as::<_, PriceHistoryRow>(
                "SELECT * FROM price_history WHERE product_id = ? AND source = ? ORDER BY created_at, id",
            )
            .bind(id)
            .bind(source)
            .fetch_all(&self.pool),
        )
        .await?;
        Ok(rows)
    }

    pub async fn product_count(&self) -> Result<i64> {
        let count = with_timeout(
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products").fetch_one(&self.pool),
        )
        .await?;
        Ok(count)
    }

    pub async fn history_count(&self) -> Result<i64> {
        let count = with_timeout(
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM price_history").fetch_one(&self.pool),
        )
        .await?;
        Ok(count)
    }
}

/// Bound any single store interaction. A hang becomes a reportable failure.
async fn with_timeout<T, E>(fut: impl std::future::Future<Output = std::result::Result<T, E>>) -> Result<T>
where
    AppError: From<E>,
{
    match tokio::time::timeout(Duration::from_millis(DB_OP_TIMEOUT_MS), fut).await {
        Ok(inner) => inner.map_err(AppError::from),
        Err(_) => Err(AppError::Timeout(format!(
            "store interaction exceeded {DB_OP_TIMEOUT_MS}ms"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::CacheStore;

    async fn test_store() -> (ProductStore, std::sync::Arc<PriceStatsAggregator>) {
        let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        let stats = PriceStatsAggregator::new(CacheStore::new());
        (ProductStore::new(pool), stats)
    }

    fn product(id: &str, price: f64) -> RawProduct {
        RawProduct {
            id: id.to_string(),
            name: format!("RTX 4090 {id}"),
            price,
            image_url: "https://img.example/1.jpg".to_string(),
            product_url: "https://market.example/1".to_string(),
            category: "videocards".to_string(),
            source: "wb".to_string(),
            query: "rtx 4090".to_string(),
        }
    }

    #[tokio::test]
    async fn fresh_batch_counts_match_valid_products() {
        let (store, stats) = test_store().await;
        let mut batch = vec![product("a", 85_000.0), product("b", 90_000.0), product("c", 99_000.0)];
        batch.push(product("d", 0.0)); // below business minimum

        let result = store.batch_create(&batch, &stats).await;
        assert_eq!(result.inserted, 3);
        assert_eq!(result.history, 3);
        assert_eq!(store.product_count().await.unwrap(), 3);
        assert_eq!(store.history_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn missing_required_field_is_skipped_not_fatal() {
        let (store, stats) = test_store().await;
        let mut bad = product("a", 85_000.0);
        bad.image_url.clear();

        let result = store.batch_create(&[bad, product("b", 90_000.0)], &stats).await;
        assert_eq!(result.inserted, 1);
        assert_eq!(result.history, 1);
    }

    #[tokio::test]
    async fn unchanged_price_upsert_touches_nothing() {
        let (store, stats) = test_store().await;
        let batch = vec![product("a", 85_000.0)];

        let first = store.batch_create(&batch, &stats).await;
        assert_eq!(first.inserted, 1);

        let second = store.batch_create(&batch, &stats).await;
        assert_eq!(second.inserted, 0);
        assert_eq!(second.history, 0);
        assert_eq!(store.history_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn price_change_appends_history() {
        let (store, stats) = test_store().await;
        store.batch_create(&[product("a", 85_000.0)], &stats).await;

        let result = store.batch_create(&[product("a", 82_000.0)], &stats).await;
        assert_eq!(result.inserted, 1);
        assert_eq!(result.history, 1);
        assert_eq!(store.product_count().await.unwrap(), 1);

        let row = store.get_product("a", "wb").await.unwrap().unwrap();
        assert!((row.price - 82_000.0).abs() < f64::EPSILON);

        let trail: Vec<f64> = store
            .price_trail("a", "wb")
            .await
            .unwrap()
            .iter()
            .map(|h| h.price)
            .collect();
        assert_eq!(trail, vec![85_000.0, 82_000.0]);
    }

    #[tokio::test]
    async fn same_id_different_source_are_distinct_rows() {
        let (store, stats) = test_store().await;
        let mut ozon = product("a", 86_000.0);
        ozon.source = "ozon".to_string();

        let result = store.batch_create(&[product("a", 85_000.0), ozon], &stats).await;
        assert_eq!(result.inserted, 2);
        assert_eq!(store.product_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn empty_batch_is_a_noop() {
        let (store, stats) = test_store().await;
        let result = store.batch_create(&[], &stats).await;
        assert_eq!(result.inserted, 0);
        assert_eq!(result.history, 0);
    }
}
