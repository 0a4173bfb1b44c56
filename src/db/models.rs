//! Database row types matching migrations/0001_init.sql.

#[derive(Debug, sqlx::FromRow)]
pub struct ProductRow {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub image_url: String,
    pub product_url: String,
    pub category: String,
    pub source: String,
    pub query: String,
    pub created_at: i64,
}

#[derive(Debug, sqlx::FromRow)]
pub struct PriceHistoryRow {
    pub id: i64,
    pub product_id: String,
    pub source: String,
    pub query: String,
    pub category: String,
    pub price: f64,
    pub created_at: i64,
}
