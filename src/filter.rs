//! Filter orchestration: takes one raw batch plus its query context,
//! dispatches every listing to the category validator, and returns the
//! annotated batch in input order.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AppError, Result};
use crate::types::{FilterResult, ProcessedProduct, ProductCategory, RawProduct};
use crate::validator;

/// Free-form per-request tuning knobs. Currently carries no recognized
/// fields; kept so callers can send `config: {}` without a parse error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {}

#[derive(Debug, Clone, Deserialize)]
pub struct FilterRequest {
    pub products: Vec<RawProduct>,
    pub query: String,
    #[serde(default)]
    pub all_queries: Vec<String>,
    #[serde(default)]
    pub exclude_keywords: Vec<String>,
    #[serde(default)]
    pub config: FilterConfig,
    pub source: String,
    pub category: String,
    /// Optional exact-model constraint (e.g. a specific card edition).
    #[serde(default)]
    pub exactmodels: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterResponse {
    pub products: Vec<ProcessedProduct>,
    pub total_input: u64,
    /// Listings whose final verdict is valid.
    pub total_filtered: u64,
    pub processing_time_ms: u64,
}

/// Run the filter pipeline over one batch. Rejects the request up front when
/// batch-level parameters are missing; individual listings never abort it.
pub fn run(req: &FilterRequest) -> Result<FilterResponse> {
    if req.category.trim().is_empty() {
        return Err(AppError::InvalidRequest("category is required".to_string()));
    }
    if req.query.trim().is_empty() && req.all_queries.is_empty() {
        return Err(AppError::InvalidRequest("query is required".to_string()));
    }

    let started = Instant::now();
    let category = ProductCategory::from_key(&req.category);
    let exclude: Vec<String> = req
        .exclude_keywords
        .iter()
        .map(|k| k.to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();

    let mut seen_ids: HashSet<&str> = HashSet::with_capacity(req.products.len());
    let mut out: Vec<ProcessedProduct> = Vec::with_capacity(req.products.len());
    let mut total_filtered = 0u64;
    let processed_at = Utc::now().timestamp_millis();

    for product in &req.products {
        // First occurrence wins within a batch.
        if !seen_ids.insert(product.id.as_str()) {
            debug!(id = %product.id, "duplicate within batch, dropped");
            continue;
        }

        let query = if product.query.is_empty() { &req.query } else { &product.query };
        let filter_result = evaluate(product, query, category, &exclude, req.exactmodels.as_deref());
        if filter_result.is_valid {
            total_filtered += 1;
        }

        out.push(ProcessedProduct {
            product: product.clone(),
            filter_result,
            processed_at,
        });
    }

    Ok(FilterResponse {
        total_input: req.products.len() as u64,
        total_filtered,
        products: out,
        processing_time_ms: started.elapsed().as_millis() as u64,
    })
}

/// Exclude-keyword rejection runs before validator dispatch.
fn evaluate(
    product: &RawProduct,
    query: &str,
    category: ProductCategory,
    exclude: &[String],
    exact_model: Option<&str>,
) -> FilterResult {
    let name_lower = product.name.to_lowercase();
    if let Some(keyword) = exclude.iter().find(|k| name_lower.contains(k.as_str())) {
        return FilterResult {
            is_valid: false,
            reason: format!("excluded keyword ({keyword})"),
            applied_rules: vec!["exclude-keyword".to_string()],
        };
    }

    let verdict = validator::verdict(query, &product.name, category, exact_model);
    FilterResult {
        is_valid: verdict.is_valid,
        reason: verdict.reason,
        applied_rules: verdict.applied_rules,
    }
}

/// Cache key for memoizing one filter request. Derived from the batch-level
/// parameters plus every product's identity and price, so a changed batch
/// never hits a stale entry.
pub fn fingerprint(req: &FilterRequest) -> String {
    let mut hasher = DefaultHasher::new();
    req.query.hash(&mut hasher);
    req.all_queries.hash(&mut hasher);
    req.exclude_keywords.hash(&mut hasher);
    req.exactmodels.hash(&mut hasher);
    for p in &req.products {
        p.id.hash(&mut hasher);
        p.source.hash(&mut hasher);
        p.price.to_bits().hash(&mut hasher);
    }
    format!("filter:{}:{}:{:016x}", req.category, req.source, hasher.finish())
}
