use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RawProduct
// ---------------------------------------------------------------------------

/// One scraped listing as delivered by an upstream marketplace adapter.
/// `id` is only unique within a `source` — never across marketplaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawProduct {
    pub id: String,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub product_url: String,
    pub category: String,
    pub source: String,
    /// Search term that produced this listing.
    pub query: String,
}

// ---------------------------------------------------------------------------
// Category dispatch
// ---------------------------------------------------------------------------

/// Closed set of tracked product categories. Categories without a registered
/// ruleset resolve to `Other` and take the generic validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    Videocards,
    Processors,
    Motherboards,
    Playstation,
    NintendoSwitch,
    Iphone,
    SteamDeck,
    Other,
}

impl ProductCategory {
    pub fn from_key(key: &str) -> Self {
        match key.trim().to_lowercase().as_str() {
            "videocards" => ProductCategory::Videocards,
            "processors" => ProductCategory::Processors,
            "motherboards" => ProductCategory::Motherboards,
            "playstation" => ProductCategory::Playstation,
            "nintendo_switch" | "nintendo-switch" => ProductCategory::NintendoSwitch,
            "iphone" => ProductCategory::Iphone,
            "steam_deck" | "steam-deck" => ProductCategory::SteamDeck,
            _ => ProductCategory::Other,
        }
    }
}

impl std::fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProductCategory::Videocards => "videocards",
            ProductCategory::Processors => "processors",
            ProductCategory::Motherboards => "motherboards",
            ProductCategory::Playstation => "playstation",
            ProductCategory::NintendoSwitch => "nintendo_switch",
            ProductCategory::Iphone => "iphone",
            ProductCategory::SteamDeck => "steam_deck",
            ProductCategory::Other => "other",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Filter output
// ---------------------------------------------------------------------------

/// Verdict attached to a listing by the filter pipeline. Immutable once made.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterResult {
    pub is_valid: bool,
    pub reason: String,
    /// Rule identifiers in the order they fired.
    pub applied_rules: Vec<String>,
}

/// A RawProduct annotated with its verdict. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedProduct {
    #[serde(flatten)]
    pub product: RawProduct,
    pub filter_result: FilterResult,
    /// Unix epoch milliseconds.
    pub processed_at: i64,
}

// ---------------------------------------------------------------------------
// Price change classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Increase,
    Decrease,
    /// |change_percent| below the stable threshold (see config).
    Stable,
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChangeType::Increase => "increase",
            ChangeType::Decrease => "decrease",
            ChangeType::Stable => "stable",
        };
        write!(f, "{s}")
    }
}

/// One observed price transition for a (category, query) pair. Written once;
/// the daily and weekly bucket copies are independent snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceChangeRecord {
    pub query: String,
    pub category: String,
    pub old_price: f64,
    pub new_price: f64,
    /// 100 × (new − old) / old.
    pub change_percent: f64,
    pub change_type: ChangeType,
    pub product_name: String,
    pub source: String,
    /// RFC 3339 UTC timestamp of the observation.
    pub timestamp: String,
}

// ---------------------------------------------------------------------------
// Batch ingestion outcome
// ---------------------------------------------------------------------------

/// Aggregate counts for one batch call. Derived, not stored.
/// `inserted` and `history` are independently fallible: a history write can
/// fail after a successful product write, but never the other way around.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BatchIngestResult {
    pub inserted: u64,
    pub history: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_key_resolution() {
        assert_eq!(ProductCategory::from_key("videocards"), ProductCategory::Videocards);
        assert_eq!(ProductCategory::from_key("Nintendo_Switch"), ProductCategory::NintendoSwitch);
        assert_eq!(ProductCategory::from_key("nintendo-switch"), ProductCategory::NintendoSwitch);
        assert_eq!(ProductCategory::from_key("iphone"), ProductCategory::Iphone);
        assert_eq!(ProductCategory::from_key("steam-deck"), ProductCategory::SteamDeck);
        assert_eq!(ProductCategory::from_key("fridges"), ProductCategory::Other);
    }

    #[test]
    fn change_type_serde_is_snake_case() {
        let s = serde_json::to_string(&ChangeType::Decrease).unwrap();
        assert_eq!(s, "\"decrease\"");
    }
}
