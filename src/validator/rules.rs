//! Generic keyword/model matcher plus the static per-category rule tables.
//!
//! Evaluation order is deterministic: exclusion rules first (hard reject,
//! short-circuit), then inclusion rules. The first rule that fires supplies
//! the verdict's reason.

use super::{normalize, Verdict};
use crate::types::ProductCategory;

/// Static keyword tables for one category. All matching is done on
/// normalized (lowercased, whitespace-stripped) strings.
pub struct CategoryRules {
    /// Category synonyms expected somewhere in a genuine title.
    pub names: &'static [&'static str],
    pub brands: &'static [&'static str],
    pub series: &'static [&'static str],
    pub features: &'static [&'static str],
}

const VIDEOCARD_RULES: CategoryRules = CategoryRules {
    names: &["видеокарта", "graphics card", "gpu"],
    brands: &[
        "msi", "palit", "gigabyte", "zotac", "inno3d", "asus", "colorful", "galax", "maxsun",
        "aorus", "igame",
    ],
    series: &["gaming", "eagle", "ventus", "strix", "tuf", "phantom", "super", "ultra", "oc"],
    features: &["rtx", "gtx", "rx", "geforce", "radeon"],
};

const PROCESSOR_RULES: CategoryRules = CategoryRules {
    names: &["процессор", "cpu", "processor"],
    brands: &["amd", "intel", "ryzen", "xeon", "core", "pentium", "celeron"],
    series: &["ryzen", "core", "i3", "i5", "i7", "i9", "x3d", "hx"],
    features: &["am5", "am4", "lga1700", "lga1200", "ddr5", "ddr4", "boost", "cores"],
};

const MOTHERBOARD_RULES: CategoryRules = CategoryRules {
    names: &["материнская плата", "motherboard"],
    brands: &["asus", "msi", "gigabyte", "asrock", "biostar", "aorus", "colorful", "maxsun"],
    series: &["tomahawk", "steel legend", "tuf", "prime", "eagle", "carbon", "elite", "wifi"],
    features: &["ddr5", "ddr4", "pcie", "wifi", "usb3", "sata", "nvme", "m.2"],
};

const PLAYSTATION_RULES: CategoryRules = CategoryRules {
    names: &["playstation", "ps5", "sony"],
    brands: &["sony", "playstation"],
    series: &["standard", "digital", "slim", "pro", "edition"],
    features: &["825gb", "1tb", "4k", "консоль"],
};

const IPHONE_RULES: CategoryRules = CategoryRules {
    names: &["iphone", "айфон"],
    brands: &["apple"],
    series: &[
        "16 pro", "16", "15 pro", "15", "14 pro", "14", "13 pro", "13", "12 pro", "12",
        "11 pro", "11", "se",
    ],
    features: &[
        "pro", "max", "mini", "plus", "oled", "retina", "5g", "128gb", "256gb", "512gb", "1tb",
        "гб", "тб",
    ],
};

const STEAM_DECK_RULES: CategoryRules = CategoryRules {
    names: &["steam deck oled", "steam deck"],
    brands: &["valve", "steam"],
    series: &["oled", "lcd", "512gb", "1tb", "256gb"],
    features: &["консоль", "портативная", "игровая", "ssd", "1tb", "512gb", "256gb"],
};

const GENERIC_RULES: CategoryRules = CategoryRules {
    names: &[],
    brands: &[],
    series: &[],
    features: &[],
};

pub fn rules_for(category: ProductCategory) -> &'static CategoryRules {
    match category {
        ProductCategory::Videocards => &VIDEOCARD_RULES,
        ProductCategory::Processors => &PROCESSOR_RULES,
        ProductCategory::Motherboards => &MOTHERBOARD_RULES,
        ProductCategory::Playstation => &PLAYSTATION_RULES,
        ProductCategory::Iphone => &IPHONE_RULES,
        ProductCategory::SteamDeck => &STEAM_DECK_RULES,
        ProductCategory::NintendoSwitch | ProductCategory::Other => &GENERIC_RULES,
    }
}

/// Generic keyword containment plus exact-model matching.
pub fn validate_generic(
    query: &str,
    title: &str,
    category: ProductCategory,
    exact_model: Option<&str>,
) -> Verdict {
    let norm_query = normalize(query);
    let norm_title = normalize(title);
    let rules = rules_for(category);

    let mut applied: Vec<String> = Vec::new();

    // Exclusion: a supplied exact-model constraint the title does not carry.
    if let Some(model) = exact_model {
        let norm_model = normalize(model);
        applied.push("exact-model".to_string());
        if !norm_model.is_empty() && !norm_title.contains(&norm_model) {
            return Verdict {
                is_valid: false,
                reason: format!("exact model mismatch ({model})"),
                confidence: 0.1,
                applied_rules: applied,
            };
        }
    }

    // Inclusion 1: normalized query containment.
    applied.push("query-match".to_string());
    if norm_title.contains(&norm_query) {
        let confidence = keyword_score(&norm_title, rules).max(0.6);
        return Verdict {
            is_valid: true,
            reason: "query match".to_string(),
            confidence,
            applied_rules: applied,
        };
    }

    // Inclusion 2: category keyword evidence when the literal query is absent
    // (marketplaces reword titles aggressively).
    applied.push("keyword-match".to_string());
    let score = keyword_score(&norm_title, rules);
    if score >= 0.5 && category != ProductCategory::Other {
        return Verdict {
            is_valid: true,
            reason: "category keyword match".to_string(),
            confidence: score,
            applied_rules: applied,
        };
    }

    Verdict {
        is_valid: false,
        reason: "no query match".to_string(),
        confidence: score,
        applied_rules: applied,
    }
}

/// Fraction of rule groups (names/brands/series/features) with at least one
/// hit in the title. Diagnostics heuristic only.
fn keyword_score(norm_title: &str, rules: &CategoryRules) -> f64 {
    let groups: [&[&str]; 4] = [rules.names, rules.brands, rules.series, rules.features];
    let populated = groups.iter().filter(|g| !g.is_empty()).count();
    if populated == 0 {
        return 0.0;
    }
    let hits = groups
        .iter()
        .filter(|g| !g.is_empty())
        .filter(|g| g.iter().any(|kw| norm_title.contains(&normalize(kw))))
        .count();
    hits as f64 / populated as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_containment_passes() {
        let v = validate_generic("rtx 4090", "Видеокарта MSI RTX 4090 Gaming X", ProductCategory::Videocards, None);
        assert!(v.is_valid);
        assert_eq!(v.reason, "query match");
        assert!(v.applied_rules.contains(&"query-match".to_string()));
    }

    #[test]
    fn exact_model_mismatch_rejects_even_with_query_match() {
        let v = validate_generic(
            "rtx 4090",
            "Видеокарта MSI RTX 4090 Gaming X",
            ProductCategory::Videocards,
            Some("RTX 4090 SUPRIM"),
        );
        assert!(!v.is_valid);
        assert_eq!(v.applied_rules, vec!["exact-model".to_string()]);
    }

    #[test]
    fn exact_model_present_then_query_checked() {
        let v = validate_generic(
            "rtx 4090",
            "MSI RTX 4090 Suprim X 24G",
            ProductCategory::Videocards,
            Some("RTX 4090 SUPRIM"),
        );
        assert!(v.is_valid);
    }

    #[test]
    fn keyword_evidence_passes_without_literal_query() {
        // Title rewords the query but carries brand + feature evidence.
        let v = validate_generic("14900k", "Процессор Intel Core i9 Raptor Lake LGA1700", ProductCategory::Processors, None);
        assert!(v.is_valid);
        assert_eq!(v.reason, "category keyword match");
    }

    #[test]
    fn unrelated_title_rejects() {
        let v = validate_generic("rtx 4090", "Кабель HDMI 2.1 позолоченный", ProductCategory::Videocards, None);
        assert!(!v.is_valid);
        assert_eq!(v.reason, "no query match");
    }

    #[test]
    fn iphone_keyword_evidence_passes_reworded_title() {
        // Cyrillic "айфон" title without the literal latin query.
        let v = validate_generic(
            "iphone 16 pro",
            "Смартфон Apple айфон 16 Pro Max 256ГБ",
            ProductCategory::Iphone,
            None,
        );
        assert!(v.is_valid);
        assert_eq!(v.reason, "category keyword match");
    }

    #[test]
    fn iphone_unrelated_title_rejects() {
        let v = validate_generic("iphone 15", "Кабель USB-C для зарядки 2м", ProductCategory::Iphone, None);
        assert!(!v.is_valid);
        assert_eq!(v.reason, "no query match");
    }

    #[test]
    fn steam_deck_query_containment_passes() {
        let v = validate_generic(
            "steam deck oled",
            "Игровая консоль Valve Steam Deck OLED 1TB",
            ProductCategory::SteamDeck,
            None,
        );
        assert!(v.is_valid);
        assert_eq!(v.reason, "query match");
    }

    #[test]
    fn confidence_never_flips_the_decision() {
        let v = validate_generic("z790", "Материнская плата MSI Z790 Tomahawk WiFi DDR5", ProductCategory::Motherboards, None);
        assert!(v.is_valid);
        assert!(v.confidence >= 0.0 && v.confidence <= 1.0);
    }
}
