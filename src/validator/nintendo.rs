//! Authenticity matcher for the nintendo_switch category.
//!
//! Switch listings are the main counterfeit/modified-hardware surface:
//! consoles with flashed or chipped firmware are resold as new, accessories
//! are titled like consoles, and "V1/V2" labels mask revision scams. All of
//! those are exclusion rules and run before any inclusion check.

use super::{normalize, Verdict};

/// Firmware-modification markers. A title carrying one is rejected no matter
/// how well the model keywords match.
const MOD_MARKERS: &[&str] = &[
    "прошит",
    "чипован",
    "взлом",
    "пиратск",
    "hwfly",
    "picofly",
    "modchip",
    "modded",
    "jailbreak",
];

/// Accessory/spare-part markers: not a console.
const ACCESSORY_MARKERS: &[&str] = &[
    "чехол",
    "панель",
    "пластина",
    "корпус",
    "геймпад",
    "джойстик",
    "кабель",
    "зарядн",
    "подставка",
    "сумка",
    "наклейка",
    "стекло",
    "case",
    "skin",
];

/// Competing consoles that show up in Switch search results.
const OTHER_CONSOLES: &[&str] = &["playstation", "ps5", "ps4", "xbox", "sega", "atari"];

/// Official product-line keywords (normalized form).
const LINE_KEYWORDS: &[&str] = &["nintendo", "switch", "игроваяконсоль", "игроваяприставка"];

pub fn validate(query: &str, title: &str) -> Verdict {
    let norm_query = normalize(query);
    let norm_title = normalize(title);
    let mut applied: Vec<String> = Vec::new();

    // --- Exclusion rules: first hit rejects ---

    applied.push("mod-marker".to_string());
    if let Some(marker) = MOD_MARKERS.iter().find(|m| norm_title.contains(&normalize(m))) {
        return Verdict {
            is_valid: false,
            reason: format!("modified hardware ({marker})"),
            confidence: 0.95,
            applied_rules: applied,
        };
    }

    applied.push("accessory".to_string());
    if ACCESSORY_MARKERS.iter().any(|m| norm_title.contains(&normalize(m))) {
        return Verdict {
            is_valid: false,
            reason: "accessory, not a console".to_string(),
            confidence: 0.9,
            applied_rules: applied,
        };
    }

    applied.push("other-console".to_string());
    if OTHER_CONSOLES.iter().any(|m| norm_title.contains(m)) {
        return Verdict {
            is_valid: false,
            reason: "different console line".to_string(),
            confidence: 0.9,
            applied_rules: applied,
        };
    }

    // Revision-scam labels: real retail units are never sold as "V1"/"V2".
    applied.push("revision-label".to_string());
    if norm_title.contains("v1") || norm_title.contains("v2") {
        return Verdict {
            is_valid: false,
            reason: "suspicious V1/V2 revision label".to_string(),
            confidence: 0.8,
            applied_rules: applied,
        };
    }

    // Variant mismatch: OLED vs Lite are different products.
    applied.push("variant-mismatch".to_string());
    if let Some(reason) = variant_mismatch(&norm_query, &norm_title) {
        return Verdict {
            is_valid: false,
            reason,
            confidence: 0.85,
            applied_rules: applied,
        };
    }

    // --- Inclusion rules ---

    applied.push("query-match".to_string());
    if norm_title.contains(&norm_query) {
        return Verdict {
            is_valid: true,
            reason: "query match".to_string(),
            confidence: 0.95,
            applied_rules: applied,
        };
    }

    applied.push("line-keywords".to_string());
    let query_in_line = LINE_KEYWORDS.iter().any(|kw| norm_query.contains(kw));
    let title_in_line = LINE_KEYWORDS.iter().any(|kw| norm_title.contains(kw));
    if query_in_line && title_in_line {
        return Verdict {
            is_valid: true,
            reason: "official product line match".to_string(),
            confidence: 0.7,
            applied_rules: applied,
        };
    }

    Verdict {
        is_valid: false,
        reason: "no query match".to_string(),
        confidence: 0.1,
        applied_rules: applied,
    }
}

/// Returns a rejection reason when the query pins one variant and the title
/// names the other.
fn variant_mismatch(norm_query: &str, norm_title: &str) -> Option<String> {
    if norm_query.contains("oled") && norm_title.contains("lite") {
        return Some("Lite variant, OLED requested".to_string());
    }
    if norm_query.contains("lite") && norm_title.contains("oled") {
        return Some("OLED variant, Lite requested".to_string());
    }
    // Switch 2 vs original Switch.
    if norm_query.contains("switch2") && !norm_title.contains("2") {
        return Some("original Switch, Switch 2 requested".to_string());
    }
    None
}
