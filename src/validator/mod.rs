//! Per-category listing validators. One ruleset per tracked category,
//! dispatched through a closed enum — no open-ended registration.
//!
//! A verdict is a pure function of (query, title, category, exact_model):
//! calling twice with identical inputs yields an identical verdict.

pub mod nintendo;
pub mod rules;

use crate::types::ProductCategory;

/// Outcome of validating one listing title against one query/category context.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub is_valid: bool,
    pub reason: String,
    /// Heuristic match score in [0, 1]. Diagnostics only — never drives the
    /// pass/fail decision.
    pub confidence: f64,
    /// Rule identifiers in evaluation order; the first rule that fired
    /// supplies `reason`.
    pub applied_rules: Vec<String>,
}

impl Verdict {
    pub fn reject(reason: &str, confidence: f64, rule: &str) -> Self {
        Self {
            is_valid: false,
            reason: reason.to_string(),
            confidence,
            applied_rules: vec![rule.to_string()],
        }
    }
}

/// Validate one listing title. Malformed input never errors — it produces a
/// negative verdict.
pub fn verdict(
    query: &str,
    title: &str,
    category: ProductCategory,
    exact_model: Option<&str>,
) -> Verdict {
    if query.trim().is_empty() || title.trim().is_empty() {
        return Verdict::reject("empty input", 0.0, "empty-input");
    }

    match category {
        ProductCategory::NintendoSwitch => nintendo::validate(query, title),
        _ => rules::validate_generic(query, title, category, exact_model),
    }
}

/// Lowercase and strip all whitespace so "RTX 4090" matches "rtx4090".
pub(crate) fn normalize(s: &str) -> String {
    s.to_lowercase().chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_inputs_reject_without_panic() {
        let v = verdict("", "RTX 4090", ProductCategory::Videocards, None);
        assert!(!v.is_valid);
        assert_eq!(v.reason, "empty input");

        let v = verdict("rtx 4090", "   ", ProductCategory::Videocards, None);
        assert!(!v.is_valid);
        assert_eq!(v.applied_rules, vec!["empty-input".to_string()]);
    }

    #[test]
    fn verdicts_are_idempotent() {
        let a = verdict("nintendo switch oled", "Nintendo Switch OLED Неоновый", ProductCategory::NintendoSwitch, None);
        let b = verdict("nintendo switch oled", "Nintendo Switch OLED Неоновый", ProductCategory::NintendoSwitch, None);
        assert_eq!(a, b);
    }

    #[test]
    fn unknown_category_takes_generic_path() {
        let v = verdict("rtx 4090", "Видеокарта RTX 4090 Gaming OC", ProductCategory::Other, None);
        assert!(v.is_valid);
    }

    #[test]
    fn normalize_strips_whitespace_and_case() {
        assert_eq!(normalize("RTX  4090 Ti"), "rtx4090ti");
    }
}
