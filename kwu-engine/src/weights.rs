//! Weight Resolver
//!
//! Maps free-form journey phase and search intent labels to numeric weights:
//!
//! 1. Normalize the label (trim, upper-case, collapse separators to `_`)
//! 2. Exact lookup: configured overrides, then the seed table for the axis
//! 3. Substring rules, in order; the first rule with a matching stem wins
//! 4. Axis default (0.5)
//!
//! Resolution is total: every input, including `None` and the empty string,
//! yields a weight.
//!
//! # Rule order
//! Rule order is part of the contract. More specific stems come first so that
//! e.g. `NEW_CUSTOMER` is not read as a purchase phase and `UNAWARE_OF_BRAND`
//! is not caught by the broader `aware` stem.

use crate::types::{Axis, MatchKind, WeightResolution};
use kwu_common::config::WeightOverrides;
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Ordered substring rule: any stem occurring in the label selects `weight`
#[derive(Debug, Clone, Copy)]
pub struct PatternRule {
    pub stems: &'static [&'static str],
    pub weight: f64,
}

/// Canonical journey phases
pub const JOURNEY_EXACT: &[(&str, f64)] = &[
    ("UNAWARE", 0.3),
    ("AWARENESS", 0.5),
    ("RESEARCH", 0.6),
    ("CONSIDERATION", 0.6),
    ("COMPARISON", 0.9),
    ("SHORTLIST", 0.9),
    ("DECISION", 1.0),
    ("PURCHASE", 1.0),
    ("RENEWAL", 0.7),
    ("CUSTOMER", 0.6),
    ("MEMBER", 0.6),
    ("ADVOCATE", 0.8),
    ("POWER", 0.8),
];

/// Journey substring rules, evaluated top to bottom
pub const JOURNEY_RULES: &[PatternRule] = &[
    PatternRule { stems: &["checkout", "purchase", "buy", "decision"], weight: 1.0 },
    PatternRule { stems: &["compar", "shortlist", "assess"], weight: 0.9 },
    PatternRule { stems: &["renew", "retain", "expansion"], weight: 0.7 },
    PatternRule { stems: &["advoc", "power", "experienced"], weight: 0.8 },
    PatternRule { stems: &["custom", "member", "holder", "subscriber"], weight: 0.6 },
    PatternRule { stems: &["research", "browse", "evaluat", "consider"], weight: 0.6 },
    PatternRule { stems: &["unaware", "discover"], weight: 0.3 },
    PatternRule { stems: &["aware", "learn"], weight: 0.5 },
];

/// Canonical search intents
///
/// Note: COMPARISON is 0.8 here and 0.9 on the journey axis (unconfirmed).
pub const INTENT_EXACT: &[(&str, f64)] = &[
    ("TRANSACTIONAL", 1.0),
    ("COMMERCIAL", 0.9),
    ("COMPARISON", 0.8),
    ("NAVIGATIONAL", 0.7),
    ("INFORMATIONAL", 0.5),
];

/// Intent substring rules, evaluated top to bottom
pub const INTENT_RULES: &[PatternRule] = &[
    PatternRule { stems: &["transact", "buy", "purchase", "checkout"], weight: 1.0 },
    PatternRule { stems: &["commercial"], weight: 0.9 },
    PatternRule { stems: &["compar"], weight: 0.8 },
    PatternRule { stems: &["navigat", "brand"], weight: 0.7 },
    PatternRule { stems: &["informat"], weight: 0.5 },
];

static DEFAULT_RESOLVER: Lazy<WeightResolver> = Lazy::new(WeightResolver::new);

/// Resolve a label with the seed tables only
///
/// # Examples
/// ```
/// use kwu_engine::types::Axis;
/// use kwu_engine::weights::resolve_weight;
///
/// assert_eq!(resolve_weight(Some("COMPARISON"), Axis::Journey), 0.9);
/// assert_eq!(resolve_weight(Some("RESEARCHING"), Axis::Journey), 0.6);
/// assert_eq!(resolve_weight(None, Axis::Intent), 0.5);
/// ```
pub fn resolve_weight(label: Option<&str>, axis: Axis) -> f64 {
    DEFAULT_RESOLVER.weight(label, axis)
}

/// Normalize a label for lookup: trim, upper-case, collapse runs of
/// whitespace, `-`, `_`, `/`, `.`, `:` into a single `_`
pub fn normalize_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut pending_separator = false;

    for c in label.trim().chars() {
        if c.is_whitespace() || matches!(c, '-' | '_' | '/' | '.' | ':') {
            pending_separator = true;
        } else {
            if pending_separator && !out.is_empty() {
                out.push('_');
            }
            pending_separator = false;
            out.extend(c.to_uppercase());
        }
    }

    out
}

/// Lookup tables for one axis
#[derive(Debug, Clone)]
struct AxisTable {
    axis: Axis,
    overrides: HashMap<String, f64>,
    exact: HashMap<String, f64>,
    rules: &'static [PatternRule],
}

impl AxisTable {
    fn new(axis: Axis, exact: &[(&str, f64)], rules: &'static [PatternRule]) -> Self {
        Self {
            axis,
            overrides: HashMap::new(),
            exact: exact
                .iter()
                .map(|(label, weight)| (label.to_string(), *weight))
                .collect(),
            rules,
        }
    }

    fn with_overrides(mut self, overrides: &BTreeMap<String, f64>) -> Self {
        self.overrides = overrides
            .iter()
            .map(|(label, weight)| (normalize_label(label), weight.clamp(0.0, 1.0)))
            .filter(|(label, _)| !label.is_empty())
            .collect();
        self
    }

    fn resolve(&self, label: Option<&str>) -> WeightResolution {
        let normalized = label.map(normalize_label).unwrap_or_default();
        if normalized.is_empty() {
            return self.fallback();
        }

        if let Some(&weight) = self
            .overrides
            .get(&normalized)
            .or_else(|| self.exact.get(&normalized))
        {
            return WeightResolution {
                weight,
                kind: MatchKind::Exact,
                matched: Some(normalized),
            };
        }

        let lowered = normalized.to_lowercase();
        for rule in self.rules {
            if let Some(stem) = rule.stems.iter().find(|stem| lowered.contains(*stem)) {
                debug!(
                    axis = %self.axis,
                    label = %normalized,
                    stem = %stem,
                    weight = rule.weight,
                    "Label matched by substring rule"
                );
                return WeightResolution {
                    weight: rule.weight,
                    kind: MatchKind::Pattern,
                    matched: Some(stem.to_string()),
                };
            }
        }

        debug!(axis = %self.axis, label = %normalized, "Unrecognized label, using axis default");
        self.fallback()
    }

    fn fallback(&self) -> WeightResolution {
        WeightResolution {
            weight: self.axis.default_weight(),
            kind: MatchKind::Default,
            matched: None,
        }
    }
}

/// Weight Resolver
///
/// Holds the exact tables and ordered rules for both axes, plus optional
/// industry-specific exact overrides from configuration.
///
/// # Example
/// ```
/// use kwu_engine::types::{Axis, MatchKind};
/// use kwu_engine::weights::WeightResolver;
///
/// let resolver = WeightResolver::new();
/// let resolution = resolver.resolve(Some("new customer"), Axis::Journey);
/// assert_eq!(resolution.weight, 0.6);
/// assert_eq!(resolution.kind, MatchKind::Pattern);
/// ```
#[derive(Debug, Clone)]
pub struct WeightResolver {
    journey: AxisTable,
    intent: AxisTable,
}

impl WeightResolver {
    /// Resolver with the seed tables only
    pub fn new() -> Self {
        Self {
            journey: AxisTable::new(Axis::Journey, JOURNEY_EXACT, JOURNEY_RULES),
            intent: AxisTable::new(Axis::Intent, INTENT_EXACT, INTENT_RULES),
        }
    }

    /// Resolver with configured exact-label overrides (weights clamped to [0, 1])
    pub fn with_overrides(overrides: &WeightOverrides) -> Self {
        let base = Self::new();
        Self {
            journey: base.journey.with_overrides(&overrides.journey),
            intent: base.intent.with_overrides(&overrides.intent),
        }
    }

    /// Resolve a label, reporting how it matched
    pub fn resolve(&self, label: Option<&str>, axis: Axis) -> WeightResolution {
        match axis {
            Axis::Journey => self.journey.resolve(label),
            Axis::Intent => self.intent.resolve(label),
        }
    }

    /// Resolve a label to its weight
    pub fn weight(&self, label: Option<&str>, axis: Axis) -> f64 {
        self.resolve(label, axis).weight
    }
}

impl Default for WeightResolver {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("  new customer "), "NEW_CUSTOMER");
        assert_eq!(normalize_label("new--customer"), "NEW_CUSTOMER");
        assert_eq!(normalize_label("_Aware / Not Insured_"), "AWARE_NOT_INSURED");
        assert_eq!(normalize_label("   "), "");
    }

    #[test]
    fn test_absent_and_empty_labels_default() {
        let resolver = WeightResolver::new();
        for axis in [Axis::Journey, Axis::Intent] {
            let none = resolver.resolve(None, axis);
            assert_eq!(none.weight, 0.5);
            assert_eq!(none.kind, MatchKind::Default);

            let empty = resolver.resolve(Some(""), axis);
            assert_eq!(empty.kind, MatchKind::Default);

            let separators = resolver.resolve(Some(" -_/ "), axis);
            assert_eq!(separators.kind, MatchKind::Default);
        }
    }

    #[test]
    fn test_journey_exact_table() {
        let resolver = WeightResolver::new();
        for (label, weight) in JOURNEY_EXACT {
            let r = resolver.resolve(Some(label), Axis::Journey);
            assert_eq!(r.weight, *weight, "label {}", label);
            assert_eq!(r.kind, MatchKind::Exact);
        }
    }

    #[test]
    fn test_intent_exact_table() {
        let resolver = WeightResolver::new();
        for (label, weight) in INTENT_EXACT {
            assert_eq!(resolver.weight(Some(label), Axis::Intent), *weight, "label {}", label);
        }
    }

    #[test]
    fn test_exact_match_is_case_insensitive() {
        let resolver = WeightResolver::new();
        let r = resolver.resolve(Some("comparison"), Axis::Journey);
        assert_eq!(r.weight, 0.9);
        assert_eq!(r.kind, MatchKind::Exact);
    }

    #[test]
    fn test_exact_beats_pattern() {
        let resolver = WeightResolver::new();
        // "renewal" also contains "renew"; exact must answer first
        let r = resolver.resolve(Some("RENEWAL"), Axis::Journey);
        assert_eq!(r.weight, 0.7);
        assert_eq!(r.kind, MatchKind::Exact);
        assert_eq!(r.matched.as_deref(), Some("RENEWAL"));
    }

    #[test]
    fn test_researching_uses_research_rule() {
        let resolver = WeightResolver::new();
        let r = resolver.resolve(Some("RESEARCHING"), Axis::Journey);
        assert_eq!(r.weight, 0.6);
        assert_eq!(r.kind, MatchKind::Pattern);
        assert_eq!(r.matched.as_deref(), Some("research"));
    }

    #[test]
    fn test_new_customer_is_not_purchase() {
        let resolver = WeightResolver::new();
        assert_eq!(resolver.weight(Some("NEW_CUSTOMER"), Axis::Journey), 0.6);
        assert_eq!(resolver.weight(Some("repeat purchase"), Axis::Journey), 1.0);
    }

    #[test]
    fn test_unaware_stem_precedes_aware() {
        let resolver = WeightResolver::new();
        assert_eq!(resolver.weight(Some("UNAWARE_OF_BRAND"), Axis::Journey), 0.3);
        assert_eq!(resolver.weight(Some("AWARE_NOT_INSURED"), Axis::Journey), 0.5);
        assert_eq!(resolver.weight(Some("problem discovery"), Axis::Journey), 0.3);
    }

    #[test]
    fn test_rule_order_first_match_wins() {
        let resolver = WeightResolver::new();
        // Both "compar" (0.9) and "custom" (0.6) occur; the earlier rule wins
        assert_eq!(resolver.weight(Some("customer comparing plans"), Axis::Journey), 0.9);
    }

    #[test]
    fn test_intent_patterns() {
        let resolver = WeightResolver::new();
        assert_eq!(resolver.weight(Some("transactional-local"), Axis::Intent), 1.0);
        assert_eq!(resolver.weight(Some("commercial investigation"), Axis::Intent), 0.9);
        assert_eq!(resolver.weight(Some("product comparison"), Axis::Intent), 0.8);
        assert_eq!(resolver.weight(Some("branded"), Axis::Intent), 0.7);
        assert_eq!(resolver.weight(Some("informative"), Axis::Intent), 0.5);
        assert_eq!(resolver.weight(Some("local"), Axis::Intent), 0.5);
    }

    #[test]
    fn test_unknown_label_defaults_with_flag() {
        let resolver = WeightResolver::new();
        let unknown = resolver.resolve(Some("LIFE_EVENT"), Axis::Journey);
        let awareness = resolver.resolve(Some("AWARENESS"), Axis::Journey);

        assert_eq!(unknown.weight, awareness.weight);
        assert_eq!(unknown.kind, MatchKind::Default);
        assert_eq!(awareness.kind, MatchKind::Exact);
    }

    #[test]
    fn test_axes_keep_distinct_comparison_weights() {
        let resolver = WeightResolver::new();
        assert_eq!(resolver.weight(Some("COMPARISON"), Axis::Journey), 0.9);
        assert_eq!(resolver.weight(Some("COMPARISON"), Axis::Intent), 0.8);
    }

    #[test]
    fn test_overrides_take_priority_and_clamp() {
        let mut overrides = WeightOverrides::default();
        overrides.journey.insert("aware not insured".to_string(), 0.8);
        overrides.journey.insert("COMPARISON".to_string(), 0.95);
        overrides.intent.insert("local".to_string(), 3.0);

        let resolver = WeightResolver::with_overrides(&overrides);

        let r = resolver.resolve(Some("AWARE_NOT_INSURED"), Axis::Journey);
        assert_eq!(r.weight, 0.8);
        assert_eq!(r.kind, MatchKind::Exact);
        assert_eq!(resolver.weight(Some("comparison"), Axis::Journey), 0.95);
        assert_eq!(resolver.weight(Some("LOCAL"), Axis::Intent), 1.0);
        // Overrides are per axis
        assert_eq!(resolver.weight(Some("AWARE_NOT_INSURED"), Axis::Intent), 0.5);
    }

    #[test]
    fn test_free_function_uses_seed_tables() {
        assert_eq!(resolve_weight(Some("DECISION"), Axis::Journey), 1.0);
        assert_eq!(resolve_weight(Some("NAVIGATIONAL"), Axis::Intent), 0.7);
    }
}
