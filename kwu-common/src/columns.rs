//! Canonical column names for keyword records.
//!
//! Upstream ingestion maps export-specific headers ("Search Volume", "KD",
//! "Avg. CPC", ...) onto these names before records reach the engine.
//! Per-source ranking columns are prefixed with the source slug, e.g. the
//! `position` column of a source named "Acme Insurance" becomes
//! `acme_insurance_position`.

/// Join key, unique within a record set
pub const KEYWORD: &str = "keyword";

/// Monthly search volume
pub const SEARCH_VOLUME: &str = "search_volume";
/// Cost per click (currency units)
pub const CPC: &str = "cpc";
/// Keyword difficulty (0-100)
pub const DIFFICULTY: &str = "difficulty";

/// Ranking position reported by a source
pub const POSITION: &str = "position";
/// Ranking URL reported by a source
pub const URL: &str = "url";
/// Estimated traffic reported by a source
pub const TRAFFIC: &str = "traffic";
/// Estimated traffic value reported by a source
pub const TRAFFIC_COST: &str = "traffic_cost";

/// Classifier output: customer journey phase (free-form)
pub const JOURNEY_PHASE: &str = "journey_phase";
/// Classifier output: search intent (free-form)
pub const SEARCH_INTENT: &str = "search_intent";

/// Derived weight for `journey_phase`
pub const JOURNEY_WEIGHT: &str = "journey_weight";
/// Derived weight for `search_intent`
pub const INTENT_WEIGHT: &str = "intent_weight";
/// How `journey_weight` was resolved (`exact`, `pattern`, `default`)
pub const JOURNEY_WEIGHT_MATCH: &str = "journey_weight_match";
/// How `intent_weight` was resolved (`exact`, `pattern`, `default`)
pub const INTENT_WEIGHT_MATCH: &str = "intent_weight_match";

pub const BUSINESS_VALUE: &str = "business_value";
pub const COMPETITORS_RANKING: &str = "competitors_ranking";
pub const OPPORTUNITY_GAP: &str = "opportunity_gap";
pub const OPPORTUNITY_SCORE: &str = "opportunity_score";

/// Comma-separated SERP feature list
pub const SERP_FEATURES: &str = "serp_features";
/// Date the keyword was first observed by the research tool
pub const FIRST_SEEN: &str = "first_seen";

/// Columns a secondary source contributes under its own prefix
pub const RANKING_COLUMNS: [&str; 4] = [POSITION, URL, TRAFFIC, TRAFFIC_COST];

/// Keyword data columns coalesced across sources
pub const DATA_COLUMNS: [&str; 3] = [SEARCH_VOLUME, CPC, DIFFICULTY];

/// Suffix identifying a per-source position column
pub const POSITION_SUFFIX: &str = "_position";

/// Slug used to prefix a source's columns: lower-cased, spaces to underscores
pub fn source_slug(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

/// Prefixed column name for a source, e.g. `("acme", "position")` → `acme_position`
pub fn source_column(slug: &str, column: &str) -> String {
    format!("{}_{}", slug, column)
}
