//! Metric Calculator
//!
//! Two-phase batch scoring over a classified universe:
//!
//! **Phase 1 (per record):** journey/intent weights and business value
//! `max(volume, 0) * max(cpc, 0) * journey_weight * intent_weight`
//!
//! **Phase 2 (needs phase 1 for every record):** competitive gap and the
//! opportunity score, normalized by the universe's maximum business value
//!
//! ```text
//! score = 100 * (0.5 * value / max_value
//!              + 0.3 * (100 - difficulty) / 100
//!              + 0.2 * opportunity_gap)
//! ```
//!
//! Absent volume or CPC yields a business value of 0. Absent difficulty is
//! scored as 100 (hardest).

use crate::types::{Axis, MatchKind, WeightResolution};
use crate::weights::WeightResolver;
use kwu_common::columns::{
    BUSINESS_VALUE, COMPETITORS_RANKING, CPC, DIFFICULTY, INTENT_WEIGHT, INTENT_WEIGHT_MATCH,
    JOURNEY_PHASE, JOURNEY_WEIGHT, JOURNEY_WEIGHT_MATCH, OPPORTUNITY_GAP, OPPORTUNITY_SCORE,
    SEARCH_INTENT, SEARCH_VOLUME,
};
use kwu_common::{Record, RecordSet};
use serde::Serialize;
use tracing::{debug, info};

/// Weight of the normalized business value term
pub const VALUE_WEIGHT: f64 = 0.5;
/// Weight of the ease (100 - difficulty) term
pub const EASE_WEIGHT: f64 = 0.3;
/// Weight of the competitive gap term
pub const GAP_WEIGHT: f64 = 0.2;

/// Difficulty assumed when a record has none
pub const MISSING_DIFFICULTY: f64 = 100.0;

/// Phase 1 result for one record
#[derive(Debug, Clone, PartialEq)]
pub struct ValueBreakdown {
    pub journey: WeightResolution,
    pub intent: WeightResolution,
    pub business_value: f64,
}

/// Weights and business value for one record
pub fn business_value_breakdown(record: &Record, resolver: &WeightResolver) -> ValueBreakdown {
    let journey = resolver.resolve(record.text(JOURNEY_PHASE), Axis::Journey);
    let intent = resolver.resolve(record.text(SEARCH_INTENT), Axis::Intent);

    let volume = record.number(SEARCH_VOLUME).unwrap_or(0.0).max(0.0);
    let cpc = record.number(CPC).unwrap_or(0.0).max(0.0);
    let business_value = volume * cpc * journey.weight * intent.weight;

    ValueBreakdown {
        journey,
        intent,
        business_value,
    }
}

/// `volume * cpc * journey_weight * intent_weight`, absent inputs as 0
pub fn calculate_business_value(record: &Record, resolver: &WeightResolver) -> f64 {
    business_value_breakdown(record, resolver).business_value
}

/// Opportunity score in [0, 100]
///
/// Reads `business_value`, `difficulty` and `opportunity_gap` from the record.
/// When `max_business_value` is not positive the value term contributes 0.
pub fn calculate_opportunity_score(record: &Record, max_business_value: f64) -> f64 {
    let value = record.number(BUSINESS_VALUE).unwrap_or(0.0).max(0.0);
    let value_term = if max_business_value > 0.0 {
        (value / max_business_value).min(1.0)
    } else {
        0.0
    };

    let difficulty = record
        .number(DIFFICULTY)
        .unwrap_or(MISSING_DIFFICULTY)
        .clamp(0.0, 100.0);
    let ease_term = (100.0 - difficulty) / 100.0;

    let gap = record.number(OPPORTUNITY_GAP).unwrap_or(0.0).clamp(0.0, 1.0);

    let score = 100.0 * (VALUE_WEIGHT * value_term + EASE_WEIGHT * ease_term + GAP_WEIGHT * gap);
    score.clamp(0.0, 100.0)
}

/// Position columns used by the competitive gap
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionColumns {
    pub brand: Option<String>,
    pub competitors: Vec<String>,
}

/// Competitive gap for one record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gap {
    /// Competitor position columns present on the record
    pub competitors_ranking: usize,
    /// Fraction of competitor positions present while the brand is unranked
    pub opportunity_gap: f64,
}

impl PositionColumns {
    /// Gap needs both a brand column and at least one competitor column
    pub fn supports_gap(&self) -> bool {
        self.brand.is_some() && !self.competitors.is_empty()
    }

    pub fn gap(&self, record: &Record) -> Gap {
        let competitors_ranking = self
            .competitors
            .iter()
            .filter(|column| record.number(column).is_some())
            .count();

        let opportunity_gap = match &self.brand {
            Some(brand) if !self.competitors.is_empty() && record.number(brand).is_none() => {
                competitors_ranking as f64 / self.competitors.len() as f64
            }
            _ => 0.0,
        };

        Gap {
            competitors_ranking,
            opportunity_gap,
        }
    }
}

/// Per-axis tally of how labels were resolved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchCounts {
    pub exact: usize,
    pub pattern: usize,
    pub default: usize,
}

impl MatchCounts {
    fn record(&mut self, kind: MatchKind) {
        match kind {
            MatchKind::Exact => self.exact += 1,
            MatchKind::Pattern => self.pattern += 1,
            MatchKind::Default => self.default += 1,
        }
    }
}

/// Outcome of a scoring run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub scored: usize,
    pub max_business_value: f64,
    pub total_business_value: f64,
    pub journey_matches: MatchCounts,
    pub intent_matches: MatchCounts,
    /// Records with a positive opportunity gap
    pub gap_keywords: usize,
}

/// Metric Calculator
pub struct MetricCalculator<'a> {
    resolver: &'a WeightResolver,
}

impl<'a> MetricCalculator<'a> {
    pub fn new(resolver: &'a WeightResolver) -> Self {
        Self { resolver }
    }

    /// Score every record in place
    ///
    /// Writes `journey_weight`, `intent_weight`, their `_match` flags,
    /// `business_value`, `competitors_ranking`, `opportunity_gap` and
    /// `opportunity_score`.
    pub fn score(&self, records: &mut RecordSet, positions: &PositionColumns) -> MetricsSummary {
        let mut summary = MetricsSummary::default();

        // Phase 1: per-record value
        for record in records.iter_mut() {
            let breakdown = business_value_breakdown(record, self.resolver);

            summary.journey_matches.record(breakdown.journey.kind);
            summary.intent_matches.record(breakdown.intent.kind);
            summary.total_business_value += breakdown.business_value;
            summary.max_business_value = summary.max_business_value.max(breakdown.business_value);

            record.set(JOURNEY_WEIGHT, breakdown.journey.weight);
            record.set(INTENT_WEIGHT, breakdown.intent.weight);
            record.set(JOURNEY_WEIGHT_MATCH, breakdown.journey.kind.as_str());
            record.set(INTENT_WEIGHT_MATCH, breakdown.intent.kind.as_str());
            record.set(BUSINESS_VALUE, breakdown.business_value);
        }

        debug!(
            records = records.len(),
            max_business_value = summary.max_business_value,
            journey_defaulted = summary.journey_matches.default,
            intent_defaulted = summary.intent_matches.default,
            "Phase 1 complete: business value"
        );

        if !positions.supports_gap() {
            debug!("No brand/competitor position pair, opportunity gap is 0");
        }

        // Phase 2: normalized metrics
        for record in records.iter_mut() {
            let gap = positions.gap(record);
            if gap.opportunity_gap > 0.0 {
                summary.gap_keywords += 1;
            }
            record.set(COMPETITORS_RANKING, gap.competitors_ranking);
            record.set(OPPORTUNITY_GAP, gap.opportunity_gap);

            let score = calculate_opportunity_score(record, summary.max_business_value);
            record.set(OPPORTUNITY_SCORE, score);
            summary.scored += 1;
        }

        info!(
            scored = summary.scored,
            total_business_value = summary.total_business_value,
            gap_keywords = summary.gap_keywords,
            "Universe scored"
        );

        summary
    }
}
