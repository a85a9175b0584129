//! Universe statistics

use crate::universe::Universe;
use kwu_common::columns::{BUSINESS_VALUE, JOURNEY_PHASE, SEARCH_INTENT};
use serde::Serialize;

/// Headline counts for a universe snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UniverseStats {
    pub total_keywords: usize,
    /// Distinct columns, keyword included
    pub column_count: usize,
    pub classified_keywords: usize,
    /// Keywords the brand source ranks for (0 without a brand source)
    pub brand_ranking_keywords: usize,
    pub total_business_value: f64,
    /// Keywords with at least one competitor position
    pub competitor_data_keywords: usize,
    pub sources: usize,
}

impl UniverseStats {
    pub fn compute(universe: &Universe) -> Self {
        let brand = universe.brand_position_column();
        let competitors = universe.competitor_position_columns();

        let mut stats = Self {
            total_keywords: universe.len(),
            column_count: universe.records.columns().len(),
            classified_keywords: 0,
            brand_ranking_keywords: 0,
            total_business_value: 0.0,
            competitor_data_keywords: 0,
            sources: universe.sources.len(),
        };

        for record in &universe.records {
            if record.text(JOURNEY_PHASE).is_some() || record.text(SEARCH_INTENT).is_some() {
                stats.classified_keywords += 1;
            }
            if brand.is_some_and(|column| record.number(column).is_some()) {
                stats.brand_ranking_keywords += 1;
            }
            if competitors.iter().any(|column| record.number(column).is_some()) {
                stats.competitor_data_keywords += 1;
            }
            stats.total_business_value += record.number(BUSINESS_VALUE).unwrap_or(0.0);
        }

        stats
    }
}
