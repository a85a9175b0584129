//! Subset Generator
//!
//! Named, read-only views over a scored universe. Each view is independently
//! re-derivable; the generator simply runs every configured view and drops
//! the ones that come out empty.

pub mod aggregates;
pub mod filters;
pub mod serp;

use crate::universe::Universe;
use chrono::{DateTime, Utc};
use kwu_common::config::SubsetConfig;
use kwu_common::{Record, Row};
use serde::Serialize;
use std::cmp::Ordering;
use tracing::{debug, info};

pub use aggregates::{BrandAnalysis, BusinessInsights, JourneyBreakdown};
pub use filters::{
    HighValue, HighValueLowCompetition, LowHangingFruit, NewlyDiscovered, TopOpportunities,
};
pub use serp::{SerpFeature, SerpSummary};

/// A named table derived from a universe
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subset {
    pub name: String,
    pub description: String,
    /// Column order for tabular export
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Subset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One derived view
pub trait SubsetView {
    /// Subset name, also used as the export file stem
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Derive the subset; `None` when the view does not apply to this universe
    fn derive(&self, universe: &Universe) -> Option<Subset>;
}

/// Runs a list of views over a universe
pub struct SubsetGenerator {
    views: Vec<Box<dyn SubsetView>>,
}

impl SubsetGenerator {
    /// Standard views with thresholds from configuration
    ///
    /// `as_of` anchors the `newly_discovered` window.
    pub fn new(config: &SubsetConfig, as_of: DateTime<Utc>) -> Self {
        let views: Vec<Box<dyn SubsetView>> = vec![
            Box::new(LowHangingFruit::new(
                config.low_hanging_min_position,
                config.low_hanging_max_position,
            )),
            Box::new(HighValueLowCompetition::new(
                config.low_competition_max_difficulty,
                config.low_competition_min_volume,
            )),
            Box::new(TopOpportunities::new(config.top_opportunities_limit)),
            Box::new(HighValue::new(config.high_value_quantile)),
            Box::new(NewlyDiscovered::new(config.newly_discovered_days, as_of)),
            Box::new(JourneyBreakdown),
            Box::new(BrandAnalysis),
            Box::new(BusinessInsights),
            Box::new(SerpSummary),
        ];
        Self { views }
    }

    /// Add one `serp_{feature}` subset per feature
    pub fn with_serp_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for feature in features {
            let feature = feature.as_ref().trim();
            if !feature.is_empty() {
                self.views.push(Box::new(SerpFeature::new(feature)));
            }
        }
        self
    }

    /// Add a custom view
    pub fn with_view(mut self, view: Box<dyn SubsetView>) -> Self {
        self.views.push(view);
        self
    }

    pub fn view_names(&self) -> Vec<&str> {
        self.views.iter().map(|v| v.name()).collect()
    }

    /// Derive every non-empty subset, in view order
    pub fn generate(&self, universe: &Universe) -> Vec<Subset> {
        let subsets: Vec<Subset> = self
            .views
            .iter()
            .filter_map(|view| {
                let subset = view.derive(universe).filter(|s| !s.is_empty());
                if subset.is_none() {
                    debug!(subset = view.name(), "Subset empty or not applicable, skipped");
                }
                subset
            })
            .collect();

        info!(
            generated = subsets.len(),
            views = self.views.len(),
            "Subsets generated"
        );
        subsets
    }
}

/// Subset of whole records, with the universe's column order
pub(crate) fn record_subset(
    view: &dyn SubsetView,
    universe: &Universe,
    records: Vec<&Record>,
) -> Option<Subset> {
    if records.is_empty() {
        return None;
    }
    Some(Subset {
        name: view.name().to_string(),
        description: view.description().to_string(),
        columns: universe.records.columns(),
        rows: records.into_iter().map(Record::to_row).collect(),
    })
}

/// Descending by a numeric column; absent sorts last
pub(crate) fn descending(a: &Record, b: &Record, column: &str) -> Ordering {
    let a = a.number(column).unwrap_or(f64::NEG_INFINITY);
    let b = b.number(column).unwrap_or(f64::NEG_INFINITY);
    b.total_cmp(&a)
}

/// Round to two decimals for display columns
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}


#[cfg(test)]
mod tests {
    use super::test_support::scored_universe;
    use super::*;
    use chrono::TimeZone;

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_generator_omits_empty_subsets() {
        let universe = scored_universe();
        let generator = SubsetGenerator::new(&SubsetConfig::default(), as_of())
            .with_serp_features(["Video carousel"]);

        let subsets = generator.generate(&universe);
        let names: Vec<&str> = subsets.iter().map(|s| s.name.as_str()).collect();

        assert!(names.contains(&"low_hanging_fruit"));
        assert!(names.contains(&"top_opportunities"));
        assert!(names.contains(&"journey_breakdown"));
        assert!(!names.contains(&"serp_video_carousel"));
        assert!(subsets.iter().all(|s| !s.is_empty()));
    }

    #[test]
    fn test_generator_view_order() {
        let generator = SubsetGenerator::new(&SubsetConfig::default(), as_of())
            .with_serp_features(["Featured snippet", "  "]);
        let names = generator.view_names();

        assert_eq!(names.first(), Some(&"low_hanging_fruit"));
        assert_eq!(names.last(), Some(&"serp_featured_snippet"));
        assert_eq!(names.len(), 10);
    }

    #[test]
    fn test_descending_puts_absent_last() {
        let a = Record::new("a").with("business_value", 1.0);
        let b = Record::new("b");
        assert_eq!(descending(&a, &b, "business_value"), Ordering::Less);
        assert_eq!(descending(&b, &a, "business_value"), Ordering::Greater);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(3.14159), 3.14);
        assert_eq!(round2(2.0), 2.0);
    }
}
