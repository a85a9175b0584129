//! SERP feature subsets
//!
//! `serp_features` holds a comma-separated list as exported by the research
//! tool, e.g. `"Featured snippet, People also ask"`.

use super::{descending, record_subset, round2, Subset, SubsetView};
use crate::universe::Universe;
use kwu_common::columns::{source_slug, BUSINESS_VALUE, SEARCH_VOLUME, SERP_FEATURES};
use kwu_common::{Record, Row, Value};
use std::collections::BTreeMap;

/// Individual features of a `serp_features` value
pub fn split_features(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|f| !f.is_empty())
}

fn has_feature(record: &Record, feature: &str) -> bool {
    record
        .text(SERP_FEATURES)
        .is_some_and(|list| split_features(list).any(|f| f.eq_ignore_ascii_case(feature)))
}

/// Keyword count, volume and value per SERP feature
#[derive(Debug, Clone, Copy)]
pub struct SerpSummary;

impl SubsetView for SerpSummary {
    fn name(&self) -> &str {
        "serp_features_summary"
    }

    fn description(&self) -> &str {
        "Keywords, search volume and business value per SERP feature"
    }

    fn derive(&self, universe: &Universe) -> Option<Subset> {
        let mut totals: BTreeMap<&str, (usize, f64, f64)> = BTreeMap::new();
        for record in &universe.records {
            let Some(list) = record.text(SERP_FEATURES) else {
                continue;
            };
            for feature in split_features(list) {
                let entry = totals.entry(feature).or_default();
                entry.0 += 1;
                entry.1 += record.number(SEARCH_VOLUME).unwrap_or(0.0);
                entry.2 += record.number(BUSINESS_VALUE).unwrap_or(0.0);
            }
        }

        let mut totals: Vec<_> = totals.into_iter().collect();
        totals.sort_by(|(fa, a), (fb, b)| b.0.cmp(&a.0).then_with(|| fa.cmp(fb)));

        let rows = totals
            .into_iter()
            .map(|(feature, (count, volume, value))| {
                Row::from([
                    ("serp_feature".to_string(), Value::from(feature)),
                    ("keyword_count".to_string(), Value::from(count)),
                    ("total_volume".to_string(), Value::from(volume)),
                    ("total_business_value".to_string(), Value::from(round2(value))),
                ])
            })
            .collect();

        Some(Subset {
            name: self.name().to_string(),
            description: self.description().to_string(),
            columns: ["serp_feature", "keyword_count", "total_volume", "total_business_value"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            rows,
        })
    }
}

/// Keywords showing one SERP feature, most valuable first
#[derive(Debug, Clone)]
pub struct SerpFeature {
    feature: String,
    name: String,
    description: String,
}

impl SerpFeature {
    pub fn new(feature: &str) -> Self {
        Self {
            feature: feature.to_string(),
            name: format!("serp_{}", source_slug(feature).replace(['/', '\\'], "_")),
            description: format!("Keywords whose results show '{}'", feature),
        }
    }
}

impl SubsetView for SerpFeature {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn derive(&self, universe: &Universe) -> Option<Subset> {
        let mut records: Vec<&Record> = universe
            .records
            .iter()
            .filter(|r| has_feature(r, &self.feature))
            .collect();
        records.sort_by(|a, b| {
            descending(a, b, BUSINESS_VALUE).then_with(|| a.keyword().cmp(b.keyword()))
        });

        record_subset(self, universe, records)
    }
}
