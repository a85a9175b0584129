//! Aggregated subsets: one row per group rather than per keyword

use super::filters::TopOpportunities;
use super::{round2, Subset, SubsetView};
use crate::universe::Universe;
use crate::weights::normalize_label;
use kwu_common::columns::{
    source_column, BUSINESS_VALUE, CPC, JOURNEY_PHASE, OPPORTUNITY_SCORE, SEARCH_INTENT,
    SEARCH_VOLUME, TRAFFIC, TRAFFIC_COST,
};
use kwu_common::{Record, Row, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Rows of `insights` shown for the best opportunities
const INSIGHT_TOP_OPPORTUNITIES: usize = 5;
/// Rows of `insights` shown for the most valuable phases
const INSIGHT_TOP_PHASES: usize = 3;

#[derive(Debug, Default, Clone, Copy)]
struct PhaseTotals {
    keywords: usize,
    business_value: f64,
    volume: f64,
}

/// Per journey phase totals, phases with the most value first
fn phase_totals(universe: &Universe) -> Vec<(String, PhaseTotals)> {
    let mut totals: BTreeMap<String, PhaseTotals> = BTreeMap::new();
    for record in &universe.records {
        let Some(phase) = record.text(JOURNEY_PHASE) else {
            continue;
        };
        let entry = totals.entry(phase.trim().to_string()).or_default();
        entry.keywords += 1;
        entry.business_value += record.number(BUSINESS_VALUE).unwrap_or(0.0);
        entry.volume += record.number(SEARCH_VOLUME).unwrap_or(0.0);
    }

    let mut totals: Vec<(String, PhaseTotals)> = totals.into_iter().collect();
    totals.sort_by(|(pa, a), (pb, b)| {
        b.business_value
            .total_cmp(&a.business_value)
            .then_with(|| pa.cmp(pb))
    });
    totals
}

fn row<const N: usize>(cells: [(&str, Value); N]) -> Row {
    cells
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

/// Keyword count, business value and volume per journey phase
#[derive(Debug, Clone, Copy)]
pub struct JourneyBreakdown;

impl SubsetView for JourneyBreakdown {
    fn name(&self) -> &str {
        "journey_breakdown"
    }

    fn description(&self) -> &str {
        "Keywords, business value and search volume per journey phase"
    }

    fn derive(&self, universe: &Universe) -> Option<Subset> {
        let rows: Vec<Row> = phase_totals(universe)
            .into_iter()
            .map(|(phase, totals)| {
                row([
                    (JOURNEY_PHASE, Value::from(phase)),
                    ("keyword_count", Value::from(totals.keywords)),
                    ("total_business_value", Value::from(round2(totals.business_value))),
                    ("total_volume", Value::from(totals.volume)),
                ])
            })
            .collect();

        Some(Subset {
            name: self.name().to_string(),
            description: self.description().to_string(),
            columns: columns(&[
                JOURNEY_PHASE,
                "keyword_count",
                "total_business_value",
                "total_volume",
            ]),
            rows,
        })
    }
}

/// Ranking statistics for every brand and competitor source
#[derive(Debug, Clone, Copy)]
pub struct BrandAnalysis;

impl SubsetView for BrandAnalysis {
    fn name(&self) -> &str {
        "brand_analysis"
    }

    fn description(&self) -> &str {
        "Position statistics and value captured per ranking source"
    }

    fn derive(&self, universe: &Universe) -> Option<Subset> {
        let mut phase_columns = BTreeSet::new();
        let mut rows = Vec::new();

        for source in &universe.sources {
            let ranked: Vec<(&Record, f64)> = universe
                .records
                .iter()
                .filter_map(|r| r.number(&source.position_column).map(|p| (r, p)))
                .collect();
            if ranked.is_empty() {
                continue;
            }

            let count = ranked.len() as f64;
            let positions = ranked.iter().map(|(_, p)| *p);
            let best = positions.clone().fold(f64::INFINITY, f64::min);
            let worst = positions.clone().fold(f64::NEG_INFINITY, f64::max);
            let average = positions.sum::<f64>() / count;

            let mut out = row([
                ("source", Value::from(source.name.as_str())),
                ("role", Value::from(source.role.as_str())),
                ("keywords_ranking", Value::from(ranked.len())),
                ("avg_position", Value::from(round2(average))),
                ("best_position", Value::from(best)),
                ("worst_position", Value::from(worst)),
                (
                    "total_business_value",
                    Value::from(round2(
                        ranked
                            .iter()
                            .map(|(r, _)| r.number(BUSINESS_VALUE).unwrap_or(0.0))
                            .sum(),
                    )),
                ),
            ]);

            for (column, output) in [(TRAFFIC, "total_traffic"), (TRAFFIC_COST, "total_traffic_cost")] {
                let prefixed = source_column(&source.slug, column);
                if let Some(total) = sum_present(ranked.iter().map(|(r, _)| r.number(&prefixed))) {
                    out.insert(output.to_string(), Value::from(round2(total)));
                }
            }

            let cpcs: Vec<f64> = ranked.iter().filter_map(|(r, _)| r.number(CPC)).collect();
            if !cpcs.is_empty() {
                let average_cpc = cpcs.iter().sum::<f64>() / cpcs.len() as f64;
                out.insert("avg_cpc".to_string(), Value::from(round2(average_cpc)));
            }

            let mut phase_counts: BTreeMap<String, usize> = BTreeMap::new();
            for (record, _) in &ranked {
                if let Some(phase) = record.text(JOURNEY_PHASE) {
                    let column = format!("{}_count", normalize_label(phase).to_lowercase());
                    *phase_counts.entry(column).or_default() += 1;
                }
            }
            for (column, count) in phase_counts {
                phase_columns.insert(column.clone());
                out.insert(column, Value::from(count));
            }

            rows.push(out);
        }

        if rows.is_empty() {
            return None;
        }

        let mut all_columns = columns(&[
            "source",
            "role",
            "keywords_ranking",
            "avg_position",
            "best_position",
            "worst_position",
            "total_traffic",
            "total_traffic_cost",
            "avg_cpc",
            "total_business_value",
        ]);
        all_columns.extend(phase_columns);

        Some(Subset {
            name: self.name().to_string(),
            description: self.description().to_string(),
            columns: all_columns,
            rows,
        })
    }
}

/// Sum of the present values, `None` when nothing is present
fn sum_present(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    values.flatten().fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
}

/// Headline figures: totals, best opportunities, most valuable phases
#[derive(Debug, Clone, Copy)]
pub struct BusinessInsights;

impl SubsetView for BusinessInsights {
    fn name(&self) -> &str {
        "business_insights"
    }

    fn description(&self) -> &str {
        "Summary totals, top opportunities and most valuable journey phases"
    }

    fn derive(&self, universe: &Universe) -> Option<Subset> {
        if universe.is_empty() {
            return None;
        }

        let total = universe.len();
        let classified = universe
            .records
            .iter()
            .filter(|r| r.text(JOURNEY_PHASE).is_some() || r.text(SEARCH_INTENT).is_some())
            .count();
        let total_value: f64 = universe
            .records
            .iter()
            .filter_map(|r| r.number(BUSINESS_VALUE))
            .sum();
        let share = classified as f64 / total as f64 * 100.0;

        let insight = |section: &str, metric: &str, value: Value| {
            row([
                ("section", Value::from(section)),
                ("metric", Value::from(metric)),
                ("value", value),
            ])
        };

        let mut rows = vec![
            insight("summary", "total_keywords", Value::from(total)),
            insight("summary", "classified_keywords", Value::from(classified)),
            insight("summary", "classified_share", Value::from(format!("{:.1}%", share))),
            insight("summary", "total_business_value", Value::from(format_thousands(total_value))),
        ];

        for record in TopOpportunities::ranked(universe)
            .into_iter()
            .take(INSIGHT_TOP_OPPORTUNITIES)
        {
            let score = record.number(OPPORTUNITY_SCORE).unwrap_or(0.0);
            rows.push(insight("top_opportunity", record.keyword(), Value::from(round2(score))));
        }

        for (phase, totals) in phase_totals(universe).into_iter().take(INSIGHT_TOP_PHASES) {
            rows.push(insight(
                "top_phase",
                &phase,
                Value::from(format_thousands(totals.business_value)),
            ));
        }

        Some(Subset {
            name: self.name().to_string(),
            description: self.description().to_string(),
            columns: columns(&["section", "metric", "value"]),
            rows,
        })
    }
}

/// Whole number with comma thousands separators, e.g. `1234567.8` → `1,234,568`
pub fn format_thousands(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{}", rounded.abs() as u64);

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if rounded < 0.0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}
