//! Record filters: subsets whose rows are whole universe records

use super::{descending, record_subset, Subset, SubsetView};
use crate::universe::Universe;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use kwu_common::columns::{
    BUSINESS_VALUE, DIFFICULTY, FIRST_SEEN, OPPORTUNITY_SCORE, SEARCH_VOLUME,
};
use kwu_common::Record;

/// Brand ranks on page 1-2 but below the top three
#[derive(Debug, Clone)]
pub struct LowHangingFruit {
    min_position: f64,
    max_position: f64,
}

impl LowHangingFruit {
    pub fn new(min_position: f64, max_position: f64) -> Self {
        Self {
            min_position,
            max_position,
        }
    }
}

impl SubsetView for LowHangingFruit {
    fn name(&self) -> &str {
        "low_hanging_fruit"
    }

    fn description(&self) -> &str {
        "Keywords where the brand ranks within striking distance of the top results"
    }

    fn derive(&self, universe: &Universe) -> Option<Subset> {
        let column = universe.brand_position_column()?;

        let mut records: Vec<&Record> = universe
            .records
            .iter()
            .filter(|r| {
                r.number(column)
                    .is_some_and(|p| p >= self.min_position && p <= self.max_position)
            })
            .collect();
        records.sort_by(|a, b| {
            descending(a, b, BUSINESS_VALUE).then_with(|| a.keyword().cmp(b.keyword()))
        });

        record_subset(self, universe, records)
    }
}

/// Easy keywords with meaningful volume
#[derive(Debug, Clone)]
pub struct HighValueLowCompetition {
    max_difficulty: f64,
    min_volume: f64,
}

impl HighValueLowCompetition {
    pub fn new(max_difficulty: f64, min_volume: f64) -> Self {
        Self {
            max_difficulty,
            min_volume,
        }
    }
}

impl SubsetView for HighValueLowCompetition {
    fn name(&self) -> &str {
        "high_value_low_competition"
    }

    fn description(&self) -> &str {
        "Low-difficulty keywords with high search volume"
    }

    fn derive(&self, universe: &Universe) -> Option<Subset> {
        // Absent difficulty is unknown, not easy
        let mut records: Vec<&Record> = universe
            .records
            .iter()
            .filter(|r| r.number(DIFFICULTY).is_some_and(|d| d <= self.max_difficulty))
            .filter(|r| r.number(SEARCH_VOLUME).is_some_and(|v| v >= self.min_volume))
            .collect();
        records.sort_by(|a, b| {
            descending(a, b, SEARCH_VOLUME).then_with(|| a.keyword().cmp(b.keyword()))
        });

        record_subset(self, universe, records)
    }
}

/// Highest opportunity scores
#[derive(Debug, Clone)]
pub struct TopOpportunities {
    limit: usize,
}

impl TopOpportunities {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    /// Scored records in rank order: score desc, business value desc, keyword asc
    pub fn ranked(universe: &Universe) -> Vec<&Record> {
        let mut records: Vec<&Record> = universe
            .records
            .iter()
            .filter(|r| r.number(OPPORTUNITY_SCORE).is_some())
            .collect();
        records.sort_by(|a, b| {
            descending(a, b, OPPORTUNITY_SCORE)
                .then_with(|| descending(a, b, BUSINESS_VALUE))
                .then_with(|| a.keyword().cmp(b.keyword()))
        });
        records
    }
}

impl SubsetView for TopOpportunities {
    fn name(&self) -> &str {
        "top_opportunities"
    }

    fn description(&self) -> &str {
        "Keywords with the highest opportunity score"
    }

    fn derive(&self, universe: &Universe) -> Option<Subset> {
        let mut records = Self::ranked(universe);
        records.truncate(self.limit);
        record_subset(self, universe, records)
    }
}

/// Business value above a universe quantile
#[derive(Debug, Clone)]
pub struct HighValue {
    quantile: f64,
}

impl HighValue {
    pub fn new(quantile: f64) -> Self {
        Self { quantile }
    }
}

impl SubsetView for HighValue {
    fn name(&self) -> &str {
        "high_value"
    }

    fn description(&self) -> &str {
        "Keywords in the top quarter of business value"
    }

    fn derive(&self, universe: &Universe) -> Option<Subset> {
        let values: Vec<f64> = universe
            .records
            .iter()
            .filter_map(|r| r.number(BUSINESS_VALUE))
            .collect();
        let threshold = quantile(&values, self.quantile)?;

        let mut records: Vec<&Record> = universe
            .records
            .iter()
            .filter(|r| r.number(BUSINESS_VALUE).is_some_and(|v| v > threshold))
            .collect();
        records.sort_by(|a, b| {
            descending(a, b, BUSINESS_VALUE).then_with(|| a.keyword().cmp(b.keyword()))
        });

        record_subset(self, universe, records)
    }
}

/// Quantile with linear interpolation between closest ranks
///
/// `None` for an empty input. `q` is clamped to [0, 1].
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Keywords first seen recently
#[derive(Debug, Clone)]
pub struct NewlyDiscovered {
    days: i64,
    as_of: DateTime<Utc>,
}

impl NewlyDiscovered {
    pub fn new(days: i64, as_of: DateTime<Utc>) -> Self {
        Self { days, as_of }
    }
}

impl SubsetView for NewlyDiscovered {
    fn name(&self) -> &str {
        "newly_discovered"
    }

    fn description(&self) -> &str {
        "Keywords first seen within the look-back window"
    }

    fn derive(&self, universe: &Universe) -> Option<Subset> {
        // A window reaching past the representable range has no lower bound
        let cutoff = Duration::try_days(self.days).and_then(|d| self.as_of.checked_sub_signed(d));

        let mut dated: Vec<(DateTime<Utc>, &Record)> = universe
            .records
            .iter()
            .filter_map(|r| r.text(FIRST_SEEN).and_then(parse_first_seen).map(|d| (d, r)))
            .filter(|(seen, _)| cutoff.map_or(true, |c| *seen >= c) && *seen <= self.as_of)
            .collect();
        dated.sort_by(|(da, a), (db, b)| {
            db.cmp(da)
                .then_with(|| descending(a, b, SEARCH_VOLUME))
                .then_with(|| a.keyword().cmp(b.keyword()))
        });

        let records = dated.into_iter().map(|(_, r)| r).collect();
        record_subset(self, universe, records)
    }
}

/// Parse a `first_seen` value: RFC 3339, `YYYY-MM-DD HH:MM:SS`, or `YYYY-MM-DD`
pub fn parse_first_seen(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(parsed.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
}
