//! Universe Merger
//!
//! **Stage 1:** `build_universe_v1` folds the secondary sources into the main
//! dataset, one reconcile per source, in the given order. The accumulator is
//! always the base side, so the data columns follow a fixed priority:
//! main > first secondary source > second > ...
//!
//! **Stage 2:** `build_universe_master` left-joins classifications onto v1 and
//! runs the two-phase Metric Calculator.

use crate::metrics::{MetricCalculator, MetricsSummary, PositionColumns};
use crate::reconcile::{reconcile, ReconcileReport};
use crate::types::{Classification, Classifications, SecondarySource, SourceRole};
use crate::weights::WeightResolver;
use kwu_common::columns::{
    source_column, source_slug, DATA_COLUMNS, JOURNEY_PHASE, POSITION, RANKING_COLUMNS,
    SEARCH_INTENT,
};
use kwu_common::{normalize_keyword, Error, Record, RecordSet, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

/// Pipeline snapshot a universe represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UniverseStage {
    /// Merged, unclassified
    V1,
    /// Merged, classified, scored
    Master,
}

/// Where a secondary source's ranking columns live in the universe
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceProvenance {
    pub name: String,
    pub slug: String,
    pub role: SourceRole,
    /// `{slug}_position`
    pub position_column: String,
    /// Records the source contributed
    pub keywords: usize,
    /// Records with a position in this source
    pub keywords_ranked: usize,
}

/// Deduplicated keyword universe at one pipeline stage
#[derive(Debug, Clone, Serialize)]
pub struct Universe {
    pub stage: UniverseStage,
    pub sources: Vec<SourceProvenance>,
    pub records: RecordSet,
}

impl Universe {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn brand(&self) -> Option<&SourceProvenance> {
        self.sources.iter().find(|s| s.role == SourceRole::Brand)
    }

    pub fn brand_position_column(&self) -> Option<&str> {
        self.brand().map(|s| s.position_column.as_str())
    }

    pub fn competitor_position_columns(&self) -> Vec<&str> {
        self.sources
            .iter()
            .filter(|s| s.role == SourceRole::Competitor)
            .map(|s| s.position_column.as_str())
            .collect()
    }

    /// Brand and competitor position columns for the gap metric
    pub fn position_columns(&self) -> PositionColumns {
        PositionColumns {
            brand: self.brand_position_column().map(str::to_string),
            competitors: self
                .competitor_position_columns()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Reconcile report for one merged source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeStep {
    pub source: String,
    pub report: ReconcileReport,
}

/// Result of [`build_universe_v1`]
#[derive(Debug, Clone)]
pub struct UniverseBuild {
    pub universe: Universe,
    pub steps: Vec<MergeStep>,
}

/// Running state of the stage 1 fold
#[derive(Debug, Clone)]
struct MergeAccumulator {
    records: RecordSet,
    sources: Vec<SourceProvenance>,
    steps: Vec<MergeStep>,
}

impl MergeAccumulator {
    fn seed(main: RecordSet) -> Self {
        Self {
            records: main,
            sources: Vec::new(),
            steps: Vec::new(),
        }
    }

    fn merge(self, source: SecondarySource) -> Self {
        let (projected, provenance) = prepare_source(source);

        let merged = reconcile(self.records, projected, &DATA_COLUMNS);
        debug!(
            source = %provenance.name,
            position_column = %provenance.position_column,
            ranked = provenance.keywords_ranked,
            universe = merged.records.len(),
            "Merged secondary source"
        );

        let mut sources = self.sources;
        let mut steps = self.steps;
        steps.push(MergeStep {
            source: provenance.name.clone(),
            report: merged.report,
        });
        sources.push(provenance);

        Self {
            records: merged.records,
            sources,
            steps,
        }
    }

    fn finish(self) -> UniverseBuild {
        UniverseBuild {
            universe: Universe {
                stage: UniverseStage::V1,
                sources: self.sources,
                records: self.records,
            },
            steps: self.steps,
        }
    }
}

/// Project a secondary source onto keyword, its slug-prefixed ranking
/// columns and the shared data columns
pub fn prepare_source(source: SecondarySource) -> (RecordSet, SourceProvenance) {
    let slug = source_slug(&source.name);
    let position_column = source_column(&slug, POSITION);

    let mut projected = RecordSet::new();
    let mut keywords_ranked = 0;

    for record in source.records {
        let mut out = Record::new(record.keyword());
        for column in RANKING_COLUMNS {
            if let Some(value) = record.get(column) {
                out.set(source_column(&slug, column), value.clone());
            }
        }
        for column in DATA_COLUMNS {
            if let Some(value) = record.get(column) {
                out.set(column, value.clone());
            }
        }
        if out.number(&position_column).is_some() {
            keywords_ranked += 1;
        }
        projected.insert(out);
    }

    let provenance = SourceProvenance {
        name: source.name,
        slug,
        role: source.role,
        position_column,
        keywords: projected.len(),
        keywords_ranked,
    };

    (projected, provenance)
}

/// Reject source lists the merger cannot attribute unambiguously
fn validate_sources(sources: &[SecondarySource]) -> Result<()> {
    let mut slugs = HashSet::new();
    let mut brands = 0;

    for source in sources {
        let slug = source_slug(&source.name);
        if slug.is_empty() {
            return Err(Error::InvalidInput(
                "Secondary source name must not be empty".to_string(),
            ));
        }
        if !slugs.insert(slug.clone()) {
            return Err(Error::InvalidInput(format!(
                "Secondary sources '{}' collide on column prefix '{}'",
                source.name, slug
            )));
        }
        if source.role == SourceRole::Brand {
            brands += 1;
        }
    }

    if brands > 1 {
        return Err(Error::InvalidInput(format!(
            "At most one brand source is allowed, got {}",
            brands
        )));
    }

    Ok(())
}

/// Stage 1: merge `main` with each secondary source in order
///
/// # Errors
/// `InvalidInput` for an empty source name, two sources sharing a slug, or
/// more than one brand source.
pub fn build_universe_v1(main: RecordSet, secondary: Vec<SecondarySource>) -> Result<UniverseBuild> {
    validate_sources(&secondary)?;

    let main_keywords = main.len();
    let source_count = secondary.len();

    let build = secondary
        .into_iter()
        .fold(MergeAccumulator::seed(main), MergeAccumulator::merge)
        .finish();

    info!(
        main = main_keywords,
        sources = source_count,
        keywords = build.universe.len(),
        "Universe v1 built"
    );

    Ok(build)
}

/// Outcome of applying classifications
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClassificationReport {
    /// Universe keywords that received a classification
    pub applied: usize,
    /// Universe keywords with no classification
    pub unclassified: usize,
    /// Classified keywords not present in the universe (ignored)
    pub unmatched: usize,
}

/// Result of [`build_universe_master`]
#[derive(Debug, Clone)]
pub struct MasterBuild {
    pub universe: Universe,
    pub classification: ClassificationReport,
    pub metrics: MetricsSummary,
}

/// Stage 2: classify and score a v1 universe
///
/// Classification keys are normalized like record keywords. When two keys
/// normalize to the same keyword, the lexically first raw key wins.
pub fn build_universe_master(
    v1: Universe,
    classifications: &Classifications,
    resolver: &WeightResolver,
) -> MasterBuild {
    let ordered: BTreeMap<&String, &Classification> = classifications.iter().collect();
    let mut by_keyword: BTreeMap<String, &Classification> = BTreeMap::new();
    for (raw, classification) in ordered {
        by_keyword.entry(normalize_keyword(raw)).or_insert(classification);
    }

    let mut universe = v1;
    let mut report = ClassificationReport::default();

    for record in universe.records.iter_mut() {
        match by_keyword.get(record.keyword()) {
            Some(classification) => {
                apply_label(record, JOURNEY_PHASE, classification.journey_phase.as_deref());
                apply_label(record, SEARCH_INTENT, classification.search_intent.as_deref());
                report.applied += 1;
            }
            None => report.unclassified += 1,
        }
    }

    report.unmatched = by_keyword
        .keys()
        .filter(|keyword| !universe.records.contains(keyword))
        .count();
    if report.unmatched > 0 {
        warn!(
            unmatched = report.unmatched,
            "Classifications for keywords not in the universe were ignored"
        );
    }

    let positions = universe.position_columns();
    let metrics = MetricCalculator::new(resolver).score(&mut universe.records, &positions);
    universe.stage = UniverseStage::Master;

    info!(
        keywords = universe.len(),
        classified = report.applied,
        unclassified = report.unclassified,
        "Universe master built"
    );

    MasterBuild {
        universe,
        classification: report,
        metrics,
    }
}

fn apply_label(record: &mut Record, column: &str, label: Option<&str>) {
    if let Some(label) = label.map(str::trim).filter(|l| !l.is_empty()) {
        record.set(column, label);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kwu_common::columns::{CPC, SEARCH_VOLUME, URL};

    fn set(source: &str, records: Vec<Record>) -> RecordSet {
        RecordSet::from_records(source, records).unwrap()
    }

    #[test]
    fn test_prepare_source_projects_and_prefixes() {
        let source = SecondarySource::competitor(
            "Rival Co",
            set(
                "rival",
                vec![
                    Record::new("a")
                        .with(POSITION, 3.0)
                        .with(URL, "https://rival.example/a")
                        .with(SEARCH_VOLUME, 100.0)
                        .with("extra_column", "dropped"),
                    Record::new("b").with(SEARCH_VOLUME, 50.0),
                ],
            ),
        );

        let (projected, provenance) = prepare_source(source);
        let a = projected.get("a").unwrap();

        assert_eq!(a.number("rival_co_position"), Some(3.0));
        assert_eq!(a.text("rival_co_url"), Some("https://rival.example/a"));
        assert_eq!(a.number(SEARCH_VOLUME), Some(100.0));
        assert!(!a.contains(POSITION));
        assert!(!a.contains("extra_column"));

        assert_eq!(provenance.slug, "rival_co");
        assert_eq!(provenance.position_column, "rival_co_position");
        assert_eq!(provenance.keywords, 2);
        assert_eq!(provenance.keywords_ranked, 1);
    }

    #[test]
    fn test_priority_follows_source_order() {
        let main = set("main", vec![Record::new("a")]);
        let first = SecondarySource::competitor(
            "first",
            set("first", vec![Record::new("a").with(CPC, 1.0)]),
        );
        let second = SecondarySource::competitor(
            "second",
            set("second", vec![Record::new("a").with(CPC, 2.0).with(SEARCH_VOLUME, 9.0)]),
        );

        let build = build_universe_v1(main, vec![first, second]).unwrap();
        let a = build.universe.records.get("a").unwrap();

        assert_eq!(a.number(CPC), Some(1.0));
        assert_eq!(a.number(SEARCH_VOLUME), Some(9.0));
        assert_eq!(build.steps.len(), 2);
        assert_eq!(build.steps[1].report.overridden.get(CPC), Some(&1));
    }

    #[test]
    fn test_rejects_duplicate_slugs() {
        let sources = vec![
            SecondarySource::competitor("Rival Co", RecordSet::new()),
            SecondarySource::competitor("rival co", RecordSet::new()),
        ];
        let err = build_universe_v1(RecordSet::new(), sources).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_rejects_second_brand_and_empty_name() {
        let two_brands = vec![
            SecondarySource::brand("acme", RecordSet::new()),
            SecondarySource::brand("other", RecordSet::new()),
        ];
        assert!(build_universe_v1(RecordSet::new(), two_brands).is_err());

        let unnamed = vec![SecondarySource::competitor("  ", RecordSet::new())];
        assert!(build_universe_v1(RecordSet::new(), unnamed).is_err());
    }

    #[test]
    fn test_universe_position_columns() {
        let build = build_universe_v1(
            RecordSet::new(),
            vec![
                SecondarySource::competitor("rival", RecordSet::new()),
                SecondarySource::brand("Acme", RecordSet::new()),
            ],
        )
        .unwrap();

        let universe = build.universe;
        assert_eq!(universe.stage, UniverseStage::V1);
        assert_eq!(universe.brand_position_column(), Some("acme_position"));
        assert_eq!(universe.competitor_position_columns(), vec!["rival_position"]);
    }

    #[test]
    fn test_master_left_joins_classifications() {
        let main = set(
            "main",
            vec![
                Record::new("car insurance quote")
                    .with(SEARCH_VOLUME, 10000.0)
                    .with(CPC, 5.5),
                Record::new("unclassified keyword"),
            ],
        );
        let v1 = build_universe_v1(main, Vec::new()).unwrap().universe;

        let mut classifications = Classifications::new();
        classifications.insert(
            "Car Insurance Quote ".to_string(),
            Classification {
                journey_phase: Some("COMPARISON".to_string()),
                search_intent: Some("COMMERCIAL".to_string()),
            },
        );
        classifications.insert("not in universe".to_string(), Classification::default());

        let master = build_universe_master(v1, &classifications, &WeightResolver::new());

        assert_eq!(master.universe.stage, UniverseStage::Master);
        assert_eq!(master.classification.applied, 1);
        assert_eq!(master.classification.unclassified, 1);
        assert_eq!(master.classification.unmatched, 1);

        let classified = master.universe.records.get("car insurance quote").unwrap();
        assert_eq!(classified.text(JOURNEY_PHASE), Some("COMPARISON"));

        let other = master.universe.records.get("unclassified keyword").unwrap();
        assert!(!other.contains(JOURNEY_PHASE));
        assert!(!other.contains(SEARCH_INTENT));
        assert_eq!(other.number("business_value"), Some(0.0));
    }
}
