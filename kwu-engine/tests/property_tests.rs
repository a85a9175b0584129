// Property tests for the merge and scoring core
//
// Properties quantified over generated inputs: merge completeness,
// left-priority coalescing, resolver totality and ranges, business value
// zero cases and opportunity score bounds.

use std::collections::BTreeSet;

use kwu_common::columns::{
    CPC, DIFFICULTY, JOURNEY_PHASE, OPPORTUNITY_SCORE, SEARCH_INTENT, SEARCH_VOLUME,
};
use kwu_common::{Record, RecordSet};
use kwu_engine::{
    build_universe_master, build_universe_v1, calculate_business_value, reconcile, Axis,
    Classification, Classifications, SecondarySource, WeightResolver,
};
use proptest::prelude::*;

fn keyword_set() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set("[a-e]{1,3}( [a-e]{1,3})?", 0..12)
}

fn record_set(source: &str, keywords: &BTreeSet<String>, volume: f64) -> RecordSet {
    RecordSet::from_records(
        source,
        keywords
            .iter()
            .map(|k| Record::new(k.as_str()).with(SEARCH_VOLUME, volume).with("position", 3.0))
            .collect(),
    )
    .unwrap()
}

fn label() -> impl Strategy<Value = String> {
    prop_oneof![
        "[A-Za-z_ -]{0,24}",
        Just("COMPARISON".to_string()),
        Just("new_customer".to_string()),
        Just("UNAWARE_OF_BRAND".to_string()),
        Just("buy now".to_string()),
        ".{0,16}",
    ]
}

proptest! {
    #[test]
    fn merge_keeps_every_keyword_exactly_once(
        main in keyword_set(),
        first in keyword_set(),
        second in keyword_set(),
    ) {
        let build = build_universe_v1(
            record_set("main", &main, 1.0),
            vec![
                SecondarySource::competitor("first", record_set("first", &first, 2.0)),
                SecondarySource::competitor("second", record_set("second", &second, 3.0)),
            ],
        )
        .unwrap();

        let expected: BTreeSet<String> =
            main.iter().chain(&first).chain(&second).cloned().collect();
        let actual: Vec<&str> = build.universe.records.keywords().collect();
        let unique: BTreeSet<String> = actual.iter().map(|k| k.to_string()).collect();

        prop_assert_eq!(actual.len(), unique.len());
        prop_assert_eq!(unique, expected);
    }

    #[test]
    fn base_volume_is_never_overwritten(
        keywords in keyword_set(),
        base_volume in 0.0f64..1e6,
        incoming_volume in 0.0f64..1e6,
    ) {
        let base = record_set("base", &keywords, base_volume);
        let incoming = record_set("incoming", &keywords, incoming_volume);

        let merged = reconcile(base, incoming, &[SEARCH_VOLUME]);
        for record in &merged.records {
            prop_assert_eq!(record.number(SEARCH_VOLUME), Some(base_volume));
        }
    }

    #[test]
    fn incoming_volume_fills_gaps(keywords in keyword_set(), volume in 0.0f64..1e6) {
        let base = RecordSet::from_records(
            "base",
            keywords.iter().map(|k| Record::new(k.as_str())).collect(),
        )
        .unwrap();
        let incoming = record_set("incoming", &keywords, volume);

        let merged = reconcile(base, incoming, &[SEARCH_VOLUME]);
        for record in &merged.records {
            prop_assert_eq!(record.number(SEARCH_VOLUME), Some(volume));
        }
    }

    #[test]
    fn resolver_is_total_and_in_range(label in label()) {
        let resolver = WeightResolver::new();

        let journey = resolver.weight(Some(label.as_str()), Axis::Journey);
        prop_assert!((0.3..=1.0).contains(&journey), "journey {} -> {}", label, journey);

        let intent = resolver.weight(Some(label.as_str()), Axis::Intent);
        prop_assert!((0.5..=1.0).contains(&intent), "intent {} -> {}", label, intent);
    }

    #[test]
    fn business_value_is_zero_without_volume_or_cpc(
        amount in 0.0f64..1e5,
        phase in label(),
        intent in label(),
        drop_volume in any::<bool>(),
    ) {
        let mut record = Record::new("k")
            .with(JOURNEY_PHASE, phase.as_str())
            .with(SEARCH_INTENT, intent.as_str());
        if drop_volume {
            record.set(CPC, amount);
        } else {
            record.set(SEARCH_VOLUME, amount);
        }

        prop_assert_eq!(calculate_business_value(&record, &WeightResolver::new()), 0.0);
    }

    #[test]
    fn opportunity_scores_stay_within_bounds(
        rows in prop::collection::vec(
            (
                prop::option::of(0.0f64..1e6),
                prop::option::of(0.0f64..50.0),
                prop::option::of(-20.0f64..150.0),
                prop::option::of(1.0f64..100.0),
                prop::option::of(1.0f64..100.0),
                label(),
            ),
            1..20,
        ),
    ) {
        let mut main = Vec::new();
        let mut brand = Vec::new();
        let mut rival = Vec::new();
        let mut classifications = Classifications::new();

        for (i, (volume, cpc, difficulty, brand_position, rival_position, phase)) in
            rows.into_iter().enumerate()
        {
            let keyword = format!("keyword {}", i);
            let mut record = Record::new(keyword.as_str());
            if let Some(v) = volume { record.set(SEARCH_VOLUME, v); }
            if let Some(c) = cpc { record.set(CPC, c); }
            if let Some(d) = difficulty { record.set(DIFFICULTY, d); }
            main.push(record);

            if let Some(p) = brand_position {
                brand.push(Record::new(keyword.as_str()).with("position", p));
            }
            if let Some(p) = rival_position {
                rival.push(Record::new(keyword.as_str()).with("position", p));
            }
            classifications.insert(
                keyword,
                Classification { journey_phase: Some(phase), search_intent: None },
            );
        }

        let v1 = build_universe_v1(
            RecordSet::from_records("main", main).unwrap(),
            vec![
                SecondarySource::brand("acme", RecordSet::from_records("acme", brand).unwrap()),
                SecondarySource::competitor("rival", RecordSet::from_records("rival", rival).unwrap()),
            ],
        )
        .unwrap()
        .universe;

        let master = build_universe_master(v1, &classifications, &WeightResolver::new());
        for record in &master.universe.records {
            let score = record.number(OPPORTUNITY_SCORE).unwrap();
            prop_assert!((0.0..=100.0).contains(&score), "{} -> {}", record.keyword(), score);
        }
    }
}
