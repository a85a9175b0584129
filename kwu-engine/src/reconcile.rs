//! Column Reconciler
//!
//! Full outer join of two record sets on keyword, with left-preference
//! coalescing for the shared numeric columns.
//!
//! **Merge strategy:**
//! - Coalesce columns: base value if it reads as a number, else incoming value
//!   (a blank or unparseable base cell counts as absent)
//! - Other overlapping columns: base value kept; a differing incoming value is
//!   preserved as `{name}_incoming`
//! - Non-overlapping columns pass through from whichever side has them
//!
//! Output order is base records in base order, then incoming-only records in
//! incoming order.

use kwu_common::{Record, RecordSet, Value};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Suffix for a non-coalesced incoming value that disagreed with base
pub const INCOMING_SUFFIX: &str = "_incoming";

/// Counts describing one reconcile step
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileReport {
    /// Keywords present on both sides
    pub matched: usize,
    pub base_only: usize,
    pub incoming_only: usize,
    /// Coalesce column → matched rows where base lacked the value
    pub backfilled: BTreeMap<String, usize>,
    /// Coalesce column → matched rows where both sides disagreed (base kept)
    pub overridden: BTreeMap<String, usize>,
    /// Other column → disagreements kept under `{name}_incoming`
    pub preserved: BTreeMap<String, usize>,
}

impl ReconcileReport {
    /// Keywords in the result
    pub fn total(&self) -> usize {
        self.matched + self.base_only + self.incoming_only
    }

    pub fn backfilled_total(&self) -> usize {
        self.backfilled.values().sum()
    }

    pub fn overridden_total(&self) -> usize {
        self.overridden.values().sum()
    }

    pub fn preserved_total(&self) -> usize {
        self.preserved.values().sum()
    }
}

/// Result of [`reconcile`]
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub records: RecordSet,
    pub report: ReconcileReport,
}

/// Full outer join of `base` and `incoming` on keyword
///
/// Base-sourced values are never overwritten. Incoming values are always
/// captured: either filling a gap, or under `{name}_incoming` for columns
/// outside `coalesce_columns`. Disagreeing incoming values for coalesce
/// columns are counted in the report and dropped.
///
/// # Example
/// ```
/// use kwu_common::{Record, RecordSet};
/// use kwu_engine::reconcile::reconcile;
///
/// let base = RecordSet::from_records("main", vec![
///     Record::new("car insurance").with("search_volume", 1000.0),
/// ]).unwrap();
/// let incoming = RecordSet::from_records("competitor", vec![
///     Record::new("car insurance").with("search_volume", 900.0).with("cpc", 4.2),
///     Record::new("bike insurance").with("search_volume", 100.0),
/// ]).unwrap();
///
/// let merged = reconcile(base, incoming, &["search_volume", "cpc"]);
/// let car = merged.records.get("car insurance").unwrap();
/// assert_eq!(car.number("search_volume"), Some(1000.0));
/// assert_eq!(car.number("cpc"), Some(4.2));
/// assert_eq!(merged.records.len(), 2);
/// ```
pub fn reconcile(base: RecordSet, incoming: RecordSet, coalesce_columns: &[&str]) -> Reconciled {
    let mut report = ReconcileReport::default();

    let incoming_order: Vec<String> = incoming.keywords().map(str::to_string).collect();
    let mut pending: HashMap<String, Record> = incoming
        .into_iter()
        .map(|record| (record.keyword().to_string(), record))
        .collect();

    let mut records = RecordSet::new();
    for mut record in base {
        match pending.remove(record.keyword()) {
            Some(other) => {
                merge_into(&mut record, other, coalesce_columns, &mut report);
                report.matched += 1;
            }
            None => report.base_only += 1,
        }
        records.insert(record);
    }

    for keyword in incoming_order {
        if let Some(record) = pending.remove(&keyword) {
            report.incoming_only += 1;
            records.insert(record);
        }
    }

    debug!(
        matched = report.matched,
        base_only = report.base_only,
        incoming_only = report.incoming_only,
        backfilled = report.backfilled_total(),
        overridden = report.overridden_total(),
        "Reconciled record sets"
    );
    if report.preserved_total() > 0 {
        warn!(
            columns = ?report.preserved.keys().collect::<Vec<_>>(),
            rows = report.preserved_total(),
            "Conflicting values kept under {}-suffixed columns",
            INCOMING_SUFFIX
        );
    }

    Reconciled { records, report }
}

/// Fold one incoming record's attributes into a base record
fn merge_into(
    base: &mut Record,
    incoming: Record,
    coalesce_columns: &[&str],
    report: &mut ReconcileReport,
) {
    for (name, value) in incoming.into_attributes() {
        let coalesced = coalesce_columns.contains(&name.as_str());

        // A blank or non-numeric base cell in a coalesce column holds no value
        let base_missing = !base.contains(&name)
            || (coalesced && base.number(&name).is_none() && value.as_number().is_some());

        if base_missing {
            if coalesced {
                *report.backfilled.entry(name.clone()).or_default() += 1;
            }
            base.set(name, value);
            continue;
        }

        if base.get(&name).is_some_and(|existing| same_value(existing, &value)) {
            continue;
        }

        if coalesced {
            *report.overridden.entry(name).or_default() += 1;
        } else {
            let preserved_name = format!("{}{}", name, INCOMING_SUFFIX);
            if !base.contains(&preserved_name) {
                base.set(preserved_name, value);
            }
            *report.preserved.entry(name).or_default() += 1;
        }
    }
}

/// Equality that treats `100` and `"100"` as the same value
fn same_value(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (a.as_number(), b.as_number()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}
