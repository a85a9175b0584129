//! Keyword records and record sets
//!
//! A record is one keyword plus a sparse map of weakly-typed attributes. An
//! attribute that is not present is *unknown*, never zero. A record set holds
//! at most one record per normalized keyword and preserves insertion order.

use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use crate::columns::KEYWORD;
use crate::{Error, Result};

/// Weakly-typed scalar attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    /// Numeric reading of this value
    ///
    /// Text holding a number (thousands separators allowed) reads as that
    /// number. Non-finite numbers read as absent.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n).filter(|n| n.is_finite()),
            Value::Text(s) => {
                let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
                if cleaned.is_empty() {
                    return None;
                }
                cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
            }
        }
    }

    /// Text content, if this is a text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Number(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// Output row: column name → value (absent columns omitted)
pub type Row = BTreeMap<String, Value>;

/// Input row as produced by ingestion; `null` cells are absent
pub type RawRow = BTreeMap<String, Option<Value>>;

/// Normalize a keyword for joining: trim, lower-case, collapse whitespace
///
/// # Examples
/// ```
/// use kwu_common::record::normalize_keyword;
///
/// assert_eq!(normalize_keyword("  Car   Insurance\tQuote "), "car insurance quote");
/// ```
pub fn normalize_keyword(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// One keyword and its attributes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    keyword: String,
    #[serde(flatten)]
    attributes: BTreeMap<String, Value>,
}

impl Record {
    /// Create a record with no attributes
    ///
    /// The keyword is stored as given; record sets normalize it at the boundary.
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Build a record from an input row, validating the keyword
    pub fn from_row(source_name: &str, row: usize, raw: RawRow) -> Result<Self> {
        let mut keyword = None;
        let mut attributes = BTreeMap::new();

        for (name, value) in raw {
            let Some(value) = value else { continue };
            if name == KEYWORD {
                keyword = Some(value);
            } else {
                attributes.insert(name, value);
            }
        }

        let keyword = keyword.ok_or_else(|| Error::MissingAttribute {
            source_name: source_name.to_string(),
            attribute: KEYWORD.to_string(),
            row,
        })?;

        let keyword = normalize_keyword(&keyword.to_string());
        if keyword.is_empty() {
            return Err(Error::EmptyKeyword {
                source_name: source_name.to_string(),
                row,
            });
        }

        Ok(Self {
            keyword,
            attributes,
        })
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Numeric attribute (see [`Value::as_number`])
    pub fn number(&self, name: &str) -> Option<f64> {
        self.attributes.get(name).and_then(Value::as_number)
    }

    /// Text attribute; blank text reads as absent
    pub fn text(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .and_then(Value::as_text)
            .filter(|s| !s.trim().is_empty())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Set an attribute, returning the previous value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.attributes.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.attributes.remove(name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.attributes.iter()
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// Consume the record into its attribute map (keyword excluded)
    pub fn into_attributes(self) -> BTreeMap<String, Value> {
        self.attributes
    }

    /// Flatten into an output row, keyword included
    pub fn to_row(&self) -> Row {
        let mut row = self.attributes.clone();
        row.insert(KEYWORD.to_string(), Value::Text(self.keyword.clone()));
        row
    }
}

/// Ordered, keyword-unique collection of records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    records: Vec<Record>,
    index: HashMap<String, usize>,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and normalize ingested rows from one source
    ///
    /// # Errors
    /// `MissingAttribute` / `EmptyKeyword` for a row without a usable keyword,
    /// `DuplicateKeyword` when two rows normalize to the same keyword.
    pub fn from_rows(source_name: &str, rows: Vec<RawRow>) -> Result<Self> {
        let records = rows
            .into_iter()
            .enumerate()
            .map(|(row, raw)| Record::from_row(source_name, row, raw))
            .collect::<Result<Vec<_>>>()?;
        Self::from_records(source_name, records)
    }

    /// Normalize keywords of pre-built records and enforce uniqueness
    pub fn from_records(source_name: &str, records: Vec<Record>) -> Result<Self> {
        let mut set = Self::new();
        for (row, mut record) in records.into_iter().enumerate() {
            record.keyword = normalize_keyword(&record.keyword);
            if record.keyword.is_empty() {
                return Err(Error::EmptyKeyword {
                    source_name: source_name.to_string(),
                    row,
                });
            }
            if set.contains(&record.keyword) {
                return Err(Error::DuplicateKeyword {
                    source_name: source_name.to_string(),
                    keyword: record.keyword,
                });
            }
            set.insert(record);
        }
        Ok(set)
    }

    /// Insert a record, replacing (and returning) any record with the same keyword
    pub fn insert(&mut self, record: Record) -> Option<Record> {
        match self.index.get(&record.keyword) {
            Some(&position) => Some(std::mem::replace(&mut self.records[position], record)),
            None => {
                self.index.insert(record.keyword.clone(), self.records.len());
                self.records.push(record);
                None
            }
        }
    }

    pub fn get(&self, keyword: &str) -> Option<&Record> {
        self.index.get(keyword).map(|&i| &self.records[i])
    }

    pub fn get_mut(&mut self, keyword: &str) -> Option<&mut Record> {
        match self.index.get(keyword) {
            Some(&i) => Some(&mut self.records[i]),
            None => None,
        }
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.index.contains_key(keyword)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Mutable iteration; keywords cannot change through `Record`'s API
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Record> {
        self.records.iter_mut()
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(Record::keyword)
    }

    /// Column names: `keyword` first, then every attribute name in sorted order
    pub fn columns(&self) -> Vec<String> {
        let names: BTreeSet<&str> = self
            .records
            .iter()
            .flat_map(Record::attribute_names)
            .collect();
        std::iter::once(KEYWORD.to_string())
            .chain(names.into_iter().map(str::to_string))
            .collect()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

impl IntoIterator for RecordSet {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl Serialize for RecordSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.records.len()))?;
        for record in &self.records {
            seq.serialize_element(record)?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, Option<Value>)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_value_as_number() {
        assert_eq!(Value::Number(12.5).as_number(), Some(12.5));
        assert_eq!(Value::Text("1,200".into()).as_number(), Some(1200.0));
        assert_eq!(Value::Text(" 3.5 ".into()).as_number(), Some(3.5));
        assert_eq!(Value::Text("n/a".into()).as_number(), None);
        assert_eq!(Value::Text("".into()).as_number(), None);
        assert_eq!(Value::Number(f64::NAN).as_number(), None);
    }

    #[test]
    fn test_value_deserialize_untagged() {
        let row: RawRow =
            serde_json::from_str(r#"{"keyword": "abc", "cpc": 1.5, "search_volume": 100, "url": null}"#)
                .unwrap();
        assert_eq!(row.get("cpc"), Some(&Some(Value::Number(1.5))));
        assert_eq!(row.get("search_volume"), Some(&Some(Value::Number(100.0))));
        assert_eq!(row.get("url"), Some(&None));
    }

    #[test]
    fn test_from_row_drops_null_attributes() {
        let record = Record::from_row(
            "main",
            0,
            raw(&[
                ("keyword", Some("Car Insurance".into())),
                ("cpc", None),
                ("search_volume", Some(10.0.into())),
            ]),
        )
        .unwrap();

        assert_eq!(record.keyword(), "car insurance");
        assert!(!record.contains("cpc"));
        assert_eq!(record.number("search_volume"), Some(10.0));
    }

    #[test]
    fn test_from_row_missing_keyword() {
        let err = Record::from_row("competitor", 3, raw(&[("cpc", Some(1.0.into()))])).unwrap_err();
        match err {
            Error::MissingAttribute {
                source_name,
                attribute,
                row,
            } => {
                assert_eq!(source_name, "competitor");
                assert_eq!(attribute, "keyword");
                assert_eq!(row, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_from_row_null_keyword_is_missing() {
        let err = Record::from_row("main", 0, raw(&[("keyword", None)])).unwrap_err();
        assert!(matches!(err, Error::MissingAttribute { .. }));
    }

    #[test]
    fn test_from_row_blank_keyword() {
        let err = Record::from_row("main", 1, raw(&[("keyword", Some("   ".into()))])).unwrap_err();
        assert!(matches!(err, Error::EmptyKeyword { row: 1, .. }));
    }

    #[test]
    fn test_numeric_keyword_becomes_text() {
        let record = Record::from_row("main", 0, raw(&[("keyword", Some(1300.0.into()))])).unwrap();
        assert_eq!(record.keyword(), "1300");
    }

    #[test]
    fn test_from_records_rejects_duplicates_after_normalization() {
        let err = RecordSet::from_records(
            "main",
            vec![Record::new("Car Insurance"), Record::new("car  insurance ")],
        )
        .unwrap_err();
        match err {
            Error::DuplicateKeyword { keyword, .. } => assert_eq!(keyword, "car insurance"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_insert_replaces_and_keeps_order() {
        let mut set = RecordSet::new();
        assert!(set.insert(Record::new("a").with("cpc", 1.0)).is_none());
        assert!(set.insert(Record::new("b")).is_none());
        let old = set.insert(Record::new("a").with("cpc", 2.0)).unwrap();

        assert_eq!(old.number("cpc"), Some(1.0));
        assert_eq!(set.len(), 2);
        assert_eq!(set.keywords().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(set.get("a").unwrap().number("cpc"), Some(2.0));
    }

    #[test]
    fn test_columns_keyword_first() {
        let set = RecordSet::from_records(
            "main",
            vec![
                Record::new("a").with("search_volume", 1.0),
                Record::new("b").with("cpc", 2.0),
            ],
        )
        .unwrap();
        assert_eq!(set.columns(), vec!["keyword", "cpc", "search_volume"]);
    }

    #[test]
    fn test_text_blank_reads_absent() {
        let record = Record::new("a").with("journey_phase", "  ");
        assert_eq!(record.text("journey_phase"), None);
    }

    #[test]
    fn test_record_set_serializes_flat() {
        let set = RecordSet::from_records("main", vec![Record::new("a").with("cpc", 2.5)]).unwrap();
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json, serde_json::json!([{"keyword": "a", "cpc": 2.5}]));
    }
}
