//! Core types shared by the merge and scoring stages
//!
//! Pipeline stages:
//! - **Stage 1:** main + secondary sources → Universe v1 (merged, unclassified)
//! - **Stage 2:** Universe v1 + classifications → Universe Master (classified, scored)
//! - **Views:** Universe Master → named subsets

use kwu_common::RecordSet;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// Weight resolution
// ============================================================================

/// Classification axis a label belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    Journey,
    Intent,
}

impl Axis {
    /// Weight for an absent, empty or unrecognized label
    ///
    /// Note: on the journey axis this equals the AWARENESS weight, so the
    /// resolution kind is the only way to tell the two apart.
    pub fn default_weight(self) -> f64 {
        0.5
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Journey => write!(f, "journey"),
            Axis::Intent => write!(f, "intent"),
        }
    }
}

/// How a label was turned into a weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// Normalized label found in the exact table
    Exact,
    /// A substring rule matched
    Pattern,
    /// Nothing matched (or no label); axis default used
    Default,
}

impl MatchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchKind::Exact => "exact",
            MatchKind::Pattern => "pattern",
            MatchKind::Default => "default",
        }
    }
}

/// Result of resolving one label
#[derive(Debug, Clone, PartialEq)]
pub struct WeightResolution {
    pub weight: f64,
    pub kind: MatchKind,
    /// Exact label or substring stem that matched
    pub matched: Option<String>,
}

// ============================================================================
// Sources and classifications
// ============================================================================

/// Role a secondary source plays in opportunity analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceRole {
    /// The site being analysed (at most one per universe)
    Brand,
    Competitor,
}

impl SourceRole {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceRole::Brand => "brand",
            SourceRole::Competitor => "competitor",
        }
    }
}

/// A ranking export merged after the main dataset
#[derive(Debug, Clone)]
pub struct SecondarySource {
    /// Display name; its slug prefixes the source's ranking columns
    pub name: String,
    pub role: SourceRole,
    pub records: RecordSet,
}

impl SecondarySource {
    pub fn brand(name: impl Into<String>, records: RecordSet) -> Self {
        Self {
            name: name.into(),
            role: SourceRole::Brand,
            records,
        }
    }

    pub fn competitor(name: impl Into<String>, records: RecordSet) -> Self {
        Self {
            name: name.into(),
            role: SourceRole::Competitor,
            records,
        }
    }
}

/// External classifier output for one keyword
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub journey_phase: Option<String>,
    pub search_intent: Option<String>,
}

/// Keyword → classification, as produced by the classification job
pub type Classifications = HashMap<String, Classification>;
