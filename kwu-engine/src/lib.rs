//! # KWU Engine
//!
//! Merge-and-scoring engine for keyword research exports.
//!
//! **Stage 1:** main dataset + brand/competitor ranking exports → Universe v1
//! **Stage 2:** Universe v1 + classifier output → Universe Master (scored)
//! **Views:** Universe Master → named subsets and statistics
//!
//! The core (resolver, reconciler, merger, metrics, subsets) is synchronous
//! and performs no I/O; `files` holds the JSON boundary used by the binary.

pub mod files;
pub mod metrics;
pub mod reconcile;
pub mod stats;
pub mod subsets;
pub mod types;
pub mod universe;
pub mod weights;

pub use metrics::{calculate_business_value, calculate_opportunity_score, MetricCalculator};
pub use reconcile::{reconcile, ReconcileReport};
pub use stats::UniverseStats;
pub use subsets::{Subset, SubsetGenerator, SubsetView};
pub use types::{Axis, Classification, Classifications, MatchKind, SecondarySource, SourceRole};
pub use universe::{build_universe_master, build_universe_v1, Universe};
pub use weights::{resolve_weight, WeightResolver};
