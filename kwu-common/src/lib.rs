//! # KWU Common Library
//!
//! Shared code for the keyword universe crates:
//! - Keyword record model (`Value`, `Record`, `RecordSet`)
//! - Canonical column names
//! - Configuration loading
//! - Error types

pub mod columns;
pub mod config;
pub mod error;
pub mod record;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use record::{normalize_keyword, RawRow, Record, RecordSet, Row, Value};
