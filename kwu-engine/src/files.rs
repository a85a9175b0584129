//! JSON file boundary
//!
//! Record sets are JSON arrays of flat objects (`null` cells are absent).
//! Classifications are a JSON object keyed by keyword.

use crate::types::Classifications;
use kwu_common::{Error, RawRow, RecordSet, Result};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

/// Load and validate one source's record set
pub fn load_record_set(path: &Path, source_name: &str) -> Result<RecordSet> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::InvalidInput(format!("Read {} failed: {}", path.display(), e)))?;
    let rows: Vec<RawRow> = serde_json::from_str(&content)?;
    let records = RecordSet::from_rows(source_name, rows)?;

    info!(
        source = source_name,
        path = %path.display(),
        keywords = records.len(),
        "Record set loaded"
    );
    Ok(records)
}

/// Load classifier output
pub fn load_classifications(path: &Path) -> Result<Classifications> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::InvalidInput(format!("Read {} failed: {}", path.display(), e)))?;
    let classifications: Classifications = serde_json::from_str(&content)?;

    info!(
        path = %path.display(),
        keywords = classifications.len(),
        "Classifications loaded"
    );
    Ok(classifications)
}

/// Write a value as pretty JSON (temp file + rename)
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(value)?;
    let temp_path = path.with_extension("json.tmp");
    std::fs::write(&temp_path, content)?;
    std::fs::rename(&temp_path, path)?;

    debug!(path = %path.display(), "JSON written");
    Ok(())
}
