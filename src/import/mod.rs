//! Bulk member import.
//!
//! An import file is a JSON array of member records. Reconciliation against
//! the current members is keyed by email and happens in two steps: `plan_import`
//! decides what would change (and whether deletions need confirming), then
//! `apply_import` performs the writes.

pub mod reconcile;

pub use reconcile::*;

use serde_json::{Map, Value};
use thiserror::Error;

/// A raw imported record.
pub type ImportRecord = Map<String, Value>;

/// Errors that abort an import before anything is written.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("invalid JSON file: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("invalid JSON format, expected an array of members")]
    NotAnArray,
}

/// Parse an import file into plain records.
///
/// Array elements that are not objects are kept as empty records, so they
/// are reported as rows without an email.
pub fn parse_import(text: &str) -> Result<Vec<ImportRecord>, ImportError> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Array(items) = value else {
        return Err(ImportError::NotAnArray);
    };

    Ok(items
        .into_iter()
        .map(|item| match item {
            Value::Object(record) => record,
            _ => Map::new(),
        })
        .collect())
}
