//! Member, task and meeting repositories.
//!
//! Reads never fail: an ordered fetch that the store cannot serve falls back
//! to an unordered fetch, the result is always sorted locally, and any other
//! read failure degrades to an empty collection (logged only). Writes return
//! their errors to the caller.

pub mod meetings;
pub mod members;
pub mod tasks;

pub use meetings::*;
pub use members::*;
pub use tasks::*;

use crate::store::{CollectionPath, Direction, Document, DocumentStore, OrderBy, StoreError};
use chrono::{SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use std::cmp::Ordering;
use tracing::{debug, warn};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

pub const MEMBERS: &str = "members";
pub const TASKS: &str = "tasks";
pub const MEETINGS: &str = "meetings";
pub const PRESENCE: &str = "presence";

/// Current time as an RFC 3339 UTC string with millisecond precision.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Letters without diacritics, lowercased (`Émile` -> `emile`).
fn base_key(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Lowercased, with diacritics kept as combining marks.
fn accent_key(s: &str) -> String {
    s.nfd().flat_map(char::to_lowercase).collect()
}

/// Locale-aware string comparison in the usual collation levels: base
/// letters, then accents, then case with lowercase first. The empty string
/// sorts before everything else.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }

    base_key(a)
        .cmp(&base_key(b))
        .then_with(|| accent_key(a).cmp(&accent_key(b)))
        .then_with(|| {
            a.chars()
                .map(char::is_uppercase)
                .cmp(b.chars().map(char::is_uppercase))
        })
        .then_with(|| a.cmp(b))
}

/// Stable local sort by a string key in the given direction.
pub fn sort_by_key_str<T, F>(items: &mut [T], direction: Direction, key: F)
where
    F: Fn(&T) -> &str,
{
    items.sort_by(|a, b| {
        let ord = locale_cmp(key(a), key(b));
        match direction {
            Direction::Ascending => ord,
            Direction::Descending => ord.reverse(),
        }
    });
}

/// Fetch a collection ordered by `order`, falling back to an unordered fetch when
/// the store reports that the ordering is unsupported.
pub async fn fetch_documents(
    store: &dyn DocumentStore,
    path: &CollectionPath,
    order: &OrderBy,
) -> Result<Vec<Document>, StoreError> {
    match store.list(path, Some(order)).await {
        Ok(docs) => Ok(docs),
        Err(StoreError::OrderingUnsupported { collection, field }) => {
            debug!(
                "Ordered fetch of {} by {} unsupported, falling back to unordered fetch",
                collection, field
            );
            store.list(path, None).await
        }
        Err(e) => Err(e),
    }
}

/// Decode documents, skipping (and logging) any that do not match the record shape.
pub fn decode_all<T: DeserializeOwned>(path: &CollectionPath, docs: Vec<Document>) -> Vec<T> {
    docs.into_iter()
        .filter_map(|doc| {
            let id = doc.id.clone();
            match doc.decode::<T>() {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping malformed document {}/{}: {}", path, id, e);
                    None
                }
            }
        })
        .collect()
}

/// Fetch, decode and locally sort a collection. Read failures yield an empty list.
pub async fn fetch_sorted<T, F>(
    store: &dyn DocumentStore,
    path: &CollectionPath,
    order: &OrderBy,
    key: F,
) -> Vec<T>
where
    T: DeserializeOwned,
    F: Fn(&T) -> &str,
{
    let docs = match fetch_documents(store, path, order).await {
        Ok(docs) => docs,
        Err(e) => {
            warn!("Error fetching {}: {}", path, e);
            return Vec::new();
        }
    };

    let mut records = decode_all(path, docs);
    sort_by_key_str(&mut records, order.direction, key);
    records
}
