//! Document store access.
//!
//! This module defines the document-store contract the repositories talk to
//! and its two implementations: a local JSON file and Cloud Firestore.

pub mod file_store;
pub mod firestore;

pub use file_store::FileStore;
pub use firestore::FirestoreStore;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Field map of a stored document.
pub type Fields = Map<String, Value>;

/// Errors raised by a document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store cannot order this collection by the requested field
    /// (e.g. a missing secondary index). Callers fall back to an unordered fetch.
    #[error("ordering {collection} by {field} is not supported")]
    OrderingUnsupported { collection: String, field: String },

    #[error("document {id} not found in {collection}")]
    NotFound { collection: String, id: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("store returned {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("failed to decode document: {0}")]
    Decode(String),

    #[error("invalid document: {0}")]
    Invalid(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Decode(e.to_string())
    }
}

/// Path of a root collection or of a subcollection under a parent document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath {
    segments: Vec<String>,
}

impl CollectionPath {
    /// A top-level collection such as `members`.
    pub fn root(name: &str) -> Self {
        Self {
            segments: vec![name.to_string()],
        }
    }

    /// A subcollection nested under a document of this collection.
    pub fn sub(&self, parent_id: &str, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(parent_id.to_string());
        segments.push(name.to_string());
        Self { segments }
    }

    /// Final collection id (e.g. `presence` for `meetings/{id}/presence`).
    pub fn collection_id(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    /// Path of the parent document, if this is a subcollection.
    pub fn parent(&self) -> Option<String> {
        if self.segments.len() < 3 {
            return None;
        }
        Some(self.segments[..self.segments.len() - 1].join("/"))
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

/// Sort direction for ordered listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Ordering requested from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: Direction::Ascending,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: Direction::Descending,
        }
    }
}

/// A stored document: its id plus its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Decode into a typed record, with the document id injected as `id`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, StoreError> {
        let mut fields = self.fields;
        fields.insert("id".to_string(), Value::String(self.id));
        Ok(serde_json::from_value(Value::Object(fields))?)
    }

    /// String value of a field, or "" when missing or not a string.
    pub fn str_field(&self, name: &str) -> &str {
        self.fields.get(name).and_then(Value::as_str).unwrap_or("")
    }
}

/// Document-store operations used by the repositories.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// List a collection, optionally ordered by one field.
    async fn list(
        &self,
        path: &CollectionPath,
        order: Option<&OrderBy>,
    ) -> Result<Vec<Document>, StoreError>;

    /// Add a document and return its generated id.
    async fn create(&self, path: &CollectionPath, fields: Fields) -> Result<String, StoreError>;

    /// Merge `fields` into an existing document.
    async fn update(&self, path: &CollectionPath, id: &str, fields: Fields)
        -> Result<(), StoreError>;

    /// Delete a document. Deleting a missing document is not an error.
    async fn remove(&self, path: &CollectionPath, id: &str) -> Result<(), StoreError>;

    /// Short human description, e.g. `file:data.json`.
    fn describe(&self) -> String;

    /// List a subcollection nested under `parent_id`.
    async fn list_sub(
        &self,
        collection: &str,
        parent_id: &str,
        sub: &str,
    ) -> Result<Vec<Document>, StoreError> {
        let path = CollectionPath::root(collection).sub(parent_id, sub);
        self.list(&path, None).await
    }
}
