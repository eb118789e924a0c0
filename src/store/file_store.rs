//! Local JSON-file document store.
//!
//! All collections live in one JSON file keyed by collection path
//! (`members`, `meetings/{id}/presence`, ...). Ordered listing only works
//! for configured `(collection, field)` index pairs, like a hosted store
//! that requires a secondary index.

use super::{CollectionPath, Direction, Document, DocumentStore, Fields, OrderBy, StoreError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// On-disk layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Collections {
    #[serde(default)]
    collections: BTreeMap<String, BTreeMap<String, Fields>>,
}

/// Document store persisted to a single JSON file.
pub struct FileStore {
    /// None for a purely in-memory store.
    path: Option<PathBuf>,
    data: Mutex<Collections>,
    /// `(collection id, field)` pairs that support ordered listing.
    indexes: HashSet<(String, String)>,
}

impl FileStore {
    /// Open (or lazily create) a store backed by `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let data = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            if content.trim().is_empty() {
                Collections::default()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            debug!("Data file {} does not exist yet", path.display());
            Collections::default()
        };

        info!(
            "Opened file store at {} ({} collections)",
            path.display(),
            data.collections.len()
        );

        Ok(Self {
            path: Some(path.to_path_buf()),
            data: Mutex::new(data),
            indexes: HashSet::new(),
        })
    }

    /// A store that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: Mutex::new(Collections::default()),
            indexes: HashSet::new(),
        }
    }

    /// Declare an index so `collection` can be listed ordered by `field`.
    pub fn with_index(mut self, collection: &str, field: &str) -> Self {
        self.indexes
            .insert((collection.to_string(), field.to_string()));
        self
    }

    fn state(&self) -> MutexGuard<'_, Collections> {
        self.data.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Write the whole state atomically (temp file + rename).
    fn persist(&self, data: &Collections) -> Result<(), StoreError> {
        let Some(ref path) = self.path else {
            return Ok(());
        };

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let content = serde_json::to_string_pretty(data)?;
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }

    /// Apply `change` to a copy of the state and swap it in only once the copy
    /// is on disk. A failed write leaves the state untouched.
    fn commit<T>(
        &self,
        change: impl FnOnce(&mut Collections) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut data = self.state();
        let mut next = data.clone();
        let out = change(&mut next)?;
        self.persist(&next)?;
        *data = next;
        Ok(out)
    }

    fn generate_id() -> String {
        uuid::Uuid::new_v4().simple().to_string()[..20].to_string()
    }
}

/// Compare two optional field values for ordering. Missing values sort first.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn list(
        &self,
        path: &CollectionPath,
        order: Option<&OrderBy>,
    ) -> Result<Vec<Document>, StoreError> {
        if let Some(order) = order {
            let key = (path.collection_id().to_string(), order.field.clone());
            if !self.indexes.contains(&key) {
                return Err(StoreError::OrderingUnsupported {
                    collection: path.to_string(),
                    field: order.field.clone(),
                });
            }
        }

        let data = self.state();
        let mut docs: Vec<Document> = data
            .collections
            .get(&path.to_string())
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default();
        drop(data);

        if let Some(order) = order {
            docs.sort_by(|a, b| {
                let ord = compare_values(a.fields.get(&order.field), b.fields.get(&order.field));
                match order.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }

        Ok(docs)
    }

    async fn create(&self, path: &CollectionPath, fields: Fields) -> Result<String, StoreError> {
        let id = Self::generate_id();
        self.commit(|data| {
            data.collections
                .entry(path.to_string())
                .or_default()
                .insert(id.clone(), fields);
            Ok(())
        })?;
        debug!("Created {}/{}", path, id);
        Ok(id)
    }

    async fn update(
        &self,
        path: &CollectionPath,
        id: &str,
        fields: Fields,
    ) -> Result<(), StoreError> {
        self.commit(|data| {
            let doc = data
                .collections
                .get_mut(&path.to_string())
                .and_then(|docs| docs.get_mut(id))
                .ok_or_else(|| StoreError::NotFound {
                    collection: path.to_string(),
                    id: id.to_string(),
                })?;
            for (key, value) in fields {
                doc.insert(key, value);
            }
            Ok(())
        })?;
        debug!("Updated {}/{}", path, id);
        Ok(())
    }

    async fn remove(&self, path: &CollectionPath, id: &str) -> Result<(), StoreError> {
        let key = path.to_string();
        let exists = self
            .state()
            .collections
            .get(&key)
            .is_some_and(|docs| docs.contains_key(id));
        if !exists {
            return Ok(());
        }

        self.commit(|data| {
            if let Some(docs) = data.collections.get_mut(&key) {
                docs.remove(id);
                if docs.is_empty() {
                    data.collections.remove(&key);
                }
            }
            Ok(())
        })?;
        debug!("Removed {}/{}", path, id);
        Ok(())
    }

    fn describe(&self) -> String {
        match self.path {
            Some(ref p) => format!("file:{}", p.display()),
            None => "memory".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_create_list_update_remove() {
        let store = FileStore::in_memory();
        let members = CollectionPath::root("members");

        let id = store
            .create(&members, fields(json!({ "fullName": "Alice" })))
            .await
            .unwrap();
        assert_eq!(id.len(), 20);

        store
            .update(&members, &id, fields(json!({ "email": "a@x.io" })))
            .await
            .unwrap();

        let docs = store.list(&members, None).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].str_field("fullName"), "Alice");
        assert_eq!(docs[0].str_field("email"), "a@x.io");

        store.remove(&members, &id).await.unwrap();
        store.remove(&members, &id).await.unwrap();
        assert!(store.list(&members, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_missing_document() {
        let store = FileStore::in_memory();
        let err = store
            .update(&CollectionPath::root("tasks"), "nope", Fields::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_ordering_requires_index() {
        let store = FileStore::in_memory().with_index("meetings", "date");
        let meetings = CollectionPath::root("meetings");
        for date in ["2024-01-02", "2024-03-01", "2024-02-10"] {
            store
                .create(&meetings, fields(json!({ "date": date })))
                .await
                .unwrap();
        }

        let ordered = store
            .list(&meetings, Some(&OrderBy::desc("date")))
            .await
            .unwrap();
        let dates: Vec<_> = ordered.iter().map(|d| d.str_field("date")).collect();
        assert_eq!(dates, vec!["2024-03-01", "2024-02-10", "2024-01-02"]);

        let err = store
            .list(&meetings, Some(&OrderBy::asc("title")))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::OrderingUnsupported { .. }));
    }

    #[tokio::test]
    async fn test_subcollections_are_separate() {
        let store = FileStore::in_memory();
        let presence = CollectionPath::root("meetings").sub("m1", "presence");
        store
            .create(&presence, fields(json!({ "memberId": "a", "status": "present" })))
            .await
            .unwrap();

        let docs = store.list_sub("meetings", "m1", "presence").await.unwrap();
        assert_eq!(docs.len(), 1);
        assert!(store.list_sub("meetings", "m2", "presence").await.unwrap().is_empty());
        assert!(store.list(&CollectionPath::root("meetings"), None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_state_unchanged() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();

        // The data file's parent is a regular file, so every persist fails
        let store = FileStore::open(&blocker.join("data.json")).unwrap();
        let members = CollectionPath::root("members");

        let result = store
            .create(&members, fields(json!({ "fullName": "Ghost" })))
            .await;
        assert!(result.is_err());
        assert!(store.list(&members, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_update_and_remove_keep_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        let members = CollectionPath::root("members");

        let store = FileStore::open(&path).unwrap();
        let id = store
            .create(&members, fields(json!({ "fullName": "Alice" })))
            .await
            .unwrap();

        // Swap the data file for a directory so the final rename fails
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        let update = store
            .update(&members, &id, fields(json!({ "fullName": "Changed" })))
            .await;
        assert!(update.is_err());
        assert!(store.remove(&members, &id).await.is_err());

        let docs = store.list(&members, None).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].str_field("fullName"), "Alice");
    }

    #[tokio::test]
    async fn test_persists_to_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");

        let id = {
            let store = FileStore::open(&path).unwrap();
            store
                .create(&CollectionPath::root("members"), fields(json!({ "fullName": "Zoe" })))
                .await
                .unwrap()
        };

        let reopened = FileStore::open(&path).unwrap();
        let docs = reopened.list(&CollectionPath::root("members"), None).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, id);
        assert!(reopened.describe().starts_with("file:"));
    }
}
