//! Task repository.

use super::{fetch_sorted, now_timestamp, TASKS};
use crate::models::{Task, TaskFields, TaskStatus};
use crate::store::{CollectionPath, DocumentStore, Fields, OrderBy, StoreError};
use serde_json::Value;
use tracing::info;

fn tasks_path() -> CollectionPath {
    CollectionPath::root(TASKS)
}

/// All tasks, most recent first.
pub async fn fetch_tasks(store: &dyn DocumentStore) -> Vec<Task> {
    fetch_sorted(store, &tasks_path(), &OrderBy::desc("createdAt"), |t: &Task| {
        t.recency_key()
    })
    .await
}

/// Add a task. The owning member is required.
pub async fn create_task(
    store: &dyn DocumentStore,
    fields: &TaskFields,
) -> Result<String, StoreError> {
    if fields.member_id.trim().is_empty() {
        return Err(StoreError::Invalid("a task must be assigned to a member".to_string()));
    }

    let now = now_timestamp();
    let mut doc = fields.to_document();
    doc.insert("createdAt".into(), Value::String(now.clone()));
    doc.insert("updatedAt".into(), Value::String(now));

    let id = store.create(&tasks_path(), doc).await?;
    info!("Added task '{}' for member {}", fields.title, fields.member_id);
    Ok(id)
}

/// Overwrite a task's editable fields.
pub async fn update_task(
    store: &dyn DocumentStore,
    id: &str,
    fields: &TaskFields,
) -> Result<(), StoreError> {
    let mut doc = fields.to_document();
    doc.insert("updatedAt".into(), Value::String(now_timestamp()));
    store.update(&tasks_path(), id, doc).await?;
    info!("Updated task {}", id);
    Ok(())
}

/// Flip a task between pending and done. Returns the new status.
pub async fn toggle_task_status(
    store: &dyn DocumentStore,
    task: &Task,
) -> Result<TaskStatus, StoreError> {
    let status = task.status.toggled();
    let mut doc = Fields::new();
    doc.insert("status".into(), Value::String(status.to_string()));
    doc.insert("updatedAt".into(), Value::String(now_timestamp()));
    store.update(&tasks_path(), &task.id, doc).await?;
    info!("Task {} marked as {}", task.id, status);
    Ok(status)
}

pub async fn delete_task(store: &dyn DocumentStore, id: &str) -> Result<(), StoreError> {
    store.remove(&tasks_path(), id).await?;
    info!("Deleted task {}", id);
    Ok(())
}
