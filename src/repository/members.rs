//! Member repository.

use super::{fetch_sorted, now_timestamp, MEMBERS};
use crate::models::{Member, MemberFields};
use crate::store::{CollectionPath, DocumentStore, OrderBy, StoreError};
use serde_json::Value;
use tracing::info;

fn members_path() -> CollectionPath {
    CollectionPath::root(MEMBERS)
}

/// All members, alphabetical by full name.
pub async fn fetch_members(store: &dyn DocumentStore) -> Vec<Member> {
    fetch_sorted(store, &members_path(), &OrderBy::asc("fullName"), |m: &Member| {
        m.full_name.as_str()
    })
    .await
}

/// Add a member and return its id.
pub async fn create_member(
    store: &dyn DocumentStore,
    fields: &MemberFields,
) -> Result<String, StoreError> {
    let mut doc = fields.to_document();
    doc.insert("createdAt".into(), Value::String(now_timestamp()));
    let id = store.create(&members_path(), doc).await?;
    info!("Added member {} ({})", fields.full_name, id);
    Ok(id)
}

/// Overwrite a member's editable fields.
pub async fn update_member(
    store: &dyn DocumentStore,
    id: &str,
    fields: &MemberFields,
) -> Result<(), StoreError> {
    store.update(&members_path(), id, fields.to_document()).await?;
    info!("Updated member {}", id);
    Ok(())
}

/// Delete a member. Tasks and attendance records referencing it are left in place.
pub async fn delete_member(store: &dyn DocumentStore, id: &str) -> Result<(), StoreError> {
    store.remove(&members_path(), id).await?;
    info!("Deleted member {}", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DepartmentFlag;
    use crate::store::FileStore;

    fn fields(name: &str, email: &str) -> MemberFields {
        MemberFields {
            full_name: name.to_string(),
            email: email.to_string(),
            ..MemberFields::default()
        }
    }

    #[tokio::test]
    async fn test_member_crud() {
        let store = FileStore::in_memory();

        let bob = create_member(&store, &fields("Bob B", "bob@x.io")).await.unwrap();
        create_member(&store, &fields("Alice A", "alice@x.io")).await.unwrap();

        let members = fetch_members(&store).await;
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].full_name, "Alice A");
        assert!(members[0].created_at.is_some());

        let mut changed = fields("Bob Builder", "bob@x.io");
        changed.in_other_department = DepartmentFlag::Yes;
        update_member(&store, &bob, &changed).await.unwrap();

        let members = fetch_members(&store).await;
        let updated = members.iter().find(|m| m.id == bob).unwrap();
        assert_eq!(updated.full_name, "Bob Builder");
        assert_eq!(updated.in_other_department, DepartmentFlag::Yes);

        delete_member(&store, &bob).await.unwrap();
        assert_eq!(fetch_members(&store).await.len(), 1);
    }

    #[tokio::test]
    async fn test_update_unknown_member_fails() {
        let store = FileStore::in_memory();
        let err = update_member(&store, "ghost", &fields("G", "g@x.io"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
