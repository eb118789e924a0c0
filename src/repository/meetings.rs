//! Meeting repository, including the nested attendance records.

use super::{decode_all, fetch_sorted, now_timestamp, MEETINGS, MEMBERS, PRESENCE, TASKS};
use crate::models::{AttendanceRecord, AttendanceStatus, Meeting, MeetingFields, Member};
use crate::store::{CollectionPath, DocumentStore, Fields, OrderBy, StoreError};
use futures::future::{join_all, try_join_all};
use serde_json::Value;
use tracing::{info, warn};

fn meetings_path() -> CollectionPath {
    CollectionPath::root(MEETINGS)
}

fn presence_path(meeting_id: &str) -> CollectionPath {
    meetings_path().sub(meeting_id, PRESENCE)
}

/// Attendance records of one meeting. A failed fetch yields no records.
async fn fetch_presence(store: &dyn DocumentStore, meeting_id: &str) -> Vec<AttendanceRecord> {
    match store.list_sub(MEETINGS, meeting_id, PRESENCE).await {
        Ok(docs) => decode_all(&presence_path(meeting_id), docs),
        Err(e) => {
            warn!("Error fetching attendance for meeting {}: {}", meeting_id, e);
            Vec::new()
        }
    }
}

/// All meetings, most recent date first, each with its attendance records.
///
/// Attendance subcollections are fetched concurrently.
pub async fn fetch_meetings(store: &dyn DocumentStore) -> Vec<Meeting> {
    let meetings: Vec<Meeting> =
        fetch_sorted(store, &meetings_path(), &OrderBy::desc("date"), |m: &Meeting| {
            m.date.as_str()
        })
        .await;

    let presence = join_all(meetings.iter().map(|m| fetch_presence(store, &m.id))).await;

    meetings
        .into_iter()
        .zip(presence)
        .map(|(mut meeting, records)| {
            meeting.presence = records;
            meeting
        })
        .collect()
}

pub async fn create_meeting(
    store: &dyn DocumentStore,
    fields: &MeetingFields,
) -> Result<String, StoreError> {
    let mut doc = fields.to_document();
    doc.insert("createdAt".into(), Value::String(now_timestamp()));
    let id = store.create(&meetings_path(), doc).await?;
    info!("Added meeting '{}' on {}", fields.title, fields.date);
    Ok(id)
}

pub async fn update_meeting(
    store: &dyn DocumentStore,
    id: &str,
    fields: &MeetingFields,
) -> Result<(), StoreError> {
    let mut doc = fields.to_document();
    doc.insert("updatedAt".into(), Value::String(now_timestamp()));
    store.update(&meetings_path(), id, doc).await?;
    info!("Updated meeting {}", id);
    Ok(())
}

/// Delete a meeting together with its attendance records.
pub async fn delete_meeting(store: &dyn DocumentStore, id: &str) -> Result<(), StoreError> {
    let path = presence_path(id);
    for record in store.list(&path, None).await? {
        store.remove(&path, &record.id).await?;
    }
    store.remove(&meetings_path(), id).await?;
    info!("Deleted meeting {}", id);
    Ok(())
}

/// Attendance sheet for a meeting: every current member, defaulting to absent
/// unless an existing record says otherwise. Order follows `members`.
pub fn attendance_sheet(members: &[Member], meeting: &Meeting) -> Vec<(String, AttendanceStatus)> {
    members
        .iter()
        .map(|member| {
            let status = meeting
                .presence
                .iter()
                .find(|p| p.member_id == member.id)
                .map(|p| p.status)
                .unwrap_or(AttendanceStatus::Absent);
            (member.id.clone(), status)
        })
        .collect()
}

/// Replace a meeting's attendance: delete every stored record (including ones
/// that no longer decode), then write one record per entry of `sheet`. Not
/// atomic; a failure midway leaves a partial set.
pub async fn save_attendance(
    store: &dyn DocumentStore,
    meeting: &Meeting,
    sheet: &[(String, AttendanceStatus)],
) -> Result<usize, StoreError> {
    let path = presence_path(&meeting.id);

    for record in store.list(&path, None).await? {
        store.remove(&path, &record.id).await?;
    }

    let now = now_timestamp();
    for (member_id, status) in sheet {
        let mut doc = Fields::new();
        doc.insert("memberId".into(), Value::String(member_id.clone()));
        doc.insert("status".into(), Value::String(status.to_string()));
        doc.insert("updatedAt".into(), Value::String(now.clone()));
        store.create(&path, doc).await?;
    }

    info!(
        "Recorded attendance for meeting {} ({} records)",
        meeting.id,
        sheet.len()
    );
    Ok(sheet.len())
}

/// Delete every member, task and meeting (with attendance).
pub async fn reset_all(store: &dyn DocumentStore) -> Result<(), StoreError> {
    for name in [MEMBERS, TASKS] {
        let path = CollectionPath::root(name);
        let docs = store.list(&path, None).await?;
        try_join_all(docs.iter().map(|doc| store.remove(&path, &doc.id))).await?;
        info!("Cleared {} {}", docs.len(), name);
    }

    let meetings = store.list(&meetings_path(), None).await?;
    try_join_all(meetings.iter().map(|meeting| async move {
        let path = presence_path(&meeting.id);
        let records = store.list(&path, None).await?;
        try_join_all(records.iter().map(|r| store.remove(&path, &r.id))).await?;
        store.remove(&meetings_path(), &meeting.id).await
    }))
    .await?;
    info!("Cleared {} meetings", meetings.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MemberFields, TaskFields};
    use crate::repository::{create_member, create_task, fetch_members, fetch_tasks};
    use crate::store::FileStore;

    fn meeting(title: &str, date: &str) -> MeetingFields {
        MeetingFields {
            title: title.to_string(),
            date: date.to_string(),
            description: String::new(),
        }
    }

    async fn seed_member(store: &FileStore, name: &str) -> String {
        create_member(
            store,
            &MemberFields {
                full_name: name.to_string(),
                email: format!("{}@x.io", name.to_lowercase()),
                ..MemberFields::default()
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_meetings_sorted_with_presence() {
        let store = FileStore::in_memory();
        let first = create_meeting(&store, &meeting("Kickoff", "2024-01-10")).await.unwrap();
        create_meeting(&store, &meeting("Review", "2024-02-10")).await.unwrap();

        let alice = seed_member(&store, "Alice").await;
        let meetings = fetch_meetings(&store).await;
        let kickoff = meetings.iter().find(|m| m.id == first).unwrap().clone();
        save_attendance(&store, &kickoff, &[(alice, AttendanceStatus::Present)])
            .await
            .unwrap();

        let meetings = fetch_meetings(&store).await;
        assert_eq!(meetings[0].title, "Review");
        assert!(meetings[0].presence.is_empty());
        assert_eq!(meetings[1].presence.len(), 1);
        assert_eq!(meetings[1].presence[0].status, AttendanceStatus::Present);
    }

    #[tokio::test]
    async fn test_save_attendance_replaces_previous_records() {
        let store = FileStore::in_memory();
        let alice = seed_member(&store, "Alice").await;
        let bob = seed_member(&store, "Bob").await;
        create_meeting(&store, &meeting("Standup", "2024-03-01")).await.unwrap();

        let members = fetch_members(&store).await;
        let standup = fetch_meetings(&store).await.remove(0);
        let mut sheet = attendance_sheet(&members, &standup);
        assert!(sheet.iter().all(|(_, s)| *s == AttendanceStatus::Absent));
        sheet[0].1 = AttendanceStatus::Present;
        save_attendance(&store, &standup, &sheet).await.unwrap();

        let standup = fetch_meetings(&store).await.remove(0);
        assert_eq!(standup.presence.len(), 2);
        let sheet = attendance_sheet(&members, &standup);
        assert_eq!(
            sheet,
            vec![
                (alice.clone(), AttendanceStatus::Present),
                (bob.clone(), AttendanceStatus::Absent),
            ]
        );

        save_attendance(&store, &standup, &[(bob, AttendanceStatus::Present)])
            .await
            .unwrap();
        let standup = fetch_meetings(&store).await.remove(0);
        assert_eq!(standup.presence.len(), 1);
    }

    #[tokio::test]
    async fn test_save_attendance_clears_undecodable_records() {
        let store = FileStore::in_memory();
        let alice = seed_member(&store, "Alice").await;
        let id = create_meeting(&store, &meeting("Retro", "2024-06-01")).await.unwrap();

        let mut broken = Fields::new();
        broken.insert("memberId".into(), Value::String(alice.clone()));
        broken.insert("status".into(), Value::String("late".into()));
        store.create(&presence_path(&id), broken).await.unwrap();

        let retro = fetch_meetings(&store).await.remove(0);
        assert!(retro.presence.is_empty());

        save_attendance(&store, &retro, &[(alice, AttendanceStatus::Present)])
            .await
            .unwrap();

        let stored = store.list_sub(MEETINGS, &id, PRESENCE).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].str_field("status"), "present");
    }

    #[tokio::test]
    async fn test_delete_meeting_removes_presence() {
        let store = FileStore::in_memory();
        let alice = seed_member(&store, "Alice").await;
        let id = create_meeting(&store, &meeting("Retro", "2024-04-01")).await.unwrap();
        let retro = fetch_meetings(&store).await.remove(0);
        save_attendance(&store, &retro, &[(alice, AttendanceStatus::Present)])
            .await
            .unwrap();

        delete_meeting(&store, &id).await.unwrap();
        assert!(fetch_meetings(&store).await.is_empty());
        assert!(store.list_sub(MEETINGS, &id, PRESENCE).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reset_all() {
        let store = FileStore::in_memory();
        let alice = seed_member(&store, "Alice").await;
        create_task(
            &store,
            &TaskFields {
                title: "t".to_string(),
                member_id: alice.clone(),
                ..TaskFields::default()
            },
        )
        .await
        .unwrap();
        create_meeting(&store, &meeting("Sync", "2024-05-01")).await.unwrap();
        let sync = fetch_meetings(&store).await.remove(0);
        save_attendance(&store, &sync, &[(alice, AttendanceStatus::Absent)])
            .await
            .unwrap();

        reset_all(&store).await.unwrap();

        assert!(fetch_members(&store).await.is_empty());
        assert!(fetch_tasks(&store).await.is_empty());
        assert!(fetch_meetings(&store).await.is_empty());
        assert!(store.list_sub(MEETINGS, &sync.id, PRESENCE).await.unwrap().is_empty());
    }
}
