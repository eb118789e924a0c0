//! Reconciliation of imported member records against the stored members.

use super::ImportRecord;
use crate::models::{normalize_email, DepartmentFlag, Member, MemberFields};
use crate::repository::{create_member, delete_member, update_member};
use crate::store::DocumentStore;
use indicatif::ProgressBar;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

/// What to do with one imported record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportAction {
    /// No member has this email yet.
    Add(MemberFields),
    /// Overwrite an existing member's fields with the merged values.
    Update { id: String, fields: MemberFields },
    /// The merged values equal what is already stored.
    Unchanged { id: String },
    /// The record has no email and cannot be matched.
    Skip { index: usize },
}

/// Every write an import will perform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportPlan {
    /// Members missing from the import file, deleted first.
    pub deletions: Vec<Member>,
    /// One action per imported record, in file order.
    pub actions: Vec<ImportAction>,
}

impl ImportPlan {
    pub fn additions(&self) -> usize {
        self.count(|a| matches!(a, ImportAction::Add(_)))
    }

    pub fn updates(&self) -> usize {
        self.count(|a| matches!(a, ImportAction::Update { .. }))
    }

    /// Number of steps `apply_import` goes through.
    pub fn steps(&self) -> usize {
        self.deletions.len() + self.actions.len()
    }

    pub fn skipped(&self) -> usize {
        self.count(|a| matches!(a, ImportAction::Skip { .. }))
    }

    fn count(&self, pred: impl Fn(&ImportAction) -> bool) -> usize {
        self.actions.iter().filter(|a| pred(a)).count()
    }
}

/// An import that would delete members and is waiting for the caller to
/// confirm or cancel it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingImport {
    plan: ImportPlan,
}

impl PendingImport {
    /// Members that will be deleted if the import goes ahead.
    pub fn affected(&self) -> &[Member] {
        &self.plan.deletions
    }

    /// Go ahead with the import, deletions included.
    pub fn confirm(self) -> ImportPlan {
        self.plan
    }

    /// Abandon the import. Nothing has been written.
    pub fn cancel(self) {
        debug!(
            "Import cancelled, {} deletion(s) discarded",
            self.plan.deletions.len()
        );
    }
}

/// Result of planning an import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportDecision {
    /// Nothing would be deleted; the plan can be applied directly.
    Ready(ImportPlan),
    /// Some members would be deleted; confirmation is required first.
    NeedsConfirmation(PendingImport),
}

/// Non-empty imported value of a field, as text.
fn imported_value(record: &ImportRecord, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Merge an imported record over an existing member. Imported values win when
/// present and non-empty.
fn merge(existing: &Member, record: &ImportRecord, email: &str) -> MemberFields {
    MemberFields {
        full_name: imported_value(record, "fullName")
            .unwrap_or_else(|| existing.full_name.clone()),
        email: email.to_string(),
        phone_number: imported_value(record, "phoneNumber")
            .unwrap_or_else(|| existing.phone_number.clone()),
        in_other_department: imported_value(record, "inOtherDepartment")
            .map(|v| DepartmentFlag::parse(&v))
            .unwrap_or(existing.in_other_department),
    }
}

fn new_member(record: &ImportRecord, email: &str) -> MemberFields {
    MemberFields {
        full_name: imported_value(record, "fullName").unwrap_or_default(),
        email: email.to_string(),
        phone_number: imported_value(record, "phoneNumber").unwrap_or_default(),
        in_other_department: imported_value(record, "inOtherDepartment")
            .map(|v| DepartmentFlag::parse(&v))
            .unwrap_or(DepartmentFlag::No),
    }
}

/// Work out what importing `records` over `current` would do.
pub fn plan_import(current: &[Member], records: &[ImportRecord]) -> ImportDecision {
    let imported: HashSet<String> = records
        .iter()
        .filter_map(|r| imported_value(r, "email"))
        .map(|e| normalize_email(&e))
        .filter(|e| !e.is_empty())
        .collect();

    let deletions: Vec<Member> = current
        .iter()
        .filter(|m| {
            let key = m.email_key();
            !key.is_empty() && !imported.contains(&key)
        })
        .cloned()
        .collect();

    let actions = records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let email = match imported_value(record, "email") {
                Some(email) if !normalize_email(&email).is_empty() => email,
                _ => return ImportAction::Skip { index },
            };
            let key = normalize_email(&email);

            match current.iter().find(|m| m.email_key() == key) {
                Some(existing) => {
                    let fields = merge(existing, record, &email);
                    if fields == existing.fields() {
                        ImportAction::Unchanged {
                            id: existing.id.clone(),
                        }
                    } else {
                        ImportAction::Update {
                            id: existing.id.clone(),
                            fields,
                        }
                    }
                }
                None => ImportAction::Add(new_member(record, &email)),
            }
        })
        .collect();

    let plan = ImportPlan { deletions, actions };
    debug!(
        "Import plan: {} to add, {} to update, {} to delete, {} without email",
        plan.additions(),
        plan.updates(),
        plan.deletions.len(),
        plan.skipped()
    );

    if plan.deletions.is_empty() {
        ImportDecision::Ready(plan)
    } else {
        ImportDecision::NeedsConfirmation(PendingImport { plan })
    }
}

/// Overall result of an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    /// At least one member was added, updated or deleted.
    Completed,
    /// Nothing changed and some records failed.
    Failed,
    NoChanges,
}

/// Counters reported after an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub added: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
    pub errors: usize,
}

impl ImportReport {
    pub fn outcome(&self) -> ImportOutcome {
        if self.added + self.updated + self.deleted > 0 {
            ImportOutcome::Completed
        } else if self.errors > 0 {
            ImportOutcome::Failed
        } else {
            ImportOutcome::NoChanges
        }
    }

    /// One-line message for the user.
    pub fn summary(&self) -> String {
        match self.outcome() {
            ImportOutcome::Completed => {
                let mut parts = Vec::new();
                if self.added > 0 {
                    parts.push(format!("{} added", self.added));
                }
                if self.updated > 0 {
                    parts.push(format!("{} updated", self.updated));
                }
                if self.deleted > 0 {
                    parts.push(format!("{} deleted", self.deleted));
                }

                let tail = if self.errors > 0 {
                    format!(". {} error(s).", self.errors)
                } else {
                    ".".to_string()
                };
                format!("Import completed! {}{}", parts.join(", "), tail)
            }
            ImportOutcome::Failed => {
                format!("Failed to import. {} error(s) occurred.", self.errors)
            }
            ImportOutcome::NoChanges => "Import completed with no changes.".to_string(),
        }
    }
}

/// Perform an import plan: deletions first, then updates and additions.
///
/// A failed write is counted as an error and the batch continues. Each step
/// advances `pb`.
pub async fn apply_import(
    store: &dyn DocumentStore,
    plan: ImportPlan,
    pb: &ProgressBar,
) -> ImportReport {
    let mut report = ImportReport::default();
    pb.set_length(plan.steps() as u64);

    pb.set_message("deleting");
    for member in &plan.deletions {
        match delete_member(store, &member.id).await {
            Ok(()) => report.deleted += 1,
            Err(e) => {
                warn!("Error deleting member {}: {}", member.id, e);
                report.errors += 1;
            }
        }
        pb.inc(1);
    }

    pb.set_message("importing");
    for action in plan.actions {
        match action {
            ImportAction::Add(fields) => match create_member(store, &fields).await {
                Ok(_) => report.added += 1,
                Err(e) => {
                    warn!("Error importing member {}: {}", fields.email, e);
                    report.errors += 1;
                }
            },
            ImportAction::Update { id, fields } => {
                match update_member(store, &id, &fields).await {
                    Ok(()) => report.updated += 1,
                    Err(e) => {
                        warn!("Error updating member {}: {}", id, e);
                        report.errors += 1;
                    }
                }
            }
            ImportAction::Unchanged { .. } => report.unchanged += 1,
            ImportAction::Skip { index } => {
                warn!("Import record {} has no email, skipped", index + 1);
                report.errors += 1;
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::parse_import;
    use crate::repository::fetch_members;
    use crate::store::FileStore;

    fn member(id: &str, name: &str, email: &str) -> Member {
        Member {
            id: id.to_string(),
            full_name: name.to_string(),
            email: email.to_string(),
            ..Member::default()
        }
    }

    fn ready(decision: ImportDecision) -> ImportPlan {
        match decision {
            ImportDecision::Ready(plan) => plan,
            ImportDecision::NeedsConfirmation(p) => panic!("unexpected deletions: {:?}", p),
        }
    }

    #[test]
    fn test_plan_matches_by_normalized_email() {
        let current = vec![member("1", "Alice A", "Alice@X.io")];
        let records = parse_import(
            r#"[
                {"email": " alice@x.io ", "phoneNumber": "555"},
                {"email": "bob@x.io", "fullName": "Bob B"}
            ]"#,
        )
        .unwrap();

        let plan = ready(plan_import(&current, &records));
        assert_eq!(plan.updates(), 1);
        assert_eq!(plan.additions(), 1);

        match &plan.actions[0] {
            ImportAction::Update { id, fields } => {
                assert_eq!(id, "1");
                assert_eq!(fields.full_name, "Alice A");
                assert_eq!(fields.phone_number, "555");
            }
            other => panic!("expected update, got {:?}", other),
        }
        match &plan.actions[1] {
            ImportAction::Add(fields) => {
                assert_eq!(fields.full_name, "Bob B");
                assert_eq!(fields.in_other_department, DepartmentFlag::No);
            }
            other => panic!("expected add, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_members_need_confirmation() {
        let current = vec![
            member("1", "Alice A", "alice@x.io"),
            member("2", "Bob B", "bob@x.io"),
            member("3", "No Mail", ""),
        ];
        let records = parse_import(r#"[{"email": "alice@x.io"}]"#).unwrap();

        let pending = match plan_import(&current, &records) {
            ImportDecision::NeedsConfirmation(pending) => pending,
            ImportDecision::Ready(_) => panic!("deletion should need confirmation"),
        };
        let affected: Vec<_> = pending.affected().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(affected, vec!["2"]);

        let plan = pending.clone().confirm();
        assert_eq!(plan.deletions.len(), 1);
        pending.cancel();
    }

    #[tokio::test]
    async fn test_record_without_email_is_an_error() {
        let store = FileStore::in_memory();
        let records = parse_import(
            r#"[
                {"fullName": "Alice A", "email": "alice@x.io"},
                {"fullName": "Nobody"},
                {"fullName": "Bob B", "email": "bob@x.io", "inOtherDepartment": "Yes"}
            ]"#,
        )
        .unwrap();

        let plan = ready(plan_import(&[], &records));
        assert_eq!(plan.skipped(), 1);

        let report = apply_import(&store, plan, &ProgressBar::hidden()).await;
        assert_eq!(report.added, 2);
        assert_eq!(report.errors, 1);
        assert_eq!(report.outcome(), ImportOutcome::Completed);
        assert_eq!(report.summary(), "Import completed! 2 added. 1 error(s).");

        let members = fetch_members(&store).await;
        assert_eq!(members.len(), 2);
        assert_eq!(members[1].in_other_department, DepartmentFlag::Yes);
        assert!(members[0].created_at.is_some());
    }

    #[tokio::test]
    async fn test_export_then_import_changes_nothing() {
        let store = FileStore::in_memory();
        for (name, email) in [("Alice A", "alice@x.io"), ("Bob B", "bob@x.io")] {
            let fields = MemberFields {
                full_name: name.to_string(),
                email: email.to_string(),
                phone_number: "123".to_string(),
                in_other_department: DepartmentFlag::Yes,
            };
            create_member(&store, &fields).await.unwrap();
        }

        let current = fetch_members(&store).await;
        let exported = serde_json::to_string_pretty(&current).unwrap();
        let records = parse_import(&exported).unwrap();

        let plan = ready(plan_import(&current, &records));
        let report = apply_import(&store, plan, &ProgressBar::hidden()).await;
        assert_eq!(report.added, 0);
        assert_eq!(report.updated, 0);
        assert_eq!(report.deleted, 0);
        assert_eq!(report.unchanged, 2);
        assert_eq!(report.outcome(), ImportOutcome::NoChanges);
        assert_eq!(report.summary(), "Import completed with no changes.");
    }

    #[tokio::test]
    async fn test_deletions_run_and_are_reported() {
        let store = FileStore::in_memory();
        let fields = MemberFields {
            full_name: "Gone G".to_string(),
            email: "gone@x.io".to_string(),
            ..MemberFields::default()
        };
        create_member(&store, &fields).await.unwrap();

        let current = fetch_members(&store).await;
        let records = parse_import(r#"[{"email": "new@x.io", "fullName": "New N"}]"#).unwrap();
        let plan = match plan_import(&current, &records) {
            ImportDecision::NeedsConfirmation(pending) => pending.confirm(),
            ImportDecision::Ready(_) => panic!("deletion should need confirmation"),
        };

        let report = apply_import(&store, plan, &ProgressBar::hidden()).await;
        assert_eq!(report.summary(), "Import completed! 1 added, 1 deleted.");
        let names: Vec<_> = fetch_members(&store)
            .await
            .into_iter()
            .map(|m| m.full_name)
            .collect();
        assert_eq!(names, vec!["New N"]);
    }

    #[test]
    fn test_summary_messages() {
        let failed = ImportReport {
            errors: 3,
            ..ImportReport::default()
        };
        assert_eq!(failed.outcome(), ImportOutcome::Failed);
        assert_eq!(failed.summary(), "Failed to import. 3 error(s) occurred.");

        let updated = ImportReport {
            updated: 2,
            ..ImportReport::default()
        };
        assert_eq!(updated.summary(), "Import completed! 2 updated.");
    }
}
