//! Data models for the team dashboard.
//!
//! This module contains the stored entities (members, tasks, meetings and
//! their attendance records) and the derived views computed from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Whether a member also belongs to another department.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DepartmentFlag {
    Yes,
    #[default]
    No,
}

impl fmt::Display for DepartmentFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DepartmentFlag::Yes => write!(f, "Yes"),
            DepartmentFlag::No => write!(f, "No"),
        }
    }
}

impl DepartmentFlag {
    /// Parse the stored representation. Anything other than "yes" is `No`.
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("yes") {
            DepartmentFlag::Yes
        } else {
            DepartmentFlag::No
        }
    }
}

/// Two-state status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Done,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Done => write!(f, "done"),
        }
    }
}

impl TaskStatus {
    /// The other status.
    pub fn toggled(self) -> Self {
        match self {
            TaskStatus::Pending => TaskStatus::Done,
            TaskStatus::Done => TaskStatus::Pending,
        }
    }
}

/// Presence of one member at one meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    #[default]
    Absent,
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttendanceStatus::Present => write!(f, "present"),
            AttendanceStatus::Absent => write!(f, "absent"),
        }
    }
}

/// A tracked team member.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Store-assigned id.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub full_name: String,
    /// Secondary natural key used by bulk import.
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub in_other_department: DepartmentFlag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Member {
    /// First word of the full name, used as a short chart label.
    pub fn first_name(&self) -> &str {
        self.full_name.split(' ').next().unwrap_or("")
    }

    /// Email normalized for matching (trimmed, lowercase).
    pub fn email_key(&self) -> String {
        normalize_email(&self.email)
    }

    /// The mutable fields of this member.
    pub fn fields(&self) -> MemberFields {
        MemberFields {
            full_name: self.full_name.clone(),
            email: self.email.clone(),
            phone_number: self.phone_number.clone(),
            in_other_department: self.in_other_department,
        }
    }
}

/// Normalize an email address for case-insensitive matching.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Editable member fields, as submitted by a form or an import row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemberFields {
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub in_other_department: DepartmentFlag,
}

impl MemberFields {
    /// Document fields for a store write.
    pub fn to_document(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("fullName".into(), Value::String(self.full_name.clone()));
        fields.insert("email".into(), Value::String(self.email.clone()));
        fields.insert("phoneNumber".into(), Value::String(self.phone_number.clone()));
        fields.insert(
            "inOtherDepartment".into(),
            Value::String(self.in_other_department.to_string()),
        );
        fields
    }
}

/// A unit of work owned by exactly one member.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Owning member id. Not enforced by the store.
    #[serde(default)]
    pub member_id: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Task {
    /// Key used for local recency ordering.
    pub fn recency_key(&self) -> &str {
        self.created_at
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.updated_at.as_deref())
            .unwrap_or("")
    }
}

/// Editable task fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskFields {
    pub title: String,
    pub description: String,
    pub member_id: String,
    pub status: TaskStatus,
}

impl TaskFields {
    pub fn to_document(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("title".into(), Value::String(self.title.clone()));
        fields.insert("description".into(), Value::String(self.description.clone()));
        fields.insert("memberId".into(), Value::String(self.member_id.clone()));
        fields.insert("status".into(), Value::String(self.status.to_string()));
        fields
    }
}

/// Presence or absence of one member at one meeting.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub member_id: String,
    #[serde(default)]
    pub status: AttendanceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// A dated meeting together with its attendance records.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// ISO-like date string, e.g. `2024-03-18`.
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Nested attendance records (a subcollection in the store).
    #[serde(default)]
    pub presence: Vec<AttendanceRecord>,
}

impl Meeting {
    /// Whether any attendance was recorded for this meeting.
    pub fn has_attendance(&self) -> bool {
        !self.presence.is_empty()
    }

    /// Count of records with the given status.
    pub fn count_status(&self, status: AttendanceStatus) -> usize {
        self.presence.iter().filter(|p| p.status == status).count()
    }
}

/// Editable meeting fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MeetingFields {
    pub title: String,
    pub date: String,
    pub description: String,
}

impl MeetingFields {
    pub fn to_document(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("title".into(), Value::String(self.title.clone()));
        fields.insert("date".into(), Value::String(self.date.clone()));
        fields.insert("description".into(), Value::String(self.description.clone()));
        fields
    }
}

/// Per-member task completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberTaskSummary {
    pub member_id: String,
    pub name: String,
    pub completed: usize,
    pub pending: usize,
    pub total: usize,
    /// Rounded completion percentage.
    pub task_score: u32,
}

/// Per-member attendance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberAttendanceSummary {
    pub member_id: String,
    pub name: String,
    pub present_count: usize,
    pub total_meetings: usize,
    /// Rounded attendance percentage.
    pub attendance_rate: u32,
}

/// Members in the main department versus those also in another one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentDistribution {
    pub main: usize,
    pub other: usize,
}

/// One meeting on the attendance timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePoint {
    pub label: String,
    pub date: String,
    pub present: usize,
    pub absent: usize,
}

/// Headline counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_members: usize,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub pending_tasks: usize,
    pub total_meetings: usize,
    pub members_in_other_department: usize,
    /// Rounded percentage of done tasks.
    pub completion_rate: u32,
}

/// Display badge for a leaderboard rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RankBadge {
    Trophy,
    Medal,
    Award,
    Numbered(usize),
}

impl RankBadge {
    /// Badge for a 1-based rank.
    pub fn for_rank(rank: usize) -> Self {
        match rank {
            1 => RankBadge::Trophy,
            2 => RankBadge::Medal,
            3 => RankBadge::Award,
            n => RankBadge::Numbered(n),
        }
    }

    /// Returns an emoji representation of the badge.
    pub fn emoji(&self) -> String {
        match self {
            RankBadge::Trophy => "🏆".to_string(),
            RankBadge::Medal => "🥈".to_string(),
            RankBadge::Award => "🥉".to_string(),
            RankBadge::Numbered(n) => format!("#{}", n),
        }
    }
}

impl fmt::Display for RankBadge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankBadge::Trophy => write!(f, "Trophy"),
            RankBadge::Medal => write!(f, "Medal"),
            RankBadge::Award => write!(f, "Award"),
            RankBadge::Numbered(n) => write!(f, "#{}", n),
        }
    }
}

/// A ranked leaderboard row. Derived on every load, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub member: Member,
    pub completed_tasks: usize,
    pub total_tasks: usize,
    /// Rounded task completion percentage.
    pub task_score: u32,
    pub present_count: usize,
    pub total_meetings: usize,
    /// Rounded attendance percentage.
    pub presence_rate: u32,
    /// Ranking key: completed tasks x 10 + presences x 5.
    pub total_score: u64,
    /// Informational 60/40 blend of the two percentages.
    pub activity_score: u32,
}

/// Metadata about a dashboard report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetadata {
    /// Where the data came from (store description).
    pub source: String,
    pub generated_at: DateTime<Utc>,
    pub duration_seconds: f64,
}

/// The complete analytics dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub metadata: DashboardMetadata,
    pub overview: Overview,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub task_completion: Vec<MemberTaskSummary>,
    pub attendance: Vec<MemberAttendanceSummary>,
    pub departments: DepartmentDistribution,
    pub timeline: Vec<TimelinePoint>,
}
