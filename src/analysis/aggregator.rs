//! Team statistics.
//!
//! This module turns the raw members, tasks and meetings into the per-member
//! summaries and chart series shown on the analytics dashboard. Everything
//! here is pure and tolerates empty input.

use crate::models::{
    AttendanceStatus, DepartmentDistribution, DepartmentFlag, Meeting, Member,
    MemberAttendanceSummary, MemberTaskSummary, Overview, Task, TaskStatus, TimelinePoint,
};
use chrono::{DateTime, NaiveDate};
use std::collections::{HashMap, HashSet};

/// Number of meetings shown on the attendance timeline.
pub const TIMELINE_LENGTH: usize = 10;

/// Round half up, the way the dashboard has always rounded percentages.
pub fn js_round(value: f64) -> u32 {
    (value + 0.5).floor().max(0.0) as u32
}

/// `part / whole` as an unrounded percentage, 0 when `whole` is 0.
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64) * 100.0
}

/// Task counters for one member.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskCounts {
    pub completed: usize,
    pub pending: usize,
}

impl TaskCounts {
    pub fn total(&self) -> usize {
        self.completed + self.pending
    }
}

/// Lookup tables resolving tasks and attendance records to members, built once
/// per aggregation pass.
#[derive(Debug, Default)]
pub struct TeamIndex<'a> {
    tasks: HashMap<&'a str, TaskCounts>,
    presence: HashMap<&'a str, usize>,
    /// Meetings with at least one attendance record.
    recorded_meetings: usize,
}

impl<'a> TeamIndex<'a> {
    pub fn build(tasks: &'a [Task], meetings: &'a [Meeting]) -> Self {
        let mut index = TeamIndex::default();

        for task in tasks {
            let counts = index.tasks.entry(task.member_id.as_str()).or_default();
            match task.status {
                TaskStatus::Done => counts.completed += 1,
                TaskStatus::Pending => counts.pending += 1,
            }
        }

        for meeting in meetings.iter().filter(|m| m.has_attendance()) {
            index.recorded_meetings += 1;

            // The first record for a member decides their status at this meeting.
            let mut seen = HashSet::new();
            for record in &meeting.presence {
                if !seen.insert(record.member_id.as_str()) {
                    continue;
                }
                if record.status == AttendanceStatus::Present {
                    *index.presence.entry(record.member_id.as_str()).or_default() += 1;
                }
            }
        }

        index
    }

    pub fn task_counts(&self, member_id: &str) -> TaskCounts {
        self.tasks.get(member_id).copied().unwrap_or_default()
    }

    pub fn present_count(&self, member_id: &str) -> usize {
        self.presence.get(member_id).copied().unwrap_or(0)
    }

    /// Denominator of every member's attendance rate.
    pub fn recorded_meetings(&self) -> usize {
        self.recorded_meetings
    }
}

fn task_summary(member: &Member, index: &TeamIndex<'_>, name: &str) -> MemberTaskSummary {
    let counts = index.task_counts(&member.id);
    MemberTaskSummary {
        member_id: member.id.clone(),
        name: name.to_string(),
        completed: counts.completed,
        pending: counts.pending,
        total: counts.total(),
        task_score: js_round(percentage(counts.completed, counts.total())),
    }
}

fn attendance_summary(
    member: &Member,
    index: &TeamIndex<'_>,
    name: &str,
) -> MemberAttendanceSummary {
    let present_count = index.present_count(&member.id);
    let total_meetings = index.recorded_meetings();
    MemberAttendanceSummary {
        member_id: member.id.clone(),
        name: name.to_string(),
        present_count,
        total_meetings,
        attendance_rate: js_round(percentage(present_count, total_meetings)),
    }
}

/// Task completion for every member, in member order.
pub fn task_summaries(members: &[Member], tasks: &[Task]) -> Vec<MemberTaskSummary> {
    let index = TeamIndex::build(tasks, &[]);
    members
        .iter()
        .map(|m| task_summary(m, &index, &m.full_name))
        .collect()
}

/// Task completion chart series: members with at least one task, by first name.
pub fn task_completion_chart(members: &[Member], tasks: &[Task]) -> Vec<MemberTaskSummary> {
    let index = TeamIndex::build(tasks, &[]);
    members
        .iter()
        .map(|m| task_summary(m, &index, m.first_name()))
        .filter(|s| s.total > 0)
        .collect()
}

/// Attendance for every member, in member order.
pub fn attendance_summaries(
    members: &[Member],
    meetings: &[Meeting],
) -> Vec<MemberAttendanceSummary> {
    let index = TeamIndex::build(&[], meetings);
    members
        .iter()
        .map(|m| attendance_summary(m, &index, &m.full_name))
        .collect()
}

/// Attendance chart series: best attendance first, members with no recorded
/// meetings left out. Equal rates keep member order.
pub fn attendance_chart(members: &[Member], meetings: &[Meeting]) -> Vec<MemberAttendanceSummary> {
    let index = TeamIndex::build(&[], meetings);
    let mut series: Vec<_> = members
        .iter()
        .map(|m| attendance_summary(m, &index, m.first_name()))
        .filter(|s| s.total_meetings > 0)
        .collect();
    series.sort_by(|a, b| b.attendance_rate.cmp(&a.attendance_rate));
    series
}

pub fn department_distribution(members: &[Member]) -> DepartmentDistribution {
    let other = members
        .iter()
        .filter(|m| m.in_other_department == DepartmentFlag::Yes)
        .count();
    DepartmentDistribution {
        main: members.len() - other,
        other,
    }
}

/// Short chart label for a meeting date, e.g. `Oct 5`. Unparseable dates are
/// shown as stored.
pub fn date_label(date: &str) -> String {
    let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(date).ok().map(|d| d.date_naive()));

    match parsed {
        Some(day) => day.format("%b %-d").to_string(),
        None => date.to_string(),
    }
}

/// Present/absent counts of the most recent meetings, oldest first.
///
/// `meetings` must already be sorted most recent first.
pub fn attendance_timeline(meetings: &[Meeting]) -> Vec<TimelinePoint> {
    let mut points: Vec<TimelinePoint> = meetings
        .iter()
        .take(TIMELINE_LENGTH)
        .map(|m| TimelinePoint {
            label: date_label(&m.date),
            date: m.date.clone(),
            present: m.count_status(AttendanceStatus::Present),
            absent: m.count_status(AttendanceStatus::Absent),
        })
        .collect();
    points.reverse();
    points
}

/// Headline counters for the dashboard.
pub fn overview(members: &[Member], tasks: &[Task], meetings: &[Meeting]) -> Overview {
    let completed_tasks = tasks.iter().filter(|t| t.status == TaskStatus::Done).count();
    let pending_tasks = tasks.len() - completed_tasks;

    Overview {
        total_members: members.len(),
        total_tasks: tasks.len(),
        completed_tasks,
        pending_tasks,
        total_meetings: meetings.len(),
        members_in_other_department: department_distribution(members).other,
        completion_rate: js_round(percentage(completed_tasks, tasks.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AttendanceRecord;

    fn member(id: &str, name: &str) -> Member {
        Member {
            id: id.to_string(),
            full_name: name.to_string(),
            ..Member::default()
        }
    }

    fn task(member_id: &str, status: TaskStatus) -> Task {
        Task {
            member_id: member_id.to_string(),
            status,
            ..Task::default()
        }
    }

    fn meeting(date: &str, records: &[(&str, AttendanceStatus)]) -> Meeting {
        Meeting {
            date: date.to_string(),
            presence: records
                .iter()
                .map(|(id, status)| AttendanceRecord {
                    member_id: id.to_string(),
                    status: *status,
                    ..AttendanceRecord::default()
                })
                .collect(),
            ..Meeting::default()
        }
    }

    #[test]
    fn test_js_round_rounds_half_up() {
        assert_eq!(js_round(66.666), 67);
        assert_eq!(js_round(50.0), 50);
        assert_eq!(js_round(12.5), 13);
        assert_eq!(js_round(0.0), 0);
        assert_eq!(js_round(percentage(1, 3)), 33);
    }

    #[test]
    fn test_empty_input() {
        assert!(task_summaries(&[], &[]).is_empty());
        assert!(attendance_chart(&[], &[]).is_empty());
        assert!(attendance_timeline(&[]).is_empty());
        assert_eq!(department_distribution(&[]), DepartmentDistribution::default());
        assert_eq!(overview(&[], &[], &[]), Overview::default());
    }

    #[test]
    fn test_task_summaries() {
        let members = vec![member("1", "Alice A"), member("2", "Bob B"), member("3", "Cy C")];
        let tasks = vec![
            task("1", TaskStatus::Done),
            task("1", TaskStatus::Pending),
            task("2", TaskStatus::Done),
            task("ghost", TaskStatus::Done),
        ];

        let summaries = task_summaries(&members, &tasks);
        assert_eq!(summaries[0].completed, 1);
        assert_eq!(summaries[0].pending, 1);
        assert_eq!(summaries[0].task_score, 50);
        assert_eq!(summaries[1].task_score, 100);
        assert_eq!(summaries[2].total, 0);
        assert_eq!(summaries[2].task_score, 0);

        let chart = task_completion_chart(&members, &tasks);
        let names: Vec<_> = chart.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob"]);
    }

    #[test]
    fn test_completed_sum_matches_done_tasks_for_known_members() {
        let members = vec![member("1", "A"), member("2", "B")];
        let tasks = vec![
            task("1", TaskStatus::Done),
            task("2", TaskStatus::Done),
            task("2", TaskStatus::Done),
            task("2", TaskStatus::Pending),
        ];
        let completed: usize = task_summaries(&members, &tasks)
            .iter()
            .map(|s| s.completed)
            .sum();
        assert_eq!(completed, overview(&members, &tasks, &[]).completed_tasks);
    }

    #[test]
    fn test_partial_attendance_counts_for_everyone() {
        let members = vec![member("1", "Alice A"), member("2", "Bob B")];
        let meetings = vec![meeting("2024-03-01", &[("1", AttendanceStatus::Present)])];

        let summaries = attendance_summaries(&members, &meetings);
        assert_eq!(summaries[0].total_meetings, 1);
        assert_eq!(summaries[0].present_count, 1);
        assert_eq!(summaries[0].attendance_rate, 100);
        assert_eq!(summaries[1].total_meetings, 1);
        assert_eq!(summaries[1].present_count, 0);
        assert_eq!(summaries[1].attendance_rate, 0);
    }

    #[test]
    fn test_meetings_without_records_are_ignored() {
        let members = vec![member("1", "Alice A")];
        let meetings = vec![
            meeting("2024-03-02", &[]),
            meeting("2024-03-01", &[("1", AttendanceStatus::Absent)]),
        ];

        let summaries = attendance_summaries(&members, &meetings);
        assert_eq!(summaries[0].total_meetings, 1);
        assert_eq!(summaries[0].attendance_rate, 0);

        let only_empty = vec![meeting("2024-03-02", &[])];
        assert_eq!(attendance_summaries(&members, &only_empty)[0].total_meetings, 0);
        assert!(attendance_chart(&members, &only_empty).is_empty());
    }

    #[test]
    fn test_attendance_chart_sorted_by_rate() {
        let members = vec![member("1", "Alice A"), member("2", "Bob B"), member("3", "Cy C")];
        let meetings = vec![
            meeting(
                "2024-03-02",
                &[("2", AttendanceStatus::Present), ("3", AttendanceStatus::Present)],
            ),
            meeting("2024-03-01", &[("2", AttendanceStatus::Present)]),
        ];

        let chart = attendance_chart(&members, &meetings);
        let rows: Vec<_> = chart.iter().map(|s| (s.name.as_str(), s.attendance_rate)).collect();
        assert_eq!(rows, vec![("Bob", 100), ("Cy", 50), ("Alice", 0)]);
    }

    #[test]
    fn test_department_distribution() {
        let mut alice = member("1", "Alice A");
        alice.in_other_department = DepartmentFlag::Yes;
        let members = vec![alice, member("2", "Bob B"), member("3", "Cy C")];

        let dist = department_distribution(&members);
        assert_eq!(dist, DepartmentDistribution { main: 2, other: 1 });
    }

    #[test]
    fn test_timeline_takes_ten_most_recent_in_order() {
        let meetings: Vec<Meeting> = (1..=12)
            .rev()
            .map(|day| {
                meeting(
                    &format!("2024-10-{:02}", day),
                    &[("1", AttendanceStatus::Present), ("2", AttendanceStatus::Absent)],
                )
            })
            .collect();

        let timeline = attendance_timeline(&meetings);
        assert_eq!(timeline.len(), TIMELINE_LENGTH);
        assert_eq!(timeline[0].label, "Oct 3");
        assert_eq!(timeline[9].label, "Oct 12");
        assert_eq!(timeline[9].present, 1);
        assert_eq!(timeline[9].absent, 1);
    }

    #[test]
    fn test_date_label() {
        assert_eq!(date_label("2024-10-05"), "Oct 5");
        assert_eq!(date_label("2024-01-15T09:30:00Z"), "Jan 15");
        assert_eq!(date_label("next week"), "next week");
    }

    #[test]
    fn test_overview() {
        let mut bob = member("2", "Bob B");
        bob.in_other_department = DepartmentFlag::Yes;
        let members = vec![member("1", "Alice A"), bob];
        let tasks = vec![
            task("1", TaskStatus::Done),
            task("1", TaskStatus::Pending),
            task("2", TaskStatus::Pending),
        ];
        let meetings = vec![meeting("2024-03-01", &[])];

        let stats = overview(&members, &tasks, &meetings);
        assert_eq!(stats.total_members, 2);
        assert_eq!(stats.total_tasks, 3);
        assert_eq!(stats.completed_tasks, 1);
        assert_eq!(stats.pending_tasks, 2);
        assert_eq!(stats.total_meetings, 1);
        assert_eq!(stats.members_in_other_department, 1);
        assert_eq!(stats.completion_rate, 33);
    }
}
