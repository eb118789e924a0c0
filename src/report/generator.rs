//! Markdown dashboard report.
//!
//! This module renders the analytics dashboard (overview, leaderboard, task
//! and attendance charts) as a Markdown document or as JSON.

use crate::analysis::{PRESENCE_POINTS, TASK_POINTS};
use crate::models::{
    Dashboard, DashboardMetadata, DepartmentDistribution, LeaderboardEntry,
    MemberAttendanceSummary, MemberTaskSummary, Overview, RankBadge, TimelinePoint,
};
use anyhow::Result;

/// Width of the text bars drawn for percentages.
const BAR_WIDTH: usize = 20;

/// Generate the complete Markdown dashboard.
pub fn generate_markdown_report(dashboard: &Dashboard) -> String {
    let mut output = String::new();

    output.push_str("# Team Dashboard\n\n");

    output.push_str(&generate_metadata_section(&dashboard.metadata));
    output.push_str(&generate_overview_section(&dashboard.overview));
    output.push_str(&generate_leaderboard_section(&dashboard.leaderboard));
    output.push_str(&generate_task_section(&dashboard.task_completion));
    output.push_str(&generate_attendance_section(&dashboard.attendance));
    output.push_str(&generate_department_section(&dashboard.departments));
    output.push_str(&generate_timeline_section(&dashboard.timeline));
    output.push_str(&generate_scoring_section());
    output.push_str(&generate_footer());

    output
}

/// Text bar for a percentage, e.g. `█████░░░░░`.
fn bar(percent: u32) -> String {
    let filled = (percent.min(100) as usize * BAR_WIDTH + 50) / 100;
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

fn generate_metadata_section(metadata: &DashboardMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Data Source:** `{}`\n", metadata.source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Duration:** {:.1}s\n", metadata.duration_seconds));
    section.push('\n');

    section
}

fn generate_overview_section(overview: &Overview) -> String {
    let mut section = String::new();

    section.push_str("## Overview\n\n");
    section.push_str("| 👥 Members | ✅ Tasks | 📅 Meetings | 📈 Task Completion |\n");
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} ({} completed, {} pending) | {} | {}% |\n\n",
        overview.total_members,
        overview.total_tasks,
        overview.completed_tasks,
        overview.pending_tasks,
        overview.total_meetings,
        overview.completion_rate
    ));

    section
}

fn generate_leaderboard_section(entries: &[LeaderboardEntry]) -> String {
    let mut section = String::new();

    section.push_str("## Leaderboard\n\n");

    if entries.is_empty() {
        section.push_str("No members yet.\n\n");
        return section;
    }

    section.push_str(
        "| Rank | Member | Total Score | Tasks | Task Score | Attendance | Attendance Rate | Activity |\n",
    );
    section.push_str("|:---:|:---|:---:|:---:|:---:|:---:|:---:|:---:|\n");

    for (i, entry) in entries.iter().enumerate() {
        section.push_str(&format!(
            "| {} | {} | **{} pts** | {}/{} | {}% | {}/{} | {}% | {}% |\n",
            RankBadge::for_rank(i + 1).emoji(),
            entry.member.full_name,
            entry.total_score,
            entry.completed_tasks,
            entry.total_tasks,
            entry.task_score,
            entry.present_count,
            entry.total_meetings,
            entry.presence_rate,
            entry.activity_score
        ));
    }
    section.push('\n');

    section
}

fn generate_task_section(series: &[MemberTaskSummary]) -> String {
    let mut section = String::new();

    section.push_str("## Task Completion by Member\n\n");

    if series.is_empty() {
        section.push_str("No tasks assigned yet.\n\n");
        return section;
    }

    section.push_str("| Member | Completed | Pending | Progress |\n");
    section.push_str("|:---|:---:|:---:|:---|\n");
    for item in series {
        section.push_str(&format!(
            "| {} | {} | {} | `{}` {}% |\n",
            item.name,
            item.completed,
            item.pending,
            bar(item.task_score),
            item.task_score
        ));
    }
    section.push('\n');

    section
}

fn generate_attendance_section(series: &[MemberAttendanceSummary]) -> String {
    let mut section = String::new();

    section.push_str("## Attendance Rate by Member\n\n");

    if series.is_empty() {
        section.push_str("No attendance recorded yet.\n\n");
        return section;
    }

    section.push_str("| Member | Present | Rate |\n");
    section.push_str("|:---|:---:|:---|\n");
    for item in series {
        section.push_str(&format!(
            "| {} | {}/{} | `{}` {}% |\n",
            item.name,
            item.present_count,
            item.total_meetings,
            bar(item.attendance_rate),
            item.attendance_rate
        ));
    }
    section.push('\n');

    section
}

fn generate_department_section(departments: &DepartmentDistribution) -> String {
    let mut section = String::new();

    section.push_str("## Department Distribution\n\n");
    section.push_str("| Main Department | Other Department |\n");
    section.push_str("|:---:|:---:|\n");
    section.push_str(&format!("| {} | {} |\n\n", departments.main, departments.other));

    section
}

fn generate_timeline_section(timeline: &[TimelinePoint]) -> String {
    let mut section = String::new();

    section.push_str("## Presence Over Time\n\n");

    if timeline.is_empty() {
        section.push_str("No meetings yet.\n\n");
        return section;
    }

    section.push_str("| Meeting | Present | Absent |\n");
    section.push_str("|:---|:---:|:---:|\n");
    for point in timeline {
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            point.label, point.present, point.absent
        ));
    }
    section.push('\n');

    section
}

fn generate_scoring_section() -> String {
    let mut section = String::new();

    section.push_str("## How Scoring Works\n\n");
    section.push_str(&format!(
        "- **Total Score** = (Completed Tasks × {}) + (Present Attendances × {})\n",
        TASK_POINTS, PRESENCE_POINTS
    ));
    section.push_str("- **Task Score** = Completed Tasks / Total Tasks × 100%\n");
    section.push_str(
        "- **Attendance Rate** = Present / Meetings with attendance recorded × 100%\n",
    );
    section.push_str(
        "- **Activity** = 60% Task Score + 40% Attendance Rate (not used for ranking)\n\n",
    );

    section
}

fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by teamboard v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Generate a JSON dashboard.
pub fn generate_json_report(dashboard: &Dashboard) -> Result<String> {
    serde_json::to_string_pretty(dashboard).map_err(Into::into)
}
