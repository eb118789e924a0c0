//! Analytics over the team data.
//!
//! `aggregator` computes per-member summaries and chart series, `leaderboard`
//! ranks members. `build_dashboard` runs a full pass for the report.

pub mod aggregator;
pub mod leaderboard;

pub use aggregator::*;
pub use leaderboard::*;

use crate::models::{Dashboard, DashboardMetadata, Meeting, Member, Task};
use chrono::Utc;
use std::time::Instant;

/// Compute every dashboard view from one snapshot of the data.
pub fn build_dashboard(
    source: &str,
    members: &[Member],
    tasks: &[Task],
    meetings: &[Meeting],
    started: Instant,
) -> Dashboard {
    let overview = overview(members, tasks, meetings);
    let leaderboard = leaderboard(members, tasks, meetings);
    let task_completion = task_completion_chart(members, tasks);
    let attendance = attendance_chart(members, meetings);
    let departments = department_distribution(members);
    let timeline = attendance_timeline(meetings);

    Dashboard {
        metadata: DashboardMetadata {
            source: source.to_string(),
            generated_at: Utc::now(),
            duration_seconds: started.elapsed().as_secs_f64(),
        },
        overview,
        leaderboard,
        task_completion,
        attendance,
        departments,
        timeline,
    }
}
