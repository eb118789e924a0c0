//! Leaderboard ranking.

use super::aggregator::{js_round, percentage, TeamIndex};
use crate::models::{LeaderboardEntry, Meeting, Member, Task};

/// Points per completed task.
pub const TASK_POINTS: u64 = 10;
/// Points per meeting attended.
pub const PRESENCE_POINTS: u64 = 5;

/// Weight of the task percentage in the activity score.
const TASK_WEIGHT: f64 = 0.6;
/// Weight of the attendance percentage in the activity score.
const ATTENDANCE_WEIGHT: f64 = 0.4;

/// Rank every member by total score, highest first.
///
/// Ties keep the order of `members` (alphabetical by full name when they come
/// from the repository). Members with no tasks or attendance still get a row.
pub fn leaderboard(
    members: &[Member],
    tasks: &[Task],
    meetings: &[Meeting],
) -> Vec<LeaderboardEntry> {
    let index = TeamIndex::build(tasks, meetings);

    let mut entries: Vec<LeaderboardEntry> = members
        .iter()
        .map(|member| {
            let counts = index.task_counts(&member.id);
            let present_count = index.present_count(&member.id);
            let total_meetings = index.recorded_meetings();

            let task_pct = percentage(counts.completed, counts.total());
            let presence_pct = percentage(present_count, total_meetings);

            LeaderboardEntry {
                member: member.clone(),
                completed_tasks: counts.completed,
                total_tasks: counts.total(),
                task_score: js_round(task_pct),
                present_count,
                total_meetings,
                presence_rate: js_round(presence_pct),
                total_score: counts.completed as u64 * TASK_POINTS
                    + present_count as u64 * PRESENCE_POINTS,
                activity_score: js_round(
                    task_pct * TASK_WEIGHT + presence_pct * ATTENDANCE_WEIGHT,
                ),
            }
        })
        .collect();

    // sort_by is stable, so equal scores keep member order
    entries.sort_by(|a, b| b.total_score.cmp(&a.total_score));
    entries
}
