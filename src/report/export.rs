//! Table exports: document, spreadsheet and raw JSON files.

use crate::models::{AttendanceStatus, LeaderboardEntry, Meeting, Member, Task};
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Longest cell shown in a document export.
pub const DOCUMENT_CELL_WIDTH: usize = 40;

/// File format of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// Markdown table
    Document,
    /// CSV with a header row
    Spreadsheet,
    /// Raw records as pretty JSON
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Document => "md",
            ExportFormat::Spreadsheet => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// One exported column: a header, a stable key and how to render a cell.
pub struct Column<T> {
    pub header: &'static str,
    pub key: &'static str,
    accessor: Box<dyn Fn(&T) -> String>,
}

impl<T> Column<T> {
    pub fn new(
        header: &'static str,
        key: &'static str,
        accessor: impl Fn(&T) -> String + 'static,
    ) -> Self {
        Self {
            header,
            key,
            accessor: Box::new(accessor),
        }
    }

    pub fn cell(&self, row: &T) -> String {
        (self.accessor)(row)
    }
}

/// Keep only the columns whose key is listed, in the listed order. An empty
/// list keeps every column.
pub fn select_columns<T>(columns: Vec<Column<T>>, keys: &[String]) -> Result<Vec<Column<T>>> {
    if keys.is_empty() {
        return Ok(columns);
    }

    let mut by_key: HashMap<&'static str, Column<T>> =
        columns.into_iter().map(|c| (c.key, c)).collect();
    let mut known: Vec<&'static str> = by_key.keys().copied().collect();
    known.sort_unstable();

    keys.iter()
        .map(|key| {
            by_key.remove(key.as_str()).with_context(|| {
                format!("Unknown column '{}' (available: {})", key, known.join(", "))
            })
        })
        .collect()
}

fn truncate(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

/// Markdown table with the export name as title.
pub fn render_document<T>(rows: &[T], columns: &[Column<T>], title: &str) -> String {
    let mut output = String::new();

    output.push_str(&format!("# {}\n\n", title));

    let headers: Vec<&str> = columns.iter().map(|c| c.header).collect();
    output.push_str(&format!("| {} |\n", headers.join(" | ")));
    output.push_str(&format!("|{}\n", ":---|".repeat(columns.len())));

    for row in rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|c| {
                truncate(&c.cell(row), DOCUMENT_CELL_WIDTH)
                    .replace('|', "\\|")
                    .replace(['\n', '\r'], " ")
            })
            .collect();
        output.push_str(&format!("| {} |\n", cells.join(" | ")));
    }

    output
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// CSV with a header row.
pub fn render_spreadsheet<T>(rows: &[T], columns: &[Column<T>]) -> String {
    let mut output = String::new();

    let headers: Vec<String> = columns.iter().map(|c| csv_field(c.header)).collect();
    output.push_str(&headers.join(","));
    output.push_str("\r\n");

    for row in rows {
        let cells: Vec<String> = columns.iter().map(|c| csv_field(&c.cell(row))).collect();
        output.push_str(&cells.join(","));
        output.push_str("\r\n");
    }

    output
}

/// Write `rows` to `<dir>/<filename>.<ext>` and return the path written.
///
/// Document and spreadsheet exports go through `columns`; JSON exports the
/// full records.
pub fn export_rows<T: Serialize>(
    rows: &[T],
    columns: &[Column<T>],
    filename: &str,
    format: ExportFormat,
    dir: &Path,
) -> Result<PathBuf> {
    let content = match format {
        ExportFormat::Document => render_document(rows, columns, filename),
        ExportFormat::Spreadsheet => render_spreadsheet(rows, columns),
        ExportFormat::Json => serde_json::to_string_pretty(rows)?,
    };

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    let path = dir.join(format!("{}.{}", filename, format.extension()));
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write export to {}", path.display()))?;

    info!("Exported {} rows to {}", rows.len(), path.display());
    Ok(path)
}

pub fn member_columns() -> Vec<Column<Member>> {
    vec![
        Column::new("Full Name", "fullName", |m: &Member| m.full_name.clone()),
        Column::new("Email", "email", |m: &Member| m.email.clone()),
        Column::new("Phone Number", "phoneNumber", |m: &Member| {
            m.phone_number.clone()
        }),
        Column::new("Other Department", "inOtherDepartment", |m: &Member| {
            m.in_other_department.to_string()
        }),
    ]
}

/// Task columns. The owner's name is resolved against `members`.
pub fn task_columns(members: &[Member]) -> Vec<Column<Task>> {
    let names: HashMap<String, String> = members
        .iter()
        .map(|m| (m.id.clone(), m.full_name.clone()))
        .collect();

    vec![
        Column::new("Member", "member", move |t: &Task| {
            names
                .get(&t.member_id)
                .cloned()
                .unwrap_or_else(|| "Unknown".to_string())
        }),
        Column::new("Title", "title", |t: &Task| t.title.clone()),
        Column::new("Description", "description", |t: &Task| t.description.clone()),
        Column::new("Status", "status", |t: &Task| t.status.to_string()),
        Column::new("Created At", "createdAt", |t: &Task| {
            t.created_at.clone().unwrap_or_default()
        }),
    ]
}

/// Meeting columns. `Total` is the current team size.
pub fn meeting_columns(member_count: usize) -> Vec<Column<Meeting>> {
    vec![
        Column::new("Title", "title", |m: &Meeting| m.title.clone()),
        Column::new("Date", "date", |m: &Meeting| m.date.clone()),
        Column::new("Description", "description", |m: &Meeting| m.description.clone()),
        Column::new("Present", "present", |m: &Meeting| {
            m.count_status(AttendanceStatus::Present).to_string()
        }),
        Column::new("Absent", "absent", |m: &Meeting| {
            m.count_status(AttendanceStatus::Absent).to_string()
        }),
        Column::new("Total", "total", move |_: &Meeting| member_count.to_string()),
    ]
}

/// A leaderboard entry with its 1-based rank.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedEntry {
    pub rank: usize,
    #[serde(flatten)]
    pub entry: LeaderboardEntry,
}

pub fn rank_entries(entries: &[LeaderboardEntry]) -> Vec<RankedEntry> {
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| RankedEntry {
            rank: i + 1,
            entry: entry.clone(),
        })
        .collect()
}

pub fn leaderboard_columns() -> Vec<Column<RankedEntry>> {
    vec![
        Column::new("Rank", "rank", |r: &RankedEntry| r.rank.to_string()),
        Column::new("Member", "member", |r: &RankedEntry| {
            r.entry.member.full_name.clone()
        }),
        Column::new("Email", "email", |r: &RankedEntry| r.entry.member.email.clone()),
        Column::new("Total Score", "totalScore", |r: &RankedEntry| {
            r.entry.total_score.to_string()
        }),
        Column::new("Completed Tasks", "completedTasks", |r: &RankedEntry| {
            format!("{}/{}", r.entry.completed_tasks, r.entry.total_tasks)
        }),
        Column::new("Task Score %", "taskScore", |r: &RankedEntry| {
            format!("{}%", r.entry.task_score)
        }),
        Column::new("Present", "presentCount", |r: &RankedEntry| {
            format!("{}/{}", r.entry.present_count, r.entry.total_meetings)
        }),
        Column::new("Attendance Rate %", "presenceRate", |r: &RankedEntry| {
            format!("{}%", r.entry.presence_rate)
        }),
    ]
}
