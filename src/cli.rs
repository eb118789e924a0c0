//! Command-line interface argument parsing.
//!
//! This module defines the `teamboard` subcommands with clap, plus
//! validation and the log level derived from the verbosity flags.

use crate::config::StoreBackend;
use crate::models::{DepartmentFlag, TaskStatus};
use crate::preferences::SettingKey;
use crate::report::ExportFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Teamboard - team members, tasks and meeting attendance from the terminal
///
/// Tracks who is on the team, what they are working on and who showed up,
/// and ranks everyone on a leaderboard. Data lives in a local JSON file or
/// in Cloud Firestore.
///
/// Examples:
///   teamboard leaderboard
///   teamboard analytics --output dashboard.md
///   teamboard members add --name "Alice Anders" --email alice@example.com
///   teamboard members import team.json
///   teamboard meetings attendance <MEETING_ID> --present alice@example.com
///   teamboard --store firestore --project-id my-project tasks list
///   teamboard init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    ///
    /// If not specified, looks for .teamboard.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (errors only, no progress bars)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Answer yes to confirmation prompts
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Storage backend (file, firestore)
    #[arg(long, value_name = "BACKEND", env = "TEAMBOARD_STORE", global = true)]
    pub store: Option<StoreBackend>,

    /// JSON data file used by the file backend
    #[arg(long, value_name = "FILE", env = "TEAMBOARD_DATA_FILE", global = true)]
    pub data_file: Option<PathBuf>,

    /// Firestore project id
    #[arg(long, value_name = "ID", env = "FIRESTORE_PROJECT_ID", global = true)]
    pub project_id: Option<String>,

    /// Firestore web API key
    #[arg(long, env = "FIRESTORE_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Bearer token of a signed-in Firestore identity
    #[arg(long, env = "FIRESTORE_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Rank members by completed tasks and attendance
    Leaderboard {
        /// Also export the leaderboard in this format
        #[arg(long, value_name = "FORMAT")]
        export: Option<ExportFormat>,

        /// Directory for the exported file
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Columns to export, by key (comma-separated)
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,
    },

    /// Generate the analytics dashboard report
    Analytics {
        /// Output file for the report (defaults to the configured report file)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format (markdown, json)
        #[arg(long, value_name = "FORMAT")]
        format: Option<OutputFormat>,
    },

    /// Manage team members
    Members {
        #[command(subcommand)]
        action: MemberAction,
    },

    /// Manage tasks
    Tasks {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// Manage meetings and attendance
    Meetings {
        #[command(subcommand)]
        action: MeetingAction,
    },

    /// Show or change preferences
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Delete every member, task and meeting
    Reset,

    /// Generate a default .teamboard.toml configuration file
    InitConfig,
}

/// Shared options of the `export` subcommands.
#[derive(clap::Args, Debug, Clone)]
pub struct ExportArgs {
    /// Export format
    #[arg(short, long, default_value = "spreadsheet", value_name = "FORMAT")]
    pub format: ExportFormat,

    /// Directory for the exported file (defaults to the configured output dir)
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Columns to export, by key (comma-separated)
    ///
    /// Example: --columns fullName,email
    #[arg(long, value_delimiter = ',')]
    pub columns: Vec<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum MemberAction {
    /// List members alphabetically
    List,

    /// Add a member
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        phone: String,
        /// The member also belongs to another department
        #[arg(long)]
        other_department: bool,
    },

    /// Update a member (by id or email)
    Update {
        member: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long, value_name = "YES|NO")]
        other_department: Option<DepartmentArg>,
    },

    /// Delete a member (by id or email)
    Delete { member: String },

    /// Import members from a JSON array, matched by email
    ///
    /// Members missing from the file are deleted after confirmation.
    Import { file: PathBuf },

    /// Export members
    Export(ExportArgs),
}

#[derive(Subcommand, Debug, Clone)]
pub enum TaskAction {
    /// List tasks, most recent first
    List {
        /// Only tasks of this member (id or email)
        #[arg(long)]
        member: Option<String>,
        #[arg(long)]
        status: Option<StatusArg>,
    },

    /// Add a task
    Add {
        #[arg(long)]
        title: String,
        /// Owning member (id or email)
        #[arg(long)]
        member: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "pending")]
        status: StatusArg,
    },

    /// Update a task
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        member: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        status: Option<StatusArg>,
    },

    /// Flip a task between pending and done
    Toggle { id: String },

    /// Delete a task
    Delete { id: String },

    /// Export tasks
    Export(ExportArgs),
}

#[derive(Subcommand, Debug, Clone)]
pub enum MeetingAction {
    /// List meetings, most recent first
    List,

    /// Add a meeting
    Add {
        #[arg(long)]
        title: String,
        /// Meeting date, e.g. 2024-10-05
        #[arg(long)]
        date: String,
        #[arg(long, default_value = "")]
        description: String,
    },

    /// Update a meeting
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },

    /// Delete a meeting and its attendance
    Delete { id: String },

    /// Show or record attendance for a meeting
    ///
    /// Members not listed keep their current status (absent by default).
    /// Without --present/--absent the sheet is only shown.
    Attendance {
        id: String,
        /// Members present (ids or emails, comma-separated)
        #[arg(long, value_delimiter = ',')]
        present: Vec<String>,
        /// Members absent (ids or emails, comma-separated)
        #[arg(long, value_delimiter = ',')]
        absent: Vec<String>,
    },

    /// Export meetings
    Export(ExportArgs),
}

#[derive(Subcommand, Debug, Clone)]
pub enum SettingsAction {
    /// Show current preferences
    Show,

    /// Change a preference
    Set { key: SettingKey, value: String },
}

/// Output format for the analytics report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DepartmentArg {
    Yes,
    No,
}

impl From<DepartmentArg> for DepartmentFlag {
    fn from(arg: DepartmentArg) -> Self {
        match arg {
            DepartmentArg::Yes => DepartmentFlag::Yes,
            DepartmentArg::No => DepartmentFlag::No,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StatusArg {
    Pending,
    Done,
}

impl From<StatusArg> for TaskStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Pending => TaskStatus::Pending,
            StatusArg::Done => TaskStatus::Done,
        }
    }
}

fn require(value: &str, what: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} must not be empty", what));
    }
    Ok(())
}

fn require_if_set(value: &Option<String>, what: &str) -> Result<(), String> {
    match value {
        Some(v) => require(v, what),
        None => Ok(()),
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref path) = self.data_file {
            if path.as_os_str().is_empty() {
                return Err("Data file path must not be empty".to_string());
            }
        }

        match &self.command {
            Command::Members { action } => match action {
                MemberAction::Add { name, email, .. } => {
                    require(name, "Member name")?;
                    require(email, "Member email")?;
                    if !email.contains('@') {
                        return Err(format!("Invalid email address: {}", email));
                    }
                }
                MemberAction::Update { name, email, .. } => {
                    require_if_set(name, "Member name")?;
                    require_if_set(email, "Member email")?;
                }
                MemberAction::Import { file } => {
                    if !file.is_file() {
                        return Err(format!("Import file does not exist: {}", file.display()));
                    }
                }
                _ => {}
            },
            Command::Tasks { action } => match action {
                TaskAction::Add { title, member, .. } => {
                    require(title, "Task title")?;
                    require(member, "Task member")?;
                }
                TaskAction::Update { title, member, .. } => {
                    require_if_set(title, "Task title")?;
                    require_if_set(member, "Task member")?;
                }
                _ => {}
            },
            Command::Meetings { action } => match action {
                MeetingAction::Add { title, date, .. } => {
                    require(title, "Meeting title")?;
                    require(date, "Meeting date")?;
                }
                MeetingAction::Update { title, date, .. } => {
                    require_if_set(title, "Meeting title")?;
                    require_if_set(date, "Meeting date")?;
                }
                MeetingAction::Attendance { present, absent, .. } => {
                    if let Some(both) = present.iter().find(|p| absent.contains(p)) {
                        return Err(format!("Member {} listed as both present and absent", both));
                    }
                }
                _ => {}
            },
            _ => {}
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Whether progress bars and prompts may be shown.
    pub fn interactive(&self) -> bool {
        !self.quiet
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        let mut full = vec!["teamboard"];
        full.extend_from_slice(argv);
        Args::try_parse_from(full).unwrap()
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let args = parse(&["members", "list", "--store", "file", "--data-file", "team.json", "-v"]);
        assert!(matches!(
            args.command,
            Command::Members {
                action: MemberAction::List
            }
        ));
        assert_eq!(args.store, Some(StoreBackend::File));
        assert_eq!(args.data_file, Some(PathBuf::from("team.json")));
        assert!(args.verbose);
    }

    #[test]
    fn test_parse_attendance_lists() {
        let args = parse(&["meetings", "attendance", "m1", "--present", "a@x.io,b@x.io"]);
        match args.command {
            Command::Meetings {
                action: MeetingAction::Attendance { id, present, absent },
            } => {
                assert_eq!(id, "m1");
                assert_eq!(present, vec!["a@x.io", "b@x.io"]);
                assert!(absent.is_empty());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_export_defaults() {
        let args = parse(&["tasks", "export"]);
        match args.command {
            Command::Tasks {
                action: TaskAction::Export(export),
            } => {
                assert_eq!(export.format, ExportFormat::Spreadsheet);
                assert!(export.columns.is_empty());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_validation_rejects_bad_member() {
        let args = parse(&["members", "add", "--name", "Alice", "--email", "not-an-email"]);
        assert!(args.validate().is_err());

        let args = parse(&["members", "add", "--name", " ", "--email", "a@x.io"]);
        assert!(args.validate().is_err());

        let args = parse(&["members", "add", "--name", "Alice", "--email", "a@x.io"]);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_attendance() {
        let args = parse(&["meetings", "attendance", "m1", "--present", "a", "--absent", "a"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let args = parse(&["reset", "--verbose", "--quiet"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = parse(&["leaderboard"]);
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
        assert!(!args.interactive());
    }
}
