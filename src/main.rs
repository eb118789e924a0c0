//! Teamboard - team management dashboard for the terminal
//!
//! Tracks team members, their tasks and meeting attendance, ranks members
//! on a leaderboard and renders an analytics dashboard.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (store unreachable, bad config, invalid import file, etc.)
//!   2 - Import finished with errors, or a destructive step was declined

mod analysis;
mod cli;
mod config;
mod import;
mod models;
mod preferences;
mod report;
mod repository;
mod store;

use anyhow::{Context, Result};
use cli::{
    Args, Command, ExportArgs, MeetingAction, MemberAction, OutputFormat, SettingsAction,
    TaskAction,
};
use config::{Config, StoreBackend, CONFIG_FILE};
use dialoguer::Confirm;
use import::{ImportDecision, ImportOutcome};
use indicatif::ProgressBar;
use models::{
    normalize_email, AttendanceStatus, Meeting, MeetingFields, Member, MemberFields, RankBadge,
    Task, TaskFields,
};
use preferences::{Preferences, Theme};
use report::{Column, ExportFormat};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use store::{DocumentStore, FileStore, FirestoreStore};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if matches!(args.command, Command::InitConfig) {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("Teamboard v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle init-config: generate a default .teamboard.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to choose the store backend, data file and Firestore project.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}

/// Open the configured document store.
fn open_store(config: &Config) -> Result<Box<dyn DocumentStore>> {
    match config.store.backend {
        StoreBackend::File => {
            let mut store = FileStore::open(&config.store.data_file).with_context(|| {
                format!("Failed to open data file {}", config.store.data_file.display())
            })?;
            for (collection, field) in config.store.index_pairs() {
                store = store.with_index(&collection, &field);
            }
            Ok(Box::new(store))
        }
        StoreBackend::Firestore => {
            let store = FirestoreStore::new(config.firestore.settings())
                .context("Failed to set up the Firestore client")?;
            Ok(Box::new(store))
        }
    }
}

/// Everything a command handler needs.
struct App {
    store: Box<dyn DocumentStore>,
    config: Config,
    theme: Theme,
    /// Print success notices (the notifications preference).
    notify: bool,
    interactive: bool,
    assume_yes: bool,
}

impl App {
    fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    fn notice(&self, message: &str) {
        if self.notify {
            println!("✅ {}", message);
        }
    }

    fn progress_bar(&self) -> ProgressBar {
        if self.interactive {
            self.theme.progress_bar(0)
        } else {
            ProgressBar::hidden()
        }
    }

    /// Ask a yes/no question on the terminal. Defaults to no.
    ///
    /// `--yes` answers it; in quiet mode nothing is asked and the answer is no.
    fn confirm(&self, prompt: &str) -> Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }
        if !self.interactive {
            warn!("{} Declined (quiet mode, pass --yes to confirm)", prompt);
            return Ok(false);
        }

        Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .context("Failed to read confirmation")
    }

    fn export_dir(&self, explicit: &Option<PathBuf>) -> PathBuf {
        explicit
            .clone()
            .unwrap_or_else(|| self.config.general.output_dir.clone())
    }

    fn export<T: Serialize>(
        &self,
        rows: &[T],
        columns: Vec<Column<T>>,
        filename: &str,
        format: ExportFormat,
        output_dir: &Option<PathBuf>,
        keys: &[String],
    ) -> Result<()> {
        let columns = report::select_columns(columns, keys)?;
        let path =
            report::export_rows(rows, &columns, filename, format, &self.export_dir(output_dir))?;
        self.notice(&format!("Exported {} {} to {}", rows.len(), filename, path.display()));
        Ok(())
    }
}

/// Run the selected command. Returns the exit code (0 or 2).
async fn run(args: Args) -> Result<i32> {
    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let mut preferences = Preferences::load(&config.general.preferences_file);
    let theme = preferences.apply();

    if let Command::Settings { action } = &args.command {
        return handle_settings(&mut preferences, action);
    }

    let store = open_store(&config)?;
    info!("Using store: {}", store.describe());

    let app = App {
        store,
        config,
        theme,
        notify: preferences.notifications() && !args.quiet,
        interactive: args.interactive(),
        assume_yes: args.yes,
    };

    match &args.command {
        Command::Leaderboard {
            export,
            output_dir,
            columns,
        } => handle_leaderboard(&app, *export, output_dir, columns).await,
        Command::Analytics { output, format } => handle_analytics(&app, output, *format).await,
        Command::Members { action } => handle_members(&app, action).await,
        Command::Tasks { action } => handle_tasks(&app, action).await,
        Command::Meetings { action } => handle_meetings(&app, action).await,
        Command::Reset => handle_reset(&app).await,
        Command::Settings { .. } | Command::InitConfig => Ok(0),
    }
}

/// Fetch members, tasks and meetings concurrently.
async fn load_team(store: &dyn DocumentStore) -> (Vec<Member>, Vec<Task>, Vec<Meeting>) {
    tokio::join!(
        repository::fetch_members(store),
        repository::fetch_tasks(store),
        repository::fetch_meetings(store)
    )
}

/// Find a member by id or (case-insensitive) email.
fn find_member<'a>(members: &'a [Member], key: &str) -> Result<&'a Member> {
    let email = normalize_email(key);
    members
        .iter()
        .find(|m| m.id == key || (!email.is_empty() && m.email_key() == email))
        .with_context(|| format!("No member matches '{}'", key))
}

fn find_task<'a>(tasks: &'a [Task], id: &str) -> Result<&'a Task> {
    tasks
        .iter()
        .find(|t| t.id == id)
        .with_context(|| format!("No task with id '{}'", id))
}

fn find_meeting<'a>(meetings: &'a [Meeting], id: &str) -> Result<&'a Meeting> {
    meetings
        .iter()
        .find(|m| m.id == id)
        .with_context(|| format!("No meeting with id '{}'", id))
}

fn shorten(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut short: String = text.chars().take(width.saturating_sub(1)).collect();
    short.push('…');
    short
}

async fn handle_leaderboard(
    app: &App,
    export: Option<ExportFormat>,
    output_dir: &Option<PathBuf>,
    columns: &[String],
) -> Result<i32> {
    let (members, tasks, meetings) = load_team(app.store()).await;
    let board = analysis::leaderboard(&members, &tasks, &meetings);

    println!("\n🏆 Leaderboard\n");
    if board.is_empty() {
        println!("   No members yet. Add some with `teamboard members add`.");
    }
    for (i, entry) in board.iter().enumerate() {
        println!(
            "   {:>4}  {:<28} {:>5} pts   tasks {}/{} ({}%)   present {}/{} ({}%)",
            RankBadge::for_rank(i + 1).emoji(),
            shorten(&entry.member.full_name, 28),
            entry.total_score,
            entry.completed_tasks,
            entry.total_tasks,
            entry.task_score,
            entry.present_count,
            entry.total_meetings,
            entry.presence_rate
        );
    }
    println!(
        "\n   Total Score = (Completed Tasks × {}) + (Present Attendances × {})",
        analysis::TASK_POINTS,
        analysis::PRESENCE_POINTS
    );

    if let Some(format) = export {
        let ranked = report::rank_entries(&board);
        app.export(
            &ranked,
            report::leaderboard_columns(),
            "leaderboard",
            format,
            output_dir,
            columns,
        )?;
    }

    Ok(0)
}

async fn handle_analytics(
    app: &App,
    output: &Option<PathBuf>,
    format: Option<OutputFormat>,
) -> Result<i32> {
    let start_time = Instant::now();

    println!("📊 Loading team data from {}...", app.store().describe());
    let (members, tasks, meetings) = load_team(app.store()).await;

    let dashboard = analysis::build_dashboard(
        &app.store().describe(),
        &members,
        &tasks,
        &meetings,
        start_time,
    );

    let format = format.unwrap_or(if app.config.report.json {
        OutputFormat::Json
    } else {
        OutputFormat::Markdown
    });
    let content = match format {
        OutputFormat::Json => report::generate_json_report(&dashboard)?,
        OutputFormat::Markdown => report::generate_markdown_report(&dashboard),
    };

    let path = output
        .clone()
        .unwrap_or_else(|| app.config.report.output.clone());
    std::fs::write(&path, &content)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    let overview = &dashboard.overview;
    println!("\n📊 Team Summary:");
    println!("   Members: {}", overview.total_members);
    println!(
        "   Tasks: {} ({} completed, {} pending)",
        overview.total_tasks, overview.completed_tasks, overview.pending_tasks
    );
    println!("   Meetings: {}", overview.total_meetings);
    println!("   Task completion: {}%", overview.completion_rate);
    if let Some(top) = dashboard.leaderboard.first() {
        println!(
            "   Top member: {} {} ({} pts)",
            RankBadge::Trophy.emoji(),
            top.member.full_name,
            top.total_score
        );
    }

    app.notice(&format!("Dashboard saved to: {}", path.display()));
    Ok(0)
}

async fn handle_members(app: &App, action: &MemberAction) -> Result<i32> {
    let store = app.store();

    match action {
        MemberAction::List => {
            let members = repository::fetch_members(store).await;
            println!("\n👥 Members ({})\n", members.len());
            for m in &members {
                println!(
                    "   {:<20}  {:<28} {:<30} {:<16} other dept: {}",
                    m.id,
                    shorten(&m.full_name, 28),
                    shorten(&m.email, 30),
                    m.phone_number,
                    m.in_other_department
                );
            }
            Ok(0)
        }
        MemberAction::Add {
            name,
            email,
            phone,
            other_department,
        } => {
            let fields = MemberFields {
                full_name: name.trim().to_string(),
                email: email.trim().to_string(),
                phone_number: phone.trim().to_string(),
                in_other_department: if *other_department {
                    models::DepartmentFlag::Yes
                } else {
                    models::DepartmentFlag::No
                },
            };
            let id = repository::create_member(store, &fields)
                .await
                .context("Failed to add member")?;
            app.notice(&format!("Member {} added ({})", fields.full_name, id));
            Ok(0)
        }
        MemberAction::Update {
            member,
            name,
            email,
            phone,
            other_department,
        } => {
            let members = repository::fetch_members(store).await;
            let existing = find_member(&members, member)?;

            let mut fields = existing.fields();
            if let Some(name) = name {
                fields.full_name = name.trim().to_string();
            }
            if let Some(email) = email {
                fields.email = email.trim().to_string();
            }
            if let Some(phone) = phone {
                fields.phone_number = phone.trim().to_string();
            }
            if let Some(flag) = other_department {
                fields.in_other_department = (*flag).into();
            }

            repository::update_member(store, &existing.id, &fields)
                .await
                .context("Failed to update member")?;
            app.notice(&format!("Member {} updated", fields.full_name));
            Ok(0)
        }
        MemberAction::Delete { member } => {
            let members = repository::fetch_members(store).await;
            let existing = find_member(&members, member)?;

            let prompt = format!(
                "Delete member {} ({})? This cannot be undone.",
                existing.full_name, existing.email
            );
            if !app.confirm(&prompt)? {
                println!("Cancelled.");
                return Ok(2);
            }

            repository::delete_member(store, &existing.id)
                .await
                .context("Failed to delete member")?;
            app.notice(&format!("Member {} deleted", existing.full_name));
            Ok(0)
        }
        MemberAction::Import { file } => handle_import(app, file).await,
        MemberAction::Export(ExportArgs {
            format,
            output_dir,
            columns,
        }) => {
            let members = repository::fetch_members(store).await;
            app.export(
                &members,
                report::member_columns(),
                "members",
                *format,
                output_dir,
                columns,
            )?;
            Ok(0)
        }
    }
}

async fn handle_import(app: &App, file: &Path) -> Result<i32> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read import file {}", file.display()))?;
    let records = import::parse_import(&text)
        .with_context(|| format!("Failed to import {}. Please check the format", file.display()))?;

    let members = repository::fetch_members(app.store()).await;
    let plan = match import::plan_import(&members, &records) {
        ImportDecision::Ready(plan) => plan,
        ImportDecision::NeedsConfirmation(pending) => {
            println!(
                "\n⚠️  {} member(s) will be deleted because they are not in the imported file:",
                pending.affected().len()
            );
            for m in pending.affected() {
                println!("   • {} ({})", m.full_name, m.email);
            }

            if !app.confirm("Continue import?")? {
                pending.cancel();
                println!("Import cancelled. Nothing was changed.");
                return Ok(2);
            }
            pending.confirm()
        }
    };

    let pb = app.progress_bar();
    let report = import::apply_import(app.store(), plan, &pb).await;

    match report.outcome() {
        ImportOutcome::Completed | ImportOutcome::NoChanges => app.notice(&report.summary()),
        ImportOutcome::Failed => eprintln!("❌ {}", report.summary()),
    }
    if report.unchanged > 0 {
        info!("{} member(s) already up to date", report.unchanged);
    }

    Ok(if report.errors > 0 { 2 } else { 0 })
}

async fn handle_tasks(app: &App, action: &TaskAction) -> Result<i32> {
    let store = app.store();

    match action {
        TaskAction::List { member, status } => {
            let (members, tasks) = tokio::join!(
                repository::fetch_members(store),
                repository::fetch_tasks(store)
            );
            let owner = match member {
                Some(key) => Some(find_member(&members, key)?.id.clone()),
                None => None,
            };
            let status = status.map(models::TaskStatus::from);

            let shown: Vec<&Task> = tasks
                .iter()
                .filter(|t| owner.as_ref().map_or(true, |id| &t.member_id == id))
                .filter(|t| status.map_or(true, |s| t.status == s))
                .collect();

            println!("\n✅ Tasks ({})\n", shown.len());
            for t in shown {
                let owner = members
                    .iter()
                    .find(|m| m.id == t.member_id)
                    .map(|m| m.full_name.as_str())
                    .unwrap_or("Unknown");
                let mark = match t.status {
                    models::TaskStatus::Done => "☑",
                    models::TaskStatus::Pending => "☐",
                };
                println!(
                    "   {} {:<20}  {:<36} {:<24} {}",
                    mark,
                    t.id,
                    shorten(&t.title, 36),
                    shorten(owner, 24),
                    t.created_at.as_deref().unwrap_or("")
                );
            }
            Ok(0)
        }
        TaskAction::Add {
            title,
            member,
            description,
            status,
        } => {
            let members = repository::fetch_members(store).await;
            let owner = find_member(&members, member)?;
            let fields = TaskFields {
                title: title.trim().to_string(),
                description: description.trim().to_string(),
                member_id: owner.id.clone(),
                status: (*status).into(),
            };
            let id = repository::create_task(store, &fields)
                .await
                .context("Failed to add task")?;
            app.notice(&format!("Task '{}' added for {} ({})", fields.title, owner.full_name, id));
            Ok(0)
        }
        TaskAction::Update {
            id,
            title,
            member,
            description,
            status,
        } => {
            let (members, tasks) = tokio::join!(
                repository::fetch_members(store),
                repository::fetch_tasks(store)
            );
            let task = find_task(&tasks, id)?;

            let mut fields = TaskFields {
                title: task.title.clone(),
                description: task.description.clone(),
                member_id: task.member_id.clone(),
                status: task.status,
            };
            if let Some(title) = title {
                fields.title = title.trim().to_string();
            }
            if let Some(description) = description {
                fields.description = description.trim().to_string();
            }
            if let Some(member) = member {
                fields.member_id = find_member(&members, member)?.id.clone();
            }
            if let Some(status) = status {
                fields.status = (*status).into();
            }

            repository::update_task(store, &task.id, &fields)
                .await
                .context("Failed to update task")?;
            app.notice(&format!("Task '{}' updated", fields.title));
            Ok(0)
        }
        TaskAction::Toggle { id } => {
            let tasks = repository::fetch_tasks(store).await;
            let task = find_task(&tasks, id)?;
            let status = repository::toggle_task_status(store, task)
                .await
                .context("Failed to update task status")?;
            app.notice(&format!("Task '{}' is now {}", task.title, status));
            Ok(0)
        }
        TaskAction::Delete { id } => {
            let tasks = repository::fetch_tasks(store).await;
            let task = find_task(&tasks, id)?;

            if !app.confirm(&format!("Delete task '{}'?", task.title))? {
                println!("Cancelled.");
                return Ok(2);
            }
            repository::delete_task(store, &task.id)
                .await
                .context("Failed to delete task")?;
            app.notice(&format!("Task '{}' deleted", task.title));
            Ok(0)
        }
        TaskAction::Export(ExportArgs {
            format,
            output_dir,
            columns,
        }) => {
            let (members, tasks) = tokio::join!(
                repository::fetch_members(store),
                repository::fetch_tasks(store)
            );
            app.export(
                &tasks,
                report::task_columns(&members),
                "tasks",
                *format,
                output_dir,
                columns,
            )?;
            Ok(0)
        }
    }
}

async fn handle_meetings(app: &App, action: &MeetingAction) -> Result<i32> {
    let store = app.store();

    match action {
        MeetingAction::List => {
            let (members, meetings) = tokio::join!(
                repository::fetch_members(store),
                repository::fetch_meetings(store)
            );
            println!("\n📅 Meetings ({})\n", meetings.len());
            for m in &meetings {
                println!(
                    "   {:<20}  {:<12} {:<32} present {}  absent {}  of {}",
                    m.id,
                    m.date,
                    shorten(&m.title, 32),
                    m.count_status(AttendanceStatus::Present),
                    m.count_status(AttendanceStatus::Absent),
                    members.len()
                );
            }
            Ok(0)
        }
        MeetingAction::Add {
            title,
            date,
            description,
        } => {
            let fields = MeetingFields {
                title: title.trim().to_string(),
                date: date.trim().to_string(),
                description: description.trim().to_string(),
            };
            let id = repository::create_meeting(store, &fields)
                .await
                .context("Failed to add meeting")?;
            app.notice(&format!("Meeting '{}' on {} added ({})", fields.title, fields.date, id));
            Ok(0)
        }
        MeetingAction::Update {
            id,
            title,
            date,
            description,
        } => {
            let meetings = repository::fetch_meetings(store).await;
            let meeting = find_meeting(&meetings, id)?;

            let mut fields = MeetingFields {
                title: meeting.title.clone(),
                date: meeting.date.clone(),
                description: meeting.description.clone(),
            };
            if let Some(title) = title {
                fields.title = title.trim().to_string();
            }
            if let Some(date) = date {
                fields.date = date.trim().to_string();
            }
            if let Some(description) = description {
                fields.description = description.trim().to_string();
            }

            repository::update_meeting(store, &meeting.id, &fields)
                .await
                .context("Failed to update meeting")?;
            app.notice(&format!("Meeting '{}' updated", fields.title));
            Ok(0)
        }
        MeetingAction::Delete { id } => {
            let meetings = repository::fetch_meetings(store).await;
            let meeting = find_meeting(&meetings, id)?;

            let prompt = format!(
                "Delete meeting '{}' on {} and its attendance records?",
                meeting.title, meeting.date
            );
            if !app.confirm(&prompt)? {
                println!("Cancelled.");
                return Ok(2);
            }
            repository::delete_meeting(store, &meeting.id)
                .await
                .context("Failed to delete meeting")?;
            app.notice(&format!("Meeting '{}' deleted", meeting.title));
            Ok(0)
        }
        MeetingAction::Attendance {
            id,
            present,
            absent,
        } => handle_attendance(app, id, present, absent).await,
        MeetingAction::Export(ExportArgs {
            format,
            output_dir,
            columns,
        }) => {
            let (members, meetings) = tokio::join!(
                repository::fetch_members(store),
                repository::fetch_meetings(store)
            );
            app.export(
                &meetings,
                report::meeting_columns(members.len()),
                "meetings",
                *format,
                output_dir,
                columns,
            )?;
            Ok(0)
        }
    }
}

async fn handle_attendance(
    app: &App,
    id: &str,
    present: &[String],
    absent: &[String],
) -> Result<i32> {
    let store = app.store();
    let (members, meetings) = tokio::join!(
        repository::fetch_members(store),
        repository::fetch_meetings(store)
    );
    let meeting = find_meeting(&meetings, id)?;
    let mut sheet = repository::attendance_sheet(&members, meeting);

    let changes = present
        .iter()
        .map(|key| (key, AttendanceStatus::Present))
        .chain(absent.iter().map(|key| (key, AttendanceStatus::Absent)));
    let mut changed = false;
    for (key, status) in changes {
        let member = find_member(&members, key)?;
        if let Some(row) = sheet.iter_mut().find(|(member_id, _)| *member_id == member.id) {
            row.1 = status;
            changed = true;
        }
    }

    println!("\n📅 {} ({})\n", meeting.title, meeting.date);
    for (member, (_, status)) in members.iter().zip(&sheet) {
        let mark = match status {
            AttendanceStatus::Present => "✔ present",
            AttendanceStatus::Absent => "✘ absent",
        };
        println!("   {:<28} {}", shorten(&member.full_name, 28), mark);
    }

    if !changed {
        return Ok(0);
    }

    let saved = repository::save_attendance(store, meeting, &sheet)
        .await
        .context("Failed to save attendance")?;
    app.notice(&format!("Attendance saved ({} members)", saved));
    Ok(0)
}

fn handle_settings(preferences: &mut Preferences, action: &SettingsAction) -> Result<i32> {
    match action {
        SettingsAction::Show => {
            println!("\n⚙️  Settings\n");
            println!(
                "   Dark mode:     {}",
                if preferences.dark_mode() { "on" } else { "off" }
            );
            println!(
                "   Language:      {} ({})",
                preferences.language_name(),
                preferences.language()
            );
            println!(
                "   Notifications: {}",
                if preferences.notifications() { "on" } else { "off" }
            );
        }
        SettingsAction::Set { key, value } => {
            preferences.set(*key, value)?;
            preferences.save()?;
            println!("✅ {} updated", key);
        }
    }
    Ok(0)
}

async fn handle_reset(app: &App) -> Result<i32> {
    let prompt = "Reset all data? This permanently deletes every member, task and meeting.";
    if !app.confirm(prompt)? {
        println!("Cancelled.");
        return Ok(2);
    }

    repository::reset_all(app.store())
        .await
        .context("Error resetting data")?;
    app.notice("All data has been reset");
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: &str, email: &str) -> Member {
        Member {
            id: id.to_string(),
            email: email.to_string(),
            ..Member::default()
        }
    }

    #[test]
    fn test_find_member_by_id_or_email() {
        let members = vec![member("abc", "Alice@X.io"), member("def", "")];
        assert_eq!(find_member(&members, "abc").unwrap().id, "abc");
        assert_eq!(find_member(&members, " alice@x.io").unwrap().id, "abc");
        assert_eq!(find_member(&members, "def").unwrap().id, "def");
        assert!(find_member(&members, "").is_err());
        assert!(find_member(&members, "nobody@x.io").is_err());
    }

    fn app(interactive: bool, assume_yes: bool) -> App {
        App {
            store: Box::new(FileStore::in_memory()),
            config: Config::default(),
            theme: Theme::Light,
            notify: false,
            interactive,
            assume_yes,
        }
    }

    #[test]
    fn test_confirm_without_terminal() {
        assert!(app(true, true).confirm("Reset all data?").unwrap());
        assert!(app(false, true).confirm("Reset all data?").unwrap());
        // Quiet mode never prompts and declines
        assert!(!app(false, false).confirm("Reset all data?").unwrap());
    }

    #[test]
    fn test_shorten() {
        assert_eq!(shorten("short", 10), "short");
        assert_eq!(shorten("a much longer name", 6), "a muc…");
    }

    #[test]
    fn test_open_file_store_from_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.store.data_file = dir.path().join("team.json");

        let store = open_store(&config).unwrap();
        assert!(store.describe().starts_with("file:"));
    }

    /// Copy a fixture into a temp dir so tests never write to the checked-in file.
    fn seeded_config(dir: &tempfile::TempDir) -> Config {
        let data_file = dir.path().join("seed.json");
        let fixture = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/seed.json");
        std::fs::copy(fixture, &data_file).unwrap();

        let mut config = Config::default();
        config.store.data_file = data_file;
        config
    }

    #[test]
    fn test_seeded_leaderboard() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = open_store(&seeded_config(&dir)).unwrap();

        let (members, tasks, meetings) = tokio_test::block_on(load_team(store.as_ref()));
        assert_eq!(members.len(), 3);
        assert_eq!(tasks.len(), 3);
        assert_eq!(meetings.len(), 2);

        let board = analysis::leaderboard(&members, &tasks, &meetings);
        let names: Vec<&str> = board.iter().map(|e| e.member.full_name.as_str()).collect();
        assert_eq!(names, vec!["Alice Anders", "Bob Brown", "Chloe Chen"]);
        assert_eq!(board[0].total_score, 15);
        assert_eq!(board[1].total_score, 15);
        assert_eq!(board[2].total_score, 0);
        // Only the kickoff has attendance recorded
        assert_eq!(board[0].total_meetings, 1);
        assert_eq!(board[2].presence_rate, 0);
    }

    #[test]
    fn test_seeded_import_needs_confirmation() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = open_store(&seeded_config(&dir)).unwrap();

        let fixture = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/members_import.json");
        let records = import::parse_import(&std::fs::read_to_string(fixture).unwrap()).unwrap();
        let members = tokio_test::block_on(repository::fetch_members(store.as_ref()));

        let pending = match import::plan_import(&members, &records) {
            ImportDecision::NeedsConfirmation(pending) => pending,
            ImportDecision::Ready(_) => panic!("deletions should require confirmation"),
        };
        let affected: Vec<&str> = pending.affected().iter().map(|m| m.email.as_str()).collect();
        assert_eq!(affected, vec!["bob@example.com", "chloe@example.com"]);

        let plan = pending.confirm();
        let report = tokio_test::block_on(import::apply_import(
            store.as_ref(),
            plan,
            &ProgressBar::hidden(),
        ));
        assert_eq!(report.added, 1);
        assert_eq!(report.updated, 1);
        assert_eq!(report.deleted, 2);
        assert_eq!(report.errors, 1);

        let members = tokio_test::block_on(repository::fetch_members(store.as_ref()));
        let names: Vec<&str> = members.iter().map(|m| m.full_name.as_str()).collect();
        assert_eq!(names, vec!["Alice Anders", "Dana Diaz"]);
        assert_eq!(members[0].phone_number, "+1 555 0199");
    }

    #[test]
    fn test_firestore_requires_project() {
        let mut config = Config::default();
        config.store.backend = StoreBackend::Firestore;
        assert!(open_store(&config).is_err());
    }
}
