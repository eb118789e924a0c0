//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.teamboard.toml` files.

use crate::store::firestore::FirestoreSettings;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the current directory.
pub const CONFIG_FILE: &str = ".teamboard.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Storage settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Firestore connection settings.
    #[serde(default)]
    pub firestore: FirestoreConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory that exports are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Persisted preferences (dark mode, language, notifications).
    #[serde(default = "default_preferences_file")]
    pub preferences_file: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            verbose: false,
            preferences_file: default_preferences_file(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("exports")
}

fn default_preferences_file() -> PathBuf {
    PathBuf::from(".teamboard-preferences.json")
}

/// Where the team data is stored.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Local JSON file
    #[default]
    File,
    /// Cloud Firestore
    Firestore,
}

/// Storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend to use.
    #[serde(default)]
    pub backend: StoreBackend,

    /// Data file of the file backend.
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,

    /// Orderings the file backend can serve directly, as `collection.field`.
    /// Other orderings are sorted locally.
    #[serde(default = "default_indexes")]
    pub indexes: Vec<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::File,
            data_file: default_data_file(),
            indexes: default_indexes(),
        }
    }
}

fn default_data_file() -> PathBuf {
    PathBuf::from("teamboard.json")
}

fn default_indexes() -> Vec<String> {
    vec!["members.fullName", "tasks.createdAt", "meetings.date"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl StoreConfig {
    /// Index entries split into `(collection, field)`. Malformed entries are skipped.
    pub fn index_pairs(&self) -> Vec<(String, String)> {
        self.indexes
            .iter()
            .filter_map(|entry| entry.split_once('.'))
            .filter(|(c, f)| !c.is_empty() && !f.is_empty())
            .map(|(c, f)| (c.to_string(), f.to_string()))
            .collect()
    }
}

/// Firestore connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirestoreConfig {
    /// Google Cloud project id.
    #[serde(default)]
    pub project_id: String,

    /// Database id.
    #[serde(default = "default_database")]
    pub database: String,

    /// Web API key. Prefer the FIRESTORE_API_KEY env var.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Bearer token. Prefer the FIRESTORE_TOKEN env var.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// API root override, e.g. a local emulator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            database: default_database(),
            api_key: None,
            auth_token: None,
            timeout_seconds: default_timeout(),
            base_url: None,
        }
    }
}

fn default_database() -> String {
    "(default)".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl FirestoreConfig {
    pub fn settings(&self) -> FirestoreSettings {
        FirestoreSettings {
            project_id: self.project_id.clone(),
            database: self.database.clone(),
            api_key: self.api_key.clone(),
            auth_token: self.auth_token.clone(),
            timeout_seconds: self.timeout_seconds,
            base_url: self.base_url.clone(),
        }
    }
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Default analytics report file.
    #[serde(default = "default_report_output")]
    pub output: PathBuf,

    /// Write JSON instead of Markdown by default.
    #[serde(default)]
    pub json: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output: default_report_output(),
            json: false,
        }
    }
}

fn default_report_output() -> PathBuf {
    PathBuf::from("teamboard_dashboard.md")
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments (and their env vars) take precedence over config file
    /// settings, but only when they were actually given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(backend) = args.store {
            self.store.backend = backend;
        }
        if let Some(ref data_file) = args.data_file {
            self.store.data_file = data_file.clone();
        }

        if let Some(ref project_id) = args.project_id {
            self.firestore.project_id = project_id.clone();
        }
        if args.api_key.is_some() {
            self.firestore.api_key = args.api_key.clone();
        }
        if args.token.is_some() {
            self.firestore.auth_token = args.token.clone();
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
