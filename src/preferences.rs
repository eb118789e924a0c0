//! User preferences.
//!
//! Preferences (dark mode, language, notifications) are persisted as a small
//! JSON key-value file, loaded once at startup and passed explicitly to
//! whatever needs them.

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Supported interface languages: code and display name.
pub const LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("ar", "العربية"),
    ("fr", "Français"),
    ("es", "Español"),
];

/// A preference that can be changed from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SettingKey {
    DarkMode,
    Language,
    Notifications,
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingKey::DarkMode => write!(f, "darkMode"),
            SettingKey::Language => write!(f, "language"),
            SettingKey::Notifications => write!(f, "notifications"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Stored {
    #[serde(default)]
    dark_mode: bool,
    #[serde(default = "default_language")]
    language: String,
    #[serde(default = "default_true")]
    notifications: bool,
}

impl Default for Stored {
    fn default() -> Self {
        Self {
            dark_mode: false,
            language: default_language(),
            notifications: true,
        }
    }
}

fn default_language() -> String {
    "en".to_string()
}

fn default_true() -> bool {
    true
}

/// Visual theme handed to the output code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    fn bar_template(&self) -> &'static str {
        match self {
            Theme::Light => "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            Theme::Dark => "{spinner:.white} [{bar:40.white/black}] {pos}/{len} {msg}",
        }
    }

    /// Progress bar styled for this theme.
    pub fn progress_bar(&self, len: u64) -> ProgressBar {
        let pb = ProgressBar::new(len);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(self.bar_template())
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    }
}

/// Persisted user preferences.
#[derive(Debug, Clone)]
pub struct Preferences {
    path: Option<PathBuf>,
    values: Stored,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            path: None,
            values: Stored::default(),
        }
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        other => bail!("Expected true or false, got '{}'", other),
    }
}

impl Preferences {
    /// Load preferences from `path`. A missing or unreadable file yields the
    /// defaults (light mode, English, notifications on).
    pub fn load(path: &Path) -> Self {
        let values = match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Ignoring malformed preferences file {}: {}", path.display(), e);
                Stored::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Stored::default(),
            Err(e) => {
                warn!("Could not read preferences file {}: {}", path.display(), e);
                Stored::default()
            }
        };

        Self {
            path: Some(path.to_path_buf()),
            values,
        }
    }

    /// Write preferences back to the file they were loaded from.
    pub fn save(&self) -> Result<()> {
        let Some(ref path) = self.path else {
            return Ok(());
        };
        let content = serde_json::to_string_pretty(&self.values)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write preferences to {}", path.display()))?;
        debug!("Saved preferences to {}", path.display());
        Ok(())
    }

    /// Apply the visual preferences once and return the resulting theme.
    pub fn apply(&self) -> Theme {
        let theme = if self.values.dark_mode {
            Theme::Dark
        } else {
            Theme::Light
        };
        debug!("Applied {:?} theme", theme);
        theme
    }

    pub fn dark_mode(&self) -> bool {
        self.values.dark_mode
    }

    pub fn language(&self) -> &str {
        &self.values.language
    }

    /// Display name of the current language.
    pub fn language_name(&self) -> &str {
        LANGUAGES
            .iter()
            .find(|(code, _)| *code == self.values.language)
            .map(|(_, name)| *name)
            .unwrap_or(self.values.language.as_str())
    }

    pub fn notifications(&self) -> bool {
        self.values.notifications
    }

    pub fn set_dark_mode(&mut self, on: bool) {
        self.values.dark_mode = on;
    }

    pub fn set_language(&mut self, code: &str) -> Result<()> {
        if !LANGUAGES.iter().any(|(c, _)| *c == code) {
            let codes: Vec<&str> = LANGUAGES.iter().map(|(c, _)| *c).collect();
            bail!("Unsupported language '{}' (choose one of: {})", code, codes.join(", "));
        }
        self.values.language = code.to_string();
        Ok(())
    }

    pub fn set_notifications(&mut self, on: bool) {
        self.values.notifications = on;
    }

    /// Set a preference from its command-line text value.
    pub fn set(&mut self, key: SettingKey, value: &str) -> Result<()> {
        match key {
            SettingKey::DarkMode => self.set_dark_mode(parse_bool(value)?),
            SettingKey::Language => self.set_language(value.trim())?,
            SettingKey::Notifications => self.set_notifications(parse_bool(value)?),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_when_missing() {
        let dir = TempDir::new().unwrap();
        let prefs = Preferences::load(&dir.path().join("prefs.json"));
        assert!(!prefs.dark_mode());
        assert_eq!(prefs.language(), "en");
        assert!(prefs.notifications());
        assert_eq!(prefs.apply(), Theme::Light);
    }

    #[test]
    fn test_set_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.json");

        let mut prefs = Preferences::load(&path);
        prefs.set(SettingKey::DarkMode, "on").unwrap();
        prefs.set(SettingKey::Language, "fr").unwrap();
        prefs.set(SettingKey::Notifications, "false").unwrap();
        prefs.save().unwrap();

        let stored = std::fs::read_to_string(&path).unwrap();
        assert!(stored.contains("\"darkMode\": true"));

        let reloaded = Preferences::load(&path);
        assert!(reloaded.dark_mode());
        assert_eq!(reloaded.language_name(), "Français");
        assert!(!reloaded.notifications());
        assert_eq!(reloaded.apply(), Theme::Dark);
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut prefs = Preferences::default();
        assert!(prefs.set(SettingKey::Language, "xx").is_err());
        assert!(prefs.set(SettingKey::DarkMode, "maybe").is_err());
        assert_eq!(prefs.language(), "en");
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(Preferences::load(&path).notifications());
    }
}
