//! Persisted user preferences.
//!
//! Front ends read their defaults (header retention, logging, part extension)
//! from [`Settings`] and turn them into a [`SplitRequest`](crate::SplitRequest);
//! the engine itself never consults this store.
//!
//! The file is pretty-printed JSON in the platform configuration directory:
//! - Linux: `$XDG_CONFIG_HOME/FileSplitterPro/config.json` or `~/.config/FileSplitterPro/config.json`
//! - macOS: `~/Library/Application Support/FileSplitterPro/config.json`
//! - Windows: `%APPDATA%\FileSplitterPro\config.json`
//!
//! When no location can be resolved, `config.json` in the working directory is used.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "FileSplitterPro";
const CONFIG_FILE: &str = "config.json";
const LEGACY_FILE: &str = "settings.json";

/// Keys accepted by [`Settings::get`] and [`Settings::set`].
pub const KEYS: [&str; 4] = [
    "open_dir_after_split",
    "enable_logging",
    "default_output_file_type",
    "retain_header",
];

/// User preferences. Missing keys in a stored file take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Open the output directory once a split finishes (honoured by GUI front ends).
    pub open_dir_after_split: bool,
    pub enable_logging: bool,
    /// Part extension offered by default, e.g. `.csv`, `.txt`, `.dat`, `.json`.
    pub default_output_file_type: String,
    pub retain_header: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            open_dir_after_split: false,
            enable_logging: true,
            default_output_file_type: ".csv".to_string(),
            retain_header: true,
        }
    }
}

/// Settings bound to the file they were loaded from.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    pub settings: Settings,
}

impl SettingsStore {
    /// Load from the platform location, migrating a legacy `settings.json` from
    /// the working directory on first use.
    #[must_use]
    pub fn load() -> Self {
        let path = default_config_path();
        if let Some(settings) = migrate_legacy(Path::new(LEGACY_FILE), &path) {
            return Self { path, settings };
        }
        Self::load_from(path)
    }

    /// Load from `path`; unreadable or corrupt files fall back to defaults.
    pub fn load_from(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = if path.exists() {
            match read_settings(&path) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %format!("{e:#}"), "could not load settings, using defaults");
                    Settings::default()
                }
            }
        } else {
            Settings::default()
        };
        Self { path, settings }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the current settings, creating the directory if needed.
    ///
    /// # Errors
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self) -> Result<()> {
        write_settings(&self.path, &self.settings)
    }

    /// Restore every key to its default (not saved until [`save`](Self::save)).
    pub fn reset(&mut self) {
        self.settings = Settings::default();
    }

    /// Current value of `key` as JSON.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        match serde_json::to_value(&self.settings) {
            Ok(Value::Object(map)) => map.get(key).cloned(),
            _ => None,
        }
    }

    /// Set `key` from its textual form (`true`/`false` for flags).
    ///
    /// # Errors
    /// Returns an error for unknown keys or values of the wrong type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parse_flag = |v: &str| -> Result<bool> {
            match v.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" | "on" => Ok(true),
                "false" | "no" | "0" | "off" => Ok(false),
                other => bail!("'{other}' is not a boolean"),
            }
        };
        match key {
            "open_dir_after_split" => self.settings.open_dir_after_split = parse_flag(value)?,
            "enable_logging" => self.settings.enable_logging = parse_flag(value)?,
            "retain_header" => self.settings.retain_header = parse_flag(value)?,
            "default_output_file_type" => {
                let ext = value.trim().to_lowercase();
                if ext.is_empty() {
                    bail!("file type must not be empty");
                }
                self.settings.default_output_file_type =
                    if ext.starts_with('.') { ext } else { format!(".{ext}") };
            }
            other => bail!("unknown setting '{other}' (expected one of {})", KEYS.join(", ")),
        }
        Ok(())
    }
}

fn read_settings(path: &Path) -> Result<Settings> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))
}

fn write_settings(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
    }
    let text = serde_json::to_string_pretty(settings).context("serialize settings")?;
    fs::write(path, text).with_context(|| format!("write {}", path.display()))
}

/// Copy a legacy settings file to `target` when `target` does not exist yet.
/// The legacy file is left in place.
fn migrate_legacy(legacy: &Path, target: &Path) -> Option<Settings> {
    if !legacy.exists() || target.exists() {
        return None;
    }
    match read_settings(legacy).and_then(|s| write_settings(target, &s).map(|()| s)) {
        Ok(settings) => {
            tracing::info!(from = %legacy.display(), to = %target.display(), "migrated settings");
            Some(settings)
        }
        Err(e) => {
            tracing::warn!(error = %format!("{e:#}"), "could not migrate legacy settings");
            None
        }
    }
}

/// Platform configuration file path, or `config.json` when none resolves.
#[must_use]
pub fn default_config_path() -> PathBuf {
    config_dir()
        .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
}

fn config_dir() -> Option<PathBuf> {
    let non_empty = |key: &str| std::env::var_os(key).filter(|v| !v.is_empty()).map(PathBuf::from);
    if cfg!(windows) {
        non_empty("APPDATA")
    } else if cfg!(target_os = "macos") {
        non_empty("HOME").map(|home| home.join("Library").join("Application Support"))
    } else {
        non_empty("XDG_CONFIG_HOME").or_else(|| non_empty("HOME").map(|home| home.join(".config")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_settings_are_migrated_once() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let legacy = dir.path().join(LEGACY_FILE);
        let target = dir.path().join(APP_DIR).join(CONFIG_FILE);
        fs::write(&legacy, r#"{"retain_header": false}"#)?;

        let migrated = migrate_legacy(&legacy, &target).expect("migrated");
        assert!(!migrated.retain_header);
        assert!(target.exists());
        assert!(legacy.exists());

        // Target now exists, so a second call leaves it alone.
        fs::write(&legacy, r#"{"retain_header": true}"#)?;
        assert!(migrate_legacy(&legacy, &target).is_none());
        assert!(!SettingsStore::load_from(&target).settings.retain_header);
        Ok(())
    }

    #[test]
    fn get_reports_json_values() {
        let store = SettingsStore::load_from("unused.json");
        assert_eq!(store.get("default_output_file_type"), Some(Value::from(".csv")));
        assert_eq!(store.get("enable_logging"), Some(Value::Bool(true)));
    }
}
