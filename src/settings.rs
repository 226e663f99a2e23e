//! Application settings: a JSON document next to the visit database.
//!
//! Holds UI preferences, the organisation and medic pick lists, the
//! user table (username → password hash) and the name of the user who
//! last logged in. Keys unknown to this version are preserved on save.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::password;
use crate::config;

/// Username seeded into a fresh settings file.
pub const DEFAULT_ADMIN_USER: &str = "admin";
const DEFAULT_ADMIN_PASSWORD: &str = "admin";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

impl std::str::FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(format!("Unknown theme: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub autosave_on: bool,
    pub autosave_interval: u64,
    pub current_user: Option<String>,
    pub organisations: Vec<String>,
    pub medics: Vec<String>,
    pub users: BTreeMap<String, String>,
    /// Kept as text so an unrecognised value never invalidates the file.
    pub theme: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            autosave_on: true,
            autosave_interval: config::DEFAULT_AUTOSAVE_INTERVAL_SECS,
            current_user: None,
            organisations: Vec::new(),
            medics: Vec::new(),
            users: BTreeMap::new(),
            theme: Theme::Light.as_str().to_string(),
            extra: serde_json::Map::new(),
        }
    }
}

impl AppSettings {
    /// Defaults plus the initial administrator account.
    pub fn seeded() -> Self {
        let mut settings = Self::default();
        settings.users.insert(
            DEFAULT_ADMIN_USER.to_string(),
            password::hash_password(DEFAULT_ADMIN_PASSWORD),
        );
        settings
    }

    pub fn theme(&self) -> Theme {
        self.theme.parse().unwrap_or_default()
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme.as_str().to_string();
    }

    /// Add an organisation to the pick list; duplicates and blanks ignored.
    pub fn add_organisation(&mut self, name: &str) -> bool {
        push_unique(&mut self.organisations, name)
    }

    /// Add a medic to the pick list; duplicates and blanks ignored.
    pub fn add_medic(&mut self, name: &str) -> bool {
        push_unique(&mut self.medics, name)
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() || list.iter().any(|v| v == value) {
        return false;
    }
    list.push(value.to_string());
    true
}

/// Settings file handle.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings, creating a seeded file when missing.
    ///
    /// An unreadable file is moved aside to `<name>.bak` and replaced
    /// with seeded defaults, so the application stays usable.
    pub fn load(&self) -> Result<AppSettings, SettingsError> {
        if !self.path.exists() {
            tracing::info!(path = %self.path.display(), "Creating settings file");
            let settings = AppSettings::seeded();
            self.save(&settings)?;
            return Ok(settings);
        }

        let raw = std::fs::read_to_string(&self.path)?;
        match serde_json::from_str::<AppSettings>(&raw) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                let backup = self.path.with_extension("json.bak");
                tracing::warn!(
                    error = %e,
                    backup = %backup.display(),
                    "Settings file unreadable, resetting to defaults"
                );
                std::fs::rename(&self.path, &backup)?;
                let settings = AppSettings::seeded();
                self.save(&settings)?;
                Ok(settings)
            }
        }
    }

    /// Write settings atomically (temp file in the same directory, then rename).
    pub fn save(&self, settings: &AppSettings) -> Result<(), SettingsError> {
        let dir = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(dir) => dir.to_path_buf(),
            None => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let json = serde_json::to_string_pretty(settings)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Load, modify, save. Returns whatever the closure returns.
    pub fn update<R>(&self, f: impl FnOnce(&mut AppSettings) -> R) -> Result<R, SettingsError> {
        let mut settings = self.load()?;
        let result = f(&mut settings);
        self.save(&settings)?;
        Ok(result)
    }
}
