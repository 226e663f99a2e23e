//! Application state shared by every command.
//!
//! Owns the data directory, the settings file handle and the case desk.
//! Database connections are opened per command.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::auth;
use crate::case::CaseDesk;
use crate::config;
use crate::db;
use crate::settings::{SettingsError, SettingsStore};

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Not logged in")]
    NotLoggedIn,
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),
    #[error("Auth error: {0}")]
    Auth(#[from] auth::AuthError),
}

pub struct AppState {
    data_dir: PathBuf,
    settings: SettingsStore,
    desk: CaseDesk,
}

impl AppState {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            settings: SettingsStore::new(config::settings_path(&data_dir)),
            data_dir,
            desk: CaseDesk::default(),
        }
    }

    /// State rooted at the default data directory.
    pub fn from_env() -> Self {
        Self::new(config::app_data_dir())
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn desk(&self) -> &CaseDesk {
        &self.desk
    }

    /// Open the visit database, applying pending migrations.
    pub fn open_db(&self) -> Result<rusqlite::Connection, CoreError> {
        db::open_database(&config::database_path(&self.data_dir)).map_err(CoreError::Database)
    }

    /// The logged-in user, or `NotLoggedIn`.
    pub fn require_user(&self) -> Result<String, CoreError> {
        auth::current_user(&self.settings)?.ok_or(CoreError::NotLoggedIn)
    }
}
