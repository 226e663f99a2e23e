//! Settings commands: pick lists, theme and autosave.

use serde::Serialize;

use crate::app_state::AppState;
use crate::settings::{AppSettings, Theme};

/// Settings as shown to the user; password hashes are left out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingsView {
    pub autosave_on: bool,
    pub autosave_interval: u64,
    pub current_user: Option<String>,
    pub theme: String,
    pub organisations: Vec<String>,
    pub medics: Vec<String>,
    pub users: Vec<String>,
}

impl From<&AppSettings> for SettingsView {
    fn from(s: &AppSettings) -> Self {
        Self {
            autosave_on: s.autosave_on,
            autosave_interval: s.autosave_interval,
            current_user: s.current_user.clone(),
            theme: s.theme().as_str().to_string(),
            organisations: s.organisations.clone(),
            medics: s.medics.clone(),
            users: s.users.keys().cloned().collect(),
        }
    }
}

pub fn get_settings(state: &AppState) -> Result<SettingsView, String> {
    let settings = state.settings().load().map_err(|e| e.to_string())?;
    Ok(SettingsView::from(&settings))
}

/// Returns whether the organisation was new.
pub fn add_organisation(state: &AppState, name: &str) -> Result<bool, String> {
    state
        .settings()
        .update(|s| s.add_organisation(name))
        .map_err(|e| e.to_string())
}

/// Returns whether the medic was new.
pub fn add_medic(state: &AppState, name: &str) -> Result<bool, String> {
    state
        .settings()
        .update(|s| s.add_medic(name))
        .map_err(|e| e.to_string())
}

pub fn set_theme(state: &AppState, theme: &str) -> Result<(), String> {
    let theme: Theme = theme.parse()?;
    state
        .settings()
        .update(|s| s.set_theme(theme))
        .map_err(|e| e.to_string())
}

pub fn set_autosave(state: &AppState, enabled: bool, interval_secs: Option<u64>) -> Result<(), String> {
    if interval_secs == Some(0) {
        return Err("Autosave interval must be positive".into());
    }
    state
        .settings()
        .update(|s| {
            s.autosave_on = enabled;
            if let Some(secs) = interval_secs {
                s.autosave_interval = secs;
            }
        })
        .map_err(|e| e.to_string())
}
