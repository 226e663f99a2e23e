use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Epicrisis";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable that relocates the data directory.
pub const HOME_ENV_VAR: &str = "EPICRISIS_HOME";

/// Environment variable holding the password for `login`, `add-user` and
/// the current password for `passwd`. Read from stdin when unset.
pub const PASSWORD_ENV_VAR: &str = "EPICRISIS_PASSWORD";

/// Environment variable holding the new password for `passwd`.
pub const NEW_PASSWORD_ENV_VAR: &str = "EPICRISIS_NEW_PASSWORD";

/// Default autosave interval for the visit form, in seconds.
pub const DEFAULT_AUTOSAVE_INTERVAL_SECS: u64 = 60;

/// Default window of the visit search, in days back from today.
pub const DEFAULT_SEARCH_WINDOW_DAYS: i64 = 30;

/// Maximum names returned by patient-name autocomplete.
pub const AUTOCOMPLETE_LIMIT: u32 = 50;

/// Get the application data directory.
/// `$EPICRISIS_HOME` when set, else `~/Epicrisis/`, else `./Epicrisis`.
pub fn app_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(HOME_ENV_VAR).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// SQLite database inside a data directory.
pub fn database_path(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join("visits.db")
}

/// Settings file inside a data directory.
pub fn settings_path(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join("settings.json")
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "epicrisis=info,epicrisis_lib=info,warn"
}
