//! Command handlers behind the CLI.
//!
//! Handlers take the shared [`AppState`](crate::app_state::AppState) and
//! return `Result<T, String>` with a user-facing message on failure.

pub mod account;
pub mod preferences;
pub mod visits;

/// Health check: verifies the data directory is usable.
pub fn health_check(state: &crate::app_state::AppState) -> Result<String, String> {
    tracing::debug!("Health check called");
    let conn = state.open_db().map_err(|e| e.to_string())?;
    let tables = crate::db::count_tables(&conn).map_err(|e| e.to_string())?;
    Ok(format!("ok ({tables} tables in {})", state.data_dir().display()))
}
