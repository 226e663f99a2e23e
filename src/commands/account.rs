//! Account commands: login, logout, user management.

use crate::app_state::AppState;
use crate::auth;

/// Log in and return the username recorded as current.
pub fn login(state: &AppState, username: &str, password: &str) -> Result<String, String> {
    auth::login(state.settings(), username, password).map_err(|e| e.to_string())?;
    Ok(username.trim().to_string())
}

pub fn logout(state: &AppState) -> Result<(), String> {
    auth::logout(state.settings()).map_err(|e| e.to_string())
}

pub fn whoami(state: &AppState) -> Result<Option<String>, String> {
    auth::current_user(state.settings()).map_err(|e| e.to_string())
}

/// Create a user or reset a user's password. Requires a logged-in user.
pub fn add_user(state: &AppState, username: &str, password: &str) -> Result<(), String> {
    state.require_user().map_err(|e| e.to_string())?;
    auth::add_user(state.settings(), username, password).map_err(|e| e.to_string())
}

/// Change the current user's password.
pub fn change_password(
    state: &AppState,
    old_password: &str,
    new_password: &str,
) -> Result<(), String> {
    let user = state.require_user().map_err(|e| e.to_string())?;
    auth::change_password(state.settings(), &user, old_password, new_password)
        .map_err(|e| e.to_string())
}
