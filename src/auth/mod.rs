//! Local user accounts stored in the settings file.
//!
//! Passwords are kept as salted PBKDF2 hashes (see [`password`]).
//! Successful login records the user as the current examiner.

pub mod password;

use thiserror::Error;

use crate::settings::{AppSettings, SettingsError, SettingsStore};
use password::StoredHash;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Username and password are required")]
    MissingCredentials,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),
}

/// Check a username/password pair against loaded settings.
pub fn verify_user(settings: &AppSettings, username: &str, password: &str) -> bool {
    settings
        .users
        .get(username)
        .and_then(|stored| StoredHash::parse(stored))
        .is_some_and(|hash| hash.verify(password))
}

/// Create a user or replace an existing user's password.
pub fn add_user(store: &SettingsStore, username: &str, password: &str) -> Result<(), AuthError> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(AuthError::MissingCredentials);
    }
    let hash = password::hash_password(password);
    store.update(|s| s.users.insert(username.to_string(), hash))?;
    tracing::info!(user = username, "User saved");
    Ok(())
}

/// Replace a password after verifying the current one.
pub fn change_password(
    store: &SettingsStore,
    username: &str,
    old_password: &str,
    new_password: &str,
) -> Result<(), AuthError> {
    if new_password.is_empty() {
        return Err(AuthError::MissingCredentials);
    }
    let mut settings = store.load()?;
    if !verify_user(&settings, username, old_password) {
        return Err(AuthError::InvalidCredentials);
    }
    settings
        .users
        .insert(username.to_string(), password::hash_password(new_password));
    store.save(&settings)?;
    tracing::info!(user = username, "Password changed");
    Ok(())
}

/// Verify credentials and record the user as current.
///
/// A password stored in the legacy unsalted format is re-hashed on
/// successful login.
pub fn login(store: &SettingsStore, username: &str, password: &str) -> Result<(), AuthError> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(AuthError::MissingCredentials);
    }

    let mut settings = store.load()?;
    let stored = settings
        .users
        .get(username)
        .and_then(|s| StoredHash::parse(s));
    let Some(stored) = stored.filter(|h| h.verify(password)) else {
        tracing::warn!(user = username, "Login rejected");
        return Err(AuthError::InvalidCredentials);
    };

    if stored.is_legacy() {
        tracing::info!(user = username, "Upgrading legacy password hash");
        settings
            .users
            .insert(username.to_string(), password::hash_password(password));
    }
    settings.current_user = Some(username.to_string());
    store.save(&settings)?;
    tracing::info!(user = username, "Logged in");
    Ok(())
}

pub fn logout(store: &SettingsStore) -> Result<(), AuthError> {
    store.update(|s| s.current_user = None)?;
    Ok(())
}

pub fn set_current_user(store: &SettingsStore, username: &str) -> Result<(), AuthError> {
    store.update(|s| s.current_user = Some(username.to_string()))?;
    Ok(())
}

pub fn current_user(store: &SettingsStore) -> Result<Option<String>, AuthError> {
    Ok(store.load()?.current_user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::DEFAULT_ADMIN_USER;

    fn store() -> (tempfile::TempDir, SettingsStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"));
        (dir, store)
    }

    #[test]
    fn seeded_admin_can_log_in() {
        let (_dir, store) = store();
        login(&store, DEFAULT_ADMIN_USER, "admin").unwrap();
        assert_eq!(current_user(&store).unwrap().as_deref(), Some(DEFAULT_ADMIN_USER));
    }

    #[test]
    fn wrong_password_is_rejected_and_user_not_recorded() {
        let (_dir, store) = store();
        let result = login(&store, DEFAULT_ADMIN_USER, "nope");
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
        assert_eq!(current_user(&store).unwrap(), None);
    }

    #[test]
    fn unknown_user_is_rejected() {
        let (_dir, store) = store();
        let result = login(&store, "ghost", "admin");
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[test]
    fn blank_credentials_are_rejected() {
        let (_dir, store) = store();
        assert!(matches!(login(&store, "  ", "x"), Err(AuthError::MissingCredentials)));
        assert!(matches!(login(&store, "admin", ""), Err(AuthError::MissingCredentials)));
        assert!(matches!(add_user(&store, "", "x"), Err(AuthError::MissingCredentials)));
    }

    #[test]
    fn added_user_can_log_in() {
        let (_dir, store) = store();
        add_user(&store, "doctor", "pa55").unwrap();
        let settings = store.load().unwrap();
        assert!(verify_user(&settings, "doctor", "pa55"));
        assert!(!verify_user(&settings, "doctor", "pa56"));
        login(&store, "doctor", "pa55").unwrap();
    }

    #[test]
    fn change_password_requires_old_password() {
        let (_dir, store) = store();
        add_user(&store, "doctor", "old").unwrap();

        let wrong = change_password(&store, "doctor", "bad", "new");
        assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));

        change_password(&store, "doctor", "old", "new").unwrap();
        let settings = store.load().unwrap();
        assert!(verify_user(&settings, "doctor", "new"));
        assert!(!verify_user(&settings, "doctor", "old"));
    }

    #[test]
    fn legacy_hash_is_upgraded_on_login() {
        let (_dir, store) = store();
        store
            .update(|s| {
                s.users.insert(
                    "legacy".into(),
                    "8c6976e5b5410415bde908bd4dee15dfb167a9c873fc4bb8a81f6f2ab448a918".into(),
                )
            })
            .unwrap();

        login(&store, "legacy", "admin").unwrap();
        let settings = store.load().unwrap();
        let stored = &settings.users["legacy"];
        assert!(stored.starts_with("pbkdf2-sha256$"));
        assert!(verify_user(&settings, "legacy", "admin"));
    }

    #[test]
    fn logout_clears_current_user() {
        let (_dir, store) = store();
        set_current_user(&store, "someone").unwrap();
        logout(&store).unwrap();
        assert_eq!(current_user(&store).unwrap(), None);
    }
}
