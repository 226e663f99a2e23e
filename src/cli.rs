use std::io::BufRead;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::app_state::AppState;
use crate::commands::{self, account, preferences, visits};
use crate::config;
use crate::epicrisis::{FieldMap, FieldValue};
use crate::history::VisitQuery;

#[derive(Parser)]
#[command(name = "epicrisis")]
#[command(about = "Visit journal and epicrisis composer", version)]
pub struct Cli {
    /// Data directory (defaults to $EPICRISIS_HOME or ~/Epicrisis)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check that the data directory is usable
    Health,
    /// Log in as a user (password from $EPICRISIS_PASSWORD or stdin)
    Login { username: String },
    /// Log out
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Create a user or reset a password (password from $EPICRISIS_PASSWORD or stdin)
    AddUser { username: String },
    /// Change the current user's password
    ///
    /// Reads the current and the new password from $EPICRISIS_PASSWORD and
    /// $EPICRISIS_NEW_PASSWORD, or one per line from stdin.
    Passwd,
    /// Print the epicrisis of form values without saving
    Preview {
        #[command(flatten)]
        form: FormInput,
    },
    /// Save form values as a visit and print its epicrisis
    Close {
        #[command(flatten)]
        form: FormInput,
    },
    /// Print the epicrisis of a stored visit
    Show { visit_id: i64 },
    /// Print the form values of a stored visit as JSON
    Reopen { visit_id: i64 },
    /// List today's visits
    Today,
    /// Search visit history
    Search {
        #[command(flatten)]
        query: QueryArgs,
    },
    /// Export visit history to CSV or JSON
    ExportHistory {
        path: PathBuf,
        #[command(flatten)]
        query: QueryArgs,
    },
    /// Export the period report to CSV or JSON
    ExportReport {
        path: PathBuf,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },
    /// Patient names containing a fragment
    Patients { fragment: String },
    /// Show or change settings
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },
}

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Add an organisation to the pick list
    AddOrganisation { name: String },
    /// Add a medic to the pick list
    AddMedic { name: String },
    /// Set the theme (light or dark)
    Theme { name: String },
    /// Turn autosave on or off
    Autosave {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
        /// Interval in seconds
        #[arg(long)]
        interval: Option<u64>,
    },
}

#[derive(clap::Args)]
pub struct FormInput {
    /// JSON object of field values; `-` reads stdin
    #[arg(long)]
    pub fields: Option<PathBuf>,
    /// Single field value as id=value (repeatable)
    #[arg(long = "set", value_name = "ID=VALUE")]
    pub set: Vec<String>,
}

#[derive(clap::Args)]
pub struct QueryArgs {
    #[arg(long)]
    pub from: Option<NaiveDate>,
    #[arg(long)]
    pub to: Option<NaiveDate>,
    /// Text to look for in names, fields and epicrisis
    #[arg(long)]
    pub text: Option<String>,
}

impl From<QueryArgs> for VisitQuery {
    fn from(args: QueryArgs) -> Self {
        Self {
            from: args.from,
            to: args.to,
            text: args.text,
        }
    }
}

impl FormInput {
    fn values(&self, input: &mut dyn BufRead) -> Result<FieldMap, String> {
        let mut values = match &self.fields {
            Some(path) => read_fields(path, input)?,
            None => FieldMap::new(),
        };
        for pair in &self.set {
            let (id, value) = pair
                .split_once('=')
                .ok_or_else(|| format!("Expected ID=VALUE, got {pair}"))?;
            values.insert(id.trim(), FieldValue::text(value));
        }
        Ok(values)
    }
}

fn read_fields(path: &Path, input: &mut dyn BufRead) -> Result<FieldMap, String> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        input
            .read_to_string(&mut buf)
            .map_err(|e| e.to_string())?;
        buf
    } else {
        std::fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?
    };
    serde_json::from_str(&raw).map_err(|e| format!("Invalid field document: {e}"))
}

/// A secret from `env_var` when set, else the next line of `input`.
fn read_secret(env_var: &str, input: &mut dyn BufRead) -> Result<String, String> {
    secret_from(std::env::var(env_var).ok(), env_var, input)
}

fn secret_from(
    env_value: Option<String>,
    env_var: &str,
    input: &mut dyn BufRead,
) -> Result<String, String> {
    if let Some(value) = env_value.filter(|v| !v.is_empty()) {
        return Ok(value);
    }
    let mut line = String::new();
    input.read_line(&mut line).map_err(|e| e.to_string())?;
    let secret = line.trim_end_matches(['\r', '\n']);
    if secret.is_empty() {
        return Err(format!("Password required: set {env_var} or pass it on stdin"));
    }
    Ok(secret.to_string())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| e.to_string())
}

/// Run one parsed command, returning the text to print.
pub fn execute(cli: Cli) -> Result<String, String> {
    execute_with(cli, &mut std::io::stdin().lock())
}

/// [`execute`] reading passwords and `--fields -` from `input`.
pub fn execute_with(cli: Cli, input: &mut dyn BufRead) -> Result<String, String> {
    let state = match cli.data_dir {
        Some(dir) => AppState::new(dir),
        None => AppState::from_env(),
    };

    let Some(command) = cli.command else {
        return Ok("Use 'epicrisis --help' for commands".into());
    };

    match command {
        Commands::Health => commands::health_check(&state),
        Commands::Login { username } => {
            let password = read_secret(config::PASSWORD_ENV_VAR, input)?;
            let user = account::login(&state, &username, &password)?;
            Ok(format!("Logged in as {user}"))
        }
        Commands::Logout => {
            account::logout(&state)?;
            Ok("Logged out".into())
        }
        Commands::Whoami => Ok(account::whoami(&state)?.unwrap_or_else(|| "Not logged in".into())),
        Commands::AddUser { username } => {
            let password = read_secret(config::PASSWORD_ENV_VAR, input)?;
            account::add_user(&state, &username, &password)?;
            Ok(format!("User {} saved", username.trim()))
        }
        Commands::Passwd => {
            let old = read_secret(config::PASSWORD_ENV_VAR, input)?;
            let new = read_secret(config::NEW_PASSWORD_ENV_VAR, input)?;
            account::change_password(&state, &old, &new)?;
            Ok("Password changed".into())
        }
        Commands::Preview { form } => visits::preview_epicrisis(&state, &form.values(input)?),
        Commands::Close { form } => {
            let closed = visits::close_case(&state, &form.values(input)?)?;
            Ok(format!("Visit {} saved\n\n{}", closed.visit_id, closed.text))
        }
        Commands::Show { visit_id } => visits::get_epicrisis(&state, visit_id),
        Commands::Reopen { visit_id } => {
            let (_, values) = visits::reopen_visit(&state, visit_id)?;
            to_json(&values)
        }
        Commands::Today => {
            let rows = visits::todays_visits(&state)?;
            Ok(rows
                .iter()
                .map(|v| {
                    format!(
                        "{}\t{}\t{}\t{}",
                        v.id,
                        v.visit_datetime.format("%H:%M"),
                        v.patient_fio.as_deref().unwrap_or_default(),
                        v.mkb_code.as_deref().unwrap_or_default()
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"))
        }
        Commands::Search { query } => {
            let rows = visits::search_visits(&state, &query.into())?;
            Ok(rows
                .iter()
                .map(|v| {
                    format!(
                        "{}\t{}\t{}\t{}",
                        v.id,
                        v.visit_datetime.format("%Y-%m-%d %H:%M"),
                        v.patient_fio.as_deref().unwrap_or_default(),
                        v.mkb_code
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"))
        }
        Commands::ExportHistory { path, query } => {
            let written = visits::export_history(&state, &query.into(), &path)?;
            Ok(format!("Exported to {}", written.display()))
        }
        Commands::ExportReport { path, from, to } => {
            let written = visits::export_report(&state, from, to, &path)?;
            Ok(format!("Exported to {}", written.display()))
        }
        Commands::Patients { fragment } => {
            Ok(visits::autocomplete_patients(&state, &fragment)?.join("\n"))
        }
        Commands::Settings { action } => match action {
            None => to_json(&preferences::get_settings(&state)?),
            Some(SettingsAction::AddOrganisation { name }) => {
                let added = preferences::add_organisation(&state, &name)?;
                Ok(if added { "Added" } else { "Already listed" }.into())
            }
            Some(SettingsAction::AddMedic { name }) => {
                let added = preferences::add_medic(&state, &name)?;
                Ok(if added { "Added" } else { "Already listed" }.into())
            }
            Some(SettingsAction::Theme { name }) => {
                preferences::set_theme(&state, &name)?;
                Ok("Theme saved".into())
            }
            Some(SettingsAction::Autosave { enabled, interval }) => {
                preferences::set_autosave(&state, enabled, interval)?;
                Ok("Autosave saved".into())
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    fn run_with_input(dir: &Path, args: &[&str], input: &str) -> Result<String, String> {
        let mut argv = vec!["epicrisis", "--data-dir", dir.to_str().unwrap()];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).map_err(|e| e.to_string())?;
        execute_with(cli, &mut Cursor::new(input.as_bytes()))
    }

    fn run(dir: &Path, args: &[&str]) -> Result<String, String> {
        run_with_input(dir, args, "")
    }

    #[test]
    fn close_and_show_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        run_with_input(dir.path(), &["login", "admin"], "admin\n").unwrap();

        let fields = dir.path().join("form.json");
        std::fs::write(&fields, r#"{"patientfio": "Иванов", "rash": true}"#).unwrap();
        let out = run(
            dir.path(),
            &["close", "--fields", fields.to_str().unwrap(), "--set", "feverTemp=38.5"],
        )
        .unwrap();
        assert!(out.starts_with("Visit 1 saved"));

        let shown = run(dir.path(), &["show", "1"]).unwrap();
        assert!(shown.contains("Сыпь"));
        assert!(shown.contains("Температура: 38.5"));
    }

    #[test]
    fn passwords_are_not_accepted_as_arguments() {
        assert!(Cli::try_parse_from(["epicrisis", "login", "admin", "--password", "admin"]).is_err());
        assert!(Cli::try_parse_from(["epicrisis", "passwd", "--old", "a", "--new", "b"]).is_err());
    }

    #[test]
    fn secret_comes_from_env_value_before_input() {
        let mut input = Cursor::new(b"from-stdin\n".as_slice());
        let secret = secret_from(Some("from-env".into()), "X", &mut input).unwrap();
        assert_eq!(secret, "from-env");

        let secret = secret_from(Some(String::new()), "X", &mut input).unwrap();
        assert_eq!(secret, "from-stdin");
    }

    #[test]
    fn missing_secret_names_the_variable() {
        let mut input = Cursor::new(b"".as_slice());
        let err = secret_from(None, "EPICRISIS_PASSWORD", &mut input).unwrap_err();
        assert!(err.contains("EPICRISIS_PASSWORD"));

        let mut input = Cursor::new(b"\r\n".as_slice());
        assert!(secret_from(None, "X", &mut input).is_err());
    }

    #[test]
    fn login_with_wrong_password_from_stdin_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run_with_input(dir.path(), &["login", "admin"], "wrong\n").is_err());
        assert!(run(dir.path(), &["login", "admin"]).is_err());
        assert_eq!(run(dir.path(), &["whoami"]).unwrap(), "Not logged in");
    }

    #[test]
    fn add_user_and_passwd_read_passwords_from_stdin() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run_with_input(dir.path(), &["add-user", "doctor"], "first\n").is_err());
        run_with_input(dir.path(), &["login", "admin"], "admin\n").unwrap();
        run_with_input(dir.path(), &["add-user", "doctor"], "first\n").unwrap();
        run_with_input(dir.path(), &["login", "doctor"], "first\n").unwrap();

        let out = run_with_input(dir.path(), &["passwd"], "first\nsecond\n").unwrap();
        assert_eq!(out, "Password changed");

        run(dir.path(), &["logout"]).unwrap();
        assert!(run_with_input(dir.path(), &["login", "doctor"], "first\n").is_err());
        let out = run_with_input(dir.path(), &["login", "doctor"], "second\n").unwrap();
        assert_eq!(out, "Logged in as doctor");
    }

    #[test]
    fn fields_dash_reads_input() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_with_input(
            dir.path(),
            &["preview", "--fields", "-"],
            r#"{"patientfio": "Петров"}"#,
        )
        .unwrap();
        assert!(out.starts_with("Пациент: Петров"));
    }

    #[test]
    fn malformed_set_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(dir.path(), &["preview", "--set", "novalue"]).unwrap_err();
        assert!(err.contains("ID=VALUE"));
    }

    #[test]
    fn dates_are_parsed_by_clap() {
        let err = Cli::try_parse_from(["epicrisis", "search", "--from", "01.02.2024"]);
        assert!(err.is_err());
        assert!(Cli::try_parse_from(["epicrisis", "search", "--from", "2024-02-01"]).is_ok());
    }

    #[test]
    fn settings_subcommands_update_file() {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path(), &["settings", "add-organisation", "ООО Ромашка"]).unwrap();
        run(dir.path(), &["settings", "autosave", "false", "--interval", "30"]).unwrap();
        let shown = run(dir.path(), &["settings"]).unwrap();
        assert!(shown.contains("ООО Ромашка"));
        assert!(shown.contains("\"autosave_on\": false"));
    }
}
