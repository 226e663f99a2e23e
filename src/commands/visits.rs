//! Visit commands: compose, close and reopen cases, history, export.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate, NaiveDateTime};

use crate::app_state::AppState;
use crate::case::ClosedCase;
use crate::config;
use crate::db::{self, DatabaseError};
use crate::epicrisis::FieldMap;
use crate::export;
use crate::history::{self, VisitQuery};
use crate::models::{Visit, VisitSummary};

/// Epicrisis of the form values without saving anything.
pub fn preview_epicrisis(state: &AppState, values: &FieldMap) -> Result<String, String> {
    let form = state
        .desk()
        .definition()
        .collect(values)
        .map_err(|e| e.to_string())?;
    Ok(state.desk().compose_for_form(&form, Local::now().naive_local()))
}

/// Save the form as a new visit of the current user.
pub fn close_case(state: &AppState, values: &FieldMap) -> Result<ClosedCase, String> {
    close_case_at(state, values, Local::now().naive_local())
}

/// [`close_case`] with an explicit visit time.
pub fn close_case_at(
    state: &AppState,
    values: &FieldMap,
    now: NaiveDateTime,
) -> Result<ClosedCase, String> {
    let user = state.require_user().map_err(|e| e.to_string())?;
    let form = state
        .desk()
        .definition()
        .collect(values)
        .map_err(|e| e.to_string())?;
    let conn = state.open_db().map_err(|e| e.to_string())?;
    state
        .desk()
        .close_case(&conn, &form, Some(user.as_str()), now)
        .map_err(|e| e.to_string())
}

/// Stored epicrisis of a visit; composed from its fields when the visit
/// predates stored texts.
pub fn get_epicrisis(state: &AppState, visit_id: i64) -> Result<String, String> {
    let conn = state.open_db().map_err(|e| e.to_string())?;
    let visit = db::get_visit(&conn, visit_id)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| {
            DatabaseError::NotFound {
                entity_type: "visit".into(),
                id: visit_id.to_string(),
            }
            .to_string()
        })?;
    match visit.epicrisis_text.as_deref().filter(|t| !t.trim().is_empty()) {
        Some(text) => Ok(text.to_string()),
        None => Ok(state.desk().compose_for_visit(&visit)),
    }
}

/// Stored visit plus the values to load back into the form.
pub fn reopen_visit(state: &AppState, visit_id: i64) -> Result<(Visit, FieldMap), String> {
    let conn = state.open_db().map_err(|e| e.to_string())?;
    state
        .desk()
        .reopen_visit(&conn, visit_id)
        .map_err(|e| e.to_string())
}

pub fn todays_visits(state: &AppState) -> Result<Vec<VisitSummary>, String> {
    todays_visits_on(state, Local::now().date_naive())
}

pub fn todays_visits_on(state: &AppState, today: NaiveDate) -> Result<Vec<VisitSummary>, String> {
    let conn = state.open_db().map_err(|e| e.to_string())?;
    history::today(&conn, today).map_err(|e| e.to_string())
}

pub fn search_visits(state: &AppState, query: &VisitQuery) -> Result<Vec<Visit>, String> {
    search_visits_on(state, query, Local::now().date_naive())
}

/// Search with the default window counted back from `today`.
pub fn search_visits_on(
    state: &AppState,
    query: &VisitQuery,
    today: NaiveDate,
) -> Result<Vec<Visit>, String> {
    validate_range(query)?;
    let conn = state.open_db().map_err(|e| e.to_string())?;
    history::search(&conn, query, today).map_err(|e| e.to_string())
}

/// Export the search result as a history table. Returns the written path.
pub fn export_history(state: &AppState, query: &VisitQuery, path: &Path) -> Result<PathBuf, String> {
    export_history_on(state, query, path, Local::now().date_naive())
}

pub fn export_history_on(
    state: &AppState,
    query: &VisitQuery,
    path: &Path,
    today: NaiveDate,
) -> Result<PathBuf, String> {
    let visits = search_visits_on(state, query, today)?;
    let summaries: Vec<VisitSummary> = visits.iter().map(VisitSummary::from).collect();
    export::export_history(&summaries, path).map_err(|e| e.to_string())
}

/// Export the period report for `[from, to]`. Returns the written path.
pub fn export_report(
    state: &AppState,
    from: NaiveDate,
    to: NaiveDate,
    path: &Path,
) -> Result<PathBuf, String> {
    if from > to {
        return Err("Start date is after end date".into());
    }
    let conn = state.open_db().map_err(|e| e.to_string())?;
    let visits = db::list_visits_between(&conn, from, to).map_err(|e| e.to_string())?;
    export::export_report(&visits, path).map_err(|e| e.to_string())
}

/// Patient names for autocomplete.
pub fn autocomplete_patients(state: &AppState, fragment: &str) -> Result<Vec<String>, String> {
    let fragment = fragment.trim();
    if fragment.is_empty() {
        return Ok(Vec::new());
    }
    let conn = state.open_db().map_err(|e| e.to_string())?;
    db::list_patients_like(&conn, fragment, config::AUTOCOMPLETE_LIMIT).map_err(|e| e.to_string())
}

fn validate_range(query: &VisitQuery) -> Result<(), String> {
    match (query.from, query.to) {
        (Some(from), Some(to)) if from > to => Err("Start date is after end date".into()),
        _ => Ok(()),
    }
}
