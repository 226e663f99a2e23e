//! Visit history: today's list and filtered search.

use chrono::{Duration, NaiveDate};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::config;
use crate::db::{self, DatabaseError};
use crate::models::{Visit, VisitSummary};

/// History search filter. Missing dates default to the last
/// [`config::DEFAULT_SEARCH_WINDOW_DAYS`] days, both ends inclusive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisitQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub text: Option<String>,
}

impl VisitQuery {
    /// Concrete `(from, to)` range relative to `today`.
    pub fn range(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let to = self.to.unwrap_or(today);
        let from = self
            .from
            .unwrap_or_else(|| to - Duration::days(config::DEFAULT_SEARCH_WINDOW_DAYS));
        (from, to)
    }

    fn needle(&self) -> Option<String> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
    }
}

/// Visits of one calendar day, oldest first.
pub fn today(conn: &Connection, today: NaiveDate) -> Result<Vec<VisitSummary>, DatabaseError> {
    db::list_visits_for_date(conn, today)
}

/// Visits in the query range whose patient name, field values or
/// epicrisis text contain the query text (case-insensitive), newest first.
pub fn search(
    conn: &Connection,
    query: &VisitQuery,
    today: NaiveDate,
) -> Result<Vec<Visit>, DatabaseError> {
    let (from, to) = query.range(today);
    let visits = db::list_visits_between(conn, from, to)?;

    let Some(needle) = query.needle() else {
        return Ok(visits);
    };

    let mut matched = Vec::new();
    for visit in visits {
        if visit_matches(&visit, &needle)? {
            matched.push(visit);
        }
    }
    tracing::debug!(%from, %to, found = matched.len(), "History search");
    Ok(matched)
}

fn visit_matches(visit: &Visit, needle: &str) -> Result<bool, DatabaseError> {
    let contains = |text: &str| text.to_lowercase().contains(needle);

    if visit.patient_fio.as_deref().is_some_and(contains) {
        return Ok(true);
    }
    if visit.epicrisis_text.as_deref().is_some_and(contains) {
        return Ok(true);
    }
    let fields = serde_json::to_string(&visit.full_epicrisis)?;
    Ok(contains(&fields))
}
