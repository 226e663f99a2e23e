use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::DatabaseError;
use crate::epicrisis::FieldMap;
use crate::models::*;

const VISIT_SELECT: &str =
    "SELECT v.id, v.patient_id, v.visit_datetime, v.vid_priema, v.obschsost, v.soznanie,
     v.examiner, v.diagnosis, v.mkb_code, v.outcome, v.evacuation_place, v.full_epicrisis,
     v.epicrisis_text, v.created_at, p.fio, p.patient_number, p.phone, p.organisation
     FROM visits v LEFT JOIN patients p ON p.id = v.patient_id";

pub fn insert_visit(conn: &Connection, visit: &NewVisit) -> Result<i64, DatabaseError> {
    let fields_json = serde_json::to_string(&visit.full_epicrisis)?;
    conn.execute(
        "INSERT INTO visits (patient_id, visit_datetime, vid_priema, obschsost, soznanie,
         examiner, diagnosis, mkb_code, outcome, evacuation_place, full_epicrisis, epicrisis_text)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            visit.patient_id,
            visit.visit_datetime.format(DATETIME_FORMAT).to_string(),
            visit.vid_priema,
            visit.obschsost,
            visit.soznanie,
            visit.examiner,
            visit.diagnosis,
            visit.mkb_code,
            visit.outcome,
            visit.evacuation_place,
            fields_json,
            visit.epicrisis_text,
        ],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(visit_id = id, patient_id = visit.patient_id, "Visit saved");
    Ok(id)
}

pub fn get_visit(conn: &Connection, id: i64) -> Result<Option<Visit>, DatabaseError> {
    let row = conn
        .query_row(&format!("{VISIT_SELECT} WHERE v.id = ?1"), [id], read_visit_row)
        .optional()?;
    row.map(VisitRow::into_visit).transpose()
}

/// Visits whose datetime falls within `[from 00:00:00, to 23:59:59]`,
/// newest first.
pub fn list_visits_between(
    conn: &Connection,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<Visit>, DatabaseError> {
    let start = format!("{} 00:00:00", from.format(DATE_FORMAT));
    let end = format!("{} 23:59:59", to.format(DATE_FORMAT));
    let mut stmt = conn.prepare(&format!(
        "{VISIT_SELECT} WHERE v.visit_datetime BETWEEN ?1 AND ?2
         ORDER BY v.visit_datetime DESC, v.id DESC"
    ))?;
    let rows = stmt
        .query_map(params![start, end], read_visit_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(VisitRow::into_visit).collect()
}

/// Summaries of the visits on one calendar day, oldest first.
pub fn list_visits_for_date(
    conn: &Connection,
    date: NaiveDate,
) -> Result<Vec<VisitSummary>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT v.id, v.visit_datetime, p.fio, v.mkb_code
         FROM visits v LEFT JOIN patients p ON p.id = v.patient_id
         WHERE date(v.visit_datetime) = date(?1)
         ORDER BY v.visit_datetime ASC, v.id ASC",
    )?;
    let rows = stmt
        .query_map([date.format(DATE_FORMAT).to_string()], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, datetime, patient_fio, mkb_code)| {
            Ok(VisitSummary {
                id,
                visit_datetime: parse_datetime(&datetime)?,
                patient_fio,
                mkb_code: mkb_code.filter(|c| !c.is_empty()),
            })
        })
        .collect()
}

/// Most recent visits, newest first.
pub fn list_all_visits(conn: &Connection, limit: u32) -> Result<Vec<Visit>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "{VISIT_SELECT} ORDER BY v.visit_datetime DESC, v.id DESC LIMIT ?1"
    ))?;
    let rows = stmt
        .query_map([limit], read_visit_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(VisitRow::into_visit).collect()
}

/// Raw visit row before text columns are parsed.
struct VisitRow {
    id: i64,
    patient_id: i64,
    visit_datetime: String,
    vid_priema: Option<String>,
    obschsost: Option<String>,
    soznanie: Option<String>,
    examiner: Option<String>,
    diagnosis: Option<String>,
    mkb_code: Option<String>,
    outcome: Option<String>,
    evacuation_place: Option<String>,
    full_epicrisis: Option<String>,
    epicrisis_text: Option<String>,
    created_at: String,
    patient_fio: Option<String>,
    patient_number: Option<String>,
    phone: Option<String>,
    organisation: Option<String>,
}

fn read_visit_row(row: &Row<'_>) -> rusqlite::Result<VisitRow> {
    Ok(VisitRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        visit_datetime: row.get(2)?,
        vid_priema: row.get(3)?,
        obschsost: row.get(4)?,
        soznanie: row.get(5)?,
        examiner: row.get(6)?,
        diagnosis: row.get(7)?,
        mkb_code: row.get(8)?,
        outcome: row.get(9)?,
        evacuation_place: row.get(10)?,
        full_epicrisis: row.get(11)?,
        epicrisis_text: row.get(12)?,
        created_at: row.get(13)?,
        patient_fio: row.get(14)?,
        patient_number: row.get(15)?,
        phone: row.get(16)?,
        organisation: row.get(17)?,
    })
}

impl VisitRow {
    fn into_visit(self) -> Result<Visit, DatabaseError> {
        let full_epicrisis = match self.full_epicrisis.as_deref() {
            None | Some("") => FieldMap::new(),
            Some(json) => serde_json::from_str(json).unwrap_or_else(|e| {
                tracing::warn!(visit_id = self.id, error = %e, "Unreadable visit field document");
                FieldMap::new()
            }),
        };

        Ok(Visit {
            id: self.id,
            patient_id: self.patient_id,
            visit_datetime: parse_datetime(&self.visit_datetime)?,
            vid_priema: self.vid_priema.unwrap_or_default(),
            obschsost: self.obschsost.unwrap_or_default(),
            soznanie: self.soznanie.unwrap_or_default(),
            examiner: self.examiner.unwrap_or_default(),
            diagnosis: self.diagnosis.unwrap_or_default(),
            mkb_code: self.mkb_code.unwrap_or_default(),
            outcome: self.outcome.unwrap_or_default(),
            evacuation_place: self.evacuation_place.unwrap_or_default(),
            full_epicrisis,
            epicrisis_text: self.epicrisis_text,
            created_at: self.created_at,
            patient_fio: self.patient_fio,
            patient_number: self.patient_number,
            phone: self.phone,
            organisation: self.organisation,
        })
    }
}

fn parse_datetime(value: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(value, DATETIME_FORMAT).map_err(|_| {
        DatabaseError::InvalidValue {
            field: "visit_datetime".into(),
            value: value.into(),
        }
    })
}
