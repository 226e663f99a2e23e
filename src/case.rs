//! Case workflow: compose, close and reopen visits.
//!
//! Closing a case saves the patient, composes the epicrisis from the
//! summary fields of the form and stores the visit with the text attached.

use chrono::NaiveDateTime;
use rusqlite::Connection;
use thiserror::Error;

use crate::db::{self, DatabaseError};
use crate::epicrisis::{Composer, FieldMap, SectionVocabulary};
use crate::form::{FormDefinition, VisitForm};
use crate::models::{NewVisit, Visit};

/// Timestamp format of the epicrisis header. Minutes only; the stored
/// visit time keeps seconds.
pub const HEADER_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Error, Debug)]
pub enum CaseError {
    #[error("Patient name is required")]
    MissingPatientName,

    #[error("Visit not found: {0}")]
    VisitNotFound(i64),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Result of closing a case.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedCase {
    pub patient_id: i64,
    pub visit_id: i64,
    pub text: String,
}

/// Composes and stores visits against one form definition.
#[derive(Debug, Clone)]
pub struct CaseDesk {
    definition: FormDefinition,
    composer: Composer,
}

impl Default for CaseDesk {
    fn default() -> Self {
        Self::new(FormDefinition::standard())
    }
}

impl CaseDesk {
    pub fn new(definition: FormDefinition) -> Self {
        let composer = Composer::new(definition.labels(), SectionVocabulary::default());
        Self { definition, composer }
    }

    pub fn definition(&self) -> &FormDefinition {
        &self.definition
    }

    /// Epicrisis of the form being filled, stamped with `now`.
    pub fn compose_for_form(&self, form: &VisitForm, now: NaiveDateTime) -> String {
        let fields = self.definition.summary_fields(&form.fields);
        self.composer.compose(
            &fields,
            form.patient.fio.trim(),
            &now.format(HEADER_TIMESTAMP_FORMAT).to_string(),
        )
    }

    /// Epicrisis of a stored visit, stamped with the visit time.
    pub fn compose_for_visit(&self, visit: &Visit) -> String {
        let fields = self.definition.summary_fields(&visit.full_epicrisis);
        self.composer.compose(
            &fields,
            visit.patient_fio.as_deref().unwrap_or_default(),
            &visit.visit_datetime.format(HEADER_TIMESTAMP_FORMAT).to_string(),
        )
    }

    /// Save the patient and the visit with its composed epicrisis.
    ///
    /// The examiner is `examiner` when given, else the attending medic
    /// on the form, else its profession field.
    pub fn close_case(
        &self,
        conn: &Connection,
        form: &VisitForm,
        examiner: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<ClosedCase, CaseError> {
        if form.patient.fio().is_none() {
            return Err(CaseError::MissingPatientName);
        }

        let text = self.compose_for_form(form, now);
        let examiner = [
            examiner.unwrap_or_default(),
            form.visit.attending_medic.as_str(),
            form.visit.profession.as_str(),
        ]
        .into_iter()
        .map(str::trim)
        .find(|e| !e.is_empty())
        .unwrap_or_default()
        .to_string();

        let tx = conn.unchecked_transaction().map_err(DatabaseError::from)?;
        let patient_id = db::save_patient(&tx, &form.patient)?;
        let visit_id = db::insert_visit(
            &tx,
            &NewVisit {
                patient_id,
                visit_datetime: now,
                vid_priema: form.visit.vid_priema.clone(),
                obschsost: form.visit.obschsost.clone(),
                soznanie: form.visit.soznanie.clone(),
                examiner,
                diagnosis: form.visit.diagnosis.clone(),
                mkb_code: form.visit.mkb_code.clone(),
                outcome: form.visit.outcome.clone(),
                evacuation_place: form.visit.evacuation_place.clone(),
                full_epicrisis: form.fields.clone(),
                epicrisis_text: Some(text.clone()),
            },
        )?;
        tx.commit().map_err(DatabaseError::from)?;

        tracing::info!(patient_id, visit_id, "Case closed");
        Ok(ClosedCase { patient_id, visit_id, text })
    }

    /// Load a stored visit and the values to put back into the form.
    pub fn reopen_visit(
        &self,
        conn: &Connection,
        visit_id: i64,
    ) -> Result<(Visit, FieldMap), CaseError> {
        let visit = db::get_visit(conn, visit_id)?.ok_or(CaseError::VisitNotFound(visit_id))?;
        let values = self.definition.restore(&visit.full_epicrisis);
        Ok((visit, values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::epicrisis::FieldValue;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn filled_form(desk: &CaseDesk, fio: &str) -> VisitForm {
        let raw: FieldMap = [
            ("patientfio", FieldValue::text(fio)),
            ("phone_pole", FieldValue::text("+7 900 000-00-00")),
            ("organisation", FieldValue::text("Поликлиника №1")),
            ("diagnosis", FieldValue::text("ОРВИ")),
            ("mkb10list", FieldValue::text("J06.9")),
            ("rash", FieldValue::Bool(true)),
            ("feverTemp", FieldValue::text("38.5")),
            ("fiovrach", FieldValue::text("Петров П.П.")),
        ]
        .into_iter()
        .collect();
        desk.definition().collect(&raw).unwrap()
    }

    #[test]
    fn form_epicrisis_uses_labels_and_skips_demographics() {
        let desk = CaseDesk::default();
        let form = filled_form(&desk, "Иванов");
        let text = desk.compose_for_form(&form, at("2024-01-01 10:00:00"));

        assert!(text.starts_with("Пациент: Иванов\nДата: 2024-01-01 10:00\n\n"));
        assert!(text.contains("--- Состояние кожи и слизистых ---\nСыпь\n"));
        assert!(text.contains("Температура: 38.5\n"));
        assert!(!text.contains("+7 900"));
        assert!(!text.contains("Одышка"));
    }

    #[test]
    fn header_timestamp_drops_seconds() {
        let desk = CaseDesk::default();
        let form = filled_form(&desk, "Иванов");
        let text = desk.compose_for_form(&form, at("2024-01-01 10:00:45"));
        assert!(text.starts_with("Пациент: Иванов\nДата: 2024-01-01 10:00\n\n"));
    }

    #[test]
    fn close_case_stores_patient_visit_and_text() {
        let conn = open_memory_database().unwrap();
        let desk = CaseDesk::default();
        let form = filled_form(&desk, "Иванов");

        let closed = desk
            .close_case(&conn, &form, Some("admin"), at("2024-01-01 10:00:00"))
            .unwrap();

        let visit = db::get_visit(&conn, closed.visit_id).unwrap().unwrap();
        assert_eq!(visit.patient_id, closed.patient_id);
        assert_eq!(visit.examiner, "admin");
        assert_eq!(visit.mkb_code, "J06.9");
        assert_eq!(visit.epicrisis_text.as_deref(), Some(closed.text.as_str()));
        assert_eq!(visit.full_epicrisis, form.fields);
        assert_eq!(desk.compose_for_visit(&visit), closed.text);
    }

    #[test]
    fn examiner_falls_back_to_attending_medic() {
        let conn = open_memory_database().unwrap();
        let desk = CaseDesk::default();
        let form = filled_form(&desk, "Иванов");
        let closed = desk
            .close_case(&conn, &form, None, at("2024-01-01 10:00:00"))
            .unwrap();
        let visit = db::get_visit(&conn, closed.visit_id).unwrap().unwrap();
        assert_eq!(visit.examiner, "Петров П.П.");
    }

    #[test]
    fn same_phone_reuses_patient() {
        let conn = open_memory_database().unwrap();
        let desk = CaseDesk::default();
        let form = filled_form(&desk, "Иванов");
        let first = desk.close_case(&conn, &form, None, at("2024-01-01 10:00:00")).unwrap();
        let second = desk.close_case(&conn, &form, None, at("2024-01-02 10:00:00")).unwrap();
        assert_eq!(first.patient_id, second.patient_id);
        assert_ne!(first.visit_id, second.visit_id);
    }

    #[test]
    fn blank_patient_name_is_rejected() {
        let conn = open_memory_database().unwrap();
        let desk = CaseDesk::default();
        let form = filled_form(&desk, "   ");
        let result = desk.close_case(&conn, &form, None, at("2024-01-01 10:00:00"));
        assert!(matches!(result, Err(CaseError::MissingPatientName)));
        assert!(db::list_all_visits(&conn, 10).unwrap().is_empty());
    }

    #[test]
    fn reopen_restores_form_values() {
        let conn = open_memory_database().unwrap();
        let desk = CaseDesk::default();
        let form = filled_form(&desk, "Иванов");
        let closed = desk.close_case(&conn, &form, None, at("2024-01-01 10:00:00")).unwrap();

        let (visit, values) = desk.reopen_visit(&conn, closed.visit_id).unwrap();
        assert_eq!(visit.id, closed.visit_id);
        assert_eq!(values.get("rash"), Some(&FieldValue::Bool(true)));
        assert_eq!(values.get("patientfio"), Some(&FieldValue::text("Иванов")));
    }

    #[test]
    fn reopen_missing_visit_fails() {
        let conn = open_memory_database().unwrap();
        let result = CaseDesk::default().reopen_visit(&conn, 42);
        assert!(matches!(result, Err(CaseError::VisitNotFound(42))));
    }
}
