//! Visit form definition: the explicit, ordered list of form fields.
//!
//! Each field has a stable identifier (the storage key and the input to
//! the epicrisis heuristics), a semantic kind, the column it binds to
//! and whether it contributes to the epicrisis summary.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::epicrisis::{FieldMap, FieldValue, LabelMap};
use crate::models::{PatientDetails, DATE_FORMAT};

#[derive(Error, Debug, PartialEq)]
pub enum FormError {
    #[error("Invalid date in {field}: {value} (expected YYYY-MM-DD)")]
    InvalidDate { field: String, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    MultilineText,
    Choice,
    Date,
    Checkbox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatientField {
    Fio,
    Birthdate,
    Phone,
    Organisation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitField {
    VisitKind,
    GeneralCondition,
    Consciousness,
    Diagnosis,
    MkbCode,
    Outcome,
    EvacuationPlace,
    Profession,
    AttendingMedic,
}

/// Where a field's value goes besides the stored field document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Patient(PatientField),
    Visit(VisitField),
    Observation,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    pub id: &'static str,
    pub kind: FieldKind,
    pub binding: Binding,
    /// Display label; derived from the identifier when absent.
    pub label: Option<&'static str>,
    /// Whether the field appears in the epicrisis text.
    pub in_summary: bool,
}

const fn patient(id: &'static str, kind: FieldKind, field: PatientField) -> FieldDef {
    FieldDef { id, kind, binding: Binding::Patient(field), label: None, in_summary: false }
}

const fn visit(id: &'static str, kind: FieldKind, field: VisitField, label: &'static str) -> FieldDef {
    FieldDef { id, kind, binding: Binding::Visit(field), label: Some(label), in_summary: true }
}

const fn observation(id: &'static str, kind: FieldKind, label: &'static str) -> FieldDef {
    FieldDef { id, kind, binding: Binding::Observation, label: Some(label), in_summary: true }
}

/// The standard visit form, in display order.
const STANDARD_FIELDS: &[FieldDef] = &[
    patient("patientfio", FieldKind::Text, PatientField::Fio),
    patient("patientdate", FieldKind::Date, PatientField::Birthdate),
    patient("phone_pole", FieldKind::Text, PatientField::Phone),
    patient("organisation", FieldKind::Choice, PatientField::Organisation),
    visit("vidpriema", FieldKind::Choice, VisitField::VisitKind, "Вид приёма"),
    observation("complaints", FieldKind::MultilineText, "Жалобы"),
    visit("obschsost", FieldKind::Choice, VisitField::GeneralCondition, "Общее состояние"),
    visit("soznanie", FieldKind::Choice, VisitField::Consciousness, "Сознание"),
    observation("feverTemp", FieldKind::Text, "Температура"),
    observation("weight", FieldKind::Text, "Вес"),
    observation("height", FieldKind::Text, "Рост"),
    observation("skinColor", FieldKind::Choice, "Цвет кожи"),
    observation("rash", FieldKind::Checkbox, "Сыпь"),
    observation("dyspnea", FieldKind::Checkbox, "Одышка"),
    observation("breathRate", FieldKind::Text, "ЧДД"),
    observation("heartRate", FieldKind::Text, "ЧСС"),
    observation("heartArrhythmia", FieldKind::Checkbox, "Аритмия"),
    observation("abdomPain", FieldKind::Checkbox, "Боль в животе"),
    observation("gastroNausea", FieldKind::Checkbox, "Тошнота"),
    observation("urinDisorder", FieldKind::Checkbox, "Нарушение мочеиспускания"),
    observation("neuroHeadache", FieldKind::Checkbox, "Головная боль"),
    observation("neuroDeficit", FieldKind::Checkbox, "Очаговая неврологическая симптоматика"),
    visit("diagnosis", FieldKind::Text, VisitField::Diagnosis, "Диагноз"),
    visit("mkb10list", FieldKind::Choice, VisitField::MkbCode, "МКБ-10"),
    observation("treatment", FieldKind::MultilineText, "Лечение"),
    visit("outcome", FieldKind::Choice, VisitField::Outcome, "Исход"),
    visit("evacuation", FieldKind::Text, VisitField::EvacuationPlace, "Место эвакуации"),
    visit("profession", FieldKind::Text, VisitField::Profession, "Должность"),
    visit("fiovrach", FieldKind::Choice, VisitField::AttendingMedic, "Врач"),
];

/// Visit columns extracted from the form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisitColumns {
    pub vid_priema: String,
    pub obschsost: String,
    pub soznanie: String,
    pub diagnosis: String,
    pub mkb_code: String,
    pub outcome: String,
    pub evacuation_place: String,
    pub profession: String,
    pub attending_medic: String,
}

/// A collected visit form: typed columns plus every field value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisitForm {
    pub patient: PatientDetails,
    pub visit: VisitColumns,
    /// All values in form order, unknown identifiers last.
    pub fields: FieldMap,
}

#[derive(Debug, Clone)]
pub struct FormDefinition {
    fields: Vec<FieldDef>,
}

impl Default for FormDefinition {
    fn default() -> Self {
        Self::standard()
    }
}

impl FormDefinition {
    pub fn standard() -> Self {
        Self { fields: STANDARD_FIELDS.to_vec() }
    }

    pub fn new(fields: Vec<FieldDef>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field(&self, id: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Explicit labels of the defined fields.
    pub fn labels(&self) -> LabelMap {
        self.fields
            .iter()
            .filter_map(|f| f.label.map(|label| (f.id, label)))
            .collect()
    }

    /// Typed extraction of raw form values.
    pub fn collect(&self, values: &FieldMap) -> Result<VisitForm, FormError> {
        let mut form = VisitForm::default();

        for def in &self.fields {
            let value = match values.get(def.id) {
                Some(raw) => coerce(def, raw)?,
                None => coerce(def, &FieldValue::Null)?,
            };
            let text = value.as_text();

            match def.binding {
                Binding::Patient(PatientField::Fio) => form.patient.fio = text.trim().to_string(),
                Binding::Patient(PatientField::Birthdate) => {
                    form.patient.birthdate = parse_date(def.id, &text)?;
                }
                Binding::Patient(PatientField::Phone) => {
                    form.patient.phone = non_blank(&text);
                }
                Binding::Patient(PatientField::Organisation) => {
                    form.patient.organisation = non_blank(&text);
                }
                Binding::Visit(field) => assign_visit(&mut form.visit, field, text),
                Binding::Observation => {}
            }
            form.fields.insert(def.id, value);
        }

        for (id, value) in values.iter() {
            if self.field(id).is_none() {
                tracing::debug!(field = id, "Keeping value of undefined form field");
                form.fields.insert(id, value.clone());
            }
        }

        Ok(form)
    }

    /// Values shaped for reopening a stored visit in the form: checkboxes
    /// become booleans, other defined fields become text.
    pub fn restore(&self, stored: &FieldMap) -> FieldMap {
        let mut restored = FieldMap::new();
        for def in &self.fields {
            if let Some(value) = stored.get(def.id) {
                let shaped = match def.kind {
                    FieldKind::Checkbox => FieldValue::Bool(value.is_truthy()),
                    _ => FieldValue::Text(value.as_text()),
                };
                restored.insert(def.id, shaped);
            }
        }
        for (id, value) in stored.iter() {
            if self.field(id).is_none() {
                restored.insert(id, value.clone());
            }
        }
        restored
    }

    /// The subset of `fields` that belongs in the epicrisis text.
    /// Undefined identifiers are kept.
    pub fn summary_fields(&self, fields: &FieldMap) -> FieldMap {
        fields
            .iter()
            .filter(|(id, _)| self.field(id).map_or(true, |def| def.in_summary))
            .map(|(id, value)| (id, value.clone()))
            .collect()
    }
}

fn coerce(def: &FieldDef, raw: &FieldValue) -> Result<FieldValue, FormError> {
    let value = match def.kind {
        FieldKind::Checkbox => FieldValue::Bool(raw.is_truthy()),
        FieldKind::Date => {
            let text = raw.as_text();
            parse_date(def.id, &text)?;
            FieldValue::Text(text.trim().to_string())
        }
        FieldKind::Text | FieldKind::MultilineText | FieldKind::Choice => {
            FieldValue::Text(raw.as_text())
        }
    };
    Ok(value)
}

fn parse_date(field: &str, text: &str) -> Result<Option<NaiveDate>, FormError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .map(Some)
        .map_err(|_| FormError::InvalidDate {
            field: field.to_string(),
            value: text.to_string(),
        })
}

fn non_blank(text: &str) -> Option<String> {
    Some(text.trim().to_string()).filter(|t| !t.is_empty())
}

fn assign_visit(columns: &mut VisitColumns, field: VisitField, text: String) {
    let slot = match field {
        VisitField::VisitKind => &mut columns.vid_priema,
        VisitField::GeneralCondition => &mut columns.obschsost,
        VisitField::Consciousness => &mut columns.soznanie,
        VisitField::Diagnosis => &mut columns.diagnosis,
        VisitField::MkbCode => &mut columns.mkb_code,
        VisitField::Outcome => &mut columns.outcome,
        VisitField::EvacuationPlace => &mut columns.evacuation_place,
        VisitField::Profession => &mut columns.profession,
        VisitField::AttendingMedic => &mut columns.attending_medic,
    };
    *slot = text;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, FieldValue)]) -> FieldMap {
        pairs.iter().cloned().collect()
    }

    #[test]
    fn identifiers_are_unique() {
        let def = FormDefinition::standard();
        for (i, f) in def.fields().iter().enumerate() {
            assert!(
                def.fields()[i + 1..].iter().all(|g| g.id != f.id),
                "duplicate {}",
                f.id
            );
        }
    }

    #[test]
    fn collect_extracts_patient_and_visit_columns() {
        let form = FormDefinition::standard()
            .collect(&raw(&[
                ("patientfio", FieldValue::text("  Иванов Иван ")),
                ("patientdate", FieldValue::text("1980-04-12")),
                ("phone_pole", FieldValue::text("")),
                ("organisation", FieldValue::text("ООО Ромашка")),
                ("mkb10list", FieldValue::text("J06.9")),
                ("diagnosis", FieldValue::text("ОРВИ")),
                ("rash", FieldValue::text("да")),
            ]))
            .unwrap();

        assert_eq!(form.patient.fio, "Иванов Иван");
        assert_eq!(form.patient.birthdate, NaiveDate::from_ymd_opt(1980, 4, 12));
        assert_eq!(form.patient.phone, None);
        assert_eq!(form.patient.organisation.as_deref(), Some("ООО Ромашка"));
        assert_eq!(form.visit.mkb_code, "J06.9");
        assert_eq!(form.visit.diagnosis, "ОРВИ");
        assert_eq!(form.fields.get("rash"), Some(&FieldValue::Bool(true)));
    }

    #[test]
    fn every_defined_field_is_present_in_form_order() {
        let def = FormDefinition::standard();
        let form = def.collect(&FieldMap::new()).unwrap();
        let ids: Vec<_> = form.fields.keys().collect();
        let expected: Vec<_> = def.fields().iter().map(|f| f.id).collect();
        assert_eq!(ids, expected);
        assert_eq!(form.fields.get("dyspnea"), Some(&FieldValue::Bool(false)));
        assert_eq!(form.fields.get("diagnosis"), Some(&FieldValue::text("")));
    }

    #[test]
    fn unknown_fields_are_kept_after_defined_ones() {
        let def = FormDefinition::standard();
        let form = def
            .collect(&raw(&[
                ("customNote", FieldValue::text("x")),
                ("rash", FieldValue::Bool(true)),
            ]))
            .unwrap();
        assert_eq!(form.fields.keys().last(), Some("customNote"));
        assert_eq!(form.fields.len(), def.fields().len() + 1);
    }

    #[test]
    fn bad_birthdate_is_an_error() {
        let result = FormDefinition::standard()
            .collect(&raw(&[("patientdate", FieldValue::text("12.04.1980"))]));
        assert_eq!(
            result,
            Err(FormError::InvalidDate {
                field: "patientdate".into(),
                value: "12.04.1980".into(),
            })
        );
    }

    #[test]
    fn restore_shapes_values_by_kind() {
        let stored = raw(&[
            ("rash", FieldValue::from(1i64)),
            ("dyspnea", FieldValue::text("False")),
            ("heartRate", FieldValue::from(72i64)),
            ("legacyWidget", FieldValue::Bool(true)),
        ]);
        let restored = FormDefinition::standard().restore(&stored);
        assert_eq!(restored.get("rash"), Some(&FieldValue::Bool(true)));
        assert_eq!(restored.get("dyspnea"), Some(&FieldValue::Bool(false)));
        assert_eq!(restored.get("heartRate"), Some(&FieldValue::text("72")));
        assert_eq!(restored.get("legacyWidget"), Some(&FieldValue::Bool(true)));
    }

    #[test]
    fn summary_excludes_demographics() {
        let def = FormDefinition::standard();
        let form = def
            .collect(&raw(&[
                ("patientfio", FieldValue::text("Иванов")),
                ("rash", FieldValue::Bool(true)),
                ("extra", FieldValue::text("y")),
            ]))
            .unwrap();
        let summary = def.summary_fields(&form.fields);
        assert!(!summary.contains("patientfio"));
        assert!(!summary.contains("phone_pole"));
        assert!(summary.contains("rash"));
        assert!(summary.contains("extra"));
    }

    #[test]
    fn labels_cover_labeled_fields() {
        let labels = FormDefinition::standard().labels();
        assert_eq!(labels.get("rash"), Some("Сыпь"));
        assert_eq!(labels.get("patientfio"), None);
    }
}
