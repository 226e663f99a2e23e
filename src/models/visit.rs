use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::epicrisis::FieldMap;

/// Visit ready to be inserted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewVisit {
    pub patient_id: i64,
    pub visit_datetime: NaiveDateTime,
    pub vid_priema: String,
    pub obschsost: String,
    pub soznanie: String,
    pub examiner: String,
    pub diagnosis: String,
    pub mkb_code: String,
    pub outcome: String,
    pub evacuation_place: String,
    /// Every form value, in form order.
    pub full_epicrisis: FieldMap,
    /// Composed epicrisis attached at save time.
    pub epicrisis_text: Option<String>,
}

/// Stored visit joined with its patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub id: i64,
    pub patient_id: i64,
    pub visit_datetime: NaiveDateTime,
    pub vid_priema: String,
    pub obschsost: String,
    pub soznanie: String,
    pub examiner: String,
    pub diagnosis: String,
    pub mkb_code: String,
    pub outcome: String,
    pub evacuation_place: String,
    pub full_epicrisis: FieldMap,
    pub epicrisis_text: Option<String>,
    pub created_at: String,
    pub patient_fio: Option<String>,
    pub patient_number: Option<String>,
    pub phone: Option<String>,
    pub organisation: Option<String>,
}

/// One row of a visit list (today's visits, history table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitSummary {
    pub id: i64,
    pub visit_datetime: NaiveDateTime,
    pub patient_fio: Option<String>,
    pub mkb_code: Option<String>,
}

impl From<&Visit> for VisitSummary {
    fn from(visit: &Visit) -> Self {
        Self {
            id: visit.id,
            visit_datetime: visit.visit_datetime,
            patient_fio: visit.patient_fio.clone(),
            mkb_code: Some(visit.mkb_code.clone()).filter(|c| !c.is_empty()),
        }
    }
}
