use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    /// `P` + zero-padded id, assigned on first insert.
    pub patient_number: Option<String>,
    pub fio: String,
    pub birthdate: Option<NaiveDate>,
    pub phone: Option<String>,
    pub organisation: Option<String>,
    pub created_at: String,
}

/// Demographics collected from the visit form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientDetails {
    pub fio: String,
    pub birthdate: Option<NaiveDate>,
    pub phone: Option<String>,
    pub organisation: Option<String>,
}

impl PatientDetails {
    /// Phone with blank values treated as missing.
    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref().map(str::trim).filter(|p| !p.is_empty())
    }

    pub fn fio(&self) -> Option<&str> {
        Some(self.fio.trim()).filter(|f| !f.is_empty())
    }
}

/// How to find an existing patient record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatientLookup<'a> {
    Phone(&'a str),
    NameAndBirthdate(&'a str, NaiveDate),
    NameLike(&'a str),
}

pub fn patient_number_for(id: i64) -> String {
    format!("P{id:06}")
}
