use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::DatabaseError;
use crate::models::*;

const PATIENT_COLUMNS: &str =
    "id, patient_number, fio, birthdate, phone, organisation, created_at";

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    let birthdate: Option<String> = row.get(3)?;
    Ok(Patient {
        id: row.get(0)?,
        patient_number: row.get(1)?,
        fio: row.get(2)?,
        birthdate: birthdate.and_then(|d| NaiveDate::parse_from_str(&d, DATE_FORMAT).ok()),
        phone: row.get(4)?,
        organisation: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub fn find_patient(
    conn: &Connection,
    lookup: PatientLookup<'_>,
) -> Result<Option<Patient>, DatabaseError> {
    let found = match lookup {
        PatientLookup::Phone(phone) => conn
            .query_row(
                &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE phone = ?1 LIMIT 1"),
                [phone],
                patient_from_row,
            )
            .optional()?,
        PatientLookup::NameAndBirthdate(fio, birthdate) => conn
            .query_row(
                &format!(
                    "SELECT {PATIENT_COLUMNS} FROM patients WHERE fio = ?1 AND birthdate = ?2 LIMIT 1"
                ),
                params![fio, birthdate.format(DATE_FORMAT).to_string()],
                patient_from_row,
            )
            .optional()?,
        PatientLookup::NameLike(fragment) => conn
            .query_row(
                &format!(
                    "SELECT {PATIENT_COLUMNS} FROM patients WHERE fio LIKE ?1 ESCAPE '\\' LIMIT 1"
                ),
                [like_pattern(fragment)],
                patient_from_row,
            )
            .optional()?,
    };
    Ok(found)
}

/// Create or update a patient. An existing record is matched by phone,
/// then by name + birthdate. New records get a patient number.
pub fn save_patient(conn: &Connection, details: &PatientDetails) -> Result<i64, DatabaseError> {
    let fio = details.fio.trim();
    let birthdate = details.birthdate.map(|d| d.format(DATE_FORMAT).to_string());
    let phone = details.phone();

    let mut existing = match phone {
        Some(phone) => find_patient(conn, PatientLookup::Phone(phone))?,
        None => None,
    };
    if existing.is_none() {
        if let (Some(fio), Some(bd)) = (details.fio(), details.birthdate) {
            existing = find_patient(conn, PatientLookup::NameAndBirthdate(fio, bd))?;
        }
    }

    if let Some(patient) = existing {
        conn.execute(
            "UPDATE patients SET fio = ?1, birthdate = ?2, phone = ?3, organisation = ?4 WHERE id = ?5",
            params![fio, birthdate, phone, details.organisation, patient.id],
        )?;
        tracing::info!(patient_id = patient.id, "Patient updated");
        return Ok(patient.id);
    }

    conn.execute(
        "INSERT INTO patients (fio, birthdate, phone, organisation) VALUES (?1, ?2, ?3, ?4)",
        params![fio, birthdate, phone, details.organisation],
    )?;
    let id = conn.last_insert_rowid();
    conn.execute(
        "UPDATE patients SET patient_number = ?1 WHERE id = ?2",
        params![patient_number_for(id), id],
    )?;
    tracing::info!(patient_id = id, "Patient created");
    Ok(id)
}

pub fn get_patient(conn: &Connection, id: i64) -> Result<Option<Patient>, DatabaseError> {
    let patient = conn
        .query_row(
            &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1"),
            [id],
            patient_from_row,
        )
        .optional()?;
    Ok(patient)
}

/// Distinct patient names containing `fragment`, for name autocomplete.
pub fn list_patients_like(
    conn: &Connection,
    fragment: &str,
    limit: u32,
) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT fio FROM patients WHERE fio LIKE ?1 ESCAPE '\\'
         GROUP BY fio ORDER BY fio LIMIT ?2",
    )?;
    let names = stmt
        .query_map(params![like_pattern(fragment), limit], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

fn like_pattern(fragment: &str) -> String {
    let escaped = fragment
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    fn details(fio: &str, phone: Option<&str>, birth: Option<(i32, u32, u32)>) -> PatientDetails {
        PatientDetails {
            fio: fio.into(),
            birthdate: birth.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            phone: phone.map(Into::into),
            organisation: Some("ООО Ромашка".into()),
        }
    }

    #[test]
    fn new_patient_gets_number() {
        let conn = open_memory_database().unwrap();
        let id = save_patient(&conn, &details("Иванов Иван", None, None)).unwrap();
        let patient = get_patient(&conn, id).unwrap().unwrap();
        assert_eq!(patient.patient_number.as_deref(), Some(format!("P{id:06}").as_str()));
        assert_eq!(patient.fio, "Иванов Иван");
        assert_eq!(patient.organisation.as_deref(), Some("ООО Ромашка"));
    }

    #[test]
    fn same_phone_updates_existing_patient() {
        let conn = open_memory_database().unwrap();
        let first = save_patient(&conn, &details("Иванов", Some("+7900"), None)).unwrap();
        let second = save_patient(&conn, &details("Иванов Иван", Some("+7900"), None)).unwrap();
        assert_eq!(first, second);
        let patient = get_patient(&conn, first).unwrap().unwrap();
        assert_eq!(patient.fio, "Иванов Иван");
    }

    #[test]
    fn name_and_birthdate_match_when_phone_missing() {
        let conn = open_memory_database().unwrap();
        let first = save_patient(&conn, &details("Сидоров", None, Some((1980, 2, 3)))).unwrap();
        let second = save_patient(&conn, &details("Сидоров", Some(""), Some((1980, 2, 3)))).unwrap();
        assert_eq!(first, second);

        let other = save_patient(&conn, &details("Сидоров", None, Some((1981, 2, 3)))).unwrap();
        assert_ne!(first, other);
    }

    #[test]
    fn name_without_birthdate_always_creates() {
        let conn = open_memory_database().unwrap();
        let a = save_patient(&conn, &details("Кузнецов", None, None)).unwrap();
        let b = save_patient(&conn, &details("Кузнецов", None, None)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn blank_phone_is_stored_as_null() {
        let conn = open_memory_database().unwrap();
        let id = save_patient(&conn, &details("Орлов", Some("  "), None)).unwrap();
        let patient = get_patient(&conn, id).unwrap().unwrap();
        assert_eq!(patient.phone, None);
    }

    #[test]
    fn find_by_each_lookup() {
        let conn = open_memory_database().unwrap();
        let id = save_patient(&conn, &details("Smith John", Some("555"), Some((1990, 1, 1)))).unwrap();

        let by_phone = find_patient(&conn, PatientLookup::Phone("555")).unwrap();
        assert_eq!(by_phone.map(|p| p.id), Some(id));

        let bd = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap();
        let by_name = find_patient(&conn, PatientLookup::NameAndBirthdate("Smith John", bd)).unwrap();
        assert_eq!(by_name.map(|p| p.id), Some(id));

        let like = find_patient(&conn, PatientLookup::NameLike("John")).unwrap();
        assert_eq!(like.map(|p| p.id), Some(id));

        assert!(find_patient(&conn, PatientLookup::Phone("000")).unwrap().is_none());
    }

    #[test]
    fn autocomplete_returns_distinct_names() {
        let conn = open_memory_database().unwrap();
        save_patient(&conn, &details("Anna Lee", None, None)).unwrap();
        save_patient(&conn, &details("Anna Lee", None, None)).unwrap();
        save_patient(&conn, &details("Hanna Berg", None, None)).unwrap();
        save_patient(&conn, &details("Olga", None, None)).unwrap();

        let names = list_patients_like(&conn, "anna", 10).unwrap();
        assert_eq!(names, vec!["Anna Lee".to_string(), "Hanna Berg".to_string()]);

        let limited = list_patients_like(&conn, "anna", 1).unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn autocomplete_treats_wildcards_literally() {
        let conn = open_memory_database().unwrap();
        save_patient(&conn, &details("Anna Lee", None, None)).unwrap();
        assert!(list_patients_like(&conn, "%", 10).unwrap().is_empty());
        assert!(list_patients_like(&conn, "_", 10).unwrap().is_empty());
    }

    #[test]
    fn missing_patient_is_none() {
        let conn = open_memory_database().unwrap();
        assert!(get_patient(&conn, 42).unwrap().is_none());
    }
}
