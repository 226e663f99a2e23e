//! Export of visit lists to CSV or JSON files.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::models::{Visit, VisitSummary, DATETIME_FORMAT, DATE_FORMAT};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Nothing to export")]
    NothingToExport,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    /// Pick the format from the file extension. Anything but `.json` is
    /// written as CSV, with `.csv` appended when the extension differs.
    pub fn resolve(path: &Path) -> (PathBuf, Self) {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("json") => (path.to_path_buf(), Self::Json),
            Some("csv") => (path.to_path_buf(), Self::Csv),
            _ => {
                let mut name = path.as_os_str().to_os_string();
                name.push(".csv");
                (PathBuf::from(name), Self::Csv)
            }
        }
    }
}

/// One row of the visit history export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryRow {
    #[serde(rename = "id")]
    pub id: i64,
    #[serde(rename = "ДатаВремя")]
    pub datetime: String,
    #[serde(rename = "ФИО")]
    pub fio: String,
    #[serde(rename = "МКБ")]
    pub mkb: String,
}

impl From<&VisitSummary> for HistoryRow {
    fn from(summary: &VisitSummary) -> Self {
        Self {
            id: summary.id,
            datetime: summary.visit_datetime.format(DATETIME_FORMAT).to_string(),
            fio: summary.patient_fio.clone().unwrap_or_default(),
            mkb: summary.mkb_code.clone().unwrap_or_default(),
        }
    }
}

/// One row of the period report export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    #[serde(rename = "Дата")]
    pub date: String,
    #[serde(rename = "Пациент")]
    pub patient: String,
    #[serde(rename = "Организация")]
    pub organisation: String,
    #[serde(rename = "Диагноз")]
    pub diagnosis: String,
    #[serde(rename = "Исход")]
    pub outcome: String,
}

impl From<&Visit> for ReportRow {
    fn from(visit: &Visit) -> Self {
        Self {
            date: visit.visit_datetime.format(DATE_FORMAT).to_string(),
            patient: visit.patient_fio.clone().unwrap_or_default(),
            organisation: visit.organisation.clone().unwrap_or_default(),
            diagnosis: visit.diagnosis.clone(),
            outcome: visit.outcome.clone(),
        }
    }
}

/// Write visit summaries. Returns the path actually written.
pub fn export_history(summaries: &[VisitSummary], path: &Path) -> Result<PathBuf, ExportError> {
    let rows: Vec<HistoryRow> = summaries.iter().map(HistoryRow::from).collect();
    write_rows(&rows, path)
}

/// Write the period report. Returns the path actually written.
pub fn export_report(visits: &[Visit], path: &Path) -> Result<PathBuf, ExportError> {
    let rows: Vec<ReportRow> = visits.iter().map(ReportRow::from).collect();
    write_rows(&rows, path)
}

fn write_rows<T: Serialize>(rows: &[T], path: &Path) -> Result<PathBuf, ExportError> {
    if rows.is_empty() {
        return Err(ExportError::NothingToExport);
    }
    let (path, format) = ExportFormat::resolve(path);
    match format {
        ExportFormat::Csv => {
            let mut wtr = csv::Writer::from_path(&path)?;
            for row in rows {
                wtr.serialize(row)?;
            }
            wtr.flush()?;
        }
        ExportFormat::Json => {
            let file = BufWriter::new(File::create(&path)?);
            serde_json::to_writer_pretty(file, rows)?;
        }
    }
    tracing::info!(path = %path.display(), rows = rows.len(), "Export written");
    Ok(path)
}
