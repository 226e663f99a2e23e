use std::fmt::Write;

use super::label::LabelMap;
use super::section::{GroupMap, SectionVocabulary};
use super::value::{FieldMap, Normalized};

/// Header captions of the epicrisis.
#[derive(Debug, Clone)]
pub struct HeaderCaptions {
    pub patient: String,
    pub date: String,
}

impl Default for HeaderCaptions {
    fn default() -> Self {
        Self {
            patient: "Пациент".into(),
            date: "Дата".into(),
        }
    }
}

/// Epicrisis composer with explicit labels and section vocabulary.
///
/// Holds no mutable state; `compose` is a pure function of its inputs
/// and this configuration, so one composer can be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct Composer {
    pub labels: LabelMap,
    pub vocabulary: SectionVocabulary,
    pub captions: HeaderCaptions,
}

impl Composer {
    pub fn new(labels: LabelMap, vocabulary: SectionVocabulary) -> Self {
        Self {
            labels,
            vocabulary,
            captions: HeaderCaptions::default(),
        }
    }

    pub fn group(&self, fields: &FieldMap) -> GroupMap {
        GroupMap::build(fields, &self.labels, &self.vocabulary)
    }

    /// Compose the epicrisis text.
    ///
    /// Layout: two header lines and a blank line, then one block per
    /// section that has something to show, blocks separated by a blank
    /// line. Every line ends with `\n`.
    pub fn compose(&self, fields: &FieldMap, patient_name: &str, timestamp: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}: {}", self.captions.patient, patient_name);
        let _ = writeln!(out, "{}: {}", self.captions.date, timestamp);
        out.push('\n');

        let groups = self.group(fields);
        let mut first_block = true;
        for (section, grouped) in groups.iter() {
            let lines: Vec<String> = grouped
                .iter()
                .filter_map(|field| {
                    let value = fields.get(&field.id)?;
                    render_line(&field.label, value.normalize())
                })
                .collect();
            if lines.is_empty() {
                continue;
            }

            if !first_block {
                out.push('\n');
            }
            first_block = false;

            let _ = writeln!(out, "--- {} ---", self.vocabulary.title(section));
            for line in lines {
                out.push_str(&line);
                out.push('\n');
            }
        }

        tracing::debug!(
            fields = fields.len(),
            bytes = out.len(),
            "Epicrisis composed"
        );
        out
    }
}

fn render_line(label: &str, value: Normalized<'_>) -> Option<String> {
    match value {
        Normalized::Checked => Some(label.to_string()),
        Normalized::Display(text) if !text.is_empty() => Some(format!("{label}: {text}")),
        Normalized::Display(_) | Normalized::Unchecked | Normalized::Absent => None,
    }
}

/// Compose with the default labels, vocabulary and captions.
pub fn compose(fields: &FieldMap, patient_name: &str, timestamp: &str) -> String {
    Composer::default().compose(fields, patient_name, timestamp)
}
