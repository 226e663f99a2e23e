use serde::{Deserialize, Serialize};

use super::label::LabelMap;
use super::value::FieldMap;

/// Clinical section of the epicrisis. Declaration order is render order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    General,
    Skin,
    Respiratory,
    Cardiovascular,
    Digestive,
    Urinary,
    Nervous,
    Treatment,
}

impl Section {
    /// Render order.
    pub const ALL: [Section; 8] = [
        Section::General,
        Section::Skin,
        Section::Respiratory,
        Section::Cardiovascular,
        Section::Digestive,
        Section::Urinary,
        Section::Nervous,
        Section::Treatment,
    ];

    /// Keyword matching order. General is last so that it only catches
    /// what nothing more specific claims.
    pub const MATCH_PRIORITY: [Section; 8] = [
        Section::Skin,
        Section::Respiratory,
        Section::Cardiovascular,
        Section::Digestive,
        Section::Urinary,
        Section::Nervous,
        Section::Treatment,
        Section::General,
    ];

    pub fn default_title(self) -> &'static str {
        match self {
            Self::General => "Общее состояние пациента",
            Self::Skin => "Состояние кожи и слизистых",
            Self::Respiratory => "Дыхательная система",
            Self::Cardiovascular => "Сердечно-сосудистая система",
            Self::Digestive => "Пищеварительная система",
            Self::Urinary => "Мочевыделительная система",
            Self::Nervous => "Нервная система",
            Self::Treatment => "Назначенное лечение",
        }
    }

    /// Keyword vocabulary, kept verbatim including mixed-script entries.
    pub fn default_keywords(self) -> &'static [&'static str] {
        match self {
            Self::Skin => &["skin", "kож", "кож", "sypskin", "rash", "syp"],
            Self::Respiratory => &["resp", "dysp", "dyspno", "breath", "odush", "дых", "одыш"],
            Self::Cardiovascular => &["card", "heart", "серд", "пульс", "аритм"],
            Self::Digestive => &["gastro", "digest", "abdom", "печен", " желуд", "стул", "тошн"],
            Self::Urinary => &["urin", "почк", "моч", "diur"],
            Self::Nervous => &["nerv", "neuro", "sozn", "созн", "судор", "голов", "головокруж"],
            Self::Treatment => &["treat", "ther", "lechenie", "назнач"],
            Self::General => &["fio", "age", "weight", "height", "compl", "жалоб", "obschsost"],
        }
    }
}

/// Section titles and keyword sets used to bucket field identifiers.
#[derive(Debug, Clone)]
pub struct SectionVocabulary {
    entries: Vec<SectionEntry>,
}

#[derive(Debug, Clone)]
struct SectionEntry {
    section: Section,
    title: String,
    keywords: Vec<String>,
}

impl Default for SectionVocabulary {
    fn default() -> Self {
        Self {
            entries: Section::MATCH_PRIORITY
                .iter()
                .map(|&section| SectionEntry {
                    section,
                    title: section.default_title().to_string(),
                    keywords: section
                        .default_keywords()
                        .iter()
                        .map(|k| k.to_lowercase())
                        .collect(),
                })
                .collect(),
        }
    }
}

impl SectionVocabulary {
    pub fn title(&self, section: Section) -> &str {
        self.entry(section)
            .map(|e| e.title.as_str())
            .unwrap_or_else(|| section.default_title())
    }

    pub fn set_title(&mut self, section: Section, title: impl Into<String>) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.section == section) {
            entry.title = title.into();
        }
    }

    /// Replace the keyword set of a section. Keywords are matched
    /// against the lowercased identifier, so they are lowercased here.
    pub fn set_keywords<I, S>(&mut self, section: Section, keywords: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.section == section) {
            entry.keywords = keywords
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .collect();
        }
    }

    /// First section in match priority whose keyword occurs anywhere in
    /// the lowercased identifier; `General` when none does.
    pub fn classify(&self, id: &str) -> Section {
        let folded = id.to_lowercase();
        self.entries
            .iter()
            .find(|entry| {
                entry
                    .keywords
                    .iter()
                    .any(|k| !k.is_empty() && folded.contains(k.as_str()))
            })
            .map(|entry| entry.section)
            .unwrap_or(Section::General)
    }

    fn entry(&self, section: Section) -> Option<&SectionEntry> {
        self.entries.iter().find(|e| e.section == section)
    }
}

/// A field placed into a section, with its resolved display label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupedField {
    pub id: String,
    pub label: String,
}

/// Fields bucketed by section, in render order, each bucket in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupMap {
    groups: Vec<(Section, Vec<GroupedField>)>,
}

impl GroupMap {
    pub fn build(fields: &FieldMap, labels: &LabelMap, vocabulary: &SectionVocabulary) -> Self {
        let mut groups: Vec<(Section, Vec<GroupedField>)> =
            Section::ALL.iter().map(|&s| (s, Vec::new())).collect();

        for id in fields.keys() {
            let section = vocabulary.classify(id);
            let grouped = GroupedField {
                id: id.to_string(),
                label: labels.label_for(id),
            };
            if let Some((_, bucket)) = groups.iter_mut().find(|(s, _)| *s == section) {
                bucket.push(grouped);
            }
        }

        Self { groups }
    }

    pub fn fields(&self, section: Section) -> &[GroupedField] {
        self.groups
            .iter()
            .find(|(s, _)| *s == section)
            .map(|(_, fields)| fields.as_slice())
            .unwrap_or(&[])
    }

    /// Non-empty buckets in render order.
    pub fn iter(&self) -> impl Iterator<Item = (Section, &[GroupedField])> {
        self.groups
            .iter()
            .filter(|(_, fields)| !fields.is_empty())
            .map(|(s, fields)| (*s, fields.as_slice()))
    }

    pub fn total(&self) -> usize {
        self.groups.iter().map(|(_, fields)| fields.len()).sum()
    }
}
