use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// Short prefixes that carry no meaning in a label. Alternatives are tried
/// in order, so `sy` shadows `syp` and `sym`.
static NOISE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(sy|syp|sym|s__?)").expect("valid prefix regex"));
static SEPARATOR_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[_\-]+").expect("valid separator regex"));
static CAMEL_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\p{Ll}0-9])(\p{Lu})").expect("valid camel-case regex"));
static SPACE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" {2,}").expect("valid space regex"));

/// Explicit display labels keyed by field identifier.
#[derive(Debug, Clone, Default)]
pub struct LabelMap {
    labels: HashMap<String, String>,
}

impl LabelMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: impl Into<String>, label: impl Into<String>) -> Self {
        self.insert(id, label);
        self
    }

    pub fn insert(&mut self, id: impl Into<String>, label: impl Into<String>) {
        self.labels.insert(id.into(), label.into());
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.labels.get(id).map(String::as_str)
    }

    /// Explicit label if one is registered, derived label otherwise.
    pub fn label_for(&self, id: &str) -> String {
        self.get(id)
            .map(str::to_string)
            .unwrap_or_else(|| derive_label(id))
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LabelMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            labels: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Turn a field identifier into a human-readable label.
///
/// `feverTemp` becomes `Fever temp`, `skin_color` becomes `Skin color`.
pub fn derive_label(id: &str) -> String {
    let stripped = NOISE_PREFIX.replace(id, "");
    let spaced = SEPARATOR_RUNS.replace_all(&stripped, " ");
    let split = CAMEL_BOUNDARY.replace_all(&spaced, "$1 $2");
    let collapsed = SPACE_RUNS.replace_all(split.trim(), " ");
    capitalize(&collapsed)
}

/// Uppercase the first character and lowercase the rest.
fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_case_is_split_and_capitalized() {
        assert_eq!(derive_label("feverTemp"), "Fever temp");
        assert_eq!(derive_label("heartRateMax"), "Heart rate max");
    }

    #[test]
    fn separators_become_single_spaces() {
        assert_eq!(derive_label("skin__color"), "Skin color");
        assert_eq!(derive_label("blood-_-pressure"), "Blood pressure");
        assert_eq!(derive_label("_edema_"), "Edema");
    }

    #[test]
    fn noise_prefixes_are_stripped_case_insensitively() {
        assert_eq!(derive_label("s_cough"), "Cough");
        assert_eq!(derive_label("s__edema"), "Edema");
        assert_eq!(derive_label("SYcough"), "Cough");
    }

    #[test]
    fn shortest_prefix_wins() {
        assert_eq!(derive_label("sypSkin"), "P skin");
        assert_eq!(derive_label("SYMnausea"), "Mnausea");
        assert_eq!(derive_label("symptomCough"), "Mptom cough");
    }

    #[test]
    fn identifier_made_only_of_prefix_has_empty_label() {
        assert_eq!(derive_label("sy"), "");
        assert_eq!(derive_label("S_"), "");
    }

    #[test]
    fn digits_before_uppercase_split() {
        assert_eq!(derive_label("dose2Morning"), "Dose2 morning");
    }

    #[test]
    fn cyrillic_camel_case_splits() {
        assert_eq!(derive_label("кожаБледная"), "Кожа бледная");
    }

    #[test]
    fn non_ascii_identifier_does_not_panic_on_prefix_check() {
        assert_eq!(derive_label("ж"), "Ж");
    }

    #[test]
    fn explicit_label_wins() {
        let labels = LabelMap::new().with("rash", "Сыпь");
        assert_eq!(labels.label_for("rash"), "Сыпь");
        assert_eq!(labels.label_for("feverTemp"), "Fever temp");
    }
}
