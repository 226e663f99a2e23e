//! Epicrisis composition: turns a flat map of visit-form fields into a
//! sectioned, human-readable clinical summary.
//!
//! Fields are labeled (explicit `LabelMap` or a label derived from the
//! identifier), bucketed into eight fixed clinical sections by keyword
//! match on the identifier, normalized (checkbox-like values become
//! checked / unchecked) and rendered. Everything is a pure function of
//! the input and the composer configuration.

pub mod compose;
pub mod label;
pub mod section;
pub mod value;

pub use compose::{compose, Composer, HeaderCaptions};
pub use label::{derive_label, LabelMap};
pub use section::{GroupMap, GroupedField, Section, SectionVocabulary};
pub use value::{FieldMap, FieldValue, Normalized};
