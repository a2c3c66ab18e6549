//! Core data models for the CMIF pipeline.
//!
//! These types represent the normalized letters, cross-reference indices, and
//! dataset metadata that flow from the extractors to every downstream
//! consumer. The serialized JSON field names (`dateTo`, `datePrecision`,
//! `place_sent`, `lowCertainty`, ...) are a stable contract: results are
//! round-tripped through files and the `cmif enrich` subcommand, so renaming
//! a field is a breaking change.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Precision of a letter's date, derived from the TEI date attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatePrecision {
    Day,
    Month,
    Year,
    Range,
    Unknown,
}

/// Source-supplied certainty of a date (`@cert`), orthogonal to precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateCertainty {
    High,
    Medium,
    Low,
}

/// How well a person could be identified from name and authority reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonPrecision {
    Identified,
    Named,
    Partial,
    Unknown,
}

/// How well a place could be resolved. `Exact` means a GeoNames id exists,
/// not that coordinates have been attached yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlacePrecision {
    Exact,
    Region,
    Unknown,
}

/// A parsed authority-file reference (GND, VIAF, LoC, BnF, or `unknown`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorityRef {
    /// Authority system: `"gnd"`, `"viaf"`, `"loc"`, `"bnf"`, or `"unknown"`.
    pub authority: String,
    /// Identifier within that system, or the raw URI for `"unknown"`.
    pub id: String,
}

/// A sender or recipient as embedded in a [`Letter`].
///
/// The `precision` field is absent (`None`) for letters coming from the
/// correspSearch API, which does not expose enough information to classify.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub id: Option<String>,
    pub authority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub precision: Option<PersonPrecision>,
    #[serde(
        rename = "isOrganization",
        skip_serializing_if = "std::ops::Not::not",
        default
    )]
    pub is_organization: bool,
}

/// A sending place as embedded in a [`Letter`]. `lat`/`lon` stay `None`
/// until coordinate enrichment runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub geonames_id: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub precision: Option<PlacePrecision>,
}

/// Language of a letter, from a `hasLanguage`-typed note reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Language {
    pub code: String,
    pub label: String,
}

/// An entity referenced in a letter's explanatory note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    pub label: String,
    pub target: Option<String>,
}

/// Entities mentioned in a letter's note, grouped by category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mentions {
    pub subjects: Vec<Mention>,
    pub persons: Vec<Mention>,
    pub places: Vec<Mention>,
}

/// One normalized correspondence event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Letter {
    pub id: String,
    pub url: Option<String>,
    pub date: Option<String>,
    #[serde(rename = "dateTo")]
    pub date_to: Option<String>,
    pub year: Option<i32>,
    #[serde(
        rename = "datePrecision",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub date_precision: Option<DatePrecision>,
    #[serde(
        rename = "dateCertainty",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub date_certainty: Option<DateCertainty>,
    pub sender: Option<Person>,
    pub recipient: Option<Person>,
    pub place_sent: Option<Place>,
    pub language: Option<Language>,
    #[serde(default)]
    pub mentions: Mentions,
}

impl Letter {
    /// An empty letter with the given id. Extractors fill in what the
    /// source supplies; everything else stays `None`.
    pub fn empty(id: String) -> Self {
        Letter {
            id,
            url: None,
            date: None,
            date_to: None,
            year: None,
            date_precision: None,
            date_certainty: None,
            sender: None,
            recipient: None,
            place_sent: None,
            language: None,
            mentions: Mentions::default(),
        }
    }
}

/// Aggregated statistics for one unique person.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonEntry {
    pub name: String,
    pub authority: Option<String>,
    pub letter_count: u64,
    pub as_sender: u64,
    pub as_recipient: u64,
}

/// Aggregated statistics for one unique place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaceEntry {
    pub name: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub letter_count: u64,
}

/// Aggregated statistics for one language code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LanguageEntry {
    pub code: String,
    pub label: String,
    pub letter_count: u64,
}

/// Aggregated statistics for one mentioned subject.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectEntry {
    pub label: String,
    pub letter_count: u64,
}

/// Cross-reference maps built in a single pass over the letter list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Indices {
    pub persons: BTreeMap<String, PersonEntry>,
    pub places: BTreeMap<String, PlaceEntry>,
    pub subjects: BTreeMap<String, SubjectEntry>,
    pub languages: BTreeMap<String, LanguageEntry>,
}

/// Min/max year over all letters with a usable date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub min: Option<i32>,
    pub max: Option<i32>,
}

/// Date-precision distribution plus a separate low-certainty tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateUncertainty {
    pub day: u64,
    pub month: u64,
    pub year: u64,
    pub range: u64,
    pub unknown: u64,
    #[serde(rename = "lowCertainty")]
    pub low_certainty: u64,
}

/// Person-precision distribution; `missing` counts letters without the role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonUncertainty {
    pub identified: u64,
    pub named: u64,
    pub partial: u64,
    pub unknown: u64,
    pub missing: u64,
}

/// Place-precision distribution; `missing` counts letters without a place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceUncertainty {
    pub exact: u64,
    pub region: u64,
    pub unknown: u64,
    pub missing: u64,
}

/// Full uncertainty cross-tabulation over one letter list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Uncertainty {
    pub dates: DateUncertainty,
    pub senders: PersonUncertainty,
    pub recipients: PersonUncertainty,
    pub places: PlaceUncertainty,
}

/// Dataset-level summary, computed once after extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    pub title: Option<String>,
    pub publisher: Option<String>,
    pub total_letters: u64,
    pub unique_senders: u64,
    pub unique_recipients: u64,
    pub unique_places: u64,
    pub date_range: DateRange,
    pub uncertainty: Uncertainty,
    pub generated: String,
}

/// The complete pipeline result consumed by all presentation layers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CmifResult {
    pub letters: Vec<Letter>,
    pub indices: Indices,
    pub meta: Meta,
}

/// Deterministic fallback ids for letters whose source supplies no
/// `ref`/`key`. Owned by the extractor instance, so every pipeline
/// invocation starts counting fresh. Callers must not rely on the exact
/// generated values.
#[derive(Debug, Default)]
pub struct FallbackIds {
    next: u64,
}

impl FallbackIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> String {
        self.next += 1;
        format!("letter-{:06}", self.next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_fields_are_absent_when_unset() {
        let person = Person {
            name: "NN".to_string(),
            id: None,
            authority: None,
            precision: None,
            is_organization: false,
        };
        let json = serde_json::to_value(&person).unwrap();
        assert!(json.get("precision").is_none());
        assert!(json.get("isOrganization").is_none());
        // id/authority are part of the stable shape even when null
        assert!(json.get("id").unwrap().is_null());
    }

    #[test]
    fn letter_wire_names_are_stable() {
        let mut letter = Letter::empty("l1".to_string());
        letter.date = Some("1798-05-03".to_string());
        letter.date_precision = Some(DatePrecision::Day);
        letter.date_certainty = Some(DateCertainty::High);
        let json = serde_json::to_value(&letter).unwrap();
        assert_eq!(json["datePrecision"], "day");
        assert_eq!(json["dateCertainty"], "high");
        assert!(json.get("dateTo").is_some());
        assert!(json.get("place_sent").is_some());
    }

    #[test]
    fn fallback_ids_are_deterministic_per_instance() {
        let mut a = FallbackIds::new();
        let mut b = FallbackIds::new();
        assert_eq!(a.next_id(), b.next_id());
        assert_ne!(a.next_id(), a.next_id());
    }
}
