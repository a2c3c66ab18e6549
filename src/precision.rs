//! Precision and certainty classification.
//!
//! Every extracted person, place, and date carries a discrete precision
//! level so the UI can flag uncertain data instead of silently dropping it.
//! The guiding policy is: extract everything, classify uncertainty
//! explicitly, never crash on missing metadata.

use crate::models::{AuthorityRef, DateCertainty, DatePrecision, PersonPrecision, PlacePrecision};

/// Names that mean "person entirely unknown" when they are the whole name.
const UNKNOWN_PERSON_NAMES: &[&str] = &["[NN]", "N.N.", "Unbekannt", "Unknown", "???"];

/// Markers that flag a partially unknown name anywhere inside it.
const PARTIAL_NAME_MARKERS: &[&str] = &["[NN]", "[N.N.]", "[?]"];

/// Names that mean "place unknown" when they are the whole name.
const UNKNOWN_PLACE_NAMES: &[&str] = &["Unbekannt", "Unknown", "???", "[?]", "s.l."];

/// Classify a person by name and (optional) resolved authority reference.
///
/// The pattern checks run before the authority check on purpose: a name
/// like `"[NN] von Arnim"` with a GND id still classifies as `Partial`,
/// since uncertainty in the name itself outranks a resolvable identifier.
pub fn classify_person(name: &str, authority: Option<&AuthorityRef>) -> PersonPrecision {
    let name = name.trim();
    if name.is_empty() {
        return PersonPrecision::Unknown;
    }
    if UNKNOWN_PERSON_NAMES
        .iter()
        .any(|p| name.eq_ignore_ascii_case(p))
    {
        return PersonPrecision::Unknown;
    }
    let upper = name.to_uppercase();
    if PARTIAL_NAME_MARKERS.iter().any(|m| upper.contains(m)) {
        return PersonPrecision::Partial;
    }
    if authority.is_some() {
        return PersonPrecision::Identified;
    }
    PersonPrecision::Named
}

/// Classify a place by name and (optional) GeoNames id. `Exact` is a
/// statement about resolvability, not about attached coordinates.
pub fn classify_place(name: &str, geonames_id: Option<&str>) -> PlacePrecision {
    let name = name.trim();
    if name.is_empty() {
        return PlacePrecision::Unknown;
    }
    if UNKNOWN_PLACE_NAMES
        .iter()
        .any(|p| name.eq_ignore_ascii_case(p))
    {
        return PlacePrecision::Unknown;
    }
    if geonames_id.is_some() {
        return PlacePrecision::Exact;
    }
    PlacePrecision::Region
}

/// Raw TEI date attributes as found on a `<date>` element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateAttrs {
    pub when: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub not_before: Option<String>,
    pub not_after: Option<String>,
    pub cert: Option<String>,
}

/// A date after classification, ready to embed in a letter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedDate {
    pub date: Option<String>,
    pub date_to: Option<String>,
    pub precision: Option<DatePrecision>,
    pub certainty: Option<DateCertainty>,
    pub year: Option<i32>,
}

/// Derive precision, certainty, and the normalized date pair from raw
/// TEI attributes.
///
/// `from`+`to` together, or either `notBefore`/`notAfter`, make a range;
/// otherwise `when` is classified by its length (`YYYY-MM-DD`, `YYYY-MM`,
/// `YYYY`). An open-ended range falls back to its start value for
/// `date_to`, so a `Range` letter always carries both endpoints.
pub fn classify_date(attrs: &DateAttrs) -> ClassifiedDate {
    let certainty = Some(parse_certainty(attrs.cert.as_deref()));
    let is_range = (attrs.from.is_some() && attrs.to.is_some())
        || attrs.not_before.is_some()
        || attrs.not_after.is_some();

    let (date, date_to, precision) = if is_range {
        let date = attrs
            .from
            .clone()
            .or_else(|| attrs.not_before.clone())
            .or_else(|| attrs.when.clone())
            .or_else(|| attrs.not_after.clone());
        let date_to = attrs
            .to
            .clone()
            .or_else(|| attrs.not_after.clone())
            .or_else(|| date.clone());
        (date, date_to, Some(DatePrecision::Range))
    } else if let Some(when) = attrs.when.clone() {
        let precision = match when.len() {
            10 => DatePrecision::Day,
            7 => DatePrecision::Month,
            4 => DatePrecision::Year,
            _ => DatePrecision::Unknown,
        };
        (Some(when), None, Some(precision))
    } else {
        (attrs.from.clone(), None, Some(DatePrecision::Unknown))
    };

    let year = date.as_deref().and_then(year_of);
    ClassifiedDate {
        date,
        date_to,
        precision,
        certainty,
        year,
    }
}

/// Year from the first four characters of an ISO-partial date string.
pub fn year_of(date: &str) -> Option<i32> {
    date.get(..4)?.parse().ok()
}

fn parse_certainty(cert: Option<&str>) -> DateCertainty {
    match cert.map(str::trim) {
        Some(c) if c.eq_ignore_ascii_case("low") => DateCertainty::Low,
        Some(c) if c.eq_ignore_ascii_case("medium") => DateCertainty::Medium,
        _ => DateCertainty::High,
    }
}
