//! Dataset metadata and uncertainty aggregation.
//!
//! One pass over the letter list after index construction: the date range,
//! name-or-id unique counts, and the full uncertainty cross-tabulation a
//! dashboard can render without further computation.
//!
//! The unique counts intentionally differ from the persons/places index:
//! the index (TEI path) only holds identified entities, while the counts
//! here include unidentified ones by display name. Two-tier counting —
//! drill-down vs. headline statistics.

use std::collections::BTreeSet;

use crate::models::{
    DateCertainty, DatePrecision, DateUncertainty, Letter, Meta, Person, PersonPrecision,
    PersonUncertainty, PlacePrecision,
};

/// Compute the dataset-level [`Meta`] summary.
pub fn build_meta(letters: &[Letter], title: Option<String>, publisher: Option<String>) -> Meta {
    let mut meta = Meta {
        title,
        publisher,
        total_letters: letters.len() as u64,
        generated: chrono::Utc::now().to_rfc3339(),
        ..Default::default()
    };

    let mut senders: BTreeSet<String> = BTreeSet::new();
    let mut recipients: BTreeSet<String> = BTreeSet::new();
    let mut places: BTreeSet<String> = BTreeSet::new();

    for letter in letters {
        if let Some(year) = letter.year {
            meta.date_range.min = Some(meta.date_range.min.map_or(year, |m| m.min(year)));
            meta.date_range.max = Some(meta.date_range.max.map_or(year, |m| m.max(year)));
        }

        tally_date(&mut meta.uncertainty.dates, letter);
        tally_person(
            &mut meta.uncertainty.senders,
            &mut senders,
            letter.sender.as_ref(),
        );
        tally_person(
            &mut meta.uncertainty.recipients,
            &mut recipients,
            letter.recipient.as_ref(),
        );

        match &letter.place_sent {
            Some(place) => {
                if let Some(key) = place
                    .geonames_id
                    .clone()
                    .or_else(|| (!place.name.is_empty()).then(|| place.name.clone()))
                {
                    places.insert(key);
                }
                match place.precision {
                    Some(PlacePrecision::Exact) => meta.uncertainty.places.exact += 1,
                    Some(PlacePrecision::Region) => meta.uncertainty.places.region += 1,
                    Some(PlacePrecision::Unknown) => meta.uncertainty.places.unknown += 1,
                    // correspSearch letters carry no place precision
                    None => {}
                }
            }
            None => meta.uncertainty.places.missing += 1,
        }
    }

    meta.unique_senders = senders.len() as u64;
    meta.unique_recipients = recipients.len() as u64;
    meta.unique_places = places.len() as u64;
    meta
}

fn tally_date(dates: &mut DateUncertainty, letter: &Letter) {
    match letter.date_precision {
        Some(DatePrecision::Day) => dates.day += 1,
        Some(DatePrecision::Month) => dates.month += 1,
        Some(DatePrecision::Year) => dates.year += 1,
        Some(DatePrecision::Range) => dates.range += 1,
        Some(DatePrecision::Unknown) | None => dates.unknown += 1,
    }
    if letter.date_certainty == Some(DateCertainty::Low) {
        dates.low_certainty += 1;
    }
}

fn tally_person(
    buckets: &mut PersonUncertainty,
    uniques: &mut BTreeSet<String>,
    person: Option<&Person>,
) {
    match person {
        Some(p) => {
            if let Some(key) = p
                .id
                .clone()
                .or_else(|| (!p.name.is_empty()).then(|| p.name.clone()))
            {
                uniques.insert(key);
            }
            match p.precision {
                Some(PersonPrecision::Identified) => buckets.identified += 1,
                Some(PersonPrecision::Named) => buckets.named += 1,
                Some(PersonPrecision::Partial) => buckets.partial += 1,
                Some(PersonPrecision::Unknown) => buckets.unknown += 1,
                // correspSearch letters carry no person precision
                None => {}
            }
        }
        None => buckets.missing += 1,
    }
}
