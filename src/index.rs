//! Cross-reference index construction.
//!
//! A single pass over the letter list upserts senders, recipients, places,
//! languages, and mentioned subjects into per-entity statistics maps.
//! Counters only ever increase within one pipeline run.

use crate::models::{
    Indices, LanguageEntry, Letter, Person, PersonEntry, Place, PlaceEntry, SubjectEntry,
};

/// How index keys are chosen.
///
/// The TEI path keys persons by authority id and places by GeoNames id
/// only, silently skipping unidentified entities — the index is for
/// identified-entity drill-down, while the meta-level unique counts
/// separately include unidentified entities by name. The correspSearch
/// path is intentionally less strict and falls back to the display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKeying {
    AuthorityId,
    IdOrName,
}

#[derive(Debug, Clone, Copy)]
enum Role {
    Sender,
    Recipient,
}

/// Build all four index maps in one pass.
pub fn build_indices(letters: &[Letter], keying: IndexKeying) -> Indices {
    let mut indices = Indices::default();
    for letter in letters {
        if let Some(person) = &letter.sender {
            upsert_person(&mut indices, person, Role::Sender, keying);
        }
        if let Some(person) = &letter.recipient {
            upsert_person(&mut indices, person, Role::Recipient, keying);
        }
        if let Some(place) = &letter.place_sent {
            upsert_place(&mut indices, place, keying);
        }
        if let Some(language) = &letter.language {
            let entry = indices
                .languages
                .entry(language.code.clone())
                .or_insert_with(|| LanguageEntry {
                    code: language.code.clone(),
                    label: language.label.clone(),
                    letter_count: 0,
                });
            entry.letter_count += 1;
        }
        for subject in &letter.mentions.subjects {
            if subject.label.is_empty() {
                continue;
            }
            let entry = indices
                .subjects
                .entry(subject.label.clone())
                .or_insert_with(|| SubjectEntry {
                    label: subject.label.clone(),
                    letter_count: 0,
                });
            entry.letter_count += 1;
        }
    }
    indices
}

fn person_key(person: &Person, keying: IndexKeying) -> Option<String> {
    match keying {
        IndexKeying::AuthorityId => person.id.clone(),
        IndexKeying::IdOrName => person
            .id
            .clone()
            .or_else(|| (!person.name.is_empty()).then(|| person.name.clone())),
    }
}

fn upsert_person(indices: &mut Indices, person: &Person, role: Role, keying: IndexKeying) {
    let Some(key) = person_key(person, keying) else {
        return;
    };
    let entry = indices
        .persons
        .entry(key)
        .or_insert_with(|| PersonEntry {
            name: person.name.clone(),
            authority: person.authority.clone(),
            letter_count: 0,
            as_sender: 0,
            as_recipient: 0,
        });
    entry.letter_count += 1;
    match role {
        Role::Sender => entry.as_sender += 1,
        Role::Recipient => entry.as_recipient += 1,
    }
}

fn upsert_place(indices: &mut Indices, place: &Place, keying: IndexKeying) {
    let key = match keying {
        IndexKeying::AuthorityId => place.geonames_id.clone(),
        IndexKeying::IdOrName => place
            .geonames_id
            .clone()
            .or_else(|| (!place.name.is_empty()).then(|| place.name.clone())),
    };
    let Some(key) = key else {
        return;
    };
    let entry = indices.places.entry(key).or_insert_with(|| PlaceEntry {
        name: place.name.clone(),
        lat: place.lat,
        lon: place.lon,
        letter_count: 0,
    });
    entry.letter_count += 1;
}
