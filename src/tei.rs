//! TEI-XML letter extraction.
//!
//! Walks a CMIF document (TEI namespace `http://www.tei-c.org/ns/1.0`) with
//! quick-xml's namespace-aware reader and produces one normalized
//! [`Letter`] per `correspDesc` element. Elements bound to a non-TEI
//! namespace are ignored; unbound elements are accepted so that plain,
//! un-namespaced exports still parse.
//!
//! Extraction is deliberately complete rather than selective: a
//! `correspDesc` that yields an entirely empty letter is still pushed.
//! Quality filtering is a downstream concern.

use anyhow::{bail, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;

use crate::models::{FallbackIds, Language, Letter, Mention, Mentions, Person, PersonPrecision, Place};
use crate::precision::{classify_date, classify_person, classify_place, DateAttrs};
use crate::refs::{parse_authority_ref, parse_geonames_ref, trailing_segment};

const TEI_NS: &[u8] = b"http://www.tei-c.org/ns/1.0";

/// Result of extracting one TEI document: the letters plus the dataset
/// title and publisher from the file header.
#[derive(Debug, Default)]
pub struct TeiDocument {
    pub letters: Vec<Letter>,
    pub title: Option<String>,
    pub publisher: Option<String>,
}

/// Extract all `correspDesc` letters from a TEI-XML string.
///
/// Malformed XML is fatal to the whole call; the parser's message is
/// surfaced verbatim. Missing metadata inside a well-formed document is
/// never an error.
pub fn extract_tei(xml: &str) -> Result<TeiDocument> {
    let mut reader = NsReader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut walker = Walker::default();
    loop {
        match reader.read_resolved_event() {
            Ok((ns, Event::Start(e))) => walker.open(&ns, &e, false),
            Ok((ns, Event::Empty(e))) => walker.open(&ns, &e, true),
            Ok((ns, Event::End(e))) => {
                let local = e.local_name().as_ref().to_vec();
                walker.close(&ns, &local);
            }
            Ok((_, Event::Text(t))) => {
                let text = t.unescape().unwrap_or_default();
                walker.text(&text);
            }
            Ok((_, Event::Eof)) => break,
            Ok(_) => {}
            Err(e) => bail!("XML parse error: {}", e),
        }
    }
    Ok(walker.finish())
}

fn is_tei(ns: &ResolveResult) -> bool {
    match ns {
        ResolveResult::Unbound => true,
        ResolveResult::Bound(Namespace(n)) => *n == TEI_NS,
        ResolveResult::Unknown(_) => false,
    }
}

fn attr(e: &BytesStart, name: &str) -> Option<String> {
    e.try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Which correspAction the walker is currently inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActionKind {
    Sent,
    Received,
    Other,
}

/// Note-reference categories, matched by substring on the `type` attribute
/// to tolerate value variants across source files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NoteRefKind {
    Language,
    Subject,
    Person,
    Place,
}

/// What the current text capture will be committed as.
#[derive(Debug)]
enum CaptureKind {
    Title,
    Publisher,
    PersName { ref_attr: Option<String> },
    OrgName { ref_attr: Option<String> },
    PlaceName { ref_attr: Option<String> },
    NoteRef { kind: NoteRefKind, target: Option<String> },
}

#[derive(Debug)]
struct Capture {
    kind: CaptureKind,
    depth: usize,
    buf: String,
}

/// Raw fields collected from one `correspAction`.
#[derive(Debug, Default)]
struct ActionData {
    pers_name: Option<String>,
    pers_ref: Option<String>,
    org_name: Option<String>,
    org_ref: Option<String>,
    place_name: Option<String>,
    place_ref: Option<String>,
    date: Option<DateAttrs>,
}

/// In-progress state for one `correspDesc`.
#[derive(Debug, Default)]
struct DescBuilder {
    url: Option<String>,
    key: Option<String>,
    action: Option<ActionKind>,
    sent: ActionData,
    received: ActionData,
    in_note: bool,
    language: Option<Language>,
    mentions: Mentions,
}

#[derive(Default)]
struct Walker {
    depth: usize,
    in_title_stmt: bool,
    in_publication_stmt: bool,
    capture: Option<Capture>,
    desc: Option<DescBuilder>,
    doc: TeiDocument,
    ids: FallbackIds,
}

impl Walker {
    fn open(&mut self, ns: &ResolveResult, e: &BytesStart, self_closing: bool) {
        if !self_closing {
            self.depth += 1;
        }
        // nested markup inside a captured element only contributes text
        if self.capture.is_some() || !is_tei(ns) {
            return;
        }

        match e.local_name().as_ref() {
            b"titleStmt" if self.desc.is_none() => self.in_title_stmt = true,
            b"publicationStmt" if self.desc.is_none() => self.in_publication_stmt = true,
            b"title" if self.in_title_stmt && self.doc.title.is_none() => {
                self.begin(CaptureKind::Title, self_closing);
            }
            b"publisher" if self.in_publication_stmt && self.doc.publisher.is_none() => {
                self.begin(CaptureKind::Publisher, self_closing);
            }
            b"correspDesc" => {
                let builder = DescBuilder {
                    url: attr(e, "ref"),
                    key: attr(e, "key"),
                    ..Default::default()
                };
                if self_closing {
                    let letter = build_letter(builder, &mut self.ids);
                    self.doc.letters.push(letter);
                } else {
                    self.desc = Some(builder);
                }
            }
            b"correspAction" => {
                if let Some(desc) = &mut self.desc {
                    desc.action = Some(match attr(e, "type").as_deref() {
                        Some("sent") => ActionKind::Sent,
                        Some("received") => ActionKind::Received,
                        _ => ActionKind::Other,
                    });
                }
            }
            b"persName" => {
                if self.in_action() {
                    self.begin(
                        CaptureKind::PersName {
                            ref_attr: attr(e, "ref"),
                        },
                        self_closing,
                    );
                }
            }
            b"orgName" => {
                if self.in_action() {
                    self.begin(
                        CaptureKind::OrgName {
                            ref_attr: attr(e, "ref"),
                        },
                        self_closing,
                    );
                }
            }
            b"placeName" => {
                if self.in_action() {
                    self.begin(
                        CaptureKind::PlaceName {
                            ref_attr: attr(e, "ref"),
                        },
                        self_closing,
                    );
                }
            }
            b"date" => {
                let attrs = DateAttrs {
                    when: attr(e, "when"),
                    from: attr(e, "from"),
                    to: attr(e, "to"),
                    not_before: attr(e, "notBefore"),
                    not_after: attr(e, "notAfter"),
                    cert: attr(e, "cert"),
                };
                if let Some(action) = self.current_action() {
                    if action.date.is_none() {
                        action.date = Some(attrs);
                    }
                }
            }
            b"note" => {
                if let Some(desc) = &mut self.desc {
                    desc.in_note = true;
                }
            }
            b"ref" => {
                let in_note = self.desc.as_ref().map(|d| d.in_note).unwrap_or(false);
                if in_note {
                    let kind = attr(e, "type").and_then(|t| note_ref_kind(&t));
                    if let Some(kind) = kind {
                        self.begin(
                            CaptureKind::NoteRef {
                                kind,
                                target: attr(e, "target"),
                            },
                            self_closing,
                        );
                    }
                }
            }
            _ => {}
        }
    }

    fn close(&mut self, ns: &ResolveResult, local: &[u8]) {
        if let Some(capture) = &self.capture {
            if capture.depth == self.depth {
                let capture = self.capture.take().unwrap();
                self.commit(capture);
            }
        }
        if is_tei(ns) {
            match local {
                b"titleStmt" => self.in_title_stmt = false,
                b"publicationStmt" => self.in_publication_stmt = false,
                b"correspAction" => {
                    if let Some(desc) = &mut self.desc {
                        desc.action = None;
                    }
                }
                b"note" => {
                    if let Some(desc) = &mut self.desc {
                        desc.in_note = false;
                    }
                }
                b"correspDesc" => {
                    if let Some(builder) = self.desc.take() {
                        let letter = build_letter(builder, &mut self.ids);
                        self.doc.letters.push(letter);
                    }
                }
                _ => {}
            }
        }
        self.depth = self.depth.saturating_sub(1);
    }

    fn text(&mut self, text: &str) {
        if let Some(capture) = &mut self.capture {
            if !capture.buf.is_empty() && !capture.buf.ends_with(' ') {
                capture.buf.push(' ');
            }
            capture.buf.push_str(text.trim());
        }
    }

    fn begin(&mut self, kind: CaptureKind, self_closing: bool) {
        let capture = Capture {
            kind,
            depth: self.depth,
            buf: String::new(),
        };
        if self_closing {
            // no content will follow, commit with empty text right away
            self.commit(capture);
        } else {
            self.capture = Some(capture);
        }
    }

    fn in_action(&self) -> bool {
        self.desc
            .as_ref()
            .map(|d| matches!(d.action, Some(ActionKind::Sent) | Some(ActionKind::Received)))
            .unwrap_or(false)
    }

    fn current_action(&mut self) -> Option<&mut ActionData> {
        let desc = self.desc.as_mut()?;
        match desc.action {
            Some(ActionKind::Sent) => Some(&mut desc.sent),
            Some(ActionKind::Received) => Some(&mut desc.received),
            _ => None,
        }
    }

    fn commit(&mut self, capture: Capture) {
        let text = capture.buf.trim().to_string();
        match capture.kind {
            CaptureKind::Title => {
                if !text.is_empty() {
                    self.doc.title = Some(text);
                }
            }
            CaptureKind::Publisher => {
                if !text.is_empty() {
                    self.doc.publisher = Some(text);
                }
            }
            CaptureKind::PersName { ref_attr } => {
                if let Some(action) = self.current_action() {
                    if action.pers_name.is_none() {
                        action.pers_name = Some(text);
                        action.pers_ref = ref_attr;
                    }
                }
            }
            CaptureKind::OrgName { ref_attr } => {
                if let Some(action) = self.current_action() {
                    if action.org_name.is_none() {
                        action.org_name = Some(text);
                        action.org_ref = ref_attr;
                    }
                }
            }
            CaptureKind::PlaceName { ref_attr } => {
                if let Some(action) = self.current_action() {
                    if action.place_name.is_none() {
                        action.place_name = Some(text);
                        action.place_ref = ref_attr;
                    }
                }
            }
            CaptureKind::NoteRef { kind, target } => {
                if let Some(desc) = &mut self.desc {
                    match kind {
                        NoteRefKind::Language => {
                            if desc.language.is_none() {
                                desc.language = Some(language_from(target, text));
                            }
                        }
                        NoteRefKind::Subject => desc.mentions.subjects.push(Mention {
                            label: text,
                            target,
                        }),
                        NoteRefKind::Person => desc.mentions.persons.push(Mention {
                            label: text,
                            target,
                        }),
                        NoteRefKind::Place => desc.mentions.places.push(Mention {
                            label: text,
                            target,
                        }),
                    }
                }
            }
        }
    }

    fn finish(self) -> TeiDocument {
        self.doc
    }
}

/// Substring match on the `type` attribute, not exact comparison, so that
/// prefixed variants like `cmif:mentionsPerson` are recognized.
fn note_ref_kind(type_attr: &str) -> Option<NoteRefKind> {
    if type_attr.contains("hasLanguage") {
        Some(NoteRefKind::Language)
    } else if type_attr.contains("mentionsSubject") {
        Some(NoteRefKind::Subject)
    } else if type_attr.contains("mentionsPerson") {
        Some(NoteRefKind::Person)
    } else if type_attr.contains("mentionsPlace") {
        Some(NoteRefKind::Place)
    } else {
        None
    }
}

fn language_from(target: Option<String>, label: String) -> Language {
    let code = target
        .as_deref()
        .map(trailing_segment)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| label.to_lowercase());
    Language { code, label }
}

fn build_letter(builder: DescBuilder, ids: &mut FallbackIds) -> Letter {
    let id = builder
        .url
        .as_deref()
        .or(builder.key.as_deref())
        .map(trailing_segment)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| ids.next_id());

    let mut letter = Letter::empty(id);
    letter.url = builder.url;
    letter.sender = person_from_action(&builder.sent);
    letter.recipient = person_from_action(&builder.received);
    letter.place_sent = place_from_action(&builder.sent);

    // date and place are read from the sent action only
    let date = classify_date(&builder.sent.date.unwrap_or_default());
    letter.date = date.date;
    letter.date_to = date.date_to;
    letter.year = date.year;
    letter.date_precision = date.precision;
    letter.date_certainty = date.certainty;

    letter.language = builder.language;
    letter.mentions = builder.mentions;
    letter
}

/// Prefer `persName` over `orgName`. Organizations carry no
/// identity-uncertainty model, so they are always classified `Named`.
fn person_from_action(action: &ActionData) -> Option<Person> {
    if action.pers_name.is_some() || action.pers_ref.is_some() {
        person_from(
            action.pers_name.clone(),
            action.pers_ref.clone(),
            false,
        )
    } else if action.org_name.is_some() || action.org_ref.is_some() {
        person_from(action.org_name.clone(), action.org_ref.clone(), true)
    } else {
        None
    }
}

fn person_from(name: Option<String>, ref_attr: Option<String>, is_org: bool) -> Option<Person> {
    let name = name.unwrap_or_default().trim().to_string();
    if name.is_empty() && ref_attr.is_none() {
        return None;
    }
    let authority = ref_attr.as_deref().and_then(parse_authority_ref);
    let precision = if is_org {
        PersonPrecision::Named
    } else {
        classify_person(&name, authority.as_ref())
    };
    let (authority, id) = match authority {
        Some(a) => (Some(a.authority), Some(a.id)),
        None => (None, None),
    };
    Some(Person {
        name,
        id,
        authority,
        precision: Some(precision),
        is_organization: is_org,
    })
}

fn place_from_action(action: &ActionData) -> Option<Place> {
    if action.place_name.is_none() && action.place_ref.is_none() {
        return None;
    }
    let name = action
        .place_name
        .clone()
        .unwrap_or_default()
        .trim()
        .to_string();
    let geonames_id = action.place_ref.as_deref().and_then(parse_geonames_ref);
    let precision = classify_place(&name, geonames_id.as_deref());
    Some(Place {
        name,
        geonames_id,
        lat: None,
        lon: None,
        precision: Some(precision),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DateCertainty, DatePrecision, PlacePrecision};

    fn wrap(corresp_descs: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<TEI xmlns="http://www.tei-c.org/ns/1.0">
  <teiHeader>
    <fileDesc>
      <titleStmt><title>Test Letters</title></titleStmt>
      <publicationStmt><publisher>Test Archive</publisher></publicationStmt>
    </fileDesc>
    <profileDesc>{}</profileDesc>
  </teiHeader>
  <text><body><p/></body></text>
</TEI>"#,
            corresp_descs
        )
    }

    #[test]
    fn extracts_identified_sender_and_day_date() {
        let xml = wrap(
            r#"<correspDesc ref="https://example.org/letters#l1">
                 <correspAction type="sent">
                   <persName ref="https://d-nb.info/gnd/118540238">Goethe</persName>
                   <placeName ref="http://www.geonames.org/2812482">Weimar</placeName>
                   <date when="1798-05-03"/>
                 </correspAction>
                 <correspAction type="received">
                   <persName ref="https://d-nb.info/gnd/118607626">Schiller</persName>
                 </correspAction>
               </correspDesc>"#,
        );
        let doc = extract_tei(&xml).unwrap();
        assert_eq!(doc.title.as_deref(), Some("Test Letters"));
        assert_eq!(doc.publisher.as_deref(), Some("Test Archive"));
        assert_eq!(doc.letters.len(), 1);

        let letter = &doc.letters[0];
        assert_eq!(letter.id, "l1");
        assert_eq!(letter.url.as_deref(), Some("https://example.org/letters#l1"));
        let sender = letter.sender.as_ref().unwrap();
        assert_eq!(sender.precision, Some(PersonPrecision::Identified));
        assert_eq!(sender.id.as_deref(), Some("118540238"));
        assert_eq!(sender.authority.as_deref(), Some("gnd"));
        assert_eq!(letter.date_precision, Some(DatePrecision::Day));
        assert_eq!(letter.year, Some(1798));
        assert_eq!(
            letter.recipient.as_ref().unwrap().name,
            "Schiller".to_string()
        );
        let place = letter.place_sent.as_ref().unwrap();
        assert_eq!(place.geonames_id.as_deref(), Some("2812482"));
        assert_eq!(place.precision, Some(PlacePrecision::Exact));
        assert_eq!(place.lat, None);
    }

    #[test]
    fn unreferenced_place_is_region_precision() {
        let xml = wrap(
            r#"<correspDesc>
                 <correspAction type="sent">
                   <persName>Charlotte von Stein</persName>
                   <placeName>Weimar</placeName>
                 </correspAction>
               </correspDesc>"#,
        );
        let doc = extract_tei(&xml).unwrap();
        let place = doc.letters[0].place_sent.as_ref().unwrap();
        assert_eq!(place.name, "Weimar");
        assert_eq!(place.geonames_id, None);
        assert_eq!(place.precision, Some(PlacePrecision::Region));
    }

    #[test]
    fn org_name_fallback_is_named_organization() {
        let xml = wrap(
            r#"<correspDesc key="l7">
                 <correspAction type="sent">
                   <orgName ref="https://d-nb.info/gnd/2024420-6">Weimarer Hoftheater</orgName>
                 </correspAction>
               </correspDesc>"#,
        );
        let doc = extract_tei(&xml).unwrap();
        let sender = doc.letters[0].sender.as_ref().unwrap();
        assert!(sender.is_organization);
        assert_eq!(sender.precision, Some(PersonPrecision::Named));
        assert_eq!(sender.authority.as_deref(), Some("gnd"));
        assert_eq!(doc.letters[0].id, "l7");
    }

    #[test]
    fn pers_name_wins_over_org_name() {
        let xml = wrap(
            r#"<correspDesc>
                 <correspAction type="sent">
                   <orgName>Hoftheater</orgName>
                   <persName>Goethe</persName>
                 </correspAction>
               </correspDesc>"#,
        );
        let doc = extract_tei(&xml).unwrap();
        let sender = doc.letters[0].sender.as_ref().unwrap();
        assert_eq!(sender.name, "Goethe");
        assert!(!sender.is_organization);
    }

    #[test]
    fn range_dates_carry_both_endpoints() {
        let xml = wrap(
            r#"<correspDesc>
                 <correspAction type="sent">
                   <date from="1798-01-01" to="1798-03-31" cert="low"/>
                 </correspAction>
               </correspDesc>"#,
        );
        let doc = extract_tei(&xml).unwrap();
        let letter = &doc.letters[0];
        assert_eq!(letter.date_precision, Some(DatePrecision::Range));
        assert_eq!(letter.date.as_deref(), Some("1798-01-01"));
        assert_eq!(letter.date_to.as_deref(), Some("1798-03-31"));
        assert_eq!(letter.date_certainty, Some(DateCertainty::Low));
        assert_eq!(letter.year, Some(1798));
    }

    #[test]
    fn note_refs_fill_language_and_mentions() {
        let xml = wrap(
            r#"<correspDesc>
                 <correspAction type="sent"><persName>Goethe</persName></correspAction>
                 <note>
                   <ref type="cmif:hasLanguage" target="http://id.loc.gov/vocabulary/iso639-2/ger">German</ref>
                   <ref type="cmif:mentionsPerson" target="https://d-nb.info/gnd/118549553">Herder</ref>
                   <ref type="mentionsSubject">Farbenlehre</ref>
                   <ref type="mentionsPlace">Jena</ref>
                 </note>
               </correspDesc>"#,
        );
        let doc = extract_tei(&xml).unwrap();
        let letter = &doc.letters[0];
        let lang = letter.language.as_ref().unwrap();
        assert_eq!(lang.code, "ger");
        assert_eq!(lang.label, "German");
        assert_eq!(letter.mentions.persons[0].label, "Herder");
        assert_eq!(
            letter.mentions.persons[0].target.as_deref(),
            Some("https://d-nb.info/gnd/118549553")
        );
        assert_eq!(letter.mentions.subjects[0].label, "Farbenlehre");
        assert_eq!(letter.mentions.places[0].label, "Jena");
    }

    #[test]
    fn empty_corresp_desc_is_still_pushed() {
        let xml = wrap(r#"<correspDesc/><correspDesc></correspDesc>"#);
        let doc = extract_tei(&xml).unwrap();
        assert_eq!(doc.letters.len(), 2);
        for letter in &doc.letters {
            assert!(letter.id.starts_with("letter-"));
            assert!(letter.sender.is_none());
            assert_eq!(letter.date_precision, Some(DatePrecision::Unknown));
        }
        // fallback ids are unique within one extraction
        assert_ne!(doc.letters[0].id, doc.letters[1].id);
    }

    #[test]
    fn foreign_namespace_elements_are_ignored() {
        let xml = wrap(
            r#"<correspDesc xmlns:x="http://example.org/other">
                 <correspAction type="sent">
                   <x:persName>Not Me</x:persName>
                   <persName>Goethe</persName>
                 </correspAction>
               </correspDesc>"#,
        );
        let doc = extract_tei(&xml).unwrap();
        assert_eq!(doc.letters[0].sender.as_ref().unwrap().name, "Goethe");
    }

    #[test]
    fn nested_name_markup_is_flattened() {
        let xml = wrap(
            r#"<correspDesc>
                 <correspAction type="sent">
                   <persName><forename>Johann</forename> <surname>Herder</surname></persName>
                 </correspAction>
               </correspDesc>"#,
        );
        let doc = extract_tei(&xml).unwrap();
        assert_eq!(doc.letters[0].sender.as_ref().unwrap().name, "Johann Herder");
    }

    #[test]
    fn malformed_xml_is_fatal() {
        let err = extract_tei("<TEI><correspDesc></TEI>").unwrap_err();
        assert!(err.to_string().contains("XML parse error"));
    }
}
