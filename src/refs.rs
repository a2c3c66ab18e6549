//! Authority-file and GeoNames reference resolvers.
//!
//! Pure functions that turn identifier URIs into typed references. The two
//! resolvers deliberately behave differently on non-matching input: an
//! unparseable person URI is preserved as an `"unknown"`-typed reference
//! (the raw string still identifies *something*), while an unparseable
//! place URI yields nothing, because a place without a GeoNames integer
//! cannot be mapped.

use crate::models::AuthorityRef;

/// Matchers tried in order: VIAF, GND, Library of Congress, BnF.
const AUTHORITY_MARKERS: &[(&str, &str, bool)] = &[
    // (system, URI substring, id must be all digits)
    ("viaf", "viaf.org/viaf/", true),
    ("gnd", "d-nb.info/gnd/", false),
    ("loc", "id.loc.gov/authorities/names/", false),
    ("bnf", "data.bnf.fr/ark:/12148/", false),
];

/// Parse an authority URI into a typed reference.
///
/// Returns `None` only for empty input. A non-empty URI that matches no
/// known authority system is preserved as `{authority: "unknown", id: uri}`.
pub fn parse_authority_ref(uri: &str) -> Option<AuthorityRef> {
    let uri = uri.trim();
    if uri.is_empty() {
        return None;
    }
    for (system, marker, digits_only) in AUTHORITY_MARKERS {
        if let Some(token) = token_after(uri, marker, *digits_only) {
            return Some(AuthorityRef {
                authority: (*system).to_string(),
                id: token.to_string(),
            });
        }
    }
    Some(AuthorityRef {
        authority: "unknown".to_string(),
        id: uri.to_string(),
    })
}

/// Parse a GeoNames URI (`geonames.org/<digits>`) into its integer id.
///
/// Anything else, including a non-empty but non-matching URI, yields `None`.
pub fn parse_geonames_ref(uri: &str) -> Option<String> {
    token_after(uri.trim(), "geonames.org/", true).map(str::to_string)
}

/// The path segment following `marker`, cut at the next delimiter. With
/// `digits_only`, keeps only leading ASCII digits and requires at least one.
fn token_after<'a>(uri: &'a str, marker: &str, digits_only: bool) -> Option<&'a str> {
    let rest = &uri[uri.find(marker)? + marker.len()..];
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let mut token = &rest[..end];
    if digits_only {
        let digits = token
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(token.len());
        token = &token[..digits];
    }
    (!token.is_empty()).then_some(token)
}

/// The last path segment of a reference URI, after the final `#` or `/`.
/// Used to turn `https://example.org/letters#l42` into a compact letter id.
pub fn trailing_segment(s: &str) -> &str {
    let s = s.trim_end_matches(['/', '#']);
    match s.rfind(['#', '/']) {
        Some(i) => &s[i + 1..],
        None => s,
    }
}
