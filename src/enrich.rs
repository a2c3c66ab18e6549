//! Coordinate enrichment.
//!
//! CMIF and correspSearch data frequently supply a GeoNames identifier
//! without coordinates. This step merges an externally maintained
//! `geonames_id → {lat, lon}` cache into a pipeline result. Entries not in
//! the cache are left untouched; applying the same cache twice is a no-op
//! on the second run.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::CmifResult;

/// A pair of WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// External lookup cache, keyed by GeoNames id.
pub type CoordsCache = HashMap<String, Coordinates>;

/// Load a coordinate cache from a JSON file shaped as
/// `{"<geonames_id>": {"lat": ..., "lon": ...}}`.
pub fn load_coords_cache(path: &Path) -> Result<CoordsCache> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read coordinate cache: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("invalid coordinate cache: {}", path.display()))
}

/// Overwrite `lat`/`lon` on every letter's sending place and every places
/// index entry whose GeoNames id is present in the cache.
pub fn enrich_with_coordinates(data: &mut CmifResult, cache: &CoordsCache) {
    for letter in &mut data.letters {
        if let Some(place) = &mut letter.place_sent {
            if let Some(coords) = place.geonames_id.as_deref().and_then(|id| cache.get(id)) {
                place.lat = Some(coords.lat);
                place.lon = Some(coords.lon);
            }
        }
    }
    for (key, entry) in &mut data.indices.places {
        if let Some(coords) = cache.get(key) {
            entry.lat = Some(coords.lat);
            entry.lon = Some(coords.lon);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{build_indices, IndexKeying};
    use crate::models::{Letter, Place};
    use crate::stats::build_meta;

    fn sample() -> CmifResult {
        let mut a = Letter::empty("a".to_string());
        a.place_sent = Some(Place {
            name: "Weimar".to_string(),
            geonames_id: Some("2812482".to_string()),
            lat: None,
            lon: None,
            precision: None,
        });
        let mut b = Letter::empty("b".to_string());
        b.place_sent = Some(Place {
            name: "Atlantis".to_string(),
            geonames_id: Some("999".to_string()),
            lat: None,
            lon: None,
            precision: None,
        });
        let letters = vec![a, b];
        let indices = build_indices(&letters, IndexKeying::AuthorityId);
        let meta = build_meta(&letters, None, None);
        CmifResult {
            letters,
            indices,
            meta,
        }
    }

    fn cache() -> CoordsCache {
        let mut cache = CoordsCache::new();
        cache.insert(
            "2812482".to_string(),
            Coordinates {
                lat: 50.9803,
                lon: 11.3290,
            },
        );
        cache
    }

    #[test]
    fn merges_cache_hits_and_skips_misses() {
        let mut data = sample();
        enrich_with_coordinates(&mut data, &cache());
        let hit = data.letters[0].place_sent.as_ref().unwrap();
        assert_eq!(hit.lat, Some(50.9803));
        assert_eq!(hit.lon, Some(11.3290));
        let miss = data.letters[1].place_sent.as_ref().unwrap();
        assert_eq!(miss.lat, None);
        assert_eq!(data.indices.places["2812482"].lat, Some(50.9803));
        assert_eq!(data.indices.places["999"].lat, None);
    }

    #[test]
    fn enrichment_is_idempotent() {
        let cache = cache();
        let mut once = sample();
        enrich_with_coordinates(&mut once, &cache);
        let mut twice = once.clone();
        enrich_with_coordinates(&mut twice, &cache);
        assert_eq!(once, twice);
    }
}
