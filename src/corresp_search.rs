//! correspSearch API client and response transformer.
//!
//! The correspSearch web API serves correspondence metadata as TEI-JSON,
//! but deployments have been observed to serialize names and dates
//! inconsistently (string vs. array vs. object-with-text-key), and the
//! letter list can sit at several places in the payload. This module
//! centralizes all of that shape tolerance in a handful of resolution
//! functions tried in a fixed priority order.
//!
//! Known capability gap of this source format: the API does not expose
//! enough information to classify precision or certainty, so letters from
//! this path carry no `precision`/`datePrecision`/`dateCertainty` fields,
//! empty mentions, and no language. This is a property of the source, not
//! a bug.
//!
//! Retry strategy (network-level failures only):
//! - fetch rejected before a response → retry with linear backoff (1s, 2s, 3s)
//! - non-2xx HTTP status → fail immediately with the status code

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::config::ApiConfig;
use crate::index::{build_indices, IndexKeying};
use crate::models::{CmifResult, FallbackIds, Letter, Person, Place};
use crate::precision::year_of;
use crate::progress::{ParseProgressEvent, ProgressReporter};
use crate::refs::{parse_authority_ref, parse_geonames_ref, trailing_segment};
use crate::stats::build_meta;

// ═══════════════════════════════════════════════════════════════════════
// Transport
// ═══════════════════════════════════════════════════════════════════════

/// Fetch failure classes. The retry loop branches on these: only
/// `Network` is retryable.
#[derive(Debug)]
pub enum FetchError {
    /// The request failed before an HTTP response was received.
    Network(String),
    /// The server answered with a non-2xx status.
    Status { code: u16, reason: String },
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Network(msg) => write!(f, "network error: {}", msg),
            FetchError::Status { code, reason } => write!(f, "HTTP {} {}", code, reason),
        }
    }
}

impl std::error::Error for FetchError {}

/// HTTP GET returning a parsed JSON body. Abstracted behind a trait so
/// pagination and retry behavior are testable with a mock transport.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_json(&self, url: &str) -> Result<Value, FetchError>;
}

/// The real transport, backed by a shared reqwest client.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            });
        }
        resp.json()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))
    }
}

/// One GET with retry. Network failures are retried `max_retries` times
/// with linearly increasing backoff; HTTP error statuses are fatal on the
/// first occurrence.
pub async fn fetch_with_retry(
    transport: &dyn Transport,
    url: &str,
    max_retries: u32,
) -> Result<Value> {
    let mut last_err = None;
    for attempt in 0..=max_retries {
        if attempt > 0 {
            tokio::time::sleep(Duration::from_secs(attempt as u64)).await;
        }
        match transport.get_json(url).await {
            Ok(value) => return Ok(value),
            Err(FetchError::Network(msg)) => {
                last_err = Some(msg);
                continue;
            }
            Err(e @ FetchError::Status { .. }) => {
                bail!("request to {} failed: {}", url, e);
            }
        }
    }
    Err(anyhow!(
        "request to {} failed after {} attempts: {}",
        url,
        max_retries + 1,
        last_err.unwrap_or_default()
    ))
}

// ═══════════════════════════════════════════════════════════════════════
// Query building
// ═══════════════════════════════════════════════════════════════════════

/// Search filters accepted by the correspSearch API.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchParams {
    pub correspondent: Option<String>,
    pub place: Option<String>,
    pub place_sender: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Restrict to letters available online (API flag `available=online`).
    pub available: bool,
}

fn build_query_url(base: &str, params: &SearchParams, page: usize) -> Result<reqwest::Url> {
    let mut pairs: Vec<(&str, String)> = Vec::new();
    if let Some(c) = &params.correspondent {
        pairs.push(("correspondent", c.clone()));
    }
    if let Some(p) = &params.place {
        pairs.push(("place", p.clone()));
    }
    if let Some(p) = &params.place_sender {
        pairs.push(("placeSender", p.clone()));
    }
    if let Some(d) = &params.start_date {
        pairs.push(("startdate", d.clone()));
    }
    if let Some(d) = &params.end_date {
        pairs.push(("enddate", d.clone()));
    }
    if params.available {
        pairs.push(("available", "online".to_string()));
    }
    pairs.push(("x", page.to_string()));
    reqwest::Url::parse_with_params(base, &pairs)
        .with_context(|| format!("invalid correspSearch base URL: {}", base))
}

fn with_page(url: &str, page: usize) -> Result<reqwest::Url> {
    let mut url = reqwest::Url::parse(url).with_context(|| format!("invalid URL: {}", url))?;
    url.query_pairs_mut().append_pair("x", &page.to_string());
    Ok(url)
}

/// Whether a URL already names an explicit page (`x=` parameter), in which
/// case exactly that page is fetched instead of paginating.
pub fn has_explicit_page(url: &str) -> bool {
    reqwest::Url::parse(url)
        .map(|u| u.query_pairs().any(|(k, _)| k == "x"))
        .unwrap_or(false)
}

// ═══════════════════════════════════════════════════════════════════════
// Payload transformation
// ═══════════════════════════════════════════════════════════════════════

/// Locate the letter nodes in a payload. Checked in priority order, first
/// match wins: `teiHeader.profileDesc.correspDesc` (array or object), a
/// bare top-level array, `letters`, `correspDesc`.
fn letter_nodes(payload: &Value) -> Vec<&Value> {
    if let Some(v) = payload
        .pointer("/teiHeader/profileDesc/correspDesc")
        .filter(|v| !v.is_null())
    {
        return as_node_list(v);
    }
    if payload.is_array() {
        return as_node_list(payload);
    }
    if let Some(v) = payload.get("letters").filter(|v| !v.is_null()) {
        return as_node_list(v);
    }
    if let Some(v) = payload.get("correspDesc").filter(|v| !v.is_null()) {
        return as_node_list(v);
    }
    Vec::new()
}

fn as_node_list(v: &Value) -> Vec<&Value> {
    match v {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

/// Resolve a value that may be a string, an array (first usable element),
/// or an object carrying its text under `#text`, `_`, or `name`.
fn text_value(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => items.iter().find_map(text_value),
        Value::Object(map) => ["#text", "_", "name"]
            .iter()
            .find_map(|k| map.get(*k).and_then(text_value)),
        _ => None,
    }
}

/// Resolve a reference URI from an attribute-style key, tolerating both
/// `@`-prefixed and plain spellings.
fn ref_value(v: &Value) -> Option<String> {
    let obj = match v {
        Value::Object(_) => v,
        Value::Array(items) => items.first()?,
        _ => return None,
    };
    ["@ref", "ref", "@target", "target"]
        .iter()
        .find_map(|k| obj.get(*k).and_then(text_value))
}

fn attr_value(v: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| v.get(*k).and_then(text_value))
}

fn action_of<'a>(node: &'a Value, kind: &str) -> Option<&'a Value> {
    let actions = node.get("correspAction")?;
    as_node_list(actions).into_iter().find(|a| {
        attr_value(a, &["@type", "type"])
            .map(|t| t == kind)
            .unwrap_or(false)
    })
}

fn person_from_value(v: &Value) -> Option<Person> {
    let name = text_value(v);
    let authority = ref_value(v).as_deref().and_then(parse_authority_ref);
    if name.is_none() && authority.is_none() {
        return None;
    }
    let (authority, id) = match authority {
        Some(a) => (Some(a.authority), Some(a.id)),
        None => (None, None),
    };
    Some(Person {
        name: name.unwrap_or_default(),
        id,
        authority,
        // capability gap: this API carries no uncertainty information
        precision: None,
        is_organization: false,
    })
}

fn place_from_value(v: &Value) -> Option<Place> {
    let name = text_value(v);
    let geonames_id = ref_value(v).as_deref().and_then(parse_geonames_ref);
    if name.is_none() && geonames_id.is_none() {
        return None;
    }
    Some(Place {
        name: name.unwrap_or_default(),
        geonames_id,
        lat: None,
        lon: None,
        precision: None,
    })
}

/// Transform one payload letter node into the normalized shape.
fn transform_letter(node: &Value, ids: &mut FallbackIds) -> Letter {
    let url = ref_value(node).or_else(|| attr_value(node, &["url"]));
    let id_source = url.clone().or_else(|| attr_value(node, &["key", "id"]));
    let id = id_source
        .as_deref()
        .map(trailing_segment)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| ids.next_id());

    let mut letter = Letter::empty(id);
    letter.url = url;

    let sent = action_of(node, "sent");
    let received = action_of(node, "received");

    letter.sender = sent
        .and_then(|a| a.get("persName"))
        .and_then(person_from_value)
        .or_else(|| node.get("sender").and_then(person_from_value));
    letter.recipient = received
        .and_then(|a| a.get("persName"))
        .and_then(person_from_value)
        .or_else(|| node.get("recipient").and_then(person_from_value));
    letter.place_sent = sent
        .and_then(|a| a.get("placeName"))
        .and_then(place_from_value)
        .or_else(|| node.get("placeSender").and_then(place_from_value))
        .or_else(|| node.get("place").and_then(place_from_value));

    let date_node = sent.and_then(|a| a.get("date")).or_else(|| node.get("date"));
    if let Some(d) = date_node {
        letter.date = attr_value(d, &["@when", "when", "@from", "from", "@notBefore", "notBefore"])
            .or_else(|| text_value(d));
        letter.date_to = attr_value(d, &["@to", "to", "@notAfter", "notAfter"]);
        letter.year = letter.date.as_deref().and_then(year_of);
    }

    // mentions stay empty and language null: not exposed by this API
    letter
}

fn transform_page(payload: &Value, ids: &mut FallbackIds) -> Vec<Letter> {
    letter_nodes(payload)
        .into_iter()
        .map(|node| transform_letter(node, ids))
        .collect()
}

/// Multi-signal continuation check. The API's exact shape has varied, so
/// any one of these keeps paging: an explicit `more` flag, a full page of
/// transformed letters, or a full nested `correspDesc` array.
fn has_more(payload: &Value, page_len: usize, page_size: usize) -> bool {
    if payload.get("more").and_then(Value::as_bool) == Some(true) {
        return true;
    }
    if page_len == page_size {
        return true;
    }
    payload
        .pointer("/teiHeader/profileDesc/correspDesc")
        .and_then(Value::as_array)
        .map(|a| a.len() == page_size)
        .unwrap_or(false)
}

fn assemble(letters: Vec<Letter>) -> CmifResult {
    let indices = build_indices(&letters, IndexKeying::IdOrName);
    let meta = build_meta(&letters, None, None);
    CmifResult {
        letters,
        indices,
        meta,
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Entry points
// ═══════════════════════════════════════════════════════════════════════

/// The shared pagination loop. Pages until the continuation heuristic goes
/// quiet or the configured result cap is reached; hitting the cap is not an
/// error, the truncated result is returned with a warning on stderr.
async fn paginate<F>(
    transport: &dyn Transport,
    config: &ApiConfig,
    progress: &dyn ProgressReporter,
    mut url_for: F,
) -> Result<Vec<Letter>>
where
    F: FnMut(usize) -> Result<reqwest::Url>,
{
    let mut letters = Vec::new();
    let mut ids = FallbackIds::new();
    let mut page = 1;
    loop {
        let url = url_for(page)?;
        let payload = fetch_with_retry(transport, url.as_str(), config.max_retries).await?;
        let batch = transform_page(&payload, &mut ids);
        let page_len = batch.len();
        letters.extend(batch);
        progress.report(ParseProgressEvent::Page {
            page,
            fetched: letters.len(),
        });
        if letters.len() >= config.max_results {
            eprintln!(
                "warning: stopped paging at the {}-result safety cap; the result is truncated",
                config.max_results
            );
            letters.truncate(config.max_results);
            break;
        }
        if page_len == 0 || !has_more(&payload, page_len, config.page_size) {
            break;
        }
        page += 1;
    }
    Ok(letters)
}

/// Run a paginated correspSearch query, reporting progress after each page.
pub async fn search(
    transport: &dyn Transport,
    config: &ApiConfig,
    params: &SearchParams,
    progress: &dyn ProgressReporter,
) -> Result<CmifResult> {
    let letters = paginate(transport, config, progress, |page| {
        build_query_url(&config.base_url, params, page)
    })
    .await?;
    progress.report(ParseProgressEvent::Extracted {
        letters: letters.len(),
    });
    Ok(assemble(letters))
}

/// Fetch a correspSearch URL directly. URLs that already carry an explicit
/// page parameter fetch exactly that page; otherwise the same pagination
/// loop as [`search`] runs against the raw URL.
pub async fn fetch_url(
    transport: &dyn Transport,
    config: &ApiConfig,
    url: &str,
    progress: &dyn ProgressReporter,
) -> Result<CmifResult> {
    let letters = if has_explicit_page(url) {
        let payload = fetch_with_retry(transport, url, config.max_retries).await?;
        let mut ids = FallbackIds::new();
        transform_page(&payload, &mut ids)
    } else {
        paginate(transport, config, progress, |page| with_page(url, page)).await?
    };
    progress.report(ParseProgressEvent::Extracted {
        letters: letters.len(),
    });
    Ok(assemble(letters))
}

/// A single-page lookahead so callers can warn before committing to a
/// large fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultCount {
    pub count: usize,
    #[serde(rename = "hasMore")]
    pub has_more: bool,
    #[serde(rename = "totalHits")]
    pub total_hits: Option<u64>,
}

/// Probe the first result page for a query and report how much a full
/// fetch would return.
pub async fn get_result_count(
    transport: &dyn Transport,
    config: &ApiConfig,
    params: &SearchParams,
) -> Result<ResultCount> {
    let url = build_query_url(&config.base_url, params, 1)?;
    let payload = fetch_with_retry(transport, url.as_str(), config.max_retries).await?;
    let mut ids = FallbackIds::new();
    let count = transform_page(&payload, &mut ids).len();
    let total_hits = ["totalHits", "total", "hits"]
        .iter()
        .find_map(|k| payload.get(*k).and_then(Value::as_u64));
    Ok(ResultCount {
        count,
        has_more: has_more(&payload, count, config.page_size),
        total_hits,
    })
}
