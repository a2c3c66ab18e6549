//! Pipeline facade: source acquisition → extraction → index building →
//! metadata assembly.
//!
//! One entry point, [`parse_cmif`], accepts a local file path, an absolute
//! `http(s)://` URL, or a raw XML string. correspSearch API URLs delegate
//! to the correspSearch path and return its (less rich) result shape.
//! Every call is a pure function from source to result; no state survives
//! between invocations.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::config::Config;
use crate::corresp_search::{self, HttpTransport};
use crate::index::{build_indices, IndexKeying};
use crate::models::{CmifResult, Letter};
use crate::progress::{ParseProgressEvent, ProgressReporter};
use crate::stats::build_meta;
use crate::tei::extract_tei;

/// Run the full pipeline on a source.
///
/// Source detection, in order: an absolute URL is fetched (correspSearch
/// hosts take the API path, everything else is fetched as TEI-XML text); a
/// string naming an existing file is read from disk; anything starting
/// with `<` is treated as inline XML.
pub async fn parse_cmif(
    source: &str,
    config: &Config,
    progress: &dyn ProgressReporter,
) -> Result<CmifResult> {
    let trimmed = source.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        if is_corresp_search_url(trimmed, &config.api.base_url) {
            let transport = HttpTransport::new(config.http.timeout_secs)?;
            progress.report(ParseProgressEvent::Fetching {
                url: trimmed.to_string(),
            });
            return corresp_search::fetch_url(&transport, &config.api, trimmed, progress).await;
        }
        progress.report(ParseProgressEvent::Fetching {
            url: trimmed.to_string(),
        });
        let xml = fetch_text(trimmed, config).await?;
        return parse_tei_str(&xml, progress);
    }

    let path = Path::new(source);
    if path.exists() {
        let xml = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        return parse_tei_str(&xml, progress);
    }

    if trimmed.starts_with('<') {
        return parse_tei_str(trimmed, progress);
    }

    bail!(
        "unrecognized source: '{}' is not a readable file, an http(s) URL, or an XML document",
        source
    )
}

/// Parse a TEI-XML string and assemble the full result.
pub fn parse_tei_str(xml: &str, progress: &dyn ProgressReporter) -> Result<CmifResult> {
    let doc = extract_tei(xml)?;
    progress.report(ParseProgressEvent::Extracted {
        letters: doc.letters.len(),
    });
    Ok(assemble_result(doc.letters, doc.title, doc.publisher))
}

/// Index and summarize an extracted letter list (TEI path keying).
pub fn assemble_result(
    letters: Vec<Letter>,
    title: Option<String>,
    publisher: Option<String>,
) -> CmifResult {
    let indices = build_indices(&letters, IndexKeying::AuthorityId);
    let meta = build_meta(&letters, title, publisher);
    CmifResult {
        letters,
        indices,
        meta,
    }
}

fn is_corresp_search_url(url: &str, base_url: &str) -> bool {
    let host_of = |u: &str| {
        reqwest::Url::parse(u)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    };
    let Some(host) = host_of(url) else {
        return false;
    };
    host.ends_with("correspsearch.net") || host_of(base_url).is_some_and(|b| host == b)
}

/// Fetch a remote TEI document as text.
///
/// A non-2xx status is fatal with the status code. A failure to reach the
/// host at all is rewritten into an end-user message naming the hostname —
/// for web deployments the usual cause is a server without CORS headers.
async fn fetch_text(url: &str, config: &Config) -> Result<String> {
    let host = reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string());
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http.timeout_secs))
        .build()
        .context("failed to build HTTP client")?;

    let resp = match client.get(url).send().await {
        Ok(resp) => resp,
        Err(e) if e.is_connect() || e.is_timeout() => {
            bail!(
                "could not reach '{}': {}. The server may be offline or may not allow \
                 cross-origin requests; download the file and load the local copy instead.",
                host,
                e
            );
        }
        Err(e) => return Err(e).with_context(|| format!("request to {} failed", url)),
    };

    let status = resp.status();
    if !status.is_success() {
        bail!(
            "HTTP {} {} while fetching {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or(""),
            url
        );
    }
    resp.text()
        .await
        .with_context(|| format!("failed to read response body from {}", url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DatePrecision, PersonPrecision};
    use crate::progress::NoProgress;

    const FIXTURE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<TEI xmlns="http://www.tei-c.org/ns/1.0">
  <teiHeader>
    <fileDesc>
      <titleStmt><title>Goethe Letters</title></titleStmt>
      <publicationStmt><publisher>Klassik Stiftung</publisher></publicationStmt>
    </fileDesc>
    <profileDesc>
      <correspDesc ref="https://example.org/letters#l1">
        <correspAction type="sent">
          <persName ref="https://d-nb.info/gnd/118540238">Goethe</persName>
          <placeName ref="http://www.geonames.org/2812482">Weimar</placeName>
          <date when="1798-05-03"/>
        </correspAction>
        <correspAction type="received">
          <persName>Schiller</persName>
        </correspAction>
      </correspDesc>
      <correspDesc key="l2">
        <correspAction type="sent">
          <persName>[NN]</persName>
          <date when="1799"/>
        </correspAction>
      </correspDesc>
    </profileDesc>
  </teiHeader>
  <text><body><p/></body></text>
</TEI>"#;

    #[tokio::test]
    async fn inline_xml_source_runs_the_tei_path() {
        let config = Config::default();
        let result = parse_cmif(FIXTURE, &config, &NoProgress).await.unwrap();
        assert_eq!(result.letters.len(), 2);
        assert_eq!(result.meta.title.as_deref(), Some("Goethe Letters"));
        assert_eq!(result.meta.total_letters, 2);
        assert_eq!(
            result.letters[0].sender.as_ref().unwrap().precision,
            Some(PersonPrecision::Identified)
        );
        assert_eq!(
            result.letters[1].sender.as_ref().unwrap().precision,
            Some(PersonPrecision::Unknown)
        );
        assert_eq!(result.letters[1].date_precision, Some(DatePrecision::Year));
        // index holds only the identified sender; meta counts both
        assert_eq!(result.indices.persons.len(), 1);
        assert_eq!(result.meta.unique_senders, 2);
        assert_eq!(result.meta.date_range.min, Some(1798));
        assert_eq!(result.meta.date_range.max, Some(1799));
    }

    #[tokio::test]
    async fn file_source_is_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("letters.xml");
        std::fs::write(&path, FIXTURE).unwrap();
        let config = Config::default();
        let result = parse_cmif(path.to_str().unwrap(), &config, &NoProgress)
            .await
            .unwrap();
        assert_eq!(result.letters.len(), 2);
    }

    #[tokio::test]
    async fn unrecognized_source_is_an_error() {
        let config = Config::default();
        let err = parse_cmif("no-such-file.xml", &config, &NoProgress)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unrecognized source"));
    }

    #[test]
    fn corresp_search_hosts_are_detected() {
        let base = Config::default().api.base_url;
        assert!(is_corresp_search_url(
            "https://correspsearch.net/api/v1.1/tei-json.xml?correspondent=x",
            &base
        ));
        assert!(!is_corresp_search_url("https://example.org/cmif.xml", &base));
    }
}
