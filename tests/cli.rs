//! Black-box tests for the `cmif` binary: parse, enrich, and error paths.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn cmif_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("cmif");
    path
}

const FIXTURE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<TEI xmlns="http://www.tei-c.org/ns/1.0">
  <teiHeader>
    <fileDesc>
      <titleStmt><title>CLI Sample</title></titleStmt>
      <publicationStmt><publisher>CLI Archive</publisher></publicationStmt>
    </fileDesc>
    <profileDesc>
      <correspDesc ref="https://example.org/letters#l1">
        <correspAction type="sent">
          <persName ref="https://d-nb.info/gnd/118540238">Goethe</persName>
          <placeName ref="http://www.geonames.org/2812482">Weimar</placeName>
          <date when="1798-05-03"/>
        </correspAction>
      </correspDesc>
    </profileDesc>
  </teiHeader>
  <text><body><p/></body></text>
</TEI>"#;

fn setup() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let fixture = tmp.path().join("letters.xml");
    fs::write(&fixture, FIXTURE).unwrap();
    (tmp, fixture)
}

fn run_cmif(dir: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = cmif_binary();
    let output = Command::new(&binary)
        .current_dir(dir)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run cmif binary at {:?}: {}", binary, e));
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn parse_prints_the_result_shape() {
    let (tmp, fixture) = setup();
    let (stdout, stderr, success) = run_cmif(
        tmp.path(),
        &["parse", fixture.to_str().unwrap(), "--progress", "off"],
    );
    assert!(success, "parse failed: stderr={}", stderr);

    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(value["meta"]["total_letters"], 1);
    assert_eq!(value["meta"]["title"], "CLI Sample");
    assert_eq!(value["letters"][0]["id"], "l1");
    assert_eq!(value["letters"][0]["sender"]["precision"], "identified");
    assert_eq!(value["letters"][0]["datePrecision"], "day");
    assert_eq!(value["letters"][0]["year"], 1798);
}

#[test]
fn parse_writes_output_file_and_enrich_round_trips() {
    let (tmp, fixture) = setup();
    let out = tmp.path().join("result.json");
    let coords = tmp.path().join("coords.json");
    fs::write(&coords, r#"{"2812482": {"lat": 50.9803, "lon": 11.329}}"#).unwrap();

    let (_, stderr, success) = run_cmif(
        tmp.path(),
        &[
            "parse",
            fixture.to_str().unwrap(),
            "--output",
            out.to_str().unwrap(),
            "--progress",
            "off",
        ],
    );
    assert!(success, "parse failed: stderr={}", stderr);

    let (stdout, stderr, success) = run_cmif(
        tmp.path(),
        &[
            "enrich",
            out.to_str().unwrap(),
            "--coords",
            coords.to_str().unwrap(),
            "--progress",
            "off",
        ],
    );
    assert!(success, "enrich failed: stderr={}", stderr);
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(value["letters"][0]["place_sent"]["lat"], 50.9803);
    assert_eq!(value["indices"]["places"]["2812482"]["lon"], 11.329);
}

#[test]
fn parse_with_coords_enriches_inline() {
    let (tmp, fixture) = setup();
    let coords = tmp.path().join("coords.json");
    fs::write(&coords, r#"{"2812482": {"lat": 50.9803, "lon": 11.329}}"#).unwrap();

    let (stdout, stderr, success) = run_cmif(
        tmp.path(),
        &[
            "parse",
            fixture.to_str().unwrap(),
            "--coords",
            coords.to_str().unwrap(),
            "--progress",
            "off",
        ],
    );
    assert!(success, "parse failed: stderr={}", stderr);
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(value["letters"][0]["place_sent"]["lat"], 50.9803);
}

#[test]
fn malformed_xml_fails_with_parser_message() {
    let tmp = TempDir::new().unwrap();
    let bad = tmp.path().join("bad.xml");
    fs::write(&bad, "<TEI><correspDesc></TEI>").unwrap();
    let (_, stderr, success) = run_cmif(
        tmp.path(),
        &["parse", bad.to_str().unwrap(), "--progress", "off"],
    );
    assert!(!success);
    assert!(stderr.contains("XML parse error"));
}

#[test]
fn unknown_progress_mode_is_rejected() {
    let (tmp, fixture) = setup();
    let (_, stderr, success) = run_cmif(
        tmp.path(),
        &["parse", fixture.to_str().unwrap(), "--progress", "loud"],
    );
    assert!(!success);
    assert!(stderr.contains("unknown progress mode"));
}
