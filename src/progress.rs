//! Pipeline progress reporting.
//!
//! Reports observable progress during `cmif parse` and `cmif search` so
//! users see what is being fetched and how many letters have arrived.
//! Progress is emitted on **stderr** so stdout remains parseable for
//! scripts.

use std::io::Write;

/// A single progress event from the pipeline.
#[derive(Clone, Debug)]
pub enum ParseProgressEvent {
    /// A remote source is about to be fetched.
    Fetching { url: String },
    /// One result page has been transformed; `fetched` is the running total.
    Page { page: usize, fetched: usize },
    /// Extraction finished with this many letters.
    Extracted { letters: usize },
}

/// Reports pipeline progress. Implementations write to stderr (human or
/// JSON lines).
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ParseProgressEvent);
}

/// Human-friendly progress on stderr: "fetch page 12  120 letters".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ParseProgressEvent) {
        let line = match &event {
            ParseProgressEvent::Fetching { url } => format!("fetching {}\n", url),
            ParseProgressEvent::Page { page, fetched } => {
                format!("fetch page {}  {} letters\n", page, format_number(*fetched as u64))
            }
            ParseProgressEvent::Extracted { letters } => {
                format!("extracted {} letters\n", format_number(*letters as u64))
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ParseProgressEvent) {
        let obj = match &event {
            ParseProgressEvent::Fetching { url } => serde_json::json!({
                "event": "progress",
                "phase": "fetching",
                "url": url
            }),
            ParseProgressEvent::Page { page, fetched } => serde_json::json!({
                "event": "progress",
                "phase": "page",
                "page": page,
                "fetched": fetched
            }),
            ParseProgressEvent::Extracted { letters } => serde_json::json!({
                "event": "progress",
                "phase": "extracted",
                "letters": letters
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ParseProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode.
    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(12_345), "12,345");
    }
}
