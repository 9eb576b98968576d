//! Pure line classification: raw logcat line to `LogEvent`.

use regex::Regex;
use std::sync::{Arc, LazyLock};

use super::catalog::{ErrorKind, PatternCatalog};
use super::event::LogEvent;

/// Dotted identifier directly before a method call marker, e.g. `at com.example.Foo.bar(`.
static PACKAGE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"at ([a-zA-Z0-9_\.]+)\.").expect("Invalid regex pattern"));

static DEFAULT_CLASSIFIER: LazyLock<LineClassifier> = LazyLock::new(LineClassifier::default);

/// Fields preceding the message body in threadtime format: date, time, pid, tid, level.
const HEADER_FIELDS: usize = 5;

/// Number of leading fields that make up the raw timestamp.
const TIMESTAMP_FIELDS: usize = 3;

/// A log line split into its timestamp prefix and message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitLine<'a> {
    pub timestamp: String,
    pub body: &'a str,
}

/// Split a line into at most six whitespace-delimited fields.
///
/// Returns `None` when fewer than six fields are present.
pub fn split_log_line(line: &str) -> Option<SplitLine<'_>> {
    let mut rest = line.trim();
    let mut header = Vec::with_capacity(HEADER_FIELDS);

    for _ in 0..HEADER_FIELDS {
        let end = rest.find(char::is_whitespace)?;
        header.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }

    if rest.is_empty() {
        return None;
    }

    Some(SplitLine {
        timestamp: header[..TIMESTAMP_FIELDS].join(" "),
        body: rest,
    })
}

/// Best-effort originating package for a message body.
pub fn extract_package_name(body: &str) -> Option<String> {
    PACKAGE_PATTERN
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Classifies raw log lines against a `PatternCatalog`.
#[derive(Debug, Clone)]
pub struct LineClassifier {
    catalog: Arc<PatternCatalog>,
}

impl LineClassifier {
    pub fn new(catalog: Arc<PatternCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    /// Classify one line from `device_id`.
    ///
    /// Blank lines, lines with fewer than six fields and lines matching no
    /// rule all yield `None`.
    pub fn classify(&self, raw_line: &str, device_id: &str) -> Option<LogEvent> {
        if raw_line.trim().is_empty() {
            return None;
        }

        let SplitLine { timestamp, body } = split_log_line(raw_line)?;
        let rule = self.catalog.match_error(body)?;

        let permission_type = if rule.kind == ErrorKind::PermissionDenied {
            self.catalog.match_permission(body)
        } else {
            None
        };

        Some(LogEvent {
            timestamp_raw: timestamp,
            device_id: device_id.to_string(),
            error_type: rule.kind,
            permission_type,
            package_name: extract_package_name(body),
            message: body.trim().to_string(),
            raw_line: raw_line.trim().to_string(),
            severity: rule.severity,
        })
    }
}

impl Default for LineClassifier {
    fn default() -> Self {
        Self::new(Arc::new(PatternCatalog::standard()))
    }
}

/// Classify with the standard catalog.
pub fn classify_line(raw_line: &str, device_id: &str) -> Option<LogEvent> {
    DEFAULT_CLASSIFIER.classify(raw_line, device_id)
}
