use serde::Serialize;

use super::catalog::{ErrorKind, PermissionKind, Severity};

/// Message type tag understood by the desktop listener.
pub const EVENT_MESSAGE_TYPE: &str = "android_error";

/// Value of the `source` field on every forwarded event.
pub const EVENT_SOURCE: &str = "bridge";

/// One detected error occurrence, as produced by the classifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEvent {
    /// Date, time and pid fields of the log line, space separated.
    #[serde(rename = "timestamp")]
    pub timestamp_raw: String,
    pub device_id: String,
    pub error_type: ErrorKind,
    pub permission_type: Option<PermissionKind>,
    pub package_name: Option<String>,
    pub message: String,
    #[serde(rename = "full_log_line")]
    pub raw_line: String,
    pub severity: Severity,
}

impl LogEvent {
    /// Stamp the event for sending.
    pub fn finalize(self, sent_at_epoch: f64) -> ForwardedEvent {
        ForwardedEvent {
            kind: EVENT_MESSAGE_TYPE,
            event: self,
            source: EVENT_SOURCE,
            sent_at_epoch,
        }
    }

    /// Message truncated to `max_chars` characters with an ellipsis, for logs.
    pub fn preview(&self, max_chars: usize) -> String {
        let mut chars = self.message.chars();
        let head: String = chars.by_ref().take(max_chars).collect();
        if chars.next().is_some() {
            format!("{}...", head)
        } else {
            head
        }
    }
}

/// A classified event stamped with its origin and send time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForwardedEvent {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(flatten)]
    event: LogEvent,
    source: &'static str,
    #[serde(rename = "timestamp_sent")]
    sent_at_epoch: f64,
}

impl ForwardedEvent {
    pub fn event(&self) -> &LogEvent {
        &self.event
    }

    pub fn source(&self) -> &'static str {
        self.source
    }

    /// Seconds since the Unix epoch at which the event was handed to the sink.
    pub fn sent_at_epoch(&self) -> f64 {
        self.sent_at_epoch
    }
}
