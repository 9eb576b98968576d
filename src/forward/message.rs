use serde::Serialize;

use super::transport::TransportError;
use crate::classify::ForwardedEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    /// Connection lifecycle of the bridge itself.
    AdbBridgeStatus,
    /// Lifecycle of a monitoring session.
    AdbMonitoringStatus,
}

/// Status notification for the desktop listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMessage {
    #[serde(rename = "type")]
    pub kind: StatusKind,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    pub message: String,
}

impl StatusMessage {
    pub fn bridge_connected() -> Self {
        Self {
            kind: StatusKind::AdbBridgeStatus,
            status: "connected".to_string(),
            device_id: None,
            message: "ADB Bridge connected successfully".to_string(),
        }
    }

    pub fn monitoring_active(device_id: &str) -> Self {
        Self {
            kind: StatusKind::AdbMonitoringStatus,
            status: "active".to_string(),
            device_id: Some(device_id.to_string()),
            message: format!("Monitoring Android device: {}", device_id),
        }
    }

    pub fn monitoring_stopped() -> Self {
        Self {
            kind: StatusKind::AdbMonitoringStatus,
            status: "stopped".to_string(),
            device_id: None,
            message: "ADB Bridge monitoring stopped".to_string(),
        }
    }
}

/// Anything the bridge writes to the sink; serialized as one JSON object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutboundMessage {
    Status(StatusMessage),
    Event(ForwardedEvent),
}

impl OutboundMessage {
    pub fn to_json(&self) -> Result<String, TransportError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Short label for log lines
    pub fn describe(&self) -> String {
        match self {
            Self::Status(status) => format!("{} status", status.status),
            Self::Event(event) => format!("{} event", event.event().error_type),
        }
    }
}

impl From<StatusMessage> for OutboundMessage {
    fn from(status: StatusMessage) -> Self {
        Self::Status(status)
    }
}

impl From<ForwardedEvent> for OutboundMessage {
    fn from(event: ForwardedEvent) -> Self {
        Self::Event(event)
    }
}
