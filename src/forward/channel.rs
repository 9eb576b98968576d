//! Forwarding channel: the bridge's single connection to the desktop listener.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::message::{OutboundMessage, StatusMessage};
use super::transport::{SinkConnector, SinkTransport, TransportError};
use crate::error::{BridgeError, ErrorCode};

/// Longest a single send or close may wait on the listener.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// What happened to one message handed to `ForwardingChannel::send`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum SendOutcome {
    Delivered,
    /// No connection was open; the message was discarded.
    Dropped,
    /// The transport failed; the channel is now disconnected.
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    pub delivered: u64,
    pub dropped: u64,
    pub failed: u64,
}

pub struct ForwardingChannel {
    connector: Arc<dyn SinkConnector>,
    transport: Option<Box<dyn SinkTransport>>,
    uri: Option<String>,
    send_timeout: Duration,
    stats: ChannelStats,
}

impl ForwardingChannel {
    pub fn new(connector: Arc<dyn SinkConnector>) -> Self {
        Self {
            connector,
            transport: None,
            uri: None,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            stats: ChannelStats::default(),
        }
    }

    /// A listener that stops reading fails the send after `timeout`.
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    pub fn state(&self) -> ConnectionState {
        if self.transport.is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// URI of the most recent successful connection.
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    pub fn stats(&self) -> ChannelStats {
        self.stats
    }

    /// Open the connection and announce the bridge.
    ///
    /// An already open connection is closed first. The channel is left
    /// disconnected when either the handshake or the announcement fails.
    pub async fn connect(&mut self, uri: &str) -> Result<(), BridgeError> {
        if self.is_connected() {
            debug!("Replacing existing desktop connection");
            self.close().await;
        }

        let transport = self.connector.connect(uri).await.map_err(|e| {
            error!("Failed to connect to desktop listener at {}: {}", uri, e);
            connect_error(uri, e)
        })?;

        self.transport = Some(transport);
        self.uri = Some(uri.to_string());
        info!("Connected to desktop listener at {}", uri);

        match self.send(&StatusMessage::bridge_connected().into()).await {
            SendOutcome::Delivered => Ok(()),
            SendOutcome::Dropped | SendOutcome::Failed => {
                self.transport = None;
                Err(BridgeError::connect(
                    uri,
                    "connection dropped before the bridge could announce itself",
                ))
            }
        }
    }

    /// Serialize and send one message.
    ///
    /// Never fails and never waits longer than the send timeout: a missing
    /// connection drops the message with a warning, a transport failure or
    /// timeout moves the channel to `Disconnected`.
    pub async fn send(&mut self, message: &OutboundMessage) -> SendOutcome {
        let Some(transport) = self.transport.as_mut() else {
            warn!("No connection to desktop, dropping {}", message.describe());
            self.stats.dropped += 1;
            return SendOutcome::Dropped;
        };

        let payload = match message.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                error!("{} ({})", send_error(e.into()), message.describe());
                self.stats.failed += 1;
                return SendOutcome::Failed;
            }
        };

        let result = tokio::time::timeout(self.send_timeout, transport.send_text(payload))
            .await
            .unwrap_or(Err(TransportError::Timeout(self.send_timeout)));

        match result {
            Ok(()) => {
                self.stats.delivered += 1;
                SendOutcome::Delivered
            }
            Err(e) => {
                error!("{}", send_error(e));
                self.transport = None;
                self.stats.failed += 1;
                SendOutcome::Failed
            }
        }
    }

    /// Close the connection if one is open. Safe to call repeatedly.
    ///
    /// A listener that does not complete the close handshake within the send
    /// timeout is abandoned.
    pub async fn close(&mut self) {
        let Some(mut transport) = self.transport.take() else {
            return;
        };

        match tokio::time::timeout(self.send_timeout, transport.close()).await {
            Ok(Ok(())) => info!("Disconnected from desktop listener"),
            Ok(Err(e)) => debug!("Error while closing desktop connection: {}", e),
            Err(_) => warn!(
                "Desktop listener did not acknowledge close within {:?}, dropping connection",
                self.send_timeout
            ),
        }
    }
}

fn connect_error(uri: &str, err: TransportError) -> BridgeError {
    let code = match &err {
        TransportError::Timeout(_) => ErrorCode::SINK_CONNECT_TIMEOUT,
        _ => ErrorCode::SINK_CONNECT_FAILED,
    };
    BridgeError::connect_with_code(code, uri, err.to_string()).with_source(err)
}

fn send_error(err: TransportError) -> BridgeError {
    let code = match &err {
        TransportError::Serialization(_) => ErrorCode::SINK_SERIALIZATION,
        _ => ErrorCode::SINK_SEND_FAILED,
    };
    BridgeError::send_with_code(code, err.to_string()).with_source(err)
}
