//! Delivery of events and status notifications to the desktop listener.
//!
//! `ForwardingChannel` owns at most one connection, opened through a
//! `SinkConnector`. Production uses `WebSocketConnector`; tests substitute
//! `MockSinkConnector`.

pub mod channel;
pub mod message;
pub mod mock;
pub mod transport;

pub use channel::{
    ChannelStats, ConnectionState, ForwardingChannel, SendOutcome, DEFAULT_SEND_TIMEOUT,
};
pub use message::{OutboundMessage, StatusKind, StatusMessage};
pub use mock::MockSinkConnector;
pub use transport::{
    SinkConnector, SinkTransport, TransportError, WebSocketConnector, WebSocketTransport,
};
