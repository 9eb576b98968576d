//! Transport seam between the forwarding channel and the remote sink.

use async_trait::async_trait;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Connection refused: {0}")]
    Refused(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connection closed")]
    Closed,

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// An open connection to the sink.
#[async_trait]
pub trait SinkTransport: Send {
    async fn send_text(&mut self, payload: String) -> Result<(), TransportError>;
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Opens connections to the sink.
#[async_trait]
pub trait SinkConnector: Send + Sync {
    async fn connect(&self, uri: &str) -> Result<Box<dyn SinkTransport>, TransportError>;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct WebSocketConnector {
    connect_timeout: Duration,
}

impl WebSocketConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for WebSocketConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

#[async_trait]
impl SinkConnector for WebSocketConnector {
    async fn connect(&self, uri: &str) -> Result<Box<dyn SinkTransport>, TransportError> {
        let (stream, response) = tokio::time::timeout(self.connect_timeout, connect_async(uri))
            .await
            .map_err(|_| TransportError::Timeout(self.connect_timeout))??;

        debug!(
            "WebSocket handshake with {} completed ({})",
            uri,
            response.status()
        );
        Ok(Box::new(WebSocketTransport::new(stream)))
    }
}

/// WebSocket connection; incoming frames are drained in the background so
/// control frames get answered.
pub struct WebSocketTransport {
    sink: SplitSink<WsStream, Message>,
    reader: JoinHandle<()>,
}

impl WebSocketTransport {
    fn new(stream: WsStream) -> Self {
        let (sink, mut incoming) = stream.split();

        let reader = tokio::spawn(async move {
            while let Some(frame) = incoming.next().await {
                match frame {
                    Ok(Message::Close(frame)) => {
                        debug!("Sink closed the connection: {:?}", frame);
                        break;
                    }
                    Ok(Message::Text(text)) => {
                        debug!("Ignoring message from sink: {}", text.as_str());
                    }
                    Ok(_) => {}
                    Err(e) => {
                        debug!("Sink read error: {}", e);
                        break;
                    }
                }
            }
        });

        Self { sink, reader }
    }
}

#[async_trait]
impl SinkTransport for WebSocketTransport {
    async fn send_text(&mut self, payload: String) -> Result<(), TransportError> {
        self.sink.send(Message::text(payload)).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let result = SinkExt::close(&mut self.sink).await;
        self.reader.abort();
        result.map_err(TransportError::from)
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
