//! Common test utilities: a local WebSocket listener standing in for the desktop

#![allow(dead_code)]

use futures::{future, StreamExt};
use serde_json::Value;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

pub const DEVICE: &str = "emulator-5554";

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// WebSocket server recording every JSON message it receives.
pub struct TestSink {
    addr: SocketAddr,
    messages: mpsc::UnboundedReceiver<Value>,
    server: JoinHandle<()>,
}

impl TestSink {
    /// Accept any number of connections and keep them open.
    pub async fn start() -> Self {
        Self::start_closing_after(None).await
    }

    /// Close each connection after it delivered `count` messages.
    pub async fn start_closing_after(count: Option<usize>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, messages) = mpsc::unbounded_channel();

        let server = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let tx = tx.clone();
                tokio::spawn(async move {
                    let Ok(mut ws) = accept_async(stream).await else {
                        return;
                    };
                    let mut received = 0;
                    while let Some(Ok(frame)) = ws.next().await {
                        match frame {
                            Message::Text(text) => {
                                let value = serde_json::from_str(text.as_str()).unwrap();
                                let _ = tx.send(value);
                                received += 1;
                                if count == Some(received) {
                                    let _ = ws.close(None).await;
                                    break;
                                }
                            }
                            Message::Close(_) => break,
                            _ => {}
                        }
                    }
                });
            }
        });

        Self {
            addr,
            messages,
            server,
        }
    }

    /// Complete the handshake, then never read from the connection again.
    pub async fn start_unread() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (_tx, messages) = mpsc::unbounded_channel();

        let server = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let Ok(ws) = accept_async(stream).await else {
                        return;
                    };
                    let _held = ws;
                    future::pending::<()>().await;
                });
            }
        });

        Self {
            addr,
            messages,
            server,
        }
    }

    pub fn uri(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub async fn next_message(&mut self) -> Value {
        tokio::time::timeout(RECV_TIMEOUT, self.messages.recv())
            .await
            .expect("timed out waiting for a message")
            .expect("sink stopped")
    }

    /// Messages received so far, without waiting.
    pub fn drain(&mut self) -> Vec<Value> {
        let mut out = Vec::new();
        while let Ok(value) = self.messages.try_recv() {
            out.push(value);
        }
        out
    }
}

impl Drop for TestSink {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// URI of a local port nobody listens on.
pub async fn unused_uri() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{}", addr)
}

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn message_type(value: &Value) -> &str {
    value["type"].as_str().unwrap_or_default()
}
