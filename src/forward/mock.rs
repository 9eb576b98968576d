use async_trait::async_trait;
use futures::future;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::transport::{SinkConnector, SinkTransport, TransportError};

#[derive(Default)]
struct MockSinkState {
    refuse: bool,
    time_out: bool,
    stalled: bool,
    sends_before_failure: Option<usize>,
    connected_uris: Vec<String>,
    sent: Vec<String>,
    closes: usize,
}

/// In-memory sink that records every payload it receives.
#[derive(Clone, Default)]
pub struct MockSinkConnector {
    state: Arc<Mutex<MockSinkState>>,
}

impl MockSinkConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every connection attempt fails.
    pub fn refusing() -> Self {
        let sink = Self::new();
        sink.state.lock().unwrap().refuse = true;
        sink
    }

    /// Every connection attempt times out.
    pub fn timing_out() -> Self {
        let sink = Self::new();
        sink.state.lock().unwrap().time_out = true;
        sink
    }

    /// The listener stops reading: later sends and closes never complete.
    pub fn stall(&self) {
        self.state.lock().unwrap().stalled = true;
    }

    /// Allow `count` more successful sends, then fail every send after that.
    pub fn fail_sends_after(&self, count: usize) {
        self.state.lock().unwrap().sends_before_failure = Some(count);
    }

    pub fn sent_raw(&self) -> Vec<String> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Received payloads parsed as JSON.
    pub fn sent(&self) -> Vec<Value> {
        self.sent_raw()
            .iter()
            .map(|payload| serde_json::from_str(payload).unwrap())
            .collect()
    }

    pub fn connected_uris(&self) -> Vec<String> {
        self.state.lock().unwrap().connected_uris.clone()
    }

    pub fn close_count(&self) -> usize {
        self.state.lock().unwrap().closes
    }
}

#[async_trait]
impl SinkConnector for MockSinkConnector {
    async fn connect(&self, uri: &str) -> Result<Box<dyn SinkTransport>, TransportError> {
        let mut state = self.state.lock().unwrap();
        if state.refuse {
            return Err(TransportError::Refused(uri.to_string()));
        }
        if state.time_out {
            return Err(TransportError::Timeout(Duration::from_secs(10)));
        }
        state.connected_uris.push(uri.to_string());
        Ok(Box::new(MockSinkTransport {
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockSinkTransport {
    state: Arc<Mutex<MockSinkState>>,
}

#[async_trait]
impl SinkTransport for MockSinkTransport {
    async fn send_text(&mut self, payload: String) -> Result<(), TransportError> {
        let stalled = self.state.lock().unwrap().stalled;
        if stalled {
            return future::pending().await;
        }

        let mut state = self.state.lock().unwrap();
        if let Some(remaining) = state.sends_before_failure.as_mut() {
            if *remaining == 0 {
                return Err(TransportError::Closed);
            }
            *remaining -= 1;
        }
        state.sent.push(payload);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let stalled = {
            let mut state = self.state.lock().unwrap();
            state.closes += 1;
            state.stalled
        };
        if stalled {
            return future::pending().await;
        }
        Ok(())
    }
}
