//! Monitoring session orchestration
//!
//! `MonitorController` wires the log producer, the classifier and the
//! forwarding channel together for one session at a time and owns the
//! `MonitoringState` lifecycle.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn, Instrument, Span};
use uuid::Uuid;

use super::shutdown::ShutdownSignal;
use super::state::{MonitoringState, StateMachine};
use crate::adb::{resolve_device, DeviceBackend};
use crate::classify::LineClassifier;
use crate::error::BridgeError;
use crate::forward::{
    ConnectionState, ForwardingChannel, OutboundMessage, SendOutcome, SinkConnector, StatusMessage,
    DEFAULT_SEND_TIMEOUT,
};
use crate::subprocess::{ReadOutcome, ReaderOptions, StreamReader};

/// Characters of the message shown when an error is detected.
const DETECTED_PREVIEW_CHARS: usize = 100;
/// Characters of the message shown when an error is forwarded.
const FORWARDED_PREVIEW_CHARS: usize = 50;

pub const DEFAULT_SINK_URI: &str = "ws://localhost:6544";

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub sink_uri: String,
    /// Serial to monitor when several devices are attached.
    pub preferred_device: Option<String>,
    /// Limit on each send and on the close handshake.
    pub send_timeout: Duration,
    pub reader: ReaderOptions,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            sink_uri: DEFAULT_SINK_URI.to_string(),
            preferred_device: None,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            reader: ReaderOptions::default(),
        }
    }
}

/// Per-session counters, reset on every `start`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub lines_read: u64,
    pub events_classified: u64,
    pub events_delivered: u64,
    pub events_dropped: u64,
}

/// Why the run loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    EndOfStream,
    ShutdownRequested,
    /// The loop was entered without an active session.
    NotActive,
}

pub struct MonitorController {
    backend: Arc<dyn DeviceBackend>,
    channel: ForwardingChannel,
    classifier: LineClassifier,
    settings: MonitorSettings,
    state: StateMachine,
    reader: Option<StreamReader>,
    device_id: Option<String>,
    session_id: Option<Uuid>,
    span: Span,
    stats: SessionStats,
}

impl MonitorController {
    pub fn new(
        backend: Arc<dyn DeviceBackend>,
        connector: Arc<dyn SinkConnector>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            backend,
            channel: ForwardingChannel::new(connector).with_send_timeout(settings.send_timeout),
            classifier: LineClassifier::default(),
            settings,
            state: StateMachine::new(),
            reader: None,
            device_id: None,
            session_id: None,
            span: Span::none(),
            stats: SessionStats::default(),
        }
    }

    pub fn with_classifier(mut self, classifier: LineClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn state(&self) -> MonitoringState {
        self.state.current()
    }

    /// Device of the current session, if one is running.
    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    /// Identifier of the most recent session.
    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.channel.state()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    /// Begin a session: connect, pick a device, launch the producer.
    ///
    /// Any failure returns the controller to `Idle` with the channel closed.
    /// A start while a session is running is rejected and changes nothing.
    pub async fn start(&mut self) -> Result<(), BridgeError> {
        let current = self.state.current();
        if current != MonitoringState::Idle {
            warn!("Monitoring already {}, ignoring start request", current);
            return Err(BridgeError::already_running(current));
        }

        let session_id = Uuid::new_v4();
        self.session_id = Some(session_id);
        self.stats = SessionStats::default();
        self.span = tracing::info_span!(
            "session",
            session_id = %session_id,
            device_id = tracing::field::Empty
        );
        self.enter(MonitoringState::Starting);

        let span = self.span.clone();
        match self.establish().instrument(span).await {
            Ok(()) => Ok(()),
            Err(e) => {
                error!(parent: &self.span, "Failed to start monitoring: {}", e);
                self.abort_start().await;
                Err(e)
            }
        }
    }

    async fn establish(&mut self) -> Result<(), BridgeError> {
        self.channel.connect(&self.settings.sink_uri).await?;

        let preferred = self.settings.preferred_device.as_deref();
        let device = resolve_device(self.backend.as_ref(), preferred)
            .await
            .ok_or_else(|| BridgeError::no_device(self.settings.preferred_device.clone()))?;
        self.span.record("device_id", device.as_str());

        let command = self.backend.logcat_command(&device);
        let reader = StreamReader::start(&command, self.settings.reader.clone())
            .await
            .map_err(|e| BridgeError::from(e).with_device(device.as_str()))?;

        self.reader = Some(reader);
        self.device_id = Some(device.clone());

        info!("Started monitoring device: {}", device);
        let _ = self
            .channel
            .send(&StatusMessage::monitoring_active(&device).into())
            .await;
        self.enter(MonitoringState::Active);
        Ok(())
    }

    async fn abort_start(&mut self) {
        if let Some(mut reader) = self.reader.take() {
            reader.stop().await;
        }
        self.channel.close().await;
        self.device_id = None;
        self.enter(MonitoringState::Idle);
    }

    /// Read, classify and forward until the producer ends or shutdown is requested.
    ///
    /// The shutdown flag is checked before every read; a read waits at most
    /// one poll interval and a send at most the send timeout.
    pub async fn run_loop(&mut self, shutdown: &ShutdownSignal) -> LoopExit {
        if self.state.current() != MonitoringState::Active {
            return LoopExit::NotActive;
        }

        let span = self.span.clone();
        async {
            loop {
                if shutdown.is_shutdown_requested() {
                    info!("Shutdown requested, leaving monitoring loop");
                    return LoopExit::ShutdownRequested;
                }

                let Some(reader) = self.reader.as_mut() else {
                    return LoopExit::EndOfStream;
                };

                match reader.next_line().await {
                    ReadOutcome::Line(line) => self.handle_line(&line).await,
                    ReadOutcome::Idle => {}
                    ReadOutcome::EndOfStream => {
                        info!("Log producer ended");
                        return LoopExit::EndOfStream;
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn handle_line(&mut self, line: &str) {
        self.stats.lines_read += 1;

        let Some(device) = self.device_id.as_deref() else {
            return;
        };
        let Some(event) = self.classifier.classify(line, device) else {
            trace!("Skipped line: {}", line);
            return;
        };
        self.stats.events_classified += 1;

        let kind = event.error_type;
        info!(
            "Detected {} error: {}",
            kind,
            event.preview(DETECTED_PREVIEW_CHARS)
        );
        let preview = event.preview(FORWARDED_PREVIEW_CHARS);

        let message = OutboundMessage::from(event.finalize(epoch_seconds()));
        match self.channel.send(&message).await {
            SendOutcome::Delivered => {
                self.stats.events_delivered += 1;
                info!("Forwarded {} error to desktop: {}", kind, preview);
            }
            SendOutcome::Dropped | SendOutcome::Failed => {
                self.stats.events_dropped += 1;
            }
        }
    }

    /// End the session: stop the producer, report, close the connection.
    ///
    /// Returns to `Idle` from any state; a no-op when already idle.
    pub async fn stop(&mut self) {
        if self.state.current() == MonitoringState::Idle {
            debug!("Monitoring not running, nothing to stop");
            return;
        }

        let span = std::mem::replace(&mut self.span, Span::none());
        async {
            self.enter(MonitoringState::Stopping);

            if let Some(mut reader) = self.reader.take() {
                reader.stop().await;
            }

            let _ = self
                .channel
                .send(&StatusMessage::monitoring_stopped().into())
                .await;
            self.channel.close().await;
            self.device_id = None;

            let stats = self.stats;
            info!(
                lines_read = stats.lines_read,
                events_classified = stats.events_classified,
                events_delivered = stats.events_delivered,
                events_dropped = stats.events_dropped,
                "Monitoring stopped"
            );
            self.enter(MonitoringState::Idle);
        }
        .instrument(span)
        .await
    }

    /// One complete session: start, forward until the stream ends or
    /// shutdown is requested, then stop.
    pub async fn run(&mut self, shutdown: &ShutdownSignal) -> Result<SessionStats, BridgeError> {
        self.start().await?;
        let exit = self.run_loop(shutdown).await;
        debug!("Monitoring loop finished: {:?}", exit);
        self.stop().await;
        Ok(self.stats)
    }

    fn enter(&mut self, next: MonitoringState) {
        if let Err(e) = self.state.transition(next) {
            error!("{}", e);
        }
    }
}

impl Drop for MonitorController {
    fn drop(&mut self) {
        if self.state.current() != MonitoringState::Idle {
            warn!(
                "Monitor dropped while {}, producer will be killed",
                self.state.current()
            );
        }
    }
}

/// Seconds since the Unix epoch with sub-second precision.
fn epoch_seconds() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
