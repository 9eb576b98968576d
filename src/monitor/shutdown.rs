//! Operator cancellation
//!
//! SIGINT/SIGTERM (Ctrl+C on other platforms) set a shared flag that the
//! monitor's run loop checks at the top of every iteration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Shutdown request flag shared between the signal handler and the run loop
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    requested: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if shutdown was requested
    pub fn is_shutdown_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Request shutdown
    pub fn request_shutdown(&self) {
        self.requested.store(true, Ordering::Release);
    }

    /// Clone the flag for sharing with another task
    pub fn clone_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.requested)
    }
}

/// Create a shutdown signal that listens for SIGINT/SIGTERM
#[cfg(unix)]
pub fn shutdown_signal() -> ShutdownSignal {
    let signal = ShutdownSignal::new();
    let flag = signal.clone_flag();

    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigint, mut sigterm) =
            match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
                (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
                (Err(e), _) | (_, Err(e)) => {
                    warn!("Failed to install signal handlers: {}", e);
                    return;
                }
            };

        tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT, stopping monitoring");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, stopping monitoring");
            }
        }

        flag.store(true, Ordering::Release);
    });

    signal
}

#[cfg(not(unix))]
pub fn shutdown_signal() -> ShutdownSignal {
    let signal = ShutdownSignal::new();
    let flag = signal.clone_flag();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, stopping monitoring");
            }
            Err(e) => {
                warn!("Failed to listen for Ctrl+C signal: {}", e);
                return;
            }
        }

        flag.store(true, Ordering::Release);
    });

    signal
}
