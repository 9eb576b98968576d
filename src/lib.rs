//! # adb-bridge
//!
//! Tails `adb logcat` on an attached Android device, classifies crash and error
//! signatures, and forwards them as JSON events to a desktop listener over a
//! WebSocket.
//!
//! ## Usage
//!
//! ```bash
//! adb-bridge [--sink-uri ws://localhost:6544] [--device SERIAL] [-v]
//! ```
//!
//! ## Modules
//!
//! - `adb` - Device enumeration and the logcat command line
//! - `app` - Configuration, logging setup and fatal error reporting
//! - `classify` - Ordered error signatures and the pure line classifier
//! - `error` - Session error taxonomy with stable error codes
//! - `forward` - Connection to the desktop listener and the outbound messages
//! - `monitor` - Session lifecycle: start, run loop, stop, shutdown signals
//! - `subprocess` - Process runner abstraction and the streaming line reader
pub mod adb;
pub mod app;
pub mod classify;
pub mod error;
pub mod forward;
pub mod monitor;
pub mod subprocess;

pub use error::BridgeError;
pub use monitor::{MonitorController, MonitoringState};
