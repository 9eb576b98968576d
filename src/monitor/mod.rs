//! Monitoring session lifecycle
//!
//! `idle -> starting -> active -> stopping -> idle`, driven by
//! `MonitorController`. An aborted start goes straight back to `idle`.

pub mod controller;
pub mod shutdown;
pub mod state;

#[cfg(test)]
mod tests;

pub use controller::{
    LoopExit, MonitorController, MonitorSettings, SessionStats, DEFAULT_SINK_URI,
};
pub use shutdown::{shutdown_signal, ShutdownSignal};
pub use state::{InvalidTransition, MonitoringState, StateMachine};
