//! Application module
//!
//! Binary-level concerns:
//! - Configuration handling
//! - Logging setup
//! - Fatal error reporting

pub mod config;
pub mod error_handling;
pub mod logging;

pub use config::{BridgeConfig, ConfigOverrides};
pub use error_handling::handle_fatal_error;
pub use logging::init_logging;
