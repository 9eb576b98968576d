//! Error handling utilities
//!
//! This module provides centralized error handling for the binary.

use tracing::error;

use crate::error::BridgeError;

/// Print a fatal error and exit with its status code
///
/// - For `BridgeError`: shows the user message, plus the developer message with
///   its cause chain when `verbose >= 1`
/// - For other errors: shows the message and, in verbose mode, the chain
pub fn handle_fatal_error(error: anyhow::Error, verbose: u8) -> ! {
    error!("Fatal error: {}", error);
    eprintln!("{}", render_fatal_error(&error, verbose));
    std::process::exit(exit_code_for(&error))
}

pub fn exit_code_for(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<BridgeError>()
        .map(BridgeError::exit_code)
        .unwrap_or(1)
}

fn render_fatal_error(error: &anyhow::Error, verbose: u8) -> String {
    if let Some(bridge_err) = error.downcast_ref::<BridgeError>() {
        let mut out = bridge_err.user_message();
        if verbose >= 1 {
            out.push_str("\n\nContext Chain:\n");
            out.push_str(&bridge_err.developer_message());
        }
        return out;
    }

    let mut out = format!("Error: {error}");
    if verbose >= 1 {
        out.push_str("\n\nError chain:");
        for (i, cause) in error.chain().enumerate() {
            out.push_str(&format!("\n  {}: {}", i, cause));
        }
    }
    out
}
