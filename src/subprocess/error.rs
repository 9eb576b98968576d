use crate::error::{BridgeError, ErrorCode};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Process timed out after {0:?}")]
    Timeout(Duration),

    #[error("Process exited with code {code}: {stderr}")]
    ExitCode { code: i32, stderr: String },

    #[error("Process terminated by signal {0}")]
    Signal(i32),

    #[error("Failed to capture {0} of child process")]
    MissingPipe(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No reply scripted for: {0}")]
    Unscripted(String),
}

/// Convert ProcessError to a launch failure
impl From<ProcessError> for BridgeError {
    fn from(err: ProcessError) -> Self {
        let code = match &err {
            ProcessError::CommandNotFound(_) => ErrorCode::LAUNCH_COMMAND_NOT_FOUND,
            ProcessError::ExitCode { .. } | ProcessError::Signal(_) => {
                ErrorCode::LAUNCH_EXITED_EARLY
            }
            _ => ErrorCode::LAUNCH_GENERIC,
        };
        BridgeError::launch_with_code(code, err.to_string(), None).with_source(err)
    }
}
