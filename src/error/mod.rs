use thiserror::Error;

pub mod codes;

pub use codes::{describe_error_code, ErrorCode};

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// The error taxonomy of a monitoring session.
///
/// `Connect`, `NoDeviceAvailable` and `Launch` are the ways a session can fail to
/// start; `Send` is reported while a session is active. A malformed log line and
/// a producer that exits are not errors and never appear here.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("[E{code:04}] Configuration error: {message}")]
    Config { code: u16, message: String },

    #[error("[E{code:04}] Failed to launch log producer: {message}")]
    Launch {
        code: u16,
        message: String,
        device_id: Option<String>,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("[E{code:04}] Failed to connect to {uri}: {message}")]
    Connect {
        code: u16,
        uri: String,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("[E{code:04}] No Android device available for monitoring")]
    NoDeviceAvailable {
        code: u16,
        preferred: Option<String>,
    },

    #[error("[E{code:04}] Failed to forward message: {message}")]
    Send {
        code: u16,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("[E{code:04}] Monitoring session is already {state}")]
    AlreadyRunning { code: u16, state: String },
}

impl BridgeError {
    /// Create a configuration error with specific code
    pub fn config_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Config {
            code,
            message: message.into(),
        }
    }

    pub fn launch_with_code(
        code: u16,
        message: impl Into<String>,
        device_id: Option<String>,
    ) -> Self {
        Self::Launch {
            code,
            message: message.into(),
            device_id,
            source: None,
        }
    }

    /// Create a connection error for a sink URI
    pub fn connect(uri: impl Into<String>, message: impl Into<String>) -> Self {
        Self::connect_with_code(ErrorCode::SINK_CONNECT_FAILED, uri, message)
    }

    pub fn connect_with_code(
        code: u16,
        uri: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Connect {
            code,
            uri: uri.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn no_device(preferred: Option<String>) -> Self {
        Self::NoDeviceAvailable {
            code: ErrorCode::SESSION_NO_DEVICE,
            preferred,
        }
    }

    pub fn send_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Send {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn already_running(state: impl std::fmt::Display) -> Self {
        Self::AlreadyRunning {
            code: ErrorCode::SESSION_ALREADY_RUNNING,
            state: state.to_string(),
        }
    }

    /// Attach a source error, where the variant carries one
    pub fn with_source(mut self, err: impl Into<BoxedSource>) -> Self {
        match &mut self {
            Self::Launch { source, .. } | Self::Connect { source, .. } | Self::Send { source, .. } => {
                *source = Some(err.into());
            }
            Self::Config { .. } | Self::NoDeviceAvailable { .. } | Self::AlreadyRunning { .. } => {}
        }
        self
    }

    /// Record the device a launch failure concerns
    pub fn with_device(mut self, id: impl Into<String>) -> Self {
        if let Self::Launch { device_id, .. } = &mut self {
            *device_id = Some(id.into());
        }
        self
    }

    /// Get the error code
    pub fn code(&self) -> u16 {
        match self {
            Self::Config { code, .. }
            | Self::Launch { code, .. }
            | Self::Connect { code, .. }
            | Self::NoDeviceAvailable { code, .. }
            | Self::Send { code, .. }
            | Self::AlreadyRunning { code, .. } => *code,
        }
    }

    /// Whether this error prevented a session from starting
    pub fn is_start_error(&self) -> bool {
        matches!(
            self,
            Self::Launch { .. } | Self::Connect { .. } | Self::NoDeviceAvailable { .. }
        )
    }

    /// Process exit code used by the binary
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 2,
            Self::Connect { .. } => 3,
            Self::NoDeviceAvailable { .. } => 4,
            Self::Launch { .. } => 5,
            Self::Send { .. } => 6,
            Self::AlreadyRunning { .. } => 1,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Config { message, .. } => format!("Configuration problem: {}", message),
            Self::Launch {
                message, device_id, ..
            } => match device_id {
                Some(id) => format!("Could not start logcat on device {}: {}", id, message),
                None => format!("Could not start logcat: {}", message),
            },
            Self::Connect { uri, message, .. } => {
                format!("Could not reach the desktop listener at {}: {}", uri, message)
            }
            Self::NoDeviceAvailable { preferred, .. } => match preferred {
                Some(serial) => format!(
                    "Device {} is not attached. Check `adb devices` and the USB connection.",
                    serial
                ),
                None => "No Android device is attached. Connect a device and enable USB debugging."
                    .to_string(),
            },
            Self::Send { message, .. } => format!("Lost connection to the desktop listener: {}", message),
            Self::AlreadyRunning { state, .. } => {
                format!("The bridge is already {}; stop it before starting again", state)
            }
        }
    }

    /// Full diagnostic message including the source chain
    pub fn developer_message(&self) -> String {
        let mut msg = format!("{} ({})", self, describe_error_code(self.code()));
        let mut current = std::error::Error::source(self);
        while let Some(cause) = current {
            msg.push_str(&format!("\n  caused by: {}", cause));
            current = cause.source();
        }
        msg
    }
}
