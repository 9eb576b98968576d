/// Error code registry for the bridge
///
/// Error codes are organized by category:
/// - 1000-1999: Configuration errors
/// - 2000-2999: Session lifecycle errors
/// - 3000-3999: Producer (logcat subprocess) errors
/// - 4000-4999: Forwarding sink errors
pub struct ErrorCode;

impl ErrorCode {
    // Configuration errors (1000-1999)
    pub const CONFIG_INVALID_URI: u16 = 1001;
    pub const CONFIG_INVALID_VALUE: u16 = 1002;

    // Session errors (2000-2999)
    pub const SESSION_ALREADY_RUNNING: u16 = 2001;
    pub const SESSION_NO_DEVICE: u16 = 2002;

    // Producer errors (3000-3999)
    pub const LAUNCH_GENERIC: u16 = 3000;
    pub const LAUNCH_COMMAND_NOT_FOUND: u16 = 3001;
    pub const LAUNCH_EXITED_EARLY: u16 = 3002;

    // Sink errors (4000-4999)
    pub const SINK_CONNECT_FAILED: u16 = 4000;
    pub const SINK_CONNECT_TIMEOUT: u16 = 4001;
    pub const SINK_SEND_FAILED: u16 = 4002;
    pub const SINK_SERIALIZATION: u16 = 4003;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        1001 => "Sink URI is not a valid ws:// URL",
        1002 => "Invalid value in configuration",

        2001 => "A monitoring session is already running",
        2002 => "No Android device available for monitoring",

        3000 => "Failed to launch the log producer",
        3001 => "Log producer executable not found",
        3002 => "Log producer exited during start-up",

        4000 => "Failed to connect to the forwarding sink",
        4001 => "Timed out connecting to the forwarding sink",
        4002 => "Failed to send a message to the forwarding sink",
        4003 => "Failed to serialize an outbound message",

        _ => "Unknown error code",
    }
}
