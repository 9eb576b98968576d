//! Bridge configuration
//!
//! Built-in defaults, overridden by environment variables, overridden by
//! command line flags. There is no configuration file.

use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::error::{BridgeError, ErrorCode};
use crate::forward::DEFAULT_SEND_TIMEOUT;
use crate::monitor::{MonitorSettings, DEFAULT_SINK_URI};
use crate::subprocess::{ReaderOptions, MIN_IDLE_BACKOFF};

pub const ENV_SINK_URI: &str = "ADB_BRIDGE_SINK_URI";
pub const ENV_PORT: &str = "ADB_BRIDGE_PORT";
pub const ENV_ADB: &str = "ADB_BRIDGE_ADB";
pub const ENV_DEVICE: &str = "ANDROID_SERIAL";
pub const ENV_LOG_FILE: &str = "ADB_BRIDGE_LOG_FILE";

#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    /// WebSocket endpoint of the desktop listener
    pub sink_uri: String,
    /// Path or name of the adb executable
    pub adb_program: String,
    pub preferred_device: Option<String>,
    pub poll_interval: Duration,
    pub stop_grace: Duration,
    pub launch_probe: Duration,
    pub connect_timeout: Duration,
    pub send_timeout: Duration,
    pub device_list_timeout: Duration,
    pub line_queue_capacity: usize,
    /// Verbosity level for logging
    pub verbose: u8,
    /// Optional file receiving a copy of the log output
    pub log_file: Option<PathBuf>,
}

/// Values given on the command line; `None` leaves the current value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub sink_uri: Option<String>,
    pub port: Option<u16>,
    pub adb_program: Option<String>,
    pub preferred_device: Option<String>,
    pub verbose: u8,
    pub log_file: Option<PathBuf>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            sink_uri: DEFAULT_SINK_URI.to_string(),
            adb_program: "adb".to_string(),
            preferred_device: None,
            poll_interval: MIN_IDLE_BACKOFF,
            stop_grace: Duration::from_secs(5),
            launch_probe: Duration::from_millis(250),
            connect_timeout: Duration::from_secs(10),
            send_timeout: DEFAULT_SEND_TIMEOUT,
            device_list_timeout: Duration::from_secs(10),
            line_queue_capacity: 1024,
            verbose: 0,
            log_file: None,
        }
    }
}

impl BridgeConfig {
    /// Defaults, then environment, then command line.
    pub fn load(overrides: ConfigOverrides) -> Result<Self, BridgeError> {
        let mut config = Self::default();
        config.merge_env_vars()?;
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn merge_env_vars(&mut self) -> Result<(), BridgeError> {
        self.merge_env_with(|name| std::env::var(name).ok())
    }

    /// Merge variables from `lookup`; an explicit sink URI wins over a port.
    pub fn merge_env_with<F>(&mut self, lookup: F) -> Result<(), BridgeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup(ENV_PORT) {
            let port = port.trim().parse::<u16>().map_err(|_| {
                BridgeError::config_with_code(
                    ErrorCode::CONFIG_INVALID_VALUE,
                    format!("{} must be a port number, got '{}'", ENV_PORT, port),
                )
            })?;
            self.sink_uri = local_sink_uri(port);
        }

        if let Some(uri) = lookup(ENV_SINK_URI) {
            self.sink_uri = uri;
        }

        if let Some(adb) = lookup(ENV_ADB) {
            self.adb_program = adb;
        }

        if let Some(serial) = lookup(ENV_DEVICE).filter(|s| !s.trim().is_empty()) {
            self.preferred_device = Some(serial);
        }

        if let Some(path) = lookup(ENV_LOG_FILE) {
            self.log_file = Some(PathBuf::from(path));
        }

        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(port) = overrides.port {
            self.sink_uri = local_sink_uri(port);
        }
        if let Some(uri) = overrides.sink_uri {
            self.sink_uri = uri;
        }
        if let Some(adb) = overrides.adb_program {
            self.adb_program = adb;
        }
        if let Some(serial) = overrides.preferred_device {
            self.preferred_device = Some(serial);
        }
        if overrides.log_file.is_some() {
            self.log_file = overrides.log_file;
        }
        self.verbose = overrides.verbose;
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        let uri = Url::parse(&self.sink_uri).map_err(|e| {
            BridgeError::config_with_code(
                ErrorCode::CONFIG_INVALID_URI,
                format!("invalid sink URI '{}': {}", self.sink_uri, e),
            )
        })?;
        if uri.scheme() != "ws" {
            return Err(BridgeError::config_with_code(
                ErrorCode::CONFIG_INVALID_URI,
                format!(
                    "sink URI must use ws:// (TLS is not supported), got '{}'",
                    self.sink_uri
                ),
            ));
        }

        if self.adb_program.trim().is_empty() {
            return Err(BridgeError::config_with_code(
                ErrorCode::CONFIG_INVALID_VALUE,
                "adb program must not be empty",
            ));
        }
        if self.line_queue_capacity == 0 {
            return Err(BridgeError::config_with_code(
                ErrorCode::CONFIG_INVALID_VALUE,
                "line queue capacity must be greater than zero",
            ));
        }
        if self.stop_grace.is_zero() {
            return Err(BridgeError::config_with_code(
                ErrorCode::CONFIG_INVALID_VALUE,
                "stop grace period must be greater than zero",
            ));
        }
        if self.send_timeout.is_zero() {
            return Err(BridgeError::config_with_code(
                ErrorCode::CONFIG_INVALID_VALUE,
                "send timeout must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Get the log level string based on verbosity
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            2 => "trace",
            _ => "trace,tungstenite=debug,tokio_tungstenite=debug",
        }
    }

    pub fn reader_options(&self) -> ReaderOptions {
        ReaderOptions {
            poll_interval: self.poll_interval.max(MIN_IDLE_BACKOFF),
            stop_grace: self.stop_grace,
            launch_probe: self.launch_probe,
            queue_capacity: self.line_queue_capacity,
        }
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            sink_uri: self.sink_uri.clone(),
            preferred_device: self.preferred_device.clone(),
            send_timeout: self.send_timeout,
            reader: self.reader_options(),
        }
    }
}

fn local_sink_uri(port: u16) -> String {
    format!("ws://localhost:{}", port)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.sink_uri, "ws://localhost:6544");
        assert_eq!(config.adb_program, "adb");
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.stop_grace, Duration::from_secs(5));
        assert!(config.preferred_device.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides_defaults() {
        let mut config = BridgeConfig::default();
        config
            .merge_env_with(env(&[
                (ENV_PORT, "7000"),
                (ENV_ADB, "/opt/android/platform-tools/adb"),
                (ENV_DEVICE, "emulator-5556"),
                (ENV_LOG_FILE, "/tmp/adb_bridge.log"),
            ]))
            .unwrap();

        assert_eq!(config.sink_uri, "ws://localhost:7000");
        assert_eq!(config.adb_program, "/opt/android/platform-tools/adb");
        assert_eq!(config.preferred_device.as_deref(), Some("emulator-5556"));
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/adb_bridge.log")));
    }

    #[test]
    fn test_env_sink_uri_wins_over_port() {
        let mut config = BridgeConfig::default();
        config
            .merge_env_with(env(&[
                (ENV_PORT, "7000"),
                (ENV_SINK_URI, "ws://192.168.1.20:6544"),
            ]))
            .unwrap();
        assert_eq!(config.sink_uri, "ws://192.168.1.20:6544");
    }

    #[test]
    fn test_invalid_env_port() {
        let mut config = BridgeConfig::default();
        let err = config
            .merge_env_with(env(&[(ENV_PORT, "not-a-port")]))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_INVALID_VALUE);
    }

    #[test]
    fn test_blank_android_serial_is_ignored() {
        let mut config = BridgeConfig::default();
        config.merge_env_with(env(&[(ENV_DEVICE, "  ")])).unwrap();
        assert!(config.preferred_device.is_none());
    }

    #[test]
    fn test_cli_overrides_env() {
        let mut config = BridgeConfig::default();
        config
            .merge_env_with(env(&[(ENV_SINK_URI, "ws://env-host:1"), (ENV_DEVICE, "env-serial")]))
            .unwrap();
        config.apply_overrides(ConfigOverrides {
            port: Some(9000),
            preferred_device: Some("cli-serial".to_string()),
            verbose: 2,
            ..Default::default()
        });

        assert_eq!(config.sink_uri, "ws://localhost:9000");
        assert_eq!(config.preferred_device.as_deref(), Some("cli-serial"));
        assert_eq!(config.verbose, 2);
        assert_eq!(config.log_level(), "trace");
    }

    #[test]
    fn test_validate_rejects_non_websocket_uri() {
        let config = BridgeConfig {
            sink_uri: "http://localhost:6544".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.validate().unwrap_err().code(),
            ErrorCode::CONFIG_INVALID_URI
        );

        let config = BridgeConfig {
            sink_uri: "not a uri".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_tls_uri() {
        let config = BridgeConfig {
            sink_uri: "wss://desktop.local:6544".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.validate().unwrap_err().code(),
            ErrorCode::CONFIG_INVALID_URI
        );
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let config = BridgeConfig {
            line_queue_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = BridgeConfig {
            stop_grace: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = BridgeConfig {
            send_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reader_options_clamp_poll_interval() {
        let config = BridgeConfig {
            poll_interval: Duration::from_millis(10),
            ..Default::default()
        };
        assert_eq!(config.reader_options().poll_interval, MIN_IDLE_BACKOFF);
    }

    #[test]
    fn test_monitor_settings() {
        let config = BridgeConfig {
            preferred_device: Some("R58M123".to_string()),
            ..Default::default()
        };
        let settings = config.monitor_settings();
        assert_eq!(settings.sink_uri, DEFAULT_SINK_URI);
        assert_eq!(settings.preferred_device.as_deref(), Some("R58M123"));
        assert_eq!(settings.send_timeout, Duration::from_secs(2));
        assert_eq!(settings.reader.queue_capacity, 1024);
    }
}
