//! Android Debug Bridge collaborator
//!
//! Provides trait-based access to device enumeration and to the logcat
//! command line so the monitor can be exercised without a device attached.

pub mod mock;

pub use mock::MockDeviceBackend;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::subprocess::{ProcessCommand, ProcessError, ProcessRunner, TokioProcessRunner};

/// Source of attached devices and of the log producer command for one of them.
#[async_trait]
pub trait DeviceBackend: Send + Sync {
    /// Identifiers of the devices currently attached and ready.
    async fn list_devices(&self) -> Result<Vec<String>, ProcessError>;

    /// Command that streams error-level, thread-time formatted log entries.
    fn logcat_command(&self, device_id: &str) -> ProcessCommand;
}

/// `adb` executable backed implementation.
pub struct AdbBackend {
    program: String,
    runner: Arc<dyn ProcessRunner>,
    list_timeout: Duration,
}

impl AdbBackend {
    pub fn new(program: impl Into<String>) -> Self {
        Self::with_runner(program, Arc::new(TokioProcessRunner))
    }

    pub fn with_runner(program: impl Into<String>, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            program: program.into(),
            runner,
            list_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_list_timeout(mut self, timeout: Duration) -> Self {
        self.list_timeout = timeout;
        self
    }

    /// Run `adb version` and return its first line.
    pub async fn version(&self) -> Result<String, ProcessError> {
        let command = ProcessCommand::new(&self.program)
            .arg("version")
            .with_timeout(Duration::from_secs(5));
        let output = self.runner.run(command).await?;

        if !output.status.success() {
            return Err(ProcessError::ExitCode {
                code: output.status.code().unwrap_or(-1),
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output.stdout.lines().next().unwrap_or_default().trim().to_string())
    }
}

#[async_trait]
impl DeviceBackend for AdbBackend {
    async fn list_devices(&self) -> Result<Vec<String>, ProcessError> {
        let command = ProcessCommand::new(&self.program)
            .arg("devices")
            .with_timeout(self.list_timeout);
        let output = self.runner.run(command).await?;

        if !output.status.success() {
            return Err(ProcessError::ExitCode {
                code: output.status.code().unwrap_or(-1),
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(parse_devices_output(&output.stdout))
    }

    fn logcat_command(&self, device_id: &str) -> ProcessCommand {
        ProcessCommand::new(&self.program)
            .args(["-s", device_id, "logcat", "*:E", "-v", "threadtime"])
    }
}

/// Parse `adb devices` output into ready device serials.
///
/// The header line is skipped and only rows in the `device` state are kept,
/// so `offline` and `unauthorized` devices are ignored.
pub fn parse_devices_output(stdout: &str) -> Vec<String> {
    stdout
        .trim()
        .lines()
        .skip(1)
        .filter_map(|line| {
            let mut parts = line.split('\t');
            match (parts.next(), parts.next()) {
                (Some(serial), Some(state)) if !serial.trim().is_empty() && state.trim() == "device" => {
                    Some(serial.trim().to_string())
                }
                _ => None,
            }
        })
        .collect()
}

/// Query the backend and pick the device to monitor.
///
/// With a preferred serial only that device is accepted; otherwise the first
/// listed device wins. Enumeration failures are logged and yield `None`.
pub async fn resolve_device(
    backend: &dyn DeviceBackend,
    preferred: Option<&str>,
) -> Option<String> {
    let devices = match backend.list_devices().await {
        Ok(devices) => devices,
        Err(e) => {
            error!("Error getting connected devices: {}", e);
            return None;
        }
    };
    select_device(&devices, preferred)
}

pub fn select_device(devices: &[String], preferred: Option<&str>) -> Option<String> {
    if devices.is_empty() {
        warn!("No Android devices connected");
        return None;
    }

    if let Some(serial) = preferred {
        if devices.iter().any(|d| d == serial) {
            info!("Using requested device: {}", serial);
            return Some(serial.to_string());
        }
        warn!(
            "Requested device {} is not attached (found: {})",
            serial,
            devices.join(", ")
        );
        return None;
    }

    if devices.len() == 1 {
        info!("Auto-selected device: {}", devices[0]);
    } else {
        info!("Multiple devices found: {}", devices.join(", "));
        info!("Using first device: {}", devices[0]);
    }
    Some(devices[0].clone())
}
