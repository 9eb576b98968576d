use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use super::DeviceBackend;
use crate::subprocess::{ProcessCommand, ProcessError};

/// Scripted device backend: a fixed device list and a shell command standing
/// in for `adb logcat`.
#[derive(Clone)]
pub struct MockDeviceBackend {
    devices: Arc<Mutex<Vec<String>>>,
    fail_listing: Arc<Mutex<bool>>,
    producer: ProcessCommand,
    launched_for: Arc<Mutex<Vec<String>>>,
    list_calls: Arc<Mutex<usize>>,
}

impl MockDeviceBackend {
    /// Devices are attached; the producer runs `sh -c <script>`.
    pub fn with_script(devices: &[&str], script: &str) -> Self {
        Self::with_command(
            devices,
            ProcessCommand::new("sh").arg("-c").arg(script),
        )
    }

    pub fn with_command(devices: &[&str], producer: ProcessCommand) -> Self {
        Self {
            devices: Arc::new(Mutex::new(devices.iter().map(|d| d.to_string()).collect())),
            fail_listing: Arc::new(Mutex::new(false)),
            producer,
            launched_for: Arc::new(Mutex::new(Vec::new())),
            list_calls: Arc::new(Mutex::new(0)),
        }
    }

    /// No device attached.
    pub fn empty() -> Self {
        Self::with_script(&[], "true")
    }

    pub fn set_devices(&self, devices: &[&str]) {
        *self.devices.lock().unwrap() = devices.iter().map(|d| d.to_string()).collect();
    }

    /// Make enumeration fail as if `adb devices` could not run.
    pub fn fail_listing(&self) {
        *self.fail_listing.lock().unwrap() = true;
    }

    /// Devices a producer command was requested for, in order.
    pub fn launched_for(&self) -> Vec<String> {
        self.launched_for.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        *self.list_calls.lock().unwrap()
    }
}

#[async_trait]
impl DeviceBackend for MockDeviceBackend {
    async fn list_devices(&self) -> Result<Vec<String>, ProcessError> {
        *self.list_calls.lock().unwrap() += 1;
        if *self.fail_listing.lock().unwrap() {
            return Err(ProcessError::CommandNotFound("adb".to_string()));
        }
        Ok(self.devices.lock().unwrap().clone())
    }

    fn logcat_command(&self, device_id: &str) -> ProcessCommand {
        self.launched_for
            .lock()
            .unwrap()
            .push(device_id.to_string());
        self.producer.clone()
    }
}
