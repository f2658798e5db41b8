use tracing::info;

use super::{DeviceControl, HwError, PowerState};

/// Passes reads through to `inner`, logs writes instead of issuing them
#[derive(Debug, Clone)]
pub struct DryRun<C> {
    inner: C,
}

impl<C> DryRun<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: DeviceControl> DeviceControl for DryRun<C> {
    async fn list_devices(&self) -> Result<Vec<String>, HwError> {
        self.inner.list_devices().await
    }

    async fn get_state(&self, device: &str) -> Result<PowerState, HwError> {
        self.inner.get_state(device).await
    }

    async fn set_standby_timeout(&self, device: &str, value: u8) -> Result<(), HwError> {
        info!(device, value, "dry-run: would run hdparm -S {} {}", value, device);
        Ok(())
    }
}
