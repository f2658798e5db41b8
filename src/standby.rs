//! Standby timeout sweeps
//!
//! Shared by the daemon's scheduled trigger and the one-shot `standby` command.

use anyhow::{bail, Result};
use tracing::{error, info};

use crate::hw::{DeviceControl, HwError};

/// Outcome of one sweep across devices
#[derive(Debug, Default)]
pub struct StandbyReport {
    pub applied: Vec<String>,
    pub failed: Vec<(String, HwError)>,
}

impl StandbyReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Set `value` on every device in order, continuing past failures.
/// Each failure is logged on its own.
pub async fn apply_standby<C>(control: &C, devices: &[String], value: u8) -> StandbyReport
where
    C: DeviceControl,
{
    let mut report = StandbyReport::default();

    for device in devices {
        match control.set_standby_timeout(device, value).await {
            Ok(()) => {
                info!("set standby timeout {} on {}", value, device);
                report.applied.push(device.clone());
            }
            Err(e) => {
                error!("failed to set standby on {}: {}", device, e);
                report.failed.push((device.clone(), e));
            }
        }
    }

    report
}

/// One-shot `standby` command: apply once, fail if any device failed
pub async fn run_standby<C: DeviceControl>(control: &C, devices: &[String], value: u8) -> Result<()> {
    info!("setting standby timeout {} for devices: {:?}", value, devices);

    let report = apply_standby(control, devices, value).await;
    if !report.is_success() {
        let failed: Vec<&str> = report.failed.iter().map(|(device, _)| device.as_str()).collect();
        bail!(
            "failed to set standby timeout on {} of {} devices: {}",
            failed.len(),
            devices.len(),
            failed.join(", ")
        );
    }

    Ok(())
}
