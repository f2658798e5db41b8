//! Drive power-state control
//!
//! [`DeviceControl`] is the seam between the daemon loop and the machine.
//! [`HdparmControl`] talks to real drives, [`DryRun`] wraps any other
//! control and only logs what it would change.

mod dry_run;
mod hdparm;

pub use dry_run::DryRun;
pub use hdparm::{parse_hdparm_state, HdparmControl, DEFAULT_HDPARM_PATH};

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use thiserror::Error;

/// Standby value that disables the spindown timer
pub const SPINDOWN_DISABLED: u8 = 0;

/// Normalized drive power state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerState {
    Active,
    Standby,
}

impl PowerState {
    /// Collapse a raw state description ("active/idle", "standby", "sleeping", ...)
    pub fn normalize(raw: &str) -> Option<Self> {
        let raw = raw.trim().to_lowercase();
        if raw.contains("standby") || raw.contains("sleeping") {
            Some(PowerState::Standby)
        } else if raw.contains("active") || raw.contains("idle") {
            Some(PowerState::Active)
        } else {
            None
        }
    }

    pub fn is_standby(self) -> bool {
        self == PowerState::Standby
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerState::Active => f.write_str("active"),
            PowerState::Standby => f.write_str("standby"),
        }
    }
}

#[derive(Debug, Error)]
pub enum HwError {
    #[error("failed to enumerate block devices under {}: {source}", path.display())]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("device {device} not found")]
    NotFound { device: String },
    #[error("failed to read power state of {device}: {reason}")]
    StateRead { device: String, reason: String },
    #[error("failed to set standby timeout {value} on {device}: {reason}")]
    Control {
        device: String,
        value: u8,
        reason: String,
    },
}

/// Capabilities the daemon needs from the platform.
///
/// Every call may fail independently. Implementations must be shareable
/// between the poll and schedule tasks.
pub trait DeviceControl: Send + Sync {
    /// Device paths (e.g. `/dev/sda`) of all rotational disks
    fn list_devices(&self) -> impl Future<Output = Result<Vec<String>, HwError>> + Send;

    /// Current normalized power state of `device`
    fn get_state(&self, device: &str) -> impl Future<Output = Result<PowerState, HwError>> + Send;

    /// Set the standby timeout of `device` (`hdparm -S` units).
    /// [`SPINDOWN_DISABLED`] turns automatic spindown off.
    fn set_standby_timeout(
        &self,
        device: &str,
        value: u8,
    ) -> impl Future<Output = Result<(), HwError>> + Send;
}

impl<C: DeviceControl> DeviceControl for std::sync::Arc<C> {
    fn list_devices(&self) -> impl Future<Output = Result<Vec<String>, HwError>> + Send {
        (**self).list_devices()
    }

    fn get_state(&self, device: &str) -> impl Future<Output = Result<PowerState, HwError>> + Send {
        (**self).get_state(device)
    }

    fn set_standby_timeout(
        &self,
        device: &str,
        value: u8,
    ) -> impl Future<Output = Result<(), HwError>> + Send {
        (**self).set_standby_timeout(device, value)
    }
}

/// Devices to monitor: `requested` when non-empty, otherwise every
/// rotational disk `control` discovers. An empty result is not an error.
pub async fn resolve_devices<C: DeviceControl>(
    control: &C,
    requested: Vec<String>,
) -> Result<Vec<String>, HwError> {
    if !requested.is_empty() {
        return Ok(requested);
    }
    control.list_devices().await
}
