use anyhow::{bail, Result};
use std::fmt;
use std::time::Duration;

use crate::schedule::{Schedule, ScheduleError};

pub const DEFAULT_SCHEDULE: &str = "22 00";
pub const DEFAULT_STANDBY_VALUE: u8 = 120;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Whether standby commands reach the drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    #[default]
    Live,
    DryRun,
}

impl ExecutionMode {
    pub fn from_dry_run(dry_run: bool) -> Self {
        if dry_run {
            ExecutionMode::DryRun
        } else {
            ExecutionMode::Live
        }
    }

    pub fn is_dry_run(self) -> bool {
        self == ExecutionMode::DryRun
    }
}

/// Everything the daemon loop needs, fixed for the lifetime of a run
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    // Devices to monitor, e.g. /dev/sda
    pub devices: Vec<String>,

    pub poll_interval: Duration,

    // Parse result of the schedule literal; an error disables the scheduled sweep
    pub schedule: Result<Schedule, ScheduleError>,

    // hdparm -S value applied at the scheduled time (5 second units below 241)
    pub standby_value: u8,

    pub mode: ExecutionMode,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self::new(
            Vec::new(),
            DEFAULT_POLL_INTERVAL,
            DEFAULT_SCHEDULE,
            DEFAULT_STANDBY_VALUE,
            ExecutionMode::Live,
        )
    }
}

impl DaemonConfig {
    pub fn new(
        devices: Vec<String>,
        poll_interval: Duration,
        schedule: &str,
        standby_value: u8,
        mode: ExecutionMode,
    ) -> Self {
        Self {
            devices,
            poll_interval,
            schedule: schedule.parse(),
            standby_value,
            mode,
        }
    }

    /// Validate configuration values at startup.
    /// A malformed schedule is not an error here: the daemon runs poll-only.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if self.poll_interval.is_zero() {
            errors.push("poll interval must be greater than 0.".to_string());
        }

        if self.devices.iter().any(|d| d.trim().is_empty()) {
            errors.push("device names cannot be empty.".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )
        }
    }

    /// Devices sorted with duplicates removed
    pub fn canonical_devices(&self) -> Vec<String> {
        let mut devices = self.devices.clone();
        devices.sort();
        devices.dedup();
        devices
    }
}

impl fmt::Display for DaemonConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let schedule = match &self.schedule {
            Ok(schedule) => schedule.to_string(),
            Err(_) => "disabled".to_string(),
        };
        write!(
            f,
            "schedule={} standby={} poll={:?} dry-run={}",
            schedule,
            self.standby_value,
            self.poll_interval,
            self.mode.is_dry_run()
        )
    }
}
