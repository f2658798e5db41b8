/// hdparm-backed drive control
/// Discovery reads sysfs, state and timeouts go through the hdparm binary

use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;
use tracing::{debug, trace};

use super::{DeviceControl, HwError, PowerState};

pub const DEFAULT_HDPARM_PATH: &str = "/sbin/hdparm";
pub const DEFAULT_ROOT: &str = "/";

const STATE_MARKER: &str = "drive state is:";

#[derive(Debug, Clone)]
pub struct HdparmControl {
    program: PathBuf,
    root: PathBuf,
}

impl HdparmControl {
    pub fn new(program: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            root: root.into(),
        }
    }

    pub fn from_env() -> Self {
        Self::from_getter(|key| std::env::var(key).ok())
    }

    /// Build from a custom getter function (for testing)
    pub fn from_getter<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let program = get("HDPARM_PATH")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_HDPARM_PATH.to_string());
        let root = get("HD_SMART_IDLE_ROOT")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_ROOT.to_string());
        Self::new(program, root)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn hdparm(&self, args: &[&str]) -> std::io::Result<Output> {
        trace!("running {} {}", self.program.display(), args.join(" "));
        Command::new(&self.program).args(args).output().await
    }
}

/// stdout followed by stderr, lossily decoded
fn combined_output(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    text
}

/// Extract the drive state from `hdparm -C` output.
/// Returns None when no "drive state is:" line carries a recognisable state.
pub fn parse_hdparm_state(output: &str) -> Option<PowerState> {
    output
        .lines()
        .filter(|line| line.to_lowercase().contains(STATE_MARKER))
        .filter_map(|line| line.split_once(':'))
        .find_map(|(_, state)| PowerState::normalize(state))
}

impl DeviceControl for HdparmControl {
    async fn list_devices(&self) -> Result<Vec<String>, HwError> {
        let block_dir = self.root.join("sys/block");
        let discovery_err = |source| HwError::Discovery {
            path: block_dir.clone(),
            source,
        };

        let mut entries = tokio::fs::read_dir(&block_dir).await.map_err(discovery_err)?;
        let mut disks = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(discovery_err)? {
            let name = entry.file_name().to_string_lossy().into_owned();

            // loop, ram, dm-* and nvme report 0 or have no rotational file
            let rotational = match tokio::fs::read_to_string(entry.path().join("queue/rotational")).await {
                Ok(contents) => contents,
                Err(e) => {
                    debug!("skipping {}: no rotational flag ({})", name, e);
                    continue;
                }
            };
            if rotational.trim() != "1" {
                continue;
            }

            let dev_node = self.root.join("dev").join(&name);
            if tokio::fs::try_exists(&dev_node).await.unwrap_or(false) {
                disks.push(format!("/dev/{}", name));
            } else {
                debug!("skipping {}: {} does not exist", name, dev_node.display());
            }
        }

        disks.sort();
        Ok(disks)
    }

    async fn get_state(&self, device: &str) -> Result<PowerState, HwError> {
        let output = self.hdparm(&["-C", device]).await.map_err(|e| HwError::StateRead {
            device: device.to_string(),
            reason: format!("failed to launch {}: {}", self.program.display(), e),
        })?;
        let text = combined_output(&output);

        if !output.status.success() {
            if text.contains("No such file or directory") {
                return Err(HwError::NotFound {
                    device: device.to_string(),
                });
            }
            return Err(HwError::StateRead {
                device: device.to_string(),
                reason: format!("hdparm command error ({}): {}", output.status, text.trim()),
            });
        }

        parse_hdparm_state(&text).ok_or_else(|| HwError::StateRead {
            device: device.to_string(),
            reason: format!("malformed hdparm output: {:?}", text.trim()),
        })
    }

    async fn set_standby_timeout(&self, device: &str, value: u8) -> Result<(), HwError> {
        let value_arg = value.to_string();
        let control_err = |reason: String| HwError::Control {
            device: device.to_string(),
            value,
            reason,
        };

        let output = self
            .hdparm(&["-S", value_arg.as_str(), device])
            .await
            .map_err(|e| control_err(format!("failed to launch {}: {}", self.program.display(), e)))?;
        let text = combined_output(&output);

        if !output.status.success() {
            return Err(control_err(format!("{}: {}", output.status, text.trim())));
        }

        debug!("hdparm -S {} {}: {}", value, device, text.trim());
        Ok(())
    }
}
