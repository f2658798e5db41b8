//! Last observed power state per device

use std::collections::HashMap;
use std::sync::Mutex;

use crate::hw::PowerState;

/// Device id to last seen [`PowerState`].
///
/// The lock is held for a single lookup or insert only, so callers can never
/// hold it across a device-control call.
#[derive(Debug, Default)]
pub struct StateTracker {
    last: Mutex<HashMap<String, PowerState>>,
}

impl StateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// None if the device has never been observed
    pub fn get(&self, device: &str) -> Option<PowerState> {
        let last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        last.get(device).copied()
    }

    /// Record `state`, returning the previous value
    pub fn set(&self, device: &str, state: PowerState) -> Option<PowerState> {
        let mut last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        last.insert(device.to_string(), state)
    }

    /// Number of devices observed so far
    pub fn len(&self) -> usize {
        self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
