use std::sync::{PoisonError, RwLock};

use netsweep_common::network::device::DeviceInfo;

/// Devices discovered by the current scan, in discovery order.
///
/// Only the coordinator writes to it: cleared when a scan starts, then appended to.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: RwLock<Vec<DeviceInfo>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn clear(&self) {
        self.devices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub(crate) fn push(&self, device: DeviceInfo) {
        self.devices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(device);
    }

    pub fn snapshot(&self) -> Vec<DeviceInfo> {
        self.devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
