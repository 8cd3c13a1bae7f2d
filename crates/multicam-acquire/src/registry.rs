//! Device enumeration and serial-number resolution.

use std::sync::Arc;

use multicam_core::driver::{CameraDriver, DeviceDescriptor, TransportMask};
use multicam_core::error::DriverResult;

/// Explicit registry over the driver boundary.
///
/// The registry never refreshes behind the caller's back: [`find_by_serial`]
/// scans only the snapshot produced by the last [`enumerate`] call. Implicit
/// re-enumeration would shift positional indices under concurrent consumers,
/// so picking up topology changes is always an explicit `enumerate()`.
///
/// [`enumerate`]: DeviceRegistry::enumerate
/// [`find_by_serial`]: DeviceRegistry::find_by_serial
pub struct DeviceRegistry {
    driver: Arc<dyn CameraDriver>,
    devices: Vec<DeviceDescriptor>,
    enumerated: bool,
}

impl DeviceRegistry {
    pub fn new(driver: Arc<dyn CameraDriver>) -> Self {
        Self {
            driver,
            devices: Vec::new(),
            enumerated: false,
        }
    }

    /// Query the driver per transport and replace the cached snapshot.
    /// Finding zero devices is success; only a failing boundary call errors.
    pub fn enumerate(&mut self, mask: TransportMask) -> DriverResult<&[DeviceDescriptor]> {
        let devices = self.driver.enumerate(mask)?;
        tracing::info!(count = devices.len(), "enumerated devices");
        self.devices = devices;
        self.enumerated = true;
        Ok(&self.devices)
    }

    /// The last enumeration snapshot (empty if never enumerated).
    pub fn devices(&self) -> &[DeviceDescriptor] {
        &self.devices
    }

    /// Positional index of the device with this serial in the last snapshot.
    pub fn find_by_serial(&self, serial: &str) -> Option<usize> {
        self.devices.iter().position(|d| d.serial == serial)
    }

    /// Whether `enumerate()` has run at least once.
    pub fn has_enumerated(&self) -> bool {
        self.enumerated
    }
}
