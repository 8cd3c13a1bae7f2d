//! Mock camera driver for tests and hardware-free operation.
//!
//! Implements the `multicam-core` driver boundary entirely in-process:
//! deterministic test-pattern frames, per-serial fault injection, and
//! bookkeeping counters so tests can assert handle lifecycles (exactly one
//! close, no double-close, one live handle per serial).

pub mod pattern;

use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use multicam_core::data::PixelFormat;
use multicam_core::driver::{
    CameraDriver, DeviceDescriptor, DeviceHandle, FrameInfo, ParamValue, TransportKind,
    TransportMask,
};
use multicam_core::error::{DriverError, DriverResult};

/// Static description of one simulated device.
#[derive(Debug, Clone)]
pub struct MockDeviceSpec {
    pub serial: String,
    pub model: String,
    pub transport: TransportKind,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

impl MockDeviceSpec {
    /// A 640x480 Mono8 GigE device with the given serial.
    pub fn new(serial: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
            model: "MockCam-640".to_string(),
            transport: TransportKind::GigE,
            width: 640,
            height: 480,
            format: PixelFormat::Mono8,
        }
    }

    pub fn transport(mut self, transport: TransportKind) -> Self {
        self.transport = transport;
        self
    }

    pub fn resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn format(mut self, format: PixelFormat) -> Self {
        self.format = format;
        self
    }
}

/// Faults a simulated device should exhibit.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaultConfig {
    pub fail_open: bool,
    pub fail_start: bool,
    /// Every n-th grab attempt times out instead of producing a frame.
    pub timeout_every: Option<u64>,
    /// Every n-th grab delivers only half the frame's bytes, reported
    /// truthfully in `FrameInfo::len`, as a cut-short transfer would.
    pub truncate_every: Option<u64>,
}

impl FaultConfig {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn fail_open() -> Self {
        Self {
            fail_open: true,
            ..Self::default()
        }
    }

    pub fn fail_start() -> Self {
        Self {
            fail_start: true,
            ..Self::default()
        }
    }

    pub fn timeout_every(n: u64) -> Self {
        Self {
            timeout_every: Some(n.max(1)),
            ..Self::default()
        }
    }

    pub fn truncate_every(n: u64) -> Self {
        Self {
            truncate_every: Some(n.max(1)),
            ..Self::default()
        }
    }
}

#[derive(Default)]
struct Inner {
    devices: Mutex<Vec<(MockDeviceSpec, FaultConfig)>>,
    live: Mutex<HashSet<String>>,
    opens: Mutex<HashMap<String, u64>>,
    closes: Mutex<HashMap<String, u64>>,
}

/// Builder for [`MockDriver`].
#[derive(Default)]
pub struct MockDriverBuilder {
    devices: Vec<(MockDeviceSpec, FaultConfig)>,
}

impl MockDriverBuilder {
    pub fn device(mut self, spec: MockDeviceSpec) -> Self {
        self.devices.push((spec, FaultConfig::none()));
        self
    }

    pub fn device_with_faults(mut self, spec: MockDeviceSpec, faults: FaultConfig) -> Self {
        self.devices.push((spec, faults));
        self
    }

    pub fn build(self) -> MockDriver {
        MockDriver {
            inner: Arc::new(Inner {
                devices: Mutex::new(self.devices),
                ..Inner::default()
            }),
        }
    }
}

/// In-process implementation of the camera driver boundary.
#[derive(Clone)]
pub struct MockDriver {
    inner: Arc<Inner>,
}

impl MockDriver {
    pub fn builder() -> MockDriverBuilder {
        MockDriverBuilder::default()
    }

    /// Attach another device after construction. Existing enumeration
    /// snapshots do not see it until they re-enumerate.
    pub fn add_device(&self, spec: MockDeviceSpec) {
        self.inner.devices.lock().push((spec, FaultConfig::none()));
    }

    /// How many times `open` succeeded for this serial.
    pub fn open_count(&self, serial: &str) -> u64 {
        self.inner.opens.lock().get(serial).copied().unwrap_or(0)
    }

    /// How many handles for this serial have been released.
    pub fn close_count(&self, serial: &str) -> u64 {
        self.inner.closes.lock().get(serial).copied().unwrap_or(0)
    }

    /// Whether a handle for this serial is currently alive.
    pub fn is_open(&self, serial: &str) -> bool {
        self.inner.live.lock().contains(serial)
    }
}

impl CameraDriver for MockDriver {
    fn enumerate(&self, mask: TransportMask) -> DriverResult<Vec<DeviceDescriptor>> {
        let devices = self.inner.devices.lock();
        let list: Vec<DeviceDescriptor> = devices
            .iter()
            .enumerate()
            .filter(|(_, (spec, _))| mask.contains(spec.transport))
            .map(|(i, (spec, _))| DeviceDescriptor {
                transport: spec.transport,
                serial: spec.serial.clone(),
                model: spec.model.clone(),
                ip: match spec.transport {
                    TransportKind::GigE => Some(Ipv4Addr::new(192, 168, 10, 10 + i as u8)),
                    _ => None,
                },
            })
            .collect();
        tracing::debug!(count = list.len(), "mock enumeration");
        Ok(list)
    }

    fn open(&self, descriptor: &DeviceDescriptor) -> DriverResult<Box<dyn DeviceHandle>> {
        let (spec, faults) = {
            let devices = self.inner.devices.lock();
            devices
                .iter()
                .find(|(spec, _)| spec.serial == descriptor.serial)
                .cloned()
                .ok_or_else(|| {
                    DriverError::open(format!("no device with serial '{}'", descriptor.serial))
                })?
        };

        if faults.fail_open {
            return Err(DriverError::open(format!(
                "simulated open failure for '{}'",
                spec.serial
            )));
        }

        {
            let mut live = self.inner.live.lock();
            if !live.insert(spec.serial.clone()) {
                return Err(DriverError::open(format!(
                    "device '{}' is already open",
                    spec.serial
                )));
            }
        }
        *self.inner.opens.lock().entry(spec.serial.clone()).or_insert(0) += 1;
        tracing::info!(serial = %spec.serial, "mock device opened");

        Ok(Box::new(MockHandle {
            spec,
            faults,
            inner: Arc::clone(&self.inner),
            grabbing: false,
            grab_attempts: 0,
            exposure_us: 10_000.0,
            gain: 0.0,
        }))
    }
}

struct MockHandle {
    spec: MockDeviceSpec,
    faults: FaultConfig,
    inner: Arc<Inner>,
    grabbing: bool,
    grab_attempts: u64,
    exposure_us: f64,
    gain: f64,
}

impl DeviceHandle for MockHandle {
    fn payload_size(&self) -> DriverResult<usize> {
        // Worst case across settable formats is packed RGB.
        Ok(self.spec.width as usize * self.spec.height as usize * 3)
    }

    fn start_grabbing(&mut self) -> DriverResult<()> {
        if self.faults.fail_start {
            return Err(DriverError::grab(format!(
                "simulated acquisition start failure for '{}'",
                self.spec.serial
            )));
        }
        self.grabbing = true;
        Ok(())
    }

    fn stop_grabbing(&mut self) -> DriverResult<()> {
        self.grabbing = false;
        Ok(())
    }

    fn grab_into(&mut self, dst: &mut [u8], _timeout: Duration) -> DriverResult<FrameInfo> {
        if !self.grabbing {
            return Err(DriverError::grab("device is not grabbing"));
        }
        self.grab_attempts += 1;
        if let Some(n) = self.faults.timeout_every {
            if self.grab_attempts % n == 0 {
                return Err(DriverError::timeout("simulated frame wait timeout"));
            }
        }

        let frame = pattern::render(
            self.spec.width,
            self.spec.height,
            self.grab_attempts,
            self.spec.format,
        );
        if dst.len() < frame.len() {
            return Err(DriverError::grab(format!(
                "destination buffer too small: {} < {}",
                dst.len(),
                frame.len()
            )));
        }
        let len = match self.faults.truncate_every {
            Some(n) if self.grab_attempts % n == 0 => frame.len() / 2,
            _ => frame.len(),
        };
        dst[..len].copy_from_slice(&frame[..len]);
        Ok(FrameInfo {
            width: self.spec.width,
            height: self.spec.height,
            format: self.spec.format,
            len,
        })
    }

    fn get_param(&self, key: &str) -> DriverResult<ParamValue> {
        match key {
            "ExposureTime" => Ok(ParamValue::Float(self.exposure_us)),
            "Gain" => Ok(ParamValue::Float(self.gain)),
            "PixelFormat" => Ok(ParamValue::Text(self.spec.format.vendor_name().to_string())),
            "Width" => Ok(ParamValue::Int(self.spec.width as i64)),
            "Height" => Ok(ParamValue::Int(self.spec.height as i64)),
            "PayloadSize" => Ok(ParamValue::Int(
                (self.spec.width as i64) * (self.spec.height as i64) * 3,
            )),
            _ => Err(DriverError::configuration(format!(
                "unknown parameter '{}'",
                key
            ))),
        }
    }

    fn set_param(&mut self, key: &str, value: ParamValue) -> DriverResult<()> {
        match key {
            "ExposureTime" => {
                let us = value
                    .as_f64()
                    .ok_or_else(|| DriverError::configuration("ExposureTime expects a float"))?;
                if us <= 0.0 {
                    return Err(DriverError::configuration("ExposureTime must be positive"));
                }
                self.exposure_us = us;
                Ok(())
            }
            "Gain" => {
                self.gain = value
                    .as_f64()
                    .ok_or_else(|| DriverError::configuration("Gain expects a float"))?;
                Ok(())
            }
            "PixelFormat" => {
                let name = value
                    .as_text()
                    .ok_or_else(|| DriverError::configuration("PixelFormat expects a string"))?;
                let format = PixelFormat::from_vendor_name(name).ok_or_else(|| {
                    DriverError::unsupported(format!("pixel format '{}' not available", name))
                })?;
                self.spec.format = format;
                Ok(())
            }
            _ => Err(DriverError::configuration(format!(
                "unknown parameter '{}'",
                key
            ))),
        }
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        self.inner.live.lock().remove(&self.spec.serial);
        *self
            .inner
            .closes
            .lock()
            .entry(self.spec.serial.clone())
            .or_insert(0) += 1;
        tracing::info!(serial = %self.spec.serial, "mock device closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver_with(serials: &[&str]) -> MockDriver {
        let mut builder = MockDriver::builder();
        for serial in serials {
            builder = builder.device(MockDeviceSpec::new(*serial));
        }
        builder.build()
    }

    #[test]
    fn enumerate_filters_by_transport() {
        let driver = MockDriver::builder()
            .device(MockDeviceSpec::new("GIG-1"))
            .device(MockDeviceSpec::new("USB-1").transport(TransportKind::Usb3))
            .build();

        let gige = driver.enumerate(TransportMask::GIGE).unwrap();
        assert_eq!(gige.len(), 1);
        assert_eq!(gige[0].serial, "GIG-1");
        assert!(gige[0].ip.is_some());

        let all = driver.enumerate(TransportMask::ALL).unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[1].ip.is_none());
    }

    #[test]
    fn one_live_handle_per_serial() {
        let driver = driver_with(&["CAM-A"]);
        let desc = driver.enumerate(TransportMask::ALL).unwrap()[0].clone();

        let first = driver.open(&desc).unwrap();
        let second = driver.open(&desc);
        assert!(second.is_err());

        drop(first);
        assert_eq!(driver.close_count("CAM-A"), 1);
        let third = driver.open(&desc);
        assert!(third.is_ok());
    }

    #[test]
    fn grab_produces_frames_and_injected_timeouts() {
        let driver = MockDriver::builder()
            .device_with_faults(
                MockDeviceSpec::new("CAM-T").resolution(8, 8),
                FaultConfig::timeout_every(3),
            )
            .build();
        let desc = driver.enumerate(TransportMask::ALL).unwrap()[0].clone();
        let mut handle = driver.open(&desc).unwrap();

        let mut buf = vec![0u8; handle.payload_size().unwrap()];
        assert!(handle
            .grab_into(&mut buf, Duration::from_millis(10))
            .is_err());

        handle.start_grabbing().unwrap();
        let info = handle.grab_into(&mut buf, Duration::from_millis(10)).unwrap();
        assert_eq!((info.width, info.height), (8, 8));
        assert_eq!(info.len, 64);

        handle.grab_into(&mut buf, Duration::from_millis(10)).unwrap();
        let timed_out = handle
            .grab_into(&mut buf, Duration::from_millis(10))
            .unwrap_err();
        assert!(timed_out.is_timeout());
        // The loop after a timeout keeps working.
        assert!(handle.grab_into(&mut buf, Duration::from_millis(10)).is_ok());
    }

    #[test]
    fn truncation_fault_reports_short_frames() {
        let driver = MockDriver::builder()
            .device_with_faults(
                MockDeviceSpec::new("CAM-S").resolution(8, 8),
                FaultConfig::truncate_every(2),
            )
            .build();
        let desc = driver.enumerate(TransportMask::ALL).unwrap()[0].clone();
        let mut handle = driver.open(&desc).unwrap();
        handle.start_grabbing().unwrap();

        let mut buf = vec![0u8; handle.payload_size().unwrap()];
        let full = handle.grab_into(&mut buf, Duration::from_millis(10)).unwrap();
        assert_eq!(full.len, 64);

        let short = handle.grab_into(&mut buf, Duration::from_millis(10)).unwrap();
        assert_eq!(short.len, 32);
        assert_eq!((short.width, short.height), (8, 8));
    }

    #[test]
    fn parameter_surface() {
        let driver = driver_with(&["CAM-P"]);
        let desc = driver.enumerate(TransportMask::ALL).unwrap()[0].clone();
        let mut handle = driver.open(&desc).unwrap();

        handle
            .set_param("ExposureTime", ParamValue::Float(5_000.0))
            .unwrap();
        assert_eq!(
            handle.get_param("ExposureTime").unwrap().as_f64(),
            Some(5_000.0)
        );

        handle
            .set_param("PixelFormat", ParamValue::Text("RGB8".into()))
            .unwrap();
        assert_eq!(
            handle.get_param("PixelFormat").unwrap().as_text(),
            Some("RGB8")
        );

        assert!(handle
            .set_param("ExposureTime", ParamValue::Float(-1.0))
            .is_err());
        assert!(handle.get_param("Bogus").is_err());
    }
}
