//! Exclusive ownership of one open camera device.

use std::sync::Arc;
use std::time::Duration;

use multicam_core::data::{PixelFormat, RawFrame};
use multicam_core::driver::{
    CameraDriver, DeviceDescriptor, DeviceHandle, ParamValue, TransportMask,
};
use multicam_core::error::{CamError, CamResult, DriverError};

use crate::registry::DeviceRegistry;

/// Owns at most one device handle plus the grab buffer it fills.
///
/// The buffer is sized once at open from the device's payload size and reused
/// for every grab; [`frame`](CameraSession::frame) hands out a view borrowing
/// it, which is what makes "valid only until the next call into the session"
/// a compile-time guarantee rather than a documentation note.
pub struct CameraSession {
    driver: Arc<dyn CameraDriver>,
    handle: Option<Box<dyn DeviceHandle>>,
    buffer: Vec<u8>,
    grabbing: bool,
    serial: Option<String>,
}

impl CameraSession {
    pub fn new(driver: Arc<dyn CameraDriver>) -> Self {
        Self {
            driver,
            handle: None,
            buffer: Vec::new(),
            grabbing: false,
            serial: None,
        }
    }

    /// Open the described device. Fails with `AlreadyOpen` if this session
    /// already holds a handle.
    pub fn open(&mut self, descriptor: &DeviceDescriptor) -> CamResult<()> {
        if self.handle.is_some() {
            return Err(CamError::AlreadyOpen);
        }

        let handle = self.driver.open(descriptor)?;
        let payload = handle.payload_size()?;
        self.buffer.resize(payload, 0);
        self.handle = Some(handle);
        self.serial = Some(descriptor.serial.clone());
        tracing::info!(serial = %descriptor.serial, payload, "device opened");
        Ok(())
    }

    /// Resolve a serial through the registry and open it.
    ///
    /// If this session is already open (to any device) it is closed first,
    /// exactly once. The registry is enumerated only if it has never run;
    /// callers who want fresh topology enumerate explicitly beforehand.
    pub fn open_by_serial(&mut self, registry: &mut DeviceRegistry, serial: &str) -> CamResult<()> {
        if self.handle.is_some() {
            self.close();
        }
        if !registry.has_enumerated() {
            registry.enumerate(TransportMask::ALL)?;
        }
        let index = registry
            .find_by_serial(serial)
            .ok_or_else(|| CamError::DeviceNotFound {
                serial: serial.to_string(),
            })?;
        let descriptor = registry.devices()[index].clone();
        self.open(&descriptor)
    }

    /// Start acquisition. Calling while already grabbing is a no-op success.
    pub fn start_grabbing(&mut self) -> CamResult<()> {
        if self.grabbing {
            return Ok(());
        }
        let handle = self.handle.as_mut().ok_or(CamError::NotOpen)?;
        handle.start_grabbing()?;
        self.grabbing = true;
        Ok(())
    }

    /// Stop acquisition. Calling while not grabbing is a no-op success.
    pub fn stop_grabbing(&mut self) -> CamResult<()> {
        if !self.grabbing {
            return Ok(());
        }
        if let Some(handle) = self.handle.as_mut() {
            handle.stop_grabbing()?;
        }
        self.grabbing = false;
        Ok(())
    }

    /// Block up to `timeout` for the next raw frame.
    ///
    /// The returned view borrows the session's buffer and is invalidated by
    /// the next session call. Driver timeouts surface as
    /// [`CamError::FrameTimeout`].
    pub fn frame(&mut self, timeout: Duration) -> CamResult<RawFrame<'_>> {
        if !self.grabbing {
            return Err(CamError::NotGrabbing);
        }
        let handle = self.handle.as_mut().ok_or(CamError::NotOpen)?;
        let info = match handle.grab_into(&mut self.buffer, timeout) {
            Ok(info) => info,
            Err(err) if err.is_timeout() => return Err(CamError::FrameTimeout),
            Err(err) => return Err(err.into()),
        };
        let len = info.len.min(self.buffer.len());
        Ok(RawFrame::new(
            &self.buffer[..len],
            info.width,
            info.height,
            info.format,
        ))
    }

    pub fn exposure_us(&self) -> CamResult<f64> {
        let value = self.get_param("ExposureTime")?;
        value
            .as_f64()
            .ok_or_else(|| DriverError::configuration("ExposureTime is not numeric").into())
    }

    pub fn set_exposure_us(&mut self, exposure_us: f64) -> CamResult<()> {
        self.set_param("ExposureTime", ParamValue::Float(exposure_us))
    }

    pub fn gain(&self) -> CamResult<f64> {
        let value = self.get_param("Gain")?;
        value
            .as_f64()
            .ok_or_else(|| DriverError::configuration("Gain is not numeric").into())
    }

    pub fn set_gain(&mut self, gain: f64) -> CamResult<()> {
        self.set_param("Gain", ParamValue::Float(gain))
    }

    pub fn pixel_format(&self) -> CamResult<PixelFormat> {
        let value = self.get_param("PixelFormat")?;
        let name = value
            .as_text()
            .ok_or_else(|| DriverError::configuration("PixelFormat is not a string"))?;
        PixelFormat::from_vendor_name(name).ok_or_else(|| {
            DriverError::unsupported(format!("device reports unknown pixel format '{}'", name))
                .into()
        })
    }

    pub fn set_pixel_format(&mut self, format: PixelFormat) -> CamResult<()> {
        self.set_param(
            "PixelFormat",
            ParamValue::Text(format.vendor_name().to_string()),
        )
    }

    fn get_param(&self, key: &str) -> CamResult<ParamValue> {
        let handle = self.handle.as_ref().ok_or(CamError::NotOpen)?;
        Ok(handle.get_param(key)?)
    }

    fn set_param(&mut self, key: &str, value: ParamValue) -> CamResult<()> {
        let handle = self.handle.as_mut().ok_or(CamError::NotOpen)?;
        Ok(handle.set_param(key, value)?)
    }

    /// Stop grabbing if needed and release the handle. Safe to call any
    /// number of times.
    pub fn close(&mut self) {
        if self.grabbing {
            if let Some(handle) = self.handle.as_mut() {
                if let Err(err) = handle.stop_grabbing() {
                    tracing::warn!(%err, "stop_grabbing failed during close");
                }
            }
            self.grabbing = false;
        }
        if let Some(handle) = self.handle.take() {
            drop(handle);
            if let Some(serial) = &self.serial {
                tracing::info!(serial = %serial, "device closed");
            }
        }
        self.serial = None;
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    pub fn is_grabbing(&self) -> bool {
        self.grabbing
    }

    pub fn serial(&self) -> Option<&str> {
        self.serial.as_deref()
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.close();
    }
}
