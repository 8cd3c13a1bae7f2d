//! The vendor-driver boundary.
//!
//! Industrial camera SDKs hand out C-style handles and fill caller-provided
//! buffers. This module models that surface as two traits so the rest of the
//! pipeline never touches a raw handle: [`CameraDriver`] for process-wide
//! operations (enumerate, open) and [`DeviceHandle`] for everything scoped to
//! one open device. Dropping a [`DeviceHandle`] releases the device, so a
//! handle can never leak past the session that owns it.

use std::net::Ipv4Addr;
use std::ops::BitOr;
use std::time::Duration;

use crate::data::PixelFormat;
use crate::error::DriverResult;

/// Transport a device is attached over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    GigE,
    Usb3,
    Other,
}

/// Bit-set of transport kinds for enumeration queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportMask(u32);

impl TransportMask {
    pub const GIGE: TransportMask = TransportMask(1);
    pub const USB3: TransportMask = TransportMask(1 << 1);
    pub const OTHER: TransportMask = TransportMask(1 << 2);
    pub const ALL: TransportMask = TransportMask(0b111);

    pub fn contains(&self, kind: TransportKind) -> bool {
        let bit = match kind {
            TransportKind::GigE => Self::GIGE.0,
            TransportKind::Usb3 => Self::USB3.0,
            TransportKind::Other => Self::OTHER.0,
        };
        self.0 & bit != 0
    }
}

impl BitOr for TransportMask {
    type Output = TransportMask;

    fn bitor(self, rhs: TransportMask) -> TransportMask {
        TransportMask(self.0 | rhs.0)
    }
}

/// Immutable snapshot of one enumerated device.
///
/// Descriptors are positional: they are only meaningful against the
/// enumeration that produced them and go stale when the registry
/// re-enumerates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub transport: TransportKind,
    pub serial: String,
    pub model: String,
    /// Current address for GigE devices; `None` for other transports.
    pub ip: Option<Ipv4Addr>,
}

/// Shape of the bytes a grab call just produced.
#[derive(Debug, Clone, Copy)]
pub struct FrameInfo {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Number of valid bytes written into the destination buffer.
    pub len: usize,
}

/// Value of a typed device parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Text(String),
    Flag(bool),
}

impl ParamValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

/// Process-wide driver operations.
pub trait CameraDriver: Send + Sync {
    /// Query devices on the selected transports. A query that finds nothing
    /// returns `Ok(vec![])`; only a failing boundary call is an error.
    fn enumerate(&self, mask: TransportMask) -> DriverResult<Vec<DeviceDescriptor>>;

    /// Open a device. At most one live handle may exist per physical serial
    /// number within the process; a second open of the same device fails.
    fn open(&self, descriptor: &DeviceDescriptor) -> DriverResult<Box<dyn DeviceHandle>>;
}

/// Operations on one open device.
///
/// Handles are `Send` but not `Sync`: exactly one thread drives a device at a
/// time, which is how the acquisition worker serializes all calls into its
/// session.
pub trait DeviceHandle: Send {
    /// Worst-case byte count of one frame, for sizing the grab buffer once at
    /// open time.
    fn payload_size(&self) -> DriverResult<usize>;

    fn start_grabbing(&mut self) -> DriverResult<()>;

    fn stop_grabbing(&mut self) -> DriverResult<()>;

    /// Block up to `timeout` for the next frame and copy it into `dst`.
    /// An expired wait is reported as [`crate::error::DriverErrorKind::Timeout`].
    fn grab_into(&mut self, dst: &mut [u8], timeout: Duration) -> DriverResult<FrameInfo>;

    fn get_param(&self, key: &str) -> DriverResult<ParamValue>;

    fn set_param(&mut self, key: &str, value: ParamValue) -> DriverResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_mask_composition() {
        let mask = TransportMask::GIGE | TransportMask::USB3;
        assert!(mask.contains(TransportKind::GigE));
        assert!(mask.contains(TransportKind::Usb3));
        assert!(!mask.contains(TransportKind::Other));
        assert!(TransportMask::ALL.contains(TransportKind::Other));
    }

    #[test]
    fn param_value_coercions() {
        assert_eq!(ParamValue::Int(7).as_f64(), Some(7.0));
        assert_eq!(ParamValue::Float(1.5).as_i64(), None);
        assert_eq!(ParamValue::Text("Mono8".into()).as_text(), Some("Mono8"));
    }
}
