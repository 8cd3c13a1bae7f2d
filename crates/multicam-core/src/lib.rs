//! Core types for the multicam acquisition pipeline.
//!
//! This crate is the leaf of the workspace: the error taxonomy, the pixel
//! data model, the vendor-driver boundary traits, and the pure frame
//! converter. It owns no threads and performs no I/O; the acquisition side
//! lives in `multicam-acquire` and concrete drivers in their own crates.

pub mod convert;
pub mod data;
pub mod driver;
pub mod error;

pub use convert::convert;
pub use data::{CanonicalImage, PixelFormat, RawFrame};
pub use driver::{
    CameraDriver, DeviceDescriptor, DeviceHandle, FrameInfo, ParamValue, TransportKind,
    TransportMask,
};
pub use error::{CamError, CamResult, ConvertError, DriverError, DriverErrorKind, DriverResult};
