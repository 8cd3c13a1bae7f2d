//! Error taxonomy for the acquisition core.
//!
//! Errors split into three layers:
//!
//! - [`DriverError`]: anything the vendor-driver boundary reports, categorized
//!   by [`DriverErrorKind`]. Drivers never expose raw SDK status codes; they
//!   translate them into one of these kinds plus a message.
//! - [`ConvertError`]: malformed or unsupported pixel data rejected by the
//!   frame converter. The offending frame is dropped, the pipeline continues.
//! - [`CamError`]: the session/worker level taxonomy. Nothing here is fatal to
//!   the process; the worst outcome for a camera is its worker running in
//!   fallback mode.

use std::time::Duration;

use thiserror::Error;

use crate::data::PixelFormat;

/// Category of a driver-boundary failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverErrorKind {
    Enumeration,
    Open,
    Configuration,
    Grab,
    Timeout,
    Shutdown,
    Unsupported,
}

impl std::fmt::Display for DriverErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DriverErrorKind::Enumeration => "enumeration",
            DriverErrorKind::Open => "open",
            DriverErrorKind::Configuration => "configuration",
            DriverErrorKind::Grab => "grab",
            DriverErrorKind::Timeout => "timeout",
            DriverErrorKind::Shutdown => "shutdown",
            DriverErrorKind::Unsupported => "unsupported",
        };
        write!(f, "{}", label)
    }
}

/// Structured error from the vendor-driver boundary.
#[derive(Error, Debug, Clone)]
#[error("driver {kind} error: {message}")]
pub struct DriverError {
    pub kind: DriverErrorKind,
    pub message: String,
}

impl DriverError {
    pub fn new(kind: DriverErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn enumeration(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::Enumeration, message)
    }

    pub fn open(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::Open, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::Configuration, message)
    }

    pub fn grab(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::Grab, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::Timeout, message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::Unsupported, message)
    }

    /// Whether this error is a grab timeout, i.e. transient by definition.
    pub fn is_timeout(&self) -> bool {
        self.kind == DriverErrorKind::Timeout
    }
}

/// Raw pixel data that cannot be turned into a canonical image.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    /// The format tag is unknown and the buffer is too short for any of the
    /// recognition heuristics.
    #[error("unsupported pixel format {format:?}: {len} bytes for {width}x{height}")]
    UnsupportedFormat {
        format: PixelFormat,
        len: usize,
        width: u32,
        height: u32,
    },

    /// A recognized format arrived with fewer bytes than its dimensions need.
    #[error("truncated frame: expected at least {expected} bytes, got {actual}")]
    TruncatedFrame { expected: usize, actual: usize },
}

/// Session- and worker-level error type.
#[derive(Error, Debug)]
pub enum CamError {
    #[error("session already holds an open device")]
    AlreadyOpen,

    #[error("no device is open")]
    NotOpen,

    #[error("device is not grabbing")]
    NotGrabbing,

    #[error("no device with serial '{serial}' found")]
    DeviceNotFound { serial: String },

    /// A single frame wait expired. Transient; the capture loop logs and
    /// continues.
    #[error("timed out waiting for a frame")]
    FrameTimeout,

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error(transparent)]
    Convert(#[from] ConvertError),

    /// The worker thread did not acknowledge a stop request within the
    /// configured bound. The thread is left detached; the session it owns may
    /// not have been released yet.
    #[error("worker did not stop within {waited:?}")]
    StopTimedOut { waited: Duration },

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Convenience alias for results at the session/worker level.
pub type CamResult<T> = std::result::Result<T, CamError>;

/// Convenience alias for results at the driver boundary.
pub type DriverResult<T> = std::result::Result<T, DriverError>;
