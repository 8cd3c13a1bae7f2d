//! Camera acquisition pipeline for the inspection tool.
//!
//! Layers, bottom up: [`DeviceRegistry`] turns driver enumeration into a
//! stable snapshot, [`CameraSession`] owns one open device and its grab
//! buffer, and [`AcquisitionThread`] runs the per-camera capture loop that
//! converts raw frames and hands them to a [`FrameSink`]. When a camera
//! cannot be opened the worker degrades to a synthetic feed instead of
//! failing, so downstream consumers see the same contract either way.

pub mod config;
pub mod registry;
pub mod session;
pub mod sink;
pub mod synthetic;
pub mod worker;

pub use config::{AcquisitionConfig, FallbackPolicy};
pub use registry::DeviceRegistry;
pub use session::CameraSession;
pub use sink::{AnnotatedFrame, CameraId, FrameSink, LatestFrame};
pub use worker::{AcquisitionThread, WorkerState};
