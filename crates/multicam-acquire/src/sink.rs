//! Consumer boundary for canonical frames.
//!
//! The acquisition worker delivers frames and events through [`FrameSink`];
//! delivery is synchronous inside the worker thread, so implementations must
//! not block. [`LatestFrame`] is a ready-made sink with the documented
//! at-most-one-pending-frame hand-off: a new frame overwrites one the
//! consumer has not picked up yet.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use multicam_core::data::CanonicalImage;

/// Identifier of one camera position within the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CameraId(pub u32);

impl std::fmt::Display for CameraId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "camera-{}", self.0)
    }
}

/// One delivered frame: the canonical image plus its provenance tag.
///
/// `sequence` counts emitted frames per worker run starting at 1, for both
/// live and synthetic frames.
#[derive(Debug, Clone)]
pub struct AnnotatedFrame {
    pub image: CanonicalImage,
    pub camera: CameraId,
    pub sequence: u64,
}

/// Receives frames and lifecycle events from an acquisition worker.
pub trait FrameSink: Send + Sync {
    fn on_frame(&self, frame: AnnotatedFrame);

    fn on_error(&self, message: &str, camera: CameraId);

    fn on_connected(&self, _camera: CameraId) {}

    fn on_disconnected(&self, _camera: CameraId) {}
}

/// Single-slot sink: keeps only the most recent frame.
#[derive(Default)]
pub struct LatestFrame {
    slot: Mutex<Option<AnnotatedFrame>>,
    overwritten: AtomicU64,
}

impl LatestFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the pending frame, leaving the slot empty.
    pub fn take(&self) -> Option<AnnotatedFrame> {
        self.slot.lock().take()
    }

    /// Frames that were replaced before the consumer took them.
    pub fn overwritten(&self) -> u64 {
        self.overwritten.load(Ordering::Relaxed)
    }
}

impl FrameSink for LatestFrame {
    fn on_frame(&self, frame: AnnotatedFrame) {
        if self.slot.lock().replace(frame).is_some() {
            self.overwritten.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn on_error(&self, message: &str, camera: CameraId) {
        tracing::warn!(%camera, message, "acquisition error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(sequence: u64) -> AnnotatedFrame {
        AnnotatedFrame {
            image: CanonicalImage::filled(2, 2),
            camera: CameraId(0),
            sequence,
        }
    }

    #[test]
    fn latest_frame_overwrites_unconsumed() {
        let sink = LatestFrame::new();
        sink.on_frame(frame(1));
        sink.on_frame(frame(2));
        let taken = sink.take().unwrap();
        assert_eq!(taken.sequence, 2);
        assert_eq!(sink.overwritten(), 1);
        assert!(sink.take().is_none());
    }
}
