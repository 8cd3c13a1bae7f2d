//! Acquisition worker configuration.

use std::time::Duration;

use serde::Deserialize;

use multicam_core::error::{CamError, CamResult};

/// Frame rate used when a requested rate is out of range.
pub const DEFAULT_TARGET_FPS: u32 = 20;

/// What the worker does when camera initialization fails.
///
/// The synthetic feed keeps the inspection tool usable for operator testing
/// with no camera attached; either way the failure itself is always reported
/// through the consumer's `on_error` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Emit deterministic synthetic frames under the normal frame contract.
    #[default]
    SyntheticFeed,
    /// Report the failure and wind the worker down to idle.
    Disabled,
}

/// Per-camera configuration, deserializable from the tool's settings file.
#[derive(Debug, Clone, Deserialize)]
pub struct AcquisitionConfig {
    /// Identifier attached to every emitted frame and event.
    #[serde(default)]
    pub camera_id: u32,

    /// Serial number to open; `None` opens the first enumerated device.
    #[serde(default)]
    pub serial: Option<String>,

    /// Target frame rate, best-effort (default: 20).
    #[serde(default = "default_target_fps")]
    pub target_fps: u32,

    /// How long one frame wait may block (default: 2000 ms).
    #[serde(default = "default_frame_timeout_ms")]
    pub frame_timeout_ms: u64,

    /// Exposure to apply after open, in microseconds.
    #[serde(default)]
    pub exposure_us: Option<f64>,

    #[serde(default)]
    pub fallback: FallbackPolicy,

    /// Dimensions of synthetic fallback frames (default: 640x480).
    #[serde(default = "default_fallback_width")]
    pub fallback_width: u32,
    #[serde(default = "default_fallback_height")]
    pub fallback_height: u32,

    /// How long `stop()` waits for the worker to acknowledge before reporting
    /// a stop timeout (default: 3000 ms).
    #[serde(default = "default_stop_join_timeout_ms")]
    pub stop_join_timeout_ms: u64,
}

fn default_target_fps() -> u32 {
    DEFAULT_TARGET_FPS
}
fn default_frame_timeout_ms() -> u64 {
    2000
}
fn default_fallback_width() -> u32 {
    640
}
fn default_fallback_height() -> u32 {
    480
}
fn default_stop_join_timeout_ms() -> u64 {
    3000
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            camera_id: 0,
            serial: None,
            target_fps: default_target_fps(),
            frame_timeout_ms: default_frame_timeout_ms(),
            exposure_us: None,
            fallback: FallbackPolicy::default(),
            fallback_width: default_fallback_width(),
            fallback_height: default_fallback_height(),
            stop_join_timeout_ms: default_stop_join_timeout_ms(),
        }
    }
}

impl AcquisitionConfig {
    /// Reject values that would make the worker misbehave rather than merely
    /// run at an odd rate.
    pub fn validate(&self) -> CamResult<()> {
        if self.fallback_width == 0 || self.fallback_height == 0 {
            return Err(CamError::Config(
                "fallback frame dimensions must be non-zero".to_string(),
            ));
        }
        if self.frame_timeout_ms == 0 {
            return Err(CamError::Config("frame_timeout_ms must be positive".to_string()));
        }
        if self.stop_join_timeout_ms == 0 {
            return Err(CamError::Config(
                "stop_join_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Clamp a requested frame rate into the supported range. Valid rates are
    /// 1..=60; anything else falls back to [`DEFAULT_TARGET_FPS`].
    pub fn effective_fps(fps: u32) -> u32 {
        if fps == 0 || fps > 60 {
            DEFAULT_TARGET_FPS
        } else {
            fps
        }
    }

    /// Pacing interval for a given frame rate.
    pub fn frame_interval(fps: u32) -> Duration {
        Duration::from_millis(1000 / u64::from(fps.max(1)))
    }

    pub fn frame_timeout(&self) -> Duration {
        Duration::from_millis(self.frame_timeout_ms)
    }

    pub fn stop_join_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_join_timeout_ms)
    }
}
