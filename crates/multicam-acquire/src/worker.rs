//! Per-camera acquisition worker.
//!
//! Each attached camera gets one dedicated OS thread that owns a
//! [`CameraSession`] outright: every driver call for a device happens on that
//! thread, so no lock ordering between sessions can arise. The public
//! [`AcquisitionThread`] handle only requests transitions; the state itself
//! belongs to the worker.
//!
//! ```text
//! Idle --start--> Initializing --ok--> Live ------stop--> Stopping --> Idle
//!                      |                                      ^
//!                      +--open/start failure--> Fallback --stop
//! ```
//!
//! Initialization failure never kills the thread: with the default fallback
//! policy the worker switches to a synthetic feed with an identical consumer
//! contract, so the inspection tool stays usable with no camera attached.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use multicam_core::convert::convert;
use multicam_core::data::PixelFormat;
use multicam_core::driver::{CameraDriver, TransportMask};
use multicam_core::error::{CamError, CamResult};

use crate::config::{AcquisitionConfig, FallbackPolicy};
use crate::registry::DeviceRegistry;
use crate::session::CameraSession;
use crate::sink::{AnnotatedFrame, CameraId, FrameSink};
use crate::synthetic;

/// Observable worker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Initializing,
    Live,
    Fallback,
    Stopping,
}

struct Shared {
    running: AtomicBool,
    state: Mutex<WorkerState>,
    target_fps: AtomicU32,
}

impl Shared {
    fn set_state(&self, state: WorkerState) {
        *self.state.lock() = state;
    }

    fn state(&self) -> WorkerState {
        *self.state.lock()
    }

    fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Controller handle for one camera's worker thread.
///
/// `start`/`stop` may be called from any thread; the worker observes the stop
/// flag once per loop iteration, so the worst-case stop latency is one frame
/// timeout plus one pacing interval.
pub struct AcquisitionThread {
    driver: Arc<dyn CameraDriver>,
    config: AcquisitionConfig,
    sink: Arc<dyn FrameSink>,
    shared: Arc<Shared>,
    join: Option<(thread::JoinHandle<()>, mpsc::Receiver<()>)>,
}

impl AcquisitionThread {
    pub fn new(
        driver: Arc<dyn CameraDriver>,
        config: AcquisitionConfig,
        sink: Arc<dyn FrameSink>,
    ) -> CamResult<Self> {
        config.validate()?;
        let shared = Arc::new(Shared {
            running: AtomicBool::new(false),
            state: Mutex::new(WorkerState::Idle),
            target_fps: AtomicU32::new(AcquisitionConfig::effective_fps(config.target_fps)),
        });
        Ok(Self {
            driver,
            config,
            sink,
            shared,
            join: None,
        })
    }

    pub fn camera_id(&self) -> CameraId {
        CameraId(self.config.camera_id)
    }

    pub fn state(&self) -> WorkerState {
        self.shared.state()
    }

    /// Current pacing rate in frames per second.
    pub fn target_fps(&self) -> u32 {
        self.shared.target_fps.load(Ordering::Relaxed)
    }

    /// Change the pacing rate; takes effect on the next loop iteration.
    /// Out-of-range values fall back to the default rate instead of erroring.
    pub fn set_target_fps(&self, fps: u32) {
        let effective = AcquisitionConfig::effective_fps(fps);
        if effective != fps {
            tracing::warn!(
                camera = %self.camera_id(),
                requested = fps,
                effective,
                "target fps out of range, using default"
            );
        }
        self.shared.target_fps.store(effective, Ordering::Relaxed);
    }

    /// Spawn the worker thread. A second call while running is a no-op.
    pub fn start(&mut self) -> CamResult<()> {
        if self.join.is_some() {
            return Ok(());
        }

        self.shared.running.store(true, Ordering::SeqCst);
        self.shared.set_state(WorkerState::Initializing);

        let (done_tx, done_rx) = mpsc::channel();
        let worker = Worker {
            driver: Arc::clone(&self.driver),
            config: self.config.clone(),
            sink: Arc::clone(&self.sink),
            shared: Arc::clone(&self.shared),
            camera: self.camera_id(),
            sequence: 0,
        };
        let handle = thread::Builder::new()
            .name(format!("cam-{}", self.config.camera_id))
            .spawn(move || worker.run(done_tx))
            .map_err(|err| {
                self.shared.running.store(false, Ordering::SeqCst);
                self.shared.set_state(WorkerState::Idle);
                CamError::Config(format!("failed to spawn worker thread: {}", err))
            })?;

        self.join = Some((handle, done_rx));
        Ok(())
    }

    /// Request a stop and wait for the worker to wind down.
    ///
    /// Waits up to the configured join timeout. On expiry the worker is left
    /// detached and [`CamError::StopTimedOut`] is returned, an explicit
    /// failure the caller can act on rather than a silent continuation.
    pub fn stop(&mut self) -> CamResult<()> {
        let Some((handle, done_rx)) = self.join.take() else {
            return Ok(());
        };

        self.shared.running.store(false, Ordering::SeqCst);
        let waited = self.config.stop_join_timeout();
        match done_rx.recv_timeout(waited) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                let _ = handle.join();
                Ok(())
            }
            Err(RecvTimeoutError::Timeout) => {
                tracing::error!(
                    camera = %self.camera_id(),
                    ?waited,
                    "worker did not acknowledge stop within the join timeout"
                );
                Err(CamError::StopTimedOut { waited })
            }
        }
    }
}

impl Drop for AcquisitionThread {
    fn drop(&mut self) {
        // Best effort; a stop timeout here has no caller left to report to.
        let _ = self.stop();
    }
}

struct Worker {
    driver: Arc<dyn CameraDriver>,
    config: AcquisitionConfig,
    sink: Arc<dyn FrameSink>,
    shared: Arc<Shared>,
    camera: CameraId,
    sequence: u64,
}

impl Worker {
    fn run(mut self, done_tx: mpsc::Sender<()>) {
        tracing::info!(camera = %self.camera, serial = ?self.config.serial, "worker starting");

        match self.initialize() {
            Ok(mut session) => {
                self.sink.on_connected(self.camera);
                self.shared.set_state(WorkerState::Live);
                self.live_loop(&mut session);
                self.shared.set_state(WorkerState::Stopping);
                session.close();
                self.sink.on_disconnected(self.camera);
            }
            Err(err) => {
                tracing::warn!(camera = %self.camera, %err, "camera initialization failed");
                self.sink
                    .on_error(&format!("camera initialization failed: {}", err), self.camera);
                match self.config.fallback {
                    FallbackPolicy::SyntheticFeed => {
                        self.shared.set_state(WorkerState::Fallback);
                        self.fallback_loop();
                        self.shared.set_state(WorkerState::Stopping);
                    }
                    FallbackPolicy::Disabled => {
                        self.shared.set_state(WorkerState::Stopping);
                    }
                }
            }
        }

        self.shared.set_state(WorkerState::Idle);
        tracing::info!(camera = %self.camera, frames = self.sequence, "worker stopped");
        let _ = done_tx.send(());
    }

    fn initialize(&self) -> CamResult<CameraSession> {
        let mut session = CameraSession::new(Arc::clone(&self.driver));
        let mut registry = DeviceRegistry::new(Arc::clone(&self.driver));

        match &self.config.serial {
            Some(serial) => session.open_by_serial(&mut registry, serial)?,
            None => {
                let devices = registry.enumerate(TransportMask::ALL)?;
                let descriptor = devices
                    .first()
                    .cloned()
                    .ok_or_else(|| CamError::DeviceNotFound {
                        serial: "<any>".to_string(),
                    })?;
                session.open(&descriptor)?;
            }
        }

        self.configure(&mut session);
        session.start_grabbing()?;
        Ok(session)
    }

    /// Apply preferred settings, best effort: RGB8 where the device offers
    /// it, Mono8 otherwise, plus the configured exposure. Failures here are
    /// logged but do not abort initialization.
    fn configure(&self, session: &mut CameraSession) {
        if session.set_pixel_format(PixelFormat::Rgb8).is_err()
            && session.set_pixel_format(PixelFormat::Mono8).is_err()
        {
            tracing::warn!(camera = %self.camera, "unable to set pixel format, using device default");
        }
        if let Some(exposure_us) = self.config.exposure_us {
            if let Err(err) = session.set_exposure_us(exposure_us) {
                tracing::warn!(camera = %self.camera, %err, "failed to set exposure");
            }
        }
    }

    fn live_loop(&mut self, session: &mut CameraSession) {
        let timeout = self.config.frame_timeout();
        while self.shared.running() {
            match session.frame(timeout) {
                Ok(raw) => match convert(&raw) {
                    Ok(image) => {
                        let frame = self.annotate(image);
                        self.sink.on_frame(frame);
                    }
                    Err(err) => {
                        tracing::warn!(camera = %self.camera, %err, "dropping unconvertible frame");
                    }
                },
                Err(CamError::FrameTimeout) => {
                    tracing::warn!(camera = %self.camera, "frame wait timed out");
                }
                Err(err) => {
                    tracing::warn!(camera = %self.camera, %err, "frame grab failed");
                }
            }
            self.pace();
        }
    }

    fn fallback_loop(&mut self) {
        let (width, height) = (self.config.fallback_width, self.config.fallback_height);
        while self.shared.running() {
            let image = synthetic::gradient_frame(width, height, self.camera, self.sequence + 1);
            let frame = self.annotate(image);
            self.sink.on_frame(frame);
            self.pace();
        }
    }

    fn annotate(&mut self, image: multicam_core::data::CanonicalImage) -> AnnotatedFrame {
        self.sequence += 1;
        AnnotatedFrame {
            image,
            camera: self.camera,
            sequence: self.sequence,
        }
    }

    fn pace(&self) {
        let fps = self.shared.target_fps.load(Ordering::Relaxed);
        thread::sleep(AcquisitionConfig::frame_interval(fps));
    }
}
