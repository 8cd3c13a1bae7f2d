//! Two-camera demo against the mock driver.
//!
//! Camera 0 streams live test-pattern frames; camera 1 is configured with a
//! serial that does not exist and degrades to the synthetic feed. Run with
//! `RUST_LOG=info` to watch the lifecycle.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use multicam_acquire::{AcquisitionConfig, AcquisitionThread, LatestFrame};
use multicam_core::driver::CameraDriver;
use multicam_driver_mock::{MockDeviceSpec, MockDriver};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let driver: Arc<dyn CameraDriver> = Arc::new(
        MockDriver::builder()
            .device(MockDeviceSpec::new("DA1015"))
            .build(),
    );

    let live_sink = Arc::new(LatestFrame::new());
    let mut live = AcquisitionThread::new(
        Arc::clone(&driver),
        AcquisitionConfig {
            camera_id: 0,
            serial: Some("DA1015".to_string()),
            target_fps: 30,
            ..AcquisitionConfig::default()
        },
        Arc::clone(&live_sink) as _,
    )?;

    let fallback_sink = Arc::new(LatestFrame::new());
    let mut fallback = AcquisitionThread::new(
        Arc::clone(&driver),
        AcquisitionConfig {
            camera_id: 1,
            serial: Some("UNPLUGGED".to_string()),
            ..AcquisitionConfig::default()
        },
        Arc::clone(&fallback_sink) as _,
    )?;

    live.start()?;
    fallback.start()?;

    for _ in 0..10 {
        std::thread::sleep(Duration::from_millis(200));
        for (sink, worker) in [(&live_sink, &live), (&fallback_sink, &fallback)] {
            if let Some(frame) = sink.take() {
                println!(
                    "{} [{:?}] frame #{} {}x{}",
                    frame.camera,
                    worker.state(),
                    frame.sequence,
                    frame.image.width(),
                    frame.image.height(),
                );
            }
        }
    }

    live.stop()?;
    fallback.stop()?;
    println!(
        "dropped while unconsumed: live={} fallback={}",
        live_sink.overwritten(),
        fallback_sink.overwritten()
    );
    Ok(())
}
