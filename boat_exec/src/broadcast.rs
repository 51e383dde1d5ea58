//! # Broadcast Loops
//!
//! The two periodic tasks which fan data out to every observer:
//!
//! - the telemetry loop samples every sensor, publishes the snapshot into the telemetry cache and
//!   broadcasts it,
//! - the video loop captures and encodes one camera frame per tick and broadcasts it.
//!
//! Both run until their cancellation token fires. Unexpected errors are logged and the loop backs
//! off before trying again.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{sync::Arc, time::Duration};

use comms_if::{
    eqpt::cam::{CamImage, ImageFormat},
    tm::{TelemetrySnapshot, Tm},
};
use log::{error, info, trace, warn};
use tokio::{
    sync::watch,
    task::JoinError,
    time::{interval, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    components::{lock, Components},
    registry::Registry,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Time to wait after an unexpected error before the next tick.
pub const ERROR_BACKOFF: Duration = Duration::from_secs(1);

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    #[error("Blocking task failed: {0}")]
    Join(#[from] JoinError),

    #[error("Could not serialise the message: {0}")]
    Serialise(#[from] serde_json::Error),

    #[error("Could not encode the frame: {0}")]
    Encode(#[from] image::ImageError),
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Sample, cache and broadcast telemetry every `period` until cancelled.
pub async fn telemetry_loop(
    components: Arc<Components>,
    registry: Arc<Registry>,
    cache: watch::Sender<Option<TelemetrySnapshot>>,
    period: Duration,
    cancel: CancellationToken
) {
    info!("Telemetry loop started ({:.3} s period)", period.as_secs_f64());

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => (),
        }

        // A slow sensor read is abandoned on cancellation
        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            r = telemetry_tick(&components, &registry, &cache) => r,
        };

        if let Err(e) = result {
            error!("Telemetry loop error: {}", e);

            if backoff(&cancel).await {
                break;
            }
        }
    }

    info!("Telemetry loop stopped");
}

/// Capture, encode and broadcast a camera frame every `period` until cancelled.
pub async fn video_loop(
    components: Arc<Components>,
    registry: Arc<Registry>,
    period: Duration,
    jpeg_quality: u8,
    cancel: CancellationToken
) {
    info!("Video loop started ({:.3} s period)", period.as_secs_f64());

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => (),
        }

        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            r = video_tick(&components, &registry, jpeg_quality) => r,
        };

        match result {
            Ok(true) => (),
            Ok(false) => warn!("No camera frame available"),
            Err(e) => {
                error!("Video loop error: {}", e);

                if backoff(&cancel).await {
                    break;
                }
            }
        }
    }

    info!("Video loop stopped");
}

async fn telemetry_tick(
    components: &Arc<Components>,
    registry: &Registry,
    cache: &watch::Sender<Option<TelemetrySnapshot>>
) -> Result<(), BroadcastError> {
    let c = components.clone();
    let readings = tokio::task::spawn_blocking(move || lock(&c.sensors).sample()).await?;

    let snapshot = TelemetrySnapshot {
        gps: readings.gps,
        imu: readings.imu,
        battery: readings.battery,
        system: readings.system,
        servos: components.servos.get_status().await,
    };

    cache.send_replace(Some(snapshot.clone()));

    let frame = Tm::Telemetry(snapshot).to_json()?;
    let sent = registry.broadcast(Arc::from(frame));

    trace!("Telemetry sent to {} observers", sent);

    Ok(())
}

/// Returns `false` if the camera had no frame.
async fn video_tick(
    components: &Arc<Components>,
    registry: &Registry,
    jpeg_quality: u8
) -> Result<bool, BroadcastError> {
    let c = components.clone();
    let uri = tokio::task::spawn_blocking(move || -> Result<Option<String>, BroadcastError> {
        let image = match lock(&c.camera).capture_frame() {
            Some(i) => i,
            None => return Ok(None),
        };

        let frame = CamImage::now(image).to_cam_frame(ImageFormat::Jpeg(jpeg_quality))?;
        Ok(Some(frame.to_data_uri()))
    }).await??;

    let uri = match uri {
        Some(u) => u,
        None => return Ok(false),
    };

    let frame = Tm::Video(uri).to_json()?;
    let sent = registry.broadcast(Arc::from(frame));

    trace!("Video frame sent to {} observers", sent);

    Ok(true)
}

/// Wait out the error backoff, returning `true` if cancelled meanwhile.
async fn backoff(cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(ERROR_BACKOFF) => false,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{components::sim_params, hal::SimPins};
    use comms_if::tm::Tm;
    use tokio::time::timeout;

    fn components(dir: &std::path::Path) -> Arc<Components> {
        let mut params = sim_params(dir);
        params.broadcast.video_width = 64;
        params.broadcast.video_height = 48;

        Arc::new(Components::with_sim_pins(&params, &SimPins::new()).unwrap())
    }

    #[tokio::test]
    async fn test_telemetry_loop() {
        let dir = tempfile::tempdir().unwrap();
        let components = components(dir.path());
        let registry = Arc::new(Registry::new());
        let (cache_tx, mut cache_rx) = watch::channel(None);
        let cancel = CancellationToken::new();

        let (_id, mut rx) = registry.register(Arc::from("greeting"));

        let task = tokio::spawn(telemetry_loop(
            components,
            registry.clone(),
            cache_tx,
            Duration::from_millis(10),
            cancel.clone()
        ));

        assert_eq!(&*rx.recv().await.unwrap(), "greeting");

        let frame = timeout(Duration::from_secs(10), rx.recv()).await.unwrap().unwrap();
        match Tm::from_json(&frame).unwrap() {
            Tm::Telemetry(s) => {
                assert_eq!(s.servos.pan_angle, 90.0);
                assert!(s.battery.is_some());
                assert!(s.system.is_some());
            },
            other => panic!("Unexpected message {:?}", other),
        }

        // Cache holds the latest snapshot
        timeout(Duration::from_secs(10), cache_rx.wait_for(|s| s.is_some()))
            .await
            .unwrap()
            .unwrap();

        cancel.cancel();
        timeout(Duration::from_secs(10), task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_telemetry_loop_cancelled_during_read() {
        let dir = tempfile::tempdir().unwrap();
        let components = components(dir.path());
        let registry = Arc::new(Registry::new());
        let (cache_tx, cache_rx) = watch::channel(None);
        let cancel = CancellationToken::new();

        // Holding the sensors stalls the read
        let guard = lock(&components.sensors);

        let task = tokio::spawn(telemetry_loop(
            components.clone(),
            registry,
            cache_tx,
            Duration::from_millis(10),
            cancel.clone()
        ));

        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
        timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
        assert!(cache_rx.borrow().is_none());

        drop(guard);
    }

    #[tokio::test]
    async fn test_video_loop() {
        let dir = tempfile::tempdir().unwrap();
        let components = components(dir.path());
        let registry = Arc::new(Registry::new());
        let cancel = CancellationToken::new();

        let (_id, mut rx) = registry.register(Arc::from("greeting"));

        let task = tokio::spawn(video_loop(
            components.clone(),
            registry.clone(),
            Duration::from_millis(10),
            80,
            cancel.clone()
        ));

        rx.recv().await.unwrap();

        let frame = timeout(Duration::from_secs(10), rx.recv()).await.unwrap().unwrap();
        match Tm::from_json(&frame).unwrap() {
            Tm::Video(uri) => assert!(uri.starts_with("data:image/jpeg;base64,")),
            other => panic!("Unexpected message {:?}", other),
        }

        cancel.cancel();
        timeout(Duration::from_secs(10), task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_video_loop_without_camera() {
        let dir = tempfile::tempdir().unwrap();
        let components = components(dir.path());
        let registry = Arc::new(Registry::new());
        let cancel = CancellationToken::new();

        lock(&components.camera).release();
        let (_id, mut rx) = registry.register(Arc::from("greeting"));

        let task = tokio::spawn(video_loop(
            components,
            registry.clone(),
            Duration::from_millis(10),
            80,
            cancel.clone()
        ));

        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
        timeout(Duration::from_secs(10), task).await.unwrap().unwrap();

        // Only the greeting was queued
        assert_eq!(&*rx.recv().await.unwrap(), "greeting");
        assert!(rx.try_recv().is_err());
    }
}
