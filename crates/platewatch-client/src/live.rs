//! Live camera mode: periodic capture with fire-and-forget recognition.
//!
//! Every tick captures a frame and submits it without waiting for earlier
//! submissions, so responses may arrive out of order. Consumers replace their
//! batch with whatever arrives last; frames are not re-sequenced.

use crate::camera::{Camera, CameraGuard, Frame};
use crate::error::ClientError;
use crate::recognition::Recognizer;
use platewatch_core::DetectionBatch;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Live mode configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveSettings {
    pub interval_ms: u64,
    /// HTTP endpoint serving the latest camera JPEG
    pub snapshot_url: Option<String>,
    pub snapshot_timeout_secs: u64,
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            interval_ms: 500,
            snapshot_url: None,
            snapshot_timeout_secs: 5,
        }
    }
}

impl LiveSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

/// A recognition response for one captured frame.
#[derive(Debug)]
pub struct LiveUpdate {
    /// Capture order, starting at 1
    pub frame_seq: u64,
    pub frame: Frame,
    pub result: Result<DetectionBatch, ClientError>,
}

#[derive(Debug)]
pub enum LiveEvent {
    Response(LiveUpdate),
    /// The camera failed; the session has stopped and released it.
    CaptureFailed(String),
}

/// The batch currently on screen. Each update replaces it unconditionally.
#[derive(Debug, Clone, Default)]
pub struct LatestBatch {
    batch: Option<DetectionBatch>,
    frame_seq: Option<u64>,
    error: Option<String>,
}

impl LatestBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current batch with `update`. A failed call clears it.
    pub fn apply(&mut self, update: LiveUpdate) -> Option<&DetectionBatch> {
        if let Some(shown) = self.frame_seq {
            if update.frame_seq < shown {
                debug!(shown, arrived = update.frame_seq, "older frame replaced newer overlay");
            }
        }

        match update.result {
            Ok(batch) => {
                self.batch = Some(batch);
                self.error = None;
            }
            Err(err) => {
                warn!(frame = update.frame_seq, %err, "recognition failed");
                self.batch = None;
                self.error = Some(err.to_string());
            }
        }
        self.frame_seq = Some(update.frame_seq);
        self.batch.as_ref()
    }

    pub fn batch(&self) -> Option<&DetectionBatch> {
        self.batch.as_ref()
    }

    pub fn frame_seq(&self) -> Option<u64> {
        self.frame_seq
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Submit one frame in the background. The response is sent on `tx` when it
/// arrives, unless `cancel` fires first.
pub fn dispatch(
    recognizer: Arc<dyn Recognizer>,
    frame_seq: u64,
    frame: Frame,
    cancel: CancellationToken,
    tx: UnboundedSender<LiveEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let upload = frame.to_upload();
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(frame_seq, "in-flight recognition cancelled");
            }
            result = recognizer.recognize(upload) => {
                // the receiver is gone once the consumer has stopped listening
                let _ = tx.send(LiveEvent::Response(LiveUpdate { frame_seq, frame, result }));
            }
        }
    })
}

/// A running capture loop. Stopping or dropping it cancels the timer and any
/// in-flight submissions, and releases the camera.
pub struct LiveSession {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
    events: UnboundedReceiver<LiveEvent>,
}

impl LiveSession {
    /// Acquire `camera` and start capturing every `period`.
    pub fn start(
        camera: Box<dyn Camera>,
        recognizer: Arc<dyn Recognizer>,
        period: Duration,
    ) -> Self {
        let cancel = CancellationToken::new();
        let (tx, events) = mpsc::unbounded_channel();
        let guard = CameraGuard::acquire(camera);

        let handle = tokio::spawn(capture_loop(guard, recognizer, period, cancel.clone(), tx));

        Self {
            cancel,
            handle: Some(handle),
            events,
        }
    }

    /// Next response or failure; `None` once the session has fully ended.
    pub async fn next_event(&mut self) -> Option<LiveEvent> {
        self.events.recv().await
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop capturing and wait until the camera has been released.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                warn!(%err, "capture task ended abnormally");
            }
        }
        info!("live session stopped");
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn capture_loop(
    mut camera: CameraGuard,
    recognizer: Arc<dyn Recognizer>,
    period: Duration,
    cancel: CancellationToken,
    tx: UnboundedSender<LiveEvent>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut frame_seq = 0u64;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let captured = tokio::select! {
            _ = cancel.cancelled() => break,
            captured = camera.capture() => captured,
        };

        match captured {
            Ok(frame) => {
                frame_seq += 1;
                debug!(frame_seq, size = frame.bytes.len(), "frame captured");
                dispatch(recognizer.clone(), frame_seq, frame, cancel.child_token(), tx.clone());
            }
            Err(err) => {
                warn!(%err, "capture failed, stopping live session");
                let _ = tx.send(LiveEvent::CaptureFailed(err.to_string()));
                break;
            }
        }
    }
    // camera guard drops here and releases the device
}
