// SPDX-License-Identifier: GPL-3.0-only

//! Capture controller
//!
//! Owns one camera stream from request to release and turns the current
//! frame into a single JPEG still on demand.
//!
//! ```text
//!  Idle ──open──▶ Requesting ──granted──▶ Streaming{ready} ──capture──▶ Capturing
//!                     │                       ▲                            │
//!                   denied                    └────── encode failed ───────┤
//!                     ▼                                                    │
//!                   Error ──retry──▶ Requesting                  success ──▶ Closed
//! ```
//!
//! `close` is valid from every state and releases the device exactly once.
//! Dropping the controller closes it.

mod readiness;

pub use readiness::{ReadinessLatch, ReadySource, spawn_readiness_race};

use crate::backends::camera::{
    BackendError, CameraBackend, CameraDevice, CameraFormat, CameraFrame, DeviceStream,
    FrameReceiver, OpenedStream, StreamRequest,
};
use crate::config::CameraConfig;
use crate::constants::capture;
use crate::errors::{CaptureErrorReason, PhotoError};
use crate::pipelines::photo::{CapturedImage, PhotoEncoder, PhotoPipeline};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Observable controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Nothing requested yet
    Idle,
    /// Device access requested
    Requesting,
    /// Live feed bound; `ready` once a frame arrived or the timeout passed
    Streaming { ready: bool },
    /// Encoding a still
    Capturing,
    /// All device resources released
    Closed,
    /// Device request failed
    Error(CaptureErrorReason),
}

impl CaptureState {
    pub fn is_streaming(&self) -> bool {
        matches!(self, CaptureState::Streaming { .. })
    }

    /// Closed for good; only a new controller can stream again
    pub fn is_closed(&self) -> bool {
        matches!(self, CaptureState::Closed)
    }

    pub fn error(&self) -> Option<CaptureErrorReason> {
        match self {
            CaptureState::Error(reason) => Some(*reason),
            _ => None,
        }
    }
}

/// Notifications sent to the controller's owner
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    /// Stream bound with this format
    Streaming { format: CameraFormat },
    /// Capture is now allowed
    Ready(ReadySource),
    /// A still was produced; the stream has been released
    ImageReady(CapturedImage),
    /// The device could not be opened
    Error(CaptureErrorReason),
    /// A capture attempt failed; still streaming
    CaptureFailed(String),
    /// Device released
    Closed,
}

/// Result of a capture request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Not streaming or not ready yet; nothing happened
    NotReady,
    /// A still was delivered as [`CaptureEvent::ImageReady`]
    Captured { width: u32, height: u32 },
    /// Conversion or encoding failed; still streaming
    Failed(PhotoError),
}

/// Controller settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOptions {
    pub request: StreamRequest,
    pub ready_timeout: Duration,
    pub jpeg_quality: u8,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            request: StreamRequest::default(),
            ready_timeout: capture::READY_TIMEOUT,
            jpeg_quality: capture::JPEG_QUALITY,
        }
    }
}

impl From<&CameraConfig> for CaptureOptions {
    fn from(config: &CameraConfig) -> Self {
        Self {
            request: StreamRequest {
                device: config.device.clone(),
                facing: config.facing,
                width: config.width,
                height: config.height,
            },
            ready_timeout: config.ready_timeout(),
            jpeg_quality: config.jpeg_quality(),
        }
    }
}

/// Internal phase; readiness lives in the session latch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Requesting,
    Streaming,
    Capturing,
    Closed,
    Error(CaptureErrorReason),
}

/// Holds `Capturing` for one encode
///
/// Restores `Streaming` when dropped, including when the `capture` future
/// is cancelled mid-encode.
struct CapturingGuard<'a> {
    phase: &'a mut Phase,
}

impl<'a> CapturingGuard<'a> {
    fn enter(phase: &'a mut Phase) -> Self {
        *phase = Phase::Capturing;
        Self { phase }
    }
}

impl Drop for CapturingGuard<'_> {
    fn drop(&mut self) {
        if *self.phase == Phase::Capturing {
            *self.phase = Phase::Streaming;
        }
    }
}

/// Resources held while a stream is open
struct CaptureSession {
    handle: Box<dyn DeviceStream>,
    frames: FrameReceiver,
    latch: Arc<ReadinessLatch>,
    readiness_task: JoinHandle<()>,
    device: CameraDevice,
    format: CameraFormat,
}

impl CaptureSession {
    fn release(mut self) {
        self.latch.close();
        self.readiness_task.abort();
        self.handle.stop();
        debug!(device = %self.device.path, "Capture session released");
    }
}

/// Camera capture state machine
pub struct CaptureController {
    backend: Arc<dyn CameraBackend>,
    options: CaptureOptions,
    pipeline: PhotoPipeline,
    phase: Phase,
    session: Option<CaptureSession>,
    last_error: Option<CaptureErrorReason>,
    events: mpsc::UnboundedSender<CaptureEvent>,
}

impl CaptureController {
    /// Create an idle controller and the receiver for its events
    pub fn new(
        backend: Arc<dyn CameraBackend>,
        options: CaptureOptions,
    ) -> (Self, mpsc::UnboundedReceiver<CaptureEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let pipeline = PhotoPipeline::new(PhotoEncoder::new(options.jpeg_quality));
        (
            Self {
                backend,
                options,
                pipeline,
                phase: Phase::Idle,
                session: None,
                last_error: None,
                events,
            },
            events_rx,
        )
    }

    pub fn state(&self) -> CaptureState {
        match self.phase {
            Phase::Idle => CaptureState::Idle,
            Phase::Requesting => CaptureState::Requesting,
            Phase::Streaming => CaptureState::Streaming {
                ready: self.is_ready(),
            },
            Phase::Capturing => CaptureState::Capturing,
            Phase::Closed => CaptureState::Closed,
            Phase::Error(reason) => CaptureState::Error(reason),
        }
    }

    pub fn last_error(&self) -> Option<CaptureErrorReason> {
        self.last_error
    }

    pub fn is_ready(&self) -> bool {
        self.session
            .as_ref()
            .map(|s| s.latch.is_ready())
            .unwrap_or(false)
    }

    /// Latest frame of the live feed
    pub fn preview_frame(&self) -> Option<CameraFrame> {
        self.session.as_ref().and_then(|s| s.frames.borrow().clone())
    }

    pub fn stream_format(&self) -> Option<&CameraFormat> {
        self.session.as_ref().map(|s| &s.format)
    }

    pub fn device(&self) -> Option<&CameraDevice> {
        self.session.as_ref().map(|s| &s.device)
    }

    fn emit(&self, event: CaptureEvent) {
        // The owner may have stopped listening; that is not an error here
        let _ = self.events.send(event);
    }

    /// Request the camera
    ///
    /// Only acts from `Idle`. Never fails: a refused or missing device moves
    /// the controller to `Error` and emits [`CaptureEvent::Error`].
    pub async fn open(&mut self) {
        if self.phase != Phase::Idle {
            debug!(phase = ?self.phase, "open ignored outside Idle");
            return;
        }
        self.request_stream().await;
    }

    async fn request_stream(&mut self) {
        self.phase = Phase::Requesting;
        self.last_error = None;

        let backend = Arc::clone(&self.backend);
        let request = self.options.request.clone();
        info!(backend = %backend.backend_type(), facing = ?request.facing, "Requesting camera");

        let opened = tokio::task::spawn_blocking(move || backend.open(&request))
            .await
            .unwrap_or_else(|e| Err(BackendError::Crashed(format!("open task failed: {}", e))));

        match opened {
            Ok(opened) => self.bind(opened),
            Err(e) => {
                let reason = e.reason();
                warn!(error = %e, reason = reason.as_str(), "Camera request failed");
                self.phase = Phase::Error(reason);
                self.last_error = Some(reason);
                self.emit(CaptureEvent::Error(reason));
            }
        }
    }

    fn bind(&mut self, opened: OpenedStream) {
        let OpenedStream {
            handle,
            frames,
            first_frame,
            device,
            format,
        } = opened;

        info!(device = %device.path, format = %format, "Camera streaming");
        self.emit(CaptureEvent::Streaming {
            format: format.clone(),
        });

        let latch = ReadinessLatch::new();
        let readiness_task = spawn_readiness_race(
            first_frame,
            self.options.ready_timeout,
            Arc::clone(&latch),
            self.events.clone(),
        );

        self.session = Some(CaptureSession {
            handle,
            frames,
            latch,
            readiness_task,
            device,
            format,
        });
        self.phase = Phase::Streaming;
    }

    /// Take a still from the current frame
    ///
    /// A no-op returning [`CaptureOutcome::NotReady`] unless streaming and
    /// ready. On success the image goes out as [`CaptureEvent::ImageReady`]
    /// and the controller closes.
    pub async fn capture(&mut self) -> CaptureOutcome {
        if self.phase != Phase::Streaming || !self.is_ready() {
            return CaptureOutcome::NotReady;
        }

        let frame = self.preview_frame().filter(CameraFrame::is_decodable);

        let result = {
            let _capturing = CapturingGuard::enter(&mut self.phase);
            match frame {
                Some(frame) => self.pipeline.process(frame).await,
                None => Err(PhotoError::NoFrameAvailable),
            }
        };

        match result {
            Ok(image) => {
                let (width, height) = (image.width, image.height);
                self.emit(CaptureEvent::ImageReady(image));
                self.close();
                CaptureOutcome::Captured { width, height }
            }
            Err(e) => {
                warn!(error = %e, "Capture failed, still streaming");
                self.emit(CaptureEvent::CaptureFailed(e.to_string()));
                CaptureOutcome::Failed(e)
            }
        }
    }

    /// Release the device and enter `Closed`
    ///
    /// Idempotent: the device is released and `Closed` emitted only once.
    pub fn close(&mut self) {
        if self.phase == Phase::Closed {
            return;
        }
        if let Some(session) = self.session.take() {
            session.release();
        }
        self.phase = Phase::Closed;
        info!("Camera closed");
        self.emit(CaptureEvent::Closed);
    }

    /// Request the camera again after a failure
    ///
    /// Only acts from `Error`.
    pub async fn retry(&mut self) {
        if !matches!(self.phase, Phase::Error(_)) {
            debug!(phase = ?self.phase, "retry ignored outside Error");
            return;
        }
        if let Some(session) = self.session.take() {
            session.release();
        }
        info!("Retrying camera request");
        self.request_stream().await;
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::virtual_camera::{VirtualCameraBackend, VirtualSource};

    fn small_pattern() -> VirtualCameraBackend {
        VirtualCameraBackend::new(VirtualSource::Pattern {
            width: 32,
            height: 24,
        })
    }

    #[tokio::test]
    async fn test_open_streams_from_idle_only() {
        let backend = Arc::new(small_pattern());
        let stats = backend.stats();
        let (mut controller, _events) = CaptureController::new(backend, CaptureOptions::default());

        assert_eq!(controller.state(), CaptureState::Idle);
        controller.open().await;
        assert!(controller.state().is_streaming());

        controller.open().await;
        assert_eq!(stats.opened(), 1, "second open must not reopen the device");
    }

    #[tokio::test]
    async fn test_close_from_idle_emits_closed() {
        let (mut controller, mut events) =
            CaptureController::new(Arc::new(small_pattern()), CaptureOptions::default());

        controller.close();
        assert_eq!(controller.state(), CaptureState::Closed);
        assert_eq!(events.recv().await, Some(CaptureEvent::Closed));
    }

    #[tokio::test]
    async fn test_retry_ignored_while_streaming() {
        let backend = Arc::new(small_pattern());
        let stats = backend.stats();
        let (mut controller, _events) = CaptureController::new(backend, CaptureOptions::default());

        controller.open().await;
        controller.retry().await;
        assert_eq!(stats.opened(), 1);
        assert_eq!(stats.released(), 0);
    }

    #[test]
    fn test_capturing_guard_restores_streaming() {
        let mut phase = Phase::Streaming;
        {
            let _capturing = CapturingGuard::enter(&mut phase);
        }
        assert_eq!(phase, Phase::Streaming);
    }

    #[tokio::test]
    async fn test_cancelled_capture_keeps_streaming() {
        let backend = Arc::new(VirtualCameraBackend::new(VirtualSource::Pattern {
            width: 1280,
            height: 720,
        }));
        let (mut controller, mut events) =
            CaptureController::new(backend, CaptureOptions::default());
        controller.open().await;
        while !matches!(events.recv().await, Some(CaptureEvent::Ready(_))) {}

        // Dropped after its first poll, while the encode runs on the blocking pool
        match tokio::time::timeout(Duration::ZERO, controller.capture()).await {
            Err(_) => {
                assert_eq!(controller.state(), CaptureState::Streaming { ready: true });
                assert!(matches!(
                    controller.capture().await,
                    CaptureOutcome::Captured { .. }
                ));
            }
            Ok(outcome) => assert!(matches!(outcome, CaptureOutcome::Captured { .. })),
        }
        assert_eq!(controller.state(), CaptureState::Closed);
    }

    #[test]
    fn test_options_from_config() {
        let config = CameraConfig {
            device: Some("/dev/video4".into()),
            ready_timeout_ms: 500,
            ..Default::default()
        };
        let options = CaptureOptions::from(&config);
        assert_eq!(options.request.device.as_deref(), Some("/dev/video4"));
        assert_eq!(options.ready_timeout, Duration::from_millis(500));
        assert_eq!(options.jpeg_quality, 90);
    }
}
