// SPDX-License-Identifier: GPL-3.0-only

//! Virtual camera backend
//!
//! Presents a still image (or generated colour bars) as a camera stream so
//! the capture workflow can run without hardware: on machines with no
//! camera, over SSH, and in tests.
//!
//! The first frame is published before `open` returns, so readiness through
//! a decodable frame is deterministic. The remaining frames repeat at about
//! 30 fps on a stream thread.

mod file_source;

pub use file_source::{load_image_as_frame, test_pattern_frame};

use crate::backends::camera::CameraBackend;
use crate::backends::camera::frame_loop::{CaptureLoopController, LoopAction};
use crate::backends::camera::types::{
    BackendError, BackendResult, CameraBackendType, CameraDevice, CameraFormat, CameraFrame,
    DeviceStream, FrameSink, OpenedStream, StreamRequest,
};
use crate::constants::{CameraFacing, virtual_camera as vc};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info};

/// What the virtual camera shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VirtualSource {
    /// A still image file
    Image(PathBuf),
    /// Generated colour bars
    Pattern { width: u32, height: u32 },
}

impl Default for VirtualSource {
    fn default() -> Self {
        VirtualSource::Pattern {
            width: vc::PATTERN_WIDTH,
            height: vc::PATTERN_HEIGHT,
        }
    }
}

/// Open/release counters, shared with every stream the backend hands out
#[derive(Debug, Default)]
pub struct VirtualCameraStats {
    opened: AtomicUsize,
    released: AtomicUsize,
}

impl VirtualCameraStats {
    /// Streams successfully opened
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Streams released (each counted once, however often stop is called)
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Streams currently open
    pub fn active(&self) -> usize {
        self.opened().saturating_sub(self.released())
    }
}

/// Camera backend backed by a still image or a test pattern
pub struct VirtualCameraBackend {
    source: VirtualSource,
    pending_failures: Mutex<VecDeque<BackendError>>,
    withhold_frames: bool,
    stats: Arc<VirtualCameraStats>,
}

impl VirtualCameraBackend {
    pub fn new(source: VirtualSource) -> Self {
        Self {
            source,
            pending_failures: Mutex::new(VecDeque::new()),
            withhold_frames: false,
            stats: Arc::new(VirtualCameraStats::default()),
        }
    }

    /// Colour-bar camera at the default size
    pub fn pattern() -> Self {
        Self::new(VirtualSource::default())
    }

    /// Make the next opens fail with these errors, in order
    pub fn fail_next_opens(self, errors: impl IntoIterator<Item = BackendError>) -> Self {
        if let Ok(mut pending) = self.pending_failures.lock() {
            pending.extend(errors);
        }
        self
    }

    /// Open successfully but never deliver a frame
    ///
    /// Models a device whose driver never signals a first frame; readiness
    /// then only comes from the timeout fallback.
    pub fn withhold_frames(mut self) -> Self {
        self.withhold_frames = true;
        self
    }

    pub fn stats(&self) -> Arc<VirtualCameraStats> {
        Arc::clone(&self.stats)
    }

    fn device(&self) -> CameraDevice {
        let (name, path) = match &self.source {
            VirtualSource::Image(path) => (
                format!(
                    "Virtual camera ({})",
                    path.file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default()
                ),
                path.to_string_lossy().to_string(),
            ),
            VirtualSource::Pattern { .. } => {
                ("Virtual camera (test pattern)".to_string(), "pattern".to_string())
            }
        };
        CameraDevice {
            name,
            path,
            device_info: None,
            facing: CameraFacing::Back,
        }
    }

    fn load_frame(&self) -> BackendResult<CameraFrame> {
        match &self.source {
            VirtualSource::Image(path) => load_image_as_frame(path),
            VirtualSource::Pattern { width, height } => Ok(test_pattern_frame(*width, *height)),
        }
    }

    fn take_pending_failure(&self) -> Option<BackendError> {
        self.pending_failures
            .lock()
            .ok()
            .and_then(|mut pending| pending.pop_front())
    }
}

/// Stream handle counting its own release exactly once
struct VirtualStream {
    stream_loop: CaptureLoopController,
    stats: Arc<VirtualCameraStats>,
    released: bool,
}

impl DeviceStream for VirtualStream {
    fn stop(&mut self) {
        self.stream_loop.stop();
        if !self.released {
            self.released = true;
            self.stats.released.fetch_add(1, Ordering::SeqCst);
            debug!("Virtual camera stream released");
        }
    }
}

impl Drop for VirtualStream {
    fn drop(&mut self) {
        DeviceStream::stop(self);
    }
}

impl CameraBackend for VirtualCameraBackend {
    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        vec![self.device()]
    }

    fn open(&self, _request: &StreamRequest) -> BackendResult<OpenedStream> {
        if let Some(err) = self.take_pending_failure() {
            return Err(err);
        }

        // The image is the stream; the requested size is advisory
        let frame = self.load_frame()?;
        let format = CameraFormat {
            width: frame.width,
            height: frame.height,
            framerate: None,
            pixel_format: frame.format,
        };

        let (mut sink, frames, first_frame) = FrameSink::channel();
        let withhold = self.withhold_frames;
        if !withhold {
            sink.publish(frame.clone());
        }

        let stream_loop = CaptureLoopController::start("virtual-camera", move || {
            std::thread::sleep(vc::IMAGE_STREAM_FRAME_DURATION);
            if withhold {
                return LoopAction::Continue;
            }
            let next = CameraFrame {
                captured_at: Instant::now(),
                ..frame.clone()
            };
            if sink.publish(next) {
                LoopAction::Continue
            } else {
                LoopAction::Stop
            }
        })?;

        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        let device = self.device();
        info!(device = %device.name, format = %format, "Virtual camera opened");

        Ok(OpenedStream {
            handle: Box::new(VirtualStream {
                stream_loop,
                stats: Arc::clone(&self.stats),
                released: false,
            }),
            frames,
            first_frame,
            device,
            format,
        })
    }

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::Virtual
    }

    fn is_available(&self) -> bool {
        match &self.source {
            VirtualSource::Image(path) => path.exists(),
            VirtualSource::Pattern { .. } => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_frame_ready_on_open() {
        let backend = VirtualCameraBackend::new(VirtualSource::Pattern {
            width: 8,
            height: 4,
        });
        let mut opened = backend.open(&StreamRequest::default()).unwrap();

        assert!(opened.first_frame.try_recv().is_ok());
        assert_eq!(opened.frames.borrow().as_ref().map(|f| f.width), Some(8));
        opened.handle.stop();
    }

    #[test]
    fn test_release_counted_once() {
        let backend = VirtualCameraBackend::new(VirtualSource::Pattern {
            width: 2,
            height: 2,
        });
        let stats = backend.stats();
        let mut opened = backend.open(&StreamRequest::default()).unwrap();

        opened.handle.stop();
        opened.handle.stop();
        drop(opened);

        assert_eq!(stats.opened(), 1);
        assert_eq!(stats.released(), 1);
    }

    #[test]
    fn test_pending_failures_consumed_in_order() {
        let backend = VirtualCameraBackend::pattern().fail_next_opens([
            BackendError::PermissionDenied("denied".into()),
            BackendError::DeviceBusy("busy".into()),
        ]);

        assert!(matches!(
            backend.open(&StreamRequest::default()),
            Err(BackendError::PermissionDenied(_))
        ));
        assert!(matches!(
            backend.open(&StreamRequest::default()),
            Err(BackendError::DeviceBusy(_))
        ));
        assert!(backend.open(&StreamRequest::default()).is_ok());
    }

    #[test]
    fn test_withheld_frames_never_signal() {
        let backend = VirtualCameraBackend::pattern().withhold_frames();
        let mut opened = backend.open(&StreamRequest::default()).unwrap();
        assert!(opened.first_frame.try_recv().is_err());
        assert!(opened.frames.borrow().is_none());
    }
}
