// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 capture backend
//!
//! Opens `/dev/videoN` nodes directly through the `v4l` crate, negotiates the
//! first pixel format from [`PREFERRED_FOURCCS`] the driver accepts at the
//! requested size, and pumps mmap buffers on a dedicated thread.
//!
//! [`PREFERRED_FOURCCS`]: crate::constants::capture::PREFERRED_FOURCCS

use super::frame_loop::{CaptureLoopController, LoopAction};
use super::types::{
    BackendError, BackendResult, CameraBackendType, CameraDevice, CameraFormat, CameraFrame,
    FrameSink, Framerate, OpenedStream, PixelFormat, StreamRequest,
};
use super::v4l2_utils::{choose_device, probe_capture_device, video_device_nodes};
use super::CameraBackend;
use crate::constants::capture::{DEQUEUE_TIMEOUT, PREFERRED_FOURCCS, V4L2_BUFFER_COUNT};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;

/// Consecutive dequeue failures tolerated before the stream gives up
const MAX_CONSECUTIVE_ERRORS: u32 = 30;

/// Camera backend for V4L2 devices
pub struct V4l2Backend {
    dev_dir: PathBuf,
}

impl V4l2Backend {
    pub fn new() -> Self {
        Self {
            dev_dir: PathBuf::from("/dev"),
        }
    }

    /// Resolve the request to a concrete device
    fn select_device(&self, request: &StreamRequest) -> BackendResult<CameraDevice> {
        if let Some(path) = request.device.as_deref() {
            return probe_capture_device(path);
        }

        let nodes = video_device_nodes(&self.dev_dir);
        if nodes.is_empty() {
            return Err(BackendError::DeviceNotFound(format!(
                "no video nodes under {}",
                self.dev_dir.display()
            )));
        }

        let mut devices = Vec::new();
        let mut worst: Option<BackendError> = None;
        for node in &nodes {
            match probe_capture_device(node) {
                Ok(device) => devices.push(device),
                Err(e) => {
                    debug!(node = %node, error = %e, "Skipping video node");
                    if error_rank(&e) > worst.as_ref().map(error_rank).unwrap_or(0) {
                        worst = Some(e);
                    }
                }
            }
        }

        if devices.is_empty() {
            // Metadata-only nodes mean there is simply no camera
            return Err(match worst {
                Some(e @ (BackendError::PermissionDenied(_) | BackendError::DeviceBusy(_))) => e,
                _ => BackendError::DeviceNotFound("no video capture device".to_string()),
            });
        }

        choose_device(&devices, None, request.facing)
            .cloned()
            .ok_or_else(|| BackendError::DeviceNotFound("no video capture device".to_string()))
    }
}

impl Default for V4l2Backend {
    fn default() -> Self {
        Self::new()
    }
}

/// How informative a probe failure is when no device could be used
fn error_rank(err: &BackendError) -> u8 {
    match err {
        BackendError::PermissionDenied(_) => 3,
        BackendError::DeviceBusy(_) => 2,
        _ => 1,
    }
}

/// State owned by the streaming thread
struct StreamState {
    // Kept alive for the lifetime of the mmap buffers
    _device: Device,
    stream: MmapStream<'static>,
    format: CameraFormat,
    stride: u32,
    consecutive_errors: u32,
}

/// Open the device and negotiate a format at the requested size
fn open_stream(path: &str, width: u32, height: u32) -> BackendResult<StreamState> {
    let mut device =
        Device::with_path(path).map_err(|e| BackendError::from_io(&e, &format!("open {}", path)))?;

    let mut negotiated = None;
    for &fourcc in PREFERRED_FOURCCS {
        let mut wanted = device
            .format()
            .map_err(|e| BackendError::from_io(&e, "query format"))?;
        wanted.width = width;
        wanted.height = height;
        wanted.fourcc = v4l::FourCC::new(fourcc);

        match device.set_format(&wanted) {
            Ok(actual) => {
                if let Some(pixel_format) = PixelFormat::from_fourcc(&actual.fourcc.repr) {
                    negotiated = Some((actual, pixel_format));
                    break;
                }
                debug!(
                    requested = ?wanted.fourcc,
                    got = ?actual.fourcc,
                    "Driver substituted an unusable format"
                );
            }
            Err(e) => {
                let err = BackendError::from_io(&e, "set format");
                if matches!(err, BackendError::DeviceBusy(_)) {
                    return Err(err);
                }
                debug!(fourcc = ?wanted.fourcc, error = %e, "Format rejected");
            }
        }
    }

    let (format, pixel_format) = negotiated.ok_or_else(|| {
        BackendError::FormatNotSupported(format!("{} offers no supported pixel format", path))
    })?;

    let framerate = device
        .params()
        .ok()
        .filter(|p| p.interval.numerator > 0)
        .map(|p| Framerate::new(p.interval.denominator, p.interval.numerator));

    let mut stream = MmapStream::with_buffers(&mut device, Type::VideoCapture, V4L2_BUFFER_COUNT)
        .map_err(|e| BackendError::from_io(&e, "allocate buffers"))?;
    // A stalled driver surfaces as a dequeue error instead of blocking the thread
    stream.set_timeout(DEQUEUE_TIMEOUT);

    let camera_format = CameraFormat {
        width: format.width,
        height: format.height,
        framerate,
        pixel_format,
    };

    info!(device = %path, format = %camera_format, "V4L2 stream configured");

    Ok(StreamState {
        _device: device,
        stream,
        stride: format.stride,
        format: camera_format,
        consecutive_errors: 0,
    })
}

/// Dequeue one buffer and publish it
fn pump(state: &mut StreamState, sink: &mut FrameSink) -> LoopAction {
    match state.stream.next() {
        Ok((buf, meta)) => {
            state.consecutive_errors = 0;
            let used = (meta.bytesused as usize).min(buf.len());
            let used = if used == 0 { buf.len() } else { used };

            let frame = CameraFrame {
                width: state.format.width,
                height: state.format.height,
                data: Arc::from(&buf[..used]),
                format: state.format.pixel_format,
                stride: if state.format.pixel_format == PixelFormat::MJPEG {
                    0
                } else {
                    state.stride
                },
                captured_at: Instant::now(),
            };

            if sink.publish(frame) {
                LoopAction::Continue
            } else {
                debug!("No frame listeners left");
                LoopAction::Stop
            }
        }
        Err(e) => {
            state.consecutive_errors += 1;
            warn!(error = %e, count = state.consecutive_errors, "Failed to dequeue frame");
            if state.consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                return LoopAction::Stop;
            }
            std::thread::sleep(Duration::from_millis(10));
            LoopAction::Continue
        }
    }
}

impl CameraBackend for V4l2Backend {
    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        video_device_nodes(&self.dev_dir)
            .iter()
            .filter_map(|node| probe_capture_device(node).ok())
            .collect()
    }

    fn open(&self, request: &StreamRequest) -> BackendResult<OpenedStream> {
        let device = self.select_device(request)?;
        info!(
            device = %device.path,
            name = %device.name,
            facing = ?device.facing,
            "Opening camera"
        );

        let (mut sink, frames, first_frame) = FrameSink::channel();
        let (format_tx, format_rx) = mpsc::channel();
        let path = device.path.clone();
        let (width, height) = (request.width, request.height);

        let handle = CaptureLoopController::start_with_init(
            "v4l2-stream",
            move || {
                let state = open_stream(&path, width, height)?;
                let _ = format_tx.send(state.format.clone());
                Ok(state)
            },
            move |state| pump(state, &mut sink),
        )?;

        let format = format_rx
            .recv()
            .map_err(|_| BackendError::Crashed("stream format was not reported".to_string()))?;

        Ok(OpenedStream {
            handle: Box::new(handle),
            frames,
            first_frame,
            device,
            format,
        })
    }

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::V4l2
    }

    fn is_available(&self) -> bool {
        !video_device_nodes(&self.dev_dir).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_dev_dir_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let backend = V4l2Backend {
            dev_dir: dir.path().to_path_buf(),
        };
        assert!(!backend.is_available());
        let err = backend.select_device(&StreamRequest::default()).unwrap_err();
        assert!(matches!(err, BackendError::DeviceNotFound(_)));
    }

    #[test]
    fn test_permission_outranks_not_found() {
        assert!(
            error_rank(&BackendError::PermissionDenied(String::new()))
                > error_rank(&BackendError::DeviceNotFound(String::new()))
        );
    }
}
