// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use crate::constants::CameraFacing;
use crate::errors::CaptureErrorReason;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{oneshot, watch};

/// Camera backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CameraBackendType {
    /// V4L2 capture devices under /dev/video*
    #[default]
    V4l2,
    /// Still image or generated pattern presented as a camera
    Virtual,
}

impl std::fmt::Display for CameraBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraBackendType::V4l2 => write!(f, "V4L2"),
            CameraBackendType::Virtual => write!(f, "virtual"),
        }
    }
}

/// Device information from V4L2 capability
#[derive(Debug, Clone, Default)]
pub struct DeviceInfo {
    /// Name of the device (V4L2 card)
    pub card: String,
    /// Driver name (V4L2 driver)
    pub driver: String,
    /// Device path (e.g., /dev/video0)
    pub path: String,
    /// Real device path (resolved symlinks)
    pub real_path: String,
}

/// Represents a camera device
#[derive(Debug, Clone)]
pub struct CameraDevice {
    pub name: String,
    pub path: String,                    // Device node, or the image path for virtual cameras
    pub device_info: Option<DeviceInfo>, // V4L2 device information (card, driver, path, real_path)
    pub facing: CameraFacing,
}

/// Framerate as a fraction (numerator/denominator)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Framerate {
    pub num: u32,
    pub denom: u32,
}

impl Framerate {
    pub fn new(num: u32, denom: u32) -> Self {
        Self {
            num,
            denom: if denom == 0 { 1 } else { denom },
        }
    }

    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.denom as f64
    }
}

impl std::fmt::Display for Framerate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.denom != 1 {
            write!(f, "{:.2}", self.as_f64())
        } else {
            write!(f, "{}", self.num)
        }
    }
}

/// Negotiated stream format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraFormat {
    pub width: u32,
    pub height: u32,
    pub framerate: Option<Framerate>,
    pub pixel_format: PixelFormat,
}

impl std::fmt::Display for CameraFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.framerate {
            Some(fps) => write!(
                f,
                "{}x{} {} @ {}fps",
                self.width, self.height, self.pixel_format, fps
            ),
            None => write!(f, "{}x{} {}", self.width, self.height, self.pixel_format),
        }
    }
}

/// What a backend is asked to open
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    /// Explicit device path; overrides `facing`
    pub device: Option<String>,
    /// Preferred facing among the enumerated devices
    pub facing: CameraFacing,
    /// Ideal width; the device may substitute
    pub width: u32,
    /// Ideal height; the device may substitute
    pub height: u32,
}

impl Default for StreamRequest {
    fn default() -> Self {
        Self {
            device: None,
            facing: CameraFacing::Back,
            width: crate::constants::capture::IDEAL_WIDTH,
            height: crate::constants::capture::IDEAL_HEIGHT,
        }
    }
}

/// Pixel format for camera frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// RGBA - 32-bit with alpha (4 bytes per pixel)
    RGBA,
    /// RGB24 - 24-bit RGB (3 bytes per pixel, no alpha)
    RGB24,
    /// Gray8 - 8-bit grayscale (single channel)
    Gray8,
    /// YUYV - Packed 4:2:2 (Y0 U Y1 V interleaved)
    YUYV,
    /// UYVY - Packed 4:2:2 (U Y0 V Y1 interleaved)
    UYVY,
    /// Motion JPEG - each buffer is a complete JPEG image
    MJPEG,
}

impl PixelFormat {
    /// Map a V4L2 FourCC to a supported format
    pub fn from_fourcc(fourcc: &[u8; 4]) -> Option<Self> {
        match fourcc {
            b"MJPG" | b"JPEG" => Some(Self::MJPEG),
            b"YUYV" | b"YUY2" => Some(Self::YUYV),
            b"UYVY" => Some(Self::UYVY),
            b"RGB3" => Some(Self::RGB24),
            b"AB24" | b"RGBA" => Some(Self::RGBA),
            b"GREY" => Some(Self::Gray8),
            _ => None,
        }
    }

    /// Whether the data is packed YUV
    pub fn is_yuv(&self) -> bool {
        matches!(self, Self::YUYV | Self::UYVY)
    }

    /// Bytes per pixel for uncompressed formats
    pub fn bytes_per_pixel(&self) -> Option<u32> {
        match self {
            Self::RGBA => Some(4),
            Self::RGB24 => Some(3),
            Self::YUYV | Self::UYVY => Some(2),
            Self::Gray8 => Some(1),
            Self::MJPEG => None,
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::RGBA => "RGBA",
            Self::RGB24 => "RGB24",
            Self::Gray8 => "GRAY8",
            Self::YUYV => "YUYV",
            Self::UYVY => "UYVY",
            Self::MJPEG => "MJPEG",
        };
        f.write_str(name)
    }
}

/// Single frame from a camera
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// Pixel data, or a whole JPEG image for MJPEG
    pub data: Arc<[u8]>,
    /// Pixel format of the data
    pub format: PixelFormat,
    /// Row stride in bytes (may include padding; 0 for MJPEG)
    pub stride: u32,
    /// When the frame was dequeued
    pub captured_at: Instant,
}

impl CameraFrame {
    /// A frame is decodable once it carries real dimensions and data
    pub fn is_decodable(&self) -> bool {
        self.width > 0 && self.height > 0 && !self.data.is_empty()
    }
}

/// Receiver for the most recent frame of a stream
pub type FrameReceiver = watch::Receiver<Option<CameraFrame>>;

/// Producer side of a stream's frame channel
///
/// Holds the latest-frame slot and the one-shot first-frame signal. The
/// signal fires on the first decodable frame and never again.
pub struct FrameSink {
    frames: watch::Sender<Option<CameraFrame>>,
    first_frame: Option<oneshot::Sender<()>>,
}

impl FrameSink {
    /// Create a sink with its latest-frame receiver and first-frame signal
    pub fn channel() -> (Self, FrameReceiver, oneshot::Receiver<()>) {
        let (frames, frames_rx) = watch::channel(None);
        let (first_tx, first_rx) = oneshot::channel();
        (
            Self {
                frames,
                first_frame: Some(first_tx),
            },
            frames_rx,
            first_rx,
        )
    }

    /// Publish a frame; returns false once nobody is listening
    pub fn publish(&mut self, frame: CameraFrame) -> bool {
        if frame.is_decodable()
            && let Some(tx) = self.first_frame.take()
        {
            let _ = tx.send(());
        }
        self.frames.send_replace(Some(frame));
        !self.frames.is_closed()
    }
}

/// An open device stream
///
/// Dropping or stopping it releases the device. `stop` must be safe to call
/// more than once.
pub trait DeviceStream: Send {
    fn stop(&mut self);
}

/// Everything a backend hands back from a successful open
pub struct OpenedStream {
    pub handle: Box<dyn DeviceStream>,
    pub frames: FrameReceiver,
    pub first_frame: oneshot::Receiver<()>,
    pub device: CameraDevice,
    pub format: CameraFormat,
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Backend is not available on this system
    NotAvailable(String),
    /// Access to the device was refused
    PermissionDenied(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// Device held by another process
    DeviceBusy(String),
    /// Device cannot capture, or offers no usable pixel format
    FormatNotSupported(String),
    /// Failed to initialize backend
    InitializationFailed(String),
    /// Streaming thread died
    Crashed(String),
    /// General I/O error
    IoError(String),
    /// Other errors
    Other(String),
}

impl BackendError {
    /// Classify an OS error from a device call
    pub fn from_io(err: &std::io::Error, context: &str) -> Self {
        let message = format!("{}: {}", context, err);
        match err.raw_os_error() {
            Some(libc::EACCES) | Some(libc::EPERM) => BackendError::PermissionDenied(message),
            Some(libc::ENOENT) | Some(libc::ENODEV) | Some(libc::ENXIO) => {
                BackendError::DeviceNotFound(message)
            }
            Some(libc::EBUSY) => BackendError::DeviceBusy(message),
            Some(libc::ENOTTY) | Some(libc::EINVAL) | Some(libc::EOPNOTSUPP) => {
                BackendError::FormatNotSupported(message)
            }
            _ => match err.kind() {
                std::io::ErrorKind::PermissionDenied => BackendError::PermissionDenied(message),
                std::io::ErrorKind::NotFound => BackendError::DeviceNotFound(message),
                _ => BackendError::IoError(message),
            },
        }
    }

    /// Reason reported to the operator for this failure
    pub fn reason(&self) -> CaptureErrorReason {
        match self {
            BackendError::PermissionDenied(_) => CaptureErrorReason::PermissionDenied,
            BackendError::DeviceNotFound(_) | BackendError::NotAvailable(_) => {
                CaptureErrorReason::DeviceNotFound
            }
            BackendError::DeviceBusy(_) => CaptureErrorReason::DeviceBusy,
            BackendError::FormatNotSupported(_) => CaptureErrorReason::DeviceUnsupported,
            BackendError::InitializationFailed(_)
            | BackendError::Crashed(_)
            | BackendError::IoError(_)
            | BackendError::Other(_) => CaptureErrorReason::Unknown,
        }
    }
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::DeviceBusy(msg) => write!(f, "Device busy: {}", msg),
            BackendError::FormatNotSupported(msg) => write!(f, "Format not supported: {}", msg),
            BackendError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            BackendError::Crashed(msg) => write!(f, "Backend crashed: {}", msg),
            BackendError::IoError(msg) => write!(f, "I/O error: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(width: u32, height: u32) -> CameraFrame {
        CameraFrame {
            width,
            height,
            data: Arc::from(vec![0u8; (width * height * 3) as usize]),
            format: PixelFormat::RGB24,
            stride: width * 3,
            captured_at: Instant::now(),
        }
    }

    #[test]
    fn test_errno_classification() {
        let cases = [
            (libc::EACCES, CaptureErrorReason::PermissionDenied),
            (libc::EPERM, CaptureErrorReason::PermissionDenied),
            (libc::ENOENT, CaptureErrorReason::DeviceNotFound),
            (libc::ENODEV, CaptureErrorReason::DeviceNotFound),
            (libc::EBUSY, CaptureErrorReason::DeviceBusy),
            (libc::ENOTTY, CaptureErrorReason::DeviceUnsupported),
            (libc::EIO, CaptureErrorReason::Unknown),
        ];
        for (errno, expected) in cases {
            let err = std::io::Error::from_raw_os_error(errno);
            assert_eq!(
                BackendError::from_io(&err, "open").reason(),
                expected,
                "errno {}",
                errno
            );
        }
    }

    #[test]
    fn test_first_frame_signal_skips_empty_frames() {
        let (mut sink, rx, mut first) = FrameSink::channel();

        assert!(sink.publish(frame(0, 0)));
        assert!(first.try_recv().is_err(), "empty frame must not signal");

        assert!(sink.publish(frame(4, 2)));
        assert!(first.try_recv().is_ok());
        assert_eq!(rx.borrow().as_ref().map(|f| f.width), Some(4));
    }

    #[test]
    fn test_publish_reports_closed_channel() {
        let (mut sink, rx, _first) = FrameSink::channel();
        drop(rx);
        assert!(!sink.publish(frame(2, 2)));
    }

    #[test]
    fn test_fourcc_mapping() {
        assert_eq!(PixelFormat::from_fourcc(b"MJPG"), Some(PixelFormat::MJPEG));
        assert_eq!(PixelFormat::from_fourcc(b"YUYV"), Some(PixelFormat::YUYV));
        assert_eq!(PixelFormat::from_fourcc(b"H264"), None);
    }
}
