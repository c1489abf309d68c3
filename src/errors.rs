// SPDX-License-Identifier: MPL-2.0

//! Error types for the QA camera application
//!
//! Failures are grouped the way they are handled:
//!
//! - [`CaptureErrorReason`]: device/permission failures, recoverable by retrying
//! - [`PhotoError`]: frame-to-image conversion failures, recoverable, no state change
//! - [`GatewayError`]: record and upload failures, shown verbatim, never retried
//! - [`ValidationError`]: missing or invalid form input, caught before any network call

use crate::gateway::GatewayError;
use std::fmt;
use std::path::PathBuf;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Camera device errors
    Camera(CaptureErrorReason),
    /// Photo capture errors
    Photo(PhotoError),
    /// Remote gateway errors
    Gateway(GatewayError),
    /// Form validation errors
    Validation(ValidationError),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

/// Classified reason a camera could not be opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureErrorReason {
    /// The user or system refused access to the device
    PermissionDenied,
    /// No capture device exists
    DeviceNotFound,
    /// The device exists but cannot stream in any supported way
    DeviceUnsupported,
    /// Another process holds the device
    DeviceBusy,
    /// Anything else
    Unknown,
}

impl CaptureErrorReason {
    /// Text shown to the operator for this reason
    pub fn user_message(&self) -> &'static str {
        match self {
            CaptureErrorReason::PermissionDenied => {
                "Camera access denied. Please allow camera permissions and try again."
            }
            CaptureErrorReason::DeviceNotFound => "No camera found on this device.",
            CaptureErrorReason::DeviceUnsupported => {
                "Camera not supported. Please use a supported capture device or a modern driver."
            }
            CaptureErrorReason::DeviceBusy => "Camera is already in use by another application.",
            CaptureErrorReason::Unknown => {
                "Unable to access camera. Please check permissions and try again."
            }
        }
    }

    /// Short machine-friendly name, used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureErrorReason::PermissionDenied => "permission-denied",
            CaptureErrorReason::DeviceNotFound => "device-not-found",
            CaptureErrorReason::DeviceUnsupported => "device-unsupported",
            CaptureErrorReason::DeviceBusy => "device-busy",
            CaptureErrorReason::Unknown => "unknown",
        }
    }
}

/// Photo capture errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoError {
    /// No decodable frame available for capture
    NoFrameAvailable,
    /// Frame could not be converted to RGB
    ConversionFailed(String),
    /// Encoding failed
    EncodingFailed(String),
    /// Save failed
    SaveFailed(String),
}

/// Form validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is empty
    MissingField(&'static str),
    /// A picked file is not an image type the bucket accepts
    UnsupportedImageType(PathBuf),
    /// A picked file exceeds the bucket size limit
    ImageTooLarge { path: PathBuf, bytes: u64 },
    /// A picked file could not be read
    Unreadable { path: PathBuf, reason: String },
    /// A photo index does not exist
    NoSuchPhoto(usize),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Camera(e) => write!(f, "{}", e),
            AppError::Photo(e) => write!(f, "Photo error: {}", e),
            AppError::Gateway(e) => write!(f, "{}", e),
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for CaptureErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.user_message())
    }
}

impl fmt::Display for PhotoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhotoError::NoFrameAvailable => {
                write!(f, "Camera not ready. Please wait a moment and try again.")
            }
            PhotoError::ConversionFailed(msg) => write!(f, "Frame conversion failed: {}", msg),
            PhotoError::EncodingFailed(msg) => write!(f, "Encoding failed: {}", msg),
            PhotoError::SaveFailed(msg) => write!(f, "Save failed: {}", msg),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingField(field) => write!(f, "{} is required", field),
            ValidationError::UnsupportedImageType(path) => write!(
                f,
                "{} is not a JPEG, PNG or WebP image",
                path.display()
            ),
            ValidationError::ImageTooLarge { path, bytes } => write!(
                f,
                "{} is too large ({:.1} MB, limit 10 MB)",
                path.display(),
                *bytes as f64 / (1024.0 * 1024.0)
            ),
            ValidationError::Unreadable { path, reason } => {
                write!(f, "Could not read {}: {}", path.display(), reason)
            }
            ValidationError::NoSuchPhoto(index) => write!(f, "No photo at position {}", index + 1),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for CaptureErrorReason {}
impl std::error::Error for PhotoError {}
impl std::error::Error for ValidationError {}

// Conversions from sub-errors to AppError
impl From<CaptureErrorReason> for AppError {
    fn from(err: CaptureErrorReason) -> Self {
        AppError::Camera(err)
    }
}

impl From<PhotoError> for AppError {
    fn from(err: PhotoError) -> Self {
        AppError::Photo(err)
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        AppError::Gateway(err)
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

// Conversions for I/O errors
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<std::io::Error> for PhotoError {
    fn from(err: std::io::Error) -> Self {
        PhotoError::SaveFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_reason_has_text() {
        for reason in [
            CaptureErrorReason::PermissionDenied,
            CaptureErrorReason::DeviceNotFound,
            CaptureErrorReason::DeviceUnsupported,
            CaptureErrorReason::DeviceBusy,
            CaptureErrorReason::Unknown,
        ] {
            assert!(!reason.user_message().is_empty());
            assert!(!reason.as_str().is_empty());
        }
    }

    #[test]
    fn test_permission_text_asks_for_permission() {
        let text = CaptureErrorReason::PermissionDenied.to_string();
        assert!(text.contains("allow camera permissions and try again"));
    }

    #[test]
    fn test_validation_display() {
        assert_eq!(
            ValidationError::MissingField("Serial number").to_string(),
            "Serial number is required"
        );
    }
}
