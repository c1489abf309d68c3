// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which way a camera faces relative to the operator
///
/// Product photos are taken with the camera pointed away from the operator,
/// so the rear-facing camera is preferred whenever one can be identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraFacing {
    /// Rear / world-facing camera (preferred)
    #[default]
    Back,
    /// Front / user-facing camera
    Front,
    /// Camera with no known orientation (typical USB webcam)
    External,
}

impl CameraFacing {
    /// Get all facing variants for UI iteration
    pub const ALL: [CameraFacing; 3] = [
        CameraFacing::Back,
        CameraFacing::Front,
        CameraFacing::External,
    ];

    /// Get display name for the facing
    pub fn display_name(&self) -> &'static str {
        match self {
            CameraFacing::Back => "Rear",
            CameraFacing::Front => "Front",
            CameraFacing::External => "External",
        }
    }

    /// Guess the facing of a device from its card name
    ///
    /// V4L2 carries no orientation property, so this relies on the naming
    /// conventions used by laptop and phone sensor drivers.
    pub fn from_device_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if ["rear", "back", "world", "environment"]
            .iter()
            .any(|k| lower.contains(k))
        {
            CameraFacing::Back
        } else if ["front", "user", "integrated", "facetime", "selfie"]
            .iter()
            .any(|k| lower.contains(k))
        {
            CameraFacing::Front
        } else {
            CameraFacing::External
        }
    }
}

/// Capture controller constants
pub mod capture {
    use super::Duration;

    /// Ideal capture width requested from the device (advisory)
    pub const IDEAL_WIDTH: u32 = 1920;

    /// Ideal capture height requested from the device (advisory)
    pub const IDEAL_HEIGHT: u32 = 1080;

    /// JPEG quality for captured stills (0.9 on a 0-1 scale)
    pub const JPEG_QUALITY: u8 = 90;

    /// How long to wait for a first decodable frame before assuming readiness
    pub const READY_TIMEOUT: Duration = Duration::from_millis(3000);

    /// Settle time after readiness before a command-line capture
    pub const CLI_WARMUP: Duration = Duration::from_millis(500);

    /// Number of mmap buffers requested from V4L2 drivers
    pub const V4L2_BUFFER_COUNT: u32 = 4;

    /// Longest a V4L2 dequeue may block before counting as an error
    pub const DEQUEUE_TIMEOUT: Duration = Duration::from_millis(1000);

    /// Longest `close` waits for a stream thread before detaching it
    pub const STREAM_STOP_TIMEOUT: Duration = Duration::from_millis(250);

    /// Pixel formats requested from V4L2 devices, in order of preference
    pub const PREFERRED_FOURCCS: &[&[u8; 4]] = &[b"MJPG", b"YUYV", b"UYVY", b"RGB3", b"GREY"];
}

/// Object storage constants
pub mod storage {
    /// Default bucket holding product photos
    pub const DEFAULT_BUCKET: &str = "product-photos";

    /// Largest object the bucket accepts (10 MB)
    pub const MAX_OBJECT_BYTES: u64 = 10 * 1024 * 1024;

    /// MIME types the bucket accepts
    pub const ALLOWED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];
}

/// Gateway HTTP constants
pub mod gateway {
    use super::Duration;

    /// Per-request timeout for gateway calls
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// PostgREST path prefix
    pub const REST_PATH: &str = "rest/v1";

    /// Object storage path prefix
    pub const STORAGE_PATH: &str = "storage/v1";
}

/// Shell constants
pub mod shell {
    /// Number of recently created products remembered on the home view
    pub const RECENT_PRODUCTS: usize = 5;
}

/// Virtual camera timing constants
pub mod virtual_camera {
    use super::Duration;

    /// Frame rate for image streaming (~30fps)
    pub const IMAGE_STREAM_FRAME_DURATION: Duration = Duration::from_millis(33);

    /// Default test pattern size
    pub const PATTERN_WIDTH: u32 = 1280;
    pub const PATTERN_HEIGHT: u32 = 720;
}

/// Terminal UI timing
pub mod terminal {
    use super::Duration;

    /// Input poll interval; also bounds the preview refresh rate
    pub const POLL_INTERVAL: Duration = Duration::from_millis(16);
}

/// Supported file formats for image sources
pub mod file_formats {
    /// Supported image file extensions
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

    /// Check if a file extension is a supported image format
    pub fn is_image_extension(ext: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    }
}

/// Application information utilities
pub mod app_info {
    /// Get the application version from build-time environment
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facing_from_device_name() {
        assert_eq!(
            CameraFacing::from_device_name("ov8856 rear camera"),
            CameraFacing::Back
        );
        assert_eq!(
            CameraFacing::from_device_name("Integrated Camera: Integrated C"),
            CameraFacing::Front
        );
        assert_eq!(
            CameraFacing::from_device_name("HD Pro Webcam C920"),
            CameraFacing::External
        );
    }

    #[test]
    fn test_image_extensions() {
        assert!(file_formats::is_image_extension("JPG"));
        assert!(file_formats::is_image_extension("webp"));
        assert!(!file_formats::is_image_extension("gif"));
    }
}
