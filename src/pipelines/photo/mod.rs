// SPDX-License-Identifier: MPL-2.0

//! Photo capture pipeline
//!
//! ```text
//! CameraFrame → RGB conversion → JPEG encoding → CapturedImage
//! ```
//!
//! Conversion and encoding are CPU-bound and run on the blocking pool, so
//! the preview keeps updating while a still is produced.

pub mod encoding;

pub use encoding::PhotoEncoder;

use crate::backends::camera::format_converters::frame_to_rgb;
use crate::backends::camera::types::CameraFrame;
use crate::errors::PhotoError;
use chrono::{DateTime, Utc};
use tracing::info;

/// An encoded still, owned by whoever received it
#[derive(Clone, PartialEq, Eq)]
pub struct CapturedImage {
    /// JPEG bytes
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub captured_at: DateTime<Utc>,
}

impl CapturedImage {
    pub fn mime_type(&self) -> &'static str {
        "image/jpeg"
    }

    pub fn extension(&self) -> &'static str {
        "jpg"
    }
}

impl std::fmt::Debug for CapturedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturedImage")
            .field("bytes", &self.data.len())
            .field("width", &self.width)
            .field("height", &self.height)
            .field("captured_at", &self.captured_at)
            .finish()
    }
}

/// Frame-to-JPEG pipeline
#[derive(Debug, Clone, Copy, Default)]
pub struct PhotoPipeline {
    encoder: PhotoEncoder,
}

impl PhotoPipeline {
    pub fn new(encoder: PhotoEncoder) -> Self {
        Self { encoder }
    }

    pub fn encoder(&self) -> &PhotoEncoder {
        &self.encoder
    }

    /// Turn a frame into a JPEG still at the frame's native dimensions
    pub async fn process(&self, frame: CameraFrame) -> Result<CapturedImage, PhotoError> {
        let encoder = self.encoder;

        let captured = tokio::task::spawn_blocking(move || {
            let rgb = frame_to_rgb(&frame)?;
            let data = encoder.encode_jpeg(&rgb)?;
            Ok::<_, PhotoError>(CapturedImage {
                data,
                width: rgb.width(),
                height: rgb.height(),
                captured_at: Utc::now(),
            })
        })
        .await
        .map_err(|e| PhotoError::EncodingFailed(format!("Encoding task error: {}", e)))??;

        info!(
            width = captured.width,
            height = captured.height,
            bytes = captured.data.len(),
            "Still captured"
        );
        Ok(captured)
    }
}
