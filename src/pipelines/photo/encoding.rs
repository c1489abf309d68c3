// SPDX-License-Identifier: GPL-3.0-only

//! JPEG encoding and saving of captured stills

use super::CapturedImage;
use crate::errors::PhotoError;
use image::RgbImage;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Photo encoder
#[derive(Debug, Clone, Copy)]
pub struct PhotoEncoder {
    quality: u8,
}

impl PhotoEncoder {
    /// Encoder at the given JPEG quality (clamped to 1-100)
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Encode an RGB image as JPEG at its native dimensions
    pub fn encode_jpeg(&self, image: &RgbImage) -> Result<Vec<u8>, PhotoError> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);

        let mut encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, self.quality);

        encoder
            .encode(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| PhotoError::EncodingFailed(format!("JPEG encoding failed: {}", e)))?;

        debug!(size = buffer.len(), quality = self.quality, "JPEG encoded");
        Ok(buffer)
    }

    /// Save a captured image into `output_dir` under a timestamped name
    pub async fn save(
        &self,
        captured: &CapturedImage,
        output_dir: &Path,
    ) -> Result<PathBuf, PhotoError> {
        let timestamp = captured.captured_at.format("%Y%m%d_%H%M%S_%3f");
        let filepath = output_dir.join(format!("IMG_{}.{}", timestamp, captured.extension()));

        info!(path = %filepath.display(), "Saving photo");

        let data = captured.data.clone();
        let target = filepath.clone();
        tokio::task::spawn_blocking(move || std::fs::write(&target, &data))
            .await
            .map_err(|e| PhotoError::SaveFailed(format!("Save task error: {}", e)))??;

        Ok(filepath)
    }
}

impl Default for PhotoEncoder {
    fn default() -> Self {
        Self::new(crate::constants::capture::JPEG_QUALITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_clamped() {
        assert_eq!(PhotoEncoder::new(0).quality(), 1);
        assert_eq!(PhotoEncoder::new(200).quality(), 100);
        assert_eq!(PhotoEncoder::default().quality(), 90);
    }

    #[test]
    fn test_encode_produces_jpeg() {
        let image = RgbImage::from_pixel(16, 8, image::Rgb([200, 100, 50]));
        let jpeg = PhotoEncoder::default().encode_jpeg(&image).unwrap();

        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
    }

    #[tokio::test]
    async fn test_save_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let captured = CapturedImage {
            data: vec![0xFF, 0xD8, 0xFF, 0xD9],
            width: 1,
            height: 1,
            captured_at: chrono::Utc::now(),
        };

        let path = PhotoEncoder::default()
            .save(&captured, dir.path())
            .await
            .unwrap();

        assert!(path.extension().is_some_and(|e| e == "jpg"));
        assert_eq!(std::fs::read(path).unwrap(), captured.data);
    }
}
