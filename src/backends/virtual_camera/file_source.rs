// SPDX-License-Identifier: GPL-3.0-only

//! Frame sources for the virtual camera
//!
//! A still image file, or generated colour bars when no file is given.

use crate::backends::camera::types::{BackendError, BackendResult, CameraFrame, PixelFormat};
use crate::constants::file_formats;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Load an image file as an RGBA frame
pub fn load_image_as_frame(path: &Path) -> BackendResult<CameraFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    if !file_formats::is_image_extension(extension) {
        return Err(BackendError::FormatNotSupported(format!(
            "unsupported image file: {}",
            path.display()
        )));
    }

    if !path.exists() {
        return Err(BackendError::DeviceNotFound(format!(
            "image not found: {}",
            path.display()
        )));
    }

    let img = image::open(path).map_err(|e| {
        BackendError::Other(format!("Failed to load image '{}': {}", path.display(), e))
    })?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    info!(path = %path.display(), width, height, "Loaded virtual camera image");

    Ok(CameraFrame {
        data: Arc::from(rgba.into_raw().into_boxed_slice()),
        width,
        height,
        stride: width * 4,
        format: PixelFormat::RGBA,
        captured_at: Instant::now(),
    })
}

/// Eight vertical colour bars
const BARS: [[u8; 3]; 8] = [
    [235, 235, 235],
    [235, 235, 16],
    [16, 235, 235],
    [16, 235, 16],
    [235, 16, 235],
    [235, 16, 16],
    [16, 16, 235],
    [16, 16, 16],
];

/// Generate an RGB24 colour-bar frame
pub fn test_pattern_frame(width: u32, height: u32) -> CameraFrame {
    let w = width as usize;
    let mut row = Vec::with_capacity(w * 3);
    for x in 0..w {
        let bar = (x * BARS.len()) / w.max(1);
        row.extend_from_slice(&BARS[bar.min(BARS.len() - 1)]);
    }

    let mut data = Vec::with_capacity(row.len() * height as usize);
    for _ in 0..height {
        data.extend_from_slice(&row);
    }

    CameraFrame {
        data: Arc::from(data.into_boxed_slice()),
        width,
        height,
        stride: width * 3,
        format: PixelFormat::RGB24,
        captured_at: Instant::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_dimensions() {
        let frame = test_pattern_frame(16, 4);
        assert_eq!(frame.data.len(), 16 * 4 * 3);
        assert!(frame.is_decodable());
        // First bar is white, last is black
        assert_eq!(&frame.data[0..3], &BARS[0]);
        assert_eq!(&frame.data[15 * 3..16 * 3], &BARS[7]);
    }

    #[test]
    fn test_missing_image_is_not_found() {
        let err = load_image_as_frame(Path::new("/nonexistent/product.png")).unwrap_err();
        assert!(matches!(err, BackendError::DeviceNotFound(_)));
    }

    #[test]
    fn test_loads_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chair.png");
        image::RgbImage::from_pixel(5, 3, image::Rgb([1, 2, 3]))
            .save(&path)
            .unwrap();

        let frame = load_image_as_frame(&path).unwrap();
        assert_eq!((frame.width, frame.height), (5, 3));
        assert_eq!(frame.format, PixelFormat::RGBA);
        assert_eq!(&frame.data[0..4], &[1, 2, 3, 255]);
    }
}
