// SPDX-License-Identifier: MPL-2.0

//! Storage utilities: picked image files and local directories

use crate::constants::storage::MAX_OBJECT_BYTES;
use crate::errors::ValidationError;
use image::ImageFormat;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Image types the photo bucket accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Webp,
}

impl ImageKind {
    /// Identify an image from its content, ignoring the file name
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match image::guess_format(bytes).ok()? {
            ImageFormat::Jpeg => Some(ImageKind::Jpeg),
            ImageFormat::Png => Some(ImageKind::Png),
            ImageFormat::WebP => Some(ImageKind::Webp),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
            ImageKind::Webp => "image/webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
            ImageKind::Webp => "webp",
        }
    }
}

/// An image file read from disk and checked against the bucket rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickedImage {
    pub data: Vec<u8>,
    pub kind: ImageKind,
    pub path: PathBuf,
}

/// Read an image file, rejecting oversize files and unsupported types
pub async fn read_image_file(path: PathBuf) -> Result<PickedImage, ValidationError> {
    let read_path = path.clone();
    tokio::task::spawn_blocking(move || read_image_file_blocking(&read_path))
        .await
        .map_err(|e| ValidationError::Unreadable {
            path,
            reason: e.to_string(),
        })?
}

fn read_image_file_blocking(path: &Path) -> Result<PickedImage, ValidationError> {
    let unreadable = |e: std::io::Error| ValidationError::Unreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let size = std::fs::metadata(path).map_err(unreadable)?.len();
    if size > MAX_OBJECT_BYTES {
        return Err(ValidationError::ImageTooLarge {
            path: path.to_path_buf(),
            bytes: size,
        });
    }

    let data = std::fs::read(path).map_err(unreadable)?;
    let kind = ImageKind::sniff(&data)
        .ok_or_else(|| ValidationError::UnsupportedImageType(path.to_path_buf()))?;

    debug!(path = %path.display(), size, kind = ?kind, "Read picked image");

    Ok(PickedImage {
        data,
        kind,
        path: path.to_path_buf(),
    })
}

/// Where `photo` saves stills by default
pub fn default_photo_dir() -> PathBuf {
    dirs::picture_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("qa-camera")
}

/// Log file used while the terminal UI owns the screen
pub fn log_file_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("qa-camera")
        .join("qa-camera.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_ignores_extension() {
        let png = {
            let mut buf = Vec::new();
            image::RgbImage::new(1, 1)
                .write_to(&mut std::io::Cursor::new(&mut buf), ImageFormat::Png)
                .unwrap();
            buf
        };
        assert_eq!(ImageKind::sniff(&png), Some(ImageKind::Png));
        assert_eq!(ImageKind::sniff(b"GIF89a....."), None);
        assert_eq!(ImageKind::sniff(b"plain text"), None);
    }

    #[tokio::test]
    async fn test_rejects_oversize_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.jpg");
        let file = std::fs::File::create(&path).unwrap();
        file.set_len(MAX_OBJECT_BYTES + 1).unwrap();

        let err = read_image_file(path).await.unwrap_err();
        assert!(matches!(err, ValidationError::ImageTooLarge { .. }));
    }

    #[tokio::test]
    async fn test_rejects_non_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.jpg");
        std::fs::write(&path, b"not really a jpeg").unwrap();

        let err = read_image_file(path).await.unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedImageType(_)));
    }

    #[tokio::test]
    async fn test_missing_file_unreadable() {
        let err = read_image_file(PathBuf::from("/nonexistent/a.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationError::Unreadable { .. }));
    }
}
