// SPDX-License-Identifier: MPL-2.0

//! Integration tests for constants module

use qa_camera::constants::{CameraFacing, capture, storage};
use qa_camera::storage::ImageKind;

#[test]
fn test_facing_variants() {
    assert_eq!(CameraFacing::ALL.len(), 3);
    for facing in CameraFacing::ALL {
        assert!(!facing.display_name().is_empty());
    }
}

#[test]
fn test_bucket_accepts_every_image_kind() {
    for kind in [ImageKind::Jpeg, ImageKind::Png, ImageKind::Webp] {
        assert!(
            storage::ALLOWED_MIME_TYPES.contains(&kind.mime_type()),
            "{} must be accepted by the bucket",
            kind.mime_type()
        );
    }
}

#[test]
fn test_capture_defaults() {
    assert_eq!((capture::IDEAL_WIDTH, capture::IDEAL_HEIGHT), (1920, 1080));
    assert_eq!(capture::JPEG_QUALITY, 90);
    assert_eq!(capture::READY_TIMEOUT.as_millis(), 3000);
    assert_eq!(storage::MAX_OBJECT_BYTES, 10 * 1024 * 1024);
}
