// SPDX-License-Identifier: MPL-2.0

//! Camera backend abstraction
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │ Capture Controller  │  ← state machine, readiness, stills
//! └──────────┬──────────┘
//!            │ open(StreamRequest) on the blocking pool
//!            ▼
//! ┌─────────────────────┐
//! │  CameraBackend Trait│  ← Common interface
//! └──────────┬──────────┘
//!            │
//!      ┌─────┴──────┐
//!      ▼            ▼
//!  ┌──────┐   ┌─────────┐
//!  │ V4L2 │   │ Virtual │
//!  └──────┘   └─────────┘
//! ```
//!
//! A backend hands back an [`OpenedStream`]: an owned stop handle, a
//! latest-frame receiver and a one-shot first-frame signal. Nothing else of
//! the device leaves the backend.

pub mod format_converters;
pub mod frame_loop;
pub mod types;
pub mod v4l2;
pub mod v4l2_utils;

pub use types::*;

use crate::backends::virtual_camera::{VirtualCameraBackend, VirtualSource};
use std::path::PathBuf;
use std::sync::Arc;

/// Camera backend trait
pub trait CameraBackend: Send + Sync {
    // ===== Enumeration =====

    /// Enumerate available cameras on this backend
    fn enumerate_cameras(&self) -> Vec<CameraDevice>;

    // ===== Lifecycle =====

    /// Open a stream for the request
    ///
    /// Blocks while the device is opened and configured; call it from a
    /// blocking context. Failures carry enough detail for
    /// [`BackendError::reason`] to classify them.
    fn open(&self, request: &StreamRequest) -> BackendResult<OpenedStream>;

    // ===== Metadata =====

    /// Get the backend type identifier
    fn backend_type(&self) -> CameraBackendType;

    /// Check if this backend can possibly open a camera here
    fn is_available(&self) -> bool;
}

/// Build the backend for this run
///
/// `virtual_image` switches to the virtual camera; `Some` with an empty path
/// selects the test pattern.
pub fn get_backend(virtual_image: Option<PathBuf>) -> Arc<dyn CameraBackend> {
    match virtual_image {
        Some(path) if path.as_os_str().is_empty() => Arc::new(VirtualCameraBackend::pattern()),
        Some(path) => Arc::new(VirtualCameraBackend::new(VirtualSource::Image(path))),
        None => Arc::new(v4l2::V4l2Backend::new()),
    }
}

/// Get the default backend type
pub fn get_default_backend() -> CameraBackendType {
    CameraBackendType::V4l2
}
