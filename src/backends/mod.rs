// SPDX-License-Identifier: MPL-2.0

//! Backend abstraction layer for camera capture
//!
//! # Modules
//!
//! - [`camera`]: backend trait, shared frame types, V4L2 implementation
//! - [`virtual_camera`]: image/pattern camera for hardware-less runs

pub mod camera;
pub mod virtual_camera;
