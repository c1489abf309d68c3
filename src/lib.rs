// SPDX-License-Identifier: MPL-2.0

//! QA Camera - photograph furniture products and catalog them
//!
//! Operators log a product by SKU and serial number, attach photos taken
//! with the camera or picked from disk, and browse what has been logged.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: Camera device abstraction (V4L2 and a virtual camera)
//! - [`capture`]: Capture controller state machine and readiness
//! - [`pipelines`]: Frame conversion and JPEG encoding
//! - [`gateway`]: Remote catalog (rows and photo storage)
//! - [`entry`], [`gallery`], [`shell`]: Screen state
//! - [`terminal`]: Terminal front end
//! - [`config`]: User configuration handling
//! - [`storage`]: Picked image files and local directories

pub mod backends;
pub mod capture;
pub mod config;
pub mod constants;
pub mod entry;
pub mod errors;
pub mod gallery;
pub mod gateway;
pub mod pipelines;
pub mod shell;
pub mod storage;
pub mod terminal;

// Re-export commonly used types
pub use capture::{CaptureController, CaptureEvent, CaptureState};
pub use config::Config;
pub use entry::ProductForm;
pub use errors::{AppError, AppResult};
pub use gateway::{CatalogGateway, SupabaseGateway};
