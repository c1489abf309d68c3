// SPDX-License-Identifier: MPL-2.0

//! Processing pipelines
//!
//! - [`photo`]: frame conversion and JPEG encoding for captured stills

pub mod photo;
