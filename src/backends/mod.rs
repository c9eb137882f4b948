// SPDX-License-Identifier: GPL-3.0-only

//! Backend abstraction layer for camera capture
//!
//! # Modules
//!
//! - [`camera`]: Camera provider traits, frame types and pixel format helpers
//! - [`virtual_camera`]: In-process camera replaying prepared frames

pub mod camera;
pub mod virtual_camera;
