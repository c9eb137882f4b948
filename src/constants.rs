// SPDX-License-Identifier: GPL-3.0-only

//! Crate-wide constants

use std::time::Duration;

/// Default minimum interval between decodes in `Normal` detection mode
pub const DEFAULT_DETECTION_TIMEOUT_MS: u64 = 250;

/// Frames larger than this in either dimension are downscaled before QR search
pub const QR_MAX_DIMENSION: u32 = 1280;

/// Zoom limits
pub mod zoom {
    /// Zoom ratio restored by `reset_zoom`
    pub const DEFAULT_RATIO: f32 = 1.0;

    /// Linear zoom bounds
    pub const LINEAR_MIN: f32 = 0.0;
    pub const LINEAR_MAX: f32 = 1.0;
}

/// Virtual camera defaults
pub mod virtual_camera {
    use super::Duration;

    /// Frame interval when replaying images (~30 fps)
    pub const FRAME_INTERVAL: Duration = Duration::from_millis(33);

    /// Zoom ratio range reported by the virtual camera
    pub const MIN_ZOOM_RATIO: f32 = 1.0;
    pub const MAX_ZOOM_RATIO: f32 = 8.0;

    /// Resolution used when no frames are queued
    pub const DEFAULT_WIDTH: u32 = 640;
    pub const DEFAULT_HEIGHT: u32 = 480;
}

/// File formats accepted by the `scan` command
pub mod file_formats {
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];
}

/// Timing constants
pub mod timing {
    /// How long the `scan` command waits for events after the last frame
    pub const SCAN_SETTLE_TIME: std::time::Duration = std::time::Duration::from_millis(500);

    /// Frame loop stop polling slice
    pub const LOOP_STOP_POLL: std::time::Duration = std::time::Duration::from_millis(5);
}
