// SPDX-License-Identifier: GPL-3.0-only

//! Torch and zoom controls
//!
//! Controls act on the bound camera only. Resulting state changes reach the
//! caller through the session's event channel.

use super::ScannerSession;
use crate::backends::camera::BoundCamera;
use crate::constants::zoom;
use crate::errors::{ScannerError, ScannerResult};
use std::sync::Arc;
use tracing::debug;

impl ScannerSession {
    fn bound_camera(&self) -> Option<Arc<dyn BoundCamera>> {
        self.lock()
            .active
            .as_ref()
            .and_then(|a| a.camera.as_ref())
            .map(Arc::clone)
    }

    /// Switch the torch between off and on
    ///
    /// Does nothing when no camera is bound or the camera has no flash unit.
    pub fn toggle_torch(&self) -> ScannerResult<()> {
        let Some(camera) = self.bound_camera() else {
            debug!("Torch toggle ignored, no camera bound");
            return Ok(());
        };
        if !camera.has_flash_unit() {
            debug!("Torch toggle ignored, no flash unit");
            return Ok(());
        }
        camera.enable_torch(!camera.torch_enabled())?;
        Ok(())
    }

    /// Set the camera zoom ratio
    pub fn set_zoom_ratio(&self, ratio: f32) -> ScannerResult<()> {
        let camera = self.bound_camera().ok_or(ScannerError::ZoomWhenStopped)?;
        camera.set_zoom_ratio(ratio)?;
        Ok(())
    }

    /// Set zoom on a linear 0.0..=1.0 scale
    pub fn set_linear_zoom(&self, scale: f32) -> ScannerResult<()> {
        if !(zoom::LINEAR_MIN..=zoom::LINEAR_MAX).contains(&scale) {
            return Err(ScannerError::ZoomNotInRange);
        }
        let camera = self.bound_camera().ok_or(ScannerError::ZoomWhenStopped)?;
        camera.set_linear_zoom(scale)?;
        Ok(())
    }

    /// Restore the default zoom ratio
    pub fn reset_zoom(&self) -> ScannerResult<()> {
        self.set_zoom_ratio(zoom::DEFAULT_RATIO)
    }
}
