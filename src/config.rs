// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::camera::{CameraFacing, Resolution};
use crate::constants::DEFAULT_DETECTION_TIMEOUT_MS;
use crate::errors::{ScannerError, ScannerResult};
use crate::frame_processor::{DecoderOptions, DetectionMode, ScanWindow};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Settings for one scanning session
///
/// Fixed when the session starts; a running session shares it read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub detection_mode: DetectionMode,
    /// Minimum interval between decodes in `Normal` mode
    pub detection_timeout_ms: u64,
    /// Attach an upright PNG of the frame to each detection
    pub return_image: bool,
    /// Decode a colour-inverted copy of every other frame
    pub invert_image: bool,
    /// Normalised region a barcode must lie within to be reported
    pub scan_window: Option<ScanWindow>,
    pub facing: CameraFacing,
    /// Preferred analysis resolution; also enables display change tracking
    pub target_resolution: Option<Resolution>,
    /// Turn the torch on at start when the camera has a flash unit
    pub torch_enabled: bool,
    pub decoder_options: DecoderOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            detection_mode: DetectionMode::default(),
            detection_timeout_ms: DEFAULT_DETECTION_TIMEOUT_MS,
            return_image: false,
            invert_image: false,
            scan_window: None,
            facing: CameraFacing::default(),
            target_resolution: None,
            torch_enabled: false,
            decoder_options: DecoderOptions::default(),
        }
    }
}

impl SessionConfig {
    pub fn detection_timeout(&self) -> Duration {
        Duration::from_millis(self.detection_timeout_ms)
    }

    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json_str(json: &str) -> ScannerResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file
    pub fn from_json_file(path: &Path) -> ScannerResult<Self> {
        debug!(path = %path.display(), "Loading session config");
        let json = std::fs::read_to_string(path)
            .map_err(|e| ScannerError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    /// Reject settings no camera could honour
    ///
    /// Scan window coordinates are not checked: a malformed window filters
    /// out every barcode instead of failing the session.
    pub fn validate(&self) -> ScannerResult<()> {
        match self.target_resolution {
            Some(res) if res.width == 0 || res.height == 0 => Err(ScannerError::Config(format!(
                "invalid target resolution {}",
                res
            ))),
            _ => Ok(()),
        }
    }
}
