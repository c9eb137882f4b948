// SPDX-License-Identifier: GPL-3.0-only

//! Error types for scanning sessions

use crate::backends::camera::BackendError;

/// Result type alias using ScannerError
pub type ScannerResult<T> = Result<T, ScannerError>;

/// Session-level error
///
/// Lifecycle and control misuse errors are returned synchronously and leave
/// the session state unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScannerError {
    /// A session is already running or paused
    #[error("Scanner already started")]
    AlreadyStarted,
    #[error("Scanner already paused")]
    AlreadyPaused,
    #[error("Scanner already stopped")]
    AlreadyStopped,
    /// No camera could be bound for the requested facing
    #[error("No camera found or failed to open camera")]
    NoCamera,
    /// Camera backend could not be initialised
    #[error("Camera error: {0}")]
    CameraError(String),
    #[error("Cannot set zoom when the scanner is stopped")]
    ZoomWhenStopped,
    /// Linear zoom outside 0.0..=1.0
    #[error("Zoom not in range, scale must be between 0 and 1")]
    ZoomNotInRange,
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<BackendError> for ScannerError {
    fn from(err: BackendError) -> Self {
        ScannerError::CameraError(err.to_string())
    }
}

impl From<serde_json::Error> for ScannerError {
    fn from(err: serde_json::Error) -> Self {
        ScannerError::Config(err.to_string())
    }
}

impl From<std::io::Error> for ScannerError {
    fn from(err: std::io::Error) -> Self {
        ScannerError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_maps_to_camera_error() {
        let err: ScannerError = BackendError::NotAvailable("no provider".into()).into();
        assert!(matches!(err, ScannerError::CameraError(msg) if msg.contains("no provider")));
    }

    #[test]
    fn test_messages() {
        assert_eq!(ScannerError::AlreadyStopped.to_string(), "Scanner already stopped");
        assert_eq!(
            ScannerError::Config("bad".into()).to_string(),
            "Configuration error: bad"
        );
    }
}
