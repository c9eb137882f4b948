// SPDX-License-Identifier: GPL-3.0-only

//! Session lifecycle state and start result

use crate::backends::camera::{Resolution, SensorRotation, TorchState};
use serde::Serialize;

/// Lifecycle state of a [`ScannerSession`](super::ScannerSession)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Stopped,
    /// Acquiring the camera; only observable from inside `start`
    Starting,
    Running,
    /// Camera unbound, analyzer and preview target retained
    Paused,
}

impl SessionState {
    /// True while a session exists (running or paused)
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Running | SessionState::Paused)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Stopped => "stopped",
            SessionState::Starting => "starting",
            SessionState::Running => "running",
            SessionState::Paused => "paused",
        };
        write!(f, "{}", name)
    }
}

/// Reported once the camera is bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StartResult {
    /// Preview width in display orientation
    pub width: u32,
    /// Preview height in display orientation
    pub height: u32,
    pub torch_state: TorchState,
    pub render_target_id: u64,
    pub camera_count: usize,
}

impl StartResult {
    /// Preview size in display orientation
    pub fn preview_size(resolution: Resolution, rotation: SensorRotation) -> (u32, u32) {
        if rotation.swaps_dimensions() {
            (resolution.height, resolution.width)
        } else {
            (resolution.width, resolution.height)
        }
    }
}
