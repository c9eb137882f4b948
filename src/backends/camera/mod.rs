// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend abstraction
//!
//! The scanning session never talks to camera hardware directly. It drives a
//! [`CameraBackend`] (the camera provider) and the [`BoundCamera`] handle the
//! backend returns once use cases are bound.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │   ScannerSession    │  ← Lifecycle, teardown ordering
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │ CameraBackend Trait │  ← Provider: connect, render targets, bind/unbind
//! └──────────┬──────────┘
//!            │ bind()
//!            ▼
//! ┌─────────────────────┐
//! │  BoundCamera Trait  │  ← Torch, zoom, state observers
//! └──────────┬──────────┘
//!            │ frames
//!            ▼
//! ┌─────────────────────┐
//! │   LatestFrameSlot   │  ← Keep only latest, drop if backlogged
//! └─────────────────────┘
//! ```

pub mod format_converters;
pub mod frame_loop;
pub mod types;

pub use types::*;

use crate::frame_processor::LatestFrameSlot;
use std::sync::Arc;

/// Camera provider
///
/// Implementations must be callable from any thread. Frame delivery happens on
/// a backend-owned thread by pushing into the [`LatestFrameSlot`] passed to
/// [`CameraBackend::bind`].
pub trait CameraBackend: Send + Sync {
    // ===== Provider =====

    /// Acquire the camera provider
    ///
    /// Called at the start of every session. Failure means the camera stack is
    /// unusable, not that a particular camera is missing.
    fn connect(&self) -> BackendResult<()>;

    /// Number of cameras the provider knows about
    fn camera_count(&self) -> usize;

    // ===== Preview surface =====

    /// Create a render target for the preview stream
    fn create_render_target(&self) -> BackendResult<RenderTarget>;

    /// Release a render target; unknown ids are ignored
    fn release_render_target(&self, target: RenderTarget);

    // ===== Use cases =====

    /// Bind camera, preview and analysis to the current lifecycle
    ///
    /// Frames must be pushed into `sink` until the camera is unbound.
    fn bind(&self, request: &BindRequest, sink: Arc<LatestFrameSlot>)
    -> BackendResult<Arc<dyn BoundCamera>>;

    /// Unbind all use cases, releasing the camera hardware
    ///
    /// Must be safe to call when nothing is bound.
    fn unbind_all(&self);

    // ===== Display =====

    /// Register for display configuration changes when a target resolution is
    /// requested; returns `None` if the backend does not track displays
    fn register_display_listener(&self) -> Option<RegistrationId> {
        None
    }

    /// Undo [`CameraBackend::register_display_listener`]
    fn unregister_display_listener(&self, _id: RegistrationId) {}
}

/// A camera with use cases bound
pub trait BoundCamera: Send + Sync {
    /// Resolution of the analysis stream in sensor orientation
    fn resolution(&self) -> Resolution;

    /// Clockwise rotation of the sensor relative to the natural orientation
    fn sensor_rotation(&self) -> SensorRotation;

    fn has_flash_unit(&self) -> bool;

    fn torch_enabled(&self) -> bool;

    fn enable_torch(&self, enabled: bool) -> BackendResult<()>;

    fn set_zoom_ratio(&self, ratio: f32) -> BackendResult<()>;

    /// Set zoom on a normalised 0.0..=1.0 scale
    fn set_linear_zoom(&self, linear: f32) -> BackendResult<()>;

    /// Observe torch and zoom changes until removed
    fn add_state_observer(&self, observer: CameraStateObserver) -> RegistrationId;

    /// Remove an observer; unknown ids are ignored
    fn remove_state_observer(&self, id: RegistrationId);
}
