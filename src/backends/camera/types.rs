// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Pixel storage shared between a frame and the decode input derived from it
///
/// Cloning only bumps a reference count, so the analyzer can hand the pixels to
/// an async decoder without copying them while the frame itself stays owned by
/// the analysis path.
#[derive(Clone)]
pub struct FrameData(Arc<[u8]>);

impl FrameData {
    /// Length of the frame data in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the frame data is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for FrameData {
    fn from(data: Vec<u8>) -> Self {
        FrameData(Arc::from(data))
    }
}

impl From<Arc<[u8]>> for FrameData {
    fn from(data: Arc<[u8]>) -> Self {
        FrameData(data)
    }
}

impl std::fmt::Debug for FrameData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FrameData({} bytes)", self.0.len())
    }
}

impl AsRef<[u8]> for FrameData {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::ops::Deref for FrameData {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

/// Sensor rotation in degrees (clockwise)
///
/// Camera sensors are usually mounted rotated relative to the device's natural
/// orientation. Frames are delivered in sensor orientation; the rotation tells
/// consumers how to turn them upright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SensorRotation {
    /// No rotation (sensor is oriented correctly)
    #[default]
    None,
    /// 90 degrees clockwise
    Rotate90,
    /// 180 degrees (upside down)
    Rotate180,
    /// 270 degrees clockwise (90 degrees counter-clockwise)
    Rotate270,
}

impl SensorRotation {
    /// Get the rotation in degrees
    pub fn degrees(&self) -> u32 {
        match self {
            SensorRotation::None => 0,
            SensorRotation::Rotate90 => 90,
            SensorRotation::Rotate180 => 180,
            SensorRotation::Rotate270 => 270,
        }
    }

    /// Check if rotation swaps width and height
    pub fn swaps_dimensions(&self) -> bool {
        self.degrees() % 180 != 0
    }

    /// Map a point of a `width` x `height` sensor image into the upright image
    pub fn to_upright(&self, x: f32, y: f32, width: u32, height: u32) -> (f32, f32) {
        let (w, h) = (width as f32, height as f32);
        match self {
            SensorRotation::None => (x, y),
            SensorRotation::Rotate90 => (h - y, x),
            SensorRotation::Rotate180 => (w - x, h - y),
            SensorRotation::Rotate270 => (y, w - x),
        }
    }
}

impl std::fmt::Display for SensorRotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Pixel format for camera frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// RGBA - 32-bit with alpha (4 bytes per pixel)
    RGBA,
    /// BGRA - 32-bit with alpha (B G R A byte order)
    BGRA,
    /// RGB24 - 24-bit RGB (3 bytes per pixel, no alpha)
    RGB24,
    /// Gray8 - 8-bit grayscale (single channel)
    Gray8,
    /// NV12 - Semi-planar 4:2:0 (Y plane + interleaved UV plane)
    NV12,
    /// NV21 - Semi-planar 4:2:0 (Y plane + interleaved VU plane)
    /// The usual output of mobile camera analysis streams
    NV21,
    /// I420 - Planar 4:2:0 (separate Y, U, V planes)
    I420,
}

impl PixelFormat {
    /// Check if this format is a YUV format (luma plane first)
    pub fn is_yuv(&self) -> bool {
        matches!(self, Self::NV12 | Self::NV21 | Self::I420)
    }

    /// Bytes per pixel of the first (or only) plane
    pub fn plane_bytes_per_pixel(&self) -> u32 {
        match self {
            Self::RGBA | Self::BGRA => 4,
            Self::RGB24 => 3,
            Self::Gray8 | Self::NV12 | Self::NV21 | Self::I420 => 1,
        }
    }

    /// Minimum buffer length for a frame of this format
    ///
    /// `stride` is the row stride of the first plane. Chroma planes of the
    /// 4:2:0 formats are assumed tightly packed behind the luma plane.
    pub fn required_len(&self, width: u32, height: u32, stride: u32) -> usize {
        let first_plane = stride as usize * height as usize;
        if self.is_yuv() {
            let chroma_w = width.div_ceil(2) as usize;
            let chroma_h = height.div_ceil(2) as usize;
            first_plane + chroma_w * chroma_h * 2
        } else {
            first_plane
        }
    }
}

/// Which way the requested camera faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraFacing {
    Front,
    #[default]
    Back,
}

impl std::fmt::Display for CameraFacing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraFacing::Front => write!(f, "front"),
            CameraFacing::Back => write!(f, "back"),
        }
    }
}

/// Output resolution in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Torch state as reported to callers
///
/// The raw values (-1, 0, 1) are what host bindings expect on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorchState {
    /// The bound camera has no flash unit
    Unavailable,
    Off,
    On,
}

impl TorchState {
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled { TorchState::On } else { TorchState::Off }
    }

    pub fn as_raw(&self) -> i32 {
        match self {
            TorchState::Unavailable => -1,
            TorchState::Off => 0,
            TorchState::On => 1,
        }
    }
}

/// Handle of a preview surface created by the backend for the host UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTarget {
    pub id: u64,
}

/// Opaque id of an observer or listener registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationId(pub u64);

/// Parameters for binding a camera to a preview target and an analysis sink
#[derive(Debug, Clone)]
pub struct BindRequest {
    pub facing: CameraFacing,
    pub target_resolution: Option<Resolution>,
    pub render_target: RenderTarget,
}

/// State change pushed by a bound camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraStateChange {
    /// Torch switched on or off
    Torch(bool),
    /// Zoom changed; `linear` is normalised to 0.0..=1.0
    Zoom { ratio: f32, linear: f32 },
}

/// Callback invoked by the backend for camera state changes
pub type CameraStateObserver = Box<dyn Fn(CameraStateChange) + Send + Sync>;

type ReleaseHook = Box<dyn FnOnce() + Send>;

/// A single frame from the camera
///
/// A frame has exactly one owner. Its release hook (returning the buffer to the
/// producer) runs when the frame is dropped, so every path that consumes a frame
/// releases it exactly once.
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    pub data: FrameData,
    pub format: PixelFormat,
    /// Row stride of the first plane in bytes
    pub stride: u32,
    /// Sensor rotation the frame was captured with
    pub rotation: SensorRotation,
    pub sequence: u64,
    release: Option<ReleaseHook>,
}

impl CameraFrame {
    /// Create a frame with a tightly packed first plane
    pub fn new(width: u32, height: u32, format: PixelFormat, data: impl Into<FrameData>) -> Self {
        Self {
            width,
            height,
            data: data.into(),
            format,
            stride: width * format.plane_bytes_per_pixel(),
            rotation: SensorRotation::None,
            sequence: 0,
            release: None,
        }
    }

    pub fn with_rotation(mut self, rotation: SensorRotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_stride(mut self, stride: u32) -> Self {
        self.stride = stride;
        self
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    /// Attach the hook that returns the buffer to its producer
    pub fn with_release<F>(mut self, release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.release = Some(Box::new(release));
        self
    }

    /// True when the buffer is present and large enough for the declared layout
    pub fn is_valid(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.stride >= self.width * self.format.plane_bytes_per_pixel()
            && self.data.len() >= self.format.required_len(self.width, self.height, self.stride)
    }

    /// Release the frame now
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for CameraFrame {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for CameraFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("stride", &self.stride)
            .field("rotation", &self.rotation)
            .field("sequence", &self.sequence)
            .field("data", &self.data)
            .finish()
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    /// Backend (camera provider) could not be reached
    #[error("Backend not available: {0}")]
    NotAvailable(String),
    /// No camera matched the request
    #[error("Device not found: {0}")]
    DeviceNotFound(String),
    /// Use cases could not be bound to the camera
    #[error("Bind failed: {0}")]
    BindFailed(String),
    /// Operation not supported by the bound camera
    #[error("Not supported: {0}")]
    Unsupported(String),
    /// General I/O error
    #[error("I/O error: {0}")]
    IoError(String),
    #[error("Error: {0}")]
    Other(String),
}
