// SPDX-License-Identifier: GPL-3.0-only

//! Core types for frame processing results
//!
//! These types represent the output of the frame analyzer and the events a
//! scanning session sends to its caller.

use crate::backends::camera::TorchState;
use serde::{Deserialize, Serialize};

/// How aggressively frames are decoded and results reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMode {
    /// Decode every frame, but only report a result set that differs from the
    /// previously reported one
    #[default]
    NoDuplicates,
    /// Decode at most once per detection timeout
    Normal,
    /// Decode and report every frame
    Unrestricted,
}

/// Barcode symbology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarcodeFormat {
    QrCode,
    Aztec,
    DataMatrix,
    Pdf417,
    Code128,
    Code39,
    Code93,
    Codabar,
    Ean13,
    Ean8,
    Itf,
    UpcA,
    UpcE,
    Unknown,
}

/// A point in image pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Axis-aligned box in image pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl BoundingBox {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Smallest box enclosing all points; `None` for an empty slice
    pub fn enclosing(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let init = Self::new(first.x, first.y, first.x, first.y);
        Some(points[1..].iter().fold(init, |b, p| Self {
            left: b.left.min(p.x),
            top: b.top.min(p.y),
            right: b.right.max(p.x),
            bottom: b.bottom.max(p.y),
        }))
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

/// A decoded barcode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Barcode {
    pub format: BarcodeFormat,
    /// Payload as text, absent when the payload is not valid UTF-8
    pub raw_value: Option<String>,
    #[serde(default)]
    pub raw_bytes: Vec<u8>,
    /// Location in the analysed image, if the decoder reports one
    pub bounding_box: Option<BoundingBox>,
    #[serde(default)]
    pub corners: Vec<Point>,
}

impl Barcode {
    /// Create a text barcode located at `bounding_box`
    pub fn new(
        format: BarcodeFormat,
        raw_value: impl Into<String>,
        bounding_box: BoundingBox,
    ) -> Self {
        let raw_value = raw_value.into();
        Self {
            format,
            raw_bytes: raw_value.as_bytes().to_vec(),
            raw_value: Some(raw_value),
            bounding_box: Some(bounding_box),
            corners: Vec::new(),
        }
    }
}

/// Result set emitted for one analysed frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub barcodes: Vec<Barcode>,
    /// PNG of the upright frame, when image return is enabled
    #[serde(skip)]
    pub image: Option<Vec<u8>>,
    /// Width of `image`, or of the analysed frame when no image is returned
    pub width: u32,
    /// Height of `image`, or of the analysed frame when no image is returned
    pub height: u32,
}

/// Event delivered to the session's caller
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    /// Barcodes were found in a frame
    Detected(Detection),
    /// Decoding or exporting a frame failed; the session keeps running
    Error(String),
    TorchStateChanged(TorchState),
    /// Linear zoom (0.0..=1.0) changed
    ZoomChanged(f32),
}

/// Sending half of the caller's event channel
pub type EventSender = tokio::sync::mpsc::UnboundedSender<ScanEvent>;

/// Receiving half of the caller's event channel
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<ScanEvent>;
