// SPDX-License-Identifier: GPL-3.0-only

//! Frame export for detections that return an image
//!
//! Converts an analysis frame to an upright PNG. This is CPU-heavy and runs on
//! the blocking pool, never on the analysis task.

use crate::backends::camera::format_converters::frame_to_rgba;
use crate::backends::camera::{CameraFrame, SensorRotation};
use image::{ImageFormat, RgbaImage, imageops};
use std::io::Cursor;
use tracing::debug;

/// Encoded image data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Export failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExportError {
    #[error("frame buffer does not match its dimensions")]
    InvalidFrame,
    #[error("PNG encoding failed: {0}")]
    Encoding(String),
}

/// Rotate an RGBA image clockwise by the sensor rotation
pub fn rotate(image: RgbaImage, rotation: SensorRotation) -> RgbaImage {
    match rotation {
        SensorRotation::None => image,
        SensorRotation::Rotate90 => imageops::rotate90(&image),
        SensorRotation::Rotate180 => imageops::rotate180(&image),
        SensorRotation::Rotate270 => imageops::rotate270(&image),
    }
}

/// Convert `frame` to RGBA, rotate it upright and encode it as PNG
pub fn export_frame(frame: &CameraFrame) -> Result<EncodedImage, ExportError> {
    let start = std::time::Instant::now();

    let rgba = frame_to_rgba(frame).ok_or(ExportError::InvalidFrame)?;
    let bitmap =
        RgbaImage::from_raw(frame.width, frame.height, rgba).ok_or(ExportError::InvalidFrame)?;
    let upright = rotate(bitmap, frame.rotation);
    let (width, height) = upright.dimensions();

    let mut data = Vec::new();
    upright
        .write_to(&mut Cursor::new(&mut data), ImageFormat::Png)
        .map_err(|e| ExportError::Encoding(e.to_string()))?;

    debug!(
        width,
        height,
        bytes = data.len(),
        elapsed_ms = start.elapsed().as_millis(),
        "Exported frame as PNG"
    );

    Ok(EncodedImage {
        data,
        width,
        height,
    })
}
