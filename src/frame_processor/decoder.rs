// SPDX-License-Identifier: GPL-3.0-only

//! Barcode decoder abstraction
//!
//! The analyzer treats decoding as a black box that may be slow and completes
//! asynchronously, possibly on another thread.

use super::types::{Barcode, BarcodeFormat};
use crate::backends::camera::format_converters::invert_colors;
use crate::backends::camera::{CameraFrame, FrameData, PixelFormat, SensorRotation};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

/// Image handed to a decoder
///
/// Shares pixel storage with the frame it came from unless it is an inverted
/// copy. It carries no release obligation; the frame stays with the analyzer.
#[derive(Debug, Clone)]
pub struct DecodeInput {
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub format: PixelFormat,
    pub data: FrameData,
    /// Rotation needed to turn the image upright
    pub rotation: SensorRotation,
    pub inverted: bool,
}

impl DecodeInput {
    pub fn from_frame(frame: &CameraFrame) -> Self {
        Self {
            width: frame.width,
            height: frame.height,
            stride: frame.stride,
            format: frame.format,
            data: frame.data.clone(),
            rotation: frame.rotation,
            inverted: false,
        }
    }

    /// Colour-inverted copy of the frame
    pub fn inverted_from_frame(frame: &CameraFrame) -> Self {
        Self {
            data: invert_colors(&frame.data, frame.format).into(),
            inverted: true,
            ..Self::from_frame(frame)
        }
    }

    /// Tightly packed 8-bit luminance plane
    ///
    /// Returns `None` if the buffer is shorter than the declared layout.
    pub fn to_luma(&self) -> Option<Vec<u8>> {
        let width = self.width as usize;
        let height = self.height as usize;
        let stride = self.stride as usize;
        if self.data.len() < self.format.required_len(self.width, self.height, self.stride) {
            return None;
        }

        let data: &[u8] = &self.data;
        let mut luma = Vec::with_capacity(width * height);
        for row in 0..height {
            let line = &data[row * stride..];
            match self.format {
                PixelFormat::Gray8 | PixelFormat::NV12 | PixelFormat::NV21 | PixelFormat::I420 => {
                    luma.extend_from_slice(&line[..width]);
                }
                PixelFormat::RGBA | PixelFormat::BGRA | PixelFormat::RGB24 => {
                    let bpp = self.format.plane_bytes_per_pixel() as usize;
                    let (r_idx, b_idx) = if self.format == PixelFormat::BGRA {
                        (2, 0)
                    } else {
                        (0, 2)
                    };
                    luma.extend(line[..width * bpp].chunks_exact(bpp).map(|px| {
                        let r = px[r_idx] as u32;
                        let g = px[1] as u32;
                        let b = px[b_idx] as u32;
                        ((299 * r + 587 * g + 114 * b) / 1000) as u8
                    }));
                }
            }
        }
        Some(luma)
    }
}

/// Per-frame decode failure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    /// The decoder was closed before or during the call
    #[error("decoder is closed")]
    Closed,
    #[error("image buffer does not match its dimensions")]
    InvalidImage,
    #[error("decode failed: {0}")]
    Failed(String),
}

/// Decoder construction options chosen at session start
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderOptions {
    /// Formats to look for; empty means all formats the decoder supports
    pub formats: Vec<BarcodeFormat>,
}

impl DecoderOptions {
    pub fn accepts(&self, format: BarcodeFormat) -> bool {
        self.formats.is_empty() || self.formats.contains(&format)
    }
}

/// Barcode decoding capability
pub trait BarcodeDecoder: Send + Sync {
    /// Decode all barcodes in `input`
    ///
    /// Corners and bounding boxes are reported in the upright image, that is
    /// after applying `input.rotation`. The returned future may complete on
    /// any thread.
    fn decode(&self, input: DecodeInput) -> BoxFuture<'static, Result<Vec<Barcode>, DecodeError>>;

    /// Release decoder resources; later calls to `decode` fail with
    /// [`DecodeError::Closed`]
    fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luma_from_rgba_and_bgra() {
        let rgba = CameraFrame::new(2, 1, PixelFormat::RGBA, vec![255, 0, 0, 255, 0, 0, 255, 255]);
        assert_eq!(DecodeInput::from_frame(&rgba).to_luma(), Some(vec![76, 29]));

        let bgra = CameraFrame::new(2, 1, PixelFormat::BGRA, vec![0, 0, 255, 255, 255, 0, 0, 255]);
        assert_eq!(DecodeInput::from_frame(&bgra).to_luma(), Some(vec![76, 29]));
    }

    #[test]
    fn test_luma_from_nv21_uses_y_plane() {
        let frame = CameraFrame::new(2, 2, PixelFormat::NV21, vec![1, 2, 3, 4, 128, 128]);
        assert_eq!(DecodeInput::from_frame(&frame).to_luma(), Some(vec![1, 2, 3, 4]));
    }

    #[test]
    fn test_inverted_input_does_not_touch_frame() {
        let frame = CameraFrame::new(2, 1, PixelFormat::Gray8, vec![0, 200]);
        let input = DecodeInput::inverted_from_frame(&frame);
        assert!(input.inverted);
        assert_eq!(input.to_luma(), Some(vec![255, 55]));
        assert_eq!(&*frame.data, &[0, 200]);
    }

    #[test]
    fn test_options_accept_all_when_empty() {
        let all = DecoderOptions::default();
        assert!(all.accepts(BarcodeFormat::Ean13));

        let qr_only = DecoderOptions {
            formats: vec![BarcodeFormat::QrCode],
        };
        assert!(qr_only.accepts(BarcodeFormat::QrCode));
        assert!(!qr_only.accepts(BarcodeFormat::Ean13));
    }
}
