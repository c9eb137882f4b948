// SPDX-License-Identifier: GPL-3.0-only
//! Pixel format conversion utilities
//!
//! CPU conversions used by the frame analyzer: colour inversion of the decode
//! input and conversion of an analysis frame to RGBA for image export.

use super::types::{CameraFrame, PixelFormat};

/// Convert one YUV sample to RGB using BT.601 coefficients
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;

    let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;
    [r, g, b]
}

/// Convert a frame to tightly packed RGBA
///
/// Returns `None` if the buffer is too small for the declared layout.
pub fn frame_to_rgba(frame: &CameraFrame) -> Option<Vec<u8>> {
    if !frame.is_valid() {
        return None;
    }

    let width = frame.width as usize;
    let height = frame.height as usize;
    let stride = frame.stride as usize;
    let data: &[u8] = &frame.data;
    let mut rgba = Vec::with_capacity(width * height * 4);

    match frame.format {
        PixelFormat::RGBA => {
            for row in 0..height {
                let start = row * stride;
                rgba.extend_from_slice(&data[start..start + width * 4]);
            }
        }
        PixelFormat::BGRA => {
            for row in 0..height {
                let start = row * stride;
                for px in data[start..start + width * 4].chunks_exact(4) {
                    rgba.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
                }
            }
        }
        PixelFormat::RGB24 => {
            for row in 0..height {
                let start = row * stride;
                for px in data[start..start + width * 3].chunks_exact(3) {
                    rgba.extend_from_slice(&[px[0], px[1], px[2], 255]);
                }
            }
        }
        PixelFormat::Gray8 => {
            for row in 0..height {
                let start = row * stride;
                for &l in &data[start..start + width] {
                    rgba.extend_from_slice(&[l, l, l, 255]);
                }
            }
        }
        PixelFormat::NV12 | PixelFormat::NV21 | PixelFormat::I420 => {
            let chroma_w = width.div_ceil(2);
            let chroma_h = height.div_ceil(2);
            let chroma_start = stride * height;

            for row in 0..height {
                for col in 0..width {
                    let y = data[row * stride + col];
                    let (cx, cy) = (col / 2, row / 2);
                    let (u, v) = match frame.format {
                        PixelFormat::NV12 => {
                            let idx = chroma_start + cy * chroma_w * 2 + cx * 2;
                            (data[idx], data[idx + 1])
                        }
                        PixelFormat::NV21 => {
                            let idx = chroma_start + cy * chroma_w * 2 + cx * 2;
                            (data[idx + 1], data[idx])
                        }
                        _ => {
                            let u_idx = chroma_start + cy * chroma_w + cx;
                            let v_idx = chroma_start + chroma_w * chroma_h + cy * chroma_w + cx;
                            (data[u_idx], data[v_idx])
                        }
                    };
                    let [r, g, b] = yuv_to_rgb(y, u, v);
                    rgba.extend_from_slice(&[r, g, b, 255]);
                }
            }
        }
    }

    Some(rgba)
}

/// Invert the colours of a frame buffer
///
/// Alpha is kept; every colour channel becomes `255 - c`. For the YUV formats
/// luma and chroma are both inverted, which inverts the decoded RGB image
/// (within rounding). Layout and stride are unchanged.
pub fn invert_colors(data: &[u8], format: PixelFormat) -> Vec<u8> {
    match format {
        PixelFormat::RGBA | PixelFormat::BGRA => {
            let mut out = data.to_vec();
            for px in out.chunks_exact_mut(4) {
                px[0] = 255 - px[0];
                px[1] = 255 - px[1];
                px[2] = 255 - px[2];
            }
            out
        }
        PixelFormat::RGB24
        | PixelFormat::Gray8
        | PixelFormat::NV12
        | PixelFormat::NV21
        | PixelFormat::I420 => data.iter().map(|&c| 255 - c).collect(),
    }
}
