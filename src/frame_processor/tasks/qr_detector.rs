// SPDX-License-Identifier: GPL-3.0-only

//! QR code decoder
//!
//! Built on the rqrr crate. Frames are reduced to a luminance plane,
//! optionally downscaled, and searched for QR grids on the blocking pool.
//! Reported corners and bounding boxes are in the coordinates of the upright
//! input image, not the downscaled or sensor-oriented one.

use crate::constants::QR_MAX_DIMENSION;
use crate::frame_processor::decoder::{BarcodeDecoder, DecodeError, DecodeInput, DecoderOptions};
use crate::frame_processor::types::{Barcode, BarcodeFormat, BoundingBox, Point};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace, warn};

/// QR code decoder
pub struct QrDecoder {
    options: DecoderOptions,
    /// Frames larger than this in either dimension are downscaled first
    max_dimension: u32,
    closed: Arc<AtomicBool>,
}

impl Default for QrDecoder {
    fn default() -> Self {
        Self::new(DecoderOptions::default())
    }
}

impl QrDecoder {
    pub fn new(options: DecoderOptions) -> Self {
        Self {
            options,
            max_dimension: QR_MAX_DIMENSION,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension.max(1);
        self
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl BarcodeDecoder for QrDecoder {
    fn decode(&self, input: DecodeInput) -> BoxFuture<'static, Result<Vec<Barcode>, DecodeError>> {
        let closed = Arc::clone(&self.closed);
        let wanted = self.options.accepts(BarcodeFormat::QrCode);
        let max_dimension = self.max_dimension;

        Box::pin(async move {
            if closed.load(Ordering::Acquire) {
                return Err(DecodeError::Closed);
            }
            if !wanted {
                return Ok(Vec::new());
            }

            tokio::task::spawn_blocking(move || decode_sync(&input, max_dimension))
                .await
                .unwrap_or_else(|e| {
                    warn!(error = %e, "QR decode task panicked");
                    Err(DecodeError::Failed(e.to_string()))
                })
        })
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!("QR decoder closed");
        }
    }
}

/// Synchronous QR decode (runs in blocking task)
fn decode_sync(input: &DecodeInput, max_dimension: u32) -> Result<Vec<Barcode>, DecodeError> {
    let start = std::time::Instant::now();
    let luma = input.to_luma().ok_or(DecodeError::InvalidImage)?;

    let (width, height) = (input.width, input.height);
    let needs_downscale = width > max_dimension || height > max_dimension;
    let (plane, proc_width, proc_height, scale) = if needs_downscale {
        let scale =
            (width as f32 / max_dimension as f32).max(height as f32 / max_dimension as f32);
        let new_width = ((width as f32 / scale) as u32).max(1);
        let new_height = ((height as f32 / scale) as u32).max(1);
        let downscaled = downscale_luma(&luma, width, height, new_width, new_height);
        (downscaled, new_width, new_height, scale)
    } else {
        (luma, width, height, 1.0)
    };

    trace!(
        proc_width,
        proc_height,
        scale,
        inverted = input.inverted,
        conversion_ms = start.elapsed().as_millis(),
        "Prepared luma plane"
    );

    let stride = proc_width as usize;
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        proc_width as usize,
        proc_height as usize,
        |x, y| plane[y * stride + x],
    );
    let grids = prepared.detect_grids();

    let mut barcodes = Vec::with_capacity(grids.len());
    for grid in grids {
        let content = match grid.decode() {
            Ok((_, content)) => content,
            Err(e) => {
                debug!(error = %e, "Failed to decode QR grid");
                continue;
            }
        };

        let corners: Vec<Point> = grid
            .bounds
            .iter()
            .map(|p| {
                let (x, y) = input.rotation.to_upright(
                    p.x as f32 * scale,
                    p.y as f32 * scale,
                    width,
                    height,
                );
                Point { x, y }
            })
            .collect();

        barcodes.push(Barcode {
            format: BarcodeFormat::QrCode,
            raw_bytes: content.as_bytes().to_vec(),
            raw_value: Some(content),
            bounding_box: BoundingBox::enclosing(&corners),
            corners,
        });
    }

    if !barcodes.is_empty() {
        debug!(
            count = barcodes.len(),
            total_ms = start.elapsed().as_millis(),
            "QR decode found codes"
        );
    }

    Ok(barcodes)
}

/// Downscale a tightly packed luma plane using bilinear interpolation
fn downscale_luma(
    src: &[u8],
    src_width: u32,
    src_height: u32,
    dst_width: u32,
    dst_height: u32,
) -> Vec<u8> {
    let src_width = src_width as usize;
    let src_height = src_height as usize;
    let mut result = Vec::with_capacity((dst_width * dst_height) as usize);

    let x_ratio = src_width as f32 / dst_width as f32;
    let y_ratio = src_height as f32 / dst_height as f32;
    let sample =
        |x: usize, y: usize| -> f32 { src.get(y * src_width + x).copied().unwrap_or(0) as f32 };

    for y in 0..dst_height {
        for x in 0..dst_width {
            let src_x = x as f32 * x_ratio;
            let src_y = y as f32 * y_ratio;

            let x0 = (src_x as usize).min(src_width - 1);
            let y0 = (src_y as usize).min(src_height - 1);
            let x1 = (x0 + 1).min(src_width - 1);
            let y1 = (y0 + 1).min(src_height - 1);

            let x_frac = src_x - x0 as f32;
            let y_frac = src_y - y0 as f32;

            let value = sample(x0, y0) * (1.0 - x_frac) * (1.0 - y_frac)
                + sample(x1, y0) * x_frac * (1.0 - y_frac)
                + sample(x0, y1) * (1.0 - x_frac) * y_frac
                + sample(x1, y1) * x_frac * y_frac;

            result.push(value as u8);
        }
    }

    result
}
