// SPDX-License-Identifier: GPL-3.0-only

//! Scan window geometry
//!
//! A scan window restricts reported barcodes to a region of the image. It is
//! given in normalized coordinates and mapped onto pixels of the analysed
//! image, whose width and height arrive in sensor orientation and are swapped
//! by the caller before mapping.

use super::types::{Barcode, BoundingBox};
use serde::{Deserialize, Serialize};

/// Normalized rectangle, each edge in 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanWindow {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

/// Integer pixel rectangle, right and bottom exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl PixelRect {
    pub fn is_empty(&self) -> bool {
        self.left >= self.right || self.top >= self.bottom
    }

    /// True if this non-empty rectangle fully contains `bounds`
    pub fn contains(&self, bounds: &BoundingBox) -> bool {
        !self.is_empty()
            && self.left as f32 <= bounds.left
            && self.top as f32 <= bounds.top
            && self.right as f32 >= bounds.right
            && self.bottom as f32 >= bounds.bottom
    }
}

/// Round to the nearest pixel; `None` for NaN and infinities
fn to_pixel(fraction: f32, extent: u32) -> Option<i32> {
    let value = fraction * extent as f32;
    value.is_finite().then(|| value.round() as i32)
}

impl ScanWindow {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Map onto an image of `width` x `height` pixels
    ///
    /// Returns `None` when any coordinate is not finite.
    pub fn to_pixel_rect(&self, width: u32, height: u32) -> Option<PixelRect> {
        Some(PixelRect {
            left: to_pixel(self.left, width)?,
            top: to_pixel(self.top, height)?,
            right: to_pixel(self.right, width)?,
            bottom: to_pixel(self.bottom, height)?,
        })
    }

    /// True if `bounds` lies fully inside the window mapped onto the image
    ///
    /// Non-finite window coordinates never contain anything.
    pub fn contains(&self, bounds: &BoundingBox, width: u32, height: u32) -> bool {
        self.to_pixel_rect(width, height)
            .is_some_and(|rect| rect.contains(bounds))
    }
}

/// True if `barcode` should be reported for a frame of the given sensor-oriented
/// dimensions
///
/// Without a window every barcode passes. With a window, a barcode without a
/// bounding box never passes.
pub fn is_in_window(
    window: Option<&ScanWindow>,
    barcode: &Barcode,
    frame_width: u32,
    frame_height: u32,
) -> bool {
    let Some(window) = window else {
        return true;
    };
    let Some(bounds) = barcode.bounding_box.as_ref() else {
        return false;
    };
    // Frames arrive in sensor orientation; the window is relative to the
    // upright image.
    window.contains(bounds, frame_height, frame_width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_processor::types::BarcodeFormat;

    fn barcode_at(bounds: BoundingBox) -> Barcode {
        Barcode::new(BarcodeFormat::QrCode, "code", bounds)
    }

    #[test]
    fn test_window_maps_to_pixels() {
        let window = ScanWindow::new(0.25, 0.25, 0.75, 0.75);
        let rect = window.to_pixel_rect(1000, 2000).unwrap();
        assert_eq!(
            rect,
            PixelRect {
                left: 250,
                top: 500,
                right: 750,
                bottom: 1500
            }
        );
    }

    #[test]
    fn test_inside_box_is_contained() {
        let window = ScanWindow::new(0.25, 0.25, 0.75, 0.75);
        let inside = BoundingBox::new(300.0, 600.0, 700.0, 1400.0);
        let edge = BoundingBox::new(250.0, 500.0, 750.0, 1500.0);
        let partial = BoundingBox::new(200.0, 600.0, 700.0, 1400.0);

        assert!(window.contains(&inside, 1000, 2000));
        assert!(window.contains(&edge, 1000, 2000));
        assert!(!window.contains(&partial, 1000, 2000));
    }

    #[test]
    fn test_nan_coordinates_never_contain() {
        let bounds = BoundingBox::new(1.0, 1.0, 2.0, 2.0);
        let coords = [0.0, 0.0, 1.0, 1.0];
        for i in 0..4 {
            let mut c = coords;
            c[i] = f32::NAN;
            let window = ScanWindow::new(c[0], c[1], c[2], c[3]);
            assert!(!window.contains(&bounds, 100, 100));
        }
        let infinite = ScanWindow::new(0.0, 0.0, f32::INFINITY, 1.0);
        assert!(!infinite.contains(&bounds, 100, 100));
    }

    #[test]
    fn test_empty_window_contains_nothing() {
        let window = ScanWindow::new(0.5, 0.5, 0.5, 0.5);
        let point = BoundingBox::new(50.0, 50.0, 50.0, 50.0);
        assert!(!window.contains(&point, 100, 100));
    }

    #[test]
    fn test_frame_dimensions_are_swapped() {
        // Sensor-oriented 2000x1000 frame is a 1000x2000 upright image
        let window = ScanWindow::new(0.25, 0.25, 0.75, 0.75);
        let inside = barcode_at(BoundingBox::new(300.0, 600.0, 700.0, 1400.0));
        assert!(is_in_window(Some(&window), &inside, 2000, 1000));
        assert!(!is_in_window(Some(&window), &inside, 1000, 2000));
    }

    #[test]
    fn test_missing_window_or_bounds() {
        let mut barcode = barcode_at(BoundingBox::new(0.0, 0.0, 10.0, 10.0));
        assert!(is_in_window(None, &barcode, 100, 100));

        barcode.bounding_box = None;
        let window = ScanWindow::new(0.0, 0.0, 1.0, 1.0);
        assert!(is_in_window(None, &barcode, 100, 100));
        assert!(!is_in_window(Some(&window), &barcode, 100, 100));
    }
}
