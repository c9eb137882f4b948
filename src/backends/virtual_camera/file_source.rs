// SPDX-License-Identifier: GPL-3.0-only

//! Image file source for the virtual camera

use super::SourceFrame;
use crate::backends::camera::types::{BackendError, BackendResult, PixelFormat};
use crate::constants::file_formats;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Check whether `path` has a supported image extension
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .is_some_and(|e| file_formats::IMAGE_EXTENSIONS.contains(&e.as_str()))
}

/// Load an image file as an RGBA source frame
pub fn load_image_as_frame(path: &Path) -> BackendResult<SourceFrame> {
    info!(path = %path.display(), "Loading image file");

    let img = image::open(path).map_err(|e| {
        BackendError::IoError(format!("Failed to load image '{}': {}", path.display(), e))
    })?;

    let rgba = img.to_rgba8();
    let width = rgba.width();
    let height = rgba.height();

    debug!(width, height, "Image loaded successfully");

    Ok(SourceFrame::new(width, height, PixelFormat::RGBA, rgba.into_raw()))
}

/// Expand directories one level deep and keep image files, in path order
pub fn collect_image_paths(inputs: &[PathBuf]) -> BackendResult<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let entries = std::fs::read_dir(input)
                .map_err(|e| BackendError::IoError(format!("{}: {}", input.display(), e)))?;
            let mut found: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_image_path(p))
                .collect();
            found.sort();
            paths.extend(found);
        } else if is_image_path(input) {
            paths.push(input.clone());
        } else {
            warn!(path = %input.display(), "Skipping file with unsupported extension");
        }
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_extension_check() {
        assert!(is_image_path(Path::new("code.PNG")));
        assert!(is_image_path(Path::new("dir/code.jpeg")));
        assert!(!is_image_path(Path::new("clip.mp4")));
        assert!(!is_image_path(Path::new("README")));
    }

    #[test]
    fn test_load_image_round_trips_dimensions() {
        let dir = std::env::temp_dir().join(format!("scanner-file-source-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("frame.png");
        image::RgbaImage::from_pixel(5, 3, image::Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();

        let frame = load_image_as_frame(&path).unwrap();
        assert_eq!((frame.width, frame.height), (5, 3));
        assert_eq!(frame.format, PixelFormat::RGBA);
        assert_eq!(&frame.data[..4], &[10, 20, 30, 255]);

        let collected = collect_image_paths(&[dir.clone()]).unwrap();
        assert_eq!(collected, vec![path]);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load_image_as_frame(Path::new("/nonexistent/scanner/frame.png"));
        assert!(matches!(result, Err(BackendError::IoError(_))));
    }
}
