// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! `scan` feeds image files through the virtual camera into a real scanning
//! session, so detections go through the same rate, duplicate and scan window
//! rules as a live camera.

use scanner::backends::virtual_camera::{
    VirtualCameraBackend, VirtualCameraOptions, collect_image_paths, load_image_as_frame,
};
use scanner::constants::timing;
use scanner::frame_processor::{BarcodeDecoder, Detection};
use scanner::{DetectionMode, QrDecoder, ScanEvent, ScannerSession, SessionConfig};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct ScanArgs {
    pub inputs: Vec<PathBuf>,
    pub config: Option<PathBuf>,
    pub mode: Option<DetectionMode>,
    pub invert: bool,
    pub output_dir: Option<PathBuf>,
    pub interval_ms: u64,
    pub stats: bool,
}

/// One detection as printed on stdout
#[derive(Serialize)]
struct DetectionLine<'a> {
    index: usize,
    #[serde(flatten)]
    detection: &'a Detection,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_path: Option<PathBuf>,
}

/// Print the default session config
pub fn print_default_config() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(&SessionConfig::default())?);
    Ok(())
}

/// Replay images through a scanning session
pub fn scan(args: ScanArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match args.config.as_deref() {
        Some(path) => SessionConfig::from_json_file(path)?,
        None => SessionConfig::default(),
    };
    if let Some(mode) = args.mode {
        config.detection_mode = mode;
    }
    config.invert_image |= args.invert;
    config.return_image |= args.output_dir.is_some();

    if let Some(dir) = args.output_dir.as_deref() {
        std::fs::create_dir_all(dir)?;
    }

    let paths = collect_image_paths(&args.inputs)?;
    if paths.is_empty() {
        return Err("No image files found".into());
    }
    let frames = paths
        .iter()
        .map(|p| load_image_as_frame(p))
        .collect::<Result<Vec<_>, _>>()?;
    eprintln!("Scanning {} image(s)", frames.len());

    let backend = Arc::new(VirtualCameraBackend::new(
        VirtualCameraOptions {
            frame_interval: Duration::from_millis(args.interval_ms.max(1)),
            ..Default::default()
        },
        frames,
    ));

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let session = ScannerSession::new(backend.clone(), tokio::runtime::Handle::current(), tx);

        let started = session.start(config, |options| -> Arc<dyn BarcodeDecoder> {
            Arc::new(QrDecoder::new(options.clone()))
        })?;
        debug!(width = started.width, height = started.height, "Replay started");

        let mut index = 0usize;
        loop {
            match tokio::time::timeout(timing::SCAN_SETTLE_TIME, rx.recv()).await {
                Ok(Some(ScanEvent::Detected(detection))) => {
                    let image_path = match (&detection.image, args.output_dir.as_deref()) {
                        (Some(png), Some(dir)) => Some(write_image(dir, index, png)?),
                        _ => None,
                    };
                    let line = DetectionLine {
                        index,
                        detection: &detection,
                        image_path,
                    };
                    println!("{}", serde_json::to_string(&line)?);
                    index += 1;
                }
                Ok(Some(ScanEvent::Error(message))) => warn!(%message, "Frame analysis failed"),
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(_) if backend.replay_finished() => break,
                Err(_) => {}
            }
        }

        let stats = session.stats();
        session.stop()?;

        if args.stats {
            eprintln!("{}", serde_json::to_string_pretty(&stats)?);
        }
        eprintln!("{} detection(s)", index);
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

fn write_image(dir: &Path, index: usize, png: &[u8]) -> Result<PathBuf, std::io::Error> {
    let path = dir.join(format!("detection_{:04}.png", index));
    std::fs::write(&path, png)?;
    Ok(path)
}
