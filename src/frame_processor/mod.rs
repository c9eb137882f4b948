// SPDX-License-Identifier: GPL-3.0-only

//! Frame processing for barcode scanning
//!
//! Camera frames flow through a [`LatestFrameSlot`] into a [`FrameAnalyzer`]
//! running as a single tokio task. The analyzer gates each frame through the
//! detection mode's rate rules, hands it to a [`BarcodeDecoder`], suppresses
//! duplicates, applies the scan window and reports a [`ScanEvent`].

pub mod analyzer;
pub mod decoder;
pub mod duplicates;
pub mod export;
pub mod rate;
pub mod scan_window;
pub mod slot;
pub mod stats;
pub mod tasks;
pub mod types;

pub use analyzer::{FrameAnalyzer, FrameOutcome};
pub use decoder::{BarcodeDecoder, DecodeError, DecodeInput, DecoderOptions};
pub use duplicates::DuplicateSuppressor;
pub use rate::RateGovernor;
pub use scan_window::{PixelRect, ScanWindow, is_in_window};
pub use slot::LatestFrameSlot;
pub use stats::{AnalyzerCounters, AnalyzerStats};
pub use tasks::QrDecoder;
pub use types::{
    Barcode, BarcodeFormat, BoundingBox, Detection, DetectionMode, EventReceiver, EventSender,
    Point, ScanEvent,
};
