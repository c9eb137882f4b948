// SPDX-License-Identifier: GPL-3.0-only

//! Per-frame analysis
//!
//! [`FrameAnalyzer::analyze`] takes ownership of one camera frame and produces
//! at most one event for it: a detection, an error, or nothing. The frame is
//! released on every path by being dropped, either at the end of `analyze` or,
//! when an image is exported, at the end of the export job.

use super::decoder::{BarcodeDecoder, DecodeInput};
use super::duplicates::DuplicateSuppressor;
use super::export::export_frame;
use super::rate::RateGovernor;
use super::scan_window::is_in_window;
use super::slot::LatestFrameSlot;
use super::stats::{AnalyzerCounters, Counter};
use super::types::{Detection, DetectionMode, EventSender, ScanEvent};
use crate::backends::camera::CameraFrame;
use crate::config::SessionConfig;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, trace, warn};

/// What happened to an analysed frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Session no longer live; frame dropped without a callback
    Stale,
    /// Empty or malformed buffer
    Invalid,
    /// Inside the `Normal` mode cooldown
    Throttled,
    /// Another decode was still in flight
    Busy,
    /// Decode failed; an error event was sent
    Failed,
    /// Same payloads as the last reported frame
    Duplicate,
    /// Nothing left after scan window filtering
    Filtered,
    /// Detection event sent
    Detected,
    /// Detection will be sent once the image export finishes
    Exporting,
}

/// Clears the in-flight flag when the decode finishes or the future is dropped
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Frame analyzer for one scanning session
pub struct FrameAnalyzer {
    config: Arc<SessionConfig>,
    decoder: Mutex<Option<Arc<dyn BarcodeDecoder>>>,
    duplicates: DuplicateSuppressor,
    governor: RateGovernor,
    invert_current: AtomicBool,
    in_flight: AtomicBool,
    live: AtomicBool,
    /// Held while sending so `deactivate` cannot interleave with an emit
    emit_lock: Mutex<()>,
    events: EventSender,
    counters: Arc<AnalyzerCounters>,
}

impl FrameAnalyzer {
    pub fn new(
        config: Arc<SessionConfig>,
        decoder: Arc<dyn BarcodeDecoder>,
        events: EventSender,
        counters: Arc<AnalyzerCounters>,
    ) -> Self {
        let governor = RateGovernor::new(config.detection_timeout());
        Self {
            config,
            decoder: Mutex::new(Some(decoder)),
            duplicates: DuplicateSuppressor::new(),
            governor,
            invert_current: AtomicBool::new(false),
            in_flight: AtomicBool::new(false),
            live: AtomicBool::new(true),
            emit_lock: Mutex::new(()),
            events,
            counters,
        }
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Stop reporting; decodes completing afterwards are discarded
    ///
    /// Once this returns no further event is sent.
    pub fn deactivate(&self) {
        let _sending = self
            .emit_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.live.store(false, Ordering::Release);
    }

    /// Detach the decoder so the owner can close it
    pub fn take_decoder(&self) -> Option<Arc<dyn BarcodeDecoder>> {
        self.decoder
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    pub fn reset_duplicates(&self) {
        self.duplicates.reset();
    }

    pub fn last_scanned(&self) -> Vec<String> {
        self.duplicates.last_scanned()
    }

    /// Drain `slot` until it is closed, analysing one frame at a time
    pub async fn run(self: Arc<Self>, slot: Arc<LatestFrameSlot>) {
        debug!("Analysis task started");
        while let Some(frame) = slot.next().await {
            let sequence = frame.sequence;
            let outcome = self.analyze(frame).await;
            trace!(sequence, ?outcome, "Frame analysed");
        }
        debug!("Analysis task exiting");
    }

    /// Analyse one frame
    pub async fn analyze(self: &Arc<Self>, frame: CameraFrame) -> FrameOutcome {
        if !self.is_live() {
            return FrameOutcome::Stale;
        }
        if !frame.is_valid() {
            trace!(sequence = frame.sequence, "Dropping invalid frame");
            self.counters.bump(Counter::Invalid);
            return FrameOutcome::Invalid;
        }

        // Flips on every frame so inverted and plain frames alternate.
        let invert =
            self.config.invert_image && !self.invert_current.fetch_xor(true, Ordering::AcqRel);

        if self.in_flight.swap(true, Ordering::AcqRel) {
            self.counters.bump(Counter::BusyDropped);
            return FrameOutcome::Busy;
        }
        let in_flight = InFlightGuard(&self.in_flight);

        if self.config.detection_mode == DetectionMode::Normal
            && !self.governor.try_acquire(Instant::now())
        {
            self.counters.bump(Counter::Throttled);
            return FrameOutcome::Throttled;
        }

        let Some(decoder) = self
            .decoder
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
        else {
            return FrameOutcome::Stale;
        };

        let input = if invert {
            DecodeInput::inverted_from_frame(&frame)
        } else {
            DecodeInput::from_frame(&frame)
        };
        let result = decoder.decode(input).await;
        drop(in_flight);

        if !self.is_live() {
            debug!(sequence = frame.sequence, "Decode finished after session stopped");
            return FrameOutcome::Stale;
        }

        let barcodes = match result {
            Ok(barcodes) => barcodes,
            Err(e) => {
                debug!(sequence = frame.sequence, error = %e, "Decode failed");
                self.counters.bump(Counter::Error);
                self.emit(ScanEvent::Error(e.to_string()));
                return FrameOutcome::Failed;
            }
        };
        self.counters.bump(Counter::Decoded);

        if self.config.detection_mode == DetectionMode::NoDuplicates
            && self.duplicates.is_duplicate(&barcodes)
        {
            self.counters.bump(Counter::Duplicate);
            return FrameOutcome::Duplicate;
        }

        let window = self.config.scan_window.as_ref();
        let barcodes: Vec<_> = barcodes
            .into_iter()
            .filter(|b| is_in_window(window, b, frame.width, frame.height))
            .collect();
        if barcodes.is_empty() {
            self.counters.bump(Counter::Filtered);
            return FrameOutcome::Filtered;
        }

        if !self.config.return_image {
            debug!(sequence = frame.sequence, count = barcodes.len(), "Barcodes detected");
            let sent = self.emit(ScanEvent::Detected(Detection {
                barcodes,
                image: None,
                width: frame.width,
                height: frame.height,
            }));
            if !sent {
                return FrameOutcome::Stale;
            }
            self.counters.bump(Counter::Emitted);
            return FrameOutcome::Detected;
        }

        let analyzer = Arc::clone(self);
        tokio::task::spawn_blocking(move || {
            let exported = export_frame(&frame);
            frame.release();

            if !analyzer.is_live() {
                return;
            }
            match exported {
                Ok(image) => {
                    let sent = analyzer.emit(ScanEvent::Detected(Detection {
                        barcodes,
                        image: Some(image.data),
                        width: image.width,
                        height: image.height,
                    }));
                    if sent {
                        analyzer.counters.bump(Counter::Emitted);
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to export detected frame");
                    analyzer.counters.bump(Counter::Error);
                    analyzer.emit(ScanEvent::Error(e.to_string()));
                }
            }
        });
        FrameOutcome::Exporting
    }

    /// Send `event` unless the analyzer has been deactivated
    fn emit(&self, event: ScanEvent) -> bool {
        let _sending = self
            .emit_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !self.is_live() {
            trace!("Analyzer deactivated, discarding event");
            return false;
        }
        if self.events.send(event).is_err() {
            debug!("Event receiver dropped, discarding event");
        }
        true
    }
}

impl std::fmt::Debug for FrameAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameAnalyzer")
            .field("mode", &self.config.detection_mode)
            .field("live", &self.is_live())
            .finish()
    }
}
