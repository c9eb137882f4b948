// SPDX-License-Identifier: GPL-3.0-only

//! Single-frame handoff between the camera and the analysis task
//!
//! Backpressure policy is "keep only latest": the slot holds at most one
//! pending frame, and a newer frame replaces (and thereby releases) the one
//! still waiting.

use super::stats::{AnalyzerCounters, Counter};
use crate::backends::camera::CameraFrame;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tracing::trace;

pub struct LatestFrameSlot {
    pending: Mutex<Option<CameraFrame>>,
    closed: AtomicBool,
    notify: Notify,
    counters: Arc<AnalyzerCounters>,
}

impl LatestFrameSlot {
    pub fn new(counters: Arc<AnalyzerCounters>) -> Self {
        Self {
            pending: Mutex::new(None),
            closed: AtomicBool::new(false),
            notify: Notify::new(),
            counters,
        }
    }

    /// Offer a frame from the camera
    ///
    /// Returns false (and releases the frame) once the slot is closed.
    pub fn push(&self, frame: CameraFrame) -> bool {
        let mut pending = self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Checked under the lock so `close` cannot strand a frame here
        if self.is_closed() {
            drop(pending);
            trace!(sequence = frame.sequence, "Slot closed, releasing frame");
            return false;
        }
        self.counters.bump(Counter::Received);

        let replaced = pending.replace(frame);
        drop(pending);
        if let Some(stale) = replaced {
            trace!(sequence = stale.sequence, "Dropping backlogged frame");
            self.counters.bump(Counter::BacklogDropped);
        }

        self.notify.notify_one();
        true
    }

    /// Take the pending frame without waiting
    pub fn try_take(&self) -> Option<CameraFrame> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    /// Wait for the next frame; `None` once the slot is closed
    pub async fn next(&self) -> Option<CameraFrame> {
        loop {
            if self.is_closed() {
                return None;
            }
            if let Some(frame) = self.try_take() {
                return Some(frame);
            }
            self.notify.notified().await;
        }
    }

    /// Stop accepting frames and release any pending one
    pub fn close(&self) {
        let pending = {
            let mut pending = self
                .pending
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            self.closed.store(true, Ordering::SeqCst);
            pending.take()
        };
        drop(pending);
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for LatestFrameSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LatestFrameSlot")
            .field("closed", &self.is_closed())
            .finish()
    }
}
