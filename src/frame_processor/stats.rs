// SPDX-License-Identifier: GPL-3.0-only

//! Frame pipeline counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by the frame slot and the analyzer
#[derive(Debug, Default)]
pub struct AnalyzerCounters {
    received: AtomicU64,
    backlog_dropped: AtomicU64,
    invalid: AtomicU64,
    throttled: AtomicU64,
    busy_dropped: AtomicU64,
    decoded: AtomicU64,
    duplicates: AtomicU64,
    filtered: AtomicU64,
    emitted: AtomicU64,
    errors: AtomicU64,
}

/// Which counter to bump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    /// Frame pushed by the camera
    Received,
    /// Pending frame replaced by a newer one before analysis
    BacklogDropped,
    /// Empty or malformed buffer
    Invalid,
    /// Skipped by the rate governor
    Throttled,
    /// Skipped because a decode was still in flight
    BusyDropped,
    /// Decode completed successfully
    Decoded,
    /// Suppressed as a repeat
    Duplicate,
    /// Decoded but nothing inside the scan window
    Filtered,
    /// Detection sent to the caller
    Emitted,
    /// Decode or export error sent to the caller
    Error,
}

impl AnalyzerCounters {
    pub fn bump(&self, counter: Counter) {
        let slot = match counter {
            Counter::Received => &self.received,
            Counter::BacklogDropped => &self.backlog_dropped,
            Counter::Invalid => &self.invalid,
            Counter::Throttled => &self.throttled,
            Counter::BusyDropped => &self.busy_dropped,
            Counter::Decoded => &self.decoded,
            Counter::Duplicate => &self.duplicates,
            Counter::Filtered => &self.filtered,
            Counter::Emitted => &self.emitted,
            Counter::Error => &self.errors,
        };
        slot.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> AnalyzerStats {
        AnalyzerStats {
            received: self.received.load(Ordering::Relaxed),
            backlog_dropped: self.backlog_dropped.load(Ordering::Relaxed),
            invalid: self.invalid.load(Ordering::Relaxed),
            throttled: self.throttled.load(Ordering::Relaxed),
            busy_dropped: self.busy_dropped.load(Ordering::Relaxed),
            decoded: self.decoded.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
            emitted: self.emitted.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the pipeline counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnalyzerStats {
    pub received: u64,
    pub backlog_dropped: u64,
    pub invalid: u64,
    pub throttled: u64,
    pub busy_dropped: u64,
    pub decoded: u64,
    pub duplicates: u64,
    pub filtered: u64,
    pub emitted: u64,
    pub errors: u64,
}
