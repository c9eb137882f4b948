// SPDX-License-Identifier: GPL-3.0-only

//! Duplicate suppression for `NoDuplicates` detection mode

use super::types::Barcode;
use std::sync::Mutex;

/// Remembers the payloads of the last reported frame
#[derive(Debug, Default)]
pub struct DuplicateSuppressor {
    last_scanned: Mutex<Vec<String>>,
}

impl DuplicateSuppressor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `barcodes` repeat the last reported payload set
    ///
    /// Barcodes without a text payload are ignored. A non-empty new set
    /// replaces the remembered one; an empty set never clears it.
    pub fn is_duplicate(&self, barcodes: &[Barcode]) -> bool {
        let mut scanned: Vec<String> = barcodes
            .iter()
            .filter_map(|b| b.raw_value.clone())
            .collect();
        scanned.sort();

        let mut last = self
            .last_scanned
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if *last == scanned {
            return true;
        }
        if !scanned.is_empty() {
            *last = scanned;
        }
        false
    }

    /// Forget the remembered payloads
    pub fn reset(&self) {
        self.last_scanned
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    /// Snapshot of the remembered payloads
    pub fn last_scanned(&self) -> Vec<String> {
        self.last_scanned
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}
