// SPDX-License-Identifier: GPL-3.0-only

//! Decode rate limiting for `Normal` detection mode

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Enforces a minimum interval between decode dispatches
///
/// The cooldown starts when a decode is dispatched, not when it completes.
#[derive(Debug)]
pub struct RateGovernor {
    timeout: Duration,
    cooldown_until: Mutex<Option<Instant>>,
}

impl RateGovernor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            cooldown_until: Mutex::new(None),
        }
    }

    /// Try to dispatch at `now`; starts a new cooldown on success
    pub fn try_acquire(&self, now: Instant) -> bool {
        let mut until = self
            .cooldown_until
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if until.is_some_and(|deadline| now < deadline) {
            return false;
        }
        *until = Some(now + self.timeout);
        true
    }
}
