// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Per-key exponential backoff for failed reconciliations

use crate::constants::backoff::{INITIAL_SECS, MAX_SECS};
use crate::types::ReconcileRequest;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::warn;

/// Tracks consecutive failures per Runtime. Delays double from the initial
/// value up to the cap and reset after a successful pass.
#[derive(Debug, Default)]
pub struct ErrorBackoff {
    failures: Mutex<HashMap<ReconcileRequest, u32>>,
}

impl ErrorBackoff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure and return the delay before the next attempt
    pub fn next_delay(&self, request: &ReconcileRequest) -> Duration {
        let failures = match self.failures.lock() {
            Ok(mut failures) => {
                let count = failures.entry(request.clone()).or_insert(0);
                *count = count.saturating_add(1);
                *count
            }
            Err(e) => {
                warn!("Failed to lock backoff state: {}, using initial delay", e);
                1
            }
        };

        let secs = INITIAL_SECS
            .saturating_mul(1u64 << failures.saturating_sub(1).min(16))
            .min(MAX_SECS);
        Duration::from_secs(secs)
    }

    pub fn reset(&self, request: &ReconcileRequest) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.remove(request);
        }
    }

    /// Drop the failure counts of keys that no longer exist
    pub fn retain(&self, exists: impl Fn(&ReconcileRequest) -> bool) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.retain(|request, _| exists(request));
        }
    }

    pub fn tracked(&self) -> usize {
        self.failures.lock().map(|f| f.len()).unwrap_or_default()
    }
}
