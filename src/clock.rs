//! Clock collaborator for bookkeeping timestamps
//!
//! Timestamps are opaque microsecond counts used only for the
//! `create_time`/`delete_time` audit fields; no ordering across zones is
//! derived from them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of monotonically non-decreasing timestamps.
pub trait Clock: Send + Sync {
    /// Current time in microseconds.
    fn now_micros(&self) -> u64;
}

/// Wall-clock time since the Unix epoch.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_micros(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0)
    }
}

/// Manually advanced clock for deterministic tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    micros: AtomicU64,
}

impl ManualClock {
    pub fn new(start_micros: u64) -> Self {
        ManualClock {
            micros: AtomicU64::new(start_micros),
        }
    }

    /// Advance the clock by `delta` microseconds.
    pub fn advance(&self, delta: u64) {
        self.micros.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_micros(&self) -> u64 {
        self.micros.load(Ordering::SeqCst)
    }
}
