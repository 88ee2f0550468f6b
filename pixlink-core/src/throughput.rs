//! Throughput meter for the read pump.
//!
//! Counts bytes observed in the current window; a periodic publish
//! tick takes the count as "bytes per second" and resets it. No
//! smoothing — instantaneous per-window totals, the way the device
//! frontend reports them.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

// ── ByteCounter ──────────────────────────────────────────────────

/// Cloneable recording handle held by the read pump.
#[derive(Debug, Clone)]
pub struct ByteCounter {
    window: Arc<AtomicU64>,
    total: Arc<AtomicU64>,
}

impl ByteCounter {
    /// Record `n` bytes against the current window.
    pub fn record(&self, n: u64) {
        self.window.fetch_add(n, Ordering::Relaxed);
        self.total.fetch_add(n, Ordering::Relaxed);
    }
}

// ── ThroughputMeter ──────────────────────────────────────────────

/// Owner side of the byte counter, held by the link actor.
#[derive(Debug)]
pub struct ThroughputMeter {
    window: Arc<AtomicU64>,
    total: Arc<AtomicU64>,
}

impl ThroughputMeter {
    pub fn new() -> Self {
        Self {
            window: Arc::new(AtomicU64::new(0)),
            total: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A recording handle for the pump task.
    pub fn counter(&self) -> ByteCounter {
        ByteCounter {
            window: Arc::clone(&self.window),
            total: Arc::clone(&self.total),
        }
    }

    /// Take and reset the current window count.
    pub fn take_window(&self) -> u64 {
        self.window.swap(0, Ordering::Relaxed)
    }

    /// Bytes recorded in the window so far, without resetting.
    pub fn window_bytes(&self) -> u64 {
        self.window.load(Ordering::Relaxed)
    }

    /// Lifetime byte total across all sessions.
    pub fn total_bytes(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Clear the window counter (session start/teardown).
    pub fn reset(&self) {
        self.window.store(0, Ordering::Relaxed);
    }
}

impl Default for ThroughputMeter {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────────
