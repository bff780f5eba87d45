//! Atomic counters for resource statistics.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Monotonic event counter.
#[derive(Debug, Default)]
pub struct AtomicCounter(AtomicU64);

impl AtomicCounter {
    /// Create a counter starting at zero.
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Record one event.
    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Current count.
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Byte gauge that also keeps its high-water mark.
#[derive(Debug, Default)]
pub struct UsageGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl UsageGauge {
    /// Create a gauge at zero.
    pub const fn new() -> Self {
        Self {
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Add `bytes`, raising the peak if needed. Returns the new value.
    pub fn add(&self, bytes: usize) -> usize {
        let now = self.current.fetch_add(bytes, Ordering::Relaxed) + bytes;
        self.peak.fetch_max(now, Ordering::Relaxed);
        now
    }

    /// Subtract `bytes`, saturating at zero. Returns the new value.
    pub fn sub(&self, bytes: usize) -> usize {
        let prev = self
            .current
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |cur| {
                Some(cur.saturating_sub(bytes))
            })
            .unwrap_or_else(|cur| cur);
        prev.saturating_sub(bytes)
    }

    /// Current value.
    pub fn get(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }

    /// Highest value seen.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }
}
