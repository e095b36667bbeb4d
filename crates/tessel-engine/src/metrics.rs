//! Per-tick and cumulative dispatch metrics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counts and timings collected during a single executed tick.
///
/// All durations are in microseconds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tick number (executed ticks only).
    pub tick: u64,
    /// Registry generation produced by this tick's apply.
    pub generation: u64,
    /// Registry operations applied.
    pub ops_applied: usize,
    /// Simulation frames merged.
    pub frames_merged: usize,
    /// Frames evicted from the ring before the tick could read them.
    pub frames_missed: u64,
    /// Viewers scanned (physical entities plus proxies).
    pub viewers: usize,
    /// Update lists accepted by the dispatch queue.
    pub published: usize,
    /// Update lists dropped on offer timeout.
    pub dropped: usize,
    /// Handoffs emitted.
    pub handoffs: usize,
    /// Auxiliary subscriptions emitted.
    pub subscriptions: usize,
    /// Entities defeated this tick.
    pub defeats: usize,
    /// Time spent applying staged registry operations.
    pub apply_us: u64,
    /// Time spent merging frames and evaluating crossings.
    pub crossing_us: u64,
    /// Time spent computing deltas and AOI membership and offering.
    pub scan_us: u64,
    /// Wall-clock time for the whole tick.
    pub total_us: u64,
}

/// Cumulative dispatch counters, shared by the tick thread and workers.
#[derive(Debug, Default)]
pub struct DispatchCounters {
    delivered: AtomicU64,
    failed: AtomicU64,
    suppressed: AtomicU64,
    dropped: AtomicU64,
    closed: AtomicU64,
}

/// Point-in-time copy of [`DispatchCounters`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Successful transport calls.
    pub delivered: u64,
    /// Transport calls that returned an error.
    pub failed: u64,
    /// Items skipped because their connection was no longer deliverable.
    pub suppressed: u64,
    /// Update lists dropped because the queue stayed full.
    pub dropped: u64,
    /// Connections closed by a dispatch item.
    pub closed: u64,
}

impl DispatchCounters {
    /// Fresh counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_suppressed(&self) {
        self.suppressed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_closed(&self) {
        self.closed.fetch_add(1, Ordering::Relaxed);
    }

    /// Read all counters.
    pub fn snapshot(&self) -> DispatchStats {
        DispatchStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            closed: self.closed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_report_is_zero() {
        let r = TickReport::default();
        assert_eq!(r.tick, 0);
        assert_eq!(r.published, 0);
        assert_eq!(r.total_us, 0);
    }

    #[test]
    fn counters_accumulate() {
        let c = DispatchCounters::new();
        c.record_delivered();
        c.record_delivered();
        c.record_failed();
        c.record_suppressed();
        c.record_dropped();
        c.record_closed();
        assert_eq!(
            c.snapshot(),
            DispatchStats {
                delivered: 2,
                failed: 1,
                suppressed: 1,
                dropped: 1,
                closed: 1,
            }
        );
    }
}
