//! Fixed-capacity, generation-tagged ring of shared snapshots.
//!
//! Used twice per host: the simulation publishes [`SimFrame`]s into one
//! ring and the tick thread consumes every generation it has not seen;
//! the tick thread publishes a [`LiveSnapshot`] into another ring after
//! each applied tick for any thread to read.
//!
//! [`SimFrame`]: tessel_core::SimFrame
//! [`LiveSnapshot`]: crate::LiveSnapshot

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// A tagged slot: the `u64` is the monotonic write position when this
/// snapshot was stored, enabling consumers to detect overwrites.
type Slot<T> = Option<(u64, Arc<T>)>;

/// A fixed-capacity ring buffer of `Arc<T>`.
///
/// Single-producer: only one thread calls [`push`](Self::push) at a time.
/// Multi-consumer: any thread can call [`latest`](Self::latest) or
/// [`get_by_pos`](Self::get_by_pos).
///
/// The write position is monotonically increasing (never wraps) and
/// doubles as the generation of the snapshot stored at it. Slot index is
/// `pos % capacity`.
pub struct SnapshotRing<T> {
    slots: Vec<Mutex<Slot<T>>>,
    write_pos: AtomicU64,
    capacity: usize,
}

impl<T> SnapshotRing<T> {
    /// Create a new ring buffer with the given capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity < 2`. Configuration validation rejects such
    /// values before a ring is built.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 2, "SnapshotRing capacity must be >= 2, got {capacity}");
        let slots = (0..capacity).map(|_| Mutex::new(None)).collect();
        Self {
            slots,
            write_pos: AtomicU64::new(0),
            capacity,
        }
    }

    /// Push a new snapshot. Returns the evicted one, if any.
    pub fn push(&self, snapshot: T) -> Option<Arc<T>> {
        let pos = self.write_pos.load(Ordering::Relaxed);
        let slot_idx = (pos as usize) % self.capacity;

        let arc = Arc::new(snapshot);
        let evicted = {
            let mut slot = self.slots[slot_idx]
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let prev = slot.take().map(|(_tag, arc)| arc);
            *slot = Some((pos, Arc::clone(&arc)));
            prev
        };

        // Release-store makes the slot visible before consumers observe
        // the new write_pos.
        self.write_pos.store(pos + 1, Ordering::Release);

        evicted
    }

    /// The most recently pushed snapshot, if any.
    pub fn latest(&self) -> Option<Arc<T>> {
        let pos = self.write_pos.load(Ordering::Acquire);
        if pos == 0 {
            return None;
        }
        self.get_by_pos(pos - 1)
    }

    /// The snapshot stored at `pos`, or `None` if it was evicted or not
    /// written yet.
    pub fn get_by_pos(&self, pos: u64) -> Option<Arc<T>> {
        let current = self.write_pos.load(Ordering::Acquire);
        if pos >= current || current - pos > self.capacity as u64 {
            return None;
        }

        let slot_idx = (pos as usize) % self.capacity;
        let slot = self.slots[slot_idx]
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some((tag, arc)) if *tag == pos => Some(Arc::clone(arc)),
            // Overwritten between the bounds check and the lock.
            _ => None,
        }
    }

    /// Number of snapshots currently stored (up to `capacity`).
    pub fn len(&self) -> usize {
        let pos = self.write_pos.load(Ordering::Acquire) as usize;
        pos.min(self.capacity)
    }

    /// Whether nothing was pushed yet.
    pub fn is_empty(&self) -> bool {
        self.write_pos.load(Ordering::Acquire) == 0
    }

    /// The ring buffer capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The current monotonic write position: the number of snapshots
    /// ever pushed.
    pub fn write_pos(&self) -> u64 {
        self.write_pos.load(Ordering::Acquire)
    }
}

// Compile-time assertion: a ring of shareable snapshots is Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<SnapshotRing<tessel_core::SimFrame>>();
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ring_is_empty() {
        let ring: SnapshotRing<u32> = SnapshotRing::new(4);
        assert!(ring.is_empty());
        assert_eq!(ring.len(), 0);
        assert_eq!(ring.capacity(), 4);
        assert!(ring.latest().is_none());
    }

    #[test]
    fn latest_tracks_pushes() {
        let ring = SnapshotRing::new(4);
        ring.push(1u32);
        ring.push(2);
        assert_eq!(*ring.latest().unwrap(), 2);
        assert_eq!(ring.write_pos(), 2);
        assert_eq!(ring.len(), 2);
    }

    #[test]
    fn eviction_after_wrap() {
        let ring = SnapshotRing::new(2);
        assert!(ring.push(10u32).is_none());
        assert!(ring.push(11).is_none());
        assert_eq!(ring.push(12).as_deref(), Some(&10));
        assert!(ring.get_by_pos(0).is_none());
        assert_eq!(*ring.get_by_pos(1).unwrap(), 11);
        assert_eq!(*ring.get_by_pos(2).unwrap(), 12);
        assert!(ring.get_by_pos(3).is_none());
    }

    #[test]
    fn concurrent_readers_see_consistent_values() {
        let ring = Arc::new(SnapshotRing::new(4));
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let ring = Arc::clone(&ring);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        if let Some(v) = ring.latest() {
                            assert!(*v < 200u64);
                        }
                    }
                })
            })
            .collect();
        for i in 0..200u64 {
            ring.push(i);
        }
        for r in readers {
            r.join().unwrap();
        }
        assert_eq!(*ring.latest().unwrap(), 199);
    }
}
