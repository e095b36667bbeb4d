//! Dispatch queue and worker pool.
//!
//! Per-viewer update lists go through a bounded queue. The tick offers
//! each list with a short bounded wait and drops it on timeout: lists
//! are state snapshots, and the next tick supersedes a dropped one.
//! Control messages (viewpoint acks, connection info, score forwards,
//! detach-and-close) go through a separate unbounded queue that workers
//! always drain first, so saturation never loses them.
//!
//! Delivery is at most once. A failed send is never retried: the worker
//! flips the connection to pending removal and stages the removal
//! through the registry. Only the worker that performs that transition
//! reports it; later failures on the same connection are suppressed.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, SendTimeoutError, Sender};
use tessel_core::{ConnectionInfo, EntityId, EntityKind, Link, ScoreChangeMsg, TransportError, Update};

use crate::metrics::DispatchCounters;
use crate::registry::RegistryHandle;

/// What to push over a connection.
#[derive(Clone, Debug)]
pub enum Payload {
    /// A viewer's update list, or a single control record.
    Updates(Vec<Update>),
    /// Pointers to other hosts.
    Connection(Vec<ConnectionInfo>),
    /// Score attribution for a proxied entity.
    ScoreChange(Vec<ScoreChangeMsg>),
    /// Send these final records, then close the connection.
    Close(Vec<Update>),
}

/// One unit of work for a dispatch worker.
#[derive(Clone, Debug)]
pub struct DispatchItem {
    /// Entity the connection belongs to.
    pub viewer: EntityId,
    /// Which registry sequence the viewer lives in.
    pub kind: EntityKind,
    /// The connection.
    pub link: Arc<Link>,
    /// What to send.
    pub payload: Payload,
}

impl DispatchItem {
    /// Build an item.
    pub fn new(viewer: EntityId, kind: EntityKind, link: Arc<Link>, payload: Payload) -> Self {
        Self {
            viewer,
            kind,
            link,
            payload,
        }
    }
}

/// Result of offering an update list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Offer {
    /// Accepted by the queue.
    Queued,
    /// The queue stayed full for the whole timeout, or is closed.
    Dropped,
}

/// Producer side of both dispatch queues.
///
/// Owned by the interest engine. Dropping it closes the queues; workers
/// then drain what is already queued and exit.
pub struct Dispatcher {
    updates_tx: Sender<DispatchItem>,
    control_tx: Sender<DispatchItem>,
    offer_timeout: Duration,
    counters: Arc<DispatchCounters>,
}

/// Consumer side of both dispatch queues, cloned into each worker.
#[derive(Clone)]
pub struct DispatchReceivers {
    /// Bounded update lists.
    pub updates: Receiver<DispatchItem>,
    /// Unbounded control messages.
    pub control: Receiver<DispatchItem>,
}

impl Dispatcher {
    /// Create both queues.
    pub fn new(
        capacity: usize,
        offer_timeout: Duration,
        counters: Arc<DispatchCounters>,
    ) -> (Self, DispatchReceivers) {
        let (updates_tx, updates) = crossbeam_channel::bounded(capacity);
        let (control_tx, control) = crossbeam_channel::unbounded();
        (
            Self {
                updates_tx,
                control_tx,
                offer_timeout,
                counters,
            },
            DispatchReceivers { updates, control },
        )
    }

    /// Offer an update list, waiting up to the offer timeout for space.
    pub fn offer(&self, item: DispatchItem) -> Offer {
        match self.updates_tx.send_timeout(item, self.offer_timeout) {
            Ok(()) => Offer::Queued,
            Err(SendTimeoutError::Timeout(item)) => {
                self.counters.record_dropped();
                tracing::trace!(viewer = %item.viewer, "dispatch queue saturated, update dropped");
                Offer::Dropped
            }
            Err(SendTimeoutError::Disconnected(item)) => {
                self.counters.record_dropped();
                tracing::trace!(viewer = %item.viewer, "dispatch queue closed, update dropped");
                Offer::Dropped
            }
        }
    }

    /// Queue a control message. Never blocks and never drops while the
    /// workers are alive.
    pub fn control(&self, item: DispatchItem) {
        if let Err(err) = self.control_tx.send(item) {
            tracing::debug!(viewer = %err.0.viewer, "control queue closed, message discarded");
        }
    }

    /// Shared counters.
    pub fn counters(&self) -> &Arc<DispatchCounters> {
        &self.counters
    }

    /// Update lists currently waiting.
    pub fn queued(&self) -> usize {
        self.updates_tx.len()
    }
}

/// Perform one item's transport call and react to its outcome.
pub fn deliver(item: DispatchItem, registry: &RegistryHandle, counters: &DispatchCounters) {
    let DispatchItem {
        viewer,
        kind,
        link,
        payload,
    } = item;

    // Closing is unconditional: the connection is usually already
    // marked non-deliverable by whoever requested it.
    if let Payload::Close(last) = payload {
        if !last.is_empty() {
            match link.transport().send(&last) {
                Ok(()) => counters.record_delivered(),
                Err(err) => {
                    counters.record_failed();
                    tracing::debug!(viewer = %viewer, error = %err, "final records not delivered before close");
                }
            }
        }
        link.close();
        counters.record_closed();
        return;
    }

    if !link.is_deliverable() {
        counters.record_suppressed();
        return;
    }

    let result: Result<(), TransportError> = match &payload {
        Payload::Updates(updates) => link.transport().send(updates),
        Payload::Connection(infos) => link.transport().send_connection_info(infos),
        Payload::ScoreChange(changes) => link.transport().send_score_change(changes),
        Payload::Close(_) => Ok(()),
    };

    match result {
        Ok(()) => counters.record_delivered(),
        Err(err) => {
            counters.record_failed();
            if link.mark_pending_removal() {
                tracing::warn!(
                    viewer = %viewer,
                    ?kind,
                    connection = %link.id(),
                    error = %err,
                    "transport failure, staging removal"
                );
                if registry.remove_on_failure(viewer, link.id()).is_err() {
                    tracing::debug!(viewer = %viewer, "registry closed, removal not staged");
                }
            } else {
                counters.record_suppressed();
            }
        }
    }
}

/// Main loop for a dispatch worker thread.
///
/// Control messages are taken first. Runs until both queues are closed
/// and drained.
pub fn worker_loop(rx: DispatchReceivers, registry: RegistryHandle, counters: Arc<DispatchCounters>) {
    let never = crossbeam_channel::never::<DispatchItem>();
    let mut control_open = true;
    let mut updates_open = true;

    while control_open || updates_open {
        if control_open {
            match rx.control.try_recv() {
                Ok(item) => {
                    deliver(item, &registry, &counters);
                    continue;
                }
                Err(crossbeam_channel::TryRecvError::Disconnected) => {
                    control_open = false;
                    continue;
                }
                Err(crossbeam_channel::TryRecvError::Empty) => {}
            }
        }

        let control = if control_open { &rx.control } else { &never };
        let updates = if updates_open { &rx.updates } else { &never };
        crossbeam_channel::select! {
            recv(control) -> msg => match msg {
                Ok(item) => deliver(item, &registry, &counters),
                Err(_) => control_open = false,
            },
            recv(updates) -> msg => match msg {
                Ok(item) => deliver(item, &registry, &counters),
                Err(_) => updates_open = false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{RegistryOp, RemoveReason};
    use tessel_core::Lifecycle;
    use tessel_test_utils::RecordingTransport;

    fn item(transport: &Arc<RecordingTransport>, payload: Payload) -> DispatchItem {
        let link = Arc::new(Link::new(transport.clone()));
        DispatchItem::new(EntityId(1), EntityKind::Player, link, payload)
    }

    #[test]
    fn delivers_updates() {
        let (handle, _rx) = RegistryHandle::detached();
        let counters = DispatchCounters::new();
        let t = Arc::new(RecordingTransport::new());
        deliver(
            item(&t, Payload::Updates(vec![Update::Detached { id: EntityId(5) }])),
            &handle,
            &counters,
        );
        assert_eq!(t.sent().len(), 1);
        assert_eq!(counters.snapshot().delivered, 1);
    }

    #[test]
    fn failure_stages_one_removal() {
        let (handle, rx) = RegistryHandle::detached();
        let counters = DispatchCounters::new();
        let t = Arc::new(RecordingTransport::failing());
        let first = item(&t, Payload::Updates(vec![]));
        let link = Arc::clone(&first.link);
        let second = DispatchItem::new(EntityId(1), EntityKind::Player, Arc::clone(&link), Payload::Updates(vec![]));

        deliver(first, &handle, &counters);
        deliver(second, &handle, &counters);

        assert_eq!(link.lifecycle(), Lifecycle::PendingRemoval);
        let staged: Vec<_> = rx.try_iter().collect();
        assert_eq!(staged.len(), 1);
        assert!(matches!(
            staged[0],
            RegistryOp::Remove { id: EntityId(1), reason: RemoveReason::TransportFailure, .. }
        ));
        // The second attempt never reached the transport.
        assert_eq!(t.attempts(), 1);
        let stats = counters.snapshot();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.suppressed, 1);
    }

    #[test]
    fn close_sends_final_records_even_when_marked() {
        let (handle, _rx) = RegistryHandle::detached();
        let counters = DispatchCounters::new();
        let t = Arc::new(RecordingTransport::new());
        let it = item(&t, Payload::Close(vec![Update::Detached { id: EntityId(1) }]));
        it.link.mark_pending_removal();
        deliver(it, &handle, &counters);
        assert_eq!(t.sent().len(), 1);
        assert!(t.is_closed());
        assert_eq!(counters.snapshot().closed, 1);
    }

    #[test]
    fn failed_final_records_are_counted_and_still_close() {
        let (handle, rx) = RegistryHandle::detached();
        let counters = DispatchCounters::new();
        let t = Arc::new(RecordingTransport::failing());
        deliver(
            item(&t, Payload::Close(vec![Update::Detached { id: EntityId(1) }])),
            &handle,
            &counters,
        );
        let stats = counters.snapshot();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.delivered, 0);
        assert_eq!(stats.closed, 1);
        assert!(t.is_closed());
        // Closing already settles the connection; nothing is staged.
        assert_eq!(rx.try_iter().count(), 0);
    }

    #[test]
    fn offer_times_out_when_full() {
        let counters = Arc::new(DispatchCounters::new());
        let (dispatcher, _rx) = Dispatcher::new(1, Duration::from_millis(10), Arc::clone(&counters));
        let t = Arc::new(RecordingTransport::new());
        assert_eq!(dispatcher.offer(item(&t, Payload::Updates(vec![]))), Offer::Queued);
        assert_eq!(dispatcher.offer(item(&t, Payload::Updates(vec![]))), Offer::Dropped);
        assert_eq!(dispatcher.queued(), 1);
        assert_eq!(counters.snapshot().dropped, 1);
    }

    #[test]
    fn workers_drain_and_exit_when_closed() {
        let counters = Arc::new(DispatchCounters::new());
        let (dispatcher, rx) = Dispatcher::new(16, Duration::from_millis(10), Arc::clone(&counters));
        let (handle, _ops) = RegistryHandle::detached();
        let t = Arc::new(RecordingTransport::new());
        for _ in 0..5 {
            dispatcher.offer(item(&t, Payload::Updates(vec![])));
        }
        dispatcher.control(item(&t, Payload::Connection(vec![])));
        drop(dispatcher);

        let c = Arc::clone(&counters);
        let worker = std::thread::spawn(move || worker_loop(rx, handle, c));
        worker.join().unwrap();

        assert_eq!(counters.snapshot().delivered, 6);
        assert_eq!(t.connection_infos().len(), 1);
    }
}
