//! A client connection shared between an entity record and the
//! dispatch workers.

use crate::entity::Lifecycle;
use crate::id::ConnectionId;
use crate::transport::Transport;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const ACTIVE: u8 = 0;
const PENDING_REMOVAL: u8 = 1;

/// A transport handle plus the delivery state the workers flip on
/// failure.
///
/// The entity record lives on the tick thread, but the failure is seen
/// by a worker. The lifecycle therefore sits here, behind an atomic, so
/// the first failing worker can mark the connection non-deliverable and
/// every later attempt in the same tick is suppressed.
pub struct Link {
    id: ConnectionId,
    transport: Arc<dyn Transport>,
    state: AtomicU8,
}

impl Link {
    /// Wrap a transport under a freshly allocated [`ConnectionId`].
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            id: ConnectionId::next(),
            transport,
            state: AtomicU8::new(ACTIVE),
        }
    }

    /// This connection's id.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The underlying transport.
    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Current delivery state.
    pub fn lifecycle(&self) -> Lifecycle {
        match self.state.load(Ordering::Acquire) {
            ACTIVE => Lifecycle::Active,
            _ => Lifecycle::PendingRemoval,
        }
    }

    /// Whether sends should still be attempted.
    pub fn is_deliverable(&self) -> bool {
        self.lifecycle() == Lifecycle::Active
    }

    /// Transition `Active -> PendingRemoval`.
    ///
    /// Returns `true` only for the caller that performed the transition.
    pub fn mark_pending_removal(&self) -> bool {
        self.state
            .compare_exchange(ACTIVE, PENDING_REMOVAL, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Mark non-deliverable and close the transport.
    pub fn close(&self) {
        self.state.store(PENDING_REMOVAL, Ordering::Release);
        self.transport.close();
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link")
            .field("id", &self.id)
            .field("lifecycle", &self.lifecycle())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ConnectionInfo, ScoreChangeMsg, Update};
    use crate::transport::TransportError;
    use std::sync::atomic::AtomicBool;

    #[derive(Default)]
    struct Null {
        closed: AtomicBool,
    }

    impl Transport for Null {
        fn send(&self, _: &[Update]) -> Result<(), TransportError> {
            Ok(())
        }
        fn send_connection_info(&self, _: &[ConnectionInfo]) -> Result<(), TransportError> {
            Ok(())
        }
        fn send_score_change(&self, _: &[ScoreChangeMsg]) -> Result<(), TransportError> {
            Ok(())
        }
        fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn only_first_mark_wins() {
        let link = Link::new(Arc::new(Null::default()));
        assert!(link.is_deliverable());
        assert!(link.mark_pending_removal());
        assert!(!link.mark_pending_removal());
        assert_eq!(link.lifecycle(), Lifecycle::PendingRemoval);
    }

    #[test]
    fn concurrent_marks_report_once() {
        let link = Arc::new(Link::new(Arc::new(Null::default())));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let l = Arc::clone(&link);
                std::thread::spawn(move || l.mark_pending_removal())
            })
            .collect();
        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|w| *w)
            .count();
        assert_eq!(wins, 1);
    }

    #[test]
    fn close_reaches_transport() {
        let null = Arc::new(Null::default());
        let link = Link::new(null.clone());
        link.close();
        assert!(null.closed.load(Ordering::SeqCst));
        assert!(!link.is_deliverable());
    }

    #[test]
    fn distinct_links_get_distinct_ids() {
        let a = Link::new(Arc::new(Null::default()));
        let b = Link::new(Arc::new(Null::default()));
        assert_ne!(a.id(), b.id());
    }
}
