use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use tessel_core::{ConnectionInfo, ScoreChangeMsg, Transport, TransportError, Update};

/// Records every call; fails every call while in failure mode.
///
/// Failed calls are counted in [`attempts`](Self::attempts) but not
/// recorded.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Vec<Update>>>,
    infos: Mutex<Vec<Vec<ConnectionInfo>>>,
    scores: Mutex<Vec<Vec<ScoreChangeMsg>>>,
    attempts: AtomicUsize,
    failing: AtomicBool,
    closed: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose every call fails.
    pub fn failing() -> Self {
        let t = Self::default();
        t.failing.store(true, Ordering::SeqCst);
        t
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Update lists delivered, in order.
    pub fn sent(&self) -> Vec<Vec<Update>> {
        self.sent.lock().unwrap().clone()
    }

    /// Every record of every delivered update list, flattened.
    pub fn updates(&self) -> Vec<Update> {
        self.sent.lock().unwrap().iter().flatten().cloned().collect()
    }

    /// Connection infos delivered, flattened.
    pub fn connection_infos(&self) -> Vec<ConnectionInfo> {
        self.infos.lock().unwrap().iter().flatten().cloned().collect()
    }

    /// Score changes delivered, flattened.
    pub fn score_changes(&self) -> Vec<ScoreChangeMsg> {
        self.scores.lock().unwrap().iter().flatten().copied().collect()
    }

    /// Calls made, successful or not. `close` is not counted.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::SendFailed {
                reason: "injected failure".into(),
            });
        }
        Ok(())
    }
}

impl Transport for RecordingTransport {
    fn send(&self, updates: &[Update]) -> Result<(), TransportError> {
        self.check()?;
        self.sent.lock().unwrap().push(updates.to_vec());
        Ok(())
    }

    fn send_connection_info(&self, infos: &[ConnectionInfo]) -> Result<(), TransportError> {
        self.check()?;
        self.infos.lock().unwrap().push(infos.to_vec());
        Ok(())
    }

    fn send_score_change(&self, changes: &[ScoreChangeMsg]) -> Result<(), TransportError> {
        self.check()?;
        self.scores.lock().unwrap().push(changes.to_vec());
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
