//! The transport capability the core pushes records through.
//!
//! Framing, encoding and connection lifecycle belong to the embedding
//! server. The core only needs these four calls and treats any error as
//! terminal for the connection: it never retries.

use crate::protocol::{ConnectionInfo, ScoreChangeMsg, Update};

/// Failure of a single transport call.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The connection was already closed.
    #[error("connection closed")]
    Closed,
    /// The underlying send or flush failed.
    #[error("send failed: {reason}")]
    SendFailed {
        /// Human-readable cause from the transport.
        reason: String,
    },
}

/// One client connection, as seen by the core.
///
/// Implementations must be callable from any dispatch worker thread.
pub trait Transport: Send + Sync {
    /// Push a viewer's update list.
    fn send(&self, updates: &[Update]) -> Result<(), TransportError>;

    /// Point the client at other hosts.
    fn send_connection_info(&self, infos: &[ConnectionInfo]) -> Result<(), TransportError>;

    /// Forward score attribution.
    fn send_score_change(&self, changes: &[ScoreChangeMsg]) -> Result<(), TransportError>;

    /// Close the connection. Idempotent.
    fn close(&self);
}
