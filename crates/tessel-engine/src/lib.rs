//! Tick-driven interest management for one Tessel host.
//!
//! A [`HostWorld`] runs the [`InterestEngine`] on a dedicated tick
//! thread and delivers its output through a pool of dispatch workers.
//! Network handlers and the simulation never touch the engine directly:
//! they stage mutations through a [`RegistryHandle`] and publish
//! simulation frames into a snapshot ring. Each tick applies everything
//! staged so far, merges new frames, drives boundary crossings, scans
//! every viewer's area of interest and offers the results to a bounded
//! dispatch queue.
//!
//! ```text
//! Handlers / simulation         Tick thread                 Dispatch workers (N)
//!     |                             |                              |
//!     |--registry ops------------->| registry.apply()             |
//!     |   [unbounded channel]       | merge frames                 |
//!     |--publish_frame()---------->| coordinator.evaluate()       |
//!     |   [snapshot ring]           | compute_deltas()             |
//!     |                             | area_of_interest() per viewer|
//!     |                             |--send_timeout(10ms)--------->| transport.send()
//!     |                             |   [bounded(1000)]            |
//!     |<--remove_on_failure---------------------------------------|
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod crossing;
pub mod dispatch;
pub mod interest;
pub mod metrics;
pub mod realtime;
pub mod registry;
pub mod ring;
pub mod tick;
pub(crate) mod tick_thread;

pub use config::{ConfigError, WorldConfig};
pub use crossing::{BoundaryCoordinator, CrossingAction, CrossingState};
pub use dispatch::{DispatchItem, DispatchReceivers, Dispatcher, Offer, Payload};
pub use interest::{area_of_interest, compute_deltas, Deltas};
pub use metrics::{DispatchCounters, DispatchStats, TickReport};
pub use realtime::{HostWorld, ShutdownReport};
pub use registry::{
    ApplyReport, EntityRegistry, InterestRequest, RegistryHandle, RegistryOp, RemoveReason,
    SubmitError,
};
pub use ring::SnapshotRing;
pub use tick::{InterestEngine, LiveSnapshot, TickOutcome};
