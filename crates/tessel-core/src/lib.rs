//! Core types and traits for the Tessel multi-host world server.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the fundamental abstractions shared by the partition, the registry
//! and the interest engine: identifiers, world geometry, the entity
//! model, the records pushed to clients, and the transport capability
//! through which they are delivered.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod aoi;
pub mod entity;
pub mod frame;
pub mod geometry;
pub mod id;
pub mod link;
pub mod protocol;
pub mod transport;

pub use aoi::{clamp_viewpoint, AccessLevel, AoiWindow, AxisAccess, ClampedViewpoint};
pub use entity::{
    EntityKind, Lifecycle, PhysicalEntity, PlayerSpec, Projectile, ProxyEntity, ProxySpec,
    ProxyViewpoint,
};
pub use frame::{PoseUpdate, ProjectileMotion, SimFrame};
pub use geometry::Rect;
pub use id::{ConnectionId, EntityId, HostId, ProjectileId, TickId};
pub use link::Link;
pub use protocol::{
    ConnectionInfo, ConnectionPurpose, DefeatMsg, HandoffState, PlayerDelta, ProjectileDelta,
    ScoreChangeMsg, TileInfo, Update, ViewpointAck,
};
pub use transport::{Transport, TransportError};
