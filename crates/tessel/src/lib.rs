//! Tessel: the server core of a tiled, multi-host virtual world.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Tessel sub-crates. For most servers, adding `tessel` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use tessel::prelude::*;
//!
//! // Two hosts splitting a 200×100 world at x = 100.
//! let hosts = vec![
//!     HostEndpoint { id: HostId(1), address: "10.0.0.1".into(), port: 7001 },
//!     HostEndpoint { id: HostId(2), address: "10.0.0.2".into(), port: 7002 },
//! ];
//! let config = PartitionConfig::from_fn(
//!     Rect::new(0.0, 0.0, 200.0, 100.0),
//!     50.0,
//!     50.0,
//!     hosts,
//!     |col, _row| HostId(1 + col / 2),
//! );
//! let partition = Partition::new(config.clone()).unwrap();
//! assert_eq!(partition.owning_host(40.0, 10.0), HostId(1));
//! assert_eq!(partition.owning_host(140.0, 10.0), HostId(2));
//!
//! // Every host runs the same partition; only the local host differs.
//! let mut world = HostWorld::new(WorldConfig::new(config, HostId(1))).unwrap();
//! world.publish_frame(SimFrame::new()).unwrap();
//! let report = world.shutdown();
//! assert!(report.tick_joined);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `tessel-core` | ids, geometry, entity model, wire records, transport contract |
//! | [`space`] | `tessel-space` | partition config, validation, ownership lookup, host directory |
//! | [`engine`] | `tessel-engine` | registry, crossing coordinator, interest engine, dispatch, host lifecycle |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types (`tessel-core`).
///
/// Entity model ([`types::PhysicalEntity`], [`types::ProxyEntity`],
/// [`types::Projectile`]), wire records ([`types::Update`],
/// [`types::ConnectionInfo`]) and the [`types::Transport`] capability.
pub use tessel_core as types;

/// Static world partition (`tessel-space`).
///
/// [`space::Partition`] answers which host owns a coordinate, identically
/// on every host.
pub use tessel_space as space;

/// Per-host runtime (`tessel-engine`).
///
/// [`engine::HostWorld`] runs the [`engine::InterestEngine`] on a tick
/// thread with a dispatch worker pool.
pub use tessel_engine as engine;

/// Common imports for typical Tessel usage.
///
/// ```rust
/// use tessel::prelude::*;
/// ```
pub mod prelude {
    // Ids and geometry
    pub use tessel_core::{ConnectionId, EntityId, HostId, ProjectileId, Rect, TickId};

    // Entities and frames
    pub use tessel_core::{PlayerSpec, Projectile, ProxySpec, SimFrame};

    // Wire records and transport
    pub use tessel_core::{
        AccessLevel, ConnectionInfo, ConnectionPurpose, ScoreChangeMsg, Transport,
        TransportError, Update,
    };

    // Partition
    pub use tessel_space::{HostEndpoint, Partition, PartitionConfig, PartitionError};

    // Engine
    pub use tessel_engine::{
        ConfigError, HostWorld, LiveSnapshot, RegistryHandle, ShutdownReport, SubmitError,
        TickReport, WorldConfig,
    };
}
