//! Static partition of a Tessel world into host-owned subtiles.
//!
//! The world rectangle is tessellated by a regular grid of subtiles and
//! every subtile is assigned to exactly one host. [`Partition`] validates
//! that assignment once, at startup, and afterwards answers
//! [`Partition::owning_host`] as a pure function: every host built from
//! the same [`PartitionConfig`] resolves every coordinate identically,
//! which is what lets hosts hand entities to each other without
//! negotiating.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod directory;
pub mod error;
pub mod partition;

pub use config::{HostEndpoint, PartitionConfig, SubTileSpec};
pub use directory::HostDirectory;
pub use error::PartitionError;
pub use partition::{HostSet, Partition, SubTile};
