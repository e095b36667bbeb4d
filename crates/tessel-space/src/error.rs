//! Partition validation errors.
//!
//! All of these are fatal: a host must refuse to start rather than run
//! with a territory map its peers might disagree with.

use tessel_core::HostId;

/// Why a [`PartitionConfig`](crate::PartitionConfig) was rejected.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum PartitionError {
    /// World or subtile extents are zero, negative or not finite.
    #[error("invalid dimensions: {reason}")]
    InvalidDimensions {
        /// What went wrong.
        reason: String,
    },
    /// The world is not a whole number of subtiles along an axis.
    #[error("world {axis} extent {extent} is not a multiple of subtile size {subtile}")]
    NotTessellating {
        /// `"x"` or `"y"`.
        axis: &'static str,
        /// World extent on that axis.
        extent: f32,
        /// Subtile extent on that axis.
        subtile: f32,
    },
    /// The grid would exceed [`Partition::MAX_CELLS`](crate::Partition::MAX_CELLS).
    #[error("partition has {cells} subtiles, maximum is {max}")]
    TooManyCells {
        /// Requested cell count.
        cells: u64,
        /// Maximum.
        max: u64,
    },
    /// A subtile origin is not on a grid line.
    #[error("subtile origin ({x}, {y}) is not aligned to the grid")]
    Misaligned {
        /// Origin.
        x: f32,
        /// Origin.
        y: f32,
    },
    /// A subtile origin lies outside the world.
    #[error("subtile origin ({x}, {y}) is outside the world bounds")]
    OutOfBounds {
        /// Origin.
        x: f32,
        /// Origin.
        y: f32,
    },
    /// Two assignments name the same subtile.
    #[error("subtile ({col}, {row}) assigned to both {first} and {second}")]
    Overlap {
        /// Column.
        col: u32,
        /// Row.
        row: u32,
        /// First owner seen.
        first: HostId,
        /// Conflicting owner.
        second: HostId,
    },
    /// A subtile has no owner.
    #[error("subtile ({col}, {row}) is not assigned to any host")]
    Gap {
        /// Column.
        col: u32,
        /// Row.
        row: u32,
    },
    /// A subtile names a host missing from the directory.
    #[error("subtile assigned to unknown host {host}")]
    UnknownHost {
        /// The unknown host.
        host: HostId,
    },
    /// The directory lists the same host twice.
    #[error("host {host} listed more than once")]
    DuplicateHost {
        /// The repeated host.
        host: HostId,
    },
}
