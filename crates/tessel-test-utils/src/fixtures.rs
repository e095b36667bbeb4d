//! Reusable partition fixtures.
//!
//! - [`two_host_partition`]: 20×10 world, 10×10 subtiles, boundary at x = 10.
//! - [`quadrant_partition`]: 40×40 world split into four hosts.
//! - [`grid_partition`]: arbitrary square grid striped across N hosts.

use tessel_core::{HostId, Rect};
use tessel_space::{HostEndpoint, PartitionConfig};

/// Endpoints `127.0.0.1:9000 + id` for hosts `1..=n`.
pub fn endpoints(n: u32) -> Vec<HostEndpoint> {
    (1..=n)
        .map(|id| HostEndpoint {
            id: HostId(id),
            address: "127.0.0.1".into(),
            port: 9000 + id as u16,
        })
        .collect()
}

/// `HostId(1)` owns `x < 10`, `HostId(2)` owns `x >= 10`.
pub fn two_host_partition() -> PartitionConfig {
    PartitionConfig::from_fn(
        Rect::new(0.0, 0.0, 20.0, 10.0),
        10.0,
        10.0,
        endpoints(2),
        |col, _| HostId(col + 1),
    )
}

/// 40×40 world of 10×10 subtiles; hosts 1..=4 own the quadrants in
/// row-major order (1 bottom-left, 4 top-right).
pub fn quadrant_partition() -> PartitionConfig {
    PartitionConfig::from_fn(
        Rect::new(0.0, 0.0, 40.0, 40.0),
        10.0,
        10.0,
        endpoints(4),
        |col, row| HostId(1 + (col / 2) + 2 * (row / 2)),
    )
}

/// `cells × cells` grid of `size`-wide subtiles, columns striped across
/// `hosts` hosts.
pub fn grid_partition(cells: u32, size: f32, hosts: u32) -> PartitionConfig {
    let extent = cells as f32 * size;
    PartitionConfig::from_fn(
        Rect::new(0.0, 0.0, extent, extent),
        size,
        size,
        endpoints(hosts),
        |col, _| HostId(1 + col * hosts / cells),
    )
}
