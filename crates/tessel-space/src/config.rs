//! Declarative partition configuration.

use serde::{Deserialize, Serialize};
use tessel_core::{HostId, Rect};

/// Network location of a host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostEndpoint {
    /// Host identity.
    pub id: HostId,
    /// Address clients connect to.
    pub address: String,
    /// Port clients connect to.
    pub port: u16,
}

/// Assignment of one subtile to a host.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubTileSpec {
    /// Subtile origin; must lie on the grid.
    pub origin_x: f32,
    /// Subtile origin; must lie on the grid.
    pub origin_y: f32,
    /// Owner.
    pub host: HostId,
}

/// Everything needed to build a [`Partition`](crate::Partition).
///
/// Every host of a deployment must be started with the same value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartitionConfig {
    /// Total world bounds.
    pub bounds: Rect,
    /// Width of every subtile.
    pub subtile_width: f32,
    /// Height of every subtile.
    pub subtile_height: f32,
    /// One entry per subtile; together they must cover the world exactly once.
    pub subtiles: Vec<SubTileSpec>,
    /// Every host referenced by `subtiles`.
    pub hosts: Vec<HostEndpoint>,
}

impl PartitionConfig {
    /// Build a configuration by asking `owner` for the host of each
    /// `(col, row)` cell.
    ///
    /// Cell counts are rounded to the nearest integer; a world that is
    /// not a whole number of subtiles is rejected later by
    /// [`Partition::new`](crate::Partition::new).
    pub fn from_fn<F>(
        bounds: Rect,
        subtile_width: f32,
        subtile_height: f32,
        hosts: Vec<HostEndpoint>,
        mut owner: F,
    ) -> Self
    where
        F: FnMut(u32, u32) -> HostId,
    {
        let cols = (bounds.width() / subtile_width).round().max(0.0) as u32;
        let rows = (bounds.height() / subtile_height).round().max(0.0) as u32;
        let mut subtiles = Vec::with_capacity((cols as usize) * (rows as usize));
        for row in 0..rows {
            for col in 0..cols {
                subtiles.push(SubTileSpec {
                    origin_x: bounds.min_x + col as f32 * subtile_width,
                    origin_y: bounds.min_y + row as f32 * subtile_height,
                    host: owner(col, row),
                });
            }
        }
        Self {
            bounds,
            subtile_width,
            subtile_height,
            subtiles,
            hosts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_fn_emits_row_major_cells() {
        let cfg = PartitionConfig::from_fn(
            Rect::new(0.0, 0.0, 20.0, 10.0),
            10.0,
            5.0,
            vec![],
            |col, row| HostId(col * 10 + row),
        );
        assert_eq!(cfg.subtiles.len(), 4);
        assert_eq!(cfg.subtiles[1].origin_x, 10.0);
        assert_eq!(cfg.subtiles[1].host, HostId(10));
        assert_eq!(cfg.subtiles[2].origin_y, 5.0);
    }

    #[test]
    fn deserializes_from_json() {
        let json = r#"{
            "bounds": {"min_x": 0, "min_y": 0, "max_x": 10, "max_y": 10},
            "subtile_width": 10, "subtile_height": 10,
            "subtiles": [{"origin_x": 0, "origin_y": 0, "host": 1}],
            "hosts": [{"id": 1, "address": "127.0.0.1", "port": 9001}]
        }"#;
        let cfg: PartitionConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.hosts[0].port, 9001);
        assert_eq!(cfg.subtiles[0].host, HostId(1));
    }
}
