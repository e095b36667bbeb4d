//! A hand-written, non-striped layout loaded from JSON, the way a
//! bootstrapper would ship it to every host.

use tessel_core::{HostId, Rect};
use tessel_space::{Partition, PartitionConfig, PartitionError};

const LAYOUT: &str = r#"{
    "bounds": {"min_x": -30, "min_y": 0, "max_x": 30, "max_y": 40},
    "subtile_width": 20,
    "subtile_height": 20,
    "subtiles": [
        {"origin_x": -30, "origin_y": 0,  "host": 1},
        {"origin_x": -10, "origin_y": 0,  "host": 1},
        {"origin_x": 10,  "origin_y": 0,  "host": 2},
        {"origin_x": -30, "origin_y": 20, "host": 3},
        {"origin_x": -10, "origin_y": 20, "host": 2},
        {"origin_x": 10,  "origin_y": 20, "host": 2}
    ],
    "hosts": [
        {"id": 1, "address": "a.local", "port": 7001},
        {"id": 2, "address": "b.local", "port": 7002},
        {"id": 3, "address": "c.local", "port": 7003}
    ]
}"#;

fn load() -> Partition {
    let cfg: PartitionConfig = serde_json::from_str(LAYOUT).unwrap();
    Partition::new(cfg).unwrap()
}

#[test]
fn negative_origin_world_resolves() {
    let p = load();
    assert_eq!(p.owning_host(-25.0, 5.0), HostId(1));
    assert_eq!(p.owning_host(-10.0, 5.0), HostId(1));
    assert_eq!(p.owning_host(10.0, 5.0), HostId(2));
    assert_eq!(p.owning_host(-30.0, 39.0), HostId(3));
    assert_eq!(p.owning_host(0.0, 20.0), HostId(2));
}

#[test]
fn window_spanning_three_hosts() {
    let p = load();
    let hosts = p.hosts_in_rect(&Rect::new(-5.0, 15.0, 15.0, 25.0));
    assert_eq!(hosts.as_slice(), &[HostId(1), HostId(2)]);
    let hosts = p.hosts_in_rect(&Rect::new(-35.0, 15.0, 15.0, 25.0));
    assert_eq!(hosts.as_slice(), &[HostId(1), HostId(2), HostId(3)]);
}

#[test]
fn territories_cover_world_exactly() {
    let p = load();
    let total: usize = [1, 2, 3].iter().map(|h| p.territory(HostId(*h)).len()).sum();
    assert_eq!(total, p.subtiles().count());
    assert_eq!(p.directory().endpoint(HostId(3)).unwrap().address, "c.local");
}

#[test]
fn two_hosts_claiming_one_tile_is_fatal() {
    let mut cfg: PartitionConfig = serde_json::from_str(LAYOUT).unwrap();
    cfg.subtiles[4].origin_x = 10.0;
    let err = Partition::new(cfg).unwrap_err();
    assert!(matches!(err, PartitionError::Overlap { col: 2, row: 1, .. }));
    assert!(err.to_string().contains("assigned to both"));
}
