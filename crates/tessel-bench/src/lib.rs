//! Benchmark profiles and utilities for the Tessel host core.
//!
//! - [`reference_profile`]: 1000×1000 world, 100×100 subtiles, 4 hosts
//! - [`stress_profile`]: 4000×4000 world, 100×100 subtiles, 16 hosts
//! - [`random_points`] / [`random_frame`]: seeded workload generation

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tessel_core::{EntityId, HostId, Rect, SimFrame};
use tessel_space::{HostEndpoint, PartitionConfig};

/// Host `1..=n` endpoints on consecutive ports.
fn hosts(n: u32) -> Vec<HostEndpoint> {
    (1..=n)
        .map(|id| HostEndpoint {
            id: HostId(id),
            address: "127.0.0.1".into(),
            port: 7000 + id as u16,
        })
        .collect()
}

/// Square world of `cells × cells` subtiles split into `side × side`
/// rectangular host territories.
fn blocked(cells: u32, size: f32, side: u32) -> PartitionConfig {
    let extent = cells as f32 * size;
    let block = cells / side;
    PartitionConfig::from_fn(
        Rect::new(0.0, 0.0, extent, extent),
        size,
        size,
        hosts(side * side),
        |col, row| HostId(1 + (col / block).min(side - 1) + side * (row / block).min(side - 1)),
    )
}

/// 1000×1000 world, 10×10 grid of 100-wide subtiles, four hosts in
/// quadrants.
pub fn reference_profile() -> PartitionConfig {
    blocked(10, 100.0, 2)
}

/// 4000×4000 world, 40×40 grid of 100-wide subtiles, sixteen hosts.
pub fn stress_profile() -> PartitionConfig {
    blocked(40, 100.0, 4)
}

fn unit(rng: &mut ChaCha8Rng) -> f32 {
    (rng.next_u32() >> 8) as f32 / (1u32 << 24) as f32
}

/// `n` uniformly distributed points inside `bounds`, deterministic in `seed`.
pub fn random_points(bounds: &Rect, n: usize, seed: u64) -> Vec<(f32, f32)> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            (
                bounds.min_x + unit(&mut rng) * bounds.width(),
                bounds.min_y + unit(&mut rng) * bounds.height(),
            )
        })
        .collect()
}

/// A frame moving each of `ids` by a small seeded step from `points`,
/// kept inside `bounds`. `points` is updated in place.
pub fn random_frame(bounds: &Rect, ids: &[EntityId], points: &mut [(f32, f32)], rng: &mut ChaCha8Rng) -> SimFrame {
    let mut frame = SimFrame::new();
    for (id, p) in ids.iter().zip(points.iter_mut()) {
        let dx = unit(rng) * 4.0 - 2.0;
        let dy = unit(rng) * 4.0 - 2.0;
        p.0 = (p.0 + dx).clamp(bounds.min_x, bounds.max_x);
        p.1 = (p.1 + dy).clamp(bounds.min_y, bounds.max_y);
        frame = frame.with_pose(*id, p.0, p.1, unit(rng) * 360.0);
    }
    frame
}

/// Seeded generator for [`random_frame`].
pub fn rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}
