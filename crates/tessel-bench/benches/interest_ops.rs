//! Criterion benchmarks for the per-tick interest scan.

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tessel_core::{EntityId, HostId, PlayerSpec, SimFrame};
use tessel_engine::{
    area_of_interest, compute_deltas, DispatchCounters, Dispatcher, InterestEngine, SnapshotRing,
    TickOutcome,
};
use tessel_space::Partition;
use tessel_test_utils::RecordingTransport;

use tessel_bench::{random_frame, random_points, reference_profile, rng};

/// An engine for host 1 of the reference world with `n` players spread
/// over its quadrant.
fn populated(n: usize) -> (InterestEngine, tessel_engine::DispatchReceivers, Arc<SnapshotRing<SimFrame>>, Vec<(f32, f32)>) {
    let partition = Arc::new(Partition::new(reference_profile()).unwrap());
    let counters = Arc::new(DispatchCounters::new());
    let (dispatcher, rx) = Dispatcher::new(n * 4, Duration::from_millis(10), counters);
    let frames = Arc::new(SnapshotRing::new(8));
    let live = Arc::new(SnapshotRing::new(8));
    let mut engine = InterestEngine::new(partition, HostId(1), dispatcher, Arc::clone(&frames), live);

    let quadrant = tessel_core::Rect::new(0.0, 0.0, 499.0, 499.0);
    let points = random_points(&quadrant, n, 42);
    let handle = engine.registry_handle();
    for (i, &(x, y)) in points.iter().enumerate() {
        let mut spec = PlayerSpec::at(EntityId(i as u64), x, y);
        spec.aoi_width = 100.0;
        spec.aoi_height = 100.0;
        handle
            .connect_player(spec, Arc::new(RecordingTransport::new()))
            .unwrap();
    }
    frames.push(SimFrame::new());
    assert!(matches!(engine.execute_tick(), TickOutcome::Executed(_)));
    rx.updates.try_iter().for_each(drop);
    rx.control.try_iter().for_each(drop);
    (engine, rx, frames, points)
}

/// Benchmark: one full tick (merge, crossing, scan, offer) with 500 players.
fn bench_tick_500(c: &mut Criterion) {
    let (mut engine, rx, frames, mut points) = populated(500);
    let ids: Vec<EntityId> = (0..500).map(EntityId).collect();
    let quadrant = tessel_core::Rect::new(0.0, 0.0, 499.0, 499.0);
    let mut r = rng(7);

    c.bench_function("tick_500_players", |b| {
        b.iter(|| {
            frames.push(random_frame(&quadrant, &ids, &mut points, &mut r));
            black_box(engine.execute_tick());
            rx.updates.try_iter().for_each(drop);
            rx.control.try_iter().for_each(drop);
        });
    });
}

/// Benchmark: deltas plus AOI membership for every viewer, no dispatch.
fn bench_scan_1000(c: &mut Criterion) {
    let (engine, _rx, _frames, points) = populated(1000);
    let bounds = tessel_core::Rect::new(0.0, 0.0, 1000.0, 1000.0);

    c.bench_function("aoi_scan_1000_players", |b| {
        b.iter(|| {
            let deltas = compute_deltas(engine.registry(), &[]);
            for &(x, y) in &points {
                let window = tessel_core::AoiWindow::from_viewpoint(x, y, 50.0, 50.0, &bounds);
                black_box(area_of_interest(&window, &deltas));
            }
        });
    });
}

criterion_group!(benches, bench_tick_500, bench_scan_1000);
criterion_main!(benches);
