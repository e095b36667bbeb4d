//! End-to-end scenarios driving interest engines by hand, with dispatch
//! performed synchronously on the test thread.

use std::sync::Arc;
use std::time::Duration;

use tessel_core::{
    AccessLevel, ConnectionPurpose, EntityId, HostId, Lifecycle, PlayerSpec, SimFrame, Update,
};
use tessel_engine::dispatch::deliver;
use tessel_engine::{
    DispatchCounters, DispatchReceivers, Dispatcher, InterestEngine, LiveSnapshot, SnapshotRing,
    TickOutcome, TickReport,
};
use tessel_space::Partition;
use tessel_test_utils::{two_host_partition, RecordingTransport};

struct Host {
    engine: InterestEngine,
    rx: DispatchReceivers,
    frames: Arc<SnapshotRing<SimFrame>>,
    counters: Arc<DispatchCounters>,
}

impl Host {
    fn new(local: HostId, capacity: usize) -> Self {
        let partition = Arc::new(Partition::new(two_host_partition()).unwrap());
        let counters = Arc::new(DispatchCounters::new());
        let (dispatcher, rx) =
            Dispatcher::new(capacity, Duration::from_millis(10), Arc::clone(&counters));
        let frames = Arc::new(SnapshotRing::new(8));
        let live: Arc<SnapshotRing<LiveSnapshot>> = Arc::new(SnapshotRing::new(8));
        let engine = InterestEngine::new(partition, local, dispatcher, Arc::clone(&frames), live);
        Self {
            engine,
            rx,
            frames,
            counters,
        }
    }

    fn tick(&mut self, frame: SimFrame) -> TickReport {
        self.frames.push(frame);
        match self.engine.execute_tick() {
            TickOutcome::Executed(r) => r,
            TickOutcome::Skipped => panic!("tick skipped"),
        }
    }

    /// Act as the worker pool: control first, then update lists.
    fn dispatch_all(&self) {
        let handle = self.engine.registry_handle();
        for item in self.rx.control.try_iter().chain(self.rx.updates.try_iter()) {
            deliver(item, &handle, &self.counters);
        }
    }
}

#[test]
fn viewpoint_beyond_far_edge_clamps_high() {
    let mut host = Host::new(HostId(1), 16);
    let t = Arc::new(RecordingTransport::new());
    let h = host.engine.registry_handle();
    h.connect_player(PlayerSpec::at(EntityId(1), 5.0, 5.0), t.clone()).unwrap();
    host.tick(SimFrame::new());
    h.set_viewpoint(EntityId(1), 20.0 + 50.0, 5.0).unwrap();
    host.tick(SimFrame::new());
    host.dispatch_all();

    let ack = t
        .updates()
        .into_iter()
        .find_map(|u| match u {
            Update::Viewpoint(ack) => Some(ack),
            _ => None,
        })
        .expect("viewpoint ack delivered");
    assert_eq!(ack.virtual_x, 20.0);
    assert_eq!(ack.access.x, AccessLevel::ClampedHigh);
    assert_eq!(ack.access.y, AccessLevel::Unrestricted);
}

#[test]
fn saturated_queue_drops_one_viewer_and_tick_completes() {
    let mut host = Host::new(HostId(1), 1);
    let first = Arc::new(RecordingTransport::new());
    let second = Arc::new(RecordingTransport::new());
    let h = host.engine.registry_handle();
    h.connect_player(PlayerSpec::at(EntityId(1), 2.0, 5.0), first.clone()).unwrap();
    h.connect_player(PlayerSpec::at(EntityId(2), 4.0, 5.0), second.clone()).unwrap();

    let report = host.tick(SimFrame::new());
    assert_eq!(report.published, 1);
    assert_eq!(report.dropped, 1);
    host.dispatch_all();

    assert_eq!(first.sent().iter().filter(|l| l.iter().any(|u| matches!(u, Update::Player(_)))).count(), 1);
    assert!(second.sent().iter().all(|l| !l.iter().any(|u| matches!(u, Update::Player(_)))));
    assert_eq!(host.counters.snapshot().dropped, 1);
}

#[test]
fn transport_failure_stages_a_single_removal() {
    let mut host = Host::new(HostId(1), 16);
    let t = Arc::new(RecordingTransport::failing());
    let h = host.engine.registry_handle();
    let conn = h.connect_player(PlayerSpec::at(EntityId(1), 2.0, 5.0), t.clone()).unwrap();

    host.tick(SimFrame::new());
    let link = Arc::clone(host.engine.registry().player(EntityId(1)).unwrap().link());
    assert_eq!(link.id(), conn);

    // An interest subscription and an update list, both for the same
    // viewer in the same tick.
    host.dispatch_all();
    assert_eq!(link.lifecycle(), Lifecycle::PendingRemoval);
    assert_eq!(t.attempts(), 1);
    let stats = host.counters.snapshot();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.suppressed, 1);

    // Still live until the next apply, then gone.
    assert!(host.engine.registry().player(EntityId(1)).is_some());
    let report = host.tick(SimFrame::new());
    assert!(host.engine.registry().player(EntityId(1)).is_none());
    assert_eq!(report.ops_applied, 1);
    assert_eq!(report.viewers, 0);
}

#[test]
fn physical_crossing_is_client_mediated() {
    let mut a = Host::new(HostId(1), 16);
    let mut b = Host::new(HostId(2), 16);
    let client = Arc::new(RecordingTransport::new());
    let bystander = Arc::new(RecordingTransport::new());

    let ha = a.engine.registry_handle();
    ha.connect_player(PlayerSpec::at(EntityId(1), 9.0, 5.0), client.clone()).unwrap();
    ha.connect_player(PlayerSpec::at(EntityId(2), 2.0, 5.0), bystander.clone()).unwrap();
    a.tick(SimFrame::new());
    a.dispatch_all();

    let report = a.tick(SimFrame::new().with_pose(EntityId(1), 12.0, 5.0, 45.0));
    assert_eq!(report.handoffs, 1);
    a.dispatch_all();

    let handoffs: Vec<_> = client
        .connection_infos()
        .into_iter()
        .filter(|i| i.purpose == ConnectionPurpose::Handoff)
        .collect();
    assert_eq!(handoffs.len(), 1);
    assert_eq!(handoffs[0].host, HostId(2));
    assert_eq!(handoffs[0].port, 9002);
    let carried = handoffs[0].carried.expect("handoff carries state");
    assert_eq!((carried.x, carried.y, carried.angle), (12.0, 5.0, 45.0));

    // Nobody else was pointed at host 2 for a handoff, and host 2 saw
    // nothing until the client showed up.
    assert!(bystander
        .connection_infos()
        .iter()
        .all(|i| i.purpose != ConnectionPurpose::Handoff));
    assert_eq!(b.engine.registry().staged(), 0);
    assert_eq!(b.engine.registry().counts(), (0, 0, 0));

    // Host 1 demotes the entity; repeating the conversion changes nothing.
    let conn = a.engine.registry().player(EntityId(1)).unwrap().link().id();
    ha.convert_to_proxy(EntityId(1), conn).unwrap();
    a.tick(SimFrame::new());
    assert!(a.engine.registry().player(EntityId(1)).is_none());
    assert_eq!(a.engine.registry().proxies().count(), 1);

    // The client's handshake with host 2 materializes it there.
    let hb = b.engine.registry_handle();
    hb.connect_player(PlayerSpec::from(carried), Arc::new(RecordingTransport::new()))
        .unwrap();
    b.tick(SimFrame::new());
    let p = b.engine.registry().player(EntityId(1)).unwrap();
    assert_eq!(p.position(), (12.0, 5.0));
    assert!(b.engine.coordinator().state(EntityId(1)) != tessel_engine::CrossingState::ConvertedToProxy);
}

#[test]
fn removal_staged_mid_tick_is_seen_next_tick() {
    let mut host = Host::new(HostId(1), 16);
    let h = host.engine.registry_handle();
    for id in 1..=3 {
        h.connect_player(
            PlayerSpec::at(EntityId(id), id as f32 * 2.0, 5.0),
            Arc::new(RecordingTransport::new()),
        )
        .unwrap();
    }
    let n = host.tick(SimFrame::new());
    assert_eq!(n.viewers, 3);

    h.disconnect(EntityId(2), None).unwrap();
    // Tick N's scan already ran with entity 2 present.
    let listed: usize = host
        .rx
        .updates
        .try_iter()
        .map(|item| match item.payload {
            tessel_engine::Payload::Updates(list) => list
                .iter()
                .filter(|u| matches!(u, Update::Player(d) if d.id == EntityId(2)))
                .count(),
            _ => 0,
        })
        .sum();
    assert_eq!(listed, 3);

    let next = host.tick(SimFrame::new());
    assert_eq!(next.viewers, 2);
    for item in host.rx.updates.try_iter() {
        if let tessel_engine::Payload::Updates(list) = item.payload {
            assert!(!list
                .iter()
                .any(|u| matches!(u, Update::Player(d) if d.id == EntityId(2))));
        }
    }
}
