//! Two hosts in one process, one player walking across the boundary.
//!
//! Run with `RUST_LOG=tessel_engine=debug` to watch the handoff.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tessel_core::{
    ConnectionInfo, ConnectionPurpose, EntityId, HandoffState, HostId, PlayerSpec, Rect,
    ScoreChangeMsg, SimFrame, Transport, TransportError, Update,
};
use tessel_engine::{HostWorld, WorldConfig};
use tessel_space::{HostEndpoint, PartitionConfig};
use tracing_subscriber::EnvFilter;

/// Stands in for the client end of one connection.
#[derive(Default)]
struct Client {
    updates: AtomicUsize,
    handoff: Mutex<Option<HandoffState>>,
}

impl Transport for Client {
    fn send(&self, updates: &[Update]) -> Result<(), TransportError> {
        self.updates.fetch_add(updates.len(), Ordering::Relaxed);
        Ok(())
    }

    fn send_connection_info(&self, infos: &[ConnectionInfo]) -> Result<(), TransportError> {
        for info in infos {
            tracing::info!(host = %info.host, port = info.port, purpose = ?info.purpose, "client told to connect");
            if info.purpose == ConnectionPurpose::Handoff {
                if let Ok(mut slot) = self.handoff.lock() {
                    *slot = info.carried;
                }
            }
        }
        Ok(())
    }

    fn send_score_change(&self, _changes: &[ScoreChangeMsg]) -> Result<(), TransportError> {
        Ok(())
    }

    fn close(&self) {}
}

fn partition() -> PartitionConfig {
    let hosts = (1..=2)
        .map(|id| HostEndpoint {
            id: HostId(id),
            address: "127.0.0.1".into(),
            port: 7000 + id as u16,
        })
        .collect();
    PartitionConfig::from_fn(Rect::new(0.0, 0.0, 200.0, 100.0), 50.0, 50.0, hosts, |col, _| {
        HostId(1 + col / 2)
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let configs = [1, 2].map(|h| {
        let mut cfg = WorldConfig::new(partition(), HostId(h));
        cfg.tick_interval_ms = 20;
        cfg.worker_count = Some(2);
        cfg
    });
    for cfg in &configs {
        cfg.validate()?;
    }
    let [cfg_a, cfg_b] = configs;
    let mut host_a = HostWorld::new(cfg_a)?;
    let mut host_b = HostWorld::new(cfg_b)?;

    let me = EntityId(42);
    let client = Arc::new(Client::default());
    let mut spec = PlayerSpec::at(me, 20.0, 50.0);
    spec.aoi_width = 40.0;
    spec.aoi_height = 40.0;
    host_a.registry().connect_player(spec, client.clone())?;

    let mut x = 20.0;
    let mut moved = false;
    for _ in 0..60 {
        x += 3.0;
        host_a.publish_frame(SimFrame::new().with_pose(me, x, 50.0, 0.0))?;
        host_b.publish_frame(SimFrame::new().with_pose(me, x, 50.0, 0.0))?;
        thread::sleep(Duration::from_millis(20));

        let carried = client.handoff.lock().ok().and_then(|mut s| s.take());
        if let Some(state) = carried {
            // The client reconnects to the host it was pointed at.
            let mut spec = PlayerSpec::from(state);
            spec.x = x;
            host_b.registry().connect_player(spec, client.clone())?;
            moved = true;
        }
    }

    thread::sleep(Duration::from_millis(100));
    let a = host_a.latest_live();
    let b = host_b.latest_live();
    tracing::info!(
        moved,
        updates = client.updates.load(Ordering::Relaxed),
        host_a_proxies = a.map_or(0, |s| s.proxies.len()),
        host_b_players = b.map_or(0, |s| s.players.len()),
        "walk finished"
    );

    host_a.shutdown();
    host_b.shutdown();
    Ok(())
}
