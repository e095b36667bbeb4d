//! Boundary crossing coordinator.
//!
//! Once per tick, after an entity's new pose is known, the coordinator
//! checks two independent triggers:
//!
//! - **Physical crossing.** The entity's position resolves to another
//!   host. Authority moves there: the client is sent a
//!   `ConnectionInfo{Handoff}` carrying the entity's state, and the local
//!   record is staged for conversion into a proxy. Nothing is sent to the
//!   target host; it materializes the entity on the client's next
//!   handshake. No acknowledgment, no retry.
//! - **AOI crossing.** The position is local but the AOI window reaches
//!   subtiles owned by other hosts. The client is asked to open an
//!   auxiliary subscription to each newly reached host, which then runs a
//!   proxy for it.
//!
//! Both rely on [`Partition::owning_host`] being identical on every host.
//! Two hosts may briefly both (or neither) consider themselves
//! authoritative; conversion is idempotent and resolution deterministic,
//! so the state settles within a tick or two.

use std::collections::HashMap;
use std::sync::Arc;

use smallvec::SmallVec;
use tessel_core::{ConnectionInfo, ConnectionPurpose, EntityId, HostId, PhysicalEntity};
use tessel_space::{HostSet, Partition, SubTile};

/// Per-entity crossing state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CrossingState {
    /// Inside local territory, window entirely local.
    Resident,
    /// Handoff to `target` emitted; conversion staged.
    CrossingPhysical {
        /// Host the entity moved into.
        target: HostId,
    },
    /// Inside local territory, window reaching other hosts.
    CrossingAoi,
    /// Demoted to a proxy on this host.
    ConvertedToProxy,
}

/// Something the engine must send on the entity's own connection.
#[derive(Clone, Debug, PartialEq)]
pub enum CrossingAction {
    /// Authority moves to `info.host`.
    Handoff(ConnectionInfo),
    /// Open an auxiliary subscription to `info.host`.
    Subscribe(ConnectionInfo),
}

#[derive(Debug)]
struct Tracker {
    state: CrossingState,
    /// Subtile the entity was last resolved in.
    cached: Option<SubTile>,
    /// Foreign hosts the client was asked to subscribe to.
    subscribed: HostSet,
}

impl Tracker {
    fn new() -> Self {
        Self {
            state: CrossingState::Resident,
            cached: None,
            subscribed: HostSet::new(),
        }
    }
}

/// Detects crossings and decides what to tell clients.
pub struct BoundaryCoordinator {
    local: HostId,
    partition: Arc<Partition>,
    trackers: HashMap<EntityId, Tracker>,
    lookups: u64,
}

impl BoundaryCoordinator {
    /// A coordinator for `local`.
    pub fn new(partition: Arc<Partition>, local: HostId) -> Self {
        Self {
            local,
            partition,
            trackers: HashMap::new(),
            lookups: 0,
        }
    }

    /// Crossing state of `id`. Untracked entities are resident.
    pub fn state(&self, id: EntityId) -> CrossingState {
        self.trackers
            .get(&id)
            .map_or(CrossingState::Resident, |t| t.state)
    }

    /// Number of full ownership lookups performed (subtile cache misses).
    pub fn lookups(&self) -> u64 {
        self.lookups
    }

    /// Evaluate both triggers for `entity` at its current pose.
    pub fn evaluate(&mut self, entity: &PhysicalEntity) -> SmallVec<[CrossingAction; 2]> {
        let mut actions = SmallVec::new();
        let (x, y) = entity.position();
        let tracker = self.trackers.entry(entity.id()).or_insert_with(Tracker::new);

        let owner = match tracker.cached {
            Some(tile) if tile.contains(x, y) => tile.host,
            _ => {
                let tile = self.partition.subtile_at(x, y);
                self.lookups += 1;
                tracker.cached = Some(tile);
                tile.host
            }
        };

        if owner != self.local {
            if tracker.state == (CrossingState::CrossingPhysical { target: owner }) {
                return actions;
            }
            let info = self.partition.directory().connection_info(
                owner,
                ConnectionPurpose::Handoff,
                Some(entity.handoff_state()),
            );
            let Some(info) = info else {
                tracing::warn!(entity = %entity.id(), host = %owner, "no endpoint for owning host");
                return actions;
            };
            tracker.state = CrossingState::CrossingPhysical { target: owner };
            tracker.subscribed.clear();
            tracing::info!(entity = %entity.id(), from = %self.local, to = %owner, "handoff");
            actions.push(CrossingAction::Handoff(info));
            return actions;
        }

        // Conversion is already staged; moving back does not cancel it.
        if matches!(tracker.state, CrossingState::CrossingPhysical { .. }) {
            return actions;
        }

        let window = entity.aoi_window(self.partition.bounds());
        let mut foreign = self.partition.hosts_in_rect(&window.rect);
        foreign.retain(|h| *h != self.local);
        for host in &foreign {
            if tracker.subscribed.contains(host) {
                continue;
            }
            if let Some(info) = self.partition.directory().connection_info(
                *host,
                ConnectionPurpose::AuxiliarySubscription,
                None,
            ) {
                tracing::debug!(entity = %entity.id(), host = %host, "interest subscription");
                actions.push(CrossingAction::Subscribe(info));
            }
        }
        tracker.state = if foreign.is_empty() {
            CrossingState::Resident
        } else {
            CrossingState::CrossingAoi
        };
        // Hosts that left the window drop out; their proxies detach on
        // their own and may be requested again later.
        tracker.subscribed = foreign;
        actions
    }

    /// Explicit interest in `(x, y)`. Answers only for points inside the
    /// world that another host owns.
    pub fn request_interest(&mut self, entity: &PhysicalEntity, x: f32, y: f32) -> Option<ConnectionInfo> {
        if !self.partition.bounds().contains(x, y) {
            return None;
        }
        let host = self.partition.owning_host(x, y);
        if host == self.local {
            return None;
        }
        let info = self.partition.directory().connection_info(
            host,
            ConnectionPurpose::AuxiliarySubscription,
            None,
        )?;
        let tracker = self.trackers.entry(entity.id()).or_insert_with(Tracker::new);
        if !tracker.subscribed.contains(&host) {
            tracker.subscribed.push(host);
            tracker.subscribed.sort_unstable();
        }
        tracing::debug!(entity = %entity.id(), host = %host, "explicit interest request");
        Some(info)
    }

    /// Record that `id` now lives here as a proxy.
    pub fn mark_converted(&mut self, id: EntityId) {
        let tracker = self.trackers.entry(id).or_insert_with(Tracker::new);
        tracker.state = CrossingState::ConvertedToProxy;
        tracker.cached = None;
        tracker.subscribed.clear();
    }

    /// Drop all state for `id`.
    pub fn forget(&mut self, id: EntityId) {
        self.trackers.remove(&id);
    }

    /// Keep only the entities for which `live` returns `true`.
    pub fn retain<F: FnMut(EntityId) -> bool>(&mut self, mut live: F) {
        self.trackers.retain(|id, _| live(*id));
    }

    /// Number of tracked entities.
    pub fn tracked(&self) -> usize {
        self.trackers.len()
    }

    /// Drop all state.
    pub fn clear(&mut self) {
        self.trackers.clear();
    }
}
