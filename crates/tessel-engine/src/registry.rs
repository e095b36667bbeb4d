//! Entity registry with staged, tick-boundary mutation.
//!
//! Producers (network handlers, the simulation bridge, dispatch workers
//! and the engine itself) never touch the live sequences. They stage
//! [`RegistryOp`]s through a cloneable [`RegistryHandle`]; the tick
//! thread drains them in FIFO order in one [`EntityRegistry::apply`] call
//! at the start of each tick. Between applies the live sequences are
//! only read, so the scan and the dispatch workers see one consistent
//! set for the whole tick.
//!
//! An apply only drains the operations that were queued when it began.
//! Anything staged during the apply, or later in the tick, lands in the
//! next tick's apply.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use indexmap::IndexMap;
use tessel_core::{
    ConnectionId, EntityId, EntityKind, HostId, Link, PhysicalEntity, PlayerSpec, Projectile,
    ProjectileId, ProxyEntity, ProxySpec, ProxyViewpoint, Transport, Update,
};
use tessel_space::Partition;

use crate::dispatch::{DispatchItem, Payload};

// ── Error types ──────────────────────────────────────────────────

/// Error staging an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    /// The host has shut down; nothing will apply the operation.
    #[error("host has shut down")]
    Shutdown,
}

// ── Operations ───────────────────────────────────────────────────

/// Why an entity is being removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoveReason {
    /// The handshake service reported a disconnect.
    Disconnect,
    /// A dispatch worker saw a transport failure.
    TransportFailure,
    /// Health reached zero.
    Defeated,
    /// A proxy's window left the local territory.
    Detached,
}

/// A staged registry mutation.
#[derive(Debug)]
pub enum RegistryOp {
    /// Materialize a physical entity after a successful handshake.
    ConnectPlayer {
        /// Initial state.
        spec: PlayerSpec,
        /// The client connection.
        link: Arc<Link>,
    },
    /// Materialize a proxy for a foreign entity's subscription.
    ConnectProxy {
        /// Initial viewpoint and extents.
        spec: ProxySpec,
        /// The subscription connection.
        link: Arc<Link>,
    },
    /// Add or replace a projectile.
    AddProjectile(Projectile),
    /// Drop a projectile.
    RemoveProjectile(ProjectileId),
    /// Drop an entity.
    Remove {
        /// Identity.
        id: EntityId,
        /// Restrict to one sequence; `None` removes from both.
        kind: Option<EntityKind>,
        /// Only remove while the entity is still on this connection.
        connection: Option<ConnectionId>,
        /// For logs.
        reason: RemoveReason,
    },
    /// Move an entity's AOI centre.
    SetViewpoint {
        /// Identity.
        id: EntityId,
        /// Requested centre.
        x: f32,
        /// Requested centre.
        y: f32,
    },
    /// Explicit interest in a point outside the local territory.
    RequestInterest {
        /// Identity.
        id: EntityId,
        /// Point of interest.
        x: f32,
        /// Point of interest.
        y: f32,
    },
    /// Signed health change.
    AdjustHealth {
        /// Identity.
        id: EntityId,
        /// Change.
        delta: f32,
    },
    /// Signed score change.
    AdjustScore {
        /// Identity.
        id: EntityId,
        /// Change.
        delta: f32,
    },
    /// Demote a physical entity to a proxy after a handoff.
    ConvertToProxy {
        /// Identity.
        id: EntityId,
        /// Only convert while the entity is still on this connection.
        connection: ConnectionId,
    },
    /// Push the partition layout to every physical entity.
    BroadcastLayout,
}

// ── RegistryHandle ───────────────────────────────────────────────

/// Cloneable producer side of the registry's staging queue.
#[derive(Clone, Debug)]
pub struct RegistryHandle {
    tx: Sender<RegistryOp>,
}

impl RegistryHandle {
    /// A handle whose operations are read by the caller instead of a
    /// registry.
    pub fn detached() -> (Self, Receiver<RegistryOp>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx }, rx)
    }

    /// Stage a raw operation.
    pub fn submit(&self, op: RegistryOp) -> Result<(), SubmitError> {
        self.tx.send(op).map_err(|_| SubmitError::Shutdown)
    }

    /// Stage a new physical entity on `transport`. Returns the id of the
    /// connection wrapping it.
    pub fn connect_player(
        &self,
        spec: PlayerSpec,
        transport: Arc<dyn Transport>,
    ) -> Result<ConnectionId, SubmitError> {
        let link = Arc::new(Link::new(transport));
        let id = link.id();
        self.submit(RegistryOp::ConnectPlayer { spec, link })?;
        Ok(id)
    }

    /// Stage a new proxy on `transport`.
    pub fn connect_proxy(
        &self,
        spec: ProxySpec,
        transport: Arc<dyn Transport>,
    ) -> Result<ConnectionId, SubmitError> {
        let link = Arc::new(Link::new(transport));
        let id = link.id();
        self.submit(RegistryOp::ConnectProxy { spec, link })?;
        Ok(id)
    }

    /// Stage a projectile.
    pub fn add_projectile(&self, projectile: Projectile) -> Result<(), SubmitError> {
        self.submit(RegistryOp::AddProjectile(projectile))
    }

    /// Stage a projectile removal.
    pub fn remove_projectile(&self, id: ProjectileId) -> Result<(), SubmitError> {
        self.submit(RegistryOp::RemoveProjectile(id))
    }

    /// Stage removal of whatever `id` is on `connection` (or on any
    /// connection when `None`).
    pub fn disconnect(&self, id: EntityId, connection: Option<ConnectionId>) -> Result<(), SubmitError> {
        self.submit(RegistryOp::Remove {
            id,
            kind: None,
            connection,
            reason: RemoveReason::Disconnect,
        })
    }

    /// Stage removal after a transport failure on `connection`.
    ///
    /// Matches whichever sequence holds `id` on that connection when the
    /// removal applies, so a player converted to a proxy in between is
    /// still removed.
    pub fn remove_on_failure(&self, id: EntityId, connection: ConnectionId) -> Result<(), SubmitError> {
        self.submit(RegistryOp::Remove {
            id,
            kind: None,
            connection: Some(connection),
            reason: RemoveReason::TransportFailure,
        })
    }

    /// Stage a viewpoint change.
    pub fn set_viewpoint(&self, id: EntityId, x: f32, y: f32) -> Result<(), SubmitError> {
        self.submit(RegistryOp::SetViewpoint { id, x, y })
    }

    /// Stage an explicit interest request.
    pub fn request_interest(&self, id: EntityId, x: f32, y: f32) -> Result<(), SubmitError> {
        self.submit(RegistryOp::RequestInterest { id, x, y })
    }

    /// Stage a health change.
    pub fn adjust_health(&self, id: EntityId, delta: f32) -> Result<(), SubmitError> {
        self.submit(RegistryOp::AdjustHealth { id, delta })
    }

    /// Stage a score change.
    pub fn adjust_score(&self, id: EntityId, delta: f32) -> Result<(), SubmitError> {
        self.submit(RegistryOp::AdjustScore { id, delta })
    }

    /// Stage conversion of a physical entity to a proxy.
    pub fn convert_to_proxy(&self, id: EntityId, connection: ConnectionId) -> Result<(), SubmitError> {
        self.submit(RegistryOp::ConvertToProxy { id, connection })
    }

    /// Stage a layout broadcast.
    pub fn broadcast_tile_layout(&self) -> Result<(), SubmitError> {
        self.submit(RegistryOp::BroadcastLayout)
    }
}

// ── ApplyReport ──────────────────────────────────────────────────

/// A point of interest an entity asked for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InterestRequest {
    /// Asking entity.
    pub id: EntityId,
    /// Point.
    pub x: f32,
    /// Point.
    pub y: f32,
}

/// What one [`EntityRegistry::apply`] did.
#[derive(Debug, Default)]
pub struct ApplyReport {
    /// Generation of the live sequences after this apply.
    pub generation: u64,
    /// Operations drained.
    pub ops: usize,
    /// Physical entities added (including reconnects).
    pub players_added: Vec<EntityId>,
    /// Physical entities removed, not counting conversions.
    pub players_removed: Vec<EntityId>,
    /// Physical entities converted to proxies.
    pub converted: Vec<EntityId>,
    /// Proxies added.
    pub proxies_added: usize,
    /// Proxies removed.
    pub proxies_removed: usize,
    /// Physical entities defeated by this apply. They stay live for the
    /// current tick so viewers see the defeat.
    pub defeated: Vec<EntityId>,
    /// Messages to queue ahead of this tick's update lists.
    pub control: Vec<DispatchItem>,
    /// Interest requests for the crossing coordinator.
    pub interest: Vec<InterestRequest>,
    /// Whether a layout broadcast was requested.
    pub broadcast_layout: bool,
}

// ── EntityRegistry ───────────────────────────────────────────────

/// The live entity sequences of one host.
///
/// Owned by the tick thread. Keyed by identity, in insertion order, so
/// the scan is deterministic for a given sequence of operations.
pub struct EntityRegistry {
    rx: Receiver<RegistryOp>,
    tx: Sender<RegistryOp>,
    partition: Arc<Partition>,
    local: HostId,
    players: IndexMap<EntityId, PhysicalEntity>,
    proxies: IndexMap<EntityId, ProxyEntity>,
    projectiles: IndexMap<ProjectileId, Projectile>,
    generation: u64,
}

impl EntityRegistry {
    /// An empty registry for `local`'s territory.
    pub fn new(partition: Arc<Partition>, local: HostId) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            rx,
            tx,
            partition,
            local,
            players: IndexMap::new(),
            proxies: IndexMap::new(),
            projectiles: IndexMap::new(),
            generation: 0,
        }
    }

    /// A new producer handle.
    pub fn handle(&self) -> RegistryHandle {
        RegistryHandle {
            tx: self.tx.clone(),
        }
    }

    /// Generation of the live sequences.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Operations waiting for the next apply.
    pub fn staged(&self) -> usize {
        self.rx.len()
    }

    /// Live physical entities.
    pub fn players(&self) -> impl Iterator<Item = &PhysicalEntity> {
        self.players.values()
    }

    /// Live proxies.
    pub fn proxies(&self) -> impl Iterator<Item = &ProxyEntity> {
        self.proxies.values()
    }

    /// Live projectiles.
    pub fn projectiles(&self) -> impl Iterator<Item = &Projectile> {
        self.projectiles.values()
    }

    /// A live physical entity.
    pub fn player(&self, id: EntityId) -> Option<&PhysicalEntity> {
        self.players.get(&id)
    }

    pub(crate) fn player_mut(&mut self, id: EntityId) -> Option<&mut PhysicalEntity> {
        self.players.get_mut(&id)
    }

    pub(crate) fn projectile_mut(&mut self, id: ProjectileId) -> Option<&mut Projectile> {
        self.projectiles.get_mut(&id)
    }

    /// A live proxy.
    pub fn proxy(&self, id: EntityId) -> Option<&ProxyEntity> {
        self.proxies.get(&id)
    }

    /// Counts of `(players, proxies, projectiles)`.
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.players.len(), self.proxies.len(), self.projectiles.len())
    }

    /// Drop every live entity. Staged operations are kept.
    pub fn clear(&mut self) {
        self.players.clear();
        self.proxies.clear();
        self.projectiles.clear();
    }

    /// Drain the operations staged so far and apply them in order.
    pub fn apply(&mut self) -> ApplyReport {
        let mut report = ApplyReport::default();
        let pending = self.rx.len();
        for _ in 0..pending {
            let Ok(op) = self.rx.try_recv() else { break };
            report.ops += 1;
            self.apply_one(op, &mut report);
        }
        self.generation += 1;
        report.generation = self.generation;
        if report.ops > 0 {
            tracing::debug!(
                generation = self.generation,
                ops = report.ops,
                players = self.players.len(),
                proxies = self.proxies.len(),
                projectiles = self.projectiles.len(),
                "registry applied"
            );
        }
        report
    }

    fn apply_one(&mut self, op: RegistryOp, report: &mut ApplyReport) {
        match op {
            RegistryOp::ConnectPlayer { spec, link } => self.connect_player(spec, link, report),
            RegistryOp::ConnectProxy { spec, link } => self.connect_proxy(spec, link, report),
            RegistryOp::AddProjectile(p) => {
                self.projectiles.insert(p.id(), p);
            }
            RegistryOp::RemoveProjectile(id) => {
                self.projectiles.shift_remove(&id);
            }
            RegistryOp::Remove {
                id,
                kind,
                connection,
                reason,
            } => self.remove(id, kind, connection, reason, report),
            RegistryOp::SetViewpoint { id, x, y } => self.set_viewpoint(id, x, y, report),
            RegistryOp::RequestInterest { id, x, y } => {
                if self.players.contains_key(&id) {
                    report.interest.push(InterestRequest { id, x, y });
                } else {
                    // Proxies never ask; their entity's own host does.
                    tracing::trace!(entity = %id, "interest request ignored, not a local player");
                }
            }
            RegistryOp::AdjustHealth { id, delta } => {
                if let Some(p) = self.players.get_mut(&id) {
                    if p.apply_health(delta) {
                        report.defeated.push(id);
                    }
                }
            }
            RegistryOp::AdjustScore { id, delta } => {
                if let Some(p) = self.players.get_mut(&id) {
                    p.apply_score(delta);
                } else if let Some(proxy) = self.proxies.get(&id) {
                    report.control.push(DispatchItem::new(
                        id,
                        EntityKind::Proxy,
                        Arc::clone(proxy.link()),
                        Payload::ScoreChange(vec![proxy.send_score_change(delta)]),
                    ));
                }
            }
            RegistryOp::ConvertToProxy { id, connection } => self.convert(id, connection, report),
            RegistryOp::BroadcastLayout => report.broadcast_layout = true,
        }
    }

    fn connect_player(&mut self, spec: PlayerSpec, link: Arc<Link>, report: &mut ApplyReport) {
        let id = spec.id;
        let entity = PhysicalEntity::new(spec, link);
        // Arriving with no health counts as a defeat in this apply, so the
        // entity is shown once and retired like any other.
        let arrived_defeated = entity.is_defeated();
        if let Some(old) = self.players.insert(id, entity) {
            tracing::warn!(entity = %id, old = %old.link().id(), "duplicate identity, superseding connection");
            old.link().close();
            report.players_removed.push(id);
        }
        if let Some(proxy) = self.proxies.shift_remove(&id) {
            // The new physical entity supersedes the stand-in.
            if self.players.get(&id).map(|p| p.link().id()) != Some(proxy.link().id()) {
                proxy.link().close();
            }
            report.proxies_removed += 1;
        }
        report.players_added.push(id);
        if arrived_defeated {
            tracing::debug!(entity = %id, "player connected with no health, defeated");
            report.defeated.push(id);
        }
    }

    fn connect_proxy(&mut self, spec: ProxySpec, link: Arc<Link>, report: &mut ApplyReport) {
        let id = spec.id;
        if self.players.contains_key(&id) {
            tracing::warn!(entity = %id, "proxy requested for a local physical entity, refused");
            link.close();
            return;
        }
        if let Some(old) = self.proxies.insert(id, ProxyEntity::new(spec, link)) {
            old.link().close();
            report.proxies_removed += 1;
        }
        report.proxies_added += 1;
        tracing::debug!(entity = %id, "proxy subscribed");
    }

    fn remove(
        &mut self,
        id: EntityId,
        kind: Option<EntityKind>,
        connection: Option<ConnectionId>,
        reason: RemoveReason,
        report: &mut ApplyReport,
    ) {
        let matches = |link: &Arc<Link>| connection.is_none_or(|c| link.id() == c);

        if kind.is_none() || kind == Some(EntityKind::Player) {
            if self.players.get(&id).is_some_and(|p| matches(p.link())) {
                self.players.shift_remove(&id);
                report.players_removed.push(id);
                tracing::debug!(entity = %id, ?reason, "player removed");
            }
        }
        if kind.is_none() || kind == Some(EntityKind::Proxy) {
            if self.proxies.get(&id).is_some_and(|p| matches(p.link())) {
                self.proxies.shift_remove(&id);
                report.proxies_removed += 1;
                tracing::debug!(entity = %id, ?reason, "proxy removed");
            }
        }
    }

    fn set_viewpoint(&mut self, id: EntityId, x: f32, y: f32, report: &mut ApplyReport) {
        let bounds = *self.partition.bounds();
        if let Some(p) = self.players.get_mut(&id) {
            let ack = p.set_viewpoint(x, y, &bounds);
            report.control.push(DispatchItem::new(
                id,
                EntityKind::Player,
                Arc::clone(p.link()),
                Payload::Updates(vec![Update::Viewpoint(ack)]),
            ));
            return;
        }
        let Some(proxy) = self.proxies.get_mut(&id) else {
            return;
        };
        let partition = &self.partition;
        let local = self.local;
        match proxy.set_viewpoint(x, y, &bounds, |r| partition.rect_touches_host(r, local)) {
            ProxyViewpoint::Accepted(ack) => report.control.push(DispatchItem::new(
                id,
                EntityKind::Proxy,
                Arc::clone(proxy.link()),
                Payload::Updates(vec![Update::Viewpoint(ack)]),
            )),
            ProxyViewpoint::Detach => {
                let link = Arc::clone(proxy.link());
                link.mark_pending_removal();
                report.control.push(DispatchItem::new(
                    id,
                    EntityKind::Proxy,
                    Arc::clone(&link),
                    Payload::Close(vec![Update::Detached { id }]),
                ));
                // Staged, so the proxy leaves at the next apply. The
                // registry owns the receiver, so the send cannot fail.
                if self
                    .tx
                    .send(RegistryOp::Remove {
                        id,
                        kind: Some(EntityKind::Proxy),
                        connection: Some(link.id()),
                        reason: RemoveReason::Detached,
                    })
                    .is_err()
                {
                    tracing::debug!(entity = %id, "registry queue closed, detach not staged");
                }
                tracing::debug!(entity = %id, "proxy window left local territory, detaching");
            }
        }
    }

    fn convert(&mut self, id: EntityId, connection: ConnectionId, report: &mut ApplyReport) {
        let Some(entity) = self.players.get(&id) else {
            return;
        };
        if entity.link().id() != connection {
            return;
        }

        // A connection that already failed is not worth a proxy.
        if !entity.link().is_deliverable() {
            self.players.shift_remove(&id);
            report.players_removed.push(id);
            tracing::debug!(entity = %id, "handoff on a failed connection, player removed");
            return;
        }

        let proxy = ProxyEntity::from_physical(entity);
        let window = proxy.aoi_window(self.partition.bounds());
        if !self.partition.rect_touches_host(&window.rect, self.local) {
            let link = Arc::clone(proxy.link());
            link.mark_pending_removal();
            self.players.shift_remove(&id);
            report.players_removed.push(id);
            report.control.push(DispatchItem::new(
                id,
                EntityKind::Proxy,
                link,
                Payload::Close(vec![Update::Detached { id }]),
            ));
            tracing::debug!(entity = %id, "handoff window outside local territory, detaching");
            return;
        }

        self.players.shift_remove(&id);
        if let Some(old) = self.proxies.insert(id, proxy) {
            if old.link().id() != connection {
                old.link().close();
            }
        } else {
            report.proxies_added += 1;
        }
        report.converted.push(id);
    }
}
