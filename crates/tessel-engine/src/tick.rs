//! Interest engine: the per-tick apply, crossing, scan and publish loop.
//!
//! [`InterestEngine`] is a callable struct with no threads of its own.
//! [`HostWorld`](crate::HostWorld) drives it from a dedicated tick
//! thread; tests drive it directly.
//!
//! # Tick phases
//!
//! 1. **Gate.** If the simulation has published no frame since the last
//!    executed tick, the tick is a no-op and staged operations wait.
//! 2. **Apply.** Drain staged registry operations. Control messages they
//!    produced go out ahead of any update list.
//! 3. **Merge.** Fold every unseen frame into the live poses, in order.
//! 4. **Cross.** Evaluate both crossing triggers for each undefeated
//!    physical entity.
//! 5. **Scan.** Compute deltas once, then each deliverable viewer's AOI
//!    list, and offer it to the bounded dispatch queue.
//! 6. **Retire.** Stage removal of entities defeated this tick and
//!    publish a [`LiveSnapshot`].

use std::sync::Arc;
use std::time::Instant;

use tessel_core::{
    EntityId, EntityKind, HostId, ProjectileId, SimFrame, TickId, Update,
};
use tessel_space::Partition;

use crate::crossing::{BoundaryCoordinator, CrossingAction};
use crate::dispatch::{DispatchItem, Dispatcher, Offer, Payload};
use crate::interest::{area_of_interest, compute_deltas};
use crate::metrics::TickReport;
use crate::registry::{ApplyReport, EntityRegistry, RegistryHandle, RegistryOp, RemoveReason};
use crate::ring::SnapshotRing;

// ── LiveSnapshot ─────────────────────────────────────────────────

/// Membership of the live sequences after one executed tick.
#[derive(Clone, Debug, PartialEq)]
pub struct LiveSnapshot {
    /// Registry generation the tick scanned.
    pub generation: u64,
    /// The executed tick.
    pub tick: TickId,
    /// Live physical entities, in scan order.
    pub players: Vec<EntityId>,
    /// Live proxies, in scan order.
    pub proxies: Vec<EntityId>,
    /// Live projectiles, in scan order.
    pub projectiles: Vec<ProjectileId>,
    /// The tick's counters and timings.
    pub report: TickReport,
}

/// Result of [`InterestEngine::execute_tick`].
#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    /// No new frame since the last executed tick.
    Skipped,
    /// The tick ran.
    Executed(TickReport),
}

// ── InterestEngine ───────────────────────────────────────────────

/// Owns the registry, the crossing coordinator and the dispatch producer
/// for one host.
pub struct InterestEngine {
    partition: Arc<Partition>,
    local: HostId,
    registry: EntityRegistry,
    handle: RegistryHandle,
    coordinator: BoundaryCoordinator,
    dispatcher: Dispatcher,
    frames: Arc<SnapshotRing<SimFrame>>,
    live: Arc<SnapshotRing<LiveSnapshot>>,
    /// Write position of the frame ring up to which frames were merged.
    consumed: u64,
    tick: TickId,
}

impl InterestEngine {
    /// Build an engine for `local` that reads frames from `frames` and
    /// publishes into `live`.
    pub fn new(
        partition: Arc<Partition>,
        local: HostId,
        dispatcher: Dispatcher,
        frames: Arc<SnapshotRing<SimFrame>>,
        live: Arc<SnapshotRing<LiveSnapshot>>,
    ) -> Self {
        let registry = EntityRegistry::new(Arc::clone(&partition), local);
        let handle = registry.handle();
        let coordinator = BoundaryCoordinator::new(Arc::clone(&partition), local);
        Self {
            partition,
            local,
            registry,
            handle,
            coordinator,
            dispatcher,
            frames,
            live,
            consumed: 0,
            tick: TickId(0),
        }
    }

    /// A producer handle for the registry.
    pub fn registry_handle(&self) -> RegistryHandle {
        self.handle.clone()
    }

    /// The live sequences.
    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// The crossing coordinator.
    pub fn coordinator(&self) -> &BoundaryCoordinator {
        &self.coordinator
    }

    /// The host this engine serves.
    pub fn local_host(&self) -> HostId {
        self.local
    }

    /// Last executed tick.
    pub fn current_tick(&self) -> TickId {
        self.tick
    }

    /// Run one tick.
    pub fn execute_tick(&mut self) -> TickOutcome {
        let pos = self.frames.write_pos();
        if pos == self.consumed {
            tracing::trace!(tick = self.tick.0, staged = self.registry.staged(), "no new frame, tick skipped");
            return TickOutcome::Skipped;
        }

        let tick_start = Instant::now();
        let mut report = TickReport {
            tick: self.tick.0 + 1,
            ..TickReport::default()
        };

        // 1. Apply staged mutations.
        let applied = self.registry.apply();
        report.generation = applied.generation;
        report.ops_applied = applied.ops;
        let defeated = self.absorb(applied, &mut report);
        report.defeats = defeated.len();
        report.apply_us = tick_start.elapsed().as_micros() as u64;

        // 2. Merge frames and evaluate crossings.
        let crossing_start = Instant::now();
        self.merge_frames(pos, &mut report);
        self.evaluate_crossings(&mut report);
        report.crossing_us = crossing_start.elapsed().as_micros() as u64;

        // 3. Scan and publish.
        let scan_start = Instant::now();
        self.scan(&defeated, &mut report);
        report.scan_us = scan_start.elapsed().as_micros() as u64;

        // 4. Retire defeated entities at the next apply.
        for id in &defeated {
            let connection = self.registry.player(*id).map(|p| p.link().id());
            let staged = self.handle.submit(RegistryOp::Remove {
                id: *id,
                kind: Some(EntityKind::Player),
                connection,
                reason: RemoveReason::Defeated,
            });
            if staged.is_err() {
                tracing::debug!(entity = %id, "registry closed, defeat removal not staged");
            }
        }

        self.consumed = pos;
        self.tick = TickId(self.tick.0 + 1);
        report.total_us = tick_start.elapsed().as_micros() as u64;
        self.publish_live(&report);
        TickOutcome::Executed(report)
    }

    /// Push the partition layout to every live physical entity. Returns
    /// the number of entities addressed.
    pub fn broadcast_tile_layout(&self) -> usize {
        let tiles: Vec<Update> = self
            .partition
            .tile_infos()
            .into_iter()
            .map(Update::Tile)
            .collect();
        let mut sent = 0;
        for p in self.registry.players() {
            self.dispatcher.control(DispatchItem::new(
                p.id(),
                EntityKind::Player,
                Arc::clone(p.link()),
                Payload::Updates(tiles.clone()),
            ));
            sent += 1;
        }
        tracing::debug!(entities = sent, tiles = tiles.len(), "tile layout broadcast");
        sent
    }

    /// Clear the live sequences and crossing state, then release the
    /// dispatch queues. Workers drain what was already queued and exit.
    pub fn stop(mut self) {
        let (players, proxies, projectiles) = self.registry.counts();
        self.registry.clear();
        self.coordinator.clear();
        tracing::debug!(players, proxies, projectiles, tick = self.tick.0, "interest engine stopped");
    }

    // ── Phases ───────────────────────────────────────────────────

    /// Route what the apply produced. Returns the entities defeated by it.
    fn absorb(&mut self, applied: ApplyReport, report: &mut TickReport) -> Vec<EntityId> {
        for id in applied.players_removed.iter().chain(&applied.players_added) {
            self.coordinator.forget(*id);
        }
        for id in &applied.converted {
            self.coordinator.mark_converted(*id);
        }
        if applied.proxies_removed > 0 || !applied.players_removed.is_empty() {
            let registry = &self.registry;
            self.coordinator
                .retain(|id| registry.player(id).is_some() || registry.proxy(id).is_some());
        }

        for item in applied.control {
            self.dispatcher.control(item);
        }

        for req in &applied.interest {
            let Some(entity) = self.registry.player(req.id) else {
                continue;
            };
            if let Some(info) = self.coordinator.request_interest(entity, req.x, req.y) {
                self.dispatcher.control(DispatchItem::new(
                    req.id,
                    EntityKind::Player,
                    Arc::clone(entity.link()),
                    Payload::Connection(vec![info]),
                ));
                report.subscriptions += 1;
            }
        }

        if applied.broadcast_layout {
            self.broadcast_tile_layout();
        }
        applied.defeated
    }

    fn merge_frames(&mut self, pos: u64, report: &mut TickReport) {
        let oldest = pos.saturating_sub(self.frames.capacity() as u64);
        let start = self.consumed.max(oldest);
        report.frames_missed = start - self.consumed;
        for p in start..pos {
            let Some(frame) = self.frames.get_by_pos(p) else {
                report.frames_missed += 1;
                continue;
            };
            for pose in &frame.poses {
                if let Some(entity) = self.registry.player_mut(pose.id) {
                    entity.set_pose(pose.x, pose.y, pose.angle);
                }
            }
            for m in &frame.projectiles {
                if let Some(proj) = self.registry.projectile_mut(m.id) {
                    proj.set_motion(m.x, m.y, m.vx, m.vy);
                }
            }
            report.frames_merged += 1;
        }
        if report.frames_missed > 0 {
            tracing::debug!(missed = report.frames_missed, "frames evicted before merge");
        }
    }

    fn evaluate_crossings(&mut self, report: &mut TickReport) {
        for entity in self.registry.players() {
            if entity.is_defeated() {
                continue;
            }
            for action in self.coordinator.evaluate(entity) {
                match action {
                    CrossingAction::Handoff(info) => {
                        self.dispatcher.control(DispatchItem::new(
                            entity.id(),
                            EntityKind::Player,
                            Arc::clone(entity.link()),
                            Payload::Connection(vec![info]),
                        ));
                        // Demoted at the next apply, only if still on this link.
                        if self.handle.convert_to_proxy(entity.id(), entity.link().id()).is_err() {
                            tracing::debug!(entity = %entity.id(), "registry closed, conversion not staged");
                        }
                        report.handoffs += 1;
                    }
                    CrossingAction::Subscribe(info) => {
                        self.dispatcher.control(DispatchItem::new(
                            entity.id(),
                            EntityKind::Player,
                            Arc::clone(entity.link()),
                            Payload::Connection(vec![info]),
                        ));
                        report.subscriptions += 1;
                    }
                }
            }
        }
    }

    fn scan(&self, defeated: &[EntityId], report: &mut TickReport) {
        let bounds = self.partition.bounds();
        let deltas = compute_deltas(&self.registry, defeated);

        let players = self
            .registry
            .players()
            .map(|p| (p.id(), EntityKind::Player, p.link(), p.aoi_window(bounds)));
        let proxies = self
            .registry
            .proxies()
            .map(|p| (p.id(), EntityKind::Proxy, p.link(), p.aoi_window(bounds)));

        for (id, kind, link, window) in players.chain(proxies) {
            if !link.is_deliverable() {
                continue;
            }
            report.viewers += 1;
            let list = area_of_interest(&window, &deltas);
            let item = DispatchItem::new(id, kind, Arc::clone(link), Payload::Updates(list));
            match self.dispatcher.offer(item) {
                Offer::Queued => report.published += 1,
                Offer::Dropped => report.dropped += 1,
            }
        }
    }

    fn publish_live(&self, report: &TickReport) {
        self.live.push(LiveSnapshot {
            generation: self.registry.generation(),
            tick: self.tick,
            players: self.registry.players().map(|p| p.id()).collect(),
            proxies: self.registry.proxies().map(|p| p.id()).collect(),
            projectiles: self.registry.projectiles().map(|p| p.id()).collect(),
            report: report.clone(),
        });
    }
}
