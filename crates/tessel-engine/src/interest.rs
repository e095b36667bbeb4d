//! Delta computation and AOI membership.
//!
//! Both are pure functions of the live sequences, run once per tick on
//! the tick thread. Deltas are computed once and shared by every
//! viewer's membership test.

use indexmap::IndexMap;
use tessel_core::{AoiWindow, DefeatMsg, EntityId, PlayerDelta, ProjectileDelta, ProjectileId, Update};

use crate::registry::EntityRegistry;

/// Delta records for one tick, keyed by identity, in registry order.
#[derive(Clone, Debug, Default)]
pub struct Deltas {
    /// Live, undefeated physical entities.
    pub players: IndexMap<EntityId, PlayerDelta>,
    /// Live projectiles.
    pub projectiles: IndexMap<ProjectileId, ProjectileDelta>,
    /// Entities defeated this tick.
    pub defeats: IndexMap<EntityId, DefeatMsg>,
}

impl Deltas {
    /// Total number of records.
    pub fn len(&self) -> usize {
        self.players.len() + self.projectiles.len() + self.defeats.len()
    }

    /// Whether there is nothing to show anyone.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Compute this tick's delta records.
///
/// An entity in `defeated` is reported once as a [`DefeatMsg`] instead
/// of a [`PlayerDelta`].
pub fn compute_deltas(registry: &EntityRegistry, defeated: &[EntityId]) -> Deltas {
    let mut deltas = Deltas::default();
    for p in registry.players() {
        if defeated.contains(&p.id()) {
            deltas.defeats.insert(p.id(), p.defeat_msg());
        } else {
            deltas.players.insert(p.id(), p.player_delta());
        }
    }
    for proj in registry.projectiles() {
        deltas.projectiles.insert(proj.id(), proj.delta());
    }
    deltas
}

/// The update list for a viewer with `window`: every record whose
/// position lies inside the window (edges inclusive), players first,
/// then projectiles, then defeats.
pub fn area_of_interest(window: &AoiWindow, deltas: &Deltas) -> Vec<Update> {
    let players = deltas
        .players
        .values()
        .filter(|d| window.contains(d.x, d.y))
        .map(|d| Update::Player(*d));
    let projectiles = deltas
        .projectiles
        .values()
        .filter(|d| window.contains(d.x, d.y))
        .map(|d| Update::Projectile(*d));
    let defeats = deltas
        .defeats
        .values()
        .filter(|d| window.contains(d.x, d.y))
        .map(|d| Update::Defeat(*d));
    players.chain(projectiles).chain(defeats).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;
    use tessel_core::{EntityId, HostId, PlayerSpec, Projectile, Rect};
    use tessel_space::Partition;
    use tessel_test_utils::{two_host_partition, RecordingTransport};

    fn bounds() -> Rect {
        Rect::new(0.0, 0.0, 20.0, 10.0)
    }

    fn populated() -> EntityRegistry {
        let partition = Arc::new(Partition::new(two_host_partition()).unwrap());
        let mut reg = EntityRegistry::new(partition, HostId(1));
        let h = reg.handle();
        for (i, x) in [2.0, 6.0, 9.0].into_iter().enumerate() {
            h.connect_player(
                PlayerSpec::at(EntityId(i as u64 + 1), x, 5.0),
                Arc::new(RecordingTransport::new()),
            )
            .unwrap();
        }
        h.add_projectile(Projectile::new(ProjectileId(1), EntityId(1), (3.0, 5.0), (1.0, 0.0), 0))
            .unwrap();
        reg.apply();
        reg
    }

    #[test]
    fn defeated_entities_become_defeat_records() {
        let reg = populated();
        let deltas = compute_deltas(&reg, &[EntityId(2)]);
        assert_eq!(deltas.players.len(), 2);
        assert!(!deltas.players.contains_key(&EntityId(2)));
        assert!(deltas.defeats.contains_key(&EntityId(2)));
        assert_eq!(deltas.projectiles.len(), 1);
        assert_eq!(deltas.len(), 4);
    }

    #[test]
    fn membership_order_is_players_projectiles_defeats() {
        let reg = populated();
        let deltas = compute_deltas(&reg, &[EntityId(1)]);
        let window = AoiWindow::from_viewpoint(4.0, 5.0, 3.0, 3.0, &bounds());
        let list = area_of_interest(&window, &deltas);
        let kinds: Vec<_> = list
            .iter()
            .map(|u| match u {
                Update::Player(d) => ("player", d.id.0),
                Update::Projectile(d) => ("projectile", d.id.0),
                Update::Defeat(d) => ("defeat", d.id.0),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(kinds, vec![("player", 2), ("projectile", 1), ("defeat", 1)]);
    }

    #[test]
    fn window_edges_are_inclusive() {
        let reg = populated();
        let deltas = compute_deltas(&reg, &[]);
        // Window spans exactly [6, 9] on x.
        let window = AoiWindow::from_viewpoint(7.5, 5.0, 1.5, 1.0, &bounds());
        let ids: Vec<_> = area_of_interest(&window, &deltas)
            .into_iter()
            .filter_map(|u| match u {
                Update::Player(d) => Some(d.id),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec![EntityId(2), EntityId(3)]);
    }

    #[test]
    fn empty_world_yields_empty_lists() {
        let deltas = Deltas::default();
        assert!(deltas.is_empty());
        let window = AoiWindow::from_viewpoint(5.0, 5.0, 100.0, 100.0, &bounds());
        assert!(area_of_interest(&window, &deltas).is_empty());
    }

    proptest! {
        #[test]
        fn every_listed_record_is_inside_window(
            vx in -10.0f32..30.0,
            vy in -10.0f32..20.0,
            half in 0.5f32..8.0,
        ) {
            let reg = populated();
            let deltas = compute_deltas(&reg, &[]);
            let window = AoiWindow::from_viewpoint(vx, vy, half, half, &bounds());
            for update in area_of_interest(&window, &deltas) {
                let (x, y) = match update {
                    Update::Player(d) => (d.x, d.y),
                    Update::Projectile(d) => (d.x, d.y),
                    Update::Defeat(d) => (d.x, d.y),
                    _ => unreachable!(),
                };
                prop_assert!(window.contains(x, y));
            }
        }
    }
}
