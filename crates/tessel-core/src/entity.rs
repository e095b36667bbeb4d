//! The entity model: authoritative players, their cross-host proxies,
//! and projectiles.
//!
//! Physical entities and proxies are separate types rather than one type
//! with no-op overrides. Operations that only make sense for one of them
//! (poses, vitals, interest requests) exist only on that type, and the
//! registry branches explicitly where both can be addressed by the same
//! identity.

use crate::aoi::{clamp_viewpoint, AoiWindow};
use crate::geometry::Rect;
use crate::id::{EntityId, ProjectileId};
use crate::link::Link;
use crate::protocol::{
    DefeatMsg, HandoffState, PlayerDelta, ProjectileDelta, ScoreChangeMsg, ViewpointAck,
};
use std::sync::Arc;

/// Score deducted when an entity is defeated.
pub const DEFEAT_PENALTY: f32 = 200.0;

/// Distance from the shooter at which a projectile spawns.
pub const MUZZLE_OFFSET: f32 = 3.0;

/// Projectile speed as a multiple of the muzzle offset vector.
pub const MUZZLE_VELOCITY_FACTOR: f32 = 3.5;

// ── Lifecycle ───────────────────────────────────────────────────

/// Delivery state of an entity's connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Sends are attempted.
    Active,
    /// A failure was seen or removal was requested; sends are skipped
    /// until the registry drops the entity.
    PendingRemoval,
}

/// The three entity classes the registry keeps separate sequences for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A [`PhysicalEntity`].
    Player,
    /// A [`Projectile`].
    Projectile,
    /// A [`ProxyEntity`].
    Proxy,
}

// ── Physical entity ─────────────────────────────────────────────

/// Everything the handshake service supplies to create a player.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerSpec {
    /// Identity.
    pub id: EntityId,
    /// Spawn position.
    pub x: f32,
    /// Spawn position.
    pub y: f32,
    /// Heading in degrees.
    pub angle: f32,
    /// Full AOI window width.
    pub aoi_width: f32,
    /// Full AOI window height.
    pub aoi_height: f32,
    /// Starting health.
    pub health: f32,
    /// Starting score.
    pub score: f32,
    /// Appearance selector.
    pub visual_tag: u32,
    /// Appearance selector of fired projectiles.
    pub projectile_tag: u32,
}

impl PlayerSpec {
    /// A fresh player at `(x, y)` with full health and default extents.
    pub fn at(id: EntityId, x: f32, y: f32) -> Self {
        Self {
            id,
            x,
            y,
            angle: 0.0,
            aoi_width: 200.0,
            aoi_height: 200.0,
            health: 100.0,
            score: 0.0,
            visual_tag: 0,
            projectile_tag: 0,
        }
    }
}

impl From<HandoffState> for PlayerSpec {
    fn from(s: HandoffState) -> Self {
        Self {
            id: s.id,
            x: s.x,
            y: s.y,
            angle: s.angle,
            aoi_width: s.aoi_width,
            aoi_height: s.aoi_height,
            health: s.health,
            score: s.score,
            visual_tag: s.visual_tag,
            projectile_tag: s.projectile_tag,
        }
    }
}

/// The authoritative, simulated representation of a player.
#[derive(Clone, Debug)]
pub struct PhysicalEntity {
    id: EntityId,
    x: f32,
    y: f32,
    angle: f32,
    /// `None` while the viewpoint follows the position.
    viewpoint: Option<(f32, f32)>,
    aoi_width: f32,
    aoi_height: f32,
    health: f32,
    score: f32,
    visual_tag: u32,
    projectile_tag: u32,
    link: Arc<Link>,
}

impl PhysicalEntity {
    /// Create an entity on a freshly handshaken connection.
    pub fn new(spec: PlayerSpec, link: Arc<Link>) -> Self {
        Self {
            id: spec.id,
            x: spec.x,
            y: spec.y,
            angle: spec.angle.rem_euclid(360.0),
            viewpoint: None,
            aoi_width: spec.aoi_width,
            aoi_height: spec.aoi_height,
            health: spec.health.max(0.0),
            score: spec.score.max(0.0),
            visual_tag: spec.visual_tag,
            projectile_tag: spec.projectile_tag,
            link,
        }
    }

    /// Identity.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Current position.
    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    /// Heading in degrees, `[0, 360)`.
    pub fn angle(&self) -> f32 {
        self.angle
    }

    /// The AOI centre. Defaults to the position until a viewpoint is set.
    pub fn viewpoint(&self) -> (f32, f32) {
        self.viewpoint.unwrap_or((self.x, self.y))
    }

    /// Health, never below zero.
    pub fn health(&self) -> f32 {
        self.health.max(0.0)
    }

    /// Score, never below zero.
    pub fn score(&self) -> f32 {
        self.score.max(0.0)
    }

    /// Appearance selector of fired projectiles.
    pub fn projectile_tag(&self) -> u32 {
        self.projectile_tag
    }

    /// The entity's connection.
    pub fn link(&self) -> &Arc<Link> {
        &self.link
    }

    /// Whether health has reached zero.
    pub fn is_defeated(&self) -> bool {
        self.health <= 0.0
    }

    /// The entity's AOI window, clamped to `bounds`.
    pub fn aoi_window(&self, bounds: &Rect) -> AoiWindow {
        let (vx, vy) = self.viewpoint();
        AoiWindow::from_viewpoint(vx, vy, self.aoi_width / 2.0, self.aoi_height / 2.0, bounds)
    }

    /// Take the pose reported by the simulation step.
    pub fn set_pose(&mut self, x: f32, y: f32, angle: f32) {
        self.x = x;
        self.y = y;
        self.angle = angle.rem_euclid(360.0);
    }

    /// Move the AOI centre. The request is clamped into `bounds` per
    /// axis and the returned ack reports the clamp.
    pub fn set_viewpoint(&mut self, x: f32, y: f32, bounds: &Rect) -> ViewpointAck {
        let v = clamp_viewpoint(bounds, x, y);
        self.viewpoint = Some((v.x, v.y));
        ViewpointAck {
            id: self.id,
            x: self.x,
            y: self.y,
            virtual_x: v.x,
            virtual_y: v.y,
            angle: self.angle,
            window_w: self.aoi_width,
            window_h: self.aoi_height,
            access: v.access,
        }
    }

    /// Apply a signed health change. Returns `true` when this change
    /// defeats the entity; the defeat penalty is applied then. Changes to
    /// an already defeated entity are ignored.
    pub fn apply_health(&mut self, change: f32) -> bool {
        if self.is_defeated() {
            return false;
        }
        if self.health + change > 0.0 {
            self.health += change;
            false
        } else {
            self.health = 0.0;
            self.apply_score(-DEFEAT_PENALTY);
            true
        }
    }

    /// Apply a signed score change, flooring the result at zero.
    pub fn apply_score(&mut self, change: f32) {
        self.score = (self.score + change).max(0.0);
    }

    /// This tick's delta record.
    pub fn player_delta(&self) -> PlayerDelta {
        PlayerDelta {
            id: self.id,
            x: self.x,
            y: self.y,
            angle: self.angle,
            health: self.health(),
            score: self.score(),
            visual_tag: self.visual_tag,
        }
    }

    /// The record shown to viewers in the tick of defeat.
    pub fn defeat_msg(&self) -> DefeatMsg {
        DefeatMsg {
            id: self.id,
            x: self.x,
            y: self.y,
            angle: self.angle,
            score: self.score(),
            visual_tag: self.visual_tag,
        }
    }

    /// Snapshot carried to the next host on a handoff.
    pub fn handoff_state(&self) -> HandoffState {
        let (vx, vy) = self.viewpoint();
        HandoffState {
            id: self.id,
            x: self.x,
            y: self.y,
            angle: self.angle,
            viewpoint_x: vx,
            viewpoint_y: vy,
            aoi_width: self.aoi_width,
            aoi_height: self.aoi_height,
            health: self.health(),
            score: self.score(),
            visual_tag: self.visual_tag,
            projectile_tag: self.projectile_tag,
        }
    }
}

// ── Proxy entity ────────────────────────────────────────────────

/// What a foreign host's handshake supplies to create a proxy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProxySpec {
    /// Identity of the entity it stands in for.
    pub id: EntityId,
    /// AOI centre.
    pub viewpoint_x: f32,
    /// AOI centre.
    pub viewpoint_y: f32,
    /// Full AOI window width.
    pub aoi_width: f32,
    /// Full AOI window height.
    pub aoi_height: f32,
}

/// Outcome of a proxy viewpoint change.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ProxyViewpoint {
    /// The window still overlaps the local territory.
    Accepted(ViewpointAck),
    /// The window left the local territory; the proxy must go.
    Detach,
}

/// A bodiless stand-in receiving AOI deltas for an entity that is
/// authoritative elsewhere.
#[derive(Clone, Debug)]
pub struct ProxyEntity {
    id: EntityId,
    viewpoint: (f32, f32),
    aoi_width: f32,
    aoi_height: f32,
    link: Arc<Link>,
}

impl ProxyEntity {
    /// Create a proxy on a subscription connection.
    pub fn new(spec: ProxySpec, link: Arc<Link>) -> Self {
        Self {
            id: spec.id,
            viewpoint: (spec.viewpoint_x, spec.viewpoint_y),
            aoi_width: spec.aoi_width,
            aoi_height: spec.aoi_height,
            link,
        }
    }

    /// Demote a physical entity after a handoff. The connection is
    /// shared, so a client that has not yet reconnected keeps receiving
    /// updates.
    pub fn from_physical(entity: &PhysicalEntity) -> Self {
        Self {
            id: entity.id,
            viewpoint: entity.viewpoint(),
            aoi_width: entity.aoi_width,
            aoi_height: entity.aoi_height,
            link: Arc::clone(&entity.link),
        }
    }

    /// Identity.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// AOI centre.
    pub fn viewpoint(&self) -> (f32, f32) {
        self.viewpoint
    }

    /// The proxy's connection.
    pub fn link(&self) -> &Arc<Link> {
        &self.link
    }

    /// The proxy's AOI window, clamped to `bounds`.
    pub fn aoi_window(&self, bounds: &Rect) -> AoiWindow {
        AoiWindow::from_viewpoint(
            self.viewpoint.0,
            self.viewpoint.1,
            self.aoi_width / 2.0,
            self.aoi_height / 2.0,
            bounds,
        )
    }

    /// Move the AOI centre if the new window still overlaps the local
    /// territory, as judged by `overlaps_local`.
    pub fn set_viewpoint<F>(&mut self, x: f32, y: f32, bounds: &Rect, overlaps_local: F) -> ProxyViewpoint
    where
        F: Fn(&Rect) -> bool,
    {
        let v = clamp_viewpoint(bounds, x, y);
        let window = AoiWindow::from_viewpoint(
            v.x,
            v.y,
            self.aoi_width / 2.0,
            self.aoi_height / 2.0,
            bounds,
        );
        if !overlaps_local(&window.rect) {
            return ProxyViewpoint::Detach;
        }
        self.viewpoint = (v.x, v.y);
        ProxyViewpoint::Accepted(ViewpointAck {
            id: self.id,
            x: v.x,
            y: v.y,
            virtual_x: v.x,
            virtual_y: v.y,
            angle: 0.0,
            window_w: self.aoi_width,
            window_h: self.aoi_height,
            access: v.access,
        })
    }

    /// Score attribution to forward over this proxy's connection.
    pub fn send_score_change(&self, delta: f32) -> ScoreChangeMsg {
        ScoreChangeMsg { id: self.id, delta }
    }
}

// ── Projectile ──────────────────────────────────────────────────

/// A short-lived projectile, authoritative where it was spawned.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projectile {
    id: ProjectileId,
    owner: EntityId,
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    visual_tag: u32,
}

impl Projectile {
    /// A projectile with explicit motion.
    pub fn new(
        id: ProjectileId,
        owner: EntityId,
        (x, y): (f32, f32),
        (vx, vy): (f32, f32),
        visual_tag: u32,
    ) -> Self {
        Self {
            id,
            owner,
            x,
            y,
            vx,
            vy,
            visual_tag,
        }
    }

    /// Spawn in front of `shooter`, along its heading.
    pub fn fired_from(shooter: &PhysicalEntity, id: ProjectileId) -> Self {
        let rad = shooter.angle.to_radians();
        let (ox, oy) = (MUZZLE_OFFSET * rad.cos(), MUZZLE_OFFSET * rad.sin());
        Self {
            id,
            owner: shooter.id,
            x: shooter.x + ox,
            y: shooter.y + oy,
            vx: ox * MUZZLE_VELOCITY_FACTOR,
            vy: oy * MUZZLE_VELOCITY_FACTOR,
            visual_tag: shooter.projectile_tag,
        }
    }

    /// Identity.
    pub fn id(&self) -> ProjectileId {
        self.id
    }

    /// The entity that fired it.
    pub fn owner(&self) -> EntityId {
        self.owner
    }

    /// Appearance selector.
    pub fn visual_tag(&self) -> u32 {
        self.visual_tag
    }

    /// Current position.
    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    /// Take the motion reported by the simulation step.
    pub fn set_motion(&mut self, x: f32, y: f32, vx: f32, vy: f32) {
        self.x = x;
        self.y = y;
        self.vx = vx;
        self.vy = vy;
    }

    /// This tick's delta record.
    pub fn delta(&self) -> ProjectileDelta {
        ProjectileDelta {
            id: self.id,
            x: self.x,
            y: self.y,
            vx: self.vx,
            vy: self.vy,
        }
    }
}
