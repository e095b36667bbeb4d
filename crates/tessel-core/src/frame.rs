//! The per-step output of the external simulation.

use crate::id::{EntityId, ProjectileId};

/// New pose of one physical entity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PoseUpdate {
    /// Entity.
    pub id: EntityId,
    /// Position.
    pub x: f32,
    /// Position.
    pub y: f32,
    /// Heading in degrees.
    pub angle: f32,
}

/// New motion of one projectile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectileMotion {
    /// Projectile.
    pub id: ProjectileId,
    /// Position.
    pub x: f32,
    /// Position.
    pub y: f32,
    /// Velocity.
    pub vx: f32,
    /// Velocity.
    pub vy: f32,
}

/// Everything one simulation step moved.
///
/// The core only reads frames. Entries for ids the registry does not
/// know (yet, or any more) are ignored when the frame is merged.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SimFrame {
    /// Player poses.
    pub poses: Vec<PoseUpdate>,
    /// Projectile motion.
    pub projectiles: Vec<ProjectileMotion>,
}

impl SimFrame {
    /// An empty frame. Publishing one still counts as a new step.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style pose entry.
    pub fn with_pose(mut self, id: EntityId, x: f32, y: f32, angle: f32) -> Self {
        self.poses.push(PoseUpdate { id, x, y, angle });
        self
    }

    /// Builder-style projectile entry.
    pub fn with_projectile(mut self, id: ProjectileId, x: f32, y: f32, vx: f32, vy: f32) -> Self {
        self.projectiles.push(ProjectileMotion { id, x, y, vx, vy });
        self
    }
}
