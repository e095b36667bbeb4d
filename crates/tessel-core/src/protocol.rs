//! Records pushed to clients.
//!
//! These are semantic shapes, not a binary format. They derive serde so
//! whichever encoder the transport uses can serialise them directly.

use crate::aoi::AxisAccess;
use crate::id::{EntityId, HostId, ProjectileId};
use serde::{Deserialize, Serialize};

/// Per-tick state of a physical entity as shown to viewers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerDelta {
    /// Entity identity.
    pub id: EntityId,
    /// Horizontal position.
    pub x: f32,
    /// Vertical position.
    pub y: f32,
    /// Heading in degrees, `[0, 360)`.
    pub angle: f32,
    /// Current health, never negative.
    pub health: f32,
    /// Current score, never negative.
    pub score: f32,
    /// Client-side appearance selector.
    pub visual_tag: u32,
}

/// Per-tick state of a projectile.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectileDelta {
    /// Projectile identity.
    pub id: ProjectileId,
    /// Horizontal position.
    pub x: f32,
    /// Vertical position.
    pub y: f32,
    /// Horizontal velocity.
    pub vx: f32,
    /// Vertical velocity.
    pub vy: f32,
}

/// Emitted once, in the tick an entity is defeated.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DefeatMsg {
    /// Defeated entity.
    pub id: EntityId,
    /// Position at defeat.
    pub x: f32,
    /// Position at defeat.
    pub y: f32,
    /// Heading at defeat.
    pub angle: f32,
    /// Score after the defeat penalty.
    pub score: f32,
    /// Client-side appearance selector.
    pub visual_tag: u32,
}

/// Reply to a viewpoint change.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewpointAck {
    /// Entity identity.
    pub id: EntityId,
    /// Entity position (the viewpoint for proxies, which have none).
    pub x: f32,
    /// Entity position (the viewpoint for proxies, which have none).
    pub y: f32,
    /// Clamped viewpoint.
    pub virtual_x: f32,
    /// Clamped viewpoint.
    pub virtual_y: f32,
    /// Heading in degrees.
    pub angle: f32,
    /// Full window width.
    pub window_w: f32,
    /// Full window height.
    pub window_h: f32,
    /// Per-axis clamp report.
    pub access: AxisAccess,
}

/// Why a client is being pointed at another host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionPurpose {
    /// Authority for the entity moves to the named host.
    Handoff,
    /// Keep the current host and additionally subscribe to the named one
    /// through a second client connection.
    AuxiliarySubscription,
}

/// Entity state handed to the client on a handoff so it can present it
/// to the next host's handshake.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HandoffState {
    /// Entity identity.
    pub id: EntityId,
    /// Position.
    pub x: f32,
    /// Position.
    pub y: f32,
    /// Heading.
    pub angle: f32,
    /// Viewpoint.
    pub viewpoint_x: f32,
    /// Viewpoint.
    pub viewpoint_y: f32,
    /// Full AOI window width.
    pub aoi_width: f32,
    /// Full AOI window height.
    pub aoi_height: f32,
    /// Health.
    pub health: f32,
    /// Score.
    pub score: f32,
    /// Appearance selector.
    pub visual_tag: u32,
    /// Appearance selector of fired projectiles.
    pub projectile_tag: u32,
}

/// Connection details of another host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Target host.
    pub host: HostId,
    /// Network address of the target host.
    pub address: String,
    /// Port of the target host.
    pub port: u16,
    /// What the client should do with it.
    pub purpose: ConnectionPurpose,
    /// State snapshot, present on handoffs only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carried: Option<HandoffState>,
}

/// Score attribution forwarded to a client through a proxy.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreChangeMsg {
    /// Entity receiving the score.
    pub id: EntityId,
    /// Signed change.
    pub delta: f32,
}

/// One subtile of the layout broadcast.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileInfo {
    /// Subtile origin.
    pub origin_x: f32,
    /// Subtile origin.
    pub origin_y: f32,
    /// Subtile extent.
    pub width: f32,
    /// Subtile extent.
    pub height: f32,
    /// Owner.
    pub host: HostId,
}

/// A record in a viewer's update list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Update {
    /// A physical entity inside the window.
    Player(PlayerDelta),
    /// A projectile inside the window.
    Projectile(ProjectileDelta),
    /// An entity defeated inside the window this tick.
    Defeat(DefeatMsg),
    /// Reply to the viewer's own viewpoint change.
    Viewpoint(ViewpointAck),
    /// The viewer's proxy on this host closed because its window left
    /// the host's territory.
    Detached {
        /// The proxy's identity.
        id: EntityId,
    },
    /// A subtile of the partition layout.
    Tile(TileInfo),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_is_tagged() {
        let u = Update::Detached { id: EntityId(4) };
        let json = serde_json::to_value(&u).unwrap();
        assert_eq!(json["type"], "detached");
        assert_eq!(json["id"], 4);
    }

    #[test]
    fn subscription_info_omits_carried_state() {
        let info = ConnectionInfo {
            host: HostId(2),
            address: "10.0.0.2".into(),
            port: 9002,
            purpose: ConnectionPurpose::AuxiliarySubscription,
            carried: None,
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["purpose"], "auxiliary_subscription");
        assert!(json.get("carried").is_none());
        let back: ConnectionInfo = serde_json::from_value(json).unwrap();
        assert_eq!(back, info);
    }
}
