//! Area-of-interest windows and the viewpoint clamp policy.
//!
//! A viewer's AOI window is its viewpoint expanded by its half-extents.
//! Viewpoints outside the total world bounds are never rejected: they
//! are clamped per axis to the nearest edge and the clamp is reported
//! back through an [`AxisAccess`] pair. The window itself is always
//! clamped to the world bounds, so its four corners are valid
//! coordinates for the partition.

use crate::geometry::Rect;
use serde::{Deserialize, Serialize};

/// How a requested viewpoint coordinate was treated on one axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// The coordinate was inside the world bounds.
    #[default]
    Unrestricted,
    /// The coordinate was below the world origin and was raised to it.
    ClampedLow,
    /// The coordinate was beyond the world edge and was lowered to it.
    ClampedHigh,
}

impl AccessLevel {
    /// Compact numeric form used by clients (`0`, `1`, `2`).
    pub fn code(self) -> u8 {
        match self {
            Self::Unrestricted => 0,
            Self::ClampedLow => 1,
            Self::ClampedHigh => 2,
        }
    }
}

/// Per-axis access levels of a clamped viewpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AxisAccess {
    /// Horizontal axis.
    pub x: AccessLevel,
    /// Vertical axis.
    pub y: AccessLevel,
}

impl AxisAccess {
    /// Whether neither axis was clamped.
    pub fn is_unrestricted(&self) -> bool {
        self.x == AccessLevel::Unrestricted && self.y == AccessLevel::Unrestricted
    }
}

/// A viewpoint after the clamp policy was applied.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClampedViewpoint {
    /// Clamped horizontal coordinate.
    pub x: f32,
    /// Clamped vertical coordinate.
    pub y: f32,
    /// What happened on each axis.
    pub access: AxisAccess,
}

fn clamp_axis(v: f32, lo: f32, hi: f32) -> (f32, AccessLevel) {
    if v < lo {
        (lo, AccessLevel::ClampedLow)
    } else if v > hi {
        (hi, AccessLevel::ClampedHigh)
    } else {
        (v, AccessLevel::Unrestricted)
    }
}

/// Clamp a requested viewpoint component-wise into `bounds`.
///
/// NaN coordinates are treated as below the origin.
pub fn clamp_viewpoint(bounds: &Rect, x: f32, y: f32) -> ClampedViewpoint {
    let x = if x.is_nan() { f32::NEG_INFINITY } else { x };
    let y = if y.is_nan() { f32::NEG_INFINITY } else { y };
    let (cx, ax) = clamp_axis(x, bounds.min_x, bounds.max_x);
    let (cy, ay) = clamp_axis(y, bounds.min_y, bounds.max_y);
    ClampedViewpoint {
        x: cx,
        y: cy,
        access: AxisAccess { x: ax, y: ay },
    }
}

/// The rectangle a viewer is shown, centred on its viewpoint.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AoiWindow {
    /// Half of the requested window width.
    pub half_w: f32,
    /// Half of the requested window height.
    pub half_h: f32,
    /// The window, clamped to the world bounds.
    pub rect: Rect,
}

impl AoiWindow {
    /// Build the window around `(vx, vy)` and clamp it into `bounds`.
    pub fn from_viewpoint(vx: f32, vy: f32, half_w: f32, half_h: f32, bounds: &Rect) -> Self {
        let raw = Rect::new(vx - half_w, vy - half_h, vx + half_w, vy + half_h);
        Self {
            half_w,
            half_h,
            rect: raw.clamp_to(bounds),
        }
    }

    /// Inclusive containment test used by the interest scan.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        self.rect.contains(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn world() -> Rect {
        Rect::new(0.0, 0.0, 1000.0, 500.0)
    }

    #[test]
    fn beyond_edge_clamps_high() {
        let v = clamp_viewpoint(&world(), 1050.0, 200.0);
        assert_eq!(v.x, 1000.0);
        assert_eq!(v.y, 200.0);
        assert_eq!(v.access.x, AccessLevel::ClampedHigh);
        assert_eq!(v.access.y, AccessLevel::Unrestricted);
    }

    #[test]
    fn below_origin_clamps_low() {
        let v = clamp_viewpoint(&world(), 10.0, -3.0);
        assert_eq!(v.y, 0.0);
        assert_eq!(v.access.y, AccessLevel::ClampedLow);
        assert_eq!(v.access.y.code(), 1);
    }

    #[test]
    fn in_bounds_is_untouched() {
        let v = clamp_viewpoint(&world(), 10.0, 20.0);
        assert!(v.access.is_unrestricted());
        assert_eq!((v.x, v.y), (10.0, 20.0));
    }

    #[test]
    fn window_at_corner_is_clipped() {
        let w = AoiWindow::from_viewpoint(0.0, 0.0, 50.0, 30.0, &world());
        assert_eq!(w.rect, Rect::new(0.0, 0.0, 50.0, 30.0));
        assert!(w.contains(50.0, 30.0));
        assert!(!w.contains(50.5, 30.0));
    }

    proptest! {
        #[test]
        fn window_corners_stay_in_bounds(
            x in -5000.0f32..5000.0,
            y in -5000.0f32..5000.0,
            hw in 0.0f32..2000.0,
            hh in 0.0f32..2000.0,
        ) {
            let bounds = world();
            let v = clamp_viewpoint(&bounds, x, y);
            let w = AoiWindow::from_viewpoint(v.x, v.y, hw, hh, &bounds);
            for (cx, cy) in w.rect.corners() {
                prop_assert!(bounds.contains(cx, cy));
            }
            let expected_x = if x < 0.0 {
                AccessLevel::ClampedLow
            } else if x > 1000.0 {
                AccessLevel::ClampedHigh
            } else {
                AccessLevel::Unrestricted
            };
            prop_assert_eq!(v.access.x, expected_x);
        }
    }
}
