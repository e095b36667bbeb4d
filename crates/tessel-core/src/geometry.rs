//! Axis-aligned rectangles in world coordinates.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle `[min_x, max_x] × [min_y, max_y]`.
///
/// Both edges are inclusive. Used for the total world bounds, subtile
/// extents and AOI windows alike.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub min_x: f32,
    /// Top (origin-side) edge.
    pub min_y: f32,
    /// Right edge.
    pub max_x: f32,
    /// Bottom (far) edge.
    pub max_y: f32,
}

impl Rect {
    /// Build a rectangle from its two corners.
    pub fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Build a rectangle from an origin and extents.
    pub fn from_origin(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    /// Horizontal extent.
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    /// Vertical extent.
    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    /// Whether `(x, y)` lies inside, edges included.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        self.min_x <= x && x <= self.max_x && self.min_y <= y && y <= self.max_y
    }

    /// Whether `other` lies entirely inside this rectangle.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.contains(other.min_x, other.min_y) && self.contains(other.max_x, other.max_y)
    }

    /// Whether the two rectangles share at least one point.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    /// The four corners, origin first, clockwise.
    pub fn corners(&self) -> [(f32, f32); 4] {
        [
            (self.min_x, self.min_y),
            (self.max_x, self.min_y),
            (self.max_x, self.max_y),
            (self.min_x, self.max_y),
        ]
    }

    /// Clamp this rectangle so it lies within `bounds`.
    pub fn clamp_to(&self, bounds: &Rect) -> Rect {
        Rect {
            min_x: self.min_x.clamp(bounds.min_x, bounds.max_x),
            min_y: self.min_y.clamp(bounds.min_y, bounds.max_y),
            max_x: self.max_x.clamp(bounds.min_x, bounds.max_x),
            max_y: self.max_y.clamp(bounds.min_y, bounds.max_y),
        }
    }
}
