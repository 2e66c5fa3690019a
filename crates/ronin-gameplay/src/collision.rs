//! Static collision geometry, axis-separated resolution and contact probes.
//!
//! Resolution runs as two independent passes, x then y. The side an entity
//! entered an obstacle from is inferred by comparing the previous frame's
//! hitbox against the obstacle, which keeps an entity that already overlaps
//! on the perpendicular axis from being pushed out the wrong way.

use std::sync::Arc;

use glam::Vec2;
use ronin_common::Rect;
use serde::{Deserialize, Serialize};

/// Height of the ground probe below the hitbox.
pub const GROUND_PROBE_HEIGHT: f32 = 2.0;
/// Width of the ledge probes at each bottom corner.
pub const EDGE_PROBE_WIDTH: f32 = 1.0;
/// Depth of the ledge probes below the hitbox.
pub const EDGE_PROBE_DEPTH: f32 = 10.0;

/// Resolution axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    /// Horizontal pass
    X,
    /// Vertical pass
    Y,
}

/// Immutable list of static terrain rectangles shared by every entity.
#[derive(Debug, Clone, Default)]
pub struct CollisionMap {
    rects: Arc<[Rect]>,
}

impl CollisionMap {
    /// Creates a collision map from terrain rectangles.
    #[must_use]
    pub fn new(rects: impl Into<Arc<[Rect]>>) -> Self {
        Self {
            rects: rects.into(),
        }
    }

    /// All terrain rectangles in collection order.
    #[must_use]
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Number of rectangles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rects.len()
    }

    /// Whether the map has no geometry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Whether `rect` overlaps any terrain.
    #[must_use]
    pub fn any_overlap(&self, rect: &Rect) -> bool {
        self.rects.iter().any(|solid| solid.overlaps(rect))
    }

    /// Whether there is ground directly under `hitbox`.
    #[must_use]
    pub fn ground_probe(&self, hitbox: &Rect) -> bool {
        self.any_overlap(&ground_probe_rect(hitbox))
    }

    /// Checks for floor under both bottom corners of `hitbox`.
    #[must_use]
    pub fn edge_probes(&self, hitbox: &Rect) -> EdgeProbe {
        let (left, right) = edge_probe_rects(hitbox);
        EdgeProbe {
            left: self.any_overlap(&left),
            right: self.any_overlap(&right),
        }
    }
}

/// Floor presence under each bottom corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EdgeProbe {
    /// Floor under the bottom-left corner
    pub left: bool,
    /// Floor under the bottom-right corner
    pub right: bool,
}

impl EdgeProbe {
    /// Whether moving with horizontal velocity `vx` would step off a ledge.
    #[must_use]
    pub fn blocks(&self, vx: f32) -> bool {
        (vx > 0.0 && !self.right) || (vx < 0.0 && !self.left)
    }
}

/// Outcome of one resolution pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AxisContact {
    /// Number of obstacles overlapped during the pass
    pub overlaps: usize,
    /// Pushed out toward negative coordinates (landed / hit a wall on the right)
    pub hit_min_side: bool,
    /// Pushed out toward positive coordinates (ceiling / wall on the left)
    pub hit_max_side: bool,
}

impl AxisContact {
    /// Whether anything was touched.
    #[must_use]
    pub fn any(&self) -> bool {
        self.overlaps > 0
    }
}

/// Thin rectangle under the hitbox used for grounded checks.
#[must_use]
pub fn ground_probe_rect(hitbox: &Rect) -> Rect {
    Rect::from_top_left(hitbox.bottom_left(), Vec2::new(hitbox.w, GROUND_PROBE_HEIGHT))
}

/// Ledge probes under the bottom-left and bottom-right corners.
#[must_use]
pub fn edge_probe_rects(hitbox: &Rect) -> (Rect, Rect) {
    let size = Vec2::new(EDGE_PROBE_WIDTH, EDGE_PROBE_DEPTH);
    let left = Rect::from_top_left(hitbox.bottom_left() - Vec2::new(EDGE_PROBE_WIDTH, 0.0), size);
    let right = Rect::from_top_left(hitbox.bottom_right() - Vec2::new(EDGE_PROBE_WIDTH, 0.0), size);
    (left, right)
}

/// Resolves `hitbox` against every overlapping obstacle along one axis.
///
/// Obstacles are visited in collection order and each overlap test uses the
/// hitbox as already corrected by earlier obstacles. On the y axis any
/// overlap zeroes the vertical velocity.
pub fn resolve_axis(
    hitbox: &mut Rect,
    prev: &Rect,
    velocity: &mut Vec2,
    map: &CollisionMap,
    axis: Axis,
) -> AxisContact {
    let mut contact = AxisContact::default();

    for solid in map.rects() {
        if !solid.overlaps(hitbox) {
            continue;
        }
        contact.overlaps += 1;

        // Static terrain never moves, so its previous rect is itself.
        match axis {
            Axis::X => {
                if hitbox.left() <= solid.right() && prev.left().floor() >= solid.right().floor() {
                    hitbox.set_left(solid.right());
                    contact.hit_max_side = true;
                }
                if hitbox.right() >= solid.left() && prev.right().floor() <= solid.left().floor() {
                    hitbox.set_right(solid.left());
                    contact.hit_min_side = true;
                }
            },
            Axis::Y => {
                if hitbox.top() <= solid.bottom() && prev.top().floor() >= solid.bottom().floor() {
                    hitbox.set_top(solid.bottom());
                    contact.hit_max_side = true;
                }
                if hitbox.bottom() >= solid.top() && prev.bottom().floor() <= solid.top().floor() {
                    hitbox.set_bottom(solid.top());
                    contact.hit_min_side = true;
                }
                velocity.y = 0.0;
            },
        }
    }

    contact
}
