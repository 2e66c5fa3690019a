//! Screen-space geometry: rectangles and facing.
//!
//! Coordinates follow screen convention: x grows to the right, y grows
//! downward. Rectangles are stored as top-left corner plus size.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle with floating point position and size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Width
    pub w: f32,
    /// Height
    pub h: f32,
}

impl Rect {
    /// Creates a new rectangle from its top-left corner and size.
    #[must_use]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Creates a rectangle of `size` centred on `center`.
    #[must_use]
    pub fn from_center(center: Vec2, size: Vec2) -> Self {
        Self {
            x: center.x - size.x / 2.0,
            y: center.y - size.y / 2.0,
            w: size.x,
            h: size.y,
        }
    }

    /// Creates a rectangle whose top-left corner sits at `top_left`.
    #[must_use]
    pub fn from_top_left(top_left: Vec2, size: Vec2) -> Self {
        Self::new(top_left.x, top_left.y, size.x, size.y)
    }

    /// Left edge.
    #[must_use]
    pub fn left(&self) -> f32 {
        self.x
    }

    /// Right edge.
    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    /// Top edge.
    #[must_use]
    pub fn top(&self) -> f32 {
        self.y
    }

    /// Bottom edge.
    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    /// Moves the rectangle so its left edge is at `left`.
    pub fn set_left(&mut self, left: f32) {
        self.x = left;
    }

    /// Moves the rectangle so its right edge is at `right`.
    pub fn set_right(&mut self, right: f32) {
        self.x = right - self.w;
    }

    /// Moves the rectangle so its top edge is at `top`.
    pub fn set_top(&mut self, top: f32) {
        self.y = top;
    }

    /// Moves the rectangle so its bottom edge is at `bottom`.
    pub fn set_bottom(&mut self, bottom: f32) {
        self.y = bottom - self.h;
    }

    /// Size as a vector.
    #[must_use]
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.w, self.h)
    }

    /// Centre point.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Moves the rectangle so it is centred on `center`.
    pub fn set_center(&mut self, center: Vec2) {
        self.x = center.x - self.w / 2.0;
        self.y = center.y - self.h / 2.0;
    }

    /// Bottom-left corner.
    #[must_use]
    pub fn bottom_left(&self) -> Vec2 {
        Vec2::new(self.left(), self.bottom())
    }

    /// Bottom-right corner.
    #[must_use]
    pub fn bottom_right(&self) -> Vec2 {
        Vec2::new(self.right(), self.bottom())
    }

    /// Returns a rectangle grown by `dw`/`dh` in total, keeping the centre.
    ///
    /// Negative values shrink the rectangle.
    #[must_use]
    pub fn inflate(&self, dw: f32, dh: f32) -> Self {
        Self {
            x: self.x - dw / 2.0,
            y: self.y - dh / 2.0,
            w: self.w + dw,
            h: self.h + dh,
        }
    }

    /// Returns the rectangle translated by `offset`.
    #[must_use]
    pub fn translated(&self, offset: Vec2) -> Self {
        Self {
            x: self.x + offset.x,
            y: self.y + offset.y,
            ..*self
        }
    }

    /// Strict overlap test: touching edges do not overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && self.right() > other.left()
            && self.top() < other.bottom()
            && self.bottom() > other.top()
    }

    /// Checks whether `other` lies fully inside this rectangle.
    #[must_use]
    pub fn contains(&self, other: &Rect) -> bool {
        other.left() >= self.left()
            && other.right() <= self.right()
            && other.top() >= self.top()
            && other.bottom() <= self.bottom()
    }
}

/// Horizontal facing of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Facing toward negative x
    Left,
    /// Facing toward positive x (default)
    #[default]
    Right,
}

impl Facing {
    /// Returns -1.0 for left and 1.0 for right.
    #[must_use]
    pub const fn sign(self) -> f32 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }

    /// Returns the opposite facing.
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Facing toward a horizontal delta, keeping `current` when the delta is zero.
    #[must_use]
    pub fn toward(dx: f32, current: Self) -> Self {
        if dx > 0.0 {
            Self::Right
        } else if dx < 0.0 {
            Self::Left
        } else {
            current
        }
    }

    /// Mirrors an offset horizontally for this facing.
    #[must_use]
    pub fn mirror(self, offset: Vec2) -> Vec2 {
        Vec2::new(offset.x * self.sign(), offset.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_edges() {
        let rect = Rect::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(rect.left(), 10.0);
        assert_eq!(rect.right(), 40.0);
        assert_eq!(rect.top(), 20.0);
        assert_eq!(rect.bottom(), 60.0);
        assert_eq!(rect.center(), Vec2::new(25.0, 40.0));
    }

    #[test]
    fn test_rect_edge_setters_keep_size() {
        let mut rect = Rect::new(0.0, 0.0, 10.0, 20.0);
        rect.set_right(100.0);
        assert_eq!(rect.left(), 90.0);
        rect.set_bottom(50.0);
        assert_eq!(rect.top(), 30.0);
        assert_eq!(rect.size(), Vec2::new(10.0, 20.0));
    }

    #[test]
    fn test_rect_inflate_keeps_center() {
        let rect = Rect::new(0.0, 0.0, 144.0, 64.0);
        let inner = rect.inflate(-72.0, -32.0);
        assert_eq!(inner.center(), rect.center());
        assert_eq!(inner.w, 72.0);
        assert_eq!(inner.h, 32.0);
        assert!(rect.contains(&inner));
    }

    #[test]
    fn test_rect_overlap_is_strict() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let touching = Rect::new(10.0, 0.0, 10.0, 10.0);
        let overlapping = Rect::new(9.5, 5.0, 10.0, 10.0);

        assert!(!a.overlaps(&touching));
        assert!(a.overlaps(&overlapping));
        assert!(overlapping.overlaps(&a));
    }

    #[test]
    fn test_rect_from_center() {
        let rect = Rect::from_center(Vec2::new(50.0, 50.0), Vec2::new(20.0, 10.0));
        assert_eq!(rect.left(), 40.0);
        assert_eq!(rect.top(), 45.0);
    }

    #[test]
    fn test_facing_toward_zero_keeps_current() {
        assert_eq!(Facing::toward(0.0, Facing::Left), Facing::Left);
        assert_eq!(Facing::toward(3.0, Facing::Left), Facing::Right);
        assert_eq!(Facing::toward(-0.5, Facing::Right), Facing::Left);
    }

    #[test]
    fn test_facing_mirror() {
        let offset = Vec2::new(20.0, -4.0);
        assert_eq!(Facing::Left.mirror(offset), Vec2::new(-20.0, -4.0));
        assert_eq!(Facing::Right.mirror(offset), offset);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn recentred_inner_rect_stays_inside(
                x in -500.0f32..500.0,
                y in -500.0f32..500.0,
                dx in -200.0f32..200.0,
                dy in -200.0f32..200.0,
            ) {
                let outer = Rect::new(0.0, 0.0, 144.0, 64.0);
                let mut inner = outer.inflate(-72.0, -32.0).translated(Vec2::new(x, y));
                inner = inner.translated(Vec2::new(dx, dy));

                let mut visual = outer;
                visual.set_center(inner.center());
                prop_assert!(visual.contains(&inner));
            }
        }
    }
}
