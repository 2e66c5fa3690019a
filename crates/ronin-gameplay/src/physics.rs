//! Body integration shared by the player and every enemy variant.
//!
//! Friction and gravity are both applied as two half steps around the
//! position update. Horizontal movement is resolved before vertical movement
//! so that each pass sees the other axis at its previous position.

use glam::Vec2;
use ronin_common::Rect;
use serde::{Deserialize, Serialize};

use crate::collision::{resolve_axis, Axis, AxisContact, CollisionMap};

/// Downward acceleration in pixels per second squared.
pub const GRAVITY: f32 = 800.0;

/// Default horizontal damping coefficient.
pub const FRICTION: f32 = 7.0;

/// Visual rectangle plus the narrower authoritative hitbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Visual (sprite) rectangle, recentred on the hitbox every frame
    pub rect: Rect,
    /// Authoritative collision rectangle
    pub hitbox: Rect,
    /// Hitbox as it was at the start of the frame
    pub prev: Rect,
    /// Velocity in pixels per second (x is further scaled by the motion model)
    pub velocity: Vec2,
    /// Total shrink from visual rect to hitbox
    inset: Vec2,
}

impl Body {
    /// Creates a body whose visual rectangle has its top-left corner at `top_left`.
    #[must_use]
    pub fn new(top_left: Vec2, sprite_size: Vec2, inset: Vec2) -> Self {
        let rect = Rect::from_top_left(top_left, sprite_size);
        let hitbox = rect.inflate(-inset.x, -inset.y);
        Self {
            rect,
            hitbox,
            prev: hitbox,
            velocity: Vec2::ZERO,
            inset,
        }
    }

    /// Records the current hitbox as the previous-frame rectangle.
    pub fn snapshot(&mut self) {
        self.prev = self.hitbox;
    }

    /// Recentres the visual rectangle on the hitbox.
    pub fn sync_visual(&mut self) {
        self.rect.set_center(self.hitbox.center());
    }

    /// Hitbox centre.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        self.hitbox.center()
    }

    /// Shrink applied to the visual rectangle.
    #[must_use]
    pub fn inset(&self) -> Vec2 {
        self.inset
    }
}

/// When horizontal friction is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrictionMode {
    /// Every frame
    Always,
    /// Only while a knockback is in progress
    KnockbackOnly,
}

impl FrictionMode {
    /// Whether friction applies given the current knockback state.
    #[must_use]
    pub const fn applies(self, knocked_back: bool) -> bool {
        match self {
            Self::Always => true,
            Self::KnockbackOnly => knocked_back,
        }
    }
}

/// Per-frame motion parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Motion {
    /// Downward acceleration
    pub gravity: f32,
    /// Horizontal damping coefficient
    pub friction: f32,
    /// Multiplier from horizontal velocity to pixels per second
    pub horizontal_scale: f32,
    /// Whether friction applies this frame
    pub apply_friction: bool,
}

impl Default for Motion {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            friction: FRICTION,
            horizontal_scale: 1.0,
            apply_friction: true,
        }
    }
}

/// Contacts produced by one integration step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Contacts {
    /// Horizontal pass outcome
    pub x: AxisContact,
    /// Vertical pass outcome
    pub y: AxisContact,
}

impl Contacts {
    /// Whether the body was pushed up out of a floor.
    #[must_use]
    pub fn landed(&self) -> bool {
        self.y.hit_min_side
    }

    /// Whether the body hit a wall on either side.
    #[must_use]
    pub fn hit_wall(&self) -> bool {
        self.x.hit_min_side || self.x.hit_max_side
    }
}

/// Advances a body by `dt` seconds and resolves it against static geometry.
pub fn integrate(body: &mut Body, motion: &Motion, map: &CollisionMap, dt: f32) -> Contacts {
    if motion.apply_friction {
        let friction_factor = motion.friction * -body.velocity.x;
        body.velocity.x += friction_factor / 2.0 * dt;
        body.hitbox.x += body.velocity.x * motion.horizontal_scale * dt;
        body.velocity.x += friction_factor / 2.0 * dt;
    } else {
        body.hitbox.x += body.velocity.x * motion.horizontal_scale * dt;
    }
    let x = resolve_axis(&mut body.hitbox, &body.prev, &mut body.velocity, map, Axis::X);

    body.velocity.y += motion.gravity / 2.0 * dt;
    body.hitbox.y += body.velocity.y * dt;
    body.velocity.y += motion.gravity / 2.0 * dt;
    let y = resolve_axis(&mut body.hitbox, &body.prev, &mut body.velocity, map, Axis::Y);

    Contacts { x, y }
}

/// Trailing rectangle that eases toward a target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraFollow {
    /// Current camera rectangle
    pub rect: Rect,
    /// Distance divisor converting distance into an easing factor
    pub divisor: f32,
    /// Square the easing factor (slower when close, faster when far)
    pub squared: bool,
    /// Upper bound on the easing factor
    pub max_speed: f32,
}

impl CameraFollow {
    /// Creates a camera resting on `target`.
    #[must_use]
    pub fn new(target: Rect) -> Self {
        Self {
            rect: target,
            divisor: 500.0,
            squared: false,
            max_speed: 1.0,
        }
    }

    /// Moves the camera a step toward `target`.
    pub fn follow(&mut self, target: &Rect) {
        let distance = target.center().distance(self.rect.center());
        let mut speed = distance / self.divisor;
        if self.squared {
            speed *= speed;
        }
        let speed = speed.clamp(0.0, self.max_speed);

        self.rect.x += (target.x - self.rect.x) * speed;
        self.rect.y += (target.y - self.rect.y) * speed;
    }

    /// Camera centre.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        self.rect.center()
    }
}
