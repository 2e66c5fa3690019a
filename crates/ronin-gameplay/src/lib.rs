//! # Ronin Gameplay
//!
//! Frame-stepped combat and movement core for Project Ronin.
//!
//! This crate provides the whole simulation behind a level:
//! - Countdown timers driven by an explicit millisecond clock
//! - Axis-separated collision against static terrain
//! - Body integration (gravity, friction, knockback) and camera follow
//! - Move sets: animation tracks, impact frames and attack geometry
//! - Hitboxes and projectiles
//! - The player controller (combo, dash, heal, knockdown)
//! - Enemy variants sharing one decision algorithm
//! - Level orchestration, HUD values and render snapshots
//! - Event bus for audio and UI collaborators

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod animation;
pub mod collision;
pub mod combat;
pub mod enemy;
pub mod events;
pub mod hitbox;
pub mod input;
pub mod level;
pub mod moveset;
pub mod physics;
pub mod player;
pub mod timer;

#[cfg(test)]
mod scenarios;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::animation::*;
    pub use crate::collision::*;
    pub use crate::combat::*;
    pub use crate::enemy::*;
    pub use crate::events::*;
    pub use crate::hitbox::*;
    pub use crate::input::*;
    pub use crate::level::{
        BossBar, FrameSnapshot, HudState, Level, LevelError, LevelLayout, LevelStatus, Spawn, SpriteView,
        BUILTIN_LEVEL, TILE_SIZE,
    };
    pub use crate::moveset::*;
    pub use crate::physics::*;
    pub use crate::player::*;
    pub use crate::timer::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_data_loads() {
        let roster = Roster::builtin().expect("roster");
        let layout = LevelLayout::builtin().expect("layout");
        let level = Level::new(layout, roster, 1).expect("level");
        assert_eq!(level.status(), LevelStatus::Normal);
        assert_eq!(level.snapshot().sprites[0].kind, ActorKind::Player);
    }

    #[test]
    fn test_level_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Level>();
    }
}
