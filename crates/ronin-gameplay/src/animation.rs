//! Animation-state derivation and frame counting.
//!
//! The state shown on screen is never stored as a transition table. It is
//! recomputed every frame from physical and combat flags by the pure
//! functions below, in a fixed priority order:
//!
//! 1. fallen
//! 2. hurt (stunned / knocked down) or blocking
//! 3. an active attack
//! 4. the dash visual while the dash cooldown runs
//! 5. grounded movement
//! 6. airborne movement

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::moveset::AnimState;

/// Frames advanced per second of simulation.
pub const ANIMATION_SPEED: f32 = 10.0;

/// Horizontal speed under which a grounded player counts as idle.
pub const IDLE_THRESHOLD: f32 = 0.2;

/// Current animation state and fractional frame counter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Animator {
    state: AnimState,
    frame_index: f32,
}

impl Animator {
    /// Creates an animator at frame zero.
    #[must_use]
    pub const fn new(state: AnimState) -> Self {
        Self {
            state,
            frame_index: 0.0,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> AnimState {
        self.state
    }

    /// Switches state without touching the frame counter.
    pub fn set_state(&mut self, state: AnimState) {
        self.state = state;
    }

    /// Raw fractional frame counter.
    #[must_use]
    pub const fn frame_index(&self) -> f32 {
        self.frame_index
    }

    /// Jumps the counter to a given frame.
    pub fn set_frame(&mut self, frame: f32) {
        self.frame_index = frame;
    }

    /// Restarts the counter at frame zero.
    pub fn reset(&mut self) {
        self.frame_index = 0.0;
    }

    /// Advances the counter by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        self.frame_index += ANIMATION_SPEED * dt;
    }

    /// Unwrapped integer frame, used for impact-frame matching.
    #[must_use]
    pub fn raw_frame(&self) -> usize {
        self.frame_index.max(0.0) as usize
    }

    /// Displayed frame for a track of `len` frames.
    ///
    /// Looping tracks wrap; terminal tracks hold their last frame.
    #[must_use]
    pub fn frame(&self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        let raw = self.raw_frame();
        if self.state.is_terminal() {
            raw.min(len - 1)
        } else {
            raw % len
        }
    }

    /// Whether a track of `len` frames has played through once.
    #[must_use]
    pub fn completed(&self, len: usize) -> bool {
        self.frame_index >= len as f32
    }
}

/// Flags the player's visual state is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlayerFlags {
    /// Health depleted
    pub fallen: bool,
    /// Knocked down or recovering
    pub hurt: bool,
    /// Ground probe result
    pub grounded: bool,
    /// An attack is committed
    pub attacking: bool,
    /// Zero-based combo stage
    pub attack_stage: usize,
    /// Air attacks still permitted
    pub can_air_attack: bool,
    /// Dash cooldown running
    pub dashing: bool,
    /// Current velocity
    pub velocity: Vec2,
}

/// Derives the player's animation state.
#[must_use]
pub fn derive_player_state(flags: &PlayerFlags) -> AnimState {
    if flags.fallen {
        return AnimState::Fallen;
    }
    if flags.hurt {
        return AnimState::Hurt;
    }
    if flags.attacking {
        if flags.grounded {
            if let Some(state) = AnimState::melee(flags.attack_stage) {
                return state;
            }
        } else if flags.can_air_attack {
            let stage = flags.attack_stage.min(AnimState::air_stage_count() - 1);
            if let Some(state) = AnimState::air(stage) {
                return state;
            }
        }
    }
    if flags.dashing {
        return AnimState::Dash;
    }
    if flags.grounded {
        if flags.velocity.x.abs() < IDLE_THRESHOLD {
            AnimState::Idle
        } else {
            AnimState::Run
        }
    } else if flags.velocity.y < 0.0 {
        AnimState::Jump
    } else {
        AnimState::Fall
    }
}

/// Flags an enemy's visual state is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnemyFlags {
    /// Health depleted
    pub fallen: bool,
    /// Stun recovery running
    pub stunned: bool,
    /// Guard raised
    pub blocking: bool,
    /// Committed attack state, if attacking
    pub attack: Option<AnimState>,
    /// Non-zero horizontal velocity
    pub moving: bool,
}

/// Derives an enemy's animation state.
#[must_use]
pub fn derive_enemy_state(flags: &EnemyFlags) -> AnimState {
    if flags.fallen {
        AnimState::Fallen
    } else if flags.stunned {
        AnimState::Hurt
    } else if flags.blocking {
        AnimState::Block
    } else if let Some(attack) = flags.attack {
        attack
    } else if flags.moving {
        AnimState::Walk
    } else {
        AnimState::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grounded() -> PlayerFlags {
        PlayerFlags {
            grounded: true,
            can_air_attack: true,
            ..PlayerFlags::default()
        }
    }

    #[test]
    fn test_grounded_at_rest_is_idle() {
        assert_eq!(derive_player_state(&grounded()), AnimState::Idle);
    }

    #[test]
    fn test_grounded_moving_is_run() {
        let flags = PlayerFlags {
            velocity: Vec2::new(-0.5, 0.0),
            ..grounded()
        };
        assert_eq!(derive_player_state(&flags), AnimState::Run);
    }

    #[test]
    fn test_airborne_jump_and_fall() {
        let rising = PlayerFlags {
            velocity: Vec2::new(0.0, -120.0),
            ..PlayerFlags::default()
        };
        let falling = PlayerFlags {
            velocity: Vec2::new(0.0, 40.0),
            ..PlayerFlags::default()
        };
        assert_eq!(derive_player_state(&rising), AnimState::Jump);
        assert_eq!(derive_player_state(&falling), AnimState::Fall);
    }

    #[test]
    fn test_attack_maps_to_melee_or_air() {
        let melee = PlayerFlags {
            attacking: true,
            attack_stage: 2,
            ..grounded()
        };
        assert_eq!(derive_player_state(&melee), AnimState::Melee3);

        let air = PlayerFlags {
            grounded: false,
            ..melee
        };
        assert_eq!(derive_player_state(&air), AnimState::Air2);

        let no_air = PlayerFlags {
            can_air_attack: false,
            velocity: Vec2::new(0.0, 10.0),
            ..air
        };
        assert_eq!(derive_player_state(&no_air), AnimState::Fall);
    }

    #[test]
    fn test_priority_order() {
        let everything = PlayerFlags {
            fallen: true,
            hurt: true,
            attacking: true,
            dashing: true,
            ..grounded()
        };
        assert_eq!(derive_player_state(&everything), AnimState::Fallen);

        let hurt = PlayerFlags {
            fallen: false,
            ..everything
        };
        assert_eq!(derive_player_state(&hurt), AnimState::Hurt);

        let attack_over_dash = PlayerFlags { hurt: false, ..hurt };
        assert_eq!(derive_player_state(&attack_over_dash), AnimState::Melee1);

        let dash = PlayerFlags {
            attacking: false,
            ..attack_over_dash
        };
        assert_eq!(derive_player_state(&dash), AnimState::Dash);
    }

    #[test]
    fn test_enemy_priority() {
        let mut flags = EnemyFlags {
            fallen: true,
            stunned: true,
            blocking: true,
            attack: Some(AnimState::Melee2),
            moving: true,
        };
        assert_eq!(derive_enemy_state(&flags), AnimState::Fallen);
        flags.fallen = false;
        assert_eq!(derive_enemy_state(&flags), AnimState::Hurt);
        flags.stunned = false;
        assert_eq!(derive_enemy_state(&flags), AnimState::Block);
        flags.blocking = false;
        assert_eq!(derive_enemy_state(&flags), AnimState::Melee2);
        flags.attack = None;
        assert_eq!(derive_enemy_state(&flags), AnimState::Walk);
        flags.moving = false;
        assert_eq!(derive_enemy_state(&flags), AnimState::Idle);
    }

    #[test]
    fn test_looping_track_wraps() {
        let mut animator = Animator::new(AnimState::Idle);
        for _ in 0..60 {
            animator.advance(1.0 / 60.0);
        }
        // ten frames elapsed on a four-frame track
        assert!(animator.completed(4));
        assert_eq!(animator.frame(4), (animator.raw_frame()) % 4);
        assert!(animator.frame(4) < 4);
    }

    #[test]
    fn test_terminal_track_holds_last_frame() {
        let mut animator = Animator::new(AnimState::Fallen);
        animator.set_frame(17.5);
        assert_eq!(animator.frame(6), 5);
    }

    #[test]
    fn test_state_change_keeps_counter() {
        let mut animator = Animator::new(AnimState::Run);
        animator.set_frame(3.5);
        animator.set_state(AnimState::Fall);
        assert_eq!(animator.frame_index(), 3.5);
        animator.reset();
        assert_eq!(animator.frame_index(), 0.0);
    }
}
