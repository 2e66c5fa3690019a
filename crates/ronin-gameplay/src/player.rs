//! Player controller: movement, combo attacks, dashing, healing and the
//! knockdown/death lifecycle.
//!
//! Each frame runs in a fixed order: snapshot the hitbox, advance timers,
//! probe the ground, settle knockdown state, take at most one hit, read
//! input, integrate physics, derive the animation state and advance it.
//! Hitbox emission happens separately, before the update, in the level's
//! emission phase.

use std::sync::Arc;

use glam::Vec2;
use ronin_common::{EntityId, Facing, Rect, Team};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::animation::{derive_player_state, Animator, PlayerFlags};
use crate::combat::{find_hit, Charges, FrameContext, Health, IncomingHit};
use crate::events::CombatEvent;
use crate::hitbox::{Hitbox, HitboxSet};
use crate::input::{Action, InputState};
use crate::moveset::{AnimState, MoveSet};
use crate::physics::{integrate, Body, CameraFollow, FrictionMode, Motion};
use crate::timer::{Millis, Timer};

/// Ground combo length.
pub const GROUND_STAGES: usize = 3;
/// Air combo length.
pub const AIR_STAGES: usize = 2;

/// Tunable player parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Multiplier from horizontal velocity to pixels per second
    pub speed: f32,
    /// Horizontal acceleration while a direction is held
    pub acceleration: f32,
    /// Horizontal damping
    pub friction: f32,
    /// Downward acceleration
    pub gravity: f32,
    /// Upward jump impulse
    pub jump_height: f32,
    /// Acceleration burst of a dash
    pub dash_distance: f32,
    /// Dash charge capacity
    pub max_dash: u32,
    /// Maximum health
    pub max_health: i32,
    /// Heal charge capacity
    pub max_heal: u32,
    /// Health restored per heal
    pub heal_amount: i32,
    /// Upward impulse of a knockdown
    pub knockdown_lift: f32,
    /// Lock after landing from a knockdown
    pub stun_recovery_ms: Millis,
    /// Dash charge regeneration period
    pub dash_regen_ms: Millis,
    /// Minimum spacing between dashes
    pub dash_cooldown_ms: Millis,
    /// Invulnerability granted by a dash
    pub dash_invuln_ms: Millis,
    /// Follow-up window after an attack completes
    pub combo_window_ms: Millis,
    /// Invulnerability after taking a hit
    pub hit_cooldown_ms: Millis,
    /// Minimum spacing between heals
    pub heal_cooldown_ms: Millis,
    /// Control lock of a non-stun knockback
    pub knocked_back_ms: Millis,
    /// Linger time after death before removal
    pub fallen_ms: Millis,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            speed: 60.0,
            acceleration: 20.0,
            friction: 7.0,
            gravity: crate::physics::GRAVITY,
            jump_height: 300.0,
            dash_distance: 400.0,
            max_dash: 2,
            max_health: 70,
            max_heal: 3,
            heal_amount: 20,
            knockdown_lift: 150.0,
            stun_recovery_ms: 1000,
            dash_regen_ms: 1500,
            dash_cooldown_ms: 250,
            dash_invuln_ms: 250,
            combo_window_ms: 200,
            hit_cooldown_ms: 500,
            heal_cooldown_ms: 1000,
            knocked_back_ms: 300,
            fallen_ms: 1000,
        }
    }
}

/// Every timer the player owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerTimers {
    /// Control lock after landing from a knockdown
    pub stun_recovery: Timer,
    /// Periodic dash charge pulse
    pub dash_regen: Timer,
    /// Spacing between dashes; also drives the dash visual
    pub dash_cooldown: Timer,
    /// Combo window; fires once when the window closes
    pub attack_combo: Timer,
    /// Post-hit invulnerability
    pub hit_cooldown: Timer,
    /// Dash invulnerability
    pub dash_invuln: Timer,
    /// Spacing between heals
    pub heal_cooldown: Timer,
    /// Control lock of a non-stun knockback
    pub knocked_back: Timer,
    /// Death linger
    pub fallen: Timer,
}

impl PlayerTimers {
    fn new(config: &PlayerConfig, now: Millis) -> Self {
        Self {
            stun_recovery: Timer::new(config.stun_recovery_ms).sustained(),
            dash_regen: Timer::new(config.dash_regen_ms).repeating().started(now),
            dash_cooldown: Timer::new(config.dash_cooldown_ms).sustained(),
            attack_combo: Timer::new(config.combo_window_ms),
            hit_cooldown: Timer::new(config.hit_cooldown_ms).sustained(),
            dash_invuln: Timer::new(config.dash_invuln_ms).sustained(),
            heal_cooldown: Timer::new(config.heal_cooldown_ms).sustained(),
            knocked_back: Timer::new(config.knocked_back_ms).sustained(),
            fallen: Timer::new(config.fallen_ms).sustained(),
        }
    }

    fn update(&mut self, now: Millis) {
        for timer in [
            &mut self.stun_recovery,
            &mut self.dash_regen,
            &mut self.dash_cooldown,
            &mut self.attack_combo,
            &mut self.hit_cooldown,
            &mut self.dash_invuln,
            &mut self.heal_cooldown,
            &mut self.knocked_back,
            &mut self.fallen,
        ] {
            timer.update(now);
        }
    }
}

/// The player character.
#[derive(Debug, Clone)]
pub struct Player {
    id: EntityId,
    moves: Arc<MoveSet>,
    config: PlayerConfig,
    body: Body,
    camera: CameraFollow,
    facing: Facing,
    animator: Animator,
    timers: PlayerTimers,
    health: Health,
    dash: Charges,
    heals: Charges,

    grounded: bool,
    control_lock: bool,
    knocked_down: bool,
    jump_requested: bool,

    attacking: bool,
    attack_combo: bool,
    /// Zero-based combo stage; `None` is the base before the first attack
    attack_stage: Option<usize>,
    stage_count: usize,
    can_air_attack: bool,
    can_air_boost: bool,

    fallen: bool,
    removable: bool,
}

impl Player {
    /// Spawns a player whose sprite's top-left corner is at `top_left`.
    #[must_use]
    pub fn new(top_left: Vec2, moves: Arc<MoveSet>, config: PlayerConfig, now: Millis) -> Self {
        let body = Body::new(top_left, moves.sprite_size(), moves.inset());
        let camera = CameraFollow::new(body.hitbox);
        Self {
            id: EntityId::new(),
            timers: PlayerTimers::new(&config, now),
            health: Health::new(config.max_health),
            dash: Charges::full(config.max_dash),
            heals: Charges::full(config.max_heal),
            moves,
            config,
            body,
            camera,
            facing: Facing::Right,
            animator: Animator::new(AnimState::Idle),
            grounded: false,
            control_lock: false,
            knocked_down: false,
            jump_requested: false,
            attacking: false,
            attack_combo: false,
            attack_stage: None,
            stage_count: GROUND_STAGES,
            can_air_attack: true,
            can_air_boost: true,
            fallen: false,
            removable: false,
        }
    }

    // ========================================================================
    // Frame update
    // ========================================================================

    /// Runs one frame. Returns the index of the hitbox that landed, if any.
    pub fn update(&mut self, ctx: &FrameContext<'_>, input: &InputState) -> Option<usize> {
        self.body.snapshot();
        self.timers.update(ctx.now);

        self.grounded = ctx.map.ground_probe(&self.body.hitbox);
        self.handle_knockdown(ctx.now);

        let landed = self.take_hit(ctx);

        if !self.fallen {
            self.handle_input(ctx, input);
        }
        self.movement(ctx);

        self.animator.set_state(derive_player_state(&self.flags()));
        self.animator.advance(ctx.dt);

        if self.fallen
            && !self.timers.fallen.active()
            && self.animator.completed(self.moves.frames(AnimState::Fallen))
        {
            self.removable = true;
        }

        landed
    }

    /// Spawns this frame's attack hitbox when the current frame is an impact frame.
    pub fn emit_hitboxes(&self, hitboxes: &mut HitboxSet) {
        if !self.attacking || self.fallen {
            return;
        }
        let Some(attack) = self.moves.attack(self.animator.state()) else {
            return;
        };
        if attack.is_impact_frame(self.animator.raw_frame()) {
            hitboxes.push(Hitbox::melee(
                Team::Player,
                self.id,
                self.body.center(),
                self.facing,
                attack,
            ));
        }
    }

    fn handle_knockdown(&mut self, now: Millis) {
        if self.grounded {
            if self.knocked_down {
                self.timers.stun_recovery.activate(now);
            }
            self.knocked_down = false;
            self.control_lock = false;
        }

        if self.timers.stun_recovery.active() || self.timers.knocked_back.active() || self.fallen {
            self.control_lock = true;
        }
    }

    fn take_hit(&mut self, ctx: &FrameContext<'_>) -> Option<usize> {
        if self.fallen || self.is_invulnerable() {
            return None;
        }
        let hit = find_hit(ctx.hitboxes, Team::Player, &self.body.hitbox)?;
        self.apply_hit(&hit, ctx);
        Some(hit.index)
    }

    fn apply_hit(&mut self, hit: &IncomingHit, ctx: &FrameContext<'_>) {
        self.timers.hit_cooldown.activate(ctx.now);
        self.health.damage(hit.damage);
        debug!(
            "Player took {} from {} ({} left)",
            hit.damage, hit.attacker, self.health.current
        );
        ctx.events.publish(CombatEvent::Hit {
            target: self.id,
            team: Team::Player,
            source: hit.attacker,
            damage: hit.damage,
            knockdown: hit.stun,
        });

        if self.health.is_depleted() {
            self.die(ctx);
        } else if hit.stun {
            self.knock_down(hit.direction, hit.knockback);
        } else {
            self.knock_back(hit.direction, hit.knockback, ctx.now);
        }
    }

    fn die(&mut self, ctx: &FrameContext<'_>) {
        self.fallen = true;
        self.control_lock = true;
        self.attacking = false;
        self.attack_combo = false;
        self.attack_stage = None;
        self.animator.reset();
        self.timers.fallen.activate(ctx.now);
        debug!("Player {} has fallen", self.id);
        ctx.events.publish(CombatEvent::Died {
            entity_id: self.id,
            kind: self.moves.kind(),
        });
    }

    fn knock_down(&mut self, direction: Facing, force: f32) {
        if self.knocked_down {
            return;
        }
        self.knocked_down = true;
        self.control_lock = true;
        self.attacking = false;
        self.attack_combo = false;
        self.body.velocity.y = -self.config.knockdown_lift;
        self.body.velocity.x = direction.sign() * force;
    }

    fn knock_back(&mut self, direction: Facing, force: f32, now: Millis) {
        self.body.velocity.x = direction.sign() * force;
        self.timers.knocked_back.activate(now);
    }

    // ========================================================================
    // Input
    // ========================================================================

    fn handle_input(&mut self, ctx: &FrameContext<'_>, input: &InputState) {
        if self.control_lock {
            // mashing jump shortens a knockdown
            if input.pressed(Action::Jump) {
                self.timers.stun_recovery.deactivate();
            }
            return;
        }

        let mut accel = 0.0;
        if !(self.attacking && self.animator.state().is_melee()) {
            if input.pressed(Action::MoveLeft) {
                accel -= self.config.acceleration;
                self.facing = Facing::Left;
            }
            if input.pressed(Action::MoveRight) {
                accel += self.config.acceleration;
                self.facing = Facing::Right;
            }
        }
        if !self.attacking && input.pressed(Action::Dash) {
            accel = self.dash(accel, ctx);
        }
        self.body.velocity.x += accel * ctx.dt;

        if self.grounded {
            self.can_air_attack = true;
        }
        self.stage_count = if self.grounded { GROUND_STAGES } else { AIR_STAGES };

        if input.pressed(Action::Attack) && (self.grounded || self.can_air_attack) {
            self.attack(ctx);
        }
        self.attack_update(ctx.now);

        if input.pressed(Action::Heal) {
            self.heal(ctx);
        }

        if !self.attacking && input.pressed(Action::Jump) && self.grounded {
            self.jump_requested = true;
        }
    }

    fn dash(&mut self, accel: f32, ctx: &FrameContext<'_>) -> f32 {
        if self.timers.dash_cooldown.active() || !self.dash.consume() {
            return accel;
        }
        self.timers.dash_cooldown.activate(ctx.now);
        self.timers.dash_invuln.activate(ctx.now);
        ctx.events.publish(CombatEvent::Dashed {
            remaining: self.dash.count(),
        });
        self.config.dash_distance * self.facing.sign()
    }

    fn attack(&mut self, ctx: &FrameContext<'_>) {
        if !self.attacking {
            let stage = self.attack_stage.map_or(0, |stage| (stage + 1) % self.stage_count);
            self.attack_stage = Some(stage);
            self.animator.reset();
            self.can_air_boost = true;
            self.timers.dash_cooldown.deactivate();

            let state = if self.grounded {
                AnimState::melee(stage)
            } else {
                AnimState::air(stage.min(AIR_STAGES - 1))
            };
            if let Some(state) = state {
                ctx.events.publish(CombatEvent::Swing {
                    entity_id: self.id,
                    state,
                });
            }
        }

        self.attacking = true;
        self.attack_combo = true;
        self.timers.attack_combo.deactivate();
    }

    fn attack_update(&mut self, now: Millis) {
        let state = self.animator.state();
        if self.attacking && self.animator.completed(self.moves.frames(state)) {
            self.attacking = false;
            self.timers.attack_combo.activate(now);

            if self.attack_stage == Some(AIR_STAGES - 1) && state.is_air_attack() {
                self.can_air_attack = false;
                self.attack_combo = false;
            }
        }

        if self.timers.attack_combo.active() {
            self.attack_combo = false;
            self.attacking = false;
            self.attack_stage = None;

            // one air string per jump
            if !self.grounded {
                self.can_air_attack = false;
            }
        }
    }

    fn heal(&mut self, ctx: &FrameContext<'_>) {
        if self.timers.heal_cooldown.active() || !self.heals.consume() {
            return;
        }
        self.timers.heal_cooldown.activate(ctx.now);
        self.health.heal(self.config.heal_amount);
        debug!("Player healed to {}", self.health.current);
        ctx.events.publish(CombatEvent::Healed {
            health: self.health.current,
            remaining: self.heals.count(),
        });
    }

    // ========================================================================
    // Movement
    // ========================================================================

    fn movement(&mut self, ctx: &FrameContext<'_>) {
        if self.animator.state().is_air_attack() && self.can_air_boost {
            self.body.velocity.y = -self.config.jump_height / 1.7;
            self.can_air_boost = false;
        }

        let motion = Motion {
            gravity: self.config.gravity,
            friction: self.config.friction,
            horizontal_scale: self.config.speed,
            apply_friction: FrictionMode::Always.applies(self.timers.knocked_back.active()),
        };
        integrate(&mut self.body, &motion, ctx.map, ctx.dt);

        if self.jump_requested {
            self.body.velocity.y = -self.config.jump_height;
            self.jump_requested = false;
            ctx.events.publish(CombatEvent::Jumped);
        }

        if self.timers.dash_regen.active() {
            self.dash.regain();
        }

        self.body.sync_visual();
        self.camera.follow(&self.body.hitbox);
    }

    fn flags(&self) -> PlayerFlags {
        PlayerFlags {
            fallen: self.fallen,
            hurt: self.knocked_down
                || self.timers.stun_recovery.active()
                || self.timers.knocked_back.active(),
            grounded: self.grounded,
            attacking: self.attacking,
            attack_stage: self.attack_stage.unwrap_or(0),
            can_air_attack: self.can_air_attack,
            dashing: self.timers.dash_cooldown.active(),
            velocity: self.body.velocity,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Entity id.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Physics body.
    #[must_use]
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Authoritative hitbox.
    #[must_use]
    pub fn hitbox(&self) -> Rect {
        self.body.hitbox
    }

    /// Smoothed camera rectangle.
    #[must_use]
    pub fn camera(&self) -> &CameraFollow {
        &self.camera
    }

    /// Facing direction.
    #[must_use]
    pub fn facing(&self) -> Facing {
        self.facing
    }

    /// Current animation state.
    #[must_use]
    pub fn state(&self) -> AnimState {
        self.animator.state()
    }

    /// Displayed animation frame.
    #[must_use]
    pub fn frame(&self) -> usize {
        self.animator.frame(self.moves.frames(self.animator.state()))
    }

    /// Animation counter.
    #[must_use]
    pub fn animator(&self) -> &Animator {
        &self.animator
    }

    /// Timers.
    #[must_use]
    pub fn timers(&self) -> &PlayerTimers {
        &self.timers
    }

    /// Health.
    #[must_use]
    pub fn health(&self) -> Health {
        self.health
    }

    /// Dash charges.
    #[must_use]
    pub fn dash_charges(&self) -> Charges {
        self.dash
    }

    /// Heal charges.
    #[must_use]
    pub fn heal_charges(&self) -> Charges {
        self.heals
    }

    /// Ground probe result of the last update.
    #[must_use]
    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    /// Whether an attack is committed.
    #[must_use]
    pub fn is_attacking(&self) -> bool {
        self.attacking
    }

    /// Whether a follow-up attack would continue the combo.
    #[must_use]
    pub fn in_combo(&self) -> bool {
        self.attack_combo
    }

    /// Current combo stage; `None` is the base.
    #[must_use]
    pub fn attack_stage(&self) -> Option<usize> {
        self.attack_stage
    }

    /// Whether control is locked.
    #[must_use]
    pub fn is_control_locked(&self) -> bool {
        self.control_lock
    }

    /// Whether health has run out.
    #[must_use]
    pub fn is_fallen(&self) -> bool {
        self.fallen
    }

    /// Whether the death animation and linger have finished.
    #[must_use]
    pub fn is_removable(&self) -> bool {
        self.removable
    }

    /// Whether incoming hits are currently ignored.
    #[must_use]
    pub fn is_invulnerable(&self) -> bool {
        self.timers.hit_cooldown.active() || self.timers.dash_invuln.active()
    }

    /// Overrides current health, e.g. for checkpoints.
    pub fn set_health(&mut self, current: i32) {
        self.health.current = current.min(self.health.max);
    }
}
