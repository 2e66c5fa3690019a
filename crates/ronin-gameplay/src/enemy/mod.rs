//! Enemy entities.
//!
//! Every enemy runs the same frame algorithm on an [`EnemyCore`]; the
//! variant-specific parts (attack choice, ranges, blocking, ammunition) are
//! supplied by an [`EnemyBehavior`] implementation that holds only the
//! parameters its variant needs.
//!
//! Frame order: snapshot, timers, probes, hit intake, stun flag, block
//! expiry, player search, movement, attack logic, state derivation,
//! animation.

pub mod archer;
pub mod samurai;
pub mod swordsman;

use std::fmt;
use std::sync::Arc;

use glam::Vec2;
use ronin_common::{EntityId, Facing, Rect, Team};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::animation::{derive_enemy_state, Animator, EnemyFlags};
use crate::collision::{CollisionMap, EdgeProbe};
use crate::combat::{find_hit, Charges, CombatRng, FrameContext, Health, IncomingHit};
use crate::events::{CombatEvent, EventBus};
use crate::hitbox::{Hitbox, HitboxSet};
use crate::moveset::{ActorKind, AnimState, MoveSet, Roster};
use crate::physics::{integrate, Body, Contacts, FrictionMode, Motion, FRICTION, GRAVITY};
use crate::timer::{Millis, Timer};

pub use archer::BossArcher;
pub use samurai::BossSamurai;
pub use swordsman::BasicSwordsman;

/// Numeric parameters shared by every enemy variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyParams {
    /// Walking speed in pixels per second
    pub speed: f32,
    /// Horizontal distance under which the player is noticed
    pub sight_range: f32,
    /// Horizontal distance under which melee attacks start
    pub attack_range: f32,
    /// Starting health unless the spawn overrides it
    pub max_health: i32,
    /// Downward acceleration
    pub gravity: f32,
    /// Horizontal damping
    pub friction: f32,
    /// When friction applies
    pub friction_mode: FrictionMode,
    /// Horizontal scale while knocked back
    pub knockback_scale: f32,
    /// Upward impulse of a knockdown
    pub knockdown_lift: f32,
    /// Rest between attack cycles
    pub attack_cooldown_ms: Millis,
    /// Stun after a knockdown
    pub stun_recovery_ms: Millis,
    /// Knockback slide duration
    pub knocked_back_ms: Millis,
    /// Invulnerability after a hit
    pub hit_cooldown_ms: Millis,
    /// Linger time after death before removal
    pub fallen_ms: Millis,
    /// Guard duration
    pub block_ms: Millis,
}

impl Default for EnemyParams {
    fn default() -> Self {
        Self {
            speed: 25.0,
            sight_range: 200.0,
            attack_range: 40.0,
            max_health: 30,
            gravity: GRAVITY,
            friction: FRICTION,
            friction_mode: FrictionMode::KnockbackOnly,
            knockback_scale: 10.0,
            knockdown_lift: 100.0,
            attack_cooldown_ms: 1200,
            stun_recovery_ms: 1000,
            knocked_back_ms: 700,
            hit_cooldown_ms: 200,
            fallen_ms: 1000,
            block_ms: 800,
        }
    }
}

/// Every timer an enemy owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyTimers {
    /// Rest between attack cycles
    pub attack_cooldown: Timer,
    /// Stun after a knockdown
    pub stun_recovery: Timer,
    /// Knockback slide
    pub knocked_back: Timer,
    /// Post-hit invulnerability
    pub hit_cooldown: Timer,
    /// Death linger
    pub fallen: Timer,
    /// Guard window
    pub block: Timer,
}

impl EnemyTimers {
    fn new(params: &EnemyParams) -> Self {
        Self {
            attack_cooldown: Timer::new(params.attack_cooldown_ms).sustained(),
            stun_recovery: Timer::new(params.stun_recovery_ms).sustained(),
            knocked_back: Timer::new(params.knocked_back_ms).sustained(),
            hit_cooldown: Timer::new(params.hit_cooldown_ms).sustained(),
            fallen: Timer::new(params.fallen_ms).sustained(),
            block: Timer::new(params.block_ms).sustained(),
        }
    }

    fn update(&mut self, now: Millis) {
        for timer in [
            &mut self.attack_cooldown,
            &mut self.stun_recovery,
            &mut self.knocked_back,
            &mut self.hit_cooldown,
            &mut self.fallen,
            &mut self.block,
        ] {
            timer.update(now);
        }
    }
}

/// Variant-specific enemy decisions.
///
/// Default methods implement the shared algorithm; a variant overrides only
/// what makes it different.
pub trait EnemyBehavior: fmt::Debug + Send {
    /// Actor kind of the variant.
    fn kind(&self) -> ActorKind;

    /// Shared parameters.
    fn params(&self) -> &EnemyParams;

    /// Attack prepared before the first roll.
    fn opening_attack(&self) -> AnimState {
        AnimState::Melee1
    }

    /// Picks the next attack (or block) from the variant's tables.
    fn select_attack(&mut self, core: &EnemyCore, rng: &mut dyn CombatRng) -> AnimState;

    /// Distance at which the prepared attack may start.
    fn attack_range(&self, core: &EnemyCore) -> f32 {
        core.params.attack_range
    }

    /// Steers and integrates the body for one frame.
    fn integrate_movement(&mut self, core: &mut EnemyCore, ctx: &FrameContext<'_>) -> Contacts {
        core.steer();
        core.integrate(ctx.map, ctx.dt)
    }

    /// Derives the animation state.
    fn derive_state(&self, core: &EnemyCore) -> AnimState {
        derive_enemy_state(&core.flags())
    }

    /// Reacts to a hit absorbed by the guard; returns whether a counter was queued.
    fn on_counter_hit(
        &mut self,
        _core: &mut EnemyCore,
        _hit: &IncomingHit,
        _rng: &mut dyn CombatRng,
    ) -> bool {
        false
    }

    /// Runs when an attack animation has played through.
    fn on_attack_complete(
        &mut self,
        core: &mut EnemyCore,
        _finished: AnimState,
        rng: &mut dyn CombatRng,
        now: Millis,
    ) {
        let next = self.select_attack(core, rng);
        core.end_attack_cycle(next, now);
    }

    /// Spends ammunition for a projectile; false refuses the shot.
    fn fire_projectile(&mut self, _core: &mut EnemyCore) -> bool {
        true
    }

    /// Remaining ammunition, for ranged variants.
    fn ammo(&self) -> Option<Charges> {
        None
    }
}

/// State shared by every enemy variant.
#[derive(Debug, Clone)]
pub struct EnemyCore {
    id: EntityId,
    moves: Arc<MoveSet>,
    params: EnemyParams,
    body: Body,
    facing: Facing,
    animator: Animator,
    timers: EnemyTimers,
    health: Health,

    grounded: bool,
    edges: EdgeProbe,
    target: Vec2,
    player_found: bool,
    can_attack: bool,

    attacking: bool,
    current_attack: Option<AnimState>,
    next_attack: AnimState,
    /// Frame a chained attack starts from
    entry_frame: f32,
    /// A chained or counter attack is waiting to be committed
    queued: bool,
    retaliating: bool,
    shot_fired: bool,

    stunned: bool,
    blocking: bool,
    fallen: bool,
    removable: bool,
}

impl EnemyCore {
    fn new(
        moves: Arc<MoveSet>,
        params: EnemyParams,
        opening: AnimState,
        top_left: Vec2,
        hp: Option<i32>,
    ) -> Self {
        let body = Body::new(top_left, moves.sprite_size(), moves.inset());
        let target = body.center();
        Self {
            id: EntityId::new(),
            timers: EnemyTimers::new(&params),
            health: Health::new(hp.unwrap_or(params.max_health)),
            moves,
            params,
            body,
            facing: Facing::Right,
            animator: Animator::new(AnimState::Idle),
            grounded: false,
            edges: EdgeProbe::default(),
            target,
            player_found: false,
            can_attack: false,
            attacking: false,
            current_attack: None,
            next_attack: opening,
            entry_frame: 0.0,
            queued: false,
            retaliating: false,
            shot_fired: false,
            stunned: false,
            blocking: false,
            fallen: false,
            removable: false,
        }
    }

    // ========================================================================
    // Movement
    // ========================================================================

    /// Sets horizontal velocity from the chase rules and ledge probes.
    pub fn steer(&mut self) {
        let knocked_back = self.timers.knocked_back.active();
        if !knocked_back {
            self.body.velocity.x = 0.0;
            if self.player_found && !self.stunned && !self.fallen && !self.blocking {
                if !self.attacking {
                    self.facing = Facing::toward(self.target.x - self.body.center().x, self.facing);
                }
                if !self.can_attack {
                    self.body.velocity.x = self.facing.sign() * self.params.speed;
                }
            }
        }

        if self.grounded && !knocked_back && self.edges.blocks(self.body.velocity.x) {
            self.body.velocity.x = 0.0;
        }
    }

    /// Integrates the body and recentres the visual rectangle.
    pub fn integrate(&mut self, map: &CollisionMap, dt: f32) -> Contacts {
        let knocked_back = self.timers.knocked_back.active();
        let motion = Motion {
            gravity: self.params.gravity,
            friction: self.params.friction,
            horizontal_scale: if knocked_back { self.params.knockback_scale } else { 1.0 },
            apply_friction: self.params.friction_mode.applies(knocked_back),
        };
        let contacts = integrate(&mut self.body, &motion, map, dt);
        self.body.sync_visual();
        contacts
    }

    // ========================================================================
    // Combat
    // ========================================================================

    /// Closes an attack cycle: rest, forget the grudge, prepare `next`.
    pub fn end_attack_cycle(&mut self, next: AnimState, now: Millis) {
        self.timers.attack_cooldown.activate(now);
        self.retaliating = false;
        self.next_attack = next;
        self.entry_frame = 0.0;
        self.queued = false;
    }

    /// Queues a follow-up that starts from `entry_frame` as soon as the
    /// player is in range. It survives re-selection until committed.
    pub fn chain_attack(&mut self, next: AnimState, entry_frame: f32) {
        self.next_attack = next;
        self.entry_frame = entry_frame;
        self.queued = true;
    }

    /// Raises the guard.
    pub fn begin_block(&mut self, now: Millis) {
        self.blocking = true;
        self.timers.block.activate(now);
    }

    fn end_block(&mut self) {
        self.blocking = false;
        self.timers.block.deactivate();
    }

    fn knock_back(&mut self, direction: Facing, force: f32, now: Millis) {
        self.body.velocity.x = direction.sign() * force;
        self.timers.knocked_back.activate(now);
    }

    fn knock_down(&mut self, direction: Facing, force: f32, now: Millis) {
        if self.stunned {
            return;
        }
        self.attacking = false;
        self.current_attack = None;
        self.can_attack = false;
        self.queued = false;
        self.end_block();
        self.knock_back(direction, force, now);
        self.body.velocity.y = -self.params.knockdown_lift;
        self.timers.stun_recovery.activate(now);
    }

    fn die(&mut self, now: Millis, events: &EventBus) {
        self.fallen = true;
        self.attacking = false;
        self.current_attack = None;
        self.queued = false;
        self.end_block();
        self.animator.reset();
        self.timers.fallen.activate(now);
        debug!("{} {} has fallen", self.moves.kind(), self.id);
        events.publish(CombatEvent::Died {
            entity_id: self.id,
            kind: self.moves.kind(),
        });
    }

    fn commit(&mut self, events: &EventBus, now: Millis) {
        self.queued = false;
        if self.next_attack == AnimState::Block {
            trace!("{} raises its guard", self.id);
            self.begin_block(now);
            return;
        }
        self.attacking = true;
        self.current_attack = Some(self.next_attack);
        self.shot_fired = false;
        self.animator.set_frame(self.entry_frame);
        self.entry_frame = 0.0;
        events.publish(CombatEvent::Swing {
            entity_id: self.id,
            state: self.next_attack,
        });
    }

    /// Flags the visual state is derived from.
    #[must_use]
    pub fn flags(&self) -> EnemyFlags {
        EnemyFlags {
            fallen: self.fallen,
            stunned: self.stunned,
            blocking: self.blocking,
            attack: self.current_attack.filter(|_| self.attacking),
            moving: self.body.velocity.x != 0.0,
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

    /// Shared parameters.
    #[must_use]
    pub fn params(&self) -> &EnemyParams {
        &self.params
    }

    /// Physics body.
    #[must_use]
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Timers.
    #[must_use]
    pub fn timers(&self) -> &EnemyTimers {
        &self.timers
    }

    /// Health.
    #[must_use]
    pub fn health(&self) -> Health {
        self.health
    }

    /// Attack prepared for the next commit.
    #[must_use]
    pub fn next_attack(&self) -> AnimState {
        self.next_attack
    }

    /// Whether a chained or counter attack is waiting for the player.
    #[must_use]
    pub fn has_queued_attack(&self) -> bool {
        self.queued
    }

    /// Whether the last hit taken has not been answered yet.
    #[must_use]
    pub fn is_retaliating(&self) -> bool {
        self.retaliating
    }

    /// Whether the guard is up.
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        self.blocking
    }
}

/// An enemy: shared core plus variant behaviour.
#[derive(Debug)]
pub struct Enemy {
    core: EnemyCore,
    behavior: Box<dyn EnemyBehavior>,
}

impl Enemy {
    /// Builds an enemy around a behaviour.
    #[must_use]
    pub fn new(moves: Arc<MoveSet>, behavior: Box<dyn EnemyBehavior>, top_left: Vec2, hp: Option<i32>) -> Self {
        let core = EnemyCore::new(moves, behavior.params().clone(), behavior.opening_attack(), top_left, hp);
        Self { core, behavior }
    }

    /// Spawns the default variant for `kind`; `None` for the player kind.
    #[must_use]
    pub fn spawn(kind: ActorKind, top_left: Vec2, hp: Option<i32>, roster: &Roster) -> Option<Self> {
        let behavior: Box<dyn EnemyBehavior> = match kind {
            ActorKind::Swordsman => Box::new(BasicSwordsman::default()),
            ActorKind::Samurai => Box::new(BossSamurai::default()),
            ActorKind::Archer => Box::new(BossArcher::default()),
            ActorKind::Player => return None,
        };
        Some(Self::new(Arc::clone(roster.get(kind)), behavior, top_left, hp))
    }

    // ========================================================================
    // Frame update
    // ========================================================================

    /// Runs one frame against the player at `target`. Returns the index of
    /// the hitbox that landed or was blocked, if any.
    pub fn update(&mut self, ctx: &FrameContext<'_>, target: Vec2, rng: &mut dyn CombatRng) -> Option<usize> {
        self.core.body.snapshot();
        self.core.target = target;
        self.core.timers.update(ctx.now);

        self.core.grounded = ctx.map.ground_probe(&self.core.body.hitbox);
        self.core.edges = ctx.map.edge_probes(&self.core.body.hitbox);

        let landed = self.take_hit(ctx, rng);
        self.core.stunned = self.core.timers.stun_recovery.active();

        if self.core.blocking && !self.core.timers.block.active() {
            self.core.end_block();
            let next = self.behavior.select_attack(&self.core, rng);
            self.core.end_attack_cycle(next, ctx.now);
        }

        if !self.core.fallen {
            self.find_player(rng);
        }
        self.behavior.integrate_movement(&mut self.core, ctx);
        if !self.core.fallen {
            self.attack(ctx, rng);
        }

        let state = self.behavior.derive_state(&self.core);
        self.core.animator.set_state(state);
        self.core.animator.advance(ctx.dt);

        if self.core.fallen
            && !self.core.timers.fallen.active()
            && self.core.animator.completed(self.core.moves.frames(AnimState::Fallen))
        {
            self.core.removable = true;
        }

        landed
    }

    fn take_hit(&mut self, ctx: &FrameContext<'_>, rng: &mut dyn CombatRng) -> Option<usize> {
        let core = &mut self.core;
        if core.fallen || core.timers.hit_cooldown.active() {
            return None;
        }
        let hit = find_hit(ctx.hitboxes, Team::Enemy, &core.body.hitbox)?;
        core.timers.hit_cooldown.activate(ctx.now);

        if core.blocking {
            core.timers.attack_cooldown.deactivate();
            let countered = self.behavior.on_counter_hit(core, &hit, rng);
            debug!("{} blocked a hit from {} (counter: {countered})", core.id, hit.attacker);
            ctx.events.publish(CombatEvent::Blocked {
                target: core.id,
                countered,
            });
            return Some(hit.index);
        }

        core.health.damage(hit.damage);
        core.retaliating = true;
        debug!(
            "{} {} took {} from {} ({} left)",
            core.moves.kind(),
            core.id,
            hit.damage,
            hit.attacker,
            core.health.current
        );
        ctx.events.publish(CombatEvent::Hit {
            target: core.id,
            team: Team::Enemy,
            source: hit.attacker,
            damage: hit.damage,
            knockdown: hit.stun,
        });

        if core.health.is_depleted() {
            core.die(ctx.now, ctx.events);
        } else if hit.stun {
            core.knock_down(hit.direction, hit.knockback, ctx.now);
        } else {
            core.knock_back(hit.direction, hit.knockback, ctx.now);
        }
        Some(hit.index)
    }

    fn find_player(&mut self, rng: &mut dyn CombatRng) {
        let distance = (self.core.body.center().x - self.core.target.x).abs();
        self.core.player_found = distance < self.core.params.sight_range;

        if distance < self.behavior.attack_range(&self.core) {
            self.core.can_attack = true;
        } else if !self.core.attacking {
            self.core.can_attack = false;
            if self.core.queued {
                return;
            }
            self.core.next_attack = self.behavior.select_attack(&self.core, rng);
            self.core.entry_frame = 0.0;
        }
    }

    fn attack(&mut self, ctx: &FrameContext<'_>, rng: &mut dyn CombatRng) {
        let core = &mut self.core;
        if core.can_attack
            && !core.attacking
            && !core.blocking
            && !core.stunned
            && !core.timers.attack_cooldown.active()
        {
            core.commit(ctx.events, ctx.now);
        }

        let Some(state) = core.current_attack.filter(|_| core.attacking) else {
            return;
        };
        if core.animator.completed(core.moves.frames(state)) {
            core.attacking = false;
            core.current_attack = None;
            self.behavior.on_attack_complete(core, state, rng, ctx.now);
        }
    }

    /// Spawns contact and attack hitboxes for this frame.
    pub fn emit_hitboxes(&mut self, hitboxes: &mut HitboxSet, now: Millis, events: &EventBus) {
        let core = &mut self.core;
        if core.fallen {
            return;
        }
        let moves = Arc::clone(&core.moves);
        let anchor = core.body.center();

        if let Some(state) = core.current_attack.filter(|_| core.attacking) {
            if let Some(attack) = moves.attack(state) {
                if attack.is_impact_frame(core.animator.raw_frame()) {
                    match attack.projectile.as_ref() {
                        Some(spec) => {
                            if !core.shot_fired && self.behavior.fire_projectile(core) {
                                core.shot_fired = true;
                                hitboxes.push(Hitbox::projectile(
                                    Team::Enemy,
                                    core.id,
                                    anchor,
                                    core.facing,
                                    attack,
                                    spec,
                                    now,
                                ));
                                events.publish(CombatEvent::ProjectileFired {
                                    entity_id: core.id,
                                    ammo: self.behavior.ammo().map_or(0, |ammo| ammo.count()),
                                });
                            }
                        },
                        None => hitboxes.push(Hitbox::melee(Team::Enemy, core.id, anchor, core.facing, attack)),
                    }
                }
            }
        }

        if let Some(contact) = moves.contact() {
            hitboxes.push(Hitbox::melee(Team::Enemy, core.id, anchor, core.facing, contact));
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Shared state.
    #[must_use]
    pub fn core(&self) -> &EnemyCore {
        &self.core
    }

    /// Entity id.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.core.id
    }

    /// Actor kind.
    #[must_use]
    pub fn kind(&self) -> ActorKind {
        self.behavior.kind()
    }

    /// Authoritative hitbox.
    #[must_use]
    pub fn hitbox(&self) -> Rect {
        self.core.body.hitbox
    }

    /// Visual rectangle.
    #[must_use]
    pub fn rect(&self) -> Rect {
        self.core.body.rect
    }

    /// Facing direction.
    #[must_use]
    pub fn facing(&self) -> Facing {
        self.core.facing
    }

    /// Current animation state.
    #[must_use]
    pub fn state(&self) -> AnimState {
        self.core.animator.state()
    }

    /// Displayed animation frame.
    #[must_use]
    pub fn frame(&self) -> usize {
        let state = self.core.animator.state();
        self.core.animator.frame(self.core.moves.frames(state))
    }

    /// Health.
    #[must_use]
    pub fn health(&self) -> Health {
        self.core.health
    }

    /// Remaining ammunition, for ranged variants.
    #[must_use]
    pub fn ammo(&self) -> Option<Charges> {
        self.behavior.ammo()
    }

    /// Whether the player is within sight.
    #[must_use]
    pub fn player_found(&self) -> bool {
        self.core.player_found
    }

    /// Whether an attack is committed.
    #[must_use]
    pub fn is_attacking(&self) -> bool {
        self.core.attacking
    }

    /// Whether a knockdown stun is running.
    #[must_use]
    pub fn is_stunned(&self) -> bool {
        self.core.stunned
    }

    /// Whether health has run out.
    #[must_use]
    pub fn is_fallen(&self) -> bool {
        self.core.fallen
    }

    /// Whether the death animation and linger have finished.
    #[must_use]
    pub fn is_removable(&self) -> bool {
        self.core.removable
    }
}

#[cfg(test)]
mod harness {
    use super::*;
    use crate::combat::SequenceRng;

    pub(super) const DT: f32 = 0.016;
    pub(super) const FLOOR_Y: f32 = 300.0;

    pub(super) struct Harness {
        pub enemy: Enemy,
        pub map: CollisionMap,
        pub hitboxes: HitboxSet,
        pub events: EventBus,
        pub rng: SequenceRng,
        pub now: Millis,
    }

    impl Harness {
        /// Spawns `kind` standing on a long floor with its hitbox centred near `x`.
        pub fn new(kind: ActorKind, x: f32, rng: Vec<f32>) -> Self {
            let map = CollisionMap::new(vec![Rect::new(-2000.0, FLOOR_Y, 6000.0, 32.0)]);
            Self::on_map(kind, x, rng, map)
        }

        pub fn on_map(kind: ActorKind, x: f32, rng: Vec<f32>, map: CollisionMap) -> Self {
            let roster = Roster::builtin().expect("builtin roster");
            let moves = roster.get(kind);
            let size = moves.sprite_size();
            let inset = moves.inset();
            let top_left = Vec2::new(x - size.x / 2.0, FLOOR_Y - (size.y - inset.y / 2.0));
            let enemy = Enemy::spawn(kind, top_left, None, &roster).expect("enemy kind");
            Self {
                enemy,
                map,
                hitboxes: HitboxSet::new(),
                events: EventBus::new(4096),
                rng: SequenceRng::new(rng),
                now: 0,
            }
        }

        pub fn step(&mut self, target: Vec2) -> Option<usize> {
            self.now += 16;
            let ctx = FrameContext {
                dt: DT,
                now: self.now,
                map: &self.map,
                hitboxes: &self.hitboxes,
                events: &self.events,
            };
            self.enemy.update(&ctx, target, &mut self.rng)
        }

        pub fn run(&mut self, frames: usize, target: Vec2) {
            for _ in 0..frames {
                self.step(target);
            }
        }

        /// Emits this frame's hitboxes into a scratch set.
        pub fn emitted(&mut self) -> HitboxSet {
            let mut set = HitboxSet::new();
            self.enemy.emit_hitboxes(&mut set, self.now, &self.events);
            set
        }

        pub fn center(&self) -> Vec2 {
            self.enemy.hitbox().center()
        }

        pub fn player_blade(&mut self, damage: i32, stun: bool) {
            let attack = crate::moveset::AttackSpec {
                size: Vec2::new(300.0, 300.0),
                offset: Vec2::ZERO,
                damage,
                knockback: 20.0,
                stun,
                impact: vec![0],
                projectile: None,
            };
            let center = self.center();
            self.hitboxes.push(Hitbox::melee(Team::Player, EntityId::new(), center, Facing::Right, &attack));
        }
    }
}
