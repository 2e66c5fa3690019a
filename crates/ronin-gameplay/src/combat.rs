//! Shared combat building blocks: health, charge counters, hit intake and
//! the injectable random source behind attack selection.

use ronin_common::{EntityId, Facing, Rect, Team};
use serde::{Deserialize, Serialize};

use crate::collision::CollisionMap;
use crate::events::EventBus;
use crate::hitbox::HitboxSet;
use crate::timer::Millis;

// ============================================================================
// Randomness
// ============================================================================

/// Random source consulted by enemy decision making.
pub trait CombatRng: Send {
    /// Uniform value in `[0, 1)`.
    fn next_f32(&mut self) -> f32;

    /// Uniform integer in `[0, n)`; zero when `n` is zero.
    fn below(&mut self, n: u32) -> u32 {
        if n == 0 {
            return 0;
        }
        ((self.next_f32() * n as f32) as u32).min(n - 1)
    }

    /// True with probability `p`.
    fn chance(&mut self, p: f32) -> bool {
        self.next_f32() < p
    }
}

/// Seeded production random source.
#[derive(Debug, Clone)]
pub struct FastRng(fastrand::Rng);

impl FastRng {
    /// Creates a source from a seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self(fastrand::Rng::with_seed(seed))
    }
}

impl CombatRng for FastRng {
    fn next_f32(&mut self) -> f32 {
        self.0.f32()
    }

    fn below(&mut self, n: u32) -> u32 {
        if n == 0 {
            0
        } else {
            self.0.u32(0..n)
        }
    }
}

/// Replays a fixed cycle of values, for deterministic scenarios.
#[derive(Debug, Clone)]
pub struct SequenceRng {
    values: Vec<f32>,
    cursor: usize,
}

impl SequenceRng {
    /// Creates a source cycling through `values` (each clamped into `[0, 1)`).
    #[must_use]
    pub fn new(values: impl Into<Vec<f32>>) -> Self {
        Self {
            values: values.into(),
            cursor: 0,
        }
    }
}

impl CombatRng for SequenceRng {
    fn next_f32(&mut self) -> f32 {
        if self.values.is_empty() {
            return 0.0;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        value.clamp(0.0, 0.999_999)
    }
}

/// Weighted choice table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedTable<T> {
    entries: Vec<(T, u32)>,
    total: u32,
}

impl<T: Copy> WeightedTable<T> {
    /// Creates a table from `(choice, weight)` pairs.
    #[must_use]
    pub fn new(entries: &[(T, u32)]) -> Self {
        Self {
            entries: entries.to_vec(),
            total: entries.iter().map(|&(_, weight)| weight).sum(),
        }
    }

    /// Picks a choice; `None` when every weight is zero.
    pub fn pick(&self, rng: &mut dyn CombatRng) -> Option<T> {
        let mut roll = rng.below(self.total);
        for &(choice, weight) in &self.entries {
            if roll < weight {
                return Some(choice);
            }
            roll -= weight;
        }
        None
    }

    /// Sum of all weights.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }
}

// ============================================================================
// Counters
// ============================================================================

/// Hit points. Current health may drop below zero; the owner treats
/// `<= 0` as the death transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// Current value
    pub current: i32,
    /// Upper bound for healing
    pub max: i32,
}

impl Health {
    /// Full health.
    #[must_use]
    pub const fn new(max: i32) -> Self {
        Self { current: max, max }
    }

    /// Subtracts damage without clamping.
    pub fn damage(&mut self, amount: i32) {
        self.current -= amount;
    }

    /// Restores up to `amount`, never above max.
    pub fn heal(&mut self, amount: i32) {
        self.current = (self.current + amount).min(self.max);
    }

    /// Whether health has run out.
    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.current <= 0
    }
}

/// Bounded consumable counter (dash charges, heals, ammo).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Charges {
    count: u32,
    max: u32,
}

impl Charges {
    /// A full counter.
    #[must_use]
    pub const fn full(max: u32) -> Self {
        Self { count: max, max }
    }

    /// Remaining charges.
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// Capacity.
    #[must_use]
    pub const fn max(&self) -> u32 {
        self.max
    }

    /// Whether no charge is left.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Spends one charge; false when empty.
    pub fn consume(&mut self) -> bool {
        if self.count == 0 {
            return false;
        }
        self.count -= 1;
        true
    }

    /// Regains one charge up to max.
    pub fn regain(&mut self) {
        self.count = (self.count + 1).min(self.max);
    }

    /// Refills to max.
    pub fn refill(&mut self) {
        self.count = self.max;
    }
}

// ============================================================================
// Hit intake
// ============================================================================

/// Read-only view of the level handed to each entity update.
#[derive(Debug, Clone, Copy)]
pub struct FrameContext<'a> {
    /// Frame delta in seconds
    pub dt: f32,
    /// Simulation clock
    pub now: Millis,
    /// Static terrain
    pub map: &'a CollisionMap,
    /// Hitboxes fully populated for this frame
    pub hitboxes: &'a HitboxSet,
    /// Outgoing events
    pub events: &'a EventBus,
}

/// A hit an entity is about to receive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IncomingHit {
    /// Index of the hitbox in the level's set
    pub index: usize,
    /// Entity that produced it
    pub attacker: EntityId,
    /// Damage dealt
    pub damage: i32,
    /// Knockback force
    pub knockback: f32,
    /// Knocks down
    pub stun: bool,
    /// Direction the target is pushed
    pub direction: Facing,
    /// Came from a projectile
    pub projectile: bool,
}

/// Finds the first hitbox in collection order that can damage `team` at `hitbox`.
#[must_use]
pub fn find_hit(hitboxes: &HitboxSet, team: Team, hitbox: &Rect) -> Option<IncomingHit> {
    hitboxes
        .first_overlap(team, hitbox)
        .map(|(index, source)| IncomingHit {
            index,
            attacker: source.owner,
            damage: source.damage,
            knockback: source.knockback,
            stun: source.stun,
            direction: source.facing,
            projectile: source.projectile.is_some(),
        })
}
