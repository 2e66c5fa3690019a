//! Archer boss: keeps shooting from range while arrows last, closes in for a
//! knife strike to restock.

use super::{EnemyBehavior, EnemyCore, EnemyParams};
use crate::combat::{Charges, CombatRng, WeightedTable};
use crate::moveset::{ActorKind, AnimState};
use crate::timer::Millis;

/// Arrows carried at full stock.
pub const MAX_AMMO: u32 = 3;

/// Boss that fights at range.
#[derive(Debug, Clone)]
pub struct BossArcher {
    params: EnemyParams,
    /// Distance at which a prepared shot may start
    ranged_range: f32,
    attacks: WeightedTable<AnimState>,
    ammo: Charges,
}

impl Default for BossArcher {
    fn default() -> Self {
        Self {
            params: EnemyParams {
                speed: 30.0,
                sight_range: 300.0,
                attack_range: 35.0,
                max_health: 100,
                ..EnemyParams::default()
            },
            ranged_range: 240.0,
            attacks: WeightedTable::new(&[(AnimState::Shoot, 3), (AnimState::Melee1, 1)]),
            ammo: Charges::full(MAX_AMMO),
        }
    }
}

impl EnemyBehavior for BossArcher {
    fn kind(&self) -> ActorKind {
        ActorKind::Archer
    }

    fn params(&self) -> &EnemyParams {
        &self.params
    }

    fn opening_attack(&self) -> AnimState {
        AnimState::Shoot
    }

    fn select_attack(&mut self, _core: &EnemyCore, rng: &mut dyn CombatRng) -> AnimState {
        match self.attacks.pick(rng) {
            Some(AnimState::Shoot) if !self.ammo.is_empty() => AnimState::Shoot,
            _ => AnimState::Melee1,
        }
    }

    fn attack_range(&self, core: &EnemyCore) -> f32 {
        if core.next_attack() == AnimState::Shoot {
            self.ranged_range
        } else {
            core.params().attack_range
        }
    }

    fn on_attack_complete(&mut self, core: &mut EnemyCore, finished: AnimState, rng: &mut dyn CombatRng, now: Millis) {
        if finished == AnimState::Melee1 {
            self.ammo.refill();
        }
        let next = self.select_attack(core, rng);
        core.end_attack_cycle(next, now);
    }

    fn fire_projectile(&mut self, _core: &mut EnemyCore) -> bool {
        self.ammo.consume()
    }

    fn ammo(&self) -> Option<Charges> {
        Some(self.ammo)
    }
}
