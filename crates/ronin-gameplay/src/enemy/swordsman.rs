//! Basic swordsman: walks up, slashes, sometimes chains into a heavier cut.

use super::{EnemyBehavior, EnemyCore, EnemyParams};
use crate::combat::{CombatRng, WeightedTable};
use crate::moveset::{ActorKind, AnimState};
use crate::timer::Millis;

/// Frame the chained second cut starts from, skipping its wind-up.
const CHAIN_ENTRY_FRAME: f32 = 3.0;

/// One in this many finished first cuts chains into the second.
const CHAIN_ODDS: u32 = 3;

/// Rank-and-file melee enemy.
#[derive(Debug, Clone)]
pub struct BasicSwordsman {
    params: EnemyParams,
    attacks: WeightedTable<AnimState>,
    retaliation: WeightedTable<AnimState>,
}

impl Default for BasicSwordsman {
    fn default() -> Self {
        Self {
            params: EnemyParams {
                speed: 25.0,
                sight_range: 200.0,
                attack_range: 40.0,
                max_health: 30,
                ..EnemyParams::default()
            },
            attacks: WeightedTable::new(&[(AnimState::Melee1, 3), (AnimState::Melee2, 1)]),
            retaliation: WeightedTable::new(&[(AnimState::Melee1, 1), (AnimState::Melee2, 1)]),
        }
    }
}

impl EnemyBehavior for BasicSwordsman {
    fn kind(&self) -> ActorKind {
        ActorKind::Swordsman
    }

    fn params(&self) -> &EnemyParams {
        &self.params
    }

    fn select_attack(&mut self, core: &EnemyCore, rng: &mut dyn CombatRng) -> AnimState {
        let table = if core.is_retaliating() {
            &self.retaliation
        } else {
            &self.attacks
        };
        table.pick(rng).unwrap_or(AnimState::Melee1)
    }

    fn on_attack_complete(&mut self, core: &mut EnemyCore, finished: AnimState, rng: &mut dyn CombatRng, now: Millis) {
        if finished == AnimState::Melee1 && rng.below(CHAIN_ODDS) == 1 {
            core.chain_attack(AnimState::Melee2, CHAIN_ENTRY_FRAME);
            return;
        }
        let next = self.select_attack(core, rng);
        core.end_attack_cycle(next, now);
    }
}
