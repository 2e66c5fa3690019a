//! Samurai boss: three cuts and a guard that grows likelier to counter with
//! every blocked hit.

use super::{EnemyBehavior, EnemyCore, EnemyParams};
use crate::combat::{CombatRng, IncomingHit, WeightedTable};
use crate::moveset::{ActorKind, AnimState};

/// Counter chance after a successful counter.
const BASE_COUNTER_ODDS: f32 = 0.25;

/// Counter chance gained per blocked hit without a counter.
const COUNTER_ODDS_STEP: f32 = 0.25;

/// Attack queued when a counter roll succeeds.
const COUNTER_ATTACK: AnimState = AnimState::Melee2;

/// Boss swordsman with a guard.
#[derive(Debug, Clone)]
pub struct BossSamurai {
    params: EnemyParams,
    attacks: WeightedTable<AnimState>,
    retaliation: WeightedTable<AnimState>,
    counter_odds: f32,
}

impl Default for BossSamurai {
    fn default() -> Self {
        Self {
            params: EnemyParams {
                speed: 40.0,
                sight_range: 260.0,
                attack_range: 50.0,
                max_health: 150,
                ..EnemyParams::default()
            },
            attacks: WeightedTable::new(&[
                (AnimState::Melee1, 3),
                (AnimState::Melee2, 2),
                (AnimState::Melee3, 1),
                (AnimState::Block, 2),
            ]),
            retaliation: WeightedTable::new(&[(AnimState::Block, 1), (AnimState::Melee2, 1)]),
            counter_odds: BASE_COUNTER_ODDS,
        }
    }
}

impl BossSamurai {
    /// Current chance that a blocked hit is countered.
    #[must_use]
    pub fn counter_odds(&self) -> f32 {
        self.counter_odds
    }
}

impl EnemyBehavior for BossSamurai {
    fn kind(&self) -> ActorKind {
        ActorKind::Samurai
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

    fn on_counter_hit(&mut self, core: &mut EnemyCore, _hit: &IncomingHit, rng: &mut dyn CombatRng) -> bool {
        if rng.chance(self.counter_odds) {
            self.counter_odds = BASE_COUNTER_ODDS;
            core.end_block();
            core.chain_attack(COUNTER_ATTACK, 0.0);
            true
        } else {
            self.counter_odds = (self.counter_odds + COUNTER_ODDS_STEP).min(1.0);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;
    use ronin_common::{EntityId, Facing};

    use super::super::harness::Harness;
    use super::*;
    use crate::events::CombatEvent;

    #[test]
    fn test_counter_odds_climb_then_reset() {
        let mut samurai = BossSamurai::default();
        let mut h = Harness::new(ActorKind::Samurai, 0.0, vec![0.8]);
        let hit = IncomingHit {
            index: 0,
            attacker: EntityId::new(),
            damage: 10,
            knockback: 1.0,
            stun: false,
            direction: Facing::Left,
            projectile: false,
        };

        for expected in [0.5, 0.75, 1.0] {
            assert!(!samurai.on_counter_hit(&mut h.enemy.core, &hit, &mut h.rng));
            assert!((samurai.counter_odds() - expected).abs() < f32::EPSILON);
        }
        assert!(samurai.on_counter_hit(&mut h.enemy.core, &hit, &mut h.rng));
        assert!((samurai.counter_odds() - BASE_COUNTER_ODDS).abs() < f32::EPSILON);
        assert_eq!(h.enemy.core().next_attack(), COUNTER_ATTACK);
    }

    #[test]
    fn test_block_scenario() {
        // 0.8 rolls the guard from the 8-weight table and misses every
        // counter roll until the odds reach one
        let mut h = Harness::new(ActorKind::Samurai, 0.0, vec![0.8]);
        let approach = Vec2::new(h.center().x + 100.0, 0.0);
        h.step(approach);
        assert_eq!(h.enemy.core().next_attack(), AnimState::Block);

        let close = Vec2::new(h.center().x + 20.0, 0.0);
        h.step(close);
        assert!(h.enemy.core().is_blocking());
        assert_eq!(h.enemy.state(), AnimState::Block);

        h.events.drain();
        h.player_blade(10, false);
        let mut blocked = Vec::new();
        for _ in 0..60 {
            h.step(close);
            for event in h.events.drain() {
                if let CombatEvent::Blocked { countered, .. } = event {
                    blocked.push(countered);
                }
            }
            if blocked.last() == Some(&true) {
                break;
            }
        }
        h.hitboxes.clear();

        assert_eq!(blocked, vec![false, false, false, true]);
        assert_eq!(h.enemy.health().current, 150);
        assert!(!h.enemy.core().is_blocking());
        assert!(!h.enemy.core().timers().attack_cooldown.active());

        h.step(close);
        assert!(h.enemy.is_attacking());
        assert_eq!(h.enemy.state(), COUNTER_ATTACK);
    }

    #[test]
    fn test_counter_waits_for_player_outside_range() {
        let mut h = Harness::new(ActorKind::Samurai, 0.0, vec![0.8]);
        h.step(Vec2::new(h.center().x + 100.0, 0.0));
        h.step(Vec2::new(h.center().x + 20.0, 0.0));
        assert!(h.enemy.core().is_blocking());

        // the blade reaches the guard from past the 50 px attack range
        let outside = Vec2::new(h.center().x + 70.0, 0.0);
        h.events.drain();
        h.player_blade(10, false);
        let mut countered = false;
        for _ in 0..60 {
            h.step(outside);
            countered = h
                .events
                .drain()
                .iter()
                .any(|event| matches!(event, CombatEvent::Blocked { countered: true, .. }));
            if countered {
                break;
            }
        }
        h.hitboxes.clear();

        assert!(countered);
        assert!(h.enemy.core().has_queued_attack());
        assert_eq!(h.enemy.core().next_attack(), COUNTER_ATTACK);

        h.step(outside);
        assert_eq!(h.enemy.core().next_attack(), COUNTER_ATTACK);
        assert!(!h.enemy.is_attacking());

        let mut swung = false;
        for _ in 0..120 {
            h.step(outside);
            if h.enemy.state() == COUNTER_ATTACK {
                swung = true;
                break;
            }
        }
        assert!(swung);
        assert!(!h.enemy.core().has_queued_attack());
    }

    #[test]
    fn test_guard_drops_after_block_window() {
        let mut h = Harness::new(ActorKind::Samurai, 0.0, vec![0.8]);
        h.step(Vec2::new(h.center().x + 100.0, 0.0));
        let close = Vec2::new(h.center().x + 20.0, 0.0);
        h.step(close);
        assert!(h.enemy.core().is_blocking());

        // 800 ms guard
        h.run(52, close);
        assert!(!h.enemy.core().is_blocking());
        assert!(h.enemy.core().timers().attack_cooldown.active());
        assert_eq!(h.enemy.state(), AnimState::Idle);
    }
}
