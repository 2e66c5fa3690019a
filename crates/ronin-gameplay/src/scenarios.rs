//! Whole-level scenarios driven through `Level::update`.

use glam::Vec2;
use ronin_common::Rect;

use crate::combat::SequenceRng;
use crate::events::CombatEvent;
use crate::input::{Action, InputState};
use crate::level::{Level, LevelLayout, LevelStatus, Spawn};
use crate::moveset::{ActorKind, AnimState, Roster};
use crate::player::PlayerConfig;

const DT: f32 = 0.016;
const FLOOR_Y: f32 = 300.0;

/// Top-left spawn position that rests `kind`'s hitbox on the floor, centred at `x`.
fn standing(roster: &Roster, kind: ActorKind, x: f32) -> Vec2 {
    let moves = roster.get(kind);
    let size = moves.sprite_size();
    let inset = moves.inset();
    Vec2::new(x - size.x / 2.0, FLOOR_Y - (size.y - inset.y / 2.0))
}

fn arena(enemies: &[(ActorKind, f32, Option<i32>)], extra: &[Rect]) -> Level {
    let roster = Roster::builtin().expect("roster");
    let mut spawns = vec![Spawn {
        kind: ActorKind::Player,
        pos: standing(&roster, ActorKind::Player, 100.0),
        hp: None,
    }];
    spawns.extend(enemies.iter().map(|&(kind, x, hp)| Spawn {
        kind,
        pos: standing(&roster, kind, x),
        hp,
    }));

    let mut geometry = vec![Rect::new(-500.0, FLOOR_Y, 2000.0, 32.0)];
    geometry.extend_from_slice(extra);
    let layout = LevelLayout {
        name: "scenario".to_string(),
        tile_size: 32.0,
        tiles: Vec::new(),
        geometry,
        spawns,
    };
    Level::with_rng(layout, roster, PlayerConfig::default(), Box::new(SequenceRng::new(vec![0.0])))
        .expect("level")
}

fn idle(level: &mut Level, frames: usize) {
    for _ in 0..frames {
        level.update(DT, &InputState::new());
    }
}

#[test]
fn test_idle_scenario() {
    let mut level = arena(&[(ActorKind::Swordsman, 900.0, None)], &[]);
    idle(&mut level, 60);

    let player = level.player();
    assert!(player.is_grounded());
    assert_eq!(player.state(), AnimState::Idle);
    assert!(player.animator().frame_index() > 4.0);
    assert!(player.frame() < 4);
    assert_eq!(player.hitbox().bottom(), FLOOR_Y);
    assert_eq!(level.status(), LevelStatus::Normal);
}

#[test]
fn test_player_clears_level() {
    let mut level = arena(&[(ActorKind::Swordsman, 155.0, Some(1))], &[]);
    level.update(DT, &InputState::new().with(Action::Attack));

    let mut status = LevelStatus::Normal;
    for _ in 0..60 {
        status = level.update(DT, &InputState::new());
        if status != LevelStatus::Normal {
            break;
        }
    }

    assert_eq!(status, LevelStatus::Complete);
    assert_eq!(level.player().health().current, 70);
    let events = level.drain_events();
    assert!(events
        .iter()
        .any(|event| matches!(event, CombatEvent::Died { kind: ActorKind::Swordsman, .. })));
    assert!(events.contains(&CombatEvent::StatusChanged {
        status: LevelStatus::Complete
    }));
}

#[test]
fn test_lethal_hit_fails_level_after_fallen_animation() {
    let mut level = arena(&[(ActorKind::Swordsman, 130.0, None)], &[]);
    level.player_mut().set_health(1);
    level.update(DT, &InputState::new());

    assert!(level.player().is_fallen());
    assert_eq!(level.player().health().current, -4);
    assert_eq!(level.player().state(), AnimState::Fallen);
    assert_eq!(level.hud().health, 0);

    let mut frames = 0;
    while level.status() == LevelStatus::Normal {
        level.update(DT, &InputState::new().with(Action::Attack));
        frames += 1;
        assert!(frames < 200, "level never failed");
        if level.status() == LevelStatus::Normal {
            assert!(!level.player().is_removable());
        }
    }

    assert_eq!(level.status(), LevelStatus::Fail);
    assert!(frames >= 60);
    assert_eq!(level.player().frame(), 5);
}

#[test]
fn test_arrow_lands_and_is_consumed() {
    let mut level = arena(&[(ActorKind::Archer, 330.0, None)], &[]);
    let mut hit_frame = None;
    for frame in 0..120 {
        level.update(DT, &InputState::new());
        if level.player().health().current < 70 {
            hit_frame = Some(frame);
            break;
        }
    }

    assert!(hit_frame.is_some(), "arrow never landed");
    assert_eq!(level.player().health().current, 60);
    assert!(level.hitboxes().iter().all(|hitbox| hitbox.projectile.is_none()));
    assert_eq!(level.hud().boss_ammo, Some(2));
}

#[test]
fn test_arrow_expires_on_wall() {
    let wall = Rect::new(200.0, 236.0, 16.0, 64.0);
    let mut level = arena(&[(ActorKind::Archer, 330.0, None)], &[wall]);
    let mut arrows_seen = 0;
    for _ in 0..120 {
        level.update(DT, &InputState::new());
        arrows_seen += level.hitboxes().iter().filter(|hitbox| hitbox.projectile.is_some()).count();
    }

    assert!(arrows_seen > 0);
    assert_eq!(level.player().health().current, 70);
    assert!(level.hitboxes().iter().all(|hitbox| hitbox.projectile.is_none()));
    assert!(level
        .drain_events()
        .iter()
        .any(|event| matches!(event, CombatEvent::ProjectileFired { .. })));
    assert!(level.snapshot().hitboxes.is_empty());
}

#[test]
fn test_boss_bar_follows_sight() {
    let mut near = arena(&[(ActorKind::Samurai, 300.0, Some(120))], &[]);
    idle(&mut near, 1);
    let bar = near.hud().boss.expect("boss bar");
    assert!(bar.visible);
    assert_eq!(bar.kind, ActorKind::Samurai);
    assert_eq!(bar.max_health, 120);

    let mut far = arena(&[(ActorKind::Samurai, 900.0, None)], &[]);
    idle(&mut far, 1);
    assert!(!far.hud().boss.expect("boss bar").visible);
    assert_eq!(far.hud().boss_ammo, None);
}

#[test]
fn test_snapshot_lists_player_first() {
    let mut level = arena(
        &[(ActorKind::Swordsman, 600.0, None), (ActorKind::Archer, 900.0, None)],
        &[],
    );
    idle(&mut level, 2);
    let snapshot = level.snapshot();

    let kinds: Vec<ActorKind> = snapshot.sprites.iter().map(|sprite| sprite.kind).collect();
    assert_eq!(kinds, vec![ActorKind::Player, ActorKind::Swordsman, ActorKind::Archer]);
    assert_eq!(snapshot.frame, 2);
    assert_eq!(snapshot.time_ms, 32);
    for sprite in &snapshot.sprites {
        assert!(sprite.rect.contains(&sprite.hitbox));
    }
}
