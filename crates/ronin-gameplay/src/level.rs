//! Level orchestration.
//!
//! A [`Level`] owns the terrain, the player, the enemies and every live
//! hitbox, and advances them in a fixed order each frame:
//!
//! 1. advance the clock and clear non-sustained hitboxes;
//! 2. while the level is running: emit hitboxes, move projectiles, update the
//!    player, update the enemies, consume landed projectiles, drop removable
//!    enemies;
//! 3. refresh the HUD;
//! 4. evaluate the level status.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use glam::Vec2;
use ronin_common::{EntityId, Facing, Rect, RoninError, Team};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::collision::CollisionMap;
use crate::combat::{CombatRng, FastRng, FrameContext};
use crate::enemy::Enemy;
use crate::events::{CombatEvent, EventBus};
use crate::hitbox::HitboxSet;
use crate::input::InputState;
use crate::moveset::{ActorKind, AnimState, Roster};
use crate::player::{Player, PlayerConfig};
use crate::timer::Millis;

/// Built-in demo level.
pub const BUILTIN_LEVEL: &str = include_str!("../data/levels/dojo.toml");

/// Default tile edge in pixels.
pub const TILE_SIZE: f32 = 32.0;

/// Errors raised while loading a level.
#[derive(Debug, Error)]
pub enum LevelError {
    /// The TOML document could not be parsed.
    #[error("Failed to parse level TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The layout file could not be read.
    #[error("Failed to read level {path}: {source}")]
    Io {
        /// Layout path
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// No player spawn.
    #[error("Level '{0}' has no player spawn")]
    MissingPlayer(String),

    /// More than one player spawn.
    #[error("Level '{name}' has {count} player spawns")]
    DuplicatePlayer {
        /// Level name
        name: String,
        /// Number of player spawns
        count: usize,
    },

    /// Tile size is not strictly positive.
    #[error("Invalid tile size {0}")]
    InvalidTileSize(f32),
}

impl From<LevelError> for RoninError {
    fn from(err: LevelError) -> Self {
        match err {
            LevelError::Parse(e) => RoninError::Parse(e.to_string()),
            LevelError::Io { source, .. } => RoninError::Io(source),
            other => RoninError::InvalidData(other.to_string()),
        }
    }
}

// ============================================================================
// Layout
// ============================================================================

fn default_tile_size() -> f32 {
    TILE_SIZE
}

/// One entity placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spawn {
    /// Actor kind
    pub kind: ActorKind,
    /// Top-left corner of the sprite rectangle
    pub pos: Vec2,
    /// Health override for enemies
    #[serde(default)]
    pub hp: Option<i32>,
}

/// Static description of a level: terrain plus spawns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelLayout {
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Edge length of one tile in `tiles`
    #[serde(default = "default_tile_size")]
    pub tile_size: f32,
    /// Tile rows; `#` marks a solid tile
    #[serde(default)]
    pub tiles: Vec<String>,
    /// Extra solid rectangles, appended after the tiles
    #[serde(default)]
    pub geometry: Vec<Rect>,
    /// Entity placements
    #[serde(default)]
    pub spawns: Vec<Spawn>,
}

impl LevelLayout {
    /// Parses and validates a layout from TOML.
    pub fn from_toml_str(source: &str) -> Result<Self, LevelError> {
        let layout: Self = toml::from_str(source)?;
        layout.validate()?;
        Ok(layout)
    }

    /// Reads a layout file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, LevelError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| LevelError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// The compiled-in demo level.
    pub fn builtin() -> Result<Self, LevelError> {
        Self::from_toml_str(BUILTIN_LEVEL)
    }

    /// Checks spawn and tile invariants.
    pub fn validate(&self) -> Result<(), LevelError> {
        if self.tile_size <= 0.0 {
            return Err(LevelError::InvalidTileSize(self.tile_size));
        }
        match self.spawns.iter().filter(|spawn| spawn.kind == ActorKind::Player).count() {
            0 => Err(LevelError::MissingPlayer(self.name.clone())),
            1 => Ok(()),
            count => Err(LevelError::DuplicatePlayer {
                name: self.name.clone(),
                count,
            }),
        }
    }

    /// Solid rectangles in collection order: tiles row by row, then extra geometry.
    #[must_use]
    pub fn solids(&self) -> Vec<Rect> {
        let size = self.tile_size;
        let tiles = self.tiles.iter().enumerate().flat_map(|(row, line)| {
            line.chars()
                .enumerate()
                .filter(|&(_, cell)| cell == '#')
                .map(move |(col, _)| Rect::new(col as f32 * size, row as f32 * size, size, size))
        });
        tiles.chain(self.geometry.iter().copied()).collect()
    }

    fn player_spawn(&self) -> Option<&Spawn> {
        self.spawns.iter().find(|spawn| spawn.kind == ActorKind::Player)
    }
}

// ============================================================================
// Status and views
// ============================================================================

/// Outcome of a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelStatus {
    /// Still being played
    #[default]
    Normal,
    /// Every enemy has been cleared
    Complete,
    /// The player has fallen
    Fail,
}

/// Boss health bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BossBar {
    /// Boss kind
    pub kind: ActorKind,
    /// Current health, floored at zero
    pub health: i32,
    /// Health the bar is scaled to
    pub max_health: i32,
    /// Shown only while the boss has found the player and is alive
    pub visible: bool,
}

/// Values the HUD draws.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HudState {
    /// Player health, floored at zero
    pub health: i32,
    /// Player maximum health
    pub max_health: i32,
    /// Heal charges left
    pub heals: u32,
    /// Heal capacity
    pub max_heals: u32,
    /// Dash charges left
    pub dashes: u32,
    /// Dash capacity
    pub max_dashes: u32,
    /// Boss bar, when the level has a boss
    pub boss: Option<BossBar>,
    /// Boss ammunition, for ranged bosses
    pub boss_ammo: Option<u32>,
}

/// One drawable entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpriteView {
    /// Entity id
    pub id: EntityId,
    /// Actor kind
    pub kind: ActorKind,
    /// Visual rectangle
    pub rect: Rect,
    /// Authoritative hitbox
    pub hitbox: Rect,
    /// Animation state
    pub state: AnimState,
    /// Displayed frame
    pub frame: usize,
    /// Facing
    pub facing: Facing,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    /// Frames simulated so far
    pub frame: u64,
    /// Simulation clock
    pub time_ms: Millis,
    /// Level status
    pub status: LevelStatus,
    /// Camera centre
    pub camera: Vec2,
    /// Player first, then enemies in spawn order
    pub sprites: Vec<SpriteView>,
    /// Visible hitboxes (projectiles)
    pub hitboxes: Vec<Rect>,
}

// ============================================================================
// Level
// ============================================================================

/// A running level.
pub struct Level {
    layout: LevelLayout,
    roster: Roster,
    player_config: PlayerConfig,
    map: CollisionMap,
    player: Player,
    enemies: Vec<Enemy>,
    boss: Option<(EntityId, ActorKind, i32)>,
    hitboxes: HitboxSet,
    events: EventBus,
    /// Events of past frames, waiting for the shell
    pending_events: Vec<CombatEvent>,
    rng: Box<dyn CombatRng>,
    elapsed: f64,
    now: Millis,
    frame: u64,
    status: LevelStatus,
    hud: HudState,
}

impl fmt::Debug for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Level")
            .field("name", &self.layout.name)
            .field("frame", &self.frame)
            .field("status", &self.status)
            .field("enemies", &self.enemies.len())
            .field("hitboxes", &self.hitboxes.len())
            .finish_non_exhaustive()
    }
}

impl Level {
    /// Builds a level with a seeded random source.
    pub fn new(layout: LevelLayout, roster: Roster, seed: u64) -> Result<Self, LevelError> {
        Self::with_rng(layout, roster, PlayerConfig::default(), Box::new(FastRng::new(seed)))
    }

    /// Builds a level with an explicit player configuration and random source.
    pub fn with_rng(
        layout: LevelLayout,
        roster: Roster,
        player_config: PlayerConfig,
        rng: Box<dyn CombatRng>,
    ) -> Result<Self, LevelError> {
        layout.validate()?;
        let spawn = layout
            .player_spawn()
            .ok_or_else(|| LevelError::MissingPlayer(layout.name.clone()))?;
        let player = Player::new(spawn.pos, Arc::clone(roster.get(ActorKind::Player)), player_config.clone(), 0);

        let mut level = Self {
            map: CollisionMap::new(layout.solids()),
            player,
            enemies: Vec::new(),
            boss: None,
            hitboxes: HitboxSet::new(),
            events: EventBus::default(),
            pending_events: Vec::new(),
            rng,
            elapsed: 0.0,
            now: 0,
            frame: 0,
            status: LevelStatus::Normal,
            hud: HudState::default(),
            layout,
            roster,
            player_config,
        };
        level.spawn_enemies();
        level.refresh_hud();
        info!(
            "Level '{}' ready: {} solids, {} enemies",
            level.layout.name,
            level.map.len(),
            level.enemies.len()
        );
        Ok(level)
    }

    fn spawn_enemies(&mut self) {
        self.enemies.clear();
        self.boss = None;
        for spawn in &self.layout.spawns {
            let Some(enemy) = Enemy::spawn(spawn.kind, spawn.pos, spawn.hp, &self.roster) else {
                continue;
            };
            if spawn.kind.is_boss() {
                if self.boss.is_some() {
                    warn!("Level '{}' has more than one boss; the bar tracks the first", self.layout.name);
                } else {
                    self.boss = Some((enemy.id(), spawn.kind, enemy.health().max));
                }
            }
            self.enemies.push(enemy);
        }
    }

    /// Restores the level to its initial layout.
    pub fn reset(&mut self) {
        let Some(spawn) = self.layout.player_spawn() else {
            return;
        };
        self.player = Player::new(
            spawn.pos,
            Arc::clone(self.roster.get(ActorKind::Player)),
            self.player_config.clone(),
            0,
        );
        self.spawn_enemies();
        self.hitboxes.clear();
        self.events.drain();
        self.pending_events.clear();
        self.elapsed = 0.0;
        self.now = 0;
        self.frame = 0;
        self.status = LevelStatus::Normal;
        self.refresh_hud();
        info!("Level '{}' reset", self.layout.name);
    }

    /// Advances the level by `dt` seconds.
    pub fn update(&mut self, dt: f32, input: &InputState) -> LevelStatus {
        self.elapsed += f64::from(dt);
        self.now = (self.elapsed * 1000.0) as Millis;
        self.frame += 1;
        self.hitboxes.clear_transient();

        if self.status == LevelStatus::Normal {
            self.simulate(dt, input);
        }

        self.refresh_hud();
        self.evaluate_status();
        self.pending_events.extend(self.events.drain());
        self.status
    }

    fn simulate(&mut self, dt: f32, input: &InputState) {
        let now = self.now;

        self.player.emit_hitboxes(&mut self.hitboxes);
        for enemy in &mut self.enemies {
            enemy.emit_hitboxes(&mut self.hitboxes, now, &self.events);
        }
        self.hitboxes.update(dt, now, &self.map);

        let ctx = FrameContext {
            dt,
            now,
            map: &self.map,
            hitboxes: &self.hitboxes,
            events: &self.events,
        };
        let mut landed = Vec::new();
        landed.extend(self.player.update(&ctx, input));
        let target = self.player.body().center();
        for enemy in &mut self.enemies {
            landed.extend(enemy.update(&ctx, target, self.rng.as_mut()));
        }

        self.hitboxes.consume(&landed);
        self.enemies.retain(|enemy| {
            if enemy.is_removable() {
                debug!("Removing {} {}", enemy.kind(), enemy.id());
            }
            !enemy.is_removable()
        });
    }

    fn refresh_hud(&mut self) {
        let health = self.player.health();
        let heals = self.player.heal_charges();
        let dashes = self.player.dash_charges();

        let boss = self.boss.map(|(id, kind, max_health)| {
            match self.enemies.iter().find(|enemy| enemy.id() == id) {
                Some(enemy) => {
                    let current = enemy.health().current;
                    BossBar {
                        kind,
                        health: current.max(0),
                        max_health,
                        visible: enemy.player_found() && current > 0,
                    }
                },
                None => BossBar {
                    kind,
                    health: 0,
                    max_health,
                    visible: false,
                },
            }
        });
        let boss_ammo = self.boss.and_then(|(id, _, _)| {
            self.enemies
                .iter()
                .find(|enemy| enemy.id() == id)
                .and_then(Enemy::ammo)
                .map(|ammo| ammo.count())
        });

        self.hud = HudState {
            health: health.current.max(0),
            max_health: health.max,
            heals: heals.count(),
            max_heals: heals.max(),
            dashes: dashes.count(),
            max_dashes: dashes.max(),
            boss,
            boss_ammo,
        };
    }

    fn evaluate_status(&mut self) {
        if self.status != LevelStatus::Normal {
            return;
        }
        let status = if self.player.is_removable() {
            LevelStatus::Fail
        } else if !self.player.is_fallen() && !self.hitboxes.any_from(Team::Enemy) {
            LevelStatus::Complete
        } else {
            return;
        };

        self.status = status;
        debug!("Level '{}' status: {status:?} at frame {}", self.layout.name, self.frame);
        self.events.publish(CombatEvent::StatusChanged { status });
    }

    // ========================================================================
    // Views
    // ========================================================================

    /// Renderable state of the current frame.
    #[must_use]
    pub fn snapshot(&self) -> FrameSnapshot {
        let player = &self.player;
        let mut sprites = Vec::with_capacity(self.enemies.len() + 1);
        sprites.push(SpriteView {
            id: player.id(),
            kind: ActorKind::Player,
            rect: player.body().rect,
            hitbox: player.hitbox(),
            state: player.state(),
            frame: player.frame(),
            facing: player.facing(),
        });
        sprites.extend(self.enemies.iter().map(|enemy| SpriteView {
            id: enemy.id(),
            kind: enemy.kind(),
            rect: enemy.rect(),
            hitbox: enemy.hitbox(),
            state: enemy.state(),
            frame: enemy.frame(),
            facing: enemy.facing(),
        }));

        FrameSnapshot {
            frame: self.frame,
            time_ms: self.now,
            status: self.status,
            camera: player.camera().center(),
            sprites,
            hitboxes: self
                .hitboxes
                .iter()
                .filter(|hitbox| hitbox.visible)
                .map(|hitbox| hitbox.rect)
                .collect(),
        }
    }

    /// HUD values after the last update.
    #[must_use]
    pub fn hud(&self) -> HudState {
        self.hud
    }

    /// Takes every event raised since the last drain.
    pub fn drain_events(&mut self) -> Vec<CombatEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Events lost because a single frame overflowed the bus.
    #[must_use]
    pub fn dropped_events(&self) -> usize {
        self.events.dropped_count()
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> LevelStatus {
        self.status
    }

    /// Simulation clock.
    #[must_use]
    pub fn now(&self) -> Millis {
        self.now
    }

    /// Frames simulated since construction or reset.
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Layout the level was built from.
    #[must_use]
    pub fn layout(&self) -> &LevelLayout {
        &self.layout
    }

    /// Static terrain.
    #[must_use]
    pub fn map(&self) -> &CollisionMap {
        &self.map
    }

    /// The player.
    #[must_use]
    pub fn player(&self) -> &Player {
        &self.player
    }

    /// Mutable player access, for scripted setups.
    pub fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }

    /// Live enemies in spawn order.
    #[must_use]
    pub fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    /// Live hitboxes.
    #[must_use]
    pub fn hitboxes(&self) -> &HitboxSet {
        &self.hitboxes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::SequenceRng;
    use crate::input::Action;

    const ARENA: &str = include_str!("../data/levels/arena.toml");

    fn level(source: &str) -> Level {
        let layout = LevelLayout::from_toml_str(source).expect("layout");
        let roster = Roster::builtin().expect("roster");
        Level::with_rng(layout, roster, PlayerConfig::default(), Box::new(SequenceRng::new(vec![0.0])))
            .expect("level")
    }

    #[test]
    fn test_tiles_expand_row_major_then_geometry() {
        let mut layout = LevelLayout::from_toml_str(ARENA).expect("layout");
        layout.geometry.push(Rect::new(500.0, 0.0, 10.0, 10.0));
        let solids = layout.solids();

        assert_eq!(solids.len(), 2 + 12 + 1);
        assert_eq!(solids[0], Rect::new(0.0, 0.0, 32.0, 32.0));
        assert_eq!(solids[1], Rect::new(352.0, 0.0, 32.0, 32.0));
        assert_eq!(solids[2], Rect::new(0.0, 32.0, 32.0, 32.0));
        assert_eq!(solids[14], Rect::new(500.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn test_layout_requires_one_player() {
        let missing = "name = \"empty\"";
        assert!(matches!(
            LevelLayout::from_toml_str(missing),
            Err(LevelError::MissingPlayer(name)) if name == "empty"
        ));

        let twice = format!("{ARENA}\n[[spawns]]\nkind = \"player\"\npos = [0.0, 0.0]\n");
        assert!(matches!(
            LevelLayout::from_toml_str(&twice),
            Err(LevelError::DuplicatePlayer { count: 2, .. })
        ));

        let bad = format!("tile_size = 0.0\n{ARENA}");
        assert!(matches!(LevelLayout::from_toml_str(&bad), Err(LevelError::InvalidTileSize(_))));
    }

    #[test]
    fn test_level_error_maps_to_common_error() {
        let err: RoninError = LevelError::MissingPlayer("x".to_string()).into();
        assert!(matches!(err, RoninError::InvalidData(_)));

        let err: RoninError = LevelLayout::from_toml_str("spawns = 3").expect_err("bad toml").into();
        assert!(matches!(err, RoninError::Parse(_)));
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = LevelLayout::load_from("/definitely/not/here.toml").expect_err("missing");
        assert!(matches!(err, LevelError::Io { .. }));
    }

    #[test]
    fn test_builtin_level_loads() {
        let layout = LevelLayout::builtin().expect("builtin level");
        assert!(!layout.solids().is_empty());
        let level = Level::new(layout, Roster::builtin().expect("roster"), 7).expect("level");
        assert!(!level.enemies().is_empty());
        assert!(level.hud().boss.is_some());
    }

    #[test]
    fn test_empty_level_completes_and_stays_complete() {
        let mut level = level(ARENA);
        assert_eq!(level.update(0.016, &InputState::new()), LevelStatus::Complete);
        assert!(level
            .drain_events()
            .contains(&CombatEvent::StatusChanged {
                status: LevelStatus::Complete
            }));

        let frozen = level.snapshot();
        for _ in 0..10 {
            assert_eq!(level.update(0.016, &InputState::new()), LevelStatus::Complete);
        }
        assert!(level.drain_events().is_empty());
        assert_eq!(level.dropped_events(), 0);
        // frozen: the player no longer moves
        assert_eq!(level.snapshot().sprites[0].rect, frozen.sprites[0].rect);
        assert_eq!(level.frame(), 11);
    }

    #[test]
    fn test_clock_accumulates_milliseconds() {
        let mut level = level(ARENA);
        for _ in 0..3 {
            level.update(0.0166, &InputState::new());
        }
        assert_eq!(level.now(), 49);
    }

    #[test]
    fn test_reset_restores_spawns() {
        let source = format!("{ARENA}\n[[spawns]]\nkind = \"swordsman\"\npos = [250.0, -27.5]\nhp = 12\n");
        let mut level = level(&source);
        let start = level.snapshot();
        for _ in 0..30 {
            level.update(0.016, &InputState::new().with(Action::MoveRight));
        }
        assert_ne!(level.snapshot().sprites[0].rect, start.sprites[0].rect);

        level.reset();
        let after = level.snapshot();
        assert_eq!(after.frame, 0);
        assert_eq!(after.status, LevelStatus::Normal);
        assert_eq!(after.sprites.len(), 2);
        assert_eq!(after.sprites[0].rect, start.sprites[0].rect);
        assert_eq!(level.enemies()[0].health().current, 12);
    }
}
