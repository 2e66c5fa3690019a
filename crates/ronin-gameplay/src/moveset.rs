//! Animation tracks and attack metadata, validated once at load time.
//!
//! Every actor kind owns a [`MoveSet`]: one optional [`Track`] per
//! [`AnimState`], each optionally carrying the [`AttackSpec`] that its impact
//! frames produce. Move sets are parsed from TOML, checked against the states
//! the actor kind can ever derive, and then shared read-only (`Arc`) by every
//! entity of that kind.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use glam::Vec2;
use ronin_common::RoninError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::timer::Millis;

/// Built-in move sets for every actor kind.
pub const BUILTIN_MOVESETS: &str = include_str!("../data/movesets.toml");

/// Errors raised while loading or validating move sets.
#[derive(Debug, Error)]
pub enum MoveSetError {
    /// The TOML document could not be parsed.
    #[error("Failed to parse move set TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A track key does not name an animation state.
    #[error("{actor}: unknown animation state '{name}'")]
    UnknownState {
        /// Actor the track belongs to
        actor: ActorKind,
        /// Offending key
        name: String,
    },

    /// A state the actor can derive has no track.
    #[error("{actor}: missing track for state '{state}'")]
    MissingTrack {
        /// Actor the track belongs to
        actor: ActorKind,
        /// State without a track
        state: AnimState,
    },

    /// A track declares zero frames.
    #[error("{actor}: track '{state}' has no frames")]
    EmptyTrack {
        /// Actor the track belongs to
        actor: ActorKind,
        /// Empty state
        state: AnimState,
    },

    /// An impact frame lies past the end of its track.
    #[error("{actor}: impact frame {frame} of '{state}' is outside its {frames} frames")]
    ImpactOutOfRange {
        /// Actor the track belongs to
        actor: ActorKind,
        /// Attack state
        state: AnimState,
        /// Offending frame index
        frame: usize,
        /// Track length
        frames: usize,
    },

    /// A rectangle size is not strictly positive.
    #[error("{actor}: {what} must have a positive size")]
    InvalidSize {
        /// Actor the value belongs to
        actor: ActorKind,
        /// Description of the offending value
        what: String,
    },
}

impl From<MoveSetError> for RoninError {
    fn from(err: MoveSetError) -> Self {
        match err {
            MoveSetError::Parse(e) => RoninError::Parse(e.to_string()),
            other => RoninError::InvalidData(other.to_string()),
        }
    }
}

/// Closed set of animation states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimState {
    /// Standing still
    Idle,
    /// Player running
    Run,
    /// Enemy walking
    Walk,
    /// Airborne, rising
    Jump,
    /// Airborne, falling
    Fall,
    /// Dash burst
    Dash,
    /// First ground attack
    Melee1,
    /// Second ground attack
    Melee2,
    /// Third ground attack
    Melee3,
    /// First air attack
    Air1,
    /// Second air attack
    Air2,
    /// Ranged attack
    Shoot,
    /// Guarding
    Block,
    /// Stunned or knocked down
    Hurt,
    /// Terminal death animation
    Fallen,
}

impl AnimState {
    /// Number of states.
    pub const COUNT: usize = 15;

    /// Every state, in index order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Idle,
        Self::Run,
        Self::Walk,
        Self::Jump,
        Self::Fall,
        Self::Dash,
        Self::Melee1,
        Self::Melee2,
        Self::Melee3,
        Self::Air1,
        Self::Air2,
        Self::Shoot,
        Self::Block,
        Self::Hurt,
        Self::Fallen,
    ];

    const MELEE: [Self; 3] = [Self::Melee1, Self::Melee2, Self::Melee3];
    const AIR: [Self; 2] = [Self::Air1, Self::Air2];

    /// Index into per-state arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Ground attack for a zero-based combo stage.
    #[must_use]
    pub fn melee(stage: usize) -> Option<Self> {
        Self::MELEE.get(stage).copied()
    }

    /// Air attack for a zero-based combo stage.
    #[must_use]
    pub fn air(stage: usize) -> Option<Self> {
        Self::AIR.get(stage).copied()
    }

    /// Number of air attack stages.
    #[must_use]
    pub const fn air_stage_count() -> usize {
        Self::AIR.len()
    }

    /// Whether this is a ground attack.
    #[must_use]
    pub const fn is_melee(self) -> bool {
        matches!(self, Self::Melee1 | Self::Melee2 | Self::Melee3)
    }

    /// Whether this is an air attack.
    #[must_use]
    pub const fn is_air_attack(self) -> bool {
        matches!(self, Self::Air1 | Self::Air2)
    }

    /// Whether this state is any kind of attack.
    #[must_use]
    pub const fn is_attack(self) -> bool {
        self.is_melee() || self.is_air_attack() || matches!(self, Self::Shoot)
    }

    /// Whether the animation holds its last frame instead of looping.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Fallen)
    }

    /// Lowercase name used in data files.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Run => "run",
            Self::Walk => "walk",
            Self::Jump => "jump",
            Self::Fall => "fall",
            Self::Dash => "dash",
            Self::Melee1 => "melee1",
            Self::Melee2 => "melee2",
            Self::Melee3 => "melee3",
            Self::Air1 => "air1",
            Self::Air2 => "air2",
            Self::Shoot => "shoot",
            Self::Block => "block",
            Self::Hurt => "hurt",
            Self::Fallen => "fallen",
        }
    }
}

impl fmt::Display for AnimState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AnimState {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|state| state.name() == s).ok_or(())
    }
}

/// Kind of actor a move set belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    /// The player character
    Player,
    /// Basic melee enemy
    Swordsman,
    /// Blocking melee boss
    Samurai,
    /// Ranged boss
    Archer,
}

impl ActorKind {
    /// States this kind can derive; each needs a track.
    #[must_use]
    pub fn required_states(self) -> &'static [AnimState] {
        use AnimState as S;
        match self {
            Self::Player => &[
                S::Idle,
                S::Run,
                S::Jump,
                S::Fall,
                S::Dash,
                S::Melee1,
                S::Melee2,
                S::Melee3,
                S::Air1,
                S::Air2,
                S::Hurt,
                S::Fallen,
            ],
            Self::Swordsman => &[S::Idle, S::Walk, S::Melee1, S::Melee2, S::Hurt, S::Fallen],
            Self::Samurai => &[
                S::Idle,
                S::Walk,
                S::Melee1,
                S::Melee2,
                S::Melee3,
                S::Block,
                S::Hurt,
                S::Fallen,
            ],
            Self::Archer => &[S::Idle, S::Walk, S::Melee1, S::Shoot, S::Hurt, S::Fallen],
        }
    }

    /// Whether this kind gets a boss health bar.
    #[must_use]
    pub const fn is_boss(self) -> bool {
        matches!(self, Self::Samurai | Self::Archer)
    }

    /// Lowercase name used in data files.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::Swordsman => "swordsman",
            Self::Samurai => "samurai",
            Self::Archer => "archer",
        }
    }
}

impl fmt::Display for ActorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Projectile launched by a ranged attack.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectileSpec {
    /// Velocity in pixels per second, for a right-facing shooter
    pub velocity: Vec2,
    /// Lifetime before self-expiry
    pub lifetime_ms: Millis,
}

/// Damage-carrying geometry produced by an attack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackSpec {
    /// Hitbox size
    pub size: Vec2,
    /// Hitbox centre relative to the attacker centre, for a right-facing attacker
    pub offset: Vec2,
    /// Damage dealt on hit
    pub damage: i32,
    /// Knockback force
    pub knockback: f32,
    /// Whether the hit knocks down
    pub stun: bool,
    /// Zero-based frame indices that spawn the hitbox
    pub impact: Vec<usize>,
    /// Projectile payload for ranged attacks
    pub projectile: Option<ProjectileSpec>,
}

impl AttackSpec {
    /// Whether `frame` spawns a hitbox.
    #[must_use]
    pub fn is_impact_frame(&self, frame: usize) -> bool {
        self.impact.contains(&frame)
    }
}

/// One animation track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Number of frames
    pub frames: usize,
    /// Attack produced while this track plays
    pub attack: Option<AttackSpec>,
}

/// Validated animation and attack table for one actor kind.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveSet {
    kind: ActorKind,
    sprite_size: Vec2,
    inset: Vec2,
    tracks: [Option<Track>; AnimState::COUNT],
    contact: Option<AttackSpec>,
}

impl MoveSet {
    /// Actor kind this set was validated for.
    #[must_use]
    pub fn kind(&self) -> ActorKind {
        self.kind
    }

    /// Size of the visual sprite rectangle.
    #[must_use]
    pub fn sprite_size(&self) -> Vec2 {
        self.sprite_size
    }

    /// Total shrink applied to the sprite rectangle to obtain the hitbox.
    #[must_use]
    pub fn inset(&self) -> Vec2 {
        self.inset
    }

    /// Track for a state, if defined.
    #[must_use]
    pub fn track(&self, state: AnimState) -> Option<&Track> {
        self.tracks[state.index()].as_ref()
    }

    /// Frame count of a state's track.
    ///
    /// Required states are guaranteed at load time; an undefined optional
    /// state reports a single frame.
    #[must_use]
    pub fn frames(&self, state: AnimState) -> usize {
        self.track(state).map_or(1, |track| track.frames)
    }

    /// Attack data of a state, if any.
    #[must_use]
    pub fn attack(&self, state: AnimState) -> Option<&AttackSpec> {
        self.track(state).and_then(|track| track.attack.as_ref())
    }

    /// Body contact attack, if any.
    #[must_use]
    pub fn contact(&self) -> Option<&AttackSpec> {
        self.contact.as_ref()
    }

    fn from_def(kind: ActorKind, def: MoveSetDef) -> Result<Self, MoveSetError> {
        let sprite_size = Vec2::from(def.sprite_size);
        let inset = Vec2::from(def.inset);
        if sprite_size.x <= 0.0 || sprite_size.y <= 0.0 {
            return Err(MoveSetError::InvalidSize {
                actor: kind,
                what: "sprite".to_string(),
            });
        }
        if inset.x >= sprite_size.x || inset.y >= sprite_size.y {
            return Err(MoveSetError::InvalidSize {
                actor: kind,
                what: "hitbox (sprite minus inset)".to_string(),
            });
        }

        let mut tracks: [Option<Track>; AnimState::COUNT] = Default::default();
        for (name, track_def) in def.tracks {
            let state = name
                .parse::<AnimState>()
                .map_err(|()| MoveSetError::UnknownState {
                    actor: kind,
                    name: name.clone(),
                })?;
            let track = track_def.into_track(kind, state)?;
            tracks[state.index()] = Some(track);
        }

        for &state in kind.required_states() {
            if tracks[state.index()].is_none() {
                return Err(MoveSetError::MissingTrack { actor: kind, state });
            }
        }

        let contact = def
            .contact
            .map(|attack| attack.into_spec(kind, None, AnimState::Idle))
            .transpose()?;

        Ok(Self {
            kind,
            sprite_size,
            inset,
            tracks,
            contact,
        })
    }
}

/// Move sets for every actor kind.
#[derive(Debug, Clone)]
pub struct Roster {
    player: Arc<MoveSet>,
    swordsman: Arc<MoveSet>,
    samurai: Arc<MoveSet>,
    archer: Arc<MoveSet>,
}

impl Roster {
    /// Parses and validates a roster from TOML.
    pub fn from_toml_str(source: &str) -> Result<Self, MoveSetError> {
        let def: RosterDef = toml::from_str(source)?;
        let roster = Self {
            player: Arc::new(MoveSet::from_def(ActorKind::Player, def.player)?),
            swordsman: Arc::new(MoveSet::from_def(ActorKind::Swordsman, def.swordsman)?),
            samurai: Arc::new(MoveSet::from_def(ActorKind::Samurai, def.samurai)?),
            archer: Arc::new(MoveSet::from_def(ActorKind::Archer, def.archer)?),
        };
        debug!("Loaded move sets for 4 actor kinds");
        Ok(roster)
    }

    /// The compiled-in roster.
    pub fn builtin() -> Result<Self, MoveSetError> {
        Self::from_toml_str(BUILTIN_MOVESETS)
    }

    /// Move set for an actor kind.
    #[must_use]
    pub fn get(&self, kind: ActorKind) -> &Arc<MoveSet> {
        match kind {
            ActorKind::Player => &self.player,
            ActorKind::Swordsman => &self.swordsman,
            ActorKind::Samurai => &self.samurai,
            ActorKind::Archer => &self.archer,
        }
    }
}

// ============================================================================
// File schema
// ============================================================================

#[derive(Debug, Deserialize)]
struct RosterDef {
    player: MoveSetDef,
    swordsman: MoveSetDef,
    samurai: MoveSetDef,
    archer: MoveSetDef,
}

#[derive(Debug, Deserialize)]
struct MoveSetDef {
    sprite_size: [f32; 2],
    inset: [f32; 2],
    #[serde(default)]
    contact: Option<AttackDef>,
    tracks: BTreeMap<String, TrackDef>,
}

#[derive(Debug, Deserialize)]
struct TrackDef {
    frames: usize,
    #[serde(default)]
    attack: Option<AttackDef>,
}

#[derive(Debug, Deserialize)]
struct AttackDef {
    size: [f32; 2],
    #[serde(default)]
    offset: [f32; 2],
    damage: i32,
    #[serde(default)]
    knockback: f32,
    #[serde(default)]
    stun: bool,
    #[serde(default)]
    impact: Vec<usize>,
    #[serde(default)]
    projectile: Option<ProjectileDef>,
}

#[derive(Debug, Deserialize)]
struct ProjectileDef {
    velocity: [f32; 2],
    lifetime_ms: Millis,
}

impl TrackDef {
    fn into_track(self, kind: ActorKind, state: AnimState) -> Result<Track, MoveSetError> {
        if self.frames == 0 {
            return Err(MoveSetError::EmptyTrack { actor: kind, state });
        }
        let attack = self
            .attack
            .map(|attack| attack.into_spec(kind, Some(self.frames), state))
            .transpose()?;
        Ok(Track {
            frames: self.frames,
            attack,
        })
    }
}

impl AttackDef {
    fn into_spec(
        self,
        kind: ActorKind,
        frames: Option<usize>,
        state: AnimState,
    ) -> Result<AttackSpec, MoveSetError> {
        let size = Vec2::from(self.size);
        if size.x <= 0.0 || size.y <= 0.0 {
            return Err(MoveSetError::InvalidSize {
                actor: kind,
                what: format!("attack hitbox of '{state}'"),
            });
        }

        if let Some(frames) = frames {
            if let Some(&frame) = self.impact.iter().find(|&&frame| frame >= frames) {
                return Err(MoveSetError::ImpactOutOfRange {
                    actor: kind,
                    state,
                    frame,
                    frames,
                });
            }
            if self.impact.is_empty() {
                warn!("{kind}: attack on '{state}' has no impact frames and will never hit");
            }
        }

        Ok(AttackSpec {
            size,
            offset: Vec2::from(self.offset),
            damage: self.damage,
            knockback: self.knockback,
            stun: self.stun,
            impact: self.impact,
            projectile: self.projectile.map(|p| ProjectileSpec {
                velocity: Vec2::from(p.velocity),
                lifetime_ms: p.lifetime_ms,
            }),
        })
    }
}
