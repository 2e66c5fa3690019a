//! Damage-carrying rectangles and projectiles.
//!
//! Melee hitboxes live for exactly one frame: the level clears every
//! non-sustained entry before entities emit new ones. Projectiles are
//! sustained and travel until they touch static geometry, land a hit or run
//! out of lifetime.

use glam::Vec2;
use ronin_common::{EntityId, Facing, Rect, Team};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::collision::CollisionMap;
use crate::moveset::{AttackSpec, ProjectileSpec};
use crate::timer::{Millis, Timer};

/// Travel state of a projectile hitbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    /// Velocity in pixels per second, already mirrored for facing
    pub velocity: Vec2,
    /// Sustained lifetime window
    lifetime: Timer,
    expired: bool,
}

impl Projectile {
    /// Launches a projectile at `now`.
    #[must_use]
    pub fn launch(spec: &ProjectileSpec, facing: Facing, now: Millis) -> Self {
        Self {
            velocity: facing.mirror(spec.velocity),
            lifetime: Timer::new(spec.lifetime_ms).sustained().started(now),
            expired: false,
        }
    }

    /// Whether the projectile is spent.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expired
    }

    /// Marks the projectile as spent.
    pub fn expire(&mut self) {
        self.expired = true;
    }
}

/// A damaging rectangle owned by one team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hitbox {
    /// Team that produced the hitbox
    pub team: Team,
    /// Entity that produced the hitbox
    pub owner: EntityId,
    /// World rectangle
    pub rect: Rect,
    /// Damage dealt
    pub damage: i32,
    /// Knockback force
    pub knockback: f32,
    /// Knocks the target down
    pub stun: bool,
    /// Facing of the attacker; knockback pushes this way
    pub facing: Facing,
    /// Drawn by the renderer
    pub visible: bool,
    /// Survives the per-frame clear
    pub sustained: bool,
    /// Projectile payload
    pub projectile: Option<Projectile>,
}

impl Hitbox {
    /// Builds a one-frame hitbox centred at `anchor` plus the mirrored attack offset.
    #[must_use]
    pub fn melee(team: Team, owner: EntityId, anchor: Vec2, facing: Facing, attack: &AttackSpec) -> Self {
        Self {
            team,
            owner,
            rect: Rect::from_center(anchor + facing.mirror(attack.offset), attack.size),
            damage: attack.damage,
            knockback: attack.knockback,
            stun: attack.stun,
            facing,
            visible: false,
            sustained: false,
            projectile: None,
        }
    }

    /// Builds a visible, sustained projectile hitbox.
    #[must_use]
    pub fn projectile(
        team: Team,
        owner: EntityId,
        anchor: Vec2,
        facing: Facing,
        attack: &AttackSpec,
        spec: &ProjectileSpec,
        now: Millis,
    ) -> Self {
        Self {
            visible: true,
            sustained: true,
            projectile: Some(Projectile::launch(spec, facing, now)),
            ..Self::melee(team, owner, anchor, facing, attack)
        }
    }

    /// Whether this is a spent projectile.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.projectile.as_ref().is_some_and(Projectile::is_expired)
    }

    /// Moves a projectile and expires it on contact or timeout.
    fn travel(&mut self, dt: f32, now: Millis, map: &CollisionMap) {
        let Some(projectile) = self.projectile.as_mut() else {
            return;
        };
        projectile.lifetime.update(now);
        if !projectile.lifetime.active() {
            trace!("Projectile from {} timed out", self.owner);
            projectile.expire();
            return;
        }

        self.rect = self.rect.translated(projectile.velocity * dt);
        if map.any_overlap(&self.rect) {
            trace!("Projectile from {} struck terrain", self.owner);
            projectile.expire();
        }
    }
}

/// Every live hitbox in a level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HitboxSet {
    boxes: Vec<Hitbox>,
}

impl HitboxSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a hitbox.
    pub fn push(&mut self, hitbox: Hitbox) {
        self.boxes.push(hitbox);
    }

    /// Drops every non-sustained hitbox.
    pub fn clear_transient(&mut self) {
        self.boxes.retain(|hitbox| hitbox.sustained);
    }

    /// Drops everything.
    pub fn clear(&mut self) {
        self.boxes.clear();
    }

    /// Advances projectiles and drops the expired ones.
    pub fn update(&mut self, dt: f32, now: Millis, map: &CollisionMap) {
        for hitbox in &mut self.boxes {
            hitbox.travel(dt, now, map);
        }
        self.boxes.retain(|hitbox| !hitbox.is_expired());
    }

    /// First hitbox, in collection order, that can damage `target` and overlaps `rect`.
    #[must_use]
    pub fn first_overlap(&self, target: Team, rect: &Rect) -> Option<(usize, &Hitbox)> {
        self.boxes
            .iter()
            .enumerate()
            .find(|(_, hitbox)| hitbox.team != target && hitbox.rect.overlaps(rect))
    }

    /// Expires the projectiles at `indices`; melee entries are left alone.
    pub fn consume(&mut self, indices: &[usize]) {
        for &index in indices {
            if let Some(projectile) = self.boxes.get_mut(index).and_then(|h| h.projectile.as_mut()) {
                projectile.expire();
            }
        }
        self.boxes.retain(|hitbox| !hitbox.is_expired());
    }

    /// Whether any hitbox belongs to `team`.
    #[must_use]
    pub fn any_from(&self, team: Team) -> bool {
        self.boxes.iter().any(|hitbox| hitbox.team == team)
    }

    /// Iterates over every hitbox.
    pub fn iter(&self) -> impl Iterator<Item = &Hitbox> {
        self.boxes.iter()
    }

    /// Number of hitboxes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 0.016;

    fn arrow_spec() -> (AttackSpec, ProjectileSpec) {
        let projectile = ProjectileSpec {
            velocity: Vec2::new(200.0, 0.0),
            lifetime_ms: 1000,
        };
        let attack = AttackSpec {
            size: Vec2::new(16.0, 4.0),
            offset: Vec2::new(20.0, 0.0),
            damage: 10,
            knockback: 3.0,
            stun: false,
            impact: vec![5],
            projectile: Some(projectile),
        };
        (attack, projectile)
    }

    fn fire(set: &mut HitboxSet, anchor: Vec2, facing: Facing) {
        let (attack, spec) = arrow_spec();
        set.push(Hitbox::projectile(
            Team::Enemy,
            EntityId::from_raw(7),
            anchor,
            facing,
            &attack,
            &spec,
            0,
        ));
    }

    #[test]
    fn test_melee_offset_is_mirrored() {
        let (attack, _) = arrow_spec();
        let right = Hitbox::melee(Team::Player, EntityId::new(), Vec2::ZERO, Facing::Right, &attack);
        let left = Hitbox::melee(Team::Player, EntityId::new(), Vec2::ZERO, Facing::Left, &attack);
        assert_eq!(right.rect.center(), Vec2::new(20.0, 0.0));
        assert_eq!(left.rect.center(), Vec2::new(-20.0, 0.0));
        assert_eq!(right.rect.size(), attack.size);
        assert!(!right.sustained && !right.visible);
    }

    #[test]
    fn test_clear_transient_keeps_projectiles() {
        let mut set = HitboxSet::new();
        let (attack, _) = arrow_spec();
        set.push(Hitbox::melee(Team::Player, EntityId::new(), Vec2::ZERO, Facing::Right, &attack));
        fire(&mut set, Vec2::ZERO, Facing::Right);

        set.clear_transient();
        assert_eq!(set.len(), 1);
        assert!(set.iter().all(|hitbox| hitbox.projectile.is_some()));
    }

    #[test]
    fn test_projectile_self_expires_at_lifetime() {
        let mut set = HitboxSet::new();
        fire(&mut set, Vec2::ZERO, Facing::Right);
        let map = CollisionMap::default();

        let mut now = 0;
        while now < 1000 {
            set.update(DT, now, &map);
            assert_eq!(set.len(), 1, "alive at {now}");
            now += 16;
        }
        set.update(DT, 1000, &map);
        assert!(set.is_empty());
    }

    #[test]
    fn test_projectile_expires_on_terrain() {
        let mut set = HitboxSet::new();
        fire(&mut set, Vec2::ZERO, Facing::Right);
        let map = CollisionMap::new(vec![Rect::new(60.0, -50.0, 16.0, 100.0)]);

        let mut now = 0;
        while !set.is_empty() {
            now += 16;
            set.update(DT, now, &map);
            assert!(now < 1000, "projectile should hit the wall first");
        }
        // right edge starts at 28 and closes 32 px in ~10 frames at 3.2 px each
        assert!(now <= 176);
    }

    #[test]
    fn test_projectile_velocity_follows_facing() {
        let mut set = HitboxSet::new();
        fire(&mut set, Vec2::ZERO, Facing::Left);
        set.update(0.5, 10, &CollisionMap::default());
        let arrow = set.iter().next().expect("arrow");
        assert_eq!(arrow.rect.center().x, -20.0 - 100.0);
    }

    #[test]
    fn test_first_overlap_ignores_own_team() {
        let mut set = HitboxSet::new();
        let (attack, _) = arrow_spec();
        set.push(Hitbox::melee(Team::Enemy, EntityId::new(), Vec2::ZERO, Facing::Right, &attack));
        set.push(Hitbox::melee(Team::Player, EntityId::new(), Vec2::ZERO, Facing::Right, &attack));
        let target = Rect::new(10.0, -5.0, 20.0, 10.0);

        let (index, hit) = set.first_overlap(Team::Player, &target).expect("enemy hitbox overlaps");
        assert_eq!(index, 0);
        assert_eq!(hit.team, Team::Enemy);
        assert!(set.first_overlap(Team::Player, &Rect::new(500.0, 0.0, 1.0, 1.0)).is_none());
    }

    #[test]
    fn test_consume_only_removes_projectiles() {
        let mut set = HitboxSet::new();
        let (attack, _) = arrow_spec();
        set.push(Hitbox::melee(Team::Enemy, EntityId::new(), Vec2::ZERO, Facing::Right, &attack));
        fire(&mut set, Vec2::ZERO, Facing::Right);

        set.consume(&[0, 1]);
        assert_eq!(set.len(), 1);
        assert!(set.iter().all(|hitbox| hitbox.projectile.is_none()));
        assert!(set.any_from(Team::Enemy));
        assert!(!set.any_from(Team::Player));
    }
}
