//! Projections
//!
//! Bolts, beams, balls and breaths all go through [`project`]: trace the
//! shape, work out damage by distance from the centre, then apply the
//! effect to terrain, objects, monsters and the player, in that order.
//! A blast that knocks down a wall has done so before the monsters in
//! the rubble are considered.

mod monster;
mod objects;
mod player;
mod shape;
mod terrain;

#[cfg(not(feature = "std"))]
use crate::compat::*;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};
use tracing::debug;

use crate::combat::Actor;
use crate::consts::{MAX_RANGE, MAX_SIGHT};
use crate::dungeon::{Coord, ProjectFlags};
use crate::world::World;

pub use monster::{ProjectHit, project_m, teleport_away};
pub use objects::project_o;
pub use player::project_p;
pub use shape::angle_to;
pub use terrain::{darken_area, darken_room, lock_door, project_f};

/// What a projection does when it lands
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
)]
#[repr(u8)]
pub enum DamageType {
    #[default]
    Nothing,
    /// Plain damage; armour counts
    Hurt,
    Arrow,
    Boulder,
    Acid,
    Elec,
    Fire,
    Cold,
    Pois,
    Dark,
    /// Darkness that only puts out lights
    DarkWeak,
    Light,
    Sound,
    KillWall,
    KillDoor,
    LockDoor,
    KillTrap,
    AwayAll,
    Fear,
    Confusion,
    Slow,
    Sleep,
    Speed,
    Heal,
    Identify,
    Earthquake,
}

impl DamageType {
    /// Elements that reach the player through a resistance divisor
    pub const fn is_elemental(self) -> bool {
        matches!(self, DamageType::Fire | DamageType::Cold | DamageType::Pois | DamageType::Dark)
    }

    /// Projections that are resolved with an attack roll
    pub const fn is_missile(self) -> bool {
        matches!(self, DamageType::Arrow | DamageType::Boulder)
    }
}

/// One invocation of [`project`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Projection {
    pub source: Actor,
    /// Blast radius; 0 for bolts and beams
    pub rad: i32,
    pub origin: Coord,
    pub target: Coord,
    /// Damage dice at the centre
    pub dd: i32,
    pub ds: i32,
    /// Difficulty of resisting status effects
    pub dif: i32,
    pub typ: DamageType,
    pub flags: ProjectFlags,
    /// Width of an arc, in degrees
    pub degrees: i32,
    /// Full damage across the whole blast
    pub uniform: bool,
}

impl Projection {
    /// A bolt with no dice and no difficulty
    pub fn new(source: Actor, origin: Coord, target: Coord, typ: DamageType) -> Self {
        Self {
            source,
            rad: 0,
            origin,
            target,
            dd: 0,
            ds: 0,
            dif: 0,
            typ,
            flags: ProjectFlags::empty(),
            degrees: 0,
            uniform: false,
        }
    }

    pub fn dice(mut self, dd: i32, ds: i32) -> Self {
        self.dd = dd;
        self.ds = ds;
        self
    }

    pub fn radius(mut self, rad: i32) -> Self {
        self.rad = rad;
        self
    }

    pub fn difficulty(mut self, dif: i32) -> Self {
        self.dif = dif;
        self
    }

    pub fn flags(mut self, flags: ProjectFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// An arc-shaped blast of the given width
    pub fn arc(mut self, degrees: i32) -> Self {
        self.flags |= ProjectFlags::ARC | ProjectFlags::BOOM;
        self.degrees = degrees;
        self
    }

    pub fn uniform(mut self) -> Self {
        self.uniform = true;
        self
    }
}

/// A grid caught by a projection, and how far it is from the centre
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Affected {
    pub c: Coord,
    pub dist: i32,
}

/// Fire a projection. Returns true if the player noticed anything.
pub fn project(world: &mut World, proj: &Projection) -> bool {
    let mut proj = *proj;
    proj.rad = proj.rad.min(MAX_SIGHT);
    if matches!(proj.typ, DamageType::KillWall | DamageType::KillDoor) {
        proj.flags |= ProjectFlags::WALL;
    }
    if proj.flags.contains(ProjectFlags::JUMP) {
        proj.origin = proj.target;
        proj.flags.remove(ProjectFlags::JUMP);
    }

    let grids = shape::affected_grids(world, &mut proj);
    debug!(typ = %proj.typ, rad = proj.rad, grids = grids.len(), "projection");

    // dice at each distance from the centre
    let dam_at_dist: Vec<i32> = (0..=MAX_RANGE)
        .map(|i| {
            if i > proj.rad {
                0
            } else if proj.uniform {
                proj.dd
            } else {
                (proj.dd - 2 * i).max(0)
            }
        })
        .collect();
    let dice_at = |dist: i32| dam_at_dist.get(dist as usize).copied().unwrap_or(0);

    let mut notice = false;

    if proj.flags.contains(ProjectFlags::GRID) {
        for g in &grids {
            notice |= project_f(world, proj.source, g.c, proj.dif, proj.typ);
        }
    }

    if proj.flags.contains(ProjectFlags::ITEM) {
        for g in &grids {
            notice |= project_o(world, g.c, proj.typ);
        }
    }

    if proj.flags.contains(ProjectFlags::KILL) {
        let mut unseen_deaths = 0;
        for g in &grids {
            let hit = project_m(world, proj.source, g.c, dice_at(g.dist), proj.ds, proj.dif, proj.typ);
            notice |= hit.noticed;
            if hit.unseen_death {
                unseen_deaths += 1;
            }
        }
        match unseen_deaths {
            0 => {}
            1 => world.message("You hear a scream of agony!"),
            _ => world.message("You hear several screams of agony!"),
        }
    }

    if proj.flags.contains(ProjectFlags::PLAY) {
        for g in &grids {
            if world.grid.player_at(g.c)
                && project_p(world, proj.source, g.c, dice_at(g.dist), proj.ds, proj.typ)
            {
                notice = true;
                break;
            }
        }
    }

    world.update_view();
    notice
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dungeon::{Feature, parse_map};
    use crate::monster::{MonsterFlags, RaceFlags};
    use crate::world::SimOptions;
    use crate::world::testing::arena;
    use strum::IntoEnumIterator;

    fn corridor() -> World {
        let layout = parse_map(&[
            "###########",
            "#@........#",
            "###########",
        ])
        .unwrap();
        World::from_layout(layout, SimOptions::default(), 11).unwrap().with_builtin_races()
    }

    #[test]
    fn test_damage_types_have_names() {
        assert_eq!(DamageType::KillWall.to_string(), "KillWall");
        assert_eq!(DamageType::iter().filter(|t| t.is_missile()).count(), 2);
        assert!(DamageType::Dark.is_elemental());
        assert!(!DamageType::DarkWeak.is_elemental());
    }

    #[test]
    fn test_bolt_hits_the_first_monster_only() {
        let mut world = corridor();
        let near = world.place_monster("Snaga", Coord::new(1, 4)).unwrap();
        let far = world.place_monster("Snaga", Coord::new(1, 7)).unwrap();
        let near_hp = world.monsters.get(near).unwrap().hp;
        let far_hp = world.monsters.get(far).unwrap().hp;
        let bolt = Projection::new(Actor::Player, world.player.pos, Coord::new(1, 7), DamageType::Fire)
            .dice(1, 1)
            .flags(ProjectFlags::STOP | ProjectFlags::KILL);
        project(&mut world, &bolt);
        assert_eq!(world.monsters.get(near).map(|m| m.hp), Some(near_hp - 1));
        assert_eq!(world.monsters.get(far).unwrap().hp, far_hp);
    }

    #[test]
    fn test_beam_hits_everything_on_the_path() {
        let mut world = corridor();
        let a = world.place_monster("Snaga", Coord::new(1, 4)).unwrap();
        let b = world.place_monster("Snaga", Coord::new(1, 7)).unwrap();
        let beam = Projection::new(Actor::Player, world.player.pos, Coord::new(1, 9), DamageType::Cold)
            .dice(1, 1)
            .flags(ProjectFlags::BEAM | ProjectFlags::KILL);
        project(&mut world, &beam);
        for id in [a, b] {
            let m = world.monsters.get(id).unwrap();
            assert_eq!(m.hp, m.maxhp - 1);
            assert!(m.flags.contains(MonsterFlags::HIT_BY_RANGED));
        }
    }

    #[test]
    fn test_ball_damage_falls_off_with_distance() {
        let mut world = arena();
        let centre = Coord::new(2, 6);
        let at_centre = world.place_monster("Snaga", centre).unwrap();
        let beside = world.place_monster("Snaga", Coord::new(2, 7)).unwrap();
        let ball = Projection::new(Actor::Player, world.player.pos, centre, DamageType::Fire)
            .dice(3, 1)
            .radius(1)
            .flags(ProjectFlags::BOOM | ProjectFlags::KILL);
        project(&mut world, &ball);
        let m = world.monsters.get(at_centre).unwrap();
        assert_eq!(m.maxhp - m.hp, 3);
        let m = world.monsters.get(beside).unwrap();
        assert_eq!(m.maxhp - m.hp, 1);
    }

    #[test]
    fn test_uniform_ball_keeps_full_damage() {
        let mut world = arena();
        let centre = Coord::new(2, 6);
        let beside = world.place_monster("Snaga", Coord::new(2, 7)).unwrap();
        let ball = Projection::new(Actor::Player, world.player.pos, centre, DamageType::Fire)
            .dice(3, 1)
            .radius(1)
            .flags(ProjectFlags::BOOM | ProjectFlags::KILL)
            .uniform();
        project(&mut world, &ball);
        let m = world.monsters.get(beside).unwrap();
        assert_eq!(m.maxhp - m.hp, 3);
    }

    #[test]
    fn test_terrain_is_resolved_before_monsters() {
        let layout = parse_map(&[
            "#########",
            "#.......#",
            "#.@...:.#",
            "#.......#",
            "#########",
        ])
        .unwrap();
        let rubble = Coord::new(2, 6);
        let build = || {
            let mut world = World::from_layout(layout.clone(), SimOptions::default(), 3)
                .unwrap()
                .with_builtin_races();
            world.update_race("Barrow-wight", |r| r.flags |= RaceFlags::PASS_WALL);
            let id = world.place_monster("Barrow-wight", rubble).unwrap();
            (world, id)
        };
        let blast = |world: &World, flags: ProjectFlags| {
            Projection::new(Actor::Player, world.player.pos, Coord::new(2, 5), DamageType::KillWall)
                .radius(1)
                .difficulty(100)
                .flags(ProjectFlags::BOOM | flags)
        };

        // without the terrain pass the rubble shields the wight
        let (mut world, id) = build();
        let proj = blast(&world, ProjectFlags::KILL);
        project(&mut world, &proj);
        assert_eq!(world.grid.feat(rubble), Feature::Rubble);
        assert!(!world.monsters.get(id).unwrap().flags.contains(MonsterFlags::HIT_BY_RANGED));

        // with it, the same blast clears the rubble and then reaches the wight
        let (mut world, id) = build();
        let proj = blast(&world, ProjectFlags::GRID | ProjectFlags::KILL);
        project(&mut world, &proj);
        assert_eq!(world.grid.feat(rubble), Feature::Floor);
        assert!(world.monsters.get(id).unwrap().flags.contains(MonsterFlags::HIT_BY_RANGED));
    }

    #[test]
    fn test_unseen_deaths_are_heard() {
        let mut world = corridor();
        let id = world.place_monster("Green worm mass", Coord::new(1, 5)).unwrap();
        world.monsters.get_mut(id).unwrap().ml = false;
        world.monsters.get_mut(id).unwrap().hp = 1;
        let bolt = Projection::new(Actor::Player, world.player.pos, Coord::new(1, 5), DamageType::Fire)
            .dice(4, 4)
            .flags(ProjectFlags::STOP | ProjectFlags::KILL | ProjectFlags::HIDE);
        world.player.timed.set(crate::player::Timed::Blind, 10);
        project(&mut world, &bolt);
        assert!(world.monsters.get(id).is_none());
        assert!(world.messages.iter().any(|m| m == "You hear a scream of agony!"));
    }
}
