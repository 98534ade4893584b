//! Projections against terrain: doors, rubble, walls, traps and light

#[cfg(not(feature = "std"))]
use crate::compat::*;

use hashbrown::HashSet;
use tracing::trace;

use super::{DamageType, Projection, project};
use crate::combat::{Actor, skill_check};
use crate::dungeon::{CellFlags, Coord, Feature, ProjectFlags};
use crate::player::Timed;
use crate::world::World;

/// Highest lock a door can have
const MAX_LOCK: i32 = 7;

/// Apply a projection to the terrain of one grid. Returns true if the
/// player noticed.
pub fn project_f(world: &mut World, source: Actor, c: Coord, dif: i32, typ: DamageType) -> bool {
    let feat = world.grid.feat(c);
    let seen = world.player_can_see(c);
    let marked = world.grid.has_info(c, CellFlags::MARK);
    let in_los = world.player_has_los(c);
    let mut obvious = false;

    match typ {
        DamageType::KillTrap => {
            if feat.is_trap() {
                if in_los {
                    obvious = true;
                }
                world.grid.set_feat(c, Feature::Floor);
                world.grid.clear_info(c, CellFlags::MARK | CellFlags::HIDDEN);
            }
        }

        DamageType::KillDoor => {
            if feat.is_known_closed_door() {
                let result = skill_check(world, source, dif, 0, Actor::Nothing);
                if result <= 0 {
                    return false;
                }
                obvious = true;
                if result <= 5 {
                    world.grid.set_feat(c, Feature::Door { lock: 0 });
                    world.message("You hear a 'click'.");
                } else if result <= 10 {
                    world.grid.set_feat(c, Feature::OpenDoor);
                    world.message(if seen { "The door flies open." } else { "You hear a door burst open." });
                } else {
                    world.grid.set_feat(c, Feature::BrokenDoor);
                    world.message(if seen {
                        "The door is ripped from its hinges."
                    } else {
                        "You hear a door burst open."
                    });
                }
            } else if feat == Feature::Rubble {
                if skill_check(world, source, dif, 0, Actor::Nothing) <= 0 {
                    return false;
                }
                obvious = true;
                world.grid.set_feat(c, Feature::Floor);
                world.grid.clear_info(c, CellFlags::MARK);
                world.message(if seen {
                    "The rubble is scattered across the floor."
                } else {
                    "You hear a loud rumbling."
                });
            }
        }

        DamageType::KillWall => {
            let (success, failure, after) = match feat {
                Feature::Granite => (
                    "The wall shatters!",
                    "You fail to blow hard enough to shatter the wall.",
                    Feature::Rubble,
                ),
                Feature::Quartz => (
                    "The vein shatters!",
                    "You fail to blow hard enough to shatter the quartz.",
                    Feature::Rubble,
                ),
                Feature::Rubble => (
                    "The rubble is blown away!",
                    "You fail to blow hard enough to smash the rubble.",
                    Feature::Floor,
                ),
                Feature::Door { .. } | Feature::SecretDoor => (
                    "The door is blown from its hinges!",
                    "You fail to blow hard enough to force the door open.",
                    Feature::BrokenDoor,
                ),
                _ => return false,
            };
            // walls are shattered by the caster's will whoever aims it
            if skill_check(world, Actor::Player, dif, 10, Actor::Nothing) > 0 {
                if marked {
                    world.message(success);
                    obvious = true;
                }
                world.grid.set_feat(c, after);
                world.grid.clear_info(c, CellFlags::MARK);
            } else if marked {
                world.message(failure);
                obvious = true;
            }
        }

        DamageType::LockDoor => {
            let power = skill_check(world, source, dif, 0, Actor::Nothing);
            obvious = lock_door(world, c, power);
        }

        DamageType::Light => {
            if world.grid.has_info(c, CellFlags::VIEW) {
                world.grid.set_info(c, CellFlags::GLOW);
                if in_los && !world.player.is(Timed::Blind) {
                    obvious = true;
                }
            }
        }

        DamageType::Dark | DamageType::DarkWeak => {
            if world.grid.has_info(c, CellFlags::GLOW) {
                world.grid.clear_info(c, CellFlags::GLOW);
                if feat.is_floor() {
                    world.grid.clear_info(c, CellFlags::MARK);
                }
                if in_los {
                    obvious = true;
                }
            }
        }

        _ => {}
    }

    if obvious {
        trace!(at = %c, %typ, "terrain changed");
    }
    obvious
}

/// Close and lock a door with the given power. Broken doors are harder
/// to fix and a door with someone in the way will not shut.
pub fn lock_door(world: &mut World, c: Coord, power: i32) -> bool {
    let feat = world.grid.feat(c);
    let mut power = power;
    if feat == Feature::BrokenDoor {
        power -= 10;
    }
    if power <= 0 || !world.grid.occupant(c).is_empty() {
        return false;
    }

    let mut obvious = false;
    let lock = match feat {
        Feature::OpenDoor | Feature::BrokenDoor => {
            obvious = true;
            world.message(if world.player_can_see(c) {
                "The door slams shut."
            } else {
                "You hear a door slam shut."
            });
            0
        }
        Feature::Door { lock } => i32::from(lock),
        _ => return false,
    };

    let new_lock = (lock + power / 2).min(MAX_LOCK);
    world.grid.set_feat(c, Feature::Door { lock: new_lock as u8 });
    if new_lock != lock {
        world.message("You hear a 'click'.");
        obvious = true;
    }
    obvious
}

/// Put out the lights around the player and in their room
pub fn darken_area(world: &mut World, dd: i32, ds: i32, rad: i32) -> bool {
    if !world.player.is(Timed::Blind) {
        world.message("Darkness surrounds you.");
    }
    let pos = world.player.pos;
    let proj = Projection::new(Actor::Player, pos, pos, DamageType::DarkWeak)
        .dice(dd, ds)
        .radius(rad)
        .difficulty(-1)
        .flags(ProjectFlags::BOOM | ProjectFlags::GRID | ProjectFlags::KILL);
    project(world, &proj);
    darken_room(world, pos);
    true
}

/// Unlight the room containing `start`, and the walls around it
pub fn darken_room(world: &mut World, start: Coord) {
    let mut seen = HashSet::new();
    let mut frontier = vec![start];
    seen.insert(start);

    while let Some(c) = frontier.pop() {
        world.grid.clear_info(c, CellFlags::GLOW);
        if world.grid.is_floor(c) {
            world.grid.clear_info(c, CellFlags::MARK);
        }
        // walls are darkened but do not spread it
        if !world.grid.is_floor(c) || !world.grid.has_info(c, CellFlags::ROOM) {
            continue;
        }
        for n in c.neighbours() {
            if world.grid.in_bounds(n) && seen.insert(n) {
                frontier.push(n);
            }
        }
    }
    world.update_view();
}
