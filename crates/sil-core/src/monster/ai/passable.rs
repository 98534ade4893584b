//! Where monsters can stand and how easily they get there
//!
//! `cave_passable_mon` answers the question every movement decision asks:
//! what is the percentage chance this monster gets into that grid this
//! turn, and would it have to break a door down to do it. The answer also
//! prices each step of the monster's pathing flows.

#[cfg(not(feature = "std"))]
use crate::compat::*;

use crate::combat::success_chance;
use crate::consts::ALERTNESS_ALERT;
use crate::dungeon::{CellFlags, Coord, Feature, FlowMap, Grid, Occupant};
use crate::monster::{Monster, MonsterId, MonsterRace, RaceFlags, Stance};
use crate::player::{Skill, Stat};
use crate::world::World;

/// How easily a monster can enter a grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Passage {
    /// Percentage chance of getting in this turn; 0 is impassable
    pub chance: i32,
    /// Getting in means bashing a door rather than opening it
    pub bash: bool,
}

impl Passage {
    pub const BLOCKED: Passage = Passage { chance: 0, bash: false };

    const fn clear(chance: i32) -> Self {
        Passage { chance, bash: false }
    }

    pub const fn is_passable(&self) -> bool {
        self.chance > 0
    }
}

/// Whether a monster of this race could stand in a grid right now.
///
/// With `occupied_ok` the grid may hold someone else; with `can_dig`
/// walls count if the race can tunnel or destroy them.
pub fn cave_exist_mon(grid: &Grid, race: &MonsterRace, c: Coord, occupied_ok: bool, can_dig: bool) -> bool {
    if !grid.in_bounds(c) {
        return false;
    }
    if !occupied_ok && !grid.occupant(c).is_empty() {
        return false;
    }
    match grid.feat(c) {
        Feature::Glyph => false,
        Feature::Chasm => race.has(RaceFlags::FLYING),
        f if f.is_floor() => true,
        Feature::Permanent => false,
        _ if race.has(RaceFlags::PASS_WALL) => true,
        _ if race.has(RaceFlags::KILL_WALL | RaceFlags::TUNNEL_WALL) => can_dig,
        f if f.is_closed_door() => race.has(RaceFlags::PASS_DOOR),
        _ => false,
    }
}

/// Chance of pushing past another monster, or `None` if it cannot be moved
fn push_past_chance(m: &Monster, n: &Monster) -> Option<i32> {
    let (race, other) = (&m.race, &n.race);
    if race.has(RaceFlags::KILL_BODY) && !other.is_unique() && race.level > other.level {
        return Some(100);
    }
    if other.has(RaceFlags::NEVER_MOVE | RaceFlags::HIDDEN_MOVE) {
        return None;
    }
    let fleeing = m.stance == Stance::Fleeing;
    let other_fleeing = n.stance == Stance::Fleeing;
    let chance = if n.alertness < ALERTNESS_ALERT && m.wandering_idx != n.wandering_idx {
        80
    } else if other_fleeing != fleeing {
        80
    } else if race.level > other.level {
        80
    } else if race.level == other.level {
        20
    } else {
        10
    };
    Some(chance)
}

/// Percentage chance that a monster can enter a grid this turn
pub fn cave_passable_mon(world: &World, id: MonsterId, c: Coord) -> Passage {
    let Some(m) = world.monsters.get(id) else { return Passage::BLOCKED };
    let grid = &world.grid;
    if !grid.in_bounds(c) {
        return Passage::BLOCKED;
    }
    let feat = grid.feat(c);
    if feat == Feature::Permanent {
        return Passage::BLOCKED;
    }
    let race = &m.race;

    let mut chance = 100;
    match grid.occupant(c) {
        Occupant::Player => {
            return if race.has(RaceFlags::NEVER_BLOW) {
                Passage::BLOCKED
            } else {
                Passage::clear(100)
            };
        }
        Occupant::Monster(other) if other != id => {
            let Some(n) = world.monsters.get(other) else { return Passage::BLOCKED };
            match push_past_chance(m, n) {
                Some(c) => chance = c,
                None => return Passage::BLOCKED,
            }
        }
        _ => {}
    }

    if feat == Feature::Glyph {
        let mut break_chance = success_chance(10, m.skill(Skill::Will), 20);
        if m.alertness < ALERTNESS_ALERT {
            break_chance = 0;
        }
        chance = chance.min(break_chance);
    }

    if feat == Feature::Chasm && !race.has(RaceFlags::FLYING) {
        return Passage::BLOCKED;
    }

    if feat.is_floor() {
        return Passage::clear(chance);
    }

    match feat {
        Feature::Granite | Feature::Quartz | Feature::Rubble => {
            if race.has(RaceFlags::PASS_WALL | RaceFlags::KILL_WALL)
                || (race.has(RaceFlags::TUNNEL_WALL) && m.alertness >= ALERTNESS_ALERT)
            {
                Passage::clear(chance)
            } else {
                Passage::BLOCKED
            }
        }
        Feature::Door { .. } | Feature::SecretDoor => door_passage(world, m, c, feat, chance),
        _ => Passage::BLOCKED,
    }
}

fn door_passage(world: &World, m: &Monster, c: Coord, feat: Feature, chance: i32) -> Passage {
    let race = &m.race;
    if race.has(RaceFlags::PASS_DOOR | RaceFlags::PASS_WALL) {
        return Passage::clear(chance);
    }
    let icky = world.grid.has_info(c, CellFlags::ICKY);
    // vault doors stay shut for the unwary, and secret ones for everybody
    if icky && (m.alertness < ALERTNESS_ALERT || feat == Feature::SecretDoor) {
        return Passage::BLOCKED;
    }

    let lock = match feat {
        Feature::Door { lock } => lock as i32,
        _ => 0,
    };
    let mut unlock = 0;
    if race.has(RaceFlags::OPEN_DOOR) {
        if lock == 0 {
            return Passage::clear(chance);
        }
        if race.has(RaceFlags::UNLOCK_DOOR) && lock < 8 {
            unlock = success_chance(10, m.skill(Skill::Perception), lock + 5);
        }
    }
    let mut bash = 0;
    if race.has(RaceFlags::BASH_DOOR) {
        bash = success_chance(10, m.stat(Stat::Str) * 2, lock % 8);
    }

    Passage {
        chance: chance.min(unlock.max(bash)),
        bash: !(unlock > bash || bash == 0),
    }
}

/// Build a flow out from `center` priced by what a monster can get
/// through: each step costs the expected number of turns to enter it,
/// plus a turn for opening doors or digging
pub fn monster_flow(world: &World, id: MonsterId, center: Coord) -> FlowMap {
    let Some(race) = world.monsters.get(id).map(|m| m.race.clone()) else {
        return FlowMap::unreachable(world.grid.height(), world.grid.width());
    };
    FlowMap::build(&world.grid, center, |c| {
        let passage = cave_passable_mon(world, id, c);
        if !passage.is_passable() {
            return None;
        }
        let feat = world.grid.feat(c);
        let mut extra = 100 / passage.chance - 1;
        if feat.is_closed_door() && !passage.bash {
            if !race.has(RaceFlags::PASS_DOOR | RaceFlags::PASS_WALL) {
                extra += 1;
            }
        } else if feat.is_wall() && race.has(RaceFlags::TUNNEL_WALL) {
            extra += if feat == Feature::Rubble { 1 } else { 2 };
        } else if feat.is_wall() && race.has(RaceFlags::KILL_WALL) {
            extra += 1;
        }
        Some(extra)
    })
}

/// Rebuild a monster's own route to the player
pub fn update_monster_flow(world: &mut World, id: MonsterId) {
    let flow = monster_flow(world, id, world.player.pos);
    world.flows.set_pathing(id, flow);
}
