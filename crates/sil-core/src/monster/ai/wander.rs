//! Wandering monsters
//!
//! Monsters that haven't noticed the player drift between destinations.
//! Each group shares a slot in the wandering flow pool, so pack members
//! head for the same place, pause there together and wait for stragglers.

#[cfg(not(feature = "std"))]
use crate::compat::*;

use tracing::trace;

use super::movement::make_move;
use super::passable::monster_flow;
use super::process::process_move;
use super::ranged::make_attack_ranged;
use crate::consts::{
    ALERTNESS_ALERT, ALERTNESS_MIN, ALERTNESS_UNWARY, FLOW_MAX_DIST, MON_MANA_COST,
    MON_WANDER_RANGE, MORGOTH_DEPTH,
};
use crate::dungeon::{CellFlags, Coord, DDD, Feature};
use crate::monster::{MonsterId, MonsterSong, RaceFlags, RaceTraits, SpellFlags, set_alertness};
use crate::world::World;

/// Tries at finding a random room grid for a destination
const DESTINATION_TRIES: usize = 100;

/// Point a monster's group at a new destination: `target` if given,
/// otherwise a random room grid or, for smart monsters, a staircase out
pub fn new_wandering_flow(world: &mut World, id: MonsterId, target: Option<Coord>) {
    let Some(m) = world.monsters.get(id) else { return };
    let Some(idx) = m.wandering_idx else { return };
    let race = m.race.clone();
    let pos = m.pos;

    if race.has(RaceFlags::TERRITORIAL) {
        // territorial monsters keep the spot they were created on
        if world.flows.wander(idx).is_none() {
            let flow = monster_flow(world, id, pos);
            world.flows.set_wander(idx, flow);
        }
    } else if let Some(c) = target.filter(|&c| world.grid.in_bounds_fully(c)) {
        let flow = monster_flow(world, id, c);
        world.flows.set_wander(idx, flow);
    } else {
        let leaving = race.is_smart()
            && world.player.depth != MORGOTH_DEPTH
            && world.rng.one_in(5);
        let stair = if leaving { random_stair(world) } else { None };
        let dest = stair.or_else(|| random_room_grid(world));
        if let Some(c) = dest {
            trace!(monster = %race.name, to = %c, "new wandering destination");
            let flow = monster_flow(world, id, c);
            world.flows.set_wander(idx, flow);
        }
    }

    if let Some(w) = world.flows.wander_mut(idx) {
        w.pause = 0;
    }
}

/// A staircase the player isn't standing on, outside any vault
fn random_stair(world: &mut World) -> Option<Coord> {
    let stairs: Vec<Coord> = world
        .grid
        .coords()
        .filter(|&c| world.grid.feat(c).is_stair())
        .collect();
    let c = *world.rng.choose(&stairs)?;
    (!world.grid.player_at(c) && !world.grid.has_info(c, CellFlags::ICKY)).then_some(c)
}

fn random_room_grid(world: &mut World) -> Option<Coord> {
    let (height, width) = (world.grid.height(), world.grid.width());
    for _ in 0..DESTINATION_TRIES {
        let c = Coord::new(world.rng.rand_int(height), world.rng.rand_int(width));
        if world.grid.in_bounds_fully(c)
            && world.grid.feat(c) == Feature::Floor
            && world.grid.has_info(c, CellFlags::ROOM)
            && !world.grid.has_info(c, CellFlags::ICKY)
        {
            return Some(c);
        }
    }
    None
}

/// Give a monster a wandering slot: its leader's, or the lowest free one.
/// Monsters that never move, and those too dim to wander with purpose,
/// don't get one.
pub fn new_wandering_destination(world: &mut World, id: MonsterId, leader: Option<MonsterId>) {
    let Some(m) = world.monsters.get(id) else { return };
    let race = m.race.clone();
    if race.has(RaceFlags::NEVER_MOVE | RaceFlags::HIDDEN_MOVE)
        || !(race.is_smart() || race.spells.contains(SpellFlags::SHRIEK))
    {
        return;
    }

    let mut leader = leader;
    // at the gates there are too many monsters for a slot each
    if world.player.depth == 0 {
        for (nid, _) in world.monsters.iter().filter(|&(nid, n)| nid != id && n.race.name == race.name) {
            if world.rng.one_in(2) {
                leader = Some(nid);
            }
        }
    }

    let idx = match leader {
        Some(lid) => world.monsters.get(lid).and_then(|l| l.wandering_idx),
        None => {
            let capacity = world.flows.wander_capacity();
            let mut used = vec![false; capacity];
            for (_, n) in world.monsters.iter() {
                if let Some(i) = n.wandering_idx.filter(|&i| i < capacity) {
                    used[i] = true;
                }
            }
            used.iter().position(|&u| !u)
        }
    };

    let Some(m) = world.monsters.get_mut(id) else { return };
    m.wandering_dist = MON_WANDER_RANGE;
    m.wandering_idx = idx;
    if idx.is_some() {
        new_wandering_flow(world, id, None);
    }
}

/// Where a wandering monster wants to step, if anywhere
pub fn get_move_wander(world: &mut World, id: MonsterId) -> Option<Coord> {
    let m = world.monsters.get(id)?;
    let race = m.race.clone();
    let pos = m.pos;

    let mut random_move = false;
    let mut no_move = false;

    match m.wandering_idx {
        None => {
            if race.has(RaceFlags::NEVER_MOVE | RaceFlags::HIDDEN_MOVE)
                || race.has(RaceFlags::SHORT_SIGHTED)
            {
                return None;
            }
            random_move = true;
        }
        Some(idx) => {
            let dist = world.flows.wander_dist(idx, pos);
            let hoard = !m.held.is_empty();
            let alertness = m.alertness;
            let my_dist = m.wandering_dist;

            let mut size = 0;
            let mut furthest = 0;
            let mut sleeper = None;
            for (_, n) in world.monsters.iter().filter(|(_, n)| n.wandering_idx == Some(idx)) {
                size += 1;
                if n.alertness < ALERTNESS_UNWARY && sleeper.is_none() {
                    sleeper = Some(n.pos);
                }
                furthest = furthest.max(n.wandering_dist);
            }

            if world.player.depth == 0 || world.player.truce {
                return None;
            }

            // hoarders sit on their treasure
            if race.has(RaceFlags::TERRITORIAL) && hoard && dist == 0 {
                if world.rng.one_in(100) && !race.is(RaceTraits::NO_SLEEP) {
                    let depth = world.rng.rand_range(ALERTNESS_MIN, ALERTNESS_UNWARY - 1);
                    set_alertness(world, id, depth);
                }
                return None;
            }

            if dist > MON_WANDER_RANGE {
                new_wandering_flow(world, id, None);
            }

            let pause = world.flows.wander(idx).map_or(0, |w| w.pause);
            if pause == 0 && dist <= 0 {
                let wait = world.rng.die(50) * size;
                if let Some(w) = world.flows.wander_mut(idx) {
                    w.pause = wait;
                }
            } else if pause > 1 {
                random_move = true;
                if let Some(w) = world.flows.wander_mut(idx) {
                    w.pause -= 1;
                }
            } else if pause == 1 {
                new_wandering_flow(world, id, None);
                if let Some(w) = world.flows.wander_mut(idx) {
                    w.pause = 0;
                }
            }

            // not getting anywhere
            if dist >= my_dist && world.rng.one_in(20 * size) {
                new_wandering_flow(world, id, None);
            }

            // let the others catch up
            if dist < furthest - size && world.rng.one_in(2) {
                no_move = true;
            }

            if alertness < ALERTNESS_ALERT {
                if let Some(s) = sleeper {
                    let center = world.flows.wander(idx).map(|w| w.map.center());
                    if center != Some(s) {
                        new_wandering_flow(world, id, Some(s));
                    }
                    if world.rng.one_in(2) {
                        random_move = true;
                    }
                }
            }

            if !race.has(RaceFlags::TERRITORIAL) && world.grid.has_info(pos, CellFlags::ICKY) {
                random_move = true;
            }

            if let Some(m) = world.monsters.get_mut(id) {
                m.wandering_dist = dist;
            }
        }
    }

    if no_move {
        return None;
    }

    if random_move {
        if !world.rng.one_in(4) {
            return None;
        }
        let dir = DDD[world.rng.rand_int(8) as usize];
        let c = pos.step(dir);
        if !world.grid.in_bounds(c) {
            return None;
        }
        // vault dwellers stay inside
        if world.grid.has_info(pos, CellFlags::ICKY) && !world.grid.has_info(c, CellFlags::ICKY) {
            return None;
        }
        return Some(c);
    }

    let m = world.monsters.get(id)?;
    let idx = m.wandering_idx?;
    let feat = world.grid.feat(pos);
    if race.is_smart()
        && !race.has(RaceFlags::TERRITORIAL)
        && world.player.depth != MORGOTH_DEPTH
        && feat.is_stair()
        && m.wandering_dist == 0
    {
        if m.ml {
            let name = m.desc_cap();
            let way = if feat == Feature::DownStair { "down" } else { "up" };
            world.message(format!("{name} goes {way} the stairs."));
        }
        if let Some(w) = world.flows.wander_mut(idx) {
            w.pause = 0;
        }
        trace!(monster = %race.name, "left the level by the stairs");
        world.delete_monster(id);
        return None;
    }

    // diagonals first
    let mut closest = FLOW_MAX_DIST - 1;
    let mut best = None;
    for &dir in DDD.iter().rev() {
        let c = pos.step(dir);
        if !world.grid.in_bounds(c) {
            continue;
        }
        let dist = world.flows.wander_dist(idx, c);
        if dist > closest {
            continue;
        }
        closest = dist;
        best = Some(c);
    }
    if closest == FLOW_MAX_DIST - 1 {
        return None;
    }
    best
}

/// An unalerted monster's turn: drift towards the group's destination.
/// Returns whether it did anything beyond standing still.
pub fn wander(world: &mut World, id: MonsterId) -> bool {
    let Some(m) = world.monsters.get(id) else { return false };
    let race = m.race.clone();
    if race.spells.contains(SpellFlags::SNG_PIERCING)
        && m.song != MonsterSong::Piercing
        && m.alertness < ALERTNESS_ALERT
        && m.mana >= MON_MANA_COST
        && world.crown_dropped
    {
        return make_attack_ranged(world, id, SpellFlags::SNG_PIERCING);
    }

    // doors get closed and glyphs drawn, so refresh the route now and then
    if world.rng.one_in(10) {
        let center = world
            .monsters
            .get(id)
            .and_then(|m| m.wandering_idx)
            .and_then(|idx| world.flows.wander(idx).map(|w| (idx, w.map.center())));
        if let Some((idx, center)) = center {
            let pause = world.flows.wander(idx).map_or(0, |w| w.pause);
            let flow = monster_flow(world, id, center);
            world.flows.set_wander(idx, flow);
            if let Some(w) = world.flows.wander_mut(idx) {
                w.pause = pause;
            }
        }
    }

    let Some(target) = get_move_wander(world, id) else { return false };
    let Some(step) = make_move(world, id, target, false) else { return false };
    process_move(world, id, step.to, step.bash)
}
