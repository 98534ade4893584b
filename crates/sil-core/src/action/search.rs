//! Noticing hidden traps and secret doors

#[cfg(not(feature = "std"))]
use crate::compat::*;

use tracing::debug;

use super::trap::reveal_trap;
use crate::dungeon::{CellFlags, Coord, Feature, distance};
use crate::player::{Abilities, Skill, Timed};
use crate::world::World;

/// How far the player's passive senses reach
const PERCEIVE_RANGE: i32 = 4;

/// Try to notice something hidden at `c`, `dist` grids from the player.
/// An active search gets a bonus and also remembers plain grids next to
/// the player.
pub fn search_square(world: &mut World, c: Coord, dist: i32, searching: bool) {
    if !world.grid.in_bounds(c) {
        return;
    }
    let feat = world.grid.feat(c);
    let hidden_trap = world.grid.hidden_trap(c);

    if searching && dist == 1 && !world.grid.has_info(c, CellFlags::MARK) && !hidden_trap {
        world.grid.set_info(c, CellFlags::MARK);
    }

    let secret_door = feat == Feature::SecretDoor;
    if !hidden_trap && !secret_door {
        return;
    }
    if dist > 1 && !world.grid.has_info(c, CellFlags::SEEN) {
        return;
    }
    let dist = dist.max(1);

    let p = &world.player;
    let mut score = p.skill(Skill::Perception);
    if searching {
        score += 5;
    }
    if p.has(Abilities::PER_EYE_FOR_DETAIL) {
        score += 5;
    }

    let mut difficulty = if p.depth > 0 { p.depth / 2 } else { 10 };
    if p.is(Timed::Blind) || world.grid.light(p.pos) <= 0 || p.is(Timed::Image) {
        difficulty += 5;
    }
    if p.is(Timed::Confused) {
        difficulty += 5;
    }
    difficulty += 5 * (dist - 1);
    difficulty += if hidden_trap { 5 } else { 10 };

    if world.skill_check_player(score, difficulty) <= 0 {
        return;
    }

    if hidden_trap {
        reveal_trap(world, c);
        world.message("You have found a trap.");
        debug!(at = %c, "found a trap");
    } else {
        world.message("You have found a secret door.");
        let lock = if world.rng.one_in(4) { world.rng.rand_range(1, 7) as u8 } else { 0 };
        world.grid.set_feat(c, Feature::Door { lock });
        world.grid.set_info(c, CellFlags::MARK);
        world.update_view();
        debug!(at = %c, lock, "found a secret door");
    }
    world.disturb();
}

/// Search the grids next to the player, then take in the surroundings
pub fn search(world: &mut World) {
    let pos = world.player.pos;
    for c in pos.neighbours() {
        search_square(world, c, 1, true);
    }
    perceive(world);
}

/// Passive noticing of nearby hidden things: anything within four grids
/// that is in sight and lit, by the player's light or its own
pub fn perceive(world: &mut World) {
    let pos = world.player.pos;
    for dy in -PERCEIVE_RANGE..=PERCEIVE_RANGE {
        for dx in -PERCEIVE_RANGE..=PERCEIVE_RANGE {
            let c = pos.offset(dy, dx);
            if !world.grid.in_bounds(c) {
                continue;
            }
            let dist = distance(pos, c);
            let lit = world.player.light_radius >= dist || world.grid.has_info(c, CellFlags::GLOW);
            if dist <= 1 || (lit && dist <= PERCEIVE_RANGE && world.grid.los(pos, c)) {
                search_square(world, c, dist, false);
            }
        }
    }
}
