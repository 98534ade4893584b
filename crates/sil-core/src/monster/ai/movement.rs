//! From a destination to a single step
//!
//! `make_move` picks the first of the eight directions, ordered by how
//! nearly they point at the destination, that the monster can actually
//! get into. Frightened monsters also try hard to stay out of sight, and
//! confused ones lurch off in a scrambled direction.

#[cfg(not(feature = "std"))]
use crate::compat::*;

use super::passable::{Passage, cave_passable_mon};
use super::retreat::panic;
use crate::dungeon::{CellFlags, Coord, DDD, Direction, Feature, distance, scramble_direction};
use crate::monster::{MonsterId, RaceFlags};
use crate::world::World;

/// The grid a monster will try to enter, and whether it must break a
/// door down to do so
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub to: Coord,
    pub bash: bool,
}

/// Direction towards a target offset, and whether to try the left-hand
/// alternatives first. Exact ties are broken by the turn counter.
fn initial_direction(dy: i32, dx: i32, even_turn: bool) -> (Direction, bool) {
    let (ay, ax) = (dy.abs(), dx.abs());
    if ay > ax * 2 {
        if dy < 0 {
            (Direction::North, dx < 0 || (dx == 0 && even_turn))
        } else {
            (Direction::South, dx > 0 || (dx == 0 && even_turn))
        }
    } else if ax > ay * 2 {
        if dx < 0 {
            (Direction::West, dy > 0 || (dy == 0 && even_turn))
        } else {
            (Direction::East, dy < 0 || (dy == 0 && even_turn))
        }
    } else if dy < 0 {
        if dx < 0 {
            (Direction::NorthWest, ay < ax || (ay == ax && even_turn))
        } else {
            (Direction::NorthEast, ay > ax || (ay == ax && even_turn))
        }
    } else if dx < 0 {
        (Direction::SouthWest, ay > ax || (ay == ax && even_turn))
    } else {
        (Direction::SouthEast, ay < ax || (ay == ax && even_turn))
    }
}

/// An adjacent grid that makes progress along the longer axis towards
/// the monster's target, or failing that a sideways grid that opens onto
/// one. Used by fleeing monsters that keep bumping into things.
pub fn get_route_to_target(world: &World, id: MonsterId, target: Coord) -> Option<Coord> {
    let pos = world.monsters.get(id)?.pos;
    let (ady, adx) = ((target.y - pos.y).abs(), (target.x - pos.x).abs());
    if ady == adx {
        return None;
    }
    let vertical = ady > adx;
    let axis = |c: Coord| if vertical { c.y } else { c.x };
    let here = axis(pos);
    let forward = axis(target) > here;
    let ahead = |v: i32| if forward { v > here } else { v < here };
    let passable = |c: Coord| cave_passable_mon(world, id, c).is_passable();

    let mut sideways = None;
    for dir in DDD {
        let c = pos.step(dir);
        if !world.grid.in_bounds_fully(c) || !passable(c) {
            continue;
        }
        let v = axis(c);
        if v == here {
            if DDD.iter().any(|&d| {
                let n = c.step(d);
                ahead(axis(n)) && passable(n)
            }) {
                sideways = Some(c);
            }
        } else if ahead(v) {
            return Some(c);
        }
    }
    sideways
}

/// A confused monster blunders into something it can't enter
fn make_confused_move(world: &mut World, id: MonsterId, c: Coord) {
    if !world.grid.in_bounds_fully(c) {
        return;
    }
    let Some(m) = world.monsters.get(id) else { return };
    let seen = m.ml && world.player_can_see(c);
    let (pos, confused, flying, name) = (m.pos, m.confused > 0, m.race.has(RaceFlags::FLYING), m.desc_cap());
    let feat = world.grid.feat(c);

    if feat == Feature::Chasm {
        if !flying && world.grid.occupant(c).is_empty() {
            world.monster_swap(pos, c);
        }
    } else if feat.is_wall() && seen && confused {
        let msg = if feat.is_known_closed_door() {
            format!("{name} staggers into a door.")
        } else if feat == Feature::Rubble {
            format!("{name} staggers into some rubble.")
        } else {
            format!("{name} bashes into a wall.")
        };
        world.message(msg);
    }
}

/// Decide which grid a monster heading for `target` actually tries to
/// enter this turn. `None` means it fails to move.
pub fn make_move(world: &mut World, id: MonsterId, target: Coord, fear: bool) -> Option<Step> {
    let m = world.monsters.get(id)?;
    let race = m.race.clone();
    let (origin, cdis, seen, confused) = (m.pos, m.cdis, m.ml, m.confused > 0);
    let player = world.player.pos;

    let (dy, dx) = (target.y - origin.y, target.x - origin.x);
    let (mut dir0, mut bias_left) = initial_direction(dy, dx, world.turn % 2 == 0);

    let mut target = target;
    if target == origin {
        if cdis == 1 && !race.has(RaceFlags::NEVER_BLOW) {
            target = player;
        } else {
            return None;
        }
    }

    if confused && !race.has(RaceFlags::NEVER_MOVE) {
        bias_left = false;
        let roll = world.rng.damroll(3, 2) - world.rng.damroll(3, 2);
        dir0 = scramble_direction(dir0, roll);
    }

    // an easy step straight into an adjacent target
    if (-1..=1).contains(&dy) && (-1..=1).contains(&dx) && !confused {
        let passage = cave_passable_mon(world, id, target);
        if passage.chance >= 50 {
            let ok = passage.chance >= 100 || world.rng.percent(passage.chance);
            return ok.then_some(Step { to: target, bash: passage.bash });
        }
    }

    let dirs = dir0.side_dirs(bias_left);
    let mut moves = [Passage::BLOCKED; 8];
    let mut chosen = None;
    let mut avoid = false;
    let mut passable = false;
    let mut look_again = false;

    for i in 0..8 {
        let n = origin.step(dirs[i]);
        if !world.grid.in_bounds(n) {
            continue;
        }
        moves[i] = cave_passable_mon(world, id, n);
        if confused {
            chosen = Some(i);
            break;
        }
        if !moves[i].is_passable() {
            continue;
        }

        if fear {
            let hideout = world.monsters.get(id).and_then(|m| m.target);
            if let Some(hideout) = hideout.filter(|&t| i >= 2 && distance(origin, t) > 1) {
                if let Some(c) = get_route_to_target(world, id, hideout) {
                    let passage = cave_passable_mon(world, id, c);
                    return world.rng.percent(passage.chance).then_some(Step { to: c, bash: passage.bash });
                } else if i >= 3
                    && seen
                    && world.grid.has_info(origin, CellFlags::FIRE)
                    && !world.player.truce
                    && race.freq_ranged < 50
                {
                    // no way to the hiding place and in the line of fire
                    panic(world, id);
                }
            }
            if i == 0 && n == player {
                if let Some(m) = world.monsters.get_mut(id) {
                    m.target = None;
                }
            }
            if seen {
                if world.player_has_los(origin) {
                    if !world.player_has_los(n) && moves[i].chance > 40 {
                        chosen = Some(i);
                        break;
                    }
                } else if world.player_has_los(n) {
                    moves[i].chance = 0;
                    continue;
                }
            }
            if !seen && !world.player_can_see(origin) && world.player_can_see(n) {
                moves[i].chance = 0;
                continue;
            }
        }

        if world.grid.feat(n) == Feature::Glyph && !fear && world.rng.one_in(5) {
            chosen = Some(i);
            break;
        }

        if i == 0 && moves[0].chance >= 80 {
            // backing away: don't step alongside the player
            if fear && cdis <= 2 && distance(player, n) <= 1 {
                avoid = true;
            } else {
                chosen = Some(0);
                break;
            }
        } else if (i == 1 || i == 2) && moves[i].chance >= 50 {
            let straight = moves[0].chance >= moves[i].chance && (!avoid || distance(player, n) == 0);
            chosen = Some(if straight { 0 } else { i });
            break;
        }

        if !passable {
            passable = true;
            if i >= 3 {
                chosen = Some(i);
                break;
            }
        }
        if i == 7 {
            look_again = true;
        }
    }

    if look_again {
        if !passable {
            return None;
        }
        chosen = moves.iter().position(Passage::is_passable);
    }

    let i = chosen?;
    let dir = dirs[i];
    if dir == Direction::Here {
        return None;
    }
    let to = origin.step(dir);
    let passage = moves[i];

    if confused && passage.chance <= 25 {
        make_confused_move(world, id, to);
        if !passage.is_passable() {
            return None;
        }
    }
    if passage.chance < 100 && !world.rng.percent(passage.chance) {
        return None;
    }

    // cornered and obliged to fight
    if fear && world.grid.player_at(to) && !world.player.truce {
        panic(world, id);
    }
    Some(Step { to, bash: passage.bash })
}
