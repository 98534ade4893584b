//! Choosing where to go this turn
//!
//! `get_move` turns the tactical situation into a destination grid and a
//! flag saying whether the monster is trying to get away. The order of the
//! checks matters: immobile monsters, then fear, then melee range, then
//! luring the player into the open, then surrounding, then the standard
//! advance.

#[cfg(not(feature = "std"))]
use crate::compat::*;

use super::advance::get_move_advance;
use super::passable::cave_exist_mon;
use super::range::find_range;
use super::retreat::get_move_retreat;
use crate::consts::{
    FLEE_RANGE, HEALTH_ALMOST_DEAD, HEALTH_BADLY_WOUNDED, HEALTH_WOUNDED, TURN_RANGE, health_level,
};
use crate::dungeon::{CellFlags, Coord, DDD, ProjectFlags, Projectable, distance, rough_direction};
use crate::monster::{MonsterId, RaceFlags, Stance};
use crate::player::Timed;
use crate::world::World;

/// Where a monster has decided to go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveIntent {
    pub target: Coord,
    /// Moving away from the player rather than towards
    pub fear: bool,
}

impl MoveIntent {
    const fn towards(target: Coord) -> Self {
        Self { target, fear: false }
    }

    const fn away(target: Coord) -> Self {
        Self { target, fear: true }
    }
}

fn has_monster(world: &World, c: Coord) -> bool {
    world.grid.in_bounds(c) && world.grid.monster_at(c).is_some()
}

fn crowd(world: &World, c: Coord) -> usize {
    c.neighbours().filter(|&n| has_monster(world, n)).count()
}

/// How exposed the player is to a monster approaching from `from`: open
/// grids around the player, monsters already engaged (especially behind
/// the player), and the player's health and condition.
pub fn calc_vulnerability(world: &World, from: Coord) -> i32 {
    let p = world.player.pos;
    let dir = rough_direction(p, from);
    let (dy, dx) = (dir.dy(), dir.dx());
    let floor = |y: i32, x: i32| world.grid.is_floor(p.offset(y, x));
    let mon = |y: i32, x: i32| has_monster(world, p.offset(y, x));

    let (front, flanks, behind) = if dy * dx == 0 {
        (
            (dy, dx),
            [(dx + dy, -dy + dx), (-dx + dy, dy + dx), (dx, -dy), (-dx, dy)],
            [(dx - dy, -dy - dx), (-dx - dy, dy - dx), (-dy, -dx)],
        )
    } else {
        (
            (dy, dx),
            [(dy, 0), (0, dx), (dx, -dy), (-dx, dy)],
            [(-dy, 0), (0, -dx), (-dy, -dx)],
        )
    };

    let mut vulnerability = 0;
    if floor(front.0, front.1) {
        vulnerability += 1;
    }
    for (y, x) in flanks {
        if floor(y, x) {
            vulnerability += 1;
        }
        if mon(y, x) {
            vulnerability += 1;
        }
    }
    for (y, x) in behind {
        if mon(y, x) {
            vulnerability += 2;
        }
    }

    let player = &world.player;
    vulnerability += match health_level(player.chp, player.mhp) {
        HEALTH_WOUNDED | HEALTH_BADLY_WOUNDED => 1,
        HEALTH_ALMOST_DEAD => 2,
        _ => 0,
    };
    if player.is(Timed::Blind)
        || player.is(Timed::Image)
        || player.is(Timed::Confused)
        || player.is(Timed::Afraid)
        || player.is(Timed::Entranced)
        || player.timed(Timed::Stun) > 50
        || player.is(Timed::Slow)
    {
        vulnerability += 2;
    }
    vulnerability
}

/// How reluctant a monster is to engage: kin nearby who could join in
/// if the player stepped into the open make it more patient
pub fn calc_hesitance(world: &World, id: MonsterId) -> i32 {
    let Some(m) = world.monsters.get(id) else { return 1 };
    let player = world.player.pos;
    let mut hesitance = 1;
    'scan: for y in -5..=5 {
        for x in -5..=5 {
            if y == 0 && x == 0 {
                continue;
            }
            let c = m.pos.offset(y, x);
            if !world.grid.in_bounds(c) {
                continue;
            }
            let Some(other) = world.grid.monster_at(c).and_then(|n| world.monsters.get(n)) else {
                continue;
            };
            if m.race.similar(&other.race) && distance(c, player) > 1 {
                hesitance += 1;
                break 'scan;
            }
        }
    }
    if m.race.freq_ranged > 30 && hesitance == 2 {
        hesitance += 1;
    }
    hesitance
}

/// Shuffle sideways to a less crowded grid next to the player, or step
/// out of the mouth of a corridor so the monsters behind can get at them
fn surround(world: &mut World, id: MonsterId) -> Option<Coord> {
    let m = world.monsters.get(id)?;
    let (f, flanking) = (m.pos, m.race.has(RaceFlags::FLANKING));
    let p = world.player.pos;
    let count = crowd(world, f);

    let start = world.rng.rand_int(8) as usize;
    for i in start..start + 8 {
        let c = p.step(DDD[i % 8]);
        if c == f || !c.is_adjacent(f) {
            continue;
        }
        if world.grid.is_floor(c)
            && world.grid.occupant(c).is_empty()
            && crowd(world, c) <= count
            && (flanking || world.rng.one_in(2))
        {
            return Some(c);
        }
    }

    let (dy, dx) = (p.y - f.y, p.x - f.x);
    let wall = |y: i32, x: i32| world.grid.is_wall(f.offset(y, x));
    let mon = |y: i32, x: i32| has_monster(world, f.offset(y, x));
    let free = |y: i32, x: i32| !mon(y, x);

    if dy * dx == 0 {
        // X#A
        // Xo@
        // X#B
        if wall(dx, dy) && wall(-dx, -dy) && (mon(dx - dy, dy - dx) || mon(-dy, -dx) || mon(-dx - dy, -dy - dx)) {
            let a = (dx + dy, dy + dx);
            let b = (-dx + dy, -dy + dx);
            let pick = match (free(a.0, a.1), free(b.0, b.1)) {
                (true, true) if world.rng.one_in(2) => Some(a),
                (true, true) => Some(b),
                (true, false) => Some(a),
                (false, true) => Some(b),
                (false, false) => None,
            };
            return pick.map(|(y, x)| f.offset(y, x));
        }
    } else if wall(1, 0) && wall(-1, 0) {
        if (mon(-1, -dx) || mon(0, -dx) || mon(1, -dx)) && free(0, dx) {
            return Some(f.offset(0, dx));
        }
    } else if wall(0, -1) && wall(0, 1) && (mon(-dy, -1) || mon(-dy, 0) || mon(-dy, 1)) && free(dy, 0) {
        return Some(f.offset(dy, 0));
    }
    None
}

/// Pick this turn's destination for a monster, or `None` if it stays put.
///
/// With `must_use_target` the monster goes wherever it last meant to,
/// having lost track of the player.
pub fn get_move(world: &mut World, id: MonsterId, must_use_target: bool) -> Option<MoveIntent> {
    let m = world.monsters.get(id)?;
    let race = m.race.clone();
    let pos = m.pos;
    let player = world.player.pos;

    if race.has(RaceFlags::HIDDEN_MOVE) && world.grid.has_info(pos, CellFlags::SEEN) {
        if m.ml && world.rng.one_in(50) {
            world.learn_flags(id, RaceFlags::HIDDEN_MOVE);
        }
        return None;
    }
    if race.is_morgoth() && world.player.truce {
        return None;
    }
    if race.is_mindless() && race.has(RaceFlags::TERRITORIAL) && m.cdis > 5 {
        return None;
    }

    if race.has(RaceFlags::NEVER_MOVE) {
        let (seen, cdis) = (m.ml, m.cdis);
        if seen && world.rng.one_in(20) {
            world.learn_flags(id, RaceFlags::NEVER_MOVE);
        }
        if cdis <= 1 {
            if !race.has(RaceFlags::NEVER_BLOW) {
                return Some(MoveIntent::towards(player));
            }
            if seen && world.rng.one_in(10) {
                world.learn_flags(id, RaceFlags::NEVER_BLOW);
            }
        }
        return None;
    }

    if must_use_target {
        return m.target.map(MoveIntent::towards);
    }

    let mut dest = pos;
    let mut fear = m.min_range >= FLEE_RANGE || m.stance == Stance::Fleeing;

    if fear {
        if m.stance != Stance::Fleeing && m.cdis < TURN_RANGE && world.player.speed > m.speed() {
            find_range(world, id);
            let m = world.monsters.get(id)?;
            if m.min_range < m.cdis {
                // cornered: charge
                return Some(MoveIntent::towards(player));
            }
        } else if m.cdis < FLEE_RANGE {
            let target = get_move_retreat(world, id)?;
            return Some(MoveIntent::away(target));
        } else {
            return None;
        }
    }

    let m = world.monsters.get(id)?;
    if !fear && m.cdis < m.min_range - 2 {
        match get_move_retreat(world, id) {
            Some(target) => return Some(MoveIntent::away(target)),
            None => dest = player,
        }
    }

    let m = world.monsters.get(id)?;
    if !fear && m.cdis <= 1 {
        if race.has(RaceFlags::NEVER_BLOW) {
            if m.ml && world.rng.one_in(10) {
                world.learn_flags(id, RaceFlags::NEVER_BLOW);
            }
            fear = true;
        } else {
            if race.is_smart() {
                if let Some(c) = surround(world, id) {
                    return Some(MoveIntent::towards(c));
                }
            }
            return Some(MoveIntent::towards(player));
        }
    }

    // lure the player into the open
    let m = world.monsters.get(id)?;
    if !fear
        && race.is_smart()
        && !race.has(RaceFlags::PASS_WALL | RaceFlags::KILL_WALL)
        && m.stance == Stance::Confident
        && calc_vulnerability(world, pos) < calc_hesitance(world, id)
    {
        let (min_range, cdis) = (m.min_range, m.cdis);
        let exposed = world.grid.has_info(pos, CellFlags::FIRE | CellFlags::SEEN);
        if min_range == 1 {
            if exposed {
                return Some(match get_move_retreat(world, id) {
                    Some(target) => MoveIntent::away(target),
                    None => MoveIntent::towards(player),
                });
            }
            let target = get_move_advance(world, id).unwrap_or(dest);
            return Some(MoveIntent { target, fear: cdis > 1 });
        } else if exposed {
            match get_move_retreat(world, id) {
                Some(target) => {
                    dest = target;
                    fear = true;
                }
                None => dest = player,
            }
        }
    }

    // groups try to surround the player
    let m = world.monsters.get(id)?;
    if !fear
        && race.has(RaceFlags::FRIENDS | RaceFlags::FRIEND)
        && m.cdis <= 3
        && world.player_has_los(pos)
        && world.grid.projectable(pos, player, ProjectFlags::CHCK) != Projectable::Clear
    {
        let start = world.rng.rand_int(8) as usize;
        for i in start..start + 8 {
            let c = player.step(DDD[i % 8]);
            if !world.grid.in_bounds(c) || world.grid.monster_at(c).is_some() {
                continue;
            }
            if !cave_exist_mon(&world.grid, &race, c, false, true) {
                continue;
            }
            return Some(MoveIntent::towards(c));
        }
    }

    if !fear {
        if !world.player_has_los(pos) {
            dest = get_move_advance(world, id).unwrap_or(dest);
        } else {
            let m = world.monsters.get_mut(id)?;
            m.target = Some(player);
            if m.cdis > m.best_range
                || (m.cdis > m.min_range && world.rng.one_in(2))
                || !world.grid.has_info(pos, CellFlags::FIRE)
            {
                dest = player;
            } else if race.has(RaceFlags::RAND_50 | RaceFlags::RAND_25) {
                let dir = DDD[world.rng.rand_int(8) as usize];
                dest = pos.step(dir);
            }
            // the pathfinding does better than a straight line
            if dest == player {
                if let Some(m) = world.monsters.get_mut(id) {
                    m.target = None;
                }
                dest = get_move_advance(world, id).unwrap_or(dest);
            }
        }
    } else if let Some(target) = get_move_retreat(world, id) {
        dest = target;
    }

    (dest != pos).then_some(MoveIntent { target: dest, fear })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dungeon::parse_map;
    use crate::world::{SimOptions, testing::arena};

    fn corridor() -> World {
        let layout = parse_map(&[
            "###########",
            "#.........#",
            "#....@....#",
            "#.........#",
            "#####.#####",
            "#####.#####",
            "#####.#####",
            "###########",
        ])
        .unwrap();
        World::from_layout(layout, SimOptions::default(), 3)
            .unwrap()
            .with_builtin_races()
    }

    #[test]
    fn test_vulnerability_in_the_open() {
        let world = arena();
        // a monster due east of a player in open ground
        let v = calc_vulnerability(&world, Coord::new(2, 7));
        assert_eq!(v, 5);
    }

    #[test]
    fn test_vulnerability_in_a_doorway() {
        let mut world = corridor();
        world.place_player(Coord::new(5, 5)).unwrap();
        // approaching from below: walls everywhere but the front
        let v = calc_vulnerability(&world, Coord::new(6, 5));
        assert_eq!(v, 1);
    }

    #[test]
    fn test_vulnerability_rises_when_surrounded() {
        let mut world = arena();
        let open = calc_vulnerability(&world, Coord::new(2, 7));
        world.place_monster("Snaga", Coord::new(2, 3)).unwrap();
        assert_eq!(calc_vulnerability(&world, Coord::new(2, 7)), open + 2);
        world.player.chp = 5;
        assert_eq!(calc_vulnerability(&world, Coord::new(2, 7)), open + 4);
    }

    #[test]
    fn test_kin_make_monsters_hesitate() {
        let mut world = arena();
        let a = world.place_monster("Cave orc", Coord::new(1, 1)).unwrap();
        assert_eq!(calc_hesitance(&world, a), 1);
        world.place_monster("Snaga", Coord::new(3, 1)).unwrap();
        assert_eq!(calc_hesitance(&world, a), 2);
    }

    #[test]
    fn test_adjacent_monsters_attack() {
        let mut world = arena();
        let id = world.place_monster("Wolf", Coord::new(2, 5)).unwrap();
        let intent = get_move(&mut world, id, false).unwrap();
        assert_eq!(intent, MoveIntent::towards(world.player.pos));
    }

    #[test]
    fn test_immobile_monsters_only_attack() {
        let mut world = arena();
        world.update_race("Snaga", |r| r.flags |= RaceFlags::NEVER_MOVE);
        let near = world.place_monster("Snaga", Coord::new(2, 5)).unwrap();
        let far = world.place_monster("Snaga", Coord::new(1, 1)).unwrap();
        assert!(get_move(&mut world, near, false).is_some());
        assert!(get_move(&mut world, far, false).is_none());
    }

    #[test]
    fn test_frightened_monsters_retreat() {
        let mut world = arena();
        let id = world.place_monster("Snaga", Coord::new(2, 6)).unwrap();
        world.update_noise();
        world.monsters.get_mut(id).unwrap().stance = Stance::Fleeing;
        if let Some(intent) = get_move(&mut world, id, false) {
            assert!(intent.fear);
            let p = world.player.pos;
            assert!(distance(intent.target, p) >= distance(Coord::new(2, 6), p));
        }
    }

    #[test]
    fn test_hidden_movers_freeze_in_sight() {
        let mut world = arena();
        world.update_race("Snaga", |r| r.flags |= RaceFlags::HIDDEN_MOVE);
        let id = world.place_monster("Snaga", Coord::new(1, 1)).unwrap();
        world.update_view();
        assert!(get_move(&mut world, id, false).is_none());
    }

    #[test]
    fn test_distant_monsters_advance() {
        let mut world = corridor();
        let id = world.place_monster("Wolf", Coord::new(6, 5)).unwrap();
        world.update_view();
        world.update_noise();
        let intent = get_move(&mut world, id, false).unwrap();
        assert!(!intent.fear);
        assert_eq!(intent.target, Coord::new(5, 5));
    }

    #[test]
    fn test_must_use_target() {
        let mut world = arena();
        let id = world.place_monster("Snaga", Coord::new(1, 1)).unwrap();
        assert!(get_move(&mut world, id, true).is_none());
        world.monsters.get_mut(id).unwrap().target = Some(Coord::new(3, 7));
        assert_eq!(get_move(&mut world, id, true).unwrap().target, Coord::new(3, 7));
    }
}
