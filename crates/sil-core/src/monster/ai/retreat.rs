//! Running away
//!
//! A frightened monster first tries to get out of the player's sight,
//! then out of earshot, and only runs blindly when neither works. Archers
//! back off to a spot they can still shoot from. A monster cornered in
//! plain view panics and turns to fight.

#[cfg(not(feature = "std"))]
use crate::compat::*;

use tracing::debug;

use super::passable::cave_passable_mon;
use super::ranged::shriek;
use crate::consts::{FLEE_RANGE, FLOW_MAX_DIST, HIDE_RANGE, TURN_RANGE};
use crate::dungeon::{Coord, DDD, Occupant, ProjectFlags, distance, distance_squared};
use crate::monster::{MonsterFlags, MonsterId, RaceFlags, SpellFlags, Stance, calc_morale, calc_stance};
use crate::world::World;

/// Frequency of ranged attacks at which a monster fights from a distance
const ARCHER_FREQ: i32 = 50;

/// A cornered monster steels itself and attacks
pub(super) fn panic(world: &mut World, id: MonsterId) {
    let Some(m) = world.monsters.get_mut(id) else { return };
    m.tmp_morale = (m.tmp_morale + 60).max(60);
    m.flags.insert(MonsterFlags::AGGRESSIVE);
    let (seen, name) = (m.ml, m.desc_cap());
    debug!(monster = %m.race.name, "panicked");
    if seen {
        world.message(format!("{name} panics."));
    }
    calc_morale(world, id);
    calc_stance(world, id);
}

/// Search outward for the cheapest grid the player can't see, with a way
/// out of it, and make it the monster's target
pub fn find_safety(world: &mut World, id: MonsterId) -> Option<Coord> {
    const SIDE: i32 = HIDE_RANGE * 2 + 1;
    let m = world.monsters.get(id)?;
    let origin = m.pos;
    let race = m.race.clone();
    let player = world.player.pos;

    // costs on a square window centred on the monster; 0 is unvisited
    let mut cost = vec![0i32; (SIDE * SIDE) as usize];
    let slot = |l: Coord| (l.y * SIDE + l.x) as usize;
    let to_world = |l: Coord| Coord::new(l.y + origin.y - HIDE_RANGE, l.x + origin.x - HIDE_RANGE);
    let centre = Coord::new(HIDE_RANGE, HIDE_RANGE);
    cost[slot(centre)] = 1;
    if (origin.y - player.y).abs() <= HIDE_RANGE && (origin.x - player.x).abs() <= HIDE_RANGE {
        let l = Coord::new(player.y - origin.y + HIDE_RANGE, player.x - origin.x + HIDE_RANGE);
        cost[slot(l)] = 100;
    }

    let mut least_cost = 100;
    let mut best = None;
    let mut countdown = HIDE_RANGE;

    for d in 0..HIDE_RANGE {
        for ly in (HIDE_RANGE - d)..=(HIDE_RANGE + d) {
            for lx in (HIDE_RANGE - d)..=(HIDE_RANGE + d) {
                // only the ring at distance d
                if (ly - HIDE_RANGE).abs() != d && (lx - HIDE_RANGE).abs() != d {
                    continue;
                }
                let here = Coord::new(ly, lx);
                if !world.grid.in_bounds_fully(to_world(here)) {
                    continue;
                }
                let parent = cost[slot(here)];
                if parent == 0 || parent >= 100 {
                    continue;
                }

                for dir in DDD {
                    let l = here.step(dir);
                    if l.y < 0 || l.y >= SIDE || l.x < 0 || l.x >= SIDE {
                        continue;
                    }
                    let old = cost[slot(l)];
                    if !(old == 0 || (old > parent + 1 && old < 100)) {
                        continue;
                    }
                    let c = to_world(l);
                    let passage = cave_passable_mon(world, id, c);
                    if !passage.is_passable() {
                        cost[slot(l)] = 100;
                        continue;
                    }
                    let mut step = 100 / passage.chance;
                    // keep clear of the player
                    if distance(c, player) <= 1 {
                        step += 3;
                    }
                    cost[slot(l)] = parent + step;

                    let stair = world.grid.feat(c).is_stair()
                        && race.is_smart()
                        && !race.has(RaceFlags::TERRITORIAL);
                    if world.player_can_see(c) && !stair {
                        continue;
                    }

                    let mut this_cost = cost[slot(l)];
                    if (player.y - c.y).abs() < (origin.y - c.y).abs() {
                        this_cost *= 2;
                    }
                    if (player.x - c.x).abs() < (origin.x - c.x).abs() {
                        this_cost *= 2;
                    }
                    if stair {
                        this_cost /= 2;
                    }
                    if !(least_cost > this_cost || (least_cost == this_cost && world.rng.one_in(2))) {
                        continue;
                    }
                    // no dead ends, except for stairs
                    let has_escape = DDD.iter().any(|&e| {
                        let n = c.step(e);
                        world.grid.in_bounds(n)
                            && !world.player_can_see(n)
                            && cave_passable_mon(world, id, n).is_passable()
                    });
                    if !has_escape && !stair {
                        continue;
                    }
                    least_cost = this_cost;
                    best = Some(c);
                    countdown = 1 + least_cost - d;
                }
            }
        }
        if countdown <= 0 {
            break;
        }
        countdown -= 1;
    }

    if least_cost >= 50 {
        return None;
    }
    let spot = best?;
    if let Some(m) = world.monsters.get_mut(id) {
        m.target = Some(spot);
    }
    Some(spot)
}

/// Best nearby grid for a monster that prefers shooting: far from the
/// player with a clear shot, never adjacent
fn shooting_spot(world: &mut World, id: MonsterId) -> Option<Coord> {
    let m = world.monsters.get(id)?;
    let pos = m.pos;
    let cdis = m.cdis;
    let player = world.player.pos;

    // the archer's own grid mustn't block its lines of fire
    world.grid.set_occupant(pos, Occupant::Empty);

    let has_shot = |world: &World, c: Coord| {
        world.grid.projectable(c, player, ProjectFlags::STOP) == crate::dungeon::Projectable::Clear
    };

    let mut best_score = distance_squared(pos, player);
    if cdis > 1 && has_shot(world, pos) {
        best_score += 100;
    }
    let mut acceptable = cdis > 1;
    let mut best = pos;

    let start = world.rng.rand_int(8) as usize;
    for i in start..start + 8 {
        let c = pos.step(DDD[i % 8]);
        if !world.grid.in_bounds(c) || c == player {
            continue;
        }
        if cave_passable_mon(world, id, c).chance < 50 {
            continue;
        }
        if distance(c, player) == 1 {
            continue;
        }
        acceptable = true;
        let dist = distance_squared(c, player);
        let mut score = dist;
        if dist > 1 && has_shot(world, c) {
            score += 100;
        }
        if score > best_score {
            best_score = score;
            best = c;
        }
    }

    world.grid.set_occupant(pos, Occupant::Monster(id));
    acceptable.then_some(best)
}

/// Where a monster that wants distance from the player should head.
/// `None` means it has nothing better to do than stay put.
pub fn get_move_retreat(world: &mut World, id: MonsterId) -> Option<Coord> {
    let m = world.monsters.get(id)?;
    let race = m.race.clone();

    if race.spells.contains(SpellFlags::SHRIEK) && world.rng.percent(race.freq_ranged) {
        shriek(world, id);
        return None;
    }

    let m = world.monsters.get(id)?;
    if m.cdis >= FLEE_RANGE {
        return None;
    }
    let pos = m.pos;

    // the smart take the stairs
    if race.is_smart() && !race.has(RaceFlags::TERRITORIAL) && m.stance == Stance::Fleeing {
        if world.grid.feat(pos).is_stair() {
            return Some(pos);
        }
        for dir in DDD {
            let c = pos.step(dir);
            if world.grid.in_bounds(c)
                && world.grid.feat(c).is_stair()
                && !world.grid.player_at(c)
                && cave_passable_mon(world, id, c).is_passable()
            {
                return Some(c);
            }
        }
    }

    if race.freq_ranged >= ARCHER_FREQ {
        if let Some(spot) = shooting_spot(world, id) {
            return Some(spot);
        }
        let m = world.monsters.get(id)?;
        // archers only dodge properly along walls when they have reason to
        if m.stance != Stance::Fleeing && !race.is_unique() && m.ml {
            return None;
        }
    }

    let player = world.player.pos;
    let m = world.monsters.get(id)?;
    if let Some(target) = m.target {
        if !world.player_has_los(target) {
            let (dy, dx) = ((player.y - target.y).abs(), (player.x - target.x).abs());
            let mut target = target;
            // hidden only by a knight's move: look for a better corner
            if (dy == 2 && dx == 1) || (dy == 1 && dx == 2) {
                let current = cave_passable_mon(world, id, target).chance;
                for &dir in DDD.iter().rev() {
                    let c = pos.step(dir);
                    if !world.grid.in_bounds(c) || world.player_has_los(c) || c == target {
                        continue;
                    }
                    if current > cave_passable_mon(world, id, c).chance {
                        continue;
                    }
                    target = c;
                    break;
                }
                if let Some(m) = world.monsters.get_mut(id) {
                    m.target = Some(target);
                }
            }
            return Some(target);
        } else if !world.grid.feat(target).is_stair() {
            if let Some(m) = world.monsters.get_mut(id) {
                m.target = None;
            }
        }
    }

    if !world.player_has_los(pos) {
        // out of sight: keep moving away from the noise
        let here = world.flows.monster_dist(id, pos);
        if here < FLOW_MAX_DIST {
            for &dir in DDD.iter().rev() {
                let c = pos.step(dir);
                if world.grid.in_bounds(c)
                    && world.flows.monster_dist(id, c) > here
                    && !world.player_has_los(c)
                {
                    return Some(c);
                }
            }
        }
    } else {
        let prev = world.flows.monster_dist(id, pos);
        let start = world.rng.rand_int(8) as usize;
        for i in start..start + 8 {
            let c = pos.step(DDD[i % 8]);
            if !world.grid.in_bounds(c) || world.player_has_los(c) {
                continue;
            }
            if cave_passable_mon(world, id, c).chance < 50 {
                continue;
            }
            if world.flows.monster_dist(id, c) >= prev {
                return Some(c);
            }
        }

        if let Some(spot) = find_safety(world, id) {
            return Some(spot);
        }

        let m = world.monsters.get(id)?;
        if (m.cdis < TURN_RANGE || m.speed() < world.player.speed)
            && !world.player.truce
            && race.freq_ranged < ARCHER_FREQ
        {
            panic(world, id);
            return Some(pos);
        }
    }

    // straight away from the player
    Some(Coord::new(2 * pos.y - player.y, 2 * pos.x - player.x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dungeon::{Feature, parse_map};
    use crate::world::{SimOptions, testing::arena};

    fn corridor_world() -> World {
        let layout = parse_map(&[
            "###########",
            "#.........#",
            "#.@.......#",
            "#.........#",
            "#######.###",
            "#######.###",
            "###########",
        ])
        .unwrap();
        World::from_layout(layout, SimOptions::default(), 11)
            .unwrap()
            .with_builtin_races()
    }

    #[test]
    fn test_relaxed_when_far_away() {
        let mut world = arena();
        let id = world.place_monster("Snaga", Coord::new(1, 1)).unwrap();
        world.monsters.get_mut(id).unwrap().cdis = FLEE_RANGE;
        assert_eq!(get_move_retreat(&mut world, id), None);
    }

    #[test]
    fn test_fleeing_smart_monster_takes_stairs() {
        let mut world = arena();
        let stair = Coord::new(1, 2);
        world.grid.set_feat(stair, Feature::UpStair);
        let id = world.place_monster("Cave orc", Coord::new(1, 1)).unwrap();
        world.monsters.get_mut(id).unwrap().stance = Stance::Fleeing;
        assert_eq!(get_move_retreat(&mut world, id), Some(stair));
    }

    #[test]
    fn test_hides_round_the_corner() {
        let mut world = corridor_world();
        let id = world.place_monster("Snaga", Coord::new(3, 6)).unwrap();
        world.update_view();
        world.update_noise();
        let spot = find_safety(&mut world, id).unwrap();
        assert!(!world.player_can_see(spot));
        assert_eq!(world.monsters.get(id).unwrap().target, Some(spot));
    }

    #[test]
    fn test_archer_backs_off_to_shoot() {
        let mut world = arena();
        world.update_race("Orc archer", |r| r.freq_ranged = 60);
        let id = world.place_monster("Orc archer", Coord::new(2, 5)).unwrap();
        world.update_monster(id);
        let spot = get_move_retreat(&mut world, id).unwrap();
        assert!(distance(spot, world.player.pos) > 1);
        // the archer's own grid is restored
        assert_eq!(world.grid.monster_at(Coord::new(2, 5)), Some(id));
    }

    #[test]
    fn test_cornered_monster_panics() {
        let mut world = arena();
        let id = world.place_monster("Snaga", Coord::new(2, 3)).unwrap();
        world.update_monster(id);
        let m = world.monsters.get_mut(id).unwrap();
        m.stance = Stance::Fleeing;
        m.ml = true;
        // the whole arena is in view, so there is nowhere to hide
        assert_eq!(get_move_retreat(&mut world, id), Some(Coord::new(2, 3)));
        let m = world.monsters.get(id).unwrap();
        assert!(m.flags.contains(MonsterFlags::AGGRESSIVE));
        assert!(m.tmp_morale >= 60);
        assert_eq!(m.stance, Stance::Aggressive);
        assert_eq!(world.take_messages(), vec!["The Snaga panics.", "The Snaga turns to fight!"]);
    }
}
