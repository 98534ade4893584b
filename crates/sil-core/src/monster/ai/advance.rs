//! Closing in on the player: remembered targets, sound and scent

#[cfg(not(feature = "std"))]
use crate::compat::*;

use super::range::monster_can_smell;
use super::retreat::get_move_retreat;
use crate::consts::{ALERTNESS_ALERT, FLOW_MAX_DIST};
use crate::dungeon::{Coord, DDD};
use crate::monster::{MonsterId, RaceFlags, set_alertness};
use crate::world::World;

/// Where a monster that wants to close with the player should head.
///
/// A remembered target wins; otherwise the monster follows the loudest
/// neighbouring grid of its sound flow, or failing that the freshest
/// scent. `None` leaves the choice to the caller.
pub fn get_move_advance(world: &mut World, id: MonsterId) -> Option<Coord> {
    let m = world.monsters.get(id)?;
    let pos = m.pos;
    let player = world.player.pos;

    // territorial monsters don't give chase out of sight
    if m.race.has(RaceFlags::TERRITORIAL) && !world.grid.los(player, pos) {
        let alertness = m.alertness;
        world.learn_flags(id, RaceFlags::TERRITORIAL);
        if world.rng.one_in(10) && alertness >= ALERTNESS_ALERT {
            set_alertness(world, id, alertness - 1);
        }
        return Some(pos);
    }

    if let Some(target) = m.target {
        return Some(target);
    }

    let use_sound = world.flows.monster_dist(id, pos) < FLOW_MAX_DIST;
    let use_scent = !use_sound && monster_can_smell(world, id);

    if !use_sound && !use_scent {
        // in sight but out of earshot means a chasm is in the way
        if world.grid.los(pos, player) {
            return get_move_retreat(world, id);
        }
        return Some(player);
    }

    let mut closest = FLOW_MAX_DIST;
    let mut best = None;
    for &dir in DDD.iter().rev() {
        let c = pos.step(dir);
        if !world.grid.in_bounds(c) {
            continue;
        }
        let score = if use_scent {
            let age = world.grid.scent_age(c);
            if age < 0 {
                continue;
            }
            age
        } else {
            world.flows.monster_dist(id, c)
        };
        if closest < score {
            continue;
        }
        closest = score;
        best = Some(c);
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dungeon::{CellFlags, Feature, distance};
    use crate::world::testing::arena;

    #[test]
    fn test_remembered_target_comes_first() {
        let mut world = arena();
        let id = world.place_monster("Snaga", Coord::new(1, 1)).unwrap();
        world.update_noise();
        world.monsters.get_mut(id).unwrap().target = Some(Coord::new(3, 7));
        assert_eq!(get_move_advance(&mut world, id), Some(Coord::new(3, 7)));
    }

    #[test]
    fn test_follows_the_sound_flow() {
        let mut world = arena();
        let id = world.place_monster("Snaga", Coord::new(1, 1)).unwrap();
        world.update_noise();
        let step = get_move_advance(&mut world, id).unwrap();
        assert!(step.is_adjacent(Coord::new(1, 1)));
        let before = world.flows.monster_dist(id, Coord::new(1, 1));
        assert!(world.flows.monster_dist(id, step) < before);
    }

    #[test]
    fn test_territorial_monsters_stay_home() {
        let mut world = arena();
        world.update_race("Snaga", |r| r.flags |= RaceFlags::TERRITORIAL);
        // wall the monster off from the player
        for y in 1..4 {
            world.grid.set_feat(Coord::new(y, 2), Feature::Granite);
            world.grid.clear_info(Coord::new(y, 2), CellFlags::ROOM);
        }
        let id = world.place_monster("Snaga", Coord::new(2, 1)).unwrap();
        world.update_view();
        assert_eq!(get_move_advance(&mut world, id), Some(Coord::new(2, 1)));
    }

    #[test]
    fn test_blind_advance_without_senses() {
        let mut world = arena();
        let id = world.place_monster("Snaga", Coord::new(1, 1)).unwrap();
        // no noise flow and no scent: head straight for the player
        for y in 1..4 {
            world.grid.set_feat(Coord::new(y, 3), Feature::Granite);
        }
        world.update_view();
        let target = get_move_advance(&mut world, id).unwrap();
        assert_eq!(target, world.player.pos);
        assert!(distance(target, Coord::new(1, 1)) > 1);
    }
}
