//! Running along corridors and across rooms
//!
//! A run starts by looking at the walls beside the player. With walls on
//! both sides the player is in a corridor and follows its bends, stopping
//! at junctions. Otherwise the player is crossing an open area and stops
//! as soon as the wall pattern on either side changes. Monsters, objects
//! and remembered features of note stop a run in either mode.

#[cfg(not(feature = "std"))]
use crate::compat::*;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::ActionResult;
use super::movement::move_player;
use crate::dungeon::{CellFlags, Coord, Direction, Feature};
use crate::monster::RaceFlags;
use crate::world::World;

/// Steps a run may take before giving up
const RUN_LIMIT: u32 = 1000;

/// The direction and wall-following state of a run in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    /// Direction of the next step
    pub cur_dir: Direction,
    /// Direction the player is treated as having come from
    pub old_dir: Direction,
    /// Crossing an open area rather than following a corridor
    pub open_area: bool,
    pub break_left: bool,
    pub break_right: bool,
    /// Steps left before the run stops by itself
    pub remaining: u32,
}

/// A remembered wall one step from `c`. The edge of the map counts.
fn see_wall(world: &World, dir: Direction, c: Coord) -> bool {
    let c = c.step(dir);
    if !world.grid.in_bounds(c) {
        return true;
    }
    world.grid.has_info(c, CellFlags::MARK) && world.grid.is_wall(c)
}

/// Work out whether the first step of a run enters a corridor, and which
/// way a diagonal or blunt corridor entry should bend
pub fn run_init(world: &World, dir: Direction) -> RunState {
    let pos = world.player.pos;
    let ahead = pos.step(dir);
    let mut run = RunState {
        cur_dir: dir,
        old_dir: dir,
        open_area: true,
        break_left: false,
        break_right: false,
        remaining: RUN_LIMIT,
    };

    let (mut deep_left, mut deep_right) = (false, false);
    let (mut short_left, mut short_right) = (false, false);

    if see_wall(world, dir.rotate(1), pos) {
        run.break_left = true;
        short_left = true;
    } else if see_wall(world, dir.rotate(1), ahead) {
        run.break_left = true;
        deep_left = true;
    }
    if see_wall(world, dir.rotate(-1), pos) {
        run.break_right = true;
        short_right = true;
    } else if see_wall(world, dir.rotate(-1), ahead) {
        run.break_right = true;
        deep_right = true;
    }

    if run.break_left && run.break_right {
        run.open_area = false;
        if dir.is_diagonal() {
            if deep_left && !deep_right {
                run.old_dir = dir.rotate(-1);
            } else if deep_right && !deep_left {
                run.old_dir = dir.rotate(1);
            }
        } else if see_wall(world, dir, ahead) {
            if short_left && !short_right {
                run.old_dir = dir.rotate(-2);
            } else if short_right && !short_left {
                run.old_dir = dir.rotate(2);
            }
        }
    }
    run
}

/// Features a runner stops for once they are remembered
fn worth_noticing(world: &World, c: Coord) -> bool {
    match world.grid.feat(c) {
        Feature::Trap(_) => !world.grid.hidden_trap(c),
        feat => feat.is_interesting(),
    }
}

/// Look at the grids that the last step brought into reach and update the
/// run. Returns true if the run should stop.
pub fn run_test(world: &World, run: &mut RunState) -> bool {
    let pos = world.player.pos;
    let prev_dir = run.old_dir;
    let max = if prev_dir.is_diagonal() { 2 } else { 1 };

    let mut option: Option<Direction> = None;
    let mut option2: Option<Direction> = None;

    for i in -max..=max {
        let new_dir = prev_dir.rotate(i);
        let c = pos.step(new_dir);
        let in_bounds = world.grid.in_bounds(c);

        if in_bounds {
            let seen_monster = world
                .grid
                .monster_at(c)
                .and_then(|id| world.monsters.get(id))
                .is_some_and(|m| m.ml);
            if seen_monster || !world.grid.objects_at(c).is_empty() {
                return true;
            }
        }

        // off the map counts as a known wall
        let mut unknown = in_bounds;
        if in_bounds && world.grid.has_info(c, CellFlags::MARK) {
            if worth_noticing(world, c) {
                return true;
            }
            unknown = false;
        }

        if unknown || (in_bounds && world.grid.is_floor(c)) {
            if run.open_area {
                continue;
            }
            match (option, option2) {
                (None, _) => option = Some(new_dir),
                // three ways on
                (Some(_), Some(_)) => return true,
                // two ways on with a wall between
                (Some(first), None) if first != prev_dir.rotate(i - 1) => return true,
                (Some(first), None) => {
                    if new_dir.is_diagonal() {
                        option2 = Some(new_dir);
                    } else {
                        option2 = Some(first);
                        option = Some(new_dir);
                    }
                }
            }
        } else if run.open_area {
            if i < 0 {
                run.break_right = true;
            } else if i > 0 {
                run.break_left = true;
            }
        }
    }

    // one more step would put a stationary monster within reach
    for i in -max..=max {
        let c = pos.step(prev_dir).step(prev_dir.rotate(i));
        if !world.grid.in_bounds(c) {
            continue;
        }
        let rooted = world
            .grid
            .monster_at(c)
            .and_then(|id| world.monsters.get(id))
            .is_some_and(|m| m.ml && m.race.has(RaceFlags::NEVER_MOVE));
        if rooted {
            return true;
        }
    }

    if run.open_area {
        let open = |i: i32| {
            let c = pos.step(prev_dir.rotate(i));
            world.grid.in_bounds(c)
                && (!world.grid.has_info(c, CellFlags::MARK) || !world.grid.is_wall(c))
        };
        let right = (-max..0).any(|i| if open(i) { run.break_right } else { run.break_left });
        let left = (1..=max).any(|i| if open(i) { run.break_left } else { run.break_right });
        if right || left {
            return true;
        }
    } else {
        let Some(first) = option else { return true };
        run.cur_dir = first;
        run.old_dir = option2.unwrap_or(first);
    }

    see_wall(world, run.cur_dir, pos)
}

/// Take one step of a run. With a direction a new run starts; without one
/// the run in progress carries on, unless something stops it.
pub fn run_step(
    world: &mut World,
    dir: Option<Direction>,
    confirm: &mut dyn FnMut(&str) -> bool,
) -> ActionResult {
    let mut run = match (dir, world.run) {
        (Some(dir), _) => {
            let run = run_init(world, dir);
            debug!(?dir, open_area = run.open_area, "run started");
            run
        }
        (None, Some(mut run)) => {
            if run_test(world, &mut run) {
                trace!(at = %world.player.pos, "run stopped");
                world.disturb();
                return ActionResult::NoTime;
            }
            run
        }
        (None, None) => return ActionResult::NoTime,
    };

    run.remaining = run.remaining.saturating_sub(1);
    let step = run.cur_dir;
    // a disturbance during the move ends the run
    world.run = (run.remaining > 0).then_some(run);
    let result = move_player(world, step, confirm);
    if !result.takes_time() {
        world.run = None;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dungeon::parse_map;
    use crate::world::SimOptions;

    fn no(_: &str) -> bool {
        false
    }

    fn world_from(rows: &[&str]) -> World {
        let layout = parse_map(rows).expect("map parses");
        let mut world = World::from_layout(layout, SimOptions::default(), 3)
            .expect("player placed")
            .with_builtin_races();
        for c in world.grid.coords().collect::<Vec<_>>() {
            world.grid.set_info(c, CellFlags::MARK);
        }
        world
    }

    fn run_until_stopped(world: &mut World, dir: Direction) -> usize {
        let mut steps = 0;
        let mut result = run_step(world, Some(dir), &mut no);
        while result.takes_time() && world.run.is_some() && steps < 100 {
            steps += 1;
            result = run_step(world, None, &mut no);
        }
        steps
    }

    #[test]
    fn test_corridor_start_is_not_open_area() {
        let world = world_from(&[
            "#######",
            "#@....#",
            "#######",
        ]);
        let run = run_init(&world, Direction::East);
        assert!(!run.open_area);
        assert_eq!(run.cur_dir, Direction::East);
    }

    #[test]
    fn test_room_start_is_open_area() {
        let world = world_from(&[
            "#######",
            "#.....#",
            "#.@...#",
            "#.....#",
            "#######",
        ]);
        assert!(run_init(&world, Direction::East).open_area);
    }

    #[test]
    fn test_run_stops_at_corridor_end() {
        let mut world = world_from(&[
            "#######",
            "#@....#",
            "#######",
        ]);
        run_until_stopped(&mut world, Direction::East);
        assert_eq!(world.player.pos, Coord::new(1, 5));
        assert!(world.run.is_none());
    }

    #[test]
    fn test_run_follows_a_bend() {
        let mut world = world_from(&[
            "#######",
            "#@...##",
            "#####.#",
            "#####.#",
            "#######",
        ]);
        run_until_stopped(&mut world, Direction::East);
        assert_eq!(world.player.pos, Coord::new(3, 5));
    }

    #[test]
    fn test_run_stops_at_a_junction() {
        let mut world = world_from(&[
            "#########",
            "####.####",
            "#@......#",
            "####.####",
            "#########",
        ]);
        run_until_stopped(&mut world, Direction::East);
        assert_eq!(world.player.pos, Coord::new(2, 3));
    }

    #[test]
    fn test_run_stops_next_to_a_door() {
        let mut world = world_from(&[
            "#######",
            "#@..+.#",
            "#######",
        ]);
        run_until_stopped(&mut world, Direction::East);
        assert_eq!(world.player.pos, Coord::new(1, 3));
    }

    #[test]
    fn test_run_stops_when_a_monster_appears() {
        let mut world = world_from(&[
            "###########",
            "#@........#",
            "###########",
        ]);
        world.place_monster("Snaga", Coord::new(1, 9)).expect("room for the orc");
        world.update_view();
        world.update_monsters();
        let steps = run_until_stopped(&mut world, Direction::East);
        assert!(steps < 8);
        assert!(world.player.pos.x < 9);
    }

    #[test]
    fn test_run_into_a_known_wall_fails_to_start() {
        let mut world = world_from(&[
            "#####",
            "#@..#",
            "#####",
        ]);
        let result = run_step(&mut world, Some(Direction::North), &mut no);
        assert!(result.takes_time());
        assert!(world.run.is_none());
    }

    #[test]
    fn test_remaining_steps_run_out() {
        let mut world = world_from(&[
            "#######",
            "#@....#",
            "#######",
        ]);
        run_step(&mut world, Some(Direction::East), &mut no);
        if let Some(run) = world.run.as_mut() {
            run.remaining = 1;
        }
        run_step(&mut world, None, &mut no);
        assert!(world.run.is_none());
        assert_eq!(world.player.pos, Coord::new(1, 3));
    }
}
