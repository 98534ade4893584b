//! The arena's stand-in for a player at the keyboard

use sil_core::World;
use sil_core::action::{Command, Controller};
use sil_core::dungeon::{Coord, DDD, Direction};

/// Fight whatever is adjacent, wait for anything approaching, rest off
/// wounds and otherwise follow corridors.
#[derive(Debug, Default)]
pub struct ArenaPolicy {
    /// Direction of the last run, so a corridor isn't run back along
    last_run: Option<Direction>,
}

impl ArenaPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// The weakest visible monster next to the player
    fn adjacent_target(world: &World) -> Option<Direction> {
        let pos = world.player.pos;
        DDD.into_iter()
            .filter_map(|dir| {
                let id = world.grid.monster_at(pos.step(dir))?;
                let m = world.monsters.get(id).filter(|m| m.ml)?;
                Some((m.hp, dir))
            })
            .min_by_key(|&(hp, _)| hp)
            .map(|(_, dir)| dir)
    }

    fn sees_monster(world: &World) -> bool {
        world.monsters.iter().any(|(_, m)| m.ml)
    }

    fn open(world: &World, c: Coord) -> bool {
        world.grid.in_bounds(c) && world.grid.is_floor(c) && world.grid.occupant(c).is_empty()
    }

    /// A way along the corridor the player is standing in, not back the
    /// way they came
    fn corridor_direction(&self, world: &World) -> Option<Direction> {
        let pos = world.player.pos;
        let orthogonal = [Direction::North, Direction::South, Direction::East, Direction::West];
        let exits: Vec<Direction> =
            orthogonal.into_iter().filter(|&d| Self::open(world, pos.step(d))).collect();
        if exits.is_empty() || exits.len() > 2 {
            return None;
        }
        let back = self.last_run.map(Direction::opposite);
        exits.into_iter().find(|&d| Some(d) != back)
    }
}

impl Controller for ArenaPolicy {
    fn next_command(&mut self, world: &World) -> Command {
        if let Some(dir) = Self::adjacent_target(world) {
            self.last_run = None;
            return Command::Fight(dir);
        }
        if Self::sees_monster(world) {
            return Command::Hold;
        }
        let p = &world.player;
        if p.chp < p.mhp {
            return Command::Rest;
        }
        match self.corridor_direction(world) {
            Some(dir) => {
                self.last_run = Some(dir);
                Command::Run(dir)
            }
            None => Command::Hold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sil_core::SimOptions;
    use sil_core::dungeon::parse_map;

    fn world(rows: &[&str]) -> World {
        let layout = parse_map(rows).unwrap();
        World::from_layout(layout, SimOptions::default(), 5).unwrap().with_builtin_races()
    }

    #[test]
    fn test_fights_an_adjacent_monster() {
        let mut w = world(&["#####", "#.@.#", "#####"]);
        w.place_monster("Snaga", Coord::new(1, 3)).unwrap();
        w.update_monsters();
        assert_eq!(ArenaPolicy::new().next_command(&w), Command::Fight(Direction::East));
    }

    #[test]
    fn test_runs_along_a_corridor() {
        let w = world(&["#######", "#@....#", "#######"]);
        let mut policy = ArenaPolicy::new();
        assert_eq!(policy.next_command(&w), Command::Run(Direction::East));
    }

    #[test]
    fn test_rests_when_hurt() {
        let mut w = world(&["#######", "#@....#", "#######"]);
        w.player.chp = 1;
        assert_eq!(ArenaPolicy::new().next_command(&w), Command::Rest);
    }
}
