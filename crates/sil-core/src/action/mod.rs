//! Player commands
//!
//! A [`Controller`] stands in for the keyboard: each player turn it is
//! asked for a [`Command`], and for yes/no answers when a move needs
//! confirming. [`execute`] carries the command out and reports whether it
//! used the turn.

#[cfg(not(feature = "std"))]
use crate::compat::*;

use serde::{Deserialize, Serialize};

mod movement;
mod running;
mod search;
mod trap;

pub use movement::{break_free_of_web, climbable, continue_leap, move_player, walk, walk_test};
pub use running::{RunState, run_init, run_step, run_test};
pub use search::{perceive, search, search_square};
pub use trap::{check_hit, hit_trap, reveal_trap};

use crate::combat::{AttackType, py_attack};
use crate::consts::ACTION_MISC;
use crate::dungeon::Direction;
use crate::player::{Song, Timed};
use crate::world::World;

/// Something the player can do with a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Step, attack or open a door in a direction
    Move(Direction),
    /// Run until something interesting happens
    Run(Direction),
    /// Rest until disturbed
    Rest,
    /// Stay in place for a turn, watching
    Hold,
    Search,
    /// Attack in a direction without moving
    Fight(Direction),
    /// Change the main song
    Sing(Song),
}

/// What came of a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionResult {
    /// The command used the turn
    Success,
    /// Nothing happened and no time passed
    NoTime,
    /// The player declined to confirm
    Cancelled,
    /// The command could not be done, with the reason for the player
    Failed(String),
    Died(String),
}

impl ActionResult {
    pub fn takes_time(&self) -> bool {
        matches!(self, ActionResult::Success)
    }
}

/// Source of player decisions
pub trait Controller {
    /// The command for this turn
    fn next_command(&mut self, world: &World) -> Command;

    /// Answer a yes/no question. Cautious by default.
    fn confirm(&mut self, _question: &str) -> bool {
        false
    }
}

impl<F: FnMut(&World) -> Command> Controller for F {
    fn next_command(&mut self, world: &World) -> Command {
        self(world)
    }
}

/// Stand still for a turn. Doing nothing is quiet and gives a good look
/// around.
fn hold(world: &mut World) -> ActionResult {
    let p = &mut world.player;
    p.previous_action[0] = Direction::Here.keypad();
    p.focused = true;
    p.stealth_score += if p.stealth_mode { 2 } else { 7 };
    search(world);
    ActionResult::Success
}

fn rest(world: &mut World) -> ActionResult {
    let p = &mut world.player;
    p.previous_action[0] = Direction::Here.keypad();
    p.focused = true;
    p.resting = true;
    p.stealth_mode = false;
    search(world);
    ActionResult::Success
}

/// Time passes for an attack unless the player thought better of it
/// before striking anything this turn
pub(crate) fn attack_outcome(world: &World, struck: bool) -> ActionResult {
    if struck || world.player.attacked {
        ActionResult::Success
    } else {
        ActionResult::NoTime
    }
}

fn fight(world: &mut World, dir: Direction, confirm: &mut dyn FnMut(&str) -> bool) -> ActionResult {
    let target = world.player.pos.step(dir);
    if !world.grid.in_bounds(target) || world.grid.monster_at(target).is_none() {
        return ActionResult::Failed("You see nothing there to attack.".to_string());
    }
    let struck = py_attack(world, target, AttackType::Main, confirm);
    attack_outcome(world, struck)
}

fn sing(world: &mut World, song: Song) -> ActionResult {
    if !world.player.knows_song(song) {
        return ActionResult::Failed(format!("You do not know the Song of {song}."));
    }
    world.change_song(song);
    world.player.previous_action[0] = ACTION_MISC;
    ActionResult::Success
}

/// Carry out a command. `confirm` answers any question the command asks.
pub fn execute(world: &mut World, command: Command, confirm: &mut dyn FnMut(&str) -> bool) -> ActionResult {
    if world.player.is_dead {
        return ActionResult::Died(world.player.died_from.clone());
    }
    match command {
        Command::Move(Direction::Here) | Command::Hold => hold(world),
        Command::Move(dir) => walk(world, dir, confirm),
        Command::Run(_) if world.player.is(Timed::Confused) => {
            ActionResult::Failed("You are too confused!".to_string())
        }
        Command::Run(Direction::Here) | Command::Rest => rest(world),
        Command::Run(dir) => {
            let to = world.player.pos.step(dir);
            match walk_test(world, to) {
                Ok(()) => run_step(world, Some(dir), confirm),
                Err(msg) => ActionResult::Failed(msg),
            }
        }
        Command::Search => {
            world.player.previous_action[0] = ACTION_MISC;
            search(world);
            ActionResult::Success
        }
        Command::Fight(dir) => fight(world, dir, confirm),
        Command::Sing(song) => sing(world, song),
    }
}
