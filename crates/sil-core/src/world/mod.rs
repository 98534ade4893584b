//! World state and the turn loop
//!
//! The [`World`] owns one level and everything on it. The scheduler in
//! this module hands out energy and decides who acts next.

mod errors;
mod options;
mod scheduler;
mod state;
mod view;

pub use errors::SimError;
pub use options::{OptionsError, SimOptions};
pub use scheduler::{SkipReason, TickResult, TurnOutcome};
pub use state::World;

#[cfg(test)]
pub(crate) mod testing {
    use super::{SimOptions, World};
    use crate::dungeon::parse_map;

    /// A small lit room with the player in the middle
    pub fn arena() -> World {
        let layout = parse_map(&[
            "#########",
            "#.......#",
            "#...@...#",
            "#.......#",
            "#########",
        ])
        .expect("arena layout parses");
        World::from_layout(layout, SimOptions::default(), 7)
            .expect("arena has room for the player")
            .with_builtin_races()
    }
}
