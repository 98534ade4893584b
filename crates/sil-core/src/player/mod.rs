//! Player system
//!
//! The player record, skills and abilities, timed conditions, equipment and songs.

mod equipment;
mod skills;
mod song;
mod timed;
mod you;

pub use equipment::Equipment;
pub use skills::{Abilities, Bane, PlayerRace, Skill, Stat};
pub use song::{Song, sing};
pub use timed::{Conditions, Timed};
pub use you::Player;
