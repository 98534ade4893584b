//! Monster system
//!
//! Race templates and their lore, monster instances in a generational
//! list, alertness and morale, and the per-turn AI.

pub mod ai;
mod alertness;
mod list;
mod lore;
mod monst;
mod morale;
mod race;
mod races;

pub use ai::{new_wandering_destination, new_wandering_flow, process_monster};
pub use alertness::{IRON_CROWN, drop_iron_crown, make_alert, set_alertness};
pub use list::MonsterList;
pub use lore::{Lore, RaceLore};
pub use monst::{Monster, MonsterFlags, MonsterId, MonsterSong, Stance};
pub use morale::{
    MORALE_AGGRESSIVE, calc_morale, calc_stance, morale_from_friends, produce_cloud, recover_monster,
    stance_for,
};
pub use race::{
    Blow, BlowEffect, BlowMethod, MORGOTH, MonsterRace, OATHWRAITH, RaceFlags, RaceTraits,
    SpellFlags,
};
pub use races::builtin_races;
