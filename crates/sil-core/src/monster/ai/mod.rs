//! Monster AI
//!
//! A turn is driven from [`process_monster`]. Below it, the layers go
//! from strategy to terrain: `tactics` picks a destination, `advance`,
//! `retreat` and `wander` supply the candidates, `movement` turns a
//! destination into one step and `passable` says which grids a monster
//! can get into at all.

mod advance;
mod movement;
mod passable;
mod process;
mod range;
mod ranged;
mod retreat;
mod song;
mod tactics;
mod wander;

pub use advance::get_move_advance;
pub use movement::{Step, get_route_to_target, make_move};
pub use passable::{Passage, cave_exist_mon, cave_passable_mon, monster_flow, update_monster_flow};
pub use process::{
    has_sleeping_kin, monster_exchange_places, multiply_monster, process_monster, process_move,
    tell_allies,
};
pub use range::{find_range, monster_can_smell};
pub use ranged::{choose_ranged_attack, make_attack_ranged, shriek};
pub(crate) use ranged::monster_noise;
pub use retreat::{find_safety, get_move_retreat};
pub use song::{song_of_binding, song_of_oaths, song_of_piercing};
pub use tactics::{MoveIntent, calc_hesitance, calc_vulnerability, get_move};
pub use wander::{get_move_wander, new_wandering_destination, new_wandering_flow, wander};
