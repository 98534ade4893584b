//! Dungeon system
//!
//! Contains the level grid, terrain, paths and line of sight, and flows.

mod cell;
mod direction;
mod flow;
mod grid;
mod map;
mod path;

pub use cell::{Cell, CellFlags, Feature, Occupant, TrapKind};
pub use direction::{
    Coord, DDD, Direction, distance, distance_squared, rough_direction, scramble_direction,
};
pub use flow::{FlowMap, Flows, WanderFlow};
pub use grid::Grid;
pub use map::{MapLayout, parse_map};
pub use path::{ProjectFlags, ProjectPath, Projectable};
