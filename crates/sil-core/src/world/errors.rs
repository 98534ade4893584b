//! Errors surfaced at the simulation's API seams
//!
//! Failures inside a turn never reach the caller: a monster whose move is
//! impossible simply does nothing. These errors cover setting a world up.

#[cfg(not(feature = "std"))]
use crate::compat::*;

use thiserror::Error;

use crate::dungeon::Coord;
use crate::monster::MonsterId;

/// Errors building or addressing a world
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    #[error("map has no rows")]
    EmptyMap,

    #[error("map line {line}: {reason}")]
    MapParse { line: usize, reason: String },

    #[error("unknown monster race '{0}'")]
    UnknownRace(String),

    #[error("{0} is outside the map")]
    OutOfBounds(Coord),

    #[error("{0} is already occupied")]
    Occupied(Coord),

    #[error("monster {0:?} no longer exists")]
    StaleMonster(MonsterId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = SimError::MapParse { line: 3, reason: "unknown symbol 'Q'".into() };
        assert_eq!(err.to_string(), "map line 3: unknown symbol 'Q'");
        assert_eq!(SimError::Occupied(Coord::new(2, 5)).to_string(), "(2, 5) is already occupied");
    }
}
