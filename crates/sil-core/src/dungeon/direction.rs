//! Grid coordinates, keypad directions and distance metrics

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// A grid location (row, column)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Coord {
    pub y: i32,
    pub x: i32,
}

impl Coord {
    pub const fn new(y: i32, x: i32) -> Self {
        Self { y, x }
    }

    /// The neighbouring grid in a direction
    pub const fn step(self, dir: Direction) -> Self {
        Self {
            y: self.y + dir.dy(),
            x: self.x + dir.dx(),
        }
    }

    pub const fn offset(self, dy: i32, dx: i32) -> Self {
        Self {
            y: self.y + dy,
            x: self.x + dx,
        }
    }

    /// True if the two grids touch (including diagonally) and differ
    pub fn is_adjacent(self, other: Coord) -> bool {
        self != other && (self.y - other.y).abs() <= 1 && (self.x - other.x).abs() <= 1
    }

    /// The eight surrounding grids, orthogonals first
    pub fn neighbours(self) -> impl Iterator<Item = Coord> {
        DDD.into_iter().map(move |d| self.step(d))
    }
}

impl core::fmt::Display for Coord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.y, self.x)
    }
}

/// Keypad direction. `Here` (5) means "stay put".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
)]
#[repr(u8)]
pub enum Direction {
    SouthWest = 1,
    South = 2,
    SouthEast = 3,
    West = 4,
    #[default]
    Here = 5,
    East = 6,
    NorthWest = 7,
    North = 8,
    NorthEast = 9,
}

/// The eight real directions, orthogonals first then diagonals
pub const DDD: [Direction; 8] = [
    Direction::South,
    Direction::North,
    Direction::East,
    Direction::West,
    Direction::SouthEast,
    Direction::NorthWest,
    Direction::NorthEast,
    Direction::SouthWest,
];

/// Directions in ring order starting south-west
const RING: [Direction; 8] = [
    Direction::SouthWest,
    Direction::South,
    Direction::SouthEast,
    Direction::East,
    Direction::NorthEast,
    Direction::North,
    Direction::NorthWest,
    Direction::West,
];

/// Preferred alternatives for each direction when the straight move is blocked.
/// Rows 0-9 bias to the right, rows 10-19 to the left.
const SIDE_DIRS: [[u8; 8]; 20] = [
    [0, 0, 0, 0, 0, 0, 0, 0],
    [1, 4, 2, 7, 3, 8, 6, 9],
    [2, 1, 3, 4, 6, 7, 9, 8],
    [3, 2, 6, 1, 9, 4, 8, 7],
    [4, 7, 1, 8, 2, 9, 3, 6],
    [5, 5, 5, 5, 5, 5, 5, 5],
    [6, 3, 9, 2, 8, 1, 7, 4],
    [7, 8, 4, 9, 1, 6, 2, 3],
    [8, 9, 7, 6, 4, 3, 1, 2],
    [9, 6, 8, 3, 7, 2, 4, 1],
    [0, 0, 0, 0, 0, 0, 0, 0],
    [1, 2, 4, 3, 7, 6, 8, 9],
    [2, 3, 1, 6, 4, 9, 7, 8],
    [3, 6, 2, 9, 1, 8, 4, 7],
    [4, 1, 7, 2, 8, 3, 9, 6],
    [5, 5, 5, 5, 5, 5, 5, 5],
    [6, 9, 3, 8, 2, 7, 1, 4],
    [7, 4, 8, 1, 9, 2, 6, 3],
    [8, 7, 9, 4, 6, 1, 3, 2],
    [9, 8, 6, 7, 3, 4, 2, 1],
];

impl Direction {
    /// Build from a keypad digit
    pub const fn from_keypad(key: u8) -> Option<Self> {
        match key {
            1 => Some(Self::SouthWest),
            2 => Some(Self::South),
            3 => Some(Self::SouthEast),
            4 => Some(Self::West),
            5 => Some(Self::Here),
            6 => Some(Self::East),
            7 => Some(Self::NorthWest),
            8 => Some(Self::North),
            9 => Some(Self::NorthEast),
            _ => None,
        }
    }

    pub const fn keypad(self) -> u8 {
        self as u8
    }

    pub const fn dy(self) -> i32 {
        match self {
            Self::SouthWest | Self::South | Self::SouthEast => 1,
            Self::West | Self::Here | Self::East => 0,
            Self::NorthWest | Self::North | Self::NorthEast => -1,
        }
    }

    pub const fn dx(self) -> i32 {
        match self {
            Self::SouthWest | Self::West | Self::NorthWest => -1,
            Self::South | Self::Here | Self::North => 0,
            Self::SouthEast | Self::East | Self::NorthEast => 1,
        }
    }

    pub const fn is_diagonal(self) -> bool {
        self.dy() != 0 && self.dx() != 0
    }

    /// Direction of a unit step; each component is clamped to -1..=1
    pub fn from_delta(dy: i32, dx: i32) -> Self {
        match (dy.signum(), dx.signum()) {
            (1, -1) => Self::SouthWest,
            (1, 0) => Self::South,
            (1, 1) => Self::SouthEast,
            (0, -1) => Self::West,
            (0, 1) => Self::East,
            (-1, -1) => Self::NorthWest,
            (-1, 0) => Self::North,
            (-1, 1) => Self::NorthEast,
            _ => Self::Here,
        }
    }

    pub const fn opposite(self) -> Self {
        match self {
            Self::SouthWest => Self::NorthEast,
            Self::South => Self::North,
            Self::SouthEast => Self::NorthWest,
            Self::West => Self::East,
            Self::Here => Self::Here,
            Self::East => Self::West,
            Self::NorthWest => Self::SouthEast,
            Self::North => Self::South,
            Self::NorthEast => Self::SouthWest,
        }
    }

    fn ring_index(self) -> Option<usize> {
        RING.iter().position(|&d| d == self)
    }

    /// Rotate by `steps` eighth-turns (positive is counter-clockwise on screen)
    pub fn rotate(self, steps: i32) -> Self {
        match self.ring_index() {
            Some(i) => RING[(i as i32 + steps).rem_euclid(8) as usize],
            None => self,
        }
    }

    /// Alternatives to this direction, best first, biased left or right
    pub fn side_dirs(self, bias_left: bool) -> [Direction; 8] {
        let row = self.keypad() as usize + if bias_left { 10 } else { 0 };
        SIDE_DIRS[row].map(|k| Direction::from_keypad(k).unwrap_or(Direction::Here))
    }
}

/// Scramble an intended direction for a confused mover.
///
/// `roll` is the difference of two `3d2` rolls, giving a binomial spread
/// around the intended direction (out of 64: 20 straight, 15 one step
/// either side, 6 two steps, 1 three steps). `Here` is never scrambled.
pub fn scramble_direction(intended: Direction, roll: i32) -> Direction {
    intended.rotate(roll)
}

/// Approximate distance: the longer axis plus half the shorter one
pub fn distance(a: Coord, b: Coord) -> i32 {
    let ay = (a.y - b.y).abs();
    let ax = (a.x - b.x).abs();
    if ay > ax { ay + (ax >> 1) } else { ax + (ay >> 1) }
}

/// Squared euclidean distance, for fine-grained ordering
pub fn distance_squared(a: Coord, b: Coord) -> i32 {
    let ay = (a.y - b.y).abs();
    let ax = (a.x - b.x).abs();
    ay * ay + ax * ax
}

/// The overall direction from one grid to another, preferring orthogonals
/// when one axis dominates by a factor of two
pub fn rough_direction(from: Coord, to: Coord) -> Direction {
    let deltay = to.y - from.y;
    let deltax = to.x - from.x;
    let mut dy = deltay.signum();
    let mut dx = deltax.signum();
    if deltax != 0 && deltay.abs() / deltax.abs() >= 2 {
        dx = 0;
    }
    if deltay != 0 && deltax.abs() / deltay.abs() >= 2 {
        dy = 0;
    }
    Direction::from_delta(dy, dx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_direction_deltas_roundtrip() {
        for dir in Direction::iter() {
            assert_eq!(Direction::from_delta(dir.dy(), dir.dx()), dir);
            assert_eq!(Direction::from_keypad(dir.keypad()), Some(dir));
        }
    }

    #[test]
    fn test_rotate_wraps() {
        assert_eq!(Direction::North.rotate(1), Direction::NorthWest);
        assert_eq!(Direction::North.rotate(-1), Direction::NorthEast);
        assert_eq!(Direction::West.rotate(1), Direction::SouthWest);
        assert_eq!(Direction::South.rotate(8), Direction::South);
        assert_eq!(Direction::Here.rotate(3), Direction::Here);
    }

    #[test]
    fn test_scramble_zero_roll_keeps_direction() {
        for dir in DDD {
            assert_eq!(scramble_direction(dir, 0), dir);
        }
    }

    #[test]
    fn test_scramble_is_symmetric() {
        let dir = Direction::East;
        let left = scramble_direction(dir, 2);
        let right = scramble_direction(dir, -2);
        assert_eq!(left, Direction::North);
        assert_eq!(right, Direction::South);
    }

    #[test]
    fn test_side_dirs_start_with_self() {
        for dir in DDD {
            assert_eq!(dir.side_dirs(false)[0], dir);
            assert_eq!(dir.side_dirs(true)[0], dir);
            // the last fallback is always straight back
            assert_eq!(dir.side_dirs(false)[7], dir.opposite());
        }
    }

    #[test]
    fn test_distance() {
        let o = Coord::new(0, 0);
        assert_eq!(distance(o, Coord::new(0, 5)), 5);
        assert_eq!(distance(o, Coord::new(4, 4)), 6);
        assert_eq!(distance(o, Coord::new(-3, 1)), 3);
        assert_eq!(distance_squared(o, Coord::new(3, 4)), 25);
    }

    #[test]
    fn test_rough_direction() {
        let o = Coord::new(10, 10);
        assert_eq!(rough_direction(o, Coord::new(10, 15)), Direction::East);
        assert_eq!(rough_direction(o, Coord::new(5, 6)), Direction::NorthWest);
        assert_eq!(rough_direction(o, Coord::new(2, 9)), Direction::North);
        assert_eq!(rough_direction(o, o), Direction::Here);
    }

    proptest! {
        #[test]
        fn prop_scramble_stays_a_real_direction(key in 1u8..=9, roll in -3i32..=3) {
            let dir = Direction::from_keypad(key).unwrap_or_default();
            prop_assume!(dir != Direction::Here);
            let out = scramble_direction(dir, roll);
            prop_assert_ne!(out, Direction::Here);
            prop_assert_eq!(scramble_direction(out, -roll), dir);
        }

        #[test]
        fn prop_distance_symmetric(ay in -50i32..50, ax in -50i32..50, by in -50i32..50, bx in -50i32..50) {
            let a = Coord::new(ay, ax);
            let b = Coord::new(by, bx);
            prop_assert_eq!(distance(a, b), distance(b, a));
            prop_assert!(distance(a, b) >= 0);
        }
    }
}
