//! Projection paths and line of sight
//!
//! Paths step one grid at a time along the major axis of the line between
//! two grid centres. Line of sight uses the same tracing and accepts a line
//! traced from either end, which makes it symmetric and lets a knight's-move
//! glance past one blocked corner.

#[cfg(not(feature = "std"))]
use crate::compat::*;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::direction::{Coord, distance};
use super::grid::Grid;

bitflags! {
    /// Projection behaviour
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct ProjectFlags: u32 {
        /// Start at the target instead of travelling there
        const JUMP = 0x0001;
        /// Affect every grid along the path
        const BEAM = 0x0002;
        /// Explode at the end of the path
        const BOOM = 0x0004;
        /// Affect terrain
        const GRID = 0x0008;
        /// Affect objects
        const ITEM = 0x0010;
        /// Affect monsters
        const KILL = 0x0020;
        /// Affect the player
        const PLAY = 0x0040;
        /// Stop at the first creature
        const STOP = 0x0080;
        /// Note (without stopping) creatures in the way
        const CHCK = 0x0100;
        /// Continue past the target
        const THRU = 0x0200;
        /// Pass through walls
        const PASS = 0x0400;
        /// Affect walls next to the blast area
        const WALL = 0x0800;
        /// Blast shaped as an arc
        const ARC = 0x1000;
        /// Blast shaped as a starburst
        const STAR = 0x2000;
        /// No visuals
        const HIDE = 0x4000;
    }
}

// Manual serde impl for ProjectFlags
impl Serialize for ProjectFlags {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ProjectFlags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bits = u32::deserialize(deserializer)?;
        Ok(ProjectFlags::from_bits_truncate(bits))
    }
}

/// Result of tracing a projection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectPath {
    /// Grids entered, excluding the origin
    pub grids: Vec<Coord>,
    /// A creature stood in the way (only noted with `CHCK`)
    pub blocked: bool,
}

impl ProjectPath {
    pub fn last(&self) -> Option<Coord> {
        self.grids.last().copied()
    }
}

/// How well a projection reaches its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Projectable {
    /// The target cannot be reached
    #[default]
    No,
    /// Reachable, but something may be in the way
    NotClear,
    /// Reachable with nothing in the way
    Clear,
}

impl Projectable {
    pub const fn is_reachable(&self) -> bool {
        !matches!(self, Projectable::No)
    }
}

/// `num / den` rounded half away from zero (`den > 0`)
fn round_div(num: i32, den: i32) -> i32 {
    let q = (2 * num.abs() + den) / (2 * den);
    q * num.signum()
}

/// The grid `k` steps along the line from `from` towards `to`
fn line_point(from: Coord, to: Coord, k: i32) -> Coord {
    let dy = to.y - from.y;
    let dx = to.x - from.x;
    let n = dy.abs().max(dx.abs()).max(1);
    Coord::new(from.y + round_div(dy * k, n), from.x + round_div(dx * k, n))
}

impl Grid {
    /// Trace the path of a projection from `from` towards `to`.
    ///
    /// The origin is never part of the path. The path ends at the target
    /// (unless `THRU`), at the first wall (which is included, unless `PASS`),
    /// at the first creature when `STOP` is set, at the edge of the map, or
    /// once it is further than `range` from the origin.
    pub fn project_path(
        &self,
        from: Coord,
        to: Coord,
        range: i32,
        flags: ProjectFlags,
    ) -> ProjectPath {
        let mut path = ProjectPath::default();
        if from == to {
            return path;
        }

        let mut k = 1;
        loop {
            let c = line_point(from, to, k);
            if !self.in_bounds(c) || distance(from, c) > range {
                break;
            }
            path.grids.push(c);

            if c == to && !flags.contains(ProjectFlags::THRU) {
                break;
            }
            if !flags.contains(ProjectFlags::PASS) && self.is_wall(c) {
                break;
            }
            if c != to && !self.occupant(c).is_empty() {
                if flags.contains(ProjectFlags::STOP) {
                    break;
                }
                if flags.contains(ProjectFlags::CHCK) {
                    path.blocked = true;
                }
            }
            k += 1;
        }
        path
    }

    fn los_one_way(&self, from: Coord, to: Coord) -> bool {
        let n = (to.y - from.y).abs().max((to.x - from.x).abs());
        (1..n).all(|k| !self.is_wall(line_point(from, to, k)))
    }

    /// Line of sight between two grid centres, ignoring the endpoints
    pub fn los(&self, a: Coord, b: Coord) -> bool {
        if a == b || a.is_adjacent(b) {
            return true;
        }
        self.los_one_way(a, b) || self.los_one_way(b, a)
    }

    /// Can a bolt from `from` arrive at `to`?
    ///
    /// No grid is projectable from itself, and the target must be floor.
    /// `Clear` is only promised when `STOP` or `CHCK` was asked for and no
    /// creature was in the way.
    pub fn projectable(&self, from: Coord, to: Coord, flags: ProjectFlags) -> Projectable {
        let path = self.project_path(from, to, crate::consts::MAX_RANGE, flags);
        match path.last() {
            Some(end) if end == to && self.is_floor(end) => {
                if flags.intersects(ProjectFlags::STOP | ProjectFlags::CHCK) && !path.blocked {
                    Projectable::Clear
                } else {
                    Projectable::NotClear
                }
            }
            _ => Projectable::No,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dungeon::{Feature, Occupant};
    use crate::monster::MonsterId;

    fn open_room() -> Grid {
        Grid::from_ascii(&[
            "###########",
            "#.........#",
            "#.........#",
            "#....#....#",
            "#.........#",
            "###########",
        ])
        .unwrap_or_else(|_| Grid::new(1, 1))
    }

    #[test]
    fn test_path_straight_line() {
        let grid = open_room();
        let path = grid.project_path(Coord::new(1, 1), Coord::new(1, 5), 20, ProjectFlags::empty());
        assert_eq!(path.grids.len(), 4);
        assert_eq!(path.last(), Some(Coord::new(1, 5)));
    }

    #[test]
    fn test_path_stops_at_wall() {
        let grid = open_room();
        let path = grid.project_path(Coord::new(3, 2), Coord::new(3, 8), 20, ProjectFlags::empty());
        assert_eq!(path.last(), Some(Coord::new(3, 5)));
        let pass = grid.project_path(Coord::new(3, 2), Coord::new(3, 8), 20, ProjectFlags::PASS);
        assert_eq!(pass.last(), Some(Coord::new(3, 8)));
    }

    #[test]
    fn test_path_thru_and_range() {
        let grid = open_room();
        let path = grid.project_path(Coord::new(1, 1), Coord::new(1, 3), 4, ProjectFlags::THRU);
        assert_eq!(path.last(), Some(Coord::new(1, 5)));
    }

    #[test]
    fn test_los_blocked_by_pillar() {
        let grid = open_room();
        assert!(!grid.los(Coord::new(3, 3), Coord::new(3, 7)));
        assert!(grid.los(Coord::new(1, 1), Coord::new(4, 9)));
        assert!(grid.los(Coord::new(3, 4), Coord::new(3, 6)) == grid.los(Coord::new(3, 6), Coord::new(3, 4)));
    }

    #[test]
    fn test_projectable_clear_and_blocked() {
        let mut grid = open_room();
        let from = Coord::new(1, 1);
        let to = Coord::new(1, 8);
        let flags = ProjectFlags::STOP;
        assert_eq!(grid.projectable(from, to, flags), Projectable::Clear);
        assert_eq!(grid.projectable(from, to, ProjectFlags::empty()), Projectable::NotClear);

        grid.set_occupant(Coord::new(1, 4), Occupant::Monster(MonsterId::new(1, 0)));
        assert_eq!(grid.projectable(from, to, ProjectFlags::STOP), Projectable::No);
        assert_eq!(grid.projectable(from, to, ProjectFlags::CHCK), Projectable::NotClear);

        grid.set_feat(to, Feature::Rubble);
        assert_eq!(grid.projectable(from, to, ProjectFlags::empty()), Projectable::No);
        assert_eq!(grid.projectable(from, from, ProjectFlags::empty()), Projectable::No);
    }
}
