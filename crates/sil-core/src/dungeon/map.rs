//! ASCII level layouts
//!
//! Levels come from the external generator; for tests and the arena a plain
//! text layout is enough. Every row must have the same width. Terrain uses
//! [`Feature::symbol`], `@` marks the player's start and the digits `1`-`9`
//! mark numbered spawn points. Both of those stand on lit floor.

#[cfg(not(feature = "std"))]
use crate::compat::*;

use super::cell::{CellFlags, Feature};
use super::direction::Coord;
use super::grid::Grid;
use crate::world::SimError;

/// A parsed layout
#[derive(Debug, Clone)]
pub struct MapLayout {
    pub grid: Grid,
    /// Where `@` was drawn
    pub player: Option<Coord>,
    /// Numbered spawn points in reading order
    pub spawns: Vec<(u8, Coord)>,
}

/// Parse a text layout into a grid
pub fn parse_map<S: AsRef<str>>(lines: &[S]) -> Result<MapLayout, SimError> {
    let height = lines.len() as i32;
    let width = lines
        .first()
        .map(|l| l.as_ref().chars().count() as i32)
        .ok_or(SimError::EmptyMap)?;
    if width == 0 {
        return Err(SimError::EmptyMap);
    }

    let mut grid = Grid::new(height, width);
    let mut player = None;
    let mut spawns = Vec::new();

    for (y, line) in lines.iter().enumerate() {
        let line = line.as_ref();
        if line.chars().count() as i32 != width {
            return Err(SimError::MapParse {
                line: y + 1,
                reason: format!("expected {width} columns"),
            });
        }
        for (x, ch) in line.chars().enumerate() {
            let c = Coord::new(y as i32, x as i32);
            let feat = match ch {
                '@' => {
                    player = Some(c);
                    Feature::Floor
                }
                '1'..='9' => {
                    spawns.push((ch as u8 - b'0', c));
                    Feature::Floor
                }
                _ => Feature::from_symbol(ch).ok_or_else(|| SimError::MapParse {
                    line: y + 1,
                    reason: format!("unknown terrain '{ch}'"),
                })?,
            };
            grid.set_feat(c, feat);
            if feat.is_floor() {
                grid.set_info(c, CellFlags::GLOW | CellFlags::ROOM);
            }
        }
    }

    // walls bordering a lit room are lit with it
    let walls: Vec<Coord> = grid
        .coords()
        .filter(|&c| {
            grid.is_wall(c)
                && c.neighbours().any(|n| grid.in_bounds(n) && grid.has_info(n, CellFlags::ROOM))
        })
        .collect();
    for c in walls {
        grid.set_info(c, CellFlags::GLOW);
    }

    Ok(MapLayout {
        grid,
        player,
        spawns,
    })
}

impl Grid {
    /// Build a grid from a text layout, ignoring start markers
    pub fn from_ascii<S: AsRef<str>>(lines: &[S]) -> Result<Grid, SimError> {
        parse_map(lines).map(|layout| layout.grid)
    }

    /// Render the terrain as text
    pub fn to_ascii(&self) -> Vec<String> {
        (0..self.height())
            .map(|y| {
                (0..self.width())
                    .map(|x| self.feat(Coord::new(y, x)).symbol())
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_markers() {
        let layout = parse_map(&["#####", "#@.1#", "#2+.#", "#####"]);
        let layout = layout.expect("valid layout");
        assert_eq!(layout.player, Some(Coord::new(1, 1)));
        assert_eq!(layout.spawns, vec![(1, Coord::new(1, 3)), (2, Coord::new(2, 1))]);
        assert_eq!(layout.grid.feat(Coord::new(2, 2)), Feature::Door { lock: 0 });
        assert!(layout.grid.has_info(Coord::new(1, 2), CellFlags::GLOW));
        assert!(layout.grid.has_info(Coord::new(0, 0), CellFlags::GLOW));
        assert!(!layout.grid.has_info(Coord::new(0, 0), CellFlags::ROOM));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = parse_map(&["###", "#.", "###"]);
        assert!(matches!(err, Err(SimError::MapParse { line: 2, .. })));
    }

    #[test]
    fn test_unknown_terrain_rejected() {
        assert!(matches!(parse_map(&["#Q#"]), Err(SimError::MapParse { line: 1, .. })));
        let empty: [&str; 0] = [];
        assert!(matches!(parse_map(&empty), Err(SimError::EmptyMap)));
    }

    #[test]
    fn test_ascii_roundtrip() {
        let rows = ["#####", "#.:'#", "#<%>#", "#####"];
        let grid = Grid::from_ascii(&rows).expect("valid layout");
        assert_eq!(grid.to_ascii(), rows.map(String::from).to_vec());
    }
}
