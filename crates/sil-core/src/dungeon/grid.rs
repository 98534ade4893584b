//! The level grid: terrain, occupants, floor objects and scent

#[cfg(not(feature = "std"))]
use crate::compat::*;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use super::cell::{Cell, CellFlags, Feature, Occupant};
use super::direction::Coord;
use crate::consts::SMELL_STRENGTH;
use crate::monster::MonsterId;
use crate::object::Item;

/// What every read outside the map sees
static OUTSIDE: Cell = Cell::permanent();

/// Spread of freshly laid scent around the player; `None` is too far
const SCENT_ADJUST: [[Option<i64>; 5]; 5] = [
    [None, Some(2), Some(2), Some(2), None],
    [Some(2), Some(1), Some(1), Some(1), Some(2)],
    [Some(2), Some(1), Some(0), Some(1), Some(2)],
    [Some(2), Some(1), Some(1), Some(1), Some(2)],
    [None, Some(2), Some(2), Some(2), None],
];

/// A rectangular dungeon level
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    height: i32,
    width: i32,
    cells: Vec<Cell>,
    /// Object piles keyed by location
    objects: HashMap<Coord, Vec<Item>>,
    /// Advances once per scent-laying turn
    scent_clock: i64,
}

impl Grid {
    /// A level of solid granite with a permanent rim
    pub fn new(height: i32, width: i32) -> Self {
        let height = height.max(1);
        let width = width.max(1);
        let mut grid = Self {
            height,
            width,
            cells: vec![Cell::with_feat(Feature::Granite); (height * width) as usize],
            objects: HashMap::new(),
            scent_clock: 0,
        };
        for y in 0..height {
            for x in 0..width {
                let c = Coord::new(y, x);
                if !grid.in_bounds_fully(c) {
                    grid.set_feat(c, Feature::Permanent);
                }
            }
        }
        grid
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    /// Inside the map array
    pub fn in_bounds(&self, c: Coord) -> bool {
        c.y >= 0 && c.x >= 0 && c.y < self.height && c.x < self.width
    }

    /// Inside the map and not on its outer rim
    pub fn in_bounds_fully(&self, c: Coord) -> bool {
        c.y > 0 && c.x > 0 && c.y < self.height - 1 && c.x < self.width - 1
    }

    fn index(&self, c: Coord) -> Option<usize> {
        self.in_bounds(c)
            .then(|| (c.y * self.width + c.x) as usize)
    }

    /// The cell at a location; outside the map reads as permanent rock
    pub fn cell(&self, c: Coord) -> &Cell {
        match self.index(c) {
            Some(i) => &self.cells[i],
            None => &OUTSIDE,
        }
    }

    pub fn cell_mut(&mut self, c: Coord) -> Option<&mut Cell> {
        let i = self.index(c)?;
        Some(&mut self.cells[i])
    }

    pub fn feat(&self, c: Coord) -> Feature {
        self.cell(c).feat
    }

    /// Change the terrain of a cell, forgetting it if it was remembered
    pub fn set_feat(&mut self, c: Coord, feat: Feature) {
        if let Some(cell) = self.cell_mut(c) {
            cell.feat = feat;
            if feat.is_trap() {
                cell.info.remove(CellFlags::HIDDEN);
            }
        }
    }

    pub fn is_floor(&self, c: Coord) -> bool {
        self.in_bounds(c) && self.cell(c).is_floor()
    }

    pub fn is_wall(&self, c: Coord) -> bool {
        self.cell(c).is_wall()
    }

    pub fn info(&self, c: Coord) -> CellFlags {
        self.cell(c).info
    }

    pub fn has_info(&self, c: Coord, flags: CellFlags) -> bool {
        self.cell(c).info.intersects(flags)
    }

    pub fn set_info(&mut self, c: Coord, flags: CellFlags) {
        if let Some(cell) = self.cell_mut(c) {
            cell.info.insert(flags);
        }
    }

    pub fn clear_info(&mut self, c: Coord, flags: CellFlags) {
        if let Some(cell) = self.cell_mut(c) {
            cell.info.remove(flags);
        }
    }

    /// Clear a flag everywhere on the level
    pub fn clear_info_all(&mut self, flags: CellFlags) {
        for cell in &mut self.cells {
            cell.info.remove(flags);
        }
    }

    pub fn occupant(&self, c: Coord) -> Occupant {
        self.cell(c).occupant
    }

    pub fn set_occupant(&mut self, c: Coord, occupant: Occupant) {
        if let Some(cell) = self.cell_mut(c) {
            cell.occupant = occupant;
        }
    }

    pub fn monster_at(&self, c: Coord) -> Option<MonsterId> {
        self.occupant(c).monster()
    }

    pub fn player_at(&self, c: Coord) -> bool {
        self.occupant(c) == Occupant::Player
    }

    pub fn light(&self, c: Coord) -> i32 {
        self.cell(c).light
    }

    pub fn set_light(&mut self, c: Coord, light: i32) {
        if let Some(cell) = self.cell_mut(c) {
            cell.light = light;
        }
    }

    /// Is there a trap here that the player knows about?
    pub fn known_trap(&self, c: Coord) -> bool {
        self.feat(c).is_trap() && !self.has_info(c, CellFlags::HIDDEN)
    }

    /// Is there a trap here the player has not found?
    pub fn hidden_trap(&self, c: Coord) -> bool {
        self.feat(c).is_trap() && self.has_info(c, CellFlags::HIDDEN)
    }

    /// Place a trap, optionally hidden from the player
    pub fn place_trap(&mut self, c: Coord, kind: super::cell::TrapKind, hidden: bool) {
        self.set_feat(c, Feature::Trap(kind));
        if hidden {
            self.set_info(c, CellFlags::HIDDEN);
        }
    }

    /// All coordinates of the level, row by row
    pub fn coords(&self) -> impl Iterator<Item = Coord> + use<> {
        let (h, w) = (self.height, self.width);
        (0..h).flat_map(move |y| (0..w).map(move |x| Coord::new(y, x)))
    }

    // Objects

    /// Objects lying on a cell
    pub fn objects_at(&self, c: Coord) -> &[Item] {
        self.objects.get(&c).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn objects_at_mut(&mut self, c: Coord) -> Option<&mut Vec<Item>> {
        self.objects.get_mut(&c)
    }

    pub fn drop_object(&mut self, c: Coord, item: Item) {
        self.objects.entry(c).or_default().push(item);
    }

    /// Remove and return every object on a cell
    pub fn take_objects(&mut self, c: Coord) -> Vec<Item> {
        self.objects.remove(&c).unwrap_or_default()
    }

    /// Remove the object at `index` in a pile
    pub fn remove_object(&mut self, c: Coord, index: usize) -> Option<Item> {
        let pile = self.objects.get_mut(&c)?;
        let item = (index < pile.len()).then(|| pile.remove(index));
        if pile.is_empty() {
            self.objects.remove(&c);
        }
        item
    }

    // Scent

    /// Lay fresh scent around a location. Walls hold no scent and grids
    /// cut off from the centre are skipped.
    pub fn lay_scent(&mut self, center: Coord) {
        self.scent_clock += 1;
        for (i, row) in SCENT_ADJUST.iter().enumerate() {
            for (j, adjust) in row.iter().enumerate() {
                let Some(adjust) = adjust else { continue };
                let c = center.offset(i as i32 - 2, j as i32 - 2);
                if !self.in_bounds(c) || self.is_wall(c) || !self.los(center, c) {
                    continue;
                }
                let stamp = self.scent_clock - adjust;
                if let Some(cell) = self.cell_mut(c) {
                    cell.scent = Some(stamp);
                }
            }
        }
    }

    /// Age of the scent on a cell, or -1 if there is none worth following
    pub fn scent_age(&self, c: Coord) -> i32 {
        if !self.in_bounds(c) {
            return -1;
        }
        match self.cell(c).scent {
            Some(stamp) => {
                let age = self.scent_clock - stamp;
                if age > SMELL_STRENGTH as i64 { -1 } else { age as i32 }
            }
            None => -1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Item, ItemKind};

    #[test]
    fn test_new_grid_has_permanent_rim() {
        let grid = Grid::new(5, 6);
        assert_eq!(grid.feat(Coord::new(0, 3)), Feature::Permanent);
        assert_eq!(grid.feat(Coord::new(4, 5)), Feature::Permanent);
        assert_eq!(grid.feat(Coord::new(2, 2)), Feature::Granite);
        assert!(grid.in_bounds(Coord::new(0, 0)));
        assert!(!grid.in_bounds_fully(Coord::new(0, 0)));
        assert!(grid.in_bounds_fully(Coord::new(1, 1)));
    }

    #[test]
    fn test_out_of_bounds_reads_as_rock() {
        let grid = Grid::new(3, 3);
        let outside = Coord::new(-1, 7);
        assert!(grid.is_wall(outside));
        assert!(!grid.is_floor(outside));
        assert_eq!(grid.occupant(outside), Occupant::Empty);
    }

    #[test]
    fn test_object_piles() {
        let mut grid = Grid::new(5, 5);
        let c = Coord::new(2, 2);
        grid.drop_object(c, Item::new("Arrow", ItemKind::Arrow));
        grid.drop_object(c, Item::new("Flask of oil", ItemKind::Flask));
        assert_eq!(grid.objects_at(c).len(), 2);
        let item = grid.remove_object(c, 0);
        assert_eq!(item.map(|i| i.kind), Some(ItemKind::Arrow));
        assert_eq!(grid.take_objects(c).len(), 1);
        assert!(grid.objects_at(c).is_empty());
    }

    #[test]
    fn test_scent_ages() {
        let mut grid = Grid::from_ascii(&["#######", "#.....#", "#.....#", "#.....#", "#######"])
            .unwrap_or_else(|_| Grid::new(1, 1));
        let centre = Coord::new(2, 3);
        grid.lay_scent(centre);
        assert_eq!(grid.scent_age(centre), 0);
        assert_eq!(grid.scent_age(Coord::new(1, 3)), 1);
        assert_eq!(grid.scent_age(Coord::new(2, 1)), 2);
        // walls hold no scent
        assert_eq!(grid.scent_age(Coord::new(0, 3)), -1);
        for _ in 0..SMELL_STRENGTH + 1 {
            grid.lay_scent(Coord::new(2, 5));
        }
        assert_eq!(grid.scent_age(Coord::new(2, 1)), -1);
    }
}
