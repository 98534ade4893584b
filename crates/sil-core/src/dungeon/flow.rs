//! Flow fields
//!
//! A flow is a grid of distances from a centre, built by a bounded
//! breadth-first relaxation in which each step may carry an extra cost
//! (doors muffle sound, walls take time to dig). Distances saturate at
//! [`FLOW_MAX_DIST`], which means "unreachable".
//!
//! The level keeps a flow for the player's noise, one for the last monster
//! that made a noise, one pathing flow per alert monster, and a small pool
//! of wandering flows shared by groups of unwary monsters.

#[cfg(not(feature = "std"))]
use crate::compat::*;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use super::direction::{Coord, DDD};
use super::grid::Grid;
use crate::consts::{FLOW_MAX_DIST, MAX_WANDER_FLOWS};
use crate::monster::MonsterId;

/// Distances from a single centre
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowMap {
    center: Coord,
    height: i32,
    width: i32,
    cost: Vec<u16>,
}

impl FlowMap {
    /// A flow in which nothing is reachable
    pub fn unreachable(height: i32, width: i32) -> Self {
        Self {
            center: Coord::default(),
            height,
            width,
            cost: vec![FLOW_MAX_DIST as u16; (height.max(0) * width.max(0)) as usize],
        }
    }

    /// Build a flow out from `center`.
    ///
    /// `step` is asked about every grid the flow tries to enter and returns
    /// the extra cost of entering it, or `None` if it cannot be entered.
    /// A grid whose cost is above the current level stays in the queue
    /// until the level catches up, so expensive grids are expanded late.
    pub fn build(grid: &Grid, center: Coord, mut step: impl FnMut(Coord) -> Option<i32>) -> Self {
        let mut flow = Self::unreachable(grid.height(), grid.width());
        flow.center = center;
        if !grid.in_bounds(center) {
            return flow;
        }
        flow.set(center, 0);

        let mut current = vec![center];
        for cost in 1..=FLOW_MAX_DIST {
            if current.is_empty() {
                break;
            }
            let mut next = Vec::with_capacity(current.len() * 2);
            for c in current.drain(..) {
                if flow.dist(c) >= cost {
                    next.push(c);
                    continue;
                }
                for d in DDD {
                    let n = c.step(d);
                    if !grid.in_bounds(n) || flow.dist(n) < FLOW_MAX_DIST {
                        continue;
                    }
                    let Some(extra) = step(n) else { continue };
                    flow.set(n, (cost + extra).min(FLOW_MAX_DIST));
                    next.push(n);
                }
            }
            current = next;
        }
        flow
    }

    /// How sound spreads: solid rock stops it and closed doors muffle it
    pub fn noise(grid: &Grid, center: Coord) -> Self {
        Self::build(grid, center, |c| {
            let feat = grid.feat(c);
            if feat.is_closed_door() {
                Some(5)
            } else if feat.is_wall() {
                None
            } else {
                Some(0)
            }
        })
    }

    pub fn center(&self) -> Coord {
        self.center
    }

    fn index(&self, c: Coord) -> Option<usize> {
        (c.y >= 0 && c.x >= 0 && c.y < self.height && c.x < self.width)
            .then(|| (c.y * self.width + c.x) as usize)
    }

    /// Distance of a grid from the centre; unreachable outside the map
    pub fn dist(&self, c: Coord) -> i32 {
        self.index(c)
            .map(|i| self.cost[i] as i32)
            .unwrap_or(FLOW_MAX_DIST)
    }

    fn set(&mut self, c: Coord, dist: i32) {
        if let Some(i) = self.index(c) {
            self.cost[i] = dist.clamp(0, FLOW_MAX_DIST) as u16;
        }
    }

    /// Grids reached by the flow
    pub fn reached(&self) -> impl Iterator<Item = Coord> + '_ {
        let w = self.width;
        self.cost
            .iter()
            .enumerate()
            .filter(|&(_, &d)| (d as i32) < FLOW_MAX_DIST)
            .map(move |(i, _)| Coord::new(i as i32 / w, i as i32 % w))
    }
}

/// A shared destination for a wandering group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WanderFlow {
    pub map: FlowMap,
    /// Turns left to idle at the destination before choosing another
    pub pause: i32,
}

/// All flows on the level
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flows {
    /// Distance of every grid from the player's last noise
    pub player_noise: FlowMap,
    /// Distance from the last monster that made a noise (shouts, shrieks)
    pub monster_noise: FlowMap,
    /// Per-monster routes to the player, accounting for what they can pass
    pathing: HashMap<MonsterId, FlowMap>,
    /// Wandering destinations by index
    wander: Vec<Option<WanderFlow>>,
}

impl Flows {
    pub fn new(height: i32, width: i32) -> Self {
        Self {
            player_noise: FlowMap::unreachable(height, width),
            monster_noise: FlowMap::unreachable(height, width),
            pathing: HashMap::new(),
            wander: vec![None; MAX_WANDER_FLOWS],
        }
    }

    /// A monster's distance to the player along its own route.
    /// Monsters without a route fall back to the player's noise flow.
    pub fn monster_dist(&self, id: MonsterId, c: Coord) -> i32 {
        match self.pathing.get(&id) {
            Some(flow) => flow.dist(c),
            None => self.player_noise.dist(c),
        }
    }

    pub fn pathing(&self, id: MonsterId) -> Option<&FlowMap> {
        self.pathing.get(&id)
    }

    pub fn set_pathing(&mut self, id: MonsterId, flow: FlowMap) {
        self.pathing.insert(id, flow);
    }

    pub fn forget_monster(&mut self, id: MonsterId) {
        self.pathing.remove(&id);
    }

    pub fn wander(&self, idx: usize) -> Option<&WanderFlow> {
        self.wander.get(idx).and_then(Option::as_ref)
    }

    pub fn wander_mut(&mut self, idx: usize) -> Option<&mut WanderFlow> {
        self.wander.get_mut(idx).and_then(Option::as_mut)
    }

    /// Replace the flow for a wandering index, resetting its pause
    pub fn set_wander(&mut self, idx: usize, map: FlowMap) {
        if let Some(slot) = self.wander.get_mut(idx) {
            *slot = Some(WanderFlow { map, pause: 0 });
        }
    }

    /// Distance to a wandering destination; unreachable for unknown indices
    pub fn wander_dist(&self, idx: usize, c: Coord) -> i32 {
        self.wander(idx)
            .map(|w| w.map.dist(c))
            .unwrap_or(FLOW_MAX_DIST)
    }

    /// Number of wandering slots
    pub fn wander_capacity(&self) -> usize {
        self.wander.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corridor() -> Grid {
        Grid::from_ascii(&[
            "##########",
            "#....+...#",
            "##########",
        ])
        .expect("valid layout")
    }

    #[test]
    fn test_noise_flow_counts_steps() {
        let grid = corridor();
        let flow = FlowMap::noise(&grid, Coord::new(1, 1));
        assert_eq!(flow.dist(Coord::new(1, 1)), 0);
        assert_eq!(flow.dist(Coord::new(1, 4)), 3);
        // the door muffles sound by five
        assert_eq!(flow.dist(Coord::new(1, 5)), 9);
        assert_eq!(flow.dist(Coord::new(1, 6)), 10);
        // rock is never reached
        assert_eq!(flow.dist(Coord::new(0, 3)), FLOW_MAX_DIST);
    }

    #[test]
    fn test_blocked_step_is_unreachable() {
        let grid = corridor();
        let flow = FlowMap::build(&grid, Coord::new(1, 1), |c| {
            (!grid.feat(c).is_wall()).then_some(0)
        });
        assert_eq!(flow.dist(Coord::new(1, 4)), 3);
        assert_eq!(flow.dist(Coord::new(1, 6)), FLOW_MAX_DIST);
    }

    #[test]
    fn test_flow_outside_map_is_unreachable() {
        let grid = corridor();
        let flow = FlowMap::noise(&grid, Coord::new(1, 1));
        assert_eq!(flow.dist(Coord::new(-4, 2)), FLOW_MAX_DIST);
        assert!(flow.reached().all(|c| grid.in_bounds(c)));
    }

    #[test]
    fn test_monster_dist_falls_back_to_noise() {
        let grid = corridor();
        let mut flows = Flows::new(grid.height(), grid.width());
        flows.player_noise = FlowMap::noise(&grid, Coord::new(1, 8));
        let id = MonsterId::new(3, 0);
        assert_eq!(flows.monster_dist(id, Coord::new(1, 7)), 1);
        flows.set_pathing(id, FlowMap::unreachable(grid.height(), grid.width()));
        assert_eq!(flows.monster_dist(id, Coord::new(1, 7)), FLOW_MAX_DIST);
        flows.forget_monster(id);
        assert_eq!(flows.monster_dist(id, Coord::new(1, 7)), 1);
    }

    #[test]
    fn test_wander_slots() {
        let grid = corridor();
        let mut flows = Flows::new(grid.height(), grid.width());
        assert!(flows.wander(0).is_none());
        flows.set_wander(2, FlowMap::noise(&grid, Coord::new(1, 2)));
        assert_eq!(flows.wander_dist(2, Coord::new(1, 3)), 1);
        assert_eq!(flows.wander_dist(99, Coord::new(1, 3)), FLOW_MAX_DIST);
    }
}
