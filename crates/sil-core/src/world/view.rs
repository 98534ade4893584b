//! What the player can see
//!
//! Recomputes light, the player's field of view and which monsters are
//! visible. Light comes from glowing grids, the player's light source and
//! monsters that carry light or darkness with them.

#[cfg(not(feature = "std"))]
use crate::compat::*;

use super::state::World;
use crate::combat::{Actor, skill_check};
use crate::consts::{FLOW_MAX_DIST, MAX_SIGHT};
use crate::dungeon::{CellFlags, Coord, FlowMap, ProjectFlags, distance};
use crate::monster::{MonsterId, RaceFlags};
use crate::player::{Abilities, Skill, Timed};

impl World {
    /// Recompute light, view and monster visibility around the player
    pub fn update_view(&mut self) {
        let origin = self.player.pos;
        self.grid.clear_info_all(CellFlags::VIEW | CellFlags::SEEN | CellFlags::FIRE);

        let coords: Vec<Coord> = self.grid.coords().collect();
        for &c in &coords {
            if distance(origin, c) <= MAX_SIGHT && self.grid.los(origin, c) {
                self.grid.set_info(c, CellFlags::VIEW);
                if self.grid.projectable(origin, c, ProjectFlags::empty()).is_reachable() {
                    self.grid.set_info(c, CellFlags::FIRE);
                }
            }
        }

        self.update_light(&coords);

        let blind = self.player.is(Timed::Blind);
        for &c in &coords {
            if !blind && self.grid.has_info(c, CellFlags::VIEW) && self.grid.light(c) > 0 {
                self.grid.set_info(c, CellFlags::SEEN | CellFlags::MARK);
            }
        }

        self.update_monsters();
    }

    /// Light levels on every grid
    fn update_light(&mut self, coords: &[Coord]) {
        for &c in coords {
            let base = if self.grid.has_info(c, CellFlags::GLOW) { 1 } else { 0 };
            self.grid.set_light(c, base);
        }

        // The player's light
        let origin = self.player.pos;
        let radius = self.player.light_radius;
        let inner = if self.player.has(Abilities::WIL_INNER_LIGHT) { 1 } else { 0 };
        if radius > 0 {
            for &c in coords {
                let d = distance(origin, c);
                if d <= radius && self.grid.has_info(c, CellFlags::VIEW) {
                    let light = self.grid.light(c) + radius + 1 - d + inner;
                    self.grid.set_light(c, light);
                }
            }
        }

        // Monsters carrying light or darkness
        let carriers: Vec<(Coord, i32, bool)> = self
            .monsters
            .iter()
            .filter(|(_, m)| m.race.light != 0 || m.race.has(RaceFlags::GLOW))
            .map(|(_, m)| (m.pos, m.race.light, m.race.has(RaceFlags::GLOW)))
            .collect();
        for (pos, light, glows) in carriers {
            if glows {
                let l = self.grid.light(pos) + 1;
                self.grid.set_light(pos, l);
            }
            let rad = light.abs();
            for &c in coords {
                let d = distance(pos, c);
                if light == 0 || d > rad || !self.grid.has_info(c, CellFlags::VIEW) {
                    continue;
                }
                if !self.grid.los(pos, c) {
                    continue;
                }
                let amount = (rad + 1 - d) * light.signum();
                let l = self.grid.light(c) + amount;
                self.grid.set_light(c, l);
            }
        }
    }

    /// Recompute distance and visibility of every monster
    pub fn update_monsters(&mut self) {
        for id in self.monsters.ids() {
            self.update_monster(id);
        }
    }

    /// Recompute one monster's distance to the player and whether the
    /// player can see it
    pub fn update_monster(&mut self, id: MonsterId) {
        let Some(m) = self.monsters.get(id) else { return };
        let pos = m.pos;
        let d = distance(pos, self.player.pos).min(255);
        let invisible = m.race.has(RaceFlags::INVISIBLE);
        let will = m.skill(Skill::Will);
        let always_seen = m.race.has(RaceFlags::NEVER_MOVE)
            && m.race.has(RaceFlags::MINDLESS)
            && m.encountered;

        let mut visible = d <= MAX_SIGHT
            && !self.player.is(Timed::Blind)
            && self.player_can_see(pos);
        if visible && invisible {
            let keen = if self.player.has(Abilities::PER_KEEN_SENSES) { 1 } else { 0 };
            let perception = self.player.skill(Skill::Perception);
            let difficulty = will + 2 * d - 5 * keen;
            visible = skill_check(self, Actor::Player, perception, difficulty, Actor::Monster(id)) > 0;
        }
        visible |= always_seen;

        let Some(m) = self.monsters.get_mut(id) else { return };
        m.cdis = d;
        let newly_seen = visible && !m.ml;
        m.ml = visible;
        if newly_seen {
            m.encountered = true;
            self.lore.entry(&m.race.name).sights += 1;
            // a monster coming into view stops runs and rests
            self.disturb();
        }
    }

    /// Rebuild the flow of the player's noise and lay fresh scent.
    ///
    /// Monsters who can hear the player again give up on any remembered
    /// destination and follow the sound instead.
    pub fn update_noise(&mut self) {
        self.flows.player_noise = FlowMap::noise(&self.grid, self.player.pos);
        self.grid.lay_scent(self.player.pos);
        for (_, m) in self.monsters.iter_mut() {
            if m.target.is_some() && self.flows.player_noise.dist(m.pos) < FLOW_MAX_DIST {
                m.target = None;
            }
        }
    }
}
