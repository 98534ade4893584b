//! The world aggregate
//!
//! One level of the dungeon with everything on it: terrain, flows, the
//! player, the monster list, race templates and lore, the random number
//! stream and the message log. Every component takes `&mut World`, and
//! only one of them holds it at a time.

#[cfg(not(feature = "std"))]
use crate::compat::*;

use alloc::sync::Arc;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::errors::SimError;
use super::options::SimOptions;
use crate::action::RunState;
use crate::combat::{
    Actor, AttackType, make_attack_normal, monster_death, py_attack_aux, skill_check, unasked,
};
use crate::consts::{ACTION_MISC, ALERTNESS_ALERT, MORGOTH_DEPTH};
use crate::dungeon::{CellFlags, Coord, Feature, Flows, Grid, MapLayout, Occupant, distance};
use crate::monster::{
    Lore, Monster, MonsterId, MonsterList, MonsterRace, RaceFlags, RaceTraits, SpellFlags, Stance,
    builtin_races, new_wandering_destination,
};
use crate::player::{Abilities, Player, Song, Timed};
use crate::rng::GameRng;

/// A level in play
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World {
    pub grid: Grid,
    pub flows: Flows,
    pub player: Player,
    pub monsters: MonsterList,
    /// Race templates by name
    races: HashMap<String, Arc<MonsterRace>>,
    pub lore: Lore,
    pub rng: GameRng,
    pub options: SimOptions,
    /// Messages for the player, oldest first
    pub messages: Vec<String>,
    /// Game turns elapsed
    pub turn: u64,
    /// Turns the player has taken
    pub player_turns: u64,
    /// Morgoth's crown is no longer on his head
    pub crown_dropped: bool,
    /// Something happened that should interrupt a repeated action
    pub disturbed: bool,
    /// The run in progress, if the player is running
    pub run: Option<RunState>,
}

impl World {
    /// An empty world on a grid, with the player not yet placed
    pub fn new(grid: Grid, options: SimOptions, seed: u64) -> Self {
        let flows = Flows::new(grid.height(), grid.width());
        let mut player = Player::default();
        player.depth = options.depth;
        player.truce = options.truce;
        player.on_the_run = options.on_the_run;
        Self {
            grid,
            flows,
            player,
            monsters: MonsterList::new(),
            races: HashMap::new(),
            lore: Lore::new(),
            rng: GameRng::new(seed),
            options,
            messages: Vec::new(),
            turn: 0,
            player_turns: 0,
            crown_dropped: false,
            disturbed: false,
            run: None,
        }
    }

    /// A world built from a parsed layout, with the player at its `@`
    pub fn from_layout(layout: MapLayout, options: SimOptions, seed: u64) -> Result<Self, SimError> {
        let mut world = Self::new(layout.grid, options, seed);
        if let Some(start) = layout.player {
            world.place_player(start)?;
        }
        Ok(world)
    }

    /// Register the built-in bestiary
    pub fn with_builtin_races(mut self) -> Self {
        for race in builtin_races() {
            self.add_race(race);
        }
        self
    }

    /// Register a race template, replacing any of the same name
    pub fn add_race(&mut self, race: MonsterRace) -> Arc<MonsterRace> {
        let race = Arc::new(race);
        self.races.insert(race.name.clone(), Arc::clone(&race));
        race
    }

    pub fn race(&self, name: &str) -> Result<Arc<MonsterRace>, SimError> {
        self.races
            .get(name)
            .cloned()
            .ok_or_else(|| SimError::UnknownRace(name.to_string()))
    }

    pub fn races(&self) -> impl Iterator<Item = &Arc<MonsterRace>> {
        self.races.values()
    }

    /// Change a race template in place; living monsters of the race see the change
    pub fn update_race(&mut self, name: &str, change: impl FnOnce(&mut MonsterRace)) {
        let Some(race) = self.races.get_mut(name) else { return };
        change(Arc::make_mut(race));
        let race = Arc::clone(race);
        for (_, m) in self.monsters.iter_mut() {
            if m.race.name == race.name {
                m.race = Arc::clone(&race);
            }
        }
    }

    pub fn monster(&self, id: MonsterId) -> Result<&Monster, SimError> {
        self.monsters.get(id).ok_or(SimError::StaleMonster(id))
    }

    /// Put the player on the map
    pub fn place_player(&mut self, c: Coord) -> Result<(), SimError> {
        if !self.grid.in_bounds_fully(c) {
            return Err(SimError::OutOfBounds(c));
        }
        if !self.grid.occupant(c).is_empty() {
            return Err(SimError::Occupied(c));
        }
        if self.grid.player_at(self.player.pos) {
            self.grid.set_occupant(self.player.pos, Occupant::Empty);
        }
        self.player.pos = c;
        self.grid.set_occupant(c, Occupant::Player);
        self.update_view();
        Ok(())
    }

    /// Create a monster of a named race
    pub fn place_monster(&mut self, name: &str, c: Coord) -> Result<MonsterId, SimError> {
        self.place_monster_with_leader(name, c, None)
    }

    /// Create a monster that wanders with `leader`'s group
    pub fn place_monster_with_leader(
        &mut self,
        name: &str,
        c: Coord,
        leader: Option<MonsterId>,
    ) -> Result<MonsterId, SimError> {
        let race = self.race(name)?;
        if !self.grid.in_bounds_fully(c) {
            return Err(SimError::OutOfBounds(c));
        }
        if !self.grid.occupant(c).is_empty() {
            return Err(SimError::Occupied(c));
        }
        let mut monster = Monster::new(race, c);
        monster.energy = self.rng.rand_int(10);
        let id = self.monsters.insert(monster);
        self.grid.set_occupant(c, Occupant::Monster(id));
        new_wandering_destination(self, id, leader);
        self.update_monster(id);
        debug!(monster = name, at = %c, "placed monster");
        Ok(id)
    }

    /// Remove a monster from the level without ceremony
    pub fn delete_monster(&mut self, id: MonsterId) -> Option<Monster> {
        let monster = self.monsters.remove(id)?;
        if self.grid.monster_at(monster.pos) == Some(id) {
            self.grid.set_occupant(monster.pos, Occupant::Empty);
        }
        self.flows.forget_monster(id);
        if self.player.target == Some(id) {
            self.player.target = None;
        }
        if self.player.last_attack == Some(id) {
            self.player.last_attack = None;
        }
        Some(monster)
    }

    // Messages

    /// Tell the player something
    pub fn message(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        trace!(target: "sil::message", "{msg}");
        self.messages.push(msg);
    }

    /// Drain the message log
    pub fn take_messages(&mut self) -> Vec<String> {
        core::mem::take(&mut self.messages)
    }

    /// Interrupt whatever the player is repeating
    pub fn disturb(&mut self) {
        self.disturbed = true;
        self.player.resting = false;
        self.run = None;
    }

    // Player conditions

    /// Set one of the player's timed conditions, telling them if it starts
    /// or ends
    pub fn set_timed(&mut self, t: Timed, v: i32) -> bool {
        let Some(msg) = self.player.timed.set(t, v) else { return false };
        self.message(msg);
        self.player.calc_bonuses();
        self.disturb();
        true
    }

    /// Add to (or with a negative amount, subtract from) a timed condition
    pub fn inc_timed(&mut self, t: Timed, amount: i32) -> bool {
        let v = self.player.timed(t) + amount;
        self.set_timed(t, v)
    }

    /// Switch the player's main song, dropping any minor theme
    pub fn change_song(&mut self, song: Song) {
        let p = &mut self.player;
        if p.song1 == song {
            return;
        }
        let old = p.song1;
        p.song1 = song;
        p.song2 = Song::Nothing;
        p.song_duration = 0;
        if song == Song::Nothing {
            if old != Song::Nothing {
                self.message("You end your song.");
            }
        } else {
            self.message(format!("You begin the Song of {song}."));
        }
        self.player.calc_bonuses();
    }

    // Checks with the player on one side

    /// The player's skill against a difficulty with no opponent
    pub fn skill_check_player(&mut self, skill: i32, difficulty: i32) -> i32 {
        skill_check(self, Actor::Player, skill, difficulty, Actor::Nothing)
    }

    /// The player's skill against a monster's resistance
    pub fn skill_check_vs_monster(&mut self, skill: i32, difficulty: i32, id: MonsterId) -> i32 {
        skill_check(self, Actor::Player, skill, difficulty, Actor::Monster(id))
    }

    // Lore

    /// Remember race flags, if the player can see the monster
    pub fn learn_flags(&mut self, id: MonsterId, flags: RaceFlags) {
        if let Some(m) = self.monsters.get(id).filter(|m| m.ml) {
            let name = m.race.name.clone();
            self.lore.learn_flags(&name, flags);
        }
    }

    pub fn learn_traits(&mut self, id: MonsterId, traits: RaceTraits) {
        if let Some(m) = self.monsters.get(id).filter(|m| m.ml) {
            let name = m.race.name.clone();
            self.lore.learn_traits(&name, traits);
        }
    }

    pub fn learn_spells(&mut self, id: MonsterId, spells: SpellFlags) {
        if let Some(m) = self.monsters.get(id).filter(|m| m.ml) {
            let name = m.race.name.clone();
            self.lore.learn_spells(&name, spells);
        }
    }

    // Visibility

    /// The player has line of sight to a grid
    pub fn player_has_los(&self, c: Coord) -> bool {
        self.grid.has_info(c, CellFlags::VIEW)
    }

    /// The player can see a grid: in view and lit
    pub fn player_can_see(&self, c: Coord) -> bool {
        self.grid.has_info(c, CellFlags::SEEN)
    }

    /// Description of a monster for messages, "it" when unseen
    pub fn monster_name(&self, id: MonsterId) -> String {
        self.monsters.get(id).map(Monster::desc).unwrap_or_else(|| "it".to_string())
    }

    /// Capitalised [`World::monster_name`]
    pub fn monster_name_cap(&self, id: MonsterId) -> String {
        self.monsters.get(id).map(Monster::desc_cap).unwrap_or_else(|| "It".to_string())
    }

    // Movement

    /// Exchange whatever occupies two grids (either may be empty).
    ///
    /// A monster leaving the player's side may draw a free attack from the
    /// player, and the player stepping away from alert monsters may draw
    /// theirs. If that attack kills or moves the mover, nothing is swapped.
    pub fn monster_swap(&mut self, a: Coord, b: Coord) {
        let first = self.grid.occupant(a);
        let second = self.grid.occupant(b);

        match first {
            Occupant::Monster(id) => {
                self.free_attack_on_monster(id, a, b);
                if !self.monsters.contains(id) || self.grid.occupant(a) != first {
                    return;
                }
                if let Some(m) = self.monsters.get_mut(id) {
                    m.pos = b;
                }
            }
            Occupant::Player => {
                self.free_attacks_on_player(b);
                if self.player.is_dead || self.grid.occupant(a) != first {
                    return;
                }
                self.player.pos = b;
            }
            Occupant::Empty => {}
        }

        match second {
            Occupant::Monster(id) => {
                if let Some(m) = self.monsters.get_mut(id) {
                    m.pos = a;
                    m.previous_action[0] = ACTION_MISC;
                }
            }
            Occupant::Player => self.player.pos = a,
            Occupant::Empty => {}
        }

        self.grid.set_occupant(a, second);
        self.grid.set_occupant(b, first);

        if first == Occupant::Player || second == Occupant::Player {
            self.update_view();
        } else {
            for id in [first.monster(), second.monster()].into_iter().flatten() {
                self.update_monster(id);
            }
        }

        if let Some(id) = first.monster() {
            self.fall_in_chasm(id);
        }
        if let Some(id) = second.monster() {
            self.fall_in_chasm(id);
        }
    }

    /// A monster that cannot fly drops out of the level if it ends up over
    /// a chasm, dying if the fall is enough to kill it
    fn fall_in_chasm(&mut self, id: MonsterId) {
        let Some(m) = self.monsters.get(id) else { return };
        if self.grid.feat(m.pos) != Feature::Chasm || m.race.has(RaceFlags::FLYING) {
            return;
        }
        let (hp, seen, name) = (m.hp, m.ml, m.desc_cap());
        let verb = if m.morale < -200 { "leaps" } else { "topples" };
        debug!(monster = %m.race.name, "monster fell into a chasm");
        if seen {
            self.message(format!("{name} {verb} into the abyss!"));
        }
        let dice = if self.player.depth == MORGOTH_DEPTH - 2 { 3 } else { 6 };
        let dam = self.rng.damroll(dice, 4);
        if hp <= dam {
            monster_death(self, id);
        }
        self.delete_monster(id);
    }

    /// Zone of control and opportunist attacks by the player
    fn free_attack_on_monster(&mut self, id: MonsterId, from: Coord, to: Coord) {
        let Some(m) = self.monsters.get(id) else { return };
        let p = &self.player;
        if !m.ml
            || m.skip_next_turn
            || p.truce
            || p.is(Timed::Confused)
            || p.is(Timed::Afraid)
            || p.is(Timed::Entranced)
            || p.timed(Timed::Stun) > 100
        {
            return;
        }
        if self.options.forgo_attacking_unwary && m.alertness < ALERTNESS_ALERT {
            return;
        }
        let name = m.desc_cap();
        let from_dist = distance(from, p.pos);
        let to_dist = distance(to, p.pos);
        if p.has(Abilities::MEL_ZONE_OF_CONTROL) && from_dist == 1 && to_dist == 1 {
            self.message(format!("{name} moves through your zone of control."));
            py_attack_aux(self, from, AttackType::ZoneOfControl, &mut unasked);
        }
        if self.player.has(Abilities::STL_OPPORTUNIST)
            && from_dist == 1
            && to_dist > 1
            && self.grid.monster_at(from) == Some(id)
        {
            self.message(format!("{name} moves away from you."));
            py_attack_aux(self, from, AttackType::Opportunist, &mut unasked);
        }
    }

    /// Opportunist and zone of control attacks on the player stepping to `to`
    fn free_attacks_on_player(&mut self, to: Coord) {
        let around: Vec<_> = self.player.pos.neighbours().collect();
        for c in around {
            let Some(id) = self.grid.monster_at(c) else { continue };
            let Some(m) = self.monsters.get(id) else { continue };
            if m.alertness < ALERTNESS_ALERT
                || m.confused > 0
                || m.stance == Stance::Fleeing
                || m.skip_next_turn
                || m.skip_this_turn
            {
                continue;
            }
            let name = m.desc_cap();
            let lower = m.desc();
            let dist = distance(m.pos, to);
            if m.race.has(RaceFlags::OPPORTUNIST) && dist > 1 {
                self.message(format!("{name} attacks you as you step away."));
                make_attack_normal(self, id);
                self.learn_flags(id, RaceFlags::OPPORTUNIST);
            }
            let Some(m) = self.monsters.get(id) else { continue };
            if m.race.has(RaceFlags::ZONE_OF_CONTROL) && dist == 1 {
                self.message(format!("You move through {lower}'s zone of control."));
                make_attack_normal(self, id);
                self.learn_flags(id, RaceFlags::ZONE_OF_CONTROL);
            }
            if self.player.is_dead {
                return;
            }
        }
    }
}
