//! What the player has learned about each race

#[cfg(not(feature = "std"))]
use crate::compat::*;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use super::race::{RaceFlags, RaceTraits, SpellFlags};

/// Knowledge of one race
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceLore {
    /// Killed by the player in this life
    pub pkills: i32,
    /// Killed over all lives
    pub tkills: i32,
    /// Player deaths to this race
    pub deaths: i32,
    pub sights: i32,
    /// Times seen noticing the player
    pub notice: i32,
    /// Times seen failing to notice the player
    pub ignore: i32,
    pub flags: RaceFlags,
    pub traits: RaceTraits,
    pub spells: SpellFlags,
    /// Times each blow has been seen
    pub blows: [u8; 4],
}

/// Lore for every race, keyed by race name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Lore {
    races: HashMap<String, RaceLore>,
}

impl Lore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, race: &str) -> Option<&RaceLore> {
        self.races.get(race)
    }

    pub fn entry(&mut self, race: &str) -> &mut RaceLore {
        self.races.entry(race.to_string()).or_default()
    }

    pub fn pkills(&self, race: &str) -> i32 {
        self.get(race).map(|l| l.pkills).unwrap_or(0)
    }

    /// Sum of player kills over races matching a predicate
    pub fn kills_where(&self, mut pred: impl FnMut(&str) -> bool) -> i32 {
        self.races
            .iter()
            .filter(|(name, _)| pred(name))
            .map(|(_, l)| l.pkills)
            .sum()
    }

    pub fn learn_flags(&mut self, race: &str, flags: RaceFlags) {
        self.entry(race).flags |= flags;
    }

    pub fn learn_traits(&mut self, race: &str, traits: RaceTraits) {
        self.entry(race).traits |= traits;
    }

    pub fn learn_spells(&mut self, race: &str, spells: SpellFlags) {
        self.entry(race).spells |= spells;
    }

    pub fn saw_blow(&mut self, race: &str, blow: usize) {
        if let Some(count) = self.entry(race).blows.get_mut(blow) {
            *count = count.saturating_add(1);
        }
    }
}
