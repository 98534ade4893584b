//! Monster instances

#[cfg(not(feature = "std"))]
use crate::compat::*;

use alloc::sync::Arc;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use super::race::MonsterRace;
use crate::consts::{ACTION_MAX, ACTION_MISC, ALERTNESS_MAX, ALERTNESS_MIN};
use crate::dungeon::Coord;
use crate::object::Item;
use crate::player::{Skill, Stat};

/// Handle to a monster slot, checked against the slot's generation so
/// that handles to dead monsters never reach the monster that replaced them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonsterId {
    index: u32,
    generation: u32,
}

impl MonsterId {
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub const fn index(self) -> usize {
        self.index as usize
    }

    pub const fn generation(self) -> u32 {
        self.generation
    }
}

/// Combat posture
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
)]
#[repr(u8)]
pub enum Stance {
    Fleeing = 0,
    #[default]
    Confident = 1,
    Aggressive = 2,
}

/// Song a monster is singing
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
)]
#[repr(u8)]
pub enum MonsterSong {
    #[default]
    Nothing,
    Binding,
    Piercing,
    Oaths,
}

bitflags! {
    /// Per-turn monster state
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct MonsterFlags: u16 {
        /// Acting with full tactical logic this turn
        const ACTIVE = 0x0001;
        const HIT_BY_RANGED = 0x0002;
        const HIT_BY_MELEE = 0x0004;
        /// Charged on its last attack
        const CHARGED = 0x0008;
        /// Pushed past by another monster
        const PUSHED = 0x0010;
        /// Angered: confident becomes aggressive
        const AGGRESSIVE = 0x0020;
        /// Uses a ranged attack on its next chance
        const ALWAYS_CAST = 0x0040;
        /// Called up by a song; fades once the singing stops
        const SUMMONED = 0x0080;
    }
}

// Manual serde impl for MonsterFlags
impl Serialize for MonsterFlags {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MonsterFlags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bits = u16::deserialize(deserializer)?;
        Ok(MonsterFlags::from_bits_truncate(bits))
    }
}

/// A monster on the level
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Monster {
    pub race: Arc<MonsterRace>,
    pub pos: Coord,

    pub hp: i32,
    pub maxhp: i32,
    pub mana: i32,
    pub energy: i32,

    // Timed conditions
    pub stunned: i32,
    pub confused: i32,
    pub hasted: i32,
    pub slowed: i32,

    pub alertness: i32,
    pub morale: i32,
    /// Decays by a tenth each turn
    pub tmp_morale: i32,
    pub stance: Stance,

    /// Preferred distance from the player; 0 means recompute
    pub min_range: i32,
    pub best_range: i32,

    /// Remembered place to head for
    pub target: Option<Coord>,
    /// Slot in the wandering flow pool
    pub wandering_idx: Option<usize>,
    /// Distance at which the monster is content with its destination
    pub wandering_dist: i32,

    /// Most recent first: keypad directions or `ACTION_MISC`
    pub previous_action: [u8; ACTION_MAX],
    pub flags: MonsterFlags,
    pub song: MonsterSong,

    pub skip_next_turn: bool,
    /// Held by the song of mastery; no free attacks until its next turn
    pub skip_this_turn: bool,

    /// Visible to the player
    pub ml: bool,
    /// Distance to the player
    pub cdis: i32,
    pub encountered: bool,

    /// Objects picked up
    pub held: Vec<Item>,
}

impl Monster {
    /// A new monster with average hit points, asleep to the depth of its race
    pub fn new(race: Arc<MonsterRace>, pos: Coord) -> Self {
        let hp = race.avg_hp().max(1);
        let mana = race.mana;
        let alertness = (-race.sleep).clamp(ALERTNESS_MIN, ALERTNESS_MAX);
        Self {
            race,
            pos,
            hp,
            maxhp: hp,
            mana,
            energy: 0,
            stunned: 0,
            confused: 0,
            hasted: 0,
            slowed: 0,
            alertness,
            morale: 0,
            tmp_morale: 0,
            stance: Stance::Confident,
            min_range: 0,
            best_range: 0,
            target: None,
            wandering_idx: None,
            wandering_dist: 0,
            previous_action: [ACTION_MISC; ACTION_MAX],
            flags: MonsterFlags::empty(),
            song: MonsterSong::Nothing,
            skip_next_turn: false,
            skip_this_turn: false,
            ml: false,
            cdis: 0,
            encountered: false,
            held: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.race.name
    }

    /// "the cave orc", or the bare name for uniques
    pub fn desc(&self) -> String {
        if !self.ml {
            "it".to_string()
        } else if self.race.is_unique() {
            self.race.name.clone()
        } else {
            format!("the {}", self.race.name)
        }
    }

    /// [`Monster::desc`] with a leading capital
    pub fn desc_cap(&self) -> String {
        let desc = self.desc();
        let mut chars = desc.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => desc,
        }
    }

    /// "a cave orc", as the player's cause of death; seen or not
    pub fn killer_desc(&self) -> String {
        let name = &self.race.name;
        if self.race.is_unique() {
            name.clone()
        } else if name.starts_with(['a', 'e', 'i', 'o', 'u', 'A', 'E', 'I', 'O', 'U']) {
            format!("an {name}")
        } else {
            format!("a {name}")
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Speed after haste and slowing
    pub fn speed(&self) -> i32 {
        let mut speed = self.race.speed;
        if self.hasted > 0 {
            speed += 1;
        }
        if self.slowed > 0 {
            speed -= 1;
        }
        speed.max(0)
    }

    /// Skill score; only stealth, perception and will are meaningful
    pub fn skill(&self, skill: Skill) -> i32 {
        let base = match skill {
            Skill::Stealth => self.race.stl,
            Skill::Perception => self.race.per,
            Skill::Will => self.race.wil,
            _ => 0,
        };
        if self.stunned > 0 { base - 2 } else { base }
    }

    /// Stat equivalents used when monsters contest strength or constitution
    pub fn stat(&self, stat: Stat) -> i32 {
        match stat {
            Stat::Str => {
                let dd = self.race.blows.first().map(|b| b.dd).unwrap_or(0);
                dd * 2 + self.race.hdice / 10 - 4
            }
            Stat::Con => {
                let mut stat = 0;
                let mut base = 20;
                if self.maxhp < base {
                    while self.maxhp < base && stat > -20 {
                        stat -= 1;
                        base = base * 10 / 12;
                    }
                } else {
                    stat -= 1;
                    while self.maxhp >= base && stat < 30 {
                        stat += 1;
                        base = base * 12 / 10;
                    }
                }
                stat
            }
            _ => 0,
        }
    }

    /// Record an action, pushing the oldest out of the history
    pub fn push_action(&mut self, action: u8) {
        self.previous_action.rotate_right(1);
        self.previous_action[0] = action;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monster::{Blow, BlowEffect, BlowMethod, RaceFlags};

    fn orc() -> Monster {
        let mut race = MonsterRace::new("Cave orc", 'o');
        race.hdice = 11;
        race.hside = 10;
        race.wil = 3;
        race.blows = vec![Blow::new(BlowMethod::Hit, BlowEffect::Hurt, 7, 1, 10)];
        Monster::new(Arc::new(race), Coord::new(3, 3))
    }

    #[test]
    fn test_new_monster_sleeps_to_its_race_depth() {
        let m = orc();
        assert_eq!(m.alertness, -10);
        assert_eq!(m.hp, 60);
        assert_eq!(m.hp, m.maxhp);
    }

    #[test]
    fn test_stunned_skills() {
        let mut m = orc();
        assert_eq!(m.skill(Skill::Will), 3);
        m.stunned = 2;
        assert_eq!(m.skill(Skill::Will), 1);
        assert_eq!(m.skill(Skill::Melee), -2);
    }

    #[test]
    fn test_monster_stats() {
        let mut m = orc();
        assert_eq!(m.stat(Stat::Str), 2 + 1 - 4);
        m.maxhp = 20;
        assert_eq!(m.stat(Stat::Con), 0);
        m.maxhp = 24;
        assert_eq!(m.stat(Stat::Con), 1);
        m.maxhp = 19;
        assert_eq!(m.stat(Stat::Con), -1);
    }

    #[test]
    fn test_names() {
        let mut m = orc();
        assert_eq!(m.desc(), "it");
        m.ml = true;
        assert_eq!(m.desc_cap(), "The Cave orc");
        let mut race = (*m.race).clone();
        race.flags |= RaceFlags::UNIQUE;
        race.name = "Grishnakh".into();
        m.race = Arc::new(race);
        assert_eq!(m.desc(), "Grishnakh");
    }

    #[test]
    fn test_speed() {
        let mut m = orc();
        m.hasted = 3;
        assert_eq!(m.speed(), 3);
        m.slowed = 2;
        assert_eq!(m.speed(), 2);
    }
}
