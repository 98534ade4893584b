//! Monster race templates

#[cfg(not(feature = "std"))]
use crate::compat::*;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// Name of the race whose crown can be knocked off
pub const MORGOTH: &str = "Morgoth, Lord of Darkness";

/// The race summoned by the song of oaths
pub const OATHWRAITH: &str = "Oathwraith";

bitflags! {
    /// Behaviour flags of a race
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct RaceFlags: u64 {
        // Generation and grouping
        const UNIQUE = 1 << 0;
        const MALE = 1 << 1;
        const FEMALE = 1 << 2;
        const FRIEND = 1 << 3;
        const FRIENDS = 1 << 4;
        const ESCORT = 1 << 5;
        const ESCORTS = 1 << 6;
        const UNIQUE_FRIEND = 1 << 7;

        // Movement and attacks
        const NEVER_BLOW = 1 << 8;
        const NEVER_MOVE = 1 << 9;
        const HIDDEN_MOVE = 1 << 10;
        const RAND_25 = 1 << 11;
        const RAND_50 = 1 << 12;
        const RES_CRIT = 1 << 13;
        const NO_CRIT = 1 << 14;

        // Intelligence
        const SMART = 1 << 16;
        const MINDLESS = 1 << 17;
        const TERRITORIAL = 1 << 18;
        const SHORT_SIGHTED = 1 << 19;
        const INVISIBLE = 1 << 20;
        const GLOW = 1 << 21;
        const MULTIPLY = 1 << 22;
        const ELFBANE = 1 << 23;

        // Terrain
        const PASS_WALL = 1 << 24;
        const KILL_WALL = 1 << 25;
        const TUNNEL_WALL = 1 << 26;
        const PASS_DOOR = 1 << 27;
        const OPEN_DOOR = 1 << 28;
        const UNLOCK_DOOR = 1 << 29;
        const BASH_DOOR = 1 << 30;
        const FLYING = 1 << 31;

        // Objects and other monsters
        const TAKE_ITEM = 1 << 32;
        const KILL_ITEM = 1 << 33;
        const KILL_BODY = 1 << 34;
        const EXCHANGE_PLACES = 1 << 35;

        // Combat abilities
        const FLANKING = 1 << 40;
        const CLOUD_SURROUND = 1 << 41;
        const ZONE_OF_CONTROL = 1 << 42;
        const OPPORTUNIST = 1 << 43;
        const KNOCK_BACK = 1 << 44;
        const CRUEL_BLOW = 1 << 45;
        const CRIPPLING = 1 << 46;
        const CHARGE = 1 << 47;
        const RIPOSTE = 1 << 48;
        const LOW_MANA_RUN = 1 << 49;

        /// Races that bring company
        const GROUPED = Self::FRIEND.bits() | Self::FRIENDS.bits() | Self::ESCORT.bits()
            | Self::ESCORTS.bits() | Self::UNIQUE_FRIEND.bits();
    }
}

// Manual serde impl for RaceFlags
impl Serialize for RaceFlags {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RaceFlags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bits = u64::deserialize(deserializer)?;
        Ok(RaceFlags::from_bits_truncate(bits))
    }
}

bitflags! {
    /// Kind, resistances and vulnerabilities of a race
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct RaceTraits: u32 {
        const ORC = 1 << 0;
        const TROLL = 1 << 1;
        const SERPENT = 1 << 2;
        const DRAGON = 1 << 3;
        const RAUKO = 1 << 4;
        const SPIDER = 1 << 5;
        const WOLF = 1 << 6;
        const UNDEAD = 1 << 7;
        const STONE = 1 << 8;
        const HURT_LITE = 1 << 10;
        const HURT_FIRE = 1 << 11;
        const HURT_COLD = 1 << 12;
        const RES_FIRE = 1 << 13;
        const RES_COLD = 1 << 14;
        const RES_POIS = 1 << 15;
        const RES_ELEC = 1 << 16;
        const NO_FEAR = 1 << 20;
        const NO_CONF = 1 << 21;
        const NO_SLEEP = 1 << 22;
        const NO_SLOW = 1 << 23;
        const NO_STUN = 1 << 24;
    }
}

// Manual serde impl for RaceTraits
impl Serialize for RaceTraits {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RaceTraits {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bits = u32::deserialize(deserializer)?;
        Ok(RaceTraits::from_bits_truncate(bits))
    }
}

bitflags! {
    /// Ranged attacks, breaths and songs
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct SpellFlags: u32 {
        const ARROW1 = 1 << 0;
        const ARROW2 = 1 << 1;
        const BOULDER = 1 << 2;
        const BRTH_FIRE = 1 << 3;
        const BRTH_COLD = 1 << 4;
        const BRTH_POIS = 1 << 5;
        const BRTH_DARK = 1 << 6;
        const SHRIEK = 1 << 7;
        const SCREECH = 1 << 8;
        const DARKNESS = 1 << 9;
        const SCARE = 1 << 10;
        const CONF = 1 << 11;
        const HOLD = 1 << 12;
        const SLOW = 1 << 13;
        const SNG_BINDING = 1 << 16;
        const SNG_PIERCING = 1 << 17;
        const SNG_OATHS = 1 << 18;

        const ARCHERY = Self::ARROW1.bits() | Self::ARROW2.bits() | Self::BOULDER.bits();
        const BREATH = Self::BRTH_FIRE.bits() | Self::BRTH_COLD.bits() | Self::BRTH_POIS.bits()
            | Self::BRTH_DARK.bits();
        const SONGS = Self::SNG_BINDING.bits() | Self::SNG_PIERCING.bits() | Self::SNG_OATHS.bits();
    }
}

// Manual serde impl for SpellFlags
impl Serialize for SpellFlags {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SpellFlags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bits = u32::deserialize(deserializer)?;
        Ok(SpellFlags::from_bits_truncate(bits))
    }
}

/// How a blow is delivered
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
)]
#[repr(u8)]
pub enum BlowMethod {
    #[default]
    Hit,
    Touch,
    Claw,
    Bite,
    Peck,
    Sting,
    Crush,
    Engulf,
    Crawl,
    Thorn,
    Spore,
    Whip,
}

impl BlowMethod {
    /// Verb used in the hit message, whether the blow can cut and whether it can stun
    pub const fn describe(self) -> (&'static str, bool, bool) {
        match self {
            BlowMethod::Hit => ("hits you", true, true),
            BlowMethod::Touch => ("touches you", false, false),
            BlowMethod::Claw => ("claws you", true, false),
            BlowMethod::Bite => ("bites you", true, false),
            BlowMethod::Peck => ("pecks you", true, false),
            BlowMethod::Sting => ("stings you", false, false),
            BlowMethod::Crush => ("crushes you", false, true),
            BlowMethod::Engulf => ("engulfs you", false, false),
            BlowMethod::Crawl => ("crawls on you", false, false),
            BlowMethod::Thorn => ("tears at you", false, false),
            BlowMethod::Spore => ("releases a cloud of spores", false, false),
            BlowMethod::Whip => ("whips you", false, false),
        }
    }

    /// Blows whose misses the player notices
    pub const fn can_miss_visibly(self) -> bool {
        matches!(
            self,
            BlowMethod::Hit
                | BlowMethod::Touch
                | BlowMethod::Claw
                | BlowMethod::Bite
                | BlowMethod::Peck
                | BlowMethod::Sting
                | BlowMethod::Whip
                | BlowMethod::Crush
        )
    }

    /// Touches and spores ignore armour and never land critical hits
    pub const fn ignores_armour(self) -> bool {
        matches!(self, BlowMethod::Touch | BlowMethod::Spore)
    }
}

/// What a blow does on a hit
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
)]
#[repr(u8)]
pub enum BlowEffect {
    #[default]
    Hurt,
    Wound,
    Batter,
    Shatter,
    Poison,
    Fire,
    Cold,
    Dark,
    Acid,
    Elec,
    Blind,
    Confuse,
    Terrify,
    Entrance,
    Slow,
    LoseStr,
    LoseDex,
    LoseCon,
    LoseGra,
    Hallu,
}

/// One entry of a race's blow table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Blow {
    pub method: BlowMethod,
    pub effect: BlowEffect,
    pub att: i32,
    pub dd: i32,
    pub ds: i32,
}

impl Blow {
    pub const fn new(method: BlowMethod, effect: BlowEffect, att: i32, dd: i32, ds: i32) -> Self {
        Self { method, effect, att, dd, ds }
    }
}

/// Immutable description of a kind of monster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonsterRace {
    pub name: String,
    /// Map symbol
    pub d_char: char,
    /// Native depth
    pub level: i32,
    pub rarity: i32,
    /// Hit dice; hit points are `hdice * hside` on average
    pub hdice: i32,
    pub hside: i32,
    pub evn: i32,
    /// Protection dice
    pub pd: i32,
    pub ps: i32,
    pub speed: i32,
    /// Light carried (positive) or darkness spread (negative)
    pub light: i32,
    /// Starting alertness, as a sleep depth
    pub sleep: i32,
    pub per: i32,
    pub stl: i32,
    pub wil: i32,
    /// Percentage chance of using a ranged attack when able
    pub freq_ranged: i32,
    pub spell_power: i32,
    pub mana: i32,
    pub flags: RaceFlags,
    pub traits: RaceTraits,
    pub spells: SpellFlags,
    pub blows: Vec<Blow>,
}

impl Default for MonsterRace {
    fn default() -> Self {
        Self::new("monster", 'p')
    }
}

impl MonsterRace {
    /// A level-one race with a single weak blow
    pub fn new(name: impl Into<String>, d_char: char) -> Self {
        Self {
            name: name.into(),
            d_char,
            level: 1,
            rarity: 1,
            hdice: 3,
            hside: 4,
            evn: 1,
            pd: 0,
            ps: 0,
            speed: 2,
            light: 0,
            sleep: 10,
            per: 2,
            stl: 2,
            wil: 0,
            freq_ranged: 0,
            spell_power: 0,
            mana: 0,
            flags: RaceFlags::empty(),
            traits: RaceTraits::empty(),
            spells: SpellFlags::empty(),
            blows: vec![Blow::new(BlowMethod::Hit, BlowEffect::Hurt, 1, 1, 4)],
        }
    }

    pub fn has(&self, flags: RaceFlags) -> bool {
        self.flags.intersects(flags)
    }

    pub fn is(&self, traits: RaceTraits) -> bool {
        self.traits.intersects(traits)
    }

    pub fn is_smart(&self) -> bool {
        self.has(RaceFlags::SMART)
    }

    pub fn is_mindless(&self) -> bool {
        self.has(RaceFlags::MINDLESS)
    }

    pub fn is_unique(&self) -> bool {
        self.has(RaceFlags::UNIQUE)
    }

    pub fn is_morgoth(&self) -> bool {
        self.name == MORGOTH
    }

    /// Undead and stone creatures are destroyed rather than slain
    pub fn is_nonliving(&self) -> bool {
        self.is(RaceTraits::UNDEAD | RaceTraits::STONE)
    }

    /// Races that judge one another as kin
    pub fn similar(&self, other: &MonsterRace) -> bool {
        self.d_char == other.d_char
            || (self.is(RaceTraits::DRAGON) && other.is(RaceTraits::DRAGON))
            || (self.is(RaceTraits::SERPENT) && other.is(RaceTraits::SERPENT))
    }

    /// Average hit points
    pub fn avg_hp(&self) -> i32 {
        self.hdice * (self.hside + 1) / 2
    }

    /// Whether the race's gender pronoun is "he", "she" or "it"
    pub fn pronoun(&self) -> &'static str {
        if self.has(RaceFlags::MALE) {
            "he"
        } else if self.has(RaceFlags::FEMALE) {
            "she"
        } else {
            "it"
        }
    }

    pub fn possessive(&self) -> &'static str {
        if self.has(RaceFlags::MALE) {
            "his"
        } else if self.has(RaceFlags::FEMALE) {
            "her"
        } else {
            "its"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_similar_races() {
        let mut orc = MonsterRace::new("Cave orc", 'o');
        orc.traits = RaceTraits::ORC;
        let snaga = MonsterRace::new("Snaga", 'o');
        let mut drake = MonsterRace::new("Fire-drake", 'd');
        drake.traits = RaceTraits::DRAGON;
        let mut worm = MonsterRace::new("Cold-drake", 'D');
        worm.traits = RaceTraits::DRAGON;
        assert!(orc.similar(&snaga));
        assert!(drake.similar(&worm));
        assert!(!orc.similar(&drake));
    }

    #[test]
    fn test_group_mask() {
        assert!(RaceFlags::GROUPED.contains(RaceFlags::ESCORTS));
        assert!(!RaceFlags::GROUPED.contains(RaceFlags::SMART));
        assert!(SpellFlags::ARCHERY.contains(SpellFlags::BOULDER));
        assert!(!SpellFlags::BREATH.intersects(SpellFlags::SONGS));
    }

    #[test]
    fn test_flags_roundtrip_through_bits() {
        let flags = RaceFlags::SMART | RaceFlags::RIPOSTE;
        let json = serde_json::to_string(&flags).unwrap();
        let back: RaceFlags = serde_json::from_str(&json).unwrap();
        assert_eq!(back, flags);
    }
}
