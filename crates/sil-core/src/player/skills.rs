//! Skills, stats and abilities

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::monster::RaceTraits;

/// The eight skills
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
)]
#[repr(u8)]
pub enum Skill {
    #[default]
    Melee = 0,
    Archery = 1,
    Evasion = 2,
    Stealth = 3,
    Perception = 4,
    Will = 5,
    Smithing = 6,
    Song = 7,
}

impl Skill {
    pub const COUNT: usize = 8;

    pub const fn index(self) -> usize {
        self as usize
    }

    /// The stat that feeds this skill
    pub const fn stat(self) -> Stat {
        match self {
            Skill::Melee | Skill::Archery | Skill::Evasion | Skill::Stealth => Stat::Dex,
            Skill::Perception | Skill::Will | Skill::Smithing | Skill::Song => Stat::Gra,
        }
    }
}

/// The four stats
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
)]
#[repr(u8)]
pub enum Stat {
    #[default]
    Str = 0,
    Dex = 1,
    Con = 2,
    Gra = 3,
}

impl Stat {
    pub const COUNT: usize = 4;

    pub const fn index(self) -> usize {
        self as usize
    }
}

bitflags! {
    /// Abilities the character has learned and not switched off.
    /// Each constant is prefixed with the skill it belongs to.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct Abilities: u64 {
        // Melee
        const MEL_POWER = 1 << 0;
        const MEL_FINESSE = 1 << 1;
        const MEL_KNOCK_BACK = 1 << 2;
        const MEL_POLEARMS = 1 << 3;
        const MEL_CHARGE = 1 << 4;
        const MEL_FOLLOW_THROUGH = 1 << 5;
        const MEL_RAPID_ATTACK = 1 << 6;
        const MEL_ZONE_OF_CONTROL = 1 << 7;
        const MEL_CONTROL = 1 << 8;
        const MEL_WHIRLWIND_ATTACK = 1 << 9;
        const MEL_MOMENTUM = 1 << 10;
        const MEL_TWO_WEAPON = 1 << 11;
        const MEL_THROWING = 1 << 12;

        // Archery
        const ARC_ROUT = 1 << 16;
        const ARC_FLETCHERY = 1 << 17;
        const ARC_POINT_BLANK = 1 << 18;
        const ARC_RAPID_FIRE = 1 << 19;
        const ARC_IMPROVED_CRITICALS = 1 << 20;
        const ARC_CRIPPLING = 1 << 21;
        const ARC_DEADLY_HAIL = 1 << 22;

        // Evasion
        const EVN_DODGING = 1 << 24;
        const EVN_BLOCKING = 1 << 25;
        const EVN_PARRY = 1 << 26;
        const EVN_CROWD_FIGHTING = 1 << 27;
        const EVN_LEAPING = 1 << 28;
        const EVN_SPRINTING = 1 << 29;
        const EVN_FLANKING = 1 << 30;
        const EVN_HEAVY_ARMOUR = 1 << 31;
        const EVN_RIPOSTE = 1 << 32;
        const EVN_CONTROLLED_RETREAT = 1 << 33;

        // Stealth
        const STL_DISGUISE = 1 << 36;
        const STL_ASSASSINATION = 1 << 37;
        const STL_CRUEL_BLOW = 1 << 38;
        const STL_EXCHANGE_PLACES = 1 << 39;
        const STL_OPPORTUNIST = 1 << 40;
        const STL_VANISH = 1 << 41;

        // Perception
        const PER_QUICK_STUDY = 1 << 44;
        const PER_FOCUSED_ATTACK = 1 << 45;
        const PER_KEEN_SENSES = 1 << 46;
        const PER_CONCENTRATION = 1 << 47;
        const PER_EYE_FOR_DETAIL = 1 << 48;
        const PER_LISTEN = 1 << 49;
        const PER_MASTER_HUNTER = 1 << 50;
        const PER_BANE = 1 << 51;

        // Will
        const WIL_CURSE_BREAKING = 1 << 54;
        const WIL_STRENGTH_IN_ADVERSITY = 1 << 55;
        const WIL_FORMIDABLE = 1 << 56;
        const WIL_INNER_LIGHT = 1 << 57;
        const WIL_HARDINESS = 1 << 58;
        const WIL_CRITICAL_RESISTANCE = 1 << 59;
        const WIL_POISON_RESISTANCE = 1 << 60;
        const WIL_MAJESTY = 1 << 61;

        // Song
        const SNG_WOVEN_THEMES = 1 << 63;
    }
}

// Manual serde impl for Abilities
impl Serialize for Abilities {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Abilities {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bits = u64::deserialize(deserializer)?;
        Ok(Abilities::from_bits_truncate(bits))
    }
}

/// Kinds of foe a character can specialise against
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
)]
#[repr(u8)]
pub enum Bane {
    #[default]
    Nothing,
    Orc,
    Wolf,
    Spider,
    Troll,
    Wraith,
    Rauko,
    Serpent,
    Dragon,
}

impl Bane {
    /// The race trait that marks a foe of this kind
    pub const fn traits(self) -> RaceTraits {
        match self {
            Bane::Nothing => RaceTraits::empty(),
            Bane::Orc => RaceTraits::ORC,
            Bane::Wolf => RaceTraits::WOLF,
            Bane::Spider => RaceTraits::SPIDER,
            Bane::Troll => RaceTraits::TROLL,
            Bane::Wraith => RaceTraits::UNDEAD,
            Bane::Rauko => RaceTraits::RAUKO,
            Bane::Serpent => RaceTraits::SERPENT,
            Bane::Dragon => RaceTraits::DRAGON,
        }
    }
}

/// The character's people
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
)]
#[repr(u8)]
pub enum PlayerRace {
    #[default]
    Noldor,
    Sindar,
    Naugrim,
    Edain,
}

impl PlayerRace {
    pub const fn is_elf(&self) -> bool {
        matches!(self, PlayerRace::Noldor | PlayerRace::Sindar)
    }
}
