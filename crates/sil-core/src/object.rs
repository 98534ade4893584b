//! Items as seen by the combat core
//!
//! The inventory and object generation live elsewhere; combat only needs an
//! item's combat profile (attack, damage dice, evasion, protection dice,
//! weight) and its flags for slays, brands and resistances.

#[cfg(not(feature = "std"))]
use crate::compat::*;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// Broad item category
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
)]
#[repr(u8)]
pub enum ItemKind {
    Arrow,
    Bow,
    #[default]
    Sword,
    Hafted,
    Polearm,
    Digger,
    Shield,
    Helm,
    Crown,
    Boots,
    Gloves,
    Cloak,
    SoftArmour,
    Mail,
    Ring,
    Amulet,
    Light,
    Staff,
    Chest,
    Potion,
    Flask,
    Food,
    Useless,
}

impl ItemKind {
    /// Anything that can deliver a blow or a shot
    pub const fn is_weapon(&self) -> bool {
        matches!(
            self,
            ItemKind::Arrow
                | ItemKind::Bow
                | ItemKind::Sword
                | ItemKind::Hafted
                | ItemKind::Polearm
                | ItemKind::Digger
        )
    }

    /// Worn for protection
    pub const fn is_armour(&self) -> bool {
        matches!(
            self,
            ItemKind::Shield
                | ItemKind::Helm
                | ItemKind::Crown
                | ItemKind::Boots
                | ItemKind::Gloves
                | ItemKind::Cloak
                | ItemKind::SoftArmour
                | ItemKind::Mail
        )
    }

    /// Edged weapons that the song of sharpness improves
    pub const fn is_sharp(&self) -> bool {
        matches!(self, ItemKind::Sword | ItemKind::Polearm | ItemKind::Arrow)
    }

    /// Burns in fire
    pub const fn hates_fire(&self) -> bool {
        matches!(
            self,
            ItemKind::Arrow
                | ItemKind::Bow
                | ItemKind::Hafted
                | ItemKind::Polearm
                | ItemKind::Cloak
                | ItemKind::SoftArmour
                | ItemKind::Staff
                | ItemKind::Chest
                | ItemKind::Food
        )
    }

    /// Shatters in cold
    pub const fn hates_cold(&self) -> bool {
        matches!(self, ItemKind::Potion | ItemKind::Flask)
    }

    /// Corrodes in acid
    pub const fn hates_acid(&self) -> bool {
        self.is_weapon() || self.is_armour() || matches!(self, ItemKind::Staff | ItemKind::Chest)
    }

    /// Destroyed by lightning
    pub const fn hates_elec(&self) -> bool {
        matches!(self, ItemKind::Ring | ItemKind::Amulet)
    }
}

bitflags! {
    /// Slays, brands, resistances and other item properties
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct ItemFlags: u64 {
        const SLAY_WOLF = 1 << 0;
        const SLAY_SPIDER = 1 << 1;
        const SLAY_UNDEAD = 1 << 2;
        const SLAY_RAUKO = 1 << 3;
        const SLAY_ORC = 1 << 4;
        const SLAY_TROLL = 1 << 5;
        const SLAY_DRAGON = 1 << 6;
        const BRAND_ELEC = 1 << 7;
        const BRAND_FIRE = 1 << 8;
        const BRAND_COLD = 1 << 9;
        const BRAND_POIS = 1 << 10;
        /// Ignores half of the target's protection
        const SHARPNESS = 1 << 11;
        /// Ignores all of the target's protection
        const SHARPNESS2 = 1 << 12;
        /// Heals the wielder when it wounds
        const VAMPIRIC = 1 << 13;

        const RES_FIRE = 1 << 16;
        const RES_COLD = 1 << 17;
        const RES_POIS = 1 << 18;
        const RES_FEAR = 1 << 19;
        const RES_BLIND = 1 << 20;
        const RES_CONFU = 1 << 21;
        const RES_STUN = 1 << 22;
        const FREE_ACT = 1 << 23;

        const TWO_HANDED = 1 << 32;
        const HAND_AND_A_HALF = 1 << 33;
        const THROWING = 1 << 34;
        const CURSED = 1 << 35;
        const AGGRAVATE = 1 << 36;
        const COWARDICE = 1 << 37;
        const DANGER = 1 << 38;
    }
}

impl ItemFlags {
    /// Category slays, in the order they are checked
    pub const SLAYS: [ItemFlags; 7] = [
        ItemFlags::SLAY_WOLF,
        ItemFlags::SLAY_SPIDER,
        ItemFlags::SLAY_UNDEAD,
        ItemFlags::SLAY_RAUKO,
        ItemFlags::SLAY_ORC,
        ItemFlags::SLAY_TROLL,
        ItemFlags::SLAY_DRAGON,
    ];

    /// Elemental brands, in the order they are checked
    pub const BRANDS: [ItemFlags; 4] = [
        ItemFlags::BRAND_ELEC,
        ItemFlags::BRAND_FIRE,
        ItemFlags::BRAND_COLD,
        ItemFlags::BRAND_POIS,
    ];
}

// Manual serde impl for ItemFlags
impl Serialize for ItemFlags {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ItemFlags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bits = u64::deserialize(deserializer)?;
        Ok(ItemFlags::from_bits_truncate(bits))
    }
}

/// An item with its combat profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub kind: ItemKind,
    /// Weight in tenths of a pound
    pub weight: i32,
    /// Melee or archery attack modifier
    pub att: i32,
    /// Damage dice
    pub dd: i32,
    pub ds: i32,
    /// Evasion modifier
    pub evn: i32,
    /// Protection dice
    pub pd: i32,
    pub ps: i32,
    /// Magnitude of special properties
    pub pval: i32,
    pub flags: ItemFlags,
    /// Stack size
    pub number: i32,
    /// Has the player learned all of the item's properties
    pub known: bool,
    pub artefact: bool,
    /// The player's note on the item; `!a` asks before attacking with it
    #[serde(default)]
    pub inscription: Option<String>,
}

impl Item {
    /// A plain item of the given kind
    pub fn new(name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            name: name.into(),
            kind,
            weight: 10,
            att: 0,
            dd: 0,
            ds: 0,
            evn: 0,
            pd: 0,
            ps: 0,
            pval: 0,
            flags: ItemFlags::empty(),
            number: 1,
            known: true,
            artefact: false,
            inscription: None,
        }
    }

    /// A melee or missile weapon
    pub fn weapon(name: impl Into<String>, kind: ItemKind, weight: i32, att: i32, dd: i32, ds: i32) -> Self {
        Self {
            weight,
            att,
            dd,
            ds,
            ..Self::new(name, kind)
        }
    }

    /// A piece of armour
    pub fn armour(name: impl Into<String>, kind: ItemKind, weight: i32, evn: i32, pd: i32, ps: i32) -> Self {
        Self {
            weight,
            evn,
            pd,
            ps,
            ..Self::new(name, kind)
        }
    }

    pub fn with_flags(mut self, flags: ItemFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn has(&self, flags: ItemFlags) -> bool {
        self.flags.intersects(flags)
    }

    pub fn inscribed(mut self, note: impl Into<String>) -> Self {
        self.inscription = Some(note.into());
        self
    }

    /// Count of `!a` marks in the inscription, each asking before an attack
    pub fn attack_warnings(&self) -> usize {
        self.inscription.as_deref().map_or(0, |note| note.matches("!a").count())
    }

    /// The digging tool that makes a poor weapon
    pub fn is_shovel(&self) -> bool {
        self.kind == ItemKind::Digger && self.name.to_ascii_lowercase().contains("shovel")
    }

    /// Weight in whole pounds, rounded to nearest
    pub fn pounds(&self) -> i32 {
        (self.weight + 5) / 10
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_weapon_and_armour_are_disjoint() {
        for kind in ItemKind::iter() {
            assert!(!(kind.is_weapon() && kind.is_armour()), "{kind}");
        }
    }

    #[test]
    fn test_constructors() {
        let sword = Item::weapon("Long Sword", ItemKind::Sword, 30, 0, 2, 5)
            .with_flags(ItemFlags::SLAY_ORC | ItemFlags::SHARPNESS);
        assert!(sword.has(ItemFlags::SLAY_ORC));
        assert!(!sword.has(ItemFlags::SLAY_TROLL));
        assert_eq!(sword.pounds(), 3);
        let mail = Item::armour("Mail Corslet", ItemKind::Mail, 150, -1, 1, 6);
        assert_eq!((mail.pd, mail.ps, mail.evn), (1, 6, -1));
        assert_eq!(mail.number, 1);
        assert_eq!(mail.attack_warnings(), 0);
    }

    #[test]
    fn test_inscription_warnings() {
        let sword = Item::weapon("Long Sword", ItemKind::Sword, 30, 0, 2, 5);
        assert_eq!(sword.attack_warnings(), 0);
        assert_eq!(sword.clone().inscribed("!a").attack_warnings(), 1);
        assert_eq!(sword.inscribed("@w1!a!d!a").attack_warnings(), 2);
        assert!(Item::weapon("Shovel", ItemKind::Digger, 60, 0, 1, 4).is_shovel());
        assert!(!Item::weapon("Mattock", ItemKind::Digger, 180, -1, 3, 4).is_shovel());
    }

    #[test]
    fn test_flags_serde() {
        let flags = ItemFlags::BRAND_FIRE | ItemFlags::TWO_HANDED;
        let json = serde_json::to_string(&flags).unwrap_or_default();
        let back: ItemFlags = serde_json::from_str(&json).unwrap_or_default();
        assert_eq!(back, flags);
    }
}
