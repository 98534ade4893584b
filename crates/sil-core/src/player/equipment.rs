//! Worn and wielded items

#[cfg(not(feature = "std"))]
use crate::compat::*;

use serde::{Deserialize, Serialize};

use crate::object::{Item, ItemFlags, ItemKind};

/// Equipment slots that matter in combat
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    pub weapon: Option<Item>,
    /// A shield or a second weapon
    pub off_hand: Option<Item>,
    pub bow: Option<Item>,
    pub quiver: Option<Item>,
    pub light: Option<Item>,
    /// Body armour, cloak, helm, gloves, boots, rings and amulet
    pub worn: Vec<Item>,
}

impl Equipment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every equipped item
    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.weapon
            .iter()
            .chain(self.off_hand.iter())
            .chain(self.bow.iter())
            .chain(self.quiver.iter())
            .chain(self.light.iter())
            .chain(self.worn.iter())
    }

    /// Union of all flags on equipped items
    pub fn flags(&self) -> ItemFlags {
        self.iter().fold(ItemFlags::empty(), |acc, item| acc | item.flags)
    }

    /// Number of equipped items carrying any of `flags`
    pub fn count(&self, flags: ItemFlags) -> i32 {
        self.iter().filter(|item| item.has(flags)).count() as i32
    }

    pub fn shield(&self) -> Option<&Item> {
        self.off_hand.as_ref().filter(|i| i.kind == ItemKind::Shield)
    }

    /// A second weapon in the off hand
    pub fn off_hand_weapon(&self) -> Option<&Item> {
        self.off_hand.as_ref().filter(|i| i.kind.is_weapon())
    }

    /// Weight of everything worn or wielded
    pub fn weight(&self) -> i32 {
        self.iter().map(|i| i.weight * i.number.max(1)).sum()
    }

    /// Weight of body armour and the like, which tires the wearer
    pub fn armour_weight(&self) -> i32 {
        self.worn
            .iter()
            .filter(|i| i.kind.is_armour())
            .map(|i| i.weight)
            .sum()
    }

    /// Evasion modifiers of all equipment
    pub fn evasion(&self) -> i32 {
        self.iter().map(|i| i.evn).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shield_and_off_hand_weapon() {
        let mut eq = Equipment::new();
        eq.off_hand = Some(Item::armour("Leather Shield", ItemKind::Shield, 60, 1, 1, 4));
        assert!(eq.shield().is_some());
        assert!(eq.off_hand_weapon().is_none());
        eq.off_hand = Some(Item::weapon("Dagger", ItemKind::Sword, 8, 0, 1, 7));
        assert!(eq.shield().is_none());
        assert!(eq.off_hand_weapon().is_some());
    }

    #[test]
    fn test_flags_and_weights() {
        let mut eq = Equipment::new();
        eq.weapon = Some(
            Item::weapon("Spear", ItemKind::Polearm, 50, 0, 1, 9).with_flags(ItemFlags::RES_FIRE),
        );
        eq.worn.push(Item::armour("Robe", ItemKind::SoftArmour, 20, 0, 0, 0).with_flags(ItemFlags::RES_FIRE));
        eq.worn.push(Item::new("Ring of Free Action", ItemKind::Ring).with_flags(ItemFlags::FREE_ACT));
        assert_eq!(eq.count(ItemFlags::RES_FIRE), 2);
        assert!(eq.flags().contains(ItemFlags::FREE_ACT));
        assert_eq!(eq.armour_weight(), 20);
        assert_eq!(eq.weight(), 80);
    }
}
