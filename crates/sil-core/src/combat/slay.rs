//! Slays, brands and sharpness
//!
//! Each slay that matches the target adds a damage die, as does each brand
//! the target does not resist (two against creatures hurt by the element).
//! A weapon whose properties are not yet known reports the property it has
//! just shown so the caller can identify it.

#[cfg(not(feature = "std"))]
use crate::compat::*;

use crate::consts::ALERTNESS_ALERT;
use crate::monster::{MonsterId, RaceTraits};
use crate::object::{Item, ItemFlags};
use crate::player::Song;
use crate::world::World;

/// Outcome of checking a weapon against a monster
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlayBonus {
    /// Extra damage dice
    pub dice: i32,
    /// A property of an unidentified weapon that just showed itself
    pub noticed: Option<ItemFlags>,
}

/// Each slay and the race trait it is aimed at
const SLAY_TARGETS: [(ItemFlags, RaceTraits); 7] = [
    (ItemFlags::SLAY_WOLF, RaceTraits::WOLF),
    (ItemFlags::SLAY_SPIDER, RaceTraits::SPIDER),
    (ItemFlags::SLAY_UNDEAD, RaceTraits::UNDEAD),
    (ItemFlags::SLAY_RAUKO, RaceTraits::RAUKO),
    (ItemFlags::SLAY_ORC, RaceTraits::ORC),
    (ItemFlags::SLAY_TROLL, RaceTraits::TROLL),
    (ItemFlags::SLAY_DRAGON, RaceTraits::DRAGON),
];

/// Each brand, the trait that resists it and the one it hurts extra
const BRAND_TARGETS: [(ItemFlags, RaceTraits, RaceTraits); 4] = [
    (ItemFlags::BRAND_ELEC, RaceTraits::RES_ELEC, RaceTraits::empty()),
    (ItemFlags::BRAND_FIRE, RaceTraits::RES_FIRE, RaceTraits::HURT_FIRE),
    (ItemFlags::BRAND_COLD, RaceTraits::RES_COLD, RaceTraits::HURT_COLD),
    (ItemFlags::BRAND_POIS, RaceTraits::RES_POIS, RaceTraits::empty()),
];

fn notice(item: &Item, flag: ItemFlags) -> Option<ItemFlags> {
    (!item.known).then_some(flag)
}

/// Bonus dice from an item's slays and brands against a monster.
///
/// What the player sees of the monster's nature goes into lore, and a
/// slay that connects unnerves the victim's kin.
pub fn slay_bonus(world: &mut World, item: &Item, id: MonsterId) -> SlayBonus {
    let mut result = SlayBonus::default();
    if !item.kind.is_weapon() {
        return result;
    }
    let Some(m) = world.monsters.get(id) else { return result };
    let race = m.race.clone();
    let seen = m.ml;

    let mut slay_dice = 0;
    let mut brand_dice = 0;

    for (flag, traits) in SLAY_TARGETS {
        if item.has(flag) && race.is(traits) {
            if seen {
                world.lore.learn_traits(&race.name, traits);
            }
            slay_dice += 1;
            result.noticed = notice(item, flag);
        }
    }

    for (flag, resist, hurt) in BRAND_TARGETS {
        if !item.has(flag) {
            continue;
        }
        if race.is(resist) {
            if seen {
                world.lore.learn_traits(&race.name, resist);
            }
            continue;
        }
        brand_dice += 1;
        result.noticed = notice(item, flag);
        if !hurt.is_empty() && race.is(hurt) {
            brand_dice += 1;
            world.lore.learn_traits(&race.name, hurt);
        }
    }

    if slay_dice > 0 || brand_dice > 1 {
        scare_onlooking_friends(world, id, -20);
    }

    result.dice = slay_dice + brand_dice;
    result
}

/// Percentage of the target's protection that still applies against an
/// edged item
pub fn prt_after_sharpness(world: &World, item: &Item) -> (i32, Option<ItemFlags>) {
    let mut protection = 100;
    let mut noticed = None;
    if item.has(ItemFlags::SHARPNESS) {
        noticed = notice(item, ItemFlags::SHARPNESS);
        protection = 50;
    }
    if item.has(ItemFlags::SHARPNESS2) {
        noticed = notice(item, ItemFlags::SHARPNESS2);
        protection = 0;
    }
    if world.player.singing(Song::Sharpness) && item.kind.is_sharp() {
        protection -= world.player.song_bonus(Song::Sharpness);
    }
    (protection.max(0), noticed)
}

/// Lower the temporary morale of alert kin who can see a monster
pub fn scare_onlooking_friends(world: &mut World, id: MonsterId, amount: i32) {
    let Some(m) = world.monsters.get(id) else { return };
    let race = m.race.clone();
    let pos = m.pos;

    let onlookers: Vec<MonsterId> = world
        .monsters
        .iter()
        .filter(|(_, n)| {
            n.alertness >= ALERTNESS_ALERT
                && !n.race.is(RaceTraits::NO_FEAR)
                && n.race.similar(&race)
                && world.grid.los(n.pos, pos)
        })
        .map(|(nid, _)| nid)
        .collect();

    for nid in onlookers {
        if let Some(n) = world.monsters.get_mut(nid) {
            n.tmp_morale += amount;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dungeon::Coord;
    use crate::object::ItemKind;
    use crate::world::testing::arena;

    fn sword(flags: ItemFlags) -> Item {
        Item::weapon("Long Sword", ItemKind::Sword, 30, 0, 2, 5).with_flags(flags)
    }

    #[test]
    fn test_slay_matches_kind() {
        let mut world = arena();
        let orc = world.place_monster("Cave orc", Coord::new(1, 1)).unwrap();
        let wolf = world.place_monster("Wolf", Coord::new(1, 7)).unwrap();
        let item = sword(ItemFlags::SLAY_ORC);
        assert_eq!(slay_bonus(&mut world, &item, orc).dice, 1);
        assert_eq!(slay_bonus(&mut world, &item, wolf).dice, 0);
    }

    #[test]
    fn test_brands_respect_resistance_and_vulnerability() {
        let mut world = arena();
        let drake = world.place_monster("Young fire-drake", Coord::new(1, 1)).unwrap();
        assert_eq!(slay_bonus(&mut world, &sword(ItemFlags::BRAND_FIRE), drake).dice, 0);
        assert_eq!(slay_bonus(&mut world, &sword(ItemFlags::BRAND_COLD), drake).dice, 2);
        let both = sword(ItemFlags::BRAND_COLD | ItemFlags::SLAY_DRAGON);
        assert_eq!(slay_bonus(&mut world, &both, drake).dice, 3);
    }

    #[test]
    fn test_unknown_weapon_reports_the_slay() {
        let mut world = arena();
        let orc = world.place_monster("Cave orc", Coord::new(1, 1)).unwrap();
        let mut item = sword(ItemFlags::SLAY_ORC);
        item.known = false;
        let result = slay_bonus(&mut world, &item, orc);
        assert_eq!(result.noticed, Some(ItemFlags::SLAY_ORC));
        item.known = true;
        assert_eq!(slay_bonus(&mut world, &item, orc).noticed, None);
    }

    #[test]
    fn test_slay_scares_alert_kin() {
        let mut world = arena();
        let target = world.place_monster("Cave orc", Coord::new(1, 1)).unwrap();
        let kin = world.place_monster("Snaga", Coord::new(1, 3)).unwrap();
        let stranger = world.place_monster("Wolf", Coord::new(3, 3)).unwrap();
        for id in [kin, stranger] {
            world.monsters.get_mut(id).unwrap().alertness = 5;
        }
        slay_bonus(&mut world, &sword(ItemFlags::SLAY_ORC), target);
        assert_eq!(world.monsters.get(kin).unwrap().tmp_morale, -20);
        assert_eq!(world.monsters.get(stranger).unwrap().tmp_morale, 0);
    }

    #[test]
    fn test_sharpness() {
        let mut world = arena();
        assert_eq!(prt_after_sharpness(&world, &sword(ItemFlags::empty())).0, 100);
        assert_eq!(prt_after_sharpness(&world, &sword(ItemFlags::SHARPNESS)).0, 50);
        assert_eq!(prt_after_sharpness(&world, &sword(ItemFlags::SHARPNESS2)).0, 0);
        world.player.song1 = Song::Sharpness;
        world.player.skill_use[crate::player::Skill::Song.index()] = 10;
        assert_eq!(prt_after_sharpness(&world, &sword(ItemFlags::SHARPNESS)).0, 30);
        let mace = Item::weapon("Mace", ItemKind::Hafted, 160, 0, 2, 4);
        assert_eq!(prt_after_sharpness(&world, &mace).0, 100);
    }
}
