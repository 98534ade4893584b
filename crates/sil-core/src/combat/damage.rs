//! Damage and death
//!
//! Hit point loss for the player and for monsters, with the messages,
//! notes and lore that follow, and the protection the player's armour
//! gives against each kind of damage.

#[cfg(not(feature = "std"))]
use crate::compat::*;

use tracing::debug;

use super::slay::scare_onlooking_friends;
use crate::consts::{ALERTNESS_ALERT, ALERTNESS_QUITE_ALERT, HITPOINT_WARN};
use crate::dungeon::{Feature, FlowMap, distance};
use crate::magic::DamageType;
use crate::monster::{BlowEffect, MonsterFlags, MonsterId, RaceFlags, set_alertness};
use crate::object::ItemKind;
use crate::perception::monster_perception;
use crate::player::{Abilities, Player, Skill, Song, Stat, Timed};
use crate::world::World;

/// Fire resistance from equipment and temporary effects. Anything below
/// one is a vulnerability, shown as a negative.
pub fn resist_fire(p: &Player) -> i32 {
    vulnerable_below_one(p.resist_fire + i32::from(p.is(Timed::OpposeFire)))
}

pub fn resist_cold(p: &Player) -> i32 {
    vulnerable_below_one(p.resist_cold + i32::from(p.is(Timed::OpposeCold)))
}

pub fn resist_pois(p: &Player) -> i32 {
    vulnerable_below_one(p.resist_pois + i32::from(p.is(Timed::OpposePois)))
}

fn vulnerable_below_one(res: i32) -> i32 {
    if res < 1 { res - 2 } else { res }
}

/// Darkness is resisted by standing in the light
pub fn resist_dark(world: &World) -> i32 {
    world.grid.light(world.player.pos).max(1)
}

/// Divisor for elemental damage that reaches the player
pub fn resistance(world: &World, typ: DamageType) -> i32 {
    let p = &world.player;
    match typ {
        DamageType::Fire => resist_fire(p),
        DamageType::Cold => resist_cold(p),
        DamageType::Pois => resist_pois(p),
        DamageType::Dark | DamageType::DarkWeak => resist_dark(world),
        _ => 1,
    }
}

/// Extra damage dice for an elemental blow: one if unresisted, more for
/// each step of vulnerability
pub fn elem_bonus(world: &World, effect: BlowEffect) -> i32 {
    let p = &world.player;
    let res = match effect {
        BlowEffect::Fire => resist_fire(p),
        BlowEffect::Cold => resist_cold(p),
        BlowEffect::Poison => resist_pois(p),
        BlowEffect::Dark => resist_dark(world),
        _ => return 0,
    };
    match res {
        1 => 1,
        r if r < 0 => -r,
        _ => 0,
    }
}

/// Roll the protection dice of everything the player wears.
///
/// Songs and hardiness always count. Shields guard against blows, fire and
/// cold, twice as well with the blocking ability if the player stood still
/// (or against missiles). Other armour only stops plain damage, except
/// rings and amulets which always help.
pub fn protection_roll(world: &mut World, typ: DamageType, melee: bool) -> i32 {
    let p = &world.player;
    let rng = &mut world.rng;
    let mut prt = 0;

    if p.singing(Song::Staying) {
        prt += rng.damroll(1, p.song_bonus(Song::Staying).max(1));
    }
    if p.has(Abilities::WIL_HARDINESS) {
        prt += rng.damroll(1, p.skill(Skill::Will) / 6);
    }

    let shield_counts = matches!(typ, DamageType::Hurt | DamageType::Fire | DamageType::Cold);
    if let Some(shield) = p.equipment.shield() {
        if shield_counts && shield.pd > 0 {
            let blocking = p.has(Abilities::EVN_BLOCKING) && (!melee || p.previous_action[0] == 5);
            let mult = if blocking { 2 } else { 1 };
            prt += rng.damroll(shield.pd * mult, shield.ps);
        }
    }

    let eq = &p.equipment;
    let others = eq
        .weapon
        .iter()
        .chain(eq.bow.iter())
        .chain(eq.light.iter())
        .chain(eq.worn.iter());
    for item in others {
        let jewellery = matches!(item.kind, ItemKind::Ring | ItemKind::Amulet);
        if (typ == DamageType::Hurt || jewellery) && item.ps > 0 {
            prt += rng.damroll(item.pd, item.ps);
        }
    }

    if p.has(Abilities::EVN_HEAVY_ARMOUR) && typ == DamageType::Hurt {
        let weight = eq.armour_weight() + eq.shield().map(|s| s.weight).unwrap_or(0);
        prt += rng.damroll(1, weight / 150);
    }
    prt
}

/// Take damage from `source`. Death ends the game at the next check of
/// [`Player::leaving`]; surviving breaks any trance.
pub fn take_hit(world: &mut World, dam: i32, source: &str) {
    if world.player.is_dead {
        return;
    }
    let warning = world.player.mhp * HITPOINT_WARN / 10;
    world.disturb();
    world.player.chp -= dam;

    if world.player.chp <= 0 {
        world.message("You die.");
        let p = &mut world.player;
        p.died_from = if p.is(Timed::Image) {
            format!("{source} (while hallucinating)")
        } else {
            source.to_string()
        };
        p.is_dead = true;
        p.leaving = true;
        let note = format!("Slain by {}.", p.died_from);
        p.note(note);
        debug!(source, "player died");
        return;
    }

    if world.player.chp < warning {
        world.message("*** LOW HITPOINT WARNING! ***");
    }
    world.player.calc_bonuses();
    world.set_timed(Timed::Entranced, 0);
}

/// Damage of an element that has already been reduced by resistance.
/// Poison sets the poison counter instead of hurting outright.
pub fn element_damage(world: &mut World, typ: DamageType, dam: i32, source: &str) {
    if dam <= 0 {
        return;
    }
    match typ {
        DamageType::Pois => {
            world.inc_timed(Timed::Poisoned, dam);
        }
        _ => take_hit(world, dam, source),
    }
}

/// Drain a stat temporarily
pub fn dec_stat(world: &mut World, stat: Stat, amount: i32) {
    world.player.stat_drain[stat.index()] -= amount;
    world.player.calc_bonuses();
}

/// Build up wrath for the song of slaying
pub fn add_wrath(world: &mut World) {
    world.player.wrath += 100;
    world.player.calc_bonuses();
}

/// Sounds an unseen monster makes as it is hurt
pub fn message_pain(world: &mut World, id: MonsterId, dam: i32) {
    let Some(m) = world.monsters.get(id) else { return };
    if m.ml {
        return;
    }
    let old = i64::from(m.hp) + i64::from(dam);
    let percentage = if old > 0 { i64::from(m.hp) * 100 / old } else { 0 };

    let sounds: [&str; 3] = match m.race.d_char {
        'C' => ["a snarl", "a yelp", "a feeble yelp"],
        's' | 'S' | 'c' | 'd' | 'D' => ["a hiss", "a furious hissing", "thrashing about"],
        'f' => ["a feline snarl", "a mewling sound", "a pitiful mewling"],
        'I' | 'M' => ["an angry droning", "a scuttling sound", "a skittering sound"],
        'b' | 'v' => ["a squeal", "shrieks", "erratic fluttering"],
        '@' | 'o' | 'T' | 'G' | 'V' => ["a grunt", "a cry of pain", "a feeble cry"],
        'H' | 'R' | 'N' => ["a strange grunt", "a terrible cry", "an unnatural cry"],
        _ => return,
    };
    let sound = match percentage {
        p if p > 66 => sounds[0],
        p if p > 33 => sounds[1],
        _ => sounds[2],
    };
    world.message(format!("You hear {sound}."));
}

/// Hurt a monster, returning true if it died.
///
/// `note` replaces the usual death message (a one-character note silences
/// it). A wound that does not kill rouses the monster by the damage done.
pub fn mon_take_hit(
    world: &mut World,
    id: MonsterId,
    dam: i32,
    note: Option<&str>,
    by_player: bool,
) -> bool {
    let Some(m) = world.monsters.get_mut(id) else { return false };
    m.hp -= dam;

    if m.hp <= 0 {
        let visible = m.ml;
        let nonliving = m.race.is_nonliving();
        let adjacent = distance(m.pos, world.player.pos) == 1;
        let name = world.monster_name(id);
        let name_cap = world.monster_name_cap(id);

        match note {
            Some(note) if note.len() > 1 => world.message(format!("{name_cap}{note}")),
            Some(_) => {}
            None if !visible => {
                if by_player && adjacent {
                    world.message(format!("You have killed {name}."));
                }
            }
            None if nonliving => {
                if by_player {
                    world.message(format!("You have destroyed {name}."));
                } else {
                    world.message(format!("{name_cap} has been destroyed."));
                }
            }
            None => {
                if by_player {
                    world.message(format!("You have slain {name}."));
                } else {
                    world.message(format!("{name_cap} has been slain."));
                }
            }
        }

        monster_death(world, id);
        world.delete_monster(id);
        return true;
    }

    if dam > 0 {
        let alertness = m.alertness;
        let random_level = world.rng.rand_range(ALERTNESS_ALERT, ALERTNESS_QUITE_ALERT);
        set_alertness(world, id, (alertness + dam).max(random_level + dam));
    }
    if let Some(m) = world.monsters.get_mut(id) {
        m.flags |= MonsterFlags::ACTIVE;
        if dam > 0 {
            m.min_range = 0;
        }
    }
    false
}

/// Everything that follows a monster's death short of removing it: notes,
/// kill counts, the dismay of its kin and dropping what it carried
pub fn monster_death(world: &mut World, id: MonsterId) {
    let Some(m) = world.monsters.get(id) else { return };
    let race = m.race.clone();
    let pos = m.pos;
    let encountered = m.encountered;
    debug!(monster = %race.name, at = %pos, "monster died");

    if race.is_morgoth() {
        world.message("Morgoth, Lord of Darkness has been struck down!");
        world.message("The fates did not foresee this, but you have done it.");
    }

    if race.is_unique() {
        let verb = if race.is_nonliving() { "Destroyed" } else { "Slew" };
        world.player.note(format!("{verb} {}", race.name));
    }

    let lore = world.lore.entry(&race.name);
    lore.pkills = lore.pkills.saturating_add(1);
    lore.tkills = lore.tkills.saturating_add(1);
    if !encountered {
        lore.sights = lore.sights.saturating_add(1);
        if let Some(m) = world.monsters.get_mut(id) {
            m.encountered = true;
        }
    }

    let multiplier = if race.has(RaceFlags::ESCORT | RaceFlags::ESCORTS) { 4 } else { 1 };
    scare_onlooking_friends(world, id, -40 * multiplier);

    let in_chasm = world.grid.feat(pos) == Feature::Chasm && !race.has(RaceFlags::FLYING);
    if race.has(RaceFlags::TERRITORIAL) || in_chasm {
        return;
    }
    let held = world
        .monsters
        .get_mut(id)
        .map(|m| core::mem::take(&mut m.held))
        .unwrap_or_default();
    for item in held {
        world.grid.drop_object(pos, item);
    }
}

/// End the truce in Morgoth's throne room if an alert monster can see the
/// player, or unconditionally if the player did something `obvious`
pub fn break_truce(world: &mut World, obvious: bool) {
    if !world.player.truce {
        return;
    }
    let player = world.player.pos;
    let witness = world
        .monsters
        .ids_rev()
        .into_iter()
        .find(|&id| {
            world
                .monsters
                .get(id)
                .is_some_and(|m| m.alertness >= ALERTNESS_ALERT && world.grid.los(m.pos, player))
        });

    if witness.is_none() && !obvious {
        return;
    }
    world.player.truce = false;

    match witness.filter(|_| !obvious) {
        Some(id) => {
            let name = world.monster_name_cap(id);
            world.message(format!("{name} lets out a cry! The tension is broken."));
            if let Some(m) = world.monsters.get(id) {
                world.flows.monster_noise = FlowMap::noise(&world.grid, m.pos);
            }
            monster_perception(world, false, false, -10);
        }
        None => world.message("The tension is broken."),
    }
    debug!(obvious, "truce broken");

    for (_, m) in world.monsters.iter_mut() {
        m.min_range = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dungeon::Coord;
    use crate::object::Item;
    use crate::world::testing::arena;
    use proptest::prelude::*;

    #[test]
    fn test_resistances_and_vulnerabilities() {
        let mut world = arena();
        assert_eq!(resist_fire(&world.player), -2);
        world.player.resist_fire = 1;
        assert_eq!(resist_fire(&world.player), 1);
        world.player.timed.set(Timed::OpposeFire, 4);
        assert_eq!(resist_fire(&world.player), 2);
        assert_eq!(elem_bonus(&world, BlowEffect::Fire), 0);
        assert_eq!(elem_bonus(&world, BlowEffect::Cold), 2);
        world.player.resist_cold = 1;
        assert_eq!(elem_bonus(&world, BlowEffect::Cold), 1);
        assert_eq!(elem_bonus(&world, BlowEffect::Hurt), 0);
    }

    #[test]
    fn test_dark_resistance_follows_light() {
        let mut world = arena();
        let p = world.player.pos;
        world.grid.set_light(p, 0);
        assert_eq!(resist_dark(&world), 1);
        assert_eq!(elem_bonus(&world, BlowEffect::Dark), 1);
        world.grid.set_light(p, 3);
        assert_eq!(resist_dark(&world), 3);
        assert_eq!(elem_bonus(&world, BlowEffect::Dark), 0);
    }

    #[test]
    fn test_armour_only_stops_plain_damage() {
        let mut world = arena();
        world.player.equipment.worn.push(Item::armour("Mail", ItemKind::Mail, 150, -1, 1, 6));
        let mut plain = 0;
        let mut fire = 0;
        for _ in 0..50 {
            plain += protection_roll(&mut world, DamageType::Hurt, true);
            fire += protection_roll(&mut world, DamageType::Fire, true);
        }
        assert!(plain >= 50);
        assert_eq!(fire, 0);
    }

    #[test]
    fn test_shield_blocks_fire_and_doubles_when_blocking() {
        let mut world = arena();
        world.player.equipment.off_hand = Some(Item::armour("Shield", ItemKind::Shield, 60, 1, 1, 4));
        for _ in 0..30 {
            let prt = protection_roll(&mut world, DamageType::Fire, true);
            assert!((1..=4).contains(&prt));
        }
        world.player.abilities |= Abilities::EVN_BLOCKING;
        world.player.push_action(5);
        let mut max = 0;
        for _ in 0..100 {
            max = max.max(protection_roll(&mut world, DamageType::Hurt, true));
        }
        assert!(max > 4);
    }

    #[test]
    fn test_take_hit_kills() {
        let mut world = arena();
        world.player.chp = 5;
        take_hit(&mut world, 3, "a Snaga");
        assert!(!world.player.is_dead);
        assert!(world.messages.iter().any(|m| m.contains("LOW HITPOINT")));
        take_hit(&mut world, 3, "a Snaga");
        assert!(world.player.is_dead);
        assert!(world.player.leaving);
        assert_eq!(world.player.died_from, "a Snaga");
        assert_eq!(world.player.notes.last().map(|n| n.0.as_str()), Some("Slain by a Snaga."));
    }

    #[test]
    fn test_take_hit_breaks_trance() {
        let mut world = arena();
        world.player.timed.set(Timed::Entranced, 10);
        take_hit(&mut world, 1, "a trap");
        assert!(!world.player.is(Timed::Entranced));
    }

    #[test]
    fn test_mon_take_hit_wakes_then_kills() {
        let mut world = arena();
        let id = world.place_monster("Snaga", Coord::new(2, 5)).unwrap();
        world.monsters.get_mut(id).unwrap().alertness = -15;
        let hp = world.monsters.get(id).unwrap().hp;
        assert!(!mon_take_hit(&mut world, id, 1, None, true));
        let m = world.monsters.get(id).unwrap();
        assert!(m.alertness >= ALERTNESS_ALERT);
        assert!(m.flags.contains(MonsterFlags::ACTIVE));

        assert!(mon_take_hit(&mut world, id, hp, None, true));
        assert!(!world.monsters.contains(id));
        assert_eq!(world.lore.pkills("Snaga"), 1);
        assert!(world.messages.iter().any(|m| m.starts_with("You have slain")));
    }

    #[test]
    fn test_death_drops_loot_unless_territorial() {
        let mut world = arena();
        let at = Coord::new(1, 1);
        let id = world.place_monster("Snaga", at).unwrap();
        world.monsters.get_mut(id).unwrap().held.push(Item::new("Flask of oil", ItemKind::Flask));
        mon_take_hit(&mut world, id, 1000, Some("."), true);
        assert_eq!(world.grid.objects_at(at).len(), 1);

        world.update_race("Wolf", |r| r.flags |= RaceFlags::TERRITORIAL);
        let at = Coord::new(1, 7);
        let id = world.place_monster("Wolf", at).unwrap();
        world.monsters.get_mut(id).unwrap().held.push(Item::new("Bone", ItemKind::Useless));
        mon_take_hit(&mut world, id, 1000, Some("."), true);
        assert!(world.grid.objects_at(at).is_empty());
    }

    #[test]
    fn test_pain_messages_only_for_unseen() {
        let mut world = arena();
        let id = world.place_monster("Wolf", Coord::new(1, 1)).unwrap();
        world.monsters.get_mut(id).unwrap().ml = false;
        world.take_messages();
        message_pain(&mut world, id, 1);
        assert_eq!(world.take_messages(), vec!["You hear a snarl."]);
        world.monsters.get_mut(id).unwrap().ml = true;
        message_pain(&mut world, id, 1);
        assert!(world.messages.is_empty());
    }

    #[test]
    fn test_truce_breaks_when_seen() {
        let mut world = arena();
        world.player.truce = true;
        break_truce(&mut world, false);
        assert!(world.player.truce);
        let id = world.place_monster("Cave orc", Coord::new(1, 6)).unwrap();
        world.monsters.get_mut(id).unwrap().alertness = 5;
        world.monsters.get_mut(id).unwrap().min_range = 4;
        break_truce(&mut world, false);
        assert!(!world.player.truce);
        assert!(world.messages.iter().any(|m| m.contains("lets out a cry")));
        assert_eq!(world.monsters.get(id).unwrap().min_range, 0);
    }

    proptest! {
        #[test]
        fn prop_protection_is_never_negative(seed in any::<u64>(), pd in 0i32..4, ps in 0i32..8) {
            let mut world = arena();
            world.rng = crate::GameRng::new(seed);
            world.player.equipment.worn.push(Item::armour("Armour", ItemKind::SoftArmour, 80, 0, pd, ps));
            let prt = protection_roll(&mut world, DamageType::Hurt, true);
            prop_assert!(prt >= 0);
            let dam = world.rng.damroll(2, 6);
            prop_assert!((dam - prt).max(0) >= 0);
        }
    }
}
