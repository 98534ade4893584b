//! Morale, stance and recovery
//!
//! Morale is rebuilt from scratch every turn. Stance follows from it, with
//! a one-off rally or break in temporary morale whenever it changes so
//! that monsters don't flicker between fighting and fleeing.

#[cfg(not(feature = "std"))]
use crate::compat::*;

use tracing::debug;

use super::alertness::set_alertness;
use super::race::{MonsterRace, RaceFlags, RaceTraits, SpellFlags};
use super::monst::{MonsterFlags, MonsterSong, Stance};
use super::MonsterId;
use crate::combat::{Actor, bane_bonus, elf_bane_bonus, skill_check};
use crate::consts::{
    ALERTNESS_ALERT, ALERTNESS_UNWARY, HEALTH_ALMOST_DEAD, HEALTH_BADLY_WOUNDED, HEALTH_WOUNDED,
    MORALE_BASE, MORALE_SWING, health_level,
};
use crate::dungeon::ProjectFlags;
use crate::magic::{DamageType, Projection, project};
use crate::player::{Abilities, Skill, Timed};
use crate::world::World;

/// Morale above which a monster turns aggressive
pub const MORALE_AGGRESSIVE: i32 = 200;

/// Alert kin in view: +10 for each one standing firm, -10 for each one
/// fleeing, four times that for escorts
pub fn morale_from_friends(world: &World, id: MonsterId) -> i32 {
    let Some(m) = world.monsters.get(id) else { return 0 };
    world
        .monsters
        .iter()
        .filter(|&(nid, n)| {
            nid != id
                && n.alertness >= ALERTNESS_ALERT
                && n.race.similar(&m.race)
                && world.grid.los(m.pos, n.pos)
        })
        .map(|(_, n)| {
            let weight = if n.race.has(RaceFlags::ESCORT | RaceFlags::ESCORTS) { 4 } else { 1 };
            if n.stance == Stance::Fleeing { -10 * weight } else { 10 * weight }
        })
        .sum()
}

/// Recompute a monster's morale
pub fn calc_morale(world: &mut World, id: MonsterId) {
    let Some(m) = world.monsters.get(id) else { return };
    let p = &world.player;
    let race = &m.race;

    let mut morale = MORALE_BASE;
    if p.on_the_run {
        morale += 20;
    } else {
        morale += (race.level - p.depth) * 10;
        // keep the throne room garrison from losing heart
        if p.depth == world.options.morgoth_depth {
            morale = morale.max(20);
        }
    }

    if p.is(Timed::Image) {
        morale += 20;
    }
    if p.is(Timed::Blind) {
        morale += 20;
    }
    if p.is(Timed::Confused) {
        morale += 40;
    }
    if p.is(Timed::Slow) {
        morale += 40;
    }
    if p.is(Timed::Afraid) {
        morale += 40;
    }
    let stun = p.timed(Timed::Stun);
    morale += if p.is(Timed::Entranced) || stun > 100 {
        80
    } else if stun > 50 {
        40
    } else if stun > 0 {
        20
    } else {
        0
    };

    morale += match health_level(p.chp, p.mhp) {
        HEALTH_WOUNDED => 20,
        HEALTH_BADLY_WOUNDED => 40,
        HEALTH_ALMOST_DEAD => 80,
        _ => 0,
    };

    if m.stunned > 0 {
        morale -= 20;
    }
    if m.hasted > 0 {
        morale += 40;
    }
    let health = health_level(m.hp, m.maxhp);
    morale -= match health {
        HEALTH_WOUNDED => 20,
        HEALTH_BADLY_WOUNDED => 40,
        HEALTH_ALMOST_DEAD => 80,
        _ => 0,
    };
    // wounded monsters that have fled stay away a while
    if m.stance == Stance::Fleeing && health <= HEALTH_WOUNDED {
        morale -= 20;
    }

    morale += morale_from_friends(world, id);

    let light = world.grid.light(p.pos);
    if race.is(RaceTraits::HURT_LITE) && light >= 4 {
        morale -= (light - 3) * 10;
    }

    if !race.is_unique() {
        morale -= 20 * m.held.len() as i32;
    }

    if p.has(Abilities::WIL_MAJESTY) {
        let difference = (p.skill(Skill::Will) - m.skill(Skill::Will)).max(0);
        morale -= difference / 2 * 10;
    }
    if p.has(Abilities::PER_BANE) {
        morale -= bane_bonus(world, id) * 10;
    }
    morale += elf_bane_bonus(world, id) * 10;
    morale += m.tmp_morale;

    if let Some(m) = world.monsters.get_mut(id) {
        m.morale = morale;
    }
}

/// The stance a monster's morale and nature call for
pub fn stance_for(world: &World, id: MonsterId) -> Option<Stance> {
    let m = world.monsters.get(id)?;
    let race = &m.race;
    let mut stances = [Stance::Fleeing, Stance::Confident, Stance::Aggressive];

    // fearless monsters only flee under magical terror
    if race.is(RaceTraits::NO_FEAR) && m.tmp_morale >= 0 {
        stances[0] = Stance::Confident;
    }
    if race.is_mindless() {
        stances[0] = Stance::Aggressive;
        stances[1] = Stance::Aggressive;
    }
    if race.is(RaceTraits::TROLL)
        || (world.player.aggravate > 0 && !race.is_mindless())
        || m.flags.contains(MonsterFlags::AGGRESSIVE)
    {
        stances[1] = Stance::Aggressive;
    }

    let stance = if m.alertness < ALERTNESS_ALERT {
        stances[1]
    } else if m.morale > MORALE_AGGRESSIVE {
        stances[2]
    } else if m.morale > 0 {
        stances[1]
    } else {
        stances[0]
    };
    Some(stance)
}

/// Update a monster's stance, rallying or breaking its morale and
/// announcing visible changes
pub fn calc_stance(world: &mut World, id: MonsterId) {
    let Some(stance) = stance_for(world, id) else { return };
    let Some(m) = world.monsters.get(id) else { return };
    let old = m.stance;
    if stance == old {
        return;
    }
    let announce = m.ml && !m.race.has(RaceFlags::NEVER_MOVE);
    let name = m.desc_cap();

    let what = match (old, stance) {
        (Stance::Fleeing, _) => {
            if let Some(m) = world.monsters.get_mut(id) {
                m.tmp_morale += MORALE_SWING;
            }
            calc_morale(world, id);
            Some(if world.player.truce { "recovers its composure." } else { "turns to fight!" })
        }
        (_, Stance::Fleeing) => {
            if let Some(m) = world.monsters.get_mut(id) {
                m.tmp_morale -= MORALE_SWING;
            }
            calc_morale(world, id);
            Some("flees in terror!")
        }
        _ => None,
    };
    debug!(monster = %name, ?old, new = ?stance, "stance changed");
    if let Some(what) = what.filter(|_| announce) {
        world.message(format!("{name} {what}"));
    }
    if let Some(m) = world.monsters.get_mut(id) {
        m.min_range = 0;
        m.stance = stance;
    }
}

/// Count a timed monster condition down, naming it when it wears off
fn wear_off(world: &mut World, id: MonsterId, visible: bool, counter: fn(&mut super::Monster) -> &mut i32, ends: &str) {
    let Some(m) = world.monsters.get_mut(id) else { return };
    let value = counter(m);
    if *value == 0 {
        return;
    }
    *value -= 1;
    if *value == 0 && visible {
        let name = m.desc_cap();
        world.message(format!("{name} {ends}"));
    }
}

/// The element a cloud-wreathed race gives off, taken from its breath.
/// Serpents that breathe all four pick one at random each turn.
fn cloud_element(world: &mut World, race: &MonsterRace) -> DamageType {
    let breaths = race.spells & SpellFlags::BREATH;
    if breaths == SpellFlags::BREATH {
        return match world.rng.die(4) {
            1 => DamageType::Cold,
            2 => DamageType::Fire,
            3 => DamageType::Pois,
            _ => DamageType::Dark,
        };
    }
    [
        (SpellFlags::BRTH_POIS, DamageType::Pois),
        (SpellFlags::BRTH_FIRE, DamageType::Fire),
        (SpellFlags::BRTH_COLD, DamageType::Cold),
        (SpellFlags::BRTH_DARK, DamageType::Dark),
    ]
    .into_iter()
    .find(|(flag, _)| breaths.contains(*flag))
    .map_or(DamageType::Nothing, |(_, typ)| typ)
}

/// An active monster wrapped in a cloud lets it out once the player
/// comes within five grids and can see it
pub fn produce_cloud(world: &mut World, id: MonsterId) {
    let Some(m) = world.monsters.get(id) else { return };
    if !m.race.has(RaceFlags::CLOUD_SURROUND) || !m.flags.contains(MonsterFlags::ACTIVE) {
        return;
    }
    let (pos, cdis) = (m.pos, m.cdis);
    if cdis > 5 || !world.player_can_see(pos) {
        return;
    }
    let race = m.race.clone();
    world.learn_flags(id, RaceFlags::CLOUD_SURROUND);

    let typ = cloud_element(world, &race);
    if typ == DamageType::Nothing {
        return;
    }
    debug!(monster = %race.name, %typ, "cloud released");
    let cloud = Projection::new(Actor::Monster(id), pos, pos, typ)
        .dice(race.spell_power / 4 + 2, 4)
        .radius(1)
        .difficulty(-1)
        .flags(
            ProjectFlags::BOOM
                | ProjectFlags::GRID
                | ProjectFlags::ITEM
                | ProjectFlags::KILL
                | ProjectFlags::PLAY
                | ProjectFlags::HIDE,
        );
    project(world, &cloud);
}

/// Recovery at the start of a monster's turn: conditions wear off,
/// temporary morale fades, out-of-sight hunters may lose the trail, and
/// morale and stance are recomputed. Returns false if the monster is gone
/// (summoned monsters fade once their song ends).
pub fn recover_monster(world: &mut World, id: MonsterId) -> bool {
    let Some(m) = world.monsters.get(id) else { return false };
    if m.flags.contains(MonsterFlags::SUMMONED) {
        let still_singing = world.monsters.iter().any(|(_, n)| n.song == MonsterSong::Oaths);
        if !still_singing && world.rng.one_in(2) {
            debug!(?id, "summoned monster fades");
            world.delete_monster(id);
            return false;
        }
    }
    let visible = world.monsters.get(id).is_some_and(|m| m.ml);

    produce_cloud(world, id);
    if !world.monsters.contains(id) {
        return false;
    }

    wear_off(world, id, visible, |m| &mut m.stunned, "is no longer stunned.");
    wear_off(world, id, visible, |m| &mut m.confused, "is no longer confused.");
    wear_off(world, id, visible, |m| &mut m.hasted, "is no longer hasted.");
    wear_off(world, id, visible, |m| &mut m.slowed, "is no longer slowed.");

    let Some(m) = world.monsters.get_mut(id) else { return false };
    m.tmp_morale = m.tmp_morale * 9 / 10;

    // out of sight, hunters may lose track of the player
    let (pos, alertness) = (m.pos, m.alertness);
    let hunting = alertness >= ALERTNESS_ALERT && m.stance != Stance::Fleeing && m.race.sleep > 0;
    let perception = m.skill(Skill::Perception);
    if hunting && !world.grid.los(pos, world.player.pos) {
        let bonus = if world.player.has(Abilities::STL_VANISH) { 15 } else { 25 };
        let difficulty = world.player.skill(Skill::Stealth) + world.flows.player_noise.dist(pos);
        let result = skill_check(world, Actor::Monster(id), perception + bonus, difficulty, Actor::Player);
        if result < 0 {
            set_alertness(world, id, (alertness + result).max(ALERTNESS_UNWARY));
        }
    }

    calc_morale(world, id);
    calc_stance(world, id);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dungeon::Coord;
    use crate::monster::MonsterRace;
    use crate::world::testing::arena;
    use proptest::prelude::*;

    fn fire_drake(world: &mut World, c: Coord) -> MonsterId {
        world.update_race("Snaga", |r| {
            r.flags |= RaceFlags::CLOUD_SURROUND;
            r.spells |= SpellFlags::BRTH_FIRE;
            r.spell_power = 16;
        });
        let id = world.place_monster("Snaga", c).unwrap();
        world.update_view();
        world.monsters.get_mut(id).unwrap().flags |= MonsterFlags::ACTIVE;
        id
    }

    #[test]
    fn test_cloud_surrounds_an_active_monster() {
        let mut world = arena();
        world.player.mhp = 100;
        world.player.chp = 100;
        let beside = world.player.pos.offset(0, 1);
        let id = fire_drake(&mut world, beside);
        assert!(recover_monster(&mut world, id));
        assert!(world.player.chp < 100);
        assert!(world.lore.get("Snaga").is_some_and(|l| l.flags.contains(RaceFlags::CLOUD_SURROUND)));
        // the monster at the heart of its own cloud is unharmed
        let m = world.monsters.get(id).unwrap();
        assert_eq!(m.hp, m.maxhp);
    }

    #[test]
    fn test_cloud_waits_for_the_player() {
        let mut world = arena();
        world.player.mhp = 100;
        world.player.chp = 100;
        let beside = world.player.pos.offset(0, 1);
        let id = fire_drake(&mut world, beside);
        world.monsters.get_mut(id).unwrap().flags.remove(MonsterFlags::ACTIVE);
        recover_monster(&mut world, id);
        assert_eq!(world.player.chp, 100);

        let far = Coord::new(1, 1);
        let mut world = arena();
        world.player.mhp = 100;
        world.player.chp = 100;
        world.place_player(Coord::new(3, 7)).unwrap();
        let id = fire_drake(&mut world, far);
        world.monsters.get_mut(id).unwrap().cdis = 6;
        recover_monster(&mut world, id);
        assert_eq!(world.player.chp, 100);
    }

    #[test]
    fn test_cloud_element_follows_breath() {
        let mut world = arena();
        let mut race = MonsterRace::new("Cold-drake", 'd');
        assert_eq!(cloud_element(&mut world, &race), DamageType::Nothing);
        race.spells |= SpellFlags::BRTH_COLD;
        assert_eq!(cloud_element(&mut world, &race), DamageType::Cold);
        race.spells |= SpellFlags::BREATH;
        for _ in 0..20 {
            assert!(cloud_element(&mut world, &race).is_elemental());
        }
    }

    fn alert(world: &mut World, name: &str, c: Coord) -> MonsterId {
        let id = world.place_monster(name, c).unwrap();
        world.monsters.get_mut(id).unwrap().alertness = 10;
        id
    }

    #[test]
    fn test_base_morale_tracks_depth() {
        let mut world = arena();
        let id = alert(&mut world, "Snaga", Coord::new(1, 1));
        world.player.depth = 2;
        calc_morale(&mut world, id);
        assert_eq!(world.monsters.get(id).unwrap().morale, MORALE_BASE);
        world.player.depth = 5;
        calc_morale(&mut world, id);
        assert_eq!(world.monsters.get(id).unwrap().morale, MORALE_BASE - 30);
    }

    #[test]
    fn test_player_weakness_emboldens() {
        let mut world = arena();
        world.player.depth = 2;
        let id = alert(&mut world, "Snaga", Coord::new(1, 1));
        world.player.timed.set(Timed::Confused, 5);
        world.player.timed.set(Timed::Afraid, 5);
        calc_morale(&mut world, id);
        assert_eq!(world.monsters.get(id).unwrap().morale, MORALE_BASE + 80);
    }

    #[test]
    fn test_friends_count() {
        let mut world = arena();
        let id = alert(&mut world, "Snaga", Coord::new(1, 1));
        let friend = alert(&mut world, "Cave orc", Coord::new(1, 3));
        alert(&mut world, "Wolf", Coord::new(3, 3));
        assert_eq!(morale_from_friends(&world, id), 10);
        world.monsters.get_mut(friend).unwrap().stance = Stance::Fleeing;
        assert_eq!(morale_from_friends(&world, id), -10);
    }

    #[test]
    fn test_breaking_and_rallying() {
        let mut world = arena();
        let id = alert(&mut world, "Snaga", Coord::new(1, 1));
        world.monsters.get_mut(id).unwrap().morale = -10;
        calc_stance(&mut world, id);
        let m = world.monsters.get(id).unwrap();
        assert_eq!(m.stance, Stance::Fleeing);
        assert_eq!(m.tmp_morale, -MORALE_SWING);
        assert!(world.messages.iter().any(|s| s == "The Snaga flees in terror!"));

        world.monsters.get_mut(id).unwrap().tmp_morale = 400;
        calc_morale(&mut world, id);
        calc_stance(&mut world, id);
        assert_ne!(world.monsters.get(id).unwrap().stance, Stance::Fleeing);
        assert!(world.messages.iter().any(|s| s == "The Snaga turns to fight!"));
    }

    #[test]
    fn test_unwary_monsters_are_confident() {
        let mut world = arena();
        let id = alert(&mut world, "Snaga", Coord::new(1, 1));
        let m = world.monsters.get_mut(id).unwrap();
        m.alertness = -5;
        m.morale = -100;
        assert_eq!(stance_for(&world, id), Some(Stance::Confident));
    }

    #[test]
    fn test_recovery_counts_down() {
        let mut world = arena();
        let id = alert(&mut world, "Snaga", Coord::new(1, 1));
        let m = world.monsters.get_mut(id).unwrap();
        m.stunned = 1;
        m.confused = 3;
        m.tmp_morale = 100;
        assert!(recover_monster(&mut world, id));
        let m = world.monsters.get(id).unwrap();
        assert_eq!((m.stunned, m.confused, m.tmp_morale), (0, 2, 90));
        assert!(world.messages.iter().any(|s| s == "The Snaga is no longer stunned."));
    }

    #[test]
    fn test_recovery_of_a_calm_monster_keeps_counters_at_zero() {
        let mut world = arena();
        let id = alert(&mut world, "Snaga", Coord::new(1, 1));
        recover_monster(&mut world, id);
        recover_monster(&mut world, id);
        let m = world.monsters.get(id).unwrap();
        assert_eq!((m.stunned, m.confused, m.hasted, m.slowed), (0, 0, 0, 0));
    }

    fn stance_world(mindless: bool, fearless: bool, aggravated: bool, morale: i32, tmp: i32) -> (World, MonsterId) {
        let mut world = arena();
        let mut race = MonsterRace::new("Testling", 'x');
        race.hdice = 10;
        race.hside = 1;
        if mindless {
            race.flags |= RaceFlags::MINDLESS;
        }
        if fearless {
            race.traits |= RaceTraits::NO_FEAR;
        }
        world.add_race(race);
        world.player.aggravate = i32::from(aggravated);
        let id = alert(&mut world, "Testling", Coord::new(1, 1));
        let m = world.monsters.get_mut(id).unwrap();
        m.morale = morale;
        m.tmp_morale = tmp;
        (world, id)
    }

    proptest! {
        #[test]
        fn prop_stance_matches_thresholds(
            mindless: bool,
            fearless: bool,
            aggravated: bool,
            morale in -400i32..400,
            tmp in -100i32..100,
        ) {
            let (world, id) = stance_world(mindless, fearless, aggravated, morale, tmp);
            let stance = stance_for(&world, id).unwrap();
            let expected = if mindless {
                Stance::Aggressive
            } else if morale > MORALE_AGGRESSIVE {
                Stance::Aggressive
            } else if morale > 0 {
                if aggravated { Stance::Aggressive } else { Stance::Confident }
            } else if fearless && tmp >= 0 {
                Stance::Confident
            } else {
                Stance::Fleeing
            };
            prop_assert_eq!(stance, expected);
        }
    }
}
