//! Projections against monsters

#[cfg(not(feature = "std"))]
use crate::compat::*;

use tracing::debug;

use super::DamageType;
use crate::combat::{Actor, message_pain, mon_take_hit, monster_death, skill_check};
use crate::consts::ALERTNESS_UNWARY;
use crate::dungeon::{CellFlags, Coord, Feature, distance};
use crate::monster::{MonsterFlags, MonsterId, RaceTraits, SpellFlags, make_alert, set_alertness};
use crate::player::{Skill, Stat};
use crate::world::World;

/// Highest stun or confusion a monster can build up
const MAX_CONDITION: i32 = 200;

/// What happened when a projection reached a grid
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectHit {
    /// The player saw an effect
    pub noticed: bool,
    /// A monster died out of the player's sight
    pub unseen_death: bool,
}

/// Status effects rolled up before any damage is dealt
#[derive(Default)]
struct Effects {
    stun: i32,
    conf: i32,
    slow: i32,
    haste: i32,
    sleep: i32,
}

/// Apply a projection to the monster on a grid. The source never hits
/// itself.
pub fn project_m(
    world: &mut World,
    source: Actor,
    c: Coord,
    dd: i32,
    ds: i32,
    dif: i32,
    typ: DamageType,
) -> ProjectHit {
    let mut hit = ProjectHit::default();
    if !world.grid.is_floor(c) {
        return hit;
    }
    let Some(id) = world.grid.monster_at(c) else { return hit };
    if source == Actor::Monster(id) {
        return hit;
    }
    let Some(m) = world.monsters.get_mut(id) else { return hit };

    let race = m.race.clone();
    let seen = m.ml;
    m.flags |= MonsterFlags::ACTIVE;
    if source == Actor::Player {
        m.flags |= MonsterFlags::HIT_BY_RANGED;
    }
    let alertness = m.alertness;
    let asleep = alertness < ALERTNESS_UNWARY;
    let will = m.skill(Skill::Will);
    let con = m.stat(Stat::Con);
    let name = world.monster_name_cap(id);

    let mut note_dies = if race.is_nonliving() { " is destroyed." } else { " dies." };
    let mut note: Option<&'static str> = None;
    let mut dam = world.rng.damroll(dd, ds);
    let mut alerting = true;
    let mut fx = Effects::default();

    // a will contest, made harder the further the player is from the target
    let player_dist = distance(world.player.pos, c);
    let resist_check = |world: &mut World, extra: i32, immune: RaceTraits| -> i32 {
        let immunity = if race.is(immune) { 100 } else { 0 };
        skill_check(world, source, dif + extra - player_dist, will + immunity, Actor::Monster(id))
    };

    match typ {
        DamageType::Hurt | DamageType::Acid => {}

        DamageType::Elec => {
            if race.is(RaceTraits::RES_ELEC) {
                note = Some(" resists.");
                dam = 0;
                world.learn_traits(id, RaceTraits::RES_ELEC);
            }
        }

        DamageType::Pois => {
            if race.is(RaceTraits::RES_POIS) {
                note = Some(" resists.");
                dam = 0;
                world.learn_traits(id, RaceTraits::RES_POIS);
            }
        }

        DamageType::Fire | DamageType::Cold => {
            let (res, hurt) = if typ == DamageType::Fire {
                (RaceTraits::RES_FIRE, RaceTraits::HURT_FIRE)
            } else {
                (RaceTraits::RES_COLD, RaceTraits::HURT_COLD)
            };
            if race.is(res) {
                note = Some(" resists.");
                dam = 0;
                world.learn_traits(id, res);
            } else if race.is(hurt) {
                note = Some(" is badly hurt.");
                dam *= 2;
                world.learn_traits(id, hurt);
            }
        }

        DamageType::Dark => {
            if race.spells.contains(SpellFlags::BRTH_DARK)
                || race.is(RaceTraits::UNDEAD)
                || race.light < 0
            {
                note = Some(" resists.");
                dam = 0;
            }
        }

        DamageType::Sound => {
            fx.stun = dam;
            dam = 0;
        }

        DamageType::Heal => {
            if asleep {
                alerting = false;
            }
            if let Some(m) = world.monsters.get_mut(id) {
                if m.hp < m.maxhp {
                    m.hp = (m.hp + dam).min(m.maxhp);
                    note = Some(" looks healthier.");
                }
            }
            dam = 0;
        }

        DamageType::Speed => {
            fx.haste = dam;
            dam = 0;
        }

        DamageType::Slow => {
            let result = resist_check(world, 0, RaceTraits::NO_SLOW);
            if result > 0 {
                fx.slow = result + 10;
            } else {
                note = Some(" is unaffected!");
                world.learn_traits(id, race.traits & RaceTraits::NO_SLOW);
            }
            if asleep || result <= 0 {
                alerting = false;
            }
            dam = 0;
        }

        DamageType::Sleep => {
            let result = resist_check(world, 0, RaceTraits::NO_SLEEP);
            if result > 0 {
                fx.sleep = result + 5;
            } else {
                note = Some(" is unaffected!");
                world.learn_traits(id, race.traits & RaceTraits::NO_SLEEP);
            }
            alerting = false;
            dam = 0;
        }

        DamageType::Confusion => {
            let result = resist_check(world, 0, RaceTraits::NO_CONF);
            if result > 0 {
                fx.conf = result + 10;
            } else {
                note = Some(" is unaffected!");
                world.learn_traits(id, race.traits & RaceTraits::NO_CONF);
            }
            alerting = false;
            dam = 0;
        }

        DamageType::Fear => {
            let result = resist_check(world, 5, RaceTraits::NO_FEAR);
            if result > 0 {
                if let Some(m) = world.monsters.get_mut(id) {
                    m.tmp_morale -= result * 20;
                }
                if seen {
                    world.message(format!("{name} cowers."));
                }
            } else {
                note = Some(" is unaffected!");
                world.learn_traits(id, race.traits & RaceTraits::NO_FEAR);
                alerting = false;
            }
            dam = 0;
        }

        DamageType::Light => {
            if world.grid.has_info(c, CellFlags::VIEW) && race.is(RaceTraits::HURT_LITE) {
                if let Some(m) = world.monsters.get_mut(id) {
                    m.stunned = (m.stunned + dam).min(MAX_CONDITION);
                }
                note = Some(" cringes from the light!");
                world.learn_traits(id, RaceTraits::HURT_LITE);
            }
            alerting = false;
            dam = 0;
        }

        DamageType::KillWall => {
            if race.is(RaceTraits::STONE) {
                if skill_check(world, Actor::Player, dif, con * 2, Actor::Monster(id)) > 0 {
                    note = Some(" partly shatters!");
                    note_dies = " shatters!";
                } else {
                    note = Some(" resists!");
                    dam = 0;
                }
                world.learn_traits(id, RaceTraits::STONE);
            } else {
                dam = 0;
                alerting = false;
            }
        }

        DamageType::AwayAll => {
            let depth = world.player.depth;
            if depth != 0 && depth != world.options.morgoth_depth && teleport_away(world, id, 50) && seen {
                note = Some(" disappears!");
            }
            dam = 0;
        }

        _ => return hit,
    }

    hit.noticed = seen;

    if fx.stun > 0 {
        if race.is(RaceTraits::NO_STUN) {
            note = Some(" is unaffected!");
            world.learn_traits(id, RaceTraits::NO_STUN);
        } else if let Some(m) = world.monsters.get_mut(id) {
            note = Some(if m.stunned > 0 { " is more dazed." } else { " is dazed." });
            m.stunned = (m.stunned + fx.stun).min(MAX_CONDITION);
        }
    }
    if fx.conf > 0 {
        if let Some(m) = world.monsters.get_mut(id) {
            note = Some(if m.confused > 0 { " looks more confused." } else { " looks confused." });
            m.confused = (m.confused + fx.conf).min(MAX_CONDITION);
        }
    }
    if fx.slow > 0 {
        if let Some(m) = world.monsters.get_mut(id) {
            note = Some(" starts moving slower.");
            m.slowed = (m.slowed + fx.slow).min(MAX_CONDITION);
        }
    }
    if fx.haste > 0 {
        if let Some(m) = world.monsters.get_mut(id) {
            note = Some(" starts moving faster.");
            m.hasted = (m.hasted + fx.haste).min(MAX_CONDITION);
        }
    }

    let Some(m) = world.monsters.get(id) else { return hit };
    if dam > m.hp {
        note = Some(note_dies);
    }
    debug!(monster = %race.name, %typ, dam, "projection hits monster");

    if source == Actor::Player {
        let death_note = if seen { note_dies } else { "" };
        if mon_take_hit(world, id, dam, Some(death_note), true) {
            hit.unseen_death = !seen;
            return hit;
        }
        if alerting && dam == 0 {
            make_alert(world, id);
        }
        show_note(world, id, &name, seen, note, dam);
    } else {
        let Some(m) = world.monsters.get_mut(id) else { return hit };
        m.hp -= dam;
        if m.hp <= 0 {
            if seen {
                world.message(format!("{name}{note_dies}"));
            } else {
                hit.unseen_death = true;
            }
            monster_death(world, id);
            world.delete_monster(id);
            return hit;
        }
        if alerting {
            make_alert(world, id);
        }
        show_note(world, id, &name, seen, note, dam);
    }

    if fx.sleep > 0 {
        if let Some(alertness) = world.monsters.get(id).map(|m| m.alertness) {
            set_alertness(world, id, alertness - fx.sleep);
        }
    }
    hit
}

fn show_note(world: &mut World, id: MonsterId, name: &str, seen: bool, note: Option<&str>, dam: i32) {
    match note {
        Some(note) if seen => {
            world.message(format!("{name}{note}"));
        }
        _ if dam > 0 => message_pain(world, id, dam),
        _ => {}
    }
}

/// Teleport a monster to a random empty floor grid roughly `dis` away.
/// The search widens if nothing suitable is found.
pub fn teleport_away(world: &mut World, id: MonsterId, dis: i32) -> bool {
    let Some(from) = world.monsters.get(id).map(|m| m.pos) else { return false };
    let mut dis = dis.max(1);
    let mut min = dis / 2;
    let (height, width) = (world.grid.height(), world.grid.width());

    let mut found = None;
    'search: for _ in 0..8 {
        for _ in 0..500 {
            let y = world.rng.rand_range((from.y - dis).max(0), (from.y + dis).min(height - 1));
            let x = world.rng.rand_range((from.x - dis).max(0), (from.x + dis).min(width - 1));
            let c = Coord::new(y, x);
            let d = distance(from, c);
            if d < min || d > dis || !world.grid.in_bounds_fully(c) {
                continue;
            }
            if !world.grid.is_floor(c)
                || !world.grid.occupant(c).is_empty()
                || world.grid.feat(c) == Feature::Glyph
                || world.grid.feat(c) == Feature::Chasm
            {
                continue;
            }
            found = Some(c);
            break 'search;
        }
        dis *= 2;
        min /= 2;
    }

    let Some(to) = found else { return false };
    if let Some(m) = world.monsters.get_mut(id) {
        m.target = None;
    }
    world.monster_swap(from, to);
    debug!(from = %from, to = %to, "monster teleported");
    true
}
