//! Monster melee
//!
//! A monster attacks with its first blow, or now and then its second.
//! Hits are resolved like the player's: attack against evasion, critical
//! dice, then the player's armour. The blow's effect follows.

#[cfg(not(feature = "std"))]
use crate::compat::*;

use tracing::trace;

use super::damage::{dec_stat, element_damage, elem_bonus, protection_roll, take_hit};
use super::melee::{AttackType, attack_punctuation, knock_back, py_attack_aux, unasked};
use super::modifiers::{CritTarget, crit_bonus, total_monster_attack, total_player_evasion};
use super::skill::{Actor, Affliction, allow_player, hit_roll, saving_throw, skill_check};
use crate::dungeon::{Direction, distance};
use crate::magic::DamageType;
use crate::monster::{BlowEffect, BlowMethod, MonsterId, RaceFlags};
use crate::player::{Abilities, Skill, Stat, Timed};
use crate::world::World;

/// Is the monster charging? It must have moved towards the player last
/// turn and not be slowed below normal speed.
pub fn monster_charge(world: &World, id: MonsterId) -> bool {
    let Some(m) = world.monsters.get(id) else { return false };
    let p = world.player.pos;
    if distance(m.pos, p) > 1 {
        return false;
    }
    let mut speed = m.race.speed;
    if m.slowed > 0 {
        speed -= 1;
    }
    if !m.race.has(RaceFlags::CHARGE) || speed < 2 {
        return false;
    }
    let dir = Direction::from_delta(p.y - m.pos.y, p.x - m.pos.x);
    (-1..=1).any(|i| m.previous_action[1] == dir.rotate(i).keypad())
}

/// Does a critical hit also cut or stun? Wounding and battering blows
/// do so far more often.
pub fn monster_cut_or_stun(world: &mut World, crit_dice: i32, net_dam: i32, effect: BlowEffect) -> bool {
    if net_dam <= 0 {
        return false;
    }
    if matches!(effect, BlowEffect::Wound | BlowEffect::Batter) || world.rng.one_in(10) {
        crit_dice >= world.rng.die(2)
    } else {
        false
    }
}

const fn stat_loss(effect: BlowEffect) -> Option<Stat> {
    match effect {
        BlowEffect::LoseStr => Some(Stat::Str),
        BlowEffect::LoseDex => Some(Stat::Dex),
        BlowEffect::LoseCon => Some(Stat::Con),
        BlowEffect::LoseGra => Some(Stat::Gra),
        _ => None,
    }
}

const fn stat_loss_feeling(stat: Stat) -> &'static str {
    match stat {
        Stat::Str => "weak",
        Stat::Dex => "clumsy",
        Stat::Con => "sickly",
        Stat::Gra => "less graceful",
    }
}

/// Inflict a condition, unless the player's saving throw succeeds
fn afflict(world: &mut World, id: MonsterId, affliction: Affliction, timed: Timed, amount: i32, resisted: &str) {
    if allow_player(world, affliction, Some(id)) {
        world.inc_timed(timed, amount);
    } else {
        world.message(resisted);
    }
}

/// The side effects of a blow that landed
fn apply_effect(world: &mut World, id: MonsterId, effect: BlowEffect, dam: i32, net_dam: i32, killer: &str) {
    // armour that absorbs the whole blow also stops its side effects
    let lands = net_dam > 0 || dam == 0;
    match effect {
        BlowEffect::Hurt | BlowEffect::Wound | BlowEffect::Batter | BlowEffect::Shatter => {
            take_hit(world, net_dam, killer);
        }
        BlowEffect::Acid => {
            world.message("You are covered in acid!");
            element_damage(world, DamageType::Acid, net_dam, killer);
        }
        BlowEffect::Elec => {
            if net_dam > 0 {
                world.message("You are struck by electricity!");
            }
            element_damage(world, DamageType::Elec, net_dam, killer);
        }
        BlowEffect::Fire => {
            if net_dam > 0 {
                world.message("You are enveloped in flames!");
            }
            element_damage(world, DamageType::Fire, net_dam, killer);
        }
        BlowEffect::Cold => {
            if net_dam > 0 {
                world.message("You are covered with frost!");
            }
            element_damage(world, DamageType::Cold, net_dam, killer);
        }
        BlowEffect::Dark => element_damage(world, DamageType::Dark, net_dam, killer),
        BlowEffect::Poison => element_damage(world, DamageType::Pois, net_dam, killer),
        BlowEffect::Blind => {
            take_hit(world, net_dam, killer);
            if lands {
                if allow_player(world, Affliction::Blindness, Some(id)) {
                    let amount = world.rng.damroll(5, 4);
                    world.inc_timed(Timed::Blind, amount);
                } else if !world.player.is(Timed::Blind) {
                    world.message("Your vision quickly clears.");
                }
            }
        }
        BlowEffect::Confuse => {
            take_hit(world, net_dam, killer);
            if lands {
                let amount = world.rng.damroll(2, 4);
                afflict(world, id, Affliction::Confusion, Timed::Confused, amount, "You resist the effects.");
            }
        }
        BlowEffect::Terrify => {
            take_hit(world, net_dam, killer);
            let amount = world.rng.damroll(2, 4);
            afflict(world, id, Affliction::Fear, Timed::Afraid, amount, "You stand your ground!");
        }
        BlowEffect::Entrance => {
            take_hit(world, net_dam, killer);
            if lands {
                if !allow_player(world, Affliction::Entrancement, Some(id)) {
                    world.message("You are unaffected!");
                } else if !world.player.is(Timed::Entranced) && !world.player.timed.was_entranced {
                    let amount = world.rng.damroll(4, 4);
                    world.set_timed(Timed::Entranced, amount);
                }
            }
        }
        BlowEffect::Slow => {
            take_hit(world, net_dam, killer);
            if lands {
                let amount = world.rng.damroll(2, 4);
                afflict(world, id, Affliction::Slowness, Timed::Slow, amount, "You resist the effects!");
            }
        }
        BlowEffect::Hallu => {
            take_hit(world, net_dam, killer);
            if lands {
                let amount = world.rng.damroll(10, 4);
                afflict(world, id, Affliction::Hallucination, Timed::Image, amount, "You resist the effects.");
            }
        }
        BlowEffect::LoseStr | BlowEffect::LoseDex | BlowEffect::LoseCon | BlowEffect::LoseGra => {
            take_hit(world, net_dam, killer);
            if let Some(stat) = stat_loss(effect).filter(|_| lands && !world.player.is_dead) {
                let feeling = stat_loss_feeling(stat);
                if saving_throw(world, Some(id), 0) {
                    world.message(format!("You feel {feeling} for a moment, but it passes."));
                } else {
                    dec_stat(world, stat, 1);
                    world.message(format!("You feel {feeling}."));
                }
            }
        }
    }
}

/// The earthquake warning when a shattering blow only just misses
fn shatter_near_miss(world: &mut World, id: MonsterId) {
    let Some(m) = world.monsters.get(id) else { return };
    let race = m.race.clone();
    let name = world.monster_name_cap(id);
    world.message(format!("{name} just misses you."));
    if race.has(RaceFlags::FEMALE) {
        world.message("Her blow slams into the floor where you stood, and the ground shakes violently!");
    } else if race.has(RaceFlags::MALE) {
        world.message("You leap aside as his great hammer slams into the floor.");
        world.message("The ground shakes violently with the force of the blow!");
    } else {
        world.message("You leap aside as its stony fist slams into the floor.");
        world.message("The ground shakes violently with the force of the blow!");
    }
}

/// Attack the player in melee. Returns false if the monster has no way
/// to attack.
pub fn make_attack_normal(world: &mut World, id: MonsterId) -> bool {
    let Some(m) = world.monsters.get(id) else { return false };
    let race = m.race.clone();
    if race.has(RaceFlags::NEVER_BLOW) || race.blows.is_empty() {
        return false;
    }
    let visible = m.ml;
    let m_pos = m.pos;
    let name = m.desc_cap();
    let killer = m.killer_desc();

    world.player.was_attacked = true;

    // the alternate blow is used one time in three
    let b = if race.blows.len() > 1 && world.rng.one_in(3) { 1 } else { 0 };
    let blow = race.blows[b];
    let mut ds = blow.ds;
    let mut attack_mod = total_monster_attack(world, id, blow.att);
    let charging = monster_charge(world, id);
    if charging {
        attack_mod += 3;
        ds += 3;
    }
    let evasion = total_player_evasion(world, id, false);

    let hit_result = if blow.method == BlowMethod::Spore {
        1
    } else {
        hit_roll(world, attack_mod, evasion, Actor::Monster(id), Actor::Player)
    };

    let mut dam = 0;
    if hit_result > 0 {
        world.disturb();

        let (mut verb, mut do_cut, mut do_stun) = blow.method.describe();
        let no_crit = blow.method.ignores_armour();
        let prt_percent = if blow.method.ignores_armour() { 0 } else { 100 };

        let crit_dice = if no_crit {
            0
        } else {
            crit_bonus(world, hit_result, 20 * blow.dd, CritTarget::Player, Skill::Melee, false)
        };
        let elem_dice = elem_bonus(world, blow.effect);
        dam = world.rng.damroll(blow.dd + crit_dice + elem_dice, ds);
        let prt = protection_roll(world, DamageType::Hurt, true) * prt_percent / 100;
        let net_dam = (dam - prt).max(0);

        if blow.method == BlowMethod::Hit && blow.effect == BlowEffect::Batter {
            verb = "batters you";
        }
        if charging {
            world.learn_flags(id, RaceFlags::CHARGE);
            verb = "charges you";
        }
        let punctuation = attack_punctuation(net_dam, crit_dice);
        world.message(format!("{name} {verb}{punctuation}"));
        trace!(monster = %name, dam, net_dam, crit_dice, "monster blow landed");

        match blow.effect {
            BlowEffect::Wound => {
                if do_stun && !world.rng.one_in(5) {
                    do_stun = false;
                }
                do_cut = true;
            }
            BlowEffect::Batter | BlowEffect::Shatter => {
                if do_cut && !world.rng.one_in(5) {
                    do_cut = false;
                }
                do_stun = true;
            }
            _ => {}
        }

        apply_effect(world, id, blow.effect, dam, net_dam, &killer);

        if world.player.is_dead {
            let lore = world.lore.entry(&race.name);
            lore.deaths = lore.deaths.saturating_add(1);
            if visible {
                world.lore.saw_blow(&race.name, b);
            }
            return true;
        }

        if do_cut && do_stun {
            if world.rng.coin() {
                do_cut = false;
            } else {
                do_stun = false;
            }
        }
        if do_cut && monster_cut_or_stun(world, crit_dice, net_dam, blow.effect) {
            world.inc_timed(Timed::Cut, net_dam / 2);
        }
        if do_stun
            && monster_cut_or_stun(world, crit_dice, net_dam, blow.effect)
            && allow_player(world, Affliction::Stun, None)
        {
            world.inc_timed(Timed::Stun, net_dam);
        }

        if race.has(RaceFlags::CRUEL_BLOW) && crit_dice >= 1 && net_dam > 0 {
            let difficulty = world.player.skill(Skill::Will) + world.player.resist_confu * 10;
            if skill_check(world, Actor::Monster(id), crit_dice * 4, difficulty, Actor::Player) > 0 {
                world.learn_flags(id, RaceFlags::CRUEL_BLOW);
                world.message("You reel in pain!");
                world.inc_timed(Timed::Confused, crit_dice);
            }
        }

        // only the main blow knocks back, so bites don't
        if race.has(RaceFlags::KNOCK_BACK) && b == 0 {
            let strength = world.monsters.get(id).map(|m| m.stat(Stat::Str)).unwrap_or(0);
            let con = world.player.stat(Stat::Con);
            if skill_check(world, Actor::Monster(id), strength * 2, con * 2, Actor::Player) > 0 {
                let p = world.player.pos;
                knock_back(world, m_pos, p);
                world.learn_flags(id, RaceFlags::KNOCK_BACK);
            }
        }

        let cowardice = world.player.cowardice;
        if cowardice > 0
            && net_dam >= 10 / cowardice
            && !world.player.is(Timed::Afraid)
            && allow_player(world, Affliction::Fear, Some(id))
        {
            let fear = world.rng.damroll(10, 4);
            let haste = world.rng.damroll(5, 4);
            world.inc_timed(Timed::Afraid, fear);
            world.inc_timed(Timed::Fast, haste);
        }
    } else if visible && !world.player.is(Timed::Confused) && blow.method.can_miss_visibly() {
        world.disturb();
        if blow.effect == BlowEffect::Shatter && hit_result > -3 {
            shatter_near_miss(world, id);
        } else {
            world.message(format!("{name} misses you."));
            let p = &world.player;
            let weight = p.weapon().map(|w| w.weight).unwrap_or(0);
            if p.has(Abilities::EVN_RIPOSTE)
                && p.ripostes < 1
                && !p.is(Timed::Afraid)
                && !p.is(Timed::Confused)
                && !p.is(Timed::Entranced)
                && p.timed(Timed::Stun) <= 100
                && hit_result <= -10 - (weight + 9) / 10
            {
                world.message("You riposte!");
                world.player.ripostes += 1;
                py_attack_aux(world, m_pos, AttackType::Riposte, &mut unasked);
            }
        }
    }

    if visible && (hit_result > 0 || dam > 0 || world.lore.get(&race.name).is_some_and(|l| l.blows.get(b).is_some_and(|&n| n > 10))) {
        world.lore.saw_blow(&race.name, b);
    }
    true
}
