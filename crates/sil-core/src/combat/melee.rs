//! Player melee
//!
//! A melee attack is a run of blows against one monster. Each blow rolls
//! attack against evasion; a hit adds critical and slay dice, subtracts
//! the monster's protection and may knock the monster back. The run ends
//! early when the monster dies or is moved out of reach. Free attacks
//! (zone of control, opportunist, riposte, follow-through) are single
//! blows made outside the player's own turn.

#[cfg(not(feature = "std"))]
use crate::compat::*;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};
use tracing::debug;

use super::damage::{add_wrath, break_truce, mon_take_hit};
use super::modifiers::{
    CritTarget, crit_bonus, stealth_melee_bonus, total_monster_evasion, total_player_attack,
};
use super::monster_melee::make_attack_normal;
use super::skill::{Actor, hit_roll, skill_check};
use super::slay::{prt_after_sharpness, scare_onlooking_friends, slay_bonus};
use crate::action::{hit_trap, reveal_trap};
use crate::consts::{ACTION_MISC, ACTION_NOTHING, ALERTNESS_ALERT};
use crate::dungeon::{CellFlags, Coord, DDD, Direction, Feature, TrapKind, distance, rough_direction};
use crate::monster::{MonsterFlags, MonsterId, RaceFlags, RaceTraits, Stance, drop_iron_crown, make_alert};
use crate::object::{Item, ItemFlags};
use crate::player::{Abilities, Skill, Song, Stat, Timed};
use crate::world::World;

/// Why a blow is being struck
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
)]
#[repr(u8)]
pub enum AttackType {
    #[default]
    Main,
    /// Moving from one grid beside the monster to another
    Flanking,
    /// Stepping away after standing still
    ControlledRetreat,
    /// Carrying on after a kill
    FollowThrough,
    Whirlwind,
    Rage,
    ZoneOfControl,
    Opportunist,
    Riposte,
}

impl AttackType {
    /// Attacks made in the player's own turn get every blow
    pub const fn on_own_turn(self) -> bool {
        matches!(self, AttackType::Main | AttackType::Flanking | AttackType::ControlledRetreat)
    }
}

/// "..." for no damage, "." for a plain hit, one "!" per critical die
pub fn attack_punctuation(net_dam: i32, crit_dice: i32) -> String {
    if net_dam == 0 {
        "...".to_string()
    } else if crit_dice <= 0 {
        ".".to_string()
    } else {
        "!".repeat(crit_dice.min(20) as usize)
    }
}

/// Is an attack on the monster at `target` a charge? The player must
/// have moved towards it last turn, at a decent speed.
pub fn valid_charge(world: &World, target: Coord, attack: AttackType) -> bool {
    let p = &world.player;
    if !p.has(Abilities::MEL_CHARGE) || p.speed <= 1 || !attack.on_own_turn() {
        return false;
    }
    let dir = Direction::from_delta(target.y - p.pos.y, target.x - p.pos.x);
    (-1..=1).any(|i| p.previous_action[1] == dir.rotate(i).keypad())
}

/// The answer to every question put during attacks outside the player's
/// own turn: with no one to ask, the player holds back
pub fn unasked(_question: &str) -> bool {
    false
}

/// After a kill, swing at the next visible monster around the player
pub fn possible_follow_through(
    world: &mut World,
    target: Coord,
    attack: AttackType,
    confirm: &mut dyn FnMut(&str) -> bool,
) {
    let p = &world.player;
    let eligible = matches!(
        attack,
        AttackType::Main
            | AttackType::Flanking
            | AttackType::ControlledRetreat
            | AttackType::FollowThrough
    );
    if !p.has(Abilities::MEL_FOLLOW_THROUGH) || p.is(Timed::Confused) || !eligible {
        return;
    }
    let dir = Direction::from_delta(target.y - p.pos.y, target.x - p.pos.x);
    for i in 1..8 {
        let c = world.player.pos.step(dir.rotate(i));
        let Some(id) = world.grid.monster_at(c) else { continue };
        if willing_to_attack(world, id) {
            world.message("You continue your attack!");
            py_attack_aux(world, c, AttackType::FollowThrough, confirm);
            return;
        }
    }
}

/// A visible monster the player's options allow attacking
fn willing_to_attack(world: &World, id: MonsterId) -> bool {
    world.monsters.get(id).is_some_and(|m| {
        m.ml && (!world.options.forgo_attacking_unwary || m.alertness >= ALERTNESS_ALERT)
    })
}

/// Push whatever stands at `to` one grid further from `from`, or to one
/// side if the way straight back is blocked. Knocked-back creatures lose
/// their next turn; a knocked-back player lands noisily and may fall into
/// a trap.
pub fn knock_back(world: &mut World, from: Coord, to: Coord) -> bool {
    let dir = rough_direction(from, to);
    let open = |world: &World, c: Coord| world.grid.is_floor(c) && world.grid.occupant(c).is_empty();

    let mut dest = None;
    let straight = to.step(dir);
    if open(world, straight) {
        dest = Some(straight);
    } else {
        let first = if world.rng.coin() { -1 } else { 1 };
        for turn in [first, -first] {
            let c = to.step(dir.rotate(turn));
            if open(world, c) {
                dest = Some(c);
                break;
            }
        }
    }
    let Some(dest) = dest else { return false };

    match world.grid.monster_at(to) {
        Some(id) => {
            if let Some(m) = world.monsters.get_mut(id) {
                m.skip_next_turn = true;
            }
            world.monster_swap(to, dest);
        }
        None => {
            world.message("You are knocked back.");
            world.player.skip_next_turn = true;
            world.monster_swap(to, dest);
            world.player.leaping = false;
            world.player.stealth_score -= 5;
            let here = world.player.pos;
            if world.grid.feat(here).trap().is_some() || world.grid.feat(here) == Feature::Chasm {
                if world.grid.has_info(here, CellFlags::HIDDEN) {
                    reveal_trap(world, here);
                }
                hit_trap(world, here);
            }
        }
    }
    true
}

/// Learn a weapon's properties by seeing them work
fn ident_weapon_by_use(world: &mut World, off_hand: bool, flag: ItemFlags) {
    let slot = if off_hand {
        world.player.equipment.off_hand.as_mut()
    } else {
        world.player.equipment.weapon.as_mut()
    };
    let Some(item) = slot else { return };
    if item.known {
        return;
    }
    item.known = true;
    let name = item.name.clone();
    debug!(weapon = %name, ?flag, "weapon identified by use");
    world.message(format!("You recognise your {name}."));
}

/// Strength behind a blow for knocking back, capped by the weapon's weight
fn effective_strength(world: &World, weapon_weight: i32, charge: bool, rapid: bool, off_hand: bool) -> i32 {
    let p = &world.player;
    let mut strength = p.stat(Stat::Str);
    if charge {
        strength += 3;
    }
    if rapid {
        strength -= 3;
    }
    if off_hand {
        strength -= 3;
    }
    let cap = (weapon_weight / 10).max(0);
    strength = strength.clamp(-cap, cap);
    if p.two_handed_melee() {
        strength += 2;
    }
    strength
}

/// Fear and second thoughts. Each warning that applies (a `!a`
/// inscription, the truce, bare hands, a shovel) is put to `confirm`, and
/// any refusal calls the attack off.
fn attack_confirmed(world: &mut World, id: MonsterId, confirm: &mut dyn FnMut(&str) -> bool) -> bool {
    if world.player.is(Timed::Afraid) {
        let name = world.monster_name(id);
        world.message(format!("You are too afraid to attack {name}!"));
        return false;
    }

    let p = &world.player;
    let weapon = p.weapon();
    let mut questions = Vec::new();
    if !p.truce {
        let marks = weapon.map_or(0, Item::attack_warnings);
        questions.extend(core::iter::repeat_n("Are you sure you wish to attack? ", marks));
    }
    if p.truce {
        questions.push("Are you sure you wish to attack? ");
    }
    if weapon.is_none_or(|w| w.weight == 0) {
        questions.push("Are you sure you wish to attack with no weapon? ");
    }
    if weapon.is_some_and(Item::is_shovel) {
        questions.push("Are you sure you wish to attack with your shovel? ");
    }
    // every warning is put, even after one is turned down
    questions.into_iter().fold(true, |go_on, q| confirm(q) && go_on)
}

/// Attack the monster at `target` with every blow the attack allows.
/// `confirm` answers the warnings given before the first blow.
///
/// Returns false if the player could not bring themselves to attack, in
/// which case no time passes unless they already attacked this turn.
pub fn py_attack_aux(
    world: &mut World,
    target: Coord,
    attack: AttackType,
    confirm: &mut dyn FnMut(&str) -> bool,
) -> bool {
    let Some(id) = world.grid.monster_at(target) else { return false };
    let Some(m) = world.monsters.get(id) else { return false };
    let race = m.race.clone();
    let visible = m.ml;
    world.disturb();
    if visible {
        world.player.target = Some(id);
    }

    if !attack_confirmed(world, id, confirm) {
        if !world.player.attacked {
            world.player.previous_action[0] = ACTION_NOTHING;
        }
        debug!(?attack, "attack called off");
        return false;
    }

    let main_weapon: Option<Item> = world.player.weapon().cloned();
    let mut weapon = main_weapon.clone();
    // bare hands count as a four pound weapon for criticals
    let mut weapon_weight = weapon.as_ref().map(|w| w.weight).filter(|&w| w > 0).unwrap_or(40);
    let mut mdd = world.player.mdd;
    let mut mds = world.player.mds;
    let mut attack_mod = world.player.skill(Skill::Melee);
    world.player.attacked = true;

    let mut blows = world.player.blows();
    let mut rapid = world.player.has(Abilities::MEL_RAPID_ATTACK);
    if !attack.on_own_turn() {
        blows = 1;
        mds = world.player.strength_modified_ds(main_weapon.as_ref(), 0);
        if rapid {
            rapid = false;
            attack_mod += 3;
        }
    }

    let mut charge = false;
    let mut off_hand = false;
    let mut monster_ripostes = 0;

    for num in 1..=blows {
        let mut do_knock_back = false;
        let mut knocked = false;

        if charge {
            charge = false;
            attack_mod -= 3;
            mds = world.player.mds;
        }

        if num == blows && num != 1 && world.player.mds2 > 0 {
            off_hand = true;
            rapid = false;
            attack_mod += world.player.offhand_mel_mod;
            mdd = world.player.mdd2;
            mds = world.player.mds2;
            weapon = world.player.equipment.off_hand_weapon().cloned();
            weapon_weight = weapon.as_ref().map(|w| w.weight).unwrap_or(weapon_weight);
        }

        if num == 1 && valid_charge(world, target, attack) {
            let str_adjustment = if rapid { 0 } else { 3 };
            charge = true;
            attack_mod += 3;
            mds = world.player.strength_modified_ds(weapon.as_ref(), str_adjustment);
        }

        let Some(m) = world.monsters.get(id) else { break };
        let stealth_bonus = if attack.on_own_turn() && !charge { stealth_melee_bonus(world, m) } else { 0 };
        let name = world.monster_name(id);

        let total_attack = total_player_attack(world, id, attack_mod + stealth_bonus);
        let total_evasion = total_monster_evasion(world, id, false);
        let hit_result = hit_roll(world, total_attack, total_evasion, Actor::Player, Actor::Monster(id));

        if hit_result > 0 {
            if let Some(m) = world.monsters.get_mut(id) {
                m.flags |= MonsterFlags::HIT_BY_MELEE;
                if charge {
                    m.flags |= MonsterFlags::CHARGED;
                }
            }

            let crit_dice = crit_bonus(world, hit_result, weapon_weight, CritTarget::Monster(&race), Skill::Melee, false);
            let slay = match &weapon {
                Some(w) => slay_bonus(world, w, id),
                None => Default::default(),
            };
            let total_dice = mdd + slay.dice + crit_dice;
            let dam = world.rng.damroll(total_dice, mds);
            let mut prt = world.rng.damroll(race.pd, race.ps);
            let (prt_percent, sharp_noticed) = match &weapon {
                Some(w) => prt_after_sharpness(world, w),
                None => (100, None),
            };
            prt = prt * prt_percent / 100;
            let net_dam = (dam - prt).max(0);

            let punctuation = attack_punctuation(net_dam, crit_dice);
            if stealth_bonus > 0 {
                world.message(format!("You stealthily attack {name}{punctuation}"));
            } else if charge {
                world.message(format!("You charge {name}{punctuation}"));
            } else {
                world.message(format!("You hit {name}{punctuation}"));
            }

            let strength = effective_strength(world, weapon_weight, charge, rapid, off_hand);
            if world.player.has(Abilities::MEL_KNOCK_BACK)
                && attack != AttackType::Opportunist
                && !race.has(RaceFlags::NEVER_MOVE)
            {
                let con = world.monsters.get(id).map(|m| m.stat(Stat::Con)).unwrap_or(0);
                if skill_check(world, Actor::Player, strength * 2, con * 2, Actor::Monster(id)) > 0 {
                    do_knock_back = true;
                }
            }

            let fatal = mon_take_hit(world, id, net_dam, None, true);

            if let Some(flag) = slay.noticed.or(sharp_noticed) {
                ident_weapon_by_use(world, off_hand, flag);
            }

            if fatal {
                if weapon.as_ref().is_some_and(|w| w.has(ItemFlags::VAMPIRIC)) && !race.is_nonliving() {
                    world.player.hp_player(7);
                    ident_weapon_by_use(world, off_hand, ItemFlags::VAMPIRIC);
                }
                if world.player.singing(Song::Slaying) {
                    add_wrath(world);
                }
                possible_follow_through(world, target, attack, confirm);
                break;
            }

            if do_knock_back {
                knocked = knock_back(world, world.player.pos, target);
            }

            if race.is_morgoth() && !world.crown_dropped && net_dam >= 10 {
                match world.player.morgoth_hits {
                    0 => {
                        world.message("The force of your blow knocks the Iron Crown off balance.");
                        world.player.morgoth_hits += 1;
                    }
                    1 => {
                        drop_iron_crown(
                            world,
                            id,
                            "You knock his crown from off his brow, and it falls to the ground nearby.",
                        );
                        world.player.morgoth_hits += 1;
                    }
                    _ => {}
                }
            }

            if world.player.has(Abilities::STL_CRUEL_BLOW)
                && crit_dice > 0
                && net_dam > 0
                && !race.has(RaceFlags::RES_CRIT)
            {
                let will = world.monsters.get(id).map(|m| m.skill(Skill::Will)).unwrap_or(0);
                if skill_check(world, Actor::Player, crit_dice * 4, will, Actor::Monster(id)) > 0 {
                    let name = world.monster_name_cap(id);
                    world.message(format!("{name} reels in pain!"));
                    if !race.is(RaceTraits::NO_CONF) {
                        if let Some(m) = world.monsters.get_mut(id) {
                            // one turn wears off straight away
                            m.confused += crit_dice + 1;
                        }
                    }
                    scare_onlooking_friends(world, id, -20);
                }
            }
        } else {
            world.message(format!("You miss {name}."));

            match world.grid.feat(world.player.pos).trap() {
                Some(TrapKind::Pit | TrapKind::SpikedPit) if world.rng.one_in(3) => {
                    world.message("(It is very hard to dodge or attack from within a pit.)");
                }
                Some(TrapKind::Web) if world.rng.one_in(3) => {
                    world.message("(It is very hard to dodge or attack from within a web.)");
                }
                _ => {}
            }

            let Some(m) = world.monsters.get(id) else { break };
            let riposte_margin = -10 - 2 * race.blows.first().map(|b| b.dd).unwrap_or(0);
            if race.has(RaceFlags::RIPOSTE)
                && monster_ripostes == 0
                && m.confused == 0
                && m.stance != Stance::Fleeing
                && !m.skip_this_turn
                && !m.skip_next_turn
                && hit_result <= riposte_margin
            {
                let name = world.monster_name_cap(id);
                world.message(format!("{name} ripostes!"));
                make_attack_normal(world, id);
                monster_ripostes += 1;
            }
        }

        make_alert(world, id);

        if knocked || world.player.is_dead {
            break;
        }
    }

    break_truce(world, false);
    true
}

/// Can the player swing at everything around them? Needs open ground on
/// all sides.
pub fn whirlwind_possible(world: &World) -> bool {
    world.player.has(Abilities::MEL_WHIRLWIND_ATTACK)
        && world.player.pos.neighbours().all(|c| world.grid.is_floor(c))
}

/// Monsters next to a grid, seen or not
pub fn adj_mon_count(world: &World, c: Coord) -> usize {
    c.neighbours()
        .filter(|&n| world.grid.in_bounds(n))
        .filter_map(|n| world.grid.monster_at(n))
        .filter(|&id| world.monsters.get(id).is_some())
        .count()
}

/// Attack the monster at `target`, or everything adjacent when raging or
/// able to whirlwind with more than one foe in reach
pub fn py_attack(
    world: &mut World,
    target: Coord,
    attack: AttackType,
    confirm: &mut dyn FnMut(&str) -> bool,
) -> bool {
    world.player.previous_action[0] = ACTION_MISC;

    let raging = world.player.is(Timed::Rage);
    let sweep = (raging || whirlwind_possible(world))
        && adj_mon_count(world, world.player.pos) > 1
        && !world.player.is(Timed::Afraid);
    if !sweep {
        return py_attack_aux(world, target, attack, confirm);
    }

    if raging {
        world.message("You strike out at everything around you!");
    }
    let pos = world.player.pos;
    let dir = Direction::from_delta(target.y - pos.y, target.x - pos.x);
    let step = if world.rng.coin() { 1 } else { -1 };
    for i in 0..8 {
        let c = pos.step(dir.rotate(i * step));
        let Some(id) = world.grid.monster_at(c) else { continue };
        if raging {
            py_attack_aux(world, c, AttackType::Rage, confirm);
        } else if i == 0 || willing_to_attack(world, id) {
            py_attack_aux(world, c, AttackType::Whirlwind, confirm);
        }
        if world.player.is_dead {
            break;
        }
    }
    world.player.attacked
}

/// Free attacks for the player stepping to `to`: flanking keeps the
/// monster adjacent, a controlled retreat steps away after standing still.
/// The current target is preferred; otherwise a random adjacent monster.
pub fn flanking_or_retreat(world: &mut World, to: Coord, confirm: &mut dyn FnMut(&str) -> bool) {
    let p = &world.player;
    let flanking = p.has(Abilities::EVN_FLANKING);
    let stood_still = p.previous_action[1] > 9 || p.previous_action[1] == 5;
    let controlled_retreat = p.has(Abilities::EVN_CONTROLLED_RETREAT) && stood_still;
    if p.is(Timed::Confused) || p.is(Timed::Afraid) || p.truce || !(flanking || controlled_retreat) {
        return;
    }
    let from = p.pos;

    let mut try_attack = |world: &mut World, c: Coord| -> bool {
        let Some(id) = world.grid.monster_at(c) else { return false };
        if !willing_to_attack(world, id) || distance(from, c) != 1 {
            return false;
        }
        let after = distance(to, c);
        if flanking && after == 1 {
            py_attack(world, c, AttackType::Flanking, &mut *confirm);
            return true;
        }
        if controlled_retreat && after > 1 {
            py_attack(world, c, AttackType::ControlledRetreat, &mut *confirm);
            return true;
        }
        false
    };

    let target = world.player.target.and_then(|id| world.monsters.get(id)).map(|m| m.pos);
    if let Some(c) = target {
        if try_attack(world, c) {
            return;
        }
    }

    let start = world.rng.rand_int(8) as usize;
    for d in start..start + 8 {
        let c = from.step(DDD[d % 8]);
        if !world.grid.in_bounds(c) {
            continue;
        }
        if try_attack(world, c) {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ItemKind;
    use crate::world::testing::arena;

    fn yes(_: &str) -> bool {
        true
    }

    fn armed(world: &mut World) {
        world.player.skill_base[Skill::Melee.index()] = 30;
        world.player.equipment.weapon = Some(Item::weapon("Long Sword", ItemKind::Sword, 30, 0, 2, 5));
        world.player.calc_bonuses();
    }

    #[test]
    fn test_punctuation() {
        assert_eq!(attack_punctuation(0, 3), "...");
        assert_eq!(attack_punctuation(5, 0), ".");
        assert_eq!(attack_punctuation(5, 3), "!!!");
        assert_eq!(attack_punctuation(5, 40).len(), 20);
    }

    #[test]
    fn test_attack_only_main_kinds_on_own_turn() {
        assert!(AttackType::Main.on_own_turn());
        assert!(AttackType::Flanking.on_own_turn());
        assert!(!AttackType::Riposte.on_own_turn());
        assert!(!AttackType::ZoneOfControl.on_own_turn());
    }

    #[test]
    fn test_charge_needs_approach() {
        let mut world = arena();
        world.player.abilities |= Abilities::MEL_CHARGE;
        let target = world.player.pos.offset(0, 1);
        world.player.push_action(6);
        world.player.push_action(ACTION_MISC);
        assert!(valid_charge(&world, target, AttackType::Main));
        assert!(!valid_charge(&world, target, AttackType::Opportunist));
        world.player.previous_action[1] = 4;
        assert!(!valid_charge(&world, target, AttackType::Main));
        world.player.previous_action[1] = 9;
        assert!(valid_charge(&world, target, AttackType::Main));
    }

    #[test]
    fn test_afraid_player_does_not_attack() {
        let mut world = arena();
        let c = world.player.pos.offset(0, 1);
        let id = world.place_monster("Snaga", c).unwrap();
        world.player.timed.set(Timed::Afraid, 5);
        assert!(!py_attack_aux(&mut world, c, AttackType::Main, &mut yes));
        assert_eq!(world.monsters.get(id).unwrap().hp, world.monsters.get(id).unwrap().maxhp);
        assert!(world.messages.iter().any(|m| m.contains("too afraid")));
    }

    #[test]
    fn test_attacks_alert_the_target() {
        let mut world = arena();
        armed(&mut world);
        let c = world.player.pos.offset(0, 1);
        let id = world.place_monster("Cave orc", c).unwrap();
        world.monsters.get_mut(id).unwrap().alertness = -15;
        py_attack_aux(&mut world, c, AttackType::Main, &mut yes);
        if let Some(m) = world.monsters.get(id) {
            assert!(m.alertness >= ALERTNESS_ALERT);
        }
        assert!(world.player.attacked);
    }

    #[test]
    fn test_strong_attacks_kill() {
        let mut world = arena();
        armed(&mut world);
        world.player.skill_base[Skill::Melee.index()] = 60;
        world.player.stat_base[Stat::Str.index()] = 10;
        world.player.calc_bonuses();
        let c = world.player.pos.offset(0, 1);
        let id = world.place_monster("Snaga", c).unwrap();
        for _ in 0..20 {
            if !world.monsters.contains(id) {
                break;
            }
            py_attack_aux(&mut world, c, AttackType::Main, &mut yes);
        }
        assert!(!world.monsters.contains(id));
        assert_eq!(world.lore.pkills("Snaga"), 1);
    }

    #[test]
    fn test_knock_back_moves_monster_and_costs_its_turn() {
        let mut world = arena();
        let p = world.player.pos;
        let c = p.offset(0, 1);
        let id = world.place_monster("Snaga", c).unwrap();
        assert!(knock_back(&mut world, p, c));
        let m = world.monsters.get(id).unwrap();
        assert_eq!(m.pos, p.offset(0, 2));
        assert!(m.skip_next_turn);
    }

    #[test]
    fn test_knock_back_blocked_by_walls() {
        let mut world = arena();
        // player against the east wall column, monster beyond is wall
        let p = Coord::new(2, 6);
        world.place_player(p).unwrap();
        let c = Coord::new(2, 7);
        world.place_monster("Snaga", c).unwrap();
        world.place_monster("Snaga", Coord::new(1, 7)).unwrap();
        world.place_monster("Snaga", Coord::new(3, 7)).unwrap();
        assert!(!knock_back(&mut world, p, c));
    }

    #[test]
    fn test_whirlwind_needs_open_ground() {
        let mut world = arena();
        world.player.abilities |= Abilities::MEL_WHIRLWIND_ATTACK;
        assert!(whirlwind_possible(&world));
        world.place_player(Coord::new(1, 1)).unwrap();
        assert!(!whirlwind_possible(&world));
    }

    #[test]
    fn test_adjacent_count_includes_unseen_monsters() {
        let mut world = arena();
        let p = world.player.pos;
        let a = world.place_monster("Snaga", p.offset(0, 1)).unwrap();
        world.place_monster("Snaga", p.offset(1, 0)).unwrap();
        world.place_monster("Snaga", p.offset(0, 3)).unwrap();
        assert_eq!(adj_mon_count(&world, p), 2);
        world.monsters.get_mut(a).unwrap().ml = false;
        assert_eq!(adj_mon_count(&world, p), 2);
    }

    #[test]
    fn test_rage_reaches_an_unseen_neighbour() {
        let mut world = arena();
        armed(&mut world);
        world.player.timed.set(Timed::Rage, 5);
        let p = world.player.pos;
        let seen = world.place_monster("Cave orc", p.offset(0, 1)).unwrap();
        let unseen = world.place_monster("Cave orc", p.offset(1, 0)).unwrap();
        for id in [seen, unseen] {
            world.monsters.get_mut(id).unwrap().alertness = -15;
        }
        world.monsters.get_mut(unseen).unwrap().ml = false;
        assert!(py_attack(&mut world, p.offset(0, 1), AttackType::Main, &mut yes));
        assert!(world.messages.iter().any(|m| m == "You strike out at everything around you!"));
        assert!(world.monsters.get(unseen).is_none_or(|m| m.alertness >= ALERTNESS_ALERT));
    }

    #[test]
    fn test_each_warning_is_put_before_calling_off() {
        let mut world = arena();
        world.player.truce = true;
        let c = world.player.pos.offset(0, 1);
        let id = world.place_monster("Snaga", c).unwrap();
        let mut asked = Vec::new();
        let mut refuse = |q: &str| {
            asked.push(q.to_string());
            false
        };
        assert!(!py_attack_aux(&mut world, c, AttackType::Main, &mut refuse));
        assert_eq!(
            asked,
            vec!["Are you sure you wish to attack? ", "Are you sure you wish to attack with no weapon? "]
        );
        assert!(!world.player.attacked);
        assert!(world.player.truce);
        assert_eq!(world.player.previous_action[0], ACTION_NOTHING);
        assert_eq!(world.monsters.get(id).unwrap().hp, world.monsters.get(id).unwrap().maxhp);
    }

    #[test]
    fn test_inscribed_weapon_asks_once_per_mark() {
        let mut world = arena();
        armed(&mut world);
        let sword = world.player.equipment.weapon.take().unwrap();
        world.player.equipment.weapon = Some(sword.inscribed("!a!a"));
        let c = world.player.pos.offset(0, 1);
        world.place_monster("Snaga", c).unwrap();
        let mut asked = 0;
        let mut refuse_second = |_: &str| {
            asked += 1;
            asked == 1
        };
        assert!(!py_attack_aux(&mut world, c, AttackType::Main, &mut refuse_second));
        assert_eq!(asked, 2);
        assert!(!world.player.attacked);
    }

    #[test]
    fn test_truce_silences_inscription_warnings() {
        let mut world = arena();
        armed(&mut world);
        world.player.truce = true;
        let sword = world.player.equipment.weapon.take().unwrap();
        world.player.equipment.weapon = Some(sword.inscribed("!a"));
        let c = world.player.pos.offset(0, 1);
        world.place_monster("Snaga", c).unwrap();
        let mut asked = Vec::new();
        let mut agree = |q: &str| {
            asked.push(q.to_string());
            true
        };
        assert!(py_attack_aux(&mut world, c, AttackType::Main, &mut agree));
        assert_eq!(asked, vec!["Are you sure you wish to attack? "]);
        assert!(world.player.attacked);
    }

    #[test]
    fn test_digging_with_a_shovel_asks_first() {
        let mut world = arena();
        world.player.equipment.weapon = Some(Item::weapon("Shovel", ItemKind::Digger, 60, 0, 1, 3));
        world.player.calc_bonuses();
        let c = world.player.pos.offset(0, 1);
        world.place_monster("Snaga", c).unwrap();
        let mut asked = Vec::new();
        let mut refuse = |q: &str| {
            asked.push(q.to_string());
            false
        };
        assert!(!py_attack_aux(&mut world, c, AttackType::Main, &mut refuse));
        assert_eq!(asked, vec!["Are you sure you wish to attack with your shovel? "]);
    }

    #[test]
    fn test_warnings_do_not_undo_an_earlier_attack() {
        let mut world = arena();
        let c = world.player.pos.offset(0, 1);
        world.place_monster("Snaga", c).unwrap();
        world.player.attacked = true;
        world.player.previous_action[0] = ACTION_MISC;
        assert!(!py_attack_aux(&mut world, c, AttackType::Main, &mut unasked));
        assert_eq!(world.player.previous_action[0], ACTION_MISC);
    }

    #[test]
    fn test_knock_back_ends_the_blows() {
        let mut world = arena();
        world.player.skill_base[Skill::Melee.index()] = 60;
        world.player.stat_base[Stat::Str.index()] = 20;
        world.player.abilities |= Abilities::MEL_RAPID_ATTACK | Abilities::MEL_KNOCK_BACK;
        world.player.equipment.weapon = Some(Item::weapon("Great Hammer", ItemKind::Hafted, 300, 0, 1, 1));
        world.player.calc_bonuses();
        assert!(world.player.blows() >= 2);

        let p = world.player.pos;
        let c = p.offset(0, 1);
        let id = world.place_monster("Snaga", c).unwrap();
        let m = world.monsters.get_mut(id).unwrap();
        m.alertness = ALERTNESS_ALERT + 5;
        // tough enough to take a blow, not so tough it resists the knock
        m.maxhp = 100;
        m.hp = 100;
        world.take_messages();

        assert!(py_attack_aux(&mut world, c, AttackType::Main, &mut yes));
        let m = world.monsters.get(id).unwrap();
        assert_eq!(m.pos, p.offset(0, 2));
        assert!(m.skip_next_turn);
        let swings = world
            .take_messages()
            .iter()
            .filter(|msg| msg.starts_with("You hit") || msg.starts_with("You miss"))
            .count();
        assert_eq!(swings, 1);
    }

    #[test]
    fn test_flanking_attack_on_move() {
        let mut world = arena();
        armed(&mut world);
        world.player.abilities |= Abilities::EVN_FLANKING;
        let p = world.player.pos;
        let c = p.offset(-1, 1);
        let id = world.place_monster("Cave orc", c).unwrap();
        world.monsters.get_mut(id).unwrap().alertness = 10;
        world.take_messages();
        flanking_or_retreat(&mut world, p.offset(0, 1), &mut yes);
        assert!(world.player.attacked);
        assert!(!world.take_messages().is_empty());
    }
}
