//! Traps and falls

#[cfg(not(feature = "std"))]
use crate::compat::*;

use tracing::debug;

use crate::combat::{
    Actor, Affliction, allow_player, dec_stat, element_damage, hit_roll, protection_roll,
    saving_throw, skill_check, take_hit,
};
use crate::consts::MORGOTH_DEPTH;
use crate::dungeon::{CellFlags, Coord, DDD, Feature, ProjectFlags, TrapKind};
use crate::magic::{DamageType, Projection, project};
use crate::perception::monster_perception;
use crate::player::{Skill, Song, Stat, Timed};
use crate::world::World;

const TRAP: &str = "a trap";

/// Does something with attack `power` hit the player? Evasion and the
/// dodging bonus defend.
pub fn check_hit(world: &mut World, power: i32) -> bool {
    let evasion = world.player.skill(Skill::Evasion) + world.player.dodging_bonus();
    hit_roll(world, power, evasion, Actor::Nothing, Actor::Player) > 0
}

/// Show a hidden trap and remember it
pub fn reveal_trap(world: &mut World, c: Coord) {
    world.grid.clear_info(c, CellFlags::HIDDEN);
    world.grid.set_info(c, CellFlags::MARK);
}

/// Falling to a deeper level through a chasm or a false floor
fn fall(world: &mut World, chasm: bool) {
    let (dice, source) = if chasm {
        let dice = if world.player.depth == MORGOTH_DEPTH - 2 { 3 } else { 6 };
        (dice, "falling down a chasm")
    } else {
        (3, "a collapsing floor")
    };
    world.message("...and land somewhere deeper in the Iron Hells.");
    let dam = world.rng.damroll(dice, 4);
    take_hit(world, dam, source);

    let p = &mut world.player;
    p.note(if chasm { "Fell into a chasm" } else { "Fell through a false floor" });
    p.depth = if chasm { (p.depth + 2).min(MORGOTH_DEPTH - 1) } else { p.depth + 1 };
    p.leaving = true;
    debug!(depth = p.depth, "player fell to a deeper level");
}

/// Armour against a trap's damage roll
fn net_damage(world: &mut World, dam: i32, melee: bool) -> i32 {
    let prt = protection_roll(world, DamageType::Hurt, melee);
    (dam - prt).max(0)
}

/// Spring whatever is at `c` on the player. Chasms count as traps here.
pub fn hit_trap(world: &mut World, c: Coord) {
    world.disturb();
    let feat = world.grid.feat(c);
    let kind = match feat {
        Feature::Chasm => {
            world.message("You fall into the darkness!");
            fall(world, true);
            return;
        }
        Feature::Trap(kind) => kind,
        _ => return,
    };
    debug!(trap = kind.name(), "trap sprung");

    match kind {
        TrapKind::FalseFloor => {
            world.message("The floor crumbles beneath you!");
            world.message("You fall through...");
            fall(world, false);
        }
        TrapKind::Pit => {
            world.message("You fall into a pit!");
            let dam = world.rng.damroll(2, 4);
            take_hit(world, dam, TRAP);
            world.player.stealth_score -= 5;
        }
        TrapKind::SpikedPit => {
            world.message("You fall into a spiked pit!");
            let dam = world.rng.damroll(2, 4);
            take_hit(world, dam, TRAP);
            let spikes = world.rng.damroll(4, 5);
            let net = net_damage(world, spikes, true);
            if net > 0 {
                world.message("You are impaled!");
                take_hit(world, net, TRAP);
                world.inc_timed(Timed::Cut, (net + 1) / 2);
            } else {
                world.message("Your armour protects you.");
            }
            world.player.stealth_score -= 10;
        }
        TrapKind::Dart => {
            if check_hit(world, 15) {
                let dam = world.rng.damroll(1, 15);
                let prt = protection_roll(world, DamageType::Hurt, false);
                if dam > prt {
                    world.message("A small dart hits you!");
                    take_hit(world, 1, TRAP);
                    dec_stat(world, Stat::Str, 1);
                } else {
                    world.message("A small dart hits you, but is deflected by your armour.");
                }
            } else {
                world.message("A small dart barely misses you.");
            }
            monster_perception(world, true, false, 5);
        }
        TrapKind::Flash => {
            if !world.player.is(Timed::Blind) {
                world.message("There is a searing flash of light!");
                if allow_player(world, Affliction::Blindness, None) {
                    let turns = world.rng.damroll(5, 4);
                    world.inc_timed(Timed::Blind, turns);
                } else {
                    world.message("Your vision quickly clears.");
                }
            }
            monster_perception(world, true, false, 5);
        }
        TrapKind::GasConfusion => {
            world.message("A vapor fills the air and you feel yourself becoming lightheaded.");
            if allow_player(world, Affliction::Confusion, None) {
                let turns = world.rng.damroll(4, 4);
                world.inc_timed(Timed::Confused, turns);
            } else {
                world.message("You resist the effects!");
            }
            confusion_cloud(world, c);
            monster_perception(world, true, false, 10);
        }
        TrapKind::GasMemory => {
            world.message("You are surrounded by a strange mist!");
            if saving_throw(world, None, 0) {
                world.message("You resist the effects!");
            } else {
                world.message("Your memories fade away.");
                world.grid.clear_info_all(CellFlags::MARK);
                world.update_view();
            }
            monster_perception(world, true, false, 10);
        }
        TrapKind::Acid => {
            world.message("You are splashed with acid!");
            let dam = world.rng.damroll(4, 4);
            let net = net_damage(world, dam, false);
            element_damage(world, DamageType::Acid, net, "an acid trap");
            monster_perception(world, true, false, 10);
        }
        TrapKind::Alarm => {
            if world.player.singing(Song::Silence) {
                world.message("You hear the muffled toll of a bell above your head.");
            } else {
                world.message("You hear a bell toll loudly above your head.");
            }
            monster_perception(world, true, false, -20);
        }
        TrapKind::Caltrops => {
            let perception = world.player.skill(Skill::Perception);
            if skill_check(world, Actor::Player, perception, 10, Actor::Nothing) > 0 {
                world.message("You step carefully amidst a field of caltrops.");
            } else {
                world.message("You step on a caltrop.");
                let dam = world.rng.damroll(1, 4);
                take_hit(world, dam, TRAP);
                if allow_player(world, Affliction::Slowness, None) {
                    world.message("It pierces your foot.");
                    let turns = world.rng.damroll(4, 4);
                    world.inc_timed(Timed::Slow, turns);
                }
            }
            world.player.stealth_score -= 10;
        }
        TrapKind::Roost => {
            // the birds and bats themselves come from the level generator
            world.message("There is a flutter of wings from high above.");
            world.grid.clear_info(c, CellFlags::MARK);
            world.grid.set_feat(c, Feature::Floor);
        }
        TrapKind::Web => {
            world.message("You are caught in a vast black web.");
        }
        TrapKind::Deadfall => deadfall(world, c),
    }
}

/// The confusing gas spreads to anything standing next to the trap
fn confusion_cloud(world: &mut World, c: Coord) {
    let flags = ProjectFlags::BOOM
        | ProjectFlags::GRID
        | ProjectFlags::JUMP
        | ProjectFlags::ITEM
        | ProjectFlags::KILL
        | ProjectFlags::PLAY;
    let proj = Projection::new(Actor::Nothing, c, c, DamageType::Confusion)
        .radius(1)
        .dice(3, 4)
        .difficulty(10)
        .flags(flags);
    project(world, &proj);
}

/// The ceiling comes down. With somewhere to dodge to the player may get
/// clear; with nowhere to go they are crushed.
fn deadfall(world: &mut World, c: Coord) {
    world.message("The ceiling collapses!");

    let pos = world.player.pos;
    let mut safe = None;
    let mut count = 0;
    for dir in DDD {
        let n = pos.step(dir);
        if !world.grid.in_bounds(n) || !world.grid.is_floor(n) || !world.grid.occupant(n).is_empty() {
            continue;
        }
        count += 1;
        if count > 1 && world.rng.rand_int(count) != 0 {
            continue;
        }
        safe = Some(n);
    }

    let net = match safe {
        None => {
            world.message("You are severely crushed!");
            let dam = world.rng.damroll(6, 8);
            let net = net_damage(world, dam, false);
            if allow_player(world, Affliction::Stun, None) {
                world.inc_timed(Timed::Stun, dam * 4);
            }
            net
        }
        Some(to) => {
            let net = if check_hit(world, 20) {
                world.message("You are struck by rubble!");
                let dam = world.rng.damroll(4, 8);
                let net = net_damage(world, dam, false);
                if allow_player(world, Affliction::Stun, None) {
                    world.inc_timed(Timed::Stun, dam * 4);
                }
                net
            } else {
                world.message("You nimbly dodge the falling rock!");
                0
            };
            world.monster_swap(pos, to);
            net
        }
    };
    take_hit(world, net, TRAP);

    world.grid.clear_info(c, CellFlags::MARK);
    world.grid.set_feat(c, Feature::Rubble);
    monster_perception(world, true, false, -20);
}
