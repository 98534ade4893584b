//! Projections against the player

#[cfg(not(feature = "std"))]
use crate::compat::*;

use tracing::debug;

use super::DamageType;
use crate::combat::{
    Actor, Affliction, CritTarget, allow_player, crit_bonus, element_damage, hit_roll,
    protection_roll, resistance, skill_check, take_hit, total_monster_attack, total_player_evasion,
};
use crate::dungeon::Coord;
use crate::monster::RaceFlags;
use crate::perception::monster_perception;
use crate::player::{Skill, Timed};
use crate::world::World;

/// Apply a projection to the player standing on `c`. Only monsters can
/// hurt the player this way. Returns true if the effect was obvious.
pub fn project_p(world: &mut World, source: Actor, c: Coord, dd: i32, ds: i32, typ: DamageType) -> bool {
    if !world.grid.player_at(c) || source == Actor::Player {
        return false;
    }
    let Some(id) = source.monster() else { return false };
    let Some(m) = world.monsters.get(id) else { return false };
    let killer = m.killer_desc();
    let spell_power = m.race.spell_power;
    let crippling = m.race.has(RaceFlags::CRIPPLING);
    let will = m.skill(Skill::Will);

    let blind = world.player.is(Timed::Blind);
    let mut obvious = true;
    let dam = world.rng.damroll(dd, ds);
    debug!(%typ, dam, "projection hits player");

    match typ {
        DamageType::Acid | DamageType::Elec | DamageType::Hurt => {
            if blind {
                world.message(match typ {
                    DamageType::Acid => "You are hit by acid!",
                    DamageType::Elec => "You are hit by lightning!",
                    _ => "You are hit by something!",
                });
            }
            take_hit(world, dam, &killer);
        }

        DamageType::Fire | DamageType::Cold | DamageType::Pois => {
            if blind {
                world.message(match typ {
                    DamageType::Fire => "You are hit by fire!",
                    DamageType::Cold => "You are hit by cold!",
                    _ => "You are hit by poison!",
                });
            }
            let res = resistance(world, typ);
            let mut dam = if res > 0 { dam / res } else { dam * -res };
            dam -= protection_roll(world, typ, false);
            element_damage(world, typ, dam, &killer);
        }

        DamageType::Dark => {
            if blind {
                world.message("You are hit by something!");
            }
            let res = resistance(world, typ).max(1);
            let dam = dam / res - protection_roll(world, typ, false);
            if world.rng.one_in(res) && allow_player(world, Affliction::Blindness, Some(id)) {
                let more = world.rng.damroll(2, 4);
                world.inc_timed(Timed::Blind, more);
            }
            element_damage(world, typ, dam, &killer);
        }

        DamageType::Arrow | DamageType::Boulder => {
            let boulder = typ == DamageType::Boulder;
            let mut evasion = total_player_evasion(world, id, true);
            if !boulder {
                evasion /= 2;
            }
            let attack = total_monster_attack(world, id, spell_power);
            let weight = match (boulder, ds >= 11) {
                (true, _) => 100,
                (false, true) => 30,
                (false, false) => 20,
            };

            let hit_result = hit_roll(world, attack, evasion, Actor::Monster(id), Actor::Player);
            if hit_result > 0 {
                let crit = crit_bonus(world, hit_result, weight, CritTarget::Player, Skill::Archery, boulder);
                let dam = world.rng.damroll(dd + crit, ds);
                let net = (dam - protection_roll(world, DamageType::Hurt, false)).max(0);

                if blind {
                    world.message(if boulder {
                        "You are hit by something very heavy."
                    } else {
                        "You are hit by something sharp."
                    });
                } else if crit > 0 {
                    world.message("It hits!");
                } else {
                    world.message("It hits you.");
                }
                take_hit(world, net, &killer);

                if crippling && crit > 0 && !world.player.is_dead {
                    let free_act = world.player.free_act;
                    let player_will = world.player.skill(Skill::Will);
                    let roll = skill_check(world, Actor::Monster(id), crit * 4 + will, player_will + free_act * 10, Actor::Player);
                    if roll > 0 {
                        world.message("The shot tears into your thigh!");
                        world.inc_timed(Timed::Slow, crit);
                        world.learn_flags(id, RaceFlags::CRIPPLING);
                    }
                }
            }
            monster_perception(world, true, false, if boulder { -10 } else { -5 });
        }

        DamageType::Sound => {
            if allow_player(world, Affliction::Stun, Some(id)) {
                world.inc_timed(Timed::Stun, dam);
            } else {
                world.message("You are unfazed.");
            }
        }

        _ => obvious = false,
    }

    if obvious {
        world.disturb();
    }
    obvious
}
