//! Monster perception
//!
//! Every noise gets one difficulty roll, shared by all the monsters that
//! might hear it, so that they judge the same event consistently. Each
//! monster then rolls its own perception against that number and becomes
//! more alert by however much it beat it.

#[cfg(not(feature = "std"))]
use crate::compat::*;

use tracing::trace;

use crate::combat::{bane_bonus, elf_bane_bonus};
use crate::consts::{ALERTNESS_ALERT, ALERTNESS_UNWARY, SKILL_DIE};
use crate::monster::{RaceFlags, set_alertness};
use crate::player::{Abilities, Skill, Song};
use crate::world::World;

/// Let every monster try to notice a noise of the given difficulty.
///
/// `player_centered` noises spread along the player's noise flow, others
/// along the flow of the last monster to make a racket. The `main_roll`
/// is the once-per-turn check against the player's stealth, which also
/// picks up the bonuses for fighting this turn.
pub fn monster_perception(world: &mut World, player_centered: bool, main_roll: bool, difficulty: i32) {
    if world.player.leaving || world.player_turns == 0 {
        return;
    }

    let mut combat_noise_bonus = 0;
    let mut combat_sight_bonus = 0;
    if main_roll {
        if world.player.attacked {
            combat_noise_bonus += 2;
            combat_sight_bonus += 2;
            world.player.attacked = false;
            world.player.consecutive_attacks += 1;
        }
        if world.player.was_attacked {
            combat_noise_bonus += 2;
            combat_sight_bonus += 2;
            world.player.was_attacked = false;
        }
    }

    let mut difficulty_roll = difficulty + world.rng.die(SKILL_DIE);
    let alt = difficulty + world.rng.die(SKILL_DIE);
    if world.player.cursed && player_centered {
        difficulty_roll = difficulty_roll.min(alt);
    }
    if world.player.singing(Song::Silence) {
        difficulty_roll += world.player.song_bonus(Song::Silence);
    }

    // open squares around the player, for monsters that can see them
    let player = world.player.pos;
    let open_squares = player.neighbours().filter(|&c| world.grid.is_floor(c)).count() as i32;
    let disguised = world.player.has(Abilities::STL_DISGUISE);

    for id in world.monsters.ids_rev() {
        let Some(m) = world.monsters.get(id) else { continue };
        if m.race.has(RaceFlags::SHORT_SIGHTED) && m.cdis > 2 {
            continue;
        }
        let noise_dist = if player_centered {
            world.flows.player_noise.dist(m.pos)
        } else {
            world.flows.monster_noise.dist(m.pos)
        };

        let mut perception = m.skill(Skill::Perception) - noise_dist + combat_noise_bonus;
        perception -= bane_bonus(world, id);
        perception += elf_bane_bonus(world, id);
        if world.player.on_the_run {
            perception += 5;
        }
        if m.alertness >= ALERTNESS_ALERT {
            perception -= m.alertness;
        }
        if world.player.aggravate > 0
            && m.alertness >= ALERTNESS_UNWARY
            && !m.race.has(RaceFlags::MINDLESS)
        {
            perception += world.player.aggravate * 10;
        }
        if m.alertness >= ALERTNESS_UNWARY && world.grid.los(m.pos, player) {
            perception += if disguised {
                (open_squares + combat_sight_bonus) / 2
            } else {
                open_squares + combat_sight_bonus
            };
        }

        let alertness = m.alertness;
        let visible = m.ml;
        let name = m.race.name.clone();
        let result = perception + world.rng.die(SKILL_DIE) - difficulty_roll;
        trace!(monster = %name, perception, difficulty_roll, result, "perception roll");
        if result <= 0 {
            continue;
        }

        set_alertness(world, id, alertness + result);
        let now_alert = world.monsters.get(id).is_some_and(|m| m.alertness >= ALERTNESS_ALERT);
        if visible {
            let lore = world.lore.entry(&name);
            if now_alert {
                lore.notice = lore.notice.saturating_add(1);
            } else {
                lore.ignore = lore.ignore.saturating_add(1);
            }
        }
    }
}
