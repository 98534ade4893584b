//! Attack, evasion and critical hit modifiers
//!
//! Every attack starts from a skill score and folds in the situation:
//! distance, who can see whom, pits and webs, light, crowding, and the
//! player's abilities. Only positive scores are halved.

use super::skill::{bane_bonus, elf_bane_bonus};
use crate::consts::{ALERTNESS_ALERT, ALERTNESS_UNWARY};
use crate::dungeon::{Coord, distance, rough_direction};
use crate::monster::{Monster, MonsterId, MonsterRace, RaceFlags, RaceTraits};
use crate::player::{Abilities, Skill, Timed};
use crate::world::World;

/// Who is on the receiving end of a critical hit
#[derive(Debug, Clone, Copy)]
pub enum CritTarget<'a> {
    Monster(&'a MonsterRace),
    Player,
}

/// Is the player stuck in a pit or a web?
pub fn player_is_held(world: &World) -> bool {
    world
        .grid
        .feat(world.player.pos)
        .trap()
        .is_some_and(|t| t.holds_player())
}

/// Bonus for hitting the same monster over and over. Switching targets
/// resets the count.
pub fn concentration_bonus(world: &mut World, id: MonsterId) -> i32 {
    let p = &mut world.player;
    let mut bonus = 0;
    if p.has(Abilities::PER_CONCENTRATION) && p.last_attack == Some(id) {
        bonus = p.consecutive_attacks.min(p.skill(Skill::Perception) / 2);
    }
    if p.last_attack != Some(id) {
        p.consecutive_attacks = 0;
        p.last_attack = Some(id);
    }
    bonus
}

/// Bonus for an attack after a turn spent focusing; used up either way
pub fn focused_attack_bonus(world: &mut World) -> i32 {
    let p = &mut world.player;
    if !p.focused {
        return 0;
    }
    p.focused = false;
    if p.has(Abilities::PER_FOCUSED_ATTACK) {
        p.skill(Skill::Perception) / 2
    } else {
        0
    }
}

/// Bonus from experience hunting this race
pub fn master_hunter_bonus(world: &World, m: &Monster) -> i32 {
    let p = &world.player;
    if p.has(Abilities::PER_MASTER_HUNTER) {
        world.lore.pkills(m.name()).min(p.skill(Skill::Perception) / 4)
    } else {
        0
    }
}

/// The player's attack score against a monster
pub fn total_player_attack(world: &mut World, id: MonsterId, base: i32) -> i32 {
    let mut att = base;
    att += concentration_bonus(world, id);
    att += focused_attack_bonus(world);
    att += bane_bonus(world, id);

    let Some(m) = world.monsters.get(id) else { return att };
    att += master_hunter_bonus(world, m);
    att -= distance(world.player.pos, m.pos) / 5;

    if att > 0 {
        if !m.ml {
            att /= 2;
        }
        if player_is_held(world) {
            att /= 2;
        }
    }
    att
}

/// The player's evasion against a monster
pub fn total_player_evasion(world: &World, id: MonsterId, archery: bool) -> i32 {
    let p = &world.player;
    let mut evn = p.skill(Skill::Evasion);
    evn += p.dodging_bonus();
    evn += bane_bonus(world, id);

    if evn > 0 {
        if world.monsters.get(id).is_some_and(|m| !m.ml) {
            evn /= 2;
        }
        if archery {
            evn /= 2;
        }
        if player_is_held(world) {
            evn /= 2;
        }
    }
    evn
}

/// Light-averse monsters fight badly on brightly lit grids
pub fn light_penalty(world: &World, m: &Monster) -> i32 {
    if m.race.is(RaceTraits::HURT_LITE) {
        (world.grid.light(m.pos) - 2).max(0)
    } else {
        0
    }
}

/// Monsters that carry light cannot see a player standing in the dark
fn cannot_see_player(world: &World, m: &Monster) -> bool {
    m.race.light > 0 && matches!(m.race.d_char, '@' | 'G') && world.grid.light(world.player.pos) <= 0
}

/// A monster's attack score against the player
pub fn total_monster_attack(world: &World, id: MonsterId, base: i32) -> i32 {
    let Some(m) = world.monsters.get(id) else { return base };
    let mut att = base;
    if m.stunned > 0 {
        att -= 2;
    }
    att -= light_penalty(world, m);
    att += overwhelming_att_mod(world, m.pos);
    att -= distance(world.player.pos, m.pos) / 5;
    att += elf_bane_bonus(world, id);

    if att > 0 && cannot_see_player(world, m) {
        att /= 2;
    }
    att
}

/// A monster's evasion against the player. Sleeping monsters are sitting ducks.
pub fn total_monster_evasion(world: &World, id: MonsterId, archery: bool) -> i32 {
    let Some(m) = world.monsters.get(id) else { return 0 };
    let mut evn = m.race.evn;
    if m.stunned > 0 {
        evn -= 2;
    }
    evn -= light_penalty(world, m);
    evn += elf_bane_bonus(world, id);

    if evn > 0 {
        if cannot_see_player(world, m) || m.alertness < ALERTNESS_ALERT {
            evn /= 2;
        }
        if archery {
            evn /= 2;
        }
    }
    if m.alertness < ALERTNESS_UNWARY {
        evn = -5;
    }
    evn
}

/// Assassins strike unwary monsters with their full stealth
pub fn stealth_melee_bonus(world: &World, m: &Monster) -> i32 {
    let p = &world.player;
    if p.has(Abilities::STL_ASSASSINATION)
        && m.alertness < ALERTNESS_ALERT
        && m.ml
        && !p.is(Timed::Confused)
    {
        p.skill(Skill::Stealth)
    } else {
        0
    }
}

/// Bonus for monsters surrounding the player: +1 for each monster
/// beside the attacker, +2 for each one behind the player.
///
/// ```text
/// 1M1  M11
/// 1@1  1@2
/// 222  122
/// ```
pub fn overwhelming_att_mod(world: &World, attacker: Coord) -> i32 {
    let p = world.player.pos;
    let dir = rough_direction(p, attacker);
    let (dy, dx) = (dir.dy(), dir.dx());

    let (beside, behind): ([(i32, i32); 4], [(i32, i32); 3]) = if dy * dx == 0 {
        (
            [(dx + dy, -dy + dx), (-dx + dy, dy + dx), (dx, -dy), (-dx, dy)],
            [(dx - dy, -dy - dx), (-dx - dy, dy - dx), (-dy, -dx)],
        )
    } else {
        (
            [(dy, 0), (0, dx), (dx, -dy), (-dx, dy)],
            [(-dy, 0), (0, -dx), (-dy, -dx)],
        )
    };

    let occupied = |(oy, ox): (i32, i32)| world.grid.monster_at(p.offset(oy, ox)).is_some();
    let mut modifier = beside.into_iter().filter(|&o| occupied(o)).count() as i32;
    modifier += 2 * behind.into_iter().filter(|&o| occupied(o)).count() as i32;

    if world.player.has(Abilities::EVN_CROWD_FIGHTING) {
        modifier /= 2;
    }
    modifier
}

/// Bonus damage dice for a hit that beat the evasion roll by `hit_result`.
///
/// One die for each `(7 + pounds)` of margin, with the weight in tenths
/// of a pound. A long sword at a margin of 18 gets one die.
pub fn crit_bonus(
    world: &World,
    hit_result: i32,
    weight: i32,
    target: CritTarget<'_>,
    skill: Skill,
    thrown: bool,
) -> i32 {
    let p = &world.player;
    let mut separation = 70;

    match target {
        CritTarget::Monster(_) => {
            if skill == Skill::Melee && p.has(Abilities::MEL_FINESSE) {
                separation -= 10;
            }
            if skill == Skill::Melee
                && p.has(Abilities::MEL_CONTROL)
                && !thrown
                && !p.two_handed_melee()
                && p.equipment.off_hand.is_none()
            {
                separation -= 20;
            }
            if skill == Skill::Melee && p.has(Abilities::MEL_POWER) {
                separation += 10;
            }
            if skill == Skill::Archery && p.has(Abilities::ARC_IMPROVED_CRITICALS) {
                separation -= 10;
            }
        }
        CritTarget::Player => {
            if p.has(Abilities::WIL_CRITICAL_RESISTANCE) {
                separation += (p.skill(Skill::Will) / 5) * 10;
            }
        }
    }

    // +4 rounds to nearest
    let mut dice = (hit_result * 10 + 4) / (separation + weight).max(1);

    if let CritTarget::Monster(race) = target {
        if race.has(RaceFlags::RES_CRIT) {
            dice /= 2;
        }
        if race.has(RaceFlags::NO_CRIT) {
            dice = 0;
        }
    }
    dice.max(0)
}
