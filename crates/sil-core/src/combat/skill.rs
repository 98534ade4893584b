//! Opposed rolls
//!
//! Every contest in the game is one die plus a score against one die plus a
//! score: `1d10` for skills, `1d20` for attack against evasion. A cursed
//! player rolls their own side twice and keeps the worse.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::consts::{HEAVY_STUN, HIT_DIE, SKILL_DIE};
use crate::monster::{MonsterId, RaceFlags};
use crate::player::{Skill, Timed};
use crate::world::World;

/// One side of a contest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Actor {
    Player,
    Monster(MonsterId),
    /// A trap, the dungeon, or a fixed difficulty
    #[default]
    Nothing,
}

impl Actor {
    pub const fn monster(self) -> Option<MonsterId> {
        match self {
            Actor::Monster(id) => Some(id),
            _ => None,
        }
    }
}

/// Number of ways out of `sides * sides` that `1dsides + skill` beats
/// `1dsides + difficulty`
pub fn success_chance(sides: i32, skill: i32, difficulty: i32) -> i32 {
    let mut ways = 0;
    for i in 1..=sides {
        for j in 1..=sides {
            if i + skill > j + difficulty {
                ways += 1;
            }
        }
    }
    ways
}

/// `(1d10 + skill) - (1d10 + difficulty)`. Positive results succeed, and
/// the margin often scales the effect.
pub fn skill_check(world: &mut World, a1: Actor, skill: i32, difficulty: i32, a2: Actor) -> i32 {
    let mut skill = skill;
    let mut difficulty = difficulty;

    match (a1, a2) {
        (Actor::Player, Actor::Monster(id)) => {
            skill += bane_bonus(world, id);
            difficulty += elf_bane_bonus(world, id);
        }
        (Actor::Monster(id), Actor::Player) => {
            difficulty += bane_bonus(world, id);
            skill += elf_bane_bonus(world, id);
        }
        _ => {}
    }

    let rng = &mut world.rng;
    let mut skill_total = rng.die(SKILL_DIE) + skill;
    let mut difficulty_total = rng.die(SKILL_DIE) + difficulty;
    let skill_alt = rng.die(SKILL_DIE) + skill;
    let difficulty_alt = rng.die(SKILL_DIE) + difficulty;

    if world.player.cursed {
        if a1 == Actor::Player {
            skill_total = skill_total.min(skill_alt);
        }
        if a2 == Actor::Player {
            difficulty_total = difficulty_total.min(difficulty_alt);
        }
    }

    skill_total - difficulty_total
}

/// `(1d20 + attack) - (1d20 + evasion)`. Positive results hit; the margin
/// feeds critical hits.
pub fn hit_roll(world: &mut World, att: i32, evn: i32, attacker: Actor, _defender: Actor) -> i32 {
    let rng = &mut world.rng;
    let mut attack = rng.die(HIT_DIE) + att;
    let attack_alt = rng.die(HIT_DIE) + att;
    let mut evasion = rng.die(HIT_DIE) + evn;
    let evasion_alt = rng.die(HIT_DIE) + evn;

    if world.player.cursed {
        if attacker == Actor::Player {
            attack = attack.min(attack_alt);
        } else {
            evasion = evasion.min(evasion_alt);
        }
    }

    attack - evasion
}

/// Player kills of every race bearing the bane's mark
pub fn bane_kills(world: &World) -> i32 {
    let traits = world.player.bane.traits();
    if traits.is_empty() {
        return 0;
    }
    world
        .races()
        .filter(|r| r.is(traits))
        .map(|r| world.lore.pkills(&r.name))
        .sum()
}

/// One point for each doubling of kills past the first
pub fn bane_bonus_for_kills(killed: i32) -> i32 {
    let mut i = 2;
    let mut bonus = 0;
    while i <= killed {
        i *= 2;
        bonus += 1;
    }
    bonus
}

/// The player's bonus against their chosen kind of foe
pub fn bane_bonus(world: &World, id: MonsterId) -> i32 {
    let p = &world.player;
    if p.is(Timed::Entranced) || p.timed(Timed::Stun) > HEAVY_STUN {
        return 0;
    }
    let Some(m) = world.monsters.get(id) else { return 0 };
    let traits = p.bane.traits();
    if traits.is_empty() || !m.race.is(traits) {
        return 0;
    }
    bane_bonus_for_kills(bane_kills(world))
}

/// Elf-haters fight elves harder
pub fn elf_bane_bonus(world: &World, id: MonsterId) -> i32 {
    match world.monsters.get(id) {
        Some(m) if m.race.has(RaceFlags::ELFBANE) && world.player.race.is_elf() => 5,
        _ => 0,
    }
}

/// The player's will against a monster's (or a fixed difficulty of 10).
/// Each point of resistance is worth ten points of will. True if the
/// player shrugs the effect off.
pub fn saving_throw(world: &mut World, source: Option<MonsterId>, resistance: i32) -> bool {
    let player_score = world.player.skill(Skill::Will);
    let (difficulty, actor) = match source.and_then(|id| world.monsters.get(id).map(|m| (id, m))) {
        Some((id, m)) => (m.skill(Skill::Will), Actor::Monster(id)),
        None => (10, Actor::Nothing),
    };
    let difficulty = difficulty - 10 * resistance;
    skill_check(world, actor, difficulty, player_score, Actor::Player) <= 0
}

/// Conditions a monster can try to inflict
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
)]
#[repr(u8)]
pub enum Affliction {
    #[default]
    Blindness,
    Confusion,
    Fear,
    Entrancement,
    Hallucination,
    Slowness,
    Stun,
}

/// Does an affliction take hold? The player's relevant resistance counts
/// towards the saving throw.
pub fn allow_player(world: &mut World, affliction: Affliction, source: Option<MonsterId>) -> bool {
    let p = &world.player;
    let resistance = match affliction {
        Affliction::Blindness => p.resist_blind,
        Affliction::Confusion => p.resist_confu,
        Affliction::Fear => {
            if p.is(Timed::Rage) {
                return false;
            }
            p.resist_fear
        }
        Affliction::Entrancement | Affliction::Slowness => p.free_act,
        Affliction::Hallucination => 0,
        Affliction::Stun => p.resist_stun,
    };
    !saving_throw(world, source, resistance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dungeon::Coord;
    use crate::player::{Bane, PlayerRace};
    use crate::world::testing::arena;
    use proptest::prelude::*;

    #[test]
    fn test_success_chance_counts_ways() {
        assert_eq!(success_chance(10, 0, 0), 45);
        assert_eq!(success_chance(10, 10, 0), 100);
        assert_eq!(success_chance(10, 0, 10), 0);
        assert_eq!(success_chance(20, 0, 0), 190);
    }

    #[test]
    fn test_bane_doubles() {
        assert_eq!(bane_bonus_for_kills(0), 0);
        assert_eq!(bane_bonus_for_kills(1), 0);
        assert_eq!(bane_bonus_for_kills(2), 1);
        assert_eq!(bane_bonus_for_kills(3), 1);
        assert_eq!(bane_bonus_for_kills(4), 2);
        assert_eq!(bane_bonus_for_kills(63), 5);
    }

    #[test]
    fn test_bane_bonus_counts_kills_of_the_kind() {
        let mut world = arena();
        let id = world.place_monster("Cave orc", Coord::new(1, 1)).unwrap();
        world.player.bane = Bane::Orc;
        world.lore.entry("Snaga").pkills = 3;
        world.lore.entry("Cave orc").pkills = 2;
        world.lore.entry("Wolf").pkills = 40;
        assert_eq!(bane_kills(&world), 5);
        assert_eq!(bane_bonus(&world, id), 2);

        world.player.timed.set(Timed::Entranced, 3);
        assert_eq!(bane_bonus(&world, id), 0);
    }

    #[test]
    fn test_elf_bane() {
        let mut world = arena();
        let id = world.place_monster("Cave orc", Coord::new(1, 1)).unwrap();
        world.update_race("Cave orc", |r| r.flags |= RaceFlags::ELFBANE);
        world.player.race = PlayerRace::Noldor;
        assert_eq!(elf_bane_bonus(&world, id), 5);
        world.player.race = PlayerRace::Edain;
        assert_eq!(elf_bane_bonus(&world, id), 0);
    }

    #[test]
    fn test_curse_only_hurts_the_player() {
        let mut world = arena();
        world.player.cursed = true;
        let trials = 2000;
        let mut player_wins = 0;
        let mut monster_wins = 0;
        for _ in 0..trials {
            if skill_check(&mut world, Actor::Player, 0, 0, Actor::Nothing) > 0 {
                player_wins += 1;
            }
            if skill_check(&mut world, Actor::Nothing, 0, 0, Actor::Player) > 0 {
                monster_wins += 1;
            }
        }
        // 45% uncursed; cursed the player's side does markedly worse
        assert!(player_wins < trials * 40 / 100);
        assert!(monster_wins > trials * 50 / 100);
    }

    #[test]
    fn test_saving_throw_resistance() {
        let mut world = arena();
        world.player.skill_use[Skill::Will.index()] = 0;
        let mut saved = 0;
        for _ in 0..200 {
            if saving_throw(&mut world, None, 3) {
                saved += 1;
            }
        }
        // difficulty 10 - 30 is never beaten
        assert_eq!(saved, 200);
    }

    #[test]
    fn test_rage_prevents_fear() {
        let mut world = arena();
        world.player.timed.set(Timed::Rage, 5);
        assert!(!allow_player(&mut world, Affliction::Fear, None));
    }

    #[test]
    fn test_skill_check_symmetry() {
        let mut world = arena();
        let trials = 4000;
        let mut wins: i32 = 0;
        let mut losses: i32 = 0;
        for _ in 0..trials {
            let r = skill_check(&mut world, Actor::Nothing, 5, 5, Actor::Nothing);
            if r > 0 {
                wins += 1;
            } else if r < 0 {
                losses += 1;
            }
        }
        let diff = (wins - losses).abs();
        assert!(diff < trials / 10, "wins {wins} losses {losses}");
    }

    proptest! {
        #[test]
        fn prop_skill_check_margin_in_range(skill in -30i32..30, difficulty in -30i32..30, seed in any::<u64>()) {
            let mut world = arena();
            world.rng = crate::GameRng::new(seed);
            let r = skill_check(&mut world, Actor::Nothing, skill, difficulty, Actor::Nothing);
            prop_assert!(r >= skill - difficulty - 9);
            prop_assert!(r <= skill - difficulty + 9);
        }

        #[test]
        fn prop_hit_roll_margin_in_range(att in -30i32..30, evn in -30i32..30, seed in any::<u64>()) {
            let mut world = arena();
            world.rng = crate::GameRng::new(seed);
            let r = hit_roll(&mut world, att, evn, Actor::Nothing, Actor::Player);
            prop_assert!(r >= att - evn - 19);
            prop_assert!(r <= att - evn + 19);
        }
    }
}
