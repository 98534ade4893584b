//! Songs sung by monsters
//!
//! Only Morgoth sings. A song carries along the monster noise flow, so its
//! strength at any grid falls off with the distance sound must travel.

#[cfg(not(feature = "std"))]
use crate::compat::*;

use crate::combat::{Actor, skill_check};
use crate::consts::{ALERTNESS_QUITE_ALERT, ALERTNESS_VERY_ALERT};
use crate::dungeon::{Coord, FlowMap};
use crate::magic::lock_door;
use crate::monster::{MonsterFlags, MonsterId, MonsterSong, OATHWRAITH, set_alertness};
use crate::player::{Skill, Song, Timed};
use crate::world::World;

const BINDING_SKILL: i32 = 20;
const PIERCING_SKILL: i32 = 20;
const OATHS_SKILL: i32 = 21;

/// Tries at finding a spot for a summoned wraith
const SUMMON_TRIES: usize = 1000;

/// Announce the song, or a verse of it if it is already under way
fn sing_verse(world: &mut World, id: MonsterId, song: MonsterSong, title: &str, verses: [&str; 6], announce_unseen: bool) {
    let Some(m) = world.monsters.get(id) else { return };
    let (seen, name, current) = (m.ml, m.desc_cap(), m.song);
    let dist = world.flows.player_noise.dist(m.pos);

    if current != song && (seen || announce_unseen) {
        world.message(format!("{name} begins a song of {title}."));
        if let Some(m) = world.monsters.get_mut(id) {
            m.song = song;
        }
        world.disturb();
        return;
    }

    let roll = world.rng.die(8) as usize;
    let verse = verses[roll.min(6) - 1];
    if seen {
        world.message(format!("{name} sings of {verse}."));
    } else if dist <= 20 {
        world.message(format!("You hear a song of {verse}."));
    } else if dist <= 30 {
        world.message("You hear singing in the distance.");
    }
    if seen || dist <= 30 {
        world.disturb();
    }
}

/// Song skill after the player's song of silence
fn song_skill(world: &World, base: i32) -> i32 {
    let p = &world.player;
    if p.singing(Song::Silence) {
        base - p.song_bonus(Song::Silence) / 2
    } else {
        base
    }
}

fn ordered(a: i32, b: i32, c: i32) -> bool {
    (a <= b && b <= c) || (a >= b && b >= c)
}

/// Doors swing shut and lock, and the player is slowed
pub fn song_of_binding(world: &mut World, id: MonsterId) {
    sing_verse(
        world,
        id,
        MonsterSong::Binding,
        "binding",
        ["durance", "chains", "thralls", "prison walls", "locks without keys", "binding"],
        true,
    );
    let Some(pos) = world.monsters.get(id).map(|m| m.pos) else { return };
    world.flows.monster_noise = FlowMap::noise(&world.grid, pos);

    let player = world.player.pos;
    let doors: Vec<Coord> = world
        .grid
        .coords()
        .filter(|&c| world.grid.in_bounds_fully(c) && world.grid.occupant(c).is_empty())
        .filter(|&c| {
            let feat = world.grid.feat(c);
            matches!(feat, crate::dungeon::Feature::OpenDoor | crate::dungeon::Feature::BrokenDoor)
                || feat.is_known_closed_door()
        })
        // doors between Morgoth and the player are left alone
        .filter(|&c| !(ordered(pos.y, c.y, player.y) && ordered(pos.x, c.x, player.x)))
        .collect();
    for c in doors {
        let dif = 15 + world.flows.monster_noise.dist(c);
        let result = skill_check(world, Actor::Monster(id), BINDING_SKILL, dif, Actor::Nothing);
        lock_door(world, c, result);
    }

    let skill = song_skill(world, BINDING_SKILL);
    let p = &world.player;
    let resistance = p.skill(Skill::Will) + p.free_act * 10 + world.flows.monster_noise.dist(player);
    if skill_check(world, Actor::Monster(id), skill, resistance, Actor::Player) > 0 {
        let slow = world.player.timed(Timed::Slow).max(2);
        world.set_timed(Timed::Slow, slow);
    }
}

/// Morgoth searches for the intruder's mind
pub fn song_of_piercing(world: &mut World, id: MonsterId) {
    sing_verse(
        world,
        id,
        MonsterSong::Piercing,
        "piercing",
        ["opening", "treachery", "revealing", "uncovering", "betraying", "piercing"],
        false,
    );
    let Some(pos) = world.monsters.get(id).map(|m| m.pos) else { return };
    let dist = world.flows.player_noise.dist(pos);

    let skill = song_skill(world, PIERCING_SKILL);
    let resistance = world.player.skill(Skill::Will) + dist + 5;
    let result = skill_check(world, Actor::Monster(id), skill, resistance, Actor::Player);
    if result > 0 {
        world.message("You feel your mind laid bare before Morgoth's will.");
        set_alertness(world, id, result.min(ALERTNESS_VERY_ALERT));
    } else if result > -5 {
        world.message("You feel the force of Morgoth's will searching for the intruder.");
    }
}

/// Morgoth calls up an oathbreaker's wraith near himself
pub fn song_of_oaths(world: &mut World, id: MonsterId) {
    sing_verse(
        world,
        id,
        MonsterSong::Oaths,
        "oaths",
        ["vows broken", "promises", "duty", "tasks forgotten", "redemption", "oaths"],
        true,
    );
    let Some(pos) = world.monsters.get(id).map(|m| m.pos) else { return };
    world.flows.monster_noise = FlowMap::noise(&world.grid, pos);

    let skill = song_skill(world, OATHS_SKILL);
    let result = skill_check(world, Actor::Monster(id), skill, 15, Actor::Player);
    if result <= 0 {
        return;
    }
    let range = (15 - result).max(3);
    let (height, width) = (world.grid.height(), world.grid.width());
    for _ in 0..SUMMON_TRIES {
        let c = Coord::new(world.rng.rand_int(height), world.rng.rand_int(width));
        if !world.grid.in_bounds_fully(c)
            || !world.grid.is_floor(c)
            || !world.grid.occupant(c).is_empty()
            || world.flows.monster_noise.dist(c) > range
        {
            continue;
        }
        let Ok(wraith) = world.place_monster(OATHWRAITH, c) else { return };
        if world.monsters.get(wraith).is_some_and(|m| m.ml) {
            world.message("An Oathwraith appears.");
        }
        if let Some(m) = world.monsters.get_mut(wraith) {
            m.flags.insert(MonsterFlags::SUMMONED);
        }
        set_alertness(world, wraith, ALERTNESS_QUITE_ALERT);
        return;
    }
    tracing::warn!("no room to summon an oathwraith");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dungeon::Feature;
    use crate::monster::MORGOTH;
    use crate::world::testing::arena;

    fn morgoth(world: &mut World) -> MonsterId {
        let id = world.place_monster(MORGOTH, Coord::new(1, 1)).unwrap();
        world.update_view();
        world.update_noise();
        id
    }

    #[test]
    fn test_first_verse_announces_the_song() {
        let mut world = arena();
        let id = morgoth(&mut world);
        song_of_binding(&mut world, id);
        assert_eq!(world.monsters.get(id).unwrap().song, MonsterSong::Binding);
        let msgs = world.take_messages();
        assert!(msgs[0].ends_with("begins a song of binding."));

        song_of_binding(&mut world, id);
        let msgs = world.take_messages();
        assert!(msgs[0].contains("sings of") || msgs[0].starts_with("You hear a song of"));
    }

    #[test]
    fn test_binding_locks_doors_behind_the_player() {
        let mut world = arena();
        let id = morgoth(&mut world);
        let behind = Coord::new(2, 7);
        world.grid.set_feat(behind, Feature::OpenDoor);
        for _ in 0..20 {
            song_of_binding(&mut world, id);
        }
        assert!(world.grid.feat(behind).is_closed_door());
    }

    #[test]
    fn test_oaths_summon_wraiths_nearby() {
        let mut world = arena();
        let id = morgoth(&mut world);
        for _ in 0..20 {
            song_of_oaths(&mut world, id);
        }
        let wraiths: Vec<_> = world
            .monsters
            .iter()
            .filter(|(_, m)| m.race.name == OATHWRAITH)
            .map(|(_, m)| m.flags)
            .collect();
        assert!(!wraiths.is_empty());
        assert!(wraiths.iter().all(|f| f.contains(MonsterFlags::SUMMONED)));
    }

    #[test]
    fn test_piercing_is_silent_until_seen() {
        let mut world = arena();
        let id = morgoth(&mut world);
        world.monsters.get_mut(id).unwrap().ml = false;
        song_of_piercing(&mut world, id);
        assert_eq!(world.monsters.get(id).unwrap().song, MonsterSong::Nothing);
    }
}
