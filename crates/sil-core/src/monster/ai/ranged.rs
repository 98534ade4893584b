//! Ranged attacks: arrows, breaths, cries and spells
//!
//! `choose_ranged_attack` narrows the race's spell set to what is
//! affordable and useful from where the monster stands, then either takes
//! the only option, picks at random (mindless monsters and the occasional
//! careless one), or scores each option against a desirability table.

#[cfg(not(feature = "std"))]
use crate::compat::*;

use tracing::debug;

use super::song::{song_of_binding, song_of_oaths, song_of_piercing};
use crate::combat::{Actor, Affliction, allow_player};
use crate::consts::MAX_SIGHT;
use crate::dungeon::{CellFlags, Coord, FlowMap, ProjectFlags, Projectable, distance};
use crate::magic::{DamageType, Projection, darken_area, project};
use crate::monster::{MonsterFlags, MonsterId, RaceFlags, SpellFlags, Stance};
use crate::perception::monster_perception;
use crate::player::{Song, Timed};
use crate::world::World;

/// Static facts about one ranged attack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SpellInfo {
    mana: i32,
    /// Damage die size
    sides: i32,
    /// Beyond this distance the attack is less attractive; 0 for none
    best_range: i32,
    /// Base desirability
    desire: i32,
    /// Percentage of desirability kept per grid beyond `best_range`
    falloff: i32,
}

const fn info(mana: i32, sides: i32, best_range: i32, desire: i32, falloff: i32) -> SpellInfo {
    SpellInfo { mana, sides, best_range, desire, falloff }
}

fn spell_info(spell: SpellFlags) -> SpellInfo {
    match spell {
        s if s == SpellFlags::ARROW1 => info(1, 7, 5, 40, 95),
        s if s == SpellFlags::ARROW2 => info(1, 9, 8, 40, 95),
        s if s == SpellFlags::BOULDER => info(1, 10, 3, 50, 90),
        s if s.intersects(SpellFlags::BREATH) => info(2, 4, 2, 60, 85),
        s if s == SpellFlags::SHRIEK => info(1, 0, 0, 30, 100),
        s if s == SpellFlags::SCREECH => info(1, 0, 0, 40, 100),
        s if s == SpellFlags::DARKNESS => info(1, 0, 0, 20, 100),
        s if s == SpellFlags::SCARE => info(1, 0, 0, 40, 100),
        s if s == SpellFlags::CONF => info(1, 0, 0, 40, 100),
        s if s == SpellFlags::HOLD => info(2, 0, 0, 50, 100),
        s if s == SpellFlags::SLOW => info(1, 0, 0, 40, 100),
        // songs are paid for by the song upkeep
        s if s.intersects(SpellFlags::SONGS) => info(0, 0, 0, 60, 100),
        _ => info(0, 0, 0, 0, 100),
    }
}

/// The individual spells in a set, lowest bit first
fn spells_in(set: SpellFlags) -> Vec<SpellFlags> {
    set.iter().collect()
}

/// Drop spells the monster cannot afford
fn remove_expensive_spells(set: SpellFlags, mana: i32) -> SpellFlags {
    spells_in(set)
        .into_iter()
        .filter(|&s| spell_info(s).mana <= mana)
        .fold(SpellFlags::empty(), |acc, s| acc | s)
}

/// Drop spells that would do nothing useful from here
fn remove_invalid_spells(world: &World, id: MonsterId, mut set: SpellFlags) -> SpellFlags {
    let Some(m) = world.monsters.get(id) else { return SpellFlags::empty() };
    let dist = distance(m.pos, world.player.pos);
    let fleeing = m.stance == Stance::Fleeing;
    let truce = world.player.truce;

    if m.cdis > 2 {
        set.remove(SpellFlags::SCREECH);
    }
    // no missiles at melee range or while running
    if dist == 1 || fleeing || truce {
        set.remove(SpellFlags::ARCHERY);
    }
    if fleeing {
        set.remove(SpellFlags::BREATH);
    }
    if truce || (m.race.is_morgoth() && !world.crown_dropped) {
        set.remove(SpellFlags::SONGS);
    }
    if dist > 5 {
        set.remove(SpellFlags::BOULDER);
    }
    if dist > 10 {
        set.remove(SpellFlags::ARROW1);
    }
    if dist > 16 {
        set.remove(SpellFlags::ARROW2);
    }
    if !world.grid.has_info(world.player.pos, CellFlags::GLOW) {
        set.remove(SpellFlags::DARKNESS);
    }
    set
}

/// One spell if there is only one, or a random one when allowed
fn choose_fast(world: &mut World, set: SpellFlags, random: bool) -> Option<SpellFlags> {
    let spells = spells_in(set);
    match spells.len() {
        0 => None,
        1 => Some(spells[0]),
        _ if random => world.rng.choose(&spells).copied(),
        _ => None,
    }
}

/// Pick the ranged attack a monster would use now, if any
pub fn choose_ranged_attack(world: &mut World, id: MonsterId) -> Option<SpellFlags> {
    let m = world.monsters.get(id)?;
    let race = m.race.clone();
    let (pos, mana, cdis) = (m.pos, m.mana, m.cdis);
    let mut set = race.spells;

    match world.grid.projectable(pos, world.player.pos, ProjectFlags::CHCK) {
        Projectable::No => return None,
        Projectable::NotClear => set.remove(SpellFlags::ARCHERY),
        Projectable::Clear => {}
    }
    if set.is_empty() {
        return None;
    }

    set = remove_expensive_spells(set, mana);
    if set.is_empty() {
        return None;
    }

    if race.is_mindless() {
        return choose_fast(world, set, true);
    }

    set = remove_invalid_spells(world, id, set);
    if set.is_empty() {
        return None;
    }

    let random = !race.is_smart() && world.rng.one_in(5);
    if let Some(spell) = choose_fast(world, set, random) {
        return Some(spell);
    }

    let mut best = None;
    let mut best_rating = 0;
    for spell in spells_in(set) {
        let info = spell_info(spell);
        let mut rating = info.desire;
        if info.best_range > 0 {
            for _ in info.best_range..cdis {
                rating = rating * info.falloff / 100;
            }
        }
        rating += if race.is_smart() { world.rng.rand_int(10) } else { world.rng.rand_int(50) };
        if rating > best_rating || (rating == best_rating && world.rng.one_in(2)) {
            best_rating = rating;
            best = Some(spell);
        }
    }
    if best_rating == 0 { None } else { best }
}

/// Start a racket centred on `c` that monsters hear along their noise flow
pub(crate) fn monster_noise(world: &mut World, c: Coord, difficulty: i32) {
    world.flows.monster_noise = FlowMap::noise(&world.grid, c);
    monster_perception(world, false, false, difficulty);
}

/// A monster calls for help
pub fn shriek(world: &mut World, id: MonsterId) {
    let Some(m) = world.monsters.get(id) else { return };
    let (pos, seen, smart, name) = (m.pos, m.ml, m.race.is_smart(), m.desc_cap());
    let silence = world.player.singing(Song::Silence);

    let msg = match (seen, smart, silence) {
        (true, true, true) => format!("{name} lets out a muffled shout for help."),
        (true, false, true) => format!("{name} lets out a muffled shriek."),
        (true, true, false) => format!("{name} shouts for help."),
        (true, false, false) => format!("{name} makes a high pitched shriek."),
        (false, true, true) => "You hear a muffled shout for help.".to_string(),
        (false, false, true) => "You hear a muffled shriek.".to_string(),
        (false, true, false) => "You hear a shout for help.".to_string(),
        (false, false, false) => "You hear a shriek.".to_string(),
    };
    world.message(msg);
    world.disturb();
    monster_noise(world, pos, -10);
}

/// Fire a bolt from the monster at the player
fn mon_bolt(world: &mut World, id: MonsterId, from: Coord, typ: DamageType, dd: i32, ds: i32) {
    let proj = Projection::new(Actor::Monster(id), from, world.player.pos, typ)
        .dice(dd, ds)
        .difficulty(-1)
        .flags(ProjectFlags::STOP | ProjectFlags::KILL | ProjectFlags::PLAY);
    project(world, &proj);
}

/// Breathe an arc at the player
fn mon_arc(world: &mut World, id: MonsterId, from: Coord, typ: DamageType, dd: i32, ds: i32, rad: i32, degrees: i32) {
    let rad = if rad == 0 { MAX_SIGHT } else { rad };
    let proj = Projection::new(Actor::Monster(id), from, world.player.pos, typ)
        .dice(dd + 2, ds)
        .radius(rad)
        .difficulty(-1)
        .arc(degrees)
        .flags(ProjectFlags::GRID | ProjectFlags::ITEM | ProjectFlags::KILL | ProjectFlags::PLAY);
    project(world, &proj);
}

/// Carry out a ranged attack. Returns false if the monster is gone or the
/// attack is not one it knows how to make.
pub fn make_attack_ranged(world: &mut World, id: MonsterId, spell: SpellFlags) -> bool {
    let Some(m) = world.monsters.get_mut(id) else { return false };
    let info = spell_info(spell);
    if !spell.intersects(SpellFlags::SONGS) {
        m.mana -= info.mana;
    }
    m.flags.remove(MonsterFlags::ALWAYS_CAST);

    let race = m.race.clone();
    let pos = m.pos;
    let name = m.desc_cap();
    let spower = race.spell_power.max(1);
    let blind = world.player.is(Timed::Blind);
    let seen = !blind && m.ml;
    debug!(monster = %race.name, ?spell, "ranged attack");

    let breath = |spell: SpellFlags| match spell {
        s if s == SpellFlags::BRTH_FIRE => Some((DamageType::Fire, "fire", 60)),
        s if s == SpellFlags::BRTH_COLD => Some((DamageType::Cold, "frost", 60)),
        s if s == SpellFlags::BRTH_POIS => Some((DamageType::Pois, "poisonous gas", 90)),
        s if s == SpellFlags::BRTH_DARK => Some((DamageType::Dark, "darkness", 60)),
        _ => None,
    };

    if spell == SpellFlags::ARROW1 || spell == SpellFlags::ARROW2 {
        let dd = if spell == SpellFlags::ARROW1 { 1 } else { 2 };
        world.disturb();
        if blind {
            world.message(if spower < 2 { "You hear a twang." } else { "You hear a loud thwang." });
        } else {
            world.message(format!("{name} fires an arrow."));
        }
        mon_bolt(world, id, pos, DamageType::Arrow, dd, info.sides);
    } else if spell == SpellFlags::BOULDER {
        world.disturb();
        if blind {
            world.message("You hear something grunt with exertion.");
        } else if spower < 8 {
            world.message(format!("{name} hurls a rock at you."));
        } else {
            world.message(format!("{name} hurls a boulder at you."));
        }
        mon_bolt(world, id, pos, DamageType::Boulder, 6, info.sides);
    } else if let Some((typ, what, degrees)) = breath(spell) {
        world.disturb();
        if blind {
            world.message(format!("{name} breathes."));
        } else {
            world.message(format!("{name} breathes {what}."));
        }
        mon_arc(world, id, pos, typ, race.spell_power, info.sides, race.spell_power / 2, degrees);
        monster_noise(world, pos, -10);
    } else if spell == SpellFlags::SHRIEK {
        shriek(world, id);
    } else if spell == SpellFlags::SCREECH {
        screech(world, id, pos, seen, &name);
    } else if spell == SpellFlags::DARKNESS {
        world.disturb();
        world.message(if blind { format!("{name} mutters.") } else { format!("{name} gestures in shadow.") });
        darken_area(world, 0, 0, 3);
    } else if spell == SpellFlags::SCARE {
        world.disturb();
        let visible = world.monsters.get(id).is_some_and(|m| m.ml);
        if !visible || world.rng.one_in(2) {
            world.message(format!("{name} lets out a terrible cry."));
            monster_noise(world, pos, -10);
        } else {
            world.message(format!("{name} looks into your eyes."));
        }
        if !allow_player(world, Affliction::Fear, Some(id)) && !world.player.is(Timed::Afraid) {
            world.message("You are unafraid.");
        } else {
            let amount = world.rng.damroll(3, 4);
            world.inc_timed(Timed::Afraid, amount);
        }
    } else if spell == SpellFlags::CONF {
        world.disturb();
        world.message(if blind { format!("{name} mutters.") } else { format!("{name} glares at you.") });
        if allow_player(world, Affliction::Confusion, Some(id)) {
            let amount = world.rng.damroll(2, 4);
            world.inc_timed(Timed::Confused, amount);
        }
    } else if spell == SpellFlags::HOLD {
        world.disturb();
        world.message(if blind {
            format!("{name} mutters.")
        } else {
            format!("{name} stares deep into your eyes.")
        });
        let entranced = world.player.is(Timed::Entranced);
        if !allow_player(world, Affliction::Entrancement, Some(id)) {
            if !entranced {
                world.message("You stare back unafraid!");
            }
        } else if !entranced {
            let amount = world.rng.damroll(4, 4);
            world.set_timed(Timed::Entranced, amount);
        }
    } else if spell == SpellFlags::SLOW {
        world.disturb();
        world.message(format!("{name} whispers of fading and decay."));
        if allow_player(world, Affliction::Slowness, Some(id)) {
            let amount = world.rng.damroll(2, 4);
            world.inc_timed(Timed::Slow, amount);
        } else {
            world.message("You resist.");
        }
    } else if spell == SpellFlags::SNG_BINDING {
        song_of_binding(world, id);
    } else if spell == SpellFlags::SNG_PIERCING {
        song_of_piercing(world, id);
    } else if spell == SpellFlags::SNG_OATHS {
        song_of_oaths(world, id);
    } else {
        tracing::warn!(?spell, "unknown ranged attack");
        return false;
    }

    if let Some(m) = world.monsters.get_mut(id) {
        m.min_range = 0;
    }
    if seen {
        world.lore.learn_spells(&race.name, spell);
    }
    if world.player.is_dead {
        let lore = world.lore.entry(&race.name);
        lore.deaths = lore.deaths.saturating_add(1);
    }
    true
}

fn screech(world: &mut World, id: MonsterId, pos: Coord, seen: bool, name: &str) {
    world.disturb();
    let silence = world.player.singing(Song::Silence);
    let msg = if world.player.is(Timed::Stun) || !seen {
        if silence {
            "The air is filled with a muffled screeching.".to_string()
        } else {
            "The air is filled with an unearthly screeching.".to_string()
        }
    } else if silence {
        format!("{name} fixes its malevolent gaze upon you and lets out a muffled screech.")
    } else {
        format!("{name} fixes its malevolent gaze upon you and lets out a terrible screech.")
    };
    world.message(msg);

    if allow_player(world, Affliction::Stun, Some(id)) && world.player.timed(Timed::Stun) < 100 {
        world.message("Your mind reels.");
        world.inc_timed(Timed::Stun, 20);
    }
    if allow_player(world, Affliction::Fear, Some(id)) {
        let amount = world.rng.damroll(2, 4);
        world.inc_timed(Timed::Afraid, amount);
    }
    monster_noise(world, pos, -20);
}
