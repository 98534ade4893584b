//! A monster's turn
//!
//! `process_monster` runs the turn as a chain of gates: the song of
//! mastery, the monster's own song, wandering for the unwary, the
//! activity check, breeding, ranged attacks and finally movement. Each
//! gate that ends the turn says why through the returned [`TurnOutcome`].
//!
//! `process_move` applies a chosen step to the level. Doors and walls
//! give way, other monsters are swapped, shoved aside or eaten, items are
//! picked up or crushed, and pack members share the player's trail.

#[cfg(not(feature = "std"))]
use crate::compat::*;

use tracing::{debug, trace};

use super::movement::make_move;
use super::passable::{cave_exist_mon, cave_passable_mon, update_monster_flow};
use super::range::{find_range, monster_can_smell};
use super::ranged::{choose_ranged_attack, make_attack_ranged, monster_noise};
use super::song::{song_of_binding, song_of_oaths, song_of_piercing};
use super::tactics::get_move;
use super::wander::wander;
use crate::action::{hit_trap, reveal_trap};
use crate::combat::{
    Actor, AttackType, adj_mon_count, make_attack_normal, py_attack_aux, skill_check, unasked,
};
use crate::consts::{
    ALERTNESS_ALERT, BREEDING_HEADROOM, FLEE_RANGE, HEAVY_STUN, MAX_MONSTERS, MAX_SIGHT,
    SMELL_STRENGTH,
};
use crate::dungeon::{CellFlags, Coord, DDD, Direction, Feature, distance, rough_direction};
use crate::monster::{
    MonsterFlags, MonsterId, MonsterRace, MonsterSong, RaceFlags, SpellFlags, Stance, make_alert,
    set_alertness,
};
use crate::object::ItemFlags;
use crate::player::{Abilities, Skill, Song, Timed};
use crate::world::{SkipReason, TurnOutcome, World};

/// Races that call on companions when something goes wrong
fn has_allies(race: &MonsterRace) -> bool {
    race.has(RaceFlags::GROUPED) || race.spells.contains(SpellFlags::SHRIEK)
}

/// Some other monster of the same kind, in sight of this one, is still unaware
pub fn has_sleeping_kin(world: &World, id: MonsterId) -> bool {
    let Some(m) = world.monsters.get(id) else { return false };
    world.monsters.iter().any(|(other, n)| {
        other != id
            && n.race.d_char == m.race.d_char
            && n.alertness < ALERTNESS_ALERT
            && world.grid.los(m.pos, n.pos)
    })
}

/// A shout to the rest of the pack, heard if not seen
fn warning_message(world: &mut World, id: MonsterId) {
    let Some(m) = world.monsters.get(id) else { return };
    let (pos, seen, name) = (m.pos, m.ml, m.desc_cap());
    let muffled = world.player.singing(Song::Silence);

    let (seen_msg, heard_msg) = match (m.race.d_char, muffled) {
        ('o' | '@' | 'G' | 'p', true) => ("shouts a muffled warning.", "You hear a muffled warning shout."),
        ('o' | '@' | 'G' | 'p', false) => ("shouts a warning.", "You hear a warning shout."),
        ('d' | 'D' | 's' | 'S', true) => ("lets out a muffled roar.", "You hear a muffled roar."),
        ('d' | 'D' | 's' | 'S', false) => ("roars in anger.", "You hear a loud roar."),
        ('T', true) => ("lets out a muffled grunt.", "You hear a muffled grunt."),
        ('T', false) => ("grunts in anger.", "You hear a loud grunt."),
        ('C', true) => ("makes a muffled howl.", "You hear a muffled howl."),
        ('C', false) => ("makes a low howl.", "You hear a low howl."),
        (_, true) => ("cries out a muffled warning.", "You hear something cry out a muffled warning."),
        (_, false) => ("cries out a warning.", "You hear something cry out a warning."),
    };
    if seen {
        world.message(format!("{name} {seen_msg}"));
    } else {
        world.message(heard_msg);
    }
    world.disturb();
    monster_noise(world, pos, -10);
}

/// The cry of a pack that has picked up the trail
fn pursuit_message(world: &mut World, id: MonsterId) {
    let Some(m) = world.monsters.get(id) else { return };
    let (seen, name) = (m.ml, m.desc_cap());
    let near = distance(m.pos, world.player.pos) < 20;

    let (seen_msg, near_msg, far_msg) = match m.race.d_char {
        'o' | '@' | 'G' | 'p' => ("shouts excitedly.", "You hear a shout.", "You hear a distant shout."),
        'd' | 'D' | 's' | 'S' => ("roars.", "You hear a loud roar.", "You hear a distant roar."),
        'T' => ("grunts.", "You hear a low grunt.", "You hear a distant grunt."),
        'C' => ("makes a low howl.", "You hear a low howl.", "You hear a distant howl."),
        'f' => ("makes a yowling sound.", "You hear yowling nearby.", "You hear distant yowling."),
        _ => ("roars in anger.", "You hear a loud roar.", "You hear a distant roar."),
    };
    let msg = if seen {
        format!("{name} {seen_msg}")
    } else if near {
        near_msg.to_string()
    } else {
        far_msg.to_string()
    };
    world.message(msg);
}

/// Pass `flag` on to nearby monsters of the same kind, shouting a warning
/// the first time anyone needs telling
pub fn tell_allies(world: &mut World, id: MonsterId, flag: MonsterFlags) {
    let Some(m) = world.monsters.get(id) else { return };
    let (pos, d_char) = (m.pos, m.race.d_char);

    let mut warned = false;
    for other in world.monsters.ids_rev() {
        let Some(n) = world.monsters.get(other) else { continue };
        if n.race.d_char != d_char {
            continue;
        }
        if n.alertness >= ALERTNESS_ALERT && n.flags.contains(flag) {
            continue;
        }
        let mut dist = distance(pos, n.pos);
        if !world.grid.los(pos, n.pos) {
            dist *= 2;
        }
        if dist > 15 {
            continue;
        }
        if !warned {
            warning_message(world, id);
            warned = true;
        }
        // the warning itself may have woken them
        if let Some(n) = world.monsters.get_mut(other).filter(|n| n.alertness >= ALERTNESS_ALERT) {
            n.flags |= MonsterFlags::ACTIVE | flag;
        }
    }
}

/// Shove the monster in the way into a free grid beyond it, roughly in
/// the direction the mover is travelling
fn push_aside(world: &mut World, mover: Coord, other: MonsterId) -> bool {
    let Some(n) = world.monsters.get(other) else { return false };
    let (pos, race) = (n.pos, n.race.clone());
    let dir = Direction::from_delta(pos.y - mover.y, pos.x - mover.x);
    let bias_left = world.rng.one_in(2);

    for side in dir.side_dirs(bias_left).into_iter().take(7) {
        let c = pos.step(side);
        if !world.grid.in_bounds_fully(c) {
            continue;
        }
        if cave_exist_mon(&world.grid, &race, c, false, true) {
            world.monster_swap(pos, c);
            return true;
        }
    }
    false
}

/// A monster slips past the player into their grid, leaving the player
/// in its own. The player may take a swing as it goes.
pub fn monster_exchange_places(world: &mut World, id: MonsterId) {
    let Some(m) = world.monsters.get(id) else { return };
    let (origin, name, lower, pronoun) = (m.pos, m.desc_cap(), m.desc(), m.race.pronoun());

    world.message(format!("{name} exchanges places with you."));
    world.monster_swap(origin, world.player.pos);

    let p = &world.player;
    let can_strike = !p.is(Timed::Afraid) && !p.is(Timed::Entranced) && p.timed(Timed::Stun) <= HEAVY_STUN;
    if can_strike {
        if let Some(pos) = world.monsters.get(id).map(|m| m.pos) {
            world.message(format!("You attack {lower} as {pronoun} slips past."));
            py_attack_aux(world, pos, AttackType::Opportunist, &mut unasked);
        }
    }
    world.learn_flags(id, RaceFlags::EXCHANGE_PLACES);

    let here = world.player.pos;
    let feat = world.grid.feat(here);
    if feat.is_trap() || feat == Feature::Chasm {
        if world.grid.has_info(here, CellFlags::HIDDEN) {
            reveal_trap(world, here);
        }
        hit_trap(world, here);
    }
}

/// A breeder fills a free neighbouring grid with a wide-awake copy
pub fn multiply_monster(world: &mut World, id: MonsterId) -> bool {
    let Some(m) = world.monsters.get(id) else { return false };
    let (pos, race) = (m.pos, m.race.clone());
    let free: Vec<Coord> = DDD
        .iter()
        .map(|&d| pos.step(d))
        .filter(|&c| world.grid.in_bounds_fully(c) && cave_exist_mon(&world.grid, &race, c, false, false))
        .collect();
    let Some(&c) = world.rng.choose(&free) else { return false };
    match world.place_monster(&race.name, c) {
        Ok(child) => {
            if let Some(n) = world.monsters.get_mut(child) {
                n.alertness = ALERTNESS_ALERT;
            }
            debug!(monster = %race.name, at = %c, "monster multiplied");
            true
        }
        Err(_) => false,
    }
}

/// Move a monster into `to`, dealing with whatever is there. Returns
/// whether the attempt did anything: an attack, a change of terrain or a
/// step.
pub fn process_move(world: &mut World, id: MonsterId, to: Coord, bash: bool) -> bool {
    let Some(m) = world.monsters.get(id) else { return false };
    if !world.grid.in_bounds(to) {
        return false;
    }
    let race = m.race.clone();
    let (origin, cdis, alertness) = (m.pos, m.cdis, m.alertness);
    let player = world.player.pos;

    // hidden movers never step into view
    if race.has(RaceFlags::HIDDEN_MOVE) && world.grid.has_info(to, CellFlags::SEEN) {
        if m.ml && world.rng.one_in(50) {
            world.learn_flags(id, RaceFlags::HIDDEN_MOVE);
        }
        return false;
    }

    if world.grid.player_at(to) {
        if alertness < ALERTNESS_ALERT {
            // blundering into the player is how it finds out
            let v = world.rng.rand_range(ALERTNESS_ALERT, ALERTNESS_ALERT + 5);
            set_alertness(world, id, v);
            if let Some(m) = world.monsters.get_mut(id) {
                m.skip_next_turn = false;
            }
            return true;
        }
        if world.player.truce || race.has(RaceFlags::NEVER_BLOW) {
            return false;
        }
        if race.has(RaceFlags::EXCHANGE_PLACES)
            && world.rng.one_in(4)
            && adj_mon_count(world, origin) >= adj_mon_count(world, player)
        {
            monster_exchange_places(world, id);
        } else {
            make_attack_normal(world, id);
        }
        return true;
    }

    let mut learned = RaceFlags::empty();
    let mut do_view = false;
    let mut do_move = true;
    let feat = world.grid.feat(to);

    if feat.is_wall() {
        if race.has(RaceFlags::PASS_WALL) {
            learned |= RaceFlags::PASS_WALL;
        } else if race.has(RaceFlags::KILL_WALL) {
            world.grid.clear_info(to, CellFlags::MARK);
            let door = feat.is_closed_door();
            if world.player_can_see(to) {
                do_view = true;
                learned |= RaceFlags::KILL_WALL;
            } else if cdis <= 10 {
                world.disturb();
                world.message(if door { "You hear a door being smashed open." } else { "You hear grinding noises." });
            }
            world.grid.set_feat(to, if door { Feature::BrokenDoor } else { Feature::Floor });
        } else if race.has(RaceFlags::TUNNEL_WALL) && !feat.is_closed_door() {
            world.grid.clear_info(to, CellFlags::MARK);
            do_move = false;
            if world.player_can_see(to) {
                do_view = true;
                learned |= RaceFlags::TUNNEL_WALL;
            } else if cdis <= 10 {
                world.disturb();
                world.message("You hear grinding noises.");
            }
            world.grid.set_feat(to, if feat == Feature::Rubble { Feature::Floor } else { Feature::Rubble });
        } else if feat.is_closed_door() {
            if race.has(RaceFlags::PASS_DOOR) {
                learned |= RaceFlags::PASS_DOOR;
            } else if bash {
                if world.player_can_see(to) {
                    world.disturb();
                    world.message("The door bursts open!");
                    do_view = true;
                } else if cdis < 20 {
                    world.disturb();
                    world.message("You hear a door burst open!");
                }
                learned |= RaceFlags::BASH_DOOR;
                let broken = world.rng.one_in(2);
                world.grid.set_feat(to, if broken { Feature::BrokenDoor } else { Feature::OpenDoor });
            } else {
                if feat != (Feature::Door { lock: 0 }) {
                    learned |= RaceFlags::UNLOCK_DOOR;
                    world.grid.set_feat(to, Feature::Door { lock: 0 });
                    do_move = false;
                    if world.player_has_los(to) {
                        world.message("You hear a 'click'.");
                    }
                } else {
                    learned |= RaceFlags::OPEN_DOOR;
                    world.grid.set_feat(to, Feature::OpenDoor);
                    // only sometimes straight into the doorway
                    if !world.rng.one_in(5) {
                        do_move = false;
                    }
                }
                if world.player_can_see(to) {
                    do_view = true;
                }
            }
        } else {
            return false;
        }
    } else if feat == Feature::Glyph {
        if world.grid.has_info(to, CellFlags::MARK) {
            world.message("The glyph of warding is broken!");
        }
        world.grid.clear_info(to, CellFlags::MARK);
        world.grid.set_feat(to, Feature::Floor);
    }

    let mut did_swap = false;
    if do_move {
        if let Some(other) = world.grid.monster_at(to) {
            let Some(n) = world.monsters.get(other) else { return false };
            let n_race = n.race.clone();
            if race.has(RaceFlags::KILL_BODY) && !n_race.is_unique() && race.level > n_race.level * 2 {
                learned |= RaceFlags::KILL_BODY;
                debug!(monster = %race.name, victim = %n_race.name, "monster ate another");
                world.delete_monster(other);
            } else {
                did_swap = true;
                if !cave_exist_mon(&world.grid, &n_race, origin, true, true) && !push_aside(world, origin, other) {
                    do_move = false;
                }
            }
        }
    }

    if do_move {
        step_into(world, id, origin, to, did_swap);
        take_or_crush_items(world, id, &mut learned);
    }

    if do_view {
        world.update_view();
    }
    world.learn_flags(id, learned);
    true
}

/// The step itself and the things that happen on the way
fn step_into(world: &mut World, id: MonsterId, origin: Coord, to: Coord, did_swap: bool) {
    let Some(m) = world.monsters.get(id) else { return };
    let race = m.race.clone();
    let player = world.player.pos;

    // a flanker gets a blow in as it slides along the player's side
    if race.has(RaceFlags::FLANKING)
        && distance(origin, player) == 1
        && distance(to, player) == 1
        && m.alertness >= ALERTNESS_ALERT
        && m.stance != Stance::Fleeing
        && m.confused == 0
        && !did_swap
    {
        let name = m.desc_cap();
        world.message(format!("{name} attacks you as it moves by."));
        make_attack_normal(world, id);
        world.learn_flags(id, RaceFlags::FLANKING);
        if !world.monsters.contains(id) || world.player.is_dead {
            return;
        }
    }

    world.monster_swap(origin, to);
    let Some(m) = world.monsters.get_mut(id) else { return };
    if m.pos != to {
        return;
    }
    if m.target == Some(to) {
        m.target = None;
    }

    // record the direction of travel, for charges
    match world.grid.monster_at(origin) {
        Some(pushed) => {
            if let Some(n) = world.monsters.get_mut(pushed) {
                n.flags |= MonsterFlags::PUSHED;
            }
        }
        None => {
            if let Some(m) = world.monsters.get_mut(id) {
                m.previous_action[0] = rough_direction(origin, to).keypad();
            }
        }
    }

    share_the_scent(world, id, origin, to);

    let Some(m) = world.monsters.get(id) else { return };
    if m.ml {
        if world.grid.feat(to).is_closed_door() && race.has(RaceFlags::PASS_DOOR) {
            let name = m.desc_cap();
            world.message(format!("{name} passes under the door."));
        }
        world.disturb();
    }
}

/// A pack member out of the player's sight that stumbles on a fresh trail
/// puts its kin on it too
fn share_the_scent(world: &mut World, id: MonsterId, origin: Coord, to: Coord) {
    let Some(m) = world.monsters.get(id) else { return };
    if world.player_has_los(to)
        || !m.race.has(RaceFlags::FRIENDS)
        || !monster_can_smell(world, id)
        || world.grid.scent_age(origin) != -1
        || m.target.is_some()
    {
        return;
    }
    let d_char = m.race.d_char;

    let mut alerted_others = false;
    for other in world.monsters.ids_rev() {
        let Some(n) = world.monsters.get(other) else { continue };
        if other == id || n.race.d_char != d_char || n.target.is_some() {
            continue;
        }
        if world.grid.scent_age(n.pos) < SMELL_STRENGTH - 10 || !world.grid.los(to, n.pos) {
            continue;
        }
        make_alert(world, id);
        if let Some(n) = world.monsters.get_mut(other) {
            n.flags |= MonsterFlags::ACTIVE;
            n.target = Some(to);
        }
        alerted_others = true;
    }
    if alerted_others {
        trace!(?id, "pack picked up the trail");
        pursuit_message(world, id);
    }
}

/// Scavengers pick up what they walk over; destroyers crush it
fn take_or_crush_items(world: &mut World, id: MonsterId, learned: &mut RaceFlags) {
    let Some(m) = world.monsters.get(id) else { return };
    let (pos, seen, name) = (m.pos, m.ml, m.desc_cap());
    let takes = m.race.has(RaceFlags::TAKE_ITEM);
    if !takes && !m.race.has(RaceFlags::KILL_ITEM) {
        return;
    }
    let watched = world.player_has_los(pos);

    let mut kept = Vec::new();
    for item in world.grid.take_objects(pos) {
        if takes && item.has(ItemFlags::CURSED) && item.known {
            if seen && watched {
                world.message(format!("{name} looks at the {}, but moves on.", item.name));
            }
            kept.push(item);
        } else if takes {
            *learned |= RaceFlags::TAKE_ITEM;
            if seen && watched {
                world.message(format!("{name} picks up the {}.", item.name));
            }
            if let Some(m) = world.monsters.get_mut(id) {
                m.held.push(item);
            }
        } else {
            *learned |= RaceFlags::KILL_ITEM;
            if watched {
                world.message(format!("{name} crushes the {}.", item.name));
            }
        }
    }
    for item in kept {
        world.grid.drop_object(pos, item);
    }
}

/// Whether the song of mastery holds the monster still this turn
fn mastered(world: &mut World, id: MonsterId) -> bool {
    if !world.player.singing(Song::Mastery) {
        return false;
    }
    let Some(m) = world.monsters.get(id) else { return false };
    let difficulty = m.skill(Skill::Will) + 5 + world.flows.player_noise.dist(m.pos);
    let skill = world.player.song_bonus(Song::Mastery);
    skill_check(world, Actor::Player, skill, difficulty, Actor::Monster(id)) > 0
}

/// Keep up, or give up, the monster's song
fn sing(world: &mut World, id: MonsterId) {
    let Some(m) = world.monsters.get_mut(id) else { return };
    let song = m.song;
    if song == MonsterSong::Nothing {
        return;
    }
    if m.mana == 0 || (song == MonsterSong::Piercing && m.alertness >= ALERTNESS_ALERT) {
        m.song = MonsterSong::Nothing;
        let (seen, pos, name, his) = (m.ml, m.pos, m.desc_cap(), m.race.possessive());
        if seen {
            world.message(format!("{name} ends {his} song."));
        } else if world.flows.player_noise.dist(pos) <= 30 {
            world.message("The song ends.");
        }
        return;
    }
    m.mana -= 1;
    match song {
        MonsterSong::Binding => song_of_binding(world, id),
        MonsterSong::Piercing => song_of_piercing(world, id),
        MonsterSong::Oaths => song_of_oaths(world, id),
        MonsterSong::Nothing => {}
    }
}

fn acted(did_something: bool) -> TurnOutcome {
    if did_something { TurnOutcome::Acted } else { TurnOutcome::UsedEnergyOnly }
}

/// Run one turn for a monster that has the energy and is awake enough to
/// take it
pub fn process_monster(world: &mut World, id: MonsterId) -> TurnOutcome {
    let Some(m) = world.monsters.get_mut(id) else {
        return TurnOutcome::Skipped(SkipReason::Vanished);
    };
    m.skip_this_turn = false;

    if mastered(world, id) {
        if let Some(m) = world.monsters.get_mut(id) {
            // no free attacks before its next turn either
            m.skip_this_turn = true;
        }
        return TurnOutcome::Skipped(SkipReason::Mastered);
    }

    sing(world, id);

    let Some(m) = world.monsters.get_mut(id) else {
        return TurnOutcome::Skipped(SkipReason::Vanished);
    };
    let light = m.race.light;
    let relight = light != 0 && m.cdis < MAX_SIGHT + light.abs();
    m.push_action(crate::consts::ACTION_MISC);

    let outcome = if m.alertness < ALERTNESS_ALERT {
        acted(wander(world, id))
    } else {
        hunt(world, id)
    };

    if relight {
        world.update_view();
    }
    trace!(?id, ?outcome, "monster turn");
    outcome
}

/// Whether an alert monster is engaged enough to use full tactics
fn is_active(world: &World, id: MonsterId) -> bool {
    let Some(m) = world.monsters.get(id) else { return false };
    let race = &m.race;
    if m.target.is_some()
        || m.stance == Stance::Fleeing
        || (race.is_morgoth() && world.player.on_the_run)
        || (race.level > 17 && world.player.depth == 0)
    {
        return true;
    }
    if race.has(RaceFlags::SHORT_SIGHTED) {
        return m.cdis <= 2;
    }
    world.grid.los(m.pos, world.player.pos)
        || world.flows.player_noise.dist(m.pos) < 20
        || monster_can_smell(world, id)
}

/// Being hit from somewhere the monster can't answer makes it angry, and
/// smart monsters tell the rest of the pack
fn react_to_attacks(world: &mut World, id: MonsterId) {
    let Some(m) = world.monsters.get(id) else { return };
    let race = m.race.clone();
    let pos = m.pos;
    let in_corridor = !world.grid.has_info(pos, CellFlags::ROOM);
    let ranged_upset = (m.best_range == 1 && in_corridor) || !world.player_has_los(pos);
    let melee_upset = m.cdis > 1 && !m.flags.contains(MonsterFlags::PUSHED);

    for (flag, upset) in [(MonsterFlags::HIT_BY_RANGED, ranged_upset), (MonsterFlags::HIT_BY_MELEE, melee_upset)] {
        let Some(m) = world.monsters.get_mut(id) else { return };
        if !m.flags.contains(flag) {
            continue;
        }
        m.flags.remove(flag);
        if !upset {
            continue;
        }
        m.flags |= MonsterFlags::AGGRESSIVE;
        if race.freq_ranged > 0 {
            m.flags |= MonsterFlags::ALWAYS_CAST;
        }
        if race.is_smart() && has_allies(&race) {
            tell_allies(world, id, MonsterFlags::AGGRESSIVE);
        }
    }
}

/// The turn of an alert monster
fn hunt(world: &mut World, id: MonsterId) -> TurnOutcome {
    update_monster_flow(world, id);
    if world.monsters.get(id).is_some_and(|m| m.min_range == 0) {
        find_range(world, id);
    }

    let active = is_active(world, id);
    let Some(m) = world.monsters.get_mut(id) else {
        return TurnOutcome::Skipped(SkipReason::Vanished);
    };
    m.flags.set(MonsterFlags::ACTIVE, active);

    react_to_attacks(world, id);

    let Some(m) = world.monsters.get_mut(id) else {
        return TurnOutcome::Skipped(SkipReason::Vanished);
    };
    m.flags.remove(MonsterFlags::CHARGED);
    let race = m.race.clone();
    let pos = m.pos;

    if world.rng.one_in(2) && race.is_smart() && world.player_has_los(pos) && has_sleeping_kin(world, id) {
        if has_allies(&race) {
            tell_allies(world, id, MonsterFlags::ACTIVE);
        }
    }

    let Some(m) = world.monsters.get_mut(id) else {
        return TurnOutcome::Skipped(SkipReason::Vanished);
    };
    m.flags.remove(MonsterFlags::PUSHED);
    if !m.flags.contains(MonsterFlags::ACTIVE) {
        return acted(wander(world, id));
    }

    if race.has(RaceFlags::MULTIPLY) && world.monsters.len() < MAX_MONSTERS - BREEDING_HEADROOM {
        let crowd = pos.neighbours().chain(core::iter::once(pos)).filter(|&c| world.grid.monster_at(c).is_some()).count() as i32;
        if crowd <= 3 && world.rng.one_in(crowd * 8) && multiply_monster(world, id) {
            world.learn_flags(id, RaceFlags::MULTIPLY);
            return TurnOutcome::Acted;
        }
    }

    if race.freq_ranged > 0 {
        let Some(m) = world.monsters.get(id) else {
            return TurnOutcome::Skipped(SkipReason::Vanished);
        };
        let mut chance = if m.flags.contains(MonsterFlags::ALWAYS_CAST) { 100 } else { race.freq_ranged };
        if m.confused > 0 || world.player.truce {
            chance = 0;
        }
        if m.stunned > 0 {
            chance /= 2;
        }
        if chance > 0 && world.rng.percent(chance) {
            if let Some(spell) = choose_ranged_attack(world, id) {
                make_attack_ranged(world, id, spell);
                return TurnOutcome::Acted;
            }
        }
    }

    take_step(world, id)
}

/// Choose where to go and go there
fn take_step(world: &mut World, id: MonsterId) -> TurnOutcome {
    let Some(m) = world.monsters.get(id) else {
        return TurnOutcome::Skipped(SkipReason::Vanished);
    };
    let race = m.race.clone();
    let (pos, cdis) = (m.pos, m.cdis);

    let mut random_move = false;
    if race.has(RaceFlags::RAND_25 | RaceFlags::RAND_50) {
        let mut chance = 0;
        if race.has(RaceFlags::RAND_25) {
            chance += 25;
        }
        if race.has(RaceFlags::RAND_50) {
            chance += 50;
        }
        world.learn_flags(id, race.flags & (RaceFlags::RAND_25 | RaceFlags::RAND_50));
        if cdis > 1 {
            chance /= 2;
        }
        random_move = world.rng.percent(chance);
    }

    let mut must_use_target = false;
    if !random_move {
        let in_view = world.player_has_los(pos);
        let Some(m) = world.monsters.get_mut(id) else {
            return TurnOutcome::Skipped(SkipReason::Vanished);
        };
        // charging monsters, and those the player can see, forget their orders
        if m.stance != Stance::Fleeing && ((m.stance == Stance::Aggressive && race.freq_ranged == 0) || in_view) {
            m.target = None;
        }
        must_use_target = m.target.is_some();
    }

    let (target, fear) = if random_move {
        let Some(m) = world.monsters.get(id) else {
            return TurnOutcome::Skipped(SkipReason::Vanished);
        };
        let fear = !race.has(RaceFlags::NEVER_MOVE) && (m.min_range >= FLEE_RANGE || m.stance == Stance::Fleeing);
        let start = world.rng.rand_int(8) as usize;
        let found = (start..start + 8)
            .map(|i| pos.step(DDD[i % 8]))
            .find(|&c| world.grid.in_bounds(c) && cave_passable_mon(world, id, c).is_passable());
        let Some(c) = found else { return TurnOutcome::UsedEnergyOnly };
        if race.has(RaceFlags::NEVER_MOVE) && !world.grid.player_at(c) {
            return TurnOutcome::UsedEnergyOnly;
        }
        (c, fear)
    } else {
        if leap_into_chasm(world, id) {
            return TurnOutcome::Acted;
        }
        match get_move(world, id, must_use_target) {
            Some(intent) => (intent.target, intent.fear),
            None => return stay_put(world, id),
        }
    };

    let Some(step) = make_move(world, id, target, fear) else {
        return TurnOutcome::UsedEnergyOnly;
    };
    acted(process_move(world, id, step.to, step.bash))
}

/// Utter terror next to a chasm ends with a jump
fn leap_into_chasm(world: &mut World, id: MonsterId) -> bool {
    let Some(m) = world.monsters.get(id) else { return false };
    if m.stance != Stance::Fleeing || m.morale >= -200 || m.race.has(RaceFlags::FLYING) {
        return false;
    }
    let pos = m.pos;
    if !world.rng.one_in(2) {
        return false;
    }
    let chasm = DDD
        .iter()
        .map(|&d| pos.step(d))
        .find(|&c| world.grid.in_bounds(c) && world.grid.feat(c) == Feature::Chasm);
    let Some(c) = chasm else { return false };
    world.monster_swap(pos, c);
    true
}

/// A monster that likes where it is: a fleeing one may take the stairs,
/// one out of reach may shoot instead
fn stay_put(world: &mut World, id: MonsterId) -> TurnOutcome {
    let Some(m) = world.monsters.get(id) else {
        return TurnOutcome::Skipped(SkipReason::Vanished);
    };
    let race = m.race.clone();
    let (pos, cdis) = (m.pos, m.cdis);
    let feat = world.grid.feat(pos);

    if race.is_smart() && !race.has(RaceFlags::TERRITORIAL) && m.stance == Stance::Fleeing && feat.is_stair() {
        let (seen, name) = (m.ml, m.desc_cap());
        let (skipping, alertness) = (m.skip_next_turn, m.alertness);
        if seen {
            let way = if feat == Feature::DownStair { "down" } else { "up" };
            world.message(format!("{name} flees {way} the stairs."));
        }
        let p = &world.player;
        let parting_shot = p.has(Abilities::STL_OPPORTUNIST)
            && seen
            && !skipping
            && alertness >= ALERTNESS_ALERT
            && !p.truce
            && !p.is(Timed::Confused)
            && !p.is(Timed::Afraid)
            && !p.is(Timed::Entranced)
            && p.timed(Timed::Stun) <= HEAVY_STUN
            && distance(pos, p.pos) == 1;
        if parting_shot {
            py_attack_aux(world, pos, AttackType::Opportunist, &mut unasked);
        }
        debug!(monster = %race.name, "monster fled the level");
        world.delete_monster(id);
        return TurnOutcome::Acted;
    }

    if cdis > 1 && race.freq_ranged > 0 {
        if let Some(spell) = choose_ranged_attack(world, id) {
            make_attack_ranged(world, id, spell);
            return TurnOutcome::Acted;
        }
    }
    TurnOutcome::UsedEnergyOnly
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Item, ItemKind};
    use crate::world::testing::arena;

    fn alert(world: &mut World, id: MonsterId) {
        world.monsters.get_mut(id).unwrap().alertness = ALERTNESS_ALERT + 5;
    }

    #[test]
    fn test_unwary_monster_notices_instead_of_attacking() {
        let mut world = arena();
        let id = world.place_monster("Snaga", Coord::new(2, 3)).unwrap();
        world.monsters.get_mut(id).unwrap().alertness = ALERTNESS_ALERT - 3;
        let hp = world.player.chp;
        let player = world.player.pos;
        assert!(process_move(&mut world, id, player, false));
        let m = world.monsters.get(id).unwrap();
        assert!(m.alertness >= ALERTNESS_ALERT);
        assert!(!m.skip_next_turn);
        assert_eq!(world.player.chp, hp);
    }

    #[test]
    fn test_doors_open_and_unlock() {
        let mut world = arena();
        let door = Coord::new(1, 2);
        world.grid.set_feat(door, Feature::Door { lock: 0 });
        let id = world.place_monster("Snaga", Coord::new(1, 1)).unwrap();
        assert!(process_move(&mut world, id, door, false));
        assert_eq!(world.grid.feat(door), Feature::OpenDoor);

        let mut world = arena();
        world.grid.set_feat(door, Feature::Door { lock: 3 });
        let id = world.place_monster("Easterling warrior", Coord::new(1, 1)).unwrap();
        assert!(process_move(&mut world, id, door, false));
        assert_eq!(world.grid.feat(door), Feature::Door { lock: 0 });
        assert_eq!(world.monsters.get(id).unwrap().pos, Coord::new(1, 1));
    }

    #[test]
    fn test_bashed_door_gives_way() {
        let mut world = arena();
        let door = Coord::new(1, 2);
        world.grid.set_feat(door, Feature::Door { lock: 5 });
        let id = world.place_monster("Snaga", Coord::new(1, 1)).unwrap();
        assert!(process_move(&mut world, id, door, true));
        assert!(matches!(world.grid.feat(door), Feature::OpenDoor | Feature::BrokenDoor));
        assert_eq!(world.monsters.get(id).unwrap().pos, door);
    }

    #[test]
    fn test_tunnellers_grind_rock_to_rubble_first() {
        let mut world = arena();
        world.update_race("Snaga", |r| r.flags |= RaceFlags::TUNNEL_WALL);
        let rock = Coord::new(1, 0);
        let id = world.place_monster("Snaga", Coord::new(1, 1)).unwrap();
        assert!(process_move(&mut world, id, rock, false));
        assert_eq!(world.grid.feat(rock), Feature::Rubble);
        assert_eq!(world.monsters.get(id).unwrap().pos, Coord::new(1, 1));
    }

    #[test]
    fn test_glyph_is_broken_by_stepping_on_it() {
        let mut world = arena();
        let glyph = Coord::new(1, 2);
        world.grid.set_feat(glyph, Feature::Glyph);
        world.grid.set_info(glyph, CellFlags::MARK);
        let id = world.place_monster("Snaga", Coord::new(1, 1)).unwrap();
        assert!(process_move(&mut world, id, glyph, false));
        assert_eq!(world.grid.feat(glyph), Feature::Floor);
        assert!(world.take_messages().iter().any(|m| m == "The glyph of warding is broken!"));
    }

    #[test]
    fn test_kin_swap_places() {
        let mut world = arena();
        let a = world.place_monster("Snaga", Coord::new(1, 1)).unwrap();
        let b = world.place_monster("Snaga", Coord::new(1, 2)).unwrap();
        assert!(process_move(&mut world, a, Coord::new(1, 2), false));
        assert_eq!(world.monsters.get(a).unwrap().pos, Coord::new(1, 2));
        let b = world.monsters.get(b).unwrap();
        assert_eq!(b.pos, Coord::new(1, 1));
        assert!(b.flags.contains(MonsterFlags::PUSHED));
    }

    #[test]
    fn test_big_monsters_eat_small_ones() {
        let mut world = arena();
        world.update_race("Stone-troll", |r| r.flags |= RaceFlags::KILL_BODY);
        let troll = world.place_monster("Stone-troll", Coord::new(1, 1)).unwrap();
        let snaga = world.place_monster("Snaga", Coord::new(1, 2)).unwrap();
        assert!(process_move(&mut world, troll, Coord::new(1, 2), false));
        assert!(!world.monsters.contains(snaga));
        assert_eq!(world.monsters.get(troll).unwrap().pos, Coord::new(1, 2));
    }

    #[test]
    fn test_scavengers_pick_up_and_crushers_crush() {
        let mut world = arena();
        let c = Coord::new(1, 2);
        world.grid.drop_object(c, Item::new("Dagger", ItemKind::Sword));
        world.grid.drop_object(c, Item::new("Rusty crown", ItemKind::Crown).with_flags(ItemFlags::CURSED));
        let id = world.place_monster("Snaga", Coord::new(1, 1)).unwrap();
        assert!(process_move(&mut world, id, c, false));
        let m = world.monsters.get(id).unwrap();
        assert_eq!(m.held.len(), 1);
        assert_eq!(m.held[0].name, "Dagger");
        assert_eq!(world.grid.objects_at(c).len(), 1);

        let worm = world.place_monster("Green worm mass", Coord::new(3, 1)).unwrap();
        world.grid.drop_object(Coord::new(3, 2), Item::new("Apple", ItemKind::Food));
        assert!(process_move(&mut world, worm, Coord::new(3, 2), false));
        assert!(world.grid.objects_at(Coord::new(3, 2)).is_empty());
    }

    #[test]
    fn test_tell_allies_shouts_once_and_alerts_the_awake() {
        let mut world = arena();
        let a = world.place_monster("Cave orc", Coord::new(1, 1)).unwrap();
        let b = world.place_monster("Cave orc", Coord::new(1, 6)).unwrap();
        let c = world.place_monster("Cave orc", Coord::new(3, 6)).unwrap();
        alert(&mut world, a);
        alert(&mut world, b);
        alert(&mut world, c);
        world.take_messages();
        tell_allies(&mut world, a, MonsterFlags::AGGRESSIVE);
        for id in [b, c] {
            let n = world.monsters.get(id).unwrap();
            assert!(n.flags.contains(MonsterFlags::AGGRESSIVE | MonsterFlags::ACTIVE));
        }
        let shouts = world
            .take_messages()
            .iter()
            .filter(|m| m.contains("warning"))
            .count();
        assert_eq!(shouts, 1);
    }

    #[test]
    fn test_sleeping_kin_in_sight() {
        let mut world = arena();
        let a = world.place_monster("Cave orc", Coord::new(1, 1)).unwrap();
        let b = world.place_monster("Cave orc", Coord::new(3, 7)).unwrap();
        alert(&mut world, a);
        world.monsters.get_mut(b).unwrap().alertness = -15;
        assert!(has_sleeping_kin(&world, a));
        alert(&mut world, b);
        assert!(!has_sleeping_kin(&world, a));
    }

    #[test]
    fn test_exchange_places_with_the_player() {
        let mut world = arena();
        world.player.chp = 10_000;
        world.player.mhp = 10_000;
        world.player.timed.set(Timed::Afraid, 50);
        let start = Coord::new(2, 3);
        let id = world.place_monster("Easterling warrior", start).unwrap();
        // company behind it, so the player's square is no more crowded
        world.place_monster("Snaga", Coord::new(2, 2)).unwrap();
        alert(&mut world, id);
        let player = world.player.pos;
        let mut swapped = false;
        for _ in 0..200 {
            process_move(&mut world, id, player, false);
            if world.player.pos != player {
                swapped = true;
                break;
            }
        }
        assert!(swapped);
        assert_eq!(world.player.pos, start);
        assert_eq!(world.monsters.get(id).unwrap().pos, player);
    }

    #[test]
    fn test_alert_monster_next_to_player_acts() {
        let mut world = arena();
        world.player.chp = 10_000;
        world.player.mhp = 10_000;
        let id = world.place_monster("Snaga", Coord::new(2, 3)).unwrap();
        alert(&mut world, id);
        world.update_noise();
        assert_eq!(process_monster(&mut world, id), TurnOutcome::Acted);
    }

    #[test]
    fn test_mastered_monsters_lose_their_turn() {
        let mut world = arena();
        world.player.skill_use[Skill::Song.index()] = 200;
        world.player.songs_known.push(Song::Mastery);
        world.player.song1 = Song::Mastery;
        let id = world.place_monster("Snaga", Coord::new(1, 1)).unwrap();
        alert(&mut world, id);
        assert_eq!(process_monster(&mut world, id), TurnOutcome::Skipped(SkipReason::Mastered));
        assert!(world.monsters.get(id).unwrap().skip_this_turn);
    }

    #[test]
    fn test_breeders_multiply() {
        let mut world = arena();
        let id = world.place_monster("Green worm mass", Coord::new(1, 1)).unwrap();
        alert(&mut world, id);
        world.update_noise();
        for _ in 0..200 {
            if world.monsters.len() > 1 {
                break;
            }
            if world.monsters.contains(id) {
                process_monster(&mut world, id);
            }
        }
        assert!(world.monsters.len() > 1);
    }

    #[test]
    fn test_fleeing_smart_monster_leaves_by_the_stairs() {
        let mut world = arena();
        let stair = Coord::new(1, 1);
        world.grid.set_feat(stair, Feature::DownStair);
        let id = world.place_monster("Cave orc", stair).unwrap();
        alert(&mut world, id);
        world.monsters.get_mut(id).unwrap().stance = Stance::Fleeing;
        assert_eq!(stay_put(&mut world, id), TurnOutcome::Acted);
        assert!(!world.monsters.contains(id));
        assert!(world.take_messages().iter().any(|m| m == "The Cave orc flees down the stairs."));
    }
}
