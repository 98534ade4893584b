//! Walking, leaping and bumping into things

#[cfg(not(feature = "std"))]
use crate::compat::*;

use tracing::{debug, info};

use super::search::perceive;
use super::trap::{check_hit, hit_trap, reveal_trap};
use super::{ActionResult, attack_outcome};
use crate::combat::{AttackType, flanking_or_retreat, py_attack};
use crate::consts::ACTION_MISC;
use crate::dungeon::{CellFlags, Coord, Direction, Feature, TrapKind, scramble_direction};
use crate::player::{Abilities, Skill, Stat, Timed};
use crate::world::World;

/// Is there a visible monster at `c`?
fn visible_monster(world: &World, c: Coord) -> bool {
    world
        .grid
        .monster_at(c)
        .and_then(|id| world.monsters.get(id))
        .is_some_and(|m| m.ml)
}

fn in_pit(world: &World, c: Coord) -> bool {
    matches!(world.grid.feat(c), Feature::Trap(TrapKind::Pit | TrapKind::SpikedPit))
}

/// Can the player try to walk into `c`? Known walls and rubble refuse
/// without using a turn; unknown grids are worth a try.
pub fn walk_test(world: &mut World, c: Coord) -> Result<(), String> {
    if !world.grid.in_bounds(c) || !world.grid.has_info(c, CellFlags::MARK) || visible_monster(world, c) {
        return Ok(());
    }
    let feat = world.grid.feat(c);
    if feat.is_floor() || feat.is_known_closed_door() {
        return Ok(());
    }
    world.player.previous_action[0] = ACTION_MISC;
    if feat == Feature::Rubble {
        Err("There is a pile of rubble in the way!".to_string())
    } else {
        Err("There is a wall in the way!".to_string())
    }
}

/// The walk command: a confused player may lurch the wrong way
pub fn walk(world: &mut World, dir: Direction, confirm: &mut dyn FnMut(&str) -> bool) -> ActionResult {
    let pos = world.player.pos;
    if let Err(msg) = walk_test(world, pos.step(dir)) {
        return ActionResult::Failed(msg);
    }

    let mut dir = dir;
    if world.player.is(Timed::Confused) {
        let roll = world.rng.damroll(3, 2) - world.rng.damroll(3, 2);
        let scrambled = scramble_direction(dir, roll);
        if scrambled != dir {
            world.message("You are confused.");
            dir = scrambled;
        }
        if let Err(msg) = walk_test(world, pos.step(dir)) {
            // the lurch still took the turn
            world.message(msg);
            return ActionResult::Success;
        }
    }
    move_player(world, dir, confirm)
}

/// Step out of the level
fn escape(world: &mut World) -> ActionResult {
    info!(turn = world.turn, "player escaped");
    world.player.note("You escaped the Iron Hells.");
    world.player.leaving = true;
    ActionResult::Success
}

/// Open a known closed door by walking into it
fn open_door(world: &mut World, c: Coord) -> ActionResult {
    let Feature::Door { lock } = world.grid.feat(c) else {
        return ActionResult::NoTime;
    };
    world.player.previous_action[0] = ACTION_MISC;

    if lock >= 8 {
        world.message("The door appears to be stuck.");
        return ActionResult::Success;
    }
    if lock > 0 {
        let p = &world.player;
        let score = p.skill(Skill::Perception);
        let mut difficulty = i32::from(lock) + 5;
        if p.is(Timed::Blind) || world.grid.light(p.pos) <= 0 || p.is(Timed::Image) {
            difficulty += 5;
        }
        if p.is(Timed::Confused) {
            difficulty += 5;
        }
        if world.skill_check_player(score, difficulty) <= 0 {
            world.message("You failed to pick the lock.");
            return ActionResult::Success;
        }
        world.message("You have picked the lock.");
    }
    world.grid.set_feat(c, Feature::OpenDoor);
    world.update_view();
    debug!(at = %c, lock, "opened a door");
    ActionResult::Success
}

/// Bumping into something solid
fn blocked(world: &mut World, c: Coord) -> ActionResult {
    world.disturb();
    let what = match world.grid.feat(c) {
        Feature::Rubble => "a pile of rubble",
        Feature::Door { .. } => "a door",
        _ => "a wall",
    };
    if world.grid.has_info(c, CellFlags::MARK) {
        world.message(format!("There is {what} blocking your way."));
    } else {
        world.message(format!("You feel {what} blocking your way."));
        world.grid.set_info(c, CellFlags::MARK);
    }
    world.player.previous_action[0] = ACTION_MISC;
    ActionResult::Success
}

/// Try to tear free of a web. Strength and free action help.
pub fn break_free_of_web(world: &mut World) -> bool {
    let p = &world.player;
    let mut difficulty = 7;
    let score = (p.stat(Stat::Str) * 2).max(difficulty - 8);
    difficulty -= 10 * p.free_act;
    world.disturb();

    if world.skill_check_player(score, difficulty) <= 0 {
        world.message("You fail to break free of the web.");
        world.player.previous_action[0] = ACTION_MISC;
        return false;
    }
    world.message("You break free!");
    let pos = world.player.pos;
    world.grid.clear_info(pos, CellFlags::MARK);
    world.grid.set_feat(pos, Feature::Floor);
    true
}

enum Leap {
    /// Leaping is not on the cards; carry on as a normal step
    No,
    /// The player is now in the air
    Airborne,
    /// The move ended some other way
    Done(ActionResult),
}

/// Chasms, known pits and known false floors can be leapt with a run up
fn try_leap(world: &mut World, dir: Direction, mid: Coord, confirm: &mut dyn FnMut(&str) -> bool) -> Leap {
    let pos = world.player.pos;
    let run_up = (-1..=1).any(|i| world.player.previous_action[1] == dir.rotate(i).keypad());
    let end = mid.step(dir);
    world.disturb();

    if in_pit(world, pos) {
        world.message("You cannot leap from within a pit.");
        return Leap::No;
    }
    if world.grid.feat(pos) == Feature::Trap(TrapKind::Web) {
        world.message("You cannot leap from within a web.");
        return Leap::No;
    }
    if !run_up {
        world.message("You cannot leap without a run up.");
        return Leap::No;
    }
    let end_known = world.grid.in_bounds(end) && world.grid.has_info(end, CellFlags::MARK);
    if end_known && world.grid.feat(end).is_wall() {
        world.message("You cannot leap over as there is no room to land.");
        return Leap::No;
    }

    let seen = world.grid.in_bounds(end) && world.grid.has_info(end, CellFlags::SEEN);
    let prompt = if !seen && !end_known {
        Some("Are you sure you wish to leap into the unknown? ".to_string())
    } else if world.grid.feat(end) == Feature::Chasm {
        Some("Are you sure you wish to leap into the abyss? ".to_string())
    } else if visible_monster(world, end) {
        let id = world.grid.monster_at(end);
        let name = id.map(|id| world.monster_name(id)).unwrap_or_default();
        Some(format!("Are you sure you wish to leap into {name}? "))
    } else {
        None
    };
    if let Some(prompt) = prompt {
        if !confirm(&prompt) {
            return Leap::No;
        }
    }

    if !world.grid.occupant(mid).is_empty() {
        world.message("An unseen foe blocks your way.");
        let struck = py_attack(world, mid, AttackType::Main, confirm);
        return Leap::Done(attack_outcome(world, struck));
    }
    flanking_or_retreat(world, mid, confirm);
    world.player.previous_action[0] = dir.keypad();
    world.monster_swap(pos, mid);
    world.player.leaping = true;
    debug!(at = %mid, "player leaps");
    Leap::Airborne
}

/// Whether the player can climb between two squares rather than fall.
/// There is no climbing: chasms always swallow whoever steps in.
pub fn climbable(_world: &World, _from: Coord, _to: Coord) -> bool {
    false
}

/// Move the player one step, attacking, opening, leaping or springing
/// traps as the destination demands
pub fn move_player(world: &mut World, dir: Direction, confirm: &mut dyn FnMut(&str) -> bool) -> ActionResult {
    let from = world.player.pos;
    let to = from.step(dir);

    if !world.grid.in_bounds(to) {
        return escape(world);
    }
    if visible_monster(world, to) {
        let struck = py_attack(world, to, AttackType::Main, confirm);
        return attack_outcome(world, struck);
    }
    let feat = world.grid.feat(to);
    let marked = world.grid.has_info(to, CellFlags::MARK);
    if marked && feat.is_known_closed_door() {
        return open_door(world, to);
    }
    if !feat.is_floor() {
        return blocked(world, to);
    }

    if world.player.total_weight() > world.player.weight_limit() * 3 / 2 {
        world.message("You are too burdened to move.");
        world.disturb();
        return ActionResult::NoTime;
    }

    let climb = climbable(world, from, to);
    let chasm = feat == Feature::Chasm && !climb;
    if !world.player.is(Timed::Confused) && marked {
        let known_fall = world.grid.known_trap(to)
            && matches!(feat, Feature::Trap(TrapKind::Pit | TrapKind::SpikedPit | TrapKind::FalseFloor));
        if chasm || known_fall {
            if world.player.has(Abilities::EVN_LEAPING) {
                match try_leap(world, dir, to, confirm) {
                    Leap::Airborne => return ActionResult::Success,
                    Leap::Done(result) => return result,
                    Leap::No => {}
                }
            }
            if chasm {
                world.disturb();
                if !confirm("Step into the chasm? ") {
                    return ActionResult::Cancelled;
                }
            }
        }
        if world.grid.known_trap(to) {
            world.disturb();
            if !confirm("Are you sure you want to step on the trap? ") {
                return ActionResult::Cancelled;
            }
        }
    }

    if !world.grid.occupant(to).is_empty() {
        world.message("An unseen foe blocks your way.");
        let struck = py_attack(world, to, AttackType::Main, confirm);
        return attack_outcome(world, struck);
    }

    if in_pit(world, from) {
        let difficulty = if world.grid.feat(from) == Feature::Trap(TrapKind::Pit) { 10 } else { 15 };
        world.disturb();
        if check_hit(world, difficulty) {
            world.message("You try to climb out of the pit, but fail.");
            world.player.previous_action[0] = ACTION_MISC;
            return ActionResult::Success;
        }
        world.message("You climb out of the pit.");
    }
    if world.grid.feat(from) == Feature::Trap(TrapKind::Web) && !break_free_of_web(world) {
        return ActionResult::Success;
    }

    flanking_or_retreat(world, to, confirm);
    world.monster_swap(from, to);
    if world.player.is_dead || world.player.pos != to {
        return ActionResult::Success;
    }
    perceive(world);
    world.player.previous_action[0] = dir.keypad();

    let here = world.grid.feat(to);
    if here.is_stair() {
        world.grid.set_info(to, CellFlags::MARK);
    }
    if here == Feature::Forge {
        world.message("You enter a forge.");
        world.grid.set_info(to, CellFlags::MARK);
    }
    if here.is_trap() || (here == Feature::Chasm && !climb) {
        if world.grid.hidden_trap(to) {
            reveal_trap(world, to);
        }
        hit_trap(world, to);
    }
    ActionResult::Success
}

/// Second half of a leap: fly on in the same direction and land
pub fn continue_leap(world: &mut World, confirm: &mut dyn FnMut(&str) -> bool) -> ActionResult {
    let Some(dir) = Direction::from_keypad(world.player.previous_action[1]) else {
        land(world);
        return ActionResult::Success;
    };
    let pos = world.player.pos;
    let end = pos.step(dir);
    world.message("You fly through the air.");
    world.player.previous_action[0] = dir.keypad();

    let feat = if world.grid.in_bounds(end) { world.grid.feat(end) } else { Feature::Permanent };
    if feat.is_wall() {
        match feat {
            Feature::Rubble => world.message("You slam into a wall of rubble."),
            Feature::Door { .. } | Feature::SecretDoor => world.message("You slam into a door."),
            _ => world.message("You slam into a wall."),
        }
    } else if let Some(id) = world.grid.monster_at(end) {
        if visible_monster(world, end) {
            let name = world.monster_name_cap(id);
            world.message(format!("{name} blocks your landing."));
        } else {
            world.message("Some unseen foe blocks your landing.");
        }
    } else {
        flanking_or_retreat(world, end, confirm);
        world.monster_swap(pos, end);
    }
    land(world);
    ActionResult::Success
}

/// Come down wherever the leap ended, springing anything underfoot
fn land(world: &mut World) {
    world.player.leaping = false;
    world.player.stealth_score -= 5;
    let pos = world.player.pos;
    let feat = world.grid.feat(pos);
    if feat.is_trap() || feat == Feature::Chasm {
        if world.grid.hidden_trap(pos) {
            reveal_trap(world, pos);
        }
        hit_trap(world, pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::testing::arena;

    fn yes(_: &str) -> bool {
        true
    }

    fn no(_: &str) -> bool {
        false
    }

    #[test]
    fn test_walk_into_known_wall_takes_no_time() {
        let mut world = arena();
        world.monster_swap(world.player.pos, Coord::new(1, 4));
        let result = walk(&mut world, Direction::North, &mut no);
        assert_eq!(result, ActionResult::Failed("There is a wall in the way!".to_string()));
        assert!(!result.takes_time());
        assert_eq!(world.player.previous_action[0], ACTION_MISC);
    }

    #[test]
    fn test_bump_into_unknown_wall_remembers_it() {
        let mut world = arena();
        world.monster_swap(world.player.pos, Coord::new(1, 4));
        let wall = Coord::new(0, 4);
        world.grid.clear_info(wall, CellFlags::MARK);
        let result = walk(&mut world, Direction::North, &mut no);
        assert_eq!(result, ActionResult::Success);
        assert!(world.grid.has_info(wall, CellFlags::MARK));
        assert_eq!(world.take_messages(), vec!["You feel a wall blocking your way."]);
    }

    #[test]
    fn test_step_moves_and_records_direction() {
        let mut world = arena();
        let from = world.player.pos;
        assert_eq!(move_player(&mut world, Direction::East, &mut no), ActionResult::Success);
        assert_eq!(world.player.pos, from.step(Direction::East));
        assert_eq!(world.player.previous_action[0], Direction::East.keypad());
        assert!(world.grid.player_at(world.player.pos));
        assert!(world.grid.occupant(from).is_empty());
    }

    #[test]
    fn test_walking_into_a_visible_monster_attacks() {
        let mut world = arena();
        let c = world.player.pos.step(Direction::West);
        world.place_monster("Snaga", c).expect("room for the orc");
        world.update_monsters();
        let pos = world.player.pos;
        assert_eq!(move_player(&mut world, Direction::West, &mut yes), ActionResult::Success);
        assert_eq!(world.player.pos, pos);
        assert_eq!(world.player.previous_action[0], ACTION_MISC);
    }

    #[test]
    fn test_unlocked_door_opens() {
        let mut world = arena();
        let c = world.player.pos.step(Direction::North);
        world.grid.set_feat(c, Feature::Door { lock: 0 });
        world.grid.set_info(c, CellFlags::MARK);
        assert_eq!(move_player(&mut world, Direction::North, &mut no), ActionResult::Success);
        assert_eq!(world.grid.feat(c), Feature::OpenDoor);
        assert_ne!(world.player.pos, c);
    }

    #[test]
    fn test_stuck_door_stays_shut() {
        let mut world = arena();
        let c = world.player.pos.step(Direction::North);
        world.grid.set_feat(c, Feature::Door { lock: 9 });
        world.grid.set_info(c, CellFlags::MARK);
        assert_eq!(move_player(&mut world, Direction::North, &mut no), ActionResult::Success);
        assert_eq!(world.grid.feat(c), Feature::Door { lock: 9 });
        assert_eq!(world.take_messages(), vec!["The door appears to be stuck."]);
    }

    #[test]
    fn test_declining_a_known_trap_costs_nothing() {
        let mut world = arena();
        let c = world.player.pos.step(Direction::East);
        world.grid.place_trap(c, TrapKind::Dart, false);
        world.grid.set_info(c, CellFlags::MARK);
        let pos = world.player.pos;
        assert_eq!(move_player(&mut world, Direction::East, &mut no), ActionResult::Cancelled);
        assert_eq!(world.player.pos, pos);
    }

    #[test]
    fn test_accepting_a_known_trap_springs_it() {
        let mut world = arena();
        world.player.chp = 100;
        world.player.mhp = 100;
        let c = world.player.pos.step(Direction::East);
        world.grid.place_trap(c, TrapKind::Pit, false);
        world.grid.set_info(c, CellFlags::MARK);
        assert_eq!(move_player(&mut world, Direction::East, &mut yes), ActionResult::Success);
        assert_eq!(world.player.pos, c);
        assert!(world.take_messages().contains(&"You fall into a pit!".to_string()));
    }

    #[test]
    fn test_hidden_trap_is_revealed_when_sprung() {
        let mut world = arena();
        world.player.chp = 100;
        world.player.mhp = 100;
        let c = world.player.pos.step(Direction::East);
        world.grid.place_trap(c, TrapKind::Alarm, true);
        move_player(&mut world, Direction::East, &mut no);
        assert!(world.grid.known_trap(c));
        assert!(world.take_messages().contains(&"You hear a bell toll loudly above your head.".to_string()));
    }

    #[test]
    fn test_overburdened_player_cannot_move() {
        let mut world = arena();
        world.player.pack_weight = world.player.weight_limit() * 2;
        let pos = world.player.pos;
        assert_eq!(move_player(&mut world, Direction::East, &mut no), ActionResult::NoTime);
        assert_eq!(world.player.pos, pos);
    }

    #[test]
    fn test_web_holds_a_weak_player() {
        let mut world = arena();
        let pos = world.player.pos;
        world.grid.place_trap(pos, TrapKind::Web, false);
        world.player.stat_use[Stat::Str.index()] = -10;
        world.player.free_act = 0;
        // score is floored at -1 against difficulty 7, so escapes are rare
        let stuck = (0..20)
            .filter(|_| {
                world.grid.place_trap(pos, TrapKind::Web, false);
                !break_free_of_web(&mut world)
            })
            .count();
        assert!(stuck > 6);
    }

    #[test]
    fn test_leap_needs_a_run_up() {
        let mut world = arena();
        world.player.abilities |= Abilities::EVN_LEAPING;
        let c = world.player.pos.step(Direction::East);
        world.grid.set_feat(c, Feature::Chasm);
        world.grid.set_info(c, CellFlags::MARK);
        let pos = world.player.pos;
        assert_eq!(move_player(&mut world, Direction::East, &mut no), ActionResult::Cancelled);
        assert_eq!(world.player.pos, pos);
        assert!(world.take_messages().contains(&"You cannot leap without a run up.".to_string()));
    }

    #[test]
    fn test_leap_carries_over_a_chasm() {
        let mut world = arena();
        world.player.abilities |= Abilities::EVN_LEAPING;
        let start = Coord::new(2, 2);
        world.monster_swap(world.player.pos, start);
        let mid = start.step(Direction::East);
        world.grid.set_feat(mid, Feature::Chasm);
        world.grid.set_info(mid, CellFlags::MARK);
        world.player.previous_action = [Direction::East.keypad(), Direction::East.keypad(), 0, 0];
        world.player.push_action(0);

        assert_eq!(move_player(&mut world, Direction::East, &mut no), ActionResult::Success);
        assert_eq!(world.player.pos, mid);
        assert!(world.player.leaping);

        world.player.push_action(0);
        continue_leap(&mut world, &mut no);
        assert_eq!(world.player.pos, mid.step(Direction::East));
        assert!(!world.player.leaping);
        assert!(!world.player.leaving);
    }

    #[test]
    fn test_walking_off_the_map_escapes() {
        let mut world = arena();
        // standing in a gap in the outer wall
        let edge = Coord::new(0, 4);
        world.grid.set_feat(edge, Feature::Floor);
        world.monster_swap(world.player.pos, edge);
        assert_eq!(move_player(&mut world, Direction::North, &mut no), ActionResult::Success);
        assert!(world.player.leaving);
        assert!(!world.player.is_dead);
    }

    #[test]
    fn test_known_chasm_cannot_be_climbed_into() {
        let mut world = arena();
        let c = world.player.pos.step(Direction::East);
        world.grid.set_feat(c, Feature::Chasm);
        world.grid.set_info(c, CellFlags::MARK);
        assert!(!climbable(&world, world.player.pos, c));
        assert_eq!(move_player(&mut world, Direction::East, &mut no), ActionResult::Cancelled);
        assert_eq!(move_player(&mut world, Direction::East, &mut yes), ActionResult::Success);
        assert!(world.player.leaving);
        assert!(world.player.depth > 0);
    }
}
