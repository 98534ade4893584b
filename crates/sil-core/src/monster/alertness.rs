//! Alertness transitions
//!
//! Alertness runs from deep sleep through unwary to very alert. Crossing
//! a threshold upwards can cost the monster its next turn while it takes
//! in the situation; the player is told about the transitions they can see.

#[cfg(not(feature = "std"))]
use crate::compat::*;

use tracing::debug;

use super::race::MORGOTH;
use super::ai::new_wandering_flow;
use super::MonsterId;
use crate::consts::{
    ALERTNESS_ALERT, ALERTNESS_MAX, ALERTNESS_MIN, ALERTNESS_QUITE_ALERT, ALERTNESS_UNWARY,
};
use crate::monster::RaceFlags;
use crate::object::{Item, ItemKind};
use crate::world::World;

/// Name of the crown dropped by Morgoth
pub const IRON_CROWN: &str = "the Iron Crown of Morgoth";

/// Make sure a monster is at least alert, with a little random extra
pub fn make_alert(world: &mut World, id: MonsterId) {
    let Some(current) = world.monsters.get(id).map(|m| m.alertness) else { return };
    let level = world.rng.rand_range(ALERTNESS_ALERT, ALERTNESS_QUITE_ALERT);
    set_alertness(world, id, current.max(level));
}

/// Set a monster's alertness, clamped to the scale, with the messages and
/// side effects of each threshold crossed
pub fn set_alertness(world: &mut World, id: MonsterId, alertness: i32) {
    let Some(m) = world.monsters.get_mut(id) else { return };
    let old = m.alertness;
    let new = alertness.clamp(ALERTNESS_MIN, ALERTNESS_MAX);
    if old == new {
        return;
    }
    m.alertness = new;
    let visible = m.ml;
    let territorial = m.race.has(RaceFlags::TERRITORIAL);
    let is_morgoth = m.race.is_morgoth();
    let name = m.desc_cap();
    debug!(monster = %name, old, new, "alertness changed");

    if new > old {
        let noticed = if old < ALERTNESS_UNWARY && new >= ALERTNESS_ALERT {
            Some("wakes up and notices you")
        } else if old < ALERTNESS_UNWARY && new >= ALERTNESS_UNWARY {
            Some("wakes up")
        } else if old < ALERTNESS_ALERT && new >= ALERTNESS_ALERT {
            Some("notices you")
        } else {
            None
        };

        if new >= ALERTNESS_ALERT && old < ALERTNESS_ALERT {
            if let Some(m) = world.monsters.get_mut(id) {
                m.skip_next_turn = true;
            }
        }

        if !visible {
            return;
        }
        match noticed {
            Some(what) => {
                world.message(format!("{name} {what}."));
                world.disturb();
            }
            None if old < ALERTNESS_UNWARY && new >= ALERTNESS_UNWARY - 2 => {
                world.message(format!("{name} stirs."));
            }
            None if old < ALERTNESS_ALERT && new >= ALERTNESS_ALERT - 2 => {
                world.message(format!("{name} looks around."));
            }
            None => {}
        }
    } else if old >= ALERTNESS_UNWARY && new < ALERTNESS_UNWARY {
        if visible {
            world.message(format!("{name} falls asleep."));
            if is_morgoth {
                drop_iron_crown(
                    world,
                    id,
                    "His crown slips from off his brow and falls to the ground nearby.",
                );
            }
        }
    } else if old >= ALERTNESS_ALERT && new < ALERTNESS_ALERT && visible {
        world.message(format!("{name} becomes unwary."));
        if !territorial {
            let target = world.player.pos;
            new_wandering_flow(world, id, Some(target));
        }
    }
}

/// Morgoth loses his crown: it lands on a floor grid beside him and he
/// is left weaker in body and sharper in mind
pub fn drop_iron_crown(world: &mut World, id: MonsterId, msg: &str) {
    if world.crown_dropped {
        return;
    }
    let Some(m) = world.monsters.get(id) else { return };
    let pos = m.pos;
    world.message(msg);

    let mut spot = None;
    for _ in 0..1000 {
        let c = pos.offset(world.rng.rand_range(-1, 1), world.rng.rand_range(-1, 1));
        if c != pos && world.grid.in_bounds(c) && world.grid.is_floor(c) {
            spot = Some(c);
            break;
        }
    }
    let mut crown = Item::new(IRON_CROWN, ItemKind::Crown);
    crown.artefact = true;
    world.grid.drop_object(spot.unwrap_or(pos), crown);
    world.crown_dropped = true;

    world.update_race(MORGOTH, |r| {
        r.pd -= 1;
        r.light = 0;
        r.wil += 5;
        r.per += 5;
    });
    world.update_view();
    debug!("iron crown dropped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dungeon::Coord;
    use crate::world::testing::arena;
    use proptest::prelude::*;

    fn snaga(world: &mut World, alertness: i32) -> MonsterId {
        let id = world.place_monster("Snaga", Coord::new(1, 1)).unwrap();
        world.monsters.get_mut(id).unwrap().alertness = alertness;
        world.take_messages();
        id
    }

    #[test]
    fn test_waking_and_noticing_is_one_message() {
        let mut world = arena();
        let id = snaga(&mut world, -15);
        set_alertness(&mut world, id, 5);
        let m = world.monsters.get(id).unwrap();
        assert!(m.skip_next_turn);
        assert_eq!(world.take_messages(), vec!["The Snaga wakes up and notices you."]);
    }

    #[test]
    fn test_stirring() {
        let mut world = arena();
        let id = snaga(&mut world, -15);
        set_alertness(&mut world, id, -12);
        assert_eq!(world.take_messages(), vec!["The Snaga stirs."]);
        set_alertness(&mut world, id, -11);
        assert_eq!(world.take_messages(), vec!["The Snaga stirs."]);
        assert!(!world.monsters.get(id).unwrap().skip_next_turn);
    }

    #[test]
    fn test_falling_asleep_and_unwary() {
        let mut world = arena();
        let id = snaga(&mut world, 5);
        set_alertness(&mut world, id, -5);
        assert_eq!(world.take_messages(), vec!["The Snaga becomes unwary."]);
        set_alertness(&mut world, id, -15);
        assert_eq!(world.take_messages(), vec!["The Snaga falls asleep."]);
    }

    #[test]
    fn test_unseen_changes_are_silent() {
        let mut world = arena();
        let id = snaga(&mut world, -15);
        world.monsters.get_mut(id).unwrap().ml = false;
        set_alertness(&mut world, id, 5);
        assert!(world.take_messages().is_empty());
        assert!(world.monsters.get(id).unwrap().skip_next_turn);
    }

    #[test]
    fn test_make_alert_never_lowers() {
        let mut world = arena();
        let id = snaga(&mut world, 18);
        make_alert(&mut world, id);
        assert_eq!(world.monsters.get(id).unwrap().alertness, 18);
        let sleeper = world.place_monster("Snaga", Coord::new(3, 7)).unwrap();
        world.monsters.get_mut(sleeper).unwrap().alertness = -20;
        make_alert(&mut world, sleeper);
        assert!(world.monsters.get(sleeper).unwrap().alertness >= ALERTNESS_ALERT);
    }

    #[test]
    fn test_sleeping_morgoth_drops_crown() {
        let mut world = arena();
        let id = world.place_monster(MORGOTH, Coord::new(2, 6)).unwrap();
        world.monsters.get_mut(id).unwrap().alertness = 5;
        let pd = world.race(MORGOTH).unwrap().pd;
        set_alertness(&mut world, id, -15);
        assert!(world.crown_dropped);
        assert_eq!(world.race(MORGOTH).unwrap().pd, pd - 1);
        assert_eq!(world.monsters.get(id).unwrap().race.light, 0);
        let crowns = world
            .grid
            .coords()
            .filter(|&c| world.grid.objects_at(c).iter().any(|o| o.name == IRON_CROWN))
            .count();
        assert_eq!(crowns, 1);
        // only once
        drop_iron_crown(&mut world, id, "again");
        assert!(!world.messages.iter().any(|m| m == "again"));
    }

    proptest! {
        #[test]
        fn prop_alertness_stays_on_scale(start in -20i32..=20, target in -1000i32..1000) {
            let mut world = arena();
            let id = snaga(&mut world, start);
            set_alertness(&mut world, id, target);
            let a = world.monsters.get(id).unwrap().alertness;
            prop_assert!((ALERTNESS_MIN..=ALERTNESS_MAX).contains(&a));
        }
    }
}
