//! Projections against objects on the floor

#[cfg(not(feature = "std"))]
use crate::compat::*;

use super::DamageType;
use crate::dungeon::Coord;
use crate::object::{Item, ItemKind};
use crate::world::World;

/// What a projection does to one item
enum Fate {
    Spared,
    /// Destroyed, with the verb for one and for many
    Destroyed(&'static str, &'static str),
}

fn fate(item: &mut Item, typ: DamageType) -> Fate {
    let kind = item.kind;
    match typ {
        DamageType::Acid if kind.hates_acid() => Fate::Destroyed(" melts!", " melt!"),
        DamageType::Elec if kind.hates_elec() => Fate::Destroyed(" is destroyed!", " are destroyed!"),
        DamageType::Fire if kind.hates_fire() => Fate::Destroyed(" burns up!", " burn up!"),
        DamageType::Cold | DamageType::Sound | DamageType::Earthquake if kind.hates_cold() => {
            Fate::Destroyed(" shatters!", " shatter!")
        }
        DamageType::KillTrap | DamageType::KillDoor => {
            // disarm or unlock chests
            if kind == ItemKind::Chest && item.pval > 0 {
                item.pval = -item.pval;
            }
            Fate::Spared
        }
        DamageType::Identify => {
            item.known = true;
            Fate::Spared
        }
        _ => Fate::Spared,
    }
}

/// Apply a projection to every object on a grid. Returns true if the
/// player saw something destroyed.
pub fn project_o(world: &mut World, c: Coord, typ: DamageType) -> bool {
    let seen = world.player_can_see(c);
    let mut obvious = false;
    let mut idx = 0;

    while idx < world.grid.objects_at(c).len() {
        let Some(item) = world.grid.objects_at_mut(c).and_then(|pile| pile.get_mut(idx)) else {
            break;
        };
        let Fate::Destroyed(one, many) = fate(item, typ) else {
            idx += 1;
            continue;
        };
        let plural = item.number > 1;
        let name = item.name.clone();

        if item.artefact {
            if seen {
                let verb = if plural { "are" } else { "is" };
                world.message(format!("The {name} {verb} unaffected!"));
            }
            idx += 1;
            continue;
        }

        if seen {
            obvious = true;
            world.message(format!("The {name}{}", if plural { many } else { one }));
        }
        world.grid.remove_object(c, idx);
    }
    obvious
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::testing::arena;

    #[test]
    fn test_fire_burns_arrows_but_not_swords() {
        let mut world = arena();
        let c = Coord::new(1, 5);
        let mut arrows = Item::new("Arrows", ItemKind::Arrow);
        arrows.number = 12;
        world.grid.drop_object(c, arrows);
        world.grid.drop_object(c, Item::new("Short Sword", ItemKind::Sword));
        assert!(project_o(&mut world, c, DamageType::Fire));
        let left: Vec<_> = world.grid.objects_at(c).iter().map(|i| i.name.as_str()).collect();
        assert_eq!(left, vec!["Short Sword"]);
        assert_eq!(world.messages, vec!["The Arrows burn up!"]);
    }

    #[test]
    fn test_artefacts_survive() {
        let mut world = arena();
        let c = Coord::new(1, 5);
        let mut ring = Item::new("Ring of Barahir", ItemKind::Ring);
        ring.artefact = true;
        world.grid.drop_object(c, ring);
        assert!(!project_o(&mut world, c, DamageType::Elec));
        assert_eq!(world.grid.objects_at(c).len(), 1);
        assert_eq!(world.messages, vec!["The Ring of Barahir is unaffected!"]);
    }

    #[test]
    fn test_unlocking_chests() {
        let mut world = arena();
        let c = Coord::new(3, 3);
        let mut chest = Item::new("Small wooden chest", ItemKind::Chest);
        chest.pval = 4;
        world.grid.drop_object(c, chest);
        assert!(!project_o(&mut world, c, DamageType::KillDoor));
        assert_eq!(world.grid.objects_at(c)[0].pval, -4);
    }

    #[test]
    fn test_identify_reveals() {
        let mut world = arena();
        let c = Coord::new(1, 1);
        let mut flask = Item::new("Flask of oil", ItemKind::Flask);
        flask.known = false;
        world.grid.drop_object(c, flask);
        project_o(&mut world, c, DamageType::Identify);
        assert!(world.grid.objects_at(c)[0].known);
    }
}
