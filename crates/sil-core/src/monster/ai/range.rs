//! Preferred fighting distance and tracking by scent

#[cfg(not(feature = "std"))]
use crate::compat::*;

use crate::consts::{FLEE_RANGE, MON_MANA_MAX, SMELL_STRENGTH, TURN_RANGE};
use crate::monster::{MonsterId, RaceFlags, SpellFlags, Stance};
use crate::world::World;

/// Work out how close a monster wants to be to the player: `min_range`
/// is the distance it will not willingly come inside, `best_range` the
/// distance it tries to fight from
pub fn find_range(world: &mut World, id: MonsterId) {
    let player_speed = world.player.speed;
    let truce = world.player.truce;
    let Some(m) = world.monsters.get_mut(id) else { return };
    let race = m.race.clone();

    m.min_range = if m.stance == Stance::Fleeing
        || (race.has(RaceFlags::LOW_MANA_RUN) && m.mana < MON_MANA_MAX / 5)
    {
        FLEE_RANGE
    } else {
        1
    };

    if m.min_range < FLEE_RANGE {
        if race.has(RaceFlags::NEVER_MOVE) {
            m.min_range += 3;
        }
        if race.has(RaceFlags::NEVER_BLOW) {
            m.min_range += 3;
        }
        // spies keep their distance
        if race.is_smart() && race.spells.contains(SpellFlags::SHRIEK) && m.stance != Stance::Aggressive {
            m.min_range = 10;
        }
    } else {
        m.min_range = FLEE_RANGE;
    }

    // cornered and too slow to run
    if m.cdis < TURN_RANGE && m.speed() < player_speed {
        m.min_range = 1;
    }

    m.best_range = m.min_range;

    if race.freq_ranged > 15 && !race.is_morgoth() {
        if race.spells.intersects(SpellFlags::BREATH) && m.best_range < 6 {
            m.best_range = 2;
        } else if m.mana >= MON_MANA_MAX / 5 {
            m.best_range = (m.best_range + (race.freq_ranged - 15) / 5).min(8);
            m.min_range = m.best_range - 1;
        }
    }

    if truce && m.min_range < 5 {
        m.min_range = 5;
        m.best_range = 5;
    }
}

/// Can the monster pick up the player's trail where it stands?
/// Wolves follow any scent; cats only a fresh one.
pub fn monster_can_smell(world: &World, id: MonsterId) -> bool {
    let Some(m) = world.monsters.get(id) else { return false };
    let age = world.grid.scent_age(m.pos);
    if age < 0 {
        return false;
    }
    match m.race.d_char {
        'C' => true,
        'f' => age <= SMELL_STRENGTH / 2,
        _ => false,
    }
}
