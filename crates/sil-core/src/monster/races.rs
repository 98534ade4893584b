//! Built-in bestiary
//!
//! A small set of races covering the behaviours the AI distinguishes:
//! packs, archers, breathers, singers, mindless and stationary monsters.
//! Larger tables can be loaded as JSON.

#[cfg(not(feature = "std"))]
use crate::compat::*;

use super::race::{
    Blow, BlowEffect as E, BlowMethod as M, MORGOTH, MonsterRace, OATHWRAITH, RaceFlags as F,
    RaceTraits as T, SpellFlags as S,
};

#[allow(clippy::too_many_arguments)]
fn race(
    name: &str,
    d_char: char,
    level: i32,
    (hdice, hside): (i32, i32),
    (evn, pd, ps): (i32, i32, i32),
    speed: i32,
    (sleep, per, stl, wil): (i32, i32, i32, i32),
    blows: &[Blow],
) -> MonsterRace {
    let mut r = MonsterRace::new(name, d_char);
    r.level = level;
    r.hdice = hdice;
    r.hside = hside;
    r.evn = evn;
    r.pd = pd;
    r.ps = ps;
    r.speed = speed;
    r.sleep = sleep;
    r.per = per;
    r.stl = stl;
    r.wil = wil;
    r.blows = blows.to_vec();
    r
}

/// Every built-in race
pub fn builtin_races() -> Vec<MonsterRace> {
    let mut races = Vec::new();

    let mut r = race("Snaga", 'o', 2, (8, 4), (2, 1, 4), 2, (15, 2, 3, 0),
        &[Blow::new(M::Hit, E::Hurt, 4, 1, 7)]);
    r.flags = F::FRIENDS | F::OPEN_DOOR | F::BASH_DOOR | F::TAKE_ITEM | F::MALE;
    r.traits = T::ORC | T::HURT_LITE;
    races.push(r);

    let mut r = race("Cave orc", 'o', 4, (11, 10), (3, 1, 6), 2, (20, 3, 2, 1),
        &[Blow::new(M::Hit, E::Hurt, 7, 1, 10)]);
    r.flags = F::FRIENDS | F::OPEN_DOOR | F::BASH_DOOR | F::SMART | F::MALE;
    r.traits = T::ORC | T::HURT_LITE;
    races.push(r);

    let mut r = race("Orc archer", 'o', 5, (11, 10), (4, 1, 6), 2, (20, 4, 2, 1),
        &[Blow::new(M::Hit, E::Hurt, 6, 1, 8)]);
    r.flags = F::FRIENDS | F::OPEN_DOOR | F::BASH_DOOR | F::SMART | F::MALE;
    r.traits = T::ORC | T::HURT_LITE;
    r.freq_ranged = 30;
    r.spell_power = 6;
    r.mana = 10;
    r.spells = S::ARROW1;
    races.push(r);

    let mut r = race("Grishnakh, the Hill Orc", 'o', 7, (25, 10), (6, 3, 4), 2, (20, 6, 5, 3),
        &[
            Blow::new(M::Hit, E::Hurt, 10, 1, 10),
            Blow::new(M::Touch, E::Hurt, 10, 0, 0),
        ]);
    r.flags = F::UNIQUE | F::MALE | F::SMART | F::OPEN_DOOR | F::BASH_DOOR | F::TAKE_ITEM
        | F::ESCORTS | F::CRUEL_BLOW | F::RIPOSTE;
    r.traits = T::ORC | T::HURT_LITE;
    races.push(r);

    let mut r = race("Wolf", 'C', 4, (10, 5), (6, 0, 0), 3, (20, 8, 4, 0),
        &[Blow::new(M::Bite, E::Hurt, 6, 1, 6)]);
    r.flags = F::FRIENDS | F::FLANKING;
    r.traits = T::WOLF;
    races.push(r);

    let mut r = race("Warg", 'C', 8, (16, 6), (7, 2, 4), 3, (20, 9, 4, 2),
        &[Blow::new(M::Bite, E::Hurt, 9, 1, 8)]);
    r.flags = F::FRIENDS | F::FLANKING | F::CHARGE;
    r.traits = T::WOLF;
    races.push(r);

    let mut r = race("Wildcat", 'f', 2, (5, 6), (5, 0, 0), 3, (10, 6, 5, 0),
        &[
            Blow::new(M::Claw, E::Hurt, 5, 1, 3),
            Blow::new(M::Claw, E::Hurt, 5, 1, 3),
        ]);
    r.flags = F::RAND_25;
    races.push(r);

    let mut r = race("Crebain", 'B', 2, (3, 4), (4, 0, 0), 3, (10, 8, 4, 0),
        &[Blow::new(M::Peck, E::Hurt, 3, 1, 3)]);
    r.flags = F::FRIENDS | F::FLYING | F::RAND_50 | F::SMART;
    r.spells = S::SHRIEK;
    r.freq_ranged = 20;
    r.mana = 10;
    races.push(r);

    let mut r = race("Giant black spider", 'S', 9, (20, 8), (6, 2, 4), 2, (10, 7, 4, 2),
        &[
            Blow::new(M::Bite, E::Poison, 9, 2, 6),
            Blow::new(M::Sting, E::Hurt, 9, 1, 8),
        ]);
    r.flags = F::FRIENDS;
    r.traits = T::SPIDER | T::HURT_LITE | T::RES_POIS;
    r.spells = S::SCREECH;
    r.freq_ranged = 10;
    r.mana = 10;
    races.push(r);

    let mut r = race("Stone-troll", 'T', 11, (40, 10), (3, 4, 4), 2, (25, 4, 1, 2),
        &[
            Blow::new(M::Hit, E::Batter, 10, 3, 6),
            Blow::new(M::Bite, E::Hurt, 10, 2, 6),
        ]);
    r.flags = F::FRIEND | F::OPEN_DOOR | F::BASH_DOOR | F::KNOCK_BACK | F::MALE;
    r.traits = T::TROLL | T::STONE | T::HURT_LITE;
    races.push(r);

    let mut r = race("Barrow-wight", 'W', 12, (20, 10), (8, 3, 4), 2, (30, 8, 5, 6),
        &[
            Blow::new(M::Hit, E::Hurt, 11, 1, 8),
            Blow::new(M::Touch, E::Entrance, 11, 0, 0),
        ]);
    r.flags = F::FRIENDS | F::PASS_DOOR | F::SMART | F::CRUEL_BLOW;
    r.traits = T::UNDEAD | T::NO_FEAR | T::NO_CONF | T::NO_SLEEP | T::RES_COLD | T::RES_POIS;
    r.spells = S::SCARE | S::HOLD | S::DARKNESS;
    r.freq_ranged = 20;
    r.spell_power = 12;
    r.mana = 10;
    races.push(r);

    let mut r = race("Young fire-drake", 'd', 13, (30, 10), (7, 4, 4), 2, (30, 7, 2, 4),
        &[
            Blow::new(M::Claw, E::Hurt, 12, 1, 8),
            Blow::new(M::Bite, E::Fire, 12, 2, 8),
        ]);
    r.flags = F::BASH_DOOR;
    r.traits = T::DRAGON | T::RES_FIRE | T::HURT_COLD | T::NO_CONF;
    r.spells = S::BRTH_FIRE;
    r.freq_ranged = 15;
    r.spell_power = 13;
    r.mana = 10;
    races.push(r);

    let mut r = race("Green worm mass", 'w', 1, (5, 4), (0, 0, 0), 1, (10, 1, 6, -5),
        &[Blow::new(M::Crawl, E::Poison, 2, 1, 3)]);
    r.flags = F::MINDLESS | F::RAND_50 | F::MULTIPLY | F::KILL_ITEM;
    r.traits = T::HURT_LITE | T::RES_POIS | T::NO_FEAR | T::NO_CONF | T::NO_SLEEP;
    races.push(r);

    let mut r = race("Shrieker", ',', 2, (2, 4), (0, 0, 0), 2, (0, 4, 10, 0),
        &[]);
    r.flags = F::NEVER_MOVE | F::NEVER_BLOW | F::MINDLESS;
    r.traits = T::NO_FEAR;
    r.spells = S::SHRIEK;
    r.freq_ranged = 25;
    r.mana = 10;
    races.push(r);

    let mut r = race("Easterling warrior", 'p', 6, (14, 10), (6, 3, 4), 2, (20, 5, 3, 3),
        &[Blow::new(M::Hit, E::Hurt, 9, 2, 6)]);
    r.flags = F::FRIENDS | F::SMART | F::OPEN_DOOR | F::UNLOCK_DOOR | F::BASH_DOOR | F::MALE
        | F::EXCHANGE_PLACES | F::ZONE_OF_CONTROL;
    r.spells = S::ARROW2;
    r.freq_ranged = 15;
    r.spell_power = 6;
    r.mana = 10;
    races.push(r);

    let mut r = race(MORGOTH, 'V', 20, (140, 10), (20, 4, 4), 2, (0, 20, 10, 25),
        &[
            Blow::new(M::Hit, E::Shatter, 25, 7, 10),
            Blow::new(M::Hit, E::Shatter, 25, 7, 10),
        ]);
    r.flags = F::UNIQUE | F::MALE | F::SMART | F::NEVER_MOVE | F::ESCORTS | F::RES_CRIT
        | F::KNOCK_BACK | F::ELFBANE;
    r.traits = T::NO_FEAR | T::NO_CONF | T::NO_SLEEP | T::NO_STUN | T::RES_FIRE | T::RES_COLD
        | T::RES_POIS;
    r.spells = S::SNG_BINDING | S::SNG_PIERCING | S::SNG_OATHS | S::DARKNESS;
    r.freq_ranged = 20;
    r.spell_power = 20;
    r.mana = 10;
    r.light = -2;
    races.push(r);

    // called up by the song of oaths
    let mut r = race(OATHWRAITH, 'W', 14, (20, 10), (10, 3, 4), 2, (0, 8, 6, 8),
        &[Blow::new(M::Hit, E::Hurt, 13, 2, 8)]);
    r.flags = F::PASS_DOOR | F::SMART | F::ZONE_OF_CONTROL;
    r.traits = T::UNDEAD | T::NO_FEAR | T::NO_CONF | T::NO_SLEEP | T::RES_COLD | T::RES_POIS;
    r.rarity = 0;
    races.push(r);

    races
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_races_are_named_uniquely() {
        let races = builtin_races();
        let mut names: Vec<_> = races.iter().map(|r| r.name.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), races.len());
        assert!(races.iter().any(|r| r.is_morgoth()));
    }

    #[test]
    fn test_blowless_races_never_blow() {
        for r in builtin_races() {
            if r.blows.is_empty() {
                assert!(r.has(F::NEVER_BLOW), "{} has no blows", r.name);
            }
        }
    }
}
