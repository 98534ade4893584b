//! Songs of power
//!
//! A singer holds a main theme and, with woven themes, a minor one. Each
//! song's strength comes from the Song skill, halved for the minor theme,
//! and each turn of singing costs voice.

#[cfg(not(feature = "std"))]
use crate::compat::*;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use super::skills::{Abilities, Skill};
use crate::dungeon::{CellFlags, Feature};
use crate::monster::{RaceTraits, set_alertness};
use crate::world::World;

/// A song the player can sing
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
)]
#[repr(u8)]
pub enum Song {
    #[default]
    Nothing,
    Elbereth,
    Slaying,
    Silence,
    Freedom,
    Trees,
    Aule,
    Staying,
    Lorien,
    Este,
    Sharpness,
    Mastery,
}

impl Song {
    /// Voice cost this turn, given how long the song has gone on and
    /// whether it is the main (1) or minor (2) theme
    pub const fn cost(self, duration: i32, theme: i32) -> i32 {
        match self {
            Song::Nothing => 0,
            Song::Slaying | Song::Silence | Song::Freedom | Song::Trees | Song::Aule => {
                if duration % 3 == theme - 1 { 1 } else { 0 }
            }
            _ => 1,
        }
    }

    /// Strength of the song from a song skill score
    pub const fn strength(self, skill: i32) -> i32 {
        let bonus = match self {
            Song::Nothing => 0,
            Song::Elbereth | Song::Slaying | Song::Freedom | Song::Lorien | Song::Mastery => skill,
            Song::Silence => skill / 2,
            Song::Trees => skill / 5,
            Song::Aule | Song::Este => skill / 4,
            Song::Staying => skill / 3,
            Song::Sharpness => skill * 2,
        };
        let bonus = if matches!(self, Song::Este) && bonus < 2 { 2 } else { bonus };
        if bonus < 0 { 0 } else { bonus }
    }
}

/// One turn of singing: pay the voice cost and apply the songs that act on
/// monsters every turn. Singing stops when voice runs out.
pub fn sing(world: &mut World) {
    let p = &world.player;
    if p.song1 == Song::Nothing {
        return;
    }
    let lost_theme = p.song2 != Song::Nothing && !p.has(Abilities::SNG_WOVEN_THEMES);
    if p.csp < 1 || lost_theme || !p.knows_song(p.song1) || !p.knows_song(p.song2) {
        world.change_song(Song::Nothing);
        world.disturb();
        return;
    }
    world.player.song_duration += 1;

    let mut cost = 0;
    for theme in 1..=2 {
        let song = if theme == 1 { world.player.song1 } else { world.player.song2 };
        let score = world.player.song_bonus(song);
        cost += song.cost(world.player.song_duration, theme);
        match song {
            Song::Elbereth => song_of_elbereth(world, score),
            Song::Lorien => song_of_lorien(world, score),
            Song::Freedom => song_of_freedom(world, score),
            _ => {}
        }
    }

    let p = &mut world.player;
    p.csp = (p.csp - cost).max(0);
}

/// Disarm traps, reveal secret doors and loosen locks within earshot
fn song_of_freedom(world: &mut World, score: i32) {
    let base = if world.player.depth > 0 { world.player.depth / 2 } else { 10 };
    let coords: Vec<_> = world.grid.coords().filter(|&c| world.grid.in_bounds_fully(c)).collect();
    for c in coords {
        let feat = world.grid.feat(c);
        let dist = world.flows.player_noise.dist(c);
        match feat {
            Feature::Trap(_) => {
                if world.skill_check_player(score, base + 5 + dist) > 0 {
                    world.grid.set_feat(c, Feature::Floor);
                }
            }
            Feature::SecretDoor => {
                if world.skill_check_player(score, base + dist) > 0 {
                    world.grid.set_feat(c, Feature::Door { lock: 0 });
                    if world.grid.has_info(c, CellFlags::SEEN) {
                        world.message("You have found a secret door.");
                        world.disturb();
                    }
                }
            }
            Feature::Door { lock } if lock > 0 => {
                let result = world.skill_check_player(score, base + dist);
                if result > 0 {
                    let lock = (lock as i32 - result).max(0) as u8;
                    world.grid.set_feat(c, Feature::Door { lock });
                }
            }
            _ => {}
        }
    }
}

/// Frighten intelligent monsters
fn song_of_elbereth(world: &mut World, score: i32) {
    for id in world.monsters.ids_rev() {
        let Some(m) = world.monsters.get(id) else { continue };
        let mut resistance = m.skill(Skill::Will);
        if !m.race.is_smart() {
            resistance += 100;
        }
        if m.race.is_morgoth() {
            resistance += 100;
        }
        let dist = world.flows.player_noise.dist(m.pos);
        let result = world.skill_check_vs_monster(score, resistance + dist, id);
        if result > 0 {
            if let Some(m) = world.monsters.get_mut(id) {
                m.tmp_morale -= result * 10;
            }
        }
    }
}

/// Lull monsters towards sleep
fn song_of_lorien(world: &mut World, score: i32) {
    for id in world.monsters.ids_rev() {
        let Some(m) = world.monsters.get(id) else { continue };
        let mut resistance = m.skill(Skill::Will);
        if m.race.traits.contains(RaceTraits::NO_SLEEP) {
            resistance += 100;
            world.learn_traits(id, RaceTraits::NO_SLEEP);
        }
        let Some(m) = world.monsters.get(id) else { continue };
        let dist = world.flows.player_noise.dist(m.pos);
        let result = world.skill_check_vs_monster(score, resistance + 5 + dist, id);
        if result > 0 {
            let alertness = world.monsters.get(id).map(|m| m.alertness).unwrap_or_default();
            set_alertness(world, id, alertness - result);
        }
    }
}
