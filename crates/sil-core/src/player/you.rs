//! The player character

#[cfg(not(feature = "std"))]
use crate::compat::*;

use serde::{Deserialize, Serialize};

use super::equipment::Equipment;
use super::skills::{Abilities, Bane, PlayerRace, Skill, Stat};
use super::song::Song;
use super::timed::{Conditions, Timed};
use crate::consts::{
    ACTION_MAX, ACTION_NOTHING, BASE_STAT_MAX, BASE_STAT_MIN, HEALTH_ALMOST_DEAD, NORMAL_SPEED,
    STEALTH_MODE_BONUS, health_level,
};
use crate::dungeon::Coord;
use crate::monster::MonsterId;
use crate::object::{Item, ItemFlags};

/// The player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub pos: Coord,
    pub race: PlayerRace,
    /// Current dungeon level
    pub depth: i32,

    // Stats and skills
    pub stat_base: [i32; Stat::COUNT],
    pub stat_drain: [i32; Stat::COUNT],
    pub stat_use: [i32; Stat::COUNT],
    pub skill_base: [i32; Skill::COUNT],
    pub skill_use: [i32; Skill::COUNT],
    pub abilities: Abilities,
    pub songs_known: Vec<Song>,
    /// Foe chosen for the Bane ability
    pub bane: Bane,

    // Pools
    pub chp: i32,
    pub mhp: i32,
    pub csp: i32,
    pub msp: i32,
    pub energy: i32,
    pub speed: i32,

    pub timed: Conditions,
    pub equipment: Equipment,
    /// Weight carried in the pack, in tenths of a pound
    pub pack_weight: i32,

    // Derived from equipment and abilities
    pub resist_fire: i32,
    pub resist_cold: i32,
    pub resist_pois: i32,
    pub resist_fear: i32,
    pub resist_blind: i32,
    pub resist_confu: i32,
    pub resist_stun: i32,
    pub free_act: i32,
    pub aggravate: i32,
    pub cursed: bool,
    pub cowardice: i32,
    pub danger: i32,
    /// Melee dice for the main and off hands
    pub mdd: i32,
    pub mds: i32,
    pub mdd2: i32,
    pub mds2: i32,
    pub offhand_mel_mod: i32,
    pub light_radius: i32,

    // Songs
    pub song1: Song,
    pub song2: Song,
    pub song_duration: i32,
    /// Built up by the song of slaying
    pub wrath: i32,

    // Combat state
    /// Most recent action first: keypad directions, `ACTION_NOTHING` or `ACTION_MISC`
    pub previous_action: [u8; ACTION_MAX],
    pub last_attack: Option<MonsterId>,
    pub consecutive_attacks: i32,
    /// Set by passing a turn with the focused attack ability
    pub focused: bool,
    pub ripostes: i32,
    pub skip_next_turn: bool,
    pub leaping: bool,
    pub stealth_mode: bool,
    pub resting: bool,
    /// Noise made this turn, compared against monster perception
    pub stealth_score: i32,
    /// The player attacked this turn
    pub attacked: bool,
    /// The player was attacked this turn
    pub was_attacked: bool,
    /// Morgoth's throne room truce
    pub truce: bool,
    /// Fleeing Angband with a Silmaril
    pub on_the_run: bool,
    pub morgoth_hits: i32,
    pub crown_hint: bool,
    pub target: Option<MonsterId>,

    // Fate
    pub is_dead: bool,
    pub died_from: String,
    pub leaving: bool,
    /// Notes for the character history: text and depth
    pub notes: Vec<(String, i32)>,
}

impl Default for Player {
    fn default() -> Self {
        Self::new(PlayerRace::default())
    }
}

impl Player {
    /// A fresh character with average stats and no skills
    pub fn new(race: PlayerRace) -> Self {
        let mut p = Self {
            pos: Coord::default(),
            race,
            depth: 1,
            stat_base: [0; Stat::COUNT],
            stat_drain: [0; Stat::COUNT],
            stat_use: [0; Stat::COUNT],
            skill_base: [0; Skill::COUNT],
            skill_use: [0; Skill::COUNT],
            abilities: Abilities::empty(),
            songs_known: Vec::new(),
            bane: Bane::Nothing,
            chp: 30,
            mhp: 30,
            csp: 10,
            msp: 10,
            energy: 0,
            speed: NORMAL_SPEED,
            timed: Conditions::new(),
            equipment: Equipment::new(),
            pack_weight: 0,
            resist_fire: 0,
            resist_cold: 0,
            resist_pois: 0,
            resist_fear: 0,
            resist_blind: 0,
            resist_confu: 0,
            resist_stun: 0,
            free_act: 0,
            aggravate: 0,
            cursed: false,
            cowardice: 0,
            danger: 0,
            mdd: 1,
            mds: 1,
            mdd2: 0,
            mds2: 0,
            offhand_mel_mod: 0,
            light_radius: 0,
            song1: Song::Nothing,
            song2: Song::Nothing,
            song_duration: 0,
            wrath: 0,
            previous_action: [ACTION_NOTHING; ACTION_MAX],
            last_attack: None,
            consecutive_attacks: 0,
            focused: false,
            ripostes: 0,
            skip_next_turn: false,
            leaping: false,
            stealth_mode: false,
            resting: false,
            stealth_score: 0,
            attacked: false,
            was_attacked: false,
            truce: false,
            on_the_run: false,
            morgoth_hits: 0,
            crown_hint: false,
            target: None,
            is_dead: false,
            died_from: String::new(),
            leaving: false,
            notes: Vec::new(),
        };
        p.calc_bonuses();
        p
    }

    pub fn has(&self, ability: Abilities) -> bool {
        self.abilities.contains(ability)
    }

    pub fn skill(&self, skill: Skill) -> i32 {
        self.skill_use[skill.index()]
    }

    pub fn stat(&self, stat: Stat) -> i32 {
        self.stat_use[stat.index()]
    }

    pub fn timed(&self, t: Timed) -> i32 {
        self.timed.get(t)
    }

    pub fn is(&self, t: Timed) -> bool {
        self.timed.is_set(t)
    }

    pub fn is_alive(&self) -> bool {
        !self.is_dead
    }

    /// Is this song currently being sung, as either theme?
    pub fn singing(&self, song: Song) -> bool {
        if song == Song::Nothing {
            return self.song1 == Song::Nothing && self.song2 == Song::Nothing;
        }
        self.song1 == song || self.song2 == song
    }

    pub fn knows_song(&self, song: Song) -> bool {
        song == Song::Nothing || self.songs_known.contains(&song)
    }

    /// Strength of a song from the Song skill, halved for the minor theme
    pub fn song_bonus(&self, song: Song) -> i32 {
        let mut skill = self.skill(Skill::Song);
        if self.song1 != song {
            skill /= 2;
        }
        song.strength(skill)
    }

    /// Bonus to melee and archery from the song of slaying
    pub fn slaying_song_bonus(&self) -> i32 {
        (self.song_bonus(Song::Slaying) * self.wrath + 999) / 1000
    }

    pub fn weapon(&self) -> Option<&Item> {
        self.equipment.weapon.as_ref()
    }

    /// Bonus sides for a hand-and-a-half weapon wielded with both hands
    pub fn hand_and_a_half_bonus(&self) -> i32 {
        match self.weapon() {
            Some(w) if w.has(ItemFlags::HAND_AND_A_HALF) && self.equipment.off_hand.is_none() => 2,
            _ => 0,
        }
    }

    pub fn two_handed_melee(&self) -> bool {
        self.weapon().is_some_and(|w| w.has(ItemFlags::TWO_HANDED)) || self.hand_and_a_half_bonus() > 0
    }

    /// Damage sides for a weapon given the wielder's strength.
    /// Strength helps or hinders by at most a tenth of the weapon's weight,
    /// a fifth with the momentum ability.
    pub fn strength_modified_ds(&self, weapon: Option<&Item>, str_adjustment: i32) -> i32 {
        let str_to_mds = self.stat(Stat::Str) + str_adjustment;
        let mut mds = match weapon {
            None => 1 + str_to_mds,
            Some(w) => {
                let mut sides = w.ds;
                if self.two_handed_melee() {
                    sides += self.hand_and_a_half_bonus();
                }
                let divisor = if self.has(Abilities::MEL_MOMENTUM) { 5 } else { 10 };
                let cap = w.weight / divisor;
                sides + str_to_mds.clamp(-cap, cap)
            }
        };
        if self.has(Abilities::MEL_POWER) {
            mds += 1;
        }
        mds.max(0)
    }

    /// Damage dice of a weapon, 1 for bare hands
    pub fn weapon_dd(weapon: Option<&Item>) -> i32 {
        weapon.map(|w| w.dd).unwrap_or(1)
    }

    /// Melee blows per turn
    pub fn blows(&self) -> i32 {
        let mut blows = 1;
        if self.has(Abilities::MEL_RAPID_ATTACK) {
            blows += 1;
        }
        if self.mds2 > 0 {
            blows += 1;
        }
        blows
    }

    /// Carrying capacity in tenths of a pound; each point of strength is worth a fifth more
    pub fn weight_limit(&self) -> i32 {
        let str = self.stat(Stat::Str);
        let mut limit = 1000;
        for _ in 0..str.abs() {
            limit = if str > 0 { limit * 12 / 10 } else { limit * 10 / 12 };
        }
        limit
    }

    pub fn total_weight(&self) -> i32 {
        self.pack_weight + self.equipment.weight()
    }

    /// Extra evasion from the dodging ability after moving
    pub fn dodging_bonus(&self) -> i32 {
        let moved = matches!(self.previous_action[0], 1..=9) && self.previous_action[0] != 5;
        if self.has(Abilities::EVN_DODGING) && moved { 3 } else { 0 }
    }

    /// Heal some hit points, returning true if anything changed
    pub fn hp_player(&mut self, amount: i32) -> bool {
        if self.chp >= self.mhp || amount <= 0 {
            return false;
        }
        self.chp = (self.chp + amount).min(self.mhp);
        true
    }

    /// Record an action, pushing the oldest out of the history
    pub fn push_action(&mut self, action: u8) {
        self.previous_action.rotate_right(1);
        self.previous_action[0] = action;
    }

    pub fn note(&mut self, text: impl Into<String>) {
        let depth = self.depth;
        self.notes.push((text.into(), depth));
    }

    /// Recompute everything derived from stats, skills, equipment, songs
    /// and conditions
    pub fn calc_bonuses(&mut self) {
        let eq_flags = self.equipment.flags();

        // Resistances
        self.resist_fire = self.equipment.count(ItemFlags::RES_FIRE);
        self.resist_cold = self.equipment.count(ItemFlags::RES_COLD);
        self.resist_pois = self.equipment.count(ItemFlags::RES_POIS);
        self.resist_fear = self.equipment.count(ItemFlags::RES_FEAR);
        self.resist_blind = self.equipment.count(ItemFlags::RES_BLIND);
        self.resist_confu = self.equipment.count(ItemFlags::RES_CONFU);
        self.resist_stun = self.equipment.count(ItemFlags::RES_STUN);
        self.free_act = self.equipment.count(ItemFlags::FREE_ACT);
        self.aggravate = self.equipment.count(ItemFlags::AGGRAVATE);
        self.cowardice = self.equipment.count(ItemFlags::COWARDICE);
        self.danger = self.equipment.count(ItemFlags::DANGER);
        self.cursed = eq_flags.contains(ItemFlags::CURSED);
        if self.has(Abilities::WIL_POISON_RESISTANCE) {
            self.resist_pois += 1;
        }
        if self.singing(Song::Freedom) {
            self.free_act += 1;
        }

        // Stats
        let mut stat_misc = [0; Stat::COUNT];
        if self.has(Abilities::WIL_STRENGTH_IN_ADVERSITY)
            && health_level(self.chp, self.mhp) <= HEALTH_ALMOST_DEAD
        {
            stat_misc[Stat::Str.index()] += 1;
            stat_misc[Stat::Gra.index()] += 1;
        }
        for i in 0..Stat::COUNT {
            self.stat_use[i] = (self.stat_base[i] + self.stat_drain[i] + stat_misc[i])
                .clamp(BASE_STAT_MIN, BASE_STAT_MAX);
        }

        // Skills
        let mut equip = [0; Skill::COUNT];
        let mut misc = [0; Skill::COUNT];
        equip[Skill::Evasion.index()] += self.equipment.evasion();
        equip[Skill::Stealth.index()] -= self.equipment.armour_weight() / 100;
        if let Some(w) = &self.equipment.weapon {
            equip[Skill::Melee.index()] += w.att;
        }
        if let Some(b) = &self.equipment.bow {
            equip[Skill::Archery.index()] += b.att;
        }
        if self.has(Abilities::MEL_RAPID_ATTACK) {
            misc[Skill::Melee.index()] -= 3;
        }
        if self.has(Abilities::ARC_RAPID_FIRE) {
            misc[Skill::Archery.index()] -= 3;
        }
        let stun = self.timed(Timed::Stun);
        let stun_penalty = if stun >= 50 { 4 } else if stun > 0 { 2 } else { 0 };
        for m in misc.iter_mut() {
            *m -= stun_penalty;
        }
        if self.stealth_mode {
            misc[Skill::Stealth.index()] += STEALTH_MODE_BONUS;
        }

        let total = |s: Skill, equip: &[i32], misc: &[i32], stat_use: &[i32; Stat::COUNT], base: &[i32]| {
            base[s.index()] + equip[s.index()] + stat_use[s.stat().index()] + misc[s.index()]
        };

        // Song comes first since the other songs depend on it
        self.skill_use[Skill::Song.index()] =
            total(Skill::Song, &equip, &misc, &self.stat_use, &self.skill_base);
        if self.singing(Song::Slaying) {
            let bonus = self.slaying_song_bonus();
            misc[Skill::Melee.index()] += bonus;
            misc[Skill::Archery.index()] += bonus;
        }
        if self.singing(Song::Aule) {
            misc[Skill::Smithing.index()] += self.song_bonus(Song::Aule);
        }
        if self.singing(Song::Staying) {
            misc[Skill::Will.index()] += self.song_bonus(Song::Staying);
        }

        // Entrancement or being knocked out leaves no evasion to speak of
        if self.is(Timed::Entranced) || stun > 100 {
            let e = Skill::Evasion;
            misc[e.index()] = -5 - (self.skill_base[e.index()] + equip[e.index()] + self.stat_use[e.stat().index()]);
        }

        for skill in [
            Skill::Melee,
            Skill::Archery,
            Skill::Evasion,
            Skill::Stealth,
            Skill::Perception,
            Skill::Will,
            Skill::Smithing,
        ] {
            self.skill_use[skill.index()] = total(skill, &equip, &misc, &self.stat_use, &self.skill_base);
        }

        // Melee dice
        let weapon = self.equipment.weapon.clone();
        let rapid = if self.has(Abilities::MEL_RAPID_ATTACK) { -3 } else { 0 };
        self.mdd = Self::weapon_dd(weapon.as_ref());
        self.mds = self.strength_modified_ds(weapon.as_ref(), rapid);
        self.offhand_mel_mod = 0;
        self.mdd2 = 0;
        self.mds2 = 0;
        if self.has(Abilities::MEL_TWO_WEAPON) {
            if let Some(off) = self.equipment.off_hand_weapon().cloned() {
                self.offhand_mel_mod -= weapon.as_ref().map(|w| w.att).unwrap_or(0);
                if self.has(Abilities::MEL_RAPID_ATTACK) {
                    self.offhand_mel_mod += 3;
                }
                self.offhand_mel_mod += off.att - 3;
                self.mdd2 = off.dd;
                self.mds2 = self.strength_modified_ds(Some(&off), -3);
            }
        }

        // Light
        self.light_radius = self.equipment.light.as_ref().map(|l| l.pval.max(1)).unwrap_or(0);

        // Speed
        let mut speed = NORMAL_SPEED;
        if self.is(Timed::Fast) {
            speed += 1;
        }
        if self.is(Timed::Slow) {
            speed -= 1;
        }
        if self.total_weight() > self.weight_limit() {
            speed -= 1;
        }
        if self.stealth_mode && self.previous_action[0] != 5 {
            speed -= 1;
        }
        self.speed = speed.clamp(1, 3);
    }
}
