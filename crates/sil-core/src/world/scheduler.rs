//! The turn loop
//!
//! Every game tick each creature gains energy according to its speed, and
//! anyone holding at least `ENERGY_TO_ACT` may act. Monsters are walked in
//! reverse list order. Those with more energy than the player go before
//! the player, the rest after, so a fast monster really does get two moves
//! to the player's one.

#[cfg(not(feature = "std"))]
use crate::compat::*;

use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::{debug, trace, warn};

use super::state::World;
use crate::action::{ActionResult, Command, Controller, continue_leap, execute, run_step};
use crate::combat::take_hit;
use crate::consts::{
    ACTION_MISC, ACTION_NOTHING, ALERTNESS_UNWARY, ENERGY_TO_ACT, HEAVY_STUN, MON_MANA_MAX,
    MON_REGEN_HP_PERIOD, MON_REGEN_SP_PERIOD, PY_REGEN_HP_PERIOD, PY_REGEN_SP_PERIOD, turn_energy,
};
use crate::monster::{MonsterId, MonsterSong, process_monster, recover_monster};
use crate::perception::monster_perception;
use crate::player::{Skill, Song, Timed, sing};

/// Commands that take no time before the player is made to wait instead
const MAX_FREE_ACTIONS: usize = 3;

/// Why a monster's turn passed without it doing anything
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum SkipReason {
    /// Below the unwary threshold
    Asleep,
    /// Just noticed the player, or was knocked off balance
    Startled,
    /// Held by the song of mastery
    Mastered,
    /// Gone from the level before it could act
    Vanished,
}

/// What a monster's turn came to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnOutcome {
    /// Moved, attacked, shrieked or otherwise did something
    Acted,
    /// Lost the turn before deciding anything
    Skipped(SkipReason),
    /// Spent the energy but nothing came of it
    UsedEnergyOnly,
}

/// Result of one tick of the game loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickResult {
    Continue,
    PlayerDied(String),
    /// Escaped, fell to a deeper level or took the stairs
    PlayerLeft,
}

/// Share of `max` recovered on turn `turn_number`, so that everything
/// comes back over `period` turns without rounding losses
pub fn regen_amount(turn_number: i64, max: i32, period: i32) -> i32 {
    if turn_number == 0 || period <= 0 {
        return 0;
    }
    let (max, period) = (i64::from(max), i64::from(period));
    let so_far = max * ((turn_number - 1) % period) / period;
    let next = if turn_number % period > 0 {
        max * (turn_number % period) / period
    } else {
        max
    };
    (next - so_far) as i32
}

impl World {
    /// Give a turn to every monster with at least `min_energy` (and enough
    /// to act at all), last in the list first
    pub fn process_monsters(&mut self, min_energy: i32) -> Vec<(MonsterId, TurnOutcome)> {
        let mut outcomes = Vec::new();
        for id in self.monsters.ids_rev() {
            if self.player.leaving {
                break;
            }
            let Some(m) = self.monsters.get(id) else { continue };
            if m.energy < min_energy || m.energy < ENERGY_TO_ACT {
                continue;
            }
            let outcome = self.monster_turn(id);
            trace!(?id, ?outcome, "monster turn");
            outcomes.push((id, outcome));
        }
        outcomes
    }

    fn monster_turn(&mut self, id: MonsterId) -> TurnOutcome {
        if !recover_monster(self, id) {
            return TurnOutcome::Skipped(SkipReason::Vanished);
        }
        let Some(m) = self.monsters.get_mut(id) else {
            return TurnOutcome::Skipped(SkipReason::Vanished);
        };
        m.energy -= ENERGY_TO_ACT;

        if m.alertness < ALERTNESS_UNWARY {
            return TurnOutcome::Skipped(SkipReason::Asleep);
        }
        if m.skip_next_turn {
            // no charging out of a stumble
            m.previous_action[0] = ACTION_MISC;
            m.skip_next_turn = false;
            return TurnOutcome::Skipped(SkipReason::Startled);
        }
        process_monster(self, id)
    }

    /// One player turn: the noise of the last turn reaches the monsters,
    /// then the controller chooses commands until one takes time.
    pub fn process_player(&mut self, controller: &mut dyn Controller) -> ActionResult {
        self.player.ripostes = 0;
        monster_perception(self, true, true, self.player.stealth_score);
        self.player.push_action(ACTION_NOTHING);

        let mut result = ActionResult::NoTime;
        for _ in 0..MAX_FREE_ACTIONS {
            self.player.stealth_score = self.player.skill(Skill::Stealth);
            result = self.player_action(controller);
            if let ActionResult::Failed(msg) = &result {
                let msg = msg.clone();
                self.message(msg);
            }
            if result.takes_time() || self.player.leaving {
                break;
            }
        }
        if !result.takes_time() && !self.player.leaving {
            warn!("controller issued no timed command; waiting instead");
            self.player.previous_action[0] = ACTION_NOTHING;
            result = ActionResult::Success;
        }

        if result.takes_time() {
            self.player.energy -= ENERGY_TO_ACT;
            self.player_turns += 1;
            self.after_player_turn();
        }
        result
    }

    fn player_action(&mut self, controller: &mut dyn Controller) -> ActionResult {
        let p = &self.player;
        if p.leaping {
            return continue_leap(self, &mut |q: &str| controller.confirm(q));
        }
        if p.is(Timed::Entranced) || p.timed(Timed::Stun) > HEAVY_STUN {
            self.change_song(Song::Nothing);
            self.player.previous_action[0] = ACTION_MISC;
            return ActionResult::Success;
        }
        if p.skip_next_turn {
            self.message("You recover your footing.");
            self.player.skip_next_turn = false;
            self.player.previous_action[0] = ACTION_MISC;
            return ActionResult::Success;
        }
        if self.run.is_some() {
            return run_step(self, None, &mut |q: &str| controller.confirm(q));
        }
        let command = controller.next_command(self);
        if command != Command::Rest {
            self.player.resting = false;
        }
        debug!(?command, "player command");
        execute(self, command, &mut |q: &str| controller.confirm(q))
    }

    /// Songs, noise, wounds and recovery once the player has used a turn
    fn after_player_turn(&mut self) {
        if self.player.leaving {
            return;
        }
        sing(self);

        if self.player.resting {
            self.player.stealth_score += if self.player.stealth_mode { 2 } else { 7 };
        }
        self.update_noise();

        let poisoned = self.player.timed(Timed::Poisoned);
        if poisoned > 0 {
            take_hit(self, (poisoned + 4) / 5, "poison");
        }
        let cut = self.player.timed(Timed::Cut);
        if cut > 0 {
            take_hit(self, (cut + 4) / 5, "a fatal wound");
        }
        if self.player.is_dead {
            return;
        }
        self.regenerate_player();

        let amount = if self.player.singing(Song::Este) {
            self.player.song_bonus(Song::Este).max(1)
        } else {
            1
        };
        let mut ended = Vec::new();
        for _ in 0..amount {
            ended.extend(self.player.timed.decay());
        }
        if !ended.is_empty() {
            for msg in ended {
                self.message(msg);
            }
            self.player.calc_bonuses();
            self.disturb();
        }
    }

    fn regenerate_player(&mut self) {
        let turn = self.player_turns as i64;
        let p = &mut self.player;
        if p.csp < p.msp && p.song1 == Song::Nothing {
            p.csp = (p.csp + regen_amount(turn, p.msp, PY_REGEN_SP_PERIOD)).min(p.msp);
        }
        let mut multiplier = 1;
        if p.is(Timed::Poisoned) || p.is(Timed::Cut) {
            multiplier = 0;
        }
        if p.singing(Song::Este) {
            multiplier *= p.song_bonus(Song::Este);
        }
        if multiplier > 0 && p.chp < p.mhp {
            let period = PY_REGEN_HP_PERIOD / multiplier;
            p.chp = (p.chp + regen_amount(turn, p.mhp, period)).min(p.mhp);
        }
    }

    /// Slow bookkeeping, every tenth game turn: monsters regain health and
    /// voice
    pub fn process_world(&mut self) {
        if self.turn % 10 != 0 {
            return;
        }
        let tick = (self.turn / 10) as i64;
        for (_, m) in self.monsters.iter_mut() {
            if m.hp < m.maxhp {
                m.hp = (m.hp + regen_amount(tick, m.maxhp, MON_REGEN_HP_PERIOD)).min(m.maxhp);
                if m.hp == m.maxhp {
                    m.min_range = 0;
                }
            }
            if m.mana < MON_MANA_MAX && m.song == MonsterSong::Nothing {
                m.mana = (m.mana + regen_amount(tick, MON_MANA_MAX, MON_REGEN_SP_PERIOD)).min(MON_MANA_MAX);
                if m.mana == MON_MANA_MAX {
                    m.min_range = 0;
                }
            }
        }
    }

    /// Run one game tick: everyone with energy acts, then everyone gains
    /// energy
    pub fn game_turn(&mut self, controller: &mut dyn Controller) -> TickResult {
        while self.player.energy >= ENERGY_TO_ACT && !self.player.leaving {
            // monsters with even more energy go first
            self.process_monsters(self.player.energy + 1);
            if !self.player.leaving {
                self.process_player(controller);
            }
        }
        if !self.player.leaving {
            self.process_monsters(ENERGY_TO_ACT);
        }
        if !self.player.leaving {
            self.process_world();
        }
        if self.player.leaving {
            return self.tick_result();
        }

        self.player.energy += turn_energy(self.player.speed);
        for (_, m) in self.monsters.iter_mut() {
            m.energy += turn_energy(m.speed());
        }
        self.turn += 1;
        TickResult::Continue
    }

    /// Play up to `turns` game ticks, stopping early if the player dies or
    /// leaves the level
    pub fn run_turns(&mut self, turns: u32, controller: &mut dyn Controller) -> TickResult {
        for _ in 0..turns {
            let result = self.game_turn(controller);
            if result != TickResult::Continue {
                debug!(turn = self.turn, ?result, "game loop stopped");
                return result;
            }
        }
        TickResult::Continue
    }

    fn tick_result(&self) -> TickResult {
        if self.player.is_dead {
            TickResult::PlayerDied(self.player.died_from.clone())
        } else if self.player.leaving {
            TickResult::PlayerLeft
        } else {
            TickResult::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::ALERTNESS_ALERT;
    use crate::dungeon::{Coord, Direction};
    use crate::world::testing::arena;
    use proptest::prelude::*;

    fn hold(_: &World) -> Command {
        Command::Hold
    }

    #[test]
    fn test_regen_amount_sums_to_max() {
        let total: i32 = (1..=50).map(|t| regen_amount(t, 37, 50)).sum();
        assert_eq!(total, 37);
        assert_eq!(regen_amount(0, 37, 50), 0);
    }

    #[test]
    fn test_sleeping_monsters_only_spend_energy() {
        let mut world = arena();
        let id = world.place_monster("Snaga", Coord::new(1, 1)).unwrap();
        let m = world.monsters.get_mut(id).unwrap();
        m.alertness = ALERTNESS_UNWARY - 5;
        m.energy = ENERGY_TO_ACT;
        let outcomes = world.process_monsters(ENERGY_TO_ACT);
        assert_eq!(outcomes, vec![(id, TurnOutcome::Skipped(SkipReason::Asleep))]);
        assert_eq!(world.monsters.get(id).unwrap().energy, 0);
    }

    #[test]
    fn test_startled_monsters_lose_a_turn() {
        let mut world = arena();
        let id = world.place_monster("Snaga", Coord::new(1, 1)).unwrap();
        let m = world.monsters.get_mut(id).unwrap();
        m.alertness = ALERTNESS_ALERT;
        m.skip_next_turn = true;
        m.energy = ENERGY_TO_ACT;
        let outcomes = world.process_monsters(ENERGY_TO_ACT);
        assert_eq!(outcomes[0].1, TurnOutcome::Skipped(SkipReason::Startled));
        let m = world.monsters.get(id).unwrap();
        assert!(!m.skip_next_turn);
        assert_eq!(m.previous_action[0], ACTION_MISC);
    }

    #[test]
    fn test_low_energy_monsters_wait() {
        let mut world = arena();
        let id = world.place_monster("Snaga", Coord::new(1, 1)).unwrap();
        world.monsters.get_mut(id).unwrap().energy = ENERGY_TO_ACT + 5;
        assert!(world.process_monsters(ENERGY_TO_ACT + 10).is_empty());
        assert_eq!(world.process_monsters(ENERGY_TO_ACT).len(), 1);
    }

    #[test]
    fn test_monsters_go_in_reverse_order() {
        let mut world = arena();
        let first = world.place_monster("Snaga", Coord::new(1, 1)).unwrap();
        let second = world.place_monster("Snaga", Coord::new(3, 7)).unwrap();
        for id in [first, second] {
            let m = world.monsters.get_mut(id).unwrap();
            m.alertness = ALERTNESS_UNWARY - 5;
            m.energy = ENERGY_TO_ACT;
        }
        let order: Vec<_> = world.process_monsters(ENERGY_TO_ACT).into_iter().map(|(id, _)| id).collect();
        assert_eq!(order, vec![second, first]);
    }

    #[test]
    fn test_player_turn_spends_energy() {
        let mut world = arena();
        world.player.energy = ENERGY_TO_ACT;
        let result = world.process_player(&mut hold);
        assert_eq!(result, ActionResult::Success);
        assert_eq!(world.player.energy, 0);
        assert_eq!(world.player_turns, 1);
    }

    #[test]
    fn test_free_commands_fall_back_to_waiting() {
        let mut world = arena();
        world.player.energy = ENERGY_TO_ACT;
        world.monster_swap(world.player.pos, Coord::new(1, 4));
        // walking into a wall the player already knows about takes no time
        let mut bump = |_: &World| Command::Move(Direction::North);
        assert_eq!(world.process_player(&mut bump), ActionResult::Success);
        assert!(world.take_messages().iter().any(|m| m == "There is a wall in the way!"));
        assert_eq!(world.player.energy, 0);
    }

    #[test]
    fn test_entranced_player_loses_turns() {
        let mut world = arena();
        world.player.energy = ENERGY_TO_ACT;
        world.player.timed.set(Timed::Entranced, 3);
        let mut never = |_: &World| -> Command { panic!("entranced players are not asked") };
        assert_eq!(world.process_player(&mut never), ActionResult::Success);
        assert_eq!(world.player.previous_action[0], ACTION_MISC);
    }

    #[test]
    fn test_conditions_wear_off_per_player_turn() {
        let mut world = arena();
        world.player.timed.set(Timed::Afraid, 2);
        for _ in 0..2 {
            world.player.energy = ENERGY_TO_ACT;
            world.process_player(&mut hold);
        }
        assert!(!world.player.is(Timed::Afraid));
        assert!(world.take_messages().iter().any(|m| m.contains("bold")));
    }

    #[test]
    fn test_cuts_bleed() {
        let mut world = arena();
        world.player.mhp = 20;
        world.player.chp = 20;
        world.player.timed.set(Timed::Cut, 10);
        world.player.energy = ENERGY_TO_ACT;
        world.process_player(&mut hold);
        assert_eq!(world.player.chp, 18);
    }

    #[test]
    fn test_speed_decides_who_acts() {
        let mut world = arena();
        world.player.energy = 0;
        let mut acted = 0;
        for _ in 0..100 {
            let before = world.player_turns;
            assert_eq!(world.game_turn(&mut hold), TickResult::Continue);
            acted += world.player_turns - before;
        }
        // ten energy a tick at normal speed
        assert!((9..=10).contains(&acted));
        assert_eq!(world.turn, 100);
    }

    #[test]
    fn test_dying_stops_the_loop() {
        let mut world = arena();
        world.player.chp = 1;
        world.player.timed.set(Timed::Poisoned, 20);
        let result = world.run_turns(50, &mut hold);
        assert_eq!(result, TickResult::PlayerDied("poison".into()));
    }

    #[test]
    fn test_monsters_regenerate_every_tenth_turn() {
        let mut world = arena();
        let id = world.place_monster("Snaga", Coord::new(1, 1)).unwrap();
        world.monsters.get_mut(id).unwrap().hp = 1;
        world.turn = 10 * MON_REGEN_HP_PERIOD as u64;
        world.process_world();
        assert!(world.monsters.get(id).unwrap().hp > 1);
        let hp = world.monsters.get(id).unwrap().hp;
        world.turn += 1;
        world.process_world();
        assert_eq!(world.monsters.get(id).unwrap().hp, hp);
    }

    proptest! {
        #[test]
        fn prop_regen_never_overshoots(max in 1i32..500, period in 1i32..300) {
            let total: i32 = (1..=i64::from(period)).map(|t| regen_amount(t, max, period)).sum();
            prop_assert_eq!(total, max);
            for t in 1..=i64::from(period) {
                prop_assert!(regen_amount(t, max, period) >= 0);
            }
        }
    }
}
