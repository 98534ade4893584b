//! Timed conditions on the player

#[cfg(not(feature = "std"))]
use crate::compat::*;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::consts::HEAVY_STUN;

/// A counted-down condition
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
)]
#[repr(u8)]
pub enum Timed {
    #[default]
    Blind = 0,
    Confused = 1,
    Afraid = 2,
    Stun = 3,
    Slow = 4,
    Fast = 5,
    Entranced = 6,
    Image = 7,
    Poisoned = 8,
    Cut = 9,
    Rage = 10,
    OpposeFire = 11,
    OpposeCold = 12,
    OpposePois = 13,
}

impl Timed {
    pub const COUNT: usize = 14;

    /// Upper bound on the counter
    const fn cap(self) -> i32 {
        match self {
            Timed::Stun => 105,
            Timed::Cut => 100,
            _ => 10000,
        }
    }

    /// Messages when the condition starts and when it ends
    const fn messages(self) -> (&'static str, &'static str) {
        match self {
            Timed::Blind => ("You are blind!", "You can see again."),
            Timed::Confused => ("You are confused!", "You feel less confused now."),
            Timed::Afraid => ("You are terrified!", "You feel bolder now."),
            Timed::Stun => ("You have been stunned.", "You are no longer stunned."),
            Timed::Slow => ("You feel yourself moving slower!", "You feel yourself speed up."),
            Timed::Fast => ("You feel yourself moving faster!", "You feel yourself slow down."),
            Timed::Entranced => ("You fall into a deep trance!", "The trance is broken!"),
            Timed::Image => (
                "Fantastic visions appear before your eyes.",
                "You can see clearly again.",
            ),
            Timed::Poisoned => ("You have been poisoned.", "You are no longer poisoned."),
            Timed::Cut => ("You have been given a cut.", "The bleeding stops."),
            Timed::Rage => ("You burst into a furious rage!", "Your rage subsides."),
            Timed::OpposeFire => ("You feel resistant to fire!", "You feel less resistant to fire."),
            Timed::OpposeCold => ("You feel resistant to cold!", "You feel less resistant to cold."),
            Timed::OpposePois => (
                "You feel resistant to poison!",
                "You feel less resistant to poison.",
            ),
        }
    }
}

/// Counter values for every timed condition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conditions {
    values: [i32; Timed::COUNT],
    /// The trance ended this turn; prevents chained entrancement
    pub was_entranced: bool,
}

/// Stun severity bands
fn stun_band(v: i32) -> u8 {
    match v {
        v if v > HEAVY_STUN => 3,
        v if v > 50 => 2,
        v if v > 0 => 1,
        _ => 0,
    }
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, t: Timed) -> i32 {
        self.values[t as usize]
    }

    pub fn is_set(&self, t: Timed) -> bool {
        self.get(t) > 0
    }

    /// Set a counter, returning a message if the change is noticeable
    pub fn set(&mut self, t: Timed, v: i32) -> Option<&'static str> {
        let old = self.get(t);
        if t == Timed::Stun {
            return self.set_stun(v);
        }
        let v = v.clamp(0, t.cap());
        self.values[t as usize] = v;
        if t == Timed::Entranced && old > 0 && v == 0 {
            self.was_entranced = true;
        }
        let (on, off) = t.messages();
        match (old > 0, v > 0) {
            (false, true) => Some(on),
            (true, false) => Some(off),
            _ => None,
        }
    }

    /// Stun moves between bands; knocked-out characters cannot be stunned
    /// further, and being knocked out blinds briefly.
    fn set_stun(&mut self, v: i32) -> Option<&'static str> {
        let old = self.get(Timed::Stun);
        if old > HEAVY_STUN && v > old {
            return None;
        }
        let v = v.clamp(0, Timed::Stun.cap());
        let (old_band, new_band) = (stun_band(old), stun_band(v));
        self.values[Timed::Stun as usize] = v;
        if new_band == 3 {
            let blind = self.get(Timed::Blind).max(2);
            self.values[Timed::Blind as usize] = blind;
        } else if old_band == 3 {
            let blind = (self.get(Timed::Blind) - 1).max(0);
            self.values[Timed::Blind as usize] = blind;
        }
        if new_band > old_band {
            Some(match new_band {
                1 => "You have been stunned.",
                2 => "You have been heavily stunned.",
                _ => "You have been knocked out.",
            })
        } else if new_band < old_band {
            Some(match (old_band, new_band) {
                (3, _) => "You wake up.",
                (_, 0) => "You are no longer stunned.",
                _ => "You feel less stunned.",
            })
        } else {
            None
        }
    }

    /// Add to a counter
    pub fn inc(&mut self, t: Timed, amount: i32) -> Option<&'static str> {
        self.set(t, self.get(t) + amount)
    }

    /// Count every condition down by one, returning the messages of those that end
    pub fn decay(&mut self) -> Vec<&'static str> {
        self.was_entranced = false;
        let mut notes = Vec::new();
        for i in 0..Timed::COUNT {
            if self.values[i] == 0 {
                continue;
            }
            let t = TIMED_ORDER[i];
            if let Some(msg) = self.set(t, self.values[i] - 1) {
                notes.push(msg);
            }
        }
        notes
    }
}

const TIMED_ORDER: [Timed; Timed::COUNT] = [
    Timed::Blind,
    Timed::Confused,
    Timed::Afraid,
    Timed::Stun,
    Timed::Slow,
    Timed::Fast,
    Timed::Entranced,
    Timed::Image,
    Timed::Poisoned,
    Timed::Cut,
    Timed::Rage,
    Timed::OpposeFire,
    Timed::OpposeCold,
    Timed::OpposePois,
];

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_order_matches_discriminants() {
        for t in Timed::iter() {
            assert_eq!(TIMED_ORDER[t as usize], t);
        }
    }

    #[test]
    fn test_on_off_messages() {
        let mut c = Conditions::new();
        assert_eq!(c.set(Timed::Confused, 3), Some("You are confused!"));
        assert_eq!(c.inc(Timed::Confused, 2), None);
        assert_eq!(c.get(Timed::Confused), 5);
        assert_eq!(c.set(Timed::Confused, 0), Some("You feel less confused now."));
        assert_eq!(c.set(Timed::Afraid, -4), None);
        assert_eq!(c.get(Timed::Afraid), 0);
    }

    #[test]
    fn test_stun_bands() {
        let mut c = Conditions::new();
        assert_eq!(c.set(Timed::Stun, 20), Some("You have been stunned."));
        assert_eq!(c.set(Timed::Stun, 60), Some("You have been heavily stunned."));
        assert_eq!(c.set(Timed::Stun, 200), Some("You have been knocked out."));
        assert_eq!(c.get(Timed::Stun), 105);
        assert!(c.is_set(Timed::Blind));
        // no deeper than knocked out
        assert_eq!(c.inc(Timed::Stun, 10), None);
        assert_eq!(c.set(Timed::Stun, 0), Some("You wake up."));
    }

    #[test]
    fn test_trance_end_is_remembered_for_a_turn() {
        let mut c = Conditions::new();
        c.set(Timed::Entranced, 1);
        let notes = c.decay();
        assert_eq!(notes, vec!["The trance is broken!"]);
        assert!(c.was_entranced);
        c.decay();
        assert!(!c.was_entranced);
    }
}
