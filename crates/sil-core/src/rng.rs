//! Random number generation
//!
//! Uses a seeded ChaCha RNG so whole fights can be replayed from a seed.
//! All dice in the simulation go through [`GameRng`].

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// The simulation's dice. Serialises as its seed only, so a restored
/// world restarts the stream from the beginning.
#[derive(Debug, Clone)]
pub struct GameRng {
    rng: ChaCha8Rng,
    seed: u64,
}

impl Serialize for GameRng {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.seed.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for GameRng {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let seed = u64::deserialize(deserializer)?;
        Ok(GameRng::new(seed))
    }
}

impl GameRng {
    /// Create a new RNG with the given seed
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Get the seed used to create this RNG
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform value in `0..n`
    ///
    /// Returns 0 if n is not positive.
    pub fn rand_int(&mut self, n: i32) -> i32 {
        if n <= 0 {
            return 0;
        }
        self.rng.gen_range(0..n)
    }

    /// Roll a single die: `1..=n`
    ///
    /// Returns 0 if n is not positive.
    pub fn die(&mut self, n: i32) -> i32 {
        if n <= 0 {
            return 0;
        }
        self.rng.gen_range(1..=n)
    }

    /// Roll `n` dice with `sides` sides and sum them (`nds`)
    pub fn damroll(&mut self, n: i32, sides: i32) -> i32 {
        if sides <= 0 {
            return 0;
        }
        (0..n.max(0)).map(|_| self.die(sides)).sum()
    }

    /// Uniform value in `lo..=hi`
    ///
    /// Returns `lo` when the range is empty.
    pub fn rand_range(&mut self, lo: i32, hi: i32) -> i32 {
        if hi <= lo {
            return lo;
        }
        self.rng.gen_range(lo..=hi)
    }

    /// Returns true with probability 1/n
    pub fn one_in(&mut self, n: i32) -> bool {
        self.rand_int(n) == 0
    }

    /// Returns true with probability percent/100
    pub fn percent(&mut self, percent: i32) -> bool {
        self.rand_int(100) < percent
    }

    /// Fair coin
    pub fn coin(&mut self) -> bool {
        self.rand_int(2) == 0
    }

    /// A random element, or None for an empty slice
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            None
        } else {
            Some(&items[self.rand_int(items.len() as i32) as usize])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rand_int_bounds() {
        let mut rng = GameRng::new(42);
        for _ in 0..1000 {
            let n = rng.rand_int(10);
            assert!((0..10).contains(&n));
        }
    }

    #[test]
    fn test_die_bounds() {
        let mut rng = GameRng::new(42);
        for _ in 0..1000 {
            let n = rng.die(6);
            assert!((1..=6).contains(&n));
        }
    }

    #[test]
    fn test_damroll() {
        let mut rng = GameRng::new(42);
        for _ in 0..1000 {
            let n = rng.damroll(2, 6);
            assert!((2..=12).contains(&n));
        }
    }

    #[test]
    fn test_rand_range() {
        let mut rng = GameRng::new(7);
        for _ in 0..1000 {
            let n = rng.rand_range(-20, -11);
            assert!((-20..=-11).contains(&n));
        }
        assert_eq!(rng.rand_range(5, 5), 5);
        assert_eq!(rng.rand_range(5, 2), 5);
    }

    #[test]
    fn test_reproducibility() {
        let mut rng1 = GameRng::new(42);
        let mut rng2 = GameRng::new(42);

        for _ in 0..100 {
            assert_eq!(rng1.rand_int(100), rng2.rand_int(100));
        }
    }

    #[test]
    fn test_zero_inputs() {
        let mut rng = GameRng::new(42);
        assert_eq!(rng.rand_int(0), 0);
        assert_eq!(rng.die(0), 0);
        assert_eq!(rng.damroll(0, 6), 0);
        assert_eq!(rng.damroll(2, 0), 0);
        assert_eq!(rng.rand_int(-3), 0);
    }
}
