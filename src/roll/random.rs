use crate::common::UInt;
use rand::{rngs::StdRng, Rng, RngCore, SeedableRng};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of die rolls for a context.
pub trait RandomSource {
    /// A value in `[1, sides]`.
    fn roll(&mut self, sides: UInt) -> UInt;

    /// A value in `[0, bound)`.
    fn rand(&mut self, bound: UInt) -> UInt;

    fn reseed(&mut self, _seed: u64) {}
}

impl<R: RngCore> RandomSource for R {
    fn roll(&mut self, sides: UInt) -> UInt {
        if sides == 0 {
            return 0;
        }
        self.gen_range(1..=sides)
    }

    fn rand(&mut self, bound: UInt) -> UInt {
        if bound == 0 {
            return 0;
        }
        self.gen_range(0..bound)
    }
}

/// Entropy-seeded generator; the default source of a context.
#[derive(Debug, Clone)]
pub struct SystemRandom {
    rng: StdRng,
}

impl SystemRandom {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Default for SystemRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for SystemRandom {
    fn roll(&mut self, sides: UInt) -> UInt {
        self.rng.roll(sides)
    }

    fn rand(&mut self, bound: UInt) -> UInt {
        RandomSource::rand(&mut self.rng, bound)
    }

    fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }
}

/// Deterministic generator. A seed of zero picks a time-based seed instead.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    seed: u64,
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        let seed = if seed == 0 { time_seed() } else { seed };
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// The seed actually in use.
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl RandomSource for SeededRandom {
    fn roll(&mut self, sides: UInt) -> UInt {
        self.rng.roll(sides)
    }

    fn rand(&mut self, bound: UInt) -> UInt {
        RandomSource::rand(&mut self.rng, bound)
    }

    fn reseed(&mut self, seed: u64) {
        *self = Self::new(seed);
    }
}

fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0x9e37_79b9_7f4a_7c15, |d| d.as_nanos() as u64)
        | 1
}

/// Replays a fixed sequence of raw values, cycling when it runs out.
///
/// `roll(sides)` maps a raw value `v` to `(v - 1) % sides + 1`, so values already in range come
/// out unchanged. `rand(bound)` yields `v % bound`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRandom {
    values: Vec<UInt>,
    pos: usize,
}

impl ScriptedRandom {
    pub fn new(values: impl IntoIterator<Item = UInt>) -> Self {
        Self {
            values: values.into_iter().collect(),
            pos: 0,
        }
    }

    fn next_raw(&mut self) -> UInt {
        if self.values.is_empty() {
            return 1;
        }
        let ret = self.values[self.pos % self.values.len()];
        self.pos += 1;
        ret
    }
}

impl RandomSource for ScriptedRandom {
    fn roll(&mut self, sides: UInt) -> UInt {
        if sides == 0 {
            return 0;
        }
        self.next_raw().saturating_sub(1) % sides + 1
    }

    fn rand(&mut self, bound: UInt) -> UInt {
        if bound == 0 {
            return 0;
        }
        self.next_raw() % bound
    }

    fn reseed(&mut self, _seed: u64) {
        self.pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roll_in_range() {
        let mut rng = SeededRandom::new(42);
        for sides in [1, 2, 6, 20, 100, 1_000_000] {
            for _ in 0..200 {
                let x = rng.roll(sides);
                assert!((1..=sides).contains(&x), "d{} rolled {}", sides, x);
            }
        }
        for _ in 0..200 {
            assert!(rng.rand(3) < 3);
        }
    }

    #[test]
    fn test_seeded_is_deterministic() {
        let mut a = SeededRandom::new(1234);
        let mut b = SeededRandom::new(1234);
        let xs: Vec<_> = (0..32).map(|_| a.roll(20)).collect();
        let ys: Vec<_> = (0..32).map(|_| b.roll(20)).collect();
        assert_eq!(xs, ys);

        a.reseed(1234);
        let zs: Vec<_> = (0..32).map(|_| a.roll(20)).collect();
        assert_eq!(xs, zs);
    }

    #[test]
    fn test_zero_seed_is_time_based() {
        assert_ne!(SeededRandom::new(0).seed(), 0);
        assert_eq!(SeededRandom::new(7).seed(), 7);
    }

    #[test]
    fn test_blanket_rng_source() {
        let mut rng = StdRng::seed_from_u64(9);
        let x = RandomSource::roll(&mut rng, 8);
        assert!((1..=8).contains(&x));
        assert_eq!(RandomSource::rand(&mut rng, 0), 0);
    }

    #[test]
    fn test_scripted() {
        let mut rng = ScriptedRandom::new([6, 1, 9]);
        assert_eq!(rng.roll(6), 6);
        assert_eq!(rng.roll(6), 1);
        assert_eq!(rng.roll(6), 3);
        assert_eq!(rng.roll(6), 6);
        assert_eq!(rng.rand(3), 1);
        rng.reseed(0);
        assert_eq!(rng.roll(20), 6);
    }
}
