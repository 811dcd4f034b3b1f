//! Seeded random stream shared by every pipeline stage.
//!
//! A single 31-bit linear-congruential generator is owned by the map
//! generator and lent mutably to one stage at a time, so a fixed seed
//! consumes randomness in a fixed order. All derived draws (ranges, percent
//! rolls, shuffles) go through the same stream; nothing reads OS entropy.

/// LCG multiplier (Numerical Recipes).
const MULTIPLIER: u32 = 1_664_525;
/// LCG increment.
const INCREMENT: u32 = 1_013_904_223;
/// State is kept modulo 2^31.
const STATE_MASK: u32 = 0x7FFF_FFFF;

/// Deterministic uniform source, reproducible across platforms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRng {
    state: u32,
}

impl GameRng {
    /// Hash arbitrary seed bytes into the initial state with the classic
    /// `h*31 + b` rolling hash, then reduce modulo 2^31.
    pub fn from_seed(seed: &[u8]) -> Self {
        let mut h: u32 = 0;
        for &b in seed {
            h = (h << 5).wrapping_sub(h).wrapping_add(u32::from(b));
        }
        Self {
            state: h & STATE_MASK,
        }
    }

    /// Next value in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.state = self
            .state
            .wrapping_mul(MULTIPLIER)
            .wrapping_add(INCREMENT)
            & STATE_MASK;
        f64::from(self.state) / f64::from(1u32 << 31)
    }

    /// Uniform integer in `[0, n)`. `n = 0` returns 0 without consuming
    /// the stream.
    pub fn range(&mut self, n: u32) -> u32 {
        if n == 0 {
            return 0;
        }
        (self.next_f64() * f64::from(n)) as u32
    }

    /// Uniform integer in `[lo, hi)`.
    pub fn range_i32(&mut self, lo: i32, hi: i32) -> i32 {
        debug_assert!(lo < hi);
        lo + self.range((hi - lo) as u32) as i32
    }

    /// True with the given percent probability.
    pub fn chance(&mut self, percent: u32) -> bool {
        self.range(100) < percent
    }

    /// In-place Fisher-Yates shuffle driven by this stream.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.range(i as u32 + 1) as usize;
            items.swap(i, j);
        }
    }
}
