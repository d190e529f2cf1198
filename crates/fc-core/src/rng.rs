//! Deterministic simulation-level RNG.
//!
//! # Determinism strategy
//!
//! The `Context` owns exactly one `SimRng`, seeded from `SimInfo::seed`.  All
//! agents draw from it in the deterministic order the tick loop visits them,
//! so two runs with the same seed and inputs produce identical results.
//!
//! Parallel exchange partitions never draw random numbers; if a future
//! component needs per-thread randomness it should take a [`SimRng::child`].

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Seeded random-number source owned by the simulation context.
pub struct SimRng {
    seed: u64,
    rng:  SmallRng,
}

impl SimRng {
    pub fn new(seed: u64) -> Self {
        SimRng { seed, rng: SmallRng::seed_from_u64(seed) }
    }

    /// The seed this generator was (last) created or reset with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Restart the stream from `seed`.
    pub fn reset(&mut self, seed: u64) {
        *self = SimRng::new(seed);
    }

    /// Derive a child `SimRng` with a different seed offset.
    pub fn child(&mut self, offset: u64) -> SimRng {
        let child_seed: u64 = self.rng.r#gen::<u64>() ^ offset.wrapping_mul(MIXING_CONSTANT);
        SimRng::new(child_seed)
    }

    /// Uniform sample in `[0, 1)`.
    #[inline]
    pub fn random_01(&mut self) -> f64 {
        self.rng.r#gen::<f64>()
    }

    /// Uniform integer in the inclusive range `[low, high]`.
    ///
    /// Arguments are swapped if given in the wrong order.
    #[inline]
    pub fn uniform_int(&mut self, low: i64, high: i64) -> i64 {
        let (lo, hi) = if low <= high { (low, high) } else { (high, low) };
        self.rng.gen_range(lo..=hi)
    }

    /// Uniform real in `[low, high)`.  Returns `low` for an empty range.
    #[inline]
    pub fn uniform_real(&mut self, low: f64, high: f64) -> f64 {
        if !(high > low) {
            return low;
        }
        self.rng.gen_range(low..high)
    }

    /// `true` with probability `p` (clamped to [0, 1]).
    #[inline]
    pub fn gen_bool(&mut self, p: f64) -> bool {
        self.rng.gen_bool(p.clamp(0.0, 1.0))
    }

    /// Expose the inner `SmallRng` for use with `rand` distribution types.
    #[inline]
    pub fn inner(&mut self) -> &mut SmallRng {
        &mut self.rng
    }
}
