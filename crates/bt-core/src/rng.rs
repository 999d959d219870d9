//! Deterministic simulation RNG and per-particle jitter.
//!
//! # Determinism strategy
//!
//! The run owns a single [`SimRng`] used only from the simulation thread, in
//! a fixed call order, so identical seeds reproduce identical streams.  The
//! RNG is `Clone` so snapshots can capture and restore its exact state.
//!
//! Per-particle speed jitter does not draw from the shared stream.  It is a
//! pure function of `(seed, serial)`:
//!
//!   seed' = global_seed XOR (serial * MIXING_CONSTANT)
//!
//! The mixing constant is the 64-bit fractional part of the golden ratio,
//! which spreads consecutive serials uniformly across the seed space.  Adding
//! particles never disturbs the jitter of existing ones.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Deterministic speed multiplier in `[1 - amplitude, 1 + amplitude]` for the
/// particle with the given serial number.
///
/// `amplitude` is clamped to `[0, 0.9]` so speeds stay strictly positive.
pub fn particle_jitter(global_seed: u64, serial: u64, amplitude: f32) -> f32 {
    let a = amplitude.clamp(0.0, 0.9);
    if a == 0.0 {
        return 1.0;
    }
    let seed = global_seed ^ serial.wrapping_mul(MIXING_CONSTANT);
    let mut rng = SmallRng::seed_from_u64(seed);
    rng.gen_range(1.0 - a..=1.0 + a)
}

// ── SimRng ────────────────────────────────────────────────────────────────────

/// Simulation-level RNG for the alternate crossing assignment.
///
/// Single-threaded by construction: the background routing solver never
/// draws random numbers.
#[derive(Clone, Debug)]
pub struct SimRng(SmallRng);

impl SimRng {
    pub fn new(seed: u64) -> Self {
        SimRng(SmallRng::seed_from_u64(seed))
    }

    /// `true` with probability `p` (clamped to [0, 1]).
    #[inline]
    pub fn gen_bool(&mut self, p: f64) -> bool {
        self.0.gen_bool(p.clamp(0.0, 1.0))
    }
}
