// crates/seig-economics/src/entropy.rs
//
// Deterministic entropy source backed by a seeded StdRng.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use seig_core::EntropySource;

/// Draws a uniform integer from a `StdRng` seeded with the caller's seed.
///
/// The same seed and bound always produce the same value, so a round's
/// winner can be recomputed from its recorded parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeededEntropy;

impl EntropySource for SeededEntropy {
    fn draw(&self, seed: u64, upper_exclusive: u128) -> u128 {
        if upper_exclusive <= 1 {
            return 0;
        }
        let mut rng = StdRng::seed_from_u64(seed);
        rng.gen_range(0..upper_exclusive)
    }
}
