//! Deterministic RNG utilities for reproducible tests.

use nalgebra::Vector3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Deterministic `ChaCha8Rng` from a seed.
fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Generate `count` deterministic offsets with coordinates in
/// `[-amplitude, amplitude)`.
///
/// Useful for perturbing CoM positions around a nominal target.
pub fn deterministic_offsets(count: usize, amplitude: f64, seed: u64) -> Vec<Vector3<f64>> {
    let mut rng = seeded_rng(seed);
    (0..count)
        .map(|_| {
            Vector3::new(
                rng.gen_range(-amplitude..amplitude),
                rng.gen_range(-amplitude..amplitude),
                rng.gen_range(-amplitude..amplitude),
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
