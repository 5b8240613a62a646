//! Seeded random stream helpers.
//!
//! The whole run draws from a single [`StdRng`], passed explicitly down
//! the call chain so that a seed reproduces the exact draw order.

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Creates the run's random stream from a seed.
pub fn create_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Draws a uniform index in `0..n`.
///
/// # Panics
/// Panics if `n == 0`.
pub(crate) fn uniform_index<R: rand::Rng>(n: usize, rng: &mut R) -> usize {
    assert!(n > 0, "cannot draw an index from an empty range");
    rng.random_range(0..n)
}
